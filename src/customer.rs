use std::fmt;

pub type CustomerId = i64;

/// A bank customer. Records are immutable once the store has assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    id: CustomerId,
    name: String,
    email: String,
}

impl Customer {
    pub(crate) fn new(id: CustomerId, name: String, email: String) -> Self {
        Self { id, name, email }
    }

    pub fn id(&self) -> CustomerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Customer {}: {} <{}>", self.id, self.name, self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_details() {
        let customer = Customer::new(1, "John Doe".into(), "john.doe@example.com".into());
        assert_eq!(
            customer.to_string(),
            "Customer 1: John Doe <john.doe@example.com>"
        );
    }
}
