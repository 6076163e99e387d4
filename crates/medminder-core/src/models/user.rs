//! Session user models.

use serde::{Deserialize, Serialize};

/// Identity fields entered at login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub phone: String,
    pub address: String,
}

impl Identity {
    pub fn new(name: &str, phone: &str, address: &str) -> Self {
        Self {
            name: name.to_string(),
            phone: phone.to_string(),
            address: address.to_string(),
        }
    }

    /// Name of the first blank field, if any.
    pub fn blank_field(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            Some("name")
        } else if self.phone.trim().is_empty() {
            Some("phone")
        } else if self.address.trim().is_empty() {
            Some("address")
        } else {
            None
        }
    }
}

/// The logged-in user. Lives for the session only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub identity: Identity,
    /// Whether a clinical record was attached at login
    pub record_linked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_field() {
        assert_eq!(Identity::new("A", "1", "x").blank_field(), None);
        assert_eq!(Identity::new("  ", "1", "x").blank_field(), Some("name"));
        assert_eq!(Identity::new("A", "", "x").blank_field(), Some("phone"));
        assert_eq!(Identity::new("A", "1", "\t").blank_field(), Some("address"));
    }
}
