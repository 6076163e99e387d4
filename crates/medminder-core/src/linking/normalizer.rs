//! Identity field normalizer.
//!
//! Handles:
//! - Names and addresses: surrounding whitespace trimmed, case folded
//! - Phone numbers: punctuation and spacing dropped, digits kept

use crate::models::{ClinicalRecord, Identity};

/// Identity with every field in comparable form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedIdentity {
    pub name: String,
    pub phone: String,
    pub address: String,
}

/// Normalizer for identity fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityNormalizer;

impl IdentityNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize fields entered at login.
    pub fn normalize(&self, identity: &Identity) -> NormalizedIdentity {
        NormalizedIdentity {
            name: self.normalize_text(&identity.name),
            phone: self.normalize_phone(&identity.phone),
            address: self.normalize_text(&identity.address),
        }
    }

    /// Normalize the identity held on a clinical record.
    pub fn normalize_record(&self, record: &ClinicalRecord) -> NormalizedIdentity {
        NormalizedIdentity {
            name: self.normalize_text(&record.full_name()),
            phone: self.normalize_phone(record.primary_phone()),
            address: self.normalize_text(&record.address_line()),
        }
    }

    pub fn normalize_text(&self, text: &str) -> String {
        text.trim().to_lowercase()
    }

    /// "217-555-0194", "(217) 555 0194" and "2175550194" all become "2175550194".
    pub fn normalize_phone(&self, phone: &str) -> String {
        phone.chars().filter(|c| c.is_ascii_digit()).collect()
    }
}
