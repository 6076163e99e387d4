//! Record linking.
//!
//! Identity entered at login is compared against the known clinical records.
//! Name, phone and address are normalized independently and all three must
//! match exactly. No fuzzy scoring: a partial match is a non-match.

mod normalizer;

pub use normalizer::*;

use crate::models::{ClinicalRecord, Identity};

/// Per-field match result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityMatch {
    pub name: bool,
    pub phone: bool,
    pub address: bool,
}

impl IdentityMatch {
    pub fn is_full(&self) -> bool {
        self.name && self.phone && self.address
    }
}

/// Looks up clinical records by identity.
#[derive(Debug, Clone, Default)]
pub struct RecordLinker {
    records: Vec<ClinicalRecord>,
    normalizer: IdentityNormalizer,
}

impl RecordLinker {
    pub fn new(records: Vec<ClinicalRecord>) -> Self {
        Self {
            records,
            normalizer: IdentityNormalizer::new(),
        }
    }

    /// Compare an identity against one record field by field.
    pub fn compare(&self, identity: &Identity, record: &ClinicalRecord) -> IdentityMatch {
        let entered = self.normalizer.normalize(identity);
        let known = self.normalizer.normalize_record(record);
        IdentityMatch {
            name: entered.name == known.name,
            // An all-punctuation phone never matches
            phone: !entered.phone.is_empty() && entered.phone == known.phone,
            address: entered.address == known.address,
        }
    }

    /// First record whose identity fully matches.
    pub fn link(&self, identity: &Identity) -> Option<&ClinicalRecord> {
        let found = self
            .records
            .iter()
            .find(|record| self.compare(identity, record).is_full());
        match found {
            Some(record) => {
                tracing::info!(record_id = %record.record_id, "Identity linked to clinical record")
            }
            None => {
                tracing::info!(known_records = self.records.len(), "No clinical record matched identity")
            }
        }
        found
    }

    pub fn records(&self) -> &[ClinicalRecord] {
        &self.records
    }
}
