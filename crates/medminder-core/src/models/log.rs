//! Medication log.
//!
//! Every symptom evaluation is recorded here, newest first. Entries are never
//! edited or pruned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use medminder_llm::DecisionOutcome;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("Invalid medication log JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Log entry {id}: {reason}")]
    InvalidEntry { id: String, reason: String },
}

/// One evaluated symptom report and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub medication_name: String,
    pub dosage: String,
    pub symptom_text: String,
    pub blood_pressure: Option<String>,
    pub outcome: DecisionOutcome,
    /// Alarm times when the report was made
    pub old_times: Vec<String>,
    /// Replacement times, present only when the outcome moved the alarm
    pub new_times: Option<Vec<String>>,
}

impl LogEntry {
    /// Whether the outcome escalated to the doctor.
    pub fn sent_to_doctor(&self) -> bool {
        self.outcome.is_see_doctor()
    }

    /// The outcome is well formed and `new_times` mirrors it.
    pub fn validate(&self) -> Result<(), LogError> {
        let invalid = |reason: &str| LogError::InvalidEntry {
            id: self.id.clone(),
            reason: reason.into(),
        };
        if !self.outcome.is_well_formed() {
            return Err(invalid("adjust_time requires new_times"));
        }
        if self.new_times.as_deref() != self.outcome.new_times() {
            return Err(invalid("new_times does not match the outcome"));
        }
        Ok(())
    }
}

/// Append-only log, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MedicationLog {
    entries: Vec<LogEntry>,
}

impl MedicationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from seed entries in any order.
    pub fn from_seed(mut entries: Vec<LogEntry>) -> Self {
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Self { entries }
    }

    /// Parse and validate seed entries from host-supplied JSON (an array of entries).
    pub fn from_json(json: &str) -> Result<Self, LogError> {
        let entries: Vec<LogEntry> = serde_json::from_str(json)?;
        for entry in &entries {
            entry.validate()?;
        }
        Ok(Self::from_seed(entries))
    }

    /// Record a new entry at the front.
    pub fn push(&mut self, entry: LogEntry) {
        self.entries.insert(0, entry);
    }

    pub fn get(&self, id: &str) -> Option<&LogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries escalated to the doctor.
    pub fn sent_to_doctor_count(&self) -> usize {
        self.entries.iter().filter(|e| e.sent_to_doctor()).count()
    }
}
