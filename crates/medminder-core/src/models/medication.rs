//! Medication capture models.

use serde::{Deserialize, Serialize};

use medminder_llm::{LabelFields, LabelImage, TimingSuggestion};

/// Message recorded on a capture whose label could not be read.
pub const UNREADABLE_LABEL: &str = "Could not read label";

/// Processing status of a capture.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStatus {
    /// Submitted, extraction not finished
    Pending,
    /// Fields extracted and timing suggested
    Done,
    /// Label unreadable; excluded from scheduling
    Error,
}

/// A prescription label captured during the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationCapture {
    /// Unique capture ID
    pub id: String,
    /// Photographed label
    pub source: LabelImage,
    /// Extracted label fields (None until done)
    pub fields: Option<LabelFields>,
    /// Current dosing schedule
    pub timing: Option<TimingSuggestion>,
    /// Processing status
    pub status: CaptureStatus,
    /// Why the capture failed, if it did
    pub error: Option<String>,
    /// Times before the last automatic adjustment
    pub previous_times: Option<Vec<String>>,
    /// Set once a symptom evaluation moved this alarm
    pub conflict_resolved: bool,
    /// Creation timestamp
    pub created_at: String,
}

impl MedicationCapture {
    /// Create a pending capture for a submitted image.
    pub fn new(source: LabelImage) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source,
            fields: None,
            timing: None,
            status: CaptureStatus::Pending,
            error: None,
            previous_times: None,
            conflict_resolved: false,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Record a successful extraction.
    pub fn complete(&mut self, fields: LabelFields, timing: TimingSuggestion) {
        self.fields = Some(fields);
        self.timing = Some(timing);
        self.status = CaptureStatus::Done;
        self.error = None;
    }

    /// Record an unreadable label. Terminal for this capture.
    pub fn mark_unreadable(&mut self) {
        self.status = CaptureStatus::Error;
        self.error = Some(UNREADABLE_LABEL.into());
    }

    pub fn is_done(&self) -> bool {
        self.status == CaptureStatus::Done
    }

    pub fn medication_name(&self) -> &str {
        self.fields
            .as_ref()
            .map(|f| f.medication_name.as_str())
            .unwrap_or("Unknown")
    }

    pub fn dosage(&self) -> &str {
        self.fields.as_ref().map(|f| f.dosage.as_str()).unwrap_or("")
    }

    /// Current alarm times (empty until done).
    pub fn times(&self) -> &[String] {
        self.timing
            .as_ref()
            .map(|t| t.times.as_slice())
            .unwrap_or(&[])
    }

    /// Replace the alarm times after an `adjust_time` outcome, remembering the old ones.
    pub fn apply_adjusted_times(&mut self, new_times: Vec<String>) {
        let old = self.times().to_vec();
        if let Some(timing) = self.timing.as_mut() {
            timing.times = new_times;
            self.previous_times = Some(old);
            self.conflict_resolved = true;
        }
    }

    /// Overwrite a single alarm slot. Returns false if the slot does not exist.
    pub fn set_time(&mut self, slot: usize, value: String) -> bool {
        match self.timing.as_mut().and_then(|t| t.times.get_mut(slot)) {
            Some(time) => {
                *time = value;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done_capture() -> MedicationCapture {
        let mut capture = MedicationCapture::new(LabelImage::new(vec![1, 2], "image/jpeg"));
        capture.complete(
            LabelFields {
                medication_name: "Metformin".into(),
                dosage: "1000 mg".into(),
                ..LabelFields::default()
            },
            TimingSuggestion {
                times: vec!["7:00 AM".into(), "7:00 PM".into()],
                reason: "Twice daily".into(),
                with_food: false,
                avoid_driving: false,
                warnings: None,
            },
        );
        capture
    }

    #[test]
    fn test_new_capture_is_pending() {
        let capture = MedicationCapture::new(LabelImage::new(vec![], ""));
        assert_eq!(capture.status, CaptureStatus::Pending);
        assert_eq!(capture.id.len(), 36); // UUID format
        assert!(capture.times().is_empty());
        assert_eq!(capture.medication_name(), "Unknown");
    }

    #[test]
    fn test_unreadable() {
        let mut capture = MedicationCapture::new(LabelImage::new(vec![], ""));
        capture.mark_unreadable();
        assert_eq!(capture.status, CaptureStatus::Error);
        assert_eq!(capture.error.as_deref(), Some(UNREADABLE_LABEL));
        assert!(!capture.is_done());
    }

    #[test]
    fn test_apply_adjusted_times() {
        let mut capture = done_capture();
        capture.apply_adjusted_times(vec!["8:00 AM".into(), "6:00 PM".into()]);

        assert_eq!(capture.times(), &["8:00 AM".to_string(), "6:00 PM".to_string()]);
        assert_eq!(
            capture.previous_times,
            Some(vec!["7:00 AM".to_string(), "7:00 PM".to_string()])
        );
        assert!(capture.conflict_resolved);
    }

    #[test]
    fn test_set_time() {
        let mut capture = done_capture();
        assert!(capture.set_time(1, "9:00 PM".into()));
        assert_eq!(capture.times()[1], "9:00 PM");
        assert!(!capture.set_time(5, "9:00 PM".into()));
        assert!(capture.previous_times.is_none());
    }
}
