//! Inputs and outputs of the three remote operations.

use serde::{Deserialize, Serialize};

/// A photographed prescription label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl LabelImage {
    /// Wrap image bytes; a blank MIME type is treated as JPEG.
    pub fn new(bytes: Vec<u8>, mime_type: &str) -> Self {
        let mime_type = mime_type.trim();
        Self {
            bytes,
            mime_type: if mime_type.is_empty() {
                "image/jpeg".into()
            } else {
                mime_type.to_string()
            },
        }
    }
}

/// Fields read off a prescription label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LabelFields {
    pub medication_name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub dosage_form: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub instructions: String,
    pub rx_number: Option<String>,
    pub qty: Option<String>,
    pub refill_by: Option<String>,
    pub prescriber: Option<String>,
    pub pharmacy: Option<String>,
}

/// Result of a label extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelReading {
    Fields(LabelFields),
    /// No medication name could be read; terminal for that capture
    Unreadable,
}

impl LabelReading {
    pub fn fields(&self) -> Option<&LabelFields> {
        match self {
            LabelReading::Fields(fields) => Some(fields),
            LabelReading::Unreadable => None,
        }
    }
}

/// Recommended dosing times for one medication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingSuggestion {
    pub times: Vec<String>,
    pub reason: String,
    pub with_food: bool,
    pub avoid_driving: bool,
    pub warnings: Option<String>,
}

impl TimingSuggestion {
    /// Single morning slot used when no recommendation is available.
    pub fn fallback() -> Self {
        Self {
            times: vec!["8:00 AM".into()],
            reason: "Default morning".into(),
            with_food: false,
            avoid_driving: false,
            warnings: None,
        }
    }
}

/// A symptom reported against an active alarm.
#[derive(Debug, Clone, PartialEq)]
pub struct SymptomReport {
    pub symptom_text: String,
    pub medication_name: String,
    pub dosage: String,
    pub current_times: Vec<String>,
    /// Clinical record snapshot, present only when the session is record-linked
    pub clinical_record: Option<serde_json::Value>,
    /// Patient-reported blood pressure, e.g. "190/112"
    pub blood_pressure: Option<String>,
}

/// How the symptom relates to the medication.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SymptomClass {
    TimingSideEffect,
    SeriousAdverse,
    DrugIneffective,
    Unrelated,
    #[serde(other)]
    Ambiguous,
}

impl SymptomClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymptomClass::TimingSideEffect => "timing_side_effect",
            SymptomClass::SeriousAdverse => "serious_adverse",
            SymptomClass::DrugIneffective => "drug_ineffective",
            SymptomClass::Unrelated => "unrelated",
            SymptomClass::Ambiguous => "ambiguous",
        }
    }
}

/// Coarse urgency shown to the patient.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::High => "high",
            Urgency::Medium => "medium",
            Urgency::Low => "low",
        }
    }
}

/// How soon the doctor should be contacted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DoctorUrgency {
    CallNow,
    CallSoon,
    NextAppointment,
}

impl DoctorUrgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoctorUrgency::CallNow => "call_now",
            DoctorUrgency::CallSoon => "call_soon",
            DoctorUrgency::NextAppointment => "next_appointment",
        }
    }
}

/// The action chosen by the decision policy. Exactly one payload per outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DecisionAction {
    AdjustTime {
        new_times: Vec<String>,
        adjust_reason: Option<String>,
        conflict_detail: Option<String>,
    },
    SeeDoctor {
        conflict_detail: Option<String>,
        doctor_reason: Option<String>,
        doctor_urgency: DoctorUrgency,
        doctor_message: Option<String>,
    },
    NoChange {
        note: Option<String>,
    },
}

impl DecisionAction {
    /// Wire label of the action.
    pub fn label(&self) -> &'static str {
        match self {
            DecisionAction::AdjustTime { .. } => "adjust_time",
            DecisionAction::SeeDoctor { .. } => "see_doctor",
            DecisionAction::NoChange { .. } => "no_change",
        }
    }
}

/// Outcome of a symptom evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionOutcome {
    #[serde(flatten)]
    pub action: DecisionAction,
    pub classification: SymptomClass,
    pub urgency: Urgency,
    pub summary: String,
}

impl DecisionOutcome {
    /// Least disruptive outcome, used whenever evaluation fails.
    pub fn fallback() -> Self {
        Self {
            action: DecisionAction::NoChange { note: None },
            classification: SymptomClass::Ambiguous,
            urgency: Urgency::Low,
            summary: "No changes needed.".into(),
        }
    }

    pub fn is_see_doctor(&self) -> bool {
        matches!(self.action, DecisionAction::SeeDoctor { .. })
    }

    /// Replacement alarm times, if the outcome moves the alarm.
    pub fn new_times(&self) -> Option<&[String]> {
        match &self.action {
            DecisionAction::AdjustTime { new_times, .. } => Some(new_times),
            _ => None,
        }
    }

    /// An outcome that moves the alarm names at least one non-blank time.
    pub fn is_well_formed(&self) -> bool {
        match self.new_times() {
            Some(times) => !times.is_empty() && times.iter().all(|t| !t.trim().is_empty()),
            None => true,
        }
    }
}
