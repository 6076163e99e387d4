//! Clinical record snapshot.
//!
//! Read-only. Supplied by the host as JSON and attached to the session once the
//! user's identity matches.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A patient's clinical record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicalRecord {
    pub record_id: String,
    #[serde(default)]
    pub facility: Option<Facility>,
    pub patient: PatientIdentity,
    #[serde(default)]
    pub primary_care_physician: Option<CareContact>,
    #[serde(default)]
    pub care_team: Vec<CareContact>,
    #[serde(default)]
    pub vital_signs: Option<VitalSigns>,
    #[serde(default)]
    pub diagnoses: Vec<Diagnosis>,
    #[serde(default)]
    pub allergies: Vec<Allergy>,
    #[serde(default)]
    pub medications: Vec<RecordMedication>,
    #[serde(default)]
    pub lab_results: Vec<LabResult>,
    #[serde(default)]
    pub social_history: Option<SocialHistory>,
    #[serde(default)]
    pub last_encounter: Option<Encounter>,
    /// Document as supplied, including fields not modelled above
    #[serde(skip)]
    source: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Facility {
    pub name: String,
    pub npi: Option<String>,
    pub address: Option<String>,
}

/// Patient demographics and contact details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientIdentity {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub mrn: Option<String>,
    pub contact: ContactInfo,
    #[serde(default)]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default)]
    pub insurance: Option<Insurance>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactInfo {
    pub phone_primary: String,
    pub phone_secondary: Option<String>,
    pub email: Option<String>,
    pub address: PostalAddress,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostalAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: Option<String>,
}

impl PostalAddress {
    /// Single-line form: "street, city, state zip".
    pub fn one_line(&self) -> String {
        format!("{}, {}, {} {}", self.street, self.city, self.state, self.zip)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Insurance {
    pub primary: Option<InsurancePlan>,
    pub secondary: Option<InsurancePlan>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsurancePlan {
    pub provider: String,
    pub plan: Option<String>,
    pub member_id: Option<String>,
}

/// Physician or care-team member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CareContact {
    pub name: String,
    pub role: Option<String>,
    pub specialty: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VitalSigns {
    pub last_recorded: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub bmi: Option<f64>,
    pub blood_pressure_mmhg: Option<BloodPressure>,
    pub heart_rate_bpm: Option<u32>,
    pub oxygen_saturation_pct: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BloodPressure {
    pub systolic: u32,
    pub diastolic: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Diagnosis {
    pub icd10: String,
    pub description: String,
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Allergy {
    pub allergen: String,
    pub reaction: String,
    pub severity: String,
}

/// A medication listed on the record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordMedication {
    pub name: String,
    pub dose: String,
    pub frequency: String,
    pub indication: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    pub notes: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabResult {
    pub date: String,
    pub panel: String,
    /// Analyte name → value
    pub results: BTreeMap<String, f64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocialHistory {
    pub smoking_status: Option<String>,
    pub quit_date: Option<String>,
    pub alcohol_use: Option<String>,
    pub exercise: Option<String>,
    pub diet: Option<String>,
    pub occupation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Encounter {
    pub date: String,
    pub provider: String,
    pub assessment: Option<String>,
    #[serde(default)]
    pub plan: Vec<String>,
}

impl ClinicalRecord {
    /// Parse a record from host-supplied JSON, keeping the full document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let source: serde_json::Value = serde_json::from_str(json)?;
        let mut record: ClinicalRecord = serde_json::from_value(source.clone())?;
        record.source = Some(source);
        Ok(record)
    }

    /// "First Last".
    pub fn full_name(&self) -> String {
        format!("{} {}", self.patient.first_name, self.patient.last_name)
    }

    pub fn primary_phone(&self) -> &str {
        &self.patient.contact.phone_primary
    }

    pub fn address_line(&self) -> String {
        self.patient.contact.address.one_line()
    }

    /// Medications currently marked active.
    pub fn active_medications(&self) -> impl Iterator<Item = &RecordMedication> {
        self.medications.iter().filter(|m| m.active)
    }

    /// Record as JSON context for symptom evaluation. The host's document is
    /// passed through whole when the record came from JSON.
    pub fn to_context(&self) -> serde_json::Value {
        match &self.source {
            Some(source) => source.clone(),
            None => serde_json::to_value(self).unwrap_or(serde_json::Value::Null),
        }
    }
}
