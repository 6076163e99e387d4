//! MedMinder Core Library
//!
//! Medication reminder session: prescription label capture, dosing alarms and
//! symptom triage against the patient's clinical record.
//!
//! # Architecture
//!
//! ```text
//! Login ──identity──▶ RecordLinker ──(linked | unlinked)──▶ Capture
//!                                                             │
//!                                          label photo ──▶ LabelExtractor ──▶ TimingAdvisor
//!                                                             │
//!                                                          Schedule ──▶ Alarm
//!                                                                         │
//!                                            symptom + BP + record ──▶ SymptomEvaluator
//!                                                                         │
//!                                    ┌────────────────────────────────────┼──────────────────┐
//!                                    ▼                                    ▼                  ▼
//!                               adjust_time                          see_doctor          no_change
//!                           (alarm times moved)                  (call_now/soon/next)   (nothing)
//!                                    └────────────────────────────────────┬──────────────────┘
//!                                                                         ▼
//!                                                                  Medication log
//! ```
//!
//! # Core Principle
//!
//! **A failed evaluation never moves an alarm.** Service or parse failures fall
//! back to `no_change`.
//!
//! # Modules
//!
//! - [`models`]: Domain types (MedicationCapture, LogEntry, ClinicalRecord, RiskComparison)
//! - [`linking`]: Exact identity-to-record matching
//! - [`flow`]: Screen-flow state machine
//! - [`session`]: Session controller driving the flow
//! - [`clock`]: Alarm time parsing
//! - [`logging`]: Tracing subscriber setup

pub mod clock;
pub mod flow;
pub mod linking;
pub mod logging;
pub mod models;
pub mod session;

// Re-export commonly used types
pub use flow::{FlowError, FlowEvent, FlowMachine, Screen};
pub use linking::{IdentityNormalizer, RecordLinker};
pub use models::{
    ClinicalRecord, Identity, LogEntry, MedicationCapture, MedicationLog, RiskComparison, User,
};
pub use session::{LoginOutcome, MedMinder};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use medminder_llm::{
    ClientConfig, ClinicalAdvisor, CompletionError, DecisionAction, HttpCompletionClient,
    LabelImage, RemoteAdvisor,
};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum MedMinderError {
    #[error("Flow error: {0}")]
    FlowError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<FlowError> for MedMinderError {
    fn from(e: FlowError) -> Self {
        MedMinderError::FlowError(e.to_string())
    }
}

impl From<CompletionError> for MedMinderError {
    fn from(e: CompletionError) -> Self {
        MedMinderError::ConfigError(e.to_string())
    }
}

impl From<serde_json::Error> for MedMinderError {
    fn from(e: serde_json::Error) -> Self {
        MedMinderError::SerializationError(e.to_string())
    }
}

impl From<models::RiskError> for MedMinderError {
    fn from(e: models::RiskError) -> Self {
        MedMinderError::InvalidInput(e.to_string())
    }
}

impl From<models::LogError> for MedMinderError {
    fn from(e: models::LogError) -> Self {
        MedMinderError::InvalidInput(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for MedMinderError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        MedMinderError::FlowError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Start a session backed by the remote completion service.
///
/// `config` falls back to `MEDMINDER_*` environment variables when absent. The
/// record, seed log and risk report are optional JSON documents supplied by the host.
#[uniffi::export]
pub fn open_session(
    config: Option<FfiClientConfig>,
    record_json: Option<String>,
    seed_log_json: Option<String>,
    risk_report_json: Option<String>,
) -> Result<Arc<MedMinderCore>, MedMinderError> {
    let config = match config {
        Some(ffi) => ffi.into_config(),
        None => ClientConfig::from_env()?,
    };
    let max_tokens = config.max_tokens;
    let client = HttpCompletionClient::new(config)?;
    let advisor = RemoteAdvisor::new(Arc::new(client)).with_max_tokens(max_tokens);

    let records = match record_json {
        Some(json) => vec![ClinicalRecord::from_json(&json)?],
        None => Vec::new(),
    };
    let mut session = MedMinder::new(Arc::new(advisor), RecordLinker::new(records));
    if let Some(json) = seed_log_json {
        session = session.with_log(MedicationLog::from_json(&json)?);
    }
    if let Some(json) = risk_report_json {
        session = session.with_risk(RiskComparison::from_json(&json)?);
    }

    tracing::info!("Session opened");
    Ok(MedMinderCore::from_session(session))
}

/// Install the tracing subscriber. Returns false if one is already installed.
#[uniffi::export]
pub fn init_logging(filter: Option<String>) -> bool {
    logging::try_init(filter.as_deref())
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe session wrapper for FFI.
#[derive(uniffi::Object)]
pub struct MedMinderCore {
    session: Mutex<MedMinder>,
}

impl MedMinderCore {
    /// Wrap an existing session, e.g. one built on a stub advisor.
    pub fn from_session(session: MedMinder) -> Arc<Self> {
        Arc::new(Self {
            session: Mutex::new(session),
        })
    }

    pub fn with_advisor(advisor: Arc<dyn ClinicalAdvisor>, records: Vec<ClinicalRecord>) -> Arc<Self> {
        Self::from_session(MedMinder::new(advisor, RecordLinker::new(records)))
    }
}

#[uniffi::export]
impl MedMinderCore {
    pub fn screen(&self) -> Result<FfiScreen, MedMinderError> {
        Ok(self.session.lock()?.screen().into())
    }

    // =========================================================================
    // Login
    // =========================================================================

    pub fn login(
        &self,
        name: String,
        phone: String,
        address: String,
    ) -> Result<FfiLoginOutcome, MedMinderError> {
        let mut session = self.session.lock()?;
        let outcome = session.login(Identity {
            name,
            phone,
            address,
        })?;
        Ok(outcome.into())
    }

    pub fn continue_without_record(&self) -> Result<FfiScreen, MedMinderError> {
        Ok(self.session.lock()?.continue_without_record()?.into())
    }

    pub fn get_user(&self) -> Result<Option<FfiUser>, MedMinderError> {
        Ok(self.session.lock()?.user().map(FfiUser::from))
    }

    // =========================================================================
    // Capture & Schedule
    // =========================================================================

    /// Extract labels in order. Blocks on the remote service.
    pub fn capture_labels(&self, images: Vec<FfiLabelImage>) -> Result<FfiScreen, MedMinderError> {
        let images = images
            .into_iter()
            .map(|i| LabelImage::new(i.bytes, &i.mime_type))
            .collect();
        Ok(self.session.lock()?.capture_labels(images)?.into())
    }

    pub fn show_schedule(&self) -> Result<FfiScreen, MedMinderError> {
        Ok(self.session.lock()?.show_schedule()?.into())
    }

    pub fn get_medications(&self) -> Result<Vec<FfiMedication>, MedMinderError> {
        let session = self.session.lock()?;
        Ok(session
            .medications()
            .iter()
            .enumerate()
            .map(|(i, m)| FfiMedication::new(i, m))
            .collect())
    }

    /// Returns the stored canonical time.
    pub fn update_time(
        &self,
        medication: u32,
        slot: u32,
        value: String,
    ) -> Result<String, MedMinderError> {
        let mut session = self.session.lock()?;
        Ok(session.update_time(medication as usize, slot as usize, &value)?)
    }

    // =========================================================================
    // Alarm & Evaluation
    // =========================================================================

    pub fn set_alarm(&self) -> Result<FfiScreen, MedMinderError> {
        Ok(self.session.lock()?.set_alarm()?.into())
    }

    pub fn get_active_medication(&self) -> Result<Option<FfiMedication>, MedMinderError> {
        let session = self.session.lock()?;
        let active = session.active_medication().and_then(|active| {
            session
                .medications()
                .iter()
                .position(|m| m.id == active.id)
                .map(|i| FfiMedication::new(i, active))
        });
        Ok(active)
    }

    /// Evaluate a symptom. Blocks on the remote service.
    pub fn submit_symptom(
        &self,
        symptom_text: String,
        blood_pressure: Option<String>,
    ) -> Result<FfiLogEntry, MedMinderError> {
        let mut session = self.session.lock()?;
        let entry = session.submit_symptom(&symptom_text, blood_pressure.as_deref())?;
        Ok(entry.into())
    }

    /// Entry shown on the conflict screen.
    pub fn get_last_entry(&self) -> Result<Option<FfiLogEntry>, MedMinderError> {
        Ok(self.session.lock()?.last_entry().cloned().map(FfiLogEntry::from))
    }

    // =========================================================================
    // Log & Navigation
    // =========================================================================

    pub fn get_log(&self) -> Result<Vec<FfiLogEntry>, MedMinderError> {
        let session = self.session.lock()?;
        Ok(session
            .log()
            .entries()
            .iter()
            .cloned()
            .map(FfiLogEntry::from)
            .collect())
    }

    pub fn select_log_entry(&self, id: String) -> Result<FfiScreen, MedMinderError> {
        Ok(self.session.lock()?.select_log_entry(&id)?.into())
    }

    pub fn get_selected_entry(&self) -> Result<Option<FfiLogEntry>, MedMinderError> {
        Ok(self
            .session
            .lock()?
            .selected_entry()
            .cloned()
            .map(FfiLogEntry::from))
    }

    pub fn done(&self) -> Result<FfiScreen, MedMinderError> {
        Ok(self.session.lock()?.done()?.into())
    }

    pub fn view_log(&self) -> Result<FfiScreen, MedMinderError> {
        Ok(self.session.lock()?.view_log()?.into())
    }

    pub fn back(&self) -> Result<FfiScreen, MedMinderError> {
        Ok(self.session.lock()?.back()?.into())
    }

    pub fn add_more(&self) -> Result<FfiScreen, MedMinderError> {
        Ok(self.session.lock()?.add_more()?.into())
    }

    pub fn open_risk(&self) -> Result<FfiScreen, MedMinderError> {
        Ok(self.session.lock()?.open_risk()?.into())
    }

    pub fn go_schedule(&self) -> Result<FfiScreen, MedMinderError> {
        Ok(self.session.lock()?.go_schedule()?.into())
    }

    // =========================================================================
    // Risk Report
    // =========================================================================

    pub fn get_risk_report(&self) -> Result<Option<FfiRiskReport>, MedMinderError> {
        Ok(self.session.lock()?.risk().map(FfiRiskReport::from))
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiScreen {
    Login,
    Capture,
    Schedule,
    Alarm,
    Conflict,
    Log,
    LogDetail,
    Risk,
}

impl From<Screen> for FfiScreen {
    fn from(screen: Screen) -> Self {
        match screen {
            Screen::Login => FfiScreen::Login,
            Screen::Capture => FfiScreen::Capture,
            Screen::Schedule => FfiScreen::Schedule,
            Screen::Alarm => FfiScreen::Alarm,
            Screen::Conflict => FfiScreen::Conflict,
            Screen::Log => FfiScreen::Log,
            Screen::LogDetail => FfiScreen::LogDetail,
            Screen::Risk => FfiScreen::Risk,
        }
    }
}

/// FFI-safe login result.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum FfiLoginOutcome {
    Linked { record_id: String },
    Unmatched,
}

impl From<LoginOutcome> for FfiLoginOutcome {
    fn from(outcome: LoginOutcome) -> Self {
        match outcome {
            LoginOutcome::Linked { record_id } => FfiLoginOutcome::Linked { record_id },
            LoginOutcome::Unmatched => FfiLoginOutcome::Unmatched,
        }
    }
}

/// FFI-safe client configuration. Absent fields take the built-in defaults.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiClientConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
}

impl FfiClientConfig {
    fn into_config(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            endpoint: self.endpoint.unwrap_or(defaults.endpoint),
            model: self.model.unwrap_or(defaults.model),
            api_key: self.api_key.filter(|k| !k.trim().is_empty()),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            timeout_secs: self.timeout_secs.or(defaults.timeout_secs),
        }
    }
}

/// FFI-safe user.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiUser {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub record_linked: bool,
}

impl From<&User> for FfiUser {
    fn from(user: &User) -> Self {
        Self {
            name: user.identity.name.clone(),
            phone: user.identity.phone.clone(),
            address: user.identity.address.clone(),
            record_linked: user.record_linked,
        }
    }
}

/// FFI-safe label photo.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLabelImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// FFI-safe medication capture.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedication {
    pub index: u32,
    pub id: String,
    pub status: String,
    pub error: Option<String>,
    pub medication_name: String,
    pub dosage: String,
    pub dosage_form: String,
    pub frequency: String,
    pub instructions: String,
    pub rx_number: Option<String>,
    pub qty: Option<String>,
    pub refill_by: Option<String>,
    pub prescriber: Option<String>,
    pub pharmacy: Option<String>,
    pub times: Vec<String>,
    pub reason: Option<String>,
    pub with_food: bool,
    pub avoid_driving: bool,
    pub warnings: Option<String>,
    pub previous_times: Option<Vec<String>>,
    pub conflict_resolved: bool,
}

impl FfiMedication {
    fn new(index: usize, capture: &MedicationCapture) -> Self {
        let fields = capture.fields.clone().unwrap_or_default();
        let timing = capture.timing.as_ref();
        Self {
            index: index as u32,
            id: capture.id.clone(),
            status: format!("{:?}", capture.status).to_lowercase(),
            error: capture.error.clone(),
            medication_name: capture.medication_name().to_string(),
            dosage: fields.dosage,
            dosage_form: fields.dosage_form,
            frequency: fields.frequency,
            instructions: fields.instructions,
            rx_number: fields.rx_number,
            qty: fields.qty,
            refill_by: fields.refill_by,
            prescriber: fields.prescriber,
            pharmacy: fields.pharmacy,
            times: capture.times().to_vec(),
            reason: timing.map(|t| t.reason.clone()),
            with_food: timing.map(|t| t.with_food).unwrap_or(false),
            avoid_driving: timing.map(|t| t.avoid_driving).unwrap_or(false),
            warnings: timing.and_then(|t| t.warnings.clone()),
            previous_times: capture.previous_times.clone(),
            conflict_resolved: capture.conflict_resolved,
        }
    }
}

/// FFI-safe log entry. The decision payload is flattened; fields that do not
/// apply to `action` are `None`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLogEntry {
    pub id: String,
    pub timestamp: String,
    pub medication_name: String,
    pub dosage: String,
    pub symptom_text: String,
    pub blood_pressure: Option<String>,
    pub action: String,
    pub classification: String,
    pub urgency: String,
    pub summary: String,
    pub conflict_detail: Option<String>,
    pub adjust_reason: Option<String>,
    pub doctor_reason: Option<String>,
    pub doctor_urgency: Option<String>,
    pub doctor_message: Option<String>,
    pub note: Option<String>,
    pub old_times: Vec<String>,
    pub new_times: Option<Vec<String>>,
    pub sent_to_doctor: bool,
}

impl From<LogEntry> for FfiLogEntry {
    fn from(entry: LogEntry) -> Self {
        let sent_to_doctor = entry.sent_to_doctor();
        let outcome = entry.outcome;
        let action = outcome.action.label().to_string();

        let mut ffi = Self {
            id: entry.id,
            timestamp: entry.timestamp.to_rfc3339(),
            medication_name: entry.medication_name,
            dosage: entry.dosage,
            symptom_text: entry.symptom_text,
            blood_pressure: entry.blood_pressure,
            action,
            classification: outcome.classification.as_str().to_string(),
            urgency: outcome.urgency.as_str().to_string(),
            summary: outcome.summary,
            conflict_detail: None,
            adjust_reason: None,
            doctor_reason: None,
            doctor_urgency: None,
            doctor_message: None,
            note: None,
            old_times: entry.old_times,
            new_times: entry.new_times,
            sent_to_doctor,
        };

        match outcome.action {
            DecisionAction::AdjustTime {
                adjust_reason,
                conflict_detail,
                ..
            } => {
                ffi.adjust_reason = adjust_reason;
                ffi.conflict_detail = conflict_detail;
            }
            DecisionAction::SeeDoctor {
                conflict_detail,
                doctor_reason,
                doctor_urgency,
                doctor_message,
            } => {
                ffi.conflict_detail = conflict_detail;
                ffi.doctor_reason = doctor_reason;
                ffi.doctor_urgency = Some(doctor_urgency.as_str().to_string());
                ffi.doctor_message = doctor_message;
            }
            DecisionAction::NoChange { note } => ffi.note = note,
        }
        ffi
    }
}

/// FFI-safe risk snapshot header.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRiskSnapshot {
    pub label: String,
    pub date: String,
    pub basis: String,
    pub overall: u32,
    pub tier: String,
    pub key_flags: Vec<String>,
}

impl From<&models::RiskSnapshot> for FfiRiskSnapshot {
    fn from(snapshot: &models::RiskSnapshot) -> Self {
        Self {
            label: snapshot.label.clone(),
            date: snapshot.date.clone(),
            basis: snapshot.basis.clone(),
            overall: snapshot.overall,
            tier: snapshot.tier.clone(),
            key_flags: snapshot.key_flags.clone(),
        }
    }
}

/// FFI-safe per-domain comparison.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDomainDelta {
    pub name: String,
    pub before: u32,
    pub after: u32,
    pub delta: i32,
    pub note: String,
}

/// FFI-safe risk report.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRiskReport {
    pub before: FfiRiskSnapshot,
    pub after: FfiRiskSnapshot,
    pub overall_delta: i32,
    pub domains: Vec<FfiDomainDelta>,
}

impl From<&RiskComparison> for FfiRiskReport {
    fn from(report: &RiskComparison) -> Self {
        let domains = report
            .domain_deltas()
            .into_iter()
            .zip(&report.after.domains)
            .map(|(delta, after)| FfiDomainDelta {
                name: delta.name,
                before: delta.before,
                after: delta.after,
                delta: delta.delta,
                note: after.note.clone(),
            })
            .collect();
        Self {
            before: (&report.before).into(),
            after: (&report.after).into(),
            overall_delta: report.overall_delta(),
            domains,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medminder_llm::config::DEFAULT_TIMEOUT_SECS;

    #[test]
    fn test_ffi_config_keeps_default_timeout() {
        let config = FfiClientConfig::default().into_config();
        assert_eq!(config.timeout_secs, Some(DEFAULT_TIMEOUT_SECS));

        let config = FfiClientConfig {
            timeout_secs: Some(15),
            ..Default::default()
        }
        .into_config();
        assert_eq!(config.timeout_secs, Some(15));
    }

    #[test]
    fn test_open_session_rejects_malformed_seed_log() {
        let seed = r#"[{"id":"bad","timestamp":"2026-02-18T07:30:00Z","medication_name":"Metformin","dosage":"500 mg","symptom_text":"nausea","blood_pressure":null,"outcome":{"action":"adjust_time","new_times":[],"adjust_reason":null,"conflict_detail":null,"classification":"timing_side_effect","urgency":"medium","summary":"Alarm updated"},"old_times":["8:00 AM"],"new_times":[]}]"#;
        let result = open_session(
            Some(FfiClientConfig::default()),
            None,
            Some(seed.to_string()),
            None,
        );
        assert!(matches!(result, Err(MedMinderError::InvalidInput(_))));
    }
}
