//! Session controller.
//!
//! Owns all session state: the logged-in user, the linked record, captured
//! medications, the log and the current screen. Each operation checks the
//! flow first and returns an error without touching state if it is refused.

use std::sync::Arc;

use chrono::Utc;

use medminder_llm::{ClinicalAdvisor, LabelImage, LabelReading, SymptomReport};

use crate::clock::canonical_time;
use crate::flow::{FlowError, FlowEvent, FlowMachine, FlowResult, Screen};
use crate::linking::RecordLinker;
use crate::models::{
    ClinicalRecord, Identity, LogEntry, MedicationCapture, MedicationLog, RiskComparison, User,
};

/// Symptom text used when the user submits nothing.
pub const DEFAULT_SYMPTOM: &str = "Took medication, feeling fine.";

/// Result of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Identity matched a record; the session moved on to capture.
    Linked { record_id: String },
    /// No record matched. Still on login until the user proceeds without one.
    Unmatched,
}

/// One user's session.
pub struct MedMinder {
    advisor: Arc<dyn ClinicalAdvisor>,
    linker: RecordLinker,
    flow: FlowMachine,
    user: Option<User>,
    pending_identity: Option<Identity>,
    linked_record: Option<ClinicalRecord>,
    medications: Vec<MedicationCapture>,
    active: Option<usize>,
    log: MedicationLog,
    last_entry: Option<String>,
    selected_entry: Option<String>,
    risk: Option<RiskComparison>,
}

impl MedMinder {
    pub fn new(advisor: Arc<dyn ClinicalAdvisor>, linker: RecordLinker) -> Self {
        Self {
            advisor,
            linker,
            flow: FlowMachine::new(),
            user: None,
            pending_identity: None,
            linked_record: None,
            medications: Vec::new(),
            active: None,
            log: MedicationLog::new(),
            last_entry: None,
            selected_entry: None,
            risk: None,
        }
    }

    /// Start with seeded log entries.
    pub fn with_log(mut self, log: MedicationLog) -> Self {
        self.log = log;
        self
    }

    pub fn with_risk(mut self, risk: RiskComparison) -> Self {
        self.risk = Some(risk);
        self
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Try to link the entered identity to a clinical record.
    pub fn login(&mut self, identity: Identity) -> FlowResult<LoginOutcome> {
        self.flow.peek(FlowEvent::IdentitySubmitted)?;
        if let Some(field) = identity.blank_field() {
            return Err(FlowError::MissingIdentityField(field));
        }

        let Some(record) = self.linker.link(&identity).cloned() else {
            self.user = None;
            self.linked_record = None;
            self.pending_identity = Some(identity);
            return Ok(LoginOutcome::Unmatched);
        };

        let record_id = record.record_id.clone();
        self.user = Some(User {
            identity,
            record_linked: true,
        });
        self.pending_identity = None;
        self.linked_record = Some(record);
        self.flow.fire(FlowEvent::IdentitySubmitted)?;
        Ok(LoginOutcome::Linked { record_id })
    }

    /// Proceed after an unmatched login, without a clinical record.
    pub fn continue_without_record(&mut self) -> FlowResult<Screen> {
        self.flow.peek(FlowEvent::IdentitySubmitted)?;
        let identity = self
            .pending_identity
            .take()
            .ok_or(FlowError::NoPendingIdentity)?;

        self.user = Some(User {
            identity,
            record_linked: false,
        });
        self.linked_record = None;
        self.flow.fire(FlowEvent::IdentitySubmitted)
    }

    // =========================================================================
    // Capture & schedule
    // =========================================================================

    /// Extract each label in submission order, then move to the schedule if any
    /// capture is done. Unreadable labels stay in the list marked as errors.
    pub fn capture_labels(&mut self, images: Vec<LabelImage>) -> FlowResult<Screen> {
        self.require(Screen::Capture, "capture")?;

        for image in images {
            let mut capture = MedicationCapture::new(image);
            match self.advisor.extract_label(&capture.source) {
                LabelReading::Fields(fields) => {
                    let timing = self.advisor.suggest_timing(&fields);
                    capture.complete(fields, timing);
                }
                LabelReading::Unreadable => capture.mark_unreadable(),
            }
            tracing::info!(capture_id = %capture.id, status = ?capture.status, "Capture processed");
            self.medications.push(capture);
        }

        if self.has_done_capture() {
            self.flow.fire(FlowEvent::CapturesReady)
        } else {
            Ok(self.flow.screen())
        }
    }

    /// Move from capture to the schedule without adding anything.
    pub fn show_schedule(&mut self) -> FlowResult<Screen> {
        self.flow.peek(FlowEvent::CapturesReady)?;
        if !self.has_done_capture() {
            return Err(FlowError::NoCapturesReady);
        }
        self.flow.fire(FlowEvent::CapturesReady)
    }

    /// Edit one alarm time on the schedule. Stored in canonical "h:mm AM" form.
    pub fn update_time(&mut self, medication: usize, slot: usize, value: &str) -> FlowResult<String> {
        self.require(Screen::Schedule, "update_time")?;
        let time = canonical_time(value).ok_or_else(|| FlowError::InvalidTime(value.to_string()))?;
        let capture = self
            .medications
            .get_mut(medication)
            .ok_or(FlowError::UnknownMedication(medication))?;
        if !capture.set_time(slot, time.clone()) {
            return Err(FlowError::UnknownTimeSlot { medication, slot });
        }
        Ok(time)
    }

    // =========================================================================
    // Alarm & evaluation
    // =========================================================================

    /// Fire the alarm for the first done medication.
    pub fn set_alarm(&mut self) -> FlowResult<Screen> {
        self.flow.peek(FlowEvent::SetAlarm)?;
        let index = self
            .medications
            .iter()
            .position(MedicationCapture::is_done)
            .ok_or(FlowError::NoActiveMedication)?;
        self.active = Some(index);
        self.flow.fire(FlowEvent::SetAlarm)
    }

    /// Evaluate a symptom against the active medication and record the outcome.
    ///
    /// An `adjust_time` outcome replaces the medication's times. Every outcome
    /// lands at the front of the log.
    pub fn submit_symptom(
        &mut self,
        symptom_text: &str,
        blood_pressure: Option<&str>,
    ) -> FlowResult<LogEntry> {
        self.flow.peek(FlowEvent::EvaluationResolved)?;
        let index = self.active.ok_or(FlowError::NoActiveMedication)?;
        let capture = self
            .medications
            .get(index)
            .ok_or(FlowError::NoActiveMedication)?;

        let symptom_text = match symptom_text.trim() {
            "" => DEFAULT_SYMPTOM.to_string(),
            text => text.to_string(),
        };
        let blood_pressure = blood_pressure
            .map(str::trim)
            .filter(|bp| !bp.is_empty())
            .map(str::to_string);

        let report = SymptomReport {
            symptom_text: symptom_text.clone(),
            medication_name: capture.medication_name().to_string(),
            dosage: capture.dosage().to_string(),
            current_times: capture.times().to_vec(),
            clinical_record: self.linked_record.as_ref().map(ClinicalRecord::to_context),
            blood_pressure: blood_pressure.clone(),
        };
        let outcome = self.advisor.evaluate_symptom(&report);

        let new_times = outcome.new_times().map(<[String]>::to_vec);
        if let Some(times) = &new_times {
            if let Some(capture) = self.medications.get_mut(index) {
                capture.apply_adjusted_times(times.clone());
            }
        }

        let entry = LogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            medication_name: report.medication_name,
            dosage: report.dosage,
            symptom_text,
            blood_pressure,
            outcome,
            old_times: report.current_times,
            new_times,
        };
        tracing::info!(
            entry_id = %entry.id,
            action = entry.outcome.action.label(),
            "Symptom evaluated"
        );

        self.last_entry = Some(entry.id.clone());
        self.log.push(entry.clone());
        self.flow.fire(FlowEvent::EvaluationResolved)?;
        Ok(entry)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Leave the conflict screen for the schedule.
    pub fn done(&mut self) -> FlowResult<Screen> {
        self.flow.fire(FlowEvent::Done)
    }

    pub fn view_log(&mut self) -> FlowResult<Screen> {
        self.flow.fire(FlowEvent::ViewLog)
    }

    /// Open one log entry. Read-only.
    pub fn select_log_entry(&mut self, id: &str) -> FlowResult<Screen> {
        self.flow.peek(FlowEvent::SelectEntry)?;
        if self.log.get(id).is_none() {
            return Err(FlowError::UnknownLogEntry(id.to_string()));
        }
        self.selected_entry = Some(id.to_string());
        self.flow.fire(FlowEvent::SelectEntry)
    }

    pub fn back(&mut self) -> FlowResult<Screen> {
        let from = self.flow.screen();
        let to = self.flow.fire(FlowEvent::Back)?;
        if from == Screen::LogDetail {
            self.selected_entry = None;
        }
        Ok(to)
    }

    pub fn add_more(&mut self) -> FlowResult<Screen> {
        self.flow.fire(FlowEvent::AddMore)
    }

    pub fn open_risk(&mut self) -> FlowResult<Screen> {
        self.flow.fire(FlowEvent::OpenRisk)
    }

    pub fn go_schedule(&mut self) -> FlowResult<Screen> {
        self.flow.fire(FlowEvent::GoSchedule)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn screen(&self) -> Screen {
        self.flow.screen()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn linked_record(&self) -> Option<&ClinicalRecord> {
        self.linked_record.as_ref()
    }

    pub fn medications(&self) -> &[MedicationCapture] {
        &self.medications
    }

    /// Medication the alarm was set on.
    pub fn active_medication(&self) -> Option<&MedicationCapture> {
        self.active.and_then(|i| self.medications.get(i))
    }

    pub fn log(&self) -> &MedicationLog {
        &self.log
    }

    /// Entry produced by the most recent evaluation, shown on the conflict screen.
    pub fn last_entry(&self) -> Option<&LogEntry> {
        self.last_entry.as_deref().and_then(|id| self.log.get(id))
    }

    pub fn selected_entry(&self) -> Option<&LogEntry> {
        self.selected_entry.as_deref().and_then(|id| self.log.get(id))
    }

    pub fn risk(&self) -> Option<&RiskComparison> {
        self.risk.as_ref()
    }

    fn has_done_capture(&self) -> bool {
        self.medications.iter().any(MedicationCapture::is_done)
    }

    fn require(&self, screen: Screen, operation: &'static str) -> FlowResult<()> {
        if self.flow.screen() != screen {
            return Err(FlowError::NotAvailable {
                screen: self.flow.screen(),
                operation,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medminder_llm::{DecisionOutcome, FixedAdvisor, LabelFields, TimingSuggestion};

    fn advisor(reading: LabelReading) -> Arc<FixedAdvisor> {
        Arc::new(FixedAdvisor {
            reading,
            timing: TimingSuggestion {
                times: vec!["7:00 AM".into(), "7:00 PM".into()],
                reason: "Twice daily".into(),
                with_food: true,
                avoid_driving: false,
                warnings: None,
            },
            outcome: DecisionOutcome::fallback(),
        })
    }

    fn readable() -> LabelReading {
        LabelReading::Fields(LabelFields {
            medication_name: "Metformin".into(),
            dosage: "1000 mg".into(),
            ..LabelFields::default()
        })
    }

    fn logged_in(reading: LabelReading) -> MedMinder {
        let mut session = MedMinder::new(advisor(reading), RecordLinker::default());
        let outcome = session.login(Identity::new("Ada", "555", "1 Main St")).unwrap();
        assert_eq!(outcome, LoginOutcome::Unmatched);
        session.continue_without_record().unwrap();
        session
    }

    #[test]
    fn test_blank_identity_rejected() {
        let mut session = MedMinder::new(advisor(readable()), RecordLinker::default());
        let err = session.login(Identity::new("Ada", " ", "x")).unwrap_err();
        assert_eq!(err, FlowError::MissingIdentityField("phone"));
        assert_eq!(session.screen(), Screen::Login);
        assert_eq!(
            session.continue_without_record().unwrap_err(),
            FlowError::NoPendingIdentity
        );
    }

    #[test]
    fn test_unlinked_user() {
        let session = logged_in(readable());
        assert_eq!(session.screen(), Screen::Capture);
        assert!(!session.user().unwrap().record_linked);
        assert!(session.linked_record().is_none());
    }

    #[test]
    fn test_unreadable_capture_stays_on_capture() {
        let mut session = logged_in(LabelReading::Unreadable);
        let screen = session
            .capture_labels(vec![LabelImage::new(vec![0], "image/png")])
            .unwrap();

        assert_eq!(screen, Screen::Capture);
        assert_eq!(session.medications().len(), 1);
        assert!(!session.medications()[0].is_done());
        assert_eq!(session.show_schedule().unwrap_err(), FlowError::NoCapturesReady);
    }

    #[test]
    fn test_update_time() {
        let mut session = logged_in(readable());
        session
            .capture_labels(vec![LabelImage::new(vec![0], "")])
            .unwrap();
        assert_eq!(session.screen(), Screen::Schedule);

        assert_eq!(session.update_time(0, 1, "20:30").unwrap(), "8:30 PM");
        assert_eq!(session.medications()[0].times()[1], "8:30 PM");

        assert!(matches!(
            session.update_time(0, 1, "later"),
            Err(FlowError::InvalidTime(_))
        ));
        assert_eq!(
            session.update_time(3, 0, "8:00 AM").unwrap_err(),
            FlowError::UnknownMedication(3)
        );
        assert_eq!(
            session.update_time(0, 2, "8:00 AM").unwrap_err(),
            FlowError::UnknownTimeSlot {
                medication: 0,
                slot: 2
            }
        );
        assert_eq!(session.medications()[0].times()[1], "8:30 PM");
    }

    #[test]
    fn test_update_time_only_on_schedule() {
        let mut session = logged_in(readable());
        assert!(matches!(
            session.update_time(0, 0, "8:00 AM"),
            Err(FlowError::NotAvailable { screen: Screen::Capture, .. })
        ));
    }

    #[test]
    fn test_blank_symptom_uses_default() {
        let mut session = logged_in(readable());
        session
            .capture_labels(vec![LabelImage::new(vec![0], "")])
            .unwrap();
        session.set_alarm().unwrap();

        let entry = session.submit_symptom("   ", Some(" ")).unwrap();
        assert_eq!(entry.symptom_text, DEFAULT_SYMPTOM);
        assert_eq!(entry.blood_pressure, None);
        assert_eq!(session.screen(), Screen::Conflict);
        assert_eq!(session.last_entry().map(|e| e.id.as_str()), Some(entry.id.as_str()));
    }
}
