//! Capability traits for the three remote operations and their remote implementation.
//!
//! None of the operations fail from the caller's point of view: every transport
//! or parse failure is replaced by that operation's single fallback value.

use std::sync::Arc;

use crate::completion::{CompletionRequest, CompletionService, ContentBlock, Message, Role};
use crate::extraction::{parse_decision, parse_label, parse_timing};
use crate::prompts::{
    make_decision_prompt, make_timing_prompt, DECISION_SYSTEM_PROMPT, LABEL_PROMPT,
    LABEL_SYSTEM_PROMPT, TIMING_SYSTEM_PROMPT,
};
use crate::types::{
    DecisionOutcome, LabelFields, LabelImage, LabelReading, SymptomReport, TimingSuggestion,
};

/// Reads prescription fields off a label photo.
pub trait LabelExtractor: Send + Sync {
    fn extract_label(&self, image: &LabelImage) -> LabelReading;
}

/// Recommends dosing times for extracted label fields.
pub trait TimingAdvisor: Send + Sync {
    fn suggest_timing(&self, fields: &LabelFields) -> TimingSuggestion;
}

/// Classifies a reported symptom into one of three outcomes.
pub trait SymptomEvaluator: Send + Sync {
    fn evaluate_symptom(&self, report: &SymptomReport) -> DecisionOutcome;
}

/// All three capabilities together.
pub trait ClinicalAdvisor: LabelExtractor + TimingAdvisor + SymptomEvaluator {}

impl<T: LabelExtractor + TimingAdvisor + SymptomEvaluator> ClinicalAdvisor for T {}

/// Advisor backed by a remote completion service.
pub struct RemoteAdvisor {
    service: Arc<dyn CompletionService>,
    max_tokens: u32,
}

impl RemoteAdvisor {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service,
            max_tokens: crate::completion::DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

impl LabelExtractor for RemoteAdvisor {
    fn extract_label(&self, image: &LabelImage) -> LabelReading {
        let _span = tracing::info_span!(
            "extract_label",
            mime_type = %image.mime_type,
            image_size = image.bytes.len(),
        )
        .entered();

        let request = CompletionRequest::new(
            LABEL_SYSTEM_PROMPT,
            vec![Message {
                role: Role::User,
                content: vec![
                    ContentBlock::image(&image.bytes, &image.mime_type),
                    ContentBlock::text(LABEL_PROMPT),
                ],
            }],
        )
        .with_max_tokens(self.max_tokens);

        let raw = match self.service.complete(&request) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Label extraction request failed, marking unreadable");
                return LabelReading::Unreadable;
            }
        };

        match parse_label(&raw) {
            Ok(fields) => {
                tracing::info!("Label extraction complete");
                LabelReading::Fields(fields)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Label reply unusable, marking unreadable");
                LabelReading::Unreadable
            }
        }
    }
}

impl TimingAdvisor for RemoteAdvisor {
    fn suggest_timing(&self, fields: &LabelFields) -> TimingSuggestion {
        let _span = tracing::info_span!("suggest_timing").entered();

        let request = CompletionRequest::new(
            TIMING_SYSTEM_PROMPT,
            vec![Message::user_text(make_timing_prompt(fields))],
        )
        .with_max_tokens(self.max_tokens);

        let parsed = self
            .service
            .complete(&request)
            .map_err(|e| e.to_string())
            .and_then(|raw| parse_timing(&raw).map_err(|e| e.to_string()));

        match parsed {
            Ok(timing) => {
                tracing::info!(slots = timing.times.len(), "Timing suggestion complete");
                timing
            }
            Err(error) => {
                tracing::warn!(%error, "Timing suggestion failed, using default morning slot");
                TimingSuggestion::fallback()
            }
        }
    }
}

impl SymptomEvaluator for RemoteAdvisor {
    fn evaluate_symptom(&self, report: &SymptomReport) -> DecisionOutcome {
        let _span = tracing::info_span!(
            "evaluate_symptom",
            record_linked = report.clinical_record.is_some(),
            has_bp = report.blood_pressure.is_some(),
        )
        .entered();

        let request = CompletionRequest::new(
            DECISION_SYSTEM_PROMPT,
            vec![Message::user_text(make_decision_prompt(report))],
        )
        .with_max_tokens(self.max_tokens);

        let parsed = self
            .service
            .complete(&request)
            .map_err(|e| e.to_string())
            .and_then(|raw| parse_decision(&raw).map_err(|e| e.to_string()));

        match parsed {
            Ok(outcome) => {
                tracing::info!(
                    action = outcome.action.label(),
                    urgency = ?outcome.urgency,
                    "Symptom evaluation complete"
                );
                outcome
            }
            Err(error) => {
                // Failed evaluation never moves an alarm or escalates
                tracing::warn!(%error, "Symptom evaluation failed, defaulting to no_change");
                DecisionOutcome::fallback()
            }
        }
    }
}

/// Advisor returning fixed answers, for driving the session without a service.
#[derive(Debug, Clone)]
pub struct FixedAdvisor {
    pub reading: LabelReading,
    pub timing: TimingSuggestion,
    pub outcome: DecisionOutcome,
}

impl LabelExtractor for FixedAdvisor {
    fn extract_label(&self, _image: &LabelImage) -> LabelReading {
        self.reading.clone()
    }
}

impl TimingAdvisor for FixedAdvisor {
    fn suggest_timing(&self, _fields: &LabelFields) -> TimingSuggestion {
        self.timing.clone()
    }
}

impl SymptomEvaluator for FixedAdvisor {
    fn evaluate_symptom(&self, _report: &SymptomReport) -> DecisionOutcome {
        self.outcome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CompletionError, ScriptedCompletion};
    use crate::types::{DecisionAction, DoctorUrgency, Urgency};

    fn advisor(stub: ScriptedCompletion) -> (RemoteAdvisor, Arc<ScriptedCompletion>) {
        let stub = Arc::new(stub);
        (RemoteAdvisor::new(stub.clone()), stub)
    }

    fn report() -> SymptomReport {
        SymptomReport {
            symptom_text: "dizzy".into(),
            medication_name: "Lisinopril".into(),
            dosage: "10 mg".into(),
            current_times: vec!["8:00 AM".into()],
            clinical_record: None,
            blood_pressure: Some("190/112".into()),
        }
    }

    #[test]
    fn test_extract_label_sends_image() {
        let (advisor, stub) =
            advisor(ScriptedCompletion::new().reply(r#"{"medication_name":"Lisinopril"}"#));
        let reading = advisor.extract_label(&LabelImage::new(vec![1, 2, 3], "image/png"));

        assert_eq!(reading.fields().unwrap().medication_name, "Lisinopril");
        let sent = &stub.requests()[0];
        assert_eq!(sent.system.as_deref(), Some(LABEL_SYSTEM_PROMPT));
        match &sent.messages[0].content[0] {
            ContentBlock::Image { source } => {
                assert_eq!(source.media_type, "image/png");
                assert_eq!(source.data, "AQID");
            }
            other => panic!("expected image block, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_label_failures_are_unreadable() {
        let (advisor, _) = advisor(
            ScriptedCompletion::new()
                .fail(CompletionError::Connection("x".into()))
                .reply(r#"{"error":"unreadable"}"#)
                .reply("no json here")
                .reply(r#"{"dosage":"10 mg"}"#),
        );
        let image = LabelImage::new(vec![0], "image/jpeg");
        for _ in 0..4 {
            assert_eq!(advisor.extract_label(&image), LabelReading::Unreadable);
        }
    }

    #[test]
    fn test_suggest_timing_fallbacks() {
        let (advisor, _) = advisor(
            ScriptedCompletion::new()
                .fail(CompletionError::Service("Overloaded".into()))
                .reply("```json\n{not json}\n```")
                .reply(r#"{"times":[],"reason":"?"}"#),
        );
        let fields = LabelFields {
            medication_name: "Atorvastatin".into(),
            ..LabelFields::default()
        };
        for _ in 0..3 {
            assert_eq!(advisor.suggest_timing(&fields), TimingSuggestion::fallback());
        }
    }

    #[test]
    fn test_suggest_timing_success() {
        let (advisor, _) = advisor(ScriptedCompletion::new().reply(
            r#"{"times":["9:00 PM"],"reason":"Statins work best at night","with_food":false,"avoid_driving":false,"warnings":null}"#,
        ));
        let timing = advisor.suggest_timing(&LabelFields {
            medication_name: "Atorvastatin".into(),
            ..LabelFields::default()
        });
        assert_eq!(timing.times, vec!["9:00 PM"]);
    }

    #[test]
    fn test_evaluate_symptom_fallbacks() {
        let (advisor, _) = advisor(
            ScriptedCompletion::new()
                .fail(CompletionError::Status {
                    status: 500,
                    body: "boom".into(),
                })
                .reply("garbage")
                .reply(r#"{"action":"adjust_time","new_times":[]}"#)
                .reply(r#"{"action":"see_doctor","doctor_urgency":null,"urgency":"high"}"#),
        );
        for _ in 0..4 {
            let outcome = advisor.evaluate_symptom(&report());
            assert_eq!(outcome, DecisionOutcome::fallback());
            assert_eq!(outcome.urgency, Urgency::Low);
        }
    }

    #[test]
    fn test_evaluate_symptom_see_doctor() {
        let (advisor, stub) = advisor(ScriptedCompletion::new().reply(
            r#"{"action":"see_doctor","symptom_classification":"serious_adverse","doctor_urgency":"call_now","urgency":"high","urgency_message":"Hypertensive crisis"}"#,
        ));
        let outcome = advisor.evaluate_symptom(&report());
        assert!(matches!(
            outcome.action,
            DecisionAction::SeeDoctor {
                doctor_urgency: DoctorUrgency::CallNow,
                ..
            }
        ));
        let prompt = stub.requests()[0].text_content();
        assert!(prompt.contains("190/112"));
        assert!(prompt.contains("NO EHR AVAILABLE"));
    }

    #[test]
    fn test_max_tokens_applied() {
        let (advisor, stub) = advisor(ScriptedCompletion::new());
        let advisor = advisor.with_max_tokens(256);
        let _ = advisor.evaluate_symptom(&report());
        assert_eq!(stub.requests()[0].max_tokens, 256);
    }
}
