//! Parsing of completion replies into typed results.
//!
//! Replies may be fenced (```` ```json ````) or carry stray prose around the
//! object. Fences are stripped and the outermost object is sliced out; the
//! JSON itself is never repaired.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::types::{
    DecisionAction, DecisionOutcome, DoctorUrgency, LabelFields, SymptomClass, TimingSuggestion,
    Urgency,
};

/// Reply parsing errors.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("Label unreadable")]
    Unreadable,

    #[error("Invalid decision outcome: {0}")]
    InvalidOutcome(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Remove code-fence markers and surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Locate the JSON object inside a reply.
pub fn json_object_slice(raw: &str) -> ParseResult<String> {
    let cleaned = strip_code_fences(raw);
    let start = cleaned.find('{').ok_or_else(|| {
        ParseError::InvalidFormat("No JSON object found in response".into())
    })?;
    let end = cleaned.rfind('}').ok_or_else(|| {
        ParseError::InvalidFormat("No closing brace found in response".into())
    })?;
    if end < start {
        return Err(ParseError::InvalidFormat("Braces out of order".into()));
    }
    Ok(cleaned[start..=end].to_string())
}

// =========================================================================
// Label
// =========================================================================

/// Raw label reply. Optional fields may arrive as strings or numbers.
#[derive(Debug, Default, Deserialize)]
struct RawLabel {
    medication_name: Option<Value>,
    dosage: Option<Value>,
    dosage_form: Option<Value>,
    frequency: Option<Value>,
    instructions: Option<Value>,
    rx_number: Option<Value>,
    qty: Option<Value>,
    refill_by: Option<Value>,
    prescriber: Option<Value>,
    pharmacy: Option<Value>,
}

/// Parse a label extraction reply. A missing or blank medication name is unreadable.
pub fn parse_label(raw: &str) -> ParseResult<LabelFields> {
    let slice = json_object_slice(raw)?;
    let label: RawLabel = serde_json::from_str(&slice)?;

    // {"error":"unreadable"} carries no name and lands here too
    let name = value_text(label.medication_name).ok_or(ParseError::Unreadable)?;

    Ok(LabelFields {
        medication_name: name,
        dosage: value_text(label.dosage).unwrap_or_default(),
        dosage_form: value_text(label.dosage_form).unwrap_or_default(),
        frequency: value_text(label.frequency).unwrap_or_default(),
        instructions: value_text(label.instructions).unwrap_or_default(),
        rx_number: value_text(label.rx_number),
        qty: value_text(label.qty),
        refill_by: value_text(label.refill_by),
        prescriber: value_text(label.prescriber),
        pharmacy: value_text(label.pharmacy),
    })
}

/// Render a scalar JSON value as trimmed text; null and blanks become `None`.
fn value_text(value: Option<Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// =========================================================================
// Timing
// =========================================================================

/// Raw timing reply. Only `times` is strictly typed; the rest tolerate
/// nulls and scalar or list variance.
#[derive(Debug, Deserialize)]
struct RawTiming {
    #[serde(default)]
    times: Vec<String>,
    reason: Option<Value>,
    with_food: Option<bool>,
    avoid_driving: Option<bool>,
    warnings: Option<Value>,
}

/// Parse a timing reply. At least one non-blank time is required.
pub fn parse_timing(raw: &str) -> ParseResult<TimingSuggestion> {
    let slice = json_object_slice(raw)?;
    let timing: RawTiming = serde_json::from_str(&slice)?;

    let times = clean_times(timing.times);
    if times.is_empty() {
        return Err(ParseError::InvalidFormat("times must not be empty".into()));
    }

    Ok(TimingSuggestion {
        times,
        reason: value_text(timing.reason).unwrap_or_default(),
        with_food: timing.with_food.unwrap_or(false),
        avoid_driving: timing.avoid_driving.unwrap_or(false),
        warnings: warning_text(timing.warnings),
    })
}

/// Warnings arrive as one string or a list of them; lists are joined.
fn warning_text(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::Array(items)) => {
            let joined = items
                .into_iter()
                .filter_map(|item| value_text(Some(item)))
                .collect::<Vec<_>>()
                .join("; ");
            Some(joined).filter(|w| !w.is_empty())
        }
        other => value_text(other),
    }
}

fn clean_times(times: Vec<String>) -> Vec<String> {
    times
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

// =========================================================================
// Decision
// =========================================================================

/// Raw decision reply, one record with nullable fields for every branch.
#[derive(Debug, Deserialize)]
struct RawDecision {
    action: Option<String>,
    symptom_classification: Option<String>,
    #[serde(alias = "conflict_detail")]
    ehr_conflict_detail: Option<String>,
    #[serde(default)]
    new_times: Option<Vec<String>>,
    adjust_reason: Option<String>,
    doctor_reason: Option<String>,
    doctor_urgency: Option<String>,
    doctor_message: Option<String>,
    note: Option<String>,
    urgency: Option<String>,
    urgency_message: Option<String>,
}

/// Parse a decision reply into a single-branch outcome.
///
/// `see_doctor` without a recognised urgency tier and `adjust_time` without
/// replacement times are rejected.
pub fn parse_decision(raw: &str) -> ParseResult<DecisionOutcome> {
    let slice = json_object_slice(raw)?;
    let decision: RawDecision = serde_json::from_str(&slice)?;
    decision.try_into()
}

impl TryFrom<RawDecision> for DecisionOutcome {
    type Error = ParseError;

    fn try_from(raw: RawDecision) -> ParseResult<Self> {
        let action_label = raw
            .action
            .as_deref()
            .map(str::trim)
            .ok_or_else(|| ParseError::InvalidOutcome("missing action".into()))?;

        let conflict_detail = non_blank(raw.ehr_conflict_detail);

        let action = match action_label.to_ascii_lowercase().as_str() {
            "adjust_time" => {
                let new_times = clean_times(raw.new_times.unwrap_or_default());
                if new_times.is_empty() {
                    return Err(ParseError::InvalidOutcome(
                        "adjust_time requires new_times".into(),
                    ));
                }
                DecisionAction::AdjustTime {
                    new_times,
                    adjust_reason: non_blank(raw.adjust_reason),
                    conflict_detail,
                }
            }
            "see_doctor" => {
                let doctor_urgency = raw
                    .doctor_urgency
                    .as_deref()
                    .and_then(parse_doctor_urgency)
                    .ok_or_else(|| {
                        ParseError::InvalidOutcome(format!(
                            "see_doctor requires doctor_urgency, got {:?}",
                            raw.doctor_urgency
                        ))
                    })?;
                DecisionAction::SeeDoctor {
                    conflict_detail,
                    doctor_reason: non_blank(raw.doctor_reason),
                    doctor_urgency,
                    doctor_message: non_blank(raw.doctor_message),
                }
            }
            "no_change" => DecisionAction::NoChange {
                note: non_blank(raw.note),
            },
            other => {
                return Err(ParseError::InvalidOutcome(format!("unknown action {:?}", other)))
            }
        };

        // The coarse tier never invalidates an outcome. Unrecognised values
        // default to the action's tier floor.
        let default_urgency = match &action {
            DecisionAction::SeeDoctor { .. } => Urgency::High,
            _ => Urgency::Low,
        };
        let urgency = raw
            .urgency
            .as_deref()
            .and_then(parse_urgency)
            .unwrap_or(default_urgency);

        let classification = raw
            .symptom_classification
            .map(|c| serde_json::from_value(Value::String(c.trim().to_string())))
            .transpose()?
            .unwrap_or(SymptomClass::Ambiguous);

        Ok(DecisionOutcome {
            action,
            classification,
            urgency,
            summary: raw.urgency_message.unwrap_or_default().trim().to_string(),
        })
    }
}

fn parse_doctor_urgency(label: &str) -> Option<DoctorUrgency> {
    match label.trim().to_ascii_lowercase().as_str() {
        "call_now" => Some(DoctorUrgency::CallNow),
        "call_soon" => Some(DoctorUrgency::CallSoon),
        "next_appointment" => Some(DoctorUrgency::NextAppointment),
        _ => None,
    }
}

fn parse_urgency(label: &str) -> Option<Urgency> {
    match label.trim().to_ascii_lowercase().as_str() {
        "high" => Some(Urgency::High),
        "medium" => Some(Urgency::Medium),
        "low" => Some(Urgency::Low),
        _ => None,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "null")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_label() {
        let raw = r#"```json
{"medication_name":"Lisinopril","dosage":"10 mg","dosage_form":"tablet","frequency":"Once daily","instructions":"Take by mouth","rx_number":"RX-1","qty":30,"refill_by":null,"prescriber":"Dr. Reyes","pharmacy":null}
```"#;
        let fields = parse_label(raw).unwrap();
        assert_eq!(fields.medication_name, "Lisinopril");
        assert_eq!(fields.dosage, "10 mg");
        assert_eq!(fields.qty.as_deref(), Some("30"));
        assert!(fields.refill_by.is_none());
        assert_eq!(fields.prescriber.as_deref(), Some("Dr. Reyes"));
    }

    #[test]
    fn test_parse_label_unreadable_marker() {
        assert!(matches!(
            parse_label(r#"{"error":"unreadable"}"#),
            Err(ParseError::Unreadable)
        ));
    }

    #[test]
    fn test_parse_label_blank_name() {
        assert!(matches!(
            parse_label(r#"{"medication_name":"  ","dosage":"5 mg"}"#),
            Err(ParseError::Unreadable)
        ));
        assert!(matches!(
            parse_label(r#"{"medication_name":null}"#),
            Err(ParseError::Unreadable)
        ));
    }

    #[test]
    fn test_parse_label_with_prose() {
        let raw = "Here is the label:\n{\"medication_name\":\"Metformin\"}\nThanks";
        assert_eq!(parse_label(raw).unwrap().medication_name, "Metformin");
    }

    #[test]
    fn test_parse_label_not_json() {
        assert!(matches!(
            parse_label("I cannot read this image"),
            Err(ParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_timing() {
        let raw = r#"{"times":["8:00 AM","6:00 PM"],"reason":"With meals","with_food":true,"avoid_driving":false,"warnings":null}"#;
        let timing = parse_timing(raw).unwrap();
        assert_eq!(timing.times, vec!["8:00 AM", "6:00 PM"]);
        assert!(timing.with_food);
        assert!(timing.warnings.is_none());
    }

    #[test]
    fn test_parse_timing_tolerates_loose_optional_fields() {
        let raw = r#"{"times":["9:00 PM"],"reason":"Bedtime","with_food":null,"avoid_driving":true,"warnings":["Avoid grapefruit"," ","May cause dizziness"]}"#;
        let timing = parse_timing(raw).unwrap();
        assert_eq!(timing.times, vec!["9:00 PM"]);
        assert!(!timing.with_food);
        assert!(timing.avoid_driving);
        assert_eq!(
            timing.warnings.as_deref(),
            Some("Avoid grapefruit; May cause dizziness")
        );

        let timing = parse_timing(r#"{"times":["7:00 AM"],"warnings":[]}"#).unwrap();
        assert!(timing.warnings.is_none());
        assert!(timing.reason.is_empty());
    }

    #[test]
    fn test_parse_timing_requires_times() {
        assert!(parse_timing(r#"{"times":[],"reason":"x"}"#).is_err());
        assert!(parse_timing(r#"{"reason":"x"}"#).is_err());
        assert!(parse_timing(r#"{"times":["  "]}"#).is_err());
    }

    #[test]
    fn test_parse_decision_see_doctor() {
        let raw = r#"{"action":"see_doctor","symptom_classification":"serious_adverse","ehr_conflict_detail":"Orthostatic risk","new_times":[],"adjust_reason":null,"doctor_reason":"BP 190/112","doctor_urgency":"call_now","doctor_message":"Please call","urgency":"high","urgency_message":"Call your doctor now"}"#;
        let outcome = parse_decision(raw).unwrap();
        assert_eq!(outcome.urgency, Urgency::High);
        assert_eq!(outcome.classification, SymptomClass::SeriousAdverse);
        match outcome.action {
            DecisionAction::SeeDoctor {
                doctor_urgency,
                conflict_detail,
                ..
            } => {
                assert_eq!(doctor_urgency, DoctorUrgency::CallNow);
                assert_eq!(conflict_detail.as_deref(), Some("Orthostatic risk"));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_see_doctor_requires_urgency_tier() {
        for urgency in ["null", "", "asap"] {
            let raw = format!(
                r#"{{"action":"see_doctor","doctor_urgency":"{}","urgency":"high"}}"#,
                urgency
            );
            assert!(
                matches!(parse_decision(&raw), Err(ParseError::InvalidOutcome(_))),
                "urgency {:?} should be rejected",
                urgency
            );
        }
        assert!(parse_decision(r#"{"action":"see_doctor","doctor_urgency":null}"#).is_err());
    }

    #[test]
    fn test_adjust_time_requires_new_times() {
        let raw = r#"{"action":"adjust_time","new_times":[],"urgency":"medium"}"#;
        assert!(matches!(
            parse_decision(raw),
            Err(ParseError::InvalidOutcome(_))
        ));
    }

    #[test]
    fn test_adjust_time() {
        let raw = r#"{"action":"adjust_time","symptom_classification":"timing_side_effect","new_times":["8:00 AM","6:00 PM"],"adjust_reason":"Take with meals","doctor_urgency":null,"urgency":"medium","urgency_message":"Alarm updated"}"#;
        let outcome = parse_decision(raw).unwrap();
        assert_eq!(
            outcome.new_times().unwrap(),
            &["8:00 AM".to_string(), "6:00 PM".to_string()]
        );
        assert_eq!(outcome.summary, "Alarm updated");
    }

    #[test]
    fn test_no_change_ignores_other_branches() {
        let raw = r#"{"action":"no_change","new_times":["9:00 PM"],"doctor_urgency":"call_now","urgency":"low","urgency_message":"Keep it up"}"#;
        let outcome = parse_decision(raw).unwrap();
        assert_eq!(outcome.action, DecisionAction::NoChange { note: None });
        assert!(outcome.new_times().is_none());
    }

    #[test]
    fn test_missing_urgency_defaults_low() {
        let outcome = parse_decision(r#"{"action":"no_change"}"#).unwrap();
        assert_eq!(outcome.urgency, Urgency::Low);
        assert_eq!(outcome.classification, SymptomClass::Ambiguous);
    }

    #[test]
    fn test_urgency_labels_ignore_case() {
        let raw = r#"{"action":"See_Doctor","doctor_urgency":" CALL_SOON ","urgency":"Medium"}"#;
        let outcome = parse_decision(raw).unwrap();
        assert_eq!(outcome.urgency, Urgency::Medium);
        assert!(matches!(
            outcome.action,
            DecisionAction::SeeDoctor {
                doctor_urgency: DoctorUrgency::CallSoon,
                ..
            }
        ));
    }

    #[test]
    fn test_unrecognised_urgency_defaults_by_action() {
        let outcome =
            parse_decision(r#"{"action":"see_doctor","doctor_urgency":"call_now","urgency":"urgent"}"#)
                .unwrap();
        assert!(outcome.is_see_doctor());
        assert_eq!(outcome.urgency, Urgency::High);

        let outcome = parse_decision(r#"{"action":"no_change","urgency":"none"}"#).unwrap();
        assert_eq!(outcome.urgency, Urgency::Low);
    }

    #[test]
    fn test_unknown_action_rejected() {
        assert!(parse_decision(r#"{"action":"adjust_dose"}"#).is_err());
        assert!(parse_decision(r#"{"urgency":"low"}"#).is_err());
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            parse_decision(r#"{"action":"no_change","urgency":}"#),
            Err(ParseError::Json(_))
        ));
    }
}
