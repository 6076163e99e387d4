//! Prompts for label reading, dosing advice and symptom triage.
//!
//! Each prompt pins the reply to a fixed JSON schema parsed by [`crate::extraction`].

use crate::types::{LabelFields, SymptomReport};

/// System prompt for label extraction.
pub const LABEL_SYSTEM_PROMPT: &str = "You are a pharmacy OCR expert. JSON only.";

/// Instruction sent alongside the label image.
pub const LABEL_PROMPT: &str = r#"Read this prescription label. Extract all visible fields.
Respond ONLY in JSON:
{"medication_name":"...","dosage":"...","dosage_form":"tablet","frequency":"...","instructions":"...","rx_number":null,"qty":null,"refill_by":null,"prescriber":null,"pharmacy":null}
If unreadable: {"error":"unreadable"}"#;

/// System prompt for dosing-time advice.
pub const TIMING_SYSTEM_PROMPT: &str = "Clinical pharmacist. JSON only.";

/// System prompt for symptom triage.
pub const DECISION_SYSTEM_PROMPT: &str =
    "Senior clinical pharmacist. JSON only. Follow decision rules strictly.";

/// Shown in place of the record when the session is not record-linked.
pub const NO_RECORD_NOTICE: &str = "NO EHR AVAILABLE: Use general clinical/pharmacological knowledge only. Do not reference any patient-specific history.";

/// The three-outcome decision policy.
pub const DECISION_RULES: &str = r#"══ DECISION RULES — follow strictly ══

Output "action": "adjust_time" ONLY when ALL are true:
  • The symptom is a known, expected timing-dependent side effect of this drug
  • The EHR has a specific finding explaining WHY this time is wrong
  • Moving to a different time of day would likely resolve it
  • "new_times" MUST contain specific recommended time(s), e.g. ["9:00 PM"]

Output "action": "see_doctor" when ANY of these apply:
  • BP reading is dangerously elevated (systolic ≥180 or diastolic ≥110)
  • Symptom suggests the drug is not working at any time
  • Serious adverse reaction: chest pain, severe rash, swelling, difficulty breathing
  • Drug-drug interaction that cannot be resolved by timing
  • "doctor_urgency" MUST be exactly one of: "call_now" | "call_soon" | "next_appointment"

Output "action": "no_change" when:
  • Symptom is unrelated to this medication or its timing
  • Patient reports feeling fine"#;

/// Reply schema for symptom triage.
pub const DECISION_SCHEMA: &str = r#"Respond ONLY in valid JSON:
{
  "action": "adjust_time|see_doctor|no_change",
  "symptom_classification": "timing_side_effect|serious_adverse|drug_ineffective|unrelated|ambiguous",
  "ehr_conflict_detail": "specific EHR finding that supports this decision, or null",
  "new_times": [],
  "adjust_reason": "plain-English explanation of WHY this time is better, or null",
  "doctor_reason": "exactly why a doctor is needed and what patient should say, or null",
  "doctor_urgency": "call_now|call_soon|next_appointment|null",
  "doctor_message": "pre-written message patient can read to doctor/nurse, or null",
  "note": "short confirmation when action is no_change, or null",
  "urgency": "high|medium|low",
  "urgency_message": "short patient-facing summary"
}"#;

/// User prompt asking for dosing times.
pub fn make_timing_prompt(fields: &LabelFields) -> String {
    format!(
        r#"Medication: {} {}. Frequency: "{}". Instructions: "{}".
Best time(s) to take it? Consider food, sedation, BP, absorption.
Respond ONLY in JSON: {{"times":["8:00 AM"],"reason":"...","with_food":true,"avoid_driving":false,"warnings":null}}"#,
        fields.medication_name, fields.dosage, fields.frequency, fields.instructions
    )
}

/// User prompt for symptom triage.
///
/// The record section is either the pretty-printed record or [`NO_RECORD_NOTICE`].
pub fn make_decision_prompt(report: &SymptomReport) -> String {
    let times = if report.current_times.is_empty() {
        "none set".to_string()
    } else {
        report.current_times.join(", ")
    };

    let bp_context = match report.blood_pressure.as_deref().map(str::trim) {
        Some(bp) if !bp.is_empty() => format!("\nPatient-reported BP at time of symptom: {}", bp),
        _ => String::new(),
    };

    let record_section = match &report.clinical_record {
        Some(record) => format!(
            "PATIENT EHR:\n{}",
            serde_json::to_string_pretty(record).unwrap_or_else(|_| record.to_string())
        ),
        None => NO_RECORD_NOTICE.to_string(),
    };

    format!(
        r#"You are a senior clinical pharmacist evaluating a patient symptom report.

MEDICATION: {medication} {dosage}
CURRENT ALARM TIME(S): {times}
PATIENT SYMPTOM: "{symptom}"{bp_context}

{record_section}

{rules}

{schema}"#,
        medication = report.medication_name,
        dosage = report.dosage,
        times = times,
        symptom = report.symptom_text,
        bp_context = bp_context,
        record_section = record_section,
        rules = DECISION_RULES,
        schema = DECISION_SCHEMA,
    )
}
