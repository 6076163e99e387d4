//! Record linking against the sample clinical record.
//!
//! Entered identity must match the record exactly after normalization: case,
//! surrounding whitespace and phone punctuation are ignored, anything else is not.

use medminder_core::linking::RecordLinker;
use medminder_core::models::{ClinicalRecord, Identity};
use proptest::prelude::*;

const NAME: &str = "Duo Deng";
const PHONE: &str = "217-555-0194";
const ADDRESS: &str = "1142 Elm Creek Drive, Springfield, IL 62704";

fn sample_record() -> ClinicalRecord {
    ClinicalRecord::from_json(include_str!("fixtures/sample_record.json")).unwrap()
}

fn linker() -> RecordLinker {
    RecordLinker::new(vec![sample_record()])
}

fn pad() -> impl Strategy<Value = String> {
    "[ \t]{0,3}"
}

/// Randomly upper- or lower-case each character.
fn recase(text: &str, mask: &[bool]) -> String {
    text.chars()
        .zip(mask.iter().cycle())
        .map(|(c, upper)| {
            if *upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

#[test]
fn test_sample_record_identity() -> anyhow::Result<()> {
    let record = ClinicalRecord::from_json(include_str!("fixtures/sample_record.json"))?;
    assert_eq!(record.full_name(), NAME);
    assert_eq!(record.primary_phone(), PHONE);
    assert_eq!(record.address_line(), ADDRESS);
    assert_eq!(record.active_medications().count(), 6);
    Ok(())
}

#[test]
fn test_exact_identity_links() {
    let linker = linker();
    let linked = linker.link(&Identity::new(NAME, PHONE, ADDRESS));
    assert_eq!(linked.map(|r| r.record_id.as_str()), Some("EHR-2024-084721"));
}

#[test]
fn test_each_field_must_match() {
    let linker = linker();
    let cases = [
        Identity::new("Duo Dang", PHONE, ADDRESS),
        Identity::new(NAME, "217-555-0195", ADDRESS),
        Identity::new(NAME, PHONE, "1142 Elm Creek Dr, Springfield, IL 62704"),
        Identity::new("Deng", PHONE, ADDRESS),
        Identity::new(NAME, "555-0194", ADDRESS),
    ];
    for identity in cases {
        assert!(linker.link(&identity).is_none(), "{identity:?} should not link");
    }
}

proptest! {
    #[test]
    fn tolerates_case_and_surrounding_whitespace(
        mask in prop::collection::vec(any::<bool>(), 1..16),
        lead in pad(),
        trail in pad(),
    ) {
        let identity = Identity::new(
            &format!("{lead}{}{trail}", recase(NAME, &mask)),
            &format!("{lead}{PHONE}{trail}"),
            &format!("{lead}{}{trail}", recase(ADDRESS, &mask)),
        );
        prop_assert!(linker().link(&identity).is_some());
    }

    #[test]
    fn tolerates_phone_punctuation(seps in prop::collection::vec("[-. ()]{0,2}", 10)) {
        let digits = "2175550194";
        let phone: String = digits
            .chars()
            .zip(&seps)
            .map(|(d, sep)| format!("{sep}{d}"))
            .collect();
        let identity = Identity::new(NAME, &phone, ADDRESS);
        prop_assert!(linker().link(&identity).is_some());
    }

    #[test]
    fn genuine_name_difference_fails(suffix in "[a-z]{1,4}") {
        let identity = Identity::new(&format!("{NAME}{suffix}"), PHONE, ADDRESS);
        prop_assert!(linker().link(&identity).is_none());
    }

    #[test]
    fn genuine_phone_difference_fails(last in 0u8..10) {
        prop_assume!(last != 4);
        let identity = Identity::new(NAME, &format!("217-555-019{last}"), ADDRESS);
        prop_assert!(linker().link(&identity).is_none());
    }
}
