//! Alarm clock-time handling.

use chrono::NaiveTime;

const ACCEPTED_FORMATS: [&str; 3] = ["%I:%M %p", "%I:%M%p", "%H:%M"];

/// Parse a user-entered alarm time and return it as "h:mm AM".
///
/// Accepts "8:00 AM", "08:00am", "8:00PM" and 24-hour "20:00".
pub fn canonical_time(input: &str) -> Option<String> {
    let input = input.trim();
    ACCEPTED_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(input, format).ok())
        .map(|time| time.format("%-I:%M %p").to_string())
}
