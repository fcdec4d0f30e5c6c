//! Best-effort carrier and timezone detection for NANP numbers.

use std::collections::HashMap;

/// Maps a phone number to a carrier name and a timezone guess.
///
/// Pure lookup tables, no network calls, and errors never propagate:
/// unmapped input yields `"Unknown"` for the carrier and the Eastern
/// default for the timezone. The keyword/prefix approach is inherently
/// approximate; it lives behind this interface so a ported-number lookup
/// service can replace it without touching callers.
#[derive(Debug)]
pub struct CarrierDetector {
    /// 6-digit NPA-NXX prefix → carrier name
    prefixes: HashMap<String, String>,
    /// 3-digit area code → IANA timezone
    area_timezones: HashMap<&'static str, &'static str>,
}

const DEFAULT_CARRIER: &str = "Unknown";
const DEFAULT_TIMEZONE: &str = "America/New_York";

impl CarrierDetector {
    pub fn new() -> Self {
        Self {
            prefixes: default_prefixes(),
            area_timezones: default_area_timezones(),
        }
    }

    /// Merge extra NPA-NXX prefix mappings over the built-in table.
    pub fn with_prefix_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.prefixes.extend(overrides);
        self
    }

    /// Carrier name for a number, `"Unknown"` when unmapped.
    pub fn detect_carrier(&self, phone_number: &str) -> String {
        match Self::normalize(phone_number) {
            Some(digits) => self
                .prefixes
                .get(&digits[..6])
                .cloned()
                .unwrap_or_else(|| DEFAULT_CARRIER.to_string()),
            None => DEFAULT_CARRIER.to_string(),
        }
    }

    /// Timezone identifier guessed from the area code.
    pub fn detect_timezone(&self, phone_number: &str) -> String {
        match Self::normalize(phone_number) {
            Some(digits) => self
                .area_timezones
                .get(&digits[..3])
                .copied()
                .unwrap_or(DEFAULT_TIMEZONE)
                .to_string(),
            None => DEFAULT_TIMEZONE.to_string(),
        }
    }

    /// Strip formatting and the leading country code, keeping exactly ten
    /// NANP digits. Anything else is unmappable.
    fn normalize(phone_number: &str) -> Option<String> {
        let digits: String = phone_number.chars().filter(char::is_ascii_digit).collect();
        match digits.len() {
            10 => Some(digits),
            11 if digits.starts_with('1') => Some(digits[1..].to_string()),
            _ => None,
        }
    }
}

impl Default for CarrierDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn default_prefixes() -> HashMap<String, String> {
    // Small seed table; operators extend it via config overrides.
    let entries = [
        ("212555", "Verizon"),
        ("213555", "AT&T"),
        ("312555", "T-Mobile"),
        ("415555", "AT&T"),
        ("425555", "T-Mobile"),
        ("512555", "Sprint"),
        ("617555", "Verizon"),
        ("702555", "T-Mobile"),
        ("305555", "AT&T"),
        ("404555", "Verizon"),
    ];
    entries
        .iter()
        .map(|(prefix, carrier)| (prefix.to_string(), carrier.to_string()))
        .collect()
}

fn default_area_timezones() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        // Eastern
        ("212", "America/New_York"),
        ("305", "America/New_York"),
        ("404", "America/New_York"),
        ("407", "America/New_York"),
        ("561", "America/New_York"),
        ("617", "America/New_York"),
        ("646", "America/New_York"),
        ("703", "America/New_York"),
        ("718", "America/New_York"),
        ("917", "America/New_York"),
        // Central
        ("214", "America/Chicago"),
        ("281", "America/Chicago"),
        ("312", "America/Chicago"),
        ("512", "America/Chicago"),
        ("612", "America/Chicago"),
        ("713", "America/Chicago"),
        ("773", "America/Chicago"),
        ("832", "America/Chicago"),
        // Mountain
        ("303", "America/Denver"),
        ("480", "America/Phoenix"),
        ("505", "America/Denver"),
        ("602", "America/Phoenix"),
        ("720", "America/Denver"),
        ("801", "America/Denver"),
        // Pacific
        ("206", "America/Los_Angeles"),
        ("213", "America/Los_Angeles"),
        ("310", "America/Los_Angeles"),
        ("408", "America/Los_Angeles"),
        ("415", "America/Los_Angeles"),
        ("425", "America/Los_Angeles"),
        ("503", "America/Los_Angeles"),
        ("619", "America/Los_Angeles"),
        ("702", "America/Los_Angeles"),
        ("818", "America/Los_Angeles"),
        // Alaska / Hawaii
        ("907", "America/Anchorage"),
        ("808", "Pacific/Honolulu"),
    ])
}
