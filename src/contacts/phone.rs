use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Calling codes for the regions the product ships in. The default region
/// comes from configuration; "IN" is the product default.
static CALLING_CODES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("IN", "91"),
        ("US", "1"),
        ("CA", "1"),
        ("GB", "44"),
        ("AU", "61"),
        ("NZ", "64"),
        ("SG", "65"),
        ("AE", "971"),
        ("SA", "966"),
        ("ZA", "27"),
        ("DE", "49"),
        ("FR", "33"),
        ("ES", "34"),
        ("IT", "39"),
        ("NL", "31"),
        ("BR", "55"),
        ("MX", "52"),
        ("JP", "81"),
        ("KR", "82"),
        ("CN", "86"),
        ("HK", "852"),
        ("MY", "60"),
        ("PH", "63"),
        ("TH", "66"),
        ("ID", "62"),
        ("PK", "92"),
        ("BD", "880"),
        ("LK", "94"),
        ("NP", "977"),
    ])
});

pub fn calling_code(region: &str) -> Option<&'static str> {
    CALLING_CODES.get(region.to_ascii_uppercase().as_str()).copied()
}

/// Normalize a raw phone string toward international form.
///
/// Rules, applied uniformly across every adapter and the manual entry flow:
/// - empty/whitespace-only input is filtered out (`None`);
/// - a `+`-prefixed number keeps its digits and stays `+`-prefixed, so the
///   operation is idempotent;
/// - a `00` international prefix is rewritten to `+`;
/// - otherwise, with a default region, the region's calling code is
///   prepended;
/// - otherwise (no-region mode, used by VCF import) the bare digits are
///   returned as-is.
pub fn normalize_phone(raw: &str, default_region: Option<&str>) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let has_plus = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    if has_plus {
        return Some(format!("+{digits}"));
    }
    if let Some(rest) = digits.strip_prefix("00") {
        if !rest.is_empty() {
            return Some(format!("+{rest}"));
        }
    }
    if let Some(region) = default_region {
        if let Some(code) = calling_code(region) {
            return Some(format!("+{code}{digits}"));
        }
    }
    Some(digits)
}

/// Normalize a list of candidate numbers, dropping empties and duplicates
/// while preserving first-seen order.
pub fn normalize_phone_list(raw: &[String], default_region: Option<&str>) -> Vec<String> {
    let mut seen = Vec::new();
    for candidate in raw {
        if let Some(normalized) = normalize_phone(candidate, default_region) {
            if !seen.contains(&normalized) {
                seen.push(normalized);
            }
        }
    }
    seen
}
