use log::{debug, warn};

use crate::contacts::normalize::RawContact;

const SUPPORTED_VERSIONS: &[&str] = &["2.1", "3.0", "4.0"];

/// Result of parsing one VCF file: the raw cards plus every per-card
/// warning raised along the way. Warnings never abort the file.
#[derive(Debug, Default)]
pub struct VcfImport {
    pub cards: Vec<RawContact>,
    pub warnings: Vec<String>,
}

/// Parse the text of a VCF file (versions 2.1 / 3.0 / 4.0) into raw
/// contact records.
///
/// Line endings are normalized and RFC 2425 folded lines are joined before
/// splitting into cards on the `BEGIN:VCARD` marker. A segment without a
/// matching `END:VCARD` is discarded as malformed trailing content. A card
/// with an unsupported `VERSION` is coerced to 3.0 with a warning and still
/// parsed. Any single card that fails to parse is skipped with a warning;
/// later cards are unaffected.
pub fn parse_vcf(text: &str) -> VcfImport {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let unfolded = unfold_lines(&unified);

    let mut import = VcfImport::default();
    for (idx, segment) in unfolded.split("BEGIN:VCARD").skip(1).enumerate() {
        let card_no = idx + 1;
        let Some(body) = segment.split("END:VCARD").next().filter(|_| segment.contains("END:VCARD"))
        else {
            warn!("vCard {card_no}: missing END:VCARD, discarding");
            import
                .warnings
                .push(format!("Card {card_no} is malformed (no END:VCARD) and was discarded"));
            continue;
        };

        match parse_card(body) {
            Ok((raw, mut card_warnings)) => {
                for w in card_warnings.drain(..) {
                    import.warnings.push(format!("Card {card_no}: {w}"));
                }
                import.cards.push(raw);
            }
            Err(reason) => {
                warn!("vCard {card_no}: {reason}, skipping");
                import
                    .warnings
                    .push(format!("Card {card_no} could not be parsed ({reason}) and was skipped"));
            }
        }
    }

    debug!(
        "Parsed VCF: {} cards, {} warnings",
        import.cards.len(),
        import.warnings.len()
    );
    import
}

/// Join RFC 2425 continuation lines (leading space or tab) to their
/// predecessor, stripping the single fold marker character.
fn unfold_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split('\n') {
        if let Some(rest) = line.strip_prefix(' ').or_else(|| line.strip_prefix('\t')) {
            out.push_str(rest);
        } else {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(line);
        }
    }
    out
}

fn parse_card(body: &str) -> Result<(RawContact, Vec<String>), String> {
    let mut raw = RawContact::default();
    let mut warnings = Vec::new();
    let mut name_from_n = false;
    let mut saw_property = false;

    for line in body.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        saw_property = true;

        if let Some(version) = property_value(line, "VERSION") {
            if !SUPPORTED_VERSIONS.contains(&version.trim()) {
                warnings.push(format!(
                    "unsupported VERSION {}, treating as 3.0",
                    version.trim()
                ));
            }
        } else if line.starts_with("N:") || line.starts_with("N;") {
            // Semicolon-delimited, family name first; takes precedence
            // over FN as the source of the display name.
            let value = line.splitn(2, ':').nth(1).unwrap_or("");
            let parts: Vec<&str> = value.split(';').collect();
            raw.last_name = parts.first().unwrap_or(&"").trim().to_string();
            raw.first_name = parts.get(1).unwrap_or(&"").trim().to_string();
            raw.middle_name = parts.get(2).unwrap_or(&"").trim().to_string();
            name_from_n = true;
        } else if let Some(value) = property_value(line, "FN") {
            if !name_from_n && raw.first_name.is_empty() && raw.last_name.is_empty() {
                let (first, middle, last) = split_display_name(value);
                raw.first_name = first;
                raw.middle_name = middle;
                raw.last_name = last;
            }
        } else if let Some(value) = property_value(line, "TEL") {
            raw.phones.push(value.trim().to_string());
        } else if let Some(value) = property_value(line, "EMAIL") {
            if raw.email.is_empty() {
                raw.email = value.trim().to_string();
            }
        } else if let Some(value) = property_value(line, "ORG") {
            raw.company = value.split(';').next().unwrap_or("").trim().to_string();
        } else if let Some(value) = property_value(line, "TITLE") {
            raw.job_type = value.trim().to_string();
        } else if let Some(value) = property_value(line, "URL") {
            raw.website = value.trim().to_string();
        } else if let Some(value) = property_value(line, "BDAY") {
            raw.date_of_birth = value.trim().to_string();
        } else if let Some(value) = property_value(line, "ANNIVERSARY") {
            raw.anniversary = value.trim().to_string();
        } else if let Some(value) = property_value(line, "ADR") {
            // Positional: flat, street, city, state, country, postal.
            let parts: Vec<&str> = value.split(';').collect();
            raw.flat_building_no = parts.first().unwrap_or(&"").trim().to_string();
            raw.street = parts.get(1).unwrap_or(&"").trim().to_string();
            raw.city = parts.get(2).unwrap_or(&"").trim().to_string();
            raw.state = parts.get(3).unwrap_or(&"").trim().to_string();
            raw.country = parts.get(4).unwrap_or(&"").trim().to_string();
            raw.postal_code = parts.get(5).unwrap_or(&"").trim().to_string();
        }
    }

    if !saw_property {
        return Err("empty card".to_string());
    }
    Ok((raw, warnings))
}

/// Match a vCard property by name, tolerating parameter suffixes
/// (`TEL;TYPE=CELL:` matches `TEL`), and return the value after the first
/// colon.
fn property_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(name)?;
    match rest.as_bytes().first() {
        Some(b':') => rest.get(1..),
        Some(b';') => rest.splitn(2, ':').nth(1),
        _ => None,
    }
}

/// Whitespace name splitting shared with the on-device adapter: one token is
/// a first name, two add a last name, three or more put the middle tokens
/// into the middle name.
pub(crate) fn split_display_name(name: &str) -> (String, String, String) {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    match tokens.len() {
        0 => (String::new(), String::new(), String::new()),
        1 => (tokens[0].to_string(), String::new(), String::new()),
        2 => (tokens[0].to_string(), String::new(), tokens[1].to_string()),
        n => (
            tokens[0].to_string(),
            tokens[1..n - 1].join(" "),
            tokens[n - 1].to_string(),
        ),
    }
}
