use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::contacts::ContactSyncError;

/// Seeded category values; anything else is a user-defined custom category.
pub const KNOWN_CATEGORIES: &[&str] = &["Family", "Friends", "Work"];

/// Seeded relation values, meaningful only when the category is "Family".
pub const KNOWN_RELATIONS: &[&str] = &[
    "Son", "Daughter", "Wife", "Husband", "Father", "Mother", "Brother", "Sister",
];

/// Maximum phone numbers a contact can carry (primary + 3 overflow slots).
pub const MAX_PHONE_NUMBERS: usize = 4;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

static WEBSITE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(https?://)?[\w.-]+\.[A-Za-z]{2,}(/\S*)?$").unwrap());

/// Delivery channels for posthumous sharing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareBy {
    pub whatsapp: bool,
    pub sms: bool,
    pub email: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: i64,
    pub file_name: String,
    pub file_path: String,
}

/// Canonical contact shape. Every field has a concrete default so serialized
/// payloads are total, never sparse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Server-assigned; absent until the contact has been persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Primary number; required for a contact to be usable.
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub phone_number1: String,
    #[serde(default)]
    pub phone_number2: String,
    #[serde(default)]
    pub phone_number3: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub job_type: String,
    #[serde(default)]
    pub flat_building_no: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub anniversary: String,
    #[serde(default)]
    pub category: String,
    /// Populated only when `category == "Family"`.
    #[serde(default)]
    pub relation: String,
    #[serde(default)]
    pub is_ambassador: bool,
    #[serde(default)]
    pub is_nominee: bool,
    #[serde(default)]
    pub release_on_pass: bool,
    /// Duration token, e.g. "7 Days".
    #[serde(default)]
    pub share_on: String,
    #[serde(default)]
    pub share_by: ShareBy,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub contact_image: String,
    #[serde(default)]
    pub uploaded_files: Vec<UploadedFile>,
}

impl Contact {
    /// Non-empty phone slots in declared order.
    pub fn phone_numbers(&self) -> Vec<&str> {
        [
            self.phone_number.as_str(),
            self.phone_number1.as_str(),
            self.phone_number2.as_str(),
            self.phone_number3.as_str(),
        ]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect()
    }

    /// Fill the phone slots from an already-normalized list. Empty entries
    /// are dropped; anything past the fourth number is discarded.
    pub fn set_phone_numbers(&mut self, numbers: &[String]) {
        let mut slots = numbers
            .iter()
            .filter(|n| !n.trim().is_empty())
            .take(MAX_PHONE_NUMBERS)
            .cloned();
        self.phone_number = slots.next().unwrap_or_default();
        self.phone_number1 = slots.next().unwrap_or_default();
        self.phone_number2 = slots.next().unwrap_or_default();
        self.phone_number3 = slots.next().unwrap_or_default();
    }

    pub fn display_name(&self) -> String {
        let mut name = self.first_name.clone();
        if !self.last_name.is_empty() {
            if !name.is_empty() {
                name.push(' ');
            }
            name.push_str(&self.last_name);
        }
        name
    }

    /// Local pre-upload validation for form-entered contacts. Synced
    /// contacts are validated server-side; the phone requirement still
    /// applies to them via the normalizer's drop-on-no-phone rule.
    pub fn validate(&self) -> Result<(), ContactSyncError> {
        if self.first_name.trim().is_empty() {
            return Err(ContactSyncError::InvalidData(
                "First name is required".into(),
            ));
        }
        if self.phone_number.trim().is_empty() {
            return Err(ContactSyncError::InvalidData(
                "Phone number is required".into(),
            ));
        }
        if !self.email.is_empty() && !EMAIL_RE.is_match(&self.email) {
            return Err(ContactSyncError::InvalidData(format!(
                "Invalid email address: {}",
                self.email
            )));
        }
        if !self.website.is_empty() && !WEBSITE_RE.is_match(&self.website) {
            return Err(ContactSyncError::InvalidData(format!(
                "Invalid website: {}",
                self.website
            )));
        }
        Ok(())
    }
}

/// Resolve a value to the seeded category spelling, ignoring case.
pub fn canonical_category(value: &str) -> Option<&'static str> {
    KNOWN_CATEGORIES
        .iter()
        .copied()
        .find(|c| c.eq_ignore_ascii_case(value))
}

/// Resolve a value to the seeded relation spelling, ignoring case.
pub fn canonical_relation(value: &str) -> Option<&'static str> {
    KNOWN_RELATIONS
        .iter()
        .copied()
        .find(|r| r.eq_ignore_ascii_case(value))
}
