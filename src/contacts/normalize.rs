use serde::{Deserialize, Serialize};

use crate::contacts::model::Contact;
use crate::contacts::phone::normalize_phone_list;

/// Where a batch of contacts came from. Sent verbatim to the backend so it
/// can attribute imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncSource {
    Google,
    Mobile,
    Vcf,
    Custom,
}

impl std::fmt::Display for SyncSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncSource::Google => write!(f, "google"),
            SyncSource::Mobile => write!(f, "mobile"),
            SyncSource::Vcf => write!(f, "vcf"),
            SyncSource::Custom => write!(f, "custom"),
        }
    }
}

/// Source-agnostic record produced by an adapter, before phone
/// normalization and slot assignment. Adapters fill what their source
/// provides and leave the rest defaulted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawContact {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub phones: Vec<String>,
    pub email: String,
    pub website: String,
    pub company: String,
    pub job_type: String,
    pub flat_building_no: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub date_of_birth: String,
    pub anniversary: String,
    pub notes: String,
}

impl From<&Contact> for RawContact {
    fn from(c: &Contact) -> Self {
        RawContact {
            first_name: c.first_name.clone(),
            middle_name: c.middle_name.clone(),
            last_name: c.last_name.clone(),
            phones: c.phone_numbers().iter().map(|p| p.to_string()).collect(),
            email: c.email.clone(),
            website: c.website.clone(),
            company: c.company.clone(),
            job_type: c.job_type.clone(),
            flat_building_no: c.flat_building_no.clone(),
            street: c.street.clone(),
            city: c.city.clone(),
            state: c.state.clone(),
            country: c.country.clone(),
            postal_code: c.postal_code.clone(),
            date_of_birth: c.date_of_birth.clone(),
            anniversary: c.anniversary.clone(),
            notes: c.notes.clone(),
        }
    }
}

/// Map a raw record into the canonical shape. Returns `None` when no usable
/// phone number survives normalization: a contact without a phone is
/// considered unusable and is dropped before upload.
///
/// `default_region` is `Some` for Google and on-device sync and `None` for
/// VCF import (which falls back to raw digits when a number cannot be
/// parsed). Running the mapping over an already-canonical record changes
/// nothing.
pub fn normalize_contact(raw: &RawContact, default_region: Option<&str>) -> Option<Contact> {
    let phones = normalize_phone_list(&raw.phones, default_region);
    if phones.is_empty() {
        return None;
    }

    let mut contact = Contact {
        first_name: raw.first_name.trim().to_string(),
        middle_name: raw.middle_name.trim().to_string(),
        last_name: raw.last_name.trim().to_string(),
        email: raw.email.trim().to_string(),
        website: raw.website.trim().to_string(),
        company: raw.company.trim().to_string(),
        job_type: raw.job_type.trim().to_string(),
        flat_building_no: raw.flat_building_no.trim().to_string(),
        street: raw.street.trim().to_string(),
        city: raw.city.trim().to_string(),
        state: raw.state.trim().to_string(),
        country: raw.country.trim().to_string(),
        postal_code: raw.postal_code.trim().to_string(),
        date_of_birth: raw.date_of_birth.trim().to_string(),
        anniversary: raw.anniversary.trim().to_string(),
        notes: raw.notes.trim().to_string(),
        ..Default::default()
    };
    contact.set_phone_numbers(&phones);
    Some(contact)
}
