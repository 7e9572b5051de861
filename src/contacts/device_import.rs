use log::debug;

use crate::contacts::normalize::RawContact;
use crate::contacts::vcf_import::split_display_name;
use crate::contacts::ContactSyncError;

/// Capability report for the on-device contact picker. Mirrors the two
/// runtime checks the product front end performs before offering device
/// sync: a mobile device class and an available picker API.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceCapabilities {
    pub mobile_device: bool,
    pub picker_available: bool,
}

/// One record as handed over by the device picker: a display name plus the
/// `tel` and `email` fields it was asked for.
#[derive(Debug, Clone, Default)]
pub struct PickedContact {
    pub name: String,
    pub tel: Vec<String>,
    pub email: Vec<String>,
}

/// Gate device import on the capability checks. Fails synchronously, with
/// no retry, when either check is false.
pub fn check_device_support(caps: &DeviceCapabilities) -> Result<(), ContactSyncError> {
    if !caps.mobile_device {
        return Err(ContactSyncError::PickerUnavailable(
            "device contact sync is only available on mobile devices".into(),
        ));
    }
    if !caps.picker_available {
        return Err(ContactSyncError::PickerUnavailable(
            "this device does not expose a contact picker".into(),
        ));
    }
    Ok(())
}

/// Map picker records to raw contacts. Records without any `tel` entry are
/// dropped. Name splitting: first token is the first name; the last token
/// becomes the last name only with two or more tokens; middle tokens join
/// into the middle name only with three or more.
pub fn map_picked_contacts(picked: &[PickedContact]) -> Vec<RawContact> {
    let mapped: Vec<RawContact> = picked
        .iter()
        .filter(|p| p.tel.iter().any(|t| !t.trim().is_empty()))
        .map(|p| {
            let (first_name, middle_name, last_name) = split_display_name(&p.name);
            RawContact {
                first_name,
                middle_name,
                last_name,
                phones: p.tel.clone(),
                email: p.email.first().cloned().unwrap_or_default(),
                ..Default::default()
            }
        })
        .collect();
    debug!(
        "Device picker: {} of {} records have a phone number",
        mapped.len(),
        picked.len()
    );
    mapped
}
