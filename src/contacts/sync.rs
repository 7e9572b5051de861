use log::{info, warn};

use crate::contacts::backend_client::{BackendClient, SkippedContact};
use crate::contacts::device_import::{
    check_device_support, map_picked_contacts, DeviceCapabilities, PickedContact,
};
use crate::contacts::google_client::{GoogleContactsClient, GoogleSyncOptions};
use crate::contacts::model::Contact;
use crate::contacts::normalize::{normalize_contact, RawContact, SyncSource};
use crate::contacts::vcf_import::parse_vcf;
use crate::contacts::ContactSyncError;

/// Terminal state of a sync run. Finding nothing to import is an
/// informational outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Saved { saved: usize, skipped: usize },
    NoContacts,
}

/// What a sync run did, with every distinct per-record problem surfaced
/// individually so the caller can render each one.
#[derive(Debug)]
pub struct SyncReport {
    pub source: SyncSource,
    pub outcome: SyncOutcome,
    pub warnings: Vec<String>,
    pub skipped: Vec<SkippedContact>,
}

impl SyncReport {
    fn finish(mut self) -> Self {
        let (saved, skipped) = match self.outcome {
            SyncOutcome::Saved { saved, skipped } => (saved, skipped),
            SyncOutcome::NoContacts => (0, 0),
        };
        for s in &self.skipped {
            self.warnings
                .push(format!("Skipped {}: {}", s.contact.display_name(), s.reason));
        }
        info!(
            "Sync ({}) completed: {} imported, {} skipped, {} warnings",
            self.source,
            saved,
            skipped,
            self.warnings.len()
        );
        self
    }
}

/// Google sync: fetch connections page by page, normalize, and upload each
/// page as its own batch so partial progress survives a later failure. A
/// `base_delay` pause separates pages to stay under the rate limit. Auth,
/// exhausted-backoff and network failures abort the run as single errors;
/// pages already saved stay saved.
pub async fn sync_google(
    google: &GoogleContactsClient,
    backend: &BackendClient,
    access_token: &str,
    default_region: &str,
    opts: &GoogleSyncOptions,
) -> Result<SyncReport, ContactSyncError> {
    let mut report = SyncReport {
        source: SyncSource::Google,
        outcome: SyncOutcome::NoContacts,
        warnings: Vec::new(),
        skipped: Vec::new(),
    };
    let mut saved_total = 0usize;
    let mut skipped_total = 0usize;
    let mut found_any = false;
    let mut page_token: Option<String> = None;

    loop {
        let (raws, next_token) = google
            .fetch_connections_page(access_token, page_token.as_deref(), opts)
            .await?;
        found_any |= !raws.is_empty();

        let batch = normalize_batch(&raws, Some(default_region), &mut report.warnings);
        if !batch.is_empty() {
            let outcome = backend.save_contacts(&batch, SyncSource::Google).await?;
            saved_total += outcome.saved.len();
            skipped_total += outcome.skipped.len();
            report.skipped.extend(outcome.skipped);
        }

        match next_token {
            Some(token) => {
                page_token = Some(token);
                // Cooperative pause between pages to avoid rate limiting.
                tokio::time::sleep(opts.base_delay).await;
            }
            None => break,
        }
    }

    if found_any {
        report.outcome = SyncOutcome::Saved {
            saved: saved_total,
            skipped: skipped_total,
        };
    }
    Ok(report.finish())
}

/// On-device import: capability-gated, one batch, no paging.
pub async fn import_device(
    backend: &BackendClient,
    caps: &DeviceCapabilities,
    picked: &[PickedContact],
    default_region: &str,
) -> Result<SyncReport, ContactSyncError> {
    check_device_support(caps)?;

    let mut report = SyncReport {
        source: SyncSource::Mobile,
        outcome: SyncOutcome::NoContacts,
        warnings: Vec::new(),
        skipped: Vec::new(),
    };
    let raws = map_picked_contacts(picked);
    let batch = normalize_batch(&raws, Some(default_region), &mut report.warnings);
    if batch.is_empty() {
        return Ok(report.finish());
    }

    let outcome = backend.save_contacts(&batch, SyncSource::Mobile).await?;
    report.outcome = SyncOutcome::Saved {
        saved: outcome.saved.len(),
        skipped: outcome.skipped.len(),
    };
    report.skipped = outcome.skipped;
    Ok(report.finish())
}

/// VCF import: parse the whole file, then upload all surviving cards as a
/// single batch. Per-card problems are warnings, never fatal; a file that
/// yields no usable contact reports NoContacts without touching the
/// network.
pub async fn import_vcf(
    backend: &BackendClient,
    text: &str,
) -> Result<SyncReport, ContactSyncError> {
    let import = parse_vcf(text);
    let mut report = SyncReport {
        source: SyncSource::Vcf,
        outcome: SyncOutcome::NoContacts,
        warnings: import.warnings,
        skipped: Vec::new(),
    };

    // VCF numbers are parsed without a default region and fall back to raw
    // digits when nothing better is derivable.
    let batch = normalize_batch(&import.cards, None, &mut report.warnings);
    if batch.is_empty() {
        return Ok(report.finish());
    }

    let outcome = backend.save_contacts(&batch, SyncSource::Vcf).await?;
    report.outcome = SyncOutcome::Saved {
        saved: outcome.saved.len(),
        skipped: outcome.skipped.len(),
    };
    report.skipped = outcome.skipped;
    Ok(report.finish())
}

/// Save a single form-entered contact. The manual flow gets the same phone
/// normalization as the adapters: the typed slots are rewritten to
/// international form with the configured default region before validation
/// and upload.
pub async fn save_custom(
    backend: &BackendClient,
    contact: &Contact,
    default_region: &str,
) -> Result<SyncReport, ContactSyncError> {
    let mut contact = contact.clone();
    let typed: Vec<String> = contact
        .phone_numbers()
        .iter()
        .map(|p| p.to_string())
        .collect();
    contact.set_phone_numbers(&crate::contacts::phone::normalize_phone_list(
        &typed,
        Some(default_region),
    ));
    contact.validate()?;
    let outcome = backend
        .save_contacts(std::slice::from_ref(&contact), SyncSource::Custom)
        .await?;
    let report = SyncReport {
        source: SyncSource::Custom,
        outcome: SyncOutcome::Saved {
            saved: outcome.saved.len(),
            skipped: outcome.skipped.len(),
        },
        warnings: Vec::new(),
        skipped: outcome.skipped,
    };
    Ok(report.finish())
}

fn normalize_batch(
    raws: &[RawContact],
    default_region: Option<&str>,
    warnings: &mut Vec<String>,
) -> Vec<Contact> {
    let mut batch = Vec::with_capacity(raws.len());
    for raw in raws {
        match normalize_contact(raw, default_region) {
            Some(contact) => batch.push(contact),
            None => {
                let name = if raw.first_name.is_empty() && raw.last_name.is_empty() {
                    "unnamed contact".to_string()
                } else {
                    format!("{} {}", raw.first_name, raw.last_name)
                        .trim()
                        .to_string()
                };
                warn!("Dropping {name}: no valid phone number");
                warnings.push(format!("{name} has no valid phone number and was skipped"));
            }
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::google_client::GoogleConfig;
    use std::time::Duration;

    fn google_client(server: &mockito::ServerGuard) -> GoogleContactsClient {
        GoogleContactsClient::new(GoogleConfig {
            client_id: "id".into(),
            client_secret: "secret".into(),
        })
        .with_base_url(server.url())
    }

    fn fast_opts() -> GoogleSyncOptions {
        GoogleSyncOptions {
            base_delay: Duration::from_millis(1),
            ..Default::default()
        }
    }

    const SAVE_OK: &str =
        r#"{"success":true,"message":"saved","contacts":[{"id":1,"first_name":"x","phone_number":"+1"}],"skipped":[]}"#;

    #[tokio::test]
    async fn vcf_end_to_end_uploads_single_batch_with_vcf_source() {
        let mut server = mockito::Server::new_async().await;
        let save = server
            .mock("POST", "/api/contacts/save")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "source": "vcf",
                "contacts": [{
                    "first_name": "John",
                    "last_name": "Doe",
                    "phone_number": "+15550100",
                    "category": "",
                    "relation": ""
                }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SAVE_OK)
            .expect(1)
            .create_async()
            .await;

        let backend = BackendClient::new(server.url(), "session=abc");
        let text = "BEGIN:VCARD\nVERSION:3.0\nN:Doe;John;;;\nTEL:+1 555-0100\nEND:VCARD";
        let report = import_vcf(&backend, text).await.unwrap();

        save.assert_async().await;
        assert_eq!(
            report.outcome,
            SyncOutcome::Saved {
                saved: 1,
                skipped: 0
            }
        );
    }

    #[tokio::test]
    async fn vcf_with_no_usable_cards_reports_no_contacts_without_network() {
        let mut server = mockito::Server::new_async().await;
        let save = server
            .mock("POST", "/api/contacts/save")
            .expect(0)
            .create_async()
            .await;

        let backend = BackendClient::new(server.url(), "session=abc");
        let text = "BEGIN:VCARD\nVERSION:3.0\nFN:Jane Doe\nEND:VCARD";
        let report = import_vcf(&backend, text).await.unwrap();

        save.assert_async().await;
        assert_eq!(report.outcome, SyncOutcome::NoContacts);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("no valid phone number")));
    }

    #[tokio::test]
    async fn vcf_phoneless_card_does_not_block_the_rest() {
        let mut server = mockito::Server::new_async().await;
        let save = server
            .mock("POST", "/api/contacts/save")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "contacts": [{"first_name": "Has"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SAVE_OK)
            .expect(1)
            .create_async()
            .await;

        let backend = BackendClient::new(server.url(), "session=abc");
        let text = "BEGIN:VCARD\nVERSION:3.0\nFN:Jane Doe\nEND:VCARD\nBEGIN:VCARD\nVERSION:3.0\nFN:Has Phone\nTEL:+15550100\nEND:VCARD";
        let report = import_vcf(&backend, text).await.unwrap();

        save.assert_async().await;
        assert!(matches!(report.outcome, SyncOutcome::Saved { saved: 1, .. }));
        assert_eq!(report.warnings.len(), 1);
    }

    #[tokio::test]
    async fn google_sync_uploads_each_page_as_its_own_batch() {
        let mut server = mockito::Server::new_async().await;
        let page_one = serde_json::json!({
            "connections": [{
                "names": [{"givenName": "One"}],
                "phoneNumbers": [{"value": "9876543210"}]
            }],
            "nextPageToken": "p2"
        });
        let page_two = serde_json::json!({
            "connections": [{
                "names": [{"givenName": "Two"}],
                "phoneNumbers": [{"value": "+15550100"}]
            }]
        });
        let first = server
            .mock("GET", "/people/me/connections")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page_one.to_string())
            .expect(1)
            .create_async()
            .await;
        // Registered later so it wins whenever the page token is present.
        let second = server
            .mock("GET", "/people/me/connections")
            .match_query(mockito::Matcher::UrlEncoded("pageToken".into(), "p2".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page_two.to_string())
            .expect(1)
            .create_async()
            .await;
        let save = server
            .mock("POST", "/api/contacts/save")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "source": "google"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SAVE_OK)
            .expect(2)
            .create_async()
            .await;

        let backend = BackendClient::new(server.url(), "session=abc");
        let report = sync_google(&google_client(&server), &backend, "token", "IN", &fast_opts())
            .await
            .unwrap();

        first.assert_async().await;
        second.assert_async().await;
        save.assert_async().await;
        assert_eq!(
            report.outcome,
            SyncOutcome::Saved {
                saved: 2,
                skipped: 0
            }
        );
    }

    #[tokio::test]
    async fn google_sync_with_only_phoneless_connections_is_informational() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/people/me/connections")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"connections": []}"#)
            .create_async()
            .await;
        let save = server
            .mock("POST", "/api/contacts/save")
            .expect(0)
            .create_async()
            .await;

        let backend = BackendClient::new(server.url(), "session=abc");
        let report = sync_google(&google_client(&server), &backend, "token", "IN", &fast_opts())
            .await
            .unwrap();

        save.assert_async().await;
        assert_eq!(report.outcome, SyncOutcome::NoContacts);
    }

    #[tokio::test]
    async fn google_server_skips_become_individual_warnings() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/people/me/connections")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "connections": [
                        {"names": [{"givenName": "A"}], "phoneNumbers": [{"value": "+11"}]},
                        {"names": [{"givenName": "B"}], "phoneNumbers": [{"value": "+12"}]}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("POST", "/api/contacts/save")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "success": true,
                    "message": "partial",
                    "contacts": [{"id": 1, "first_name": "A", "phone_number": "+11"}],
                    "skipped": [{
                        "contact": {"first_name": "B", "phone_number": "+12"},
                        "reason": "Duplicate phone number"
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let backend = BackendClient::new(server.url(), "session=abc");
        let report = sync_google(&google_client(&server), &backend, "token", "IN", &fast_opts())
            .await
            .unwrap();

        assert_eq!(
            report.outcome,
            SyncOutcome::Saved {
                saved: 1,
                skipped: 1
            }
        );
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("B") && w.contains("Duplicate phone number")));
    }

    #[tokio::test]
    async fn device_import_fails_fast_without_picker() {
        let mut server = mockito::Server::new_async().await;
        let save = server
            .mock("POST", "/api/contacts/save")
            .expect(0)
            .create_async()
            .await;

        let backend = BackendClient::new(server.url(), "session=abc");
        let caps = DeviceCapabilities {
            mobile_device: true,
            picker_available: false,
        };
        let err = import_device(&backend, &caps, &[], "IN").await.unwrap_err();
        save.assert_async().await;
        assert!(matches!(err, ContactSyncError::PickerUnavailable(_)));
    }

    #[tokio::test]
    async fn device_import_uploads_one_batch() {
        let mut server = mockito::Server::new_async().await;
        let save = server
            .mock("POST", "/api/contacts/save")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "source": "mobile",
                "contacts": [{"first_name": "John", "last_name": "Doe", "phone_number": "+919876543210"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SAVE_OK)
            .expect(1)
            .create_async()
            .await;

        let backend = BackendClient::new(server.url(), "session=abc");
        let caps = DeviceCapabilities {
            mobile_device: true,
            picker_available: true,
        };
        let picked = vec![
            PickedContact {
                name: "John Doe".into(),
                tel: vec!["9876543210".into()],
                ..Default::default()
            },
            PickedContact {
                name: "No Phone".into(),
                ..Default::default()
            },
        ];
        let report = import_device(&backend, &caps, &picked, "IN").await.unwrap();

        save.assert_async().await;
        assert!(matches!(report.outcome, SyncOutcome::Saved { saved: 1, .. }));
    }

    #[tokio::test]
    async fn custom_save_validates_before_any_request() {
        let mut server = mockito::Server::new_async().await;
        let save = server
            .mock("POST", "/api/contacts/save")
            .expect(0)
            .create_async()
            .await;

        let backend = BackendClient::new(server.url(), "session=abc");
        let invalid = Contact {
            first_name: "No Phone".into(),
            ..Default::default()
        };
        let err = save_custom(&backend, &invalid, "IN").await.unwrap_err();
        save.assert_async().await;
        assert!(matches!(err, ContactSyncError::InvalidData(_)));
    }

    #[tokio::test]
    async fn custom_save_normalizes_typed_phone_numbers() {
        let mut server = mockito::Server::new_async().await;
        let save = server
            .mock("POST", "/api/contacts/save")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "source": "custom",
                "contacts": [{
                    "first_name": "Asha",
                    "phone_number": "+919876543210",
                    "phone_number1": "+15550100"
                }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SAVE_OK)
            .expect(1)
            .create_async()
            .await;

        let backend = BackendClient::new(server.url(), "session=abc");
        let typed = Contact {
            first_name: "Asha".into(),
            phone_number: "9876543210".into(),
            phone_number1: "+1 555-0100".into(),
            ..Default::default()
        };
        let report = save_custom(&backend, &typed, "IN").await.unwrap();

        save.assert_async().await;
        assert!(matches!(report.outcome, SyncOutcome::Saved { saved: 1, .. }));
    }
}
