use log::{debug, error};
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;

use crate::contacts::model::Contact;
use crate::contacts::normalize::SyncSource;
use crate::contacts::ContactSyncError;

/// Client for the product backend's contact endpoints. Authentication is a
/// session cookie validated server-side; any 401 means "re-authenticate",
/// never a data error.
pub struct BackendClient {
    client: Client,
    base_url: String,
    session_cookie: String,
}

/// One contact the server chose not to persist, with its reason (duplicate
/// phone number, validation failure, ...). The caller renders every reason
/// individually.
#[derive(Debug, Clone, Deserialize)]
pub struct SkippedContact {
    pub contact: Contact,
    pub reason: String,
}

/// Result of a batch save. Some contacts skipped is still an overall
/// success as long as the request itself was accepted.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub message: String,
    pub saved: Vec<Contact>,
    pub skipped: Vec<SkippedContact>,
}

/// One page (or the full filtered set) of stored contacts.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactPage {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub relations: Vec<String>,
    #[serde(rename = "currentPage", default)]
    pub current_page: u32,
    #[serde(rename = "totalPages", default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total: u64,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, session_cookie: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_cookie: session_cookie.into(),
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .header(header::COOKIE, &self.session_cookie)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header(header::COOKIE, &self.session_cookie)
    }

    fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .delete(format!("{}{}", self.base_url, path))
            .header(header::COOKIE, &self.session_cookie)
    }

    pub async fn check_session(&self) -> Result<i64, ContactSyncError> {
        let response = self
            .get("/api/check-session")
            .send()
            .await
            .map_err(|e| ContactSyncError::Network(e.to_string()))?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ContactSyncError::SessionExpired);
        }
        if !status.is_success() {
            return Err(ContactSyncError::Api(format!("Session check failed: {status}")));
        }

        #[derive(Deserialize)]
        struct SessionResponse {
            success: bool,
            #[serde(rename = "userId")]
            user_id: Option<i64>,
        }

        let data: SessionResponse = response
            .json()
            .await
            .map_err(|e| ContactSyncError::Parse(e.to_string()))?;
        match (data.success, data.user_id) {
            (true, Some(user_id)) => Ok(user_id),
            _ => Err(ContactSyncError::SessionExpired),
        }
    }

    /// Persist a normalized batch. No retry at this layer: a network or
    /// non-2xx failure covers the entire batch, and the server decides true
    /// partial-commit semantics via `skipped`.
    pub async fn save_contacts(
        &self,
        contacts: &[Contact],
        source: SyncSource,
    ) -> Result<SaveOutcome, ContactSyncError> {
        let body = serde_json::json!({
            "contacts": contacts,
            "source": source,
        });
        let response = self
            .post("/api/contacts/save")
            .json(&body)
            .send()
            .await
            .map_err(|e| ContactSyncError::Network(e.to_string()))?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ContactSyncError::SessionExpired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Contact save failed: {} - {}", status, body);
            return Err(ContactSyncError::Api(format!("Save contacts failed: {status}")));
        }

        #[derive(Deserialize)]
        struct SaveResponse {
            success: bool,
            #[serde(default)]
            message: String,
            #[serde(default)]
            contacts: Vec<Contact>,
            #[serde(default)]
            skipped: Vec<SkippedContact>,
        }

        let data: SaveResponse = response
            .json()
            .await
            .map_err(|e| ContactSyncError::Parse(e.to_string()))?;
        if !data.success {
            return Err(ContactSyncError::Api(data.message));
        }
        debug!(
            "Saved batch ({source}): {} persisted, {} skipped",
            data.contacts.len(),
            data.skipped.len()
        );
        Ok(SaveOutcome {
            message: data.message,
            saved: data.contacts,
            skipped: data.skipped,
        })
    }

    pub async fn fetch_contacts(
        &self,
        params: &[(String, String)],
    ) -> Result<ContactPage, ContactSyncError> {
        let response = self
            .get("/api/contacts")
            .query(params)
            .send()
            .await
            .map_err(|e| ContactSyncError::Network(e.to_string()))?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ContactSyncError::SessionExpired);
        }
        if !status.is_success() {
            return Err(ContactSyncError::Api(format!("Fetch contacts failed: {status}")));
        }
        response
            .json()
            .await
            .map_err(|e| ContactSyncError::Parse(e.to_string()))
    }

    pub async fn categorize_contacts(
        &self,
        contact_ids: &[i64],
        category: &str,
        relation: Option<&str>,
        is_ambassador: bool,
        is_nominee: bool,
    ) -> Result<String, ContactSyncError> {
        let body = serde_json::json!({
            "contactIds": contact_ids,
            "category": category,
            "relation": relation.unwrap_or_default(),
            "isAmbassador": is_ambassador,
            "isNominee": is_nominee,
        });
        self.simple_post("/api/contacts/categorize-contacts", &body)
            .await
    }

    pub async fn delete_contacts(&self, contact_ids: &[i64]) -> Result<String, ContactSyncError> {
        let body = serde_json::json!({ "contactIds": contact_ids });
        self.simple_post("/api/contacts/delete-contacts", &body).await
    }

    pub async fn delete_contact(&self, contact_id: i64) -> Result<String, ContactSyncError> {
        self.simple_delete(&format!("/api/contacts/{contact_id}")).await
    }

    pub async fn delete_file(&self, file_id: i64) -> Result<String, ContactSyncError> {
        self.simple_delete(&format!("/api/contacts/files/{file_id}"))
            .await
    }

    async fn simple_post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<String, ContactSyncError> {
        let response = self
            .post(path)
            .json(body)
            .send()
            .await
            .map_err(|e| ContactSyncError::Network(e.to_string()))?;
        Self::read_simple(response).await
    }

    async fn simple_delete(&self, path: &str) -> Result<String, ContactSyncError> {
        let response = self
            .delete(path)
            .send()
            .await
            .map_err(|e| ContactSyncError::Network(e.to_string()))?;
        Self::read_simple(response).await
    }

    async fn read_simple(response: reqwest::Response) -> Result<String, ContactSyncError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ContactSyncError::SessionExpired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Backend call failed: {} - {}", status, body);
            return Err(ContactSyncError::Api(format!("Request failed: {status}")));
        }

        #[derive(Deserialize)]
        struct SimpleResponse {
            success: bool,
            #[serde(default)]
            message: String,
        }

        let data: SimpleResponse = response
            .json()
            .await
            .map_err(|e| ContactSyncError::Parse(e.to_string()))?;
        if !data.success {
            return Err(ContactSyncError::Api(data.message));
        }
        Ok(data.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str, phone: &str) -> Contact {
        Contact {
            first_name: name.into(),
            phone_number: phone.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn save_reports_partial_success_with_individual_skips() {
        let mut server = mockito::Server::new_async().await;
        let response = serde_json::json!({
            "success": true,
            "message": "2 contacts processed",
            "contacts": [{"id": 7, "first_name": "Kept", "phone_number": "+15550100"}],
            "skipped": [{
                "contact": {"first_name": "Dup", "phone_number": "+15550100"},
                "reason": "Duplicate phone number"
            }]
        });
        let mock = server
            .mock("POST", "/api/contacts/save")
            .match_header("cookie", "session=abc")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "source": "vcf"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(response.to_string())
            .create_async()
            .await;

        let client = BackendClient::new(server.url(), "session=abc");
        let outcome = client
            .save_contacts(
                &[contact("Kept", "+15550100"), contact("Dup", "+15550100")],
                SyncSource::Vcf,
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(outcome.saved.len(), 1);
        assert_eq!(outcome.saved[0].id, Some(7));
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].reason, "Duplicate phone number");
    }

    #[tokio::test]
    async fn unauthorized_save_means_session_expired() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/contacts/save")
            .with_status(401)
            .with_body(r#"{"success":false,"message":"Session expired"}"#)
            .create_async()
            .await;

        let client = BackendClient::new(server.url(), "session=stale");
        let err = client
            .save_contacts(&[contact("Any", "+15550100")], SyncSource::Google)
            .await
            .unwrap_err();
        assert!(matches!(err, ContactSyncError::SessionExpired));
    }

    #[tokio::test]
    async fn rejected_request_is_a_single_batch_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/contacts/save")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":false,"message":"Too many contacts"}"#)
            .create_async()
            .await;

        let client = BackendClient::new(server.url(), "session=abc");
        let err = client
            .save_contacts(&[contact("Any", "+15550100")], SyncSource::Mobile)
            .await
            .unwrap_err();
        assert!(matches!(err, ContactSyncError::Api(msg) if msg == "Too many contacts"));
    }

    #[tokio::test]
    async fn fetch_parses_page_envelope() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!({
            "success": true,
            "contacts": [{"id": 1, "first_name": "Asha", "phone_number": "+919876543210"}],
            "categories": ["Family", "Work", "Cricket Club"],
            "relations": ["Sister"],
            "currentPage": 2,
            "totalPages": 5,
            "total": 93
        });
        server
            .mock("GET", "/api/contacts")
            .match_query(mockito::Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = BackendClient::new(server.url(), "session=abc");
        let page = client
            .fetch_contacts(&[("page".to_string(), "2".to_string())])
            .await
            .unwrap();
        assert_eq!(page.current_page, 2);
        assert_eq!(page.total_pages, 5);
        assert_eq!(page.total, 93);
        assert_eq!(page.contacts[0].first_name, "Asha");
        assert_eq!(page.categories.len(), 3);
    }

    #[tokio::test]
    async fn delete_endpoints_hit_expected_paths() {
        let mut server = mockito::Server::new_async().await;
        let ok = r#"{"success":true,"message":"Deleted"}"#;
        let one = server
            .mock("DELETE", "/api/contacts/42")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ok)
            .create_async()
            .await;
        let file = server
            .mock("DELETE", "/api/contacts/files/9")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ok)
            .create_async()
            .await;
        let bulk = server
            .mock("POST", "/api/contacts/delete-contacts")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "contactIds": [1, 2]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ok)
            .create_async()
            .await;

        let client = BackendClient::new(server.url(), "session=abc");
        client.delete_contact(42).await.unwrap();
        client.delete_file(9).await.unwrap();
        client.delete_contacts(&[1, 2]).await.unwrap();
        one.assert_async().await;
        file.assert_async().await;
        bulk.assert_async().await;
    }

    #[tokio::test]
    async fn check_session_returns_user_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/check-session")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"userId":11}"#)
            .create_async()
            .await;

        let client = BackendClient::new(server.url(), "session=abc");
        assert_eq!(client.check_session().await.unwrap(), 11);
    }
}
