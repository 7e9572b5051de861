use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::contacts::normalize::RawContact;
use crate::contacts::ContactSyncError;

const PERSON_FIELDS: &str =
    "names,phoneNumbers,emailAddresses,organizations,addresses,urls,birthdays,events,biographies";

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Paging and retry knobs for the connection fetch loop.
#[derive(Debug, Clone)]
pub struct GoogleSyncOptions {
    pub page_size: u32,
    pub base_delay: Duration,
    pub max_attempts: u32,
}

impl Default for GoogleSyncOptions {
    fn default() -> Self {
        Self {
            page_size: 1000,
            base_delay: Duration::from_millis(1000),
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

pub struct GoogleContactsClient {
    config: GoogleConfig,
    client: Client,
    base_url: String,
}

impl GoogleContactsClient {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            base_url: "https://people.googleapis.com/v1".to_string(),
        }
    }

    /// Point the client at a different People API host (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn get_auth_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "https://accounts.google.com/o/oauth2/v2/auth?client_id={}&redirect_uri={}&response_type=code&scope=https://www.googleapis.com/auth/contacts.readonly&state={}",
            self.config.client_id, redirect_uri, state
        )
    }

    /// AUTH step of the sync. Any failure here aborts the whole sync as a
    /// single error; there is no partial retry.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, ContactSyncError> {
        let response = self
            .client
            .post("https://oauth2.googleapis.com/token")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| ContactSyncError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Google token exchange failed: {} - {}", status, body);
            return Err(ContactSyncError::Auth(format!(
                "Token exchange failed: {status}"
            )));
        }

        #[derive(Deserialize)]
        struct GoogleTokenResponse {
            access_token: String,
            refresh_token: Option<String>,
            expires_in: i64,
            scope: Option<String>,
        }

        let token_data: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|e| ContactSyncError::Parse(e.to_string()))?;

        Ok(TokenResponse {
            access_token: token_data.access_token,
            refresh_token: token_data.refresh_token,
            expires_in: token_data.expires_in,
            expires_at: Some(Utc::now() + chrono::Duration::seconds(token_data.expires_in)),
            scopes: token_data
                .scope
                .map(|s| s.split(' ').map(String::from).collect())
                .unwrap_or_default(),
        })
    }

    pub async fn get_user_info(&self, access_token: &str) -> Result<UserInfo, ContactSyncError> {
        let response = self
            .client
            .get("https://www.googleapis.com/oauth2/v2/userinfo")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ContactSyncError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ContactSyncError::Auth("Failed to get user info".to_string()));
        }

        #[derive(Deserialize)]
        struct GoogleUserInfo {
            id: String,
            email: String,
            name: Option<String>,
        }

        let user_data: GoogleUserInfo = response
            .json()
            .await
            .map_err(|e| ContactSyncError::Parse(e.to_string()))?;

        Ok(UserInfo {
            id: user_data.id,
            email: user_data.email,
            name: user_data.name,
        })
    }

    /// Fetch one page of connections, retrying 429 responses with
    /// exponential backoff (`base_delay * 2^(attempt-1)`) up to
    /// `max_attempts` before giving up. Connections without any phone
    /// number are dropped here; the rest come back as raw records for the
    /// normalizer.
    pub async fn fetch_connections_page(
        &self,
        access_token: &str,
        page_token: Option<&str>,
        opts: &GoogleSyncOptions,
    ) -> Result<(Vec<RawContact>, Option<String>), ContactSyncError> {
        let mut url = format!(
            "{}/people/me/connections?personFields={}&pageSize={}",
            self.base_url, PERSON_FIELDS, opts.page_size
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={token}"));
        }

        let mut attempt = 1u32;
        let response = loop {
            let response = self
                .client
                .get(&url)
                .bearer_auth(access_token)
                .send()
                .await
                .map_err(|e| ContactSyncError::Network(e.to_string()))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                break response;
            }
            if attempt >= opts.max_attempts {
                return Err(ContactSyncError::RateLimited(format!(
                    "People API kept returning 429 after {attempt} attempts"
                )));
            }
            let delay = backoff_delay(attempt, opts.base_delay);
            warn!(
                "People API rate limited (attempt {attempt}), retrying in {}ms",
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        };

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ContactSyncError::Auth(
                "People API rejected the access token".to_string(),
            ));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Google connections list failed: {} - {}", status, body);
            return Err(ContactSyncError::Api(format!(
                "List connections failed: {status}"
            )));
        }

        #[derive(Deserialize)]
        struct ConnectionsResponse {
            connections: Option<Vec<GooglePerson>>,
            #[serde(rename = "nextPageToken")]
            next_page_token: Option<String>,
        }

        let data: ConnectionsResponse = response
            .json()
            .await
            .map_err(|e| ContactSyncError::Parse(e.to_string()))?;

        let total = data.connections.as_ref().map(Vec::len).unwrap_or(0);
        let contacts: Vec<RawContact> = data
            .connections
            .unwrap_or_default()
            .into_iter()
            .filter_map(map_person)
            .collect();
        debug!(
            "Fetched page: {} of {} connections usable",
            contacts.len(),
            total
        );

        Ok((contacts, data.next_page_token))
    }
}

pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    base * 2u32.saturating_pow(attempt.saturating_sub(1))
}

/// A connection with zero phone numbers is unusable and is dropped
/// entirely.
fn map_person(person: GooglePerson) -> Option<RawContact> {
    let phones: Vec<String> = person
        .phone_numbers
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|p| p.value.clone())
        .filter(|v| !v.trim().is_empty())
        .collect();
    if phones.is_empty() {
        return None;
    }

    let name = person.names.as_ref().and_then(|n| n.first());
    let org = person.organizations.as_ref().and_then(|o| o.first());
    let address = person.addresses.as_ref().and_then(|a| a.first());
    let anniversary = person
        .events
        .as_ref()
        .and_then(|events| {
            events
                .iter()
                .find(|e| e.kind.as_deref() == Some("anniversary"))
        })
        .and_then(|e| e.date.as_ref())
        .map(format_date)
        .unwrap_or_default();

    Some(RawContact {
        first_name: name
            .and_then(|n| n.given_name.clone())
            .unwrap_or_default(),
        middle_name: name
            .and_then(|n| n.middle_name.clone())
            .unwrap_or_default(),
        last_name: name
            .and_then(|n| n.family_name.clone())
            .unwrap_or_default(),
        phones,
        email: person
            .email_addresses
            .as_ref()
            .and_then(|e| e.first().and_then(|e| e.value.clone()))
            .unwrap_or_default(),
        website: person
            .urls
            .as_ref()
            .and_then(|u| u.first().and_then(|u| u.value.clone()))
            .unwrap_or_default(),
        company: org.and_then(|o| o.name.clone()).unwrap_or_default(),
        job_type: org.and_then(|o| o.title.clone()).unwrap_or_default(),
        flat_building_no: address
            .and_then(|a| a.extended_address.clone())
            .unwrap_or_default(),
        street: address
            .and_then(|a| a.street_address.clone())
            .unwrap_or_default(),
        city: address.and_then(|a| a.city.clone()).unwrap_or_default(),
        state: address.and_then(|a| a.region.clone()).unwrap_or_default(),
        country: address.and_then(|a| a.country.clone()).unwrap_or_default(),
        postal_code: address
            .and_then(|a| a.postal_code.clone())
            .unwrap_or_default(),
        date_of_birth: person
            .birthdays
            .as_ref()
            .and_then(|b| b.first().and_then(|b| b.date.as_ref()))
            .map(format_date)
            .unwrap_or_default(),
        anniversary,
        notes: person
            .biographies
            .as_ref()
            .and_then(|b| b.first().and_then(|bio| bio.content.clone()))
            .unwrap_or_default(),
    })
}

/// Coerce a People API structured date to `YYYY-MM-DD`. Missing segments
/// become empty components rather than an error; a fully missing date
/// renders as the empty string.
fn format_date(date: &GoogleDate) -> String {
    if date.year.is_none() && date.month.is_none() && date.day.is_none() {
        return String::new();
    }
    format!(
        "{}-{}-{}",
        date.year.map(|y| format!("{y:04}")).unwrap_or_default(),
        date.month.map(|m| format!("{m:02}")).unwrap_or_default(),
        date.day.map(|d| format!("{d:02}")).unwrap_or_default(),
    )
}

#[derive(Debug, Clone, Deserialize)]
struct GooglePerson {
    names: Option<Vec<GoogleName>>,
    #[serde(rename = "phoneNumbers")]
    phone_numbers: Option<Vec<GoogleValue>>,
    #[serde(rename = "emailAddresses")]
    email_addresses: Option<Vec<GoogleValue>>,
    organizations: Option<Vec<GoogleOrganization>>,
    addresses: Option<Vec<GoogleAddress>>,
    urls: Option<Vec<GoogleValue>>,
    birthdays: Option<Vec<GoogleDateWrapper>>,
    events: Option<Vec<GoogleEvent>>,
    biographies: Option<Vec<GoogleBiography>>,
}

#[derive(Debug, Clone, Deserialize)]
struct GoogleName {
    #[serde(rename = "givenName")]
    given_name: Option<String>,
    #[serde(rename = "middleName")]
    middle_name: Option<String>,
    #[serde(rename = "familyName")]
    family_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GoogleValue {
    value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GoogleOrganization {
    name: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GoogleAddress {
    #[serde(rename = "extendedAddress")]
    extended_address: Option<String>,
    #[serde(rename = "streetAddress")]
    street_address: Option<String>,
    city: Option<String>,
    region: Option<String>,
    country: Option<String>,
    #[serde(rename = "postalCode")]
    postal_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GoogleDateWrapper {
    date: Option<GoogleDate>,
}

#[derive(Debug, Clone, Deserialize)]
struct GoogleDate {
    year: Option<u32>,
    month: Option<u32>,
    day: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct GoogleEvent {
    #[serde(rename = "type")]
    kind: Option<String>,
    date: Option<GoogleDate>,
}

#[derive(Debug, Clone, Deserialize)]
struct GoogleBiography {
    content: Option<String>,
}
