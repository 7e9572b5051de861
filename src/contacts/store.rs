use std::future::Future;
use std::time::Duration;

use log::info;
use tokio::task::JoinHandle;

use crate::contacts::backend_client::{BackendClient, ContactPage};
use crate::contacts::model::{canonical_category, canonical_relation, Contact};
use crate::contacts::ContactSyncError;

pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Coalescing window for search-triggered refetches.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Server-side filter selection. Any non-empty field switches the fetch
/// from paginated mode to fetch-all mode.
#[derive(Debug, Clone, Default)]
pub struct ContactFilters {
    pub categories: Vec<String>,
    pub relations: Vec<String>,
    pub release_on_pass: Option<bool>,
}

impl ContactFilters {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.relations.is_empty() && self.release_on_pass.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct ContactQuery {
    pub page: u32,
    pub limit: u32,
    pub filter_type: String,
    pub search: String,
    pub filters: ContactFilters,
}

impl Default for ContactQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            filter_type: String::new(),
            search: String::new(),
            filters: ContactFilters::default(),
        }
    }
}

impl ContactQuery {
    /// Build the request parameters. Paginated mode and filtered mode are
    /// mutually exclusive: any filter forces `all=true` and drops
    /// `page`/`limit`.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if self.filters.is_empty() {
            params.push(("page".to_string(), self.page.to_string()));
            params.push(("limit".to_string(), self.limit.to_string()));
        } else {
            params.push(("all".to_string(), "true".to_string()));
        }
        if !self.filter_type.is_empty() {
            params.push(("filter".to_string(), self.filter_type.clone()));
        }
        if !self.search.is_empty() {
            params.push(("search".to_string(), self.search.clone()));
        }

        let (known, custom) = split_filter_values(&self.filters.categories, canonical_category);
        if !known.is_empty() {
            params.push(("categories".to_string(), known.join(",")));
        }
        // Only the first custom value is honored; the backend takes a
        // single substring filter.
        if let Some(first) = custom.first() {
            params.push(("category_like".to_string(), first.clone()));
        }

        let (known, custom) = split_filter_values(&self.filters.relations, canonical_relation);
        if !known.is_empty() {
            params.push(("relations".to_string(), known.join(",")));
        }
        if let Some(first) = custom.first() {
            params.push(("relation_like".to_string(), first.clone()));
        }

        if let Some(release) = self.filters.release_on_pass {
            params.push(("release_on_pass".to_string(), release.to_string()));
        }
        params
    }
}

/// Split filter values into seeded and custom ones. Seeded matches are
/// canonicalized to their enumeration spelling so the backend's exact-match
/// list lookup recognizes them regardless of how the user typed them.
fn split_filter_values(
    values: &[String],
    canonical: fn(&str) -> Option<&'static str>,
) -> (Vec<String>, Vec<String>) {
    let mut known = Vec::new();
    let mut custom = Vec::new();
    for value in values {
        match canonical(value) {
            Some(seeded) => known.push(seeded.to_string()),
            None => custom.push(value.clone()),
        }
    }
    (known, custom)
}

/// View over the backend contact store: network fetches, bulk edits and
/// deletes. Local (non-network) filtering lives in [`LocalFilter`].
pub struct ContactStore {
    client: BackendClient,
}

impl ContactStore {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    pub async fn fetch_contacts(&self, query: &ContactQuery) -> Result<ContactPage, ContactSyncError> {
        self.client.fetch_contacts(&query.to_params()).await
    }

    /// Bulk categorize. Fails client-side, before any request, when no
    /// contacts are selected. The relation only accompanies the "Family"
    /// category.
    pub async fn categorize(
        &self,
        contact_ids: &[i64],
        category: &str,
        relation: &str,
        is_ambassador: bool,
        is_nominee: bool,
    ) -> Result<String, ContactSyncError> {
        if contact_ids.is_empty() {
            return Err(ContactSyncError::InvalidData(
                "Select at least one contact to categorize".into(),
            ));
        }
        let relation = (category == "Family" && !relation.is_empty()).then_some(relation);
        let message = self
            .client
            .categorize_contacts(contact_ids, category, relation, is_ambassador, is_nominee)
            .await?;
        info!("Categorized {} contacts as {category}", contact_ids.len());
        Ok(message)
    }

    pub async fn delete_selected(&self, contact_ids: &[i64]) -> Result<String, ContactSyncError> {
        self.client.delete_contacts(contact_ids).await
    }

    pub async fn delete_one(&self, contact_id: i64) -> Result<String, ContactSyncError> {
        self.client.delete_contact(contact_id).await
    }

    pub async fn delete_file(&self, file_id: i64) -> Result<String, ContactSyncError> {
        self.client.delete_file(file_id).await
    }
}

/// Local soft-filtering over an already-fetched contact list. All set
/// predicates AND together; contacts are never removed, only hidden.
#[derive(Debug, Clone, Default)]
pub struct LocalFilter {
    pub search: String,
    pub letter: Option<char>,
    pub categories: Vec<String>,
    pub relations: Vec<String>,
    pub release_on_pass: Option<bool>,
}

impl LocalFilter {
    pub fn matches(&self, contact: &Contact) -> bool {
        if !self.search.is_empty() {
            let haystack = contact.display_name().to_lowercase();
            if !haystack.contains(&self.search.to_lowercase()) {
                return false;
            }
        }
        if let Some(letter) = self.letter {
            let starts = contact
                .first_name
                .chars()
                .next()
                .map(|c| c.eq_ignore_ascii_case(&letter))
                .unwrap_or(false);
            if !starts {
                return false;
            }
        }
        if !self.categories.is_empty() && !member_or_substring(&self.categories, &contact.category)
        {
            return false;
        }
        if !self.relations.is_empty() && !member_or_substring(&self.relations, &contact.relation) {
            return false;
        }
        if let Some(release) = self.release_on_pass {
            if contact.release_on_pass != release {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, contacts: &'a [Contact]) -> Vec<&'a Contact> {
        contacts.iter().filter(|c| self.matches(c)).collect()
    }
}

fn member_or_substring(values: &[String], actual: &str) -> bool {
    let actual_lower = actual.to_lowercase();
    values.iter().any(|v| {
        let v = v.to_lowercase();
        actual_lower == v || actual_lower.contains(&v)
    })
}

/// Coalesces rapid search input into one deferred action. Re-triggering
/// cancels the pending action; dropping the debouncer (teardown) cancels it
/// too, so nothing fires after the owner is gone.
pub struct SearchDebouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn trigger<F, Fut>(&mut self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action().await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
