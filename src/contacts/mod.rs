// Contact ingestion & synchronization pipeline: source adapters feed the
// normalizer, normalized batches go through the backend client, and the
// store view reads them back for filtering and bulk edits.
pub mod backend_client;
pub mod device_import;
pub mod google_client;
pub mod model;
pub mod normalize;
pub mod phone;
pub mod store;
pub mod sync;
pub mod vcf_import;

pub use backend_client::{BackendClient, SaveOutcome, SkippedContact};
pub use model::{Contact, ShareBy, UploadedFile};
pub use normalize::{normalize_contact, RawContact, SyncSource};
pub use sync::{SyncOutcome, SyncReport};

#[derive(Debug, thiserror::Error)]
pub enum ContactSyncError {
    #[error("Auth error: {0}")]
    Auth(String),
    #[error("Session expired")]
    SessionExpired,
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Contact picker unavailable: {0}")]
    PickerUnavailable(String),
}
