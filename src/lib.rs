pub mod config;
pub mod contacts;

pub use config::AppConfig;
pub use contacts::ContactSyncError;
