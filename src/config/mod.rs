use std::env;
use std::time::Duration;

use crate::contacts::google_client::{GoogleConfig, GoogleSyncOptions};

#[derive(Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub google: GoogleConfig,
    pub sync: SyncConfig,
}

#[derive(Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub session_cookie: String,
}

#[derive(Clone)]
pub struct SyncConfig {
    pub default_region: String,
    pub page_size: u32,
    pub base_delay_ms: u64,
    pub max_attempts: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            backend: BackendConfig {
                base_url: env::var("BACKEND_URL")
                    .unwrap_or_else(|_| "http://localhost:5000".to_string()),
                session_cookie: env::var("SESSION_COOKIE").unwrap_or_default(),
            },
            google: GoogleConfig {
                client_id: env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
                client_secret: env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            },
            sync: SyncConfig {
                default_region: env::var("DEFAULT_REGION").unwrap_or_else(|_| "IN".to_string()),
                page_size: env_number("SYNC_PAGE_SIZE", 1000),
                base_delay_ms: env_number("SYNC_BASE_DELAY_MS", 1000),
                max_attempts: env_number("SYNC_MAX_ATTEMPTS", 5),
            },
        }
    }
}

impl SyncConfig {
    pub fn google_options(&self) -> GoogleSyncOptions {
        GoogleSyncOptions {
            page_size: self.page_size,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_attempts: self.max_attempts,
        }
    }
}

fn env_number<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_environment() {
        // Only inspect keys this test does not set; env is process-global.
        assert_eq!(env_number::<u32>("SYNC_PAGE_SIZE_UNSET_TEST", 1000), 1000);
        assert_eq!(env_number::<u64>("SYNC_BASE_DELAY_MS_UNSET_TEST", 1000), 1000);
    }

    #[test]
    fn google_options_carry_sync_settings() {
        let sync = SyncConfig {
            default_region: "IN".into(),
            page_size: 500,
            base_delay_ms: 250,
            max_attempts: 3,
        };
        let opts = sync.google_options();
        assert_eq!(opts.page_size, 500);
        assert_eq!(opts.base_delay, Duration::from_millis(250));
        assert_eq!(opts.max_attempts, 3);
    }
}
