use std::env;

use serde::{Deserialize, Serialize};

pub const API_KEY_ENV: &str = "SCRIM_API_KEY";

/// Credentials for the translation service.
///
/// The key is never serialized: it comes from the environment (or a `.env`
/// file) and at-rest encryption is owned by whoever persists it.
#[derive(Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let api_key = env::var(API_KEY_ENV).unwrap_or_default();
        Self { api_key }
    }

    pub fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &if self.has_key() { "<set>" } else { "<empty>" })
            .finish()
    }
}
