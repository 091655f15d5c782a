use serde::{Deserialize, Serialize};
use serde_json::Value;

use self::api::ApiConfig;
use self::hotkeys::HotkeyConfig;
use self::translation::TranslationConfig;
use self::ui::UiConfig;
use self::windows::WindowsConfig;

pub mod api;
pub mod hotkeys;
pub mod store;
pub mod translation;
pub mod ui;
pub mod windows;

pub use store::{ConfigStore, MemoryStore};

const SECRET_PATH: &str = "api.api_key";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown config path: {0}")]
    UnknownPath(String),

    #[error("Invalid value for {path}: {source}")]
    TypeMismatch {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub translation: TranslationConfig,
    pub ui: UiConfig,
    pub windows: WindowsConfig,
    pub hotkeys: HotkeyConfig,
}

impl Config {
    /// Defaults with the API key taken from the environment
    pub fn new() -> Self {
        Config {
            api: ApiConfig::from_env(),
            ..Default::default()
        }
    }

    /// Clamp numeric fields into their valid ranges
    pub fn sanitized(mut self) -> Self {
        self.translation.capture_interval = self.translation.capture_interval.max(1);
        self.translation.similarity_threshold =
            self.translation.similarity_threshold.clamp(0.0, 1.0);
        self.ui.output_opacity = self.ui.output_opacity.clamp(0.0, 1.0);
        self
    }

    /// Read a value by dotted key path, e.g. `"ui.call_mode"`
    pub fn get_path(&self, path: &str) -> Option<Value> {
        if path == SECRET_PATH {
            return Some(Value::String(self.api.api_key.clone()));
        }
        let root = serde_json::to_value(self).ok()?;
        root.pointer(&pointer(path)).cloned()
    }

    /// Write a value by dotted key path. Only paths that exist in the schema
    /// are accepted, and the result must still deserialize into `Config`.
    pub fn set_path(&mut self, path: &str, value: Value) -> Result<(), ConfigError> {
        if path == SECRET_PATH {
            let key = value.as_str().ok_or_else(|| ConfigError::TypeMismatch {
                path: path.to_string(),
                source: serde::de::Error::custom("expected a string"),
            })?;
            self.api.api_key = key.to_string();
            return Ok(());
        }

        let mut root = serde_json::to_value(&*self)?;
        let slot = root
            .pointer_mut(&pointer(path))
            .ok_or_else(|| ConfigError::UnknownPath(path.to_string()))?;
        *slot = value;

        let mut updated: Config =
            serde_json::from_value(root).map_err(|source| ConfigError::TypeMismatch {
                path: path.to_string(),
                source,
            })?;
        updated.api = self.api.clone();
        *self = updated;
        Ok(())
    }
}

fn pointer(path: &str) -> String {
    path.split('.').fold(String::new(), |mut acc, part| {
        acc.push('/');
        acc.push_str(part);
        acc
    })
}
