use std::sync::Arc;

use scrim_config::Config;
use scrim_translator::{GeminiTranslator, Translator};

/// Control loop lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    /// No capture cadence
    Idle,
    Running,
    /// Capture suspended. `resume` records whether to go back to Running.
    SettingsOpen { resume: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    #[error("No translation capability is configured; set an API key first")]
    CapabilityAbsent,

    #[error("Cannot {action} while {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: ControlState,
    },

    #[error("Control loop has been torn down")]
    TornDown,
}

/// Whether translation is possible with the current configuration
#[derive(Clone)]
pub enum Capability {
    Ready(Arc<dyn Translator>),
    Absent,
}

impl Capability {
    /// Gemini client from the configured key, model and target language
    pub fn from_config(config: &Config) -> Self {
        if !config.api.has_key() {
            tracing::warn!("no API key configured, translation unavailable");
            return Self::Absent;
        }

        let mut translator = match GeminiTranslator::new(config.api.api_key.clone()) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!("failed to create translator: {}", e);
                return Self::Absent;
            }
        };
        if let Err(e) = translator.set_model(&config.translation.model) {
            tracing::warn!("{}, keeping {}", e, translator.model());
        }
        translator.set_target_language(&config.translation.target_language);

        tracing::info!(
            "translator ready: {} -> {}",
            translator.model(),
            translator.target_language()
        );
        Self::Ready(Arc::new(translator))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Builds the capability whenever the configuration changes
pub type CapabilityFactory = Box<dyn Fn(&Config) -> Capability + Send + Sync>;
