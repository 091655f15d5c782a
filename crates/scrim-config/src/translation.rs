use serde::{Deserialize, Serialize};

fn default_target_language() -> String {
    "ko".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_capture_interval() -> u64 {
    3
}

fn default_similarity_threshold() -> f64 {
    0.95
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TranslationConfig {
    #[serde(default = "default_target_language")]
    pub target_language: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Seconds between capture ticks in auto mode
    #[serde(default = "default_capture_interval")]
    pub capture_interval: u64,
    /// Frames less similar than this count as changed
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            target_language: default_target_language(),
            model: default_model(),
            capture_interval: default_capture_interval(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}
