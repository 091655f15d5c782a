use scrim_types::Rect;
use serde::{Deserialize, Serialize};

fn default_source() -> Rect {
    Rect::new(100, 100, 300, 200)
}

fn default_output() -> Rect {
    Rect::new(450, 100, 300, 200)
}

/// Persisted overlay geometry
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct WindowsConfig {
    #[serde(default = "default_source")]
    pub source: Rect,
    #[serde(default = "default_output")]
    pub output: Rect,
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            output: default_output(),
        }
    }
}
