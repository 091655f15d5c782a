use scrim_types::CallMode;
use serde::{Deserialize, Serialize};

fn default_output_opacity() -> f32 {
    0.8
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct UiConfig {
    pub click_through: bool,
    #[serde(default = "default_output_opacity")]
    pub output_opacity: f32,
    pub call_mode: CallMode,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            click_through: false,
            output_opacity: default_output_opacity(),
            call_mode: CallMode::default(),
        }
    }
}
