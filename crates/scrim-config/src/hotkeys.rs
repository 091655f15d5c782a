use scrim_types::HotkeyAction;
use serde::{Deserialize, Serialize};

fn default_toggle_running() -> String {
    "Ctrl+Alt+S".to_string()
}

fn default_toggle_click_through() -> String {
    "Ctrl+Alt+T".to_string()
}

fn default_manual_translate() -> String {
    "Ctrl+Shift+T".to_string()
}

fn default_open_settings() -> String {
    "Ctrl+,".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HotkeyConfig {
    #[serde(default = "default_toggle_running")]
    pub toggle_running: String,
    #[serde(default = "default_toggle_click_through")]
    pub toggle_click_through: String,
    #[serde(default = "default_manual_translate")]
    pub manual_translate: String,
    #[serde(default = "default_open_settings")]
    pub open_settings: String,
}

impl HotkeyConfig {
    /// Combination string and description for every bindable action
    pub fn bindings(&self) -> [(HotkeyAction, &str, &'static str); 4] {
        [
            (
                HotkeyAction::ToggleRunning,
                self.toggle_running.as_str(),
                "start or stop translating",
            ),
            (
                HotkeyAction::ToggleClickThrough,
                self.toggle_click_through.as_str(),
                "toggle click-through",
            ),
            (
                HotkeyAction::ManualTranslate,
                self.manual_translate.as_str(),
                "manual translate",
            ),
            (
                HotkeyAction::OpenSettings,
                self.open_settings.as_str(),
                "open settings",
            ),
        ]
    }
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            toggle_running: default_toggle_running(),
            toggle_click_through: default_toggle_click_through(),
            manual_translate: default_manual_translate(),
            open_settings: default_open_settings(),
        }
    }
}
