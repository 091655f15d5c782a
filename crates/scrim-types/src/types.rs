use serde::{Deserialize, Serialize};

use crate::rect::Point;

/// How capture ticks are turned into translation requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallMode {
    /// Timer ticks capture and submit on change
    Auto,
    /// Only the manual-translate hotkey captures
    #[default]
    Manual,
}

/// Actions a hotkey can be bound to. The listener thread only ever enqueues
/// one of these; the control loop executes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyAction {
    /// Start translating when idle, stop when running
    ToggleRunning,
    ToggleClickThrough,
    ManualTranslate,
    OpenSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// The region whose content is captured
    Source,
    /// The region that displays translations
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Press,
    Move,
    Release,
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    Hotkey(HotkeyAction),
    Pointer {
        region: RegionKind,
        kind: PointerKind,
        point: Point,
    },
    StartRequested,
    StopRequested,
    OpenSettings,
    /// The settings dialog saved a new configuration to the store
    SettingsCommitted,
    SettingsCancelled,
    Shutdown,
}
