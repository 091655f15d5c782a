mod combo;
mod engine;
mod error;
mod key;
mod listener;

pub use combo::Combination;
pub use engine::{Callback, HotkeyEngine};
pub use error::HotkeyError;
pub use key::{Key, KeyEvent, KeyEventKind, RawKey, logical_keys, parse_token};
pub use listener::{DeviceQuerySource, KeySource};
