pub mod rect;
pub mod types;

pub use rect::{Point, Rect};
pub use types::*;
