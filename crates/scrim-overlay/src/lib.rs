mod controller;
mod geometry;
mod surface;

pub use controller::{OverlayController, VisibilityGuard};
pub use geometry::{
    BORDER_MARGIN, CHROME_HEIGHT, GeometryLimits, Interaction, OverlayRegion, ResizeEdge,
};
pub use surface::{NullSurface, RegionSurface};
