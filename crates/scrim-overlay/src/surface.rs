use scrim_types::{Rect, RegionKind};

/// Window that renders one overlay region. Implemented by the UI layer; the
/// controller only ever pushes state into it.
pub trait RegionSurface: Send + Sync {
    fn set_bounds(&mut self, rect: Rect);
    fn set_visible(&mut self, visible: bool);
    /// Pass pointer input through to whatever is beneath the region
    fn set_pass_through(&mut self, enabled: bool);
    fn set_opacity(&mut self, opacity: f32);
    fn show_text(&mut self, text: &str);
}

/// Surface for headless runs. Records nothing, logs everything.
#[derive(Debug)]
pub struct NullSurface {
    kind: RegionKind,
}

impl NullSurface {
    pub fn new(kind: RegionKind) -> Self {
        Self { kind }
    }
}

impl RegionSurface for NullSurface {
    fn set_bounds(&mut self, rect: Rect) {
        tracing::trace!("{:?} surface bounds {:?}", self.kind, rect);
    }

    fn set_visible(&mut self, visible: bool) {
        tracing::trace!("{:?} surface visible={}", self.kind, visible);
    }

    fn set_pass_through(&mut self, enabled: bool) {
        tracing::debug!("{:?} surface pass-through={}", self.kind, enabled);
    }

    fn set_opacity(&mut self, opacity: f32) {
        tracing::trace!("{:?} surface opacity={:.2}", self.kind, opacity);
    }

    fn show_text(&mut self, text: &str) {
        tracing::info!("{:?}: {}", self.kind, text);
    }
}
