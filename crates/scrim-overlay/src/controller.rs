use scrim_types::{Point, PointerKind, Rect, RegionKind};

use crate::geometry::{GeometryLimits, OverlayRegion};
use crate::surface::RegionSurface;

/// Opacity multiplier applied while click-through is enabled
const DIM_FACTOR: f32 = 0.4;

/// The source region's own opacity; only the output region is configurable
const SOURCE_OPACITY: f32 = 1.0;

/// Owns both overlay regions and the surfaces that render them.
///
/// Rects change only through this type. The control loop reads them and
/// forwards pointer events; every change is pushed to the matching surface.
pub struct OverlayController {
    source: OverlayRegion,
    output: OverlayRegion,
    source_surface: Box<dyn RegionSurface>,
    output_surface: Box<dyn RegionSurface>,
    output_opacity: f32,
    output_visible: bool,
    click_through: bool,
}

impl OverlayController {
    pub fn new(
        source: Rect,
        output: Rect,
        limits: GeometryLimits,
        source_surface: Box<dyn RegionSurface>,
        output_surface: Box<dyn RegionSurface>,
    ) -> Self {
        let mut controller = Self {
            source: OverlayRegion::new(RegionKind::Source, source, limits),
            output: OverlayRegion::new(RegionKind::Output, output, limits),
            source_surface,
            output_surface,
            output_opacity: 1.0,
            output_visible: true,
            click_through: false,
        };

        let (source, output) = (controller.source.get_rect(), controller.output.get_rect());
        controller.source_surface.set_bounds(source);
        controller.output_surface.set_bounds(output);
        controller.source_surface.set_visible(true);
        controller.output_surface.set_visible(true);
        controller.apply_opacity();
        controller
    }

    pub fn region(&self, kind: RegionKind) -> &OverlayRegion {
        match kind {
            RegionKind::Source => &self.source,
            RegionKind::Output => &self.output,
        }
    }

    fn parts_mut(&mut self, kind: RegionKind) -> (&mut OverlayRegion, &mut dyn RegionSurface) {
        match kind {
            RegionKind::Source => (&mut self.source, self.source_surface.as_mut()),
            RegionKind::Output => (&mut self.output, self.output_surface.as_mut()),
        }
    }

    pub fn get_rect(&self, kind: RegionKind) -> Rect {
        self.region(kind).get_rect()
    }

    pub fn set_rect(&mut self, kind: RegionKind, rect: Rect) {
        let (region, surface) = self.parts_mut(kind);
        region.set_rect(rect);
        surface.set_bounds(region.get_rect());
    }

    /// Area of the screen a capture should read
    pub fn content_rect(&self) -> Option<Rect> {
        self.source.get_content_rect()
    }

    /// The source region is being moved or resized
    pub fn is_interacting(&self) -> bool {
        self.source.is_interacting()
    }

    /// Route a pointer event. Returns the settled rect when a gesture ends.
    pub fn on_pointer(&mut self, kind: RegionKind, pointer: PointerKind, point: Point) -> Option<Rect> {
        let (region, surface) = self.parts_mut(kind);
        match pointer {
            PointerKind::Press => {
                region.on_press(point);
                None
            }
            PointerKind::Move => {
                if region.on_move(point) {
                    surface.set_bounds(region.get_rect());
                }
                None
            }
            PointerKind::Release => region.on_release(point),
        }
    }

    pub fn click_through(&self) -> bool {
        self.click_through
    }

    /// Returns the regions whose gesture was cut short, with their settled
    /// rects
    pub fn set_click_through(&mut self, enabled: bool) -> Vec<(RegionKind, Rect)> {
        let mut settled = Vec::new();
        if self.click_through == enabled {
            return settled;
        }
        self.click_through = enabled;

        for kind in [RegionKind::Source, RegionKind::Output] {
            let (region, surface) = self.parts_mut(kind);
            if let Some(rect) = region.set_click_through(enabled) {
                settled.push((kind, rect));
            }
            surface.set_pass_through(enabled);
        }
        self.apply_opacity();

        tracing::info!("click-through {}", if enabled { "enabled" } else { "disabled" });
        settled
    }

    pub fn toggle_click_through(&mut self) -> Vec<(RegionKind, Rect)> {
        self.set_click_through(!self.click_through)
    }

    pub fn output_opacity(&self) -> f32 {
        self.output_opacity
    }

    pub fn set_output_opacity(&mut self, opacity: f32) {
        self.output_opacity = if opacity.is_nan() { 1.0 } else { opacity.clamp(0.0, 1.0) };
        self.apply_opacity();
    }

    fn apply_opacity(&mut self) {
        let factor = if self.click_through { DIM_FACTOR } else { 1.0 };
        self.source_surface.set_opacity(SOURCE_OPACITY * factor);
        self.output_surface.set_opacity(self.output_opacity * factor);
    }

    pub fn show_translation(&mut self, text: &str) {
        self.output_surface.show_text(text);
    }

    pub fn output_visible(&self) -> bool {
        self.output_visible
    }

    fn set_output_visible(&mut self, visible: bool) {
        if self.output_visible != visible {
            self.output_visible = visible;
            self.output_surface.set_visible(visible);
        }
    }

    /// The output region would appear in a capture of the source content
    pub fn output_overlaps_capture(&self) -> bool {
        self.content_rect()
            .is_some_and(|content| content.intersects(&self.output.get_rect()))
    }

    /// Hide the output region for as long as the guard lives, if it would
    /// otherwise end up in the captured pixels
    pub fn hide_output_for_capture(&mut self) -> VisibilityGuard<'_> {
        let hidden = self.output_visible && self.output_overlaps_capture();
        if hidden {
            tracing::debug!("hiding output region during capture");
            self.set_output_visible(false);
        }
        VisibilityGuard {
            controller: self,
            hidden,
        }
    }
}

/// Restores output visibility when dropped, on every exit path
pub struct VisibilityGuard<'a> {
    controller: &'a mut OverlayController,
    hidden: bool,
}

impl VisibilityGuard<'_> {
    pub fn hid_output(&self) -> bool {
        self.hidden
    }
}

impl Drop for VisibilityGuard<'_> {
    fn drop(&mut self) {
        if self.hidden {
            self.controller.set_output_visible(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Bounds(Rect),
        Visible(bool),
        PassThrough(bool),
        Opacity(f32),
        Text(String),
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Call>>>);

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.0.lock().unwrap().clone()
        }

        fn last_opacity(&self) -> Option<f32> {
            self.calls().into_iter().rev().find_map(|c| match c {
                Call::Opacity(o) => Some(o),
                _ => None,
            })
        }

        fn clear(&self) {
            self.0.lock().unwrap().clear();
        }
    }

    impl RegionSurface for Recorder {
        fn set_bounds(&mut self, rect: Rect) {
            self.0.lock().unwrap().push(Call::Bounds(rect));
        }
        fn set_visible(&mut self, visible: bool) {
            self.0.lock().unwrap().push(Call::Visible(visible));
        }
        fn set_pass_through(&mut self, enabled: bool) {
            self.0.lock().unwrap().push(Call::PassThrough(enabled));
        }
        fn set_opacity(&mut self, opacity: f32) {
            self.0.lock().unwrap().push(Call::Opacity(opacity));
        }
        fn show_text(&mut self, text: &str) {
            self.0.lock().unwrap().push(Call::Text(text.to_string()));
        }
    }

    fn controller(source: Rect, output: Rect) -> (OverlayController, Recorder, Recorder) {
        let (src, out) = (Recorder::default(), Recorder::default());
        let c = OverlayController::new(
            source,
            output,
            GeometryLimits::for_screen(Rect::new(0, 0, 1920, 1080)),
            Box::new(src.clone()),
            Box::new(out.clone()),
        );
        (c, src, out)
    }

    #[test]
    fn overlapping_output_is_hidden_then_restored() {
        let (mut c, _, out) = controller(Rect::new(0, 0, 400, 300), Rect::new(100, 100, 300, 200));
        assert!(c.output_overlaps_capture());
        out.clear();

        {
            let guard = c.hide_output_for_capture();
            assert!(guard.hid_output());
        }
        assert!(c.output_visible());
        assert_eq!(out.calls(), vec![Call::Visible(false), Call::Visible(true)]);
    }

    #[test]
    fn separate_output_is_left_alone() {
        let (mut c, _, out) = controller(Rect::new(0, 0, 400, 300), Rect::new(900, 100, 300, 200));
        out.clear();
        let guard = c.hide_output_for_capture();
        assert!(!guard.hid_output());
        drop(guard);
        assert!(out.calls().is_empty());
    }

    #[test]
    fn visibility_restored_when_capture_panics() {
        let (mut c, _, _) = controller(Rect::new(0, 0, 400, 300), Rect::new(100, 100, 300, 200));
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _guard = c.hide_output_for_capture();
            panic!("capture failed");
        }));
        assert!(result.is_err());
        assert!(c.output_visible());
    }

    #[test]
    fn chrome_strip_does_not_count_as_overlap() {
        // Output sits exactly over the source title strip
        let (c, _, _) = controller(Rect::new(0, 200, 400, 300), Rect::new(0, 0, 400, 230));
        assert!(!c.output_overlaps_capture());
    }

    #[test]
    fn click_through_dims_and_restores_opacity() {
        let (mut c, src, out) = controller(Rect::new(0, 0, 400, 300), Rect::new(900, 100, 300, 200));
        c.set_output_opacity(0.8);
        assert_eq!(out.last_opacity(), Some(0.8));

        c.toggle_click_through();
        assert!(c.click_through());
        assert!(out.calls().contains(&Call::PassThrough(true)));
        assert!((out.last_opacity().unwrap() - 0.32).abs() < 1e-6);
        assert!((src.last_opacity().unwrap() - 0.4).abs() < 1e-6);

        c.toggle_click_through();
        assert!(!c.click_through());
        assert_eq!(out.last_opacity(), Some(0.8));
        assert_eq!(src.last_opacity(), Some(1.0));
    }

    #[test]
    fn pointer_moves_push_bounds_and_release_settles() {
        let (mut c, src, _) = controller(Rect::new(100, 100, 400, 300), Rect::new(900, 100, 300, 200));
        src.clear();

        assert_eq!(c.on_pointer(RegionKind::Source, PointerKind::Press, Point::new(300, 250)), None);
        assert!(c.is_interacting());
        c.on_pointer(RegionKind::Source, PointerKind::Move, Point::new(320, 250));
        assert_eq!(src.calls(), vec![Call::Bounds(Rect::new(120, 100, 400, 300))]);

        let settled = c.on_pointer(RegionKind::Source, PointerKind::Release, Point::new(320, 250));
        assert_eq!(settled, Some(Rect::new(120, 100, 400, 300)));
        assert!(!c.is_interacting());
    }

    #[test]
    fn click_through_mid_drag_reports_settled_region() {
        let (mut c, _, _) = controller(Rect::new(100, 100, 400, 300), Rect::new(900, 100, 300, 200));
        c.on_pointer(RegionKind::Output, PointerKind::Press, Point::new(1000, 200));
        c.on_pointer(RegionKind::Output, PointerKind::Move, Point::new(1010, 200));

        let settled = c.set_click_through(true);
        assert_eq!(settled, vec![(RegionKind::Output, Rect::new(910, 100, 300, 200))]);
        assert!(c.set_click_through(true).is_empty());
    }

    #[test]
    fn translation_text_reaches_output_surface() {
        let (mut c, src, out) = controller(Rect::new(100, 100, 400, 300), Rect::new(900, 100, 300, 200));
        c.show_translation("Hello");
        assert!(out.calls().contains(&Call::Text("Hello".into())));
        assert!(!src.calls().iter().any(|call| matches!(call, Call::Text(_))));
    }
}
