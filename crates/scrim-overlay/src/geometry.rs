//! Position and size of one overlay region and the pointer gestures that
//! move or resize it.

use scrim_types::{Point, Rect, RegionKind};

/// Distance from an edge, in pixels, within which a press starts a resize
pub const BORDER_MARGIN: i32 = 15;

/// Height of the title strip at the top of the source region
pub const CHROME_HEIGHT: u32 = 30;

/// Largest share of the screen a region may be resized to
const MAX_SCREEN_FRACTION: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeEdge {
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeEdge {
    fn from_sides(left: bool, right: bool, top: bool, bottom: bool) -> Option<Self> {
        match (left, right, top, bottom) {
            (true, _, true, _) => Some(Self::TopLeft),
            (true, _, _, true) => Some(Self::BottomLeft),
            (_, true, true, _) => Some(Self::TopRight),
            (_, true, _, true) => Some(Self::BottomRight),
            (true, ..) => Some(Self::Left),
            (_, true, ..) => Some(Self::Right),
            (_, _, true, _) => Some(Self::Top),
            (_, _, _, true) => Some(Self::Bottom),
            _ => None,
        }
    }

    pub fn left(&self) -> bool {
        matches!(self, Self::Left | Self::TopLeft | Self::BottomLeft)
    }

    pub fn right(&self) -> bool {
        matches!(self, Self::Right | Self::TopRight | Self::BottomRight)
    }

    pub fn top(&self) -> bool {
        matches!(self, Self::Top | Self::TopLeft | Self::TopRight)
    }

    pub fn bottom(&self) -> bool {
        matches!(self, Self::Bottom | Self::BottomLeft | Self::BottomRight)
    }
}

/// Size bounds and the screen area a region must stay within
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryLimits {
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub screen: Option<Rect>,
}

impl Default for GeometryLimits {
    fn default() -> Self {
        Self {
            min_width: 300,
            min_height: 200,
            max_width: i32::MAX as u32,
            max_height: i32::MAX as u32,
            screen: None,
        }
    }
}

impl GeometryLimits {
    /// Default minimum size, maximum size a fixed fraction of `screen`
    pub fn for_screen(screen: Rect) -> Self {
        let base = Self::default();
        Self {
            max_width: ((screen.width as f64 * MAX_SCREEN_FRACTION) as u32).max(base.min_width),
            max_height: ((screen.height as f64 * MAX_SCREEN_FRACTION) as u32).max(base.min_height),
            screen: Some(screen),
            ..base
        }
    }

    fn width_bounds(&self) -> (i64, i64) {
        let min = self.min_width.max(1) as i64;
        (min, (self.max_width as i64).max(min))
    }

    fn height_bounds(&self) -> (i64, i64) {
        let min = self.min_height.max(1) as i64;
        (min, (self.max_height as i64).max(min))
    }

    /// Bring an arbitrary rect within the size bounds and onto the screen
    pub fn clamp(&self, rect: Rect) -> Rect {
        let (min_w, max_w) = self.width_bounds();
        let (min_h, max_h) = self.height_bounds();
        let width = (rect.width as i64).clamp(min_w, max_w) as u32;
        let height = (rect.height as i64).clamp(min_h, max_h) as u32;
        let origin = self.clamp_origin(rect.origin(), width, height);
        Rect::new(origin.x, origin.y, width, height)
    }

    fn clamp_origin(&self, origin: Point, width: u32, height: u32) -> Point {
        let Some(screen) = self.screen else {
            return origin;
        };
        let max_x = (screen.right() - width as i32).max(screen.x);
        let max_y = (screen.bottom() - height as i32).max(screen.y);
        Point::new(origin.x.clamp(screen.x, max_x), origin.y.clamp(screen.y, max_y))
    }
}

/// Gesture in progress. A press starts either a move or a resize, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interaction {
    #[default]
    Idle,
    Dragging {
        /// Pointer position relative to the region origin at press time
        offset: Point,
    },
    Resizing {
        edge: ResizeEdge,
        anchor: Point,
        start: Rect,
    },
}

#[derive(Debug, Clone)]
pub struct OverlayRegion {
    kind: RegionKind,
    rect: Rect,
    limits: GeometryLimits,
    click_through: bool,
    interaction: Interaction,
}

impl OverlayRegion {
    pub fn new(kind: RegionKind, rect: Rect, limits: GeometryLimits) -> Self {
        Self {
            kind,
            rect: limits.clamp(rect),
            limits,
            click_through: false,
            interaction: Interaction::Idle,
        }
    }

    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    pub fn get_rect(&self) -> Rect {
        self.rect
    }

    /// Stored exactly as given. Only an empty rect is widened to the minimum
    /// size, since a region must always have an area.
    pub fn set_rect(&mut self, rect: Rect) {
        self.rect = if rect.is_empty() {
            Rect::new(
                rect.x,
                rect.y,
                rect.width.max(self.limits.min_width.max(1)),
                rect.height.max(self.limits.min_height.max(1)),
            )
        } else {
            rect
        };
    }

    pub fn limits(&self) -> &GeometryLimits {
        &self.limits
    }

    pub fn set_limits(&mut self, limits: GeometryLimits) {
        self.limits = limits;
    }

    /// Capturable payload area. The source region loses its title strip;
    /// `None` when nothing remains below it.
    pub fn get_content_rect(&self) -> Option<Rect> {
        match self.kind {
            RegionKind::Output => Some(self.rect),
            RegionKind::Source => {
                if self.rect.height <= CHROME_HEIGHT {
                    return None;
                }
                Some(Rect::new(
                    self.rect.x,
                    self.rect.y + CHROME_HEIGHT as i32,
                    self.rect.width,
                    self.rect.height - CHROME_HEIGHT,
                ))
            }
        }
    }

    pub fn click_through(&self) -> bool {
        self.click_through
    }

    /// Returns the settled rect when enabling click-through cut an
    /// interaction short
    pub fn set_click_through(&mut self, enabled: bool) -> Option<Rect> {
        if self.click_through == enabled {
            return None;
        }
        self.click_through = enabled;
        if enabled { self.finish() } else { None }
    }

    pub fn interaction(&self) -> Interaction {
        self.interaction
    }

    pub fn is_interacting(&self) -> bool {
        self.interaction != Interaction::Idle
    }

    /// Resize edge under the pointer, for cursor feedback
    pub fn hover_edge(&self, point: Point) -> Option<ResizeEdge> {
        if self.click_through || !self.rect.contains(point) {
            return None;
        }
        self.edge_at(point)
    }

    fn edge_at(&self, point: Point) -> Option<ResizeEdge> {
        let local_x = point.x - self.rect.x;
        let local_y = point.y - self.rect.y;
        let left = local_x < BORDER_MARGIN;
        let right = !left && local_x >= self.rect.width as i32 - BORDER_MARGIN;
        let top = local_y < BORDER_MARGIN;
        let bottom = !top && local_y >= self.rect.height as i32 - BORDER_MARGIN;
        ResizeEdge::from_sides(left, right, top, bottom)
    }

    /// Start a gesture. Returns false when the press is ignored.
    pub fn on_press(&mut self, point: Point) -> bool {
        if self.click_through || !self.rect.contains(point) {
            return false;
        }

        self.interaction = match self.edge_at(point) {
            Some(edge) => Interaction::Resizing {
                edge,
                anchor: point,
                start: self.rect,
            },
            None => Interaction::Dragging {
                offset: Point::new(point.x - self.rect.x, point.y - self.rect.y),
            },
        };
        tracing::debug!("{:?} region press: {:?}", self.kind, self.interaction);
        true
    }

    /// Returns whether the rect changed
    pub fn on_move(&mut self, point: Point) -> bool {
        let next = match self.interaction {
            Interaction::Idle => return false,
            Interaction::Dragging { offset } => {
                let origin = Point::new(point.x - offset.x, point.y - offset.y);
                let origin = self
                    .limits
                    .clamp_origin(origin, self.rect.width, self.rect.height);
                Rect::new(origin.x, origin.y, self.rect.width, self.rect.height)
            }
            Interaction::Resizing {
                edge,
                anchor,
                start,
            } => self.resized(edge, anchor, start, point),
        };

        let changed = next != self.rect;
        self.rect = next;
        changed
    }

    /// End the gesture. Yields the settled rect once per gesture.
    pub fn on_release(&mut self, _point: Point) -> Option<Rect> {
        self.finish()
    }

    fn finish(&mut self) -> Option<Rect> {
        if self.interaction == Interaction::Idle {
            return None;
        }
        self.interaction = Interaction::Idle;
        tracing::debug!("{:?} region settled at {:?}", self.kind, self.rect);
        Some(self.rect)
    }

    fn resized(&self, edge: ResizeEdge, anchor: Point, start: Rect, point: Point) -> Rect {
        let screen = self.limits.screen;
        let (x, width) = resize_axis(
            Span {
                pos: start.x as i64,
                len: start.width as i64,
                delta: point.x as i64 - anchor.x as i64,
            },
            edge.left(),
            edge.right(),
            self.limits.width_bounds(),
            screen.map(|s| (s.x as i64, s.right() as i64)),
        );
        let (y, height) = resize_axis(
            Span {
                pos: start.y as i64,
                len: start.height as i64,
                delta: point.y as i64 - anchor.y as i64,
            },
            edge.top(),
            edge.bottom(),
            self.limits.height_bounds(),
            screen.map(|s| (s.y as i64, s.bottom() as i64)),
        );
        Rect::new(x as i32, y as i32, width as u32, height as u32)
    }
}

struct Span {
    pos: i64,
    len: i64,
    delta: i64,
}

/// Move the near (left/top) or far (right/bottom) edge of one axis. The
/// opposite edge stays put and the length never leaves `min..=max`, so the
/// moving edge stops before it can cross over.
fn resize_axis(
    span: Span,
    near: bool,
    far: bool,
    (min, max): (i64, i64),
    bounds: Option<(i64, i64)>,
) -> (i64, i64) {
    if far {
        let mut len = span.len + span.delta;
        if let Some((_, hi)) = bounds {
            len = len.min(hi - span.pos);
        }
        (span.pos, len.clamp(min, max))
    } else if near {
        let end = span.pos + span.len;
        let mut len = span.len - span.delta;
        if let Some((lo, _)) = bounds {
            len = len.min(end - lo);
        }
        let len = len.clamp(min, max);
        (end - len, len)
    } else {
        (span.pos, span.len)
    }
}
