use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use scrim_types::Rect;
use xcap::Monitor;

use crate::frame::Frame;

/// Black-box screen reader.
///
/// `capture` returns `None` on any failure; callers treat that as "no sample
/// this tick".
pub trait FrameSource: Send + Sync {
    fn capture(&self, rect: Rect) -> Option<Frame>;

    /// Drop any OS capture resources. Later captures return `None`.
    fn release(&self) {}
}

/// Frame source backed by `xcap` monitor capture
pub struct XcapFrameSource {
    released: AtomicBool,
}

impl XcapFrameSource {
    /// Attach to the display. Fails when no monitor can be enumerated.
    pub fn new() -> Result<Self> {
        let monitors = Monitor::all().context("Failed to get monitors")?;
        if monitors.is_empty() {
            bail!("No monitor found");
        }
        tracing::info!("frame source attached to {} monitor(s)", monitors.len());
        Ok(Self {
            released: AtomicBool::new(false),
        })
    }

    /// Size of the primary monitor, used to derive overlay size limits
    pub fn primary_screen_size() -> Result<(u32, u32)> {
        let monitors = Monitor::all().context("Failed to get monitors")?;
        let monitor = monitors.first().context("No monitor found")?;
        Ok((monitor.width(), monitor.height()))
    }

    fn capture_region(&self, region: Rect) -> Result<Frame> {
        if region.is_empty() {
            bail!("Empty capture region {:?}", region);
        }

        let monitors = Monitor::all().context("Failed to get monitors")?;

        let bounds = |m: &Monitor| Rect::new(m.x(), m.y(), m.width(), m.height());

        let monitor = monitors
            .iter()
            .find(|m| {
                let b = bounds(m);
                region.x >= b.x
                    && region.y >= b.y
                    && region.right() <= b.right()
                    && region.bottom() <= b.bottom()
            })
            .or_else(|| monitors.iter().find(|m| bounds(m).intersects(&region)))
            .context("Region is outside every monitor")?;

        let visible = bounds(monitor)
            .intersection(&region)
            .context("Region is outside the selected monitor")?;

        let image = monitor.capture_image().context("Failed to capture screen")?;

        let cropped = xcap::image::imageops::crop_imm(
            &image,
            (visible.x - monitor.x()) as u32,
            (visible.y - monitor.y()) as u32,
            visible.width,
            visible.height,
        )
        .to_image();

        let (width, height) = cropped.dimensions();
        Frame::from_rgba(width, height, cropped.into_raw()).context("Captured buffer is malformed")
    }
}

impl FrameSource for XcapFrameSource {
    fn capture(&self, rect: Rect) -> Option<Frame> {
        if self.released.load(Ordering::Acquire) {
            tracing::debug!("capture requested after release");
            return None;
        }

        match self.capture_region(rect) {
            Ok(frame) => {
                tracing::debug!("captured {}x{} at {:?}", frame.width(), frame.height(), rect);
                Some(frame)
            }
            Err(e) => {
                tracing::warn!("screen capture failed: {:#}", e);
                None
            }
        }
    }

    fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            tracing::info!("frame source released");
        }
    }
}
