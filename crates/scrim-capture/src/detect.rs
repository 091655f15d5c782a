use crate::frame::Frame;
use crate::ssim::mean_ssim;

/// Per-channel delta above which a pixel counts as different
const PIXEL_DELTA: u8 = 30;

#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("Frame dimensions differ: {left:?} vs {right:?}")]
    DimensionMismatch {
        left: (u32, u32),
        right: (u32, u32),
    },

    #[error("Frame {width}x{height} is too small to compare")]
    TooSmall { width: u32, height: u32 },

    #[error("Pixel buffer does not match its channel layout")]
    ChannelMismatch,
}

/// Structural similarity of `current` against `baseline`, in [0.0, 1.0].
///
/// `current` is rescaled to the baseline's dimensions first.
pub fn structural_similarity(baseline: &Frame, current: &Frame) -> Result<f64, DetectError> {
    let current = current.resized(baseline.width(), baseline.height());
    mean_ssim(&baseline.luma(), &current.luma())
}

/// Fraction of pixels where any colour channel moved by more than 30 levels
pub fn pixel_difference(baseline: &Frame, current: &Frame) -> Result<f64, DetectError> {
    let current = current.resized(baseline.width(), baseline.height());
    let (a, b) = (baseline.as_raw(), current.as_raw());
    if a.len() != b.len() || a.len() % 4 != 0 {
        return Err(DetectError::ChannelMismatch);
    }

    let total = a.len() / 4;
    let changed = a
        .chunks_exact(4)
        .zip(b.chunks_exact(4))
        .filter(|(pa, pb)| {
            pa[..3]
                .iter()
                .zip(&pb[..3])
                .any(|(x, y)| x.abs_diff(*y) > PIXEL_DELTA)
        })
        .count();

    Ok(changed as f64 / total as f64)
}

/// Gate that decides whether a new frame is worth translating.
///
/// Holds one baseline frame. Only frames judged changed replace it, so a
/// flicker that stays above the threshold never drifts the baseline.
pub struct ChangeDetector {
    threshold: f64,
    previous: Option<Frame>,
}

impl ChangeDetector {
    pub fn new(threshold: f64) -> Self {
        let mut detector = Self {
            threshold: 1.0,
            previous: None,
        };
        detector.set_threshold(threshold);
        detector
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Clamped to [0.0, 1.0]. NaN keeps the current threshold.
    pub fn set_threshold(&mut self, threshold: f64) {
        if threshold.is_nan() {
            tracing::warn!("ignoring NaN similarity threshold");
            return;
        }
        self.threshold = threshold.clamp(0.0, 1.0);
    }

    pub fn has_baseline(&self) -> bool {
        self.previous.is_some()
    }

    /// Forget the baseline; the next frame is treated as a cold start
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Similarity of `current` to the baseline, or `None` before the first
    /// frame. Computation failures score 0.0.
    pub fn similarity(&self, current: &Frame) -> Option<f64> {
        let previous = self.previous.as_ref()?;
        Some(structural_similarity(previous, current).unwrap_or_else(|e| {
            tracing::warn!("similarity failed, treating frame as changed: {}", e);
            0.0
        }))
    }

    /// Coarse auxiliary metric against the baseline. 1.0 when there is no
    /// baseline or the comparison fails.
    pub fn pixel_difference(&self, current: &Frame) -> f64 {
        match &self.previous {
            Some(previous) => pixel_difference(previous, current).unwrap_or(1.0),
            None => 1.0,
        }
    }

    pub fn has_changed(&mut self, current: Frame) -> bool {
        let Some(previous) = &self.previous else {
            tracing::info!("first frame, treating as changed");
            self.previous = Some(current);
            return true;
        };

        let (width, height) = previous.dimensions();
        let current = current.resized(width, height);
        let similarity = match structural_similarity(previous, &current) {
            Ok(similarity) => similarity,
            Err(e) => {
                // Fails open whatever the threshold
                tracing::warn!("similarity failed, treating frame as changed: {}", e);
                self.previous = Some(current);
                return true;
            }
        };
        let changed = similarity < self.threshold;

        if changed {
            tracing::info!(
                "frame changed (similarity {:.3}, threshold {:.3})",
                similarity,
                self.threshold
            );
            self.previous = Some(current);
        } else {
            tracing::debug!(
                "frame unchanged (similarity {:.3}, threshold {:.3})",
                similarity,
                self.threshold
            );
        }

        changed
    }
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new(0.95)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_from_fn(w: u32, h: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> Frame {
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&f(x, y));
            }
        }
        Frame::from_rgba(w, h, data).unwrap()
    }

    fn text_like(w: u32, h: u32, shift: u32) -> Frame {
        frame_from_fn(w, h, |x, y| {
            let on = ((x + shift) / 3 + y / 4) % 3 == 0;
            if on { [240, 240, 240, 255] } else { [20, 20, 20, 255] }
        })
    }

    #[test]
    fn first_call_is_always_changed() {
        for frame in [
            Frame::solid(1, 1, [0, 0, 0, 255]).unwrap(),
            text_like(64, 32, 0),
        ] {
            let mut detector = ChangeDetector::new(0.95);
            assert!(detector.has_changed(frame));
            assert!(detector.has_baseline());
        }
    }

    #[test]
    fn identical_frame_twice_is_unchanged() {
        let mut detector = ChangeDetector::new(0.95);
        let frame = text_like(64, 32, 0);
        assert!(detector.has_changed(frame.clone()));
        assert_eq!(detector.similarity(&frame), Some(1.0));
        assert!(!detector.has_changed(frame));
    }

    #[test]
    fn new_content_is_changed_and_becomes_baseline() {
        let mut detector = ChangeDetector::new(0.95);
        let a = text_like(64, 32, 0);
        let b = text_like(64, 32, 1);
        assert!(detector.has_changed(a.clone()));
        assert!(detector.has_changed(b.clone()));
        assert!(!detector.has_changed(b));
        assert!(detector.has_changed(a));
    }

    #[test]
    fn different_sizes_are_rescaled_not_rejected() {
        let mut detector = ChangeDetector::new(0.95);
        assert!(detector.has_changed(Frame::solid(64, 32, [128, 128, 128, 255]).unwrap()));
        assert!(!detector.has_changed(Frame::solid(80, 40, [128, 128, 128, 255]).unwrap()));
        assert!(detector.has_changed(text_like(30, 90, 0)));
        // baseline keeps its original dimensions
        assert_eq!(detector.previous.as_ref().unwrap().dimensions(), (64, 32));
    }

    #[test]
    fn unchanged_frames_do_not_advance_baseline() {
        let mut detector = ChangeDetector::new(0.5);
        let base = text_like(64, 32, 0);
        let slightly_off = frame_from_fn(64, 32, |x, y| {
            let mut px = if ((x / 3) + y / 4) % 3 == 0 { [240, 240, 240, 255] } else { [20, 20, 20, 255] };
            if x == 0 && y == 0 {
                px = [0, 0, 0, 255];
            }
            px
        });
        assert!(detector.has_changed(base.clone()));
        assert!(!detector.has_changed(slightly_off));
        assert_eq!(detector.similarity(&base), Some(1.0));
    }

    #[test]
    fn computation_failure_fails_open() {
        let mut detector = ChangeDetector::new(0.0);
        let tiny = Frame::solid(2, 2, [50, 50, 50, 255]).unwrap();
        assert!(detector.has_changed(tiny.clone()));
        // too small for any similarity window
        assert_eq!(detector.similarity(&tiny), Some(0.0));

        detector.set_threshold(0.5);
        assert!(detector.has_changed(tiny));
    }

    #[test]
    fn computation_failure_is_changed_even_at_zero_threshold() {
        let mut detector = ChangeDetector::new(0.0);
        let tiny = Frame::solid(2, 2, [50, 50, 50, 255]).unwrap();
        assert!(detector.has_changed(tiny.clone()));
        assert!(detector.has_changed(tiny.clone()));
        assert!(detector.has_changed(tiny));
        assert!(detector.has_baseline());
    }

    #[test]
    fn threshold_is_clamped() {
        let mut detector = ChangeDetector::new(0.95);
        detector.set_threshold(1.5);
        assert_eq!(detector.threshold(), 1.0);
        detector.set_threshold(-1.0);
        assert_eq!(detector.threshold(), 0.0);
        detector.set_threshold(f64::NAN);
        assert_eq!(detector.threshold(), 0.0);
    }

    #[test]
    fn reset_forces_cold_start() {
        let mut detector = ChangeDetector::new(0.95);
        let frame = text_like(64, 32, 0);
        assert!(detector.has_changed(frame.clone()));
        detector.reset();
        assert!(!detector.has_baseline());
        assert!(detector.has_changed(frame));
    }

    #[test]
    fn pixel_difference_counts_changed_pixels() {
        let black = Frame::solid(10, 10, [0, 0, 0, 255]).unwrap();
        let half = frame_from_fn(10, 10, |x, _| if x < 5 { [0, 0, 0, 255] } else { [0, 31, 0, 255] });
        let faint = Frame::solid(10, 10, [30, 30, 30, 255]).unwrap();
        assert_eq!(pixel_difference(&black, &half).unwrap(), 0.5);
        assert_eq!(pixel_difference(&black, &faint).unwrap(), 0.0);

        let mut detector = ChangeDetector::new(0.95);
        assert_eq!(detector.pixel_difference(&half), 1.0);
        detector.has_changed(black);
        assert_eq!(detector.pixel_difference(&half), 0.5);
    }
}
