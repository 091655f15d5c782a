mod capture;
mod detect;
mod frame;
mod ssim;

pub use capture::{FrameSource, XcapFrameSource};
pub use detect::{ChangeDetector, DetectError, pixel_difference, structural_similarity};
pub use frame::{Frame, FrameError};
