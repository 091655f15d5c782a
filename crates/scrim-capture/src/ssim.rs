//! Mean structural similarity over a sliding square window.
//!
//! Follows the usual Wang et al. formulation with a uniform 7x7 window,
//! sample covariance and constants K1 = 0.01, K2 = 0.03 for 8-bit data.
//! Only windows that lie fully inside the image contribute to the mean.

use image::GrayImage;

use crate::detect::DetectError;

const WINDOW: usize = 7;
const MIN_WINDOW: usize = 3;
const K1: f64 = 0.01;
const K2: f64 = 0.03;
const DATA_RANGE: f64 = 255.0;

/// Running sums over one window: x, y, x², y², xy
type Sums = [u64; 5];

pub(crate) fn mean_ssim(a: &GrayImage, b: &GrayImage) -> Result<f64, DetectError> {
    if a.dimensions() != b.dimensions() {
        return Err(DetectError::DimensionMismatch {
            left: a.dimensions(),
            right: b.dimensions(),
        });
    }

    let (w, h) = (a.width() as usize, a.height() as usize);
    let win = window_size(w.min(h)).ok_or(DetectError::TooSmall {
        width: a.width(),
        height: a.height(),
    })?;

    let pa = a.as_raw();
    let pb = b.as_raw();
    if pa.len() != w * h || pb.len() != w * h {
        return Err(DetectError::ChannelMismatch);
    }

    let n = (win * win) as f64;
    let cov_norm = n / (n - 1.0);
    let c1 = (K1 * DATA_RANGE).powi(2);
    let c2 = (K2 * DATA_RANGE).powi(2);

    let window_ssim = |s: &Sums| -> f64 {
        let mu_x = s[0] as f64 / n;
        let mu_y = s[1] as f64 / n;
        let var_x = cov_norm * (s[2] as f64 / n - mu_x * mu_x);
        let var_y = cov_norm * (s[3] as f64 / n - mu_y * mu_y);
        let cov_xy = cov_norm * (s[4] as f64 / n - mu_x * mu_y);

        let num = (2.0 * mu_x * mu_y + c1) * (2.0 * cov_xy + c2);
        let den = (mu_x * mu_x + mu_y * mu_y + c1) * (var_x + var_y + c2);
        num / den
    };

    // Per-column sums over the current band of `win` rows
    let mut columns: Vec<Sums> = vec![[0; 5]; w];
    for y in 0..win {
        for (x, col) in columns.iter_mut().enumerate() {
            add(col, pa[y * w + x], pb[y * w + x]);
        }
    }

    let mut total = 0.0;
    let mut count = 0u64;

    for top in 0..=(h - win) {
        if top > 0 {
            let leaving = (top - 1) * w;
            let entering = (top + win - 1) * w;
            for (x, col) in columns.iter_mut().enumerate() {
                sub(col, pa[leaving + x], pb[leaving + x]);
                add(col, pa[entering + x], pb[entering + x]);
            }
        }

        let mut acc: Sums = [0; 5];
        for col in &columns[..win] {
            merge(&mut acc, col, true);
        }

        for left in 0..=(w - win) {
            if left > 0 {
                merge(&mut acc, &columns[left - 1], false);
                merge(&mut acc, &columns[left + win - 1], true);
            }
            total += window_ssim(&acc);
            count += 1;
        }
    }

    Ok((total / count as f64).clamp(0.0, 1.0))
}

/// Largest odd window no bigger than the default and the image itself
fn window_size(min_dim: usize) -> Option<usize> {
    let mut win = WINDOW.min(min_dim);
    if win % 2 == 0 {
        win -= 1;
    }
    (win >= MIN_WINDOW).then_some(win)
}

fn add(s: &mut Sums, x: u8, y: u8) {
    let (x, y) = (x as u64, y as u64);
    s[0] += x;
    s[1] += y;
    s[2] += x * x;
    s[3] += y * y;
    s[4] += x * y;
}

fn sub(s: &mut Sums, x: u8, y: u8) {
    let (x, y) = (x as u64, y as u64);
    s[0] -= x;
    s[1] -= y;
    s[2] -= x * x;
    s[3] -= y * y;
    s[4] -= x * y;
}

fn merge(acc: &mut Sums, col: &Sums, plus: bool) {
    for (a, c) in acc.iter_mut().zip(col) {
        if plus {
            *a += c;
        } else {
            *a -= c;
        }
    }
}
