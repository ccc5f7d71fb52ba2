//! Histogram thresholding.
//!
//! Otsu's method picks the split of the intensity histogram that maximizes the
//! between-class variance `w_low * w_high * (mu_low - mu_high)^2`. Images whose
//! values span a modest integer range are binned one bin per integer level;
//! fractional or very wide ranges fall back to equal-width bins. Unit bins hold
//! `[k, k + 1)`, so for integer-valued images the threshold sits half a level
//! below the upper class, and for fractional data it sits on the bin edge.
//!
//! When several consecutive splits reach the same variance (a histogram with
//! an empty gap between two clusters), the threshold is placed in the middle
//! of that plateau so it sits between the clusters rather than at the edge of
//! the lower one.


use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::image::Image;

/// Largest number of unit-width bins before switching to equal-width bins.
const MAX_INTEGER_BINS: usize = 1 << 16;

/// Bin count for fractional-range images.
const FLOAT_BINS: usize = 256;

/// Relative tolerance for treating two between-class variances as equal.
const PLATEAU_TOLERANCE: f64 = 1e-9;

/// Strategy producing a binarization threshold for an image.
///
/// Pixels above the threshold belong to the bright (I0) class, pixels below it
/// to the dark (IT) class.
pub trait Thresholder: Debug + Send + Sync {
    fn threshold(&self, image: &Image) -> Result<f32>;
}

pub type SharedThresholder = Arc<dyn Thresholder>;

/// Closed-form Otsu threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct Otsu;

impl Thresholder for Otsu {
    fn threshold(&self, image: &Image) -> Result<f32> {
        otsu_threshold(image)
    }
}

/// Otsu threshold of all finite pixels.
///
/// Fails with [`Error::DegenerateImage`] when every finite pixel has the same
/// value (or there are no finite pixels at all).
pub fn otsu_threshold(image: &Image) -> Result<f32> {
    let (min, max) = finite_range(image).ok_or(Error::DegenerateImage { value: f32::NAN })?;
    if min == max {
        return Err(Error::DegenerateImage { value: min });
    }

    let integer_valued = image
        .iter()
        .filter(|v| v.is_finite())
        .all(|v| v.fract() == 0.0);
    let binning = Binning::for_range(min, max, integer_valued);
    let histogram = binning.histogram(image);
    let split = best_split(&histogram);

    Ok(binning.threshold_after(split) as f32)
}

fn finite_range(image: &Image) -> Option<(f32, f32)> {
    image
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

#[derive(Debug, Clone, Copy)]
struct Binning {
    origin: f64,
    width: f64,
    count: usize,
    /// Unit bins over an integer-valued image: the threshold sits half a
    /// level below the first value of the upper class.
    integer: bool,
}

impl Binning {
    fn for_range(min: f32, max: f32, integer_valued: bool) -> Self {
        let lo = (min as f64).floor();
        let hi = (max as f64).floor();
        // Compared as f64 first: the span of an OD or map image can exceed usize
        let span = hi - lo;
        let wide = span >= MAX_INTEGER_BINS as f64;

        if !wide && span >= 1.0 {
            Binning {
                origin: lo,
                width: 1.0,
                count: span as usize + 1,
                integer: integer_valued,
            }
        } else {
            let count = if wide {
                MAX_INTEGER_BINS
            } else {
                FLOAT_BINS
            };
            Binning {
                origin: min as f64,
                width: (max as f64 - min as f64) / count as f64,
                count,
                integer: false,
            }
        }
    }

    #[inline]
    fn bin(&self, value: f32) -> usize {
        let index = ((value as f64 - self.origin) / self.width).floor();
        (index.max(0.0) as usize).min(self.count - 1)
    }

    fn histogram(&self, image: &Image) -> Vec<f64> {
        let mut counts = vec![0.0f64; self.count];
        for &v in image.iter().filter(|v| v.is_finite()) {
            counts[self.bin(v)] += 1.0;
        }
        let total: f64 = counts.iter().sum();
        for c in &mut counts {
            *c /= total;
        }
        counts
    }

    /// Threshold separating bins `..=split` from the rest. `split` may be
    /// fractional when it is the centre of a plateau.
    fn threshold_after(&self, split: f64) -> f64 {
        let boundary = self.origin + (split + 1.0) * self.width;
        if self.integer {
            boundary - 0.5
        } else {
            boundary
        }
    }
}

/// Index (possibly half-integer) of the last low-class bin of the best split.
fn best_split(probabilities: &[f64]) -> f64 {
    let mean_total: f64 = probabilities
        .iter()
        .enumerate()
        .map(|(i, p)| i as f64 * p)
        .sum();

    let mut variances = Vec::with_capacity(probabilities.len().saturating_sub(1));
    let mut w_low = 0.0f64;
    let mut mean_low = 0.0f64;
    for (i, &p) in probabilities
        .iter()
        .enumerate()
        .take(probabilities.len() - 1)
    {
        w_low += p;
        mean_low += i as f64 * p;
        let w_high = 1.0 - w_low;
        let variance = if w_low <= 0.0 || w_high <= 0.0 {
            0.0
        } else {
            let mu_low = mean_low / w_low;
            let mu_high = (mean_total - mean_low) / w_high;
            w_low * w_high * (mu_low - mu_high) * (mu_low - mu_high)
        };
        variances.push(variance);
    }

    let (first, best) = variances
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::MIN), |(bi, bv), (i, v)| {
            if v > bv {
                (i, v)
            } else {
                (bi, bv)
            }
        });

    let floor = best - best.abs() * PLATEAU_TOLERANCE;
    let last = variances[first..]
        .iter()
        .take_while(|&&v| v >= floor)
        .count()
        + first
        - 1;

    (first + last) as f64 / 2.0
}
