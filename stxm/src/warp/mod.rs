//! Shift application with validity tracking.
//!
//! A translation resamples every pixel at the same fractional offset, so the
//! interpolation is applied as two 1D passes (columns, then rows) with one
//! precomputed set of taps per axis. Samples falling outside the frame take
//! the nearest edge value.
//!
//! Pixels pulled in from outside the frame are marked invalid: a strip of
//! `ceil(|shift|)` columns (rows) on the side the content moved away from,
//! but only when the axis shift reaches the masking threshold (0.5 px by
//! default). Smaller shifts are dominated by real data and invalidate nothing.
//!
//! A non-finite shift leaves no pixel backed by data: the image is returned
//! unchanged with an all-false validity mask.


use crate::config::{InterpolationMethod, WarpConfig};
use crate::image::{full_validity, Image, ImageDimensions, Shift, ValidityMask};

/// Bicubic kernel value (Catmull-Rom spline).
///
/// W(x) = (a+2)|x|^3 - (a+3)|x|^2 + 1       for |x| <= 1
/// W(x) = a|x|^3 - 5a|x|^2 + 8a|x| - 4a     for 1 < |x| < 2
/// W(x) = 0                                  otherwise
///
/// where a = -0.5 for Catmull-Rom spline
#[inline]
pub(crate) fn bicubic_kernel(x: f64) -> f64 {
    const A: f64 = -0.5;

    let abs_x = x.abs();

    if abs_x <= 1.0 {
        ((A + 2.0) * abs_x - (A + 3.0)) * abs_x * abs_x + 1.0
    } else if abs_x < 2.0 {
        ((A * abs_x - 5.0 * A) * abs_x + 8.0 * A) * abs_x - 4.0 * A
    } else {
        0.0
    }
}

/// A frame resampled onto the reference grid.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedFrame {
    pub image: Image,
    pub validity: ValidityMask,
    /// Shift that was applied.
    pub shift: Shift,
}

impl AlignedFrame {
    /// Frame that needs no resampling.
    pub fn unshifted(image: Image) -> Self {
        let validity = full_validity(ImageDimensions::of(&image));
        Self {
            image,
            validity,
            shift: Shift::ZERO,
        }
    }
}

/// Source offsets and weights for one output pixel along one axis.
///
/// Output `i` reads input `clamp(i + offset)` for every `(offset, weight)`.
#[derive(Debug, Clone)]
struct Taps(Vec<(isize, f64)>);

impl Taps {
    /// Taps resampling at `i - shift` for every output index `i` of an axis
    /// with `len` samples.
    fn new(method: InterpolationMethod, shift: f64, len: usize) -> Self {
        // Past one frame length every tap clamps to the same edge sample
        let limit = len as f64 + 2.0;
        let source = (-shift).clamp(-limit, limit);
        let base = source.floor();
        let frac = source - base;
        let base = base as isize;

        let taps = match method {
            InterpolationMethod::Nearest => vec![((source + 0.5).floor() as isize, 1.0)],
            InterpolationMethod::Bilinear => vec![(base, 1.0 - frac), (base + 1, frac)],
            InterpolationMethod::Bicubic => (-1..=2)
                .map(|o| (base + o, bicubic_kernel(frac - o as f64)))
                .collect(),
        };
        Taps(taps)
    }

    fn apply(&self, input: &[f32], output: &mut [f32], stride: usize, len: usize) {
        let last = len as isize - 1;
        for i in 0..len {
            let value: f64 = self
                .0
                .iter()
                .map(|&(offset, weight)| {
                    let src = (i as isize + offset).clamp(0, last) as usize;
                    weight * input[src * stride] as f64
                })
                .sum();
            output[i * stride] = value as f32;
        }
    }
}

/// Applies shifts to frames.
#[derive(Debug, Clone, Default)]
pub struct FrameAligner {
    config: WarpConfig,
}

impl FrameAligner {
    pub fn new(config: WarpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WarpConfig {
        &self.config
    }

    /// Moves image content by `shift` and reports which pixels are still backed
    /// by acquired data.
    pub fn apply(&self, image: &Image, shift: Shift) -> AlignedFrame {
        let (width, height) = image.dimensions();
        let mut resampled = image.clone();

        if !shift.is_finite() {
            tracing::warn!(
                dx = shift.dx,
                dy = shift.dy,
                "Non-finite shift, frame has no valid pixels"
            );
            return AlignedFrame {
                image: resampled,
                validity: self.validity(ImageDimensions::of(image), shift),
                shift,
            };
        }

        if shift.dx != 0.0 && width > 0 {
            let taps = Taps::new(self.config.method, shift.dx, width);
            for y in 0..height {
                let start = y * width;
                taps.apply(
                    &image.pixels()[start..start + width],
                    &mut resampled.pixels_mut()[start..start + width],
                    1,
                    width,
                );
            }
        }

        if shift.dy != 0.0 && height > 0 {
            let taps = Taps::new(self.config.method, shift.dy, height);
            let columns = resampled.clone();
            for x in 0..width {
                taps.apply(
                    &columns.pixels()[x..],
                    &mut resampled.pixels_mut()[x..],
                    width,
                    height,
                );
            }
        }

        AlignedFrame {
            image: resampled,
            validity: self.validity(ImageDimensions::of(image), shift),
            shift,
        }
    }

    /// Validity mask for a frame of `dimensions` moved by `shift`.
    pub fn validity(&self, dimensions: ImageDimensions, shift: Shift) -> ValidityMask {
        let columns = invalid_span(shift.dx, dimensions.width, self.config.mask_threshold_px);
        let rows = invalid_span(shift.dy, dimensions.height, self.config.mask_threshold_px);

        ValidityMask::from_fn(dimensions.width, dimensions.height, |x, y| {
            !columns.contains(&x) && !rows.contains(&y)
        })
    }
}

/// Range of indices along one axis that were extrapolated.
fn invalid_span(shift: f64, len: usize, threshold: f64) -> std::ops::Range<usize> {
    if !shift.is_finite() {
        return 0..len;
    }
    if shift.abs() < threshold {
        return 0..0;
    }
    let strip = (shift.abs().ceil() as usize).min(len);
    if shift > 0.0 {
        0..strip
    } else {
        len - strip..len
    }
}
