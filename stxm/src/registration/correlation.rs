//! Sub-pixel cross-correlation by matrix-multiply DFT upsampling.
//!
//! The integer peak of the FFT cross-correlation is refined by evaluating the
//! inverse DFT of the cross-power product on a fine grid around it
//! (Guizar-Sicairos, Thurman and Fienup, 2008). The fine grid spans 1.5 pixels
//! sampled at `1 / upsample_factor`.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

use crate::error::{Error, RegistrationFailure, Result};
use crate::image::{Image, Shift};

/// Surfaces whose peak exceeds their minimum by less than this fraction are flat.
const FLAT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
pub(crate) struct CorrelationPeak {
    /// Shift that moves `target` onto `reference`.
    pub shift: Shift,
    /// Normalized correlation magnitude at the refined peak.
    pub magnitude: f64,
}

struct Plans {
    row: Arc<dyn Fft<f64>>,
    column: Arc<dyn Fft<f64>>,
}

impl Plans {
    fn new(planner: &mut FftPlanner<f64>, width: usize, height: usize, inverse: bool) -> Self {
        if inverse {
            Plans {
                row: planner.plan_fft_inverse(width),
                column: planner.plan_fft_inverse(height),
            }
        } else {
            Plans {
                row: planner.plan_fft_forward(width),
                column: planner.plan_fft_forward(height),
            }
        }
    }

    /// In-place unnormalized 2D transform using row-column decomposition.
    fn process(&self, data: &mut [Complex<f64>], width: usize, height: usize) {
        for row in data.chunks_exact_mut(width) {
            self.row.process(row);
        }

        let mut column = vec![Complex::new(0.0, 0.0); height];
        for x in 0..width {
            for (y, c) in column.iter_mut().enumerate() {
                *c = data[y * width + x];
            }
            self.column.process(&mut column);
            for (y, c) in column.iter().enumerate() {
                data[y * width + x] = *c;
            }
        }
    }
}

/// Signed DFT sample frequency of bin `k` for length `n` (`0, 1, .., -2, -1`).
#[inline]
fn frequency(k: usize, n: usize) -> f64 {
    if k < n.div_ceil(2) {
        k as f64
    } else {
        k as f64 - n as f64
    }
}

fn to_complex(image: &Image) -> Vec<Complex<f64>> {
    image
        .iter()
        .map(|&v| Complex::new(v as f64, 0.0))
        .collect()
}

/// Estimates the translation of `target` relative to `reference`.
///
/// `upsample_factor <= 1` returns the integer-pixel peak.
pub(crate) fn cross_correlate(
    reference: &Image,
    target: &Image,
    upsample_factor: f64,
) -> Result<CorrelationPeak> {
    let (width, height) = reference.dimensions();
    if width < 2 || height < 2 {
        return Err(Error::RegistrationFailed {
            reason: RegistrationFailure::ImageTooSmall,
        });
    }

    let mut planner = FftPlanner::new();
    let forward = Plans::new(&mut planner, width, height, false);
    let inverse = Plans::new(&mut planner, width, height, true);

    let mut ref_freq = to_complex(reference);
    let mut tgt_freq = to_complex(target);
    forward.process(&mut ref_freq, width, height);
    forward.process(&mut tgt_freq, width, height);

    let product: Vec<Complex<f64>> = ref_freq
        .iter()
        .zip(tgt_freq.iter())
        .map(|(a, b)| a * b.conj())
        .collect();

    let mut correlation = product.clone();
    inverse.process(&mut correlation, width, height);

    let (peak_index, peak, floor) = find_peak(correlation.iter().map(|c| c.norm()))?;
    if peak - floor <= FLAT_TOLERANCE * peak.max(f64::MIN_POSITIVE) {
        return Err(Error::RegistrationFailed {
            reason: RegistrationFailure::FlatCorrelation,
        });
    }

    let norm = (width * height) as f64;
    let coarse_row = wrap_peak(peak_index / width, height);
    let coarse_col = wrap_peak(peak_index % width, width);

    if upsample_factor <= 1.0 {
        return Ok(CorrelationPeak {
            shift: Shift::new(coarse_col, coarse_row),
            magnitude: peak / norm,
        });
    }

    let region = (upsample_factor * 1.5).ceil() as usize;
    let center = (region / 2) as f64;

    let row_kernel = dft_kernel(height, region, coarse_row, center, upsample_factor);
    let col_kernel = dft_kernel(width, region, coarse_col, center, upsample_factor);

    // (region x height) * (height x width)
    let mut partial = vec![Complex::new(0.0, 0.0); region * width];
    for m in 0..region {
        let kernel_row = &row_kernel[m * height..(m + 1) * height];
        let out = &mut partial[m * width..(m + 1) * width];
        for (ky, &k) in kernel_row.iter().enumerate() {
            let src = &product[ky * width..(ky + 1) * width];
            for (o, &p) in out.iter_mut().zip(src.iter()) {
                *o += k * p;
            }
        }
    }

    // (region x width) * (width x region)
    let upsampled = (0..region).flat_map(|m| {
        let partial_row = &partial[m * width..(m + 1) * width];
        let col_kernel = &col_kernel;
        (0..region).map(move |n| {
            let kernel_col = &col_kernel[n * width..(n + 1) * width];
            partial_row
                .iter()
                .zip(kernel_col.iter())
                .map(|(&a, &b)| a * b)
                .sum::<Complex<f64>>()
                .norm()
        })
    });

    let (fine_index, fine_peak, _) = find_peak(upsampled)?;
    let fine_row = (fine_index / region) as f64 - center;
    let fine_col = (fine_index % region) as f64 - center;

    Ok(CorrelationPeak {
        shift: Shift::new(
            coarse_col + fine_col / upsample_factor,
            coarse_row + fine_row / upsample_factor,
        ),
        magnitude: fine_peak / norm,
    })
}

/// Peak index above the midpoint maps to a negative shift.
#[inline]
fn wrap_peak(index: usize, len: usize) -> f64 {
    if index > len / 2 {
        index as f64 - len as f64
    } else {
        index as f64
    }
}

/// `kernel[m * n + k] = exp(i 2 pi f(k) t(m) / n)` with
/// `t(m) = coarse + (m - center) / upsample_factor`.
fn dft_kernel(
    n: usize,
    region: usize,
    coarse: f64,
    center: f64,
    upsample_factor: f64,
) -> Vec<Complex<f64>> {
    let mut kernel = Vec::with_capacity(region * n);
    for m in 0..region {
        let t = coarse + (m as f64 - center) / upsample_factor;
        for k in 0..n {
            let angle = 2.0 * PI * frequency(k, n) * t / n as f64;
            kernel.push(Complex::from_polar(1.0, angle));
        }
    }
    kernel
}

/// Returns `(argmax, max, min)`, failing on any non-finite magnitude.
fn find_peak(values: impl Iterator<Item = f64>) -> Result<(usize, f64, f64)> {
    let mut best = (0usize, f64::NEG_INFINITY);
    let mut min = f64::INFINITY;
    for (i, v) in values.enumerate() {
        if !v.is_finite() {
            return Err(Error::RegistrationFailed {
                reason: RegistrationFailure::NonFiniteCorrelation,
            });
        }
        if v > best.1 {
            best = (i, v);
        }
        min = min.min(v);
    }
    Ok((best.0, best.1, min))
}
