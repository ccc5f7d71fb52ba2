//! Sub-pixel drift estimation between two frames.
//!
//! Registration runs in four stages:
//!
//! 1. **Smoothing**: both frames are blurred with a Gaussian whose width is a
//!    fixed physical distance (0.15 um by default, capped at 3 px).
//! 2. **Edge-bias check**: the smoothed target is thresholded and the
//!    below-threshold fraction is measured along each border. A dark object
//!    touching the frame edge dominates the correlation with its own outline,
//!    so when any border exceeds the limit both frames are replaced by their
//!    gradient magnitude.
//! 3. **Correlation**: FFT cross-correlation gives the integer peak, refined
//!    by DFT upsampling to `min(1000, 100 / pixel_width)`.
//! 4. **Result**: the returned shift is the translation that, applied to the
//!    target, aligns it with the reference.

mod correlation;


use std::sync::Arc;

use common::Buffer2;

use crate::config::RegistrationConfig;
use crate::error::Result;
use crate::filters::{gaussian_smooth, sobel_magnitude};
use crate::image::{check_pixel_width, check_same_dimensions, Image, Shift};
use crate::threshold::{Otsu, SharedThresholder};

/// Fraction of below-threshold pixels along each image border.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BorderFractions {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl BorderFractions {
    pub fn of(mask: &Buffer2<bool>) -> Self {
        let (width, height) = mask.dimensions();
        if width == 0 || height == 0 {
            return Self::default();
        }

        let fraction = |count: usize, len: usize| count as f64 / len as f64;
        let count_row = |y: usize| mask.row(y).iter().filter(|&&b| b).count();
        let count_col = |x: usize| (0..height).filter(|&y| mask[(x, y)]).count();

        Self {
            top: fraction(count_row(0), width),
            bottom: fraction(count_row(height - 1), width),
            left: fraction(count_col(0), height),
            right: fraction(count_col(width - 1), height),
        }
    }

    pub fn max(&self) -> f64 {
        self.top.max(self.bottom).max(self.left).max(self.right)
    }
}

/// How a shift was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegistrationOutcome {
    pub shift: Shift,
    pub sigma_px: f64,
    pub upsample_factor: f64,
    /// Whether the correlation ran on gradient magnitude.
    pub edge_filtered: bool,
    pub border_fractions: BorderFractions,
    /// Normalized correlation magnitude at the peak.
    pub peak_magnitude: f64,
}

/// Estimates translational drift of a frame against a reference.
#[derive(Debug, Clone)]
pub struct Registrator {
    config: RegistrationConfig,
    thresholder: SharedThresholder,
}

impl Default for Registrator {
    fn default() -> Self {
        Self::new(RegistrationConfig::default())
    }
}

impl Registrator {
    pub fn new(config: RegistrationConfig) -> Self {
        Self::with_thresholder(config, Arc::new(Otsu))
    }

    pub fn with_thresholder(config: RegistrationConfig, thresholder: SharedThresholder) -> Self {
        Self {
            config,
            thresholder,
        }
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    /// Shift that aligns `target` onto `reference`.
    pub fn estimate_shift(
        &self,
        reference: &Image,
        target: &Image,
        pixel_width_um: f64,
    ) -> Result<Shift> {
        self.register(reference, target, pixel_width_um)
            .map(|outcome| outcome.shift)
    }

    /// Like [`Registrator::estimate_shift`], also reporting the parameters
    /// and filter choice that produced the shift.
    pub fn register(
        &self,
        reference: &Image,
        target: &Image,
        pixel_width_um: f64,
    ) -> Result<RegistrationOutcome> {
        check_pixel_width(pixel_width_um)?;
        check_same_dimensions(1, reference, target)?;

        let sigma_px = self.config.sigma_px(pixel_width_um);
        let upsample_factor = self.config.upsample_factor(pixel_width_um);

        let mut smoothed_ref = gaussian_smooth(reference, sigma_px);
        let mut smoothed_tgt = gaussian_smooth(target, sigma_px);

        let threshold = self.thresholder.threshold(&smoothed_tgt)?;
        let below = smoothed_tgt.map(|&v| v < threshold);
        let border_fractions = BorderFractions::of(&below);
        let edge_filtered = border_fractions.max() > self.config.edge_fraction;

        if edge_filtered {
            smoothed_ref = sobel_magnitude(&smoothed_ref);
            smoothed_tgt = sobel_magnitude(&smoothed_tgt);
        }

        tracing::debug!(
            sigma_px,
            upsample_factor,
            threshold,
            edge_filtered,
            max_border_fraction = border_fractions.max(),
            "Registering frame"
        );

        let peak = correlation::cross_correlate(&smoothed_ref, &smoothed_tgt, upsample_factor)?;

        Ok(RegistrationOutcome {
            shift: peak.shift,
            sigma_px,
            upsample_factor,
            edge_filtered,
            border_fractions,
            peak_magnitude: peak.magnitude,
        })
    }
}
