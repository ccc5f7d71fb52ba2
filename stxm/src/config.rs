//! Configuration types for the alignment pipeline.
//!
//! All configuration structs are consolidated here. Every struct deserializes
//! with missing fields filled from its `Default`, so a configuration file only
//! needs to name the values it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn ensure_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

// =============================================================================
// Registration configuration
// =============================================================================

/// Parameters of drift estimation between two frames.
///
/// Smoothing and upsampling scale with the physical pixel size so that the
/// same features are emphasised, and the same precision (about 0.01 pixel or
/// 1 nm, whichever is coarser) is reached, at any zoom level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Gaussian smoothing radius in micrometres; sigma in pixels is this
    /// divided by the pixel width.
    pub smoothing_um: f64,
    /// Upper bound of the smoothing sigma in pixels.
    pub max_sigma_px: f64,
    /// Fraction of below-threshold pixels along any border above which both
    /// images are replaced by their gradient magnitude.
    pub edge_fraction: f64,
    /// Upsample factor is `upsample_scale_um / pixel_width`.
    pub upsample_scale_um: f64,
    /// Upper bound of the upsample factor.
    pub max_upsample_factor: f64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            smoothing_um: 0.15,
            max_sigma_px: 3.0,
            edge_fraction: 0.4,
            upsample_scale_um: 100.0,
            max_upsample_factor: 1000.0,
        }
    }
}

impl RegistrationConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("smoothing_um", self.smoothing_um)?;
        ensure_positive("max_sigma_px", self.max_sigma_px)?;
        ensure_positive("upsample_scale_um", self.upsample_scale_um)?;
        ensure_positive("max_upsample_factor", self.max_upsample_factor)?;
        if !(0.0..=1.0).contains(&self.edge_fraction) {
            return Err(Error::InvalidConfig(format!(
                "edge_fraction must be in [0, 1], got {}",
                self.edge_fraction
            )));
        }
        Ok(())
    }

    /// Gaussian sigma in pixels for the given pixel width.
    pub fn sigma_px(&self, pixel_width_um: f64) -> f64 {
        (self.smoothing_um / pixel_width_um).min(self.max_sigma_px)
    }

    /// Upsample factor for the given pixel width, never below 1.
    pub fn upsample_factor(&self, pixel_width_um: f64) -> f64 {
        (self.upsample_scale_um / pixel_width_um)
            .min(self.max_upsample_factor)
            .max(1.0)
    }
}

// =============================================================================
// Warp configuration
// =============================================================================

/// Interpolation used when resampling a shifted frame.
///
/// Samples outside the frame take the value of the nearest edge pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMethod {
    /// Nearest neighbor
    Nearest,
    /// Bilinear
    Bilinear,
    /// Catmull-Rom cubic
    #[default]
    Bicubic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarpConfig {
    pub method: InterpolationMethod,
    /// Axis shifts smaller than this many pixels invalidate nothing.
    pub mask_threshold_px: f64,
}

impl Default for WarpConfig {
    fn default() -> Self {
        Self {
            method: InterpolationMethod::default(),
            mask_threshold_px: 0.5,
        }
    }
}

impl WarpConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("mask_threshold_px", self.mask_threshold_px)
    }
}

// =============================================================================
// Segmentation, OD filter and line scan configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Total erosion in pixels, split between the I0 side (rounded up) and
    /// the IT side (rounded down).
    pub boundary_width: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self { boundary_width: 2 }
    }
}

/// Open optical-density interval used to filter IT pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdRange {
    pub min: f64,
    pub max: f64,
}

impl Default for OdRange {
    fn default() -> Self {
        Self { min: 0.8, max: 2.0 }
    }
}

impl OdRange {
    pub fn validate(&self) -> Result<()> {
        if self.min.is_finite() && self.max.is_finite() && self.min < self.max {
            Ok(())
        } else {
            Err(Error::InvalidConfig(format!(
                "od range must satisfy min < max, got ({}, {})",
                self.min, self.max
            )))
        }
    }

    #[inline]
    pub fn contains(&self, od: f64) -> bool {
        self.min < od && od < self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineScanConfig {
    /// Energy spacing of the regridded columns.
    pub energy_step: f64,
    /// Upper bound on regridded columns.
    pub max_columns: usize,
}

impl Default for LineScanConfig {
    fn default() -> Self {
        Self {
            energy_step: 0.05,
            max_columns: 100_000,
        }
    }
}

impl LineScanConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("energy_step", self.energy_step)?;
        if self.max_columns == 0 {
            return Err(Error::InvalidConfig(
                "max_columns must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Pipeline configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub registration: RegistrationConfig,
    pub warp: WarpConfig,
    pub segmentation: SegmentationConfig,
    pub od_filter: OdRange,
    pub line_scan: LineScanConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.registration.validate()?;
        self.warp.validate()?;
        self.od_filter.validate()?;
        self.line_scan.validate()
    }

    /// Loads a YAML or JSON file (chosen by extension) and validates it.
    pub fn load(path: &Path) -> Result<Self> {
        let config: PipelineConfig = common::load_file(path)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), ?config, "Loaded pipeline configuration");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_sigma_and_upsample_scaling() {
        let config = RegistrationConfig::default();
        // 0.15 / 0.05 = 3.0, exactly at the cap
        assert!((config.sigma_px(0.05) - 3.0).abs() < 1e-12);
        assert!((config.sigma_px(0.5) - 0.3).abs() < 1e-12);
        assert_eq!(config.sigma_px(0.01), 3.0);

        assert_eq!(config.upsample_factor(0.05), 1000.0);
        assert!((config.upsample_factor(0.5) - 200.0).abs() < 1e-9);
        // Huge pixels clamp to 1
        assert_eq!(config.upsample_factor(500.0), 1.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = PipelineConfig::default();
        config.registration.smoothing_um = 0.0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = PipelineConfig::default();
        config.od_filter = OdRange { min: 2.0, max: 1.0 };
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.registration.edge_fraction = 1.5;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.line_scan.energy_step = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_od_range_is_open() {
        let range = OdRange::default();
        assert!(!range.contains(0.8));
        assert!(range.contains(0.81));
        assert!(!range.contains(2.0));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig = common::deserialize(
            r#"{"segmentation": {"boundary_width": 4}, "warp": {"method": "bilinear"}}"#,
            common::FileFormat::Json,
        )
        .unwrap();
        assert_eq!(config.segmentation.boundary_width, 4);
        assert_eq!(config.warp.method, InterpolationMethod::Bilinear);
        assert_eq!(config.registration, RegistrationConfig::default());
        assert_eq!(config.line_scan.energy_step, 0.05);
    }

    #[test]
    fn test_load_yaml_file() {
        let path = std::env::temp_dir().join(format!("stxm_config_{}.yaml", std::process::id()));
        std::fs::write(&path, "registration:\n  max_upsample_factor: 50\n").unwrap();
        let loaded = PipelineConfig::load(&path);
        std::fs::remove_file(&path).unwrap();
        let config = loaded.unwrap();
        assert_eq!(config.registration.max_upsample_factor, 50.0);
        assert_eq!(config.registration.smoothing_um, 0.15);
    }

    #[test]
    fn test_load_rejects_invalid_file_contents() {
        let path = std::env::temp_dir().join(format!("stxm_bad_config_{}.json", std::process::id()));
        std::fs::write(&path, r#"{"line_scan": {"energy_step": -1.0}}"#).unwrap();
        let loaded = PipelineConfig::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(loaded, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("stxm_missing_config_9a2e.json");
        assert!(matches!(
            PipelineConfig::load(&path),
            Err(Error::Format(_))
        ));
    }
}
