//! STXM - drift registration, alignment and segmentation for scanning
//! transmission X-ray microscopy image sequences.
//!
//! The crate covers the processing core of a live acquisition viewer:
//! - Otsu thresholding
//! - Sub-pixel translational registration with physical-scale smoothing
//! - Frame resampling with explicit validity masks
//! - Star-topology stack alignment, batch or frame by frame
//! - I0 / IT segmentation, ROI selection and spectra
//! - Two-energy elemental maps and line-scan regridding
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use stxm::{align_stack, segment, ProgressCallback};
//!
//! let stack = align_stack(&frames, 0.05, &ProgressCallback::none())?;
//! let seg = segment(stack.reference(), &stack.frames()[1].image, stack.validity(), 2)?;
//! println!("{} I0 pixels, {} IT pixels", seg.i0.len(), seg.it.len());
//! ```

mod config;
mod elemental_map;
mod error;
mod filters;
mod image;
mod linescan;
mod pipeline;
mod registration;
mod roi;
mod scan_mode;
mod segmentation;
mod stack;
mod suggestion;
mod threshold;
mod warp;

#[cfg(test)]
pub mod testing;

pub mod prelude;

// ============================================================================
// Core types and errors
// ============================================================================

pub use error::{Error, RegistrationFailure, Result};
pub use image::{
    full_validity, intersect_validity, Image, ImageDimensions, OverlayMask, Pixel, PixelSize,
    Shift, ValidityMask,
};
pub use scan_mode::ScanMode;

// ============================================================================
// Configuration
// ============================================================================

pub use config::{
    InterpolationMethod, LineScanConfig, OdRange, PipelineConfig, RegistrationConfig,
    SegmentationConfig, WarpConfig,
};

// ============================================================================
// Thresholding and filters
// ============================================================================

pub use filters::{gaussian_smooth, sobel_magnitude};
pub use threshold::{otsu_threshold, Otsu, SharedThresholder, Thresholder};

// ============================================================================
// Registration and alignment
// ============================================================================

pub use common::CancelFlag;
pub use registration::{BorderFractions, RegistrationOutcome, Registrator};
pub use stack::{AlignedStack, AlignmentProgress, ProgressCallback, StackAligner};
pub use warp::{AlignedFrame, FrameAligner};

// ============================================================================
// Segmentation, regions and spectra
// ============================================================================

pub use roi::{RoiClass, RoiSelection, Spectra};
pub use segmentation::{erode, Segmentation, Segmenter};
pub use suggestion::{RegionSuggester, UpsamplingPredictor};

// ============================================================================
// Maps and line scans
// ============================================================================

pub use elemental_map::{ElementalMap, MapGenerator};
pub use linescan::{LineScanRegridder, RegriddedScan};
pub use pipeline::{MapPair, Pipeline};

// ============================================================================
// Top-level functions (default configuration)
// ============================================================================

/// Shift that aligns `target` onto `reference`.
pub fn estimate_shift(reference: &Image, target: &Image, pixel_width_um: f64) -> Result<Shift> {
    Registrator::default().estimate_shift(reference, target, pixel_width_um)
}

/// Moves `image` by `shift` with bicubic interpolation.
pub fn apply_shift(image: &Image, shift: Shift) -> AlignedFrame {
    FrameAligner::default().apply(image, shift)
}

/// Aligns every frame onto the first one.
pub fn align_stack(
    frames: &[Image],
    pixel_width_um: f64,
    progress: &ProgressCallback,
) -> Result<AlignedStack> {
    StackAligner::default().align(frames, pixel_width_um, progress, &CancelFlag::new())
}

pub fn segment(
    reference: &Image,
    display: &Image,
    validity: &ValidityMask,
    boundary_width: usize,
) -> Result<Segmentation> {
    Segmenter::default().segment(reference, display, validity, boundary_width)
}

/// Elemental map of `(first, second)`, where `shift` aligns `second` onto `first`.
pub fn generate_map((first, second): (&Image, &Image), shift: Shift) -> Result<ElementalMap> {
    MapGenerator::default().generate(first, second, shift)
}

pub fn regrid_line_scan(image: &Image, energies: &[f64]) -> Result<RegriddedScan> {
    LineScanRegridder::default().regrid(image, energies)
}
