//! Error types for the alignment pipeline.

use std::fmt;

use thiserror::Error;

use crate::image::ImageDimensions;

/// Why a cross-correlation could not produce a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationFailure {
    /// Correlation surface has no peak (one of the inputs carries no structure).
    FlatCorrelation,
    /// Correlation produced NaN or infinity.
    NonFiniteCorrelation,
    /// Fewer than two pixels along an axis.
    ImageTooSmall,
}

impl fmt::Display for RegistrationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationFailure::FlatCorrelation => write!(f, "correlation surface is flat"),
            RegistrationFailure::NonFiniteCorrelation => {
                write!(f, "correlation contains non-finite values")
            }
            RegistrationFailure::ImageTooSmall => write!(f, "image is too small to register"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Stack is empty")]
    EmptyStack,

    #[error("Dimension mismatch for frame {index}: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        index: usize,
        expected: ImageDimensions,
        actual: ImageDimensions,
    },

    #[error("Frame {index} is out of range for a stack of {len} frames")]
    FrameOutOfRange { index: usize, len: usize },

    #[error("Image is degenerate: every pixel equals {value}")]
    DegenerateImage { value: f32 },

    #[error("Invalid pixel width: {0} um")]
    InvalidPixelWidth(f64),

    #[error("Registration failed: {reason}")]
    RegistrationFailed { reason: RegistrationFailure },

    #[error("Line scan has no energy columns")]
    EmptyLineScan,

    #[error("Energy count mismatch: {energies} energies for {columns} columns")]
    EnergyCountMismatch { energies: usize, columns: usize },

    #[error("Energies must be finite and non-decreasing (index {index})")]
    UnsortedEnergies { index: usize },

    #[error("Regridded line scan would need {columns} columns (limit {limit})")]
    GridTooLarge { columns: usize, limit: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Predictor failed: {0}")]
    Predictor(String),

    #[error("Serialization failed")]
    Format(#[from] common::SerdeFormatError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = Error::DimensionMismatch {
            index: 3,
            expected: ImageDimensions::new(64, 32),
            actual: ImageDimensions::new(32, 64),
        };
        let msg = err.to_string();
        assert!(msg.contains("frame 3"), "got: {msg}");
        assert!(msg.contains("width: 64"), "got: {msg}");
        assert!(msg.contains("height: 64"), "got: {msg}");
    }

    #[test]
    fn test_degenerate_image_message() {
        let err = Error::DegenerateImage { value: 42.0 };
        assert_eq!(err.to_string(), "Image is degenerate: every pixel equals 42");
    }

    #[test]
    fn test_registration_failure_message() {
        let err = Error::RegistrationFailed {
            reason: RegistrationFailure::FlatCorrelation,
        };
        assert_eq!(
            err.to_string(),
            "Registration failed: correlation surface is flat"
        );
    }

    #[test]
    fn test_energy_count_mismatch_message() {
        let err = Error::EnergyCountMismatch {
            energies: 4,
            columns: 5,
        };
        assert_eq!(
            err.to_string(),
            "Energy count mismatch: 4 energies for 5 columns"
        );
    }
}
