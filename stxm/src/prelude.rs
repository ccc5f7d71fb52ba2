//! Commonly used types.
//!
//! ```rust,ignore
//! use stxm::prelude::*;
//! ```

pub use crate::{
    AlignedFrame, AlignedStack, AlignmentProgress, CancelFlag, Error, Image, PipelineConfig,
    Pixel, ProgressCallback, Result, Shift, StackAligner, ValidityMask,
};

pub use crate::{Pipeline, RoiClass, RoiSelection, ScanMode, Segmentation, Spectra};
