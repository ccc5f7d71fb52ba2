//! Configured entry point tying the processing stages together.
//!
//! A [`Pipeline`] owns one [`PipelineConfig`] and one thresholding strategy and
//! hands out stage objects built from them, so every stage of an acquisition
//! agrees on parameters.

use std::path::Path;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::elemental_map::{ElementalMap, MapGenerator};
use crate::error::{Error, Result};
use crate::image::{Image, Shift, ValidityMask};
use crate::linescan::LineScanRegridder;
use crate::registration::Registrator;
use crate::roi::RoiSelection;
use crate::segmentation::{Segmentation, Segmenter};
use crate::stack::{AlignedStack, StackAligner};
use crate::threshold::{Otsu, SharedThresholder};
use crate::warp::FrameAligner;

/// Elemental map of a two-energy acquisition with the shift that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct MapPair {
    pub shift: Shift,
    pub map: ElementalMap,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    thresholder: SharedThresholder,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            config: PipelineConfig::default(),
            thresholder: Arc::new(Otsu),
        }
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_thresholder(config, Arc::new(Otsu))
    }

    pub fn with_thresholder(
        config: PipelineConfig,
        thresholder: SharedThresholder,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            thresholder,
        })
    }

    /// Pipeline configured from a YAML or JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::new(PipelineConfig::load(path)?)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registrator(&self) -> Registrator {
        Registrator::with_thresholder(self.config.registration.clone(), self.thresholder.clone())
    }

    pub fn frame_aligner(&self) -> FrameAligner {
        FrameAligner::new(self.config.warp.clone())
    }

    pub fn stack_aligner(&self) -> StackAligner {
        StackAligner::new(self.registrator(), self.frame_aligner())
    }

    pub fn segmenter(&self) -> Segmenter {
        Segmenter::new(self.thresholder.clone())
    }

    pub fn map_generator(&self) -> MapGenerator {
        MapGenerator::new(self.thresholder.clone(), self.frame_aligner())
    }

    pub fn regridder(&self) -> LineScanRegridder {
        LineScanRegridder::new(self.config.line_scan.clone())
    }

    /// Registers `second` against `first` and builds their elemental map.
    pub fn map_pair(&self, first: &Image, second: &Image, pixel_width_um: f64) -> Result<MapPair> {
        let shift = self
            .registrator()
            .estimate_shift(first, second, pixel_width_um)?;
        let map = self.map_generator().generate(first, second, shift)?;
        Ok(MapPair { shift, map })
    }

    /// Segments with the configured boundary width.
    pub fn segment(
        &self,
        reference: &Image,
        display: &Image,
        validity: &ValidityMask,
    ) -> Result<Segmentation> {
        self.segmenter().segment(
            reference,
            display,
            validity,
            self.config.segmentation.boundary_width,
        )
    }

    /// Segments the stack's reference frame on the given aligned frame and
    /// applies the configured OD filter to the IT set.
    pub fn select_regions(&self, stack: &AlignedStack, display_index: usize) -> Result<RoiSelection> {
        let display = stack
            .frame(display_index)
            .map(|frame| &frame.image)
            .ok_or(Error::FrameOutOfRange {
                index: display_index,
                len: stack.len(),
            })?;
        let segmentation = self.segment(stack.reference(), display, stack.validity())?;
        let mut selection = RoiSelection::from_segmentation(segmentation);
        selection.od_filter(display, self.config.od_filter)?;
        Ok(selection)
    }
}
