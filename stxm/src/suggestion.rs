//! Region suggestion through an external upsampling predictor.
//!
//! The predictor (typically a super-resolution network) is opaque: it takes a
//! frame and returns an upsampled version by an integer factor per axis. The
//! prediction is block-averaged back onto the acquisition grid, thresholded,
//! and the below-threshold pixels are returned darkest first as candidates to
//! inspect. Alignment and segmentation never depend on this module.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::image::{Image, Pixel};
use crate::threshold::{Otsu, SharedThresholder};

pub trait UpsamplingPredictor {
    fn predict(&self, image: &Image) -> Result<Image>;
}

impl<F> UpsamplingPredictor for F
where
    F: Fn(&Image) -> Result<Image>,
{
    fn predict(&self, image: &Image) -> Result<Image> {
        self(image)
    }
}

/// Averages `factor_x x factor_y` blocks of `upsampled` onto a
/// `width x height` grid.
fn block_average(upsampled: &Image, width: usize, height: usize) -> Result<Image> {
    let (up_width, up_height) = upsampled.dimensions();
    if width == 0
        || height == 0
        || up_width < width
        || up_height < height
        || up_width % width != 0
        || up_height % height != 0
    {
        return Err(Error::Predictor(format!(
            "prediction of {up_width}x{up_height} is not an integer upsampling of {width}x{height}"
        )));
    }
    let factor_x = up_width / width;
    let factor_y = up_height / height;
    let block = (factor_x * factor_y) as f64;

    Ok(Image::from_fn(width, height, |x, y| {
        let sum: f64 = (0..factor_y)
            .flat_map(|dy| {
                let row = upsampled.row(y * factor_y + dy);
                row[x * factor_x..(x + 1) * factor_x].iter()
            })
            .map(|&v| v as f64)
            .sum();
        (sum / block) as f32
    }))
}

#[derive(Debug, Clone)]
pub struct RegionSuggester<P> {
    predictor: P,
    thresholder: SharedThresholder,
}

impl<P: UpsamplingPredictor> RegionSuggester<P> {
    pub fn new(predictor: P) -> Self {
        Self::with_thresholder(predictor, Arc::new(Otsu))
    }

    pub fn with_thresholder(predictor: P, thresholder: SharedThresholder) -> Self {
        Self {
            predictor,
            thresholder,
        }
    }

    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    /// Below-threshold pixels of the prediction, darkest first. Equal values
    /// keep row-major order.
    pub fn suggest(&self, image: &Image) -> Result<Vec<Pixel>> {
        let upsampled = self.predictor.predict(image)?;
        let predicted = block_average(&upsampled, image.width(), image.height())?;
        let threshold = self.thresholder.threshold(&predicted)?;

        let mut candidates: Vec<(f32, Pixel)> = predicted
            .enumerate()
            .filter(|(_, _, &v)| v < threshold)
            .map(|(x, y, &v)| (v, Pixel::new(x, y)))
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        tracing::debug!(
            threshold,
            candidates = candidates.len(),
            upsampled_width = upsampled.width(),
            "Suggested regions"
        );

        Ok(candidates.into_iter().map(|(_, p)| p).collect())
    }
}
