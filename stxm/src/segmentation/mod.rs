//! Automatic I0 / IT segmentation.
//!
//! The reference (raw) frame sets the threshold; the display frame (usually
//! the aligned one) is split into bright I0 and dark IT pixels, both restricted
//! to the stack validity. Each region is then eroded away from the boundary
//! between them so that mixed pixels along the object edge end up in neither:
//! I0 loses `ceil(b / 2)` pixels and IT loses `floor(b / 2)` for a boundary
//! width `b`. The I0 erosion treats the outside of the frame as I0, so the
//! background is not eaten from the frame edges; the IT erosion treats it as
//! background.


use std::sync::Arc;

use common::Buffer2;

use crate::error::Result;
use crate::image::{check_same_dimensions, Image, OverlayMask, Pixel, ValidityMask};
use crate::threshold::{Otsu, SharedThresholder};

/// Result of one segmentation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    pub threshold: f32,
    /// Reference (unabsorbed) pixels in row-major order.
    pub i0: Vec<Pixel>,
    /// Absorbing pixels in row-major order.
    pub it: Vec<Pixel>,
    /// `i0 - it`: +1, -1 or 0.
    pub overlay: OverlayMask,
}

/// Binary erosion with the 4-connected cross, repeated `iterations` times.
///
/// Neighbors outside the grid read as `border_value`.
pub fn erode(mask: &Buffer2<bool>, iterations: usize, border_value: bool) -> Buffer2<bool> {
    let mut current = mask.clone();
    for _ in 0..iterations {
        let previous = current.clone();
        let at = |x: isize, y: isize| previous.get_signed(x, y).copied().unwrap_or(border_value);
        for (x, y, _) in mask.enumerate() {
            let (xi, yi) = (x as isize, y as isize);
            current[(x, y)] = previous[(x, y)]
                && at(xi - 1, yi)
                && at(xi + 1, yi)
                && at(xi, yi - 1)
                && at(xi, yi + 1);
        }
        if current == previous {
            break;
        }
    }
    current
}

fn coordinates(mask: &Buffer2<bool>) -> Vec<Pixel> {
    mask.enumerate()
        .filter(|(_, _, &set)| set)
        .map(|(x, y, _)| Pixel::new(x, y))
        .collect()
}

#[derive(Debug, Clone)]
pub struct Segmenter {
    thresholder: SharedThresholder,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(Arc::new(Otsu))
    }
}

impl Segmenter {
    pub fn new(thresholder: SharedThresholder) -> Self {
        Self { thresholder }
    }

    pub fn segment(
        &self,
        reference: &Image,
        display: &Image,
        validity: &ValidityMask,
        boundary_width: usize,
    ) -> Result<Segmentation> {
        check_same_dimensions(1, reference, display)?;
        check_same_dimensions(1, reference, validity)?;

        let threshold = self.thresholder.threshold(reference)?;

        let i0_mask = display.zip_map(validity, |&v, &valid| valid && v > threshold);
        let it_mask = display.zip_map(validity, |&v, &valid| valid && v < threshold);

        let i0_mask = erode(&i0_mask, boundary_width.div_ceil(2), true);
        let it_mask = erode(&it_mask, boundary_width / 2, false);

        let overlay = i0_mask.zip_map(&it_mask, |&i0, &it| i0 as i8 - it as i8);
        let segmentation = Segmentation {
            threshold,
            i0: coordinates(&i0_mask),
            it: coordinates(&it_mask),
            overlay,
        };

        tracing::debug!(
            threshold,
            boundary_width,
            i0 = segmentation.i0.len(),
            it = segmentation.it.len(),
            "Segmented frame"
        );

        Ok(segmentation)
    }
}
