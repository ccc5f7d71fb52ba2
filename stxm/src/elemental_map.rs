//! Two-energy elemental contrast maps.
//!
//! Each frame is converted to optical density `OD = ln(I0 / I)`, where `I0` is
//! the mean of the frame's above-threshold (unabsorbed) pixels. The second OD
//! image is moved onto the first and the map is their difference. Pixels the
//! shift pulled in from outside the frame are zero in the map.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::image::{check_same_dimensions, Image, Shift, ValidityMask};
use crate::threshold::{Otsu, SharedThresholder};
use crate::warp::FrameAligner;

#[derive(Debug, Clone, PartialEq)]
pub struct ElementalMap {
    /// `OD(second, aligned) - OD(first)`, zero where `validity` is false.
    pub values: Image,
    pub validity: ValidityMask,
}

#[derive(Debug, Clone)]
pub struct MapGenerator {
    thresholder: SharedThresholder,
    aligner: FrameAligner,
}

impl Default for MapGenerator {
    fn default() -> Self {
        Self::new(Arc::new(Otsu), FrameAligner::default())
    }
}

impl MapGenerator {
    pub fn new(thresholder: SharedThresholder, aligner: FrameAligner) -> Self {
        Self {
            thresholder,
            aligner,
        }
    }

    /// Mean of the pixels above the frame's threshold.
    pub fn flat_field(&self, image: &Image) -> Result<f64> {
        let threshold = self.thresholder.threshold(image)?;
        let (sum, count) = image
            .iter()
            .filter(|&&v| v > threshold)
            .fold((0.0f64, 0usize), |(s, n), &v| (s + v as f64, n + 1));
        if count == 0 {
            return Err(Error::DegenerateImage { value: threshold });
        }
        Ok(sum / count as f64)
    }

    /// Optical density of `image` against its own flat field.
    pub fn optical_density(&self, image: &Image) -> Result<Image> {
        let i0 = self.flat_field(image)?;
        Ok(image.map(|&v| (i0 / v as f64).ln() as f32))
    }

    /// `shift` aligns `second` onto `first`.
    pub fn generate(
        &self,
        first: &Image,
        second: &Image,
        shift: Shift,
    ) -> Result<ElementalMap> {
        check_same_dimensions(1, first, second)?;

        let od_first = self.optical_density(first)?;
        let od_second = self.optical_density(second)?;
        let aligned = self.aligner.apply(&od_second, shift);

        let values = aligned
            .image
            .zip_map(&od_first, |&a, &b| a - b)
            .zip_map(&aligned.validity, |&d, &valid| if valid { d } else { 0.0 });

        let non_finite = values.iter().filter(|v| !v.is_finite()).count();
        if non_finite > 0 {
            tracing::warn!(non_finite, "Elemental map contains non-finite values");
        }

        Ok(ElementalMap {
            values,
            validity: aligned.validity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{patch_image, standard_scene};

    #[test]
    fn test_identical_frames_give_zero_map() {
        let image = standard_scene(Shift::ZERO);
        let map = MapGenerator::default()
            .generate(&image, &image, Shift::ZERO)
            .unwrap();
        assert!(map.values.iter().all(|&v| v == 0.0));
        assert!(map.validity.iter().all(|&v| v));
    }

    #[test]
    fn test_flat_field_and_optical_density() {
        let image = patch_image(10, 10, 100.0, (3, 3), 4, 10.0);
        let generator = MapGenerator::default();
        assert_eq!(generator.flat_field(&image).unwrap(), 100.0);

        let od = generator.optical_density(&image).unwrap();
        assert_eq!(od[(0, 0)], 0.0);
        assert!((od[(4, 4)] - 10.0f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn test_map_highlights_extra_absorption() {
        // Second energy absorbs more inside the patch
        let first = patch_image(10, 10, 100.0, (3, 3), 4, 50.0);
        let second = patch_image(10, 10, 200.0, (3, 3), 4, 20.0);
        let map = MapGenerator::default()
            .generate(&first, &second, Shift::ZERO)
            .unwrap();

        // ln(200/20) - ln(100/50) = ln(5)
        assert!((map.values[(4, 4)] - 5.0f32.ln()).abs() < 1e-5);
        assert!(map.values[(0, 0)].abs() < 1e-6);
    }

    #[test]
    fn test_invalid_pixels_zeroed() {
        let first = patch_image(12, 12, 100.0, (4, 4), 4, 40.0);
        let second = patch_image(12, 12, 100.0, (2, 4), 4, 40.0);
        let map = MapGenerator::default()
            .generate(&first, &second, Shift::new(2.0, 0.0))
            .unwrap();

        assert!(!map.validity[(0, 5)]);
        assert!(!map.validity[(1, 5)]);
        assert!(map.validity[(2, 5)]);
        assert_eq!(map.values[(0, 5)], 0.0);
        assert_eq!(map.values[(1, 5)], 0.0);
        // Patches coincide after alignment
        assert!(map.values.iter().all(|v| v.abs() < 1e-5));
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = Image::new_filled(8, 8, 1.0);
        let b = Image::new_filled(8, 9, 1.0);
        assert!(matches!(
            MapGenerator::default().generate(&a, &b, Shift::ZERO),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
