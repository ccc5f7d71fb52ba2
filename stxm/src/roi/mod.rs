//! Regions of interest and spectra.
//!
//! A [`RoiSelection`] holds the I0 (reference) and IT (absorbing) pixel sets
//! together with the overlay mask that displays them. Sets come from automatic
//! segmentation, interactive polygon or band selection, or explicit pixel
//! lists. Manual additions only claim unassigned pixels, so the two sets stay
//! disjoint.
//!
//! Spectra average the selected pixels over every frame:
//! `I0(E)`, `IT(E)` and `OD(E) = ln(I0 / IT)`. An empty set averages to zero,
//! and OD is all zero unless both sets are populated.


use serde::{Deserialize, Serialize};

use crate::config::OdRange;
use crate::error::Result;
use crate::image::{
    check_same_dimensions, Image, ImageDimensions, OverlayMask, Pixel, PixelSize, ValidityMask,
};
use crate::segmentation::Segmentation;
use crate::stack::AlignedStack;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoiClass {
    I0,
    It,
}

impl RoiClass {
    /// Value of this class in the overlay mask.
    pub fn overlay_value(self) -> i8 {
        match self {
            RoiClass::I0 => 1,
            RoiClass::It => -1,
        }
    }
}

/// Mean intensities and optical density per frame (or per energy column).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Spectra {
    pub i0: Vec<f64>,
    pub it: Vec<f64>,
    pub od: Vec<f64>,
}

impl Spectra {
    fn from_sums(i0: Vec<f64>, i0_count: usize, it: Vec<f64>, it_count: usize) -> Self {
        let mean = |sums: Vec<f64>, count: usize| -> Vec<f64> {
            if count == 0 {
                vec![0.0; sums.len()]
            } else {
                sums.into_iter().map(|s| s / count as f64).collect()
            }
        };
        let i0 = mean(i0, i0_count);
        let it = mean(it, it_count);
        let od = if i0_count == 0 || it_count == 0 {
            vec![0.0; i0.len()]
        } else {
            i0.iter().zip(it.iter()).map(|(a, b)| (a / b).ln()).collect()
        };
        Self { i0, it, od }
    }

    pub fn len(&self) -> usize {
        self.od.len()
    }

    pub fn is_empty(&self) -> bool {
        self.od.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(common::serialize(self, common::FileFormat::Json)?)
    }
}

/// Even-odd rule point-in-polygon test.
fn polygon_contains(vertices: &[(f64, f64)], (px, py): (f64, f64)) -> bool {
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = vertices[i];
        let (xj, yj) = vertices[j];
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoiSelection {
    i0: Vec<Pixel>,
    it: Vec<Pixel>,
    /// IT set before OD filtering.
    it_unfiltered: Vec<Pixel>,
    overlay: OverlayMask,
}

impl RoiSelection {
    pub fn new(dimensions: ImageDimensions) -> Self {
        Self {
            i0: Vec::new(),
            it: Vec::new(),
            it_unfiltered: Vec::new(),
            overlay: OverlayMask::new_default(dimensions.width, dimensions.height),
        }
    }

    pub fn from_segmentation(segmentation: Segmentation) -> Self {
        Self {
            i0: segmentation.i0,
            it_unfiltered: segmentation.it.clone(),
            it: segmentation.it,
            overlay: segmentation.overlay,
        }
    }

    pub fn i0(&self) -> &[Pixel] {
        &self.i0
    }

    pub fn it(&self) -> &[Pixel] {
        &self.it
    }

    pub fn overlay(&self) -> &OverlayMask {
        &self.overlay
    }

    pub fn pixels(&self, class: RoiClass) -> &[Pixel] {
        match class {
            RoiClass::I0 => &self.i0,
            RoiClass::It => &self.it,
        }
    }

    /// Claims the unassigned pixels among `pixels` for `class`.
    ///
    /// Returns how many pixels were added.
    pub fn add_pixels(&mut self, class: RoiClass, pixels: impl IntoIterator<Item = Pixel>) -> usize {
        let value = class.overlay_value();
        let (width, height) = self.overlay.dimensions();
        let mut added = Vec::new();
        for p in pixels {
            if p.x < width && p.y < height && self.overlay[(p.x, p.y)] == 0 {
                self.overlay[(p.x, p.y)] = value;
                added.push(p);
            }
        }

        let count = added.len();
        match class {
            RoiClass::I0 => {
                // IT candidates dropped by the OD filter can be claimed here
                let overlay = &self.overlay;
                self.it_unfiltered
                    .retain(|p| overlay[(p.x, p.y)] != RoiClass::I0.overlay_value());
                self.i0.extend(added);
            }
            RoiClass::It => {
                self.it.extend(added);
                self.it_unfiltered = self.it.clone();
            }
        }
        count
    }

    /// Adds unassigned pixels whose physical position lies inside the closed
    /// polygon `vertices_um`. Pixel `(x, y)` sits at `(x * x_um, y * y_um)`.
    pub fn add_polygon(
        &mut self,
        class: RoiClass,
        vertices_um: &[(f64, f64)],
        pixel_size: PixelSize,
    ) -> usize {
        if vertices_um.len() < 3 {
            return 0;
        }
        let inside: Vec<Pixel> = self
            .overlay
            .enumerate()
            .map(|(x, y, _)| Pixel::new(x, y))
            .filter(|p| {
                polygon_contains(
                    vertices_um,
                    (p.x as f64 * pixel_size.x_um, p.y as f64 * pixel_size.y_um),
                )
            })
            .collect();
        self.add_pixels(class, inside)
    }

    /// Line scans: claims every row whose position `y * row_step_um` lies in
    /// `[y_min_um, y_max_um]` and whose first column is unassigned.
    pub fn add_row_band(
        &mut self,
        class: RoiClass,
        y_min_um: f64,
        y_max_um: f64,
        row_step_um: f64,
    ) -> usize {
        let (low, high) = (y_min_um.min(y_max_um), y_min_um.max(y_max_um));
        let (width, height) = self.overlay.dimensions();
        if width == 0 {
            return 0;
        }
        let rows: Vec<usize> = (0..height)
            .filter(|&y| {
                let position = y as f64 * row_step_um;
                self.overlay[(0, y)] == 0 && position >= low && position <= high
            })
            .collect();
        let pixels = rows
            .into_iter()
            .flat_map(|y| (0..width).map(move |x| Pixel::new(x, y)));
        self.add_pixels(class, pixels)
    }

    /// Removes one class from the sets and the overlay.
    pub fn clear(&mut self, class: RoiClass) {
        let value = class.overlay_value();
        for v in self.overlay.iter_mut() {
            if *v == value {
                *v = 0;
            }
        }
        match class {
            RoiClass::I0 => self.i0.clear(),
            RoiClass::It => {
                self.it.clear();
                self.it_unfiltered.clear();
            }
        }
    }

    /// Keeps the IT pixels whose optical density against the current mean I0
    /// lies strictly inside `range`.
    ///
    /// Filtering always starts from the IT set as it was before any filter, so
    /// repeated calls with different ranges do not compound. Without I0 pixels
    /// nothing changes. Returns the IT pixel count after filtering.
    pub fn od_filter(&mut self, display: &Image, range: OdRange) -> Result<usize> {
        check_same_dimensions(0, &self.overlay, display)?;
        if self.i0.is_empty() {
            return Ok(self.it.len());
        }
        let i0_mean = self
            .i0
            .iter()
            .map(|p| display[(p.x, p.y)] as f64)
            .sum::<f64>()
            / self.i0.len() as f64;

        self.it = self
            .it_unfiltered
            .iter()
            .copied()
            .filter(|p| range.contains((i0_mean / display[(p.x, p.y)] as f64).ln()))
            .collect();

        for p in &self.it_unfiltered {
            self.overlay[(p.x, p.y)] = 0;
        }
        for p in &self.it {
            self.overlay[(p.x, p.y)] = RoiClass::It.overlay_value();
        }

        tracing::debug!(
            kept = self.it.len(),
            candidates = self.it_unfiltered.len(),
            min = range.min,
            max = range.max,
            "Filtered IT pixels by optical density"
        );
        Ok(self.it.len())
    }

    /// Spectra over `frames`. With a validity mask, pixels outside it are
    /// left out of both sets.
    pub fn spectra<'a>(
        &self,
        frames: impl IntoIterator<Item = &'a Image>,
        validity: Option<&ValidityMask>,
    ) -> Result<Spectra> {
        if let Some(mask) = validity {
            check_same_dimensions(0, &self.overlay, mask)?;
        }
        let keep = |p: &&Pixel| validity.map_or(true, |mask| mask[(p.x, p.y)]);
        let i0: Vec<Pixel> = self.i0.iter().filter(keep).copied().collect();
        let it: Vec<Pixel> = self.it.iter().filter(keep).copied().collect();

        let sum = |frame: &Image, pixels: &[Pixel]| -> f64 {
            pixels.iter().map(|p| frame[(p.x, p.y)] as f64).sum()
        };
        let mut i0_sums = Vec::new();
        let mut it_sums = Vec::new();
        for (index, frame) in frames.into_iter().enumerate() {
            check_same_dimensions(index, &self.overlay, frame)?;
            i0_sums.push(sum(frame, &i0));
            it_sums.push(sum(frame, &it));
        }

        Ok(Spectra::from_sums(i0_sums, i0.len(), it_sums, it.len()))
    }

    /// Spectra of an acquisition: aligned frames restricted to the stack
    /// validity, or the raw frames as acquired.
    pub fn stack_spectra(&self, stack: &AlignedStack, aligned: bool) -> Result<Spectra> {
        if aligned {
            self.spectra(stack.aligned_images(), Some(stack.validity()))
        } else {
            self.spectra(stack.raw_frames(), None)
        }
    }

    /// Line scans: one spectrum point per energy column, averaging the rows
    /// whose first overlay column is tagged I0 or IT.
    pub fn line_scan_spectra(&self, image: &Image) -> Result<Spectra> {
        check_same_dimensions(0, &self.overlay, image)?;
        let width = image.width();
        let mut i0 = vec![0.0f64; width];
        let mut it = vec![0.0f64; width];
        let (mut n_i0, mut n_it) = (0usize, 0usize);

        for (y, row) in image.rows().enumerate() {
            let target = match self.overlay[(0, y)] {
                1 => {
                    n_i0 += 1;
                    &mut i0
                }
                -1 => {
                    n_it += 1;
                    &mut it
                }
                _ => continue,
            };
            for (acc, &v) in target.iter_mut().zip(row.iter()) {
                *acc += v as f64;
            }
        }

        Ok(Spectra::from_sums(i0, n_i0, it, n_it))
    }
}
