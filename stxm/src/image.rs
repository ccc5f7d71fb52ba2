//! Core image, mask and coordinate types.

use std::ops::Neg;

use common::Buffer2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Intensity image. Acquired frames hold non-negative counts; derived images
/// (optical density, maps) may be negative or non-finite.
pub type Image = Buffer2<f32>;

/// `true` where a pixel reflects acquired data, `false` where it was
/// extrapolated while applying a shift.
pub type ValidityMask = Buffer2<bool>;

/// `+1` for I0 pixels, `-1` for IT pixels, `0` for unassigned.
pub type OverlayMask = Buffer2<i8>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: usize,
    pub height: usize,
}

impl ImageDimensions {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn of<T>(buffer: &Buffer2<T>) -> Self {
        Self::new(buffer.width(), buffer.height())
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

/// Pixel coordinate: `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pixel {
    pub x: usize,
    pub y: usize,
}

impl Pixel {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Translation in pixels along columns (`dx`) and rows (`dy`).
///
/// Applying a shift moves image content by `(dx, dy)`: `out(x, y) = in(x - dx, y - dy)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Shift {
    pub dx: f64,
    pub dy: f64,
}

impl Shift {
    pub const ZERO: Shift = Shift { dx: 0.0, dy: 0.0 };

    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    pub fn magnitude(&self) -> f64 {
        self.dx.hypot(self.dy)
    }

    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.dx.is_finite() && self.dy.is_finite()
    }
}

impl Neg for Shift {
    type Output = Shift;

    fn neg(self) -> Shift {
        Shift::new(-self.dx, -self.dy)
    }
}

/// Physical pixel pitch of an acquisition in micrometres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelSize {
    pub x_um: f64,
    pub y_um: f64,
}

impl PixelSize {
    pub const fn square(um: f64) -> Self {
        Self { x_um: um, y_um: um }
    }
}

pub(crate) fn check_pixel_width(pixel_width_um: f64) -> Result<()> {
    if pixel_width_um.is_finite() && pixel_width_um > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidPixelWidth(pixel_width_um))
    }
}

pub(crate) fn check_same_dimensions<T, U>(
    index: usize,
    expected: &Buffer2<T>,
    actual: &Buffer2<U>,
) -> Result<()> {
    if expected.same_dimensions(actual) {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            index,
            expected: ImageDimensions::of(expected),
            actual: ImageDimensions::of(actual),
        })
    }
}

pub fn full_validity(dimensions: ImageDimensions) -> ValidityMask {
    ValidityMask::new_filled(dimensions.width, dimensions.height, true)
}

/// ANDs `other` into `mask`.
pub fn intersect_validity(mask: &mut ValidityMask, other: &ValidityMask) -> Result<()> {
    check_same_dimensions(1, mask, other)?;
    for (m, &o) in mask.iter_mut().zip(other.iter()) {
        *m &= o;
    }
    Ok(())
}
