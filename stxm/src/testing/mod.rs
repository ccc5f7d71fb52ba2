//! Synthetic acquisitions for tests.
//!
//! Scenes are rendered analytically, so a scene rendered with an offset is an
//! exact sub-pixel translation of the unshifted scene (up to content entering
//! at the borders).

#![allow(dead_code)]

use crate::image::{Image, Shift};

/// Flat-field intensity outside absorbing features.
pub const BACKGROUND: f32 = 1000.0;

/// Absorbing Gaussian feature: `(cx, cy, sigma, depth)` with depth in `0..1`.
pub type Blob = (f64, f64, f64, f64);

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Background with absorbing blobs whose centres are moved by `offset`.
pub fn blob_scene(width: usize, height: usize, blobs: &[Blob], offset: Shift) -> Image {
    Image::from_fn(width, height, |x, y| {
        let transmission: f64 = blobs
            .iter()
            .map(|&(cx, cy, sigma, depth)| {
                let dx = x as f64 - (cx + offset.dx);
                let dy = y as f64 - (cy + offset.dy);
                1.0 - depth * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
            })
            .product();
        (BACKGROUND as f64 * transmission) as f32
    })
}

/// Three blobs of different size and depth placed asymmetrically in a 64x64 frame.
pub fn standard_scene(offset: Shift) -> Image {
    blob_scene(
        64,
        64,
        &[
            (24.0, 28.0, 4.0, 0.7),
            (40.0, 36.0, 2.5, 0.5),
            (30.0, 44.0, 3.0, 0.6),
        ],
        offset,
    )
}

/// Dark region covering the left side of the frame with a smooth edge near
/// `x = 14`, plus two blobs.
pub fn edge_scene(offset: Shift) -> Image {
    let blobs = blob_scene(
        64,
        64,
        &[(38.0, 24.0, 3.0, 0.6), (46.0, 42.0, 2.5, 0.5)],
        offset,
    );
    Image::from_fn(64, 64, |x, y| {
        let edge = 14.0 + offset.dx;
        let dark = 1.0 / (1.0 + ((x as f64 - edge) / 1.2).exp());
        (blobs[(x, y)] as f64 * (1.0 - 0.75 * dark)) as f32
    })
}

/// `value` everywhere except a `size x size` patch at `(x0, y0)` set to `patch`.
pub fn patch_image(
    width: usize,
    height: usize,
    value: f32,
    (x0, y0): (usize, usize),
    size: usize,
    patch: f32,
) -> Image {
    Image::from_fn(width, height, |x, y| {
        if (x0..x0 + size).contains(&x) && (y0..y0 + size).contains(&y) {
            patch
        } else {
            value
        }
    })
}

/// Smooth non-symmetric ramp, useful to check resampling away from the borders.
pub fn ramp(width: usize, height: usize) -> Image {
    Image::from_fn(width, height, |x, y| {
        let xf = x as f32;
        let yf = y as f32;
        100.0 + 3.0 * xf + 2.0 * yf + 10.0 * (xf * 0.3).sin() * (yf * 0.2).cos()
    })
}
