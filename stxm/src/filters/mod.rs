//! Smoothing and edge filters used ahead of registration.
//!
//! The Gaussian is separable (rows, then columns) with a kernel truncated at
//! four standard deviations and mirrored borders (`d c b a | a b c d | d c b a`).
//! The edge filter is the Sobel gradient magnitude, evaluated with the same
//! mirrored borders so that the frame edge adds no features of its own.


use crate::image::Image;

/// Kernel half-width in standard deviations.
const TRUNCATE: f64 = 4.0;

/// Normalized 1D Gaussian kernel with radius `round(4 * sigma)`.
pub fn gaussian_kernel_1d(sigma: f64) -> Vec<f64> {
    assert!(sigma > 0.0, "Sigma must be positive");

    let radius = (TRUNCATE * sigma + 0.5) as usize;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-x * x / two_sigma_sq).exp()
        })
        .collect();

    let sum: f64 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }

    kernel
}

/// Maps any index onto `0..len` by mirroring about the array edges.
#[inline]
fn reflect_index(index: isize, len: usize) -> usize {
    let period = 2 * len as isize;
    let m = index.rem_euclid(period) as usize;
    if m >= len {
        2 * len - 1 - m
    } else {
        m
    }
}

fn convolve_line(input: &[f32], output: &mut [f32], stride: usize, len: usize, kernel: &[f64]) {
    let radius = (kernel.len() / 2) as isize;
    for i in 0..len {
        let mut acc = 0.0f64;
        for (k, &w) in kernel.iter().enumerate() {
            let src = reflect_index(i as isize + k as isize - radius, len);
            acc += w * input[src * stride] as f64;
        }
        output[i * stride] = acc as f32;
    }
}

/// Gaussian blur with standard deviation `sigma` pixels.
///
/// A non-positive sigma returns a copy of the input.
pub fn gaussian_smooth(image: &Image, sigma: f64) -> Image {
    if sigma <= 0.0 || image.is_empty() {
        return image.clone();
    }

    let kernel = gaussian_kernel_1d(sigma);
    let (width, height) = image.dimensions();

    let mut rows = Image::new_default(width, height);
    for y in 0..height {
        let start = y * width;
        convolve_line(
            &image.pixels()[start..start + width],
            &mut rows.pixels_mut()[start..start + width],
            1,
            width,
            &kernel,
        );
    }

    let mut output = Image::new_default(width, height);
    for x in 0..width {
        convolve_line(
            &rows.pixels()[x..],
            &mut output.pixels_mut()[x..],
            width,
            height,
            &kernel,
        );
    }

    output
}

/// Sobel gradient magnitude `sqrt((gx^2 + gy^2) / 2)` with kernels scaled by 1/4.
///
/// Neighbours outside the frame are mirrored, so a feature crossing the frame
/// edge keeps its gradient up to the last pixel.
pub fn sobel_magnitude(image: &Image) -> Image {
    let (width, height) = image.dimensions();
    let mut output = Image::new_default(width, height);
    if width == 0 || height == 0 {
        return output;
    }

    let p = |x: usize, y: usize, dx: isize, dy: isize| {
        let sx = reflect_index(x as isize + dx, width);
        let sy = reflect_index(y as isize + dy, height);
        image[(sx, sy)] as f64
    };
    for y in 0..height {
        for x in 0..width {
            let gy = (p(x, y, -1, -1) + 2.0 * p(x, y, 0, -1) + p(x, y, 1, -1)
                - p(x, y, -1, 1)
                - 2.0 * p(x, y, 0, 1)
                - p(x, y, 1, 1))
                / 4.0;
            let gx = (p(x, y, -1, -1) + 2.0 * p(x, y, -1, 0) + p(x, y, -1, 1)
                - p(x, y, 1, -1)
                - 2.0 * p(x, y, 1, 0)
                - p(x, y, 1, 1))
                / 4.0;
            output[(x, y)] = ((gx * gx + gy * gy) / 2.0).sqrt() as f32;
        }
    }

    output
}
