//! Example: Live Stack Alignment
//!
//! Simulates an energy stack arriving frame by frame while the sample drifts:
//! 1. Start the acquisition from its reference frame
//! 2. Register and align every new frame as it arrives
//! 3. Segment the latest aligned frame into I0 and IT regions
//! 4. Print the spectra of the aligned stack
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --example live_alignment -- [config.yaml]
//! ```

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use stxm::{AlignedStack, Image, Pipeline, ScanMode, Shift};

const SIZE: usize = 96;
const FRAMES: usize = 12;
const PIXEL_WIDTH_UM: f64 = 0.05;

/// Particle on a flat background. Absorption rises across an edge at frame 5.
fn acquire(index: usize) -> Image {
    let drift = Shift::new(0.35 * index as f64, -0.2 * index as f64);
    let depth = if index < 5 { 0.3 } else { 0.7 };
    let (cx, cy, sigma) = (40.0 + drift.dx, 52.0 + drift.dy, 9.0);
    Image::from_fn(SIZE, SIZE, |x, y| {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        let transmission = 1.0 - depth * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp();
        (20_000.0 * transmission) as f32
    })
}

fn main() -> anyhow::Result<()> {
    let log_dir = env::temp_dir().join("stxm_logs");
    common::log_setup::setup_logging("info", &log_dir, "live_alignment")?;

    let pipeline = match env::args().nth(1).map(PathBuf::from) {
        Some(path) => Pipeline::from_file(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Pipeline::default(),
    };
    let mode = ScanMode::classify(FRAMES, false);
    println!("Scan mode: {mode:?}, {FRAMES} frames of {SIZE}x{SIZE}\n");

    let aligner = pipeline.stack_aligner();
    let mut stack = AlignedStack::new(acquire(0), PIXEL_WIDTH_UM)?;

    println!("{:>3} {:>9} {:>9}", "#", "dx", "dy");
    println!("{}", "-".repeat(23));
    for index in 1..FRAMES {
        let shift = aligner.extend(&mut stack, acquire(index))?;
        println!("{index:>3} {:>9.3} {:>9.3}", shift.dx, shift.dy);
    }

    let valid = stack.validity().iter().filter(|&&v| v).count();
    println!(
        "\nValid pixels: {valid} of {}",
        stack.dimensions().pixel_count()
    );

    let selection = pipeline.select_regions(&stack, stack.len() - 1)?;
    println!(
        "I0 pixels: {}, IT pixels: {}",
        selection.i0().len(),
        selection.it().len()
    );

    let spectra = selection.stack_spectra(&stack, true)?;
    println!("\n{:>3} {:>10} {:>10} {:>7}", "#", "I0", "IT", "OD");
    for (i, ((i0, it), od)) in spectra
        .i0
        .iter()
        .zip(&spectra.it)
        .zip(&spectra.od)
        .enumerate()
    {
        println!("{i:>3} {i0:>10.1} {it:>10.1} {od:>7.3}");
    }

    Ok(())
}
