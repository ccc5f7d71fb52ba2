//! End-to-end run over a synthetic drifting acquisition.

use std::sync::{Arc, Mutex};

use stxm::{
    align_stack, apply_shift, estimate_shift, generate_map, regrid_line_scan, segment,
    AlignmentProgress, CancelFlag, Error, Image, Pipeline, PipelineConfig, ProgressCallback,
    RoiClass, RoiSelection, ScanMode, Shift,
};

const PIXEL_WIDTH: f64 = 0.5;

/// Flat 1000-count background with one absorbing blob per entry, displaced by
/// `drift`. `absorption` scales every blob's depth.
fn frame(drift: Shift, absorption: f64) -> Image {
    let blobs = [(22.0, 26.0, 4.0, 0.6), (40.0, 34.0, 3.0, 0.5), (30.0, 44.0, 2.5, 0.4)];
    Image::from_fn(64, 64, |x, y| {
        let transmission: f64 = blobs
            .iter()
            .map(|&(cx, cy, sigma, depth)| {
                let dx = x as f64 - (cx + drift.dx);
                let dy = y as f64 - (cy + drift.dy);
                1.0 - absorption * depth * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
            })
            .product();
        (1000.0 * transmission) as f32
    })
}

fn acquisition() -> (Vec<Shift>, Vec<Image>) {
    let drifts = vec![
        Shift::ZERO,
        Shift::new(0.6, 0.2),
        Shift::new(1.2, 0.5),
        Shift::new(1.9, 0.7),
        Shift::new(2.4, 1.1),
    ];
    let frames = drifts
        .iter()
        .enumerate()
        .map(|(i, &d)| frame(d, 0.8 + 0.05 * i as f64))
        .collect();
    (drifts, frames)
}

#[test]
fn stack_alignment_segmentation_and_spectra() {
    let (drifts, frames) = acquisition();
    assert_eq!(ScanMode::classify(frames.len(), false), ScanMode::Stack);

    let reports = Arc::new(Mutex::new(Vec::<AlignmentProgress>::new()));
    let sink = reports.clone();
    let progress = ProgressCallback::new(move |p| sink.lock().unwrap().push(p));

    let stack = align_stack(&frames, PIXEL_WIDTH, &progress).unwrap();
    assert_eq!(stack.len(), frames.len());

    for (shift, drift) in stack.shifts().iter().zip(&drifts) {
        assert!(
            (shift.dx + drift.dx).abs() < 0.1 && (shift.dy + drift.dy).abs() < 0.1,
            "drift {drift:?} estimated as {shift:?}"
        );
    }

    let reports = reports.lock().unwrap();
    let counts: Vec<usize> = reports.iter().map(|p| p.current).collect();
    assert_eq!(counts, vec![2, 3, 4, 5]);
    assert!(reports.iter().all(|p| p.total == 5));

    // Drift of ~2.4 px to the right leaves the last columns without data
    let validity = stack.validity();
    assert!(!validity[(63, 32)]);
    assert!(validity[(32, 32)]);

    let last = &stack.frames()[4].image;
    let seg = segment(stack.reference(), last, validity, 2).unwrap();
    assert!(!seg.i0.is_empty());
    assert!(!seg.it.is_empty());
    assert!(seg.i0.iter().all(|p| validity[(p.x, p.y)]));

    let roi = RoiSelection::from_segmentation(seg);
    let spectra = roi.stack_spectra(&stack, true).unwrap();
    assert_eq!(spectra.len(), 5);
    assert!(spectra.od.iter().all(|&od| od > 0.0));
    // Absorption grows along the stack
    assert!(spectra.od[4] > spectra.od[0]);
    assert!(spectra.to_json().unwrap().contains("\"od\""));
}

#[test]
fn incremental_alignment_matches_batch() {
    let (_, frames) = acquisition();
    let pipeline = Pipeline::default();
    let aligner = pipeline.stack_aligner();

    let batch = aligner
        .align(&frames, PIXEL_WIDTH, &ProgressCallback::none(), &CancelFlag::new())
        .unwrap();

    let mut live = stxm::AlignedStack::new(frames[0].clone(), PIXEL_WIDTH).unwrap();
    for f in &frames[1..] {
        aligner.extend(&mut live, f.clone()).unwrap();
    }

    assert_eq!(live.shifts(), batch.shifts());
    assert_eq!(live.validity(), batch.validity());
}

#[test]
fn cancellation_keeps_aligned_prefix() {
    let (_, frames) = acquisition();
    let cancel = CancelFlag::new();
    let trigger = cancel.clone();
    let progress = ProgressCallback::new(move |p| {
        if p.current == 3 {
            trigger.cancel();
        }
    });

    let stack = Pipeline::default()
        .stack_aligner()
        .align(&frames, PIXEL_WIDTH, &progress, &cancel)
        .unwrap();
    assert_eq!(stack.len(), 3);
}

#[test]
fn mismatched_frame_fails_before_registration() {
    let (_, mut frames) = acquisition();
    frames.push(Image::new_filled(32, 64, 1000.0));
    let err = align_stack(&frames, PIXEL_WIDTH, &ProgressCallback::none()).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { index: 5, .. }));
}

#[test]
fn two_energy_map() {
    let first = frame(Shift::ZERO, 0.5);
    let second = frame(Shift::new(1.5, -0.5), 1.0);
    assert_eq!(ScanMode::classify(2, false), ScanMode::Map);

    let shift = estimate_shift(&first, &second, PIXEL_WIDTH).unwrap();
    assert!((shift.dx + 1.5).abs() < 0.1 && (shift.dy - 0.5).abs() < 0.1);

    let map = generate_map((&first, &second), shift).unwrap();
    // Stronger absorption at the second energy shows up positive on the blob
    assert!(map.values[(22, 26)] > 0.1);
    assert!(map.values[(5, 5)].abs() < 0.05);

    let pair = Pipeline::default().map_pair(&first, &second, PIXEL_WIDTH).unwrap();
    assert_eq!(pair.shift, shift);
}

#[test]
fn shift_round_trip_preserves_interior() {
    let image = frame(Shift::ZERO, 1.0);
    let there = apply_shift(&image, Shift::new(2.3, -1.7));
    let back = apply_shift(&there.image, Shift::new(-2.3, 1.7));

    for y in 8..56 {
        for x in 8..56 {
            let diff = (back.image[(x, y)] - image[(x, y)]).abs();
            assert!(diff < 5.0, "pixel ({x}, {y}) differs by {diff}");
        }
    }
}

#[test]
fn line_scan_regrid_and_band_spectra() {
    assert_eq!(ScanMode::classify(40, true), ScanMode::LineScan);

    let energies: Vec<f64> = (0..40).map(|i| 280.0 + 0.1 * i as f64).collect();
    // Rows 0-9 are background, rows 10-19 absorb above 282 eV
    let image = Image::from_fn(40, 20, |x, y| {
        if y >= 10 && energies[x] > 282.0 {
            300.0
        } else {
            1000.0
        }
    });

    let regridded = regrid_line_scan(&image, &energies).unwrap();
    assert_eq!(regridded.image.height(), 20);
    assert_eq!(regridded.energies.first(), Some(&280.0));
    assert_eq!(regridded.source_columns.last(), Some(&39));

    let mut roi = RoiSelection::new(stxm::ImageDimensions::of(&image));
    roi.add_row_band(RoiClass::I0, 0.0, 0.95, 0.1);
    roi.add_row_band(RoiClass::It, 0.95, 1.95, 0.1);
    let spectra = roi.line_scan_spectra(&image).unwrap();

    assert_eq!(spectra.len(), 40);
    assert!(spectra.od[0].abs() < 1e-9);
    assert!((spectra.od[39] - (1000.0f64 / 300.0).ln()).abs() < 1e-6);
}

#[test]
fn config_file_round_trip() {
    let mut config = PipelineConfig::default();
    config.segmentation.boundary_width = 4;
    let yaml = common::serialize(&config, common::FileFormat::Yaml).unwrap();

    let path = std::env::temp_dir().join(format!("stxm_pipeline_{}.yaml", std::process::id()));
    std::fs::write(&path, yaml).unwrap();
    let pipeline = Pipeline::from_file(&path);
    std::fs::remove_file(&path).unwrap();

    assert_eq!(pipeline.unwrap().config(), &config);
}
