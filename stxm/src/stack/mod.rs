//! Stack alignment against a fixed reference frame.
//!
//! Frame 0 is the reference. Every later frame is registered directly against
//! it (star topology), never against its predecessor, so registration errors
//! do not accumulate along the stack. Appending a frame costs exactly one
//! registration and leaves earlier frames untouched, which makes batch
//! alignment and live, frame-by-frame alignment produce identical stacks.


use std::sync::Arc;

use common::{CancelFlag, SharedFn};

use crate::error::{Error, Result};
use crate::image::{
    check_pixel_width, check_same_dimensions, intersect_validity, Image, ImageDimensions, Shift,
    ValidityMask,
};
use crate::registration::Registrator;
use crate::warp::{AlignedFrame, FrameAligner};

/// Progress of a batch alignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentProgress {
    /// Frames aligned so far, reference included.
    pub current: usize,
    /// Frames in the batch.
    pub total: usize,
    /// Shift of the frame just aligned.
    pub shift: Shift,
}

type ProgressFn = dyn Fn(AlignmentProgress) + Send + Sync;

/// Optional progress sink invoked after each registered frame.
#[derive(Debug, Clone, Default)]
pub struct ProgressCallback(SharedFn<ProgressFn>);

impl ProgressCallback {
    pub fn new(f: impl Fn(AlignmentProgress) + Send + Sync + 'static) -> Self {
        let f: Arc<ProgressFn> = Arc::new(f);
        Self(SharedFn::new(f))
    }

    pub fn none() -> Self {
        Self(SharedFn::None)
    }

    fn report(&self, progress: AlignmentProgress) {
        if let Some(f) = self.0.as_ref() {
            f(progress);
        }
    }
}

/// Caller-owned acquisition: raw frames, their aligned versions and the
/// stack-level validity.
#[derive(Debug, Clone)]
pub struct AlignedStack {
    pixel_width_um: f64,
    raw: Vec<Image>,
    frames: Vec<AlignedFrame>,
    /// AND of every frame's validity.
    validity: ValidityMask,
}

impl AlignedStack {
    /// Starts an acquisition from its reference frame.
    pub fn new(reference: Image, pixel_width_um: f64) -> Result<Self> {
        check_pixel_width(pixel_width_um)?;
        let frame = AlignedFrame::unshifted(reference.clone());
        Ok(Self {
            pixel_width_um,
            validity: frame.validity.clone(),
            raw: vec![reference],
            frames: vec![frame],
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always `false`: a stack holds at least its reference frame.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn pixel_width_um(&self) -> f64 {
        self.pixel_width_um
    }

    pub fn dimensions(&self) -> ImageDimensions {
        ImageDimensions::of(&self.raw[0])
    }

    pub fn reference(&self) -> &Image {
        &self.raw[0]
    }

    pub fn raw_frames(&self) -> &[Image] {
        &self.raw
    }

    pub fn frames(&self) -> &[AlignedFrame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&AlignedFrame> {
        self.frames.get(index)
    }

    pub fn aligned_images(&self) -> impl Iterator<Item = &Image> {
        self.frames.iter().map(|f| &f.image)
    }

    pub fn shifts(&self) -> Vec<Shift> {
        self.frames.iter().map(|f| f.shift).collect()
    }

    pub fn validity(&self) -> &ValidityMask {
        &self.validity
    }

    fn push(&mut self, raw: Image, aligned: AlignedFrame) -> Result<()> {
        intersect_validity(&mut self.validity, &aligned.validity)?;
        self.raw.push(raw);
        self.frames.push(aligned);
        Ok(())
    }
}

/// Registers and resamples frames onto the reference.
#[derive(Debug, Clone, Default)]
pub struct StackAligner {
    registrator: Registrator,
    aligner: FrameAligner,
}

impl StackAligner {
    pub fn new(registrator: Registrator, aligner: FrameAligner) -> Self {
        Self {
            registrator,
            aligner,
        }
    }

    pub fn registrator(&self) -> &Registrator {
        &self.registrator
    }

    pub fn aligner(&self) -> &FrameAligner {
        &self.aligner
    }

    /// Appends one newly acquired frame, registering it against the reference.
    pub fn extend(&self, stack: &mut AlignedStack, frame: Image) -> Result<Shift> {
        let index = stack.len();
        check_same_dimensions(index, stack.reference(), &frame)?;

        let shift = self
            .registrator
            .estimate_shift(stack.reference(), &frame, stack.pixel_width_um)?;
        let aligned = self.aligner.apply(&frame, shift);

        tracing::info!(index, dx = shift.dx, dy = shift.dy, "Aligned frame");

        stack.push(frame, aligned)?;
        Ok(shift)
    }

    /// Aligns a whole batch.
    ///
    /// All frame dimensions are checked before any registration runs.
    /// Cancellation is honoured between frames; the frames aligned so far are
    /// returned.
    pub fn align(
        &self,
        frames: &[Image],
        pixel_width_um: f64,
        progress: &ProgressCallback,
        cancel: &CancelFlag,
    ) -> Result<AlignedStack> {
        let (reference, rest) = frames.split_first().ok_or(Error::EmptyStack)?;
        for (index, frame) in frames.iter().enumerate().skip(1) {
            check_same_dimensions(index, reference, frame)?;
        }

        let total = frames.len();
        let mut stack = AlignedStack::new(reference.clone(), pixel_width_um)?;

        for frame in rest {
            if cancel.is_cancelled() {
                tracing::warn!(aligned = stack.len(), total, "Stack alignment cancelled");
                break;
            }
            let shift = self.extend(&mut stack, frame.clone())?;
            progress.report(AlignmentProgress {
                current: stack.len(),
                total,
                shift,
            });
        }

        Ok(stack)
    }
}
