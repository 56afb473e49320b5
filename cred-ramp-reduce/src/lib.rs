//! Real-time per-pixel reduction engine for infrared sensor streams that
//! read each pixel multiple times per integration ramp (NDR > 1), with a
//! correlated-double-sampling ("simple desaturation") mode for short ramps,
//! a linear up-the-ramp least-squares slope mode for long ramps, and a
//! single-read passthrough mode.
//!
//! Module order mirrors the leaves-first dependency order of the design:
//! [`sample`] (classifier, raw element dispatch), [`accum`] (SDS/UTR
//! kernels), [`ramp`] (the state machine and driver), [`finalize`], and the
//! sibling [`bayer`] splitter. [`stream`] defines the boundary to the
//! shared-memory image substrate, an external collaborator this crate never
//! implements.

pub mod accum;
pub mod bayer;
pub mod errors;
pub mod finalize;
pub mod ramp;
pub mod sample;
pub mod stream;

pub use errors::{Error, Result};
pub use ramp::{CloseOutcome, RampContext, RampEngine, RampMode};
pub use sample::{RawKind, RawSamples};
pub use stream::{CredInputStream, CredOutputStream, KeywordValue};

/// The trigger-driven driver loop (spec §4.5 item 5, §5): wait for the next
/// frame, process it to completion, repeat. One [`RampEngine::process_frame`]
/// call per notification; duplicates are dropped inside it, so the loop
/// itself does not need to de-duplicate.
///
/// `should_continue` is polled between frames, never mid-frame (spec §5
/// "Cancellation": finish the current frame, then exit).
pub fn run_driver_loop<I, O>(
    engine: &mut RampEngine,
    input: &mut I,
    output: &mut O,
    sat_val: f32,
    mut should_continue: impl FnMut() -> bool,
) -> Result<()>
where
    I: CredInputStream,
    O: CredOutputStream,
{
    while should_continue() {
        input.wait_next_frame()?;
        engine.process_frame(input, output, sat_val)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    fn _test_engine_is_send() {
        fn implements<T: Send>() {}
        implements::<crate::RampEngine>();
    }
}
