//! The ramp state machine and the engine that drives it (spec §4.5):
//! interprets the embedded frame tags and the externally reported NDR value
//! to decide, per arriving frame, whether a ramp opens, continues, or
//! closes, and runs the matching accumulator/finalizer.
//!
//! The original C loop body (`original_source/extract_utr.c`,
//! `compute_function`) folds all of this — duplicate detection, NDR
//! resolution, accumulation, finalization — into one function. Here it is
//! factored into named steps on [`RampEngine`], the same
//! factor-without-behaviour-change `flydra-feature-detector` applies when it
//! splits its original tracking loop into `TrackingState::do_work` stages.

use crate::accum::{capture_first_read, sds_iterate, utr_iterate, PixelAccumulators};
use crate::finalize::{passthrough_body, sds_finalize, utr_finalize};
use crate::sample::{RawKind, RawSamples};
use crate::stream::{CredInputStream, CredOutputStream};
use crate::{Error, Result};

// Spec §3 documents the sync word expected in tag[3] per datatype: `0x3ff0`
// on the U16 camera (imagetags enabled), `0x0000` on the S16 camera. §4.5's
// literal R1 formula states the opposite pairing (`sync != 0x0000` for U16,
// a `0x3ff0`-masked check for S16), which would make a real U16 frame
// carrying its own documented sync word desync on every single frame and
// never reduce. `original_source/extract_utr.c`'s `compute_function` (lines
// 396-402) performs no sync-word desync check at all, confirming real ramps
// are expected to reduce normally. R1 below follows §3's documented sync
// values rather than §4.5's literal (and self-contradicting) formula.
const U16_SYNC_EXPECTED: i32 = 0x3ff0;
const S16_SYNC_EXPECTED: i32 = 0x0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampMode {
    /// `ndr_effective == 1`: no accumulation, passthrough only.
    Passthrough,
    Sds,
    Utr,
}

/// What happened to the current frame at step 7 of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The ramp did not close on this frame; nothing was published.
    NotClosed,
    /// A reduced (or passthrough) frame was published.
    Published,
    /// The ramp closed but had too few reads to reduce (spec §7
    /// "Insufficient reads for SDS"); nothing was published.
    Suppressed,
}

/// The scalar ramp context (spec §3 "Ramp context"), created once at engine
/// start with all counters zero and never reset between ramps — only the
/// per-pixel accumulators are reset, lazily, on the opening frame of each
/// ramp.
#[derive(Debug, Clone, Default)]
pub struct RampContext {
    pub ndr_reported: i64,
    pub ndr_effective: u32,
    pub cred_cur: i32,
    pub cred_prev: i32,
    pub frame_cur: i32,
    pub frame_prev: i32,
    pub cred_repeat: u32,
    pub frame_init_idx: i32,
    pub cred_init_idx: i32,
    pub miss_count: u32,
    pub just_opened: bool,
    seen_first_frame: bool,
}

/// The per-pixel accumulators plus the scalar ramp context, wired together
/// into the single-threaded, trigger-driven loop of spec §4.5/§5.
#[derive(Debug)]
pub struct RampEngine {
    ctx: RampContext,
    acc: PixelAccumulators,
    mode: RampMode,
    width: u32,
    height: u32,
}

impl RampEngine {
    /// Allocate the engine's buffers once, for the lifetime of the process
    /// (spec §3 lifecycle, §7 "Allocation failure at engine start -> fatal").
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let n_pixels = width as usize * height as usize;
        if n_pixels <= crate::accum::FIRST_PIXEL_INDEX {
            return Err(Error::Allocation { n_pixels });
        }
        Ok(Self {
            ctx: RampContext::default(),
            acc: PixelAccumulators::new(n_pixels),
            mode: RampMode::Passthrough,
            width,
            height,
        })
    }

    pub fn context(&self) -> &RampContext {
        &self.ctx
    }

    pub fn mode(&self) -> RampMode {
        self.mode
    }

    /// Process one already-waited-for frame: steps 1-8 of spec §4.5. The
    /// caller is responsible for the wait (step 0, spec §5) so that
    /// `process_frame` itself is synchronous and easy to unit test against
    /// in-memory streams.
    pub fn process_frame<I, O>(
        &mut self,
        input: &I,
        output: &mut O,
        sat_val: f32,
    ) -> Result<CloseOutcome>
    where
        I: CredInputStream,
        O: CredOutputStream,
    {
        if input.width() != self.width || input.height() != self.height {
            return Err(Error::ShapeMismatch {
                in_w: input.width(),
                in_h: input.height(),
                out_w: self.width,
                out_h: self.height,
            });
        }

        let samples = input.samples();
        let dt = samples.kind();
        let frame_cur = samples.tag_i32(0);

        // Step 1: drop duplicate notifications (invariant I4).
        if self.ctx.seen_first_frame && frame_cur == self.ctx.frame_prev {
            return Ok(CloseOutcome::NotClosed);
        }

        // Step 2.
        let cred_cur = samples.tag_i32(2);
        let sync = samples.tag_i32(3);
        let ndr_reported = input.keyword_i64("NDR").unwrap_or(1);

        // Step 3.
        self.ctx.cred_repeat = if self.ctx.seen_first_frame && cred_cur == self.ctx.cred_prev {
            (self.ctx.cred_repeat + 1).min(10)
        } else {
            0
        };

        // Step 4: R1/R2/R3.
        let r1 = ndr_reported == 1
            || (dt == RawKind::U16
                && (self.ctx.cred_repeat == 10 || sync != U16_SYNC_EXPECTED))
            || (dt == RawKind::S16
                && (cred_cur as i64 == ndr_reported || sync != S16_SYNC_EXPECTED));

        let (ndr_effective, just_opened) = if r1 {
            self.ctx.frame_init_idx = frame_cur;
            self.ctx.cred_init_idx = cred_cur;
            (1u32, true)
        } else if self.ctx.cred_prev == 0 || cred_cur > self.ctx.cred_prev {
            capture_first_read(&mut self.acc, samples);
            self.ctx.frame_init_idx = frame_cur;
            self.ctx.cred_init_idx = cred_cur;
            (ndr_reported.max(0) as u32, true)
        } else {
            (self.ctx.ndr_effective, false)
        };

        self.ctx.just_opened = just_opened;
        self.ctx.ndr_effective = ndr_effective;
        self.ctx.ndr_reported = ndr_reported;

        // Step 5: mid-ramp miss accounting.
        if !just_opened && cred_cur != self.ctx.cred_prev - 1 {
            self.ctx.miss_count += 1;
        }

        // Step 6: accumulate.
        self.mode = if ndr_effective > 1 && ndr_effective <= 6 {
            sds_iterate(&mut self.acc, samples, sat_val, just_opened);
            RampMode::Sds
        } else if ndr_effective > 6 {
            let x = samples.tag_f32(2);
            utr_iterate(&mut self.acc, samples, x, sat_val, just_opened);
            RampMode::Utr
        } else {
            RampMode::Passthrough
        };

        // Step 7: finalize and publish.
        let outcome = if cred_cur == 0 || ndr_effective == 1 {
            let outcome = self.finalize_and_publish(samples, dt, ndr_effective, input, output)?;
            self.ctx.miss_count = 0;
            outcome
        } else {
            CloseOutcome::NotClosed
        };

        // Step 8.
        self.ctx.cred_prev = cred_cur;
        self.ctx.frame_prev = frame_cur;
        self.ctx.seen_first_frame = true;

        Ok(outcome)
    }

    fn finalize_and_publish<I, O>(
        &self,
        samples: RawSamples,
        dt: RawKind,
        ndr_effective: u32,
        input: &I,
        output: &mut O,
    ) -> Result<CloseOutcome>
    where
        I: CredInputStream,
        O: CredOutputStream,
    {
        if self.mode == RampMode::Sds && samples.tag_i32(0) <= self.ctx.frame_init_idx {
            tracing::warn!(
                frame_init_idx = self.ctx.frame_init_idx,
                "SDS ramp closed after a single frame, suppressing publication"
            );
            return Ok(CloseOutcome::Suppressed);
        }

        output.ensure_shape(self.width, self.height)?;
        {
            let out = output.pixels_mut();
            match self.mode {
                RampMode::Passthrough => passthrough_body(samples, out),
                RampMode::Sds => {
                    let invert = dt == RawKind::U16 && ndr_effective == 2;
                    sds_finalize(&self.acc, ndr_effective, invert, out);
                }
                RampMode::Utr => utr_finalize(&self.acc, ndr_effective, out),
            }

            out[0] = samples.tag_f32(0);
            out[1] = samples.tag_f32(1);
            out[2] = samples.tag_f32(2);
            out[3] = samples.tag_f32(3);
            out[4] = ndr_effective as f32;
            out[5] = self.ctx.cred_init_idx as f32;
            out[6] = self.ctx.frame_init_idx as f32;
            out[7] = self.ctx.miss_count as f32;
        }

        output.set_keywords(input.keywords());
        output.publish()?;
        Ok(CloseOutcome::Published)
    }

    /// Supplemental quicklook body (not in spec.md's two-stream contract;
    /// see SPEC_FULL.md §4.5): `current - first_read` for `i >= 8`,
    /// unscaled and never inverted, independent of ramp mode. Grounded on
    /// `original_source/extract_utr.c`'s `ql_finalize`.
    pub fn quicklook_body(&self, samples: RawSamples, out: &mut [f32]) {
        match samples {
            RawSamples::U16(s) => {
                for (i, out_px) in out.iter_mut().enumerate().skip(crate::accum::FIRST_PIXEL_INDEX)
                {
                    *out_px = s[i] as f32 - self.acc.first_read[i];
                }
            }
            RawSamples::S16(s) => {
                for (i, out_px) in out.iter_mut().enumerate().skip(crate::accum::FIRST_PIXEL_INDEX)
                {
                    *out_px = s[i] as f32 - self.acc.first_read[i];
                }
            }
        }
    }
}
