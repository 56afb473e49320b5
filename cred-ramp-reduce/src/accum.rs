//! Per-pixel accumulators for the SDS and UTR reduction kernels (spec §4.2).
//!
//! Both kernels skip pixel indices `0..8` (the tag pixels, invariant I1) and
//! are written as the branch-free "multiply by validity" form the spec
//! mandates: a saturated sample contributes exactly zero to every sum
//! without an `if`, and can never poison an accumulator with `NaN` because
//! the multiply happens before any division.

use crate::sample::{classify, RawSamples};
use num_traits::AsPrimitive;

pub const FIRST_PIXEL_INDEX: usize = 8;

/// `W*H`-sized per-pixel state, allocated once and reused for the engine's
/// lifetime (spec §3 lifecycle, §9 "no per-frame allocations").
#[derive(Debug, Clone)]
pub struct PixelAccumulators {
    pub count: Vec<u32>,
    pub valid: Vec<u8>,
    pub last_valid: Vec<f32>,
    pub first_read: Vec<f32>,
    pub sum_x: Vec<f32>,
    pub sum_y: Vec<f32>,
    pub sum_xy: Vec<f32>,
    pub sum_xx: Vec<f32>,
    pub sum_yy: Vec<f32>,
}

impl PixelAccumulators {
    pub fn new(n_pixels: usize) -> Self {
        Self {
            count: vec![0; n_pixels],
            valid: vec![1; n_pixels],
            last_valid: vec![0.0; n_pixels],
            first_read: vec![0.0; n_pixels],
            sum_x: vec![0.0; n_pixels],
            sum_y: vec![0.0; n_pixels],
            sum_xy: vec![0.0; n_pixels],
            sum_xx: vec![0.0; n_pixels],
            sum_yy: vec![0.0; n_pixels],
        }
    }

    pub fn n_pixels(&self) -> usize {
        self.count.len()
    }
}

/// Capture `first_read[i]` for `i >= 8` from the raw frame, cast to `f32`
/// (spec invariant I5: captured before any accumulation happens on open).
pub fn capture_first_read(acc: &mut PixelAccumulators, samples: RawSamples) {
    match samples {
        RawSamples::U16(s) => capture_first_read_inner(acc, s),
        RawSamples::S16(s) => capture_first_read_inner(acc, s),
    }
}

fn capture_first_read_inner<T: AsPrimitive<f32>>(acc: &mut PixelAccumulators, s: &[T]) {
    for i in FIRST_PIXEL_INDEX..acc.n_pixels() {
        acc.first_read[i] = s[i].as_();
    }
}

/// SDS kernel (spec §4.2 "SDS kernel").
pub fn sds_iterate(acc: &mut PixelAccumulators, samples: RawSamples, sat_val: f32, reset: bool) {
    match samples {
        RawSamples::U16(s) => sds_iterate_inner(acc, s, sat_val, reset),
        RawSamples::S16(s) => sds_iterate_inner(acc, s, sat_val, reset),
    }
}

fn sds_iterate_inner<T: AsPrimitive<f32> + Copy>(
    acc: &mut PixelAccumulators,
    s: &[T],
    sat_val: f32,
    reset: bool,
) {
    if reset {
        for i in FIRST_PIXEL_INDEX..acc.n_pixels() {
            let (k, v) = classify(s[i], sat_val);
            acc.valid[i] = k as u8;
            acc.count[i] = 1;
            acc.last_valid[i] = k * v;
        }
    } else {
        for i in FIRST_PIXEL_INDEX..acc.n_pixels() {
            let (k, v) = classify(s[i], sat_val);
            acc.valid[i] = k as u8;
            acc.count[i] += k as u32;
            acc.last_valid[i] = if k != 0.0 { v } else { acc.last_valid[i] };
        }
    }
}

/// UTR kernel (spec §4.2 "UTR kernel"). `x` is `tag[2]` of the current
/// frame, the NDR index, which decreases across a ramp.
pub fn utr_iterate(
    acc: &mut PixelAccumulators,
    samples: RawSamples,
    x: f32,
    sat_val: f32,
    reset: bool,
) {
    match samples {
        RawSamples::U16(s) => utr_iterate_inner(acc, s, x, sat_val, reset),
        RawSamples::S16(s) => utr_iterate_inner(acc, s, x, sat_val, reset),
    }
}

fn utr_iterate_inner<T: AsPrimitive<f32> + Copy>(
    acc: &mut PixelAccumulators,
    s: &[T],
    x: f32,
    sat_val: f32,
    reset: bool,
) {
    if reset {
        for i in FIRST_PIXEL_INDEX..acc.n_pixels() {
            let (k, v) = classify(s[i], sat_val);
            acc.valid[i] = k as u8;
            acc.count[i] = k as u32;

            let kx = k * x;
            let kv = k * v;
            acc.sum_x[i] = kx;
            acc.sum_y[i] = kv;
            acc.sum_xy[i] = kx * v;
            acc.sum_xx[i] = kx * x;
            acc.sum_yy[i] = kv * v;
        }
    } else {
        for i in FIRST_PIXEL_INDEX..acc.n_pixels() {
            let (k, v) = classify(s[i], sat_val);
            acc.valid[i] = k as u8;
            acc.count[i] += k as u32;

            let kx = k * x;
            let kv = k * v;
            acc.sum_x[i] += kx;
            acc.sum_y[i] += kv;
            acc.sum_xy[i] += kx * v;
            acc.sum_xx[i] += kx * x;
            acc.sum_yy[i] += kv * v;
        }
    }
}
