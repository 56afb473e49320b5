//! Finalizers (spec §4.3): produce the non-tag body of an output frame from
//! the accumulators at ramp close. Tag pixels `0..8` are filled separately
//! by [`crate::ramp::RampEngine`], which is the same split the finalizers'
//! body loops (`ii = 8..n_pixels`) make in spec §4.3.

use crate::accum::{PixelAccumulators, FIRST_PIXEL_INDEX};
use crate::sample::RawSamples;
use num_traits::AsPrimitive;

/// `out[8..]` for the passthrough path (`ndr_effective == 1`): every pixel
/// is the raw sample cast to `f32`, unreduced.
pub fn passthrough_body(samples: RawSamples, out: &mut [f32]) {
    match samples {
        RawSamples::U16(s) => passthrough_body_inner(s, out),
        RawSamples::S16(s) => passthrough_body_inner(s, out),
    }
}

fn passthrough_body_inner<T: AsPrimitive<f32> + Copy>(s: &[T], out: &mut [f32]) {
    for i in FIRST_PIXEL_INDEX..out.len() {
        out[i] = s[i].as_();
    }
}

/// SDS finalize (spec §4.3 "SDS finalize"). `invert` is true exactly when
/// the source datatype is U16 and `ndr_effective == 2` (spec §9's
/// historical-bug note: the inversion is *not* applied for U16 with N > 2).
pub fn sds_finalize(acc: &PixelAccumulators, ndr_effective: u32, invert: bool, out: &mut [f32]) {
    let n = ndr_effective as f32;
    for i in FIRST_PIXEL_INDEX..out.len() {
        out[i] = if acc.count[i] >= 2 {
            let numerator = if invert {
                acc.first_read[i] - acc.last_valid[i]
            } else {
                acc.last_valid[i] - acc.first_read[i]
            };
            (n - 1.0) * numerator / (acc.count[i] as f32 - 1.0)
        } else {
            0.0
        };
    }
}

/// UTR finalize (spec §4.3 "UTR finalize"): ordinary least-squares slope of
/// `v` on `x = tag[2]`, scaled by `ndr_effective` and sign-flipped because
/// `x` decreases with time.
pub fn utr_finalize(acc: &PixelAccumulators, ndr_effective: u32, out: &mut [f32]) {
    let n = ndr_effective as f32;
    for i in FIRST_PIXEL_INDEX..out.len() {
        let count = acc.count[i];
        out[i] = if count > 1 {
            let cf = count as f32;
            let d = cf * acc.sum_xx[i] - acc.sum_x[i] * acc.sum_x[i];
            if d == 0.0 {
                // Degenerate fit (spec §7): every valid read landed at the
                // same x, so the slope is undefined. Sentinel, not NaN.
                -1.0
            } else {
                -n * (cf * acc.sum_xy[i] - acc.sum_x[i] * acc.sum_y[i]) / d
            }
        } else if count == 1 {
            // Known quirk (spec §9): not a slope estimate, the NDR index of
            // the sole valid read, scaled by N. Preserved bit-identically.
            n * acc.sum_x[i]
        } else {
            0.0
        };
    }
}
