use cred_ramp_reduce::accum::{sds_iterate, utr_iterate, PixelAccumulators};
use cred_ramp_reduce::finalize::{sds_finalize, utr_finalize};
use cred_ramp_reduce::sample::RawSamples;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const W: usize = 640;
const H: usize = 512;
const N_PIXELS: usize = W * H;
const SAT: f32 = 16000.0;

fn frame(value: u16) -> Vec<u16> {
    let mut buf = vec![value; N_PIXELS];
    for tag in buf.iter_mut().take(8) {
        *tag = 0;
    }
    buf
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("sds_iterate_open", |b| {
        let buf = frame(1000);
        let mut acc = PixelAccumulators::new(N_PIXELS);
        b.iter(|| sds_iterate(black_box(&mut acc), RawSamples::U16(&buf), SAT, true));
    });

    c.bench_function("sds_iterate_accumulate", |b| {
        let buf = frame(1200);
        let mut acc = PixelAccumulators::new(N_PIXELS);
        sds_iterate(&mut acc, RawSamples::U16(&frame(1000)), SAT, true);
        b.iter(|| sds_iterate(black_box(&mut acc), RawSamples::U16(&buf), SAT, false));
    });

    c.bench_function("sds_finalize", |b| {
        let mut acc = PixelAccumulators::new(N_PIXELS);
        sds_iterate(&mut acc, RawSamples::U16(&frame(1000)), SAT, true);
        sds_iterate(&mut acc, RawSamples::U16(&frame(1200)), SAT, false);
        let mut out = vec![0.0f32; N_PIXELS];
        b.iter(|| sds_finalize(black_box(&acc), 2, false, &mut out));
    });

    c.bench_function("utr_iterate_accumulate", |b| {
        let buf = frame(1200);
        let mut acc = PixelAccumulators::new(N_PIXELS);
        utr_iterate(&mut acc, RawSamples::U16(&frame(1000)), 7.0, SAT, true);
        b.iter(|| utr_iterate(black_box(&mut acc), RawSamples::U16(&buf), 6.0, SAT, false));
    });

    c.bench_function("utr_finalize", |b| {
        let mut acc = PixelAccumulators::new(N_PIXELS);
        for t in 0..8u32 {
            utr_iterate(
                &mut acc,
                RawSamples::U16(&frame(1000 + t as u16 * 10)),
                (7 - t) as f32,
                SAT,
                t == 0,
            );
        }
        let mut out = vec![0.0f32; N_PIXELS];
        b.iter(|| utr_finalize(black_box(&acc), 8, &mut out));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
