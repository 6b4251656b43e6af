//! Criterion benchmarks for resona-core primitives
//!
//! Run with: cargo bench -p resona-core

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use resona_core::{BiquadFilter, FilterType, Lcg, SinTable};

const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];

fn bench_sin_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("SinTable");
    let table = SinTable::new();

    for &block_size in BLOCK_SIZES {
        group.bench_with_input(
            BenchmarkId::from_parameter(block_size),
            &block_size,
            |b, &size| {
                b.iter(|| {
                    let mut sum = 0.0f32;
                    let mut phase = 0.0f32;
                    for _ in 0..size {
                        sum += table.sin_turns(phase);
                        phase += 0.01;
                    }
                    black_box(sum)
                })
            },
        );
    }

    group.finish();
}

fn bench_biquad_types(c: &mut Criterion) {
    let mut group = c.benchmark_group("BiquadFilter");

    let types = [
        ("LowPass", FilterType::LowPass),
        ("HighPass", FilterType::HighPass),
        ("BandPass", FilterType::BandPass),
        ("Notch", FilterType::Notch),
        ("AllPass", FilterType::AllPass),
        ("Peaking", FilterType::Peaking),
        ("LowShelf", FilterType::LowShelf),
        ("HighShelf", FilterType::HighShelf),
    ];

    for (name, filter_type) in &types {
        let mut filter = BiquadFilter::new(48000.0);
        filter.set_type(*filter_type);
        filter.set_cutoff(1000.0);
        filter.set_gain_db(6.0);

        group.bench_function(*name, |b| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for i in 0..256 {
                    sum += filter.process((i as f32 * 0.01).sin());
                }
                black_box(sum)
            })
        });
    }

    group.finish();
}

fn bench_coefficient_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("CoefficientUpdate");

    // Per-block cutoff modulation recomputes coefficients constantly;
    // this measures that cost in isolation.
    group.bench_function("set_cutoff", |b| {
        let mut filter = BiquadFilter::new(48000.0);
        let mut cutoff = 200.0f32;
        b.iter(|| {
            cutoff = if cutoff > 10000.0 { 200.0 } else { cutoff * 1.01 };
            filter.set_cutoff(cutoff);
            black_box(filter.process(0.5))
        })
    });

    group.finish();
}

fn bench_lcg(c: &mut Criterion) {
    let mut group = c.benchmark_group("Lcg");
    let mut rng = Lcg::default();

    group.bench_function("next_f32_256", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for _ in 0..256 {
                sum += rng.next_f32();
            }
            black_box(sum)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_sin_table,
    bench_biquad_types,
    bench_coefficient_update,
    bench_lcg,
);

criterion_main!(benches);
