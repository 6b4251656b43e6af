//! Criterion benchmarks for the voice engine
//!
//! Run with: cargo bench -p resona-synth

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use resona_synth::{
    Envelope, Oscillator, SynthEvent, Voice, Waveform, WavetableSet, engine,
};

const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];

fn bench_oscillator_waveforms(c: &mut Criterion) {
    let mut group = c.benchmark_group("Oscillator");
    let tables = WavetableSet::shared(48000.0);

    let waveforms = [
        ("Sine", Waveform::Sine),
        ("Triangle", Waveform::Triangle),
        ("Sawtooth", Waveform::Sawtooth),
        ("Square", Waveform::Square),
        ("Noise", Waveform::Noise),
    ];

    for (name, waveform) in &waveforms {
        let mut osc = Oscillator::new(48000.0, tables.clone());
        osc.set_waveform(*waveform);
        osc.set_frequency(440.0);

        group.bench_function(*name, |b| {
            let mut block = [0.0f32; 256];
            b.iter(|| {
                osc.process(&mut block);
                black_box(block[0])
            })
        });
    }

    group.finish();
}

fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("Envelope");

    group.bench_function("advance_256", |b| {
        let mut env = Envelope::new(48000.0);
        env.trigger(1.0);
        b.iter(|| {
            let mut sum = 0.0f32;
            for _ in 0..256 {
                sum += env.advance();
            }
            // Keep the envelope out of the idle fast path
            if !env.is_active() {
                env.trigger(1.0);
            }
            black_box(sum)
        })
    });

    group.bench_function("advance_block_256", |b| {
        let mut env = Envelope::new(48000.0);
        env.trigger(1.0);
        b.iter(|| {
            if !env.is_active() {
                env.trigger(1.0);
            }
            black_box(env.advance_block(256))
        })
    });

    group.finish();
}

fn bench_single_voice(c: &mut Criterion) {
    let mut group = c.benchmark_group("Voice");

    for &block_size in BLOCK_SIZES {
        let mut voice = Voice::new(48000.0, WavetableSet::shared(48000.0));
        voice.set_waveform(1, Waveform::Sawtooth);
        voice.set_osc_mix(0.5);
        voice.note_on(60, 1.0);

        let mut left = vec![0.0f32; block_size];
        let mut right = vec![0.0f32; block_size];

        group.bench_with_input(
            BenchmarkId::from_parameter(block_size),
            &block_size,
            |b, _| {
                b.iter(|| {
                    left.fill(0.0);
                    right.fill(0.0);
                    voice.render(&mut left, &mut right);
                    black_box(left[0])
                })
            },
        );
    }

    group.finish();
}

fn bench_engine_polyphony(c: &mut Criterion) {
    let mut group = c.benchmark_group("SynthEngine");

    for &voices in &[4usize, 8, 16, 32] {
        let (mut handle, mut synth) = engine(48000.0, voices, 256);
        for i in 0..voices {
            handle.send(SynthEvent::NoteOn {
                note: 36 + (i as u8 * 3) % 60,
                velocity: 100,
            });
        }
        // Consume the note-ons before measuring
        let mut left = [0.0f32; 256];
        let mut right = [0.0f32; 256];
        synth.process(&mut left, &mut right);

        group.bench_with_input(
            BenchmarkId::new("voices", voices),
            &voices,
            |b, _| {
                b.iter(|| {
                    synth.process(&mut left, &mut right);
                    black_box(left[0])
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_oscillator_waveforms,
    bench_envelope,
    bench_single_voice,
    bench_engine_polyphony,
);

criterion_main!(benches);
