//! Band-limited wavetable bank.
//!
//! Oscillators read from precomputed tables instead of evaluating
//! waveforms analytically. Each harmonically-rich waveform gets one table
//! per frequency band; higher bands carry fewer harmonics so playback
//! never places a partial above Nyquist. Construction is additive
//! (harmonics summed per band) and happens once at engine setup — never
//! on the audio thread.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use libm::{floorf, powf, sinf};
use resona_core::{lerp, wrap_phase};

/// Samples per table. One guard entry is appended so interpolated reads
/// never wrap mid-lookup.
pub const TABLE_SIZE: usize = 2048;

/// Number of frequency bands per band-limited waveform.
pub const BAND_COUNT: usize = 8;

/// Lowest fundamental the bank is built for, in Hz.
pub const MIN_FREQUENCY: f32 = 20.0;

/// Highest fundamental the bank is built for, in Hz.
pub const MAX_FREQUENCY: f32 = 20000.0;

/// Errors from wavetable construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavetableError {
    /// A custom waveform was supplied with no samples.
    EmptyTable,
}

impl core::fmt::Display for WavetableError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            WavetableError::EmptyTable => write!(f, "custom wavetable has no samples"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for WavetableError {}

/// One waveform's band-limited tables, one per frequency band.
#[derive(Debug, Clone)]
pub struct Wavetable {
    /// `BAND_COUNT` tables of `TABLE_SIZE + 1` samples each.
    bands: Vec<Vec<f32>>,
}

impl Wavetable {
    /// Interpolated read from one band. Phase in [0, 1).
    #[inline]
    pub fn lookup(&self, band: usize, phase: f32) -> f32 {
        let table = &self.bands[band.min(BAND_COUNT - 1)];
        let pos = wrap_phase(phase) * TABLE_SIZE as f32;
        let idx = pos as usize;
        let frac = pos - idx as f32;
        lerp(table[idx], table[idx + 1], frac)
    }

    /// Build by summing `harmonics(k) -> amplitude` up to each band's
    /// harmonic limit, then normalizing each band to unit peak.
    fn additive<F>(band_harmonics: &[usize; BAND_COUNT], amplitude: F) -> Self
    where
        F: Fn(usize) -> f32,
    {
        let mut bands = Vec::with_capacity(BAND_COUNT);
        for &max_harmonic in band_harmonics {
            let mut table = vec![0.0f32; TABLE_SIZE + 1];
            for k in 1..=max_harmonic {
                let amp = amplitude(k);
                if amp == 0.0 {
                    continue;
                }
                for (i, sample) in table.iter_mut().enumerate().take(TABLE_SIZE) {
                    let phase = i as f32 / TABLE_SIZE as f32;
                    *sample += amp * sinf(2.0 * core::f32::consts::PI * k as f32 * phase);
                }
            }
            normalize(&mut table);
            table[TABLE_SIZE] = table[0];
            bands.push(table);
        }
        Self { bands }
    }

    /// Build from an arbitrary single-cycle table: resample to
    /// `TABLE_SIZE`, extract harmonic amplitudes by DFT, then rebuild
    /// band-limited versions.
    fn from_samples(
        samples: &[f32],
        band_harmonics: &[usize; BAND_COUNT],
    ) -> Result<Self, WavetableError> {
        if samples.is_empty() {
            return Err(WavetableError::EmptyTable);
        }

        // Resample the user table to TABLE_SIZE by linear interpolation.
        let mut cycle = [0.0f32; TABLE_SIZE];
        for (i, sample) in cycle.iter_mut().enumerate() {
            let pos = i as f32 / TABLE_SIZE as f32 * samples.len() as f32;
            let idx = pos as usize;
            let frac = pos - idx as f32;
            let a = samples[idx % samples.len()];
            let b = samples[(idx + 1) % samples.len()];
            *sample = lerp(a, b, frac);
        }

        // Harmonic analysis up to the largest band limit.
        let max_needed = band_harmonics[0].min(TABLE_SIZE / 2 - 1);
        let mut cos_amps = vec![0.0f32; max_needed + 1];
        let mut sin_amps = vec![0.0f32; max_needed + 1];
        for k in 1..=max_needed {
            let mut re = 0.0f32;
            let mut im = 0.0f32;
            for (i, &sample) in cycle.iter().enumerate() {
                let angle = 2.0 * core::f32::consts::PI * k as f32 * i as f32 / TABLE_SIZE as f32;
                re += sample * sinf(angle + core::f32::consts::FRAC_PI_2); // cos
                im += sample * sinf(angle);
            }
            cos_amps[k] = re * 2.0 / TABLE_SIZE as f32;
            sin_amps[k] = im * 2.0 / TABLE_SIZE as f32;
        }

        // Rebuild each band from the analyzed partials.
        let mut bands = Vec::with_capacity(BAND_COUNT);
        for &max_harmonic in band_harmonics {
            let limit = max_harmonic.min(max_needed);
            let mut table = vec![0.0f32; TABLE_SIZE + 1];
            for k in 1..=limit {
                for (i, sample) in table.iter_mut().enumerate().take(TABLE_SIZE) {
                    let angle =
                        2.0 * core::f32::consts::PI * k as f32 * i as f32 / TABLE_SIZE as f32;
                    *sample += cos_amps[k] * sinf(angle + core::f32::consts::FRAC_PI_2)
                        + sin_amps[k] * sinf(angle);
                }
            }
            normalize(&mut table);
            table[TABLE_SIZE] = table[0];
            bands.push(table);
        }

        Ok(Self { bands })
    }
}

fn normalize(table: &mut [f32]) {
    let peak = table.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak > 0.0 {
        let scale = 1.0 / peak;
        for s in table.iter_mut() {
            *s *= scale;
        }
    }
}

/// Immutable bank of all band-limited waveforms for one sample rate.
///
/// Built once at engine construction and shared read-only across voices
/// via [`Arc`]. Square/pulse waves are not stored: the oscillator derives
/// them at runtime as the difference of two saw reads, which keeps pulse
/// width continuously variable without a table per width.
#[derive(Debug, Clone)]
pub struct WavetableSet {
    sine: Vec<f32>,
    saw: Wavetable,
    triangle: Wavetable,
    custom: Option<Wavetable>,
    /// Upper fundamental limit of each band, ascending.
    band_limits: [f32; BAND_COUNT],
}

impl WavetableSet {
    /// Build the bank for the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        let band_limits = band_limits();
        let harmonics = band_harmonics(&band_limits, sample_rate);

        let mut sine = vec![0.0f32; TABLE_SIZE + 1];
        for (i, sample) in sine.iter_mut().enumerate().take(TABLE_SIZE) {
            *sample = sinf(2.0 * core::f32::consts::PI * i as f32 / TABLE_SIZE as f32);
        }
        sine[TABLE_SIZE] = sine[0];

        // Saw: all harmonics at 1/k
        let saw = Wavetable::additive(&harmonics, |k| 1.0 / k as f32);

        // Triangle: odd harmonics at 1/k² with alternating sign
        let triangle = Wavetable::additive(&harmonics, |k| {
            if k % 2 == 0 {
                0.0
            } else {
                let sign = if (k / 2) % 2 == 0 { 1.0 } else { -1.0 };
                sign / (k * k) as f32
            }
        });

        Self {
            sine,
            saw,
            triangle,
            custom: None,
            band_limits,
        }
    }

    /// Build the bank with a user-supplied single-cycle waveform
    /// installed as the Custom source.
    pub fn with_custom(sample_rate: f32, samples: &[f32]) -> Result<Self, WavetableError> {
        let mut set = Self::new(sample_rate);
        let harmonics = band_harmonics(&set.band_limits, sample_rate);
        set.custom = Some(Wavetable::from_samples(samples, &harmonics)?);
        Ok(set)
    }

    /// Build and wrap in an [`Arc`] for sharing across voices.
    pub fn shared(sample_rate: f32) -> Arc<Self> {
        Arc::new(Self::new(sample_rate))
    }

    /// Whether a custom waveform is installed.
    pub fn has_custom(&self) -> bool {
        self.custom.is_some()
    }

    /// Select the band for a fundamental frequency.
    ///
    /// Returns the lowest band whose limit contains `freq`; frequencies
    /// past the top limit use the final (sparsest) band.
    #[inline]
    pub fn band_for(&self, freq: f32) -> usize {
        for (band, &limit) in self.band_limits.iter().enumerate() {
            if freq <= limit {
                return band;
            }
        }
        BAND_COUNT - 1
    }

    /// Interpolated sine read. Sine has a single harmonic, so no banding.
    #[inline]
    pub fn sine(&self, phase: f32) -> f32 {
        let pos = wrap_phase(phase) * TABLE_SIZE as f32;
        let idx = pos as usize;
        let frac = pos - idx as f32;
        lerp(self.sine[idx], self.sine[idx + 1], frac)
    }

    /// Band-limited saw read.
    #[inline]
    pub fn saw(&self, band: usize, phase: f32) -> f32 {
        self.saw.lookup(band, phase)
    }

    /// Band-limited triangle read.
    #[inline]
    pub fn triangle(&self, band: usize, phase: f32) -> f32 {
        self.triangle.lookup(band, phase)
    }

    /// Band-limited custom read. Returns `None` when no custom waveform
    /// is installed.
    #[inline]
    pub fn custom(&self, band: usize, phase: f32) -> Option<f32> {
        self.custom.as_ref().map(|wt| wt.lookup(band, phase))
    }
}

/// Geometric band boundaries spanning [`MIN_FREQUENCY`, `MAX_FREQUENCY`].
fn band_limits() -> [f32; BAND_COUNT] {
    let ratio = powf(MAX_FREQUENCY / MIN_FREQUENCY, 1.0 / BAND_COUNT as f32);
    let mut limits = [0.0f32; BAND_COUNT];
    let mut limit = MIN_FREQUENCY;
    for entry in &mut limits {
        limit *= ratio;
        *entry = limit;
    }
    limits
}

/// Highest harmonic per band such that `limit * harmonic` stays below
/// Nyquist. Capped by table resolution.
fn band_harmonics(limits: &[f32; BAND_COUNT], sample_rate: f32) -> [usize; BAND_COUNT] {
    let nyquist = sample_rate * 0.5;
    let mut harmonics = [1usize; BAND_COUNT];
    for (entry, &limit) in harmonics.iter_mut().zip(limits.iter()) {
        let count = floorf(nyquist / limit) as usize;
        *entry = count.clamp(1, TABLE_SIZE / 2 - 1);
    }
    harmonics
}
