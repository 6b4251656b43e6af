//! Wavetable oscillator.
//!
//! Reads band-limited tables from a shared [`WavetableSet`]; the band is
//! selected once per block from the effective (detuned) frequency, so a
//! sweep crosses bands at block boundaries rather than mid-buffer.

use alloc::sync::Arc;

use resona_core::{Lcg, semitones_to_ratio};

use crate::wavetable::{MAX_FREQUENCY, MIN_FREQUENCY, WavetableSet};

/// Oscillator waveform types.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveform {
    /// Pure fundamental tone.
    #[default]
    Sine,
    /// Odd harmonics at 1/k², soft timbre.
    Triangle,
    /// All harmonics at 1/k, bright timbre.
    Sawtooth,
    /// Variable-width pulse, derived from two saw reads.
    Square,
    /// White noise from the deterministic LCG.
    Noise,
    /// User-installed single-cycle table. Falls back to Sine when the
    /// shared bank has no custom waveform installed.
    Custom,
}

/// Audio-rate wavetable oscillator.
///
/// # Example
///
/// ```rust
/// use resona_synth::{Oscillator, Waveform, WavetableSet};
///
/// let tables = WavetableSet::shared(48000.0);
/// let mut osc = Oscillator::new(48000.0, tables);
/// osc.set_frequency(440.0);
/// osc.set_waveform(Waveform::Sawtooth);
///
/// let mut block = [0.0f32; 128];
/// osc.process(&mut block);
/// ```
#[derive(Debug, Clone)]
pub struct Oscillator {
    tables: Arc<WavetableSet>,
    waveform: Waveform,
    /// Current phase position [0.0, 1.0)
    phase: f32,
    sample_rate: f32,
    /// Base frequency in Hz, clamped to [20, 20000]
    frequency: f32,
    /// Persistent detune offset in semitones, clamped to [-12, +12].
    /// Applied as a ratio on the base frequency at read time — repeated
    /// calls never compound.
    detune_semitones: f32,
    /// Pulse width for Square, clamped to [0.01, 0.99]
    pulse_width: f32,
    /// Frequency floor override for control-rate use (LFO hosts)
    min_frequency: f32,
    noise: Lcg,
}

impl Oscillator {
    /// Create an oscillator at 440 Hz, sine, reading from `tables`.
    pub fn new(sample_rate: f32, tables: Arc<WavetableSet>) -> Self {
        Self {
            tables,
            waveform: Waveform::Sine,
            phase: 0.0,
            sample_rate,
            frequency: 440.0,
            detune_semitones: 0.0,
            pulse_width: 0.5,
            min_frequency: MIN_FREQUENCY,
            noise: Lcg::default(),
        }
    }

    /// Set waveform type.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Get current waveform.
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Set base frequency in Hz. Clamped to [20, 20000] for audio use.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.frequency = freq_hz.clamp(self.min_frequency, MAX_FREQUENCY);
    }

    /// Get base frequency in Hz (without detune).
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Effective frequency: base with the detune ratio applied, clamped
    /// back into the audible range.
    pub fn effective_frequency(&self) -> f32 {
        (self.frequency * semitones_to_ratio(self.detune_semitones))
            .clamp(self.min_frequency, MAX_FREQUENCY)
    }

    /// Set detune in semitones. Clamped to [-12, +12].
    pub fn set_detune(&mut self, semitones: f32) {
        self.detune_semitones = semitones.clamp(-12.0, 12.0);
    }

    /// Get detune in semitones.
    pub fn detune(&self) -> f32 {
        self.detune_semitones
    }

    /// Set pulse width for the Square waveform. Clamped to [0.01, 0.99].
    pub fn set_pulse_width(&mut self, width: f32) {
        self.pulse_width = width.clamp(0.01, 0.99);
    }

    /// Get pulse width.
    pub fn pulse_width(&self) -> f32 {
        self.pulse_width
    }

    /// Set sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Get sample rate.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Set phase directly (wrapped into [0, 1)).
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = resona_core::wrap_phase(phase);
    }

    /// Get current phase.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Reset phase to 0.
    pub fn reset_phase(&mut self) {
        self.phase = 0.0;
    }

    /// Seed the noise generator (Noise waveform only).
    pub fn seed_noise(&mut self, seed: u32) {
        self.noise.reseed(seed);
    }

    /// Remove the audible-range frequency floor.
    ///
    /// Control-rate hosts (LFOs) run well below 20 Hz; audio oscillators
    /// keep the [20, 20000] clamp.
    pub(crate) fn allow_subsonic(&mut self) {
        self.min_frequency = 0.0;
        self.frequency = self.frequency.max(0.0);
    }

    /// Generate one sample and advance the phase.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let freq = self.effective_frequency();
        let band = self.tables.band_for(freq);
        let out = self.sample_at(band, self.phase);
        self.advance_phase(freq / self.sample_rate);
        out
    }

    /// Fill a block. The band and phase increment are chosen once from
    /// the effective frequency at block start. An empty block is a no-op.
    pub fn process(&mut self, out: &mut [f32]) {
        if out.is_empty() {
            return;
        }

        let freq = self.effective_frequency();
        let band = self.tables.band_for(freq);
        let phase_inc = freq / self.sample_rate;

        // Split borrow: noise path needs &mut self.noise while the
        // table paths only read. Match once outside the loop.
        match self.waveform {
            Waveform::Noise => {
                for sample in out.iter_mut() {
                    *sample = self.noise.next_f32();
                }
                // Phase does not advance for noise
                return;
            }
            _ => {
                let mut phase = self.phase;
                for sample in out.iter_mut() {
                    *sample = self.read_table(band, phase);
                    phase += phase_inc;
                    if phase >= 1.0 {
                        phase -= 1.0;
                    }
                }
                self.phase = phase;
            }
        }
    }

    /// Advance the phase by `samples` without generating output.
    pub fn skip(&mut self, samples: usize) {
        let freq = self.effective_frequency();
        let phase_inc = freq / self.sample_rate;
        self.phase = resona_core::wrap_phase(self.phase + phase_inc * samples as f32);
    }

    #[inline]
    fn sample_at(&mut self, band: usize, phase: f32) -> f32 {
        if self.waveform == Waveform::Noise {
            self.noise.next_f32()
        } else {
            self.read_table(band, phase)
        }
    }

    #[inline]
    fn read_table(&self, band: usize, phase: f32) -> f32 {
        match self.waveform {
            Waveform::Sine => self.tables.sine(phase),
            Waveform::Triangle => self.tables.triangle(band, phase),
            Waveform::Sawtooth => self.tables.saw(band, phase),
            Waveform::Square => {
                // Band-limited PWM: difference of two saws offset by the
                // pulse width, plus a DC term to recenter. The additive
                // saw is a descending ramp, so the offset copy is the
                // minuend; this lands the plateaus at +1/-1 with the
                // positive span equal to the pulse width.
                let a = self.tables.saw(band, phase);
                let b = self.tables.saw(band, phase + self.pulse_width);
                b - a + (2.0 * self.pulse_width - 1.0)
            }
            Waveform::Custom => self
                .tables
                .custom(band, phase)
                .unwrap_or_else(|| self.tables.sine(phase)),
            Waveform::Noise => 0.0,
        }
    }

    #[inline]
    fn advance_phase(&mut self, phase_inc: f32) {
        if self.waveform == Waveform::Noise {
            return;
        }
        self.phase += phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
    }
}
