//! Single synthesis voice.
//!
//! Two wavetable oscillators blended by a mix control, one biquad
//! filter, three envelopes (amplitude, filter, pitch) and two LFOs,
//! wired together by a per-voice modulation route list.
//!
//! Modulation runs at block rate: sources are sampled at block start and
//! held, and every modulated parameter is recomputed from its stored
//! base value each block so repeated modulation never accumulates.
//! Audio (oscillators, filter, amplitude envelope) runs per sample.

use alloc::sync::Arc;
use core::f32::consts::FRAC_1_SQRT_2;

use resona_core::{BiquadFilter, FilterType, note_to_frequency, sanitize};

use crate::MAX_BLOCK_SIZE;
use crate::envelope::{Envelope, EnvelopeStage};
use crate::lfo::Lfo;
use crate::oscillator::{Oscillator, Waveform};
use crate::routing::{ModDestination, ModRouting, ModValues};
use crate::wavetable::{MAX_FREQUENCY, MIN_FREQUENCY, WavetableSet};

/// Pitch wheel range in semitones at full deflection.
pub const PITCH_BEND_RANGE: f32 = 2.0;

/// One polyphonic voice.
///
/// Voices are allocated once at startup and reused; [`note_on`]
/// retriggers everything without allocating.
///
/// [`note_on`]: Voice::note_on
#[derive(Debug, Clone)]
pub struct Voice {
    note: u8,
    velocity: f32,
    /// Allocation order stamp, set by the voice manager on note-on
    age: u64,
    sample_rate: f32,

    oscs: [Oscillator; 2],
    /// Blend between oscillator 0 and 1, [0, 1]
    osc_mix: f32,
    base_pulse_width: [f32; 2],

    filter: BiquadFilter,
    /// Unmodulated cutoff in Hz; the filter itself holds the modulated
    /// value and is rewritten each block
    base_cutoff: f32,
    base_resonance: f32,

    amp_env: Envelope,
    filter_env: Envelope,
    pitch_env: Envelope,
    lfos: [Lfo; 2],
    routing: ModRouting,

    // Global controllers, pushed down from the voice manager
    pitch_bend: f32,
    mod_wheel: f32,
    key_pressure: f32,

    scratch_a: [f32; MAX_BLOCK_SIZE],
    scratch_b: [f32; MAX_BLOCK_SIZE],
}

impl Voice {
    /// Create a silent voice reading from the shared wavetable bank.
    pub fn new(sample_rate: f32, tables: Arc<WavetableSet>) -> Self {
        let mut filter = BiquadFilter::new(sample_rate);
        filter.set_type(FilterType::LowPass);
        filter.set_cutoff(MAX_FREQUENCY);

        Self {
            note: 0,
            velocity: 0.0,
            age: 0,
            sample_rate,
            oscs: [
                Oscillator::new(sample_rate, tables.clone()),
                Oscillator::new(sample_rate, tables.clone()),
            ],
            osc_mix: 0.0,
            base_pulse_width: [0.5, 0.5],
            filter,
            base_cutoff: MAX_FREQUENCY,
            base_resonance: 0.707,
            amp_env: Envelope::new(sample_rate),
            filter_env: Envelope::new(sample_rate),
            pitch_env: Envelope::new(sample_rate),
            lfos: [
                Lfo::new(sample_rate, tables.clone()),
                Lfo::new(sample_rate, tables),
            ],
            routing: ModRouting::new(),
            pitch_bend: 0.0,
            mod_wheel: 0.0,
            key_pressure: 0.0,
            scratch_a: [0.0; MAX_BLOCK_SIZE],
            scratch_b: [0.0; MAX_BLOCK_SIZE],
        }
    }

    /// Start (or retrigger) a note. `velocity` in [0, 1] scales the
    /// amplitude envelope peak.
    pub fn note_on(&mut self, note: u8, velocity: f32) {
        self.note = note.min(127);
        self.velocity = velocity.clamp(0.0, 1.0);

        let freq = note_to_frequency(f32::from(self.note));
        for osc in &mut self.oscs {
            osc.set_frequency(freq);
        }

        self.amp_env.trigger(self.velocity);
        self.filter_env.trigger(1.0);
        self.pitch_env.trigger(1.0);
        for lfo in &mut self.lfos {
            lfo.trigger();
        }
    }

    /// Release the note (begin the release stage).
    pub fn note_off(&mut self) {
        self.amp_env.release();
        self.filter_env.release();
        self.pitch_env.release();
    }

    /// Fast-stop the voice for stealing (2 ms shutdown ramp).
    pub fn stop(&mut self) {
        self.amp_env.stop();
        self.filter_env.stop();
        self.pitch_env.stop();
    }

    /// Silence immediately and clear filter state.
    pub fn reset(&mut self) {
        self.amp_env.reset();
        self.filter_env.reset();
        self.pitch_env.reset();
        self.filter.reset();
        for osc in &mut self.oscs {
            osc.reset_phase();
        }
    }

    /// True while the amplitude envelope is producing output.
    pub fn is_active(&self) -> bool {
        self.amp_env.is_active()
    }

    /// True while the voice is ramping down (release or shutdown).
    pub fn is_releasing(&self) -> bool {
        matches!(
            self.amp_env.stage(),
            EnvelopeStage::Release | EnvelopeStage::Shutdown
        )
    }

    /// True while the shutdown ramp is running.
    pub fn is_stopping(&self) -> bool {
        self.amp_env.stage() == EnvelopeStage::Shutdown
    }

    /// Current output level, used to pick the quietest voice to steal.
    pub fn amplitude(&self) -> f32 {
        self.amp_env.level()
    }

    /// The note this voice is playing.
    pub fn note(&self) -> u8 {
        self.note
    }

    /// Note-on velocity.
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Allocation order stamp.
    pub fn age(&self) -> u64 {
        self.age
    }

    /// Stamp the allocation order (older = smaller).
    pub fn set_age(&mut self, age: u64) {
        self.age = age;
    }

    /// Set the waveform of oscillator `index` (0 or 1).
    pub fn set_waveform(&mut self, index: usize, waveform: Waveform) {
        if let Some(osc) = self.oscs.get_mut(index) {
            osc.set_waveform(waveform);
        }
    }

    /// Set the detune of oscillator `index` in semitones.
    pub fn set_detune(&mut self, index: usize, semitones: f32) {
        if let Some(osc) = self.oscs.get_mut(index) {
            osc.set_detune(semitones);
        }
    }

    /// Set the base pulse width of oscillator `index`.
    pub fn set_pulse_width(&mut self, index: usize, width: f32) {
        if let Some(osc) = self.oscs.get_mut(index) {
            osc.set_pulse_width(width);
            self.base_pulse_width[index] = osc.pulse_width();
        }
    }

    /// Set the oscillator blend (0 = all osc 0, 1 = all osc 1).
    pub fn set_osc_mix(&mut self, mix: f32) {
        self.osc_mix = mix.clamp(0.0, 1.0);
    }

    /// Set the filter type.
    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.filter.set_type(filter_type);
    }

    /// Set the unmodulated filter cutoff in Hz.
    pub fn set_filter_cutoff(&mut self, cutoff: f32) {
        self.base_cutoff = cutoff.clamp(MIN_FREQUENCY, MAX_FREQUENCY);
        self.filter.set_cutoff(self.base_cutoff);
    }

    /// Set the unmodulated filter resonance.
    pub fn set_filter_resonance(&mut self, q: f32) {
        self.filter.set_resonance(q);
        self.base_resonance = self.filter.resonance();
    }

    /// Set the filter gain in dB (shelf and peaking types).
    pub fn set_filter_gain_db(&mut self, gain_db: f32) {
        self.filter.set_gain_db(gain_db);
    }

    /// Amplitude envelope.
    pub fn amp_env_mut(&mut self) -> &mut Envelope {
        &mut self.amp_env
    }

    /// Filter envelope (modulation source `Envelope(1)`).
    pub fn filter_env_mut(&mut self) -> &mut Envelope {
        &mut self.filter_env
    }

    /// Pitch envelope (modulation source `Envelope(2)`).
    pub fn pitch_env_mut(&mut self) -> &mut Envelope {
        &mut self.pitch_env
    }

    /// LFO `index` (0 or 1).
    pub fn lfo_mut(&mut self, index: usize) -> Option<&mut Lfo> {
        self.lfos.get_mut(index)
    }

    /// Modulation route list.
    pub fn routing_mut(&mut self) -> &mut ModRouting {
        &mut self.routing
    }

    /// Read-only view of the route list.
    pub fn routing(&self) -> &ModRouting {
        &self.routing
    }

    /// Pitch wheel position in [-1, 1].
    pub fn set_pitch_bend(&mut self, bend: f32) {
        self.pitch_bend = bend.clamp(-1.0, 1.0);
    }

    /// Mod wheel (CC 1) in [0, 1].
    pub fn set_mod_wheel(&mut self, value: f32) {
        self.mod_wheel = value.clamp(0.0, 1.0);
    }

    /// Aftertouch pressure in [0, 1].
    pub fn set_key_pressure(&mut self, pressure: f32) {
        self.key_pressure = pressure.clamp(0.0, 1.0);
    }

    /// Current aftertouch pressure.
    pub fn key_pressure(&self) -> f32 {
        self.key_pressure
    }

    /// Host tempo for tempo-synced LFOs.
    pub fn set_tempo(&mut self, bpm: f32) {
        for lfo in &mut self.lfos {
            lfo.set_tempo(bpm);
        }
    }

    /// Set sample rate on every component.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        for osc in &mut self.oscs {
            osc.set_sample_rate(sample_rate);
        }
        self.filter.set_sample_rate(sample_rate);
        self.amp_env.set_sample_rate(sample_rate);
        self.filter_env.set_sample_rate(sample_rate);
        self.pitch_env.set_sample_rate(sample_rate);
        for lfo in &mut self.lfos {
            lfo.set_sample_rate(sample_rate);
        }
    }

    /// Render one block, mixing into `left` and `right` at constant-power
    /// center pan. Inactive voices return without touching the buffers.
    ///
    /// Blocks longer than [`MAX_BLOCK_SIZE`] are processed in
    /// `MAX_BLOCK_SIZE` chunks.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        let mut offset = 0;
        while offset < frames {
            if !self.is_active() {
                return;
            }
            let chunk = (frames - offset).min(MAX_BLOCK_SIZE);
            self.render_chunk(offset, chunk, left, right);
            offset += chunk;
        }
    }

    fn render_chunk(&mut self, offset: usize, frames: usize, left: &mut [f32], right: &mut [f32]) {
        // Snapshot the sources. LFO values are from the previous block
        // here so LfoRate routes can be applied before this block's tick.
        let mut values = ModValues {
            lfo: [self.lfos[0].value(), self.lfos[1].value()],
            envelope: [
                self.amp_env.level(),
                self.filter_env.level(),
                self.pitch_env.level(),
            ],
            velocity: self.velocity,
            key_pressure: self.key_pressure,
            pitch_bend: self.pitch_bend,
            mod_wheel: self.mod_wheel,
        };

        for (i, lfo) in self.lfos.iter_mut().enumerate() {
            lfo.set_rate_offset(
                self.routing
                    .sum_for(ModDestination::LfoRate(i as u8), &values),
            );
            values.lfo[i] = lfo.tick(frames);
        }

        // Pitch is recomputed from the note number each block, so bend,
        // routes, and detune never compound across blocks.
        let bend_semis = self.pitch_bend * PITCH_BEND_RANGE;
        for (i, osc) in self.oscs.iter_mut().enumerate() {
            let semis = bend_semis
                + self
                    .routing
                    .sum_for(ModDestination::OscPitch(i as u8), &values);
            osc.set_frequency(note_to_frequency(f32::from(self.note) + semis));

            let pw = self.base_pulse_width[i]
                + self
                    .routing
                    .sum_for(ModDestination::OscPulseWidth(i as u8), &values);
            osc.set_pulse_width(pw);
        }

        let cutoff = (self.base_cutoff
            + self.routing.sum_for(ModDestination::FilterCutoff, &values))
        .clamp(MIN_FREQUENCY, MAX_FREQUENCY);
        self.filter.set_cutoff(cutoff);
        self.filter.set_resonance(
            self.base_resonance
                + self
                    .routing
                    .sum_for(ModDestination::FilterResonance, &values),
        );

        let mix = (self.osc_mix + self.routing.sum_for(ModDestination::OscMix, &values))
            .clamp(0.0, 1.0);
        let gain = (1.0 + self.routing.sum_for(ModDestination::Amplitude, &values))
            .clamp(0.0, 2.0);

        self.oscs[0].process(&mut self.scratch_a[..frames]);
        self.oscs[1].process(&mut self.scratch_b[..frames]);

        for i in 0..frames {
            let blended = self.scratch_a[i] * (1.0 - mix) + self.scratch_b[i] * mix;
            let filtered = self.filter.process(blended);
            let sample = sanitize(filtered * self.amp_env.advance() * gain);
            left[offset + i] += sample * FRAC_1_SQRT_2;
            right[offset + i] += sample * FRAC_1_SQRT_2;
        }

        // Control-rate envelopes advance once per block
        self.filter_env.advance_block(frames);
        self.pitch_env.advance_block(frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::ModSource;

    fn make_voice() -> Voice {
        Voice::new(48000.0, WavetableSet::shared(48000.0))
    }

    fn render_blocks(voice: &mut Voice, blocks: usize) -> (f32, f32) {
        let mut peak = 0.0f32;
        let mut last = 0.0f32;
        for _ in 0..blocks {
            let mut l = [0.0f32; 128];
            let mut r = [0.0f32; 128];
            voice.render(&mut l, &mut r);
            for &s in &l {
                peak = peak.max(s.abs());
                last = s;
            }
        }
        (peak, last)
    }

    #[test]
    fn test_inactive_voice_is_silent() {
        let mut voice = make_voice();
        let mut l = [0.0f32; 128];
        let mut r = [0.0f32; 128];
        voice.render(&mut l, &mut r);
        assert!(l.iter().all(|&s| s == 0.0));
        assert!(r.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_note_on_produces_sound() {
        let mut voice = make_voice();
        voice.note_on(69, 1.0);
        let (peak, _) = render_blocks(&mut voice, 20);
        assert!(peak > 0.1, "peak: {}", peak);
    }

    #[test]
    fn test_velocity_scales_output() {
        let mut loud = make_voice();
        let mut quiet = make_voice();
        loud.note_on(69, 1.0);
        quiet.note_on(69, 0.25);

        let (loud_peak, _) = render_blocks(&mut loud, 40);
        let (quiet_peak, _) = render_blocks(&mut quiet, 40);
        assert!(
            quiet_peak < loud_peak * 0.5,
            "quiet {} vs loud {}",
            quiet_peak,
            loud_peak
        );
    }

    #[test]
    fn test_note_off_fades_to_silence() {
        let mut voice = make_voice();
        voice.amp_env_mut().set_release_ms(5.0);
        voice.note_on(60, 1.0);
        render_blocks(&mut voice, 20);

        voice.note_off();
        assert!(voice.is_releasing());

        // 5 ms release at 48 kHz fits easily in 10 blocks of 128
        render_blocks(&mut voice, 10);
        assert!(!voice.is_active());

        let mut l = [0.0f32; 128];
        let mut r = [0.0f32; 128];
        voice.render(&mut l, &mut r);
        assert!(l.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_stop_is_faster_than_release() {
        let mut voice = make_voice();
        voice.amp_env_mut().set_release_ms(1000.0);
        voice.note_on(60, 1.0);
        render_blocks(&mut voice, 20);

        voice.stop();
        assert!(voice.is_stopping());

        // 2 ms shutdown = 96 samples at 48 kHz, one 128-sample block
        let mut l = [0.0f32; 128];
        let mut r = [0.0f32; 128];
        voice.render(&mut l, &mut r);
        assert!(!voice.is_active());
    }

    #[test]
    fn test_stereo_channels_match_at_center_pan() {
        let mut voice = make_voice();
        voice.note_on(64, 0.8);
        let mut l = [0.0f32; 256];
        let mut r = [0.0f32; 256];
        voice.render(&mut l, &mut r);
        for (a, b) in l.iter().zip(r.iter()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_render_accumulates_into_buffer() {
        let mut voice = make_voice();
        voice.note_on(69, 1.0);
        let mut l = [1.0f32; 64];
        let mut r = [1.0f32; 64];
        let mut l2 = [0.0f32; 64];
        let mut r2 = [0.0f32; 64];

        let mut voice2 = make_voice();
        voice2.note_on(69, 1.0);
        voice2.render(&mut l2, &mut r2);
        voice.render(&mut l, &mut r);

        for (mixed, solo) in l.iter().zip(l2.iter()) {
            assert!((mixed - 1.0 - solo).abs() < 1e-6);
        }
    }

    #[test]
    fn test_pitch_bend_raises_pitch() {
        let mut bent = make_voice();
        let mut straight = make_voice();
        for v in [&mut bent, &mut straight] {
            v.note_on(69, 1.0);
            v.amp_env_mut().set_attack_ms(0.1);
        }
        bent.set_pitch_bend(1.0);

        let count = |voice: &mut Voice| {
            let mut crossings = 0;
            let mut prev = 0.0f32;
            for _ in 0..375 {
                let mut l = [0.0f32; 128];
                let mut r = [0.0f32; 128];
                voice.render(&mut l, &mut r);
                for &s in &l {
                    if prev <= 0.0 && s > 0.0 {
                        crossings += 1;
                    }
                    prev = s;
                }
            }
            crossings
        };

        let straight_crossings = count(&mut straight);
        let bent_crossings = count(&mut bent);
        // +2 semitones ≈ ratio 1.122
        let ratio = bent_crossings as f32 / straight_crossings as f32;
        assert!((ratio - 1.122).abs() < 0.03, "ratio: {}", ratio);
    }

    #[test]
    fn test_filter_env_route_opens_cutoff() {
        let mut voice = make_voice();
        voice.set_filter_cutoff(200.0);
        voice
            .routing_mut()
            .add(
                ModSource::Envelope(1),
                ModDestination::FilterCutoff,
                8000.0,
            )
            .unwrap();
        voice.filter_env_mut().set_attack_ms(1.0);
        voice.note_on(60, 1.0);

        let mut l = [0.0f32; 128];
        let mut r = [0.0f32; 128];
        voice.render(&mut l, &mut r);
        // After the first block the filter env is near peak, so the
        // modulated cutoff should be far above the 200 Hz base.
        voice.render(&mut l, &mut r);
        assert!(voice.filter.cutoff() > 4000.0, "cutoff: {}", voice.filter.cutoff());
    }

    #[test]
    fn test_modulated_cutoff_does_not_drift_without_sources() {
        let mut voice = make_voice();
        voice.set_filter_cutoff(1000.0);
        voice.note_on(60, 1.0);

        for _ in 0..50 {
            let mut l = [0.0f32; 128];
            let mut r = [0.0f32; 128];
            voice.render(&mut l, &mut r);
        }
        assert!((voice.filter.cutoff() - 1000.0).abs() < 1e-3);
    }

    #[test]
    fn test_lfo_pitch_route_varies_frequency() {
        let mut voice = make_voice();
        if let Some(lfo) = voice.lfo_mut(0) {
            lfo.set_rate_hz(5.0);
        }
        voice
            .routing_mut()
            .add(ModSource::Lfo(0), ModDestination::OscPitch(0), 2.0)
            .unwrap();
        voice.note_on(69, 1.0);

        let mut freqs = [0.0f32; 8];
        for freq in &mut freqs {
            let mut l = [0.0f32; 512];
            let mut r = [0.0f32; 512];
            voice.render(&mut l, &mut r);
            *freq = voice.oscs[0].frequency();
        }
        let min = freqs.iter().copied().fold(f32::INFINITY, f32::min);
        let max = freqs.iter().copied().fold(0.0f32, f32::max);
        assert!(max - min > 1.0, "vibrato range: {} .. {}", min, max);
    }

    #[test]
    fn test_output_is_finite_and_bounded() {
        let mut voice = make_voice();
        voice.set_waveform(0, Waveform::Square);
        voice.set_waveform(1, Waveform::Sawtooth);
        voice.set_osc_mix(0.5);
        voice.set_filter_resonance(20.0);
        voice.set_filter_cutoff(500.0);
        voice.note_on(40, 1.0);

        for _ in 0..200 {
            let mut l = [0.0f32; 128];
            let mut r = [0.0f32; 128];
            voice.render(&mut l, &mut r);
            for &s in &l {
                assert!(s.is_finite());
                assert!(s.abs() < 10.0, "unbounded output: {}", s);
            }
        }
    }

    #[test]
    fn test_retrigger_reuses_voice() {
        let mut voice = make_voice();
        voice.note_on(60, 1.0);
        render_blocks(&mut voice, 10);
        let level = voice.amplitude();
        assert!(level > 0.0);

        voice.note_on(64, 0.9);
        assert_eq!(voice.note(), 64);
        assert!(voice.is_active());
        // Level carried over, no reset to zero
        assert!(voice.amplitude() > 0.0);
    }

    #[test]
    fn test_mix_blends_oscillators() {
        let mut voice = make_voice();
        voice.set_waveform(0, Waveform::Sine);
        voice.set_waveform(1, Waveform::Sine);
        voice.set_detune(1, 12.0);
        voice.set_osc_mix(1.0);
        voice.amp_env_mut().set_attack_ms(0.1);
        voice.note_on(69, 1.0);

        // Mix fully on osc 1, detuned an octave up: expect ~880 Hz
        let mut crossings = 0;
        let mut prev = 0.0f32;
        for _ in 0..375 {
            let mut l = [0.0f32; 128];
            let mut r = [0.0f32; 128];
            voice.render(&mut l, &mut r);
            for &s in &l {
                if prev <= 0.0 && s > 0.0 {
                    crossings += 1;
                }
                prev = s;
            }
        }
        assert!((crossings as i32 - 880).abs() <= 10, "crossings: {}", crossings);
    }
}
