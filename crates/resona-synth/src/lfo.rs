//! Low-frequency oscillator for control-rate modulation.
//!
//! Wraps an [`Oscillator`] with the audible-range floor removed, sampled
//! once per block. Rate comes either from a free-running Hz value, from
//! the host tempo via a note division, or free-running with a phase
//! reset on every note (key sync).

use alloc::sync::Arc;

use resona_core::NoteDivision;

use crate::oscillator::{Oscillator, Waveform};
use crate::wavetable::WavetableSet;

/// Maximum free-running LFO rate in Hz.
pub const MAX_LFO_RATE: f32 = 50.0;

/// LFO rate and retrigger behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum LfoMode {
    /// Free-running at a rate in Hz; phase is never reset by notes.
    #[default]
    Free,
    /// Rate derived from the host tempo and a note division.
    TempoSync(NoteDivision),
    /// Free-running rate, but phase resets to zero on every note-on.
    KeySync,
}

/// Control-rate modulation oscillator.
///
/// Output is sampled once per block via [`tick`](Lfo::tick) and held for
/// the block, in [-depth, +depth].
#[derive(Debug, Clone)]
pub struct Lfo {
    osc: Oscillator,
    mode: LfoMode,
    /// Free-running rate in Hz, kept separately so switching out of
    /// TempoSync restores it
    rate_hz: f32,
    /// Output scale [0, 1]
    depth: f32,
    invert: bool,
    /// Reset phase on trigger even in Free mode
    retrigger: bool,
    bpm: f32,
    /// Additive rate offset in Hz from modulation, re-applied each tick
    rate_offset: f32,
    /// Last value produced by `tick`
    value: f32,
}

impl Lfo {
    /// Create an LFO at 1 Hz, sine, full depth.
    pub fn new(sample_rate: f32, tables: Arc<WavetableSet>) -> Self {
        let mut osc = Oscillator::new(sample_rate, tables);
        osc.allow_subsonic();
        osc.set_frequency(1.0);
        Self {
            osc,
            mode: LfoMode::Free,
            rate_hz: 1.0,
            depth: 1.0,
            invert: false,
            retrigger: false,
            bpm: 120.0,
            rate_offset: 0.0,
            value: 0.0,
        }
    }

    /// Set the rate/retrigger mode.
    pub fn set_mode(&mut self, mode: LfoMode) {
        self.mode = mode;
        self.apply_rate();
    }

    /// Get the current mode.
    pub fn mode(&self) -> LfoMode {
        self.mode
    }

    /// Set the free-running rate in Hz (clamped to [0, 50]). Ignored
    /// while tempo-synced, but remembered for when sync is turned off.
    pub fn set_rate_hz(&mut self, hz: f32) {
        self.rate_hz = hz.clamp(0.0, MAX_LFO_RATE);
        self.apply_rate();
    }

    /// Get the free-running rate in Hz.
    pub fn rate_hz(&self) -> f32 {
        self.rate_hz
    }

    /// Effective rate in Hz after tempo sync is applied.
    pub fn effective_rate_hz(&self) -> f32 {
        match self.mode {
            LfoMode::TempoSync(division) => division.to_hz(self.bpm),
            LfoMode::Free | LfoMode::KeySync => self.rate_hz,
        }
    }

    /// Set modulation depth (clamped to [0, 1]).
    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth.clamp(0.0, 1.0);
    }

    /// Get modulation depth.
    pub fn depth(&self) -> f32 {
        self.depth
    }

    /// Invert the output polarity.
    pub fn set_invert(&mut self, invert: bool) {
        self.invert = invert;
    }

    /// Reset phase on every note-on even in Free mode.
    pub fn set_retrigger(&mut self, retrigger: bool) {
        self.retrigger = retrigger;
    }

    /// Set the LFO waveform.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.osc.set_waveform(waveform);
    }

    /// Update the host tempo. Re-derives the rate when tempo-synced.
    pub fn set_tempo(&mut self, bpm: f32) {
        self.bpm = bpm.max(1.0);
        self.apply_rate();
    }

    /// Set sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.osc.set_sample_rate(sample_rate);
    }

    /// Note-on. Resets phase in KeySync mode or when retrigger is set.
    pub fn trigger(&mut self) {
        if self.retrigger || self.mode == LfoMode::KeySync {
            self.osc.reset_phase();
        }
    }

    /// Current phase of the underlying oscillator.
    pub fn phase(&self) -> f32 {
        self.osc.phase()
    }

    /// Additive rate offset in Hz, applied on top of the configured or
    /// tempo-derived rate. Set from modulation each block; replaces the
    /// previous offset rather than accumulating.
    pub fn set_rate_offset(&mut self, hz: f32) {
        self.rate_offset = hz;
    }

    /// Sample the LFO at the start of a block and advance it by `frames`.
    ///
    /// Returns the held value in [-depth, +depth].
    pub fn tick(&mut self, frames: usize) -> f32 {
        self.osc
            .set_frequency((self.effective_rate_hz() + self.rate_offset).clamp(0.0, MAX_LFO_RATE));
        let raw = self.osc.next();
        if frames > 1 {
            self.osc.skip(frames - 1);
        }
        let sign = if self.invert { -1.0 } else { 1.0 };
        self.value = raw * self.depth * sign;
        self.value
    }

    /// Last value produced by [`tick`](Lfo::tick).
    pub fn value(&self) -> f32 {
        self.value
    }

    fn apply_rate(&mut self) {
        self.osc.set_frequency(self.effective_rate_hz());
    }
}
