//! Multi-stage envelope generator.
//!
//! Attack-decay-sustain-release with an extra Shutdown stage for voice
//! stealing. Stages are normalized-time ramps shaped by a configurable
//! curve exponent, so the configured times are exact: attack reaches its
//! peak after exactly the attack time, release reaches silence after
//! exactly the release time.

use libm::powf;

/// Envelope stages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeStage {
    /// Inactive — output is zero.
    #[default]
    Idle,
    /// Rising toward the velocity-scaled peak.
    Attack,
    /// Falling from peak toward the sustain plateau.
    Decay,
    /// Holding at the sustain level while the gate is held.
    Sustain,
    /// Falling to zero after gate release.
    Release,
    /// Fast fixed-time ramp to zero for voice stealing. Ignores the
    /// configured release time.
    Shutdown,
}

/// Duration of the Shutdown ramp in milliseconds.
pub const SHUTDOWN_MS: f32 = 2.0;

/// Envelope generator with curved ramp stages.
///
/// Each ramp stage interpolates from the level at stage entry to the
/// stage target over the configured time, shaped by
/// `1 - (1 - t)^curve` — fast initial movement that eases into the
/// target, approximating an analog RC response while still landing
/// exactly on the target.
///
/// Retriggering from any stage restarts Attack from the *current* level,
/// so rapid retriggers never click.
///
/// # Example
///
/// ```rust
/// use resona_synth::{Envelope, EnvelopeStage};
///
/// let mut env = Envelope::new(48000.0);
/// env.set_attack_ms(10.0);
/// env.set_sustain(0.7);
///
/// env.trigger(1.0);
/// let level = env.advance();
/// assert!(env.stage() == EnvelopeStage::Attack);
/// ```
#[derive(Debug, Clone)]
pub struct Envelope {
    stage: EnvelopeStage,
    /// Current output level
    level: f32,
    sample_rate: f32,

    // Time parameters (milliseconds)
    attack_ms: f32,
    decay_ms: f32,
    release_ms: f32,
    sustain: f32,
    /// Curve exponent shaping every ramp stage
    curve: f32,

    // Per-sample normalized-time increments (pre-calculated)
    attack_inc: f32,
    decay_inc: f32,
    release_inc: f32,
    shutdown_inc: f32,

    /// Velocity-scaled peak the attack ramps toward
    peak: f32,
    /// Normalized position within the current ramp stage [0, 1]
    stage_pos: f32,
    /// Level at stage entry
    stage_start: f32,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl Envelope {
    /// Create an envelope with default settings.
    ///
    /// Defaults: attack 10 ms, decay 100 ms, sustain 0.7, release
    /// 200 ms, curve 1.8.
    pub fn new(sample_rate: f32) -> Self {
        let mut env = Self {
            stage: EnvelopeStage::Idle,
            level: 0.0,
            sample_rate,
            attack_ms: 10.0,
            decay_ms: 100.0,
            release_ms: 200.0,
            sustain: 0.7,
            curve: 1.8,
            attack_inc: 0.0,
            decay_inc: 0.0,
            release_inc: 0.0,
            shutdown_inc: 0.0,
            peak: 1.0,
            stage_pos: 0.0,
            stage_start: 0.0,
        };
        env.recalculate_increments();
        env
    }

    /// Set attack time in milliseconds (minimum 0.1 ms).
    pub fn set_attack_ms(&mut self, ms: f32) {
        self.attack_ms = ms.max(0.1);
        self.attack_inc = Self::ramp_inc(self.attack_ms, self.sample_rate);
    }

    /// Get attack time in milliseconds.
    pub fn attack_ms(&self) -> f32 {
        self.attack_ms
    }

    /// Set decay time in milliseconds (minimum 0.1 ms).
    pub fn set_decay_ms(&mut self, ms: f32) {
        self.decay_ms = ms.max(0.1);
        self.decay_inc = Self::ramp_inc(self.decay_ms, self.sample_rate);
    }

    /// Get decay time in milliseconds.
    pub fn decay_ms(&self) -> f32 {
        self.decay_ms
    }

    /// Set sustain level (clamped to [0, 1]).
    pub fn set_sustain(&mut self, level: f32) {
        self.sustain = level.clamp(0.0, 1.0);
    }

    /// Get sustain level.
    pub fn sustain(&self) -> f32 {
        self.sustain
    }

    /// Set release time in milliseconds (minimum 0.1 ms).
    pub fn set_release_ms(&mut self, ms: f32) {
        self.release_ms = ms.max(0.1);
        self.release_inc = Self::ramp_inc(self.release_ms, self.sample_rate);
    }

    /// Get release time in milliseconds.
    pub fn release_ms(&self) -> f32 {
        self.release_ms
    }

    /// Set the curve exponent (clamped to [0.1, 10]). 1.0 is linear;
    /// higher values move faster at stage start.
    pub fn set_curve(&mut self, curve: f32) {
        self.curve = curve.clamp(0.1, 10.0);
    }

    /// Get the curve exponent.
    pub fn curve(&self) -> f32 {
        self.curve
    }

    /// Set sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_increments();
    }

    /// Trigger the envelope (note on).
    ///
    /// `velocity` in [0, 1] scales the attack target: a half-velocity
    /// note peaks (and sustains) at half level. Attack restarts from the
    /// current level for click-free retriggering.
    pub fn trigger(&mut self, velocity: f32) {
        self.peak = velocity.clamp(0.0, 1.0);
        self.enter(EnvelopeStage::Attack);
    }

    /// Release the envelope (note off). No-op when idle or shutting down.
    pub fn release(&mut self) {
        match self.stage {
            EnvelopeStage::Idle | EnvelopeStage::Release | EnvelopeStage::Shutdown => {}
            _ => self.enter(EnvelopeStage::Release),
        }
    }

    /// Begin the fixed-time Shutdown ramp (voice stealing).
    pub fn stop(&mut self) {
        if self.stage != EnvelopeStage::Idle {
            self.enter(EnvelopeStage::Shutdown);
        }
    }

    /// Force the envelope to idle immediately.
    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
        self.stage_pos = 0.0;
        self.stage_start = 0.0;
    }

    /// Get current stage.
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Get current level without advancing.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Check whether the envelope is producing output.
    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    /// Advance by one sample and return the level.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.advance_block(1)
    }

    /// Advance by `frames` samples and return the level at the end.
    ///
    /// This is the single stepping rule for both the audio-rate and the
    /// control-rate path: [`advance`](Envelope::advance) is a one-frame
    /// block, so a stage transition lands on the same frame and carries
    /// the same fractional remainder either way.
    pub fn advance_block(&mut self, frames: usize) -> f32 {
        let mut remaining = frames as f32;
        while remaining > 0.0 {
            let inc = match self.stage {
                EnvelopeStage::Idle => {
                    self.level = 0.0;
                    return self.level;
                }
                EnvelopeStage::Sustain => {
                    self.level = self.sustain * self.peak;
                    return self.level;
                }
                EnvelopeStage::Attack => self.attack_inc,
                EnvelopeStage::Decay => self.decay_inc,
                EnvelopeStage::Release => self.release_inc,
                EnvelopeStage::Shutdown => self.shutdown_inc,
            };

            // The tolerance absorbs f32 drift from repeated one-sample
            // stepping, which otherwise lands just shy of the boundary.
            // A hundredth of a frame is far below anything audible.
            let frames_to_end = (1.0 - self.stage_pos) / inc;
            if remaining + 1e-2 < frames_to_end {
                self.stage_pos += inc * remaining;
                self.apply_ramp_level();
                return self.level;
            }

            remaining = (remaining - frames_to_end).max(0.0);
            self.complete_stage();
        }
        self.level
    }

    /// Fill a block with per-sample levels.
    pub fn process(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.advance();
        }
    }

    fn apply_ramp_level(&mut self) {
        // Partial steps keep stage_pos strictly below 1, but clamp the
        // complement anyway: powf of a negative base is NaN.
        let left = (1.0 - self.stage_pos).max(0.0);
        match self.stage {
            EnvelopeStage::Shutdown => {
                // Linear, not curved: the ramp is 2 ms, shape is inaudible
                self.level = self.stage_start * left;
            }
            _ => {
                let shaped = 1.0 - powf(left, self.curve);
                self.level = self.stage_start + (self.ramp_target() - self.stage_start) * shaped;
            }
        }
    }

    fn ramp_target(&self) -> f32 {
        match self.stage {
            EnvelopeStage::Attack => self.peak,
            EnvelopeStage::Decay => self.sustain * self.peak,
            _ => 0.0,
        }
    }

    fn complete_stage(&mut self) {
        match self.stage {
            EnvelopeStage::Attack => {
                self.level = self.peak;
                self.enter(EnvelopeStage::Decay);
            }
            EnvelopeStage::Decay => {
                self.level = self.sustain * self.peak;
                self.enter(EnvelopeStage::Sustain);
            }
            EnvelopeStage::Release | EnvelopeStage::Shutdown => {
                self.reset();
            }
            EnvelopeStage::Idle | EnvelopeStage::Sustain => {}
        }
    }

    fn enter(&mut self, stage: EnvelopeStage) {
        self.stage = stage;
        self.stage_pos = 0.0;
        self.stage_start = self.level;
    }

    fn recalculate_increments(&mut self) {
        self.attack_inc = Self::ramp_inc(self.attack_ms, self.sample_rate);
        self.decay_inc = Self::ramp_inc(self.decay_ms, self.sample_rate);
        self.release_inc = Self::ramp_inc(self.release_ms, self.sample_rate);
        self.shutdown_inc = Self::ramp_inc(SHUTDOWN_MS, self.sample_rate);
    }

    fn ramp_inc(ms: f32, sample_rate: f32) -> f32 {
        let samples = (ms * sample_rate / 1000.0).max(1.0);
        1.0 / samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_outputs_zero() {
        let mut env = Envelope::new(48000.0);
        assert_eq!(env.stage(), EnvelopeStage::Idle);
        for _ in 0..100 {
            assert_eq!(env.advance(), 0.0);
        }
    }

    #[test]
    fn test_attack_reaches_peak_in_configured_time() {
        let mut env = Envelope::new(48000.0);
        env.set_attack_ms(10.0);
        env.trigger(1.0);

        // 10 ms at 48 kHz = 480 samples
        for _ in 0..479 {
            env.advance();
            assert_eq!(env.stage(), EnvelopeStage::Attack);
        }
        env.advance();
        assert_eq!(env.stage(), EnvelopeStage::Decay);
        assert!((env.level() - 1.0).abs() < 1e-5, "peak: {}", env.level());
    }

    #[test]
    fn test_velocity_scales_peak() {
        let mut env = Envelope::new(48000.0);
        env.set_attack_ms(1.0);
        env.trigger(0.5);

        for _ in 0..200 {
            env.advance();
        }
        // Past attack; level should never have exceeded 0.5
        assert!(env.level() <= 0.5 + 1e-5);

        // And the sustain plateau scales too
        env.set_decay_ms(1.0);
        for _ in 0..2000 {
            env.advance();
        }
        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        assert!((env.level() - 0.7 * 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_decay_to_sustain() {
        let mut env = Envelope::new(48000.0);
        env.set_attack_ms(1.0);
        env.set_decay_ms(10.0);
        env.set_sustain(0.5);
        env.trigger(1.0);

        for _ in 0..2000 {
            env.advance();
        }

        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        assert!((env.level() - 0.5).abs() < 1e-4, "level: {}", env.level());
    }

    #[test]
    fn test_release_reaches_zero_in_configured_time() {
        let mut env = Envelope::new(48000.0);
        env.set_attack_ms(1.0);
        env.set_decay_ms(1.0);
        env.set_release_ms(50.0);
        env.trigger(1.0);

        for _ in 0..2000 {
            env.advance();
        }
        env.release();
        assert_eq!(env.stage(), EnvelopeStage::Release);

        // 50 ms at 48 kHz = 2400 samples
        for _ in 0..2400 {
            env.advance();
        }
        assert_eq!(env.stage(), EnvelopeStage::Idle);
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn test_retrigger_from_current_level() {
        let mut env = Envelope::new(48000.0);
        env.set_attack_ms(5.0);
        env.trigger(1.0);

        for _ in 0..100 {
            env.advance();
        }
        let level_before = env.level();
        assert!(level_before > 0.0);

        env.trigger(1.0);
        assert_eq!(env.stage(), EnvelopeStage::Attack);
        // First sample after retrigger stays near the pre-trigger level
        let level_after = env.advance();
        assert!(
            (level_after - level_before).abs() < 0.05,
            "retrigger jumped: {} -> {}",
            level_before,
            level_after
        );
    }

    #[test]
    fn test_retrigger_from_release() {
        let mut env = Envelope::new(48000.0);
        env.set_attack_ms(1.0);
        env.set_decay_ms(1.0);
        env.trigger(1.0);
        for _ in 0..2000 {
            env.advance();
        }
        env.release();
        for _ in 0..500 {
            env.advance();
        }
        let mid_release = env.level();
        assert!(mid_release > 0.0);

        env.trigger(1.0);
        assert_eq!(env.stage(), EnvelopeStage::Attack);
        let after = env.advance();
        assert!(after >= mid_release - 0.01, "attack should rise from release level");
    }

    #[test]
    fn test_shutdown_is_fast_and_linear() {
        let mut env = Envelope::new(48000.0);
        env.set_release_ms(2000.0); // Long release must not matter
        env.set_attack_ms(0.1);
        env.trigger(1.0);
        for _ in 0..100 {
            env.advance();
        }

        env.stop();
        assert_eq!(env.stage(), EnvelopeStage::Shutdown);

        // 2 ms at 48 kHz = 96 samples
        let mut prev = env.level();
        for _ in 0..96 {
            let l = env.advance();
            assert!(l <= prev + 1e-6, "shutdown must be monotonic");
            prev = l;
        }
        assert_eq!(env.stage(), EnvelopeStage::Idle);
    }

    #[test]
    fn test_stop_when_idle_stays_idle() {
        let mut env = Envelope::new(48000.0);
        env.stop();
        assert_eq!(env.stage(), EnvelopeStage::Idle);
    }

    #[test]
    fn test_release_when_idle_is_noop() {
        let mut env = Envelope::new(48000.0);
        env.release();
        assert_eq!(env.stage(), EnvelopeStage::Idle);
    }

    #[test]
    fn test_output_range() {
        let mut env = Envelope::new(48000.0);
        env.set_attack_ms(5.0);
        env.set_decay_ms(20.0);
        env.set_sustain(0.6);
        env.set_release_ms(50.0);
        env.trigger(1.0);

        for _ in 0..4000 {
            let level = env.advance();
            assert!((0.0..=1.0).contains(&level), "out of range: {}", level);
        }
        env.release();
        for _ in 0..4000 {
            let level = env.advance();
            assert!((0.0..=1.0).contains(&level), "release out of range: {}", level);
        }
    }

    #[test]
    fn test_curve_clamped() {
        let mut env = Envelope::new(48000.0);
        env.set_curve(100.0);
        assert_eq!(env.curve(), 10.0);
        env.set_curve(0.0);
        assert_eq!(env.curve(), 0.1);
    }

    #[test]
    fn test_advance_block_matches_per_sample() {
        let mut per_sample = Envelope::new(48000.0);
        let mut blocked = Envelope::new(48000.0);
        for env in [&mut per_sample, &mut blocked] {
            env.set_attack_ms(3.0);
            env.set_decay_ms(7.0);
            env.set_sustain(0.4);
            env.trigger(1.0);
        }

        let compare = |per_sample: &mut Envelope, blocked: &mut Envelope, blocks: usize| {
            for _ in 0..blocks {
                let mut last = 0.0;
                for _ in 0..128 {
                    last = per_sample.advance();
                }
                let block_level = blocked.advance_block(128);
                assert!(
                    (last - block_level).abs() < 1e-3,
                    "block {} vs per-sample {}",
                    block_level,
                    last
                );
            }
        };

        // Through attack and decay into sustain, then through release
        compare(&mut per_sample, &mut blocked, 20);
        per_sample.release();
        blocked.release();
        compare(&mut per_sample, &mut blocked, 10);
        assert_eq!(per_sample.stage(), blocked.stage());
    }

    #[test]
    fn test_advance_block_crosses_stages() {
        let mut env = Envelope::new(48000.0);
        env.set_attack_ms(1.0); // 48 samples
        env.set_decay_ms(1.0); // 48 samples
        env.set_sustain(0.5);
        env.trigger(1.0);

        // One 512-sample block spans attack + decay into sustain
        let level = env.advance_block(512);
        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        assert!((level - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_state_transitions() {
        let mut env = Envelope::new(48000.0);
        env.set_attack_ms(1.0);
        env.set_decay_ms(5.0);
        env.set_sustain(0.5);
        env.set_release_ms(10.0);

        assert_eq!(env.stage(), EnvelopeStage::Idle);
        env.trigger(1.0);
        assert_eq!(env.stage(), EnvelopeStage::Attack);

        for _ in 0..100 {
            env.advance();
        }
        assert_eq!(env.stage(), EnvelopeStage::Decay);

        for _ in 0..400 {
            env.advance();
        }
        assert_eq!(env.stage(), EnvelopeStage::Sustain);

        env.release();
        assert_eq!(env.stage(), EnvelopeStage::Release);

        for _ in 0..1000 {
            env.advance();
        }
        assert_eq!(env.stage(), EnvelopeStage::Idle);
    }
}
