//! General math utilities for audio processing.
//!
//! Conversions, interpolation, and the numerical hygiene helpers every
//! real-time path needs (denormal flushing, NaN/Inf sanitizing).

use libm::{floorf, log10f, powf};

/// Convert decibels to linear gain.
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    powf(10.0, db / 20.0)
}

/// Convert linear gain to decibels.
///
/// Clamps at -100 dB to avoid -inf for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.00001 {
        -100.0
    } else {
        20.0 * log10f(linear)
    }
}

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Wrap a phase value into [0.0, 1.0).
///
/// Tiny negative phases round up to exactly 1.0 after the subtraction
/// (e.g. -1e-8 + 1.0 == 1.0 in f32), which would land one past the end
/// of a guard-entry table, so the result is re-checked.
#[inline]
pub fn wrap_phase(phase: f32) -> f32 {
    let wrapped = phase - floorf(phase);
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}

/// Convert milliseconds to a sample count at the given rate.
#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> f32 {
    ms * sample_rate / 1000.0
}

/// Flush denormal numbers to zero.
///
/// Denormals cause 10-100x slowdowns on x86. Values below 1e-20 are
/// inaudible (-400 dB) and safe to zero.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Replace NaN or infinite samples with silence.
///
/// A single NaN propagates through every filter and mix stage it touches;
/// the audio path zeroes bad samples instead of letting them spread.
#[inline]
pub fn sanitize(x: f32) -> f32 {
    if x.is_finite() { x } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_to_linear() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
        assert!((db_to_linear(6.0) - 1.995).abs() < 0.01);
        assert!((db_to_linear(-6.0) - 0.501).abs() < 0.01);
        assert!((db_to_linear(20.0) - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_linear_to_db() {
        assert!(linear_to_db(1.0).abs() < 0.001);
        assert!((linear_to_db(10.0) - 20.0).abs() < 0.01);
        assert_eq!(linear_to_db(0.0), -100.0);
    }

    #[test]
    fn test_db_round_trip() {
        for db in [-60.0f32, -12.0, 0.0, 6.0, 24.0] {
            let back = linear_to_db(db_to_linear(db));
            assert!((back - db).abs() < 0.01);
        }
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
        assert_eq!(lerp(2.0, 4.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 4.0, 1.0), 4.0);
    }

    #[test]
    fn test_wrap_phase() {
        assert!((wrap_phase(1.25) - 0.25).abs() < 1e-6);
        assert!((wrap_phase(-0.25) - 0.75).abs() < 1e-6);
        assert!(wrap_phase(0.5) == 0.5);
        assert!(wrap_phase(3.0).abs() < 1e-6);
        // Tiny negative phase must not round up to 1.0
        assert_eq!(wrap_phase(-1e-8), 0.0);
    }

    #[test]
    fn test_ms_to_samples() {
        assert!((ms_to_samples(1000.0, 48000.0) - 48000.0).abs() < 0.1);
        assert!((ms_to_samples(10.0, 44100.0) - 441.0).abs() < 0.1);
    }

    #[test]
    fn test_flush_denormal() {
        assert_eq!(flush_denormal(1e-30), 0.0);
        assert_eq!(flush_denormal(0.5), 0.5);
        assert_eq!(flush_denormal(-1e-30), 0.0);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize(f32::NAN), 0.0);
        assert_eq!(sanitize(f32::INFINITY), 0.0);
        assert_eq!(sanitize(f32::NEG_INFINITY), 0.0);
        assert_eq!(sanitize(0.5), 0.5);
        assert_eq!(sanitize(-1.0), -1.0);
    }
}
