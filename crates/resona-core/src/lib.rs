//! Resona Core - DSP primitives for the resona synthesizer
//!
//! Foundational building blocks for the voice engine, designed for
//! real-time processing with zero allocation in the audio path.
//!
//! # Components
//!
//! - [`SinTable`] - Interpolated sine lookup table (phase in turns)
//! - [`Lcg`] - Deterministic pseudo-random generator for noise and
//!   randomized voice stealing
//! - [`BiquadFilter`] - Second-order IIR filter with eight RBJ cookbook
//!   response types and a divergence guard
//! - [`NoteDivision`] - Musical divisions for tempo-synced LFOs
//! - Math utilities: [`db_to_linear`], [`sanitize`], [`note_to_frequency`],
//!   etc.
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! resona-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: No allocations in audio processing paths
//! - **No dependencies on std**: Pure `no_std` with `libm` for math
//! - **Silent failure modes**: Out-of-range parameters clamp, bad samples
//!   sanitize to silence, a diverging filter resets itself

#![cfg_attr(not(feature = "std"), no_std)]

pub mod biquad;
pub mod fast_math;
pub mod math;
pub mod tempo;

// Re-export main types at crate root
pub use biquad::{
    BiquadFilter, FilterType, allpass_coefficients, bandpass_coefficients,
    high_shelf_coefficients, highpass_coefficients, low_shelf_coefficients,
    lowpass_coefficients, notch_coefficients, peaking_coefficients,
};
pub use fast_math::{
    LCG_DEFAULT_SEED, Lcg, SIN_TABLE_SIZE, SinTable, frequency_to_note, note_to_frequency,
    semitones_to_ratio,
};
pub use math::{db_to_linear, flush_denormal, lerp, linear_to_db, ms_to_samples, sanitize, wrap_phase};
pub use tempo::NoteDivision;
