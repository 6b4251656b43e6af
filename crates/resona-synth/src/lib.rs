//! Resona Synth - polyphonic wavetable voice engine
//!
//! A complete subtractive synthesis voice architecture built on
//! [`resona-core`](resona_core): band-limited wavetable oscillators,
//! a fixed pool of voices with configurable stealing, per-voice
//! modulation routing, and a lock-free event queue front-end for use
//! in audio callbacks.
//!
//! # Architecture
//!
//! - [`WavetableSet`] - Shared bank of band-limited single-cycle tables
//! - [`Oscillator`] - Table-reading oscillator with detune and PWM
//! - [`Envelope`] - ADSR with curve control and a fast shutdown stage
//! - [`Lfo`] - Control-rate oscillator with tempo sync and key sync
//! - [`ModRouting`] - Flat source-to-destination route list per voice
//! - [`Voice`] - Two oscillators, filter, three envelopes, two LFOs
//! - [`VoiceManager`] - Fixed voice pool with steal policies
//! - [`SynthEngine`] / [`EngineHandle`] - SPSC-queued real-time front-end
//!
//! # Real-time Guarantees
//!
//! All allocation happens at construction. Rendering, note handling,
//! and event delivery are allocation-free and lock-free; the audio
//! thread never blocks on the control thread.
//!
//! # Example
//!
//! ```rust
//! use resona_synth::{SynthEvent, engine};
//!
//! let (mut handle, mut synth) = engine(48000.0, 16, 256);
//!
//! // Control thread:
//! handle.send(SynthEvent::NoteOn { note: 69, velocity: 100 });
//!
//! // Audio callback:
//! let mut left = [0.0f32; 256];
//! let mut right = [0.0f32; 256];
//! synth.process(&mut left, &mut right);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod engine;
pub mod envelope;
pub mod lfo;
pub mod oscillator;
pub mod routing;
pub mod voice;
pub mod voice_manager;
pub mod wavetable;

/// Largest block a voice renders in one pass; longer host buffers are
/// split into chunks of this size.
pub const MAX_BLOCK_SIZE: usize = 1024;

// Core types that appear in this crate's public API
pub use resona_core::{FilterType, NoteDivision};

#[cfg(feature = "rtrb")]
pub use engine::{DEFAULT_QUEUE_CAPACITY, EngineHandle, engine};
pub use engine::{SynthEngine, SynthEvent};
pub use envelope::{Envelope, EnvelopeStage, SHUTDOWN_MS};
pub use lfo::{Lfo, LfoMode, MAX_LFO_RATE};
pub use oscillator::{Oscillator, Waveform};
pub use routing::{MAX_ROUTES, ModDestination, ModRoute, ModRouting, ModSource, ModValues};
pub use voice::{PITCH_BEND_RANGE, Voice};
pub use voice_manager::{DEFAULT_VOICE_COUNT, MAX_VOICE_COUNT, StealMode, VoiceManager};
pub use wavetable::{
    BAND_COUNT, MAX_FREQUENCY, MIN_FREQUENCY, TABLE_SIZE, Wavetable, WavetableError, WavetableSet,
};
