//! Real-time synth front-end.
//!
//! [`SynthEngine`] owns the voice pool and runs on the audio thread; a
//! matching [`EngineHandle`] lives on the control thread and feeds it
//! events through a lock-free single-producer single-consumer queue.
//! The audio path never locks and never allocates.

#[cfg(feature = "rtrb")]
use alloc::sync::Arc;

use crate::voice_manager::VoiceManager;
use crate::wavetable::WavetableSet;

/// Default event queue capacity.
#[cfg(feature = "rtrb")]
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Control events consumed at block boundaries.
///
/// Values use MIDI ranges: 7-bit notes, velocities and controllers,
/// 14-bit pitch bend centered at 8192.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SynthEvent {
    /// Start a note. Velocity 0 is treated as a note-off.
    NoteOn {
        /// MIDI note number (0-127).
        note: u8,
        /// Velocity (1-127); 0 releases instead.
        velocity: u8,
    },
    /// Release a note.
    NoteOff {
        /// MIDI note number (0-127).
        note: u8,
    },
    /// Pitch wheel, 14-bit with 8192 as center.
    PitchBend {
        /// Raw wheel position (0-16383).
        value: u16,
    },
    /// Continuous controller. CC 1 drives the mod wheel; CC 120 and
    /// CC 123 release all notes; others are ignored.
    ControlChange {
        /// Controller number.
        controller: u8,
        /// Controller value (0-127).
        value: u8,
    },
    /// Polyphonic aftertouch: pressure for one held note. Ignored when
    /// the note is not held.
    Aftertouch {
        /// MIDI note number (0-127).
        note: u8,
        /// Pressure (0-127).
        pressure: u8,
    },
    /// Channel aftertouch, applied to every voice.
    ChannelPressure {
        /// Pressure (0-127).
        value: u8,
    },
    /// Release every held note.
    AllNotesOff,
    /// Host tempo change for tempo-synced LFOs.
    Tempo {
        /// Beats per minute.
        bpm: f32,
    },
}

/// Control-thread side of the engine.
///
/// Cheap to move into a MIDI or UI thread; sending never blocks.
#[cfg(feature = "rtrb")]
pub struct EngineHandle {
    tx: rtrb::Producer<SynthEvent>,
}

#[cfg(feature = "rtrb")]
impl EngineHandle {
    /// Queue an event for the audio thread. Returns `false` when the
    /// queue is full (the event is discarded).
    pub fn send(&mut self, event: SynthEvent) -> bool {
        self.tx.push(event).is_ok()
    }
}

/// Audio-thread synthesizer.
///
/// # Example
///
/// ```rust
/// use resona_synth::{SynthEvent, engine};
///
/// let (mut handle, mut synth) = engine(48000.0, 16, 256);
/// handle.send(SynthEvent::NoteOn { note: 60, velocity: 100 });
///
/// let mut left = [0.0f32; 128];
/// let mut right = [0.0f32; 128];
/// synth.process(&mut left, &mut right);
/// ```
pub struct SynthEngine {
    voices: VoiceManager,
    #[cfg(feature = "rtrb")]
    rx: rtrb::Consumer<SynthEvent>,
    sample_rate: f32,
    bpm: f32,
}

/// Create a connected ([`EngineHandle`], [`SynthEngine`]) pair.
///
/// `queue_capacity` bounds how many events can pile up between audio
/// callbacks; overflow is dropped at the sender.
#[cfg(feature = "rtrb")]
pub fn engine(
    sample_rate: f32,
    voice_count: usize,
    queue_capacity: usize,
) -> (EngineHandle, SynthEngine) {
    let (tx, rx) = rtrb::RingBuffer::new(queue_capacity.max(1));
    let synth = SynthEngine {
        voices: VoiceManager::new(sample_rate, voice_count, WavetableSet::shared(sample_rate)),
        rx,
        sample_rate,
        bpm: 120.0,
    };
    (EngineHandle { tx }, synth)
}

impl SynthEngine {
    /// Create an engine without an event queue; feed it with
    /// [`handle_event`](SynthEngine::handle_event) directly.
    #[cfg(not(feature = "rtrb"))]
    pub fn new(sample_rate: f32, voice_count: usize) -> Self {
        Self {
            voices: VoiceManager::new(sample_rate, voice_count, WavetableSet::shared(sample_rate)),
            sample_rate,
            bpm: 120.0,
        }
    }

    /// Create an engine sharing an existing wavetable bank (custom
    /// waveforms installed ahead of time).
    #[cfg(feature = "rtrb")]
    pub fn with_tables(
        sample_rate: f32,
        voice_count: usize,
        queue_capacity: usize,
        tables: Arc<WavetableSet>,
    ) -> (EngineHandle, Self) {
        let (tx, rx) = rtrb::RingBuffer::new(queue_capacity.max(1));
        let synth = Self {
            voices: VoiceManager::new(sample_rate, voice_count, tables),
            rx,
            sample_rate,
            bpm: 120.0,
        };
        (EngineHandle { tx }, synth)
    }

    /// The voice pool, for parameter and routing changes.
    ///
    /// Intended for setup before the engine moves to the audio thread;
    /// afterwards, parameter access belongs to whoever owns the engine.
    pub fn voices_mut(&mut self) -> &mut VoiceManager {
        &mut self.voices
    }

    /// Read-only pool access.
    pub fn voices(&self) -> &VoiceManager {
        &self.voices
    }

    /// Current sample rate.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Apply one event immediately.
    pub fn handle_event(&mut self, event: SynthEvent) {
        match event {
            SynthEvent::NoteOn { note, velocity: 0 } => self.voices.note_off(note),
            SynthEvent::NoteOn { note, velocity } => {
                self.voices.note_on(note, f32::from(velocity.min(127)) / 127.0);
            }
            SynthEvent::NoteOff { note } => self.voices.note_off(note),
            SynthEvent::PitchBend { value } => {
                let centered = f32::from(value.min(16383)) - 8192.0;
                self.voices.set_pitch_bend(centered / 8192.0);
            }
            SynthEvent::ControlChange { controller: 1, value } => {
                self.voices.set_mod_wheel(f32::from(value.min(127)) / 127.0);
            }
            SynthEvent::ControlChange {
                controller: 120 | 123,
                ..
            } => self.voices.all_notes_off(),
            SynthEvent::ControlChange { .. } => {}
            SynthEvent::Aftertouch { note, pressure } => {
                self.voices
                    .set_note_pressure(note, f32::from(pressure.min(127)) / 127.0);
            }
            SynthEvent::ChannelPressure { value } => {
                self.voices.set_key_pressure(f32::from(value.min(127)) / 127.0);
            }
            SynthEvent::AllNotesOff => self.voices.all_notes_off(),
            SynthEvent::Tempo { bpm } => {
                self.bpm = bpm.max(1.0);
                self.voices.set_tempo(self.bpm);
            }
        }
    }

    /// Render one stereo block.
    ///
    /// Clears the buffers, drains queued events in arrival order, then
    /// mixes every active voice.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        left.fill(0.0);
        right.fill(0.0);

        #[cfg(feature = "rtrb")]
        while let Ok(event) = self.rx.pop() {
            self.handle_event(event);
        }

        self.voices.process(left, right);
    }

    /// Drop all state and adopt a new sample rate.
    pub fn reset(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.voices.reset();
        self.voices.set_sample_rate(sample_rate);
    }
}
