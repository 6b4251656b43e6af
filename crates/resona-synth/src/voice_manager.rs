//! Polyphonic voice allocation.
//!
//! A fixed pool of voices, a note-to-voice map for O(1) note-off and
//! legato retrigger, and a configurable steal policy for when the pool
//! is exhausted. Stolen voices run their 2 ms shutdown ramp to silence
//! before the new note starts, so stealing never clicks.

use alloc::sync::Arc;
use alloc::vec::Vec;

use resona_core::Lcg;

use crate::voice::Voice;
use crate::wavetable::WavetableSet;

/// Default number of voices in the pool.
pub const DEFAULT_VOICE_COUNT: usize = 16;

/// Hard ceiling on the pool size.
pub const MAX_VOICE_COUNT: usize = 64;

/// Which voice to steal when the pool is exhausted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StealMode {
    /// The voice that has been playing longest.
    #[default]
    Oldest,
    /// The voice with the lowest current envelope level.
    Quietest,
    /// The lowest-index voice.
    First,
    /// A deterministic pseudo-random pick.
    Random,
}

/// Fixed-pool voice allocator.
///
/// All voices are created up front; note handling never allocates.
///
/// # Example
///
/// ```rust
/// use resona_synth::{VoiceManager, WavetableSet};
///
/// let tables = WavetableSet::shared(48000.0);
/// let mut manager = VoiceManager::new(48000.0, 8, tables);
///
/// manager.note_on(60, 0.9);
/// let mut left = [0.0f32; 128];
/// let mut right = [0.0f32; 128];
/// manager.process(&mut left, &mut right);
/// manager.note_off(60);
/// ```
pub struct VoiceManager {
    voices: Vec<Voice>,
    /// Notes waiting for their stolen voice to finish shutting down
    pending: Vec<Option<(u8, f32)>>,
    /// Held-note lookup: note number to voice index
    note_map: [Option<usize>; 128],
    steal_mode: StealMode,
    stealing_enabled: bool,
    /// Monotonic note-on counter used as the voice age stamp
    age_counter: u64,
    /// Notes discarded because the pool was full and stealing was off
    dropped_notes: u64,
    rng: Lcg,
}

impl VoiceManager {
    /// Create a pool of `voice_count` voices (capped at
    /// [`MAX_VOICE_COUNT`]) sharing one wavetable bank. An empty pool is
    /// allowed; it drops and counts every note-on.
    pub fn new(sample_rate: f32, voice_count: usize, tables: Arc<WavetableSet>) -> Self {
        let count = voice_count.min(MAX_VOICE_COUNT);
        let mut voices = Vec::with_capacity(count);
        for _ in 0..count {
            voices.push(Voice::new(sample_rate, tables.clone()));
        }
        let mut pending = Vec::with_capacity(count);
        pending.resize(count, None);

        Self {
            voices,
            pending,
            note_map: [None; 128],
            steal_mode: StealMode::Oldest,
            stealing_enabled: true,
            age_counter: 0,
            dropped_notes: 0,
            rng: Lcg::default(),
        }
    }

    /// Set the steal policy.
    pub fn set_steal_mode(&mut self, mode: StealMode) {
        self.steal_mode = mode;
    }

    /// Get the steal policy.
    pub fn steal_mode(&self) -> StealMode {
        self.steal_mode
    }

    /// Enable or disable stealing. With stealing off, notes arriving at
    /// a full pool are dropped and counted.
    pub fn set_stealing_enabled(&mut self, enabled: bool) {
        self.stealing_enabled = enabled;
    }

    /// Notes dropped because the pool was full.
    pub fn dropped_notes(&self) -> u64 {
        self.dropped_notes
    }

    /// Number of voices currently producing sound.
    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Pool size.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Mutable access to one voice for parameter changes.
    pub fn voice_mut(&mut self, index: usize) -> Option<&mut Voice> {
        self.voices.get_mut(index)
    }

    /// Iterate over every voice mutably, for pool-wide configuration.
    pub fn voices_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.voices.iter_mut()
    }

    /// Start a note. Retriggers in place when the note is already held,
    /// otherwise takes the lowest-index free voice, and falls back to
    /// the steal policy when the pool is full.
    pub fn note_on(&mut self, note: u8, velocity: f32) {
        if note > 127 {
            return;
        }
        if self.voices.is_empty() {
            self.dropped_notes += 1;
            return;
        }

        // Same note already held: retrigger the same voice (legato)
        if let Some(index) = self.note_map[note as usize] {
            if let Some((pending_note, _)) = self.pending[index] {
                if pending_note == note {
                    self.pending[index] = Some((note, velocity));
                    return;
                }
            }
            self.start_voice(index, note, velocity);
            return;
        }

        // A voice that went idle mid-block with a note still parked on it
        // is spoken for; the free scan must not grab it.
        if let Some(index) = self
            .voices
            .iter()
            .zip(&self.pending)
            .position(|(voice, parked)| !voice.is_active() && parked.is_none())
        {
            self.start_voice(index, note, velocity);
            self.note_map[note as usize] = Some(index);
            return;
        }

        if !self.stealing_enabled {
            self.dropped_notes += 1;
            #[cfg(feature = "tracing")]
            tracing::warn!(note, dropped = self.dropped_notes, "voice pool exhausted, dropping note");
            return;
        }

        let victim = self.select_victim();
        self.steal(victim, note, velocity);
    }

    /// Release a note. Unknown or already-released notes are a no-op.
    pub fn note_off(&mut self, note: u8) {
        if note > 127 {
            return;
        }
        let Some(index) = self.note_map[note as usize] else {
            return;
        };

        // Note released while waiting for its stolen voice: cancel it
        if let Some((pending_note, _)) = self.pending[index] {
            if pending_note == note {
                self.pending[index] = None;
                self.note_map[note as usize] = None;
                return;
            }
        }

        self.voices[index].note_off();
        self.note_map[note as usize] = None;
    }

    /// Release every held note.
    pub fn all_notes_off(&mut self) {
        for voice in &mut self.voices {
            voice.note_off();
        }
        for slot in &mut self.pending {
            *slot = None;
        }
        self.note_map = [None; 128];
    }

    /// Silence everything immediately.
    pub fn reset(&mut self) {
        for voice in &mut self.voices {
            voice.reset();
        }
        for slot in &mut self.pending {
            *slot = None;
        }
        self.note_map = [None; 128];
        self.age_counter = 0;
    }

    /// Pitch wheel for every voice, [-1, 1].
    pub fn set_pitch_bend(&mut self, bend: f32) {
        for voice in &mut self.voices {
            voice.set_pitch_bend(bend);
        }
    }

    /// Mod wheel for every voice, [0, 1].
    pub fn set_mod_wheel(&mut self, value: f32) {
        for voice in &mut self.voices {
            voice.set_mod_wheel(value);
        }
    }

    /// Channel aftertouch for every voice, [0, 1].
    pub fn set_key_pressure(&mut self, pressure: f32) {
        for voice in &mut self.voices {
            voice.set_key_pressure(pressure);
        }
    }

    /// Polyphonic aftertouch: pressure for the voice holding `note`.
    /// Ignored when the note is not held.
    pub fn set_note_pressure(&mut self, note: u8, pressure: f32) {
        if note > 127 {
            return;
        }
        if let Some(index) = self.note_map[note as usize] {
            self.voices[index].set_key_pressure(pressure);
        }
    }

    /// Host tempo for tempo-synced LFOs.
    pub fn set_tempo(&mut self, bpm: f32) {
        for voice in &mut self.voices {
            voice.set_tempo(bpm);
        }
    }

    /// Set sample rate on every voice.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        for voice in &mut self.voices {
            voice.set_sample_rate(sample_rate);
        }
    }

    /// Render one block, mixing every active voice into `left`/`right`.
    /// Pending notes whose stolen voice has finished its shutdown ramp
    /// start at the top of the block.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for index in 0..self.voices.len() {
            if let Some((note, velocity)) = self.pending[index] {
                if !self.voices[index].is_active() {
                    self.pending[index] = None;
                    self.start_voice(index, note, velocity);
                }
            }
        }

        for voice in &mut self.voices {
            voice.render(left, right);
        }

        // A voice can go idle mid-block (release end); drop stale map
        // entries so the slot is reusable next note-on.
        for slot in &mut self.note_map {
            if let Some(index) = *slot {
                if !self.voices[index].is_active() && self.pending[index].is_none() {
                    *slot = None;
                }
            }
        }
    }

    fn start_voice(&mut self, index: usize, note: u8, velocity: f32) {
        self.age_counter += 1;
        let voice = &mut self.voices[index];
        voice.note_on(note, velocity);
        voice.set_age(self.age_counter);
    }

    /// Pick the steal victim. Scans ascending with strict improvement,
    /// so ties resolve to the lowest index.
    ///
    /// Voices already shutting down for a parked note are passed over
    /// while any other voice is available; stealing one again would
    /// displace its parked note. Its age and amplitude are stale until
    /// the parked note starts, so without this the same voice wins the
    /// scan on every steal.
    fn select_victim(&mut self) -> usize {
        let all_parked = self.pending.iter().all(Option::is_some);
        let eligible = |parked: &Option<(u8, f32)>| all_parked || parked.is_none();

        match self.steal_mode {
            StealMode::First => {
                let mut first = 0;
                for (i, parked) in self.pending.iter().enumerate() {
                    if eligible(parked) {
                        first = i;
                        break;
                    }
                }
                first
            }
            StealMode::Random => {
                let count = self.pending.iter().filter(|p| eligible(p)).count();
                let mut pick = (self.rng.next_u32() as usize) % count.max(1);
                let mut chosen = 0;
                for (i, parked) in self.pending.iter().enumerate() {
                    if eligible(parked) {
                        chosen = i;
                        if pick == 0 {
                            break;
                        }
                        pick -= 1;
                    }
                }
                chosen
            }
            StealMode::Oldest => {
                let mut best: Option<usize> = None;
                for (i, voice) in self.voices.iter().enumerate() {
                    if !eligible(&self.pending[i]) {
                        continue;
                    }
                    match best {
                        Some(b) if self.voices[b].age() <= voice.age() => {}
                        _ => best = Some(i),
                    }
                }
                best.unwrap_or(0)
            }
            StealMode::Quietest => {
                let mut best: Option<usize> = None;
                for (i, voice) in self.voices.iter().enumerate() {
                    if !eligible(&self.pending[i]) {
                        continue;
                    }
                    match best {
                        Some(b) if self.voices[b].amplitude() <= voice.amplitude() => {}
                        _ => best = Some(i),
                    }
                }
                best.unwrap_or(0)
            }
        }
    }

    fn steal(&mut self, index: usize, note: u8, velocity: f32) {
        // Only reachable when every voice is mid-shutdown with a note
        // parked on it. The latency budget is spent: cut this voice to
        // silence and start its parked note now, rather than losing it.
        if let Some((parked_note, parked_velocity)) = self.pending[index].take() {
            self.voices[index].reset();
            self.start_voice(index, parked_note, parked_velocity);
        }

        let old_note = self.voices[index].note();
        if self.note_map[old_note as usize] == Some(index) {
            self.note_map[old_note as usize] = None;
        }

        self.voices[index].stop();
        self.pending[index] = Some((note, velocity));
        self.note_map[note as usize] = Some(index);
    }
}
