//! Modulation routing.
//!
//! A flat list of source-to-destination routes, evaluated once per block
//! with each source sampled at block start. Route amounts are expressed
//! in the destination's native units (semitones for pitch, Hz for
//! cutoff) so a route reads like "LFO 0 sweeps pitch by ±0.5 st".

/// Maximum number of routes per voice.
pub const MAX_ROUTES: usize = 16;

/// Modulation sources sampled once per block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModSource {
    /// LFO output, bipolar in [-depth, +depth].
    Lfo(u8),
    /// Envelope level, unipolar in [0, 1]. Index 0 is the amplitude
    /// envelope, 1 the filter envelope, 2 the pitch envelope.
    Envelope(u8),
    /// Note-on velocity, unipolar in [0, 1].
    Velocity,
    /// Channel aftertouch, unipolar in [0, 1].
    KeyPressure,
    /// Pitch wheel, bipolar in [-1, 1].
    PitchBend,
    /// Mod wheel (CC 1), unipolar in [0, 1].
    ModWheel,
}

/// Modulation destinations.
///
/// Route amounts are interpreted per destination:
///
/// | Destination      | Amount unit                         |
/// |------------------|-------------------------------------|
/// | `OscPitch`       | semitones                           |
/// | `OscPulseWidth`  | pulse-width offset                  |
/// | `OscMix`         | mix offset                          |
/// | `FilterCutoff`   | Hz                                  |
/// | `FilterResonance`| Q offset                            |
/// | `Amplitude`      | linear gain offset                  |
/// | `LfoRate`        | Hz                                  |
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModDestination {
    /// Pitch of one oscillator (0 or 1), in semitones.
    OscPitch(u8),
    /// Pulse width of one oscillator.
    OscPulseWidth(u8),
    /// Oscillator blend position.
    OscMix,
    /// Filter cutoff in Hz.
    FilterCutoff,
    /// Filter resonance (Q).
    FilterResonance,
    /// Voice output gain.
    Amplitude,
    /// Rate of one LFO, in Hz.
    LfoRate(u8),
}

/// One modulation connection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModRoute {
    /// Where the control signal comes from.
    pub source: ModSource,
    /// What it moves.
    pub destination: ModDestination,
    /// Scale in the destination's native units.
    pub amount: f32,
}

/// Block-rate snapshot of every modulation source.
#[derive(Clone, Copy, Debug, Default)]
pub struct ModValues {
    /// Per-LFO outputs.
    pub lfo: [f32; 2],
    /// Per-envelope levels (amp, filter, pitch).
    pub envelope: [f32; 3],
    /// Note-on velocity.
    pub velocity: f32,
    /// Channel aftertouch.
    pub key_pressure: f32,
    /// Pitch wheel, bipolar.
    pub pitch_bend: f32,
    /// Mod wheel.
    pub mod_wheel: f32,
}

impl ModValues {
    /// Look up the current value of a source.
    pub fn get(&self, source: ModSource) -> f32 {
        match source {
            ModSource::Lfo(i) => self.lfo.get(i as usize).copied().unwrap_or(0.0),
            ModSource::Envelope(i) => self.envelope.get(i as usize).copied().unwrap_or(0.0),
            ModSource::Velocity => self.velocity,
            ModSource::KeyPressure => self.key_pressure,
            ModSource::PitchBend => self.pitch_bend,
            ModSource::ModWheel => self.mod_wheel,
        }
    }
}

/// Fixed-capacity route list.
///
/// Slot-based so adding and removing routes never allocates; the audio
/// thread iterates the occupied slots each block.
#[derive(Clone, Debug)]
pub struct ModRouting {
    routes: [Option<ModRoute>; MAX_ROUTES],
}

impl Default for ModRouting {
    fn default() -> Self {
        Self::new()
    }
}

impl ModRouting {
    /// Create an empty route list.
    pub fn new() -> Self {
        Self {
            routes: [None; MAX_ROUTES],
        }
    }

    /// Add a route into the first free slot. Returns the slot index, or
    /// `None` when all slots are occupied.
    pub fn add(&mut self, source: ModSource, destination: ModDestination, amount: f32) -> Option<usize> {
        let slot = self.routes.iter().position(Option::is_none)?;
        self.routes[slot] = Some(ModRoute {
            source,
            destination,
            amount,
        });
        Some(slot)
    }

    /// Remove the route in `slot`. Out-of-range or empty slots are a
    /// no-op.
    pub fn remove(&mut self, slot: usize) {
        if let Some(route) = self.routes.get_mut(slot) {
            *route = None;
        }
    }

    /// Change the amount of an existing route.
    pub fn set_amount(&mut self, slot: usize, amount: f32) {
        if let Some(Some(route)) = self.routes.get_mut(slot) {
            route.amount = amount;
        }
    }

    /// Remove all routes.
    pub fn clear(&mut self) {
        self.routes = [None; MAX_ROUTES];
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.routes.iter().filter(|r| r.is_some()).count()
    }

    /// True when no routes are set.
    pub fn is_empty(&self) -> bool {
        self.routes.iter().all(Option::is_none)
    }

    /// Iterate over the occupied routes.
    pub fn iter(&self) -> impl Iterator<Item = &ModRoute> {
        self.routes.iter().filter_map(Option::as_ref)
    }

    /// Sum of `source_value * amount` over every route targeting
    /// `destination`, in the destination's native units.
    #[inline]
    pub fn sum_for(&self, destination: ModDestination, values: &ModValues) -> f32 {
        let mut total = 0.0;
        for route in self.iter() {
            if route.destination == destination {
                total += values.get(route.source) * route.amount;
            }
        }
        total
    }
}
