//! Beat-relative rates for tempo-synced LFOs.

/// A musical subdivision of the beat grid.
///
/// Used by tempo-synced LFOs to derive their rate from the host BPM
/// instead of a fixed Hz value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoteDivision {
    /// Four beats.
    Whole,
    /// Two beats.
    Half,
    /// One beat.
    #[default]
    Quarter,
    /// Half a beat.
    Eighth,
    /// A quarter of a beat.
    Sixteenth,
    /// An eighth of a beat.
    ThirtySecond,
    /// Three beats.
    DottedHalf,
    /// One and a half beats.
    DottedQuarter,
    /// Three quarters of a beat.
    DottedEighth,
    /// Two thirds of a beat.
    TripletQuarter,
    /// A third of a beat.
    TripletEighth,
    /// A sixth of a beat.
    TripletSixteenth,
}

impl NoteDivision {
    /// Cycle rate in Hz of one division at `bpm`.
    ///
    /// ```rust
    /// use resona_core::NoteDivision;
    ///
    /// // Quarter notes at 120 BPM tick twice a second
    /// assert!((NoteDivision::Quarter.to_hz(120.0) - 2.0).abs() < 0.001);
    /// ```
    pub fn to_hz(&self, bpm: f32) -> f32 {
        bpm / 60.0 / self.beats()
    }

    /// Duration in milliseconds of one division at `bpm`.
    pub fn to_ms(&self, bpm: f32) -> f32 {
        self.beats() * 60000.0 / bpm
    }

    /// Length of the division in beats.
    pub fn beats(&self) -> f32 {
        match self {
            NoteDivision::Whole => 4.0,
            NoteDivision::Half => 2.0,
            NoteDivision::Quarter => 1.0,
            NoteDivision::Eighth => 0.5,
            NoteDivision::Sixteenth => 0.25,
            NoteDivision::ThirtySecond => 0.125,
            NoteDivision::DottedHalf => 3.0,
            NoteDivision::DottedQuarter => 1.5,
            NoteDivision::DottedEighth => 0.75,
            NoteDivision::TripletQuarter => 2.0 / 3.0,
            NoteDivision::TripletEighth => 1.0 / 3.0,
            NoteDivision::TripletSixteenth => 1.0 / 6.0,
        }
    }
}
