//! Biquad (bi-quadratic) filter with runtime-selectable response type.
//!
//! A second-order IIR section covering the eight classic responses
//! (low-pass through high shelf). Coefficient calculation uses the RBJ
//! Audio EQ Cookbook formulas.

use core::f32::consts::PI;
use libm::{cosf, powf, sinf, sqrtf};

use crate::math::flush_denormal;

/// Output magnitude beyond which the filter is considered diverging.
/// Normal program material through a resonant biquad stays orders of
/// magnitude below this.
const INSTABILITY_LIMIT: f32 = 1.0e6;

/// Filter response types.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterType {
    /// Low-pass: passes below cutoff, -12 dB/oct above.
    #[default]
    LowPass,
    /// High-pass: passes above cutoff, -12 dB/oct below.
    HighPass,
    /// Band-pass with constant 0 dB peak gain at center.
    BandPass,
    /// Notch (band-reject) at center frequency.
    Notch,
    /// All-pass: flat magnitude, frequency-dependent phase shift.
    AllPass,
    /// Peaking EQ: boost/cut around center, gain-controlled.
    Peaking,
    /// Low shelf: boost/cut everything below cutoff.
    LowShelf,
    /// High shelf: boost/cut everything above cutoff.
    HighShelf,
}

/// Second-order IIR filter with parameter-driven coefficient updates.
///
/// Implements the Direct Form I structure:
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
///                - a1*y[n-1] - a2*y[n-2]
/// ```
///
/// Every parameter setter recomputes the coefficients immediately, so
/// the processing loop never observes a stale kernel. If the output
/// diverges (non-finite or beyond a large magnitude bound), the delay
/// lines reset and the offending sample is replaced with silence.
///
/// # Example
///
/// ```rust
/// use resona_core::{BiquadFilter, FilterType};
///
/// let mut filter = BiquadFilter::new(48000.0);
/// filter.set_type(FilterType::LowPass);
/// filter.set_cutoff(1000.0);
/// filter.set_resonance(0.707);
///
/// let out = filter.process(0.5);
/// ```
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    filter_type: FilterType,
    cutoff: f32,
    q: f32,
    gain_db: f32,
    sample_rate: f32,

    // Normalized coefficients
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    // Delay lines: x[n-1], x[n-2], y[n-1], y[n-2]
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,

    instability_resets: u32,
}

impl BiquadFilter {
    /// Create a low-pass filter at 1 kHz, Q = 0.707.
    pub fn new(sample_rate: f32) -> Self {
        let mut filter = Self {
            filter_type: FilterType::LowPass,
            cutoff: 1000.0,
            q: core::f32::consts::FRAC_1_SQRT_2,
            gain_db: 0.0,
            sample_rate,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
            instability_resets: 0,
        };
        filter.update_coefficients();
        filter
    }

    /// Set the response type.
    pub fn set_type(&mut self, filter_type: FilterType) {
        self.filter_type = filter_type;
        self.update_coefficients();
    }

    /// Get the response type.
    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    /// Set cutoff (or center) frequency in Hz.
    ///
    /// Clamped to [10 Hz, 0.49 * sample_rate].
    pub fn set_cutoff(&mut self, freq: f32) {
        self.cutoff = freq.clamp(10.0, self.sample_rate * 0.49);
        self.update_coefficients();
    }

    /// Get cutoff frequency in Hz.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Set Q / resonance. Clamped to [0.05, 30.0].
    pub fn set_resonance(&mut self, q: f32) {
        self.q = q.clamp(0.05, 30.0);
        self.update_coefficients();
    }

    /// Get Q / resonance.
    pub fn resonance(&self) -> f32 {
        self.q
    }

    /// Set gain in dB (Peaking and shelf types only). Clamped to ±24 dB.
    pub fn set_gain_db(&mut self, gain_db: f32) {
        self.gain_db = gain_db.clamp(-24.0, 24.0);
        self.update_coefficients();
    }

    /// Get gain in dB.
    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    /// Set sample rate and recompute coefficients.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        // Re-clamp cutoff against the new Nyquist
        self.cutoff = self.cutoff.clamp(10.0, sample_rate * 0.49);
        self.update_coefficients();
    }

    /// Get sample rate.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Number of times the stability guard has reset the filter state.
    pub fn instability_resets(&self) -> u32 {
        self.instability_resets
    }

    /// Clear the delay lines without touching parameters.
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    /// Process a single sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        if !output.is_finite() || output.abs() > INSTABILITY_LIMIT {
            self.reset();
            self.instability_resets = self.instability_resets.wrapping_add(1);
            #[cfg(feature = "tracing")]
            tracing::warn!(
                filter_type = ?self.filter_type,
                cutoff = self.cutoff,
                q = self.q,
                "biquad diverged, state reset"
            );
            return 0.0;
        }

        let output = flush_denormal(output);

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    /// Process a block of samples.
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        for (out, &sample) in output.iter_mut().zip(input.iter()) {
            *out = self.process(sample);
        }
    }

    fn update_coefficients(&mut self) {
        let (b0, b1, b2, a0, a1, a2) = match self.filter_type {
            FilterType::LowPass => lowpass_coefficients(self.cutoff, self.q, self.sample_rate),
            FilterType::HighPass => highpass_coefficients(self.cutoff, self.q, self.sample_rate),
            FilterType::BandPass => bandpass_coefficients(self.cutoff, self.q, self.sample_rate),
            FilterType::Notch => notch_coefficients(self.cutoff, self.q, self.sample_rate),
            FilterType::AllPass => allpass_coefficients(self.cutoff, self.q, self.sample_rate),
            FilterType::Peaking => {
                peaking_coefficients(self.cutoff, self.q, self.gain_db, self.sample_rate)
            }
            FilterType::LowShelf => {
                low_shelf_coefficients(self.cutoff, self.q, self.gain_db, self.sample_rate)
            }
            FilterType::HighShelf => {
                high_shelf_coefficients(self.cutoff, self.q, self.gain_db, self.sample_rate)
            }
        };

        // Normalize by a0
        let a0_inv = 1.0 / a0;
        self.b0 = b0 * a0_inv;
        self.b1 = b1 * a0_inv;
        self.b2 = b2 * a0_inv;
        self.a1 = a1 * a0_inv;
        self.a2 = a2 * a0_inv;
    }
}

impl Default for BiquadFilter {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

#[inline]
fn omega_terms(frequency: f32, q: f32, sample_rate: f32) -> (f32, f32, f32) {
    let omega = 2.0 * PI * frequency / sample_rate;
    let cos_omega = cosf(omega);
    let sin_omega = sinf(omega);
    let alpha = sin_omega / (2.0 * q);
    (cos_omega, sin_omega, alpha)
}

/// RBJ low-pass coefficients: (b0, b1, b2, a0, a1, a2), unnormalized.
pub fn lowpass_coefficients(
    frequency: f32,
    q: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let (cos_omega, _, alpha) = omega_terms(frequency, q, sample_rate);

    let b0 = (1.0 - cos_omega) / 2.0;
    let b1 = 1.0 - cos_omega;
    let b2 = (1.0 - cos_omega) / 2.0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_omega;
    let a2 = 1.0 - alpha;

    (b0, b1, b2, a0, a1, a2)
}

/// RBJ high-pass coefficients.
pub fn highpass_coefficients(
    frequency: f32,
    q: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let (cos_omega, _, alpha) = omega_terms(frequency, q, sample_rate);

    let b0 = (1.0 + cos_omega) / 2.0;
    let b1 = -(1.0 + cos_omega);
    let b2 = (1.0 + cos_omega) / 2.0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_omega;
    let a2 = 1.0 - alpha;

    (b0, b1, b2, a0, a1, a2)
}

/// RBJ band-pass coefficients (constant 0 dB peak gain).
pub fn bandpass_coefficients(
    frequency: f32,
    q: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let (cos_omega, _, alpha) = omega_terms(frequency, q, sample_rate);

    let b0 = alpha;
    let b1 = 0.0;
    let b2 = -alpha;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_omega;
    let a2 = 1.0 - alpha;

    (b0, b1, b2, a0, a1, a2)
}

/// RBJ notch (band-reject) coefficients.
pub fn notch_coefficients(
    frequency: f32,
    q: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let (cos_omega, _, alpha) = omega_terms(frequency, q, sample_rate);

    let b0 = 1.0;
    let b1 = -2.0 * cos_omega;
    let b2 = 1.0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_omega;
    let a2 = 1.0 - alpha;

    (b0, b1, b2, a0, a1, a2)
}

/// RBJ all-pass coefficients. Unity magnitude at all frequencies; phase
/// crosses -180° at the center frequency.
pub fn allpass_coefficients(
    frequency: f32,
    q: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let (cos_omega, _, alpha) = omega_terms(frequency, q, sample_rate);

    let b0 = 1.0 - alpha;
    let b1 = -2.0 * cos_omega;
    let b2 = 1.0 + alpha;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_omega;
    let a2 = 1.0 - alpha;

    (b0, b1, b2, a0, a1, a2)
}

/// RBJ peaking EQ coefficients.
pub fn peaking_coefficients(
    frequency: f32,
    q: f32,
    gain_db: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let a = powf(10.0, gain_db / 40.0); // sqrt(10^(dB/20))
    let (cos_omega, _, alpha) = omega_terms(frequency, q, sample_rate);

    let b0 = 1.0 + alpha * a;
    let b1 = -2.0 * cos_omega;
    let b2 = 1.0 - alpha * a;
    let a0 = 1.0 + alpha / a;
    let a1 = -2.0 * cos_omega;
    let a2 = 1.0 - alpha / a;

    (b0, b1, b2, a0, a1, a2)
}

/// RBJ low-shelf coefficients.
pub fn low_shelf_coefficients(
    frequency: f32,
    q: f32,
    gain_db: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let a = powf(10.0, gain_db / 40.0);
    let (cos_omega, _, alpha) = omega_terms(frequency, q, sample_rate);
    let beta = 2.0 * sqrtf(a) * alpha;

    let b0 = a * ((a + 1.0) - (a - 1.0) * cos_omega + beta);
    let b1 = 2.0 * a * ((a - 1.0) - (a + 1.0) * cos_omega);
    let b2 = a * ((a + 1.0) - (a - 1.0) * cos_omega - beta);
    let a0 = (a + 1.0) + (a - 1.0) * cos_omega + beta;
    let a1 = -2.0 * ((a - 1.0) + (a + 1.0) * cos_omega);
    let a2 = (a + 1.0) + (a - 1.0) * cos_omega - beta;

    (b0, b1, b2, a0, a1, a2)
}

/// RBJ high-shelf coefficients.
pub fn high_shelf_coefficients(
    frequency: f32,
    q: f32,
    gain_db: f32,
    sample_rate: f32,
) -> (f32, f32, f32, f32, f32, f32) {
    let a = powf(10.0, gain_db / 40.0);
    let (cos_omega, _, alpha) = omega_terms(frequency, q, sample_rate);
    let beta = 2.0 * sqrtf(a) * alpha;

    let b0 = a * ((a + 1.0) + (a - 1.0) * cos_omega + beta);
    let b1 = -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega);
    let b2 = a * ((a + 1.0) + (a - 1.0) * cos_omega - beta);
    let a0 = (a + 1.0) - (a - 1.0) * cos_omega + beta;
    let a1 = 2.0 * ((a - 1.0) - (a + 1.0) * cos_omega);
    let a2 = (a + 1.0) - (a - 1.0) * cos_omega - beta;

    (b0, b1, b2, a0, a1, a2)
}
