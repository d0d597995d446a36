//! Scalar parameter animation: value modifiers and oscillators
//!
//! A [`ValueModifier`] transforms one scalar (pitch, volume, frequency) per
//! consumed sample. Oscillators are additive modulators carrying their own
//! phase accumulator state.

use crate::error::{FloraMixError, Result};
use crate::math::fast_sin;
use std::f64::consts::TAU;

/// Per-sample transform of a scalar parameter. `sample_rate` is the rate at
/// which the modifier is being evaluated, used to advance time-based state.
pub trait ValueModifier: Send {
    fn modify(&mut self, value: f32, sample_rate: f32) -> f32;
}

/// Multiplies the input by a fixed factor.
pub struct MultiplyValueModifier {
    factor: f32,
}

impl MultiplyValueModifier {
    pub fn new(factor: f32) -> Self {
        Self { factor }
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }

    pub fn set_factor(&mut self, factor: f32) {
        self.factor = factor;
    }
}

impl ValueModifier for MultiplyValueModifier {
    fn modify(&mut self, value: f32, _sample_rate: f32) -> f32 {
        value * self.factor
    }
}

/// Ramps a multiplier linearly from `start` to `end` over a fixed duration,
/// then holds `end`. Progress advances by one sample per evaluation.
pub struct SlidingMultiplyValueModifier {
    start: f32,
    end: f32,
    duration_millis: f32,
    elapsed_millis: f32,
}

impl SlidingMultiplyValueModifier {
    pub fn new(start: f32, end: f32, duration_millis: f32) -> Result<Self> {
        if !(duration_millis.is_finite() && duration_millis > 0.0) {
            return Err(FloraMixError::Configuration(
                "Duration must be greater than 0".into(),
            ));
        }
        Ok(Self {
            start,
            end,
            duration_millis,
            elapsed_millis: 0.0,
        })
    }

    pub fn progress(&self) -> f32 {
        self.elapsed_millis / self.duration_millis
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed_millis >= self.duration_millis
    }

    pub fn reset_progress(&mut self) {
        self.elapsed_millis = 0.0;
    }
}

impl ValueModifier for SlidingMultiplyValueModifier {
    fn modify(&mut self, value: f32, sample_rate: f32) -> f32 {
        let progress = self.progress();
        let factor = self.start + (self.end - self.start) * progress;
        self.elapsed_millis = (self.elapsed_millis + 1000.0 / sample_rate).min(self.duration_millis);
        value * factor
    }
}

/// Periodic waveform shapes for [`Oscillator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sine,
    /// `duty_cycle` is the fraction of each period spent high, in (0, 1).
    Square { duty_cycle: f32 },
    Sawtooth,
    Triangle,
    Noise,
}

/// Waveform generator driven by a normalized phase accumulator, usable both
/// as a raw audio source and (via [`ValueModifier`]) as an additive
/// modulator scaled by `multiplier`.
pub struct Oscillator {
    waveform: Waveform,
    frequency: f32,
    multiplier: f32,
    phase: f64,
    frequency_modulator: Option<Box<dyn ValueModifier>>,
    rng: fastrand::Rng,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f32) -> Result<Self> {
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(FloraMixError::Configuration(format!(
                "Frequency must be greater than 0, got {frequency}"
            )));
        }
        if let Waveform::Square { duty_cycle } = waveform {
            if !(duty_cycle > 0.0 && duty_cycle < 1.0) {
                return Err(FloraMixError::Configuration(
                    "Duty cycle must be between 0 and 1 (exclusive)".into(),
                ));
            }
        }
        Ok(Self {
            waveform,
            frequency,
            multiplier: 1.0,
            phase: 0.0,
            frequency_modulator: None,
            rng: fastrand::Rng::new(),
        })
    }

    pub fn sine(frequency: f32) -> Result<Self> {
        Self::new(Waveform::Sine, frequency)
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn set_frequency(&mut self, frequency: f32) -> Result<()> {
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(FloraMixError::Configuration(format!(
                "Frequency must be greater than 0, got {frequency}"
            )));
        }
        self.frequency = frequency;
        Ok(())
    }

    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    /// Scales the oscillator's contribution when used as a modulator.
    pub fn set_multiplier(&mut self, multiplier: f32) {
        self.multiplier = multiplier;
    }

    pub fn set_frequency_modulator(&mut self, modulator: Option<Box<dyn ValueModifier>>) {
        self.frequency_modulator = modulator;
    }

    /// Produces the next waveform value in [-1, 1] and advances the phase.
    pub fn next_value(&mut self, sample_rate: f32) -> f32 {
        let value = match self.waveform {
            Waveform::Sine => fast_sin(TAU * self.phase) as f32,
            Waveform::Square { duty_cycle } => {
                if (self.phase as f32) < duty_cycle {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => (2.0 * self.phase - 1.0) as f32,
            Waveform::Triangle => (2.0 * (2.0 * self.phase - 1.0).abs() - 1.0) as f32,
            Waveform::Noise => self.rng.f32() * 2.0 - 1.0,
        };

        let frequency = match &mut self.frequency_modulator {
            Some(modulator) => modulator.modify(self.frequency, sample_rate).max(1e-4),
            None => self.frequency,
        };
        self.phase += frequency as f64 / sample_rate as f64;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        value
    }
}

impl ValueModifier for Oscillator {
    fn modify(&mut self, value: f32, sample_rate: f32) -> f32 {
        value + self.next_value(sample_rate) * self.multiplier
    }
}
