use crate::error::{FloraMixError, Result};
use crate::format::AudioFormat;
use crate::modifier::SoundModifier;
use std::f32::consts::TAU;

/// Boosts low frequencies by adding a scaled one-pole lowpass of the signal
/// back onto it. Filter state is kept per channel and persists across
/// blocks so the boost stays continuous at block boundaries.
pub struct BassBoostModifier {
    cutoff_hz: f32,
    factor: f32,
    lowpass: Vec<f32>,
}

impl BassBoostModifier {
    pub fn new(cutoff_hz: f32, factor: f32) -> Result<Self> {
        if !(cutoff_hz.is_finite() && cutoff_hz > 0.0) {
            return Err(FloraMixError::Configuration(format!(
                "Cutoff frequency must be greater than 0, got {cutoff_hz}"
            )));
        }
        if !(factor.is_finite() && factor >= 0.0) {
            return Err(FloraMixError::Configuration(format!(
                "Boost factor must not be negative, got {factor}"
            )));
        }
        Ok(Self {
            cutoff_hz,
            factor,
            lowpass: Vec::new(),
        })
    }

    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }

    pub fn set_factor(&mut self, factor: f32) -> Result<()> {
        if !(factor.is_finite() && factor >= 0.0) {
            return Err(FloraMixError::Configuration(format!(
                "Boost factor must not be negative, got {factor}"
            )));
        }
        self.factor = factor;
        Ok(())
    }
}

impl SoundModifier for BassBoostModifier {
    fn modify(&mut self, format: &AudioFormat, samples: &mut [f32]) {
        let channels = format.channels() as usize;
        if self.lowpass.len() != channels {
            self.lowpass = vec![0.0; channels];
        }

        let rc = 1.0 / (TAU * self.cutoff_hz);
        let dt = 1.0 / format.sample_rate();
        let alpha = dt / (rc + dt);

        for frame in samples.chunks_exact_mut(channels) {
            for (sample, lowpass) in frame.iter_mut().zip(self.lowpass.iter_mut()) {
                *lowpass += alpha * (*sample - *lowpass);
                *sample += *lowpass * self.factor;
            }
        }
    }
}
