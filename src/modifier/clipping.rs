use crate::error::{FloraMixError, Result};
use crate::format::AudioFormat;
use crate::modifier::SoundModifier;

/// Hard-clip distortion: drives the signal by a gain of at least 1 and
/// clamps the result to [-1, 1].
pub struct ClippingModifier {
    gain: f32,
}

impl ClippingModifier {
    pub fn new(gain: f32) -> Result<Self> {
        validate_gain(gain)?;
        Ok(Self { gain })
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f32) -> Result<()> {
        validate_gain(gain)?;
        self.gain = gain;
        Ok(())
    }
}

fn validate_gain(gain: f32) -> Result<()> {
    if !(gain.is_finite() && gain >= 1.0) {
        return Err(FloraMixError::Configuration(format!(
            "Clipping gain must be at least 1, got {gain}"
        )));
    }
    Ok(())
}

impl SoundModifier for ClippingModifier {
    fn modify(&mut self, _format: &AudioFormat, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            *sample = (*sample * self.gain).clamp(-1.0, 1.0);
        }
    }
}
