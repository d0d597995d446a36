use crate::error::{FloraMixError, Result};
use crate::format::AudioFormat;
use crate::modifier::SoundModifier;

/// Sample-and-hold downsampling: every `interval`-th frame is sampled and
/// held for the frames in between, lowering the effective sample rate. The
/// hold counter carries across blocks.
pub struct BitCrushModifier {
    interval: f32,
    counter: f32,
    held: Vec<f32>,
}

impl BitCrushModifier {
    pub fn new(interval: f32) -> Result<Self> {
        validate_interval(interval)?;
        Ok(Self {
            interval,
            counter: f32::MAX,
            held: Vec::new(),
        })
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    pub fn set_interval(&mut self, interval: f32) -> Result<()> {
        validate_interval(interval)?;
        self.interval = interval;
        Ok(())
    }
}

fn validate_interval(interval: f32) -> Result<()> {
    if !(interval.is_finite() && interval >= 1.0) {
        return Err(FloraMixError::Configuration(format!(
            "Hold interval must be at least 1, got {interval}"
        )));
    }
    Ok(())
}

impl SoundModifier for BitCrushModifier {
    fn modify(&mut self, format: &AudioFormat, samples: &mut [f32]) {
        let channels = format.channels() as usize;
        if self.held.len() != channels {
            self.held = vec![0.0; channels];
            self.counter = f32::MAX;
        }

        for frame in samples.chunks_exact_mut(channels) {
            self.counter += 1.0;
            if self.counter >= self.interval {
                self.counter %= self.interval;
                self.held.copy_from_slice(frame);
            } else {
                frame.copy_from_slice(&self.held);
            }
        }
    }
}
