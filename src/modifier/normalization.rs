use crate::error::{FloraMixError, Result};
use crate::format::AudioFormat;
use crate::modifier::SoundModifier;

pub const DEFAULT_DECAY_MILLIS: f32 = 3000.0;

/// Keeps the mix within [-1, 1] by dividing by a running peak.
///
/// The peak rises instantly to the loudest sample seen and decays
/// exponentially with a configurable time constant, so gain recovers
/// smoothly after a loud burst instead of snapping back. Blocks whose
/// running peak is at or below 1 pass through untouched.
pub struct NormalizationModifier {
    decay_millis: f32,
    running_peak: f32,
}

impl NormalizationModifier {
    pub fn new() -> Self {
        Self {
            decay_millis: DEFAULT_DECAY_MILLIS,
            running_peak: 0.0,
        }
    }

    pub fn with_decay(decay_millis: f32) -> Result<Self> {
        if !(decay_millis.is_finite() && decay_millis > 0.0) {
            return Err(FloraMixError::Configuration(format!(
                "Decay duration must be greater than 0, got {decay_millis}"
            )));
        }
        Ok(Self {
            decay_millis,
            running_peak: 0.0,
        })
    }

    pub fn running_peak(&self) -> f32 {
        self.running_peak
    }

    /// Forgets the running peak, e.g. after all sounds were stopped.
    pub fn reset(&mut self) {
        self.running_peak = 0.0;
    }
}

impl Default for NormalizationModifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundModifier for NormalizationModifier {
    fn modify(&mut self, format: &AudioFormat, samples: &mut [f32]) {
        let elapsed_millis = format.sample_count_to_millis(samples.len());
        self.running_peak *= (-elapsed_millis / self.decay_millis).exp();

        let block_peak = samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
        self.running_peak = self.running_peak.max(block_peak);

        if self.running_peak <= 1.0 {
            return;
        }
        let scale = 1.0 / self.running_peak;
        for sample in samples.iter_mut() {
            *sample *= scale;
        }
    }
}
