use crate::error::{FloraMixError, Result};
use crate::format::AudioFormat;
use crate::modifier::SoundModifier;

/// Constant-sum stereo balance. Pan is given in [-1, 1] (-1 hard left,
/// 0 center, 1 hard right) and stored as the right-channel weight in
/// [0, 1]; the left channel gets the complement.
pub struct PanningModifier {
    right_weight: f32,
}

impl PanningModifier {
    pub fn new(pan: f32) -> Result<Self> {
        let mut modifier = Self { right_weight: 0.5 };
        modifier.set_pan(pan)?;
        Ok(modifier)
    }

    pub fn pan(&self) -> f32 {
        self.right_weight * 2.0 - 1.0
    }

    pub fn set_pan(&mut self, pan: f32) -> Result<()> {
        if !(pan.is_finite() && (-1.0..=1.0).contains(&pan)) {
            return Err(FloraMixError::Configuration(format!(
                "Pan must be between -1 and 1, got {pan}"
            )));
        }
        self.right_weight = (pan + 1.0) / 2.0;
        Ok(())
    }
}

impl SoundModifier for PanningModifier {
    fn modify(&mut self, format: &AudioFormat, samples: &mut [f32]) {
        if format.channels() != 2 {
            log::error!(
                "Panning requires a stereo block, got {} channel(s)",
                format.channels()
            );
            return;
        }
        let left_weight = 1.0 - self.right_weight;
        for frame in samples.chunks_exact_mut(2) {
            frame[0] *= left_weight;
            frame[1] *= self.right_weight;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_pan() {
        assert!(PanningModifier::new(-1.5).is_err());
        assert!(PanningModifier::new(f32::NAN).is_err());
    }

    #[test]
    fn hard_left_silences_right() {
        let format = AudioFormat::stereo(48000.0).unwrap();
        let mut modifier = PanningModifier::new(-1.0).unwrap();
        let mut samples = [1.0f32, 1.0, 0.5, 0.5];
        modifier.modify(&format, &mut samples);
        assert_eq!(samples, [1.0, 0.0, 0.5, 0.0]);
    }

    #[test]
    fn center_splits_evenly() {
        let format = AudioFormat::stereo(48000.0).unwrap();
        let mut modifier = PanningModifier::new(0.0).unwrap();
        let mut samples = [1.0f32, 1.0];
        modifier.modify(&format, &mut samples);
        assert_eq!(samples, [0.5, 0.5]);
    }

    #[test]
    fn mono_block_is_left_untouched() {
        let format = AudioFormat::mono(48000.0).unwrap();
        let mut modifier = PanningModifier::new(1.0).unwrap();
        let mut samples = [0.7f32, 0.7];
        modifier.modify(&format, &mut samples);
        assert_eq!(samples, [0.7, 0.7]);
    }
}
