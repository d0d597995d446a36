use crate::error::{FloraMixError, Result};
use crate::format::AudioFormat;
use crate::modifier::SoundModifier;
use crate::modulator::ValueModifier;

/// Scales every sample by a volume in [0, 1], optionally animated per
/// sample by a [`ValueModifier`] whose output is clamped back into range.
pub struct VolumeModifier {
    volume: f32,
    modulator: Option<Box<dyn ValueModifier>>,
}

impl VolumeModifier {
    pub fn new(volume: f32) -> Result<Self> {
        validate_volume(volume)?;
        Ok(Self {
            volume,
            modulator: None,
        })
    }

    pub fn with_modulator(volume: f32, modulator: Box<dyn ValueModifier>) -> Result<Self> {
        validate_volume(volume)?;
        Ok(Self {
            volume,
            modulator: Some(modulator),
        })
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        validate_volume(volume)?;
        self.volume = volume;
        Ok(())
    }

    pub fn set_modulator(&mut self, modulator: Option<Box<dyn ValueModifier>>) {
        self.modulator = modulator;
    }
}

fn validate_volume(volume: f32) -> Result<()> {
    if !(volume.is_finite() && (0.0..=1.0).contains(&volume)) {
        return Err(FloraMixError::Configuration(format!(
            "Volume must be between 0 and 1, got {volume}"
        )));
    }
    Ok(())
}

impl SoundModifier for VolumeModifier {
    fn modify(&mut self, format: &AudioFormat, samples: &mut [f32]) {
        match &mut self.modulator {
            Some(modulator) => {
                for sample in samples.iter_mut() {
                    let volume = modulator
                        .modify(self.volume, format.sample_rate())
                        .clamp(0.0, 1.0);
                    *sample *= volume;
                }
            }
            None => {
                if self.volume == 1.0 {
                    return;
                }
                for sample in samples.iter_mut() {
                    *sample *= self.volume;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulator::MultiplyValueModifier;

    #[test]
    fn rejects_out_of_range_volume() {
        assert!(VolumeModifier::new(-0.1).is_err());
        assert!(VolumeModifier::new(1.1).is_err());
        assert!(VolumeModifier::new(f32::NAN).is_err());
    }

    #[test]
    fn scales_samples() {
        let format = AudioFormat::mono(48000.0).unwrap();
        let mut modifier = VolumeModifier::new(0.5).unwrap();
        let mut samples = [1.0f32, -0.5, 0.25];
        modifier.modify(&format, &mut samples);
        assert_eq!(samples, [0.5, -0.25, 0.125]);
    }

    #[test]
    fn modulated_volume_is_clamped() {
        let format = AudioFormat::mono(48000.0).unwrap();
        // Doubling a full volume would exceed 1; the clamp keeps it at 1
        let mut modifier = VolumeModifier::with_modulator(
            1.0,
            Box::new(MultiplyValueModifier::new(2.0)),
        )
        .unwrap();
        let mut samples = [0.5f32; 4];
        modifier.modify(&format, &mut samples);
        assert_eq!(samples, [0.5; 4]);
    }
}
