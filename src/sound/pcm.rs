use crate::error::{FloraMixError, Result};
use crate::format::AudioFormat;
use crate::modifier::ModifierChain;
use crate::modulator::ValueModifier;
use crate::pcm::{MonoPcmSource, StereoPcmSource};
use crate::sound::Sound;

fn validate_pitch(pitch: f32) -> Result<()> {
    if !(pitch.is_finite() && pitch > 0.0) {
        return Err(FloraMixError::Configuration(format!(
            "Pitch must be greater than 0, got {pitch}"
        )));
    }
    Ok(())
}

fn validate_volume(volume: f32) -> Result<()> {
    if !(volume.is_finite() && (0.0..=1.0).contains(&volume)) {
        return Err(FloraMixError::Configuration(format!(
            "Volume must be between 0 and 1, got {volume}"
        )));
    }
    Ok(())
}

/// Plays a mono source, duplicating its samples across however many output
/// channels the mixer runs at. Pitch is the per-frame read increment and
/// can be animated by a [`ValueModifier`].
pub struct MonoSound {
    source: Box<dyn MonoPcmSource>,
    pitch: f32,
    pitch_modulator: Option<Box<dyn ValueModifier>>,
    modifiers: ModifierChain,
}

impl MonoSound {
    pub fn new(source: Box<dyn MonoPcmSource>) -> Self {
        Self {
            source,
            pitch: 1.0,
            pitch_modulator: None,
            modifiers: ModifierChain::new(),
        }
    }

    pub fn with_pitch(source: Box<dyn MonoPcmSource>, pitch: f32) -> Result<Self> {
        validate_pitch(pitch)?;
        let mut sound = Self::new(source);
        sound.pitch = pitch;
        Ok(sound)
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn set_pitch(&mut self, pitch: f32) -> Result<()> {
        validate_pitch(pitch)?;
        self.pitch = pitch;
        Ok(())
    }

    pub fn set_pitch_modulator(&mut self, modulator: Option<Box<dyn ValueModifier>>) {
        self.pitch_modulator = modulator;
    }
}

impl Sound for MonoSound {
    fn render(&mut self, format: &AudioFormat, out: &mut [f32]) {
        let channels = format.channels() as usize;
        if self.pitch == 1.0 && self.pitch_modulator.is_none() && channels == 1 {
            let written = self.source.consume_samples(out);
            out[written..].fill(0.0);
        } else {
            for frame in out.chunks_exact_mut(channels) {
                let increment = match &mut self.pitch_modulator {
                    Some(modulator) => {
                        modulator.modify(self.pitch, format.sample_rate()).max(0.0)
                    }
                    None => self.pitch,
                };
                frame.fill(self.source.consume_sample(increment));
            }
        }
        self.modifiers.apply(format, out);
    }

    fn is_finished(&self) -> bool {
        self.source.has_reached_end()
    }

    fn modifiers(&self) -> &ModifierChain {
        &self.modifiers
    }
}

/// A mono source with built-in volume and stereo placement, cheaper than a
/// [`MonoSound`] with a panning modifier because the weights are baked into
/// the render loop.
pub struct PannedMonoSound {
    source: Box<dyn MonoPcmSource>,
    pitch: f32,
    volume: f32,
    right_weight: f32,
    modifiers: ModifierChain,
}

impl PannedMonoSound {
    pub fn new(source: Box<dyn MonoPcmSource>, pitch: f32, volume: f32, pan: f32) -> Result<Self> {
        validate_pitch(pitch)?;
        validate_volume(volume)?;
        if !(pan.is_finite() && (-1.0..=1.0).contains(&pan)) {
            return Err(FloraMixError::Configuration(format!(
                "Pan must be between -1 and 1, got {pan}"
            )));
        }
        Ok(Self {
            source,
            pitch,
            volume,
            right_weight: (pan + 1.0) / 2.0,
            modifiers: ModifierChain::new(),
        })
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        validate_volume(volume)?;
        self.volume = volume;
        Ok(())
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

impl Sound for PannedMonoSound {
    fn render(&mut self, format: &AudioFormat, out: &mut [f32]) {
        if format.channels() == 2 {
            let left = (1.0 - self.right_weight) * self.volume;
            let right = self.right_weight * self.volume;
            for frame in out.chunks_exact_mut(2) {
                let sample = self.source.consume_sample(self.pitch);
                frame[0] = sample * left;
                frame[1] = sample * right;
            }
        } else {
            for sample in out.iter_mut() {
                *sample = self.source.consume_sample(self.pitch) * self.volume;
            }
        }
        self.modifiers.apply(format, out);
    }

    fn is_finished(&self) -> bool {
        self.source.has_reached_end()
    }

    fn modifiers(&self) -> &ModifierChain {
        &self.modifiers
    }
}

/// Plays a stereo source. Rendering into a mono mixer averages the two
/// channels.
pub struct StereoSound {
    source: Box<dyn StereoPcmSource>,
    pitch: f32,
    modifiers: ModifierChain,
}

impl StereoSound {
    pub fn new(source: Box<dyn StereoPcmSource>) -> Self {
        Self {
            source,
            pitch: 1.0,
            modifiers: ModifierChain::new(),
        }
    }

    pub fn with_pitch(source: Box<dyn StereoPcmSource>, pitch: f32) -> Result<Self> {
        validate_pitch(pitch)?;
        let mut sound = Self::new(source);
        sound.pitch = pitch;
        Ok(sound)
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn set_pitch(&mut self, pitch: f32) -> Result<()> {
        validate_pitch(pitch)?;
        self.pitch = pitch;
        Ok(())
    }
}

impl Sound for StereoSound {
    fn render(&mut self, format: &AudioFormat, out: &mut [f32]) {
        if format.channels() == 2 {
            if self.pitch == 1.0 {
                let written = self.source.consume_samples(out);
                out[written..].fill(0.0);
            } else {
                for frame in out.chunks_exact_mut(2) {
                    let [left, right] = self.source.consume_frame(self.pitch);
                    frame[0] = left;
                    frame[1] = right;
                }
            }
        } else {
            for sample in out.iter_mut() {
                let [left, right] = self.source.consume_frame(self.pitch);
                *sample = (left + right) / 2.0;
            }
        }
        self.modifiers.apply(format, out);
    }

    fn is_finished(&self) -> bool {
        self.source.has_reached_end()
    }

    fn modifiers(&self) -> &ModifierChain {
        &self.modifiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcm::{MonoStaticSource, StereoStaticSource};

    #[test]
    fn mono_sound_duplicates_across_stereo_output() {
        let source = MonoStaticSource::new(vec![0.25, 0.5]).unwrap();
        let mut sound = MonoSound::new(Box::new(source));
        let format = AudioFormat::stereo(48000.0).unwrap();
        let mut out = [0.0f32; 4];
        sound.render(&format, &mut out);
        assert_eq!(out, [0.25, 0.25, 0.5, 0.5]);
        assert!(sound.is_finished());
    }

    #[test]
    fn mono_sound_pads_tail_with_silence() {
        let source = MonoStaticSource::new(vec![1.0]).unwrap();
        let mut sound = MonoSound::new(Box::new(source));
        let format = AudioFormat::mono(48000.0).unwrap();
        let mut out = [9.0f32; 4];
        sound.render(&format, &mut out);
        assert_eq!(out, [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn doubled_pitch_finishes_in_half_the_frames() {
        let source = MonoStaticSource::new(vec![0.5; 100]).unwrap();
        let mut sound = MonoSound::with_pitch(Box::new(source), 2.0).unwrap();
        let format = AudioFormat::mono(48000.0).unwrap();
        let mut frames = 0;
        let mut out = [0.0f32; 10];
        while !sound.is_finished() {
            sound.render(&format, &mut out);
            frames += out.len();
        }
        assert_eq!(frames, 50);
    }

    #[test]
    fn panned_sound_hard_left() {
        let source = MonoStaticSource::new(vec![1.0; 2]).unwrap();
        let mut sound = PannedMonoSound::new(Box::new(source), 1.0, 1.0, -1.0).unwrap();
        let format = AudioFormat::stereo(48000.0).unwrap();
        let mut out = [0.0f32; 4];
        sound.render(&format, &mut out);
        assert_eq!(out, [1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn panned_sound_rejects_invalid_parameters() {
        let source = || Box::new(MonoStaticSource::new(vec![0.0]).unwrap());
        assert!(PannedMonoSound::new(source(), 0.0, 1.0, 0.0).is_err());
        assert!(PannedMonoSound::new(source(), 1.0, 1.5, 0.0).is_err());
        assert!(PannedMonoSound::new(source(), 1.0, 1.0, 2.0).is_err());
    }

    #[test]
    fn stereo_sound_downmixes_to_mono() {
        let source = StereoStaticSource::new(vec![1.0, 0.0, 0.0, 0.5]).unwrap();
        let mut sound = StereoSound::new(Box::new(source));
        let format = AudioFormat::mono(48000.0).unwrap();
        let mut out = [0.0f32; 2];
        sound.render(&format, &mut out);
        assert_eq!(out, [0.5, 0.25]);
    }
}
