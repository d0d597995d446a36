//! Offline mixer: pull rendered audio on the caller's thread

use crate::error::Result;
use crate::format::AudioFormat;
use crate::modifier::ModifierChain;
use crate::sound::{MixBus, SharedSound, Sound as _};

/// Renders a root [`MixBus`] on demand, one block per call.
///
/// Nothing runs in the background; callers drive time by asking for
/// frames. Cloning yields another handle to the same mixer.
#[derive(Clone)]
pub struct AudioMixer {
    format: AudioFormat,
    root: MixBus,
}

impl AudioMixer {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            root: MixBus::default(),
        }
    }

    pub fn with_capacity(format: AudioFormat, max_sounds: usize) -> Result<Self> {
        Ok(Self {
            format,
            root: MixBus::new(max_sounds)?,
        })
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    pub fn root(&self) -> &MixBus {
        &self.root
    }

    pub fn play_sound(&self, sound: SharedSound) {
        self.root.play_sound(sound);
    }

    pub fn stop_sound(&self, sound: &SharedSound) -> bool {
        self.root.stop_sound(sound)
    }

    pub fn stop_all_sounds(&self) {
        self.root.stop_all_sounds();
    }

    /// Master modifier chain, applied to the summed mix.
    pub fn modifiers(&self) -> &ModifierChain {
        self.root.modifiers()
    }

    /// Renders the next `frame_count` frames of interleaved audio.
    pub fn mix(&self, frame_count: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; frame_count * self.format.channels() as usize];
        self.root.render_into(&self.format, &mut out);
        out
    }

    /// Renders the next `millis` worth of audio, rounded up to whole
    /// frames.
    pub fn mix_millis(&self, millis: f32) -> Vec<f32> {
        self.mix(self.format.millis_to_frame_count(millis))
    }

    pub fn active_sounds(&self) -> usize {
        self.root.active_sounds()
    }

    pub fn mixed_sounds(&self) -> usize {
        self.root.mixed_sounds()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcm::MonoStaticSource;
    use crate::sound::{MonoSound, shared_sound};

    #[test]
    fn mixes_on_demand() {
        let mixer = AudioMixer::new(AudioFormat::stereo(48000.0).unwrap());
        let source = MonoStaticSource::new(vec![0.5; 480]).unwrap();
        mixer.play_sound(shared_sound(MonoSound::new(Box::new(source))));

        let block = mixer.mix(480);
        assert_eq!(block.len(), 960);
        assert!(block.iter().all(|&s| s == 0.5));
        assert_eq!(mixer.active_sounds(), 0);
    }

    #[test]
    fn mix_millis_rounds_up_to_whole_frames() {
        let mixer = AudioMixer::new(AudioFormat::mono(44100.0).unwrap());
        let block = mixer.mix_millis(10.0);
        assert_eq!(block.len(), 441);
    }

    #[test]
    fn silence_when_nothing_plays() {
        let mixer = AudioMixer::new(AudioFormat::mono(48000.0).unwrap());
        assert!(mixer.mix(64).iter().all(|&s| s == 0.0));
        assert_eq!(mixer.mixed_sounds(), 0);
    }
}
