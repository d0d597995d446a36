use crate::format::AudioFormat;
use crate::modifier::ModifierChain;
use crate::modulator::Oscillator;
use crate::sound::Sound;

/// Plays an [`Oscillator`] as an endless tone, duplicated across all
/// output channels.
pub struct OscillatorSound {
    oscillator: Oscillator,
    modifiers: ModifierChain,
}

impl OscillatorSound {
    pub fn new(oscillator: Oscillator) -> Self {
        Self {
            oscillator,
            modifiers: ModifierChain::new(),
        }
    }

    pub fn oscillator_mut(&mut self) -> &mut Oscillator {
        &mut self.oscillator
    }
}

impl Sound for OscillatorSound {
    fn render(&mut self, format: &AudioFormat, out: &mut [f32]) {
        let channels = format.channels() as usize;
        for frame in out.chunks_exact_mut(channels) {
            frame.fill(self.oscillator.next_value(format.sample_rate()));
        }
        self.modifiers.apply(format, out);
    }

    fn is_finished(&self) -> bool {
        false
    }

    fn modifiers(&self) -> &ModifierChain {
        &self.modifiers
    }
}
