//! The sound graph: playable leaves and mix buses
//!
//! A [`Sound`] renders interleaved blocks in the mixer's output format and
//! carries its own [`ModifierChain`]. Leaves wrap PCM sources or
//! oscillators; [`MixBus`] composes child sounds (including nested buses)
//! into one signal.

mod mix;
mod oscillator;
mod pcm;
mod threaded;

pub use mix::{DEFAULT_MAX_SOUNDS, MAX_BUS_CAPACITY, MixBus};
pub use oscillator::OscillatorSound;
pub use pcm::{MonoSound, PannedMonoSound, StereoSound};
pub use threaded::ThreadedMixBus;

use crate::format::AudioFormat;
use crate::modifier::ModifierChain;
use std::sync::{Arc, Mutex};

/// A node in the mix graph.
///
/// `render` must fully overwrite `out` with `out.len() / channels` frames
/// in the given format, and must not fail: a sound that can no longer
/// produce audio writes silence and reports itself finished.
pub trait Sound: Send {
    fn render(&mut self, format: &AudioFormat, out: &mut [f32]);

    /// Finished sounds are pruned from their bus after the next render.
    fn is_finished(&self) -> bool;

    /// Effects applied to this sound's output, after rendering.
    fn modifiers(&self) -> &ModifierChain;
}

/// Shared handle to a sound; bus membership is by handle identity.
pub type SharedSound = Arc<Mutex<dyn Sound>>;

pub fn shared_sound<S: Sound + 'static>(sound: S) -> SharedSound {
    Arc::new(Mutex::new(sound))
}
