//! Real-time software audio mixer.
//!
//! Sounds wrap PCM sources or oscillators and are composed on [`MixBus`]
//! graphs; each node carries a [`ModifierChain`](modifier::ModifierChain)
//! of in-place effects. The [`AudioMixer`] renders blocks on demand, while
//! the [`StreamingAudioMixer`] drives rendering from a scheduler thread
//! and streams the result to an [`AudioSink`] through a bounded ring.
//!
//! ```no_run
//! use floramix::format::AudioFormat;
//! use floramix::mixer::AudioMixer;
//! use floramix::pcm::MonoStaticSource;
//! use floramix::sound::{MonoSound, shared_sound};
//!
//! # fn main() -> floramix::Result<()> {
//! let mixer = AudioMixer::new(AudioFormat::stereo(48000.0)?);
//! let source = MonoStaticSource::new(vec![0.0; 48000])?;
//! mixer.play_sound(shared_sound(MonoSound::new(Box::new(source))));
//! let block = mixer.mix_millis(20.0);
//! # let _ = block;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod format;
pub mod interpolate;
pub mod math;
pub mod mixer;
pub mod modifier;
pub mod modulator;
pub mod pcm;
pub mod ring;
pub mod sink;
pub mod sound;
pub mod stream;

pub use error::{FloraMixError, Result};
pub use format::AudioFormat;
pub use interpolate::Interpolator;
pub use mixer::AudioMixer;
pub use sink::{AudioSink, SinkWriter};
pub use sound::{MixBus, Sound, ThreadedMixBus};
pub use stream::{OverrunPolicy, StreamConfig, StreamingAudioMixer};
