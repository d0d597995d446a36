//! In-place effects applied to rendered blocks
//!
//! A [`SoundModifier`] rewrites a block of interleaved samples in place.
//! Modifiers are stored behind `Arc<Mutex<..>>` so the same instance can be
//! held both inside a [`ModifierChain`] and as a typed handle for runtime
//! control.

mod bass_boost;
mod bit_crush;
mod chain;
mod clipping;
mod normalization;
mod panning;
mod spatial;
mod volume;

pub use bass_boost::BassBoostModifier;
pub use bit_crush::BitCrushModifier;
pub use chain::ModifierChain;
pub use clipping::ClippingModifier;
pub use normalization::NormalizationModifier;
pub use panning::PanningModifier;
pub use spatial::SpatialModifier;
pub use volume::VolumeModifier;

use crate::format::AudioFormat;
use std::sync::{Arc, Mutex};

/// Stateful in-place transform over a block of interleaved samples.
pub trait SoundModifier: Send {
    fn modify(&mut self, format: &AudioFormat, samples: &mut [f32]);
}

/// Shared handle to a modifier; chain membership is by handle identity.
pub type SharedModifier = Arc<Mutex<dyn SoundModifier>>;

pub fn shared_modifier<M: SoundModifier + 'static>(modifier: M) -> SharedModifier {
    Arc::new(Mutex::new(modifier))
}
