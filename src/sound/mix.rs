use crate::error::{FloraMixError, Result};
use crate::format::AudioFormat;
use crate::modifier::ModifierChain;
use crate::sound::{SharedSound, Sound};
use std::sync::{Arc, Mutex, PoisonError};

pub const DEFAULT_MAX_SOUNDS: usize = 512;
pub const MAX_BUS_CAPACITY: usize = 65535;

struct BusState {
    sounds: Vec<SharedSound>,
    max_sounds: usize,
    mixed_sounds: usize,
}

/// Sums child sounds into one signal and applies its own modifier chain to
/// the result.
///
/// Children are kept in playback order; when the bus is full, the oldest
/// sound is evicted to make room. Finished children are pruned after each
/// render. Cloning yields another handle to the same bus, and a bus is
/// itself a [`Sound`], so buses nest.
#[derive(Clone)]
pub struct MixBus {
    state: Arc<Mutex<BusState>>,
    modifiers: ModifierChain,
}

impl MixBus {
    pub fn new(max_sounds: usize) -> Result<Self> {
        validate_capacity(max_sounds)?;
        Ok(Self {
            state: Arc::new(Mutex::new(BusState {
                sounds: Vec::new(),
                max_sounds,
                mixed_sounds: 0,
            })),
            modifiers: ModifierChain::new(),
        })
    }

    /// Adds a sound, evicting the oldest one if the bus is full.
    pub fn play_sound(&self, sound: SharedSound) {
        let mut state = self.lock_state();
        while state.sounds.len() >= state.max_sounds {
            state.sounds.remove(0);
        }
        state.sounds.push(sound);
    }

    /// Removes a sound by handle identity. Returns whether it was playing.
    pub fn stop_sound(&self, sound: &SharedSound) -> bool {
        let mut state = self.lock_state();
        match state.sounds.iter().position(|s| Arc::ptr_eq(s, sound)) {
            Some(index) => {
                state.sounds.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn stop_all_sounds(&self) {
        self.lock_state().sounds.clear();
    }

    /// Sounds currently held by the bus.
    pub fn active_sounds(&self) -> usize {
        self.lock_state().sounds.len()
    }

    /// Sounds summed during the most recent render.
    pub fn mixed_sounds(&self) -> usize {
        self.lock_state().mixed_sounds
    }

    pub fn max_sounds(&self) -> usize {
        self.lock_state().max_sounds
    }

    /// Changes the capacity, evicting oldest sounds if the bus now holds
    /// too many.
    pub fn set_max_sounds(&self, max_sounds: usize) -> Result<()> {
        validate_capacity(max_sounds)?;
        let mut state = self.lock_state();
        state.max_sounds = max_sounds;
        while state.sounds.len() > max_sounds {
            state.sounds.remove(0);
        }
        Ok(())
    }

    /// Renders and sums every child into `out`, overwriting it, then runs
    /// the bus modifier chain. A child whose lock is poisoned is dropped as
    /// finished, so a panicking sound never takes the mix down.
    pub fn render_into(&self, format: &AudioFormat, out: &mut [f32]) {
        out.fill(0.0);
        let mut scratch = vec![0.0f32; out.len()];

        let mut state = self.lock_state();
        let mut mixed = 0;
        state.sounds.retain(|sound| {
            let mut child = match sound.lock() {
                Ok(guard) => guard,
                Err(_) => return false,
            };
            child.render(format, &mut scratch);
            mixed += 1;
            for (acc, sample) in out.iter_mut().zip(scratch.iter()) {
                *acc += *sample;
            }
            !child.is_finished()
        });
        state.mixed_sounds = mixed;
        drop(state);

        self.modifiers.apply(format, out);
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate_capacity(max_sounds: usize) -> Result<()> {
    if !(1..=MAX_BUS_CAPACITY).contains(&max_sounds) {
        return Err(FloraMixError::Configuration(format!(
            "Bus capacity must be between 1 and {MAX_BUS_CAPACITY}, got {max_sounds}"
        )));
    }
    Ok(())
}

impl Default for MixBus {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(BusState {
                sounds: Vec::new(),
                max_sounds: DEFAULT_MAX_SOUNDS,
                mixed_sounds: 0,
            })),
            modifiers: ModifierChain::new(),
        }
    }
}

impl Sound for MixBus {
    fn render(&mut self, format: &AudioFormat, out: &mut [f32]) {
        self.render_into(format, out);
    }

    fn is_finished(&self) -> bool {
        false
    }

    fn modifiers(&self) -> &ModifierChain {
        &self.modifiers
    }
}
