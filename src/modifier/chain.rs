use crate::format::AudioFormat;
use crate::modifier::SharedModifier;
use std::sync::{Arc, Mutex, PoisonError};

/// Ordered list of modifiers applied front to back.
///
/// Cloning yields another handle to the same list, so the chain can be
/// edited from any thread while a render is in flight. Membership is by
/// handle identity (`Arc::ptr_eq`), which lets the same modifier instance
/// be located and removed without any naming scheme.
#[derive(Clone)]
pub struct ModifierChain {
    modifiers: Arc<Mutex<Vec<SharedModifier>>>,
}

impl ModifierChain {
    pub fn new() -> Self {
        Self {
            modifiers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Runs every modifier over `samples` in order. The list lock is held
    /// for the whole pass so edits never interleave with a render.
    pub fn apply(&self, format: &AudioFormat, samples: &mut [f32]) {
        let modifiers = self.lock_list();
        for modifier in modifiers.iter() {
            let mut modifier = modifier.lock().unwrap_or_else(PoisonError::into_inner);
            modifier.modify(format, samples);
        }
    }

    pub fn append(&self, modifier: SharedModifier) {
        self.lock_list().push(modifier);
    }

    pub fn prepend(&self, modifier: SharedModifier) {
        self.lock_list().insert(0, modifier);
    }

    /// Inserts `modifier` directly before `anchor`. Appends when the anchor
    /// is not in the chain.
    pub fn insert_before(&self, anchor: &SharedModifier, modifier: SharedModifier) {
        let mut modifiers = self.lock_list();
        match modifiers.iter().position(|m| Arc::ptr_eq(m, anchor)) {
            Some(index) => modifiers.insert(index, modifier),
            None => modifiers.push(modifier),
        }
    }

    /// Inserts `modifier` directly after `anchor`. Appends when the anchor
    /// is not in the chain.
    pub fn insert_after(&self, anchor: &SharedModifier, modifier: SharedModifier) {
        let mut modifiers = self.lock_list();
        match modifiers.iter().position(|m| Arc::ptr_eq(m, anchor)) {
            Some(index) => modifiers.insert(index + 1, modifier),
            None => modifiers.push(modifier),
        }
    }

    /// Removes `modifier` from the chain. Returns whether it was present.
    pub fn remove(&self, modifier: &SharedModifier) -> bool {
        let mut modifiers = self.lock_list();
        match modifiers.iter().position(|m| Arc::ptr_eq(m, modifier)) {
            Some(index) => {
                modifiers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        self.lock_list().clear();
    }

    pub fn len(&self) -> usize {
        self.lock_list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_list().is_empty()
    }

    fn lock_list(&self) -> std::sync::MutexGuard<'_, Vec<SharedModifier>> {
        self.modifiers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ModifierChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::{SoundModifier, shared_modifier};

    struct AddModifier(f32);

    impl SoundModifier for AddModifier {
        fn modify(&mut self, _format: &AudioFormat, samples: &mut [f32]) {
            for sample in samples.iter_mut() {
                *sample += self.0;
            }
        }
    }

    struct ScaleModifier(f32);

    impl SoundModifier for ScaleModifier {
        fn modify(&mut self, _format: &AudioFormat, samples: &mut [f32]) {
            for sample in samples.iter_mut() {
                *sample *= self.0;
            }
        }
    }

    #[test]
    fn applies_in_insertion_order() {
        let chain = ModifierChain::new();
        chain.append(shared_modifier(AddModifier(1.0)));
        chain.append(shared_modifier(ScaleModifier(2.0)));

        let format = AudioFormat::mono(48000.0).unwrap();
        let mut samples = [0.0f32; 4];
        chain.apply(&format, &mut samples);
        // (0 + 1) * 2, not 0 * 2 + 1
        assert_eq!(samples, [2.0; 4]);
    }

    #[test]
    fn insert_before_and_after_use_identity() {
        let chain = ModifierChain::new();
        let anchor = shared_modifier(ScaleModifier(2.0));
        chain.append(anchor.clone());
        chain.insert_before(&anchor, shared_modifier(AddModifier(1.0)));
        chain.insert_after(&anchor, shared_modifier(AddModifier(0.5)));

        let format = AudioFormat::mono(48000.0).unwrap();
        let mut samples = [0.0f32; 2];
        chain.apply(&format, &mut samples);
        assert_eq!(samples, [2.5; 2]);
    }

    #[test]
    fn remove_reports_presence() {
        let chain = ModifierChain::new();
        let modifier = shared_modifier(AddModifier(1.0));
        chain.append(modifier.clone());
        assert!(chain.remove(&modifier));
        assert!(!chain.remove(&modifier));
        assert!(chain.is_empty());
    }

    #[test]
    fn insert_relative_to_missing_anchor_appends() {
        let chain = ModifierChain::new();
        let anchor = shared_modifier(AddModifier(1.0));
        chain.insert_before(&anchor, shared_modifier(AddModifier(2.0)));
        assert_eq!(chain.len(), 1);
    }
}
