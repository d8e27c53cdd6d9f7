use crate::output::{keep_first, KeyId, KeyInjector, OutputSink, SinkError};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Keyboard sink owning the set of keys it currently holds
pub struct KeyboardSink {
    injector: Box<dyn KeyInjector>,
    pressed: BTreeSet<KeyId>,
}

impl KeyboardSink {
    pub fn new(injector: Box<dyn KeyInjector>) -> Self {
        Self {
            injector,
            pressed: BTreeSet::new(),
        }
    }

    /// Presses `key` unless it is already held. Returns whether a call was made.
    ///
    /// A failed press leaves the key out of the active set so the next tick retries.
    pub fn press(&mut self, key: KeyId) -> Result<bool, SinkError> {
        if self.pressed.contains(&key) {
            return Ok(false);
        }
        self.injector.press(key)?;
        debug!("Key pressed: {}", key);
        self.pressed.insert(key);
        Ok(true)
    }

    /// Releases `key` if it is held. Returns whether a call was made.
    ///
    /// A failed release keeps the key in the active set so the next tick retries.
    pub fn release(&mut self, key: KeyId) -> Result<bool, SinkError> {
        if !self.pressed.contains(&key) {
            return Ok(false);
        }
        self.injector.release(key)?;
        debug!("Key released: {}", key);
        self.pressed.remove(&key);
        Ok(true)
    }

    /// Presses or releases `key` to match `held`
    pub fn set(&mut self, key: KeyId, held: bool) -> Result<bool, SinkError> {
        if held {
            self.press(key)
        } else {
            self.release(key)
        }
    }

    pub fn is_pressed(&self, key: KeyId) -> bool {
        self.pressed.contains(&key)
    }

    pub fn active_keys(&self) -> Vec<KeyId> {
        self.pressed.iter().copied().collect()
    }
}

impl OutputSink for KeyboardSink {
    fn name(&self) -> &'static str {
        "keyboard"
    }

    fn release_all(&mut self) -> Result<(), SinkError> {
        if self.pressed.is_empty() {
            return Ok(());
        }
        info!("Releasing {} held keys", self.pressed.len());

        let mut first_error = None;
        for key in std::mem::take(&mut self.pressed) {
            let result = self.injector.release(key);
            if let Err(e) = &result {
                warn!("Failed to release key {}: {}", key, e);
            }
            keep_first(&mut first_error, result);
        }
        first_error.map_or(Ok(()), Err)
    }

    fn is_idle(&self) -> bool {
        self.pressed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::recording::{OutputCall, OutputLog};

    fn sink() -> (KeyboardSink, OutputLog) {
        let log = OutputLog::new();
        (KeyboardSink::new(Box::new(log.key_injector())), log)
    }

    #[test]
    fn press_is_idempotent() {
        let (mut sink, log) = sink();
        assert!(sink.press(KeyId::Char('w')).unwrap());
        assert!(!sink.press(KeyId::Char('w')).unwrap());
        assert_eq!(log.calls(), vec![OutputCall::KeyPress(KeyId::Char('w'))]);
    }

    #[test]
    fn releasing_unpressed_key_is_noop() {
        let (mut sink, log) = sink();
        assert!(!sink.release(KeyId::Space).unwrap());
        assert!(log.is_empty());
    }

    #[test]
    fn release_all_twice_is_safe() {
        let (mut sink, log) = sink();
        sink.press(KeyId::Char('a')).unwrap();
        sink.press(KeyId::Shift).unwrap();

        sink.release_all().unwrap();
        assert!(sink.is_idle());
        assert!(log.held_keys().is_empty());

        let calls_before = log.len();
        sink.release_all().unwrap();
        assert_eq!(log.len(), calls_before);
    }

    #[test]
    fn failed_press_is_retried_next_time() {
        let (mut sink, log) = sink();
        log.set_failing(true);
        assert!(sink.press(KeyId::Char('w')).is_err());
        assert!(!sink.is_pressed(KeyId::Char('w')));

        log.set_failing(false);
        assert!(sink.press(KeyId::Char('w')).unwrap());
        assert!(sink.is_pressed(KeyId::Char('w')));
    }

    #[test]
    fn release_all_empties_set_even_on_failure() {
        let (mut sink, log) = sink();
        sink.press(KeyId::Char('d')).unwrap();
        log.set_failing(true);
        assert!(sink.release_all().is_err());
        assert!(sink.is_idle());
    }
}
