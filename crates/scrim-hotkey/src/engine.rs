use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::combo::Combination;
use crate::error::HotkeyError;
use crate::key::{self, KeyEvent, KeyEventKind, RawKey};
use crate::listener::{KeySource, Listener};

/// Invoked on the listener thread. Must not block: enqueue work and return.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

struct Binding {
    combination: Combination,
    description: String,
    callback: Callback,
}

/// Shared between the owning engine and its listener thread
#[derive(Default)]
pub(crate) struct EngineCore {
    bindings: Mutex<HashMap<String, Binding>>,
    /// Keys currently held down, as the input source reported them
    held: Mutex<Vec<RawKey>>,
}

impl EngineCore {
    /// Update the key state and, on press, fire the longest satisfied
    /// combination. Returns the literal of the binding that fired.
    pub(crate) fn handle_event(&self, event: KeyEvent) -> Option<String> {
        match event.kind {
            KeyEventKind::Release => {
                self.release(&event.key);
                None
            }
            KeyEventKind::Press => {
                let held = {
                    let mut held = self.held.lock();
                    if !held.contains(&event.key) {
                        held.push(event.key);
                    }
                    held.clone()
                };
                tracing::trace!("key down, {} held", held.len());

                let (literal, description, callback) = {
                    let bindings = self.bindings.lock();
                    let mut candidates: Vec<&Binding> = bindings.values().collect();
                    candidates.sort_by(|a, b| {
                        b.combination
                            .len()
                            .cmp(&a.combination.len())
                            .then_with(|| a.combination.literal().cmp(b.combination.literal()))
                    });
                    let hit = candidates
                        .into_iter()
                        .find(|b| b.combination.is_satisfied_by(&held))?;
                    (
                        hit.combination.literal().to_string(),
                        hit.description.clone(),
                        hit.callback.clone(),
                    )
                };

                tracing::info!("hotkey matched: {} ({})", literal, description);
                if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                    tracing::error!("hotkey callback for {} panicked", literal);
                }
                Some(literal)
            }
        }
    }

    fn release(&self, key: &RawKey) {
        let mut held = self.held.lock();
        if let Some(pos) = held.iter().position(|k| k == key) {
            held.remove(pos);
            return;
        }
        // Released under a different representation than it was pressed
        let released = key::logical_keys(key);
        if released.is_empty() {
            return;
        }
        held.retain(|k| !key::logical_keys(k).iter().any(|l| released.contains(l)));
    }

    fn clear_held(&self) {
        self.held.lock().clear();
    }
}

/// Global hotkey recognizer.
///
/// Owns the binding table and the live key state. Key events come from a
/// [`KeySource`] polled on a dedicated listener thread between `start` and
/// `stop`; callbacks run on that thread.
pub struct HotkeyEngine {
    core: Arc<EngineCore>,
    listener: Option<Listener>,
}

impl HotkeyEngine {
    pub fn new() -> Self {
        Self {
            core: Arc::new(EngineCore::default()),
            listener: None,
        }
    }

    /// Bind `combination` to `callback`. A malformed combination is rejected
    /// and the table is left untouched. Re-registering replaces the binding.
    pub fn register<F>(
        &self,
        combination: &str,
        description: &str,
        callback: F,
    ) -> Result<(), HotkeyError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let combination = Combination::parse(combination).inspect_err(|e| {
            tracing::error!("hotkey registration failed: {}", e);
        })?;

        let literal = combination.literal().to_string();
        let binding = Binding {
            combination,
            description: description.to_string(),
            callback: Arc::new(callback),
        };

        if self.core.bindings.lock().insert(literal.clone(), binding).is_some() {
            tracing::warn!("hotkey {} re-registered", literal);
        } else {
            tracing::info!("hotkey registered: {} - {}", literal, description);
        }
        Ok(())
    }

    /// Returns whether a binding was removed
    pub fn unregister(&self, combination: &str) -> bool {
        let Ok(combination) = Combination::parse(combination) else {
            return false;
        };
        self.core
            .bindings
            .lock()
            .remove(combination.literal())
            .is_some()
    }

    pub fn clear_all(&self) {
        self.core.bindings.lock().clear();
        tracing::debug!("all hotkeys cleared");
    }

    pub fn is_registered(&self, combination: &str) -> bool {
        Combination::parse(combination)
            .map(|c| self.core.bindings.lock().contains_key(c.literal()))
            .unwrap_or(false)
    }

    /// Normalized combination -> description, sorted by combination
    pub fn registered(&self) -> Vec<(String, String)> {
        let mut list: Vec<_> = self
            .core
            .bindings
            .lock()
            .values()
            .map(|b| (b.combination.literal().to_string(), b.description.clone()))
            .collect();
        list.sort();
        list
    }

    /// Feed one key event through the matcher on the caller's thread
    pub fn handle_event(&self, event: KeyEvent) -> Option<String> {
        self.core.handle_event(event)
    }

    /// Start the listener thread. `make_source` runs on that thread, so the
    /// source itself does not need to be `Send`. Returns the source's error
    /// when it cannot be created.
    pub fn start<S, F>(&mut self, make_source: F) -> Result<(), HotkeyError>
    where
        S: KeySource,
        F: FnOnce() -> Result<S, HotkeyError> + Send + 'static,
    {
        if self.is_running() {
            tracing::warn!("hotkey listener already running");
            return Ok(());
        }

        let listener = Listener::spawn(self.core.clone(), make_source)?;
        self.listener = Some(listener);
        tracing::info!("hotkey listener started with {} binding(s)", self.core.bindings.lock().len());
        for (combination, description) in self.registered() {
            tracing::info!("  - {}: {}", combination, description);
        }
        Ok(())
    }

    /// Stop and join the listener thread. Held-key state is discarded.
    pub fn stop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.stop();
            self.core.clear_held();
            tracing::info!("hotkey listener stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.listener.as_ref().is_some_and(Listener::is_alive)
    }
}

impl Default for HotkeyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HotkeyEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
