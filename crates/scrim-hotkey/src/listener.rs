use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use device_query::{DeviceQuery, DeviceState, Keycode};
use tokio_util::sync::CancellationToken;

use crate::engine::EngineCore;
use crate::error::HotkeyError;
use crate::key::{Key, KeyEvent, RawKey, logical_keys};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Produces key events for the listener thread
pub trait KeySource: 'static {
    /// Events observed since the previous poll, in order
    fn poll(&mut self) -> Vec<KeyEvent>;
}

impl<S: KeySource + ?Sized> KeySource for Box<S> {
    fn poll(&mut self) -> Vec<KeyEvent> {
        (**self).poll()
    }
}

/// Keyboard state polling through `device_query`
pub struct DeviceQuerySource {
    state: DeviceState,
    last: Vec<Keycode>,
}

impl DeviceQuerySource {
    pub fn new() -> Result<Self, HotkeyError> {
        // DeviceState::new panics when no display server is reachable
        let state = catch_unwind(DeviceState::new).map_err(|_| {
            HotkeyError::ListenerInstall("keyboard state is not accessible".to_string())
        })?;
        Ok(Self {
            state,
            last: Vec::new(),
        })
    }
}

impl KeySource for DeviceQuerySource {
    fn poll(&mut self) -> Vec<KeyEvent> {
        let now = self.state.get_keys();
        let events = diff_snapshots(&self.last, &now);
        self.last = now;
        events
    }
}

fn raw_key(code: &Keycode) -> RawKey {
    RawKey::Name(format!("{code:?}"))
}

fn is_modifier(raw: &RawKey) -> bool {
    logical_keys(raw).iter().any(Key::is_modifier)
}

/// Press and release events between two keyboard snapshots.
///
/// Snapshots list keys by keycode, so a combination pressed within one poll
/// arrives in arbitrary order. New modifiers are pressed first so the full
/// combination is held when its last key lands.
pub(crate) fn diff_snapshots(last: &[Keycode], now: &[Keycode]) -> Vec<KeyEvent> {
    let mut events: Vec<KeyEvent> = last
        .iter()
        .filter(|k| !now.contains(k))
        .map(|k| KeyEvent::release(raw_key(k)))
        .collect();

    let (modifiers, others): (Vec<RawKey>, Vec<RawKey>) = now
        .iter()
        .filter(|k| !last.contains(k))
        .map(raw_key)
        .partition(is_modifier);
    events.extend(modifiers.into_iter().chain(others).map(KeyEvent::press));

    events
}

/// Handle to a running listener thread
pub(crate) struct Listener {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Listener {
    pub(crate) fn spawn<S, F>(core: Arc<EngineCore>, make_source: F) -> Result<Self, HotkeyError>
    where
        S: KeySource,
        F: FnOnce() -> Result<S, HotkeyError> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let (ready_tx, ready_rx) = kanal::bounded::<Result<(), HotkeyError>>(1);

        let token = cancel.clone();
        let handle = thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                let mut source = match make_source() {
                    Ok(source) => {
                        let _ = ready_tx.send(Ok(()));
                        source
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                while !token.is_cancelled() {
                    for event in source.poll() {
                        core.handle_event(event);
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                tracing::debug!("hotkey listener loop exited");
            })
            .map_err(|e| HotkeyError::ListenerInstall(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { cancel, handle }),
            Ok(Err(e)) => {
                let _ = handle.join();
                tracing::error!("{}", e);
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(HotkeyError::ListenerInstall(
                    "listener thread exited during startup".to_string(),
                ))
            }
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        !self.handle.is_finished()
    }

    pub(crate) fn stop(self) {
        self.cancel.cancel();
        if self.handle.join().is_err() {
            tracing::error!("hotkey listener thread panicked");
        }
    }
}
