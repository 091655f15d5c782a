//! Fakes and a harness for driving the control loop without a display,
//! keyboard or network

mod event_flow_tests;

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, ThreadId};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use scrim_capture::{Frame, FrameSource};
use scrim_config::{Config, ConfigError, ConfigStore, MemoryStore};
use scrim_hotkey::{HotkeyError, KeyEvent, KeySource};
use scrim_overlay::RegionSurface;
use scrim_translator::{
    JobEvent, LanguageCode, ProviderMetadata, TranslateError, Translation, Translator,
};
use scrim_types::{CallMode, Rect};
use tokio::time::timeout;

use crate::control::{Collaborators, ControlLoop, KeySourceFactory};
use crate::controller::ChannelSet;
use crate::events::LoopReceivers;
use crate::settings::HeadlessSettings;
use crate::state::Capability;

/// Order in which resources were let go
pub type Journal = Arc<Mutex<Vec<&'static str>>>;

pub struct FakeFrameSource {
    queued: Mutex<VecDeque<Option<Frame>>>,
    fallback: Mutex<Option<Frame>>,
    captures: AtomicUsize,
    released: AtomicBool,
    /// Output visibility observed at each capture
    output_visible_at_capture: Mutex<Vec<bool>>,
    output_visible: Arc<AtomicBool>,
    journal: Journal,
}

impl FakeFrameSource {
    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub fn push(&self, frame: Option<Frame>) {
        self.queued.lock().push_back(frame);
    }

    pub fn set_fallback(&self, frame: Frame) {
        *self.fallback.lock() = Some(frame);
    }

    pub fn output_visible_at_capture(&self) -> Vec<bool> {
        self.output_visible_at_capture.lock().clone()
    }
}

impl FrameSource for FakeFrameSource {
    fn capture(&self, _rect: Rect) -> Option<Frame> {
        if self.released() {
            return None;
        }
        self.captures.fetch_add(1, Ordering::SeqCst);
        self.output_visible_at_capture
            .lock()
            .push(self.output_visible.load(Ordering::SeqCst));
        match self.queued.lock().pop_front() {
            Some(frame) => frame,
            None => self.fallback.lock().clone(),
        }
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
        self.journal.lock().push("frame_source");
    }
}

/// In-memory store that remembers which thread every save ran on
pub struct TestStore {
    inner: MemoryStore,
    save_threads: Mutex<Vec<ThreadId>>,
}

impl TestStore {
    pub fn save_count(&self) -> u64 {
        self.inner.save_count()
    }

    pub fn save_threads(&self) -> Vec<ThreadId> {
        self.save_threads.lock().clone()
    }
}

impl ConfigStore for TestStore {
    fn load(&self) -> Result<Config, ConfigError> {
        self.inner.load()
    }

    fn save(&self, config: &Config) -> Result<(), ConfigError> {
        self.save_threads.lock().push(thread::current().id());
        self.inner.save(config)
    }
}

#[derive(Clone)]
pub enum Reply {
    Text(&'static str),
    /// Never answers
    Hang,
}

/// Pushes to the journal when the in-flight translation is dropped
struct JobGuard(Journal);

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.0.lock().push("job");
    }
}

pub struct FakeTranslator {
    calls: AtomicUsize,
    reply: Mutex<Reply>,
    journal: Journal,
}

impl FakeTranslator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock() = reply;
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, _image: &Frame) -> Result<Translation, TranslateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.reply.lock().clone();
        let text = match reply {
            Reply::Text(text) => text,
            Reply::Hang => {
                let _guard = JobGuard(self.journal.clone());
                std::future::pending::<()>().await;
                ""
            }
        };
        Ok(Translation {
            text: text.to_string(),
            to: "ko".to_string(),
            provider: "fake".to_string(),
            model: "fake".to_string(),
        })
    }

    async fn test_connection(&self) -> bool {
        true
    }

    fn supported_languages(&self) -> Vec<(LanguageCode, String)> {
        vec![("ko".to_string(), "Korean".to_string())]
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "fake".to_string(),
            model: "fake".to_string(),
            requires_api_key: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Bounds(Rect),
    Visible(bool),
    PassThrough(bool),
    Opacity(f32),
    Text(String),
}

#[derive(Clone, Default)]
pub struct RecordingSurface {
    calls: Arc<Mutex<Vec<SurfaceCall>>>,
    visible: Arc<AtomicBool>,
}

impl RecordingSurface {
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SurfaceCall::Text(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }
}

impl RegionSurface for RecordingSurface {
    fn set_bounds(&mut self, rect: Rect) {
        self.calls.lock().push(SurfaceCall::Bounds(rect));
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
        self.calls.lock().push(SurfaceCall::Visible(visible));
    }

    fn set_pass_through(&mut self, enabled: bool) {
        self.calls.lock().push(SurfaceCall::PassThrough(enabled));
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.calls.lock().push(SurfaceCall::Opacity(opacity));
    }

    fn show_text(&mut self, text: &str) {
        self.calls.lock().push(SurfaceCall::Text(text.to_string()));
    }
}

/// Key source fed from the test through a channel
pub struct ChannelKeySource {
    rx: kanal::Receiver<KeyEvent>,
    journal: Journal,
}

impl KeySource for ChannelKeySource {
    fn poll(&mut self) -> Vec<KeyEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Drop for ChannelKeySource {
    fn drop(&mut self) {
        self.journal.lock().push("listener");
    }
}

pub fn frame(shade: u8) -> Frame {
    Frame::solid(300, 170, [shade, shade, shade, 255]).unwrap()
}

/// Auto mode, 3 s interval, 0.95 threshold, regions apart from each other
pub fn auto_config() -> Config {
    let mut config = Config::default();
    config.api.api_key = "test-key".to_string();
    config.ui.call_mode = CallMode::Auto;
    config.translation.capture_interval = 3;
    config.translation.similarity_threshold = 0.95;
    config.windows.source = Rect::new(100, 100, 300, 200);
    config.windows.output = Rect::new(450, 100, 300, 200);
    config
}

pub struct Harness {
    pub control: ControlLoop,
    pub channels: ChannelSet,
    pub frames: Arc<FakeFrameSource>,
    pub translator: Arc<FakeTranslator>,
    pub output: RecordingSurface,
    pub store: Arc<TestStore>,
    pub journal: Journal,
    pub keys: kanal::Sender<KeyEvent>,
}

impl Harness {
    pub fn new(config: Config) -> Self {
        Self::build(config, Reply::Text("Hello"))
    }

    pub fn build(config: Config, reply: Reply) -> Self {
        let journal: Journal = Arc::default();
        let output = RecordingSurface::default();

        let frames = Arc::new(FakeFrameSource {
            queued: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Some(frame(200))),
            captures: AtomicUsize::new(0),
            released: AtomicBool::new(false),
            output_visible_at_capture: Mutex::new(Vec::new()),
            output_visible: output.visible.clone(),
            journal: journal.clone(),
        });
        let translator = Arc::new(FakeTranslator {
            calls: AtomicUsize::new(0),
            reply: Mutex::new(reply),
            journal: journal.clone(),
        });
        let store = Arc::new(TestStore {
            inner: MemoryStore::new(config),
            save_threads: Mutex::new(Vec::new()),
        });

        let (keys, key_rx) = kanal::unbounded::<KeyEvent>();
        let key_rx = Arc::new(Mutex::new(Some(key_rx)));
        let key_journal = journal.clone();
        let key_source: KeySourceFactory = Arc::new(move || {
            let rx = key_rx
                .lock()
                .take()
                .ok_or_else(|| HotkeyError::ListenerInstall("key source already taken".into()))?;
            Ok(Box::new(ChannelKeySource {
                rx,
                journal: key_journal.clone(),
            }) as Box<dyn KeySource>)
        });

        let capability_translator = translator.clone();
        let channels = ChannelSet::new();
        let control = ControlLoop::new(
            Collaborators {
                store: store.clone(),
                frame_source: frames.clone(),
                source_surface: Box::new(RecordingSurface::default()),
                output_surface: Box::new(output.clone()),
                screen: Some(Rect::new(0, 0, 1920, 1080)),
                make_capability: Box::new(move |config: &Config| {
                    if config.api.has_key() {
                        Capability::Ready(capability_translator.clone())
                    } else {
                        Capability::Absent
                    }
                }),
                key_source,
                settings: Box::new(HeadlessSettings),
            },
            channels.senders(),
        )
        .unwrap();

        Self {
            control,
            channels,
            frames,
            translator,
            output,
            store,
            journal,
            keys,
        }
    }

    pub fn receivers(&self) -> LoopReceivers {
        self.channels.receivers()
    }

    pub async fn next_job(&self) -> JobEvent {
        timeout(Duration::from_secs(2), self.channels.jobs.1.recv())
            .await
            .expect("timed out waiting for a job event")
            .unwrap()
    }

    /// Save a modified copy of the stored configuration
    pub fn edit_stored(&self, edit: impl FnOnce(&mut Config)) {
        edit_store(&self.store, edit);
    }
}

/// Poll `condition` until it holds or two seconds pass
pub async fn wait_until(condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "condition never held");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub fn edit_store(store: &TestStore, edit: impl FnOnce(&mut Config)) {
    let mut config = store.load().unwrap();
    edit(&mut config);
    store.save(&config).unwrap();
}
