//! The control loop: one owner for every core component, driven by events
//! from the event loop.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use kanal::{AsyncSender, Sender};
use scrim_capture::{ChangeDetector, FrameSource};
use scrim_config::{Config, ConfigStore};
use scrim_hotkey::{HotkeyEngine, HotkeyError, KeySource};
use scrim_overlay::{GeometryLimits, OverlayController, RegionSurface};
use scrim_translator::{FailureReason, JobEvent, JobId, JobOutcome, Submission, TranslationOrchestrator};
use scrim_types::{AppEvent, CallMode, HotkeyAction, Point, PointerKind, Rect, RegionKind};

use crate::settings::SettingsDialog;
use crate::state::{Capability, CapabilityFactory, ControlError, ControlState};
use crate::status::CaptureStats;
use crate::timer::CaptureTimer;

/// How long an in-flight job may take to stop on its own once cancelled
pub const CANCEL_GRACE: Duration = Duration::from_secs(3);

/// Creates the key source on the hotkey listener thread
pub type KeySourceFactory =
    Arc<dyn Fn() -> Result<Box<dyn KeySource>, HotkeyError> + Send + Sync>;

/// External collaborators the control loop is built from
pub struct Collaborators {
    pub store: Arc<dyn ConfigStore>,
    pub frame_source: Arc<dyn FrameSource>,
    pub source_surface: Box<dyn RegionSurface>,
    pub output_surface: Box<dyn RegionSurface>,
    /// Screen the overlay regions must stay on, if known
    pub screen: Option<Rect>,
    pub make_capability: CapabilityFactory,
    pub key_source: KeySourceFactory,
    pub settings: Box<dyn SettingsDialog>,
}

/// Channels the control loop feeds. Their receivers belong to the event loop.
#[derive(Clone)]
pub struct LoopSenders {
    /// Sync side, used from the hotkey listener thread
    pub app: Sender<AppEvent>,
    pub ticks: AsyncSender<()>,
    pub jobs: AsyncSender<JobEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotRunning,
    ManualMode,
    /// The source region is being dragged or resized
    Interacting,
    NoContentRect,
    CaptureFailed,
    NoCapability,
}

/// Result of one capture attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    Submitted(JobId),
    /// Changed, but a job was already running
    Busy,
    Unchanged,
    Skipped(SkipReason),
}

pub struct ControlLoop {
    state: ControlState,
    config: Config,
    store: Arc<dyn ConfigStore>,
    capability: Capability,
    make_capability: CapabilityFactory,
    frame_source: Arc<dyn FrameSource>,
    detector: ChangeDetector,
    overlay: OverlayController,
    settings: Box<dyn SettingsDialog>,
    orchestrator: TranslationOrchestrator,
    hotkeys: HotkeyEngine,
    senders: LoopSenders,
    timer: Option<CaptureTimer>,
    stats: CaptureStats,
    torn_down: bool,
}

impl ControlLoop {
    /// Build every component from the stored configuration and install the
    /// hotkey listener. Listener installation failure is fatal.
    pub fn new(collab: Collaborators, senders: LoopSenders) -> anyhow::Result<Self> {
        let config = match collab.store.load() {
            Ok(config) => config.sanitized(),
            Err(e) => {
                tracing::warn!("failed to load configuration, using defaults: {}", e);
                Config::new()
            }
        };

        let limits = collab
            .screen
            .map(GeometryLimits::for_screen)
            .unwrap_or_default();
        let mut overlay = OverlayController::new(
            config.windows.source,
            config.windows.output,
            limits,
            collab.source_surface,
            collab.output_surface,
        );
        overlay.set_output_opacity(config.ui.output_opacity);
        if config.ui.click_through {
            overlay.set_click_through(true);
        }

        let capability = (collab.make_capability)(&config);
        let detector = ChangeDetector::new(config.translation.similarity_threshold);

        let mut control = Self {
            state: ControlState::Idle,
            store: collab.store,
            capability,
            make_capability: collab.make_capability,
            frame_source: collab.frame_source,
            detector,
            overlay,
            settings: collab.settings,
            orchestrator: TranslationOrchestrator::new(senders.jobs.clone()),
            hotkeys: HotkeyEngine::new(),
            senders,
            timer: None,
            stats: CaptureStats::default(),
            torn_down: false,
            config,
        };

        control.bind_hotkeys();
        let make_source = collab.key_source;
        control
            .hotkeys
            .start(move || make_source())
            .map_err(|e| anyhow::anyhow!("Failed to start hotkey listener: {e}"))?;

        Ok(control)
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn overlay(&self) -> &OverlayController {
        &self.overlay
    }

    pub fn hotkeys(&self) -> &HotkeyEngine {
        &self.hotkeys
    }

    pub fn timer_active(&self) -> bool {
        self.timer.is_some()
    }

    pub fn is_translating(&self) -> bool {
        self.orchestrator.is_busy()
    }

    /// Register one binding per configured action. The callbacks only
    /// enqueue the action for this loop to execute.
    fn bind_hotkeys(&mut self) {
        self.hotkeys.clear_all();
        for (action, combination, description) in self.config.hotkeys.bindings() {
            let tx = self.senders.app.clone();
            let result = self.hotkeys.register(combination, description, move || {
                match tx.try_send(AppEvent::Hotkey(action)) {
                    Ok(true) => {}
                    Ok(false) => tracing::warn!("event queue full, dropping {:?}", action),
                    Err(e) => tracing::warn!("event queue closed: {}", e),
                }
            });
            if let Err(e) = result {
                tracing::error!("hotkey for {} not bound: {}", description, e);
            }
        }
    }

    pub async fn handle_event(&mut self, event: AppEvent) {
        tracing::debug!("handling {:?} in {:?}", event, self.state);
        match event {
            AppEvent::Hotkey(HotkeyAction::ToggleRunning) => self.toggle_running().await,
            AppEvent::Hotkey(HotkeyAction::ToggleClickThrough) => {
                self.toggle_click_through().await
            }
            AppEvent::Hotkey(HotkeyAction::ManualTranslate) => {
                self.manual_translate().await;
            }
            AppEvent::Hotkey(HotkeyAction::OpenSettings) | AppEvent::OpenSettings => {
                if let Err(e) = self.open_settings().await {
                    tracing::debug!("open settings ignored: {}", e);
                }
            }
            AppEvent::Pointer {
                region,
                kind,
                point,
            } => self.on_pointer(region, kind, point).await,
            AppEvent::StartRequested => {
                if let Err(e) = self.start() {
                    tracing::error!("cannot start: {}", e);
                    self.stats.current_message = e.to_string();
                }
            }
            AppEvent::StopRequested => {
                if let Err(e) = self.stop().await {
                    tracing::warn!("cannot stop: {}", e);
                }
            }
            AppEvent::SettingsCommitted => {
                if let Err(e) = self.commit_settings().await {
                    tracing::warn!("settings commit ignored: {}", e);
                }
            }
            AppEvent::SettingsCancelled => {
                if let Err(e) = self.cancel_settings() {
                    tracing::warn!("settings cancel ignored: {}", e);
                }
            }
            AppEvent::Shutdown => self.teardown().await,
        }
    }

    /// `Idle -> Running`. Refused without a ready translation capability.
    pub fn start(&mut self) -> Result<(), ControlError> {
        self.ensure_alive()?;
        match self.state {
            ControlState::Running => return Ok(()),
            ControlState::SettingsOpen { .. } => {
                return Err(ControlError::InvalidTransition {
                    action: "start",
                    state: self.state,
                });
            }
            ControlState::Idle => {}
        }

        if !self.capability.is_ready() {
            return Err(ControlError::CapabilityAbsent);
        }

        self.state = ControlState::Running;
        self.start_timer();
        self.stats.current_message = "Running".to_string();
        tracing::info!(
            "translation started, {:?} mode every {}s",
            self.config.ui.call_mode,
            self.config.translation.capture_interval
        );
        Ok(())
    }

    async fn toggle_running(&mut self) {
        let result = match self.state {
            ControlState::Running => self.stop().await,
            _ => self.start(),
        };
        if let Err(e) = result {
            tracing::warn!("cannot toggle translation: {}", e);
            self.stats.current_message = e.to_string();
        }
    }

    /// `Running -> Idle`. An in-flight job is allowed to finish.
    pub async fn stop(&mut self) -> Result<(), ControlError> {
        match self.state {
            ControlState::Idle => Ok(()),
            ControlState::SettingsOpen { .. } => Err(ControlError::InvalidTransition {
                action: "stop",
                state: self.state,
            }),
            ControlState::Running => {
                self.stop_timer().await;
                self.state = ControlState::Idle;
                self.stats.current_message = "Stopped".to_string();
                tracing::info!("translation stopped");
                Ok(())
            }
        }
    }

    fn start_timer(&mut self) {
        if self.config.ui.call_mode != CallMode::Auto || self.timer.is_some() {
            return;
        }
        let period = Duration::from_secs(self.config.translation.capture_interval.max(1));
        self.timer = Some(CaptureTimer::start(period, self.senders.ticks.clone()));
    }

    async fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop().await;
        }
    }

    /// Timer-driven capture, only in auto mode while running
    pub async fn on_tick(&mut self) -> CaptureOutcome {
        if self.state != ControlState::Running {
            return CaptureOutcome::Skipped(SkipReason::NotRunning);
        }
        if self.config.ui.call_mode != CallMode::Auto {
            return CaptureOutcome::Skipped(SkipReason::ManualMode);
        }
        self.capture_and_submit(false).await
    }

    /// Capture now and submit regardless of the change verdict
    pub async fn manual_translate(&mut self) -> CaptureOutcome {
        if self.state != ControlState::Running {
            tracing::info!("manual translate ignored in {:?}", self.state);
            return CaptureOutcome::Skipped(SkipReason::NotRunning);
        }
        tracing::info!("manual translate requested");
        self.capture_and_submit(true).await
    }

    async fn capture_and_submit(&mut self, force: bool) -> CaptureOutcome {
        let outcome = self.capture_once(force).await;
        match outcome {
            CaptureOutcome::Submitted(_) => self.stats.submissions += 1,
            CaptureOutcome::Busy => self.stats.dropped += 1,
            CaptureOutcome::Unchanged => self.stats.unchanged += 1,
            CaptureOutcome::Skipped(reason) => {
                self.stats.skipped += 1;
                tracing::debug!("capture skipped: {:?}", reason);
            }
        }
        outcome
    }

    async fn capture_once(&mut self, force: bool) -> CaptureOutcome {
        if self.overlay.is_interacting() {
            return CaptureOutcome::Skipped(SkipReason::Interacting);
        }
        let Some(rect) = self.overlay.content_rect() else {
            return CaptureOutcome::Skipped(SkipReason::NoContentRect);
        };

        let frame = {
            let _visibility = self.overlay.hide_output_for_capture();
            let source = self.frame_source.clone();
            match tokio::task::spawn_blocking(move || source.capture(rect)).await {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!("capture task failed: {}", e);
                    None
                }
            }
        };

        let Some(frame) = frame else {
            tracing::warn!("no frame captured for {:?}", rect);
            return CaptureOutcome::Skipped(SkipReason::CaptureFailed);
        };
        self.stats.captures += 1;
        self.stats.last_capture_time = Some(SystemTime::now());

        let changed = self.detector.has_changed(frame.clone());
        if !changed && !force {
            return CaptureOutcome::Unchanged;
        }

        let Capability::Ready(translator) = &self.capability else {
            return CaptureOutcome::Skipped(SkipReason::NoCapability);
        };
        match self.orchestrator.submit(frame, translator.clone()) {
            Submission::Accepted(id) => CaptureOutcome::Submitted(id),
            Submission::Dropped => CaptureOutcome::Busy,
        }
    }

    pub fn on_job_event(&mut self, event: JobEvent) {
        match event.outcome {
            JobOutcome::Completed(text) => {
                self.stats.completed += 1;
                self.stats.current_message = "Translated".to_string();
                self.overlay.show_translation(&text);
            }
            JobOutcome::Failed(FailureReason::Cancelled) => {
                tracing::debug!("job {} cancelled", event.job_id);
            }
            JobOutcome::Failed(reason) => {
                self.stats.failures += 1;
                self.stats.current_message = format!("Translation failed: {reason}");
            }
        }
    }

    pub async fn toggle_click_through(&mut self) {
        let settled = self.overlay.toggle_click_through();
        self.config.ui.click_through = self.overlay.click_through();
        for (region, rect) in settled {
            self.record_geometry(region, rect);
        }
        self.save_config().await;
    }

    pub async fn on_pointer(&mut self, region: RegionKind, kind: PointerKind, point: Point) {
        if let Some(rect) = self.overlay.on_pointer(region, kind, point) {
            self.record_geometry(region, rect);
            self.save_config().await;
        }
    }

    fn record_geometry(&mut self, region: RegionKind, rect: Rect) {
        match region {
            RegionKind::Source => self.config.windows.source = rect,
            RegionKind::Output => self.config.windows.output = rect,
        }
    }

    /// Store access is file IO and runs on the blocking pool
    async fn save_config(&self) {
        let store = self.store.clone();
        let config = self.config.clone();
        match tokio::task::spawn_blocking(move || store.save(&config)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("failed to save configuration: {}", e),
            Err(e) => tracing::error!("config save task failed: {}", e),
        }
    }

    async fn load_config(&self) -> Option<Config> {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.load()).await {
            Ok(Ok(config)) => Some(config.sanitized()),
            Ok(Err(e)) => {
                tracing::error!("failed to reload configuration: {}", e);
                None
            }
            Err(e) => {
                tracing::error!("config load task failed: {}", e);
                None
            }
        }
    }

    /// Suspend capture and cancel the in-flight job
    pub async fn open_settings(&mut self) -> Result<(), ControlError> {
        self.ensure_alive()?;
        let resume = match self.state {
            ControlState::Running => true,
            ControlState::Idle => false,
            ControlState::SettingsOpen { .. } => {
                return Err(ControlError::InvalidTransition {
                    action: "open settings",
                    state: self.state,
                });
            }
        };

        self.stop_timer().await;
        self.orchestrator.cancel(CANCEL_GRACE).await;
        self.state = ControlState::SettingsOpen { resume };
        tracing::info!("settings opened, capture suspended");
        self.settings.open(&self.config, &self.senders.app);
        Ok(())
    }

    /// Apply the stored configuration and leave `SettingsOpen`
    pub async fn commit_settings(&mut self) -> Result<(), ControlError> {
        let ControlState::SettingsOpen { resume } = self.state else {
            return Err(ControlError::InvalidTransition {
                action: "commit settings",
                state: self.state,
            });
        };

        if let Some(config) = self.load_config().await {
            self.config = config;
        }

        self.detector
            .set_threshold(self.config.translation.similarity_threshold);
        self.overlay.set_output_opacity(self.config.ui.output_opacity);
        self.overlay.set_click_through(self.config.ui.click_through);
        self.overlay
            .set_rect(RegionKind::Source, self.config.windows.source);
        self.overlay
            .set_rect(RegionKind::Output, self.config.windows.output);
        // An empty rect comes back widened to the minimum size
        self.config.windows.source = self.overlay.get_rect(RegionKind::Source);
        self.config.windows.output = self.overlay.get_rect(RegionKind::Output);
        self.capability = (self.make_capability)(&self.config);
        self.bind_hotkeys();

        self.state = ControlState::Idle;
        if resume {
            if self.capability.is_ready() {
                self.state = ControlState::Running;
                self.start_timer();
            } else {
                tracing::warn!("translation capability lost, staying idle");
                self.stats.current_message = ControlError::CapabilityAbsent.to_string();
            }
        }
        tracing::info!("settings committed, now {:?}", self.state);
        Ok(())
    }

    /// Leave `SettingsOpen` without applying anything
    pub fn cancel_settings(&mut self) -> Result<(), ControlError> {
        let ControlState::SettingsOpen { resume } = self.state else {
            return Err(ControlError::InvalidTransition {
                action: "cancel settings",
                state: self.state,
            });
        };

        if resume {
            self.state = ControlState::Running;
            self.start_timer();
        } else {
            self.state = ControlState::Idle;
        }
        tracing::info!("settings cancelled, now {:?}", self.state);
        Ok(())
    }

    /// Ordered shutdown: timer, in-flight job, hotkey listener, frame source.
    /// Safe to call more than once.
    pub async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        tracing::info!("tearing down");

        self.stop_timer().await;
        self.orchestrator.shutdown(CANCEL_GRACE).await;
        self.hotkeys.stop();

        self.config.windows.source = self.overlay.get_rect(RegionKind::Source);
        self.config.windows.output = self.overlay.get_rect(RegionKind::Output);
        self.save_config().await;

        self.frame_source.release();
        self.state = ControlState::Idle;
        self.torn_down = true;
        tracing::info!("teardown complete");
    }

    fn ensure_alive(&self) -> Result<(), ControlError> {
        if self.torn_down {
            Err(ControlError::TornDown)
        } else {
            Ok(())
        }
    }
}
