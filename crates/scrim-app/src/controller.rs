use kanal::{AsyncReceiver, AsyncSender};
use scrim_translator::JobEvent;
use scrim_types::AppEvent;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::control::{ControlLoop, LoopSenders};
use crate::events::{LoopReceivers, event_loop};

/// Centralized channel management
pub struct ChannelSet {
    pub app: (AsyncSender<AppEvent>, AsyncReceiver<AppEvent>),
    /// Capacity one: a pending tick absorbs later ones
    pub ticks: (AsyncSender<()>, AsyncReceiver<()>),
    pub jobs: (AsyncSender<JobEvent>, AsyncReceiver<JobEvent>),
}

impl ChannelSet {
    pub fn new() -> Self {
        Self {
            app: kanal::bounded_async(64), // hotkeys and UI interactions
            ticks: kanal::bounded_async(1),
            jobs: kanal::bounded_async(16),
        }
    }

    pub fn senders(&self) -> LoopSenders {
        LoopSenders {
            app: self.app.0.clone_sync(),
            ticks: self.ticks.0.clone(),
            jobs: self.jobs.0.clone(),
        }
    }

    pub(crate) fn receivers(&self) -> LoopReceivers {
        LoopReceivers {
            app: self.app.1.clone(),
            ticks: self.ticks.1.clone(),
            jobs: self.jobs.1.clone(),
        }
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Application controller for task spawning and lifecycle
pub struct AppController {
    channels: ChannelSet,
    cancel_token: CancellationToken,
}

impl AppController {
    pub fn new(channels: ChannelSet) -> Self {
        Self {
            channels,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn spawn(&self, control: ControlLoop) -> JoinHandle<anyhow::Result<ControlLoop>> {
        tokio::spawn(event_loop(
            control,
            self.channels.receivers(),
            self.cancel_token.child_token(),
        ))
    }

    /// Queue an event for the control loop
    pub async fn send(&self, event: AppEvent) -> anyhow::Result<()> {
        self.channels.app.0.send(event).await?;
        Ok(())
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}
