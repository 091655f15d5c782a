use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use scrim_capture::XcapFrameSource;
use scrim_config::ConfigStore;
use scrim_config::api::API_KEY_ENV;
use scrim_hotkey::{DeviceQuerySource, KeySource};
use scrim_overlay::NullSurface;
use scrim_types::{AppEvent, Rect, RegionKind};
use tokio::signal;
use tracing_subscriber::EnvFilter;

mod control;
mod controller;
mod events;
mod profile;
mod settings;
mod state;
mod status;
mod timer;

#[cfg(test)]
mod tests;

use crate::control::{Collaborators, ControlLoop, KeySourceFactory};
use crate::controller::{AppController, ChannelSet};
use crate::profile::ProfileStore;
use crate::settings::HeadlessSettings;
use crate::state::Capability;

const LOG_JSON_ENV: &str = "SCRIM_LOG_JSON";

#[derive(Parser, Debug)]
#[command(version, about = "Screen-region translation overlay", long_about = None)]
struct Args {
    /// Profile to load from the config folder
    #[arg(short, long, default_value = "main")]
    profile: String,

    /// Start translating immediately
    #[arg(short, long)]
    start: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if json {
        builder.json().init();
    } else {
        builder.with_ansi(atty::is(atty::Stream::Stdout)).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let json = args.log_json || std::env::var(LOG_JSON_ENV).is_ok_and(|v| v == "1");
    init_tracing(json);

    let store = Arc::new(ProfileStore::open(&args.profile).context("Failed to open profile")?);
    if store.is_first_run() {
        tracing::warn!("No API key found. Set {API_KEY_ENV} or add it to a .env file");
    }

    let frame_source = Arc::new(XcapFrameSource::new().context("Failed to attach to the display")?);
    let screen = match XcapFrameSource::primary_screen_size() {
        Ok((width, height)) => Some(Rect::new(0, 0, width, height)),
        Err(e) => {
            tracing::warn!("screen size unknown, overlay limits disabled: {e}");
            None
        }
    };

    let key_source: KeySourceFactory =
        Arc::new(|| DeviceQuerySource::new().map(|s| Box::new(s) as Box<dyn KeySource>));

    let channels = ChannelSet::new();
    let control = ControlLoop::new(
        Collaborators {
            store: store.clone(),
            frame_source,
            source_surface: Box::new(NullSurface::new(RegionKind::Source)),
            output_surface: Box::new(NullSurface::new(RegionKind::Output)),
            screen,
            make_capability: Box::new(Capability::from_config),
            key_source,
            settings: Box::new(HeadlessSettings),
        },
        channels.senders(),
    )?;

    for (combination, description) in control.hotkeys().registered() {
        tracing::info!("hotkey {combination}: {description}");
    }

    if !args.start {
        tracing::info!(
            "idle, press {} to start translating",
            control.config().hotkeys.toggle_running
        );
    }

    let controller = AppController::new(channels);
    let mut task = controller.spawn(control);
    if args.start {
        controller.send(AppEvent::StartRequested).await?;
    }

    tracing::info!("scrim running on profile '{}'. Ctrl+C to exit", store.name());

    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    tokio::select! {
        result = &mut ctrl_c => {
            if let Err(e) = result {
                tracing::error!("failed to listen for ctrl+c: {e}");
            }
            tracing::info!("Shutdown requested");
            controller.shutdown();
            match task.await {
                Ok(Ok(control)) => log_summary(&control),
                Ok(Err(e)) => tracing::error!("event loop failed: {e}"),
                Err(e) => tracing::error!("event loop panicked: {e}"),
            }
        }
        result = &mut task => {
            match result {
                Ok(Ok(control)) => {
                    tracing::warn!("event loop exited");
                    log_summary(&control);
                }
                Ok(Err(e)) => tracing::error!("event loop failed: {e}"),
                Err(e) => tracing::error!("event loop panicked: {e}"),
            }
        }
    }

    Ok(())
}

fn log_summary(control: &ControlLoop) {
    tracing::info!("{}", control.stats().summary());
}
