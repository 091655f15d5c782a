use kanal::AsyncReceiver;
use scrim_translator::JobEvent;
use scrim_types::AppEvent;
use tokio_util::sync::CancellationToken;

use crate::control::ControlLoop;

/// Receiving ends of the control loop's inputs
pub struct LoopReceivers {
    pub app: AsyncReceiver<AppEvent>,
    pub ticks: AsyncReceiver<()>,
    pub jobs: AsyncReceiver<JobEvent>,
}

/// App's main loop. Every input is handled to completion before the next
/// one is taken, so a tick never overlaps the previous one. Runs the ordered
/// teardown on exit.
pub async fn event_loop(
    mut control: ControlLoop,
    inputs: LoopReceivers,
    cancel: CancellationToken,
) -> anyhow::Result<ControlLoop> {
    tracing::info!("event loop started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("event loop cancelled");
                break;
            }
            event = inputs.app.recv() => match event {
                Ok(AppEvent::Shutdown) => {
                    tracing::info!("shutdown requested");
                    break;
                }
                Ok(event) => control.handle_event(event).await,
                Err(e) => {
                    tracing::warn!("app event channel closed: {}", e);
                    break;
                }
            },
            job = inputs.jobs.recv() => match job {
                Ok(job) => control.on_job_event(job),
                Err(e) => {
                    tracing::warn!("job channel closed: {}", e);
                    break;
                }
            },
            tick = inputs.ticks.recv() => {
                if tick.is_ok() {
                    let outcome = control.on_tick().await;
                    tracing::debug!("tick: {:?}", outcome);
                }
            }
        }
    }

    control.teardown().await;
    Ok(control)
}
