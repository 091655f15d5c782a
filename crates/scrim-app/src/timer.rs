use std::time::Duration;

use kanal::AsyncSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Periodic capture tick source.
///
/// Ticks go through a channel of capacity one with `try_send`: while the
/// control loop is still handling a tick, further ticks are dropped rather
/// than queued.
pub struct CaptureTimer {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    period: Duration,
}

impl CaptureTimer {
    pub fn start(period: Duration, ticks: AsyncSender<()>) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => match ticks.try_send(()) {
                        Ok(true) => {}
                        Ok(false) => tracing::debug!("previous tick still pending, skipping"),
                        Err(e) => {
                            tracing::warn!("tick channel closed: {}", e);
                            break;
                        }
                    },
                }
            }
            tracing::debug!("capture timer stopped");
        });

        tracing::info!("capture timer started, every {:?}", period);
        Self {
            cancel,
            handle,
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            tracing::error!("capture timer task failed: {}", e);
        }
    }
}
