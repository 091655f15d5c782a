//! Single-flight dispatch of translation jobs.
//!
//! At most one job runs at a time. A submission while a job is running is
//! dropped, never queued. Each accepted job produces exactly one
//! [`JobEvent`] on the event channel.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use kanal::AsyncSender;
use parking_lot::Mutex;
use scrim_capture::Frame;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{TranslateError, Translation, Translator};

pub type JobId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The service answered without any text
    NoContent,
    Cancelled,
    Service(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NoContent => f.write_str("no content"),
            FailureReason::Cancelled => f.write_str("cancelled"),
            FailureReason::Service(e) => f.write_str(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(String),
    Failed(FailureReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEvent {
    pub job_id: JobId,
    pub outcome: JobOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Accepted(JobId),
    /// A job was already running, or the orchestrator is shut down
    Dropped,
}

struct Inflight {
    id: JobId,
    cancel: CancellationToken,
    /// Set by whoever delivers the job's terminal event
    reported: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct TranslationOrchestrator {
    events: AsyncSender<JobEvent>,
    /// Running job, cleared by the worker before it reports
    running: Arc<Mutex<Option<JobId>>>,
    inflight: Option<Inflight>,
    closed: bool,
}

impl TranslationOrchestrator {
    pub fn new(events: AsyncSender<JobEvent>) -> Self {
        Self {
            events,
            running: Arc::new(Mutex::new(None)),
            inflight: None,
            closed: false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.running.lock().is_some()
    }

    pub fn running_job(&self) -> Option<JobId> {
        *self.running.lock()
    }

    /// Start translating `frame` with `translator` unless a job is already
    /// running. Must be called from within a tokio runtime.
    pub fn submit(&mut self, frame: Frame, translator: Arc<dyn Translator>) -> Submission {
        if self.closed {
            tracing::debug!("orchestrator shut down, dropping frame");
            return Submission::Dropped;
        }

        let id = {
            let mut running = self.running.lock();
            if let Some(current) = *running {
                tracing::debug!("job {} still running, dropping frame", current);
                return Submission::Dropped;
            }
            let id = Uuid::new_v4();
            *running = Some(id);
            id
        };

        let cancel = CancellationToken::new();
        let reported = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(run_job(
            id,
            translator,
            frame,
            cancel.clone(),
            self.running.clone(),
            reported.clone(),
            self.events.clone(),
        ));

        tracing::info!("translation job {} submitted", id);
        self.inflight = Some(Inflight {
            id,
            cancel,
            reported,
            handle,
        });
        Submission::Accepted(id)
    }

    /// Cancel the running job, if any. The worker gets `grace` to stop on
    /// its own before it is aborted. Returns whether a job was cancelled.
    pub async fn cancel(&mut self, grace: Duration) -> bool {
        let Some(mut inflight) = self.inflight.take() else {
            return false;
        };
        if inflight.handle.is_finished() {
            return false;
        }

        tracing::info!("cancelling translation job {}", inflight.id);
        inflight.cancel.cancel();

        if tokio::time::timeout(grace, &mut inflight.handle).await.is_err() {
            tracing::warn!(
                "job {} did not stop within {:?}, aborting",
                inflight.id,
                grace
            );
            inflight.handle.abort();
            let _ = inflight.handle.await;

            {
                let mut running = self.running.lock();
                if *running == Some(inflight.id) {
                    *running = None;
                }
            }
            if !inflight.reported.swap(true, Ordering::SeqCst) {
                let event = JobEvent {
                    job_id: inflight.id,
                    outcome: JobOutcome::Failed(FailureReason::Cancelled),
                };
                if let Err(e) = self.events.try_send(event) {
                    tracing::warn!("failed to report aborted job: {}", e);
                }
            }
        }
        true
    }

    /// Cancel with the grace period and refuse all further submissions
    pub async fn shutdown(&mut self, grace: Duration) {
        self.closed = true;
        self.cancel(grace).await;
        tracing::info!("translation orchestrator shut down");
    }
}

async fn run_job(
    id: JobId,
    translator: Arc<dyn Translator>,
    frame: Frame,
    cancel: CancellationToken,
    running: Arc<Mutex<Option<JobId>>>,
    reported: Arc<AtomicBool>,
    events: AsyncSender<JobEvent>,
) {
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => JobOutcome::Failed(FailureReason::Cancelled),
        result = translator.translate(&frame) => outcome_of(result),
    };

    match &outcome {
        JobOutcome::Completed(text) => tracing::info!("job {} completed: {} chars", id, text.len()),
        JobOutcome::Failed(reason) => tracing::warn!("job {} failed: {}", id, reason),
    }

    // Free the slot first so a submission made in response to this event
    // is accepted
    {
        let mut running = running.lock();
        if *running == Some(id) {
            *running = None;
        }
    }

    if reported.swap(true, Ordering::SeqCst) {
        return;
    }
    if let Err(e) = events.send(JobEvent { job_id: id, outcome }).await {
        tracing::error!("failed to deliver result of job {}: {}", id, e);
    }
}

fn outcome_of(result: Result<Translation, TranslateError>) -> JobOutcome {
    match result {
        Ok(translation) => {
            let text = translation.text.trim();
            if text.is_empty() {
                JobOutcome::Failed(FailureReason::NoContent)
            } else {
                JobOutcome::Completed(text.to_string())
            }
        }
        Err(TranslateError::EmptyResponse) => JobOutcome::Failed(FailureReason::NoContent),
        Err(e) => JobOutcome::Failed(FailureReason::Service(e.to_string())),
    }
}
