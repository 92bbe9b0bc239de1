//! Job status polling.
//!
//! A [`JobPoller`] turns a job id into a [`PollSubscription`]: a background
//! task that reads the job's status until it completes or fails, and a
//! channel of [`PollEvent`]s for the view that owns the subscription.
//!
//! Every view that needs live progress goes through this one state
//! machine. Dropping the subscription (or calling
//! [`PollSubscription::cancel`]) stops the task at its next suspension
//! point, so nothing is delivered to a view that has gone away.

use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::{AnalysisClient, ClientError};
use crate::intake::IntakeError;
use crate::models::{JobSnapshot, JobStatus};

pub mod policy;

pub use policy::PollPolicy;

/// Shown when a job ends in `error` without a message of its own.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Analysis failed";

/// Shown when the status endpoint itself cannot be read.
pub const MONITOR_FAILURE_MESSAGE: &str = "Failed to monitor analysis progress";

/// Progress events buffered per subscription before the poller waits.
const EVENT_BUFFER: usize = 32;

// ============================================
// Status source seam
// ============================================

/// Anything that can report a job's current status.
pub trait StatusSource: Send + Sync + 'static {
    fn fetch_status(
        &self,
        job_id: &str,
    ) -> impl Future<Output = Result<JobSnapshot, ClientError>> + Send;
}

impl StatusSource for AnalysisClient {
    fn fetch_status(
        &self,
        job_id: &str,
    ) -> impl Future<Output = Result<JobSnapshot, ClientError>> + Send {
        self.job_status(job_id)
    }
}

// ============================================
// States, events, outcomes
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollState {
    NotStarted,
    Polling,
    Completed,
    Failed,
    Cancelled,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::NotStarted | PollState::Polling)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The job itself reported `error`.
    JobError,
    /// The status request failed or came back unusable.
    Transport,
    /// `max_attempts` polls without a terminal status.
    AttemptsExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollFailure {
    pub kind: FailureKind,
    /// User-facing text.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PollFailure {
    fn job_error(snapshot: &JobSnapshot) -> Self {
        Self {
            kind: FailureKind::JobError,
            message: snapshot
                .message()
                .unwrap_or(DEFAULT_FAILURE_MESSAGE)
                .to_string(),
            detail: None,
        }
    }

    fn transport(err: &ClientError) -> Self {
        Self {
            kind: FailureKind::Transport,
            message: err
                .rejection_message()
                .unwrap_or(MONITOR_FAILURE_MESSAGE)
                .to_string(),
            detail: Some(err.to_string()),
        }
    }

    fn exhausted(attempts: u32) -> Self {
        Self {
            kind: FailureKind::AttemptsExhausted,
            message: format!("Analysis did not finish after {} status checks", attempts),
            detail: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// A non-error snapshot, including the final `completed` one.
    Progress(JobSnapshot),
    /// Sent once, `completion_delay` after the `completed` snapshot.
    Completed(JobSnapshot),
    Failed(PollFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(JobSnapshot),
    Failed(PollFailure),
    Cancelled,
}

impl PollOutcome {
    pub fn state(&self) -> PollState {
        match self {
            PollOutcome::Completed(_) => PollState::Completed,
            PollOutcome::Failed(_) => PollState::Failed,
            PollOutcome::Cancelled => PollState::Cancelled,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("job id must not be empty")]
    EmptyJobId,

    #[error("job id is not a single path segment of [A-Za-z0-9_-]")]
    InvalidJobId,
}

// ============================================
// Poller
// ============================================

pub struct JobPoller<S> {
    source: Arc<S>,
    policy: PollPolicy,
}

impl<S> Clone for JobPoller<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            policy: self.policy.clone(),
        }
    }
}

impl<S: StatusSource> JobPoller<S> {
    pub fn new(source: S, policy: PollPolicy) -> Self {
        Self::from_shared(Arc::new(source), policy)
    }

    pub fn from_shared(source: Arc<S>, policy: PollPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Start a polling session for `job_id`.
    ///
    /// Must be called inside a tokio runtime. The session starts in
    /// [`PollState::NotStarted`] and moves to `Polling` once its task runs.
    pub fn watch(&self, job_id: &str) -> Result<PollSubscription, PollError> {
        let job_id = crate::intake::job_id(job_id).map_err(|e| match e {
            IntakeError::EmptyJobId => PollError::EmptyJobId,
            _ => PollError::InvalidJobId,
        })?;

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (state_tx, state_rx) = watch::channel(PollState::NotStarted);
        let cancel = CancellationToken::new();

        let session = PollSession {
            source: Arc::clone(&self.source),
            job_id: job_id.to_string(),
            policy: self.policy.clone(),
            events: events_tx,
            state: state_tx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(session.run());

        Ok(PollSubscription {
            job_id: job_id.to_string(),
            events: events_rx,
            state: state_rx,
            cancel,
            task: Some(task),
        })
    }
}

// ============================================
// Subscription handle
// ============================================

/// A live polling session owned by one view. Cancels itself on drop.
#[derive(Debug)]
pub struct PollSubscription {
    job_id: String,
    events: mpsc::Receiver<PollEvent>,
    state: watch::Receiver<PollState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<PollOutcome>>,
}

impl PollSubscription {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    /// Next event, or `None` once the session has ended and every event
    /// has been read.
    pub async fn next_event(&mut self) -> Option<PollEvent> {
        self.events.recv().await
    }

    pub fn poll_event(&mut self, cx: &mut Context<'_>) -> Poll<Option<PollEvent>> {
        self.events.poll_recv(cx)
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Read every remaining event and wait for the session to end.
    pub async fn run_to_end(mut self) -> (Vec<PollEvent>, PollOutcome) {
        let mut seen = Vec::new();
        while let Some(event) = self.events.recv().await {
            seen.push(event);
        }

        let outcome = match self.task.take() {
            Some(task) => task.await.unwrap_or(PollOutcome::Cancelled),
            None => PollOutcome::Cancelled,
        };
        (seen, outcome)
    }
}

impl Drop for PollSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ============================================
// Poll loop
// ============================================

struct PollSession<S> {
    source: Arc<S>,
    job_id: String,
    policy: PollPolicy,
    events: mpsc::Sender<PollEvent>,
    state: watch::Sender<PollState>,
    cancel: CancellationToken,
}

impl<S: StatusSource> PollSession<S> {
    async fn run(self) -> PollOutcome {
        self.state.send_replace(PollState::Polling);

        let job_id = self.job_id.as_str();
        let mut delay = self.policy.interval;
        let mut attempts = 0u32;
        let mut last_status: Option<JobStatus> = None;

        loop {
            attempts += 1;

            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancelled(),
                fetched = self.source.fetch_status(job_id) => fetched,
            };

            let snapshot = match fetched {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(job_id, attempts, error = %e, "Status poll failed");
                    return self.fail(PollFailure::transport(&e)).await;
                }
            };

            if let Some(previous) = &last_status {
                if snapshot.status.regressed_from(previous) {
                    tracing::warn!(
                        job_id,
                        from = %previous,
                        to = %snapshot.status,
                        "Job status regressed"
                    );
                }
            }
            last_status = Some(snapshot.status.clone());

            match snapshot.status {
                JobStatus::Error => {
                    tracing::info!(job_id, attempts, "Job reported an error");
                    return self.fail(PollFailure::job_error(&snapshot)).await;
                }
                JobStatus::Completed => {
                    if !self.emit(PollEvent::Progress(snapshot.clone())).await {
                        return self.cancelled();
                    }
                    if !self.pause(self.policy.completion_delay).await {
                        return self.cancelled();
                    }

                    tracing::info!(job_id, attempts, "Job completed");
                    self.state.send_replace(PollState::Completed);
                    self.emit(PollEvent::Completed(snapshot.clone())).await;
                    return PollOutcome::Completed(snapshot);
                }
                _ => {
                    tracing::debug!(
                        job_id,
                        attempts,
                        status = %snapshot.status,
                        progress = snapshot.progress,
                        "Job still running"
                    );
                    if !self.emit(PollEvent::Progress(snapshot)).await {
                        return self.cancelled();
                    }

                    if self.policy.attempts_exhausted(attempts) {
                        tracing::warn!(job_id, attempts, "Giving up on job status");
                        return self.fail(PollFailure::exhausted(attempts)).await;
                    }

                    if !self.pause(delay).await {
                        return self.cancelled();
                    }
                    delay = self.policy.next_delay(delay);
                }
            }
        }
    }

    /// Deliver an event. `false` when the subscriber has gone away.
    async fn emit(&self, event: PollEvent) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.events.send(event) => sent.is_ok(),
        }
    }

    /// Sleep for `delay`. `false` when cancelled first.
    async fn pause(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            return !self.cancel.is_cancelled();
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = self.events.closed() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    async fn fail(&self, failure: PollFailure) -> PollOutcome {
        self.state.send_replace(PollState::Failed);
        self.emit(PollEvent::Failed(failure.clone())).await;
        PollOutcome::Failed(failure)
    }

    fn cancelled(&self) -> PollOutcome {
        tracing::debug!(job_id = %self.job_id, "Polling cancelled");
        self.state.send_replace(PollState::Cancelled);
        PollOutcome::Cancelled
    }
}
