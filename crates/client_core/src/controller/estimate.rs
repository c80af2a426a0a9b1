//! Polling of asynchronous estimate generation.
//!
//! A poll runs on its own task until the estimate reaches a terminal status,
//! fails with a domain error, or exceeds the policy timeout. Transport errors
//! are recorded and retried on the next tick.

use std::{sync::Arc, time::Duration};

use shared::{
    domain::{EstimateId, EstimateStatus},
    error::{ApiError, ESTIMATE_FAILED, ESTIMATE_TIMEOUT},
    protocol::{Envelope, EstimateResponse, EstimateStatusResponse},
};
use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use super::state::StateCell;
use crate::services::EstimateApi;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    /// Same policy with the interval raised to at least [`MIN_POLL_INTERVAL`].
    pub fn clamped(self) -> Self {
        Self {
            interval: self.interval.max(MIN_POLL_INTERVAL),
            timeout: self.timeout,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EstimatePollState {
    pub estimate_id: EstimateId,
    pub polling: bool,
    pub status: Option<EstimateStatus>,
    pub progress_percentage: u8,
    pub message: Option<String>,
    pub result: Option<EstimateResponse>,
    pub error: Option<ApiError>,
    pub polls: u32,
}

impl EstimatePollState {
    fn new(estimate_id: EstimateId) -> Self {
        Self {
            estimate_id,
            polling: true,
            status: None,
            progress_percentage: 0,
            message: None,
            result: None,
            error: None,
            polls: 0,
        }
    }

    pub fn timed_out(&self) -> bool {
        self.error_code() == Some(ESTIMATE_TIMEOUT)
    }

    pub fn failed(&self) -> bool {
        self.error_code() == Some(ESTIMATE_FAILED)
    }

    fn error_code(&self) -> Option<&str> {
        self.error.as_ref().and_then(ApiError::code)
    }

    /// Folds one status report in and returns the status now in effect.
    /// Backwards moves in status or progress are ignored.
    fn apply(&mut self, report: &EstimateStatusResponse) -> Option<EstimateStatus> {
        self.polls += 1;
        self.error = None;
        match self.status {
            Some(current) if !current.can_transition_to(report.status) => {
                warn!(
                    estimate_id = %self.estimate_id,
                    current = %current,
                    reported = %report.status,
                    "ignoring backwards estimate status"
                );
            }
            _ => self.status = Some(report.status),
        }
        if report.progress_percentage >= self.progress_percentage {
            self.progress_percentage = report.progress_percentage.min(100);
        }
        if report.message.is_some() {
            self.message.clone_from(&report.message);
        }
        self.status
    }

    fn finish(&mut self, outcome: Result<EstimateResponse, ApiError>) {
        self.polling = false;
        match outcome {
            Ok(estimate) => {
                self.progress_percentage = 100;
                self.result = Some(estimate);
                self.error = None;
            }
            Err(err) => self.error = Some(err),
        }
    }
}

pub struct EstimatePoller {
    api: Arc<dyn EstimateApi>,
    policy: PollPolicy,
}

impl EstimatePoller {
    pub fn new(api: Arc<dyn EstimateApi>, policy: PollPolicy) -> Self {
        let clamped = policy.clamped();
        if clamped != policy {
            warn!(
                requested = ?policy.interval,
                interval = ?clamped.interval,
                "estimate poll interval too short; raised to minimum"
            );
        }
        Self {
            api,
            policy: clamped,
        }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Spawns the poll loop; must be called from within a Tokio runtime.
    pub fn start(&self, estimate_id: EstimateId) -> PollHandle {
        let state = Arc::new(StateCell::new(EstimatePollState::new(estimate_id.clone())));
        let task = tokio::spawn(run_poll(
            Arc::clone(&self.api),
            self.policy,
            estimate_id,
            Arc::clone(&state),
        ));
        PollHandle {
            state,
            task: Some(task),
        }
    }
}

/// Owner of one running poll. Dropping the handle cancels the poll.
pub struct PollHandle {
    state: Arc<StateCell<EstimatePollState>>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn snapshot(&self) -> EstimatePollState {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EstimatePollState> {
        self.state.subscribe()
    }

    /// Stops polling. No state change is published after this returns.
    pub fn cancel(&mut self) {
        self.state.release();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        !self.state.is_live()
    }

    /// Waits for the poll to end and returns the final state. A poll task
    /// that died without finishing leaves an error in the state.
    pub async fn wait(mut self) -> EstimatePollState {
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "estimate poll task ended abnormally");
                let message = format!("Estimate polling stopped unexpectedly: {err}");
                self.state.update(|poll| {
                    if poll.polling {
                        poll.finish(Err(ApiError::new(message)));
                    }
                });
            }
        }
        self.state.snapshot()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cancel();
        }
    }
}

async fn run_poll(
    api: Arc<dyn EstimateApi>,
    policy: PollPolicy,
    estimate_id: EstimateId,
    state: Arc<StateCell<EstimatePollState>>,
) {
    let deadline = Instant::now() + policy.timeout;
    let mut ticker = time::interval(policy.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(estimate_id = %estimate_id, interval = ?policy.interval, timeout = ?policy.timeout, "estimate poll started");

    loop {
        ticker.tick().await;
        if Instant::now() >= deadline {
            break;
        }

        let envelope = match time::timeout_at(deadline, api.estimate_status(&estimate_id)).await {
            Ok(envelope) => envelope,
            Err(_) => break,
        };

        let report = match envelope {
            Envelope::Data(report) => report,
            Envelope::Error(err) if err.is_transport() => {
                warn!(estimate_id = %estimate_id, error = %err, "estimate status unavailable; retrying");
                if state
                    .update(|poll| {
                        poll.polls += 1;
                        poll.error = Some(err);
                    })
                    .is_none()
                {
                    return;
                }
                continue;
            }
            Envelope::Error(err) => {
                warn!(estimate_id = %estimate_id, error = %err, "estimate status rejected; stopping");
                state.update(|poll| poll.finish(Err(err)));
                return;
            }
        };

        let Some(status) = state.update(|poll| poll.apply(&report)).flatten() else {
            return;
        };
        debug!(
            estimate_id = %estimate_id,
            status = %status,
            progress = report.progress_percentage,
            "estimate status"
        );

        match status {
            EstimateStatus::Completed => {
                let outcome = api.estimate(&estimate_id).await.into_result();
                match &outcome {
                    Ok(estimate) => info!(
                        estimate_id = %estimate_id,
                        grand_total_idr = estimate.grand_total_idr,
                        "estimate completed"
                    ),
                    Err(err) => warn!(estimate_id = %estimate_id, error = %err, "completed estimate could not be fetched"),
                }
                state.update(|poll| poll.finish(outcome));
                return;
            }
            EstimateStatus::Failed => {
                let message = report
                    .message
                    .clone()
                    .unwrap_or_else(|| "Estimate failed".to_string());
                warn!(estimate_id = %estimate_id, %message, "estimate failed");
                state.update(|poll| poll.finish(Err(ApiError::with_code(message, ESTIMATE_FAILED))));
                return;
            }
            EstimateStatus::Pending | EstimateStatus::Processing => {}
        }
    }

    warn!(estimate_id = %estimate_id, timeout = ?policy.timeout, "estimate poll timed out");
    let err = ApiError::with_code(
        format!(
            "Estimate {estimate_id} did not finish within {} seconds",
            policy.timeout.as_secs()
        ),
        ESTIMATE_TIMEOUT,
    );
    state.update(|poll| poll.finish(Err(err)));
}

#[cfg(test)]
#[path = "../tests/estimate_poller_tests.rs"]
mod tests;
