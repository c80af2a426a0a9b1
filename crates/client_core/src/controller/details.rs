use std::sync::{Arc, Mutex, PoisonError};

use shared::{
    domain::WorkerId,
    protocol::{Envelope, WorkerFullDetails, WorkerPreview},
};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::state::{RequestState, StateCell};
use crate::services::WorkerApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailsMode {
    Preview,
    Full,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerDetails {
    Preview(WorkerPreview),
    Full(Box<WorkerFullDetails>),
}

impl WorkerDetails {
    pub fn worker_id(&self) -> &WorkerId {
        match self {
            Self::Preview(preview) => &preview.id,
            Self::Full(details) => &details.id,
        }
    }
}

pub type DetailsState = RequestState<WorkerDetails>;

/// Loads one worker's preview or unlocked details, refetching whenever the
/// selected worker changes.
pub struct DetailsController {
    api: Arc<dyn WorkerApi>,
    mode: DetailsMode,
    worker_id: Mutex<Option<WorkerId>>,
    state: StateCell<DetailsState>,
}

impl DetailsController {
    pub fn new(api: Arc<dyn WorkerApi>, mode: DetailsMode) -> Self {
        Self {
            api,
            mode,
            worker_id: Mutex::new(None),
            state: StateCell::new(DetailsState::default()),
        }
    }

    pub fn mode(&self) -> DetailsMode {
        self.mode
    }

    pub fn worker_id(&self) -> Option<WorkerId> {
        self.worker_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self) -> DetailsState {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DetailsState> {
        self.state.subscribe()
    }

    /// Selects a worker. Fetches only when the id changed and is present.
    pub async fn set_worker_id(&self, worker_id: Option<WorkerId>) {
        let changed = {
            let mut current = self.worker_id.lock().unwrap_or_else(PoisonError::into_inner);
            if *current == worker_id {
                false
            } else {
                current.clone_from(&worker_id);
                true
            }
        };
        match worker_id {
            Some(worker_id) if changed => self.fetch(worker_id).await,
            _ => {}
        }
    }

    /// Re-runs the fetch for the current worker, if any.
    pub async fn refetch(&self) {
        if let Some(worker_id) = self.worker_id() {
            self.fetch(worker_id).await;
        }
    }

    pub fn teardown(&self) {
        self.state.release();
    }

    async fn fetch(&self, worker_id: WorkerId) {
        if self.state.update(RequestState::begin).is_none() {
            return;
        }

        let envelope = match self.mode {
            DetailsMode::Preview => self.api.preview(&worker_id).await.map(WorkerDetails::Preview),
            DetailsMode::Full => self
                .api
                .full_details(&worker_id)
                .await
                .map(|details| WorkerDetails::Full(Box::new(details))),
        };
        if let Envelope::Error(err) = &envelope {
            warn!(worker_id = %worker_id, mode = ?self.mode, error = %err, "worker details failed");
        }

        if self
            .state
            .update(|state| state.resolve(envelope))
            .is_none()
        {
            debug!(worker_id = %worker_id, "details controller torn down; discarding result");
        }
    }
}

#[cfg(test)]
#[path = "../tests/details_controller_tests.rs"]
mod tests;
