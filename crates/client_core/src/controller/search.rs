use std::sync::Arc;

use shared::protocol::{Envelope, WorkerSearchRequest, WorkerSearchResponse};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::state::{RequestState, StateCell};
use crate::services::WorkerApi;

pub type SearchState = RequestState<WorkerSearchResponse>;

/// Drives worker searches. Overlapping calls are not cancelled: whichever
/// resolves last owns the final state.
pub struct SearchController {
    api: Arc<dyn WorkerApi>,
    state: StateCell<SearchState>,
}

impl SearchController {
    pub fn new(api: Arc<dyn WorkerApi>) -> Self {
        Self {
            api,
            state: StateCell::new(SearchState::default()),
        }
    }

    pub fn state(&self) -> SearchState {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub async fn search(&self, request: WorkerSearchRequest) {
        if self.state.update(RequestState::begin).is_none() {
            debug!("search controller torn down; ignoring search");
            return;
        }

        let envelope = self.api.search(&request).await;
        match &envelope {
            Envelope::Data(response) => debug!(
                project_type = %request.project_type,
                location = %request.location,
                total_found = response.total_found,
                showing = response.showing,
                "worker search resolved"
            ),
            Envelope::Error(err) => warn!(
                project_type = %request.project_type,
                location = %request.location,
                error = %err,
                "worker search failed"
            ),
        }

        if self
            .state
            .update(|state| state.resolve(envelope))
            .is_none()
        {
            debug!("search controller torn down; discarding result");
        }
    }

    /// Back to idle. An in-flight search still lands when it resolves.
    pub fn reset(&self) {
        self.state.update(|state| *state = SearchState::default());
    }

    pub fn teardown(&self) {
        self.state.release();
    }
}

#[cfg(test)]
#[path = "../tests/search_controller_tests.rs"]
mod tests;
