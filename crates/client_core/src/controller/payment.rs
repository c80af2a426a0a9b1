use std::sync::Arc;

use shared::{
    domain::{PaymentMethod, WorkerId},
    protocol::{Envelope, UnlockRequest, UnlockResponse},
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;

use super::state::{RequestState, StateCell};
use crate::services::PaymentApi;

/// Where the user is sent to complete a payment.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

pub type PaymentState = RequestState<UnlockResponse>;

pub struct PaymentController {
    api: Arc<dyn PaymentApi>,
    navigator: Arc<dyn Navigator>,
    app_origin: Url,
    state: StateCell<PaymentState>,
}

impl PaymentController {
    pub fn new(api: Arc<dyn PaymentApi>, navigator: Arc<dyn Navigator>, app_origin: Url) -> Self {
        Self {
            api,
            navigator,
            app_origin,
            state: StateCell::new(PaymentState::default()),
        }
    }

    pub fn state(&self) -> PaymentState {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PaymentState> {
        self.state.subscribe()
    }

    /// `{origin}/workers/{id}?payment=return`
    pub fn return_url(&self, worker_id: &WorkerId) -> String {
        let mut url = self.app_origin.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.clear().push("workers").push(worker_id.as_str());
        }
        url.query_pairs_mut().append_pair("payment", "return");
        url.into()
    }

    /// Starts an unlock and sends the user to the gateway on success. A failed
    /// initiation only records the error.
    pub async fn initiate_unlock(&self, worker_id: &WorkerId, payment_method: PaymentMethod) {
        if self.state.update(RequestState::begin).is_none() {
            return;
        }

        let request = UnlockRequest {
            worker_id: worker_id.clone(),
            payment_method,
            return_url: self.return_url(worker_id),
        };
        let envelope = self.api.initiate_unlock(&request).await;
        let redirect = envelope.data().map(|response| response.payment_url.clone());
        if let Envelope::Error(err) = &envelope {
            warn!(
                worker_id = %worker_id,
                payment_method = payment_method.as_str(),
                error = %err,
                "unlock initiation failed"
            );
        }

        if self
            .state
            .update(|state| state.resolve(envelope))
            .is_none()
        {
            debug!(worker_id = %worker_id, "payment controller torn down; not redirecting");
            return;
        }
        if let Some(payment_url) = redirect {
            info!(worker_id = %worker_id, %payment_url, "redirecting to payment gateway");
            self.navigator.navigate(&payment_url);
        }
    }

    /// Whether the worker is unlocked. Any failure reads as locked; state is
    /// left untouched either way.
    pub async fn check_unlock_status(&self, worker_id: &WorkerId) -> bool {
        match self.api.unlock_status(worker_id).await {
            Envelope::Data(status) => status.unlocked,
            Envelope::Error(err) => {
                warn!(worker_id = %worker_id, error = %err, "unlock status check failed");
                false
            }
        }
    }

    pub fn teardown(&self) {
        self.state.release();
    }
}

#[cfg(test)]
#[path = "../tests/payment_controller_tests.rs"]
mod tests;
