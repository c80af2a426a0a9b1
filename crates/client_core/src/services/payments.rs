use async_trait::async_trait;
use shared::{
    domain::WorkerId,
    error::ApiError,
    protocol::{Envelope, UnlockRequest, UnlockResponse, UnlockStatus},
};

use super::PaymentApi;
use crate::transport::ApiClient;

#[derive(Debug, Clone)]
pub struct PaymentsService {
    client: ApiClient,
}

impl PaymentsService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PaymentApi for PaymentsService {
    async fn initiate_unlock(&self, request: &UnlockRequest) -> Envelope<UnlockResponse> {
        if request.worker_id.as_str().trim().is_empty() {
            return Envelope::Error(ApiError::validation("worker id is required"));
        }
        self.client.post("/unlock", request).await
    }

    async fn unlock_status(&self, worker_id: &WorkerId) -> Envelope<UnlockStatus> {
        self.client
            .get("/unlock/status", &[("worker_id", Some(worker_id.as_str()))])
            .await
    }
}
