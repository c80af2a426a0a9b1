use async_trait::async_trait;
use shared::{
    domain::WorkerId,
    error::ApiError,
    protocol::{
        Envelope, WorkerFullDetails, WorkerPreview, WorkerSearchRequest, WorkerSearchResponse,
    },
};

use super::{segment, WorkerApi};
use crate::transport::ApiClient;

#[derive(Debug, Clone)]
pub struct WorkersService {
    client: ApiClient,
}

impl WorkersService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

fn require_worker_id(worker_id: &WorkerId) -> Result<(), ApiError> {
    if worker_id.as_str().trim().is_empty() {
        return Err(ApiError::validation("worker id is required"));
    }
    Ok(())
}

#[async_trait]
impl WorkerApi for WorkersService {
    async fn search(&self, request: &WorkerSearchRequest) -> Envelope<WorkerSearchResponse> {
        if let Err(err) = request.validate() {
            return Envelope::Error(err);
        }
        self.client.post("/workers/search", request).await
    }

    async fn preview(&self, worker_id: &WorkerId) -> Envelope<WorkerPreview> {
        if let Err(err) = require_worker_id(worker_id) {
            return Envelope::Error(err);
        }
        self.client
            .get(&format!("/workers/{}/preview", segment(worker_id.as_str())), &[])
            .await
    }

    async fn full_details(&self, worker_id: &WorkerId) -> Envelope<WorkerFullDetails> {
        if let Err(err) = require_worker_id(worker_id) {
            return Envelope::Error(err);
        }
        self.client
            .get(&format!("/workers/{}/detail", segment(worker_id.as_str())), &[])
            .await
    }
}
