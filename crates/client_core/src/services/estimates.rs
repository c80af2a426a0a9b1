use async_trait::async_trait;
use shared::{
    domain::EstimateId,
    protocol::{Envelope, EstimateResponse, EstimateStatusResponse},
};

use super::{segment, EstimateApi};
use crate::transport::ApiClient;

#[derive(Debug, Clone)]
pub struct EstimatesService {
    client: ApiClient,
}

impl EstimatesService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EstimateApi for EstimatesService {
    async fn estimate_status(&self, estimate_id: &EstimateId) -> Envelope<EstimateStatusResponse> {
        self.client
            .get(&format!("/estimates/{}/status", segment(estimate_id.as_str())), &[])
            .await
    }

    async fn estimate(&self, estimate_id: &EstimateId) -> Envelope<EstimateResponse> {
        self.client
            .get(&format!("/estimates/{}", segment(estimate_id.as_str())), &[])
            .await
    }
}
