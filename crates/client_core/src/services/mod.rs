//! Domain services: one typed method per backend operation.
//!
//! The traits are the seams controllers depend on; the `*Service` structs are
//! the HTTP implementations over [`ApiClient`](crate::transport::ApiClient).
//! None of them retry, cache or interpret results.

use async_trait::async_trait;
use shared::{
    domain::{EstimateId, MaterialId, WorkerId},
    protocol::{
        Envelope, EstimateResponse, EstimateStatusResponse, MaterialList, MaterialQuery,
        PriceHistory, UnlockRequest, UnlockResponse, UnlockStatus, WorkerFullDetails,
        WorkerPreview, WorkerSearchRequest, WorkerSearchResponse,
    },
};

mod estimates;
mod materials;
mod payments;
mod workers;

pub use estimates::EstimatesService;
pub use materials::MaterialsService;
pub use payments::PaymentsService;
pub use workers::WorkersService;

#[async_trait]
pub trait WorkerApi: Send + Sync {
    async fn search(&self, request: &WorkerSearchRequest) -> Envelope<WorkerSearchResponse>;
    async fn preview(&self, worker_id: &WorkerId) -> Envelope<WorkerPreview>;
    async fn full_details(&self, worker_id: &WorkerId) -> Envelope<WorkerFullDetails>;
}

#[async_trait]
pub trait PaymentApi: Send + Sync {
    async fn initiate_unlock(&self, request: &UnlockRequest) -> Envelope<UnlockResponse>;
    async fn unlock_status(&self, worker_id: &WorkerId) -> Envelope<UnlockStatus>;
}

#[async_trait]
pub trait EstimateApi: Send + Sync {
    async fn estimate_status(&self, estimate_id: &EstimateId) -> Envelope<EstimateStatusResponse>;
    async fn estimate(&self, estimate_id: &EstimateId) -> Envelope<EstimateResponse>;
}

/// Read-only materials reference data, served either by the backend or by a
/// static snapshot.
#[async_trait]
pub trait MaterialCatalog: Send + Sync {
    async fn list(&self, query: &MaterialQuery) -> Envelope<MaterialList>;
    async fn history(&self, material_id: &MaterialId) -> Envelope<PriceHistory>;
}

/// Percent-encodes one path segment.
pub(crate) fn segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
#[path = "../tests/services_tests.rs"]
mod tests;
