//! Client layer for the renovation cost estimator backend: configuration, the
//! HTTP transport, typed domain services, a static materials catalog, and
//! observable controllers built on top of them.

use std::sync::Arc;

pub mod catalog;
pub mod config;
pub mod controller;
pub mod services;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use catalog::StaticCatalog;
pub use config::{load_settings, AppEnvironment, ClientSettings, ConfigError};
pub use controller::{
    DetailsController, DetailsMode, EstimatePollState, EstimatePoller, Navigator,
    PaymentController, PollHandle, PollPolicy, RequestState, SearchController, WorkerDetails,
};
pub use services::{
    EstimateApi, EstimatesService, MaterialCatalog, MaterialsService, PaymentApi,
    PaymentsService, WorkerApi, WorkersService,
};
pub use transport::ApiClient;

/// One handle per backend concern, shared by every controller built from it.
#[derive(Clone)]
pub struct Backend {
    pub workers: Arc<dyn WorkerApi>,
    pub payments: Arc<dyn PaymentApi>,
    pub estimates: Arc<dyn EstimateApi>,
    pub materials: Arc<dyn MaterialCatalog>,
}

impl Backend {
    /// HTTP services over a single shared client.
    pub fn connect(settings: &ClientSettings) -> Result<Self, ConfigError> {
        let client = ApiClient::new(settings)?;
        Ok(Self {
            workers: Arc::new(WorkersService::new(client.clone())),
            payments: Arc::new(PaymentsService::new(client.clone())),
            estimates: Arc::new(EstimatesService::new(client.clone())),
            materials: Arc::new(MaterialsService::new(client)),
        })
    }

    /// Serves materials from `catalog` instead of the backend.
    pub fn with_catalog(mut self, catalog: Arc<dyn MaterialCatalog>) -> Self {
        self.materials = catalog;
        self
    }

    pub fn search(&self) -> SearchController {
        SearchController::new(Arc::clone(&self.workers))
    }

    pub fn details(&self, mode: DetailsMode) -> DetailsController {
        DetailsController::new(Arc::clone(&self.workers), mode)
    }

    pub fn payments(
        &self,
        navigator: Arc<dyn Navigator>,
        settings: &ClientSettings,
    ) -> PaymentController {
        PaymentController::new(
            Arc::clone(&self.payments),
            navigator,
            settings.app_origin.clone(),
        )
    }

    pub fn estimate_poller(&self, policy: PollPolicy) -> EstimatePoller {
        EstimatePoller::new(Arc::clone(&self.estimates), policy)
    }
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
