use async_trait::async_trait;
use shared::{
    domain::MaterialId,
    protocol::{Envelope, MaterialList, MaterialQuery, PriceHistory},
};

use super::{segment, MaterialCatalog};
use crate::transport::ApiClient;

/// Live materials catalog served by the backend.
#[derive(Debug, Clone)]
pub struct MaterialsService {
    client: ApiClient,
}

impl MaterialsService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MaterialCatalog for MaterialsService {
    async fn list(&self, query: &MaterialQuery) -> Envelope<MaterialList> {
        self.client
            .get(
                "/materials",
                &[
                    ("category", query.category.as_deref()),
                    ("search", query.search.as_deref()),
                ],
            )
            .await
    }

    async fn history(&self, material_id: &MaterialId) -> Envelope<PriceHistory> {
        self.client
            .get(
                &format!("/materials/{}/history", segment(material_id.as_str())),
                &[],
            )
            .await
    }
}
