//! Static materials snapshot served behind the same [`MaterialCatalog`]
//! interface as the live backend.

use async_trait::async_trait;
use serde::Deserialize;
use shared::{
    domain::MaterialId,
    error::ApiError,
    protocol::{Envelope, Material, MaterialList, MaterialQuery, PriceHistory, PricePoint},
};

use crate::services::MaterialCatalog;

const EMBEDDED_SEED: &str = include_str!("../data/materials.json");

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub material: Material,
    #[serde(default)]
    pub price_history: Vec<PricePoint>,
}

#[derive(Debug, Deserialize)]
struct Seed {
    materials: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: Vec<CatalogEntry>,
}

impl StaticCatalog {
    /// Catalog backed by the seed table bundled with the crate.
    pub fn embedded() -> Result<Self, serde_json::Error> {
        Self::from_json(EMBEDDED_SEED)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let seed: Seed = serde_json::from_str(raw)?;
        Ok(Self::from_entries(seed.materials))
    }

    pub fn from_entries(mut entries: Vec<CatalogEntry>) -> Self {
        entries.sort_by(|a, b| {
            a.material
                .category
                .cmp(&b.material.category)
                .then_with(|| a.material.name.cmp(&b.material.name))
        });
        for entry in &mut entries {
            entry.price_history.sort_by_key(|point| point.date);
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct categories, sorted.
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = self
            .entries
            .iter()
            .map(|entry| entry.material.category.as_str())
            .collect();
        categories.dedup();
        categories
    }

    pub fn find(&self, material_id: &MaterialId) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|entry| &entry.material.id == material_id)
    }

    fn matching<'a>(&'a self, query: &'a MaterialQuery) -> impl Iterator<Item = &'a Material> + 'a {
        let category = query
            .category
            .as_deref()
            .map(str::trim)
            .filter(|category| !category.is_empty());
        let term = query
            .search
            .as_deref()
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty());

        self.entries
            .iter()
            .map(|entry| &entry.material)
            .filter(move |material| {
                category.map_or(true, |category| {
                    material.category.eq_ignore_ascii_case(category)
                })
            })
            .filter(move |material| match &term {
                Some(term) => matches_term(material, term),
                None => true,
            })
    }
}

fn matches_term(material: &Material, term: &str) -> bool {
    material.name.to_lowercase().contains(term)
        || material.id.as_str().to_lowercase().contains(term)
        || material.category.to_lowercase().contains(term)
        || material
            .aliases
            .iter()
            .any(|alias| alias.to_lowercase().contains(term))
}

#[async_trait]
impl MaterialCatalog for StaticCatalog {
    async fn list(&self, query: &MaterialQuery) -> Envelope<MaterialList> {
        Envelope::Data(MaterialList {
            materials: self.matching(query).cloned().collect(),
        })
    }

    async fn history(&self, material_id: &MaterialId) -> Envelope<PriceHistory> {
        match self.find(material_id) {
            Some(entry) => Envelope::Data(PriceHistory {
                material_id: material_id.clone(),
                price_history: entry.price_history.clone(),
            }),
            None => Envelope::Error(ApiError::not_found(format!(
                "material {material_id} not found"
            ))),
        }
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
