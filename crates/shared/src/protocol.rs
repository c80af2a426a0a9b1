use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        BudgetRange, EstimateId, EstimateStatus, MaterialId, PaymentMethod, TransactionId,
        TrustLevel, WorkerId,
    },
    error::ApiError,
};

pub const DEFAULT_MAX_RESULTS: u32 = 10;

/// Uniform outcome of a backend call.
///
/// On the wire this is either `{"data": …}` or `{"error": {…}}`, never both and
/// never neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Envelope<T> {
    Data(T),
    Error(ApiError),
}

impl<T> Envelope<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Data(data) => Some(data),
            Self::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Self::Data(_) => None,
            Self::Error(err) => Some(err),
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }

    pub fn into_result(self) -> Result<T, ApiError> {
        match self {
            Self::Data(data) => Ok(data),
            Self::Error(err) => Err(err),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        match self {
            Self::Data(data) => Envelope::Data(f(data)),
            Self::Error(err) => Envelope::Error(err),
        }
    }
}

impl<T> From<Result<T, ApiError>> for Envelope<T> {
    fn from(value: Result<T, ApiError>) -> Self {
        match value {
            Ok(data) => Self::Data(data),
            Err(err) => Self::Error(err),
        }
    }
}

fn default_max_results() -> u32 {
    DEFAULT_MAX_RESULTS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSearchRequest {
    pub project_type: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_trust_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_range: Option<BudgetRange>,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

impl WorkerSearchRequest {
    pub fn new(project_type: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            project_type: project_type.into(),
            location: location.into(),
            min_trust_score: None,
            budget_range: None,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn min_trust_score(mut self, score: u32) -> Self {
        self.min_trust_score = Some(score);
        self
    }

    pub fn budget_range(mut self, budget: BudgetRange) -> Self {
        self.budget_range = Some(budget);
        self
    }

    pub fn max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.project_type.trim().is_empty() {
            return Err(ApiError::validation("project type is required"));
        }
        if self.location.trim().is_empty() {
            return Err(ApiError::validation("location is required"));
        }
        if let Some(score) = self.min_trust_score {
            if score > 100 {
                return Err(ApiError::validation(format!(
                    "minimum trust score must be between 0 and 100, got {score}"
                )));
            }
        }
        if self.max_results == 0 {
            return Err(ApiError::validation("result cap must be a positive integer"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustScore {
    pub total_score: u32,
    pub trust_level: TrustLevel,
    #[serde(default)]
    pub breakdown: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_tier: Option<String>,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerPreview {
    pub id: WorkerId,
    pub preview_name: String,
    pub trust_score: TrustScore,
    pub location: String,
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_review: Option<String>,
    #[serde(default)]
    pub photos_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_idr_per_day: Option<i64>,
    pub contact_locked: bool,
    pub unlock_price_idr: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSearchResponse {
    pub workers: Vec<WorkerPreview>,
    pub total_found: u32,
    pub showing: u32,
    pub unlock_price_idr: i64,
    pub ok: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub area: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maps_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReview {
    pub rating: u8,
    pub text: String,
    pub reviewer: String,
    pub date: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerFullDetails {
    pub id: WorkerId,
    pub business_name: String,
    pub trust_score: TrustScore,
    pub contact: WorkerContact,
    pub location: WorkerLocation,
    #[serde(default)]
    pub reviews: Vec<WorkerReview>,
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub photos_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_idr_per_day: Option<i64>,
    #[serde(default)]
    pub negotiation_script: String,
    pub unlocked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockRequest {
    pub worker_id: WorkerId,
    pub payment_method: PaymentMethod,
    pub return_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockResponse {
    pub transaction_id: TransactionId,
    pub payment_url: String,
    pub amount_idr: i64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockStatus {
    pub unlocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateStatusResponse {
    pub estimate_id: EstimateId,
    pub status: EstimateStatus,
    pub progress_percentage: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomItem {
    pub material_name: String,
    pub quantity: f64,
    pub unit: String,
    pub unit_price_idr: i64,
    pub total_price_idr: i64,
    pub source: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketplace_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateResponse {
    pub estimate_id: EstimateId,
    pub status: EstimateStatus,
    pub project_type: String,
    #[serde(default)]
    pub bom_items: Vec<BomItem>,
    #[serde(default)]
    pub total_cost_idr: i64,
    #[serde(default)]
    pub labor_cost_idr: i64,
    #[serde(default)]
    pub grand_total_idr: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub price_idr: i64,
    pub price_source: String,
    pub confidence: f64,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketplace_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

/// Filters for a materials listing; absent fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl MaterialQuery {
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialList {
    pub materials: Vec<Material>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price_idr: i64,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub material_id: MaterialId,
    pub price_history: Vec<PricePoint>,
}
