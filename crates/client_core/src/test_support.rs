//! Helpers shared by the crate's test suites: in-process HTTP backends and
//! scripted fakes of the service traits.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use axum::Router;
use shared::{
    domain::{EstimateId, EstimateStatus, TrustLevel, WorkerId},
    error::ApiError,
    protocol::{
        Envelope, EstimateResponse, EstimateStatusResponse, TrustScore, UnlockRequest,
        UnlockResponse, UnlockStatus, WorkerFullDetails, WorkerPreview, WorkerSearchRequest,
        WorkerSearchResponse,
    },
};
use tokio::net::TcpListener;
use url::Url;

use crate::{
    config::ClientSettings,
    controller::Navigator,
    services::{EstimateApi, PaymentApi, WorkerApi},
    transport::ApiClient,
};

pub(crate) async fn spawn_server(app: Router) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Url::parse(&format!("http://{addr}")).expect("server url")
}

pub(crate) fn client_for(base_url: Url) -> ApiClient {
    ApiClient::new(&ClientSettings::new(base_url)).expect("api client")
}

/// A base URL nobody listens on.
pub(crate) async fn unreachable_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    Url::parse(&format!("http://{addr}")).expect("url")
}

pub(crate) fn sample_trust_score() -> TrustScore {
    TrustScore {
        total_score: 85,
        trust_level: TrustLevel::High,
        breakdown: [("reviews".to_string(), 20.0), ("source".to_string(), 24.0)]
            .into_iter()
            .collect(),
        source_tier: Some("google_maps".to_string()),
        review_count: 50,
        rating: Some(4.8),
    }
}

pub(crate) fn sample_preview(id: &str) -> WorkerPreview {
    WorkerPreview {
        id: WorkerId::new(id),
        preview_name: "Pak W***** Pool Service".to_string(),
        trust_score: sample_trust_score(),
        location: "Canggu".to_string(),
        specializations: vec!["pool".to_string(), "tiling".to_string()],
        preview_review: Some("Excellent pool work, finished on time".to_string()),
        photos_count: 15,
        opening_hours: Some("Mon-Sat 8AM-5PM".to_string()),
        price_idr_per_day: Some(450_000),
        contact_locked: true,
        unlock_price_idr: 50_000,
    }
}

pub(crate) fn sample_search_response(total_found: u32, ids: &[&str]) -> WorkerSearchResponse {
    WorkerSearchResponse {
        workers: ids.iter().map(|id| sample_preview(id)).collect(),
        total_found,
        showing: ids.len() as u32,
        unlock_price_idr: 50_000,
        ok: true,
    }
}

pub(crate) fn sample_full_details(id: &str) -> WorkerFullDetails {
    WorkerFullDetails {
        id: WorkerId::new(id),
        business_name: "Pak Wayan Pool Service".to_string(),
        trust_score: sample_trust_score(),
        contact: shared::protocol::WorkerContact {
            phone: Some("+62361234567".to_string()),
            whatsapp: Some("+62812345678".to_string()),
            email: Some("pakwayan@example.com".to_string()),
            website: None,
        },
        location: shared::protocol::WorkerLocation {
            address: Some("Jl. Raya Canggu No. 123".to_string()),
            area: "Canggu".to_string(),
            latitude: Some(-8.65),
            longitude: Some(115.1333),
            maps_url: None,
        },
        reviews: Vec::new(),
        specializations: vec!["pool".to_string()],
        photos_count: 15,
        opening_hours: None,
        categories: vec!["Pool contractor".to_string()],
        price_idr_per_day: Some(450_000),
        negotiation_script: "Ask about warranty and post-completion support".to_string(),
        unlocked_at: "2025-11-25T10:00:00Z".parse().expect("timestamp"),
    }
}

pub(crate) fn sample_unlock_response(worker_id: &str) -> UnlockResponse {
    UnlockResponse {
        transaction_id: format!("txn-{worker_id}").into(),
        payment_url: format!("https://app.sandbox.midtrans.com/snap/v2/vtweb/{worker_id}"),
        amount_idr: 50_000,
        expires_at: "2025-11-25T11:00:00Z".parse().expect("timestamp"),
    }
}

pub(crate) fn sample_estimate(id: &str) -> EstimateResponse {
    EstimateResponse {
        estimate_id: EstimateId::new(id),
        status: EstimateStatus::Completed,
        project_type: "bathroom_renovation".to_string(),
        bom_items: vec![shared::protocol::BomItem {
            material_name: "Ceramic Tiles 40x40cm".to_string(),
            quantity: 25.0,
            unit: "m2".to_string(),
            unit_price_idr: 150_000,
            total_price_idr: 3_750_000,
            source: "tokopedia".to_string(),
            confidence: 0.95,
            marketplace_url: None,
        }],
        total_cost_idr: 3_750_000,
        labor_cost_idr: 1_250_000,
        grand_total_idr: 5_000_000,
        created_at: "2025-11-25T10:00:00Z".parse().expect("timestamp"),
        updated_at: "2025-11-25T10:05:00Z".parse().expect("timestamp"),
        error_message: None,
    }
}

pub(crate) fn status(
    id: &str,
    status: EstimateStatus,
    progress_percentage: u8,
) -> EstimateStatusResponse {
    EstimateStatusResponse {
        estimate_id: EstimateId::new(id),
        status,
        progress_percentage,
        message: None,
    }
}

/// One scripted reply: the envelope to return and how long to wait first.
pub(crate) struct Scripted<T> {
    pub delay: Duration,
    pub reply: Envelope<T>,
}

impl<T> Scripted<T> {
    pub fn now(reply: Envelope<T>) -> Self {
        Self {
            delay: Duration::ZERO,
            reply,
        }
    }

    pub fn after(delay: Duration, reply: Envelope<T>) -> Self {
        Self { delay, reply }
    }
}

async fn play<T>(scripted: Option<Scripted<T>>, what: &str) -> Envelope<T> {
    match scripted {
        Some(Scripted { delay, reply }) => {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            reply
        }
        None => Envelope::Error(ApiError::new(format!("no scripted reply for {what}"))),
    }
}

/// `WorkerApi` fake: replies are keyed by project type (search) or worker id.
#[derive(Default)]
pub(crate) struct FakeWorkerApi {
    pub searches: Mutex<HashMap<String, Scripted<WorkerSearchResponse>>>,
    pub previews: Mutex<HashMap<String, VecDeque<Scripted<WorkerPreview>>>>,
    pub details: Mutex<HashMap<String, VecDeque<Scripted<WorkerFullDetails>>>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeWorkerApi {
    pub fn search_reply(self, project_type: &str, scripted: Scripted<WorkerSearchResponse>) -> Self {
        self.searches
            .lock()
            .expect("lock")
            .insert(project_type.to_string(), scripted);
        self
    }

    pub fn preview_reply(self, worker_id: &str, scripted: Scripted<WorkerPreview>) -> Self {
        self.previews
            .lock()
            .expect("lock")
            .entry(worker_id.to_string())
            .or_default()
            .push_back(scripted);
        self
    }

    pub fn details_reply(self, worker_id: &str, scripted: Scripted<WorkerFullDetails>) -> Self {
        self.details
            .lock()
            .expect("lock")
            .entry(worker_id.to_string())
            .or_default()
            .push_back(scripted);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl WorkerApi for FakeWorkerApi {
    async fn search(&self, request: &WorkerSearchRequest) -> Envelope<WorkerSearchResponse> {
        self.calls
            .lock()
            .expect("lock")
            .push(format!("search:{}", request.project_type));
        let scripted = self
            .searches
            .lock()
            .expect("lock")
            .remove(&request.project_type);
        play(scripted, "search").await
    }

    async fn preview(&self, worker_id: &WorkerId) -> Envelope<WorkerPreview> {
        self.calls
            .lock()
            .expect("lock")
            .push(format!("preview:{worker_id}"));
        let scripted = self
            .previews
            .lock()
            .expect("lock")
            .get_mut(worker_id.as_str())
            .and_then(VecDeque::pop_front);
        play(scripted, "preview").await
    }

    async fn full_details(&self, worker_id: &WorkerId) -> Envelope<WorkerFullDetails> {
        self.calls
            .lock()
            .expect("lock")
            .push(format!("details:{worker_id}"));
        let scripted = self
            .details
            .lock()
            .expect("lock")
            .get_mut(worker_id.as_str())
            .and_then(VecDeque::pop_front);
        play(scripted, "details").await
    }
}

#[derive(Default)]
pub(crate) struct FakePaymentApi {
    pub unlock_reply: Mutex<Option<Envelope<UnlockResponse>>>,
    pub unlocked: Mutex<HashMap<String, bool>>,
    pub requests: Mutex<Vec<UnlockRequest>>,
}

impl FakePaymentApi {
    pub fn unlock_reply(self, reply: Envelope<UnlockResponse>) -> Self {
        *self.unlock_reply.lock().expect("lock") = Some(reply);
        self
    }

    pub fn unlocked(self, worker_id: &str) -> Self {
        self.unlocked
            .lock()
            .expect("lock")
            .insert(worker_id.to_string(), true);
        self
    }

    pub fn requests(&self) -> Vec<UnlockRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl PaymentApi for FakePaymentApi {
    async fn initiate_unlock(&self, request: &UnlockRequest) -> Envelope<UnlockResponse> {
        self.requests.lock().expect("lock").push(request.clone());
        self.unlock_reply
            .lock()
            .expect("lock")
            .take()
            .unwrap_or_else(|| Envelope::Error(ApiError::new("no scripted unlock reply")))
    }

    async fn unlock_status(&self, worker_id: &WorkerId) -> Envelope<UnlockStatus> {
        match self.unlocked.lock().expect("lock").get(worker_id.as_str()) {
            Some(true) => Envelope::Data(UnlockStatus {
                unlocked: true,
                unlocked_at: Some("2025-11-25T10:00:00Z".parse().expect("timestamp")),
            }),
            _ => Envelope::Error(
                ApiError::not_found(format!("no unlock recorded for worker {worker_id}"))
                    .status(404),
            ),
        }
    }
}

/// `Navigator` that records every redirect instead of performing it.
#[derive(Default)]
pub(crate) struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().expect("lock").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        self.visited.lock().expect("lock").push(url.to_string());
    }
}

/// `EstimateApi` fake that replays status replies in order and repeats the
/// last one once the script runs out.
pub(crate) struct FakeEstimateApi {
    statuses: Mutex<VecDeque<Envelope<EstimateStatusResponse>>>,
    last: Mutex<Option<Envelope<EstimateStatusResponse>>>,
    estimate: Mutex<Option<Envelope<EstimateResponse>>>,
    pub status_calls: Mutex<u32>,
}

impl FakeEstimateApi {
    pub fn new(statuses: Vec<Envelope<EstimateStatusResponse>>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
            last: Mutex::new(None),
            estimate: Mutex::new(None),
            status_calls: Mutex::new(0),
        }
    }

    pub fn with_estimate(self, estimate: Envelope<EstimateResponse>) -> Self {
        *self.estimate.lock().expect("lock") = Some(estimate);
        self
    }

    pub fn status_calls(&self) -> u32 {
        *self.status_calls.lock().expect("lock")
    }
}

#[async_trait]
impl EstimateApi for FakeEstimateApi {
    async fn estimate_status(&self, _estimate_id: &EstimateId) -> Envelope<EstimateStatusResponse> {
        *self.status_calls.lock().expect("lock") += 1;
        let next = self.statuses.lock().expect("lock").pop_front();
        let mut last = self.last.lock().expect("lock");
        match next {
            Some(reply) => {
                *last = Some(reply.clone());
                reply
            }
            None => last
                .clone()
                .unwrap_or_else(|| Envelope::Error(ApiError::new("no scripted status"))),
        }
    }

    async fn estimate(&self, _estimate_id: &EstimateId) -> Envelope<EstimateResponse> {
        self.estimate
            .lock()
            .expect("lock")
            .clone()
            .unwrap_or_else(|| Envelope::Error(ApiError::new("no scripted estimate")))
    }
}
