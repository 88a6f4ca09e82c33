use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::{
    sample::SAMPLE_CSV, BatchReport, FactsheetError, FactsheetRequest, FactsheetService,
    SchemaProfile, ServiceConfig, Table,
};

#[derive(Serialize, Deserialize, Debug)]
pub struct SimpleResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

// Finished batches held for download, bounded by count and age.
#[derive(Debug)]
pub struct BatchStore {
    batches: HashMap<String, BatchReport>,
    max_batches: usize,
    // Zero disables expiry.
    ttl: Option<Duration>,
}

impl BatchStore {
    pub fn new(max_batches: usize, ttl_secs: u64) -> Self {
        Self {
            batches: HashMap::new(),
            max_batches: max_batches.max(1),
            ttl: (ttl_secs > 0).then(|| Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX))),
        }
    }

    fn is_expired(&self, report: &BatchReport, now: DateTime<Utc>) -> bool {
        self.ttl.map_or(false, |ttl| now - report.created_at > ttl)
    }

    pub fn insert(&mut self, report: BatchReport) -> Vec<String> {
        self.insert_at(report, Utc::now())
    }

    // Returns the ids evicted to make room.
    pub fn insert_at(&mut self, report: BatchReport, now: DateTime<Utc>) -> Vec<String> {
        let mut evicted: Vec<String> = self
            .batches
            .values()
            .filter(|r| self.is_expired(r, now))
            .map(|r| r.batch_id.clone())
            .collect();
        for id in &evicted {
            self.batches.remove(id);
        }

        while self.batches.len() >= self.max_batches {
            let oldest = self
                .batches
                .values()
                .min_by_key(|r| r.created_at)
                .map(|r| r.batch_id.clone());
            match oldest {
                Some(id) => {
                    self.batches.remove(&id);
                    evicted.push(id);
                }
                None => break,
            }
        }

        self.batches.insert(report.batch_id.clone(), report);
        evicted
    }

    pub fn get(&self, batch_id: &str) -> Option<&BatchReport> {
        self.get_at(batch_id, Utc::now())
    }

    pub fn get_at(&self, batch_id: &str, now: DateTime<Utc>) -> Option<&BatchReport> {
        self.batches
            .get(batch_id)
            .filter(|report| !self.is_expired(report, now))
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub batches: Arc<RwLock<BatchStore>>,
    pub service: Arc<FactsheetService>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            batches: Arc::new(RwLock::new(BatchStore::new(config.max_batches, config.batch_ttl_secs))),
            service: Arc::new(FactsheetService::new()),
            config: Arc::new(config),
        }
    }
}

pub struct ApiError {
    status: StatusCode,
    message: String,
    data: Option<serde_json::Value>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: None,
        }
    }
}

impl From<FactsheetError> for ApiError {
    fn from(e: FactsheetError) -> Self {
        match e {
            FactsheetError::Schema { ref missing } => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                data: Some(serde_json::json!({ "missing_columns": missing })),
                message: e.to_string(),
            },
            ref fatal if fatal.is_batch_fatal() => Self::new(StatusCode::BAD_REQUEST, e.to_string()),
            FactsheetError::Configuration(_) => Self::new(StatusCode::BAD_REQUEST, e.to_string()),
            other => {
                error!("request failed: {}", other);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("An error occurred: {}", other))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(SimpleResponse {
            success: false,
            message: self.message,
            data: self.data,
        });
        (self.status, body).into_response()
    }
}

// Keeps RFC 3986 unreserved characters and percent-encodes every other byte.
fn encode_path_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

pub fn download_path(batch_id: &str, file_name: &str) -> String {
    format!(
        "/factsheets/{}/{}",
        encode_path_segment(batch_id),
        encode_path_segment(file_name)
    )
}

fn batch_summary(report: &BatchReport) -> serde_json::Value {
    let artifacts: Vec<serde_json::Value> = report
        .artifacts
        .iter()
        .map(|a| {
            serde_json::json!({
                "row_index": a.row_index,
                "fund_name": a.fund_name,
                "file_name": a.file_name,
                "content_type": a.content_type,
                "size": a.bytes.len(),
                "pages": a.pages,
                "download": download_path(&report.batch_id, &a.file_name),
            })
        })
        .collect();

    serde_json::json!({
        "batch_id": report.batch_id,
        "created_at": report.created_at,
        "rows": report.rows,
        "artifacts": artifacts,
        "warnings": report.warnings,
        "aborted": report.aborted,
    })
}

async fn health_check() -> Json<SimpleResponse> {
    Json(SimpleResponse {
        success: true,
        message: "Factsheet Service is healthy".to_string(),
        data: None,
    })
}

async fn sample_csv() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], SAMPLE_CSV)
}

async fn create_factsheets(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    mut multipart: Multipart,
) -> Result<Json<SimpleResponse>, ApiError> {
    let profile = match query.get("profile") {
        Some(raw) => raw.parse::<SchemaProfile>()?,
        None => state.config.default_profile,
    };

    let mut csv = None;
    let mut template = None;
    let mut logo = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.body_text()))?;

        match name.as_str() {
            "csv" => csv = Some(bytes),
            "template" | "logo" if bytes.is_empty() => {}
            "template" => {
                let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
                    ApiError::new(StatusCode::BAD_REQUEST, "template must be UTF-8 text")
                })?;
                template = Some(text);
            }
            "logo" => logo = Some(bytes.to_vec()),
            other => warn!(field = other, "ignoring multipart field"),
        }
    }

    let csv = csv.ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "missing csv field"))?;
    let table = Table::from_csv_bytes(&csv)?;

    let mut request = FactsheetRequest::new(table).with_profile(profile);
    request.template = template;
    request.logo = logo;

    let service = state.service.clone();
    let report = tokio::task::spawn_blocking(move || service.generate(&request))
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("An error occurred: {}", e)))??;

    let summary = batch_summary(&report);
    let message = match &report.aborted {
        Some(reason) => reason.clone(),
        None => format!("Generated {} factsheets", report.artifacts.len()),
    };
    info!(batch_id = %report.batch_id, "stored batch");
    let evicted = state.batches.write().await.insert(report);
    for id in evicted {
        info!(batch_id = %id, "evicted batch");
    }

    Ok(Json(SimpleResponse {
        success: true,
        message,
        data: Some(summary),
    }))
}

async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let batches = state.batches.read().await;
    let report = batches
        .get(&batch_id)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("unknown batch {}", batch_id)))?;

    Ok(Json(SimpleResponse {
        success: true,
        message: "Batch retrieved successfully".to_string(),
        data: Some(batch_summary(report)),
    }))
}

async fn download_artifact(
    State(state): State<AppState>,
    Path((batch_id, file_name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let (content_type, bytes) = {
        let batches = state.batches.read().await;
        let artifact = batches
            .get(&batch_id)
            .and_then(|report| report.artifact(&file_name))
            .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("unknown artifact {}", file_name)))?;
        (artifact.content_type.clone(), artifact.bytes.clone())
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        )
        .body(Body::from(bytes))
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

pub fn router(state: AppState) -> Router {
    let limit = state.config.max_upload_bytes;
    Router::new()
        .route("/health", get(health_check))
        .route("/sample.csv", get(sample_csv))
        .route("/factsheets", post(create_factsheets))
        .route("/factsheets/:batch_id", get(get_batch))
        .route("/factsheets/:batch_id/:file_name", get(download_artifact))
        .layer(DefaultBodyLimit::max(limit))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}
