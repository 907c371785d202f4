//! Axum REST API handlers.
//!
//! Handlers only translate JSON to engine calls and back; every rule lives in
//! `funding_engine`.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use funding_engine::{
    clock, engine::parse_amount, Campaign, CampaignId, CampaignPatch, CampaignService,
    CampaignStatus, Clock, FundingError, NewCampaign,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ApiError, Result};

#[derive(Clone)]
pub struct ApiState {
    pub service: CampaignService,
    pub clock: Arc<dyn Clock>,
}

// ─────────────────────────────────────────────────────────
// Request shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCampaignRequest {
    pub title: String,
    pub description: String,
    /// Decimal string or JSON number.
    pub target_amount: Value,
    pub duration_days: i64,
    pub edit_secret: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContributeRequest {
    /// Decimal string or JSON number.
    pub amount: Value,
    /// Optional idempotency key; repeats are applied once.
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Only these fields may be edited; anything else is refused.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditCampaignRequest {
    pub credential: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_amount: Option<Value>,
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub id: CampaignId,
    pub title: String,
    pub description: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: CampaignStatus,
    pub progress_percent: Decimal,
    pub display_progress_percent: Decimal,
    pub seconds_remaining: Option<i64>,
    pub version: u64,
}

impl CampaignResponse {
    pub fn new(campaign: Campaign, now: DateTime<Utc>) -> Self {
        Self {
            status: clock::status(&campaign, now),
            seconds_remaining: clock::time_remaining(&campaign, now).map(|d| d.num_seconds()),
            progress_percent: campaign.progress_percent(),
            display_progress_percent: campaign.display_progress_percent(),
            id: campaign.id,
            title: campaign.title,
            description: campaign.description,
            target_amount: campaign.target_amount,
            current_amount: campaign.current_amount,
            created_at: campaign.created_at,
            end_at: campaign.end_at,
            version: campaign.version,
        }
    }
}

#[derive(Serialize)]
pub struct CampaignListResponse {
    pub count: usize,
    pub campaigns: Vec<CampaignResponse>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /campaigns`
pub async fn list_campaigns(State(state): State<Arc<ApiState>>) -> Result<Json<CampaignListResponse>> {
    let now = state.clock.now();
    let campaigns: Vec<CampaignResponse> = state
        .service
        .list_campaigns()
        .await?
        .into_iter()
        .map(|c| CampaignResponse::new(c, now))
        .collect();
    Ok(Json(CampaignListResponse {
        count: campaigns.len(),
        campaigns,
    }))
}

/// `POST /campaigns`
pub async fn create_campaign(
    State(state): State<Arc<ApiState>>,
    payload: std::result::Result<Json<CreateCampaignRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CampaignResponse>)> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let input = NewCampaign {
        target_amount: decimal_from_json(&req.target_amount).ok_or(FundingError::InvalidTargetAmount)?,
        title: req.title,
        description: req.description,
        duration_days: req.duration_days,
        edit_secret: req.edit_secret,
    };

    let now = state.clock.now();
    let campaign = state.service.create_campaign(input, now).await?;
    Ok((StatusCode::CREATED, Json(CampaignResponse::new(campaign, now))))
}

/// `GET /campaigns/:id`
pub async fn get_campaign(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<CampaignResponse>> {
    let id = parse_id(&id)?;
    let campaign = state.service.get_campaign(id).await?;
    Ok(Json(CampaignResponse::new(campaign, state.clock.now())))
}

/// `POST /campaigns/:id/contributions`
pub async fn contribute(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<ContributeRequest>, JsonRejection>,
) -> Result<Json<CampaignResponse>> {
    let id = parse_id(&id)?;
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let amount = amount_from_json(&req.amount)?;

    let now = state.clock.now();
    let campaign = match req.request_id.as_deref() {
        Some(request_id) => state.service.contribute_once(id, amount, request_id, now).await?,
        None => state.service.contribute(id, amount, now).await?,
    };
    Ok(Json(CampaignResponse::new(campaign, now)))
}

/// `PATCH /campaigns/:id`
pub async fn edit_campaign(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<EditCampaignRequest>, JsonRejection>,
) -> Result<Json<CampaignResponse>> {
    let id = parse_id(&id)?;
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let patch = CampaignPatch {
        title: req.title,
        description: req.description,
        target_amount: req
            .target_amount
            .as_ref()
            .map(|raw| decimal_from_json(raw).ok_or(FundingError::InvalidTargetAmount))
            .transpose()?,
    };

    let now = state.clock.now();
    let campaign = state
        .service
        .edit_campaign(id, patch, &req.credential, now)
        .await?;
    Ok(Json(CampaignResponse::new(campaign, now)))
}

// ─────────────────────────────────────────────────────────
// Input helpers
// ─────────────────────────────────────────────────────────

fn parse_id(raw: &str) -> Result<CampaignId> {
    CampaignId::from_str(raw).map_err(|_| ApiError::InvalidId(raw.to_string()))
}

/// Accept `"12.50"` or `12.5`. Numbers go through their JSON text so no
/// binary floating-point rounding sneaks in.
fn decimal_from_json(raw: &Value) -> Option<Decimal> {
    match raw {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

fn amount_from_json(raw: &Value) -> std::result::Result<Decimal, FundingError> {
    match raw {
        Value::String(s) => parse_amount(s),
        Value::Number(n) => parse_amount(&n.to_string()),
        _ => Err(FundingError::InvalidAmount),
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
