//! Inbound HTTP contract

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::models::{DisabilityType, ItineraryPlan, UserTravelProfile};
use crate::orchestrator::{ItineraryOutcome, OutcomeStatus, UnresolvedPlace, ValidationOrchestrator};
use crate::{BarrierFreeError, Result};

pub const SUCCESS_MESSAGE: &str = "Barrier-free travel plan generated and validated.";
pub const SKIPPED_MESSAGE: &str =
    "Travel plan generated. No accessibility needs were declared, so places were not checked.";
pub const WARNING_MESSAGE: &str =
    "Travel plan generated, but some places could not be confirmed as accessible.";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ValidationOrchestrator>,
}

/// Request body of `POST /api/recommend`; required fields are checked by hand
/// so that missing ones produce the error envelope
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecommendRequest {
    pub country: Option<String>,
    pub city: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub travel_style: Option<String>,
    pub is_wheelchair_user: bool,
    pub disability_types: Vec<String>,
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| BarrierFreeError::validation(format!("{field} is required")))
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| BarrierFreeError::validation(format!("{field} must be a YYYY-MM-DD date")))
}

impl TryFrom<RecommendRequest> for UserTravelProfile {
    type Error = BarrierFreeError;

    fn try_from(request: RecommendRequest) -> Result<Self> {
        let country = required(request.country, "country")?;
        let city = required(request.city, "city")?;
        let start_date = parse_date(&required(request.start_date, "startDate")?, "startDate")?;
        let end_date = parse_date(&required(request.end_date, "endDate")?, "endDate")?;
        let travel_style = required(request.travel_style, "travelStyle")?;

        if end_date < start_date {
            return Err(BarrierFreeError::validation(
                "endDate must not be before startDate",
            ));
        }

        let disability_types = request
            .disability_types
            .iter()
            .map(|raw| {
                raw.parse::<DisabilityType>().map_err(|_| {
                    BarrierFreeError::validation(format!("unknown disability type '{raw}'"))
                })
            })
            .collect::<Result<BTreeSet<_>>>()?;

        Ok(UserTravelProfile {
            country,
            city,
            start_date,
            end_date,
            travel_style,
            disability_types,
            is_wheelchair_user: request.is_wheelchair_user,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub message: &'static str,
    pub plan: ItineraryPlan,
    pub status: OutcomeStatus,
    pub warnings: Vec<UnresolvedPlace>,
    pub rounds: u32,
}

impl From<ItineraryOutcome> for RecommendResponse {
    fn from(outcome: ItineraryOutcome) -> Self {
        let message = if outcome.has_warnings() {
            WARNING_MESSAGE
        } else if outcome.status == OutcomeStatus::Skipped {
            SKIPPED_MESSAGE
        } else {
            SUCCESS_MESSAGE
        };
        Self {
            message,
            plan: outcome.plan,
            status: outcome.status,
            warnings: outcome.unresolved,
            rounds: outcome.rounds,
        }
    }
}

/// `{error, detail}` body of every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub detail: String,
}

impl BarrierFreeError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            BarrierFreeError::Validation { .. } => StatusCode::BAD_REQUEST,
            BarrierFreeError::Generation { .. } | BarrierFreeError::Resolution { .. } => {
                StatusCode::BAD_GATEWAY
            }
            BarrierFreeError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            BarrierFreeError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BarrierFreeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Rejected request: {}", self);
        }
        let body = ErrorEnvelope {
            error: self.user_message(),
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/recommend", post(recommend))
        .with_state(state)
}

#[instrument(skip_all)]
async fn recommend(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<RecommendResponse>> {
    let Json(request) = payload.map_err(|e| BarrierFreeError::validation(e.body_text()))?;
    let profile = UserTravelProfile::try_from(request)?;

    info!(
        "Planning {} days in {}, {} (wheelchair: {}, categories: {})",
        profile.trip_days(),
        profile.city,
        profile.country,
        profile.is_wheelchair_user,
        profile.disability_types.len()
    );

    let outcome = state.orchestrator.build(&profile).await?;
    Ok(Json(RecommendResponse::from(outcome)))
}
