use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use visitlog_common::{Error, NewVisit, PurgedVisit};

use crate::state::SharedState;

/// Purge threshold used when `threshold_in_min` is omitted (24 hours).
pub const DEFAULT_THRESHOLD_MIN: f64 = 24.0 * 60.0;

#[derive(Debug, Deserialize)]
pub struct CleanupParams {
    pub threshold_in_min: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<PurgedVisit>>,
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

/// Every way a handler can fail. Rejections keep the extractor's 4xx status;
/// store errors are always 500.
#[derive(Debug)]
pub enum ApiError {
    Rejected { status: StatusCode, detail: String },
    Store(Error),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self::Store(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::Rejected { status, detail } => (status, detail),
            Self::Store(err) => {
                warn!("store error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

/// POST /visit — record one editing session and refresh its file summary.
pub async fn create_visit(
    State(state): State<SharedState>,
    body: Result<Json<NewVisit>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(visit) = body?;
    debug!(
        "recording visit for {} ({}..{}, {}s, {} keystrokes)",
        visit.filepath,
        visit.entry,
        visit.exit,
        visit.duration_secs(),
        visit.keystrokes
    );

    state.store.record_visit(visit).await?;

    Ok(Json(MessageResponse {
        message: "Visit created successfully",
    }))
}

/// DELETE /cleanup — purge visits longer than `threshold_in_min` minutes.
pub async fn cleanup_visits(
    State(state): State<SharedState>,
    params: Result<Query<CleanupParams>, QueryRejection>,
) -> Result<Json<CleanupResponse>, ApiError> {
    let Query(params) = params?;
    let threshold_min = params.threshold_in_min.unwrap_or(DEFAULT_THRESHOLD_MIN);
    let threshold_secs = threshold_min * 60.0;

    let purged = state.store.purge_visits_longer_than(threshold_secs).await?;
    info!(
        "cleanup removed {} visits longer than {threshold_min} min",
        purged.len()
    );

    if purged.is_empty() {
        return Ok(Json(CleanupResponse {
            message: "No entries to delete",
            entries: None,
        }));
    }

    Ok(Json(CleanupResponse {
        message: "Visit deleted successfully",
        entries: Some(purged),
    }))
}
