use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use metrics::counter;
use tracing::warn;

use issue_desk_core::{CreateIssueRequest, IssueResponse, UpdateIssueRequest};

use crate::announce;
use crate::error::ApiError;
use crate::router::AppState;

pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<CreateIssueRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IssueResponse>), ApiError> {
    let Json(request) = body.inspect_err(|err| {
        warn!(stage = "http", error = %err, "rejected create issue body");
    })?;
    let new_issue = request.into_new_issue().inspect_err(|err| {
        warn!(stage = "http", error = %err, "create issue validation failed");
    })?;

    let issue = state
        .issues()
        .create(new_issue)
        .await
        .map_err(|err| ApiError::from_store("create", err))?;

    counter!("issues_created_total").increment(1);
    announce::spawn_new_issue(state.notifier(), &issue);

    Ok((StatusCode::CREATED, Json(issue)))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<IssueResponse>>, ApiError> {
    let issues = state
        .issues()
        .list()
        .await
        .map_err(|err| ApiError::from_store("list", err))?;
    Ok(Json(issues))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<IssueResponse>, ApiError> {
    let id = parse_issue_id(&raw_id)?;
    let issue = state
        .issues()
        .get(id)
        .await
        .map_err(|err| ApiError::from_store("get", err))?;
    Ok(Json(issue))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Result<Json<UpdateIssueRequest>, JsonRejection>,
) -> Result<Json<IssueResponse>, ApiError> {
    let id = parse_issue_id(&raw_id)?;
    let Json(request) = body.inspect_err(|err| {
        warn!(stage = "http", issue_id = id, error = %err, "rejected update issue body");
    })?;
    let status = request.parse_status()?;

    let issue = state
        .issues()
        .update_status(id, status)
        .await
        .map_err(|err| ApiError::from_store("update", err))?;

    counter!("issue_status_updates_total", "status" => status.as_str()).increment(1);
    Ok(Json(issue))
}

/// Accepts unsigned decimal digits only, no sign or whitespace.
fn parse_issue_id(raw: &str) -> Result<u32, ApiError> {
    let invalid = || ApiError::BadRequest(format!("invalid issue id '{raw}'"));
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    raw.parse::<u32>().map_err(|_| invalid())
}
