use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use sheetfront_sheets::{CellValue, Record, SheetAccessor};
use tracing::debug;

use crate::errors::{ServerError, ServerResult};

pub const HEALTH_MESSAGE: &str = "✅ Peron Tips API is running";

pub const DEFAULT_SHEET: &str = "Sheet1";
pub const DEFAULT_LIMIT: usize = 200;

/// Tabs served by the per-category endpoints.
pub const CHRISTIAN_SHEET: &str = "Sheet1";
pub const SOCIETY_SHEET: &str = "Sheet2";
pub const ENCOURAGEMENT_SHEET: &str = "Sheet3";

/// State that's passed to all handlers.
#[derive(Debug)]
pub struct ServerState {
    pub accessor: SheetAccessor,
}

pub async fn healthz() -> &'static str {
    HEALTH_MESSAGE
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub sheet: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub sheet: String,
    pub count: usize,
    pub data: Vec<Record>,
}

fn parse_limit(limit: Option<&str>) -> ServerResult<usize> {
    match limit.map(str::trim) {
        None | Some("") => Ok(DEFAULT_LIMIT),
        Some(s) => s.parse().map_err(|_| {
            ServerError::BadRequest("limit must be a non-negative integer".to_string())
        }),
    }
}

fn present(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

pub async fn list_sayings(
    State(state): State<Arc<ServerState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ServerResult<Json<ListResponse>> {
    let Query(params) = params.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let sheet = present(params.sheet).unwrap_or_else(|| DEFAULT_SHEET.to_string());
    let limit = parse_limit(params.limit.as_deref())?;

    let data = state.accessor.read_rows(&sheet, limit).await?;
    Ok(Json(ListResponse {
        sheet,
        count: data.len(),
        data,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateSaying {
    pub sheet: Option<String>,
    pub category: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateResponse {
    pub ok: bool,
    pub message: &'static str,
}

/// Parse a create body. A blank body reads as an empty object so the field
/// checks report what is missing.
fn parse_create_body(body: &[u8]) -> ServerResult<CreateSaying> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CreateSaying::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        ServerError::BadRequest(format!("Failed to parse the request body as JSON: {e}"))
    })
}

pub async fn create_saying(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> ServerResult<Json<CreateResponse>> {
    let body = parse_create_body(&body)?;

    let sheet = present(body.sheet)
        .ok_or_else(|| ServerError::BadRequest("sheet is required".to_string()))?;
    let content = present(body.content)
        .ok_or_else(|| ServerError::BadRequest("content is required".to_string()))?;

    let mut fields = Record::new();
    if let Some(category) = body.category {
        fields.insert("category".to_string(), CellValue::from(category));
    }
    if let Some(title) = body.title {
        fields.insert("title".to_string(), CellValue::from(title));
    }
    fields.insert("content".to_string(), CellValue::from(content));

    state.accessor.append_row(&sheet, &fields).await?;
    debug!(%sheet, "row added");

    Ok(Json(CreateResponse {
        ok: true,
        message: "Row added",
    }))
}

async fn read_tab(state: &ServerState, sheet: &str) -> ServerResult<Json<Vec<Record>>> {
    let data = state.accessor.read_rows(sheet, DEFAULT_LIMIT).await?;
    Ok(Json(data))
}

pub async fn christian(State(state): State<Arc<ServerState>>) -> ServerResult<Json<Vec<Record>>> {
    read_tab(&state, CHRISTIAN_SHEET).await
}

pub async fn society(State(state): State<Arc<ServerState>>) -> ServerResult<Json<Vec<Record>>> {
    read_tab(&state, SOCIETY_SHEET).await
}

pub async fn encouragement(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<Json<Vec<Record>>> {
    read_tab(&state, ENCOURAGEMENT_SHEET).await
}
