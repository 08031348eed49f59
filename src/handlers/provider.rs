//! Resource handlers: every verb on any path is forwarded to the routing engine.

use crate::error::AppError;
use crate::response::{MetaCount, SuccessMany, SuccessOne};
use crate::sql::QueryRequest;
use crate::state::AppState;
use crate::store::{Selection, Values};
use crate::uri::{QueryParams, ResourcePath, ResourceUri};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

const PROJECTION: &str = "projection";
const SELECTION: &str = "selection";
const SELECTION_ARGS: &str = "selectionArgs";
const SORT_ORDER: &str = "sortOrder";

/// Split the query string into URI modifiers and caller query inputs.
fn split_query(pairs: Vec<(String, String)>) -> (QueryParams, QueryRequest) {
    let mut modifiers = Vec::new();
    let mut request = QueryRequest::default();
    let mut clause = None;
    for (k, v) in pairs {
        match k.as_str() {
            PROJECTION => {
                let cols: Vec<String> = v
                    .split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect();
                if !cols.is_empty() {
                    request.projection = Some(cols);
                }
            }
            SELECTION => clause = Some(v).filter(|s| !s.trim().is_empty()),
            SELECTION_ARGS => request.selection.args.push(v),
            SORT_ORDER => request.sort_order = Some(v).filter(|s| !s.trim().is_empty()),
            _ => modifiers.push((k, v)),
        }
    }
    request.selection.clause = clause;
    (QueryParams::from_pairs(modifiers), request)
}

fn resource(path: &str, pairs: Vec<(String, String)>) -> Result<(ResourceUri, QueryRequest), AppError> {
    let (params, request) = split_query(pairs);
    Ok((ResourceUri::new(ResourcePath::parse(path)?, params), request))
}

fn body_to_values(value: Value) -> Result<Values, AppError> {
    match value {
        Value::Object(m) => Ok(m.into_iter().collect()),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

fn selection_only(request: QueryRequest) -> Result<Selection, AppError> {
    if request.projection.is_some() || request.sort_order.is_some() {
        return Err(AppError::BadRequest("projection and sortOrder apply to GET only".into()));
    }
    Ok(request.selection)
}

pub async fn query(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, AppError> {
    let (uri, request) = resource(&path, pairs)?;
    let result = state.engine.query(&uri, &request).await?;
    let count = result.rows.len() as u64;
    Ok((
        StatusCode::OK,
        Json(SuccessMany {
            data: result.rows,
            meta: MetaCount {
                count,
                notification_uri: Some(result.notification_uri),
            },
        }),
    ))
}

/// Object body inserts one row; array body inserts a batch.
pub async fn insert(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let (uri, _) = resource(&path, pairs)?;
    match body {
        Value::Array(items) => {
            let items = items
                .into_iter()
                .map(body_to_values)
                .collect::<Result<Vec<_>, _>>()?;
            let report = state.engine.bulk_insert(&uri, &items).await?;
            let status = if report.inserted > 0 {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            Ok((status, Json(SuccessOne::new(json!(report)))))
        }
        other => {
            let values = body_to_values(other)?;
            let item = state.engine.insert(&uri, &values).await?;
            Ok((StatusCode::CREATED, Json(SuccessOne::new(json!({ "uri": item })))))
        }
    }
}

pub async fn update(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let (uri, request) = resource(&path, pairs)?;
    let values = body_to_values(body)?;
    let updated = state
        .engine
        .update(&uri, &values, &selection_only(request)?)
        .await?;
    Ok((StatusCode::OK, Json(SuccessOne::new(json!({ "updated": updated })))))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, AppError> {
    let (uri, request) = resource(&path, pairs)?;
    let deleted = state.engine.delete(&uri, &selection_only(request)?).await?;
    Ok((StatusCode::OK, Json(SuccessOne::new(json!({ "deleted": deleted })))))
}
