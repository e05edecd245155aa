//! Graph data and search handlers (`/api/data`).

use super::error::ApiError;
use super::server::{AppState, blocking};
use crate::models::{Properties, RecordView, ResolvedResponse, properties_from_json};
use crate::services::{DEFAULT_FUZZY_THRESHOLD, DEFAULT_SAMPLE_SIZE, RelationshipRequest};
use crate::Error;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Query string of `GET /api/data`.
#[derive(Debug, Deserialize)]
pub struct SampleQuery {
    limit: Option<usize>,
}

/// Body of `POST /api/data/nodes`.
#[derive(Debug, Deserialize)]
pub struct CreateNodeBody {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

/// Body of the relationship endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipBody {
    #[serde(default)]
    start_node_name: String,
    #[serde(default)]
    end_node_name: String,
    #[serde(default)]
    relationship_type: String,
    #[serde(default)]
    properties: Map<String, Value>,
}

/// Body of `POST /api/data/semantic-search`.
#[derive(Debug, Deserialize)]
pub struct SemanticSearchBody {
    #[serde(default)]
    question: String,
}

/// Body of `POST /api/data/fuzzy-search`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuzzySearchBody {
    #[serde(default)]
    search_text: String,
    threshold: Option<f64>,
}

/// Response of `POST /api/data/relationships`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipCreated {
    id: String,
    #[serde(rename = "type")]
    rel_type: String,
    properties: Properties,
    was_updated: bool,
}

/// `GET /api/data`
pub async fn sample(
    State(state): State<AppState>,
    Query(query): Query<SampleQuery>,
) -> ApiResult<Json<Vec<RecordView>>> {
    let graph = state.graph.clone();
    let limit = query.limit.unwrap_or(DEFAULT_SAMPLE_SIZE);
    Ok(Json(blocking(move || graph.sample(limit)).await?))
}

/// `GET /api/data/{name}`
pub async fn children(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<RecordView>>> {
    let graph = state.graph.clone();
    Ok(Json(blocking(move || graph.children(&name)).await?))
}

/// `GET /api/data/parents/{name}`
pub async fn parents(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<RecordView>>> {
    let graph = state.graph.clone();
    Ok(Json(blocking(move || graph.parents(&name)).await?))
}

/// `POST /api/data/nodes`
pub async fn create_node(
    State(state): State<AppState>,
    body: Result<Json<CreateNodeBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Properties>)> {
    let Json(body) = body?;
    let label = body
        .label
        .ok_or_else(|| Error::InvalidInput("label is required".to_string()))?;
    let properties = body
        .properties
        .ok_or_else(|| Error::InvalidInput("properties are required".to_string()))?;
    let properties = properties_from_json(properties)?;

    let graph = state.graph.clone();
    let entity = blocking(move || graph.create_node(&label, properties)).await?;
    Ok((StatusCode::CREATED, Json(entity.properties)))
}

/// `PATCH /api/data/nodes/{name}`
pub async fn update_node(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Json<Properties>> {
    let Json(body) = body?;
    let properties = properties_from_json(body)?;

    let graph = state.graph.clone();
    let entity = blocking(move || graph.update_node(&name, properties)).await?;
    Ok(Json(entity.properties))
}

/// `DELETE /api/data/nodes/{name}`
pub async fn delete_node(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    let graph = state.graph.clone();
    let display = name.clone();
    let summary = blocking(move || graph.delete_node(&name)).await?;
    Ok(Json(json!({
        "message": format!("node '{display}' and its relationships were deleted"),
        "nodesDeleted": summary.nodes_deleted,
        "relationshipsDeleted": summary.relationships_deleted,
    })))
}

/// `POST /api/data/relationships`
pub async fn create_relationship(
    State(state): State<AppState>,
    body: Result<Json<RelationshipBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RelationshipCreated>)> {
    let Json(body) = body?;
    let request = RelationshipRequest {
        start: body.start_node_name,
        end: body.end_node_name,
        rel_type: body.relationship_type,
        properties: properties_from_json(body.properties)?,
    };

    let graph = state.graph.clone();
    let outcome = blocking(move || graph.merge_relationship(request)).await?;
    Ok((
        StatusCode::CREATED,
        Json(RelationshipCreated {
            id: outcome.relationship.id.to_string(),
            rel_type: outcome.relationship.rel_type,
            properties: outcome.relationship.properties,
            was_updated: outcome.was_updated,
        }),
    ))
}

/// `DELETE /api/data/relationships`
pub async fn delete_relationships(
    State(state): State<AppState>,
    body: Result<Json<RelationshipBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    let graph = state.graph.clone();
    let deleted = blocking(move || {
        graph.delete_relationships(
            &body.start_node_name,
            &body.end_node_name,
            &body.relationship_type,
        )
    })
    .await?;
    Ok(Json(json!({
        "message": "relationship deleted",
        "relationshipsDeleted": deleted,
    })))
}

/// `POST /api/data/semantic-search`
pub async fn semantic_search(
    State(state): State<AppState>,
    body: Result<Json<SemanticSearchBody>, JsonRejection>,
) -> ApiResult<Json<ResolvedResponse>> {
    let Json(body) = body?;
    let search = state.search.clone();
    Ok(Json(
        blocking(move || search.semantic_search(&body.question)).await?,
    ))
}

/// `POST /api/data/fuzzy-search`
pub async fn fuzzy_search(
    State(state): State<AppState>,
    body: Result<Json<FuzzySearchBody>, JsonRejection>,
) -> ApiResult<Json<ResolvedResponse>> {
    let Json(body) = body?;
    let threshold = body.threshold.unwrap_or(DEFAULT_FUZZY_THRESHOLD);
    let search = state.search.clone();
    Ok(Json(
        blocking(move || search.fuzzy_search(&body.search_text, threshold)).await?,
    ))
}
