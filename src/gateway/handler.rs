use std::time::Duration;

use axum::Json;
use axum::extract::{Path, Query, State};
use tracing::instrument;

use crate::constants::MAX_TOP_K;
use crate::coordinator::ReadOptions;
use crate::error::MemoriaError;
use crate::store::MemoryFilter;

use super::payload::{
    ClustersResponse, GraphResponse, IngestRequest, IngestResponse, ListMemoriesResponse,
    MemoryDto, PagingQuery, RefreshQuery, RepairResponse, SearchRequest, SearchResponse,
    SearchResultDto, TrajectoryResponse, merge_clusters_and_topics,
};
use super::state::HandlerState;

fn read_options(query: &RefreshQuery) -> ReadOptions {
    let defaults = ReadOptions::default();
    ReadOptions {
        force_refresh: query.refresh,
        deadline: query.deadline_ms.map(Duration::from_millis).unwrap_or(defaults.deadline),
    }
}

#[instrument(skip(state, request), fields(user_id = request.user_id))]
pub async fn ingest_handler(
    State(state): State<HandlerState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, MemoriaError> {
    let memory = state
        .coordinator
        .ingest(
            request.user_id,
            request.content,
            request.r#type,
            request.summary,
            request.keywords,
        )
        .await?;
    Ok(Json(IngestResponse { id: memory.id }))
}

#[instrument(skip(state))]
pub async fn list_handler(
    State(state): State<HandlerState>,
    Path(user_id): Path<i64>,
    Query(paging): Query<PagingQuery>,
) -> Result<Json<ListMemoriesResponse>, MemoriaError> {
    let filter = MemoryFilter::paged(paging.limit, paging.offset);
    let memories = state.coordinator.list(user_id, &filter)?;
    Ok(Json(ListMemoriesResponse {
        memories: memories.into_iter().map(MemoryDto::from).collect(),
    }))
}

#[instrument(skip(state, request))]
pub async fn search_handler(
    State(state): State<HandlerState>,
    Path(user_id): Path<i64>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, MemoriaError> {
    let limit = request.limit.min(MAX_TOP_K);
    let results = state
        .coordinator
        .search(user_id, &request.query, limit, request.min_score)
        .await?;
    Ok(Json(SearchResponse {
        results: results.into_iter().map(SearchResultDto::from).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn clusters_handler(
    State(state): State<HandlerState>,
    Path(user_id): Path<i64>,
    Query(refresh): Query<RefreshQuery>,
) -> Result<Json<ClustersResponse>, MemoriaError> {
    let opts = read_options(&refresh);
    let clusters = state.coordinator.get_clusters(user_id, opts).await?;
    let topics = state.coordinator.get_topics(user_id, opts).await?;
    Ok(Json(merge_clusters_and_topics(&clusters, &topics)))
}

#[instrument(skip(state))]
pub async fn graph_handler(
    State(state): State<HandlerState>,
    Path(user_id): Path<i64>,
    Query(refresh): Query<RefreshQuery>,
) -> Result<Json<GraphResponse>, MemoriaError> {
    let opts = read_options(&refresh);
    let graph = state.coordinator.get_graph(user_id, opts).await?;
    let version = state.coordinator.digest(user_id)?;
    Ok(Json(GraphResponse::from_graph(graph, version)))
}

#[instrument(skip(state))]
pub async fn trajectory_handler(
    State(state): State<HandlerState>,
    Path(user_id): Path<i64>,
    Query(refresh): Query<RefreshQuery>,
) -> Result<Json<TrajectoryResponse>, MemoriaError> {
    let opts = read_options(&refresh);
    let trajectory = state.coordinator.get_trajectory(user_id, opts).await?;
    Ok(Json(TrajectoryResponse { trajectory }))
}

#[instrument(skip(state))]
pub async fn repair_handler(
    State(state): State<HandlerState>,
    Path(user_id): Path<i64>,
) -> Result<Json<RepairResponse>, MemoriaError> {
    let count = state.coordinator.repair(user_id).await?;
    Ok(Json(RepairResponse { count }))
}
