use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use gh_core::{Category, NewComment, RawArticle, SortOrder, StoryQuery};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

const DEFAULT_COMMENTS: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

impl ListParams {
    fn into_query(self) -> ApiResult<StoryQuery> {
        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(raw.parse::<Category>()?),
        };
        let sort = match self.sort.as_deref().map(str::trim) {
            None | Some("") | Some("recent") => SortOrder::Recent,
            Some("popular") => SortOrder::Popular,
            Some(other) => return Err(ApiError::BadRequest(format!("Unknown sort order: {}", other))),
        };
        let defaults = StoryQuery::default();
        Ok(StoryQuery {
            category,
            sort,
            limit: self.limit.unwrap_or(defaults.limit),
            cursor: self.cursor.filter(|c| !c.is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    pub user_id: String,
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "timestamp": Utc::now() }))
}

pub async fn list_stories(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(params) = params?;
    let query = params.into_query()?;
    let page = state.storage.list_stories(&query).await?;
    Ok(Json(json!({
        "success": true,
        "count": page.stories.len(),
        "stories": page.stories,
        "nextCursor": page.next_cursor,
        "hasMore": page.has_more,
    })))
}

pub async fn get_story(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let story = state
        .storage
        .get_story(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Story {} not found", id)))?;
    Ok(Json(json!({ "success": true, "story": story })))
}

pub async fn view_story(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.storage.increment_views(&id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn share_story(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.storage.increment_shares(&id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn like_story(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<LikeRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    if request.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("userId is required".to_string()));
    }
    let status = state.storage.toggle_like(&id, &request.user_id).await?;
    Ok(Json(json!({ "success": true, "liked": status.liked, "likes": status.likes })))
}

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    params: Result<Query<CommentParams>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(params) = params?;
    let comments = state
        .storage
        .get_comments(&id, params.limit.unwrap_or(DEFAULT_COMMENTS))
        .await?;
    Ok(Json(json!({ "success": true, "comments": comments })))
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<NewComment>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(comment) = body?;
    let comment = state.storage.add_comment(&id, comment).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "comment": comment }))))
}

pub async fn report_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.storage.report_comment(&id).await?;
    info!("🚩 Comment {} reported", id);
    Ok(Json(json!({ "success": true })))
}

/// Groups an ad-hoc batch of articles without touching storage.
pub async fn dedup(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Vec<RawArticle>>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(articles) = body?;
    for article in &articles {
        article.validate()?;
    }
    let (groups, report) = state.dedup.run(&articles);
    Ok(Json(json!({ "success": true, "groups": groups, "report": report })))
}
