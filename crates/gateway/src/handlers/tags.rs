//! Tag handlers (read-only)

use axum::{
    extract::{Path, State},
    Json,
};

use crate::AppState;
use foodgram_common::{
    db::Repository,
    errors::{AppError, Result},
    serializers::TagResponse,
};

/// List all tags, unpaginated
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagResponse>>> {
    let repo = Repository::new(state.db.clone());
    let tags = repo.list_tags().await?;

    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

/// Get a tag by ID
pub async fn get_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<i32>,
) -> Result<Json<TagResponse>> {
    let repo = Repository::new(state.db.clone());
    let tag = repo
        .find_tag_by_id(tag_id)
        .await?
        .ok_or_else(|| AppError::not_found("tag", tag_id))?;

    Ok(Json(tag.into()))
}
