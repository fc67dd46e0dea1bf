//! User handlers: registration, profiles, password change and subscriptions

use axum::{
    extract::{OriginalUri, Path, RawQuery, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::extract::{ValidJson, ValidQuery};
use crate::AppState;
use foodgram_common::{
    auth::{hash_password, verify_password, AuthContext, Viewer},
    db::{models::User, Repository},
    errors::{AppError, Result},
    filters::{RecipesLimit, UserFilter},
    metrics,
    pagination::{Page, PageParams, PageQuery},
    serializers::{
        FollowResponse, MessageResponse, SetPassword, UserCreate, UserCreated, UserResponse,
    },
};

async fn load_user(repo: &Repository, id: i32) -> Result<User> {
    repo.find_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("user", id))
}

async fn represent(repo: &Repository, user: &User, viewer: Option<i32>) -> Result<UserResponse> {
    let is_subscribed = match viewer {
        Some(viewer_id) => repo.is_following(viewer_id, user.id).await?,
        None => false,
    };
    Ok(UserResponse::new(user, is_subscribed))
}

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<UserCreate>,
) -> Result<(StatusCode, Json<UserCreated>)> {
    request.validate()?;

    let repo = Repository::new(state.db.clone());

    if repo.find_user_by_email(&request.email).await?.is_some() {
        return Err(AppError::validation(
            "email",
            "A user with that email already exists.",
        ));
    }
    if repo.find_user_by_username(&request.username).await?.is_some() {
        return Err(AppError::validation(
            "username",
            "A user with that username already exists.",
        ));
    }

    let password_hash = hash_password(&request.password)?;
    let user = repo
        .create_user(
            &request.email,
            &request.username,
            &request.first_name,
            &request.last_name,
            &password_hash,
        )
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(UserCreated::from(&user))))
}

/// List users with optional `search` and pagination
pub async fn list_users(
    State(state): State<AppState>,
    viewer: Viewer,
    ValidQuery(filter): ValidQuery<UserFilter>,
    ValidQuery(page): ValidQuery<PageQuery>,
    OriginalUri(uri): OriginalUri,
    RawQuery(query): RawQuery,
) -> Result<Json<Page<UserResponse>>> {
    let query = query.unwrap_or_default();
    let params = PageParams::new(&page, &state.config.pagination)?;

    let repo = Repository::new(state.db.clone());
    let (users, total) = repo.list_users(&filter, params).await?;

    let mut results = Vec::with_capacity(users.len());
    for user in &users {
        results.push(represent(&repo, user, viewer.user_id()).await?);
    }

    Ok(Json(Page::new(results, total, params, uri.path(), &query)?))
}

/// Get a user profile
pub async fn get_user(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(user_id): Path<i32>,
) -> Result<Json<UserResponse>> {
    let repo = Repository::new(state.db.clone());
    let user = load_user(&repo, user_id).await?;

    Ok(Json(represent(&repo, &user, viewer.user_id()).await?))
}

/// The caller's own profile
pub async fn me(State(state): State<AppState>, auth: AuthContext) -> Result<Json<UserResponse>> {
    let repo = Repository::new(state.db.clone());
    let user = load_user(&repo, auth.user_id).await?;

    Ok(Json(UserResponse::new(&user, false)))
}

/// Change the caller's password
pub async fn set_password(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidJson(request): ValidJson<SetPassword>,
) -> Result<StatusCode> {
    request.validate()?;

    let repo = Repository::new(state.db.clone());
    let user = load_user(&repo, auth.user_id).await?;

    if !verify_password(&request.current_password, &user.password) {
        return Err(AppError::validation("current_password", "Invalid password."));
    }

    let password_hash = hash_password(&request.new_password)?;
    repo.set_password(user.id, &password_hash).await?;

    tracing::info!(user_id = user.id, "Password changed");

    Ok(StatusCode::NO_CONTENT)
}

/// Follow an author
pub async fn subscribe(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(author_id): Path<i32>,
    ValidQuery(limit): ValidQuery<RecipesLimit>,
) -> Result<(StatusCode, Json<FollowResponse>)> {
    let repo = Repository::new(state.db.clone());
    let author = load_user(&repo, author_id).await?;

    repo.follow(auth.user_id, author.id).await?;

    metrics::record_follow("added");
    tracing::info!(user_id = auth.user_id, author_id, "Subscribed");

    let summary = repo
        .follow_summary(auth.user_id, author, limit.recipes_limit)
        .await?;

    Ok((StatusCode::CREATED, Json(summary.into())))
}

/// Stop following an author; a no-op when not following
pub async fn unsubscribe(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(author_id): Path<i32>,
) -> Result<Json<MessageResponse>> {
    let repo = Repository::new(state.db.clone());
    let author = load_user(&repo, author_id).await?;

    if repo.unfollow(auth.user_id, author.id).await? {
        metrics::record_follow("removed");
        tracing::info!(user_id = auth.user_id, author_id, "Unsubscribed");
    }

    Ok(Json(MessageResponse {
        message: "Successfully unsubscribed".to_string(),
    }))
}

/// Authors the caller follows, with their recipes
pub async fn subscriptions(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidQuery(page): ValidQuery<PageQuery>,
    ValidQuery(limit): ValidQuery<RecipesLimit>,
    OriginalUri(uri): OriginalUri,
    RawQuery(query): RawQuery,
) -> Result<Json<Page<FollowResponse>>> {
    let query = query.unwrap_or_default();
    let params = PageParams::new(&page, &state.config.pagination)?;

    let repo = Repository::new(state.db.clone());
    let (summaries, total) = repo
        .list_subscriptions(auth.user_id, params, limit.recipes_limit)
        .await?;

    let page = Page::new(summaries, total, params, uri.path(), &query)?;
    Ok(Json(page.map(FollowResponse::from)))
}
