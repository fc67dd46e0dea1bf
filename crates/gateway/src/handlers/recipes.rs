//! Recipe handlers: CRUD, favorites, shopping cart and the list download

use axum::{
    extract::{OriginalUri, Path, RawQuery, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::extract::{ValidJson, ValidQuery};
use crate::AppState;
use foodgram_common::{
    auth::{AuthContext, Viewer},
    db::{models::Recipe, Bookmark, Repository},
    errors::{AppError, Result},
    filters::RecipeFilter,
    metrics,
    pagination::{Page, PageParams, PageQuery},
    permissions::check_author_or_read_only,
    serializers::{RecipeMinified, RecipeResponse, RecipeWrite},
    shopping_list,
};

async fn load_recipe(repo: &Repository, id: i32) -> Result<Recipe> {
    repo.find_recipe_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("recipe", id))
}

/// List recipes with filters and pagination
pub async fn list_recipes(
    State(state): State<AppState>,
    viewer: Viewer,
    ValidQuery(filter): ValidQuery<RecipeFilter>,
    ValidQuery(page): ValidQuery<PageQuery>,
    OriginalUri(uri): OriginalUri,
    RawQuery(query): RawQuery,
) -> Result<Json<Page<RecipeResponse>>> {
    let query = query.unwrap_or_default();
    let params = PageParams::new(&page, &state.config.pagination)?;

    let repo = Repository::new(state.db.clone());
    let (recipes, total) = repo.list_recipes(&filter, viewer.user_id(), params).await?;

    let mut results: Vec<RecipeResponse> = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        results.push(repo.recipe_details(recipe, viewer.user_id()).await?.into());
    }

    Ok(Json(Page::new(results, total, params, uri.path(), &query)?))
}

/// Get a single recipe
pub async fn get_recipe(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(recipe_id): Path<i32>,
) -> Result<Json<RecipeResponse>> {
    let repo = Repository::new(state.db.clone());
    let recipe = load_recipe(&repo, recipe_id).await?;

    let details = repo.recipe_details(recipe, viewer.user_id()).await?;
    Ok(Json(details.into()))
}

/// Create a recipe authored by the caller
pub async fn create_recipe(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidJson(request): ValidJson<RecipeWrite>,
) -> Result<(StatusCode, Json<RecipeResponse>)> {
    let draft = request.into_draft()?;

    let repo = Repository::new(state.db.clone());
    let recipe = repo.create_recipe(auth.user_id, draft).await?;

    metrics::record_recipe("created");
    tracing::info!(
        recipe_id = recipe.id,
        author_id = auth.user_id,
        request_id = %auth.request_id,
        "Recipe created"
    );

    let details = repo.recipe_details(recipe, Some(auth.user_id)).await?;
    Ok((StatusCode::CREATED, Json(details.into())))
}

/// Partially update a recipe; author only
pub async fn update_recipe(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(recipe_id): Path<i32>,
    ValidJson(request): ValidJson<RecipeWrite>,
) -> Result<Json<RecipeResponse>> {
    let repo = Repository::new(state.db.clone());
    let recipe = load_recipe(&repo, recipe_id).await?;
    check_author_or_read_only(&Method::PATCH, Some(auth.user_id), recipe.author_id)?;

    let changes = request.into_changes()?;
    let updated = repo.update_recipe(recipe_id, changes).await?;

    metrics::record_recipe("updated");
    tracing::info!(recipe_id, author_id = auth.user_id, "Recipe updated");

    let details = repo.recipe_details(updated, Some(auth.user_id)).await?;
    Ok(Json(details.into()))
}

/// Delete a recipe; author only
pub async fn delete_recipe(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(recipe_id): Path<i32>,
) -> Result<StatusCode> {
    let repo = Repository::new(state.db.clone());
    let recipe = load_recipe(&repo, recipe_id).await?;
    check_author_or_read_only(&Method::DELETE, Some(auth.user_id), recipe.author_id)?;

    repo.delete_recipe(recipe_id).await?;

    metrics::record_recipe("deleted");
    tracing::info!(recipe_id, author_id = auth.user_id, "Recipe deleted");

    Ok(StatusCode::NO_CONTENT)
}

async fn add_bookmark(
    state: &AppState,
    auth: &AuthContext,
    recipe_id: i32,
    kind: Bookmark,
) -> Result<(StatusCode, Json<RecipeMinified>)> {
    let repo = Repository::new(state.db.clone());
    let recipe = repo.add_bookmark(kind, auth.user_id, recipe_id).await?;

    metrics::record_bookmark(kind.as_str(), "added");
    tracing::info!(recipe_id, user_id = auth.user_id, list = kind.as_str(), "Bookmark added");

    Ok((StatusCode::CREATED, Json(recipe.into())))
}

async fn remove_bookmark(
    state: &AppState,
    auth: &AuthContext,
    recipe_id: i32,
    kind: Bookmark,
) -> Result<StatusCode> {
    let repo = Repository::new(state.db.clone());
    repo.remove_bookmark(kind, auth.user_id, recipe_id).await?;

    metrics::record_bookmark(kind.as_str(), "removed");
    tracing::info!(recipe_id, user_id = auth.user_id, list = kind.as_str(), "Bookmark removed");

    Ok(StatusCode::NO_CONTENT)
}

/// Add a recipe to the caller's favorites
pub async fn add_favorite(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(recipe_id): Path<i32>,
) -> Result<(StatusCode, Json<RecipeMinified>)> {
    add_bookmark(&state, &auth, recipe_id, Bookmark::Favorite).await
}

/// Remove a recipe from the caller's favorites
pub async fn remove_favorite(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(recipe_id): Path<i32>,
) -> Result<StatusCode> {
    remove_bookmark(&state, &auth, recipe_id, Bookmark::Favorite).await
}

/// Add a recipe to the caller's shopping cart
pub async fn add_to_cart(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(recipe_id): Path<i32>,
) -> Result<(StatusCode, Json<RecipeMinified>)> {
    add_bookmark(&state, &auth, recipe_id, Bookmark::ShoppingCart).await
}

/// Remove a recipe from the caller's shopping cart
pub async fn remove_from_cart(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(recipe_id): Path<i32>,
) -> Result<StatusCode> {
    remove_bookmark(&state, &auth, recipe_id, Bookmark::ShoppingCart).await
}

/// Download the caller's aggregated shopping list as a text file
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Response> {
    let repo = Repository::new(state.db.clone());
    let rows = repo.shopping_cart_rows(auth.user_id).await?;

    let items = shopping_list::aggregate(rows);
    let body = shopping_list::render(&items);

    metrics::record_shopping_list(items.len());
    tracing::info!(user_id = auth.user_id, lines = items.len(), "Shopping list downloaded");

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", shopping_list::FILE_NAME),
            ),
        ],
        body,
    )
        .into_response())
}
