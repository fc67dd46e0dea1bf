//! Ingredient handlers (read-only)

use axum::{
    extract::{Path, State},
    Json,
};

use crate::extract::ValidQuery;
use crate::AppState;
use foodgram_common::{
    db::Repository,
    errors::{AppError, Result},
    filters::IngredientFilter,
    serializers::IngredientResponse,
};

/// List ingredients, optionally by name prefix (`?name=`)
pub async fn list_ingredients(
    State(state): State<AppState>,
    ValidQuery(filter): ValidQuery<IngredientFilter>,
) -> Result<Json<Vec<IngredientResponse>>> {
    let repo = Repository::new(state.db.clone());
    let ingredients = repo.list_ingredients(&filter).await?;

    Ok(Json(
        ingredients.into_iter().map(IngredientResponse::from).collect(),
    ))
}

/// Get an ingredient by ID
pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(ingredient_id): Path<i32>,
) -> Result<Json<IngredientResponse>> {
    let repo = Repository::new(state.db.clone());
    let ingredient = repo
        .find_ingredient_by_id(ingredient_id)
        .await?
        .ok_or_else(|| AppError::not_found("ingredient", ingredient_id))?;

    Ok(Json(ingredient.into()))
}
