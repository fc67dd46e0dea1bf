//! Recipes and their ingredient/tag links
//!
//! Writes run in a single transaction: the recipe row, its ingredient lines
//! and its tag links either all land or none do.

use super::Repository;
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::filters::RecipeFilter;
use crate::pagination::PageParams;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set, TransactionTrait,
};
use std::collections::{BTreeSet, HashMap};

/// One `{id, amount}` line of a recipe payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientLine {
    pub ingredient_id: i32,
    pub amount: i32,
}

/// A validated recipe ready to be stored
#[derive(Debug, Clone)]
pub struct RecipeDraft {
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    pub tags: Vec<i32>,
    pub ingredients: Vec<IngredientLine>,
}

/// Partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
    pub cooking_time: Option<i32>,
    pub tags: Option<Vec<i32>>,
    pub ingredients: Option<Vec<IngredientLine>>,
}

/// A recipe with everything its full representation needs
#[derive(Debug, Clone)]
pub struct RecipeDetails {
    pub recipe: Recipe,
    pub author: User,
    /// Viewer follows the author
    pub author_subscribed: bool,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<(RecipeIngredient, Ingredient)>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Fold lines for the same ingredient into one, summing amounts.
/// First-seen order is kept.
pub fn merge_lines(lines: &[IngredientLine]) -> Vec<IngredientLine> {
    let mut merged: Vec<IngredientLine> = Vec::with_capacity(lines.len());
    let mut positions: HashMap<i32, usize> = HashMap::new();

    for line in lines {
        match positions.get(&line.ingredient_id) {
            Some(&pos) => merged[pos].amount += line.amount,
            None => {
                positions.insert(line.ingredient_id, merged.len());
                merged.push(*line);
            }
        }
    }

    merged
}

/// Insert the ingredient lines of a recipe. Every referenced ingredient
/// must exist.
async fn insert_lines(
    txn: &DatabaseTransaction,
    recipe_id: i32,
    lines: &[IngredientLine],
) -> Result<()> {
    let lines = merge_lines(lines);
    if lines.is_empty() {
        return Ok(());
    }

    let ids: Vec<i32> = lines.iter().map(|l| l.ingredient_id).collect();
    let known: BTreeSet<i32> = IngredientEntity::find()
        .filter(IngredientColumn::Id.is_in(ids.clone()))
        .all(txn)
        .await?
        .into_iter()
        .map(|i| i.id)
        .collect();

    if let Some(missing) = ids.iter().find(|id| !known.contains(id)) {
        return Err(AppError::not_found("ingredient", missing));
    }

    let rows = lines.iter().map(|line| RecipeIngredientActiveModel {
        recipe_id: Set(recipe_id),
        ingredient_id: Set(line.ingredient_id),
        amount: Set(line.amount),
        ..Default::default()
    });

    RecipeIngredientEntity::insert_many(rows)
        .exec_without_returning(txn)
        .await?;

    Ok(())
}

/// Link a recipe to its tags. An unknown tag id is a validation error.
async fn insert_tags(txn: &DatabaseTransaction, recipe_id: i32, tags: &[i32]) -> Result<()> {
    let wanted: BTreeSet<i32> = tags.iter().copied().collect();
    if wanted.is_empty() {
        return Ok(());
    }

    let known: BTreeSet<i32> = TagEntity::find()
        .filter(TagColumn::Id.is_in(wanted.iter().copied()))
        .all(txn)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();

    if let Some(missing) = wanted.difference(&known).next() {
        return Err(AppError::validation(
            "tags",
            format!("Invalid pk \"{}\" - object does not exist.", missing),
        ));
    }

    let rows = wanted.into_iter().map(|tag_id| RecipeTagActiveModel {
        recipe_id: Set(recipe_id),
        tag_id: Set(tag_id),
    });

    RecipeTagEntity::insert_many(rows)
        .exec_without_returning(txn)
        .await?;

    Ok(())
}

impl Repository {
    // ========================================================================
    // Recipe Queries
    // ========================================================================

    /// Find recipe by ID
    pub async fn find_recipe_by_id(&self, id: i32) -> Result<Option<Recipe>> {
        RecipeEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List recipes matching a filter, oldest first.
    ///
    /// Every tag slug must exist. Favorite and cart filters need a viewer;
    /// for an anonymous viewer they match nothing.
    pub async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        viewer: Option<i32>,
        page: PageParams,
    ) -> Result<(Vec<Recipe>, u64)> {
        let mut query = RecipeEntity::find();

        if let Some(author) = filter.author {
            query = query.filter(RecipeColumn::AuthorId.eq(author));
        }

        if !filter.tags.is_empty() {
            let known: BTreeSet<String> = TagEntity::find()
                .filter(TagColumn::Slug.is_in(filter.tags.iter().cloned()))
                .all(self.read_conn())
                .await?
                .into_iter()
                .filter_map(|t| t.slug)
                .collect();
            if let Some(unknown) = filter.tags.iter().find(|slug| !known.contains(*slug)) {
                return Err(AppError::validation(
                    "tags",
                    format!(
                        "Select a valid choice. {} is not one of the available choices.",
                        unknown
                    ),
                ));
            }

            let tagged = RecipeTagEntity::find()
                .select_only()
                .column(RecipeTagColumn::RecipeId)
                .inner_join(TagEntity)
                .filter(TagColumn::Slug.is_in(filter.tags.iter().cloned()))
                .into_query();
            query = query.filter(RecipeColumn::Id.in_subquery(tagged));
        }

        if filter.is_viewer_scoped() {
            let Some(user_id) = viewer else {
                return Ok((Vec::new(), 0));
            };

            if let Some(keep) = filter.is_favorited {
                let favorites = FavoriteEntity::find()
                    .select_only()
                    .column(FavoriteColumn::RecipeId)
                    .filter(FavoriteColumn::UserId.eq(user_id))
                    .into_query();
                query = query.filter(if keep {
                    RecipeColumn::Id.in_subquery(favorites)
                } else {
                    RecipeColumn::Id.not_in_subquery(favorites)
                });
            }

            if let Some(keep) = filter.is_in_shopping_cart {
                let cart = ShoppingCartEntity::find()
                    .select_only()
                    .column(ShoppingCartColumn::RecipeId)
                    .filter(ShoppingCartColumn::UserId.eq(user_id))
                    .into_query();
                query = query.filter(if keep {
                    RecipeColumn::Id.in_subquery(cart)
                } else {
                    RecipeColumn::Id.not_in_subquery(cart)
                });
            }
        }

        let paginator = query
            .order_by_asc(RecipeColumn::PubDate)
            .order_by_asc(RecipeColumn::Id)
            .paginate(self.read_conn(), page.limit);

        let total = paginator.num_items().await?;
        let recipes = paginator.fetch_page(page.index()).await?;

        Ok((recipes, total))
    }

    /// An author's recipes, oldest first, optionally truncated
    pub async fn recipes_by_author(&self, author_id: i32, limit: Option<u64>) -> Result<Vec<Recipe>> {
        let mut query = RecipeEntity::find()
            .filter(RecipeColumn::AuthorId.eq(author_id))
            .order_by_asc(RecipeColumn::PubDate)
            .order_by_asc(RecipeColumn::Id);

        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        query.all(self.read_conn()).await.map_err(Into::into)
    }

    /// Number of recipes an author has published
    pub async fn count_recipes_by_author(&self, author_id: i32) -> Result<u64> {
        RecipeEntity::find()
            .filter(RecipeColumn::AuthorId.eq(author_id))
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Load tags, ingredient lines, author and viewer flags for a recipe
    pub async fn recipe_details(&self, recipe: Recipe, viewer: Option<i32>) -> Result<RecipeDetails> {
        let conn = self.read_conn();

        let author = UserEntity::find_by_id(recipe.author_id)
            .one(conn)
            .await?
            .ok_or_else(|| AppError::not_found("user", recipe.author_id))?;

        let tags = recipe
            .find_related(TagEntity)
            .order_by_asc(TagColumn::Name)
            .all(conn)
            .await?;

        let ingredients = RecipeIngredientEntity::find()
            .filter(RecipeIngredientColumn::RecipeId.eq(recipe.id))
            .order_by_asc(RecipeIngredientColumn::Id)
            .find_also_related(IngredientEntity)
            .all(conn)
            .await?
            .into_iter()
            .filter_map(|(line, ingredient)| ingredient.map(|i| (line, i)))
            .collect();

        let (author_subscribed, is_favorited, is_in_shopping_cart) = match viewer {
            Some(user_id) => (
                self.is_following(user_id, author.id).await?,
                self.has_bookmark(super::Bookmark::Favorite, user_id, recipe.id).await?,
                self.has_bookmark(super::Bookmark::ShoppingCart, user_id, recipe.id).await?,
            ),
            None => (false, false, false),
        };

        Ok(RecipeDetails {
            recipe,
            author,
            author_subscribed,
            tags,
            ingredients,
            is_favorited,
            is_in_shopping_cart,
        })
    }

    // ========================================================================
    // Recipe Writes
    // ========================================================================

    /// Create a recipe with its ingredient lines and tags
    pub async fn create_recipe(&self, author_id: i32, draft: RecipeDraft) -> Result<Recipe> {
        let txn = self.write_conn().begin().await?;

        let recipe = RecipeActiveModel {
            author_id: Set(author_id),
            name: Set(draft.name),
            image: Set(draft.image),
            text: Set(draft.text),
            cooking_time: Set(draft.cooking_time),
            pub_date: Set(chrono::Utc::now().into()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        insert_lines(&txn, recipe.id, &draft.ingredients).await?;
        insert_tags(&txn, recipe.id, &draft.tags).await?;

        txn.commit().await?;
        Ok(recipe)
    }

    /// Apply a partial update. Present ingredient and tag sets replace the
    /// stored ones.
    pub async fn update_recipe(&self, recipe_id: i32, changes: RecipeChanges) -> Result<Recipe> {
        let txn = self.write_conn().begin().await?;

        let stored = RecipeEntity::find_by_id(recipe_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found("recipe", recipe_id))?;

        let mut recipe: RecipeActiveModel = stored.clone().into();
        if let Some(name) = changes.name {
            recipe.name = Set(name);
        }
        if let Some(text) = changes.text {
            recipe.text = Set(text);
        }
        if let Some(image) = changes.image {
            recipe.image = Set(image);
        }
        if let Some(cooking_time) = changes.cooking_time {
            recipe.cooking_time = Set(cooking_time);
        }

        let updated = if recipe.is_changed() {
            recipe.update(&txn).await?
        } else {
            stored
        };

        if let Some(lines) = changes.ingredients {
            RecipeIngredientEntity::delete_many()
                .filter(RecipeIngredientColumn::RecipeId.eq(recipe_id))
                .exec(&txn)
                .await?;
            insert_lines(&txn, recipe_id, &lines).await?;
        }

        if let Some(tags) = changes.tags {
            RecipeTagEntity::delete_many()
                .filter(RecipeTagColumn::RecipeId.eq(recipe_id))
                .exec(&txn)
                .await?;
            insert_tags(&txn, recipe_id, &tags).await?;
        }

        txn.commit().await?;
        Ok(updated)
    }

    /// Delete a recipe and every row that references it
    pub async fn delete_recipe(&self, recipe_id: i32) -> Result<bool> {
        let txn = self.write_conn().begin().await?;

        delete_dependents(&txn, recipe_id).await?;
        let result = RecipeEntity::delete_by_id(recipe_id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }
}

async fn delete_dependents<C: ConnectionTrait>(conn: &C, recipe_id: i32) -> Result<()> {
    RecipeIngredientEntity::delete_many()
        .filter(RecipeIngredientColumn::RecipeId.eq(recipe_id))
        .exec(conn)
        .await?;
    RecipeTagEntity::delete_many()
        .filter(RecipeTagColumn::RecipeId.eq(recipe_id))
        .exec(conn)
        .await?;
    FavoriteEntity::delete_many()
        .filter(FavoriteColumn::RecipeId.eq(recipe_id))
        .exec(conn)
        .await?;
    ShoppingCartEntity::delete_many()
        .filter(ShoppingCartColumn::RecipeId.eq(recipe_id))
        .exec(conn)
        .await?;
    Ok(())
}
