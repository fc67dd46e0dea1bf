//! Favorites and shopping cart
//!
//! Both are per-user (user, recipe) associations with the same rules, so
//! they share one set of operations keyed by [`Bookmark`].

use super::{Repository, ShoppingCartRow};
use crate::db::models::*;
use crate::errors::{is_unique_violation, AppError, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, QueryTrait, Set,
};

/// Which per-user recipe list an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bookmark {
    Favorite,
    ShoppingCart,
}

impl Bookmark {
    /// Human-readable list name for messages
    pub fn label(&self) -> &'static str {
        match self {
            Bookmark::Favorite => "favorites",
            Bookmark::ShoppingCart => "shopping cart",
        }
    }

    /// Metric label
    pub fn as_str(&self) -> &'static str {
        match self {
            Bookmark::Favorite => "favorite",
            Bookmark::ShoppingCart => "shopping_cart",
        }
    }
}

async fn bookmark_exists<C: ConnectionTrait>(
    conn: &C,
    kind: Bookmark,
    user_id: i32,
    recipe_id: i32,
) -> Result<bool> {
    let count = match kind {
        Bookmark::Favorite => {
            FavoriteEntity::find()
                .filter(FavoriteColumn::UserId.eq(user_id))
                .filter(FavoriteColumn::RecipeId.eq(recipe_id))
                .count(conn)
                .await?
        }
        Bookmark::ShoppingCart => {
            ShoppingCartEntity::find()
                .filter(ShoppingCartColumn::UserId.eq(user_id))
                .filter(ShoppingCartColumn::RecipeId.eq(recipe_id))
                .count(conn)
                .await?
        }
    };

    Ok(count > 0)
}

impl Repository {
    // ========================================================================
    // Favorite / Shopping Cart Operations
    // ========================================================================

    /// Whether the recipe is in the user's list
    pub async fn has_bookmark(&self, kind: Bookmark, user_id: i32, recipe_id: i32) -> Result<bool> {
        bookmark_exists(self.read_conn(), kind, user_id, recipe_id).await
    }

    /// Add a recipe to the user's list and return it.
    ///
    /// A missing recipe is a 404, a recipe already in the list is a conflict.
    /// The unique index catches the concurrent case the pre-check misses.
    pub async fn add_bookmark(&self, kind: Bookmark, user_id: i32, recipe_id: i32) -> Result<Recipe> {
        let conn = self.write_conn();

        let recipe = RecipeEntity::find_by_id(recipe_id)
            .one(conn)
            .await?
            .ok_or_else(|| AppError::not_found("recipe", recipe_id))?;

        let duplicate = || AppError::Duplicate {
            message: format!("Recipe is already in {}", kind.label()),
        };

        if bookmark_exists(conn, kind, user_id, recipe_id).await? {
            return Err(duplicate());
        }

        let inserted = match kind {
            Bookmark::Favorite => FavoriteActiveModel {
                user_id: Set(user_id),
                recipe_id: Set(recipe_id),
                ..Default::default()
            }
            .insert(conn)
            .await
            .map(|_| ()),
            Bookmark::ShoppingCart => ShoppingCartActiveModel {
                user_id: Set(user_id),
                recipe_id: Set(recipe_id),
                ..Default::default()
            }
            .insert(conn)
            .await
            .map(|_| ()),
        };

        match inserted {
            Ok(()) => Ok(recipe),
            Err(e) if is_unique_violation(&e) => Err(duplicate()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a recipe from the user's list. Removing an absent entry is a
    /// client error.
    pub async fn remove_bookmark(&self, kind: Bookmark, user_id: i32, recipe_id: i32) -> Result<()> {
        let conn = self.write_conn();

        let result = match kind {
            Bookmark::Favorite => {
                FavoriteEntity::delete_many()
                    .filter(FavoriteColumn::UserId.eq(user_id))
                    .filter(FavoriteColumn::RecipeId.eq(recipe_id))
                    .exec(conn)
                    .await?
            }
            Bookmark::ShoppingCart => {
                ShoppingCartEntity::delete_many()
                    .filter(ShoppingCartColumn::UserId.eq(user_id))
                    .filter(ShoppingCartColumn::RecipeId.eq(recipe_id))
                    .exec(conn)
                    .await?
            }
        };

        if result.rows_affected == 0 {
            return Err(AppError::NotLinked {
                message: format!("Recipe is not in {}", kind.label()),
            });
        }

        Ok(())
    }

    /// Every ingredient line of every recipe in the user's cart
    pub async fn shopping_cart_rows(&self, user_id: i32) -> Result<Vec<ShoppingCartRow>> {
        let cart = ShoppingCartEntity::find()
            .select_only()
            .column(ShoppingCartColumn::RecipeId)
            .filter(ShoppingCartColumn::UserId.eq(user_id))
            .into_query();

        RecipeIngredientEntity::find()
            .select_only()
            .column_as(IngredientColumn::Name, "name")
            .column_as(IngredientColumn::MeasurementUnit, "measurement_unit")
            .column_as(RecipeIngredientColumn::Amount, "amount")
            .inner_join(IngredientEntity)
            .filter(RecipeIngredientColumn::RecipeId.in_subquery(cart))
            .into_model::<ShoppingCartRow>()
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn test_favorite_twice_is_conflict() {
        let repo = repository().await;
        let anna = user(&repo, "anna").await;
        let flour = ingredient(&repo, "flour", "g").await;
        let recipe = repo
            .create_recipe(anna.id, draft("Bread", vec![], vec![(flour.id, 1)]))
            .await
            .unwrap();

        let added = repo.add_bookmark(Bookmark::Favorite, anna.id, recipe.id).await.unwrap();
        assert_eq!(added.id, recipe.id);

        let err = repo
            .add_bookmark(Bookmark::Favorite, anna.id, recipe.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate { .. }));

        let rows = FavoriteEntity::find().all(repo.read_conn()).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_unique_index_backs_the_check() {
        let repo = repository().await;
        let anna = user(&repo, "anna").await;
        let flour = ingredient(&repo, "flour", "g").await;
        let recipe = repo
            .create_recipe(anna.id, draft("Bread", vec![], vec![(flour.id, 1)]))
            .await
            .unwrap();

        let row = || ShoppingCartActiveModel {
            user_id: Set(anna.id),
            recipe_id: Set(recipe.id),
            ..Default::default()
        };
        row().insert(repo.write_conn()).await.unwrap();
        let err = row().insert(repo.write_conn()).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_bookmark_missing_recipe() {
        let repo = repository().await;
        let anna = user(&repo, "anna").await;

        let err = repo
            .add_bookmark(Bookmark::ShoppingCart, anna.id, 404)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_remove_absent_bookmark() {
        let repo = repository().await;
        let anna = user(&repo, "anna").await;
        let flour = ingredient(&repo, "flour", "g").await;
        let recipe = repo
            .create_recipe(anna.id, draft("Bread", vec![], vec![(flour.id, 1)]))
            .await
            .unwrap();

        let err = repo
            .remove_bookmark(Bookmark::ShoppingCart, anna.id, recipe.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotLinked { .. }));

        repo.add_bookmark(Bookmark::ShoppingCart, anna.id, recipe.id).await.unwrap();
        repo.remove_bookmark(Bookmark::ShoppingCart, anna.id, recipe.id).await.unwrap();
        assert!(!repo.has_bookmark(Bookmark::ShoppingCart, anna.id, recipe.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_shopping_cart_rows() {
        let repo = repository().await;
        let anna = user(&repo, "anna").await;
        let flour = ingredient(&repo, "flour", "g").await;
        let milk = ingredient(&repo, "milk", "ml").await;

        let bread = repo
            .create_recipe(anna.id, draft("Bread", vec![], vec![(flour.id, 500)]))
            .await
            .unwrap();
        let pancakes = repo
            .create_recipe(anna.id, draft("Pancakes", vec![], vec![(flour.id, 200), (milk.id, 300)]))
            .await
            .unwrap();
        repo.create_recipe(anna.id, draft("Not in cart", vec![], vec![(milk.id, 1)]))
            .await
            .unwrap();

        repo.add_bookmark(Bookmark::ShoppingCart, anna.id, bread.id).await.unwrap();
        repo.add_bookmark(Bookmark::ShoppingCart, anna.id, pancakes.id).await.unwrap();

        let mut rows = repo.shopping_cart_rows(anna.id).await.unwrap();
        rows.sort_by(|a, b| (&a.name, a.amount).cmp(&(&b.name, b.amount)));

        let flat: Vec<_> = rows
            .iter()
            .map(|r| (r.name.as_str(), r.measurement_unit.as_str(), r.amount))
            .collect();
        assert_eq!(
            flat,
            vec![("flour", "g", 200), ("flour", "g", 500), ("milk", "ml", 300)]
        );
    }
}
