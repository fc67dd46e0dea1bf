//! Schema bootstrap
//!
//! Creates every table and uniqueness index from the entity definitions.
//! Tables are created parents first so foreign keys resolve.

use crate::db::models::*;
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

fn table<E: EntityTrait>(schema: &Schema, entity: E) -> TableCreateStatement {
    schema
        .create_table_from_entity(entity)
        .if_not_exists()
        .to_owned()
}

/// One association row per pair
fn unique_indexes() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .name("uq_favorites_user_recipe")
            .table(FavoriteEntity)
            .col(FavoriteColumn::UserId)
            .col(FavoriteColumn::RecipeId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_shopping_carts_user_recipe")
            .table(ShoppingCartEntity)
            .col(ShoppingCartColumn::UserId)
            .col(ShoppingCartColumn::RecipeId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_follows_user_author")
            .table(FollowEntity)
            .col(FollowColumn::UserId)
            .col(FollowColumn::AuthorId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_recipe_ingredients_recipe_ingredient")
            .table(RecipeIngredientEntity)
            .col(RecipeIngredientColumn::RecipeId)
            .col(RecipeIngredientColumn::IngredientId)
            .unique()
            .if_not_exists()
            .to_owned(),
    ]
}

/// Create all tables and indexes that do not exist yet
pub async fn create_tables(conn: &DatabaseConnection) -> Result<()> {
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);

    let tables = [
        table(&schema, UserEntity),
        table(&schema, TagEntity),
        table(&schema, IngredientEntity),
        table(&schema, RecipeEntity),
        table(&schema, RecipeIngredientEntity),
        table(&schema, RecipeTagEntity),
        table(&schema, FavoriteEntity),
        table(&schema, ShoppingCartEntity),
        table(&schema, FollowEntity),
    ];

    for stmt in &tables {
        conn.execute(backend.build(stmt)).await?;
    }
    debug!(count = tables.len(), "Tables ensured");

    for index in unique_indexes() {
        conn.execute(backend.build(&index)).await?;
    }

    info!("Database schema is up to date");
    Ok(())
}
