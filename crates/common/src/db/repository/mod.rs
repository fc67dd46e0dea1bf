//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.
//! Operations are grouped by aggregate in the submodules.

mod bookmarks;
mod catalog;
mod follows;
mod recipes;
mod users;

pub use bookmarks::Bookmark;
pub use follows::FollowSummary;
pub use recipes::{merge_lines, IngredientLine, RecipeChanges, RecipeDetails, RecipeDraft};

use crate::db::DbPool;
use crate::errors::Result;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, IntoColumnRef, LikeExpr, SimpleExpr};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, FromQueryResult};
use serde::{Deserialize, Serialize};

/// One ingredient line of a recipe in a user's shopping cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromQueryResult)]
pub struct ShoppingCartRow {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    /// Case-insensitive `LIKE` against an escaped pattern. Postgres gets
    /// `ILIKE`, which folds any script; SQLite `LIKE` folds ASCII only.
    fn ilike<C: IntoColumnRef>(&self, column: C, pattern: String) -> SimpleExpr {
        let like = LikeExpr::new(pattern).escape('\\');
        match self.read_conn().get_database_backend() {
            DbBackend::Postgres => Expr::col(column).ilike(like),
            _ => Expr::col(column).like(like),
        }
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! In-memory SQLite repository for tests

    use super::*;
    use crate::auth::hash_password;
    use crate::db::models::{Ingredient, Tag, User};
    use crate::db::schema::create_tables;
    use sea_orm::{ConnectOptions, Database};

    pub async fn repository() -> Repository {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).min_connections(1).sqlx_logging(false);

        let conn = Database::connect(opts).await.unwrap();
        create_tables(&conn).await.unwrap();

        Repository::new(DbPool::from_connection(conn))
    }

    pub async fn user(repo: &Repository, username: &str) -> User {
        repo.create_user(
            &format!("{}@example.com", username),
            username,
            "Test",
            "User",
            &hash_password("password-123").unwrap(),
        )
        .await
        .unwrap()
    }

    pub async fn tag(repo: &Repository, name: &str) -> Tag {
        repo.create_tag(name, Some("#49B64E"), Some(name)).await.unwrap()
    }

    pub async fn ingredient(repo: &Repository, name: &str, unit: &str) -> Ingredient {
        repo.create_ingredient(name, unit).await.unwrap()
    }

    pub fn draft(name: &str, tags: Vec<i32>, lines: Vec<(i32, i32)>) -> RecipeDraft {
        RecipeDraft {
            name: name.to_string(),
            text: format!("How to cook {}", name),
            image: "data:image/png;base64,iVBORw0KGgo=".to_string(),
            cooking_time: 15,
            tags,
            ingredients: lines
                .into_iter()
                .map(|(ingredient_id, amount)| IngredientLine {
                    ingredient_id,
                    amount,
                })
                .collect(),
        }
    }
}
