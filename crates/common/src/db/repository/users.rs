//! User accounts

use super::Repository;
use crate::db::models::*;
use crate::errors::{is_unique_violation, AppError, Result};
use crate::filters::{like_pattern, UserFilter};
use crate::pagination::PageParams;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

impl Repository {
    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a user with an already hashed password
    pub async fn create_user(
        &self,
        email: &str,
        username: &str,
        first_name: &str,
        last_name: &str,
        password_hash: &str,
    ) -> Result<User> {
        let user = UserActiveModel {
            email: Set(email.to_string()),
            username: Set(username.to_string()),
            first_name: Set(first_name.to_string()),
            last_name: Set(last_name.to_string()),
            password: Set(password_hash.to_string()),
            date_joined: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        user.insert(self.write_conn()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Duplicate {
                    message: "A user with that username or email already exists".to_string(),
                }
            } else {
                e.into()
            }
        })
    }

    /// Find user by ID
    pub async fn find_user_by_id(&self, id: i32) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find user by email (login identifier)
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Email.eq(email))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find user by username
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Username.eq(username))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List users, optionally searching username and email
    pub async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageParams,
    ) -> Result<(Vec<User>, u64)> {
        let mut query = UserEntity::find();

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search, false);
            query = query.filter(
                Condition::any()
                    .add(self.ilike((UserEntity, UserColumn::Username), pattern.clone()))
                    .add(self.ilike((UserEntity, UserColumn::Email), pattern)),
            );
        }

        let paginator = query
            .order_by_asc(UserColumn::Id)
            .paginate(self.read_conn(), page.limit);

        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page.index()).await?;

        Ok((users, total))
    }

    /// Replace a user's password hash
    pub async fn set_password(&self, user_id: i32, password_hash: &str) -> Result<()> {
        let mut user: UserActiveModel = UserEntity::find_by_id(user_id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::not_found("user", user_id))?
            .into();

        user.password = Set(password_hash.to_string());
        user.update(self.write_conn()).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn test_create_and_find_user() {
        let repo = repository().await;
        let anna = user(&repo, "anna").await;

        let found = repo.find_user_by_email("anna@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, anna.id);
        assert_eq!(found.username, "anna");
        assert!(repo.find_user_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let repo = repository().await;
        user(&repo, "anna").await;

        let err = repo
            .create_user("other@example.com", "anna", "A", "B", "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_search_users() {
        let repo = repository().await;
        user(&repo, "Anna").await;
        user(&repo, "boris").await;
        user(&repo, "joanna").await;

        let filter = UserFilter {
            search: Some("ANN".to_string()),
        };
        let (users, total) = repo
            .list_users(&filter, PageParams { page: 1, limit: 10 })
            .await
            .unwrap();

        assert_eq!(total, 2);
        let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["Anna", "joanna"]);
    }

    #[tokio::test]
    async fn test_set_password() {
        let repo = repository().await;
        let anna = user(&repo, "anna").await;

        repo.set_password(anna.id, "new-hash").await.unwrap();
        let reloaded = repo.find_user_by_id(anna.id).await.unwrap().unwrap();
        assert_eq!(reloaded.password, "new-hash");
    }
}
