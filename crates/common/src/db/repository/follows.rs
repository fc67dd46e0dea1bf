//! Subscriptions between users

use super::Repository;
use crate::db::models::*;
use crate::errors::{is_unique_violation, AppError, Result};
use crate::pagination::PageParams;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};

/// A followed author as shown in the subscriptions list
#[derive(Debug, Clone)]
pub struct FollowSummary {
    pub author: User,
    /// The author follows the viewer too
    pub is_followed_back: bool,
    pub recipes: Vec<Recipe>,
    pub recipes_count: u64,
}

impl Repository {
    // ========================================================================
    // Follow Operations
    // ========================================================================

    /// Whether `user_id` follows `author_id`
    pub async fn is_following(&self, user_id: i32, author_id: i32) -> Result<bool> {
        let count = FollowEntity::find()
            .filter(FollowColumn::UserId.eq(user_id))
            .filter(FollowColumn::AuthorId.eq(author_id))
            .count(self.read_conn())
            .await?;

        Ok(count > 0)
    }

    async fn find_follow(&self, user_id: i32, author_id: i32) -> Result<Option<Follow>> {
        FollowEntity::find()
            .filter(FollowColumn::UserId.eq(user_id))
            .filter(FollowColumn::AuthorId.eq(author_id))
            .one(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Get or create the follow row. Following oneself is rejected.
    pub async fn follow(&self, user_id: i32, author_id: i32) -> Result<Follow> {
        if user_id == author_id {
            return Err(AppError::validation("author", "You cannot subscribe to yourself"));
        }

        if let Some(existing) = self.find_follow(user_id, author_id).await? {
            return Ok(existing);
        }

        let follow = FollowActiveModel {
            user_id: Set(user_id),
            author_id: Set(author_id),
            ..Default::default()
        };

        match follow.insert(self.write_conn()).await {
            Ok(created) => Ok(created),
            // Lost a race with an identical request; the row exists now.
            Err(e) if is_unique_violation(&e) => self
                .find_follow(user_id, author_id)
                .await?
                .ok_or_else(|| e.into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the follow row if present; returns whether one was removed
    pub async fn unfollow(&self, user_id: i32, author_id: i32) -> Result<bool> {
        let result = FollowEntity::delete_many()
            .filter(FollowColumn::UserId.eq(user_id))
            .filter(FollowColumn::AuthorId.eq(author_id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Build the subscription view of one author for `viewer_id`
    pub async fn follow_summary(
        &self,
        viewer_id: i32,
        author: User,
        recipes_limit: Option<u64>,
    ) -> Result<FollowSummary> {
        let is_followed_back = self.is_following(author.id, viewer_id).await?;
        let recipes = self.recipes_by_author(author.id, recipes_limit).await?;
        let recipes_count = self.count_recipes_by_author(author.id).await?;

        Ok(FollowSummary {
            author,
            is_followed_back,
            recipes,
            recipes_count,
        })
    }

    /// Authors the user follows, newest subscription first
    pub async fn list_subscriptions(
        &self,
        user_id: i32,
        page: PageParams,
        recipes_limit: Option<u64>,
    ) -> Result<(Vec<FollowSummary>, u64)> {
        let paginator = FollowEntity::find()
            .filter(FollowColumn::UserId.eq(user_id))
            .order_by_desc(FollowColumn::Id)
            .paginate(self.read_conn(), page.limit);

        let total = paginator.num_items().await?;
        let follows = paginator.fetch_page(page.index()).await?;

        let mut summaries = Vec::with_capacity(follows.len());
        for follow in follows {
            let Some(author) = self.find_user_by_id(follow.author_id).await? else {
                continue;
            };
            summaries.push(self.follow_summary(user_id, author, recipes_limit).await?);
        }

        Ok((summaries, total))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn test_self_follow_rejected() {
        let repo = repository().await;
        let anna = user(&repo, "anna").await;

        let err = repo.follow(anna.id, anna.id).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert!(!repo.is_following(anna.id, anna.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_follow_is_get_or_create() {
        let repo = repository().await;
        let anna = user(&repo, "anna").await;
        let boris = user(&repo, "boris").await;

        let first = repo.follow(anna.id, boris.id).await.unwrap();
        let second = repo.follow(anna.id, boris.id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(repo.is_following(anna.id, boris.id).await.unwrap());
        assert!(!repo.is_following(boris.id, anna.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_follow_unfollow_relist() {
        let repo = repository().await;
        let anna = user(&repo, "anna").await;
        let boris = user(&repo, "boris").await;
        let page = PageParams { page: 1, limit: 10 };

        repo.follow(anna.id, boris.id).await.unwrap();
        let (subs, total) = repo.list_subscriptions(anna.id, page, None).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(subs[0].author.id, boris.id);

        assert!(repo.unfollow(anna.id, boris.id).await.unwrap());
        assert!(!repo.unfollow(anna.id, boris.id).await.unwrap());

        let (subs, total) = repo.list_subscriptions(anna.id, page, None).await.unwrap();
        assert_eq!(total, 0);
        assert!(subs.is_empty());
    }

    #[tokio::test]
    async fn test_subscription_summary() {
        let repo = repository().await;
        let anna = user(&repo, "anna").await;
        let boris = user(&repo, "boris").await;
        let vera = user(&repo, "vera").await;
        let flour = ingredient(&repo, "flour", "g").await;

        for name in ["Bread", "Buns", "Pie"] {
            repo.create_recipe(boris.id, draft(name, vec![], vec![(flour.id, 1)]))
                .await
                .unwrap();
        }

        repo.follow(anna.id, boris.id).await.unwrap();
        repo.follow(anna.id, vera.id).await.unwrap();
        repo.follow(boris.id, anna.id).await.unwrap();

        let (subs, _) = repo
            .list_subscriptions(anna.id, PageParams { page: 1, limit: 10 }, Some(2))
            .await
            .unwrap();

        // Newest subscription first
        assert_eq!(subs[0].author.id, vera.id);
        assert!(!subs[0].is_followed_back);
        assert_eq!(subs[0].recipes_count, 0);

        assert_eq!(subs[1].author.id, boris.id);
        assert!(subs[1].is_followed_back);
        assert_eq!(subs[1].recipes.len(), 2);
        assert_eq!(subs[1].recipes_count, 3);
    }
}
