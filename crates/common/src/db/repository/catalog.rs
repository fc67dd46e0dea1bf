//! Tags and ingredients

use super::Repository;
use crate::db::models::*;
use crate::errors::{is_unique_violation, AppError, Result};
use crate::filters::{like_pattern, IngredientFilter};
use crate::validators::{self, validate_color};
use sea_orm::{ActiveModelTrait, EntityTrait, QueryFilter, QueryOrder, Set};

impl Repository {
    // ========================================================================
    // Tag Operations
    // ========================================================================

    /// Create a tag; a color must be `#RRGGBB`
    pub async fn create_tag(
        &self,
        name: &str,
        color: Option<&str>,
        slug: Option<&str>,
    ) -> Result<Tag> {
        if let Some(color) = color {
            validate_color(color)
                .map_err(|e| AppError::validation("color", validators::message(&e)))?;
        }

        let tag = TagActiveModel {
            name: Set(name.to_string()),
            color: Set(color.map(String::from)),
            slug: Set(slug.map(String::from)),
            ..Default::default()
        };

        tag.insert(self.write_conn()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Duplicate {
                    message: format!("Tag {} already exists", name),
                }
            } else {
                e.into()
            }
        })
    }

    /// All tags, by name
    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        TagEntity::find()
            .order_by_asc(TagColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find tag by ID
    pub async fn find_tag_by_id(&self, id: i32) -> Result<Option<Tag>> {
        TagEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Ingredient Operations
    // ========================================================================

    /// Create an ingredient
    pub async fn create_ingredient(&self, name: &str, measurement_unit: &str) -> Result<Ingredient> {
        let ingredient = IngredientActiveModel {
            name: Set(name.to_string()),
            measurement_unit: Set(measurement_unit.to_string()),
            ..Default::default()
        };

        ingredient.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Ingredients by name, optionally narrowed to a name prefix
    pub async fn list_ingredients(&self, filter: &IngredientFilter) -> Result<Vec<Ingredient>> {
        let mut query = IngredientEntity::find();

        if let Some(name) = filter.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            query = query.filter(self.ilike(
                (IngredientEntity, IngredientColumn::Name),
                like_pattern(name, true),
            ));
        }

        query
            .order_by_asc(IngredientColumn::Name)
            .order_by_asc(IngredientColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find ingredient by ID
    pub async fn find_ingredient_by_id(&self, id: i32) -> Result<Option<Ingredient>> {
        IngredientEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn test_tags_sorted_by_name() {
        let repo = repository().await;
        tag(&repo, "supper").await;
        tag(&repo, "breakfast").await;
        tag(&repo, "lunch").await;

        let names: Vec<_> = repo
            .list_tags()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["breakfast", "lunch", "supper"]);
    }

    #[tokio::test]
    async fn test_duplicate_tag_name() {
        let repo = repository().await;
        tag(&repo, "lunch").await;

        let err = repo.create_tag("lunch", None, None).await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_ingredient_prefix_search() {
        let repo = repository().await;
        ingredient(&repo, "Sugar", "g").await;
        ingredient(&repo, "salt", "g").await;
        ingredient(&repo, "brown sugar", "g").await;

        let found = repo
            .list_ingredients(&IngredientFilter {
                name: Some("su".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Sugar");

        let all = repo.list_ingredients(&IngredientFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_tag_color_must_be_hex() {
        let repo = repository().await;

        let err = repo.create_tag("dinner", Some("blue"), Some("dinner")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: Some(ref f), .. } if f == "color"));
        assert!(repo.list_tags().await.unwrap().is_empty());

        let tag = repo.create_tag("dinner", Some("#8775D2"), Some("dinner")).await.unwrap();
        assert_eq!(tag.color.as_deref(), Some("#8775D2"));
    }

    #[tokio::test]
    async fn test_ingredient_prefix_search_non_ascii() {
        let repo = repository().await;
        ingredient(&repo, "Соль", "г").await;
        ingredient(&repo, "Сахар", "г").await;

        let found = repo
            .list_ingredients(&IngredientFilter {
                name: Some("Сол".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Соль");

        let found = repo
            .list_ingredients(&IngredientFilter {
                name: Some(" С ".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_find_missing() {
        let repo = repository().await;
        assert!(repo.find_tag_by_id(99).await.unwrap().is_none());
        assert!(repo.find_ingredient_by_id(99).await.unwrap().is_none());
    }
}
