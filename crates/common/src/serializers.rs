//! Request payloads and response representations
//!
//! Payloads deserialize leniently (every recipe field optional) so a missing
//! field becomes a field-scoped error instead of a body rejection.

use crate::db::models::{Ingredient, Recipe, Tag, User};
use crate::db::{FollowSummary, IngredientLine, RecipeChanges, RecipeDetails, RecipeDraft};
use crate::errors::{AppError, Result};
use crate::validators::{
    self, validate_cooking_time, validate_image, validate_ingredients, validate_name,
    validate_username,
};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use validator::{Validate, ValidationError};

fn check(field: &str, result: std::result::Result<(), ValidationError>) -> Result<()> {
    result.map_err(|e| AppError::validation(field, validators::message(&e)))
}

fn required<T>(field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| AppError::MissingField {
        field: field.to_string(),
    })
}

fn check_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(AppError::validation("text", "This field may not be blank."));
    }
    Ok(())
}

// ============================================================================
// Lenient integers
// ============================================================================

const INVALID_INTEGER: &str = "A valid integer is required.";

/// Integer given either as a JSON number or as a numeric string
struct IntVisitor;

impl<'de> de::Visitor<'de> for IntVisitor {
    type Value = i32;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an integer")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<i32, E> {
        i32::try_from(v).map_err(|_| E::custom(INVALID_INTEGER))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<i32, E> {
        i32::try_from(v).map_err(|_| E::custom(INVALID_INTEGER))
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> std::result::Result<i32, E> {
        Err(E::custom(INVALID_INTEGER))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<i32, E> {
        v.trim().parse().map_err(|_| E::custom(INVALID_INTEGER))
    }
}

fn lenient_int<'de, D>(deserializer: D) -> std::result::Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(IntVisitor)
}

#[derive(Deserialize)]
struct LenientInt(#[serde(deserialize_with = "lenient_int")] i32);

fn lenient_opt_int<'de, D>(deserializer: D) -> std::result::Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<LenientInt>::deserialize(deserializer)?.map(|LenientInt(v)| v))
}

fn lenient_opt_ints<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<i32>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<LenientInt>>::deserialize(deserializer)?
        .map(|values| values.into_iter().map(|LenientInt(v)| v).collect()))
}

// ============================================================================
// Recipe payloads
// ============================================================================

/// `{id, amount}` entry of a recipe payload
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct IngredientAmount {
    #[serde(deserialize_with = "lenient_int")]
    pub id: i32,
    #[serde(deserialize_with = "lenient_int")]
    pub amount: i32,
}

/// Body of recipe create (POST) and update (PATCH)
///
/// Integer fields also accept numeric strings (`"amount": "5"`).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecipeWrite {
    pub ingredients: Option<Vec<IngredientAmount>>,
    #[serde(default, deserialize_with = "lenient_opt_ints")]
    pub tags: Option<Vec<i32>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_int")]
    pub cooking_time: Option<i32>,
}

fn check_lines(lines: &[IngredientAmount]) -> Result<Vec<IngredientLine>> {
    let pairs: Vec<(i32, i32)> = lines.iter().map(|l| (l.id, l.amount)).collect();
    check("ingredients", validate_ingredients(&pairs))?;

    Ok(lines
        .iter()
        .map(|l| IngredientLine {
            ingredient_id: l.id,
            amount: l.amount,
        })
        .collect())
}

impl RecipeWrite {
    /// Validate a create payload; every field is required
    pub fn into_draft(self) -> Result<RecipeDraft> {
        let ingredients = check_lines(&required("ingredients", self.ingredients)?)?;
        let tags = required("tags", self.tags)?;

        let image = required("image", self.image)?;
        check("image", validate_image(&image))?;

        let name = required("name", self.name)?;
        check("name", validate_name(&name))?;

        let text = required("text", self.text)?;
        check_text(&text)?;

        let cooking_time = required("cooking_time", self.cooking_time)?;
        check("cooking_time", validate_cooking_time(cooking_time))?;

        Ok(RecipeDraft {
            name,
            text,
            image,
            cooking_time,
            tags,
            ingredients,
        })
    }

    /// Validate an update payload; absent fields stay untouched
    pub fn into_changes(self) -> Result<RecipeChanges> {
        let ingredients = self
            .ingredients
            .as_deref()
            .map(check_lines)
            .transpose()?;

        if let Some(ref image) = self.image {
            check("image", validate_image(image))?;
        }
        if let Some(ref name) = self.name {
            check("name", validate_name(name))?;
        }
        if let Some(ref text) = self.text {
            check_text(text)?;
        }
        if let Some(cooking_time) = self.cooking_time {
            check("cooking_time", validate_cooking_time(cooking_time))?;
        }

        Ok(RecipeChanges {
            name: self.name,
            text: self.text,
            image: self.image,
            cooking_time: self.cooking_time,
            tags: self.tags,
            ingredients,
        })
    }
}

// ============================================================================
// User payloads
// ============================================================================

/// Registration body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserCreate {
    #[validate(email(message = "Enter a valid email address."), length(max = 254))]
    pub email: String,

    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has no more than 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[validate(length(min = 1, max = 150, message = "This field may not be blank."))]
    pub first_name: String,

    #[validate(length(min = 1, max = 150, message = "This field may not be blank."))]
    pub last_name: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8 to 128 characters long."))]
    pub password: String,
}

/// `POST /users/set_password/` body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SetPassword {
    #[validate(length(min = 8, max = 128, message = "Password must be 8 to 128 characters long."))]
    pub new_password: String,

    pub current_password: String,
}

/// `POST /auth/token/login/` body
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TokenLogin {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    pub password: String,
}

// ============================================================================
// Responses
// ============================================================================

/// Public user, as seen by a viewer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub email: String,
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserResponse {
    pub fn new(user: &User, is_subscribed: bool) -> Self {
        Self {
            email: user.email.clone(),
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_subscribed,
        }
    }
}

/// Registration response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreated {
    pub email: String,
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserCreated {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagResponse {
    pub id: i32,
    pub name: String,
    pub color: Option<String>,
    pub slug: Option<String>,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientResponse {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

impl From<Ingredient> for IngredientResponse {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            id: ingredient.id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

/// Ingredient line inside a recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeIngredientResponse {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Full recipe representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub id: i32,
    pub tags: Vec<TagResponse>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

impl From<RecipeDetails> for RecipeResponse {
    fn from(details: RecipeDetails) -> Self {
        let RecipeDetails {
            recipe,
            author,
            author_subscribed,
            tags,
            ingredients,
            is_favorited,
            is_in_shopping_cart,
        } = details;

        Self {
            id: recipe.id,
            tags: tags.into_iter().map(TagResponse::from).collect(),
            author: UserResponse::new(&author, author_subscribed),
            ingredients: ingredients
                .into_iter()
                .map(|(line, ingredient)| RecipeIngredientResponse {
                    id: ingredient.id,
                    name: ingredient.name,
                    measurement_unit: ingredient.measurement_unit,
                    amount: line.amount,
                })
                .collect(),
            is_favorited,
            is_in_shopping_cart,
            name: recipe.name,
            image: recipe.image,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Compact recipe for favorites, cart and subscription listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeMinified {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<Recipe> for RecipeMinified {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name,
            image: recipe.image,
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Followed author with their recipes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowResponse {
    pub email: String,
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub is_followed_back: bool,
    pub recipes: Vec<RecipeMinified>,
    pub recipes_count: u64,
}

impl From<FollowSummary> for FollowResponse {
    fn from(summary: FollowSummary) -> Self {
        let author = summary.author;
        Self {
            email: author.email,
            id: author.id,
            username: author.username,
            first_name: author.first_name,
            last_name: author.last_name,
            is_subscribed: true,
            is_followed_back: summary.is_followed_back,
            recipes: summary.recipes.into_iter().map(RecipeMinified::from).collect(),
            recipes_count: summary.recipes_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub auth_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn payload() -> RecipeWrite {
        RecipeWrite {
            ingredients: Some(vec![IngredientAmount { id: 1, amount: 10 }]),
            tags: Some(vec![1]),
            image: Some(IMAGE.to_string()),
            name: Some("Soup".to_string()),
            text: Some("Boil water".to_string()),
            cooking_time: Some(1),
        }
    }

    fn error_field(err: AppError) -> Option<String> {
        match err {
            AppError::Validation { field, .. } => field,
            AppError::MissingField { field } => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_minimal_valid_draft() {
        let draft = payload().into_draft().unwrap();
        assert_eq!(draft.cooking_time, 1);
        assert_eq!(draft.ingredients[0].ingredient_id, 1);
        assert_eq!(draft.tags, vec![1]);
    }

    #[test]
    fn test_zero_cooking_time_rejected() {
        let err = RecipeWrite {
            cooking_time: Some(0),
            ..payload()
        }
        .into_draft()
        .unwrap_err();
        assert_eq!(error_field(err).as_deref(), Some("cooking_time"));
    }

    #[test]
    fn test_duplicate_ingredients_rejected() {
        let err = RecipeWrite {
            ingredients: Some(vec![
                IngredientAmount { id: 4, amount: 1 },
                IngredientAmount { id: 4, amount: 2 },
            ]),
            ..payload()
        }
        .into_draft()
        .unwrap_err();
        assert_eq!(error_field(err).as_deref(), Some("ingredients"));
    }

    #[test]
    fn test_empty_ingredients_rejected() {
        let err = RecipeWrite {
            ingredients: Some(vec![]),
            ..payload()
        }
        .into_draft()
        .unwrap_err();
        assert_eq!(error_field(err).as_deref(), Some("ingredients"));
    }

    #[test]
    fn test_missing_field_on_create() {
        let err = RecipeWrite {
            tags: None,
            ..payload()
        }
        .into_draft()
        .unwrap_err();
        assert!(matches!(err, AppError::MissingField { ref field } if field == "tags"));
    }

    #[test]
    fn test_partial_update() {
        let changes = RecipeWrite {
            name: Some("Better soup".to_string()),
            ..Default::default()
        }
        .into_changes()
        .unwrap();

        assert_eq!(changes.name.as_deref(), Some("Better soup"));
        assert!(changes.ingredients.is_none());
        assert!(changes.tags.is_none());

        let err = RecipeWrite {
            image: Some("not an image".to_string()),
            ..Default::default()
        }
        .into_changes()
        .unwrap_err();
        assert_eq!(error_field(err).as_deref(), Some("image"));
    }

    #[test]
    fn test_payload_from_json() {
        let body = serde_json::json!({
            "ingredients": [{"id": 1, "amount": 10}],
            "tags": [1, 2],
            "image": IMAGE,
            "name": "Soup",
            "text": "Boil water",
            "cooking_time": 5
        });
        let write: RecipeWrite = serde_json::from_value(body).unwrap();
        assert_eq!(write.into_draft().unwrap().tags, vec![1, 2]);
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let body = serde_json::json!({
            "ingredients": [{"id": "1", "amount": "5"}],
            "tags": ["2", 3],
            "cooking_time": " 15 "
        });
        let write: RecipeWrite = serde_json::from_value(body).unwrap();

        assert_eq!(write.ingredients.as_deref().unwrap()[0].amount, 5);
        assert_eq!(write.tags, Some(vec![2, 3]));
        assert_eq!(write.cooking_time, Some(15));
    }

    #[test]
    fn test_non_numeric_integer_rejected() {
        for body in [
            serde_json::json!({ "cooking_time": "abc" }),
            serde_json::json!({ "cooking_time": 1.5 }),
            serde_json::json!({ "ingredients": [{"id": 1, "amount": "lots"}] }),
        ] {
            let err = serde_json::from_value::<RecipeWrite>(body).unwrap_err();
            assert!(err.to_string().contains(INVALID_INTEGER), "{}", err);
        }
    }

    #[test]
    fn test_null_and_absent_integers() {
        let write: RecipeWrite =
            serde_json::from_value(serde_json::json!({ "cooking_time": null })).unwrap();
        assert_eq!(write.cooking_time, None);
        assert_eq!(write.tags, None);
    }

    #[test]
    fn test_user_create_validation() {
        let valid = UserCreate {
            email: "anna@example.com".to_string(),
            username: "anna".to_string(),
            first_name: "Anna".to_string(),
            last_name: "K".to_string(),
            password: "long-enough".to_string(),
        };
        assert!(valid.validate().is_ok());

        let bad_email = UserCreate {
            email: "not-an-email".to_string(),
            ..valid.clone()
        };
        assert!(bad_email.validate().is_err());

        let bad_username = UserCreate {
            username: "has space".to_string(),
            ..valid
        };
        let err: AppError = bad_username.validate().unwrap_err().into();
        assert_eq!(error_field(err).as_deref(), Some("username"));
    }
}
