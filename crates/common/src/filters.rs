//! Query-string filters for list endpoints
//!
//! Deserialized by the gateway's query extractor; repeated keys such as
//! `tags` collect into a `Vec`. Unknown parameters (pagination included)
//! are ignored.

use serde::{de, Deserialize, Deserializer};

/// Filters accepted by the recipe listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecipeFilter {
    /// Exact author id
    pub author: Option<i32>,

    /// Tag slugs; a recipe matches when it carries any of them
    pub tags: Vec<String>,

    /// `Some(true)` keeps the viewer's favorites, `Some(false)` excludes them
    #[serde(deserialize_with = "flag")]
    pub is_favorited: Option<bool>,

    /// Same as `is_favorited`, against the viewer's shopping cart
    #[serde(deserialize_with = "flag")]
    pub is_in_shopping_cart: Option<bool>,
}

impl RecipeFilter {
    /// Whether the filter depends on who is asking
    pub fn is_viewer_scoped(&self) -> bool {
        self.is_favorited.is_some() || self.is_in_shopping_cart.is_some()
    }
}

/// `1` or `0`; an empty value means the filter is off
fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)?.as_deref() {
        None | Some("") => Ok(None),
        Some("1") => Ok(Some(true)),
        Some("0") => Ok(Some(false)),
        Some(other) => Err(de::Error::custom(format!(
            "Select a valid choice. {} is not one of the available choices.",
            other
        ))),
    }
}

/// Case-insensitive name prefix for the ingredient listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IngredientFilter {
    pub name: Option<String>,
}

/// Case-insensitive substring search over username and email
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UserFilter {
    pub search: Option<String>,
}

/// `recipes_limit` of the subscription endpoints; absent means no truncation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecipesLimit {
    pub recipes_limit: Option<u64>,
}

/// `LIKE` pattern matching `value` literally, escaped with `\`
pub(crate) fn like_pattern(value: &str, prefix_only: bool) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    if prefix_only {
        format!("{}%", escaped)
    } else {
        format!("%{}%", escaped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recipe_filter_fields() {
        let filter: RecipeFilter = serde_json::from_value(json!({
            "author": 3,
            "tags": ["breakfast", "lunch"],
            "is_favorited": "1",
            "page": "2",
        }))
        .unwrap();

        assert_eq!(filter.author, Some(3));
        assert_eq!(filter.tags, vec!["breakfast".to_string(), "lunch".to_string()]);
        assert_eq!(filter.is_favorited, Some(true));
        assert_eq!(filter.is_in_shopping_cart, None);
        assert!(filter.is_viewer_scoped());
    }

    #[test]
    fn test_recipe_filter_empty() {
        let filter: RecipeFilter = serde_json::from_value(json!({})).unwrap();
        assert_eq!(filter, RecipeFilter::default());
        assert!(!filter.is_viewer_scoped());
    }

    #[test]
    fn test_flag_values() {
        let filter: RecipeFilter =
            serde_json::from_value(json!({ "is_in_shopping_cart": "0", "is_favorited": "" }))
                .unwrap();
        assert_eq!(filter.is_in_shopping_cart, Some(false));
        assert_eq!(filter.is_favorited, None);

        let err = serde_json::from_value::<RecipeFilter>(json!({ "is_favorited": "true" }))
            .unwrap_err();
        assert!(err.to_string().contains("Select a valid choice. true"));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Сол", true), "Сол%");
        assert_eq!(like_pattern("50%_off", false), "%50\\%\\_off%");
    }
}
