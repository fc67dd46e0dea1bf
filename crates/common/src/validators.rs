//! Field validators for recipe and tag payloads
//!
//! Each returns a `validator::ValidationError` carrying a human-readable
//! message; callers attach the field name.

use regex_lite::Regex;
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::LazyLock;
use validator::ValidationError;

/// Lowest accepted cooking time, in minutes
pub const MIN_COOKING_TIME: i32 = 1;

/// Lowest accepted ingredient amount
pub const MIN_AMOUNT: i32 = 1;

/// Longest recipe, tag and ingredient name
pub const MAX_NAME_LENGTH: usize = 200;

static DATA_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:image/([a-zA-Z0-9.+-]+);base64,([A-Za-z0-9+/]+={0,2})$")
        .expect("image data URI pattern is valid")
});

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("hex color pattern is valid")
});

fn error(code: &'static str, message: String) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Owned(message))
}

pub fn validate_cooking_time(minutes: i32) -> Result<(), ValidationError> {
    if minutes < MIN_COOKING_TIME {
        return Err(error(
            "cooking_time",
            format!("Cooking time must be at least {} minute", MIN_COOKING_TIME),
        ));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let length = name.trim().chars().count();
    if length == 0 {
        return Err(error("blank", "This field may not be blank.".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(error(
            "max_length",
            format!(
                "Ensure this field has no more than {} characters.",
                MAX_NAME_LENGTH
            ),
        ));
    }
    Ok(())
}

/// Ingredient lines as `(ingredient id, amount)`: at least one line, no
/// repeated ids, every amount positive.
pub fn validate_ingredients(lines: &[(i32, i32)]) -> Result<(), ValidationError> {
    if lines.is_empty() {
        return Err(error(
            "ingredients",
            "A recipe needs at least one ingredient.".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(lines.len());
    for &(id, amount) in lines {
        if !seen.insert(id) {
            return Err(error(
                "ingredients",
                "A recipe cannot list the same ingredient twice.".to_string(),
            ));
        }
        if amount < MIN_AMOUNT {
            return Err(error(
                "ingredients",
                format!("Amount must be at least {}.", MIN_AMOUNT),
            ));
        }
    }

    Ok(())
}

/// `data:image/<type>;base64,<payload>` with a well-formed payload
pub fn validate_image(image: &str) -> Result<(), ValidationError> {
    let payload_ok = DATA_URI
        .captures(image)
        .and_then(|caps| caps.get(2))
        .map(|payload| payload.as_str().len() % 4 == 0)
        .unwrap_or(false);

    if !payload_ok {
        return Err(error(
            "image",
            "Upload a valid image as a base64 data URI.".to_string(),
        ));
    }
    Ok(())
}

/// `#RRGGBB`
pub fn validate_color(color: &str) -> Result<(), ValidationError> {
    if !HEX_COLOR.is_match(color) {
        return Err(error(
            "color",
            "Enter a hex color such as #49B64E.".to_string(),
        ));
    }
    Ok(())
}

/// Letters, digits and `@ . + - _`
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let valid = !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));

    if !valid {
        return Err(error(
            "username",
            "Enter a valid username. It may contain only letters, numbers, and @/./+/-/_ characters."
                .to_string(),
        ));
    }
    Ok(())
}

/// Message text of a validation error, for field-scoped responses
pub fn message(err: &ValidationError) -> String {
    err.message
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| err.code.to_string())
}
