//! Request extractors that report malformed input as [`AppError`]
//!
//! `ValidQuery` parses the query string with `axum_extra`'s `Query`, so
//! repeated keys fill `Vec` fields. `ValidJson` keeps the path of the field
//! that failed to deserialize and reports it like any other field error.

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::Query;
use foodgram_common::errors::{AppError, Result};
use serde::de::DeserializeOwned;
use serde_path_to_error::Segment;

/// Query string deserialized into `T`
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::InvalidFormat {
                message: rejection.to_string(),
            })?;

        Ok(Self(value))
    }
}

/// JSON body deserialized into `T`
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        if !is_json(req.headers()) {
            return Err(AppError::InvalidFormat {
                message: "Expected request with `Content-Type: application/json`".to_string(),
            });
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::InvalidFormat {
                message: rejection.body_text(),
            })?;

        let deserializer = &mut serde_json::Deserializer::from_slice(&bytes);
        serde_path_to_error::deserialize(deserializer)
            .map(Self)
            .map_err(body_error)
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|content_type| {
            let essence = content_type.split(';').next().unwrap_or_default().trim();
            essence == "application/json" || essence.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Attribute a deserialization failure to the top-level field it came from
fn body_error(err: serde_path_to_error::Error<serde_json::Error>) -> AppError {
    let field = match err.path().iter().next() {
        Some(Segment::Map { key }) => Some(key.clone()),
        _ => None,
    };
    let message = err.inner().to_string();

    // serde reports a missing top-level field with an empty path
    if field.is_none() {
        if let Some(missing) = message
            .strip_prefix("missing field `")
            .and_then(|rest| rest.split('`').next())
        {
            return AppError::MissingField {
                field: missing.to_string(),
            };
        }
    }

    match field {
        Some(field) => AppError::Validation {
            message,
            field: Some(field),
        },
        None => AppError::InvalidFormat { message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Payload {
        name: String,
        lines: Vec<Line>,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Line {
        amount: i32,
    }

    fn parse(body: &str) -> std::result::Result<Payload, AppError> {
        let deserializer = &mut serde_json::Deserializer::from_str(body);
        serde_path_to_error::deserialize(deserializer).map_err(body_error)
    }

    #[test]
    fn test_nested_error_is_scoped_to_top_level_field() {
        let err = parse(r#"{"name": "Soup", "lines": [{"amount": "lots"}]}"#).unwrap_err();
        assert!(matches!(err, AppError::Validation { field: Some(ref f), .. } if f == "lines"));
    }

    #[test]
    fn test_missing_field_is_named() {
        let err = parse(r#"{"lines": []}"#).unwrap_err();
        assert!(matches!(err, AppError::MissingField { ref field } if field == "name"));
    }

    #[test]
    fn test_syntax_error_is_invalid_format() {
        let err = parse("not json").unwrap_err();
        assert!(matches!(err, AppError::InvalidFormat { .. }));
    }

    #[test]
    fn test_content_type_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert!(is_json(&headers));

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!is_json(&headers));
    }
}
