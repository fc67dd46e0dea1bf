//! Author-or-read-only authorization
//!
//! Reads are open to everyone, creating needs a signed-in caller, and
//! changing or deleting a resource is reserved to its author.

use crate::errors::{AppError, Result};
use axum::http::Method;

/// Methods that never change state
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Request-level check: safe methods pass, everything else needs a caller
pub fn has_permission(method: &Method, caller: Option<i32>) -> bool {
    is_safe_method(method) || caller.is_some()
}

/// Object-level check against the resource's author
pub fn has_object_permission(method: &Method, caller: Option<i32>, author_id: i32) -> bool {
    if is_safe_method(method) || *method == Method::POST {
        return true;
    }
    caller == Some(author_id)
}

/// Fail with 401/403 unless `caller` may apply `method` to a resource
/// owned by `author_id`
pub fn check_author_or_read_only(method: &Method, caller: Option<i32>, author_id: i32) -> Result<()> {
    if !has_permission(method, caller) {
        return Err(AppError::Unauthorized {
            message: "Authentication credentials were not provided".to_string(),
        });
    }
    if !has_object_permission(method, caller, author_id) {
        return Err(AppError::Forbidden {
            message: "Only the author may change this resource".to_string(),
        });
    }
    Ok(())
}
