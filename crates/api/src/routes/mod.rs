//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod pets;
pub mod stores;

use std::str::FromStr;

use crate::error::ApiError;

/// Parses an ID from a path segment.
pub(crate) fn parse_id<T: FromStr>(kind: &str, raw: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {kind} id: {raw}")))
}
