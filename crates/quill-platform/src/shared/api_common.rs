//! Common API types and utilities

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request,
    },
    http::request::Parts,
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use utoipa::ToSchema;

use crate::shared::error::{PlatformError, Result};

/// JSON body extractor whose rejections render as `VALIDATION_ERROR`
/// instead of axum's plain-text 415/422 responses.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(PlatformError::bad_request(rejection.body_text())),
        }
    }
}

/// Path extractor that reports unparseable segments (`/posts/abc`) as
/// `VALIDATION_ERROR`.
pub struct PathParam<T>(pub T);

impl<T, S> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> std::result::Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| Self(value))
            .map_err(|rejection: PathRejection| PlatformError::bad_request(rejection.body_text()))
    }
}

/// Unwrap a required request field
pub fn require<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| PlatformError::missing_field(field))
}

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 with an offset, a naive date-time (taken as UTC) or a
/// bare date (midnight UTC).
pub fn parse_datetime(field: &str, value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Some(midnight) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    Err(PlatformError::bad_request(format!(
        "Invalid {}: expected an ISO-8601 date or date-time, got {:?}",
        field, value
    )))
}

/// Message-only response
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Created response with ID
#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedResponse {
    pub id: i32,
    pub message: String,
}

impl CreatedResponse {
    pub fn new(id: i32, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let dt = parse_datetime("created", "2024-03-01T12:30:00+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_is_utc() {
        let dt = parse_datetime("created", "2024-03-01T12:30:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());

        let dt = parse_datetime("created", "2024-03-01T12:30:00.250").unwrap();
        assert_eq!(dt.nanosecond(), 250_000_000);
    }

    #[test]
    fn test_parse_date_only() {
        let dt = parse_datetime("created", "2024-03-01").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day(), dt.hour()), (2024, 3, 1, 0));
    }

    #[test]
    fn test_parse_garbage() {
        let err = parse_datetime("created", "yesterday").unwrap_err();
        assert!(matches!(err, PlatformError::Validation { .. }));
        assert!(err.to_string().contains("created"));
    }

    #[test]
    fn test_require() {
        assert_eq!(require(Some(3), "x").unwrap(), 3);
        let err = require::<i32>(None, "title").unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Missing required field: title");
    }
}
