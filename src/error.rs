//! Domain error type and the JSON error envelope every failed request returns.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One entry of an error's `detail`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ErrorDetail {
    pub fn new(field: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
            suggestion: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetails {
    Single(ErrorDetail),
    List(Vec<ErrorDetail>),
}

/// Error raised anywhere between the extractors and the store.
///
/// Services construct these at the point of detection; the response side
/// turns them into an [`ErrorEnvelope`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Option<ErrorDetails>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        let suggestion = default_suggestion(code).map(str::to_string);
        Self {
            status,
            code,
            details: Some(ErrorDetails::Single(ErrorDetail {
                field: None,
                reason: message.clone(),
                suggestion,
            })),
            message,
        }
    }

    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{} with id {} not found", entity, id),
        )
        .field("id")
        .suggestion(format!("Check that the {} id is correct", entity))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    /// Validation failure listing every offending field.
    pub fn validation(details: Vec<ErrorDetail>) -> Self {
        let fallback = default_suggestion("VALIDATION_ERROR");
        let details = details
            .into_iter()
            .map(|mut d| {
                if d.suggestion.is_none() {
                    d.suggestion = fallback.map(str::to_string);
                }
                d
            })
            .collect();
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "VALIDATION_ERROR",
            message: "Validation failed".to_string(),
            details: Some(ErrorDetails::List(details)),
        }
    }

    /// Sets the field on a single-detail error.
    pub fn field(self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.map_detail(|d| d.field = Some(field))
    }

    pub fn reason(self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        self.map_detail(|d| d.reason = reason)
    }

    pub fn suggestion(self, suggestion: impl Into<String>) -> Self {
        let suggestion = suggestion.into();
        self.map_detail(|d| d.suggestion = Some(suggestion))
    }

    fn map_detail(mut self, f: impl FnOnce(&mut ErrorDetail)) -> Self {
        let mut detail = match self.details.take() {
            Some(ErrorDetails::Single(d)) => d,
            _ => ErrorDetail::new(None, self.message.clone()),
        };
        f(&mut detail);
        self.details = Some(ErrorDetails::Single(detail));
        self
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            status_code: self.status.as_u16(),
            message: self.message.clone(),
            timestamp: Utc::now().to_rfc3339(),
            path: String::new(),
            detail: self.details.clone(),
        }
    }
}

fn default_suggestion(code: &str) -> Option<&'static str> {
    match code {
        "NOT_FOUND" => Some("Check that the resource exists"),
        "BAD_REQUEST" => Some("Check the request parameters and try again"),
        "CONFLICT" => Some("Use a different value or update the existing record"),
        "UNAUTHORIZED" => Some("Log in again to obtain a valid token"),
        "FORBIDDEN" => Some("This account is not allowed to perform the action"),
        "VALIDATION_ERROR" => Some("Correct the field and resubmit"),
        "INTERNAL_ERROR" => Some("Try again later or contact the administrator"),
        _ => None,
    }
}

/// The one JSON shape every error response has.
///
/// `path` is filled in by the error-normalization middleware, which is the
/// only layer that sees the request URI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub status_code: u16,
    pub message: String,
    pub timestamp: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<ErrorDetails>,
}

/// Marker left in response extensions so the middleware can find the code.
#[derive(Debug, Clone)]
pub struct ErrorCode(pub &'static str);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = self.envelope();
        let mut response = (self.status, Json(envelope.clone())).into_response();
        response.extensions_mut().insert(envelope);
        response.extensions_mut().insert(ErrorCode(self.code));
        response
    }
}

// Postgres SQLSTATE classes that mean "the submitted data is invalid".
const VALIDATION_STATES: &[&str] = &["22001", "22003", "22007", "22008", "22P02", "23502", "23514"];

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Record not found",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
                let first_line = db_err.message().lines().next().unwrap_or("").to_string();
                if db_err.is_unique_violation() {
                    let mut e = ApiError::conflict("A record with this value already exists");
                    if let Some(constraint) = db_err.constraint() {
                        e = e.field(constraint);
                    }
                    e.reason(first_line)
                } else if db_err.is_foreign_key_violation() {
                    let mut e = ApiError::bad_request("Related record not found");
                    if let Some(constraint) = db_err.constraint() {
                        e = e.field(constraint);
                    }
                    e.reason(first_line)
                } else if code == "23001" {
                    ApiError::conflict("Operation violates a required relation").reason(first_line)
                } else if VALIDATION_STATES.contains(&code.as_str()) {
                    ApiError::bad_request(first_line.clone()).reason(first_line)
                } else {
                    ApiError::bad_request("Database error").reason(first_line)
                }
            }
            other => ApiError::internal("Internal server error").reason(format!(
                "{} ({})",
                other,
                sqlx_error_kind(other)
            )),
        }
    }
}

fn sqlx_error_kind(err: &sqlx::Error) -> &'static str {
    match err {
        sqlx::Error::Configuration(_) => "Configuration",
        sqlx::Error::Io(_) => "Io",
        sqlx::Error::Tls(_) => "Tls",
        sqlx::Error::Protocol(_) => "Protocol",
        sqlx::Error::PoolTimedOut => "PoolTimedOut",
        sqlx::Error::PoolClosed => "PoolClosed",
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => "Decode",
        _ => "Other",
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ErrorDetail> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = camel_case(&field);
                errs.iter().map(move |e| {
                    let reason = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| describe_validation(&e.code));
                    ErrorDetail::new(Some(field.clone()), reason)
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::validation(details)
    }
}

fn describe_validation(code: &str) -> String {
    match code {
        "length" => "has an invalid length".to_string(),
        "range" => "is out of range".to_string(),
        "url" => "must be a valid URL".to_string(),
        "email" => "must be a valid email address".to_string(),
        "required" => "is required".to_string(),
        other => format!("failed the '{}' check", other),
    }
}

/// `github_url` -> `githubUrl`, matching the JSON field names clients send.
pub fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::internal("File storage error").reason(err.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        ApiError::bad_request("Invalid multipart data").reason(err.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_factories_use_declared_status_codes() {
        assert_eq!(ApiError::not_found("Project", 3).status, StatusCode::NOT_FOUND);
        assert_eq!(ApiError::bad_request("x").status, StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::conflict("x").status, StatusCode::CONFLICT);
        assert_eq!(ApiError::unauthorized("x").status, StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status, StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::internal("x").status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::validation(vec![]).status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_names_entity_and_id() {
        let err = ApiError::not_found("Project", 42);
        assert_eq!(err.message, "Project with id 42 not found");
        match err.details {
            Some(ErrorDetails::Single(d)) => {
                assert_eq!(d.field.as_deref(), Some("id"));
                assert!(d.suggestion.unwrap().contains("Project"));
            }
            other => panic!("unexpected details: {:?}", other),
        }
    }

    #[test]
    fn test_default_suggestion_is_filled() {
        let err = ApiError::conflict("taken");
        match err.details {
            Some(ErrorDetails::Single(d)) => assert!(d.suggestion.is_some()),
            other => panic!("unexpected details: {:?}", other),
        }
    }

    #[test]
    fn test_caller_suggestion_overrides_default() {
        let err = ApiError::bad_request("bad").suggestion("do this instead");
        match err.details {
            Some(ErrorDetails::Single(d)) => {
                assert_eq!(d.suggestion.as_deref(), Some("do this instead"))
            }
            other => panic!("unexpected details: {:?}", other),
        }
    }

    #[test]
    fn test_envelope_serializes_camel_case() {
        let envelope = ApiError::bad_request("nope").envelope();
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["statusCode"], 400);
        assert_eq!(json["message"], "nope");
        assert!(json["timestamp"].is_string());
        assert_eq!(json["detail"]["reason"], "nope");
    }

    #[test]
    fn test_row_not_found_maps_to_404() {
        let err = ApiError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_pool_timeout_maps_to_500_with_reason() {
        let err = ApiError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Internal server error");
        match err.details {
            Some(ErrorDetails::Single(d)) => assert!(d.reason.contains("PoolTimedOut")),
            other => panic!("unexpected details: {:?}", other),
        }
    }

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 1))]
        display_name: String,
        #[validate(range(min = 0, max = 100))]
        level: i32,
    }

    #[test]
    fn test_validation_errors_list_every_field_in_camel_case() {
        let probe = Probe {
            display_name: String::new(),
            level: 150,
        };
        let err = ApiError::from(probe.validate().unwrap_err());
        assert_eq!(err.code, "VALIDATION_ERROR");
        match err.details {
            Some(ErrorDetails::List(list)) => {
                let fields: Vec<_> = list.iter().filter_map(|d| d.field.clone()).collect();
                assert_eq!(fields, vec!["displayName".to_string(), "level".to_string()]);
                assert!(list.iter().all(|d| d.suggestion.is_some()));
            }
            other => panic!("unexpected details: {:?}", other),
        }
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("github_url"), "githubUrl");
        assert_eq!(camel_case("title"), "title");
        assert_eq!(camel_case("is_active"), "isActive");
    }
}
