use crate::access::{Capability, CredentialError};
use crate::config::ConfigError;
use crate::occupancy::RosterError;
use crate::store::RepositoryError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

/// Failures surfaced by the occupancy and provisioning operations.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("missing capability {capability}")]
    Unauthorized { capability: Capability },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("target unavailable: {0}")]
    TargetUnavailable(String),
    #[error("credential error: {0}")]
    Credential(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl LifecycleError {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            LifecycleError::Unauthenticated => StatusCode::UNAUTHORIZED,
            LifecycleError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            LifecycleError::NotFound { .. } => StatusCode::NOT_FOUND,
            LifecycleError::InvalidStateTransition(_) | LifecycleError::TargetUnavailable(_) => {
                StatusCode::CONFLICT
            }
            LifecycleError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            LifecycleError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            LifecycleError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            LifecycleError::Credential(_)
            | LifecycleError::Internal(_)
            | LifecycleError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LifecycleError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ValidationErrors> for LifecycleError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<CredentialError> for LifecycleError {
    fn from(value: CredentialError) -> Self {
        Self::Credential(value.to_string())
    }
}

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Roster(RosterError),
    Lifecycle(LifecycleError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Roster(err) => write!(f, "roster error: {}", err),
            AppError::Lifecycle(err) => write!(f, "lifecycle error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Roster(err) => Some(err),
            AppError::Lifecycle(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Lifecycle(err) => err.into_response(),
            AppError::Roster(err) => {
                let body = Json(json!({ "error": err.to_string() }));
                (StatusCode::UNPROCESSABLE_ENTITY, body).into_response()
            }
            other => {
                tracing::error!(error = %other, "request failed");
                let body = Json(json!({ "error": other.to_string() }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<RosterError> for AppError {
    fn from(value: RosterError) -> Self {
        Self::Roster(value)
    }
}

impl From<LifecycleError> for AppError {
    fn from(value: LifecycleError) -> Self {
        Self::Lifecycle(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_http_statuses() {
        let cases = [
            (LifecycleError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (
                LifecycleError::Unauthorized {
                    capability: Capability::CreateTenants,
                },
                StatusCode::FORBIDDEN,
            ),
            (
                LifecycleError::not_found("unit", "unit-000009"),
                StatusCode::NOT_FOUND,
            ),
            (
                LifecycleError::InvalidStateTransition("occupied".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                LifecycleError::TargetUnavailable("race lost".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                LifecycleError::Validation("rent".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                LifecycleError::Repository(RepositoryError::Conflict("email".to_string())),
                StatusCode::CONFLICT,
            ),
            (
                LifecycleError::Repository(RepositoryError::Unavailable("down".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status(), expected, "{error}");
        }
    }

    #[test]
    fn not_found_names_entity_and_id() {
        let error = LifecycleError::not_found("property", "prop-000001");
        assert_eq!(error.to_string(), "property prop-000001 not found");
    }
}
