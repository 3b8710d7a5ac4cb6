use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::domain::schedule::ScheduleError;
use crate::domain::storage::StoreError;
use crate::notification::DispatchError;
use crate::tasks::SchedulerError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

fn masked(message: &str, production_message: &str) -> String {
    if is_production() {
        production_message.to_string()
    } else {
        message.to_string()
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String, String) {
        match self {
            AppError::Config(e) => {
                let log_msg = e.to_string();
                let client_msg = masked(&log_msg, "Configuration error");
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR", client_msg, log_msg)
            }
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone(), msg.clone()),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                msg.clone(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone(), msg.clone()),
            AppError::Delivery(msg) => {
                let client_msg = masked(msg, "Notification delivery failed");
                (StatusCode::BAD_GATEWAY, "DELIVERY_FAILED", client_msg, msg.clone())
            }
            AppError::Internal(msg) => {
                let client_msg = masked(msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", client_msg, msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, client_message, log_message) = self.parts();

        // Always log the detailed error server-side
        if status.is_server_error() {
            tracing::error!(code = %code, status = %status.as_u16(), message = %log_message, "API error");
        } else {
            tracing::warn!(code = %code, status = %status.as_u16(), message = %log_message, "API error");
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::TemplateTypeRequired | DispatchError::TemplateDisabled(_) => {
                AppError::Validation(err.to_string())
            }
            DispatchError::TemplateNotFound(_) => AppError::NotFound(err.to_string()),
            DispatchError::Store(e) => e.into(),
            DispatchError::Delivery(e) => AppError::Delivery(e.to_string()),
        }
    }
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::TemplateTypeRequired
            | ScheduleError::TemplateDisabled(_)
            | ScheduleError::InvalidRecurrence(_) => AppError::Validation(err.to_string()),
            ScheduleError::TemplateNotFound(_) | ScheduleError::NotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            ScheduleError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
            ScheduleError::Store(e) => e.into(),
        }
    }
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::Store(e) => e.into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Invalid(msg) => AppError::Conflict(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::delivery::DeliveryError;
    use uuid::Uuid;

    #[test]
    fn test_dispatch_error_mapping() {
        let cases = [
            (DispatchError::TemplateTypeRequired, StatusCode::BAD_REQUEST),
            (DispatchError::TemplateNotFound("x".into()), StatusCode::NOT_FOUND),
            (DispatchError::TemplateDisabled("x".into()), StatusCode::BAD_REQUEST),
            (
                DispatchError::Store(StoreError::Unavailable("db".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                DispatchError::Delivery(DeliveryError::AllChannelsFailed { reports: vec![] }),
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_schedule_error_mapping() {
        let conflict = ScheduleError::InvalidTransition {
            id: Uuid::new_v4(),
            status: crate::domain::schedule::ScheduleStatus::Sent,
            action: "cancelled",
        };
        assert_eq!(
            AppError::from(conflict).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(ScheduleError::NotFound(Uuid::new_v4()))
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(ScheduleError::InvalidRecurrence("every".into()))
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_error_code() {
        let (_, code, message, _) = AppError::Validation("bad".into()).parts();
        assert_eq!(code, "VALIDATION_ERROR");
        assert_eq!(message, "bad");
    }
}
