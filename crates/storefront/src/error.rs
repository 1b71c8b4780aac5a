//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. Route handlers return `Result<T, AppError>`
//! when a failure should replace the page; checkout widget errors that
//! render inline are handled in the routes instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chopho_core::CheckoutError;
use thiserror::Error;

use crate::api::ApiError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend API call failed.
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    /// Checkout draft refused the operation.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Whether the failure is ours (or the backend's) rather than the buyer's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Api(err) => err.is_server_fault(),
            Self::Session(_) => true,
            Self::Checkout(_) | Self::NotFound(_) => false,
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Api(err) => match err {
                ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
                ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                ApiError::NotFound(_) => StatusCode::NOT_FOUND,
                ApiError::Rejected { status, .. } => StatusCode::from_u16(*status)
                    .ok()
                    .filter(StatusCode::is_client_error)
                    .unwrap_or(StatusCode::BAD_GATEWAY),
                ApiError::Http(_) | ApiError::Parse(_) | ApiError::Url(_) | ApiError::EmptyResponse => {
                    StatusCode::BAD_GATEWAY
                }
            },
            Self::Checkout(err) => match err {
                CheckoutError::AlreadySubmitting
                | CheckoutError::Closed
                | CheckoutError::NotSubmitting => StatusCode::CONFLICT,
                CheckoutError::EmptyCart
                | CheckoutError::MissingAddress
                | CheckoutError::Voucher(_) => StatusCode::UNPROCESSABLE_ENTITY,
            },
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Message that is safe to show to the buyer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(err) => err.user_message(),
            Self::Checkout(err) => err.to_string(),
            Self::Session(_) => "Đã có lỗi xảy ra, vui lòng thử lại".to_string(),
            Self::NotFound(_) => "Không tìm thấy trang".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), self.user_message()).into_response()
    }
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Applied voucher", Some(&[("code", "SALE15")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chopho_core::VoucherError;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order 123".to_string());
        assert_eq!(err.to_string(), "Not found: order 123");
        assert_eq!(err.user_message(), "Không tìm thấy trang");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_checkout_error_status_codes() {
        assert_eq!(
            get_status(CheckoutError::AlreadySubmitting.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(CheckoutError::EmptyCart.into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(CheckoutError::Voucher(VoucherError::EmptyCode).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            get_status(ApiError::Unauthorized.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(
                ApiError::Rejected {
                    status: 422,
                    message: "Hết hàng".to_string()
                }
                .into()
            ),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(
                ApiError::Rejected {
                    status: 503,
                    message: "Service Unavailable".to_string()
                }
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(ApiError::EmptyResponse.into()),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = AppError::from(ApiError::Parse(
            serde_json::from_str::<serde_json::Value>("{0xdeadbeef").unwrap_err(),
        ));
        assert!(!err.user_message().contains("0xdeadbeef"));
        assert!(err.is_server_error());

        let err = AppError::from(CheckoutError::MissingAddress);
        assert_eq!(err.user_message(), "Vui lòng chọn địa chỉ giao hàng");
        assert!(!err.is_server_error());
    }
}
