//! Payment widget handler.

use axum::{Form, extract::State, http::HeaderMap, response::Response};
use chopho_core::PaymentMethod;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{ensure_editable, load_draft, save_draft, widget_response};
use crate::error::AppError;
use crate::middleware::RequireAuthToken;
use crate::models::CheckoutFlash;
use crate::state::AppState;

/// Payment method form data (`cod`, `bank_transfer` or `vnpay`).
#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    pub payment_method: PaymentMethod,
}

/// Choose the payment method.
#[instrument(skip(state, session, headers, _token))]
pub async fn select(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuthToken(_token): RequireAuthToken,
    Form(form): Form<PaymentForm>,
) -> Result<Response, AppError> {
    let mut draft = load_draft(&state, &session).await?;

    let error = match ensure_editable(&state, &draft)
        .and_then(|()| draft.set_payment_method(form.payment_method))
    {
        Ok(()) => {
            save_draft(&session, &draft).await?;
            None
        }
        Err(e) => Some(e.to_string()),
    };

    widget_response(
        &state,
        &session,
        &headers,
        &draft,
        CheckoutFlash {
            error,
            ..CheckoutFlash::default()
        },
    )
    .await
}
