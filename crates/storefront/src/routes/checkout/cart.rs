//! Cart widget handler.
//!
//! The cart widget reports its lines as JSON in whatever shape it has; the
//! lines are normalized by `chopho_core::normalize_cart` before they reach
//! the draft.

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use chopho_core::CartItemInput;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{
    CHECKOUT_UPDATED_EVENT, LineView, LinesFragmentTemplate, SummaryView, ensure_editable,
    is_submitting, load_draft, save_draft, set_flash,
};
use crate::error::AppError;
use crate::middleware::{RequireAuthToken, is_htmx};
use crate::models::CheckoutFlash;
use crate::state::AppState;

/// Body of `POST /checkout/cart`: a bare array or `{"items": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CartPayload {
    Lines(Vec<CartItemInput>),
    Wrapped { items: Vec<CartItemInput> },
}

impl CartPayload {
    fn into_lines(self) -> Vec<CartItemInput> {
        match self {
            Self::Lines(items) | Self::Wrapped { items } => items,
        }
    }
}

/// Replace the draft's cart with the widget's lines.
///
/// HTMX gets the cart lines with the summary swapped out-of-band.
#[instrument(skip(state, session, headers, _token, payload))]
pub async fn replace(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuthToken(_token): RequireAuthToken,
    Json(payload): Json<CartPayload>,
) -> Result<Response, AppError> {
    let mut draft = load_draft(&state, &session).await?;

    let error = match ensure_editable(&state, &draft)
        .and_then(|()| draft.replace_items(payload.into_lines()))
    {
        Ok(()) => {
            tracing::debug!(lines = draft.items.len(), "Cart replaced");
            save_draft(&session, &draft).await?;
            None
        }
        Err(e) => Some(e.to_string()),
    };

    if !is_htmx(&headers) {
        set_flash(
            &session,
            &CheckoutFlash {
                error,
                ..CheckoutFlash::default()
            },
        )
        .await?;
        return Ok(Redirect::to("/checkout").into_response());
    }

    Ok((
        AppendHeaders([("HX-Trigger", CHECKOUT_UPDATED_EVENT)]),
        LinesFragmentTemplate {
            lines: draft.items.iter().map(LineView::from).collect(),
            summary: SummaryView::new(&draft, state.config().checkout.shipping_fee),
            error: error.or_else(|| draft.last_error.clone()),
            submitting: is_submitting(&state, &draft),
            oob: true,
        },
    )
        .into_response())
}
