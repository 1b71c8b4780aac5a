//! Voucher widget handlers.
//!
//! Codes are validated by the backend against the current subtotal. A
//! rejected code is reported inline and never blocks the rest of checkout.

use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use chopho_core::{CheckoutDraft, Voucher};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{
    CHECKOUT_UPDATED_EVENT, SummaryView, VoucherFragmentTemplate, VoucherWidget, ensure_editable,
    is_submitting, load_draft, save_draft, set_flash,
};
use crate::api::BearerToken;
use crate::error::{AppError, add_breadcrumb};
use crate::middleware::{RequireAuthToken, is_htmx};
use crate::models::CheckoutFlash;
use crate::state::AppState;

/// Apply voucher form data.
#[derive(Debug, Deserialize)]
pub struct ApplyVoucherForm {
    #[serde(default)]
    pub code: String,
}

/// Validate a code with the backend and store it on the draft.
///
/// Re-applying the same code replaces the stored voucher with an identical
/// one. On failure the previously applied voucher, if any, is kept.
#[instrument(skip(state, session, headers, token, form))]
pub async fn apply(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuthToken(token): RequireAuthToken,
    Form(form): Form<ApplyVoucherForm>,
) -> Result<Response, AppError> {
    let mut draft = load_draft(&state, &session).await?;

    let error = match try_apply(&state, &token, &mut draft, &form.code).await {
        Ok(code) => {
            add_breadcrumb("checkout", "Applied voucher", Some(&[("code", code.as_str())]));
            save_draft(&session, &draft).await?;
            None
        }
        Err(message) => Some(message),
    };

    let input = if error.is_some() { form.code } else { String::new() };
    respond(&state, &session, &headers, &draft, input, error).await
}

/// Remove the applied voucher.
#[instrument(skip(state, session, headers, _token))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuthToken(_token): RequireAuthToken,
) -> Result<Response, AppError> {
    let mut draft = load_draft(&state, &session).await?;

    let error = match ensure_editable(&state, &draft).and_then(|()| draft.remove_voucher()) {
        Ok(()) => {
            save_draft(&session, &draft).await?;
            None
        }
        Err(e) => Some(e.to_string()),
    };

    respond(&state, &session, &headers, &draft, String::new(), error).await
}

/// Normalize, validate and apply `raw_code`; returns the applied code or a
/// message for the buyer.
async fn try_apply(
    state: &AppState,
    token: &BearerToken,
    draft: &mut CheckoutDraft,
    raw_code: &str,
) -> Result<String, String> {
    let code = Voucher::normalize_code(raw_code).map_err(|e| e.to_string())?;
    ensure_editable(state, draft).map_err(|e| e.to_string())?;

    let voucher = state
        .api()
        .validate_voucher(token, &code, draft.subtotal())
        .await
        .map_err(|e| {
            if e.is_server_fault() {
                tracing::warn!("Voucher validation failed: {e}");
            } else {
                tracing::debug!("Voucher rejected: {e}");
            }
            e.user_message()
        })?;

    // A submission may have started while the backend was answering.
    ensure_editable(state, draft)
        .and_then(|()| draft.apply_voucher(voucher))
        .map_err(|e| e.to_string())?;
    Ok(code)
}

async fn respond(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    draft: &CheckoutDraft,
    input: String,
    error: Option<String>,
) -> Result<Response, AppError> {
    if !is_htmx(headers) {
        set_flash(
            session,
            &CheckoutFlash {
                voucher_error: error,
                ..CheckoutFlash::default()
            },
        )
        .await?;
        return Ok(Redirect::to("/checkout").into_response());
    }

    Ok((
        AppendHeaders([("HX-Trigger", CHECKOUT_UPDATED_EVENT)]),
        VoucherFragmentTemplate {
            voucher: VoucherWidget::new(draft, input, error),
            summary: SummaryView::new(draft, state.config().checkout.shipping_fee),
            error: draft.last_error.clone(),
            submitting: is_submitting(state, draft),
            oob: true,
        },
    )
        .into_response())
}
