//! Order submission handler.
//!
//! The session is only persisted after the response, so concurrent requests
//! on the same session never see this one's `Submitting` draft. The claim in
//! the process-wide [`SubmissionRegistry`](crate::services::SubmissionRegistry)
//! is what they see instead: a second submit is refused and widget edits are
//! held off until the claim is released. Once the order exists, the draft id
//! is recorded as placed, so a copy written back to the session by a slower
//! request is discarded on the next load.

use axum::{
    Extension, Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use chopho_core::{CheckoutDraft, CheckoutError, OrderId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{
    CHECKOUT_UPDATED_EVENT, StoredDraft, SummaryFragmentTemplate, SummaryView, clear_draft,
    load_stored_draft, save_draft, set_flash,
};
use crate::error::{AppError, add_breadcrumb};
use crate::middleware::{RequestId, RequireAuthToken, is_htmx};
use crate::models::CheckoutFlash;
use crate::state::AppState;

/// Submit form data.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitForm {
    /// Free-text note for the seller.
    #[serde(default)]
    pub note: Option<String>,
}

/// Place the order.
///
/// On success the draft is cleared and the buyer is sent to the
/// confirmation page. On failure the backend's message is kept on the
/// draft and the checkout stays as it was. Submitting a draft that was
/// already placed leads back to that order's confirmation.
#[instrument(skip(state, session, headers, token, request_id, form), fields(draft_id))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Extension(request_id): Extension<RequestId>,
    RequireAuthToken(token): RequireAuthToken,
    Form(form): Form<SubmitForm>,
) -> Result<Response, AppError> {
    let mut draft = match load_stored_draft(&state, &session).await? {
        StoredDraft::Open(draft) => draft,
        StoredDraft::Placed(order_id) => {
            tracing::info!(%order_id, "Submit for an order already placed");
            return Ok(to_confirmation(&headers, order_id));
        }
    };
    tracing::Span::current().record("draft_id", tracing::field::display(draft.id));

    let Some(ticket) = state.submissions().try_acquire(draft.id) else {
        tracing::info!("Duplicate submission ignored");
        // Leave the session alone; the running submission owns it.
        return Ok(rejected(&state, &headers, &draft, &CheckoutError::AlreadySubmitting, true));
    };

    let shipping_fee = state.config().checkout.shipping_fee;
    let request = match draft.begin_submit(shipping_fee, form.note) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!("Submission refused: {e}");
            if !is_htmx(&headers) {
                set_flash(
                    &session,
                    &CheckoutFlash {
                        error: Some(e.to_string()),
                        ..CheckoutFlash::default()
                    },
                )
                .await?;
            }
            return Ok(rejected(&state, &headers, &draft, &e, false));
        }
    };

    match state.api().create_order(&token, &request).await {
        Ok(created) => {
            draft.complete(created.id)?;
            ticket.finish(created.id).await;
            clear_draft(&session).await?;

            add_breadcrumb(
                "checkout",
                "Order placed",
                Some(&[("order_id", created.id.to_string().as_str())]),
            );
            tracing::info!(order_id = %created.id, total = %request.total, "Order placed");
            Ok(to_confirmation(&headers, created.id))
        }
        Err(e) => {
            // Server faults carry the request id so support can find the logs.
            let message = if e.is_server_fault() {
                tracing::error!(error = %e, "Order submission failed");
                format!("{} (mã yêu cầu {})", e.user_message(), request_id.0)
            } else {
                tracing::warn!(error = %e, "Order rejected by backend");
                e.user_message()
            };
            draft.fail(message)?;
            save_draft(&session, &draft).await?;

            if is_htmx(&headers) {
                Ok(summary(&state, &draft, None, false))
            } else {
                Ok(Redirect::to("/checkout").into_response())
            }
        }
    }
}

fn to_confirmation(headers: &HeaderMap, id: OrderId) -> Response {
    let url = format!("/orders/{id}/confirmation");
    if is_htmx(headers) {
        AppendHeaders([("HX-Redirect", url)]).into_response()
    } else {
        Redirect::to(&url).into_response()
    }
}

/// Response for a submission that never reached the backend.
fn rejected(
    state: &AppState,
    headers: &HeaderMap,
    draft: &CheckoutDraft,
    error: &CheckoutError,
    submitting: bool,
) -> Response {
    if is_htmx(headers) {
        summary(state, draft, Some(error.to_string()), submitting)
    } else {
        Redirect::to("/checkout").into_response()
    }
}

fn summary(
    state: &AppState,
    draft: &CheckoutDraft,
    error: Option<String>,
    submitting: bool,
) -> Response {
    (
        AppendHeaders([("HX-Trigger", CHECKOUT_UPDATED_EVENT)]),
        SummaryFragmentTemplate {
            summary: SummaryView::new(draft, state.config().checkout.shipping_fee),
            error: error.or_else(|| draft.last_error.clone()),
            submitting,
            oob: false,
        },
    )
        .into_response()
}
