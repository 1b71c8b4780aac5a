//! Address widget handlers.
//!
//! A draft holds either a saved address from the buyer's address book or a
//! manually entered one, never both.

use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use chopho_core::{AddressId, CheckoutDraft, ManualAddress};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{
    AddressFragmentTemplate, AddressWidget, CHECKOUT_UPDATED_EVENT, SummaryView, ensure_editable,
    is_submitting, load_draft, save_draft, set_flash,
};
use crate::api::BearerToken;
use crate::error::AppError;
use crate::middleware::{RequireAuthToken, is_htmx};
use crate::models::CheckoutFlash;
use crate::state::AppState;

const UNKNOWN_ADDRESS: &str = "Địa chỉ đã chọn không hợp lệ";

/// Select saved address form data.
#[derive(Debug, Deserialize)]
pub struct SelectAddressForm {
    pub address_id: i32,
}

/// Manual address form data.
#[derive(Debug, Deserialize)]
pub struct ManualAddressForm {
    #[serde(default)]
    pub recipient_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub full_address: String,
}

impl ManualAddressForm {
    fn validate(&self) -> Result<ManualAddress, String> {
        ManualAddress::new(&self.recipient_name, &self.phone, &self.full_address)
            .map_err(|e| e.to_string())
    }
}

/// Select one of the buyer's saved addresses.
#[instrument(skip(state, session, headers, token))]
pub async fn select(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuthToken(token): RequireAuthToken,
    Form(form): Form<SelectAddressForm>,
) -> Result<Response, AppError> {
    let mut draft = load_draft(&state, &session).await?;

    let error = if form.address_id <= 0 {
        Some(UNKNOWN_ADDRESS.to_string())
    } else {
        match ensure_editable(&state, &draft)
            .and_then(|()| draft.select_stored_address(AddressId::new(form.address_id)))
        {
            Ok(()) => {
                save_draft(&session, &draft).await?;
                None
            }
            Err(e) => Some(e.to_string()),
        }
    };

    respond(&state, &session, &headers, &token, &draft, error, None).await
}

/// Use a manually entered address.
///
/// Invalid input leaves the current selection untouched and is reported
/// inline with the submitted values kept in the form.
#[instrument(skip(state, session, headers, token, form))]
pub async fn manual(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuthToken(token): RequireAuthToken,
    Form(form): Form<ManualAddressForm>,
) -> Result<Response, AppError> {
    let mut draft = load_draft(&state, &session).await?;

    let error = match form.validate() {
        Ok(address) => match ensure_editable(&state, &draft)
            .and_then(|()| draft.set_manual_address(Some(address)))
        {
            Ok(()) => {
                save_draft(&session, &draft).await?;
                None
            }
            Err(e) => Some(e.to_string()),
        },
        Err(message) => Some(message),
    };

    let rejected = error.is_some().then_some(&form);
    respond(&state, &session, &headers, &token, &draft, error, rejected).await
}

/// Save a manually entered address to the address book and select it.
#[instrument(skip(state, session, headers, token, form))]
pub async fn save(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuthToken(token): RequireAuthToken,
    Form(form): Form<ManualAddressForm>,
) -> Result<Response, AppError> {
    let mut draft = load_draft(&state, &session).await?;

    let error = match save_and_select(&state, &token, &mut draft, &form).await {
        Ok(()) => {
            save_draft(&session, &draft).await?;
            None
        }
        Err(message) => Some(message),
    };

    let rejected = error.is_some().then_some(&form);
    respond(&state, &session, &headers, &token, &draft, error, rejected).await
}

/// Clear the address selection.
#[instrument(skip(state, session, headers, token))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuthToken(token): RequireAuthToken,
) -> Result<Response, AppError> {
    let mut draft = load_draft(&state, &session).await?;

    let error = match ensure_editable(&state, &draft).and_then(|()| draft.clear_address()) {
        Ok(()) => {
            save_draft(&session, &draft).await?;
            None
        }
        Err(e) => Some(e.to_string()),
    };

    respond(&state, &session, &headers, &token, &draft, error, None).await
}

/// Validate `form`, add it to the address book and select the new entry;
/// returns a message for the buyer on failure.
async fn save_and_select(
    state: &AppState,
    token: &BearerToken,
    draft: &mut CheckoutDraft,
    form: &ManualAddressForm,
) -> Result<(), String> {
    let address = form.validate()?;
    ensure_editable(state, draft).map_err(|e| e.to_string())?;

    let saved = state
        .api()
        .create_address(token, &address)
        .await
        .map_err(|e| {
            if e.is_server_fault() {
                tracing::warn!("Failed to save address: {e}");
            }
            e.user_message()
        })?;
    tracing::info!(address_id = %saved.id, "Address saved to address book");

    ensure_editable(state, draft)
        .and_then(|()| draft.select_stored_address(saved.id))
        .map_err(|e| e.to_string())
}

/// Render the address widget (HTMX) or redirect back to the page.
async fn respond(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    token: &BearerToken,
    draft: &CheckoutDraft,
    error: Option<String>,
    rejected: Option<&ManualAddressForm>,
) -> Result<Response, AppError> {
    if !is_htmx(headers) {
        set_flash(
            session,
            &CheckoutFlash {
                address_error: error,
                ..CheckoutFlash::default()
            },
        )
        .await?;
        return Ok(Redirect::to("/checkout").into_response());
    }

    let book = state.api().list_addresses(token).await.map_err(|e| {
        tracing::warn!("Failed to load address book: {e}");
        super::ADDRESS_BOOK_UNAVAILABLE.to_string()
    });
    let mut widget = AddressWidget::new(book, &draft.address, error);
    if let Some(form) = rejected {
        widget.manual.recipient_name.clone_from(&form.recipient_name);
        widget.manual.phone.clone_from(&form.phone);
        widget.manual.full_address.clone_from(&form.full_address);
    }

    Ok((
        AppendHeaders([("HX-Trigger", CHECKOUT_UPDATED_EVENT)]),
        AddressFragmentTemplate {
            address: widget,
            summary: SummaryView::new(draft, state.config().checkout.shipping_fee),
            error: draft.last_error.clone(),
            submitting: is_submitting(state, draft),
            oob: true,
        },
    )
        .into_response())
}
