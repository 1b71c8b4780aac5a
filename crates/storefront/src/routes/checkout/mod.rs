//! Checkout route handlers.
//!
//! The checkout page is a set of widgets (cart, address, voucher, payment)
//! that post their changes here. Each change updates the session-stored
//! [`CheckoutDraft`] and re-renders the order summary.
//!
//! HTMX requests get fragments back with an `HX-Trigger: checkout-updated`
//! header; plain form posts are redirected to `GET /checkout` with any
//! inline error carried in a one-shot flash.

pub mod address;
pub mod cart;
pub mod payment;
pub mod submit;
pub mod voucher;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use chopho_core::{
    AddressChoice, CartItem, CheckoutDraft, CheckoutError, ManualAddress, OrderId, PaymentMethod,
    Price, SavedAddress,
};
use rust_decimal::Decimal;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireAuthToken, is_htmx};
use crate::models::{CheckoutFlash, session_keys};
use crate::state::AppState;

/// Event HTMX listeners use to refresh anything that depends on the draft.
pub const CHECKOUT_UPDATED_EVENT: &str = "checkout-updated";

const ADDRESS_BOOK_UNAVAILABLE: &str = "Không tải được sổ địa chỉ, bạn có thể nhập địa chỉ mới";

// =============================================================================
// View Types
// =============================================================================

/// Cart line display data for templates.
#[derive(Clone)]
pub struct LineView {
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
    /// List price, only when the line is discounted.
    pub list_price: Option<String>,
    pub line_total: String,
}

impl From<&CartItem> for LineView {
    fn from(item: &CartItem) -> Self {
        Self {
            name: item.product.name.clone(),
            image: item.product.thumbnail().map(String::from),
            quantity: item.quantity,
            unit_price: format_vnd(item.unit_price()),
            list_price: item
                .is_on_sale()
                .then(|| format_vnd(item.list_price())),
            line_total: format_vnd(item.line_total()),
        }
    }
}

/// Order summary display data for templates.
#[derive(Clone)]
pub struct SummaryView {
    pub item_count: u32,
    pub subtotal: String,
    /// Formatted discount, only when non-zero.
    pub discount: Option<String>,
    pub shipping_fee: String,
    pub free_shipping: bool,
    pub total: String,
    pub voucher_code: Option<String>,
    pub voucher_eligible: bool,
    pub payment_label: &'static str,
    pub is_empty: bool,
}

impl SummaryView {
    #[must_use]
    pub fn new(draft: &CheckoutDraft, base_shipping_fee: Decimal) -> Self {
        let summary = draft.summary(base_shipping_fee);
        Self {
            item_count: summary.item_count,
            subtotal: format_vnd(summary.subtotal),
            discount: (!summary.discount.is_zero()).then(|| format_vnd(summary.discount)),
            shipping_fee: format_vnd(summary.shipping_fee),
            free_shipping: summary.free_shipping,
            total: format_vnd(summary.total),
            voucher_code: summary.voucher_code,
            voucher_eligible: summary.voucher_eligible,
            payment_label: draft.payment_method.label(),
            is_empty: draft.items.is_empty(),
        }
    }
}

/// Saved address option for the address widget.
#[derive(Clone)]
pub struct SavedAddressView {
    pub id: i32,
    pub recipient_name: String,
    pub phone: String,
    pub full_address: String,
    pub is_default: bool,
    pub selected: bool,
}

/// Manual address form values.
#[derive(Clone, Default)]
pub struct ManualAddressView {
    pub recipient_name: String,
    pub phone: String,
    pub full_address: String,
}

impl From<&ManualAddress> for ManualAddressView {
    fn from(address: &ManualAddress) -> Self {
        Self {
            recipient_name: address.recipient_name.clone(),
            phone: address.phone.clone(),
            full_address: address.full_address.clone(),
        }
    }
}

/// Address widget display data.
#[derive(Clone, Default)]
pub struct AddressWidget {
    pub saved: Vec<SavedAddressView>,
    /// Set when the address book could not be loaded.
    pub saved_error: Option<String>,
    pub manual: ManualAddressView,
    pub manual_selected: bool,
    /// Whether the draft has any address, saved or manual.
    pub has_selection: bool,
    pub error: Option<String>,
}

impl AddressWidget {
    /// Build the widget from the buyer's address book and the draft's choice.
    #[must_use]
    pub fn new(
        book: Result<Vec<SavedAddress>, String>,
        choice: &AddressChoice,
        error: Option<String>,
    ) -> Self {
        let selected = choice.stored_id();
        let (saved, saved_error) = match book {
            Ok(addresses) => (
                addresses
                    .into_iter()
                    .map(|a| SavedAddressView {
                        id: a.id.as_i32(),
                        selected: selected == Some(a.id),
                        recipient_name: a.recipient_name,
                        phone: a.phone,
                        full_address: a.full_address,
                        is_default: a.is_default,
                    })
                    .collect(),
                None,
            ),
            Err(message) => (Vec::new(), Some(message)),
        };

        Self {
            saved,
            saved_error,
            manual: choice.manual().map(ManualAddressView::from).unwrap_or_default(),
            manual_selected: choice.manual().is_some(),
            has_selection: choice.is_set(),
            error,
        }
    }
}

/// Applied voucher display data.
#[derive(Clone)]
pub struct AppliedVoucherView {
    pub code: String,
    pub discount: String,
    pub free_shipping: bool,
    pub eligible: bool,
}

/// Voucher widget display data.
#[derive(Clone, Default)]
pub struct VoucherWidget {
    pub applied: Option<AppliedVoucherView>,
    /// Text to keep in the input, e.g. a code that was just rejected.
    pub input: String,
    pub error: Option<String>,
}

impl VoucherWidget {
    #[must_use]
    pub fn new(draft: &CheckoutDraft, input: String, error: Option<String>) -> Self {
        let subtotal = draft.subtotal();
        Self {
            applied: draft.voucher.as_ref().map(|v| AppliedVoucherView {
                code: v.code.clone(),
                discount: format_vnd(v.discount_for(subtotal)),
                free_shipping: v.waives_shipping(subtotal),
                eligible: v.is_eligible(subtotal),
            }),
            input,
            error,
        }
    }
}

/// Payment method option for the payment widget.
#[derive(Clone)]
pub struct PaymentOptionView {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn payment_options(selected: PaymentMethod) -> Vec<PaymentOptionView> {
    PaymentMethod::ALL
        .iter()
        .map(|&method| PaymentOptionView {
            value: method.as_str(),
            label: method.label(),
            selected: method == selected,
        })
        .collect()
}

fn format_vnd(amount: Decimal) -> String {
    Price::vnd(amount).to_string()
}

// =============================================================================
// Templates
// =============================================================================

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutShowTemplate {
    pub lines: Vec<LineView>,
    pub summary: SummaryView,
    pub address: AddressWidget,
    pub voucher: VoucherWidget,
    pub payment_options: Vec<PaymentOptionView>,
    pub error: Option<String>,
    pub submitting: bool,
    pub oob: bool,
}

/// Order summary fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/checkout_summary.html")]
pub struct SummaryFragmentTemplate {
    pub summary: SummaryView,
    pub error: Option<String>,
    pub submitting: bool,
    pub oob: bool,
}

/// Cart lines fragment template (for HTMX), with the summary swapped out-of-band.
#[derive(Template, WebTemplate)]
#[template(path = "partials/checkout_lines.html")]
pub struct LinesFragmentTemplate {
    pub lines: Vec<LineView>,
    pub summary: SummaryView,
    pub error: Option<String>,
    pub submitting: bool,
    pub oob: bool,
}

/// Address widget fragment template (for HTMX), with the summary swapped out-of-band.
#[derive(Template, WebTemplate)]
#[template(path = "partials/address.html")]
pub struct AddressFragmentTemplate {
    pub address: AddressWidget,
    pub summary: SummaryView,
    pub error: Option<String>,
    pub submitting: bool,
    pub oob: bool,
}

/// Voucher widget fragment template (for HTMX), with the summary swapped out-of-band.
#[derive(Template, WebTemplate)]
#[template(path = "partials/voucher.html")]
pub struct VoucherFragmentTemplate {
    pub voucher: VoucherWidget,
    pub summary: SummaryView,
    pub error: Option<String>,
    pub submitting: bool,
    pub oob: bool,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// The session's draft, or the order it already became.
pub(crate) enum StoredDraft {
    Open(CheckoutDraft),
    Placed(OrderId),
}

/// Load the session's draft, starting a fresh one if there is none.
///
/// A request that loaded the draft before its order was placed can write it
/// back after the submission removed it. Such a draft is dropped from the
/// session and reported as [`StoredDraft::Placed`].
pub(crate) async fn load_stored_draft(
    state: &AppState,
    session: &Session,
) -> Result<StoredDraft, AppError> {
    let Some(draft) = session
        .get::<CheckoutDraft>(session_keys::CHECKOUT_DRAFT)
        .await?
    else {
        return Ok(StoredDraft::Open(CheckoutDraft::new()));
    };

    if let Some(order_id) = state.submissions().placed_order(draft.id).await {
        tracing::info!(draft_id = %draft.id, %order_id, "Discarding draft of a placed order");
        clear_draft(session).await?;
        return Ok(StoredDraft::Placed(order_id));
    }
    Ok(StoredDraft::Open(draft))
}

/// Load the buyer's open draft, starting a fresh one if there is none or
/// the stored one was already placed.
pub(crate) async fn load_draft(
    state: &AppState,
    session: &Session,
) -> Result<CheckoutDraft, AppError> {
    match load_stored_draft(state, session).await? {
        StoredDraft::Open(draft) => Ok(draft),
        StoredDraft::Placed(_) => Ok(CheckoutDraft::new()),
    }
}

/// Refuse widget edits while the draft's order is being submitted.
pub(crate) fn ensure_editable(
    state: &AppState,
    draft: &CheckoutDraft,
) -> Result<(), CheckoutError> {
    if is_submitting(state, draft) {
        return Err(CheckoutError::AlreadySubmitting);
    }
    Ok(())
}

pub(crate) async fn save_draft(session: &Session, draft: &CheckoutDraft) -> Result<(), AppError> {
    session.insert(session_keys::CHECKOUT_DRAFT, draft).await?;
    Ok(())
}

pub(crate) async fn clear_draft(session: &Session) -> Result<(), AppError> {
    session.remove_value(session_keys::CHECKOUT_DRAFT).await?;
    Ok(())
}

async fn take_flash(session: &Session) -> CheckoutFlash {
    match session
        .remove::<CheckoutFlash>(session_keys::CHECKOUT_FLASH)
        .await
    {
        Ok(flash) => flash.unwrap_or_default(),
        Err(e) => {
            tracing::warn!("Failed to read checkout flash: {e}");
            CheckoutFlash::default()
        }
    }
}

pub(crate) async fn set_flash(session: &Session, flash: &CheckoutFlash) -> Result<(), AppError> {
    if !flash.is_empty() {
        session.insert(session_keys::CHECKOUT_FLASH, flash).await?;
    }
    Ok(())
}

// =============================================================================
// Response Helpers
// =============================================================================

/// Whether a submission for this draft is running right now.
pub(crate) fn is_submitting(state: &AppState, draft: &CheckoutDraft) -> bool {
    draft.is_submitting() || state.submissions().is_in_flight(draft.id)
}

/// Error to show above the summary: a fresh one, else the draft's last failure.
fn page_error(draft: &CheckoutDraft, error: Option<String>) -> Option<String> {
    error.or_else(|| draft.last_error.clone())
}

/// Respond to a widget post that only affects the summary.
///
/// HTMX gets the summary fragment; plain forms are redirected back to the
/// checkout page with `flash` kept for the next render.
pub(crate) async fn widget_response(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    draft: &CheckoutDraft,
    flash: CheckoutFlash,
) -> Result<Response, AppError> {
    if !is_htmx(headers) {
        set_flash(session, &flash).await?;
        return Ok(Redirect::to("/checkout").into_response());
    }

    let error = flash.error.or(flash.address_error).or(flash.voucher_error);
    Ok((
        AppendHeaders([("HX-Trigger", CHECKOUT_UPDATED_EVENT)]),
        SummaryFragmentTemplate {
            summary: SummaryView::new(draft, state.config().checkout.shipping_fee),
            error: page_error(draft, error),
            submitting: is_submitting(state, draft),
            oob: false,
        },
    )
        .into_response())
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the checkout page.
///
/// The address book is fetched from the backend; if that fails the page
/// still renders and the buyer can enter an address manually.
#[instrument(skip(state, session, token))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuthToken(token): RequireAuthToken,
) -> Result<impl IntoResponse, AppError> {
    let draft = load_draft(&state, &session).await?;
    let flash = take_flash(&session).await;

    let book = match state.api().list_addresses(&token).await {
        Ok(addresses) => Ok(addresses),
        Err(e) => {
            tracing::warn!("Failed to load address book: {e}");
            Err(ADDRESS_BOOK_UNAVAILABLE.to_string())
        }
    };

    let shipping_fee = state.config().checkout.shipping_fee;
    Ok(CheckoutShowTemplate {
        lines: draft.items.iter().map(LineView::from).collect(),
        summary: SummaryView::new(&draft, shipping_fee),
        address: AddressWidget::new(book, &draft.address, flash.address_error),
        voucher: VoucherWidget::new(&draft, String::new(), flash.voucher_error),
        payment_options: payment_options(draft.payment_method),
        error: page_error(&draft, flash.error),
        submitting: is_submitting(&state, &draft),
        oob: false,
    })
}
