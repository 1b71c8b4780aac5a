//! Order confirmation page.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use chopho_core::{OrderId, Price};
use tracing::instrument;

use crate::api::{ApiError, OrderDetail};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuthToken;
use crate::state::AppState;

/// Order display data for the confirmation page.
#[derive(Clone)]
pub struct OrderView {
    pub id: i32,
    /// Human-facing order code, falling back to the numeric id.
    pub reference: String,
    pub total: Option<String>,
    pub status: Option<String>,
    pub payment_label: Option<&'static str>,
    pub recipient_name: Option<String>,
    pub full_address: Option<String>,
}

impl OrderView {
    /// Minimal view used when the order details cannot be fetched.
    #[must_use]
    pub fn id_only(id: OrderId) -> Self {
        Self {
            id: id.as_i32(),
            reference: format!("#{id}"),
            total: None,
            status: None,
            payment_label: None,
            recipient_name: None,
            full_address: None,
        }
    }
}

impl From<OrderDetail> for OrderView {
    fn from(order: OrderDetail) -> Self {
        Self {
            id: order.id.as_i32(),
            reference: order.code.unwrap_or_else(|| format!("#{}", order.id)),
            total: Some(Price::vnd(order.total).to_string()),
            status: order.status,
            payment_label: order.payment_method.map(|m| m.label()),
            recipient_name: order.recipient_name,
            full_address: order.full_address,
        }
    }
}

/// Order confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/confirmation.html")]
pub struct ConfirmationTemplate {
    pub order: OrderView,
}

/// Show the confirmation for a just-placed order.
///
/// A backend hiccup still shows the confirmation with the order id; only a
/// missing (or someone else's) order is a 404.
#[instrument(skip(state, token))]
pub async fn confirmation(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    RequireAuthToken(token): RequireAuthToken,
) -> Result<ConfirmationTemplate, AppError> {
    let id = OrderId::new(id);
    let order = match state.api().get_order(&token, id).await {
        Ok(order) => OrderView::from(order),
        Err(ApiError::NotFound(_)) => {
            return Err(AppError::NotFound(format!("order {id}")));
        }
        Err(e) => {
            tracing::warn!(order_id = %id, "Failed to load order details: {e}");
            OrderView::id_only(id)
        }
    };

    Ok(ConfirmationTemplate { order })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chopho_core::PaymentMethod;
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_view_from_detail() {
        let detail: OrderDetail = serde_json::from_str(
            r#"{"id":42,"code":"CP-0042","total":"212500","payment_method":"cod"}"#,
        )
        .unwrap();
        let view = OrderView::from(detail);

        assert_eq!(view.reference, "CP-0042");
        assert_eq!(view.total.as_deref(), Some("212.500 ₫"));
        assert_eq!(view.payment_label, Some(PaymentMethod::CashOnDelivery.label()));
    }

    #[test]
    fn test_view_without_code_uses_id() {
        let view = OrderView::from(OrderDetail {
            id: OrderId::new(7),
            code: None,
            total: Decimal::from(50_000),
            status: None,
            payment_method: None,
            recipient_name: None,
            full_address: None,
        });
        assert_eq!(view.reference, "#7");
        assert_eq!(OrderView::id_only(OrderId::new(7)).reference, "#7");
    }
}
