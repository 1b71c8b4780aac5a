//! Router-level tests for the checkout flow.
//!
//! The backend URL points at a closed port, so anything that reaches the
//! backend fails fast; these tests cover what the storefront decides on
//! its own. Flows that need backend answers live in `checkout_backend.rs`.

#![allow(clippy::unwrap_used)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use chopho_storefront::{app, config::StorefrontConfig, state::AppState};
use tower::ServiceExt;

const CLIENT_IP: &str = "203.0.113.10";

fn test_app() -> Router {
    let config = StorefrontConfig::from_lookup(|key| match key {
        "STOREFRONT_BASE_URL" => Some("http://localhost:3000".to_string()),
        "BACKEND_API_URL" => Some("http://127.0.0.1:9/api".to_string()),
        "BACKEND_TIMEOUT_SECS" => Some("2".to_string()),
        "CLIENT_IP_HEADER" => Some("x-forwarded-for".to_string()),
        _ => None,
    })
    .unwrap();
    app(AppState::new(config).unwrap())
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn header_value<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

/// `name=value` of the session cookie set on `response`.
fn session_cookie(response: &Response) -> String {
    header_value(response, "set-cookie")
        .and_then(|c| c.split(';').next())
        .unwrap()
        .to_string()
}

fn cart_request(body: &str, htmx: bool) -> Request<Body> {
    let mut builder = Request::post("/checkout/cart")
        .header(header::COOKIE, "token=abc")
        .header(header::CONTENT_TYPE, "application/json");
    if htmx {
        builder = builder.header("hx-request", "true");
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn form_request(uri: &str, cookie: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("hx-request", "true")
        .header("x-forwarded-for", CLIENT_IP)
        .body(Body::from(body.to_string()))
        .unwrap()
}

const TWO_SHIRTS: &str =
    r#"[{"id":1,"quantity":"2","product":{"id":5,"name":"Áo thun","price":100000}}]"#;

#[tokio::test]
async fn test_health() {
    let response = test_app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(header_value(&response, "x-request-id").is_some());
    assert_eq!(header_value(&response, "x-frame-options"), Some("DENY"));
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_backend() {
    let response = test_app()
        .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_checkout_requires_token() {
    let response = test_app()
        .oneshot(Request::get("/checkout").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        header_value(&response, "location"),
        Some("/login?next=%2Fcheckout")
    );
}

#[tokio::test]
async fn test_htmx_without_token_gets_hx_redirect() {
    let response = test_app()
        .oneshot(
            Request::post("/checkout/payment")
                .header("hx-request", "true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        header_value(&response, "hx-redirect"),
        Some("/login?next=%2Fcheckout%2Fpayment")
    );
}

#[tokio::test]
async fn test_cart_update_renders_summary() {
    let response = test_app()
        .oneshot(cart_request(TWO_SHIRTS, true))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, "hx-trigger"), Some("checkout-updated"));

    let body = body_text(response).await;
    assert!(body.contains("Áo thun"));
    assert!(body.contains("200.000 ₫"));
    // Subtotal plus the default 30.000 ₫ shipping.
    assert!(body.contains("230.000 ₫"));
    assert!(body.contains(r#"hx-swap-oob="true""#));
}

#[tokio::test]
async fn test_cart_coerces_missing_product() {
    let response = test_app()
        .oneshot(cart_request(r#"[{"quantity":0}]"#, true))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Sản phẩm"));
    assert!(body.contains("30.000 ₫"));
}

#[tokio::test]
async fn test_cart_without_htmx_redirects() {
    let response = test_app()
        .oneshot(cart_request(TWO_SHIRTS, false))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(header_value(&response, "location"), Some("/checkout"));
}

#[tokio::test]
async fn test_draft_persists_in_session() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(cart_request(TWO_SHIRTS, true))
        .await
        .unwrap();
    let cookie = format!("token=abc; {}", session_cookie(&response));

    let response = app
        .oneshot(
            Request::get("/checkout")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Áo thun"));
    assert!(body.contains("230.000 ₫"));
}

#[tokio::test]
async fn test_checkout_page_survives_backend_outage() {
    let response = test_app()
        .oneshot(
            Request::get("/checkout")
                .header(header::COOKIE, "token=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Không tải được sổ địa chỉ"));
    assert!(body.contains("Giỏ hàng trống"));
}

#[tokio::test]
async fn test_submit_empty_cart_is_refused() {
    let response = test_app()
        .oneshot(form_request("/checkout/submit", "token=abc", ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Giỏ hàng trống"));
}

#[tokio::test]
async fn test_submit_without_address_is_refused() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(cart_request(TWO_SHIRTS, true))
        .await
        .unwrap();
    let cookie = format!("token=abc; {}", session_cookie(&response));

    let response = app
        .oneshot(form_request("/checkout/submit", &cookie, "note=giao+gi%E1%BB%9D+h%C3%A0nh+ch%C3%ADnh"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        body_text(response)
            .await
            .contains("Vui lòng chọn địa chỉ giao hàng")
    );
}

#[tokio::test]
async fn test_payment_selection_updates_summary() {
    let response = test_app()
        .oneshot(form_request(
            "/checkout/payment",
            "token=abc",
            "payment_method=bank_transfer",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Chuyển khoản ngân hàng"));
}

#[tokio::test]
async fn test_malformed_voucher_is_reported_inline() {
    let response = test_app()
        .oneshot(form_request("/checkout/voucher", "token=abc", "code=%3C%3E"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Mã giảm giá không hợp lệ"));
    assert!(body.contains(r#"id="checkout-voucher""#));
}

#[tokio::test]
async fn test_invalid_manual_address_is_reported_inline() {
    let response = test_app()
        .oneshot(form_request(
            "/checkout/address/manual",
            "token=abc",
            "recipient_name=Ng%C3%B4+Lan&phone=123&full_address=9+L%C3%BD+Th%C6%B0%E1%BB%9Dng+Ki%E1%BB%87t",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Số điện thoại không hợp lệ"));
    // The rejected input is kept in the form.
    assert!(body.contains("Ngô Lan"));
}
