//! Bearer-token extraction from the auth cookie.
//!
//! The platform's login flow (outside this binary) stores the buyer's API
//! token in a cookie. Handlers that talk to the backend take a
//! [`RequireAuthToken`] so the token is an explicit per-request value rather
//! than ambient state.

use axum::{
    extract::{FromRef, FromRequestParts, OriginalUri},
    http::{
        HeaderMap, HeaderName, StatusCode,
        header::{ACCEPT, CONTENT_TYPE, COOKIE},
        request::Parts,
    },
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::cookie::Cookie;

use crate::api::BearerToken;
use crate::state::AppState;

/// Header HTMX sets on every request it makes.
const HX_REQUEST: &str = "hx-request";

/// Extractor that requires a bearer token in the auth cookie.
///
/// Without one, page requests are redirected to the login page (with a
/// `next` parameter pointing back), HTMX requests get an `HX-Redirect`, and
/// JSON requests get a bare 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAuthToken(token): RequireAuthToken) -> impl IntoResponse {
///     state.api().list_addresses(&token).await
/// }
/// ```
pub struct RequireAuthToken(pub BearerToken);

/// Error returned when the auth cookie is missing.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page (for page requests).
    RedirectToLogin(String),
    /// Ask HTMX to navigate to the login page.
    HtmxRedirect(String),
    /// Unauthorized response (for JSON requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(url) => Redirect::to(&url).into_response(),
            Self::HtmxRedirect(url) => {
                (StatusCode::UNAUTHORIZED, [("HX-Redirect", url)]).into_response()
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuthToken
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let backend = &state.config().backend;

        if let Some(token) = token_from_headers(&parts.headers, &backend.auth_cookie) {
            return Ok(Self(token));
        }

        // Nested routers see a stripped URI; send the buyer back to the full path.
        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.path(), |uri| uri.path());
        let login = login_redirect(&backend.login_url, path);
        if is_htmx(&parts.headers) {
            Err(AuthRejection::HtmxRedirect(login))
        } else if wants_json(&parts.headers) {
            Err(AuthRejection::Unauthorized)
        } else {
            Err(AuthRejection::RedirectToLogin(login))
        }
    }
}

/// Whether the request was made by HTMX.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get(HX_REQUEST)
        .is_some_and(|v| v.as_bytes() == b"true")
}

fn wants_json(headers: &HeaderMap) -> bool {
    let accepts = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"))
    };
    accepts(ACCEPT) || accepts(CONTENT_TYPE)
}

/// Find the bearer token among the request's cookies.
///
/// Tolerates a `Bearer ` prefix in the cookie value; empty values count as absent.
#[must_use]
pub fn token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<BearerToken> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| Cookie::split_parse(raw))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == cookie_name)
        .map(|cookie| {
            let value = cookie.value().trim();
            value.strip_prefix("Bearer ").unwrap_or(value).trim().to_string()
        })
        .filter(|token| !token.is_empty())
        .map(BearerToken::new)
}

/// Login URL with a `next` parameter pointing back at `path`.
fn login_redirect(login_url: &str, path: &str) -> String {
    let separator = if login_url.contains('?') { '&' } else { '?' };
    format!("{login_url}{separator}next={}", urlencoding::encode(path))
}
