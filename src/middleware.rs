use crate::client_identity::client_id;
use crate::fixed_window::now_millis;
use crate::guard::{GateOutcome, Guard};
use crate::response::{insert_rate_limit_headers, rate_limited};
use crate::sanitize::loggable_query;
use axum::extract::{Query, Request, State};
use axum::http::header::{HeaderValue, SET_COOKIE};
use axum::http::Uri;
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;

/// Static assets the security middleware never touches.
const EXCLUDED_PREFIXES: &[&str] = &[
    "/_next/static",
    "/_next/image",
    "/favicon.ico",
    "/logo.svg",
    "/manifest.json",
];

const DEV_SESSION_COOKIE: &str = "dev-session=true; HttpOnly; SameSite=Strict; Max-Age=86400; Path=/";

pub fn is_excluded_path(path: &str) -> bool {
    EXCLUDED_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

/// Per-request gate: rate limit `/api/` paths and stamp security headers on
/// every response, including 429s.
pub async fn security_middleware(
    State(guard): State<Guard>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if is_excluded_path(&path) {
        return next.run(request).await;
    }

    let client = client_id(&request);
    let wants_dev_session = guard.environment().is_development()
        && path == "/"
        && query_flag(request.uri(), "dev");

    let mut response = match guard.evaluate(&path, &client).await {
        GateOutcome::Denied(decision) => rate_limited(&decision, now_millis()),
        GateOutcome::Allowed(decision) => {
            let mut response = next.run(request).await;
            if let Some(decision) = decision {
                insert_rate_limit_headers(response.headers_mut(), &decision);
            }
            response
        }
    };

    guard.headers().apply(response.headers_mut());
    if wants_dev_session {
        response
            .headers_mut()
            .append(SET_COOKIE, HeaderValue::from_static(DEV_SESSION_COOKIE));
    }

    response
}

/// Logging middleware for request/response tracking
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = loggable_query(&query_pairs(request.uri()));
    let client = client_id(&request);

    info!(
        target: "catalog_guard::middleware",
        method = %method,
        path = %path,
        query = %query,
        client_id = %client,
        "Incoming request"
    );

    let response = next.run(request).await;

    info!(
        target: "catalog_guard::middleware",
        method = %method,
        path = %path,
        status = %response.status(),
        "Request completed"
    );

    response
}

/// Percent-decoded query parameters in order; empty when the query is malformed.
fn query_pairs(uri: &Uri) -> Vec<(String, String)> {
    Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map(|Query(pairs)| pairs)
        .unwrap_or_default()
}

/// True when the first `name` parameter decodes to `true`.
fn query_flag(uri: &Uri, name: &str) -> bool {
    query_pairs(uri)
        .into_iter()
        .find(|(key, _)| key == name)
        .is_some_and(|(_, value)| value == "true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excluded_paths() {
        assert!(is_excluded_path("/_next/static/chunks/app.js"));
        assert!(is_excluded_path("/favicon.ico"));
        assert!(!is_excluded_path("/api/cars"));
        assert!(!is_excluded_path("/"));
    }

    fn uri(raw: &str) -> Uri {
        raw.parse().unwrap()
    }

    #[test]
    fn test_query_flag() {
        assert!(query_flag(&uri("/?dev=true"), "dev"));
        assert!(query_flag(&uri("/?page=1&dev=true"), "dev"));
        assert!(!query_flag(&uri("/?dev=false&dev=true"), "dev"));
        assert!(!query_flag(&uri("/?development=true"), "dev"));
        assert!(!query_flag(&uri("/"), "dev"));
    }

    #[test]
    fn test_query_flag_decodes_names_and_values() {
        assert!(query_flag(&uri("/?dev=tru%65"), "dev"));
        assert!(query_flag(&uri("/?d%65v=true"), "dev"));
    }

    #[test]
    fn test_logged_query_redacts_encoded_names() {
        let logged = loggable_query(&query_pairs(&uri("/api/cars?pass%77ord=hunter2&page=2")));
        assert_eq!(logged["password"], crate::sanitize::REDACTED);
        assert_eq!(logged["page"], "2");
    }
}
