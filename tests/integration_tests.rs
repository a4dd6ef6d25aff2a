use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use catalog_guard::config::Environment;
use catalog_guard::rate_limiter::RateLimiter;
use catalog_guard::route_policy::{RouteLimit, RoutePolicy};
use catalog_guard::{create_app, Guard};
use http_body_util::BodyExt;
use std::time::Duration;
use tokio_test::assert_ok;
use tower::ServiceExt;

const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("permissions-policy", "camera=(), microphone=(), geolocation=()"),
];

fn app(environment: Environment, rate_limiting: bool) -> Router {
    let policy = RoutePolicy::default();
    let guard = Guard::new(
        RateLimiter::in_memory(500, policy.window),
        policy,
        environment,
        rate_limiting,
    );
    create_app(guard)
}

fn get(uri: &str, forwarded_for: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(ip) = forwarded_for {
        builder = builder.header("x-forwarded-for", ip);
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn assert_security_headers(response: &axum::response::Response) {
    for (name, value) in SECURITY_HEADERS {
        assert_eq!(
            response.headers().get(*name).map(|v| v.to_str().unwrap()),
            Some(*value),
            "missing or wrong {}",
            name
        );
    }
    assert!(response.headers().contains_key("content-security-policy"));
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = app(Environment::Production, true);
    let response = app.oneshot(get("/api/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_security_headers(&response);
    assert_eq!(
        response.headers().get("strict-transport-security").unwrap(),
        "max-age=31536000; includeSubDomains"
    );
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "no-cache, no-store, must-revalidate"
    );

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["environment"], "production");
    assert_eq!(body["store"]["backend"], "memory");
}

#[tokio::test]
async fn test_rate_limit_exceeded() {
    let app = app(Environment::Production, true);

    for i in 0..5 {
        let response = app
            .clone()
            .oneshot(get("/api/auth/session", Some("203.0.113.5, 10.0.0.1")))
            .await
            .unwrap();
        // No auth handler is mounted; the request still passes the gate.
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_security_headers(&response);
        assert_eq!(response.headers().get("x-ratelimit-limit").unwrap(), "5");
        assert_eq!(
            response.headers().get("x-ratelimit-remaining").unwrap(),
            &(4 - i).to_string()
        );
    }

    let response = app
        .clone()
        .oneshot(get("/api/auth/session", Some("203.0.113.5")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_security_headers(&response);
    assert!(response.headers().contains_key("strict-transport-security"));

    let retry_after: u64 = response
        .headers()
        .get("retry-after")
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));

    let body = json_body(response).await;
    assert_eq!(body, serde_json::json!({ "error": "Rate limit exceeded" }));
}

#[tokio::test]
async fn test_clients_are_limited_independently() {
    let app = app(Environment::Production, true);

    for _ in 0..5 {
        app.clone()
            .oneshot(get("/api/auth", Some("198.51.100.1")))
            .await
            .unwrap();
    }
    let blocked = app
        .clone()
        .oneshot(get("/api/auth", Some("198.51.100.1")))
        .await
        .unwrap();
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);

    let other = app
        .clone()
        .oneshot(get("/api/auth", Some("198.51.100.2")))
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::NOT_FOUND);

    // Without any origin information every request shares one bucket.
    let unknown = app.oneshot(get("/api/auth", None)).await.unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_api_paths_are_not_limited() {
    let policy = RoutePolicy::new(vec![RouteLimit::new("/api/cars", 1)], 1, Duration::from_secs(60));
    let guard = Guard::new(
        RateLimiter::in_memory(500, policy.window),
        policy,
        Environment::Production,
        true,
    );
    let app = create_app(guard);

    for _ in 0..3 {
        let response = app.clone().oneshot(get("/cars", Some("192.0.2.1"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_security_headers(&response);
        assert!(response.headers().get("x-ratelimit-limit").is_none());
    }
}

#[tokio::test]
async fn test_development_skips_limiting_and_hsts() {
    let app = app(Environment::Development, false);

    for _ in 0..10 {
        let response = app.clone().oneshot(get("/api/auth", Some("192.0.2.9"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_security_headers(&response);
        assert!(response.headers().get("strict-transport-security").is_none());
    }
}

#[tokio::test]
async fn test_dev_session_cookie() {
    let app = app(Environment::Development, false);

    let response = app.clone().oneshot(get("/?dev=true", None)).await.unwrap();
    let cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap();
    assert!(cookie.starts_with("dev-session=true"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));

    let response = app.clone().oneshot(get("/?dev=tru%65", None)).await.unwrap();
    assert!(response.headers().contains_key("set-cookie"));

    let response = app.oneshot(get("/?dev=false", None)).await.unwrap();
    assert!(response.headers().get("set-cookie").is_none());

    let production = self::app(Environment::Production, true);
    let response = production.oneshot(get("/?dev=true", None)).await.unwrap();
    assert!(response.headers().get("set-cookie").is_none());
}

#[tokio::test]
async fn test_static_assets_are_untouched() {
    let app = app(Environment::Production, true);
    let response = app.oneshot(get("/favicon.ico", None)).await.unwrap();

    assert!(response.headers().get("x-frame-options").is_none());
}

#[tokio::test]
async fn test_rate_limit_status_endpoint() {
    let app = app(Environment::Production, true);

    for _ in 0..3 {
        app.clone()
            .oneshot(get("/api/cars", Some("192.0.2.44")))
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(get("/api/rate-limit?path=/api/cars", Some("192.0.2.44")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["client_id"], "192.0.2.44");
    assert_eq!(body["limit"], 30);
    // Three car requests plus the status request itself.
    assert_eq!(body["remaining"], 26);
    assert!(body["reset_at"].is_u64());

    let response = app
        .oneshot(get("/api/rate-limit?path=cars", Some("192.0.2.44")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_policy_file_round_trip() {
    let path = std::env::temp_dir().join(format!("catalog-guard-policy-{}.json", std::process::id()));
    assert_ok!(std::fs::write(
        &path,
        r#"{"window": "1m", "default_limit": 7, "routes": [{"prefix": "/api/lists", "limit": 2}]}"#,
    ));

    let policy = assert_ok!(RoutePolicy::from_json_file(&path));
    assert_eq!(policy.limit_for("/api/lists/9"), 2);
    assert_eq!(policy.limit_for("/api/cars"), 7);
    assert_eq!(policy.window, Duration::from_secs(60));

    std::fs::remove_file(&path).ok();
    assert!(RoutePolicy::from_json_file(&path).is_err());
}
