//! HTTP API through the full router.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use serde_json::{Value, json};
use storeloom::server;
use storeloom_integration_tests::{
    FakeGenerator, FakeIdentity, TestApp, completed_checkout, sign_webhook,
};
use tower::ServiceExt;

fn router(app: &TestApp) -> Router {
    server::app(app.state.clone())
}

fn get(uri: &str, account: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(account) = account {
        builder = builder.header(
            header::AUTHORIZATION,
            format!("Bearer {}", FakeIdentity::token_for(account)),
        );
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, account: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(account) = account {
        builder = builder.header(
            header::AUTHORIZATION,
            format!("Bearer {}", FakeIdentity::token_for(account)),
        );
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn webhook(payload: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/billing/webhook")
        .header("Stripe-Signature", signature)
        .body(Body::from(payload.to_string()))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

#[tokio::test]
async fn test_health_needs_no_token() {
    let app = TestApp::new();
    let (status, _) = send(&router(&app), get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_api_requires_bearer_token() {
    let app = TestApp::new();
    let router = router(&app);

    let (status, body) = send(&router, get("/api/credits", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["surface"], "inline");

    let mut request = get("/api/credits", None);
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer forged".parse().unwrap());
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sign_in_then_me() {
    let app = TestApp::new();
    let router = router(&app);

    let (status, body) = send(
        &router,
        post_json(
            "/auth/sign-in",
            None,
            &json!({"email": "dana@example.test", "password": "correct horse"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["id_token"].as_str().unwrap().to_string();

    let mut request = get("/api/me", None);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    let (status, me) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["account_id"], "dana");

    let (status, body) = send(
        &router,
        post_json(
            "/auth/sign-in",
            None,
            &json!({"email": "dana@example.test", "password": "guess"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["field"], "credentials");

    let (status, _) = send(
        &router,
        post_json("/auth/sign-in", None, &json!({"email": "dana", "password": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_first_balance_read_grants_default() {
    let app = TestApp::new();
    let (status, body) = send(&router(&app), get("/api/credits", Some("alice"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"account_id": "alice", "credits": 100}));
}

#[tokio::test]
async fn test_assist_charges_on_success() {
    let app = TestApp::new();
    let (status, body) = send(
        &router(&app),
        post_json(
            "/api/assist",
            Some("alice"),
            &json!({"action": "store_name", "context": "hand-thrown pottery"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"kind": "store_name", "name": "Kiln & Co"}));
    assert_eq!(app.balance("alice"), Some(99));
}

#[tokio::test]
async fn test_assist_without_credits_is_402_upsell() {
    let app = TestApp::new();
    app.set_balance("alice", 2).await;

    let (status, body) = send(
        &router(&app),
        post_json(
            "/api/assist",
            Some("alice"),
            &json!({"action": "products", "context": "pottery", "count": 3}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["surface"], "upsell_dialog");
    assert_eq!(
        body["message"],
        "This needs 10 credits and you have 2. Buy more credits to continue."
    );
    assert_eq!(app.generator.calls(), 0);
}

#[tokio::test]
async fn test_generation_failure_is_502_toast() {
    let app = TestApp::with_generator(FakeGenerator::failing_text());

    let (status, body) = send(
        &router(&app),
        post_json(
            "/api/assist",
            Some("alice"),
            &json!({"action": "store_name", "context": "pottery"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["surface"], "toast");
    assert_eq!(app.balance("alice"), Some(100));
}

#[tokio::test]
async fn test_progress_banner_is_empty_when_idle() {
    let app = TestApp::new();
    let (status, body) = send(
        &router(&app),
        get("/api/generation/progress", Some("alice")),
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_create_and_fetch_store() {
    let app = TestApp::new();
    let router = router(&app);
    let payload = json!({
        "name": "Clay Days",
        "style_prompt": "sunlit studio",
        "products": [
            {"id": "7d4c0f5e-3f1e-4a77-9d2b-0b8e4f1c2a10", "name": "Cup", "price": "12.00"}
        ]
    });

    let (status, store) = send(&router, post_json("/api/stores", Some("alice"), &payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(store["name"], "Clay Days");
    assert_eq!(app.balance("alice"), Some(75));

    let id = store["id"].as_str().unwrap();
    let (status, fetched) = send(&router, get(&format!("/api/stores/{id}"), Some("alice"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], store["id"]);

    let (status, _) = send(&router, get(&format!("/api/stores/{id}"), Some("mallory"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = send(&router, get("/api/stores", Some("alice"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_store_payload_is_422_inline() {
    let app = TestApp::new();
    let (status, body) = send(
        &router(&app),
        post_json("/api/stores", Some("alice"), &json!({"name": "   "})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["surface"], "inline");
    assert_eq!(body["field"], "name");
    assert_eq!(app.balance("alice"), None);
}

#[tokio::test]
async fn test_checkout_redirect() {
    let app = TestApp::new();
    let (status, body) = send(
        &router(&app),
        post_json(
            "/api/billing/checkout",
            Some("alice"),
            &json!({
                "price_id": "price_credits_100",
                "success_url": "https://app.test/billing/done",
                "cancel_url": "https://app.test/billing"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "https://billing.test/checkout/alice");
    assert_eq!(app.billing.requests().len(), 1);
}

#[tokio::test]
async fn test_webhook_grants_credits_once() {
    let app = TestApp::new();
    let router = router(&app);
    let payload = completed_checkout("evt_1", "alice", 50);
    let signature = sign_webhook(&payload, Utc::now().timestamp());

    let (status, ack) = send(&router, webhook(&payload, &signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "credits_granted");
    assert_eq!(app.balance("alice"), Some(150));

    let (status, ack) = send(&router, webhook(&payload, &signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["outcome"], "duplicate");
    assert_eq!(app.balance("alice"), Some(150));
}

#[tokio::test]
async fn test_webhook_rejects_bad_signatures() {
    let app = TestApp::new();
    let router = router(&app);
    let payload = completed_checkout("evt_2", "alice", 50);

    let tampered = completed_checkout("evt_2", "alice", 5000);
    let signature = sign_webhook(&payload, Utc::now().timestamp());
    let (status, _) = send(&router, webhook(&tampered, &signature)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let stale = sign_webhook(&payload, Utc::now().timestamp() - 3600);
    let (status, _) = send(&router, webhook(&payload, &stale)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unsigned = Request::builder()
        .method("POST")
        .uri("/api/billing/webhook")
        .body(Body::from(payload))
        .unwrap();
    let (status, _) = send(&router, unsigned).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.balance("alice"), None);
}

#[tokio::test]
async fn test_feed_upvote_and_comment_notify_author() {
    let app = TestApp::new();
    let router = router(&app);

    let (status, post) = send(
        &router,
        post_json(
            "/api/feed/posts",
            Some("alice"),
            &json!({"text": "First kiln firing!"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post["upvote_count"], 0);
    let id = post["id"].as_str().unwrap().to_string();

    let (status, upvote) = send(
        &router,
        post_json(&format!("/api/feed/posts/{id}/upvote"), Some("bob"), &json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(upvote, json!({"upvoted": true, "count": 1}));

    let (status, _) = send(
        &router,
        post_json(
            &format!("/api/feed/posts/{id}/comments"),
            Some("bob"),
            &json!({"text": "Lovely glaze"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, shown) = send(&router, get(&format!("/api/feed/posts/{id}"), Some("bob"))).await;
    assert_eq!(shown["upvotes"], 1);
    assert_eq!(shown["post"]["upvote_count"], 1);
    assert_eq!(shown["comments"].as_array().unwrap().len(), 1);

    let (_, inbox) = send(&router, get("/api/notifications", Some("alice"))).await;
    assert_eq!(inbox["unread"], 2);

    let (_, marked) = send(
        &router,
        post_json("/api/notifications/read", Some("alice"), &json!({})),
    )
    .await;
    assert_eq!(marked["marked"], 2);

    let (status, _) = send(&router, get("/api/feed/posts/missing", Some("alice"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
