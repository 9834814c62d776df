use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use wallet_mock::{
    config::ServerConfig,
    server::{AppState, router},
    signature::{Message, SIGNATURE_FIELD, sign, verify},
};

const TOKEN: &str = "test_token";

fn app_with(config: ServerConfig) -> Router {
    router(AppState::from_config(&config).unwrap())
}

fn app() -> Router {
    app_with(ServerConfig::default())
}

fn signed_body(value: Value) -> Message {
    let Value::Object(mut message) = value else {
        panic!("request body must be an object")
    };
    sign(&mut message, TOKEN);
    message
}

async fn call(app: &Router, uri: &str, body: &Message) -> Message {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    match serde_json::from_slice::<Value>(&bytes).unwrap() {
        Value::Object(map) => map,
        other => panic!("unexpected response {other}"),
    }
}

fn transaction(amount: Value) -> Value {
    json!({
        "external_id": "1-en",
        "currency": "USD",
        "timestamp": 1700000000,
        "amount": amount,
    })
}

async fn current_balance(app: &Router) -> Value {
    let resp = call(app, "/balance", &signed_body(json!({"session_token": "abc123"}))).await;
    resp["balance"].clone()
}

#[tokio::test]
async fn balance_query_is_signed() {
    let app = app();
    let resp = call(&app, "/balance", &signed_body(json!({"session_token": "abc123"}))).await;
    assert_eq!(resp["error"], json!(0));
    assert_eq!(resp["balance"], json!(100.0));
    assert_eq!(resp["external_id"], json!("1-en"));
    assert_eq!(resp["session_token"], json!("abc123"));
    assert_eq!(resp["currency"], json!("USD"));
    assert_eq!(resp["lang"], json!("en"));
    assert_eq!(resp["username"], json!("player"));
    assert!(verify(&resp, TOKEN));
}

#[tokio::test]
async fn balance_errors() {
    let app = app();
    let resp = call(&app, "/balance", &signed_body(json!({"session_token": "zzz"}))).await;
    assert_eq!(resp["error"], json!(3));
    assert_eq!(resp["message"], json!("the player zzz was not found"));

    let resp = call(&app, "/balance", &signed_body(json!({}))).await;
    assert_eq!(resp["error"], json!(6));
    assert_eq!(resp["message"], json!("the field session_token is required"));
}

#[tokio::test]
async fn unsigned_requests_are_rejected_without_signature() {
    let app = app();
    let Value::Object(body) = json!({"session_token": "abc123"}) else {
        unreachable!()
    };
    let resp = call(&app, "/balance", &body).await;
    assert_eq!(resp["error"], json!(1));
    assert_eq!(resp["message"], json!("signature mismatch"));
    // error bodies go out unsigned unless configured otherwise
    assert!(!resp.contains_key(SIGNATURE_FIELD));
}

#[tokio::test]
async fn tampered_request_is_rejected() {
    let app = app();
    let mut body = signed_body(transaction(json!("50")));
    body.insert("amount".to_string(), json!("5000"));
    let resp = call(&app, "/credit", &body).await;
    assert_eq!(resp["error"], json!(1));
    assert_eq!(current_balance(&app).await, json!(100.0));
}

#[tokio::test]
async fn skip_sig_bypasses_the_gate() {
    let app = app();
    let Value::Object(body) = json!({"session_token": "abc123"}) else {
        unreachable!()
    };
    let resp = call(&app, "/balance?skipSig=1", &body).await;
    assert_eq!(resp["error"], json!(0));

    let resp = call(&app, "/balance?skipSig=", &body).await;
    assert_eq!(resp["error"], json!(1));

    let resp = call(&app, "/balance?skipSig=true", &Message::new()).await;
    assert_eq!(resp["error"], json!(6));
}

#[tokio::test]
async fn skip_sig_can_be_disabled() {
    let app = app_with(ServerConfig {
        allow_skip_sig: false,
        ..ServerConfig::default()
    });
    let Value::Object(body) = json!({"session_token": "abc123"}) else {
        unreachable!()
    };
    let resp = call(&app, "/balance?skipSig=1", &body).await;
    assert_eq!(resp["error"], json!(1));
}

#[tokio::test]
async fn error_responses_signed_when_configured() {
    let app = app_with(ServerConfig {
        sign_errors: true,
        ..ServerConfig::default()
    });
    let resp = call(&app, "/balance", &Message::new()).await;
    assert_eq!(resp["error"], json!(1));
    assert!(verify(&resp, TOKEN));
}

#[tokio::test]
async fn credit_adds_amount() {
    let app = app();
    let resp = call(&app, "/credit", &signed_body(transaction(json!("50")))).await;
    assert_eq!(resp["error"], json!(0));
    assert_eq!(resp["balance"], json!(150.0));
    assert_eq!(resp["currency"], json!("USD"));
    assert!(resp["transaction_id"].as_str().is_some_and(|id| id.len() == 36));
    assert!(verify(&resp, TOKEN));
}

#[tokio::test]
async fn debit_subtracts_amount() {
    let app = app();
    let resp = call(&app, "/debit", &signed_body(transaction(json!("50")))).await;
    assert_eq!(resp["error"], json!(0));
    assert_eq!(resp["balance"], json!(50.0));
    assert!(verify(&resp, TOKEN));
}

#[tokio::test]
async fn replays_apply_twice() {
    let app = app();
    let body = signed_body(transaction(json!(10)));
    call(&app, "/credit", &body).await;
    let resp = call(&app, "/credit", &body).await;
    assert_eq!(resp["balance"], json!(120.0));
}

#[tokio::test]
async fn refund_polarity() {
    let mut refund = transaction(json!(10));
    refund["transaction_id"] = json!("0abc");
    let resp = call(&app(), "/refund", &signed_body(refund.clone())).await;
    assert_eq!(resp["error"], json!(0));
    assert_eq!(resp["balance"], json!(90.0));

    refund["transaction_id"] = json!("5abc");
    let resp = call(&app(), "/refund", &signed_body(refund)).await;
    assert_eq!(resp["balance"], json!(110.0));
}

#[tokio::test]
async fn refund_requires_transaction_id() {
    let app = app();
    let resp = call(&app, "/refund", &signed_body(transaction(json!(10)))).await;
    assert_eq!(resp["error"], json!(6));
    assert_eq!(resp["message"], json!("the field transaction_id is required"));
}

#[tokio::test]
async fn currency_mismatch_leaves_balance_unchanged() {
    let app = app();
    let mut body = transaction(json!(10));
    body["currency"] = json!("EUR");
    for uri in ["/credit", "/debit"] {
        let resp = call(&app, uri, &signed_body(body.clone())).await;
        assert_eq!(resp["error"], json!(5));
        assert_eq!(
            resp["message"],
            json!("the currency EUR does not match with the player currency")
        );
    }
    assert_eq!(current_balance(&app).await, json!(100.0));
}

#[tokio::test]
async fn unknown_player() {
    let app = app();
    let mut body = transaction(json!(10));
    body["external_id"] = json!("2-en");
    let resp = call(&app, "/debit", &signed_body(body)).await;
    assert_eq!(resp["error"], json!(3));
    assert_eq!(resp["message"], json!("the player 2-en was not found"));
}

#[tokio::test]
async fn near_max_credit_twice_is_refused_without_panicking() {
    let app = app();
    let body = signed_body(transaction(json!("7e28")));
    let resp = call(&app, "/credit", &body).await;
    assert_eq!(resp["error"], json!(0));
    let after_first = resp["balance"].clone();

    let resp = call(&app, "/credit", &body).await;
    assert_eq!(resp["error"], json!(6));
    assert_eq!(resp["message"], json!("the field amount must be numeric"));
    assert_eq!(current_balance(&app).await, after_first);
}

#[tokio::test]
async fn non_json_content_type_reads_as_empty_body() {
    let app = app();
    let body = signed_body(json!({"session_token": "abc123"}));
    for uri in ["/balance", "/balance?skipSig=1"] {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "text/plain")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let resp: Value = serde_json::from_slice(&bytes).unwrap();
        let expected = if uri.contains("skipSig") { 6 } else { 1 };
        assert_eq!(resp["error"], json!(expected));
    }
}

#[tokio::test]
async fn only_post_is_routed() {
    let request = Request::builder()
        .method("GET")
        .uri("/balance")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_credit_and_debit_net_to_original_balance() {
    let app = app();
    let credit = signed_body(transaction(json!("2.5")));
    let debit = credit.clone();

    let mut tasks = Vec::new();
    for i in 0..200 {
        let app = app.clone();
        let (uri, body) = if i % 2 == 0 {
            ("/credit", credit.clone())
        } else {
            ("/debit", debit.clone())
        };
        tasks.push(tokio::spawn(async move {
            let resp = call(&app, uri, &body).await;
            assert_eq!(resp["error"], json!(0));
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(current_balance(&app).await, json!(100.0));
}
