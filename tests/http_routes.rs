//! End-to-end routing: auth middleware, role gate, correlation ids and audit records.
mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use common::*;
use serde_json::json;
use tower::ServiceExt;

const CORRELATION: &str = "x-correlation-id";

fn request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn correlation_of(res: &axum::response::Response) -> String {
    res.headers()
        .get(CORRELATION)
        .expect("correlation header")
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app(Reply::Ok);
    let res = app
        .router
        .oneshot(request(Method::GET, "/health", None))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key(CORRELATION));
    assert_eq!(read_json(res).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn missing_token_is_401_with_challenge_and_no_audit() {
    let app = test_app(Reply::Ok);
    let res = app
        .router
        .oneshot(request(Method::POST, "/admin/scan/scan-1/force-close", None))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let challenge = res
        .headers()
        .get(header::WWW_AUTHENTICATE)
        .expect("challenge")
        .to_str()
        .unwrap();
    assert!(challenge.starts_with("Bearer error=\"invalid_token\""));
    assert!(res.headers().contains_key(CORRELATION));
    assert!(app.audit.records().is_empty());
    assert!(app.controller.calls().is_empty());
}

#[tokio::test]
async fn wrong_audience_is_401_with_audience_reason() {
    let app = test_app(Reply::Ok);
    let mut c = claims("u1", json!(["ADMIN"]));
    c["aud"] = json!("another-api");

    let res = app
        .router
        .oneshot(request(Method::GET, "/admin/scan/scan-1", Some(&sign(&c))))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(res).await;
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("audience")
    );
}

#[tokio::test]
async fn valid_token_without_admin_role_is_403_and_not_audited() {
    let app = test_app(Reply::Ok);
    let token = sign(&claims("u2", json!([])));

    let res = app
        .router
        .oneshot(request(
            Method::POST,
            "/admin/scan/scan-1/force-close",
            Some(&token),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(app.audit.records().is_empty());
    assert!(app.controller.calls().is_empty());
}

#[tokio::test]
async fn support_role_cannot_force_close() {
    let app = test_app(Reply::Ok);
    let token = sign(&claims("u3", json!(["SUPPORT"])));

    let res = app
        .router
        .oneshot(request(
            Method::POST,
            "/admin/scan/scan-1/force-close",
            Some(&token),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_force_close_returns_scan_and_audits_attempt_then_success() {
    let app = test_app(Reply::Ok);

    let res = app
        .router
        .oneshot(request(
            Method::POST,
            "/admin/scan/scan-42/force-close",
            Some(&admin_token()),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let correlation_id = correlation_of(&res);
    let body = read_json(res).await;
    assert_eq!(body["scanId"], "scan-42");
    assert_eq!(body["status"], "CLOSED");

    assert_eq!(app.controller.calls(), vec!["force-close:scan-42"]);

    let records = app.audit.json_records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["status"], "ATTEMPT");
    assert_eq!(records[1]["status"], "SUCCESS");
    for record in &records {
        assert_eq!(record["action"], "FORCE_CLOSE_SCAN");
        assert_eq!(record["resourceId"], "scan-42");
        assert_eq!(record["userId"], "u1");
        assert_eq!(record["subject"], "u1@example.test");
        assert_eq!(record["roles"], json!(["ADMIN"]));
        assert_eq!(record["correlationId"], correlation_id.as_str());
    }
}

#[tokio::test]
async fn admin_get_scan_is_audited_as_get_scan() {
    let app = test_app(Reply::Ok);

    let res = app
        .router
        .oneshot(request(Method::GET, "/admin/scan/scan-5", Some(&admin_token())))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(read_json(res).await["status"], "RUNNING");

    let records = app.audit.json_records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r["action"] == "GET_SCAN"));
}

#[tokio::test]
async fn inbound_correlation_id_is_adopted() {
    let app = test_app(Reply::Ok);
    let mut req = request(
        Method::POST,
        "/admin/scan/scan-1/force-close",
        Some(&admin_token()),
    );
    req.headers_mut()
        .insert(CORRELATION, "abc-123".parse().unwrap());

    let res = app.router.oneshot(req).await.unwrap();

    assert_eq!(correlation_of(&res), "abc-123");
    let records = app.audit.json_records();
    assert!(records.iter().all(|r| r["correlationId"] == "abc-123"));
}

#[tokio::test]
async fn blank_inbound_correlation_id_is_replaced() {
    let app = test_app(Reply::Ok);
    let mut req = request(Method::GET, "/health", None);
    req.headers_mut().insert(CORRELATION, "   ".parse().unwrap());

    let res = app.router.oneshot(req).await.unwrap();

    let id = correlation_of(&res);
    assert!(!id.trim().is_empty());
    assert!(uuid::Uuid::parse_str(&id).is_ok());
}

#[tokio::test]
async fn consecutive_requests_get_distinct_ids() {
    let app = test_app(Reply::Ok);

    let first = app
        .router
        .clone()
        .oneshot(request(Method::GET, "/health", None))
        .await
        .unwrap();
    let second = app
        .router
        .oneshot(request(Method::GET, "/health", None))
        .await
        .unwrap();

    assert_ne!(correlation_of(&first), correlation_of(&second));
}

#[tokio::test]
async fn downstream_conflict_is_relayed_and_audited_as_failure() {
    let app = test_app(Reply::Status(409, "scan already closed"));

    let res = app
        .router
        .oneshot(request(
            Method::POST,
            "/admin/scan/scan-1/force-close",
            Some(&admin_token()),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = read_json(res).await;
    assert_eq!(
        body["error"]["message"],
        "ControllerApp error: scan already closed"
    );

    let statuses: Vec<_> = app
        .audit
        .json_records()
        .iter()
        .map(|r| r["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(statuses, vec!["ATTEMPT", "FAILURE"]);
}

#[tokio::test]
async fn downstream_timeout_is_504() {
    let app = test_app(Reply::Timeout);

    let res = app
        .router
        .oneshot(request(Method::GET, "/admin/scan/scan-1", Some(&admin_token())))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    let statuses: Vec<_> = app
        .audit
        .json_records()
        .iter()
        .map(|r| r["status"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(statuses, vec!["ATTEMPT", "FAILURE"]);
}

#[tokio::test]
async fn unknown_route_is_404_without_auth() {
    let app = test_app(Reply::Ok);
    let res = app
        .router
        .oneshot(request(Method::GET, "/admin/nope", None))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dot_segment_scan_ids_are_rejected_before_the_gated_call() {
    for uri in [
        "/admin/scan/%2E%2E/force-close",
        "/admin/scan/./force-close",
        "/admin/scan/%2e",
    ] {
        let app = test_app(Reply::Ok);
        let method = if uri.ends_with("force-close") {
            Method::POST
        } else {
            Method::GET
        };

        let res = app
            .router
            .oneshot(request(method, uri, Some(&admin_token())))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert!(res.headers().contains_key(CORRELATION));
        assert!(app.controller.calls().is_empty(), "{uri}");
        assert!(app.audit.records().is_empty(), "{uri}");
    }
}
