//! Integration tests for the health check endpoint and general HTTP behaviour,
//! including the admin gate in front of `/api/v1/admin`.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, get, send, token_for};
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn health_check_returns_ok_with_json(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["db_healthy"], true);
    assert_eq!(json["host_addon_installed"], true);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_route_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn response_contains_x_request_id_header(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/health").await;

    assert!(response.headers().contains_key("x-request-id"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn health_is_degraded_without_the_host_addon(pool: PgPool) {
    sqlx::query("DELETE FROM addons WHERE addon_id = 'XF'")
        .execute(&pool)
        .await
        .unwrap();

    let response = get(common::build_test_app(pool), "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["db_healthy"], true);
    assert_eq!(json["host_addon_installed"], false);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn every_admin_route_needs_an_admin_session(pool: PgPool) {
    let member = token_for(5, "member");
    let routes = [
        (Method::GET, "/api/v1/admin/addon-logs"),
        (Method::GET, "/api/v1/admin/addon-logs/view?addon_id=XF"),
        (Method::PUT, "/api/v1/admin/user-fields/colour/choices"),
        (Method::GET, "/api/v1/admin/jobs"),
        (Method::POST, "/api/v1/admin/jobs/1/cancel"),
        (Method::GET, "/api/v1/admin/webhooks/events"),
    ];

    for (method, uri) in routes {
        let app = common::build_test_app(pool.clone());
        let response = send(app, method.clone(), uri, Some("not-a-jwt"), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");

        let app = common::build_test_app(pool.clone());
        let response = send(app, method.clone(), uri, Some(member.as_str()), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{method} {uri}");
        assert_eq!(body_json(response).await["code"], "ADMIN_REQUIRED");
    }
}
