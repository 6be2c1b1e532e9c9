//! HTTP-level tests for the add-on log browser.

mod common;

use addonlog_core::context::LogContext;
use addonlog_core::permission::{permission_id_for_addon, VIEW_LOGS_PERMISSION};
use addonlog_db::models::addon::CreateAddon;
use addonlog_db::repositories::{AddonLogRepo, AddonRepo, AdminPermissionRepo};
use addonlog_logger::AddonLogger;
use axum::http::StatusCode;
use common::{body_json, create_admin, get, get_auth, post_auth, super_admin_token, token_for};
use sqlx::PgPool;

const BASE: &str = "/api/v1/admin/addon-logs";

async fn install(pool: &PgPool, addon_id: &str) {
    AddonRepo::create(
        pool,
        &CreateAddon {
            addon_id: addon_id.to_string(),
            title: addon_id.to_string(),
            version_string: None,
        },
    )
    .await
    .unwrap();
}

/// Install `addon_id` and register the permission guarding its logs.
async fn install_guarded(pool: &PgPool, addon_id: &str) {
    install(pool, addon_id).await;
    AdminPermissionRepo::register(pool, &permission_id_for_addon(addon_id), "Add-on logs")
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Access
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn requires_a_token(pool: PgPool) {
    let response = get(common::build_test_app(pool), BASE).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn requires_the_admin_role(pool: PgPool) {
    let token = token_for(1, "member");
    let response = get_auth(common::build_test_app(pool), BASE, &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "ADMIN_REQUIRED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn summaries_hide_guarded_addons_without_a_grant(pool: PgPool) {
    install_guarded(&pool, "Vendor/Secret").await;
    AddonLogger::for_addon(pool.clone(), "Vendor/Secret")
        .info("hidden", LogContext::new())
        .await
        .unwrap();
    AddonLogger::new(pool.clone())
        .info("open", LogContext::new())
        .await
        .unwrap();

    let (_, admin) = create_admin(&pool, "plain", false).await;
    let json = body_json(get_auth(common::build_test_app(pool.clone()), BASE, &admin).await).await;
    let ids: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["addon_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["XF"]);

    let root = super_admin_token(&pool).await;
    let json = body_json(get_auth(common::build_test_app(pool), BASE, &root).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn granted_admin_sees_guarded_addon(pool: PgPool) {
    install_guarded(&pool, "Vendor/Secret").await;
    AddonLogger::for_addon(pool.clone(), "Vendor/Secret")
        .notice("visible", LogContext::new())
        .await
        .unwrap();

    let (user_id, token) = create_admin(&pool, "granted", false).await;
    AdminPermissionRepo::grant(&pool, user_id, &permission_id_for_addon("Vendor/Secret"))
        .await
        .unwrap();

    let response = get_auth(
        common::build_test_app(pool),
        &format!("{BASE}/view?addon_id=Vendor/Secret"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["total"], 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn guarded_addon_view_is_forbidden(pool: PgPool) {
    install_guarded(&pool, "Vendor/Secret").await;
    let (_, token) = create_admin(&pool, "plain", false).await;

    let response = get_auth(
        common::build_test_app(pool),
        &format!("{BASE}/view?addon_id=Vendor/Secret"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["code"], "PERMISSION_DENIED");
    assert_eq!(json["permission"], "sylLib_vendor_secret");
    assert_eq!(json["addon_id"], "Vendor/Secret");
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn alerts_need_the_view_logs_permission(pool: PgPool) {
    AddonLogger::new(pool.clone())
        .error("boom", LogContext::new())
        .await
        .unwrap();
    let (user_id, token) = create_admin(&pool, "watcher", false).await;

    let response = get_auth(
        common::build_test_app(pool.clone()),
        &format!("{BASE}/alerts"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["permission"], VIEW_LOGS_PERMISSION);

    AdminPermissionRepo::grant(&pool, user_id, VIEW_LOGS_PERMISSION)
        .await
        .unwrap();
    let response = get_auth(common::build_test_app(pool), &format!("{BASE}/alerts"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["has_alerts"], true);
    assert_eq!(json["data"]["counts"]["error_count"], 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn no_alerts_without_high_priority_entries(pool: PgPool) {
    AddonLogger::new(pool.clone())
        .warning("meh", LogContext::new())
        .await
        .unwrap();
    let token = super_admin_token(&pool).await;

    let json = body_json(
        get_auth(common::build_test_app(pool), &format!("{BASE}/alerts"), &token).await,
    )
    .await;
    assert_eq!(json["data"]["has_alerts"], false);
    assert!(json["data"]["counts"].is_null());
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn view_filters_by_level_and_pages(pool: PgPool) {
    let logger = AddonLogger::new(pool.clone());
    logger.info("one", LogContext::new()).await.unwrap();
    logger.error("two", LogContext::new()).await.unwrap();
    logger.error("three", LogContext::new()).await.unwrap();
    let token = super_admin_token(&pool).await;

    let json = body_json(
        get_auth(
            common::build_test_app(pool.clone()),
            &format!("{BASE}/view?addon_id=XF&type=error&per_page=1"),
            &token,
        )
        .await,
    )
    .await;
    let data = &json["data"];
    assert_eq!(data["total"], 2);
    assert_eq!(data["per_page"], 1);
    assert_eq!(data["filters_applied"], true);
    assert_eq!(data["logs"].as_array().unwrap().len(), 1);
    assert_eq!(data["logs"][0]["message"], "three");
    assert_eq!(data["addon"]["title"], "Host platform");

    let types: Vec<&str> = data["filter_bits"]["types"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t.as_str().unwrap())
        .collect();
    assert!(types.contains(&"info"));
    assert!(types.contains(&"error"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn view_past_the_last_page_is_empty(pool: PgPool) {
    AddonLogger::new(pool.clone())
        .info("only", LogContext::new())
        .await
        .unwrap();
    let token = super_admin_token(&pool).await;

    let response = get_auth(
        common::build_test_app(pool),
        &format!("{BASE}/view?addon_id=XF&page={}&per_page=100", i64::MAX),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["total"], 1);
    assert_eq!(json["data"]["logs"].as_array().unwrap().len(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn view_without_addon_id_is_not_found(pool: PgPool) {
    let token = super_admin_token(&pool).await;
    let response = get_auth(common::build_test_app(pool), &format!("{BASE}/view"), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "ADDON_NOT_SELECTED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn view_rejects_a_malformed_date(pool: PgPool) {
    let token = super_admin_token(&pool).await;
    let response = get_auth(
        common::build_test_app(pool),
        &format!("{BASE}/view?addon_id=XF&start_date=yesterday"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Single entry and deletion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn show_formats_details(pool: PgPool) {
    let log = AddonLogger::new(pool.clone())
        .warning("slow {ms}", LogContext::new().with("ms", 900))
        .await
        .unwrap();
    let token = super_admin_token(&pool).await;

    let json = body_json(
        get_auth(
            common::build_test_app(pool),
            &format!("{BASE}/logs/{}", log.id),
            &token,
        )
        .await,
    )
    .await;
    assert_eq!(json["data"]["log"]["message"], "slow 900");
    assert_eq!(json["data"]["formatted_details"], "{\n  \"ms\": 900\n}");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_redirects_to_the_addon_view(pool: PgPool) {
    install(&pool, "Vendor/Addon").await;
    let log = AddonLogger::for_addon(pool.clone(), "Vendor/Addon")
        .info("bye", LogContext::new())
        .await
        .unwrap();
    let token = super_admin_token(&pool).await;
    let uri = format!("{BASE}/logs/{}/delete", log.id);

    let confirm = body_json(get_auth(common::build_test_app(pool.clone()), &uri, &token).await).await;
    assert_eq!(confirm["data"]["confirm_url"], uri);

    let response = post_auth(common::build_test_app(pool.clone()), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["deleted"], 1);
    assert_eq!(
        json["data"]["redirect"],
        "/api/v1/admin/addon-logs/view?addon_id=Vendor%2FAddon"
    );

    assert!(AddonLogRepo::find_by_id(&pool, log.id).await.unwrap().is_none());
    let response = post_auth(common::build_test_app(pool), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn clear_removes_only_that_addons_logs(pool: PgPool) {
    install(&pool, "Vendor/Addon").await;
    let vendor = AddonLogger::for_addon(pool.clone(), "Vendor/Addon");
    vendor.info("a", LogContext::new()).await.unwrap();
    vendor.info("b", LogContext::new()).await.unwrap();
    AddonLogger::new(pool.clone())
        .info("keep", LogContext::new())
        .await
        .unwrap();
    let token = super_admin_token(&pool).await;
    let uri = format!("{BASE}/clear?addon_id=Vendor%2FAddon");

    let confirm = body_json(get_auth(common::build_test_app(pool.clone()), &uri, &token).await).await;
    assert_eq!(confirm["data"]["log_count"], 2);
    assert_eq!(confirm["data"]["confirm_url"], uri);

    let json = body_json(post_auth(common::build_test_app(pool.clone()), &uri, &token).await).await;
    assert_eq!(json["data"]["deleted"], 2);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM addon_logs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 1);
}
