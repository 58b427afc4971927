//! E2E tests for the cron-triggered overdue check

mod common;

use common::{CRON_SECRET, RecordingMailer, TestServer, result_for};
use serde_json::{Value, json};

#[tokio::test]
async fn test_cron_requires_bearer_secret() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/api/cron/check-overdue"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = server
        .client
        .get(server.url("/api/cron/check-overdue"))
        .bearer_auth("not-the-secret")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_cron_accepts_get_and_post() {
    let server = TestServer::new().await;

    for method in [reqwest::Method::GET, reqwest::Method::POST] {
        let response = server
            .client
            .request(method, server.url("/api/cron/check-overdue"))
            .bearer_auth(CRON_SECRET)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let report: Value = response.json().await.unwrap();
        assert_eq!(report["success"], true);
        assert_eq!(report["total"], 0);
    }
}

#[tokio::test]
async fn test_cron_fails_when_secret_is_not_configured() {
    let server = TestServer::with(
        |config| config.auth.cron_secret = None,
        RecordingMailer::default(),
    )
    .await;

    let response = server.check_overdue().await;
    assert_eq!(response.status(), 500);
}

#[tokio::test]
async fn test_cron_fails_when_email_is_not_configured() {
    let server = TestServer::with(
        |_| {},
        RecordingMailer {
            unconfigured: true,
            ..Default::default()
        },
    )
    .await;
    server
        .create_washroom(json!({ "name": "Lobby", "alert_emails": ["ops@example.com"] }))
        .await;

    let response = server.check_overdue().await;
    assert_eq!(response.status(), 500);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
    assert!(server.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_overdue_check_reports_each_washroom() {
    let server = TestServer::new().await;

    let business = server
        .create_business(json!({
            "name": "Harbour Café",
            "alert_emails": ["owner@example.com", "OPS@example.com"]
        }))
        .await;

    let overdue = server
        .create_washroom(json!({
            "name": "Lobby",
            "business_id": business["id"],
            "alert_emails": ["ops@example.com"]
        }))
        .await;
    let clean = server
        .create_washroom(json!({ "name": "Staff room", "alert_emails": ["ops@example.com"] }))
        .await;
    let orphan = server.create_washroom(json!({ "name": "Basement" })).await;
    server
        .create_washroom(json!({ "name": "Closed wing", "alerts_enabled": false }))
        .await;

    server.log_cleaning(clean["id"].as_str().unwrap()).await;

    let response = server.check_overdue().await;
    assert_eq!(response.status(), 200);
    let report: Value = response.json().await.unwrap();

    assert_eq!(report["total"], 3);
    assert_eq!(report["alerts_sent"], 1);
    assert_eq!(report["failed"], 0);
    assert_eq!(report["skipped"], 2);

    let sent = result_for(&report, &overdue["id"]);
    assert_eq!(sent["status"], "alert_sent");
    assert_eq!(
        sent["recipients"],
        json!(["ops@example.com", "owner@example.com"])
    );
    assert_eq!(result_for(&report, &clean["id"])["status"], "not_overdue");
    assert_eq!(result_for(&report, &orphan["id"])["status"], "no_recipients");

    let emails = server.mailer.sent();
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].subject, "Cleaning overdue: Lobby at Harbour Café");
}

#[tokio::test]
async fn test_alert_is_not_resent_within_cooldown() {
    let server = TestServer::new().await;
    let washroom = server
        .create_washroom(json!({ "name": "Lobby", "alert_emails": ["ops@example.com"] }))
        .await;

    let first: Value = server.check_overdue().await.json().await.unwrap();
    assert_eq!(result_for(&first, &washroom["id"])["status"], "alert_sent");

    let second: Value = server.check_overdue().await.json().await.unwrap();
    assert_eq!(
        result_for(&second, &washroom["id"])["status"],
        "alert_recently_sent"
    );
    assert_eq!(second["alerts_sent"], 0);
    assert_eq!(server.mailer.sent().len(), 1);

    let stored: Value = server
        .api(
            reqwest::Method::GET,
            &format!("/api/washrooms/{}", washroom["id"].as_str().unwrap()),
        )
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(stored["last_alert_sent_at"].is_string());
    assert_eq!(stored["last_alert_status"], "alert_sent");
}

#[tokio::test]
async fn test_send_failure_is_retried_on_next_run() {
    let mailer = RecordingMailer::default();
    mailer.reject.lock().unwrap().push("bounce@example.com".to_string());
    let server = TestServer::with(|_| {}, mailer).await;

    let failing = server
        .create_washroom(json!({ "name": "Lobby", "alert_emails": ["bounce@example.com"] }))
        .await;
    let working = server
        .create_washroom(json!({ "name": "Staff room", "alert_emails": ["ops@example.com"] }))
        .await;

    let report: Value = server.check_overdue().await.json().await.unwrap();
    assert_eq!(report["failed"], 1);
    assert_eq!(report["alerts_sent"], 1);

    let failed = result_for(&report, &failing["id"]);
    assert_eq!(failed["status"], "send_failed");
    assert!(failed["error"].as_str().unwrap().contains("recipient rejected"));
    assert_eq!(result_for(&report, &working["id"])["status"], "alert_sent");

    // The failed washroom did not start a cooldown
    server.mailer.reject.lock().unwrap().clear();
    let retry: Value = server.check_overdue().await.json().await.unwrap();
    assert_eq!(result_for(&retry, &failing["id"])["status"], "alert_sent");
    assert_eq!(
        result_for(&retry, &working["id"])["status"],
        "alert_recently_sent"
    );
}

#[tokio::test]
async fn test_outside_business_hours_is_skipped() {
    let server = TestServer::new().await;

    // A one-hour window six hours away from now
    let opens = chrono::Utc::now() + chrono::Duration::hours(6);
    let start = opens.format("%H:%M").to_string();
    let end = (opens + chrono::Duration::hours(1))
        .format("%H:%M")
        .to_string();

    let washroom = server
        .create_washroom(json!({
            "name": "Lobby",
            "alert_emails": ["ops@example.com"],
            "business_hours_start": start,
            "business_hours_end": end
        }))
        .await;

    let report: Value = server.check_overdue().await.json().await.unwrap();
    assert_eq!(
        result_for(&report, &washroom["id"])["status"],
        "outside_business_hours"
    );
    assert!(server.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_overdue_preview_does_not_send() {
    let server = TestServer::new().await;
    let washroom = server
        .create_washroom(json!({ "name": "Lobby", "alert_emails": ["ops@example.com"] }))
        .await;

    let response = server
        .api(reqwest::Method::GET, "/api/alerts/overdue")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let statuses: Value = response.json().await.unwrap();
    let status = &statuses.as_array().unwrap()[0];
    assert_eq!(status["washroom_id"], washroom["id"]);
    assert_eq!(status["overdue"], true);
    assert!(status["skip_reason"].is_null());
    assert!(server.mailer.sent().is_empty());
}
