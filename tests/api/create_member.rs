use uuid::Uuid;
use wiremock::matchers::header_exists;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::Mock;
use wiremock::ResponseTemplate;

use crate::helpers::member_body;
use crate::helpers::spawn_app;

#[tokio::test]
async fn create_stores_the_member_with_the_mailchimp_id() {
    let app = spawn_app().await;
    Mock::given(method("POST"))
        .and(path("/lists/d3ad5-list/members"))
        .and(header_exists("Authorization"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "mc-123"})),
        )
        .expect(1)
        .mount(&app.mailchimp_server)
        .await;

    let resp = app.post_member(member_body()).await;
    assert_eq!(resp.status().as_u16(), 200);

    let member: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(member["mailchimp_id"], "mc-123");
    assert_eq!(member["email_address"], "ana@ana.com");
    // the locally generated id is part of the caller-facing record
    Uuid::parse_str(member["member_id"].as_str().unwrap()).unwrap();

    // the stored row carries exactly the id MailChimp returned
    let (email, mailchimp_id): (String, Option<String>) =
        sqlx::query_as("SELECT email_address, mailchimp_id FROM members")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(email, "ana@ana.com");
    assert_eq!(mailchimp_id.as_deref(), Some("mc-123"));
}

#[tokio::test]
async fn failed_remote_create_leaves_an_orphan() {
    let app = spawn_app().await;
    Mock::given(method("POST"))
        .and(path("/lists/d3ad5-list/members"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.mailchimp_server)
        .await;

    let resp = app.post_member(member_body()).await;
    assert_eq!(resp.status().as_u16(), 502);

    // the local write is not rolled back; the row stays, unsynchronized
    let (member_id, mailchimp_id): (Uuid, Option<String>) =
        sqlx::query_as("SELECT member_id, mailchimp_id FROM members")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(mailchimp_id, None);

    // and it is visible through the API, NULL mailchimp_id included
    let resp = app.get_member(&member_id.to_string()).await;
    assert_eq!(resp.status().as_u16(), 200);
    let member: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(member["mailchimp_id"], serde_json::Value::Null);
}

#[tokio::test]
async fn invalid_input_reports_every_violated_field() {
    let app = spawn_app().await;

    let resp = app
        .post_member(serde_json::json!({"email_address": "not-an-email"}))
        .await;
    assert_eq!(resp.status().as_u16(), 400);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Invalid data given");
    let errors = body["errors"].as_object().unwrap();
    assert_eq!(
        errors.keys().collect::<Vec<_>>(),
        ["email_address", "email_type", "list_id", "timestamp_signup", "vip"],
    );

    // nothing was persisted and MailChimp was never called
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM members")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
    assert!(app.mailchimp_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_local_write_skips_the_remote_call() {
    let app = spawn_app().await;

    // sabotage the table so the INSERT fails
    sqlx::query("ALTER TABLE members DROP COLUMN email_address")
        .execute(&app.pool)
        .await
        .unwrap();

    let resp = app.post_member(member_body()).await;
    assert_eq!(resp.status().as_u16(), 500);

    assert!(app.mailchimp_server.received_requests().await.unwrap().is_empty());
}
