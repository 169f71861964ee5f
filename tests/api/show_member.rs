use uuid::Uuid;

use crate::helpers::create_synced_member;
use crate::helpers::spawn_app;

#[tokio::test]
async fn show_returns_the_stored_record() {
    let app = spawn_app().await;
    let member = create_synced_member(&app).await;
    let member_id = member["member_id"].as_str().unwrap();

    let resp = app.get_member(member_id).await;
    assert_eq!(resp.status().as_u16(), 200);

    let shown: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(shown["email_address"], "ana@ana.com");
    assert_eq!(shown["mailchimp_id"], "mc-123");
    assert_eq!(shown["vip"], true);
    assert_eq!(shown["tags"], serde_json::json!(["campaign1", "campaign2"]));
    assert_eq!(shown["location"]["latitude"], "14.730300");

    // only the POST from the create; show never talks to MailChimp
    assert_eq!(app.mailchimp_server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_member_is_a_404_naming_the_id() {
    let app = spawn_app().await;
    let unknown = Uuid::new_v4();

    let resp = app.get_member(&unknown.to_string()).await;
    assert_eq!(resp.status().as_u16(), 404);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], format!("Member[{unknown}] not found"));
}
