use once_cell::sync::Lazy;
use sqlx::Connection;
use sqlx::Executor;
use sqlx::PgConnection;
use sqlx::PgPool;
use uuid::Uuid;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

use mailchimp_members::configuration::get_configuration;
use mailchimp_members::configuration::DatabaseSettings;
use mailchimp_members::startup::get_connection_pool;
use mailchimp_members::startup::Application;
use mailchimp_members::telemetry::get_subscriber;
use mailchimp_members::telemetry::init_subscriber;

/// Init the tracing subscriber once for the whole binary.
///
/// To opt in to verbose logging, use the env var `TEST_LOG`:
///
/// ```sh
///      TEST_LOG=true cargo test [test_name] | bunyan
/// ```
static TRACING: Lazy<()> = Lazy::new(|| {
    match std::env::var("TEST_LOG") {
        Ok(_) => {
            let subscriber = get_subscriber("test", "debug", std::io::stdout);
            init_subscriber(subscriber);
        }
        Err(_) => {
            let subscriber = get_subscriber("test", "debug", std::io::sink);
            init_subscriber(subscriber);
        }
    };
});

pub struct TestApp {
    pub addr: String,
    pub pool: PgPool,
    /// Stands in for the MailChimp API; each test mounts the responses it
    /// expects.
    pub mailchimp_server: MockServer,
}

impl TestApp {
    pub async fn post_member(
        &self,
        body: serde_json::Value,
    ) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}/members", self.addr))
            .json(&body)
            .send()
            .await
            .expect("execute request")
    }

    pub async fn get_member(
        &self,
        member_id: &str,
    ) -> reqwest::Response {
        reqwest::Client::new()
            .get(format!("{}/members/{}", self.addr, member_id))
            .send()
            .await
            .expect("execute request")
    }

    pub async fn put_member(
        &self,
        member_id: &str,
        body: serde_json::Value,
    ) -> reqwest::Response {
        reqwest::Client::new()
            .put(format!("{}/members/{}", self.addr, member_id))
            .json(&body)
            .send()
            .await
            .expect("execute request")
    }

    pub async fn delete_member(
        &self,
        member_id: &str,
    ) -> reqwest::Response {
        reqwest::Client::new()
            .delete(format!("{}/members/{}", self.addr, member_id))
            .send()
            .await
            .expect("execute request")
    }
}

/// A field map that passes validation; individual tests override or strip
/// fields as needed.
pub fn member_body() -> serde_json::Value {
    serde_json::json!({
        "list_id": "d3ad5-list",
        "email_address": "ana@ana.com",
        "email_type": "sale",
        "language": "en",
        "vip": true,
        "ip_signup": "192.168.0.10",
        "timestamp_signup": "2020-09-01T14:15:22Z",
        "tags": ["campaign1", "campaign2"],
        "interests": ["sports", "music"],
        "location": {"latitude": "14.730300", "longitude": "121.138415"},
    })
}

/// Drive a full successful create through the API, with the fake MailChimp
/// assigning `mc-123`. Returns the created member as the API serialized it.
pub async fn create_synced_member(app: &TestApp) -> serde_json::Value {
    let create_mock = Mock::given(method("POST"))
        .and(path("/lists/d3ad5-list/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "mc-123"})))
        .mount_as_scoped(&app.mailchimp_server)
        .await;

    let resp = app.post_member(member_body()).await;
    assert_eq!(resp.status().as_u16(), 200);

    drop(create_mock);
    resp.json().await.unwrap()
}

/// Drive a create whose remote half fails, leaving an orphan row. Returns
/// the generated member id.
pub async fn create_orphan_member(app: &TestApp) -> String {
    let create_mock = Mock::given(method("POST"))
        .and(path("/lists/d3ad5-list/members"))
        .respond_with(ResponseTemplate::new(500))
        .mount_as_scoped(&app.mailchimp_server)
        .await;

    let resp = app.post_member(member_body()).await;
    assert_eq!(resp.status().as_u16(), 502);
    drop(create_mock);

    // the error response carries no member id; read it back from the db
    let (member_id,): (Uuid,) = sqlx::query_as("SELECT member_id FROM members")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    member_id.to_string()
}

/// Read `DatabaseSettings` and create a db with a randomised name (but with
/// the same migrations/tables, specified in the `migrations` directory).
async fn configure_database(cfg: &DatabaseSettings) -> PgPool {
    // connect to the top-level db
    let mut conn = PgConnection::connect_with(&cfg.connection_without_db())
        .await
        .expect("postgres must be running; run scripts/init_db.sh");

    conn.execute(format!(r#"CREATE DATABASE "{}";"#, cfg.database_name).as_str())
        .await
        .unwrap();

    let pool = PgPool::connect_with(cfg.connection()).await.unwrap();
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("failed to migrate");
    pool
}

/// Spawn a `TestApp` with a randomised database and a wiremock server in
/// place of MailChimp.
pub async fn spawn_app() -> TestApp {
    // init the tracing subscriber once only
    Lazy::force(&TRACING);

    let mailchimp_server = MockServer::start().await;

    let cfg = {
        let mut rand_cfg = get_configuration().unwrap();

        // db name is randomised so every test gets a fresh db
        rand_cfg.database.database_name = Uuid::new_v4().to_string();

        // port 0: the OS assigns a random free port
        rand_cfg.application.port = 0;

        rand_cfg.mailchimp.base_url = mailchimp_server.uri();

        rand_cfg
    };

    configure_database(&cfg.database).await;

    let app = Application::build(cfg.clone()).await.unwrap();
    let addr = format!("http://localhost:{}", app.get_port());

    let pool = get_connection_pool(&cfg.database);
    tokio::spawn(app.run_until_stopped());

    TestApp {
        addr,
        pool,
        mailchimp_server,
    }
}
