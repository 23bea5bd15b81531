use std::sync::LazyLock;

use event_desk::configuration::{DatabaseSettings, get_configuration};
use event_desk::startup::{Application, get_connection_pool};
use event_desk::telemetry::{get_subscriber, init_subscriber};
use reqwest::Response;
use serde_json::{Value, json};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;
use wiremock::MockServer;

static TRACING: LazyLock<()> = LazyLock::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    };
});

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
    pub email_server: MockServer,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn get(&self, path: &str) -> Response {
        self.api_client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute Request")
    }

    pub async fn post(&self, path: &str, body: &Value) -> Response {
        self.api_client
            .post(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute Request")
    }

    pub async fn put(&self, path: &str, body: &Value) -> Response {
        self.api_client
            .put(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute Request")
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Response {
        self.api_client
            .patch(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute Request")
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.api_client
            .delete(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute Request")
    }

    pub async fn post_contact(&self, body: &Value) -> Response {
        self.post("/contact/", body).await
    }

    /// Creates an event a week from now and returns its JSON representation.
    pub async fn create_event(&self, title: &str) -> Value {
        let eventdatetime = chrono::Utc::now() + chrono::Duration::days(7);
        let response = self
            .post(
                "/events/",
                &json!({
                    "title": title,
                    "description": "Test Description",
                    "eventdatetime": eventdatetime.to_rfc3339(),
                    "address": "123 Test St",
                    "price": "99.99"
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.unwrap()
    }

    pub async fn create_registration(&self, email: &str, event_id: Option<i64>) -> Value {
        let response = self
            .post(
                "/registrations/",
                &json!({
                    "date_registered": chrono::Utc::now().to_rfc3339(),
                    "email": email,
                    "event": event_id
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.unwrap()
    }

    pub async fn create_subscriber(&self, name: &str, email: &str) -> Response {
        self.post("/subscribers/", &json!({ "name": name, "email": email }))
            .await
    }

    pub async fn count_rows(&self, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.db_pool)
            .await
            .expect("Failed to count rows")
    }
}

pub async fn spawn_app() -> TestApp {
    LazyLock::force(&TRACING);

    let email_server = MockServer::start().await;

    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        c.database.database_name = Uuid::new_v4().to_string();
        c.application.port = 0;
        c.email_client.base_url = email_server.uri();
        c
    };

    configure_database(&configuration.database).await;

    let application = Application::build(configuration.clone())
        .await
        .expect("Failed to build application");
    let address = format!("http://127.0.0.1:{}", application.port());
    _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address,
        db_pool: get_connection_pool(&configuration.database),
        email_server,
        api_client: reqwest::Client::new(),
    }
}

async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to postgres instance");

    connection
        .execute(format!(r#"CREATE DATABASE "{}""#, config.database_name).as_str())
        .await
        .expect("Failed to create new database");

    let db_pool = PgPool::connect_with(config.with_db())
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run migrations");

    db_pool
}
