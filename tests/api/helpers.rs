use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHasher, Version};
use chrono::NaiveDate;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use once_cell::sync::Lazy;
use redis::aio::ConnectionManager;
use secrecy::ExposeSecret;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use std::net::TcpListener;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sns_service::authentication::TokenIssuer;
use sns_service::configuration::{get_configuration, DatabaseSettings};
use sns_service::email_client::EmailClient;
use sns_service::telemetry::{get_tracing_subscriber, init_subscriber};

// ensure that the tracing stack is only initialized once
static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_tracing_subscriber("test", "debug", std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_tracing_subscriber("test", "debug", std::io::sink);
        init_subscriber(subscriber);
    }
});

// A struct holding data needed to access a test version of our application
pub struct TestApp {
    pub address: String,
    pub connection_pool: PgPool,
    pub redis: ConnectionManager,
    pub email_server: MockServer,
    pub api_client: reqwest::Client,
}

// Spawns an app inside a future and returns the configured TestApp.
pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let email_server = MockServer::start().await;

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind a random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = Uuid::new_v4().to_string();
    configuration.email_client.base_url = email_server.uri();

    let connection_pool = configure_database(&configuration.database).await;

    let sender_email = configuration
        .email_client
        .sender()
        .expect("Invalid sender email address.");
    let email_client = EmailClient::new(
        configuration.email_client.base_url.clone(),
        sender_email,
        configuration.email_client.authorization_token.clone(),
        std::time::Duration::from_millis(200),
    );

    let redis_client = redis::Client::open(configuration.redis_uri.expose_secret().as_str())
        .expect("Failed to build the Redis client.");
    let redis = ConnectionManager::new(redis_client)
        .await
        .expect("Failed to connect to Redis.");

    let token_issuer =
        TokenIssuer::new(&configuration.auth).expect("Failed to build the token issuer.");

    let server = sns_service::startup::run(
        listener,
        connection_pool.clone(),
        email_client,
        redis.clone(),
        token_issuer,
    )
    .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        connection_pool,
        redis,
        email_server,
        api_client: reqwest::Client::new(),
    }
}

// Configures a test database, running all migrations, and then returning the connection pool handle
// needed to use the test database.
async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to postgres.");

    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.database_name).as_str())
        .await
        .expect("Failed to create database");

    let connection_pool = PgPool::connect_with(config.with_db())
        .await
        .expect("Failed to connect to postgres.");

    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database");

    connection_pool
}

impl TestApp {
    /// Accepts every outgoing email with a 200. Tests asserting on emails
    /// mount their own mock with expectations instead.
    pub async fn accept_all_emails(&self) {
        Mock::given(path("/email"))
            .and(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.email_server)
            .await;
    }

    pub async fn post_signup(&self, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/api/members", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_login(&self, email: &str, password: &str) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/api/auth/login", &self.address))
            .json(&serde_json::json!({"email": email, "password": password}))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Logs the member in and returns the issued access token.
    pub async fn login(&self, member: &TestMember) -> String {
        let response = self.post_login(&member.email, &member.password).await;
        assert_eq!(200, response.status().as_u16());
        let body: serde_json::Value = response.json().await.unwrap();
        body["data"]["accessToken"].as_str().unwrap().to_string()
    }

    pub async fn get_member_info(
        &self,
        member_id: Uuid,
        access_token: Option<&str>,
    ) -> reqwest::Response {
        let mut request = self
            .api_client
            .get(&format!("{}/api/members/{}", &self.address, member_id));
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request")
    }
}

/// A member provisioned straight into the database, mirroring what the
/// sign-up flow would have produced.
pub struct TestMember {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub nickname: String,
    pub password: String,
    pub birth: NaiveDate,
}

impl TestMember {
    pub fn generate() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: Name().fake(),
            email: SafeEmail().fake(),
            nickname: Uuid::new_v4().simple().to_string()[..12].to_string(),
            password: Uuid::new_v4().simple().to_string()[..12].to_string(),
            birth: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
        }
    }

    /// Stores the member as an ACTIVE, verified `MEMBER` with a public
    /// profile. Tests tweak rows afterwards when they need other states.
    pub async fn store(&self, pool: &PgPool) {
        self.store_with(pool, "MEMBER", "ACTIVE", "PUBLIC").await;
    }

    pub async fn store_with(&self, pool: &PgPool, role: &str, activation: &str, visibility: &str) {
        let salt = SaltString::generate(&mut rand::thread_rng());
        // Match production parameters
        let password_hash = Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Params::new(15000, 2, 1, None).unwrap(),
        )
        .hash_password(self.password.as_bytes(), &salt)
        .unwrap()
        .to_string();

        sqlx::query(
            r#"
            INSERT INTO members
                (id, name, password_hash, nickname, email, birth, gender,
                 role, activation, visibility, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'FEMALE', $7, $8, $9, now())
            "#,
        )
        .bind(self.id)
        .bind(&self.name)
        .bind(password_hash)
        .bind(&self.nickname)
        .bind(&self.email)
        .bind(self.birth)
        .bind(role)
        .bind(activation)
        .bind(visibility)
        .execute(pool)
        .await
        .expect("Failed to store test member.");
    }
}

/// Inserts a follow edge directly, bypassing the API.
pub async fn seed_follow(pool: &PgPool, follower_id: Uuid, following_id: Uuid) {
    sqlx::query(
        "INSERT INTO follows (id, follower_id, following_id, created_at) VALUES ($1, $2, $3, now())",
    )
    .bind(Uuid::new_v4())
    .bind(follower_id)
    .bind(following_id)
    .execute(pool)
    .await
    .expect("Failed to seed follow relation.");
}

/// Inserts a block edge directly, bypassing the API.
pub async fn seed_block(pool: &PgPool, blocker_id: Uuid, blocked_id: Uuid) {
    sqlx::query(
        "INSERT INTO blocks (id, blocker_id, blocked_id, created_at) VALUES ($1, $2, $3, now())",
    )
    .bind(Uuid::new_v4())
    .bind(blocker_id)
    .bind(blocked_id)
    .execute(pool)
    .await
    .expect("Failed to seed block relation.");
}

/// Pulls the one-time code out of an email captured by the mock server.
/// Works for both verification codes and temporary passwords, whose text
/// bodies read "... is {code}."
pub fn extract_one_time_code(email_request: &wiremock::Request) -> String {
    let body: serde_json::Value =
        serde_json::from_slice(&email_request.body).expect("Email body was not JSON");
    let text = body["TextBody"].as_str().expect("TextBody missing");
    let after_is = text
        .split(" is ")
        .nth(1)
        .expect("No code found in email body");
    after_is
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect()
}
