use std::net::TcpListener;

use redis::aio::ConnectionManager;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;

use sns_service::authentication::TokenIssuer;
use sns_service::configuration::get_configuration;
use sns_service::email_client::EmailClient;
use sns_service::purge_worker::run_purge_worker;
use sns_service::startup::run;
use sns_service::telemetry::{get_tracing_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let subscriber = get_tracing_subscriber("sns-service", "info", std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration().expect("Failed to read configuration.");

    let connection_pool = PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(configuration.database.with_db());

    let sender_email = configuration
        .email_client
        .sender()
        .expect("Invalid sender email address.");
    let email_client = EmailClient::new(
        configuration.email_client.base_url.clone(),
        sender_email,
        configuration.email_client.authorization_token.clone(),
        configuration.email_client.timeout(),
    );

    let redis_client = redis::Client::open(configuration.redis_uri.expose_secret().as_str())
        .expect("Failed to build the Redis client.");
    let redis = ConnectionManager::new(redis_client)
        .await
        .expect("Failed to connect to Redis.");

    let token_issuer =
        TokenIssuer::new(&configuration.auth).expect("Failed to build the token issuer.");

    tokio::spawn(run_purge_worker(
        connection_pool.clone(),
        configuration.purge.clone(),
    ));

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    println!("Running application on {}", address);
    let listener = TcpListener::bind(address)?;
    run(listener, connection_pool, email_client, redis, token_issuer)?.await
}
