//! Redis-backed sessions for a small Salvo app
//!
//! ```text
//! REDIS_URLS=redis://127.0.0.1:6379 SESSION_SECRETS=new-secret,old-secret \
//!     cargo run --example with_redis
//! ```
//!
//! Several comma separated URLs connect to a Redis Cluster.

use salvo::prelude::*;
use salvo_redis_session::{
    JsonSerializer, Keyring, RedisStore, SessionDepotExt, SessionEngine, SessionHandler,
    StoreConfig,
};
use serde::Serialize;

#[derive(Serialize)]
struct CounterResponse {
    counter: i32,
    #[serde(rename = "isNew")]
    is_new: bool,
    flashes: Vec<serde_json::Value>,
}

#[handler]
async fn health() -> &'static str {
    "ok"
}

#[handler]
async fn counter(depot: &mut Depot) -> Json<CounterResponse> {
    let session = depot.session_mut().expect("Session not found");

    let count = session.get::<i32>("counter").unwrap_or(0) + 1;
    let flashes = session.flashes();
    let is_new = session.is_new();

    session.set("counter", count).expect("counter serializes");
    if count % 10 == 0 {
        session
            .add_flash(format!("{} visits!", count))
            .expect("flash serializes");
    }

    Json(CounterResponse {
        counter: count,
        is_new,
        flashes,
    })
}

#[handler]
async fn logout(depot: &mut Depot) -> &'static str {
    depot.session_mut().expect("Session not found").destroy();
    "logged out"
}

#[tokio::main]
async fn main() {
    // Set up logging
    tracing_subscriber::fmt::init();

    let urls: Vec<String> = std::env::var("REDIS_URLS")
        .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
        .split(',')
        .map(|s| s.trim().to_string())
        .collect();
    let use_tls = std::env::var("REDIS_TLS").map(|v| v == "1").unwrap_or(false);

    let store = RedisStore::connect(&urls, use_tls)
        .await
        .expect("Failed to connect to Redis");

    // The first secret signs new tokens, the rest are only accepted
    let secrets = std::env::var("SESSION_SECRETS").unwrap_or_else(|_| "keyboard cat".to_string());
    let keyring = Keyring::new(secrets.split(',').map(str::to_string));

    let config = StoreConfig::new()
        .with_key_prefix("demo_session_")
        .with_session_expire(3600)
        .with_command_timeout(std::time::Duration::from_secs(2));

    let engine = SessionEngine::with_config(store, keyring, config)
        .await
        .expect("Redis did not answer ping")
        .with_serializer(JsonSerializer);

    let router = Router::new()
        .push(Router::with_path("health").get(health))
        .push(
            Router::new()
                .hoop(SessionHandler::new(engine, "session"))
                .get(counter)
                .push(Router::with_path("logout").get(logout)),
        );

    let port = std::env::var("PORT").unwrap_or_else(|_| "5800".to_string());
    let addr = format!("127.0.0.1:{}", port);

    let acceptor = TcpListener::new(addr.clone()).bind().await;
    println!("Server running at http://{}", addr);
    println!("  GET /         - Increment counter");
    println!("  GET /logout   - Destroy session");
    println!("  GET /health   - Health check (no session)");

    Server::new(acceptor).serve(router).await;
}
