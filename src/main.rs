//! ApexUnity - Member Platform Backend
//!
//! Entry point. Architecture:
//!
//! ```text
//! ┌──────────┐    ┌───────────┐    ┌───────────────┐    ┌──────────┐
//! │  Config  │───▶│ Postgres  │───▶│ Network/Wallet│───▶│ Gateway  │
//! │  (YAML)  │    │  (sqlx)   │    │   services    │    │  (axum)  │
//! └──────────┘    └───────────┘    └───────────────┘    └──────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use apexunity::config::AppConfig;
use apexunity::db::Database;
use apexunity::gateway::state::AppState;
use apexunity::network::eligibility::{DEFAULT_REFERRAL_SCALE, DEFAULT_SALARY_SCALE};
use apexunity::network::pg_store::PgNetworkStore;
use apexunity::network::placement::{PlacementPolicy, PlacementService};
use apexunity::network::volume::VolumeService;
use apexunity::session::{PgSnapshotSource, RetryPolicy, SessionManager};
use apexunity::shop::ShopService;
use apexunity::user_auth::UserAuthService;
use apexunity::wallet::WalletService;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() {
    let env = get_env();
    let app_config = AppConfig::load(&env);
    let _log_guard = apexunity::logging::init_logging(&app_config);

    tracing::info!("Starting ApexUnity backend in {} mode", env);

    let port = get_port_override().unwrap_or(app_config.gateway.port);
    println!("=== ApexUnity Member Platform ===");
    println!(
        "Gateway will listen on {}:{}",
        app_config.gateway.host, port
    );

    // PostgreSQL is required: members, wallets and the placement tree live there.
    let db = match Database::connect(&app_config.postgres_url).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            eprintln!("❌ FATAL: Failed to connect to PostgreSQL: {}", e);
            eprintln!("   Hint: apply sql/schema.sql and check postgres_url in config/{env}.yaml");
            std::process::exit(1);
        }
    };
    println!("✅ PostgreSQL connected");

    // Network services share one store.
    let store = Arc::new(PgNetworkStore::new(db.pool().clone()));
    let placement = Arc::new(PlacementService::new(store.clone(), PlacementPolicy::Spillover));
    let volume = Arc::new(VolumeService::new(store));

    // Compensation plan tables (DB overrides fall back to built-ins).
    let salary_scale = Arc::new(DEFAULT_SALARY_SCALE.clone());
    let referral_scale = Arc::new(DEFAULT_REFERRAL_SCALE.clone());

    let session = Arc::new(SessionManager::new(
        Arc::new(PgSnapshotSource::new(db.pool().clone())),
        RetryPolicy::new(
            app_config.session.retry_max_attempts,
            Duration::from_millis(app_config.session.retry_base_delay_ms),
        ),
        Duration::from_secs(app_config.session.cache_ttl_secs),
    ));

    let user_auth = Arc::new(UserAuthService::new(
        db.pool().clone(),
        placement.clone(),
        app_config.auth.jwt_secret.clone(),
        app_config.auth.token_ttl_hours,
    ));

    let wallet = Arc::new(WalletService::new(db.clone(), app_config.platform.clone()));
    let shop = Arc::new(ShopService::new(
        db.clone(),
        volume.clone(),
        placement.clone(),
        referral_scale.clone(),
    ));

    let state = AppState::new(
        db,
        user_auth,
        placement,
        volume,
        session,
        wallet,
        shop,
        salary_scale,
        referral_scale,
        app_config.platform.clone(),
    );

    apexunity::gateway::run_server(port, state).await;
}
