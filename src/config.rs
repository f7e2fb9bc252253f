use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL for members, wallets and placements
    pub postgres_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 signing secret. Overridden by APEX_JWT_SECRET when set.
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret-change-me".to_string(),
            token_ttl_hours: 24,
        }
    }
}

/// Dashboard bootstrap resilience knobs (retry + read-through cache)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionConfig {
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub cache_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retry_max_attempts: 3,
            retry_base_delay_ms: 1000,
            cache_ttl_secs: 30,
        }
    }
}

/// Compensation-plan and fee constants surfaced to the wallet/shop services
/// and, read-only, to clients
#[derive(Debug, Serialize, Deserialize, Clone, utoipa::ToSchema)]
pub struct PlatformConfig {
    /// Charge on member-to-member transfers, percent
    pub transfer_charge_pct: Decimal,
    /// Withdrawal processing fee, percent
    pub withdraw_fee_pct: Decimal,
    /// Tax deducted at source on withdrawals, percent
    pub withdraw_tds_pct: Decimal,
    pub min_withdrawal: Decimal,
    /// Fixed STK token price in platform currency
    pub stk_price: Decimal,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            transfer_charge_pct: Decimal::new(8, 0),
            withdraw_fee_pct: Decimal::new(12, 0),
            withdraw_tds_pct: Decimal::new(2, 0),
            min_withdrawal: Decimal::new(1000, 0),
            stk_price: Decimal::new(2550, 2),
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        let mut config: AppConfig =
            serde_yaml::from_str(&content).expect("Failed to parse config yaml");
        if let Ok(secret) = std::env::var("APEX_JWT_SECRET") {
            config.auth.jwt_secret = secret;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.postgres_url = url;
        }
        config
    }
}
