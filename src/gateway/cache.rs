//! TTL-based cache for reference tables (salary slabs, referral levels,
//! products).
//!
//! Uses the `cached` crate for automatic TTL expiration. This enables
//! hot-reload: admin changes to the plan tables are visible within
//! TTL_SECONDS without restarting the gateway. Empty plan tables fall
//! back to the built-in defaults.

use cached::proc_macro::cached;
use sqlx::{PgPool, Row};
use std::sync::Arc;

use crate::network::eligibility::{
    DEFAULT_REFERRAL_SCALE, DEFAULT_SALARY_SCALE, ReferralLevel, SalarySlab,
};
use crate::shop::models::{Product, ProductRepository};

/// TTL for reference-table cache in seconds
pub const TTL_SECONDS: u64 = 5;

/// Load active products from database with caching
#[cached(
    time = 5,
    key = "String",
    convert = r#"{ "products".to_string() }"#,
    result = true
)]
pub async fn load_products_cached(pool: Arc<PgPool>) -> Result<Vec<Product>, String> {
    tracing::debug!("[cache] Loading products from database");
    ProductRepository::load_active(&pool)
        .await
        .map_err(|e| format!("Failed to load products: {}", e))
}

/// Load salary slabs from database with caching; defaults when unset
#[cached(
    time = 5,
    key = "String",
    convert = r#"{ "salary_slabs".to_string() }"#,
    result = true
)]
pub async fn load_salary_slabs_cached(pool: Arc<PgPool>) -> Result<Vec<SalarySlab>, String> {
    tracing::debug!("[cache] Loading salary slabs from database");
    let rows = sqlx::query(
        r#"SELECT level, threshold, monthly_pay FROM salary_slabs ORDER BY level"#,
    )
    .fetch_all(pool.as_ref())
    .await
    .map_err(|e| format!("Failed to load salary slabs: {}", e))?;

    if rows.is_empty() {
        return Ok(DEFAULT_SALARY_SCALE.slabs().to_vec());
    }

    Ok(rows
        .iter()
        .map(|r| SalarySlab {
            level: r.get::<i16, _>("level") as u8,
            threshold: r.get("threshold"),
            monthly_pay: r.get("monthly_pay"),
        })
        .collect())
}

/// Load referral levels from database with caching; defaults when unset
#[cached(
    time = 5,
    key = "String",
    convert = r#"{ "referral_levels".to_string() }"#,
    result = true
)]
pub async fn load_referral_levels_cached(pool: Arc<PgPool>) -> Result<Vec<ReferralLevel>, String> {
    tracing::debug!("[cache] Loading referral levels from database");
    let rows = sqlx::query(
        r#"SELECT level, direct_required, reward_percent
           FROM referral_levels WHERE is_active ORDER BY level"#,
    )
    .fetch_all(pool.as_ref())
    .await
    .map_err(|e| format!("Failed to load referral levels: {}", e))?;

    if rows.is_empty() {
        return Ok(DEFAULT_REFERRAL_SCALE.levels().to_vec());
    }

    Ok(rows
        .iter()
        .map(|r| ReferralLevel {
            level: r.get::<i16, _>("level") as u8,
            direct_required: r.get::<i32, _>("direct_required") as u32,
            reward_percent: r.get::<i16, _>("reward_percent") as u8,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_constant() {
        assert_eq!(TTL_SECONDS, 5);
    }
}
