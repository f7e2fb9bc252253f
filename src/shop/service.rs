//! Product catalogue and purchase flow.
//!
//! A purchase is the event that feeds the compensation engine: it debits
//! the top-up wallet, credits BV to the buyer (propagating up the
//! placement tree) and pays referral commissions to sponsors whose level
//! is unlocked.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::Row;
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

use super::models::{Order, order_from_row, product_from_row};
use crate::core_types::{Bv, MemberId};
use crate::db::Database;
use crate::member::{MemberRepository, TxStatus, TxType};
use crate::network::eligibility::ReferralScale;
use crate::network::placement::PlacementService;
use crate::network::volume::VolumeService;
use crate::wallet::insert_transaction;

/// Referral commissions reach at most this many sponsor steps up.
const MAX_COMMISSION_DEPTH: u32 = 10;

#[derive(Debug, Error)]
pub enum ShopError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("product {0} not found or inactive")]
    ProductNotFound(i64),

    #[error("only {available} units in stock")]
    OutOfStock { available: i32 },

    #[error("insufficient top-up balance")]
    InsufficientBalance,

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("BV crediting failed: {0}")]
    Volume(#[from] crate::network::error::NetworkError),
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseOutcome {
    pub order_id: i64,
    pub total_price: Decimal,
    pub bv_earned: Bv,
    /// Number of upline commissions paid out
    pub commissions_paid: u32,
}

pub struct ShopService {
    db: Arc<Database>,
    volume: Arc<VolumeService>,
    placement: Arc<PlacementService>,
    referral_scale: Arc<ReferralScale>,
}

impl ShopService {
    pub fn new(
        db: Arc<Database>,
        volume: Arc<VolumeService>,
        placement: Arc<PlacementService>,
        referral_scale: Arc<ReferralScale>,
    ) -> Self {
        Self {
            db,
            volume,
            placement,
            referral_scale,
        }
    }

    pub async fn orders_for(&self, member: MemberId) -> Result<Vec<Order>, ShopError> {
        let rows = sqlx::query(
            r#"SELECT id, member_id, product_id, quantity, unit_price, total_price,
                      bv_earned, status, created_at
               FROM orders WHERE member_id = $1 ORDER BY created_at DESC LIMIT 100"#,
        )
        .bind(member)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(order_from_row).collect())
    }

    /// Buy `quantity` units of a product from the top-up wallet.
    pub async fn purchase(
        &self,
        member: MemberId,
        product_id: i64,
        quantity: u32,
    ) -> Result<PurchaseOutcome, ShopError> {
        if quantity == 0 {
            return Err(ShopError::InvalidQuantity);
        }

        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query(
            r#"SELECT id, name, description, base_price, gst, bv_credit, stock, is_active
               FROM products WHERE id = $1 AND is_active FOR UPDATE"#,
        )
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ShopError::ProductNotFound(product_id))?;
        let product = product_from_row(&row);

        if product.stock < quantity as i32 {
            return Err(ShopError::OutOfStock {
                available: product.stock,
            });
        }

        let unit_price = product.unit_price();
        let total = unit_price * Decimal::from(quantity);
        let bv_earned = product.bv_credit * Bv::from(quantity);

        let row = sqlx::query("SELECT topup_balance FROM wallets WHERE member_id = $1 FOR UPDATE")
            .bind(member)
            .fetch_optional(&mut *tx)
            .await?;
        let available: Decimal = row
            .map(|r| r.get("topup_balance"))
            .unwrap_or(Decimal::ZERO);
        if available < total {
            return Err(ShopError::InsufficientBalance);
        }

        sqlx::query(
            "UPDATE wallets SET topup_balance = topup_balance - $1, \
             purchased_amount = purchased_amount + $1, updated_at = NOW() WHERE member_id = $2",
        )
        .bind(total)
        .bind(member)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE products SET stock = stock - $1, updated_at = NOW() WHERE id = $2")
            .bind(quantity as i32)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(
            r#"INSERT INTO orders
                   (member_id, product_id, quantity, unit_price, total_price, bv_earned, status)
               VALUES ($1, $2, $3, $4, $5, $6, 'completed')
               RETURNING id"#,
        )
        .bind(member)
        .bind(product_id)
        .bind(quantity as i32)
        .bind(unit_price)
        .bind(total)
        .bind(bv_earned)
        .fetch_one(&mut *tx)
        .await?;
        let order_id: i64 = row.get("id");

        insert_transaction(
            &mut tx,
            member,
            TxType::Purchase,
            total,
            TxStatus::Completed,
            &format!("{} x{} ({} BV)", product.name, quantity, bv_earned),
            None,
            None,
            None,
        )
        .await?;

        tx.commit().await?;

        // BV flows to the buyer and up the placement tree.
        self.volume.credit_bv(member, bv_earned, member).await?;

        // Commission flows up the sponsorship chain.
        let commissions_paid = self.pay_commissions(member, total).await?;

        tracing::info!(
            member,
            order_id,
            %total,
            bv_earned,
            commissions_paid,
            "purchase completed"
        );
        Ok(PurchaseOutcome {
            order_id,
            total_price: total,
            bv_earned,
            commissions_paid,
        })
    }

    /// Walk the sponsorship chain and pay the level commission to every
    /// ancestor whose level is unlocked by their direct-referral count.
    async fn pay_commissions(
        &self,
        buyer: MemberId,
        total: Decimal,
    ) -> Result<u32, ShopError> {
        let buyer_profile = MemberRepository::get_by_id(self.db.pool(), buyer).await?;
        let mut sponsor_id = buyer_profile.and_then(|m| m.sponsor_id);
        let mut paid = 0u32;

        for depth in 1..=MAX_COMMISSION_DEPTH {
            let Some(current) = sponsor_id else { break };

            let directs = match self.placement.get_aggregate(current).await {
                Ok(agg) => agg.direct_count,
                Err(crate::network::error::NetworkError::MemberNotFound(_)) => 0,
                Err(e) => return Err(e.into()),
            };

            if let Some(pct) = self.referral_scale.commission_percent(depth, directs) {
                let bonus = total * Decimal::from(pct) / Decimal::ONE_HUNDRED;

                let mut tx = self.db.pool().begin().await?;
                sqlx::query(
                    "UPDATE wallets SET referral_bonus = referral_bonus + $1, \
                     main_balance = main_balance + $1, updated_at = NOW() WHERE member_id = $2",
                )
                .bind(bonus)
                .bind(current)
                .execute(&mut *tx)
                .await?;
                insert_transaction(
                    &mut tx,
                    current,
                    TxType::ReferralBonus,
                    bonus,
                    TxStatus::Completed,
                    &format!("Level {} commission ({}%)", depth, pct),
                    None,
                    Some(buyer),
                    None,
                )
                .await?;
                tx.commit().await?;
                paid += 1;
            }

            sponsor_id = MemberRepository::get_by_id(self.db.pool(), current)
                .await?
                .and_then(|m| m.sponsor_id);
        }

        Ok(paid)
    }
}
