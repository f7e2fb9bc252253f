//! Wallet operations: transfers, withdrawals, deposits, top-ups and STK
//! trades. Every mutation runs in one transaction with the wallet row
//! locked `FOR UPDATE`, and writes a row to the transactions ledger.

pub mod handlers;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::Row;
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::PlatformConfig;
use crate::core_types::MemberId;
use crate::db::Database;
use crate::member::{MemberRepository, TxStatus, TxType};

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("amount must be positive")]
    InvalidAmount,

    #[error("minimum withdrawal is {0}")]
    BelowMinimum(Decimal),

    #[error("recipient not found: {0}")]
    RecipientNotFound(String),

    #[error("cannot transfer to yourself")]
    SelfTransfer,

    #[error("deposit request not found or already processed")]
    DepositNotFound,
}

/// Charge retained by the platform on a member-to-member transfer.
pub fn transfer_charge(amount: Decimal, charge_pct: Decimal) -> Decimal {
    amount * charge_pct / Decimal::ONE_HUNDRED
}

/// What actually reaches the member's bank after processing fee + TDS.
pub fn withdraw_net(amount: Decimal, fee_pct: Decimal, tds_pct: Decimal) -> Decimal {
    amount * (Decimal::ONE_HUNDRED - fee_pct - tds_pct) / Decimal::ONE_HUNDRED
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferOutcome {
    pub recipient_id: MemberId,
    pub recipient_name: String,
    pub gross: Decimal,
    pub charge: Decimal,
    pub net: Decimal,
    pub reference_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WithdrawOutcome {
    pub reference_id: Uuid,
    pub gross: Decimal,
    pub net: Decimal,
    /// "pending" until operator review completes
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StkOutcome {
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub stk_balance: Decimal,
}

pub struct WalletService {
    db: Arc<Database>,
    config: PlatformConfig,
}

impl WalletService {
    pub fn new(db: Arc<Database>, config: PlatformConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Send main-balance funds to another member by referral code.
    /// The configured charge is retained; the recipient receives the net.
    pub async fn transfer(
        &self,
        from: MemberId,
        recipient_code: &str,
        amount: Decimal,
    ) -> Result<TransferOutcome, WalletError> {
        if amount <= Decimal::ZERO {
            return Err(WalletError::InvalidAmount);
        }
        let recipient = MemberRepository::get_by_referral_code(self.db.pool(), recipient_code)
            .await?
            .ok_or_else(|| WalletError::RecipientNotFound(recipient_code.to_string()))?;
        if recipient.id == from {
            return Err(WalletError::SelfTransfer);
        }

        let charge = transfer_charge(amount, self.config.transfer_charge_pct);
        let net = amount - charge;
        let reference_id = Uuid::new_v4();

        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query("SELECT main_balance FROM wallets WHERE member_id = $1 FOR UPDATE")
            .bind(from)
            .fetch_optional(&mut *tx)
            .await?;
        let available: Decimal = row
            .map(|r| r.get("main_balance"))
            .unwrap_or(Decimal::ZERO);
        if available < amount {
            return Err(WalletError::InsufficientBalance);
        }

        sqlx::query(
            "UPDATE wallets SET main_balance = main_balance - $1, updated_at = NOW() \
             WHERE member_id = $2",
        )
        .bind(amount)
        .bind(from)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE wallets SET main_balance = main_balance + $1, updated_at = NOW() \
             WHERE member_id = $2",
        )
        .bind(net)
        .bind(recipient.id)
        .execute(&mut *tx)
        .await?;

        insert_transaction(
            &mut tx,
            from,
            TxType::Transfer,
            amount,
            TxStatus::Completed,
            &format!(
                "Transfer to {} ({}% charge)",
                recipient.referral_code, self.config.transfer_charge_pct
            ),
            None,
            Some(recipient.id),
            Some(reference_id),
        )
        .await?;
        insert_transaction(
            &mut tx,
            recipient.id,
            TxType::Transfer,
            net,
            TxStatus::Completed,
            "Transfer received",
            None,
            Some(from),
            Some(reference_id),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(from, to = recipient.id, %amount, %net, "transfer completed");
        Ok(TransferOutcome {
            recipient_id: recipient.id,
            recipient_name: recipient.name,
            gross: amount,
            charge,
            net,
            reference_id,
        })
    }

    /// Request a withdrawal. Funds leave the wallet immediately; the
    /// transaction stays pending until operator review (out of scope).
    pub async fn withdraw(
        &self,
        member: MemberId,
        amount: Decimal,
        method: &str,
    ) -> Result<WithdrawOutcome, WalletError> {
        if amount <= Decimal::ZERO {
            return Err(WalletError::InvalidAmount);
        }
        if amount < self.config.min_withdrawal {
            return Err(WalletError::BelowMinimum(self.config.min_withdrawal));
        }

        let net = withdraw_net(
            amount,
            self.config.withdraw_fee_pct,
            self.config.withdraw_tds_pct,
        );
        let reference_id = Uuid::new_v4();

        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query("SELECT main_balance FROM wallets WHERE member_id = $1 FOR UPDATE")
            .bind(member)
            .fetch_optional(&mut *tx)
            .await?;
        let available: Decimal = row
            .map(|r| r.get("main_balance"))
            .unwrap_or(Decimal::ZERO);
        if available < amount {
            return Err(WalletError::InsufficientBalance);
        }

        sqlx::query(
            "UPDATE wallets SET main_balance = main_balance - $1, updated_at = NOW() \
             WHERE member_id = $2",
        )
        .bind(amount)
        .bind(member)
        .execute(&mut *tx)
        .await?;

        insert_transaction(
            &mut tx,
            member,
            TxType::Withdraw,
            amount,
            TxStatus::Pending,
            &format!("Withdrawal via {} (net {})", method, net),
            Some(method),
            None,
            Some(reference_id),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(member, %amount, %net, method, "withdrawal requested");
        Ok(WithdrawOutcome {
            reference_id,
            gross: amount,
            net,
            status: TxStatus::Pending.as_str().to_string(),
        })
    }

    /// Record a deposit claim. No balance changes until review approves it.
    pub async fn deposit_request(
        &self,
        member: MemberId,
        amount: Decimal,
        method: &str,
        external_ref: &str,
        proof_link: &str,
    ) -> Result<Uuid, WalletError> {
        if amount <= Decimal::ZERO {
            return Err(WalletError::InvalidAmount);
        }
        let reference_id = Uuid::new_v4();

        let mut tx = self.db.pool().begin().await?;
        insert_transaction(
            &mut tx,
            member,
            TxType::Deposit,
            amount,
            TxStatus::Pending,
            &format!("Deposit via {} ref {} proof {}", method, external_ref, proof_link),
            Some(method),
            None,
            Some(reference_id),
        )
        .await?;
        tx.commit().await?;

        Ok(reference_id)
    }

    /// Approve a pending deposit and credit the main balance. In
    /// production this is driven by the operator review flow; the mock-api
    /// feature exposes it for development.
    pub async fn approve_deposit(&self, reference_id: Uuid) -> Result<(), WalletError> {
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query(
            "SELECT id, member_id, amount FROM transactions \
             WHERE reference_id = $1 AND tx_type = 'deposit' AND status = 'pending' \
             FOR UPDATE",
        )
        .bind(reference_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(WalletError::DepositNotFound)?;

        let id: i64 = row.get("id");
        let member: MemberId = row.get("member_id");
        let amount: Decimal = row.get("amount");

        sqlx::query("UPDATE transactions SET status = 'completed' WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE wallets SET main_balance = main_balance + $1, updated_at = NOW() \
             WHERE member_id = $2",
        )
        .bind(amount)
        .bind(member)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(member, %amount, "deposit approved");
        Ok(())
    }

    /// Move funds from the main balance into the top-up (purchase) wallet.
    pub async fn topup(&self, member: MemberId, amount: Decimal) -> Result<(), WalletError> {
        if amount <= Decimal::ZERO {
            return Err(WalletError::InvalidAmount);
        }

        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query("SELECT main_balance FROM wallets WHERE member_id = $1 FOR UPDATE")
            .bind(member)
            .fetch_optional(&mut *tx)
            .await?;
        let available: Decimal = row
            .map(|r| r.get("main_balance"))
            .unwrap_or(Decimal::ZERO);
        if available < amount {
            return Err(WalletError::InsufficientBalance);
        }

        sqlx::query(
            "UPDATE wallets SET main_balance = main_balance - $1, \
             topup_balance = topup_balance + $1, updated_at = NOW() WHERE member_id = $2",
        )
        .bind(amount)
        .bind(member)
        .execute(&mut *tx)
        .await?;

        insert_transaction(
            &mut tx,
            member,
            TxType::Topup,
            amount,
            TxStatus::Completed,
            "Top-up from main balance",
            None,
            None,
            None,
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Buy STK at the fixed platform price from the main balance.
    pub async fn stk_buy(
        &self,
        member: MemberId,
        quantity: Decimal,
    ) -> Result<StkOutcome, WalletError> {
        if quantity <= Decimal::ZERO {
            return Err(WalletError::InvalidAmount);
        }
        let total = quantity * self.config.stk_price;

        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query(
            "SELECT main_balance, stk_balance FROM wallets WHERE member_id = $1 FOR UPDATE",
        )
        .bind(member)
        .fetch_optional(&mut *tx)
        .await?;
        let (available, stk): (Decimal, Decimal) = row
            .map(|r| (r.get("main_balance"), r.get("stk_balance")))
            .unwrap_or((Decimal::ZERO, Decimal::ZERO));
        if available < total {
            return Err(WalletError::InsufficientBalance);
        }

        sqlx::query(
            "UPDATE wallets SET main_balance = main_balance - $1, \
             stk_balance = stk_balance + $2, updated_at = NOW() WHERE member_id = $3",
        )
        .bind(total)
        .bind(quantity)
        .bind(member)
        .execute(&mut *tx)
        .await?;

        insert_transaction(
            &mut tx,
            member,
            TxType::Purchase,
            total,
            TxStatus::Completed,
            &format!("STK buy {} @ {}", quantity, self.config.stk_price),
            None,
            None,
            None,
        )
        .await?;

        tx.commit().await?;
        Ok(StkOutcome {
            quantity,
            unit_price: self.config.stk_price,
            total,
            stk_balance: stk + quantity,
        })
    }

    /// Sell STK back into the main balance at the fixed platform price.
    pub async fn stk_sell(
        &self,
        member: MemberId,
        quantity: Decimal,
    ) -> Result<StkOutcome, WalletError> {
        if quantity <= Decimal::ZERO {
            return Err(WalletError::InvalidAmount);
        }
        let total = quantity * self.config.stk_price;

        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query("SELECT stk_balance FROM wallets WHERE member_id = $1 FOR UPDATE")
            .bind(member)
            .fetch_optional(&mut *tx)
            .await?;
        let stk: Decimal = row.map(|r| r.get("stk_balance")).unwrap_or(Decimal::ZERO);
        if stk < quantity {
            return Err(WalletError::InsufficientBalance);
        }

        sqlx::query(
            "UPDATE wallets SET stk_balance = stk_balance - $1, \
             main_balance = main_balance + $2, updated_at = NOW() WHERE member_id = $3",
        )
        .bind(quantity)
        .bind(total)
        .bind(member)
        .execute(&mut *tx)
        .await?;

        insert_transaction(
            &mut tx,
            member,
            TxType::Purchase,
            total,
            TxStatus::Completed,
            &format!("STK sell {} @ {}", quantity, self.config.stk_price),
            None,
            None,
            None,
        )
        .await?;

        tx.commit().await?;
        Ok(StkOutcome {
            quantity,
            unit_price: self.config.stk_price,
            total,
            stk_balance: stk - quantity,
        })
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn insert_transaction(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    member: MemberId,
    tx_type: TxType,
    amount: Decimal,
    status: TxStatus,
    description: &str,
    method: Option<&str>,
    recipient_id: Option<MemberId>,
    reference_id: Option<Uuid>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO transactions
               (member_id, tx_type, amount, status, description, method,
                recipient_id, reference_id, created_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
    )
    .bind(member)
    .bind(tx_type.as_str())
    .bind(amount)
    .bind(status.as_str())
    .bind(description)
    .bind(method)
    .bind(recipient_id)
    .bind(reference_id)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_charge_is_eight_percent_by_default() {
        let cfg = PlatformConfig::default();
        let charge = transfer_charge(Decimal::new(1000, 0), cfg.transfer_charge_pct);
        assert_eq!(charge, Decimal::new(80, 0));
    }

    #[test]
    fn withdraw_net_is_eighty_six_percent_by_default() {
        let cfg = PlatformConfig::default();
        let net = withdraw_net(
            Decimal::new(10_000, 0),
            cfg.withdraw_fee_pct,
            cfg.withdraw_tds_pct,
        );
        assert_eq!(net, Decimal::new(8_600, 0));
    }

    #[test]
    fn default_stk_price_matches_plan() {
        let cfg = PlatformConfig::default();
        assert_eq!(cfg.stk_price, Decimal::new(2550, 2));
    }
}
