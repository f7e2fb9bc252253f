//! Member profile, wallet and transaction records.
//!
//! These are the typed forms of the backing tables; DTO conversion for
//! the HTTP surface happens in the gateway layer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::core_types::{Bv, MemberId};
use crate::network::model::Side;

/// Verification status set by an out-of-band review process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    Pending,
    Verified,
    Rejected,
}

impl KycStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::Pending => "pending",
            KycStatus::Verified => "verified",
            KycStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<KycStatus> {
        match s {
            "pending" => Some(KycStatus::Pending),
            "verified" => Some(KycStatus::Verified),
            "rejected" => Some(KycStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub email: String,
    pub mobile: String,
    /// Unique code other members use to name this member as sponsor
    pub referral_code: String,
    pub sponsor_id: Option<MemberId>,
    pub sponsor_name: Option<String>,
    pub preferred_side: Option<Side>,
    pub join_date: DateTime<Utc>,
    pub kyc_status: KycStatus,
    pub rank: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Wallet {
    pub member_id: MemberId,
    pub main_balance: Decimal,
    pub topup_balance: Decimal,
    pub purchased_amount: Decimal,
    pub referral_bonus: Decimal,
    /// Active BV total; cached mirror of the non-expired ledger sum
    pub business_volume: Bv,
    pub stk_balance: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Deposit,
    Withdraw,
    Transfer,
    Topup,
    Purchase,
    ReferralBonus,
    Salary,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Deposit => "deposit",
            TxType::Withdraw => "withdraw",
            TxType::Transfer => "transfer",
            TxType::Topup => "topup",
            TxType::Purchase => "purchase",
            TxType::ReferralBonus => "referral_bonus",
            TxType::Salary => "salary",
        }
    }

    pub fn parse(s: &str) -> Option<TxType> {
        match s {
            "deposit" => Some(TxType::Deposit),
            "withdraw" => Some(TxType::Withdraw),
            "transfer" => Some(TxType::Transfer),
            "topup" => Some(TxType::Topup),
            "purchase" => Some(TxType::Purchase),
            "referral_bonus" => Some(TxType::ReferralBonus),
            "salary" => Some(TxType::Salary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Completed,
    Rejected,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Completed => "completed",
            TxStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<TxStatus> {
        match s {
            "pending" => Some(TxStatus::Pending),
            "completed" => Some(TxStatus::Completed),
            "rejected" => Some(TxStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Transaction {
    pub id: i64,
    pub member_id: MemberId,
    pub tx_type: TxType,
    pub amount: Decimal,
    pub status: TxStatus,
    pub description: String,
    pub method: Option<String>,
    pub recipient_id: Option<MemberId>,
    pub reference_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
