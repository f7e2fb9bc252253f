use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use validator::Validate;

use crate::core_types::{Bv, LevelNo, MemberId};
use crate::member::{Member, Wallet};
use crate::network::eligibility::{ReferralScale, SalaryScale};
use crate::network::model::{Side, SubtreeAggregate};
use crate::network::tree::TreeNode;
use crate::network::volume::BvSummary;
use crate::session::Freshness;

// ============================================================================
// StrictAmount: Format-Validated Decimal at Serde Layer
// ============================================================================

/// Strict format money/quantity amount - validates format during
/// deserialization:
/// - Rejects `.5` (must be `0.5`)
/// - Rejects `5.` (must be `5.0` or `5`)
/// - Rejects negative numbers
/// - Rejects empty strings
///
/// Business validation (minimums, balance checks) happens later in the
/// wallet/shop services.
#[derive(Debug, Clone, Copy)]
pub struct StrictAmount(Decimal);

impl StrictAmount {
    /// Get the inner Decimal value
    pub fn inner(self) -> Decimal {
        self.0
    }

    /// Create from Decimal (for testing)
    #[cfg(test)]
    pub fn from_decimal(d: Decimal) -> Self {
        Self(d)
    }
}

impl std::ops::Deref for StrictAmount {
    type Target = Decimal;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de> Deserialize<'de> for StrictAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        // Support both JSON number and JSON string
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum DecimalOrString {
            String(String),
            Number(Decimal),
        }

        let value = DecimalOrString::deserialize(deserializer)?;

        match value {
            DecimalOrString::String(s) => {
                if s.is_empty() {
                    return Err(D::Error::custom("Amount cannot be empty"));
                }
                if s.starts_with('.') {
                    return Err(D::Error::custom("Invalid format: use 0.5 not .5"));
                }
                if s.ends_with('.') {
                    return Err(D::Error::custom("Invalid format: use 5.0 not 5."));
                }

                let d = Decimal::from_str(&s)
                    .map_err(|e| D::Error::custom(format!("Invalid decimal: {}", e)))?;

                if d.is_sign_negative() {
                    return Err(D::Error::custom("Amount cannot be negative"));
                }

                Ok(StrictAmount(d))
            }
            DecimalOrString::Number(d) => {
                if d.is_sign_negative() {
                    return Err(D::Error::custom("Amount cannot be negative"));
                }
                Ok(StrictAmount(d))
            }
        }
    }
}

impl Serialize for StrictAmount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Serialize as string to preserve precision
        serializer.serialize_str(&self.0.to_string())
    }
}

impl utoipa::PartialSchema for StrictAmount {
    fn schema() -> utoipa::openapi::RefOr<utoipa::openapi::schema::Schema> {
        <String as utoipa::PartialSchema>::schema()
    }
}

impl utoipa::ToSchema for StrictAmount {}

// ============================================================================
// Generic response envelope
// ============================================================================

/// Standard API response wrapper
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

/// Error codes
pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_BALANCE: i32 = 1002;
    pub const BELOW_MINIMUM: i32 = 1003;
    pub const OUT_OF_STOCK: i32 = 1004;

    // Auth errors (2xxx)
    pub const MISSING_AUTH: i32 = 2001;
    pub const AUTH_FAILED: i32 = 2002;

    // Resource errors (4xxx)
    pub const NOT_FOUND: i32 = 4001;
    pub const SLOT_OCCUPIED: i32 = 4002;
    pub const SPONSOR_NOT_FOUND: i32 = 4003;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const CORRUPT_TREE: i32 = 5002;
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TransferRequest {
    /// Referral code of the receiving member
    #[schema(example = "AU000004")]
    #[validate(length(min = 4, max = 16))]
    pub recipient_code: String,
    pub amount: StrictAmount,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct WithdrawRequest {
    pub amount: StrictAmount,
    /// "bank" | "crypto"
    #[schema(example = "bank")]
    pub method: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DepositRequest {
    pub amount: StrictAmount,
    /// "bank" | "crypto"
    #[schema(example = "bank")]
    pub method: String,
    /// External payment reference entered by the member
    #[validate(length(min = 4, max = 64))]
    pub transaction_id: String,
    /// Link to the payment proof upload
    #[validate(url)]
    pub proof_link: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StkTradeRequest {
    /// STK token quantity to buy or sell
    pub quantity: StrictAmount,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PurchaseRequest {
    pub product_id: i64,
    #[validate(range(min = 1, max = 100))]
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TicketRequest {
    #[validate(length(min = 3, max = 200))]
    pub subject: String,
    #[validate(length(min = 10, max = 4000))]
    pub message: String,
    /// "low" | "medium" | "high"
    #[schema(example = "medium")]
    pub priority: String,
}

/// Query string for GET /team/tree
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct TreeQuery {
    /// Comma-separated member ids whose nodes render expanded
    pub expanded: Option<String>,
}

impl TreeQuery {
    pub fn expanded_set(&self) -> std::collections::HashSet<MemberId> {
        self.expanded
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect()
    }
}

/// Query string for GET /member/transactions
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct TransactionsQuery {
    /// Filter by transaction type, e.g. "purchase"
    #[serde(rename = "type")]
    pub tx_type: Option<String>,
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Everything the dashboard needs in one payload. Either complete or an
/// error envelope - partial financial figures are never served.
#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub member: Member,
    pub wallet: Wallet,
    pub freshness: Freshness,
    pub team: TeamSummary,
    pub bv: BvSummary,
    pub salary: SalaryStandingView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TeamSummary {
    pub direct_count: u32,
    pub left_count: u32,
    pub right_count: u32,
    pub total_count: u32,
}

impl From<SubtreeAggregate> for TeamSummary {
    fn from(agg: SubtreeAggregate) -> Self {
        Self {
            direct_count: agg.direct_count,
            left_count: agg.left_count,
            right_count: agg.right_count,
            total_count: agg.total_count,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalaryStandingView {
    pub current_level: Option<LevelNo>,
    pub current_pay: Option<i64>,
    pub next_requirement: Option<String>,
    pub next_threshold: Option<Bv>,
    pub progress_percent: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SlabView {
    pub level: LevelNo,
    /// Plan notation, e.g. "50K-50K"
    pub requirement: String,
    pub monthly_pay: i64,
    pub eligible: bool,
    pub current: bool,
}

/// Full salary tab payload: standing plus the whole table
#[derive(Debug, Serialize, ToSchema)]
pub struct SalaryResponse {
    pub left_bv: Bv,
    pub right_bv: Bv,
    pub balanced_bv: Bv,
    pub standing: SalaryStandingView,
    pub slabs: Vec<SlabView>,
}

pub fn salary_response(scale: &SalaryScale, bv: BvSummary) -> SalaryResponse {
    let standing = scale.evaluate(bv.balanced);
    let slabs = scale
        .slabs()
        .iter()
        .enumerate()
        .map(|(i, slab)| SlabView {
            level: slab.level,
            requirement: slab.requirement_label(),
            monthly_pay: slab.monthly_pay,
            eligible: slab.threshold <= bv.balanced,
            current: standing.current_index == Some(i),
        })
        .collect();

    SalaryResponse {
        left_bv: bv.left,
        right_bv: bv.right,
        balanced_bv: bv.balanced,
        standing: SalaryStandingView {
            current_level: standing.current.map(|s| s.level),
            current_pay: standing.current.map(|s| s.monthly_pay),
            next_requirement: standing.next.map(|s| s.requirement_label()),
            next_threshold: standing.next.map(|s| s.threshold),
            progress_percent: standing.progress_percent,
        },
        slabs,
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LevelView {
    pub level: LevelNo,
    pub direct_required: u32,
    pub reward_percent: u8,
    pub unlocked: bool,
}

pub fn level_views(scale: &ReferralScale, direct_count: u32) -> Vec<LevelView> {
    scale
        .levels()
        .iter()
        .map(|l| LevelView {
            level: l.level,
            direct_required: l.direct_required,
            reward_percent: l.reward_percent,
            unlocked: direct_count >= l.direct_required,
        })
        .collect()
}

/// Tree node hydrated with display fields for the member-facing view
#[derive(Debug, Serialize, ToSchema)]
pub struct TreeNodeView {
    pub member_id: MemberId,
    pub name: String,
    pub referral_code: String,
    pub depth: u32,
    pub side: Option<Side>,
    pub expanded: bool,
    #[schema(no_recursion)]
    pub children: Vec<TreeNodeView>,
}

impl TreeNodeView {
    pub fn hydrate(node: &TreeNode, names: &HashMap<MemberId, (String, String)>) -> Self {
        let (name, referral_code) = names
            .get(&node.member_id)
            .cloned()
            .unwrap_or_else(|| ("(unknown)".to_string(), String::new()));
        Self {
            member_id: node.member_id,
            name,
            referral_code,
            depth: node.depth,
            side: node.side,
            expanded: node.expanded,
            children: node
                .children
                .iter()
                .map(|c| TreeNodeView::hydrate(c, names))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::eligibility::DEFAULT_SALARY_SCALE;

    #[test]
    fn strict_amount_rejects_bad_formats() {
        assert!(serde_json::from_str::<StrictAmount>(r#"".5""#).is_err());
        assert!(serde_json::from_str::<StrictAmount>(r#""5.""#).is_err());
        assert!(serde_json::from_str::<StrictAmount>(r#""""#).is_err());
        assert!(serde_json::from_str::<StrictAmount>(r#""-10""#).is_err());
        assert!(serde_json::from_str::<StrictAmount>("-3").is_err());
    }

    #[test]
    fn strict_amount_accepts_strings_and_numbers() {
        let a: StrictAmount = serde_json::from_str(r#""1500.50""#).unwrap();
        assert_eq!(a.inner(), Decimal::new(150050, 2));
        let b: StrictAmount = serde_json::from_str("1500.5").unwrap();
        assert_eq!(b.inner(), Decimal::new(150050, 2));
    }

    #[test]
    fn tree_query_parses_expanded_ids() {
        let q = TreeQuery {
            expanded: Some("1, 2,abc,3".to_string()),
        };
        let set = q.expanded_set();
        assert_eq!(set.len(), 3);
        assert!(set.contains(&2));
    }

    #[test]
    fn salary_response_marks_current_and_eligible_slabs() {
        let bv = BvSummary {
            own: 90_000,
            left: 62_000,
            right: 58_000,
            balanced: 58_000,
        };
        let resp = salary_response(&DEFAULT_SALARY_SCALE, bv);

        assert_eq!(resp.standing.current_level, Some(3));
        assert_eq!(resp.standing.current_pay, Some(1_000));
        assert_eq!(resp.standing.next_threshold, Some(100_000));
        assert_eq!(resp.standing.next_requirement.as_deref(), Some("100K-100K"));
        assert!((resp.standing.progress_percent - 58.0).abs() < 0.001);

        assert!(resp.slabs[0].eligible);
        assert!(resp.slabs[2].current);
        assert!(!resp.slabs[3].eligible);
    }
}
