//! Domain types for the binary placement network

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::core_types::{Bv, MemberId};

/// BV credits stop counting toward eligibility this many months after the credit date.
pub const BV_VALIDITY_MONTHS: u32 = 12;

/// Which leg of the binary tree a member hangs from, relative to the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    pub fn parse(s: &str) -> Option<Side> {
        match s {
            "left" => Some(Side::Left),
            "right" => Some(Side::Right),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A member's position in the placement tree. Written once at signup,
/// never re-parented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlacementEdge {
    pub member_id: MemberId,
    /// Tree parent. None only for the platform root.
    pub parent_id: Option<MemberId>,
    /// Side relative to the parent. None only for the platform root.
    pub side: Option<Side>,
    /// Root = 0
    pub depth: u32,
}

impl PlacementEdge {
    pub fn root(member_id: MemberId) -> Self {
        Self {
            member_id,
            parent_id: None,
            side: None,
            depth: 0,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Cached per-member subtree counters. Maintained incrementally by
/// placement and BV commits; corrected by the expiry sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SubtreeAggregate {
    pub direct_count: u32,
    pub left_count: u32,
    pub right_count: u32,
    /// Invariant: total_count == left_count + right_count
    /// (directs are already inside one of the two subtrees).
    pub total_count: u32,
    pub left_bv: Bv,
    pub right_bv: Bv,
    pub updated_at: DateTime<Utc>,
}

impl SubtreeAggregate {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            direct_count: 0,
            left_count: 0,
            right_count: 0,
            total_count: 0,
            left_bv: 0,
            right_bv: 0,
            updated_at: now,
        }
    }

    /// Binary plans pay on the weaker leg.
    pub fn balanced_bv(&self) -> Bv {
        self.left_bv.min(self.right_bv)
    }
}

/// One BV credit in the ledger. Immutable; expires out of eligibility
/// totals after [`BV_VALIDITY_MONTHS`].
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BvEntry {
    pub id: Uuid,
    /// Member who receives the credit
    pub member_id: MemberId,
    /// Member whose purchase/referral produced it
    pub source_id: MemberId,
    pub amount: Bv,
    pub credited_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set once the sweep has subtracted this entry from cached totals
    pub swept: bool,
}

impl BvEntry {
    pub fn new(member_id: MemberId, source_id: MemberId, amount: Bv, now: DateTime<Utc>) -> Self {
        let expires_at = now
            .checked_add_months(Months::new(BV_VALIDITY_MONTHS))
            .unwrap_or(now + chrono::Duration::days(365));
        Self {
            id: Uuid::new_v4(),
            member_id,
            source_id,
            amount,
            credited_at: now,
            expires_at,
            swept: false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
