//! Core types used throughout the system
//!
//! These are fundamental type aliases used by all modules.
//! They provide semantic meaning and enable future type evolution.

/// Member ID - globally unique, immutable after assignment.
///
/// # Usage:
/// - Primary key for member profiles, wallets and placements
/// - Matches the BIGSERIAL `members.id` column
pub type MemberId = i64;

/// Business Volume - a point quantity credited by purchases and referrals.
///
/// # Constraints:
/// - **Non-negative**: no fractional or negative BV exists anywhere in the plan
/// - **64-bit**: subtree sums must not overflow realistic ranges
pub type Bv = i64;

/// Referral level number (1-based) in the commission plan
pub type LevelNo = u8;
