//! ApexUnity - Member Platform Backend
//!
//! Binary placement network, BV compensation engine and member wallet API.
//!
//! # Modules
//!
//! - [`core_types`] - Core type aliases (MemberId, Bv, etc.)
//! - [`config`] - YAML configuration per environment
//! - [`db`] - PostgreSQL pool wrapper
//! - [`member`] - Member profiles, wallets, transactions
//! - [`network`] - Placement tree, BV aggregation, eligibility, tree view
//! - [`session`] - Dashboard bootstrap with retry + cached fallback
//! - [`user_auth`] - Registration, login, JWT middleware
//! - [`wallet`] - Transfers, withdrawals, deposits, STK trades
//! - [`shop`] - Product catalogue and purchases
//! - [`support`] - Support tickets and announcements
//! - [`gateway`] - HTTP API (axum)

// Core types - must be first!
pub mod core_types;

pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;
pub mod member;
pub mod network;
pub mod session;
pub mod shop;
pub mod support;
pub mod user_auth;
pub mod wallet;

// Convenient re-exports at crate root
pub use core_types::{Bv, LevelNo, MemberId};
pub use network::{
    BvEntry, BvSummary, MemoryNetworkStore, NetworkError, NetworkStore, PgNetworkStore,
    PlacementEdge, PlacementPolicy, PlacementService, ReferralScale, SalaryScale, Side,
    SubtreeAggregate, TreeNode, TreePresenter, VolumeService,
};
pub use session::{RetryPolicy, Session, SessionManager};
