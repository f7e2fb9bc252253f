//! Referral network and compensation model.
//!
//! - [`store`] - placement/aggregate/ledger storage seam (Pg + in-memory)
//! - [`placement`] - binary-tree placement with strict and spillover policies
//! - [`volume`] - BV crediting up the ancestor chain, expiry sweep
//! - [`eligibility`] - salary-slab and referral-level tables
//! - [`tree`] - read-only, depth-limited interactive tree rendering

pub mod eligibility;
pub mod error;
pub mod model;
pub mod pg_store;
pub mod placement;
pub mod store;
pub mod tree;
pub mod volume;

pub use eligibility::{
    DEFAULT_REFERRAL_SCALE, DEFAULT_SALARY_SCALE, ReferralLevel, ReferralScale, SalaryScale,
    SalarySlab, SalaryStanding,
};
pub use error::NetworkError;
pub use model::{BV_VALIDITY_MONTHS, BvEntry, PlacementEdge, Side, SubtreeAggregate};
pub use pg_store::PgNetworkStore;
pub use placement::{MAX_WALK_DEPTH, PlacementPolicy, PlacementService, ancestor_chain};
pub use store::{MemoryNetworkStore, NetworkStore};
pub use tree::{MAX_RENDER_DEPTH, TreeNode, TreePresenter};
pub use volume::{BvSummary, VolumeService};
