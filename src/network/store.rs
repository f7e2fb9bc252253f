//! Storage seam for the placement network.
//!
//! The gateway runs against [`PgNetworkStore`](crate::network::pg_store::PgNetworkStore);
//! tests and simulation mode run against [`MemoryNetworkStore`]. Commit
//! methods are atomic: either the edge/entry and every ancestor delta land,
//! or nothing does.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::core_types::{Bv, MemberId};
use crate::network::error::NetworkError;
use crate::network::model::{BvEntry, PlacementEdge, Side, SubtreeAggregate};

#[async_trait]
pub trait NetworkStore: Send + Sync {
    async fn placement(&self, member: MemberId) -> Result<Option<PlacementEdge>, NetworkError>;

    async fn aggregate(&self, member: MemberId) -> Result<Option<SubtreeAggregate>, NetworkError>;

    /// Direct child occupying `side` under `parent`, if any.
    async fn child(&self, parent: MemberId, side: Side) -> Result<Option<MemberId>, NetworkError>;

    /// The platform root, if one has been installed.
    async fn root(&self) -> Result<Option<MemberId>, NetworkError>;

    /// Install the platform root (depth 0, no parent).
    async fn commit_root(&self, member: MemberId) -> Result<(), NetworkError>;

    /// Write a new edge, bump the referrer's direct count and apply one
    /// left/right/total count increment per `(ancestor, side)` pair.
    async fn commit_placement(
        &self,
        edge: &PlacementEdge,
        referrer: MemberId,
        ancestors: &[(MemberId, Side)],
    ) -> Result<(), NetworkError>;

    /// Append a ledger entry, credit the destination's own BV and add the
    /// amount to each ancestor's side total.
    async fn commit_credit(
        &self,
        entry: &BvEntry,
        ancestors: &[(MemberId, Side)],
    ) -> Result<(), NetworkError>;

    /// Ledger entries credited to `member`, newest first.
    async fn entries_for(&self, member: MemberId) -> Result<Vec<BvEntry>, NetworkError>;

    /// Entries past their expiry that the sweep has not yet subtracted.
    async fn unswept_expired(&self, now: DateTime<Utc>) -> Result<Vec<BvEntry>, NetworkError>;

    /// Mark one entry swept and subtract its amount from the destination's
    /// own BV and each ancestor's side total.
    async fn commit_sweep(
        &self,
        entry: &BvEntry,
        ancestors: &[(MemberId, Side)],
    ) -> Result<(), NetworkError>;

    /// Destination-side active BV total for one member.
    async fn own_bv(&self, member: MemberId) -> Result<Bv, NetworkError>;
}

#[derive(Default)]
struct MemoryInner {
    edges: HashMap<MemberId, PlacementEdge>,
    aggregates: HashMap<MemberId, SubtreeAggregate>,
    children: HashMap<(MemberId, Side), MemberId>,
    entries: Vec<BvEntry>,
    own_bv: HashMap<MemberId, Bv>,
}

/// In-memory store used by tests and simulation mode.
#[derive(Default)]
pub struct MemoryNetworkStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryNetworkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: rewrite one edge in place, bypassing immutability.
    /// Lets corruption scenarios (cycles) be constructed deliberately.
    #[doc(hidden)]
    pub fn force_edge(&self, edge: PlacementEdge) {
        let mut inner = self.inner.lock().unwrap();
        if let (Some(parent), Some(side)) = (edge.parent_id, edge.side) {
            inner.children.insert((parent, side), edge.member_id);
        }
        inner.edges.insert(edge.member_id, edge);
    }
}

#[async_trait]
impl NetworkStore for MemoryNetworkStore {
    async fn placement(&self, member: MemberId) -> Result<Option<PlacementEdge>, NetworkError> {
        Ok(self.inner.lock().unwrap().edges.get(&member).copied())
    }

    async fn aggregate(&self, member: MemberId) -> Result<Option<SubtreeAggregate>, NetworkError> {
        Ok(self.inner.lock().unwrap().aggregates.get(&member).copied())
    }

    async fn child(&self, parent: MemberId, side: Side) -> Result<Option<MemberId>, NetworkError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .children
            .get(&(parent, side))
            .copied())
    }

    async fn root(&self) -> Result<Option<MemberId>, NetworkError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .edges
            .values()
            .find(|e| e.is_root())
            .map(|e| e.member_id))
    }

    async fn commit_root(&self, member: MemberId) -> Result<(), NetworkError> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        inner.edges.insert(member, PlacementEdge::root(member));
        inner.aggregates.insert(member, SubtreeAggregate::empty(now));
        inner.own_bv.entry(member).or_insert(0);
        Ok(())
    }

    async fn commit_placement(
        &self,
        edge: &PlacementEdge,
        referrer: MemberId,
        ancestors: &[(MemberId, Side)],
    ) -> Result<(), NetworkError> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();

        inner.edges.insert(edge.member_id, *edge);
        if let (Some(parent), Some(side)) = (edge.parent_id, edge.side) {
            inner.children.insert((parent, side), edge.member_id);
        }
        inner
            .aggregates
            .insert(edge.member_id, SubtreeAggregate::empty(now));
        inner.own_bv.entry(edge.member_id).or_insert(0);

        let sponsor_agg = inner
            .aggregates
            .entry(referrer)
            .or_insert_with(|| SubtreeAggregate::empty(now));
        sponsor_agg.direct_count += 1;
        sponsor_agg.updated_at = now;

        for &(ancestor, side) in ancestors {
            let agg = inner
                .aggregates
                .entry(ancestor)
                .or_insert_with(|| SubtreeAggregate::empty(now));
            match side {
                Side::Left => agg.left_count += 1,
                Side::Right => agg.right_count += 1,
            }
            agg.total_count += 1;
            agg.updated_at = now;
        }
        Ok(())
    }

    async fn commit_credit(
        &self,
        entry: &BvEntry,
        ancestors: &[(MemberId, Side)],
    ) -> Result<(), NetworkError> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();

        inner.entries.push(entry.clone());
        *inner.own_bv.entry(entry.member_id).or_insert(0) += entry.amount;

        for &(ancestor, side) in ancestors {
            let agg = inner
                .aggregates
                .entry(ancestor)
                .or_insert_with(|| SubtreeAggregate::empty(now));
            match side {
                Side::Left => agg.left_bv += entry.amount,
                Side::Right => agg.right_bv += entry.amount,
            }
            agg.updated_at = now;
        }
        Ok(())
    }

    async fn entries_for(&self, member: MemberId) -> Result<Vec<BvEntry>, NetworkError> {
        let inner = self.inner.lock().unwrap();
        let mut out: Vec<BvEntry> = inner
            .entries
            .iter()
            .filter(|e| e.member_id == member)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.credited_at.cmp(&a.credited_at));
        Ok(out)
    }

    async fn unswept_expired(&self, now: DateTime<Utc>) -> Result<Vec<BvEntry>, NetworkError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .entries
            .iter()
            .filter(|e| !e.swept && e.is_expired(now))
            .cloned()
            .collect())
    }

    async fn commit_sweep(
        &self,
        entry: &BvEntry,
        ancestors: &[(MemberId, Side)],
    ) -> Result<(), NetworkError> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();

        let Some(stored) = inner
            .entries
            .iter_mut()
            .find(|e| e.id == entry.id && !e.swept)
        else {
            // Another sweep got here first; deltas must not apply twice.
            return Ok(());
        };
        stored.swept = true;
        let amount = stored.amount;
        let member = stored.member_id;

        *inner.own_bv.entry(member).or_insert(0) -= amount;
        for &(ancestor, side) in ancestors {
            let agg = inner
                .aggregates
                .entry(ancestor)
                .or_insert_with(|| SubtreeAggregate::empty(now));
            match side {
                Side::Left => agg.left_bv -= amount,
                Side::Right => agg.right_bv -= amount,
            }
            agg.updated_at = now;
        }
        Ok(())
    }

    async fn own_bv(&self, member: MemberId) -> Result<Bv, NetworkError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .own_bv
            .get(&member)
            .copied()
            .unwrap_or(0))
    }
}

/// Sum of active (non-expired) entry amounts, recomputed from the ledger.
/// Used by tests to cross-check the cached counters.
pub fn active_total(entries: &[BvEntry], now: DateTime<Utc>) -> Bv {
    entries
        .iter()
        .filter(|e| !e.is_expired(now))
        .map(|e| e.amount)
        .sum()
}
