//! Business-volume accumulation up the placement tree.
//!
//! Every purchase/referral credit lands once in the ledger and adds its
//! amount to the matching leg total of every ancestor. Expiry is handled
//! by an on-read sweep that subtracts lapsed entries from the same cached
//! totals, so the counters and the ledger agree at read time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::core_types::{Bv, MemberId};
use crate::network::error::NetworkError;
use crate::network::model::BvEntry;
use crate::network::placement::ancestor_chain;
use crate::network::store::NetworkStore;

/// Point-in-time BV standing for one member.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct BvSummary {
    /// Active BV credited directly to this member
    pub own: Bv,
    pub left: Bv,
    pub right: Bv,
    /// min(left, right) - the leg binary plans pay on
    pub balanced: Bv,
}

pub struct VolumeService {
    store: Arc<dyn NetworkStore>,
}

impl VolumeService {
    pub fn new(store: Arc<dyn NetworkStore>) -> Self {
        Self { store }
    }

    /// Credit `amount` BV to `member` and propagate it to every ancestor's
    /// leg total. The ancestor chain is validated before anything is
    /// written, so a corrupt tree fails cleanly with no partial update.
    pub async fn credit_bv(
        &self,
        member: MemberId,
        amount: Bv,
        source: MemberId,
    ) -> Result<BvEntry, NetworkError> {
        if amount <= 0 {
            return Err(NetworkError::InvalidAmount(amount));
        }

        let ancestors = ancestor_chain(self.store.as_ref(), member).await?;
        let entry = BvEntry::new(member, source, amount, Utc::now());
        self.store.commit_credit(&entry, &ancestors).await?;

        tracing::info!(
            member,
            source,
            amount,
            ancestors = ancestors.len(),
            "BV credited"
        );
        Ok(entry)
    }

    /// Subtract every lapsed, not-yet-swept entry from its destination and
    /// ancestor totals. Returns how many entries were swept.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u32, NetworkError> {
        let lapsed = self.store.unswept_expired(now).await?;
        let mut swept = 0u32;
        for entry in &lapsed {
            let ancestors = ancestor_chain(self.store.as_ref(), entry.member_id).await?;
            self.store.commit_sweep(entry, &ancestors).await?;
            swept += 1;
        }
        if swept > 0 {
            tracing::info!(swept, "expired BV entries swept from totals");
        }
        Ok(swept)
    }

    /// Current standing, after sweeping anything that lapsed since the
    /// last read. Never serves totals that still contain expired BV.
    pub async fn bv_summary(&self, member: MemberId) -> Result<BvSummary, NetworkError> {
        self.sweep_expired(Utc::now()).await?;

        let agg = self
            .store
            .aggregate(member)
            .await?
            .ok_or(NetworkError::MemberNotFound(member))?;
        let own = self.store.own_bv(member).await?;

        Ok(BvSummary {
            own,
            left: agg.left_bv,
            right: agg.right_bv,
            balanced: agg.balanced_bv(),
        })
    }

    /// Ledger entries credited to `member`, newest first.
    pub async fn history(&self, member: MemberId) -> Result<Vec<BvEntry>, NetworkError> {
        self.store.entries_for(member).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::model::Side;
    use crate::network::placement::{PlacementPolicy, PlacementService};
    use crate::network::store::{MemoryNetworkStore, active_total};

    /// root(1) -> 2 on left -> 3 on right -> 4 on left
    async fn three_deep() -> (Arc<MemoryNetworkStore>, PlacementService, VolumeService) {
        let store = Arc::new(MemoryNetworkStore::new());
        let placement = PlacementService::new(store.clone(), PlacementPolicy::Strict);
        let volume = VolumeService::new(store.clone());
        placement.bootstrap_root(1).await.unwrap();
        placement.place_member(2, 1, Side::Left).await.unwrap();
        placement.place_member(3, 2, Side::Right).await.unwrap();
        placement.place_member(4, 3, Side::Left).await.unwrap();
        (store, placement, volume)
    }

    #[tokio::test]
    async fn credit_reaches_every_ancestor_once() {
        let (_store, placement, volume) = three_deep().await;
        volume.credit_bv(4, 1000, 4).await.unwrap();

        // Each of the 3 ancestors gains exactly 1000 on the leg 4 hangs from.
        let a3 = placement.get_aggregate(3).await.unwrap();
        assert_eq!((a3.left_bv, a3.right_bv), (1000, 0));
        let a2 = placement.get_aggregate(2).await.unwrap();
        assert_eq!((a2.left_bv, a2.right_bv), (0, 1000));
        let a1 = placement.get_aggregate(1).await.unwrap();
        assert_eq!((a1.left_bv, a1.right_bv), (1000, 0));

        // The credited member's own subtree totals stay untouched.
        let a4 = placement.get_aggregate(4).await.unwrap();
        assert_eq!((a4.left_bv, a4.right_bv), (0, 0));
    }

    #[tokio::test]
    async fn own_bv_tracks_destination_not_ancestors() {
        let (store, _placement, volume) = three_deep().await;
        volume.credit_bv(4, 750, 2).await.unwrap();

        assert_eq!(store.own_bv(4).await.unwrap(), 750);
        assert_eq!(store.own_bv(3).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn zero_or_negative_amounts_are_rejected() {
        let (_store, _placement, volume) = three_deep().await;
        assert!(matches!(
            volume.credit_bv(4, 0, 4).await.unwrap_err(),
            NetworkError::InvalidAmount(0)
        ));
        assert!(matches!(
            volume.credit_bv(4, -5, 4).await.unwrap_err(),
            NetworkError::InvalidAmount(-5)
        ));
    }

    #[tokio::test]
    async fn empty_subtrees_mean_zero_balanced() {
        let (_store, _placement, volume) = three_deep().await;
        let summary = volume.bv_summary(4).await.unwrap();
        assert_eq!(summary.left, 0);
        assert_eq!(summary.right, 0);
        assert_eq!(summary.balanced, 0);
    }

    #[tokio::test]
    async fn balanced_is_min_of_legs() {
        let store = Arc::new(MemoryNetworkStore::new());
        let placement = PlacementService::new(store.clone(), PlacementPolicy::Strict);
        let volume = VolumeService::new(store.clone());
        placement.bootstrap_root(1).await.unwrap();
        placement.place_member(2, 1, Side::Left).await.unwrap();
        placement.place_member(3, 1, Side::Right).await.unwrap();

        volume.credit_bv(2, 62_000, 2).await.unwrap();
        volume.credit_bv(3, 58_000, 3).await.unwrap();

        let summary = volume.bv_summary(1).await.unwrap();
        assert_eq!(summary.left, 62_000);
        assert_eq!(summary.right, 58_000);
        assert_eq!(summary.balanced, 58_000);
    }

    #[tokio::test]
    async fn sweep_subtracts_lapsed_entries_from_ancestors() {
        let (store, placement, volume) = three_deep().await;
        volume.credit_bv(4, 1000, 4).await.unwrap();
        volume.credit_bv(4, 300, 4).await.unwrap();

        // Nothing has lapsed yet.
        assert_eq!(volume.sweep_expired(Utc::now()).await.unwrap(), 0);

        // Both entries lapse 13 months out; totals drop back to zero.
        let later = Utc::now() + chrono::Duration::days(400);
        assert_eq!(volume.sweep_expired(later).await.unwrap(), 2);

        let a1 = placement.get_aggregate(1).await.unwrap();
        assert_eq!(a1.left_bv, 0);
        assert_eq!(store.own_bv(4).await.unwrap(), 0);

        // A second sweep finds nothing; deltas never apply twice.
        assert_eq!(volume.sweep_expired(later).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ledger_matches_cached_totals() {
        let (store, _placement, volume) = three_deep().await;
        volume.credit_bv(4, 400, 4).await.unwrap();
        volume.credit_bv(4, 600, 4).await.unwrap();

        let entries = store.entries_for(4).await.unwrap();
        assert_eq!(active_total(&entries, Utc::now()), 1000);
        assert_eq!(store.own_bv(4).await.unwrap(), 1000);
    }
}
