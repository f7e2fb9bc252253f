//! Placement of new members into the binary tree.
//!
//! A placement is a rare, low-contention insert; the store commits the
//! edge and every ancestor counter delta in one atomic step.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::core_types::MemberId;
use crate::network::error::NetworkError;
use crate::network::model::{PlacementEdge, Side, SubtreeAggregate};
use crate::network::store::NetworkStore;

/// Hard bound on any ancestor/descendant walk. A chain longer than this
/// means the tree has a cycle or a runaway depth and must not be followed.
pub const MAX_WALK_DEPTH: u32 = 64;

/// What to do when the requested direct slot is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlacementPolicy {
    /// Reject with `SlotOccupied`.
    Strict,
    /// Breadth-first search the chosen leg for the shallowest open slot.
    #[default]
    Spillover,
}

pub struct PlacementService {
    store: Arc<dyn NetworkStore>,
    policy: PlacementPolicy,
}

impl PlacementService {
    pub fn new(store: Arc<dyn NetworkStore>, policy: PlacementPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<dyn NetworkStore> {
        &self.store
    }

    /// The platform root, if one has been installed.
    pub async fn root(&self) -> Result<Option<MemberId>, NetworkError> {
        self.store.root().await
    }

    /// Install the platform root. Idempotent: a second call for the same
    /// member is a no-op, a call for a different member fails.
    pub async fn bootstrap_root(&self, member: MemberId) -> Result<PlacementEdge, NetworkError> {
        if let Some(existing) = self.store.placement(member).await? {
            if existing.is_root() {
                return Ok(existing);
            }
            return Err(NetworkError::AlreadyPlaced(member));
        }
        self.store.commit_root(member).await?;
        Ok(PlacementEdge::root(member))
    }

    /// Place `new_member` under `sponsor` on `side`.
    ///
    /// The sponsor always receives the direct-referral credit; under
    /// spillover the tree parent may be a deeper member of the sponsor's
    /// chosen leg.
    pub async fn place_member(
        &self,
        new_member: MemberId,
        sponsor: MemberId,
        side: Side,
    ) -> Result<PlacementEdge, NetworkError> {
        if self.store.placement(new_member).await?.is_some() {
            return Err(NetworkError::AlreadyPlaced(new_member));
        }
        if self.store.placement(sponsor).await?.is_none() {
            return Err(NetworkError::SponsorNotFound(sponsor));
        }

        let (parent, slot_side) = self.find_open_slot(sponsor, side).await?;
        let parent_edge = self
            .store
            .placement(parent)
            .await?
            .ok_or(NetworkError::MemberNotFound(parent))?;

        let edge = PlacementEdge {
            member_id: new_member,
            parent_id: Some(parent),
            side: Some(slot_side),
            depth: parent_edge.depth + 1,
        };

        // Count deltas flow up from the parent; the walk is verified
        // bounded before anything is written.
        let mut ancestors = vec![(parent, slot_side)];
        ancestors.extend(ancestor_chain(self.store.as_ref(), parent).await?);

        self.store
            .commit_placement(&edge, sponsor, &ancestors)
            .await?;

        tracing::info!(
            member = new_member,
            sponsor,
            parent,
            side = %slot_side,
            depth = edge.depth,
            "member placed"
        );
        Ok(edge)
    }

    pub async fn get_placement(&self, member: MemberId) -> Result<PlacementEdge, NetworkError> {
        self.store
            .placement(member)
            .await?
            .ok_or(NetworkError::MemberNotFound(member))
    }

    pub async fn get_aggregate(&self, member: MemberId) -> Result<SubtreeAggregate, NetworkError> {
        self.store
            .aggregate(member)
            .await?
            .ok_or(NetworkError::MemberNotFound(member))
    }

    async fn find_open_slot(
        &self,
        sponsor: MemberId,
        side: Side,
    ) -> Result<(MemberId, Side), NetworkError> {
        let occupant = match self.store.child(sponsor, side).await? {
            None => return Ok((sponsor, side)),
            Some(c) => c,
        };

        if self.policy == PlacementPolicy::Strict {
            return Err(NetworkError::SlotOccupied { sponsor, side });
        }

        // Shallowest open slot in the chosen leg, left slot checked first.
        let mut queue = VecDeque::from([(occupant, 1u32)]);
        while let Some((node, depth)) = queue.pop_front() {
            if depth > MAX_WALK_DEPTH {
                return Err(NetworkError::CorruptTree {
                    member: sponsor,
                    depth,
                });
            }
            match self.store.child(node, Side::Left).await? {
                None => return Ok((node, Side::Left)),
                Some(l) => queue.push_back((l, depth + 1)),
            }
            match self.store.child(node, Side::Right).await? {
                None => return Ok((node, Side::Right)),
                Some(r) => queue.push_back((r, depth + 1)),
            }
        }
        Err(NetworkError::CorruptTree {
            member: sponsor,
            depth: MAX_WALK_DEPTH,
        })
    }
}

/// Ancestor chain of `member` as `(ancestor, side the member descends from)`
/// pairs, nearest first. Fails `CorruptTree` instead of looping when the
/// chain does not reach a root within [`MAX_WALK_DEPTH`] steps.
pub async fn ancestor_chain(
    store: &dyn NetworkStore,
    member: MemberId,
) -> Result<Vec<(MemberId, Side)>, NetworkError> {
    let mut chain = Vec::new();
    let mut cur = store
        .placement(member)
        .await?
        .ok_or(NetworkError::MemberNotFound(member))?;

    while let (Some(parent), Some(side)) = (cur.parent_id, cur.side) {
        chain.push((parent, side));
        if chain.len() as u32 > MAX_WALK_DEPTH {
            return Err(NetworkError::CorruptTree {
                member,
                depth: MAX_WALK_DEPTH,
            });
        }
        cur = store
            .placement(parent)
            .await?
            .ok_or(NetworkError::MemberNotFound(parent))?;
    }
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::store::MemoryNetworkStore;

    fn service(policy: PlacementPolicy) -> PlacementService {
        PlacementService::new(Arc::new(MemoryNetworkStore::new()), policy)
    }

    #[tokio::test]
    async fn place_then_get_round_trips() {
        let svc = service(PlacementPolicy::Strict);
        svc.bootstrap_root(1).await.unwrap();
        svc.place_member(2, 1, Side::Left).await.unwrap();

        let edge = svc.get_placement(2).await.unwrap();
        assert_eq!(edge.parent_id, Some(1));
        assert_eq!(edge.side, Some(Side::Left));
        assert_eq!(edge.depth, 1);
    }

    #[tokio::test]
    async fn strict_policy_rejects_occupied_slot() {
        let svc = service(PlacementPolicy::Strict);
        svc.bootstrap_root(1).await.unwrap();
        svc.place_member(2, 1, Side::Left).await.unwrap();

        let err = svc.place_member(3, 1, Side::Left).await.unwrap_err();
        assert!(matches!(
            err,
            NetworkError::SlotOccupied {
                sponsor: 1,
                side: Side::Left
            }
        ));
    }

    #[tokio::test]
    async fn spillover_finds_shallowest_open_slot() {
        let svc = service(PlacementPolicy::Spillover);
        svc.bootstrap_root(1).await.unwrap();
        svc.place_member(2, 1, Side::Left).await.unwrap();

        // Left slot of 1 is taken, so 3 spills under 2.
        let edge = svc.place_member(3, 1, Side::Left).await.unwrap();
        assert_eq!(edge.parent_id, Some(2));
        assert_eq!(edge.side, Some(Side::Left));
        assert_eq!(edge.depth, 2);

        // Next spill takes 2's right slot before going deeper.
        let edge = svc.place_member(4, 1, Side::Left).await.unwrap();
        assert_eq!(edge.parent_id, Some(2));
        assert_eq!(edge.side, Some(Side::Right));
    }

    #[tokio::test]
    async fn sponsor_keeps_direct_credit_under_spillover() {
        let svc = service(PlacementPolicy::Spillover);
        svc.bootstrap_root(1).await.unwrap();
        svc.place_member(2, 1, Side::Left).await.unwrap();
        svc.place_member(3, 1, Side::Left).await.unwrap(); // lands under 2

        let root_agg = svc.get_aggregate(1).await.unwrap();
        assert_eq!(root_agg.direct_count, 2);
        assert_eq!(root_agg.left_count, 2);
        assert_eq!(root_agg.total_count, 2);

        // The tree parent of 3 got the subtree count but no direct credit.
        let parent_agg = svc.get_aggregate(2).await.unwrap();
        assert_eq!(parent_agg.direct_count, 0);
        assert_eq!(parent_agg.left_count, 1);
    }

    #[tokio::test]
    async fn unknown_sponsor_is_rejected() {
        let svc = service(PlacementPolicy::Spillover);
        svc.bootstrap_root(1).await.unwrap();
        let err = svc.place_member(2, 99, Side::Right).await.unwrap_err();
        assert!(matches!(err, NetworkError::SponsorNotFound(99)));
    }

    #[tokio::test]
    async fn double_placement_is_rejected() {
        let svc = service(PlacementPolicy::Spillover);
        svc.bootstrap_root(1).await.unwrap();
        svc.place_member(2, 1, Side::Left).await.unwrap();
        let err = svc.place_member(2, 1, Side::Right).await.unwrap_err();
        assert!(matches!(err, NetworkError::AlreadyPlaced(2)));
    }

    #[tokio::test]
    async fn cyclic_chain_fails_corrupt_tree() {
        let store = Arc::new(MemoryNetworkStore::new());
        let svc = PlacementService::new(store.clone(), PlacementPolicy::Spillover);
        svc.bootstrap_root(1).await.unwrap();
        svc.place_member(2, 1, Side::Left).await.unwrap();
        svc.place_member(3, 2, Side::Left).await.unwrap();

        // Corrupt the tree: make 2 descend from 3, closing a cycle.
        store.force_edge(PlacementEdge {
            member_id: 2,
            parent_id: Some(3),
            side: Some(Side::Left),
            depth: 3,
        });

        let err = ancestor_chain(store.as_ref(), 3).await.unwrap_err();
        assert!(matches!(err, NetworkError::CorruptTree { .. }));
    }
}
