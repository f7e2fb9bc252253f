//! Interactive view over the placement tree.
//!
//! Strictly read-only: the presenter only ever calls `placement`/`child`
//! on the store. Children of a collapsed node are not fetched at all, and
//! rendering stops ten levels below the requested root.

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use std::collections::HashSet;
use utoipa::ToSchema;

use crate::core_types::MemberId;
use crate::network::error::NetworkError;
use crate::network::model::Side;
use crate::network::store::NetworkStore;

/// How many levels below the requested root are ever rendered.
pub const MAX_RENDER_DEPTH: u32 = 10;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TreeNode {
    pub member_id: MemberId,
    /// Depth relative to the render root (root = 0)
    pub depth: u32,
    pub side: Option<Side>,
    pub expanded: bool,
    #[schema(no_recursion)]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Nodes in this rendering, including the root.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::count).sum::<usize>()
    }

    /// Every member id in this rendering, preorder.
    pub fn ids(&self) -> Vec<MemberId> {
        let mut out = Vec::with_capacity(self.count());
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids(&self, out: &mut Vec<MemberId>) {
        out.push(self.member_id);
        for child in &self.children {
            child.collect_ids(out);
        }
    }
}

/// Flip one node between collapsed and expanded.
pub fn toggle(expanded: &mut HashSet<MemberId>, member: MemberId) {
    if !expanded.remove(&member) {
        expanded.insert(member);
    }
}

pub struct TreePresenter<'a> {
    store: &'a dyn NetworkStore,
}

impl<'a> TreePresenter<'a> {
    pub fn new(store: &'a dyn NetworkStore) -> Self {
        Self { store }
    }

    /// Render the subtree under `root`. The root is always expanded;
    /// every other node is expanded iff its id is in `expanded`.
    pub async fn render(
        &self,
        root: MemberId,
        expanded: &HashSet<MemberId>,
    ) -> Result<TreeNode, NetworkError> {
        if self.store.placement(root).await?.is_none() {
            return Err(NetworkError::MemberNotFound(root));
        }
        render_node(self.store, root, 0, None, true, expanded).await
    }
}

fn render_node<'s>(
    store: &'s dyn NetworkStore,
    member: MemberId,
    depth: u32,
    side: Option<Side>,
    is_root: bool,
    expanded: &'s HashSet<MemberId>,
) -> BoxFuture<'s, Result<TreeNode, NetworkError>> {
    async move {
        let open = is_root || expanded.contains(&member);
        let mut children = Vec::new();
        if open && depth < MAX_RENDER_DEPTH {
            for child_side in [Side::Left, Side::Right] {
                if let Some(child) = store.child(member, child_side).await? {
                    children.push(
                        render_node(store, child, depth + 1, Some(child_side), false, expanded)
                            .await?,
                    );
                }
            }
        }
        Ok(TreeNode {
            member_id: member,
            depth,
            side,
            expanded: open,
            children,
        })
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::placement::{PlacementPolicy, PlacementService};
    use crate::network::store::MemoryNetworkStore;
    use std::sync::Arc;

    /// root(1) with left child 2 (children 4, 5) and right child 3
    async fn sample_store() -> Arc<MemoryNetworkStore> {
        let store = Arc::new(MemoryNetworkStore::new());
        let placement = PlacementService::new(store.clone(), PlacementPolicy::Strict);
        placement.bootstrap_root(1).await.unwrap();
        placement.place_member(2, 1, Side::Left).await.unwrap();
        placement.place_member(3, 1, Side::Right).await.unwrap();
        placement.place_member(4, 2, Side::Left).await.unwrap();
        placement.place_member(5, 2, Side::Right).await.unwrap();
        store
    }

    #[tokio::test]
    async fn root_renders_expanded_with_direct_children() {
        let store = sample_store().await;
        let presenter = TreePresenter::new(store.as_ref());

        let tree = presenter.render(1, &HashSet::new()).await.unwrap();
        assert!(tree.expanded);
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].side, Some(Side::Left));
        assert_eq!(tree.children[1].side, Some(Side::Right));

        // Node 2 is collapsed, so its children were not fetched.
        assert!(!tree.children[0].expanded);
        assert!(tree.children[0].children.is_empty());
        assert_eq!(tree.count(), 3);
    }

    #[tokio::test]
    async fn expanding_a_node_reveals_its_children() {
        let store = sample_store().await;
        let presenter = TreePresenter::new(store.as_ref());

        let mut expanded = HashSet::new();
        toggle(&mut expanded, 2);

        let tree = presenter.render(1, &expanded).await.unwrap();
        let node2 = &tree.children[0];
        assert!(node2.expanded);
        assert_eq!(node2.children.len(), 2);
        assert_eq!(tree.count(), 5);
    }

    #[tokio::test]
    async fn toggle_flips_state_both_ways() {
        let mut expanded = HashSet::new();
        toggle(&mut expanded, 2);
        assert!(expanded.contains(&2));
        toggle(&mut expanded, 2);
        assert!(!expanded.contains(&2));
    }

    #[tokio::test]
    async fn render_depth_is_capped() {
        let store = Arc::new(MemoryNetworkStore::new());
        let placement = PlacementService::new(store.clone(), PlacementPolicy::Strict);
        placement.bootstrap_root(1).await.unwrap();
        // Chain of 14 members down the left leg
        let mut expanded = HashSet::new();
        for i in 2..=15 {
            placement.place_member(i, i - 1, Side::Left).await.unwrap();
            expanded.insert(i);
        }

        let presenter = TreePresenter::new(store.as_ref());
        let tree = presenter.render(1, &expanded).await.unwrap();

        // Root plus MAX_RENDER_DEPTH levels, nothing deeper.
        assert_eq!(tree.count() as u32, MAX_RENDER_DEPTH + 1);
    }

    #[tokio::test]
    async fn unknown_root_is_rejected() {
        let store = sample_store().await;
        let presenter = TreePresenter::new(store.as_ref());
        let err = presenter.render(42, &HashSet::new()).await.unwrap_err();
        assert!(matches!(err, NetworkError::MemberNotFound(42)));
    }
}
