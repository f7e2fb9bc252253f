//! QA scenarios for the placement network and compensation model,
//! exercised end-to-end against the in-memory store.

use std::collections::HashSet;
use std::sync::Arc;

use apexunity::network::eligibility::{DEFAULT_SALARY_SCALE, SalaryScale, SalarySlab};
use apexunity::network::model::Side;
use apexunity::network::placement::{PlacementPolicy, PlacementService};
use apexunity::network::store::MemoryNetworkStore;
use apexunity::network::tree::TreePresenter;
use apexunity::network::volume::VolumeService;
use apexunity::network::{NetworkError, NetworkStore};

/// Helper: fresh store + services with the given placement policy
fn services(policy: PlacementPolicy) -> (Arc<MemoryNetworkStore>, PlacementService, VolumeService) {
    let store = Arc::new(MemoryNetworkStore::new());
    let placement = PlacementService::new(store.clone(), policy);
    let volume = VolumeService::new(store.clone());
    (store, placement, volume)
}

#[tokio::test]
async fn qa_tc_placement_round_trip() {
    let (_store, placement, _volume) = services(PlacementPolicy::Strict);
    placement.bootstrap_root(1).await.unwrap();
    placement.place_member(2, 1, Side::Left).await.unwrap();

    let edge = placement.get_placement(2).await.unwrap();
    assert_eq!(edge.parent_id, Some(1));
    assert_eq!(edge.side, Some(Side::Left));
    assert_eq!(edge.depth, 1);
}

#[tokio::test]
async fn qa_tc_side_determines_which_counters_move() {
    let (_store, placement, volume) = services(PlacementPolicy::Strict);
    placement.bootstrap_root(1).await.unwrap();
    placement.place_member(2, 1, Side::Left).await.unwrap();
    placement.place_member(3, 1, Side::Right).await.unwrap();

    // Counters move on the side each member hangs from.
    let agg = placement.get_aggregate(1).await.unwrap();
    assert_eq!(agg.left_count, 1);
    assert_eq!(agg.right_count, 1);
    assert_eq!(agg.total_count, 2);
    assert_eq!(agg.direct_count, 2);

    // BV does the same.
    volume.credit_bv(2, 500, 2).await.unwrap();
    volume.credit_bv(3, 300, 3).await.unwrap();
    let agg = placement.get_aggregate(1).await.unwrap();
    assert_eq!(agg.left_bv, 500);
    assert_eq!(agg.right_bv, 300);
}

#[tokio::test]
async fn qa_tc_credit_three_levels_deep_touches_each_ancestor_exactly_once() {
    let (_store, placement, volume) = services(PlacementPolicy::Strict);
    placement.bootstrap_root(1).await.unwrap();
    placement.place_member(2, 1, Side::Right).await.unwrap();
    placement.place_member(3, 2, Side::Left).await.unwrap();
    placement.place_member(4, 3, Side::Left).await.unwrap();

    volume.credit_bv(4, 1000, 4).await.unwrap();

    for ancestor in [1i64, 2, 3] {
        let agg = placement.get_aggregate(ancestor).await.unwrap();
        assert_eq!(
            agg.left_bv + agg.right_bv,
            1000,
            "ancestor {ancestor} must gain exactly 1000"
        );
    }
    // The credited member's own subtree totals stay zero.
    let own = placement.get_aggregate(4).await.unwrap();
    assert_eq!(own.left_bv + own.right_bv, 0);
}

#[tokio::test]
async fn qa_tc_member_with_no_downline_has_zero_balanced_bv() {
    let (_store, placement, volume) = services(PlacementPolicy::Strict);
    placement.bootstrap_root(1).await.unwrap();
    placement.place_member(2, 1, Side::Left).await.unwrap();

    let summary = volume.bv_summary(2).await.unwrap();
    assert_eq!(summary.left, 0);
    assert_eq!(summary.right, 0);
    assert_eq!(summary.balanced, 0);

    // Only a zero-threshold slab would be reachable at balanced 0; the
    // default plan starts at 10K, so no slab is current.
    let standing = DEFAULT_SALARY_SCALE.evaluate(summary.balanced);
    assert!(standing.current.is_none());
}

#[tokio::test]
async fn qa_tc_salary_scenario_58k_against_three_slab_table() {
    // Table from the compensation scenario: 0 / 25K / 60K thresholds.
    let scale = SalaryScale::new(vec![
        SalarySlab {
            level: 1,
            threshold: 0,
            monthly_pay: 250,
        },
        SalarySlab {
            level: 2,
            threshold: 25_000,
            monthly_pay: 500,
        },
        SalarySlab {
            level: 3,
            threshold: 60_000,
            monthly_pay: 1_000,
        },
    ])
    .unwrap();

    let standing = scale.evaluate(58_000);
    assert_eq!(standing.current_index, Some(1));
    assert_eq!(standing.current.unwrap().monthly_pay, 500);
    assert_eq!(standing.next.unwrap().threshold, 60_000);
    assert!((standing.progress_percent - 96.666_666).abs() < 0.001);
}

#[tokio::test]
async fn qa_tc_salary_evaluation_is_pure_and_monotonic() {
    let mut previous = -1isize;
    for bv in (0..=200_000).step_by(10_000) {
        let a = DEFAULT_SALARY_SCALE.evaluate(bv);
        let b = DEFAULT_SALARY_SCALE.evaluate(bv);
        assert_eq!(a, b, "evaluation must be idempotent at bv={bv}");

        let idx = a.current_index.map(|i| i as isize).unwrap_or(-1);
        assert!(idx >= previous, "slab index must not regress at bv={bv}");
        previous = idx;
    }
}

#[tokio::test]
async fn qa_tc_balanced_bv_follows_weaker_leg_end_to_end() {
    let (_store, placement, volume) = services(PlacementPolicy::Strict);
    placement.bootstrap_root(1).await.unwrap();
    placement.place_member(2, 1, Side::Left).await.unwrap();
    placement.place_member(3, 1, Side::Right).await.unwrap();

    volume.credit_bv(2, 62_000, 2).await.unwrap();
    volume.credit_bv(3, 58_000, 3).await.unwrap();

    let summary = volume.bv_summary(1).await.unwrap();
    assert_eq!(summary.balanced, 58_000);

    // 58K balanced sits on the 50K-50K slab of the default plan,
    // progressing toward 100K-100K.
    let standing = DEFAULT_SALARY_SCALE.evaluate(summary.balanced);
    assert_eq!(standing.current.unwrap().monthly_pay, 1_000);
    assert_eq!(standing.next.unwrap().threshold, 100_000);
    assert!((standing.progress_percent - 58.0).abs() < 0.001);
}

#[tokio::test]
async fn qa_tc_spillover_fills_the_chosen_leg_breadth_first() {
    let (_store, placement, _volume) = services(PlacementPolicy::Spillover);
    placement.bootstrap_root(1).await.unwrap();

    // Five members, all sponsored by the root on the left leg.
    for id in 2..=6 {
        placement.place_member(id, 1, Side::Left).await.unwrap();
    }

    // 2 takes the direct slot; 3 and 4 fill 2's slots; 5 and 6 go a
    // level deeper under 3 (shallowest-first, left-first).
    assert_eq!(placement.get_placement(2).await.unwrap().parent_id, Some(1));
    assert_eq!(placement.get_placement(3).await.unwrap().parent_id, Some(2));
    assert_eq!(placement.get_placement(4).await.unwrap().parent_id, Some(2));
    assert_eq!(placement.get_placement(5).await.unwrap().parent_id, Some(3));
    assert_eq!(placement.get_placement(6).await.unwrap().parent_id, Some(3));

    // Everyone still counts toward the root's left leg and direct team.
    let agg = placement.get_aggregate(1).await.unwrap();
    assert_eq!(agg.left_count, 5);
    assert_eq!(agg.right_count, 0);
    assert_eq!(agg.direct_count, 5);
}

#[tokio::test]
async fn qa_tc_expired_bv_stops_counting() {
    let (_store, placement, volume) = services(PlacementPolicy::Strict);
    placement.bootstrap_root(1).await.unwrap();
    placement.place_member(2, 1, Side::Left).await.unwrap();
    placement.place_member(3, 1, Side::Right).await.unwrap();

    volume.credit_bv(2, 30_000, 2).await.unwrap();
    volume.credit_bv(3, 30_000, 3).await.unwrap();
    assert_eq!(volume.bv_summary(1).await.unwrap().balanced, 30_000);

    // 13 months later both credits lapse; the sweep runs on read.
    let later = chrono::Utc::now() + chrono::Duration::days(400);
    volume.sweep_expired(later).await.unwrap();
    let summary = volume.bv_summary(1).await.unwrap();
    assert_eq!(summary.left, 0);
    assert_eq!(summary.right, 0);
    assert_eq!(summary.balanced, 0);
}

#[tokio::test]
async fn qa_tc_tree_renders_collapsed_by_default_and_expands_on_toggle() {
    let (store, placement, _volume) = services(PlacementPolicy::Strict);
    placement.bootstrap_root(1).await.unwrap();
    placement.place_member(2, 1, Side::Left).await.unwrap();
    placement.place_member(3, 1, Side::Right).await.unwrap();
    placement.place_member(4, 2, Side::Left).await.unwrap();

    let presenter = TreePresenter::new(store.as_ref());

    // Collapsed: root + two children, grandchild hidden.
    let tree = presenter.render(1, &HashSet::new()).await.unwrap();
    assert_eq!(tree.count(), 3);

    // Expanding node 2 reveals the grandchild.
    let expanded: HashSet<i64> = [2].into_iter().collect();
    let tree = presenter.render(1, &expanded).await.unwrap();
    assert_eq!(tree.count(), 4);

    // Rendering never mutates the store.
    let agg = placement.get_aggregate(1).await.unwrap();
    assert_eq!(agg.total_count, 3);
}

#[tokio::test]
async fn qa_tc_corrupt_chain_fails_instead_of_looping() {
    use apexunity::network::model::PlacementEdge;

    let (store, placement, volume) = services(PlacementPolicy::Strict);
    placement.bootstrap_root(1).await.unwrap();
    placement.place_member(2, 1, Side::Left).await.unwrap();
    placement.place_member(3, 2, Side::Left).await.unwrap();

    // Corrupt: 2 now descends from 3, forming a cycle.
    store.force_edge(PlacementEdge {
        member_id: 2,
        parent_id: Some(3),
        side: Some(Side::Left),
        depth: 3,
    });

    let err = volume.credit_bv(3, 100, 3).await.unwrap_err();
    assert!(matches!(err, NetworkError::CorruptTree { .. }));

    // Nothing was written for the failed credit.
    assert_eq!(store.own_bv(3).await.unwrap(), 0);
}
