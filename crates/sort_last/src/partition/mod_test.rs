use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;

/// Unit cubes laid out along x: cluster `i` spans `[i, i+1]`.
fn row_of_domains(count: usize) -> Vec<Box3> {
  (0..count)
    .map(|i| Box3::new(Vec3::new(i as f32, 0.0, 0.0), Vec3::new(i as f32 + 1.0, 1.0, 1.0)))
    .collect()
}

/// Unit cubes on an `nx * ny * nz` grid.
fn grid_of_domains(nx: usize, ny: usize, nz: usize) -> Vec<Box3> {
  let mut domains = Vec::new();
  for z in 0..nz {
    for y in 0..ny {
      for x in 0..nx {
        let lower = Vec3::new(x as f32, y as f32, z as f32);
        domains.push(Box3::new(lower, lower + Vec3::ONE));
      }
    }
  }
  domains
}

fn random_domains(count: usize, seed: u64) -> Vec<Box3> {
  let mut rng = StdRng::seed_from_u64(seed);
  (0..count)
    .map(|_| {
      let lower = Vec3::new(
        rng.random_range(-50.0..50.0),
        rng.random_range(-50.0..50.0),
        rng.random_range(-50.0..50.0),
      );
      let size = Vec3::new(
        rng.random_range(0.1..5.0),
        rng.random_range(0.1..5.0),
        rng.random_range(0.1..5.0),
      );
      Box3::new(lower, lower + size)
    })
    .collect()
}

/// Every cluster is owned by exactly one rank, and the per-rank lists agree
/// with the cluster records.
fn assert_complete_assignment(partitioner: &Partitioner) {
  let num_clusters = partitioner.clusters().len();
  let mut seen = vec![0usize; num_clusters];
  for rank in 0..partitioner.num_ranks() {
    for &id in partitioner.clusters_of(rank) {
      seen[id] += 1;
      assert_eq!(partitioner.rank_of(id), Some(rank));
      assert!(partitioner.assigned_to(id, rank));
    }
  }
  assert!(
    seen.iter().all(|&count| count == 1),
    "each cluster must be assigned exactly once: {:?}",
    seen
  );
}

// =========================================================================
// Construction
// =========================================================================

#[test]
fn test_zero_ranks_rejected() {
  let result = Partitioner::from_domains(row_of_domains(4), 0);
  assert_eq!(result.unwrap_err(), PartitionError::NoRanks);
}

#[test]
fn test_cluster_ids_must_match_index() {
  let clusters = vec![
    Cluster::new(0, Box3::new(Vec3::ZERO, Vec3::ONE)),
    Cluster::new(5, Box3::new(Vec3::ONE, Vec3::splat(2.0))),
  ];
  let result = Partitioner::new(clusters, 2);
  assert_eq!(
    result.unwrap_err(),
    PartitionError::ClusterIdMismatch { index: 1, id: 5 }
  );
}

#[test]
fn test_unpartitioned_clusters_have_no_rank() {
  let partitioner = Partitioner::from_domains(row_of_domains(3), 2).unwrap();
  assert_eq!(partitioner.rank_of(0), None);
  assert!(partitioner.clusters_of(0).is_empty());
  assert!(partitioner.kd_tree().is_none());
}

// =========================================================================
// Round robin
// =========================================================================

/// N=100, R=4: each rank receives exactly 25 contiguous clusters.
#[test]
fn test_round_robin_even_split() {
  let mut partitioner = Partitioner::from_domains(row_of_domains(100), 4).unwrap();
  partitioner.partition_round_robin();

  for rank in 0..4 {
    let members = partitioner.clusters_of(rank);
    assert_eq!(members.len(), 25, "rank {} cluster count", rank);
    assert_eq!(members[0], rank * 25);
  }
  assert_complete_assignment(&partitioner);
}

#[test]
fn test_round_robin_formula() {
  for num_clusters in 1..40 {
    for num_ranks in 1..12 {
      let mut partitioner =
        Partitioner::from_domains(row_of_domains(num_clusters), num_ranks).unwrap();
      partitioner.partition_round_robin();
      let per_rank = num_clusters.div_ceil(num_ranks);

      for id in 0..num_clusters {
        let rank = round_robin_rank(id, num_clusters, num_ranks);
        assert_eq!(rank, id / per_rank);
        assert!(rank < num_ranks);
        assert_eq!(partitioner.rank_of(id), Some(rank));
      }
      assert_complete_assignment(&partitioner);
    }
  }
}

/// More ranks than clusters: trailing ranks stay empty.
#[test]
fn test_round_robin_more_ranks_than_clusters() {
  let mut partitioner = Partitioner::from_domains(row_of_domains(3), 8).unwrap();
  partitioner.partition_round_robin();

  assert_eq!(partitioner.clusters_of(0), &[0]);
  assert_eq!(partitioner.clusters_of(2), &[2]);
  for rank in 3..8 {
    assert!(partitioner.clusters_of(rank).is_empty());
  }
}

#[test]
fn test_round_robin_no_clusters() {
  let mut partitioner = Partitioner::from_domains(Vec::new(), 3).unwrap();
  partitioner.partition_round_robin();
  assert!((0..3).all(|rank| partitioner.clusters_of(rank).is_empty()));
}

#[test]
fn test_assigned_to_unknown_rank_is_false() {
  let mut partitioner = Partitioner::from_domains(row_of_domains(4), 2).unwrap();
  partitioner.partition_round_robin();
  assert!(!partitioner.assigned_to(0, 17));
}

// =========================================================================
// KD split
// =========================================================================

/// N=10, R=3: three non-empty ranks holding all ten clusters.
#[test]
fn test_kd_ten_clusters_three_ranks() {
  let mut partitioner = Partitioner::from_domains(row_of_domains(10), 3).unwrap();
  partitioner.partition_kd();

  let mut counts: Vec<usize> = (0..3).map(|r| partitioner.clusters_of(r).len()).collect();
  counts.sort_unstable();
  assert_eq!(counts.iter().sum::<usize>(), 10);
  assert!(counts.iter().all(|&count| count > 0), "counts {:?}", counts);
  assert_complete_assignment(&partitioner);

  let tree = partitioner.kd_tree().expect("kd tree recorded");
  assert_eq!(tree.leaf_ranks(), vec![0, 1, 2]);
}

/// Eight unit cubes in a row over four ranks: two neighbours per rank.
#[test]
fn test_kd_row_balanced_pairs() {
  let mut partitioner = Partitioner::from_domains(row_of_domains(8), 4).unwrap();
  partitioner.partition_kd();

  assert_eq!(partitioner.clusters_of(0), &[0, 1]);
  assert_eq!(partitioner.clusters_of(1), &[2, 3]);
  assert_eq!(partitioner.clusters_of(2), &[4, 5]);
  assert_eq!(partitioner.clusters_of(3), &[6, 7]);

  let tree = partitioner.kd_tree().unwrap();
  assert_eq!(tree.nodes().len(), 3);
  let root = tree.node(0).unwrap();
  assert_eq!(root.split_axis, 0);
  assert_eq!(root.split_plane, 4.0);
}

/// Splits follow the longest axis of the group bounds.
#[test]
fn test_kd_splits_longest_axis() {
  let domains: Vec<Box3> = (0..4)
    .map(|i| Box3::new(Vec3::new(0.0, 0.0, i as f32 * 10.0), Vec3::new(1.0, 1.0, i as f32 * 10.0 + 10.0)))
    .collect();
  let mut partitioner = Partitioner::from_domains(domains, 2).unwrap();
  partitioner.partition_kd();

  let root = partitioner.kd_tree().unwrap().node(0).unwrap();
  assert_eq!(root.split_axis, 2);
  assert_eq!(root.split_plane, 20.0);
}

#[test]
fn test_kd_single_rank_takes_everything() {
  let mut partitioner = Partitioner::from_domains(row_of_domains(5), 1).unwrap();
  partitioner.partition_kd();

  assert_eq!(partitioner.clusters_of(0).len(), 5);
  let tree = partitioner.kd_tree().unwrap();
  assert_eq!(tree.root(), NodeRef::Leaf(0));
  assert!(tree.nodes().is_empty());
}

/// Identical domains cannot be separated; ranks still each get a leaf.
#[test]
fn test_kd_unsplittable_group_terminates() {
  let domains = vec![Box3::new(Vec3::ZERO, Vec3::ONE); 6];
  let mut partitioner = Partitioner::from_domains(domains, 3).unwrap();
  partitioner.partition_kd();

  assert_complete_assignment(&partitioner);
  assert_eq!(partitioner.kd_tree().unwrap().leaf_ranks(), vec![0, 1, 2]);
  let total: usize = (0..3).map(|r| partitioner.clusters_of(r).len()).sum();
  assert_eq!(total, 6);
}

/// Fewer clusters than ranks: every rank still owns exactly one leaf.
#[test]
fn test_kd_more_ranks_than_clusters() {
  let mut partitioner = Partitioner::from_domains(row_of_domains(2), 5).unwrap();
  partitioner.partition_kd();

  assert_complete_assignment(&partitioner);
  assert_eq!(partitioner.kd_tree().unwrap().leaf_ranks(), vec![0, 1, 2, 3, 4]);
  let non_empty = (0..5).filter(|&r| !partitioner.clusters_of(r).is_empty()).count();
  assert_eq!(non_empty, 2);
}

#[test]
fn test_kd_no_clusters() {
  let mut partitioner = Partitioner::from_domains(Vec::new(), 3).unwrap();
  partitioner.partition_kd();
  assert_eq!(partitioner.kd_tree().unwrap().leaf_ranks(), vec![0, 1, 2]);
}

/// Distinct leaf ranks equal R and the union of leaves is the input set.
#[test]
fn test_kd_leaf_invariants_random() {
  for seed in 0..20u64 {
    let num_clusters = 1 + (seed as usize * 7) % 60;
    let num_ranks = 1 + (seed as usize * 5) % 13;
    let mut partitioner =
      Partitioner::from_domains(random_domains(num_clusters, seed), num_ranks).unwrap();
    partitioner.partition_kd();

    assert_complete_assignment(&partitioner);
    let expected: Vec<usize> = (0..num_ranks).collect();
    assert_eq!(
      partitioner.kd_tree().unwrap().leaf_ranks(),
      expected,
      "seed {} ({} clusters, {} ranks)",
      seed,
      num_clusters,
      num_ranks
    );
  }
}

#[test]
fn test_kd_grid_is_balanced() {
  let mut partitioner = Partitioner::from_domains(grid_of_domains(4, 4, 4), 8).unwrap();
  partitioner.partition_kd();

  for rank in 0..8 {
    assert_eq!(partitioner.clusters_of(rank).len(), 8, "rank {}", rank);
  }
}

/// Re-partitioning replaces the previous assignment.
#[test]
fn test_repartition_resets_state() {
  let mut partitioner = Partitioner::from_domains(row_of_domains(8), 4).unwrap();
  partitioner.partition_kd();
  assert!(partitioner.kd_tree().is_some());

  partitioner.partition_round_robin();
  assert!(partitioner.kd_tree().is_none());
  assert_complete_assignment(&partitioner);
}

#[test]
fn test_composite_order_without_tree_is_identity() {
  let mut partitioner = Partitioner::from_domains(row_of_domains(6), 3).unwrap();
  partitioner.partition_round_robin();

  let order = partitioner.compute_composite_order(Vec3::ZERO, CompositeDirection::FrontToBack);
  assert_eq!(order, vec![0, 1, 2]);
  let order = partitioner.compute_composite_order(Vec3::ZERO, CompositeDirection::BackToFront);
  assert_eq!(order, vec![2, 1, 0]);
}
