//! Assignment of clusters to ranks.
//!
//! Two strategies are provided:
//!
//! - [`Partitioner::partition_round_robin`]: contiguous blocks of
//!   `ceil(N / R)` cluster ids per rank. Needs no geometry, so a reader that
//!   only knows the cluster and rank counts can re-derive it (see
//!   [`round_robin_rank`]).
//! - [`Partitioner::partition_kd`]: balanced KD split over cluster domains.
//!   Also records the [`KdTree`] used for composite ordering.

pub mod kd;
pub mod kd_tree;

use glam::Vec3;
use tracing::{info, warn};

pub use kd_tree::{KdNode, KdTree, NodeRef};

use crate::composite::{composite_order, CompositeDirection};
use crate::error::PartitionError;
use crate::types::{Box3, Cluster};

/// Clusters per rank under round robin: `ceil(num_clusters / num_ranks)`.
#[inline]
pub fn clusters_per_rank(num_clusters: usize, num_ranks: usize) -> usize {
  num_clusters.div_ceil(num_ranks)
}

/// Rank owning `cluster_id` under round robin.
///
/// `cluster_id` must be below `num_clusters` and `num_ranks` positive.
#[inline]
pub fn round_robin_rank(cluster_id: usize, num_clusters: usize, num_ranks: usize) -> usize {
  debug_assert!(cluster_id < num_clusters && num_ranks > 0);
  cluster_id / clusters_per_rank(num_clusters, num_ranks)
}

/// Owns the cluster list and the resulting assignment for one partitioning
/// run.
#[derive(Clone, Debug)]
pub struct Partitioner {
  clusters: Vec<Cluster>,
  num_ranks: usize,
  per_rank: Vec<Vec<usize>>,
  kd_tree: Option<KdTree>,
}

impl Partitioner {
  /// Create a partitioner over `clusters` for `num_ranks` ranks.
  ///
  /// Cluster ids must equal their position in the list.
  pub fn new(clusters: Vec<Cluster>, num_ranks: usize) -> Result<Self, PartitionError> {
    if num_ranks == 0 {
      return Err(PartitionError::NoRanks);
    }
    if let Some((index, cluster)) = clusters
      .iter()
      .enumerate()
      .find(|(index, cluster)| cluster.id != *index)
    {
      return Err(PartitionError::ClusterIdMismatch {
        index,
        id: cluster.id,
      });
    }
    Ok(Self {
      clusters,
      num_ranks,
      per_rank: vec![Vec::new(); num_ranks],
      kd_tree: None,
    })
  }

  /// Create a partitioner from domain bounds, numbering clusters in order.
  pub fn from_domains(
    domains: impl IntoIterator<Item = Box3>,
    num_ranks: usize,
  ) -> Result<Self, PartitionError> {
    let clusters = domains
      .into_iter()
      .enumerate()
      .map(|(id, domain)| Cluster::new(id, domain))
      .collect();
    Self::new(clusters, num_ranks)
  }

  pub fn num_ranks(&self) -> usize {
    self.num_ranks
  }

  pub fn clusters(&self) -> &[Cluster] {
    &self.clusters
  }

  /// Cluster ids assigned to `rank` (empty for unknown ranks).
  pub fn clusters_of(&self, rank: usize) -> &[usize] {
    self.per_rank.get(rank).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Rank owning `cluster_id`, if partitioned.
  pub fn rank_of(&self, cluster_id: usize) -> Option<usize> {
    self.clusters.get(cluster_id).and_then(|cluster| cluster.rank)
  }

  /// KD tree of the last [`partition_kd`](Self::partition_kd) run.
  pub fn kd_tree(&self) -> Option<&KdTree> {
    self.kd_tree.as_ref()
  }

  /// Assign contiguous id blocks of `ceil(N / R)` clusters per rank.
  pub fn partition_round_robin(&mut self) {
    self.reset();
    let num_clusters = self.clusters.len();
    for id in 0..num_clusters {
      let rank = round_robin_rank(id, num_clusters, self.num_ranks);
      self.assign(id, rank);
    }
    info!(
      clusters = num_clusters,
      ranks = self.num_ranks,
      "round-robin partition"
    );
  }

  /// Balanced KD split; records the tree used by
  /// [`compute_composite_order`](Self::compute_composite_order).
  #[tracing::instrument(skip_all, name = "partition::kd", fields(clusters = self.clusters.len(), ranks = self.num_ranks))]
  pub fn partition_kd(&mut self) {
    self.reset();
    let (tree, per_rank) = kd::build(&self.clusters, self.num_ranks);
    for (rank, members) in per_rank.iter().enumerate() {
      for &id in members {
        self.clusters[id].rank = Some(rank);
      }
    }
    info!(nodes = tree.nodes().len(), "kd partition");
    self.per_rank = per_rank;
    self.kd_tree = Some(tree);
  }

  /// Whether `cluster_id` belongs to `rank_id`.
  pub fn assigned_to(&self, cluster_id: usize, rank_id: usize) -> bool {
    self.clusters_of(rank_id).contains(&cluster_id)
  }

  /// Rank visitation order for `reference` (usually the eye position).
  ///
  /// Without a KD tree the identity order is returned.
  pub fn compute_composite_order(&self, reference: Vec3, direction: CompositeDirection) -> Vec<usize> {
    match &self.kd_tree {
      Some(tree) => composite_order(tree, reference, direction),
      None => {
        warn!("no kd tree available, arbitrary composite order");
        let order = 0..self.num_ranks;
        match direction {
          CompositeDirection::FrontToBack => order.collect(),
          CompositeDirection::BackToFront => order.rev().collect(),
        }
      }
    }
  }

  fn reset(&mut self) {
    for cluster in &mut self.clusters {
      cluster.rank = None;
    }
    self.per_rank = vec![Vec::new(); self.num_ranks];
    self.kd_tree = None;
  }

  fn assign(&mut self, cluster_id: usize, rank: usize) {
    self.clusters[cluster_id].rank = Some(rank);
    self.per_rank[rank].push(cluster_id);
  }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
