//! Balanced KD split of clusters into ranks.
//!
//! # Algorithm
//!
//! Pending groups of clusters are processed greedily, largest (by member
//! count) first:
//! 1. When only one rank is left, the group becomes that rank's leaf and
//!    every other pending group is merged into it.
//! 2. Groups at or below `N / R` members become the next rank's leaf, as long
//!    as enough groups remain for the ranks still waiting for one.
//! 3. Everything else is split at the midpoint of its longest axis, members
//!    going left or right by domain centroid.
//!
//! A group whose members all land on one side cannot be split. It is
//! finalized above budget, or, if that would leave ranks without a leaf,
//! split degenerately into itself and an empty sibling.

use tracing::debug;

use super::kd_tree::{KdTree, NodeRef, Slot};
use crate::types::{Box3, Cluster};

/// Group of clusters waiting for a split or a rank.
struct Group {
  bounds: Box3,
  members: Vec<usize>,
  slot: Slot,
}

impl Group {
  fn empty(slot: Slot) -> Self {
    Self {
      bounds: Box3::empty(),
      members: Vec::new(),
      slot,
    }
  }
}

/// Result of a successful midpoint split.
struct Split {
  axis: usize,
  plane: f32,
  left: Group,
  right: Group,
}

/// Build the KD tree and per-rank cluster lists.
///
/// `num_ranks` must be positive; the caller validates it.
pub(crate) fn build(clusters: &[Cluster], num_ranks: usize) -> (KdTree, Vec<Vec<usize>>) {
  debug_assert!(num_ranks > 0);

  let budget = clusters.len() / num_ranks;

  let mut all = Group::empty(Slot::Root);
  for cluster in clusters {
    all.bounds.extend_box(&cluster.domain);
    all.members.push(cluster.id);
  }

  let mut tree = KdTree::new();
  let mut pending = vec![all];
  let mut assigned: Vec<Vec<usize>> = Vec::with_capacity(num_ranks);

  while !pending.is_empty() {
    let group = pending.remove(pick_largest(&pending));
    let need = num_ranks - assigned.len();

    if need == 1 {
      let rank = assigned.len();
      tree.resolve(group.slot, NodeRef::Leaf(rank));
      let mut members = group.members;
      for rest in pending.drain(..) {
        tree.resolve(rest.slot, NodeRef::Empty);
        members.extend(rest.members);
      }
      debug!(rank, clusters = members.len(), "final rank absorbs remaining groups");
      assigned.push(members);
      break;
    }

    // Finalizing must leave at least one group per rank still waiting.
    let can_finalize = need <= pending.len() + 1;

    if can_finalize && group.members.len() <= budget {
      finalize(&mut tree, &mut assigned, group);
      continue;
    }

    match split_midpoint(clusters, &group) {
      Some(split) => {
        let node = tree.push_split(group.slot, split.axis, split.plane);
        debug!(
          node,
          axis = split.axis,
          plane = split.plane,
          left = split.left.members.len(),
          right = split.right.members.len(),
          "split cluster group"
        );
        pending.push(Group {
          slot: Slot::Child1(node),
          ..split.left
        });
        pending.push(Group {
          slot: Slot::Child2(node),
          ..split.right
        });
      }
      None if can_finalize => {
        debug!(
          clusters = group.members.len(),
          budget, "unsplittable group finalized"
        );
        finalize(&mut tree, &mut assigned, group);
      }
      None => {
        let (axis, plane) = degenerate_plane(&group.bounds);
        let node = tree.push_split(group.slot, axis, plane);
        debug!(node, axis, plane, "degenerate split to make room for a rank");
        pending.push(Group {
          slot: Slot::Child1(node),
          ..group
        });
        pending.push(Group::empty(Slot::Child2(node)));
      }
    }
  }

  debug_assert_eq!(assigned.len(), num_ranks);
  (tree, assigned)
}

/// Index of the pending group with the most members (first maximum wins).
fn pick_largest(pending: &[Group]) -> usize {
  let mut best = 0;
  for (index, group) in pending.iter().enumerate() {
    if group.members.len() > pending[best].members.len() {
      best = index;
    }
  }
  best
}

fn finalize(tree: &mut KdTree, assigned: &mut Vec<Vec<usize>>, group: Group) {
  let rank = assigned.len();
  tree.resolve(group.slot, NodeRef::Leaf(rank));
  debug!(rank, clusters = group.members.len(), "rank finalized");
  assigned.push(group.members);
}

/// Split at the midpoint of the longest axis. `None` if a side stays empty.
fn split_midpoint(clusters: &[Cluster], group: &Group) -> Option<Split> {
  if group.members.len() < 2 {
    return None;
  }

  let axis = group.bounds.largest_axis();
  let plane = group.bounds.lower[axis] + group.bounds.size()[axis] * 0.5;

  let mut left = Group::empty(Slot::Root);
  let mut right = Group::empty(Slot::Root);
  for &id in &group.members {
    let domain = &clusters[id].domain;
    let side = if domain.center()[axis] < plane {
      &mut left
    } else {
      &mut right
    };
    side.bounds.extend_box(domain);
    side.members.push(id);
  }

  if left.members.is_empty() || right.members.is_empty() {
    return None;
  }

  Some(Split {
    axis,
    plane,
    left,
    right,
  })
}

/// Plane at the group's upper bound, so every member stays on child1.
fn degenerate_plane(bounds: &Box3) -> (usize, f32) {
  if !bounds.is_valid() {
    return (0, 0.0);
  }
  let axis = bounds.largest_axis();
  (axis, bounds.upper[axis])
}
