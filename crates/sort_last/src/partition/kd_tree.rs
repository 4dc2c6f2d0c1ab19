//! KD split tree recorded by the balanced partitioner.
//!
//! Internal nodes live in a flat array and reference their children through
//! [`NodeRef`]. Leaves are not stored as nodes: a child reference names the
//! rank directly.

/// Reference to a child of a [`KdNode`] (or to the root).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeRef {
  /// Index into [`KdTree::nodes`].
  Internal(usize),
  /// Terminal rank id.
  Leaf(usize),
  /// Region whose clusters were merged into another rank's leaf.
  /// Skipped during traversal.
  Empty,
}

/// One axis-aligned split decision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KdNode {
  /// 0 = x, 1 = y, 2 = z.
  pub split_axis: usize,
  pub split_plane: f32,
  /// Side below the plane.
  pub child1: NodeRef,
  /// Side at or above the plane.
  pub child2: NodeRef,
}

/// Where a pending group's reference gets written once it is resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
  Root,
  Child1(usize),
  Child2(usize),
}

/// Flat KD tree: internal nodes plus a root reference.
#[derive(Clone, Debug, PartialEq)]
pub struct KdTree {
  nodes: Vec<KdNode>,
  root: NodeRef,
}

impl KdTree {
  pub(crate) fn new() -> Self {
    Self {
      nodes: Vec::new(),
      root: NodeRef::Empty,
    }
  }

  pub fn root(&self) -> NodeRef {
    self.root
  }

  pub fn nodes(&self) -> &[KdNode] {
    &self.nodes
  }

  pub fn node(&self, index: usize) -> Option<&KdNode> {
    self.nodes.get(index)
  }

  /// Rank ids of all leaves, in node-array order.
  pub fn leaf_ranks(&self) -> Vec<usize> {
    let mut ranks: Vec<usize> = self
      .nodes
      .iter()
      .flat_map(|node| [node.child1, node.child2])
      .chain(std::iter::once(self.root))
      .filter_map(|child| match child {
        NodeRef::Leaf(rank) => Some(rank),
        _ => None,
      })
      .collect();
    ranks.sort_unstable();
    ranks
  }

  /// Append an internal node whose children are not resolved yet, and hook
  /// it into `slot`. Returns the new node's index.
  pub(crate) fn push_split(&mut self, slot: Slot, split_axis: usize, split_plane: f32) -> usize {
    let index = self.nodes.len();
    self.nodes.push(KdNode {
      split_axis,
      split_plane,
      child1: NodeRef::Empty,
      child2: NodeRef::Empty,
    });
    self.resolve(slot, NodeRef::Internal(index));
    index
  }

  /// Write `target` into `slot`.
  pub(crate) fn resolve(&mut self, slot: Slot, target: NodeRef) {
    match slot {
      Slot::Root => self.root = target,
      Slot::Child1(index) => self.nodes[index].child1 = target,
      Slot::Child2(index) => self.nodes[index].child2 = target,
    }
  }
}
