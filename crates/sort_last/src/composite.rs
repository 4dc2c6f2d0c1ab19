//! Composite ordering of ranks for sort-last rendering.
//!
//! The KD tree is walked depth first from the root. At each split the child
//! on the reference point's side is visited first and the other one is
//! deferred on an explicit stack, which yields ranks nearest first.
//!
//! A reference coordinate exactly on a split plane counts as the child2
//! side, so child2 is visited first.

use glam::Vec3;
use smallvec::SmallVec;

use crate::partition::{KdTree, NodeRef};

/// Order in which partial images are handed to the compositor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompositeDirection {
  /// Nearest rank first ("under" blending).
  #[default]
  FrontToBack,
  /// Farthest rank first ("over" blending).
  BackToFront,
}

/// Rank ids in visibility order relative to `reference`.
///
/// Every rank with a leaf in `tree` appears exactly once.
pub fn composite_order(tree: &KdTree, reference: Vec3, direction: CompositeDirection) -> Vec<usize> {
  let mut order = Vec::new();
  let mut stack: SmallVec<[NodeRef; 32]> = SmallVec::new();
  stack.push(tree.root());

  while let Some(next) = stack.pop() {
    match next {
      NodeRef::Leaf(rank) => order.push(rank),
      NodeRef::Empty => {}
      NodeRef::Internal(index) => {
        let node = &tree.nodes()[index];
        let (near, far) = if reference[node.split_axis] < node.split_plane {
          (node.child1, node.child2)
        } else {
          (node.child2, node.child1)
        };
        stack.push(far);
        stack.push(near);
      }
    }
  }

  if direction == CompositeDirection::BackToFront {
    order.reverse();
  }
  order
}

#[cfg(test)]
#[path = "composite_test.rs"]
mod composite_test;
