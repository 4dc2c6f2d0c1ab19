//! Triangle meshes: in-memory representation, OBJ input and domain splitting.

pub mod obj;
pub mod splitter;

use glam::Vec3;

pub use obj::load_obj;
pub use splitter::{MeshDomain, MeshSplitter};

use crate::types::Box3;

/// Indexed triangle mesh with a single shared vertex array.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
  pub vertices: Vec<Vec3>,
  /// Three vertex indices per triangle.
  pub triangles: Vec<[u32; 3]>,
  /// Bounds of all vertices.
  pub bounds: Box3,
}

impl Mesh {
  /// Create a mesh and compute its bounds from the vertices.
  pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
    let mut bounds = Box3::empty();
    for &vertex in &vertices {
      bounds.extend(vertex);
    }
    Self {
      vertices,
      triangles,
      bounds,
    }
  }

  pub fn triangle_count(&self) -> usize {
    self.triangles.len()
  }

  pub fn is_empty(&self) -> bool {
    self.triangles.is_empty()
  }

  /// First triangle referencing a vertex outside the vertex array, as
  /// `(triangle, index)`.
  pub fn find_invalid_index(&self) -> Option<(usize, u32)> {
    let num_verts = self.vertices.len();
    self.triangles.iter().enumerate().find_map(|(triangle, indices)| {
      indices
        .iter()
        .find(|&&index| index as usize >= num_verts)
        .map(|&index| (triangle, index))
    })
  }

  #[inline]
  pub fn corners(&self, triangle: [u32; 3]) -> [Vec3; 3] {
    triangle.map(|index| self.vertices[index as usize])
  }

  /// Centroid of the triangle's bounding box.
  #[inline]
  pub fn triangle_centroid(&self, triangle: [u32; 3]) -> Vec3 {
    let [a, b, c] = self.corners(triangle);
    (a.min(b).min(c) + a.max(b).max(c)) * 0.5
  }

  /// Smallest vertex coordinate of the triangle on `axis`.
  #[inline]
  pub fn triangle_min(&self, triangle: [u32; 3], axis: usize) -> f32 {
    let [a, b, c] = self.corners(triangle);
    a[axis].min(b[axis]).min(c[axis])
  }
}
