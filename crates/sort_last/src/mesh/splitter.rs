//! Offline mesh decomposition into spatially disjoint index ranges.
//!
//! The triangle array is reordered in place so that every domain is a
//! contiguous slice `[first, last)`. Domains are kept on a worklist; each
//! step removes one candidate (per [`PickRule`]), splits it on its longest
//! axis and appends the non-empty halves.
//!
//! # Plane vs. partition criterion
//!
//! The `Median` plane comes from sorted triangle *centroids*, while triangles
//! are partitioned by their *minimum vertex* coordinate. The two can disagree
//! near the plane, so a median split may come out unbalanced or one-sided.
//! This matches the file layout produced by existing tools.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::Mesh;
use crate::config::{PickRule, SplitConfig, SplitStrategy};
use crate::error::SplitError;
use crate::types::Box3;

/// Consecutive one-sided splits after which a domain is final.
pub const MAX_STALLED_SPLITS: u32 = 32;

/// Contiguous triangle range `[first, last)` plus its spatial domain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshDomain {
  pub first: usize,
  pub last: usize,
  pub bounds: Box3,
}

impl MeshDomain {
  pub fn len(&self) -> usize {
    self.last - self.first
  }

  pub fn is_empty(&self) -> bool {
    self.first == self.last
  }
}

/// Worklist entry.
struct Candidate {
  domain: MeshDomain,
  stalls: u32,
}

impl Candidate {
  fn splittable(&self) -> bool {
    self.domain.len() > 1 && self.stalls < MAX_STALLED_SPLITS
  }
}

/// Splits one mesh into `config.num_clusters` domains.
#[derive(Clone, Debug, Default)]
pub struct MeshSplitter {
  config: SplitConfig,
}

impl MeshSplitter {
  pub fn new(config: SplitConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &SplitConfig {
    &self.config
  }

  /// Reorder `mesh.triangles` into contiguous domains and return them.
  ///
  /// Returns fewer domains than requested (with a warning) when no domain
  /// can be split any further.
  #[tracing::instrument(skip_all, name = "mesh::split", fields(triangles = mesh.triangles.len(), clusters = self.config.num_clusters))]
  pub fn split(&self, mesh: &mut Mesh) -> Result<Vec<MeshDomain>, SplitError> {
    if self.config.num_clusters == 0 {
      return Err(SplitError::NoClusters);
    }
    if mesh.is_empty() {
      return Err(SplitError::EmptyMesh);
    }
    if let Some((triangle, index)) = mesh.find_invalid_index() {
      return Err(SplitError::InvalidIndex {
        triangle,
        index,
        num_verts: mesh.vertices.len(),
      });
    }

    let total = mesh.triangles.len();
    let desired = self.config.num_clusters;
    let median_offset = total / desired;

    let mut worklist = vec![Candidate {
      domain: MeshDomain {
        first: 0,
        last: total,
        bounds: mesh.bounds,
      },
      stalls: 0,
    }];

    while worklist.len() < desired {
      let Some(pick) = pick_candidate(&worklist, self.config.pick) else {
        warn!(
          domains = worklist.len(),
          desired, "no domain can be split further"
        );
        break;
      };
      let candidate = worklist.remove(pick);
      let domain = candidate.domain;

      let axis = domain.bounds.largest_axis();
      let lower = domain.bounds.lower[axis];
      let upper = domain.bounds.upper[axis];
      let plane = match self.config.strategy {
        SplitStrategy::Middle => lower + (upper - lower) * 0.5,
        SplitStrategy::Median => {
          let offset = median_offset.min(domain.len() - 1);
          median_plane(mesh, &domain, axis, offset).max(lower).min(upper)
        }
      };

      let split_index = partition_triangles(mesh, &domain, axis, plane);

      let mut left = MeshDomain {
        last: split_index,
        ..domain
      };
      left.bounds.upper[axis] = plane;
      let mut right = MeshDomain {
        first: split_index,
        ..domain
      };
      right.bounds.lower[axis] = plane;

      if left.is_empty() || right.is_empty() {
        let kept = if left.is_empty() { right } else { left };
        debug!(
          first = kept.first,
          last = kept.last,
          axis,
          plane,
          stalls = candidate.stalls + 1,
          "one-sided split"
        );
        worklist.push(Candidate {
          domain: kept,
          stalls: candidate.stalls + 1,
        });
        continue;
      }

      worklist.push(Candidate {
        domain: left,
        stalls: 0,
      });
      worklist.push(Candidate {
        domain: right,
        stalls: 0,
      });
    }

    let domains: Vec<MeshDomain> = worklist.into_iter().map(|c| c.domain).collect();
    for domain in &domains {
      debug!(
        first = domain.first,
        last = domain.last,
        lower = ?domain.bounds.lower,
        upper = ?domain.bounds.upper,
        "mesh domain"
      );
    }
    info!(domains = domains.len(), triangles = total, "mesh split");
    Ok(domains)
  }
}

/// Next domain to split, or `None` if none is splittable.
fn pick_candidate(worklist: &[Candidate], rule: PickRule) -> Option<usize> {
  let splittable = worklist.iter().enumerate().filter(|(_, c)| c.splittable());
  match rule {
    PickRule::LargestVolume => splittable
      .fold(None, |best: Option<(usize, f32)>, (index, c)| {
        let volume = c.domain.bounds.volume();
        match best {
          Some((_, best_volume)) if best_volume >= volume => best,
          _ => Some((index, volume)),
        }
      })
      .map(|(index, _)| index),
    PickRule::MostPrimitives => splittable
      .fold(None, |best: Option<(usize, usize)>, (index, c)| {
        let count = c.domain.len();
        match best {
          Some((_, best_count)) if best_count >= count => best,
          _ => Some((index, count)),
        }
      })
      .map(|(index, _)| index),
  }
}

/// Centroid coordinate on `axis` of the triangle at `offset` in centroid
/// order within `domain`.
fn median_plane(mesh: &Mesh, domain: &MeshDomain, axis: usize, offset: usize) -> f32 {
  let mut centroids: Vec<f32> = mesh.triangles[domain.first..domain.last]
    .par_iter()
    .map(|&triangle| mesh.triangle_centroid(triangle)[axis])
    .collect();
  let (_, nth, _) = centroids.select_nth_unstable_by(offset, f32::total_cmp);
  *nth
}

/// Move triangles whose minimum vertex on `axis` lies below `plane` to the
/// front of the domain. Returns the index of the first triangle at or after
/// the plane.
fn partition_triangles(mesh: &mut Mesh, domain: &MeshDomain, axis: usize, plane: f32) -> usize {
  let Mesh {
    vertices,
    triangles,
    ..
  } = mesh;
  let min_on_axis = |triangle: &[u32; 3]| {
    triangle
      .iter()
      .map(|&index| vertices[index as usize][axis])
      .fold(f32::INFINITY, f32::min)
  };

  let slice = &mut triangles[domain.first..domain.last];
  let mut front = 0;
  for i in 0..slice.len() {
    if min_on_axis(&slice[i]) < plane {
      slice.swap(front, i);
      front += 1;
    }
  }

  domain.first + front
}

#[cfg(test)]
#[path = "splitter_test.rs"]
mod splitter_test;
