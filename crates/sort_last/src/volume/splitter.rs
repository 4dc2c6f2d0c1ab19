//! Bisection of a cell grid into bricks.

use glam::IVec3;
use tracing::{debug, info, warn};

use crate::error::SplitError;
use crate::types::{Box3, Box3i};

/// One brick of a structured volume.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeDomain {
  /// Cells owned by this brick, `[lower, upper)`.
  pub cell_range: Box3i,
  /// Voxels needed to interpolate every owned cell: the cell range grown by
  /// one on the upper side, clamped to the grid.
  pub voxel_range: Box3i,
  /// Cell range as floats.
  pub space_range: Box3,
}

impl VolumeDomain {
  /// Brick over `cell_range` of a grid with positive `dims`.
  pub fn from_cells(cell_range: Box3i, dims: IVec3) -> Self {
    Self {
      cell_range,
      voxel_range: Box3i::new(cell_range.lower, cell_range.upper.min(dims - IVec3::ONE) + IVec3::ONE),
      space_range: cell_range.as_box3(),
    }
  }

  /// Domain covering the whole grid.
  pub fn whole(dims: IVec3) -> Self {
    Self::from_cells(Box3i::new(IVec3::ZERO, dims), dims)
  }

  /// Number of samples stored for this brick.
  pub fn num_voxels(&self) -> usize {
    self.voxel_range.volume() as usize
  }

  fn splittable(&self) -> bool {
    self.cell_range.size().max_element() >= 2
  }
}

#[derive(Clone, Debug)]
pub struct VolumeSplitter {
  num_clusters: usize,
}

impl VolumeSplitter {
  pub fn new(num_clusters: usize) -> Self {
    Self { num_clusters }
  }

  pub fn num_clusters(&self) -> usize {
    self.num_clusters
  }

  /// Bisect the grid `[0, dims)` until `num_clusters` bricks exist.
  ///
  /// The brick with the largest space volume is split next, at the integer
  /// midpoint of its longest cell axis. Returns fewer bricks (with a warning)
  /// once every brick is a single cell.
  #[tracing::instrument(skip_all, name = "volume::split", fields(dims = ?dims, clusters = self.num_clusters))]
  pub fn split(&self, dims: IVec3) -> Result<Vec<VolumeDomain>, SplitError> {
    if self.num_clusters == 0 {
      return Err(SplitError::NoClusters);
    }
    if dims.cmple(IVec3::ZERO).any() {
      return Err(SplitError::InvalidDims(dims.to_array()));
    }

    let mut domains = vec![VolumeDomain::whole(dims)];
    while domains.len() < self.num_clusters {
      let Some(pick) = pick_largest(&domains) else {
        warn!(
          domains = domains.len(),
          desired = self.num_clusters,
          "no brick can be split further"
        );
        break;
      };
      let domain = domains.remove(pick);

      let axis = domain.cell_range.largest_axis();
      let cells = domain.cell_range;
      let plane = cells.lower[axis] + cells.size()[axis] / 2;

      let mut left = cells;
      left.upper[axis] = plane;
      let mut right = cells;
      right.lower[axis] = plane;

      domains.push(VolumeDomain::from_cells(left, dims));
      domains.push(VolumeDomain::from_cells(right, dims));
    }

    for domain in &domains {
      debug!(
        cells = ?(domain.cell_range.lower, domain.cell_range.upper),
        voxels = ?(domain.voxel_range.lower, domain.voxel_range.upper),
        "volume domain"
      );
    }
    info!(domains = domains.len(), "volume split");
    Ok(domains)
  }
}

/// Splittable brick with the largest space volume (first on ties).
fn pick_largest(domains: &[VolumeDomain]) -> Option<usize> {
  domains
    .iter()
    .enumerate()
    .filter(|(_, domain)| domain.splittable())
    .fold(None, |best: Option<(usize, f32)>, (index, domain)| {
      let volume = domain.space_range.volume();
      match best {
        Some((_, best_volume)) if best_volume >= volume => best,
        _ => Some((index, volume)),
      }
    })
    .map(|(index, _)| index)
}
