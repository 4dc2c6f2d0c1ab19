//! Per-rank loading of partitioned files.
//!
//! Each rank opens the same file, re-derives the round-robin assignment of
//! clusters from the cluster count and the communicator size, and reads only
//! its own records. The file is walked twice: once to collect every
//! cluster's domain and once to read the assigned payloads, seeking past the
//! rest.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use glam::Vec3;
use tracing::{debug, info};

use crate::error::{LoadError, PartitionError};
use crate::format::{mesh as mesh_format, stream_end, volume as volume_format};
use crate::mesh::Mesh;
use crate::partition::Partitioner;
use crate::types::{Box1, Box3, Cluster};
use crate::util::pretty_number;
use crate::volume::VolumeDomain;

/// Triangles of one cluster, indexing the shared vertex array.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshPart {
  pub cluster_id: usize,
  pub domain: Box3,
  pub triangles: Vec<[u32; 3]>,
}

/// The slice of a partitioned mesh owned by one rank.
#[derive(Clone, Debug)]
pub struct LocalMesh {
  /// Bounds of the whole model.
  pub bounds: Box3,
  /// Full vertex array shared by all parts.
  pub vertices: Vec<Vec3>,
  pub parts: Vec<MeshPart>,
  /// Round-robin assignment of every cluster in the file.
  pub partitioner: Partitioner,
}

impl LocalMesh {
  pub fn triangle_count(&self) -> usize {
    self.parts.iter().map(|part| part.triangles.len()).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.parts.is_empty()
  }

  /// Whether `cluster_id` is read by `rank_id` under this file's assignment.
  pub fn assigned_to(&self, cluster_id: usize, rank_id: usize) -> bool {
    self.partitioner.assigned_to(cluster_id, rank_id)
  }

  /// One self-contained mesh per part, each holding only the vertices its
  /// triangles reference (in first-use order).
  pub fn compact(&self) -> Vec<Mesh> {
    let mut remap = vec![u32::MAX; self.vertices.len()];
    self
      .parts
      .iter()
      .map(|part| {
        let mut vertices = Vec::new();
        let triangles = part
          .triangles
          .iter()
          .map(|triangle| {
            triangle.map(|index| {
              let slot = &mut remap[index as usize];
              if *slot == u32::MAX {
                *slot = vertices.len() as u32;
                vertices.push(self.vertices[index as usize]);
              }
              *slot
            })
          })
          .collect();
        for triangle in &part.triangles {
          for &index in triangle {
            remap[index as usize] = u32::MAX;
          }
        }
        Mesh::new(vertices, triangles)
      })
      .collect()
  }
}

/// Load the clusters of `path` assigned to `comm_rank` out of `comm_size`.
pub fn load_mesh(path: impl AsRef<Path>, comm_rank: usize, comm_size: usize) -> Result<LocalMesh, LoadError> {
  let path = path.as_ref();
  let file = File::open(path).map_err(|source| LoadError::Open {
    path: path.to_path_buf(),
    source,
  })?;
  read_mesh_partition(&mut BufReader::new(file), comm_rank, comm_size)
}

/// [`load_mesh`] over any seekable stream.
#[tracing::instrument(skip(reader), name = "load::mesh")]
pub fn read_mesh_partition<R: Read + Seek>(
  reader: &mut R,
  comm_rank: usize,
  comm_size: usize,
) -> Result<LocalMesh, LoadError> {
  check_rank(comm_rank, comm_size)?;

  let end = stream_end(reader)?;
  let header = mesh_format::read_header(reader, end)?;
  let vertices = mesh_format::read_vertices(reader, header.num_verts)?;
  let records_start = reader.stream_position()?;

  let mut clusters = Vec::with_capacity(header.num_clusters);
  for id in 0..header.num_clusters {
    let record = mesh_format::read_record_header(reader, end)?;
    mesh_format::skip_triangles(reader, &record)?;
    clusters.push(Cluster::new(id, record.domain));
  }
  let mut partitioner = Partitioner::new(clusters, comm_size)?;
  partitioner.partition_round_robin();

  reader.seek(SeekFrom::Start(records_start))?;
  let mut parts = Vec::new();
  for id in 0..header.num_clusters {
    let record = mesh_format::read_record_header(reader, end)?;
    if partitioner.assigned_to(id, comm_rank) {
      let triangles = mesh_format::read_triangles(reader, id, &record, header.num_verts)?;
      debug!(cluster = id, triangles = triangles.len(), "read mesh cluster");
      parts.push(MeshPart {
        cluster_id: id,
        domain: record.domain,
        triangles,
      });
    } else {
      mesh_format::skip_triangles(reader, &record)?;
    }
  }

  let local = LocalMesh {
    bounds: header.bounds,
    vertices,
    parts,
    partitioner,
  };
  info!(
    rank = comm_rank,
    clusters = ?local.parts.iter().map(|part| part.cluster_id).collect::<Vec<_>>(),
    num_clusters = local.parts.len(),
    triangles = %pretty_number(local.triangle_count() as u64),
    "clusters assigned to rank"
  );
  Ok(local)
}

/// Voxels of one brick.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeBrick {
  pub cluster_id: usize,
  pub domain: VolumeDomain,
  pub value_range: Box1,
  /// Samples over `domain.voxel_range`, x fastest.
  pub voxels: Vec<f32>,
}

/// The slice of a partitioned volume owned by one rank.
#[derive(Clone, Debug)]
pub struct LocalVolume {
  /// Ranges of the whole grid, as stored in the file header.
  pub domain: VolumeDomain,
  pub bricks: Vec<VolumeBrick>,
  pub partitioner: Partitioner,
}

impl LocalVolume {
  pub fn voxel_count(&self) -> usize {
    self.bricks.iter().map(|brick| brick.voxels.len()).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.bricks.is_empty()
  }

  pub fn assigned_to(&self, cluster_id: usize, rank_id: usize) -> bool {
    self.partitioner.assigned_to(cluster_id, rank_id)
  }

  /// Union of the local bricks' value ranges.
  pub fn value_range(&self) -> Box1 {
    let mut range = Box1::empty();
    for brick in &self.bricks {
      range.extend_range(&brick.value_range);
    }
    range
  }
}

pub fn load_volume(path: impl AsRef<Path>, comm_rank: usize, comm_size: usize) -> Result<LocalVolume, LoadError> {
  let path = path.as_ref();
  let file = File::open(path).map_err(|source| LoadError::Open {
    path: path.to_path_buf(),
    source,
  })?;
  read_volume_partition(&mut BufReader::new(file), comm_rank, comm_size)
}

#[tracing::instrument(skip(reader), name = "load::volume")]
pub fn read_volume_partition<R: Read + Seek>(
  reader: &mut R,
  comm_rank: usize,
  comm_size: usize,
) -> Result<LocalVolume, LoadError> {
  check_rank(comm_rank, comm_size)?;

  let end = stream_end(reader)?;
  let header = volume_format::read_header(reader, end)?;
  let records_start = reader.stream_position()?;

  let mut clusters = Vec::with_capacity(header.num_clusters);
  for id in 0..header.num_clusters {
    let record = volume_format::read_record_header(reader, end, id)?;
    volume_format::skip_voxels(reader, &record)?;
    clusters.push(Cluster::new(id, record.domain.space_range));
  }
  let mut partitioner = Partitioner::new(clusters, comm_size)?;
  partitioner.partition_round_robin();

  reader.seek(SeekFrom::Start(records_start))?;
  let mut bricks = Vec::new();
  for id in 0..header.num_clusters {
    let record = volume_format::read_record_header(reader, end, id)?;
    if partitioner.assigned_to(id, comm_rank) {
      let voxels = volume_format::read_voxels(reader, &record)?;
      debug!(cluster = id, voxels = voxels.len(), "read volume brick");
      bricks.push(VolumeBrick {
        cluster_id: id,
        domain: record.domain,
        value_range: record.value_range,
        voxels,
      });
    } else {
      volume_format::skip_voxels(reader, &record)?;
    }
  }

  let local = LocalVolume {
    domain: header.domain,
    bricks,
    partitioner,
  };
  info!(
    rank = comm_rank,
    clusters = ?local.bricks.iter().map(|brick| brick.cluster_id).collect::<Vec<_>>(),
    num_clusters = local.bricks.len(),
    voxels = %pretty_number(local.voxel_count() as u64),
    "bricks assigned to rank"
  );
  Ok(local)
}

fn check_rank(comm_rank: usize, comm_size: usize) -> Result<(), LoadError> {
  if comm_size == 0 {
    return Err(PartitionError::NoRanks.into());
  }
  if comm_rank >= comm_size {
    return Err(LoadError::RankOutOfRange {
      rank: comm_rank,
      size: comm_size,
    });
  }
  Ok(())
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod loader_test;
