//! Error types for partitioning, file I/O and loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the partitioner.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
  #[error("number of ranks must be positive")]
  NoRanks,

  #[error("cluster at index {index} has id {id}; ids must equal their index")]
  ClusterIdMismatch { index: usize, id: usize },
}

/// Errors raised by the mesh and volume splitters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SplitError {
  #[error("number of clusters must be positive")]
  NoClusters,

  #[error("mesh has no triangles")]
  EmptyMesh,

  #[error("triangle {triangle} references vertex {index}, but only {num_verts} vertices exist")]
  InvalidIndex {
    triangle: usize,
    index: u32,
    num_verts: usize,
  },

  #[error("invalid grid dimensions {0:?}")]
  InvalidDims([i32; 3]),
}

/// Errors raised while encoding or decoding partitioned files.
#[derive(Error, Debug)]
pub enum FormatError {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("cluster {cluster}: triangle {triangle} references vertex {index}, but only {num_verts} vertices exist")]
  IndexOutOfRange {
    cluster: usize,
    triangle: usize,
    index: i64,
    num_verts: usize,
  },

  #[error("{what} count {count} does not fit the target platform")]
  CountOverflow { what: &'static str, count: u64 },

  #[error("{what} needs {needed} bytes but only {available} remain")]
  Truncated {
    what: &'static str,
    needed: u64,
    available: u64,
  },

  #[error("cluster {cluster}: invalid voxel range {lower:?}..{upper:?}")]
  InvalidVoxelRange {
    cluster: usize,
    lower: [i32; 3],
    upper: [i32; 3],
  },

  #[error("cannot write {what}: {reason}")]
  InvalidInput { what: &'static str, reason: String },

  #[error(transparent)]
  Volume(#[from] VolumeError),
}

/// Errors raised by the per-rank loaders.
#[derive(Error, Debug)]
pub enum LoadError {
  #[error("cannot open file {path}: {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("rank {rank} is outside communicator of size {size}")]
  RankOutOfRange { rank: usize, size: usize },

  #[error(transparent)]
  Partition(#[from] PartitionError),

  #[error(transparent)]
  Format(#[from] FormatError),
}

impl From<std::io::Error> for LoadError {
  fn from(err: std::io::Error) -> Self {
    LoadError::Format(FormatError::Io(err))
  }
}

/// Errors raised by the raw volume reader.
#[derive(Error, Debug)]
pub enum VolumeError {
  #[error("cannot open volume {path}: {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("unsupported bytes per component: {0} (expected 1, 2 or 4)")]
  UnsupportedBpc(u32),

  #[error("invalid volume dimensions {0:?}")]
  InvalidDims([i32; 3]),

  #[error("volume needs {expected} bytes but only {actual} are available")]
  TooSmall { expected: u64, actual: u64 },

  #[error("voxel range {lower:?}..{upper:?} is outside volume dimensions {dims:?}")]
  RangeOutOfBounds {
    lower: [i32; 3],
    upper: [i32; 3],
    dims: [i32; 3],
  },

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}

/// Errors raised by the Wavefront OBJ reader.
#[derive(Error, Debug)]
pub enum ObjError {
  #[error("cannot open mesh {path}: {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("line {line}: {message}")]
  Parse { line: usize, message: String },

  #[error("mesh contains no triangles")]
  Empty,

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}
