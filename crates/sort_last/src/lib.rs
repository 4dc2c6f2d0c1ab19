//! sort_last - Spatial decomposition and composite ordering for sort-last
//! rendering
//!
//! A dataset (triangle mesh or structured volume) is split offline into
//! spatially disjoint clusters and written to a partitioned file. At run
//! time every rank loads only its own clusters, renders them, and the
//! partial images are blended in a viewpoint-dependent order.
//!
//! # Features
//!
//! - **Partitioning**: round-robin and balanced KD assignment of clusters to
//!   ranks
//! - **Composite order**: front-to-back rank order from the KD split tree
//! - **Splitters**: worklist-based mesh (middle/median) and volume bisection
//! - **Partitioned files**: little-endian mesh and volume formats with
//!   per-rank loaders that skip foreign records
//!
//! # Example
//!
//! ```ignore
//! use glam::Vec3;
//! use sort_last::{CompositeDirection, Partitioner};
//!
//! let mut partitioner = Partitioner::from_domains(domains, num_ranks)?;
//! partitioner.partition_kd();
//! let order = partitioner.compute_composite_order(eye, CompositeDirection::FrontToBack);
//! ```

pub mod composite;
pub mod config;
pub mod error;
pub mod types;
pub mod util;

// Re-export commonly used items
pub use composite::{composite_order, CompositeDirection};
pub use config::{PickRule, SplitConfig, SplitStrategy};
pub use error::{FormatError, LoadError, ObjError, PartitionError, SplitError, VolumeError};
pub use types::{Box1, Box3, Box3i, Cluster};
pub use util::pretty_number;

// Cluster-to-rank assignment and the KD split tree
pub mod partition;
pub use partition::{round_robin_rank, KdNode, KdTree, NodeRef, Partitioner};

// Offline splitting
pub mod mesh;
pub use mesh::{load_obj, Mesh, MeshDomain, MeshSplitter};

pub mod volume;
pub use volume::{RawVolume, ScalarType, VolumeDomain, VolumeSplitter};

// Partitioned file formats and per-rank loading
pub mod format;
pub use format::{save_mesh_file, save_volume_file, write_mesh_file, write_volume_file};

pub mod loader;
pub use loader::{load_mesh, load_volume, LocalMesh, LocalVolume, MeshPart, VolumeBrick};
