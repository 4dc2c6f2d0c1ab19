//! Structured volumes: raw scalar grids on disk and their decomposition.
//!
//! A raw volume is a headerless `x`-fastest array of `dims.x * dims.y *
//! dims.z` scalars. Samples are normalized to `f32` on read: `u8 / 255`,
//! `u16 / 65535`, `f32` unchanged.

pub mod splitter;

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::str::FromStr;

use glam::IVec3;
use tracing::info;

pub use splitter::{VolumeDomain, VolumeSplitter};

use crate::error::VolumeError;
use crate::types::{Box1, Box3i};

/// Scalar type of a raw volume sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarType {
  U8,
  U16,
  F32,
}

impl ScalarType {
  /// Scalar type for a bytes-per-component count (1, 2 or 4).
  pub fn from_bpc(bpc: u32) -> Result<Self, VolumeError> {
    match bpc {
      1 => Ok(ScalarType::U8),
      2 => Ok(ScalarType::U16),
      4 => Ok(ScalarType::F32),
      other => Err(VolumeError::UnsupportedBpc(other)),
    }
  }

  pub fn bytes_per_component(self) -> usize {
    match self {
      ScalarType::U8 => 1,
      ScalarType::U16 => 2,
      ScalarType::F32 => 4,
    }
  }

  /// Decode little-endian samples from `bytes` into `out`.
  fn decode(self, bytes: &[u8], out: &mut [f32]) {
    match self {
      ScalarType::U8 => {
        for (value, &byte) in out.iter_mut().zip(bytes) {
          *value = byte as f32 / 255.0;
        }
      }
      ScalarType::U16 => {
        for (value, chunk) in out.iter_mut().zip(bytes.chunks_exact(2)) {
          *value = u16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 65535.0;
        }
      }
      ScalarType::F32 => {
        for (value, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
          *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
      }
    }
  }
}

impl FromStr for ScalarType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "uint8" | "u8" => Ok(ScalarType::U8),
      "uint16" | "u16" => Ok(ScalarType::U16),
      "float" | "float32" | "f32" => Ok(ScalarType::F32),
      other => Err(format!("unknown scalar type '{}' (expected uint8, uint16 or float)", other)),
    }
  }
}

impl fmt::Display for ScalarType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ScalarType::U8 => "uint8",
      ScalarType::U16 => "uint16",
      ScalarType::F32 => "float",
    };
    f.write_str(name)
  }
}

/// Random-access reader over a raw scalar grid.
#[derive(Debug)]
pub struct RawVolume<R> {
  reader: R,
  dims: IVec3,
  scalar: ScalarType,
}

impl RawVolume<BufReader<File>> {
  /// Open a raw volume file and check that it holds `dims` samples.
  pub fn open(path: impl AsRef<Path>, dims: IVec3, scalar: ScalarType) -> Result<Self, VolumeError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| VolumeError::Open {
      path: path.to_path_buf(),
      source,
    })?;
    let volume = Self::from_reader(BufReader::new(file), dims, scalar)?;
    info!(
      path = %path.display(),
      dims = ?dims,
      scalar = %scalar,
      "opened raw volume"
    );
    Ok(volume)
  }
}

impl<R: Read + Seek> RawVolume<R> {
  pub fn from_reader(mut reader: R, dims: IVec3, scalar: ScalarType) -> Result<Self, VolumeError> {
    if dims.cmple(IVec3::ZERO).any() {
      return Err(VolumeError::InvalidDims(dims.to_array()));
    }
    let expected = Box3i::new(IVec3::ZERO, dims)
      .checked_volume()
      .and_then(|cells| (cells as u64).checked_mul(scalar.bytes_per_component() as u64))
      .ok_or(VolumeError::InvalidDims(dims.to_array()))?;
    let actual = reader.seek(SeekFrom::End(0))?;
    if actual < expected {
      return Err(VolumeError::TooSmall { expected, actual });
    }
    Ok(Self { reader, dims, scalar })
  }

  pub fn dims(&self) -> IVec3 {
    self.dims
  }

  pub fn scalar(&self) -> ScalarType {
    self.scalar
  }

  /// Read the samples in `range` (x fastest) and their value range.
  ///
  /// An empty range yields no samples and an empty value range.
  pub fn read_brick(&mut self, range: Box3i) -> Result<(Vec<f32>, Box1), VolumeError> {
    if range.lower.cmplt(IVec3::ZERO).any() || range.upper.cmpgt(self.dims).any() {
      return Err(VolumeError::RangeOutOfBounds {
        lower: range.lower.to_array(),
        upper: range.upper.to_array(),
        dims: self.dims.to_array(),
      });
    }
    if range.is_empty() {
      return Ok((Vec::new(), Box1::empty()));
    }

    let size = range.size();
    let row_len = size.x as usize;
    let bpc = self.scalar.bytes_per_component();
    let mut samples = vec![0.0f32; range.volume() as usize];
    let mut row_bytes = vec![0u8; row_len * bpc];
    let mut value_range = Box1::empty();

    let (dim_x, dim_y) = (self.dims.x as u64, self.dims.y as u64);
    let row_coords = (range.lower.z..range.upper.z)
      .flat_map(|z| (range.lower.y..range.upper.y).map(move |y| (y, z)));
    for (row, (y, z)) in samples.chunks_exact_mut(row_len).zip(row_coords) {
      let first_voxel = z as u64 * dim_x * dim_y + y as u64 * dim_x + range.lower.x as u64;
      self.reader.seek(SeekFrom::Start(first_voxel * bpc as u64))?;
      self.reader.read_exact(&mut row_bytes)?;

      self.scalar.decode(&row_bytes, row);
      for &value in row.iter() {
        value_range.extend(value);
      }
    }

    Ok((samples, value_range))
  }
}
