use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;

use glam::IVec3;
use tracing::{debug, info};

use super::{
  checked_payload, count_to_usize, ensure_remaining, read_u64, read_word, read_words, skip, stream_end, write_u64,
  write_words,
};
use crate::error::FormatError;
use crate::types::{Box1, Box3, Box3i};
use crate::volume::{RawVolume, VolumeDomain};

/// Leading section of a partitioned volume file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeFileHeader {
  pub num_clusters: usize,
  /// Ranges of the whole grid (see [`header_domain`]).
  pub domain: VolumeDomain,
}

/// Bytes of a record head: two `box3i` ranges, a `box3` and a `box1`.
const RECORD_HEAD_BYTES: u64 = 24 + 24 + 24 + 8;

/// Fixed-size head of one brick record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeRecordHeader {
  pub domain: VolumeDomain,
  pub value_range: Box1,
  pub num_voxels: usize,
}

/// Write one brick per domain, reading each brick's voxels from `volume`.
pub fn write_volume_file<W: Write, R: Read + Seek>(
  writer: &mut W,
  volume: &mut RawVolume<R>,
  domains: &[VolumeDomain],
) -> Result<(), FormatError> {
  write_u64(writer, domains.len() as u64)?;
  write_domain(writer, &header_domain(volume.dims()))?;

  for (cluster, domain) in domains.iter().enumerate() {
    let (voxels, value_range) = volume.read_brick(domain.voxel_range)?;
    write_domain(writer, domain)?;
    write_words(writer, &[value_range])?;
    write_words(writer, &voxels)?;
    info!(
      cluster,
      voxels = voxels.len(),
      min = value_range.lower,
      max = value_range.upper,
      "wrote volume brick"
    );
  }
  Ok(())
}

/// Create `path` and write the partitioned volume into it.
pub fn save_volume_file<R: Read + Seek>(
  path: impl AsRef<Path>,
  volume: &mut RawVolume<R>,
  domains: &[VolumeDomain],
) -> Result<(), FormatError> {
  let path = path.as_ref();
  let mut writer = BufWriter::new(File::create(path)?);
  write_volume_file(&mut writer, volume, domains)?;
  writer.flush()?;
  info!(path = %path.display(), clusters = domains.len(), "saved partitioned volume");
  Ok(())
}

/// Whole-grid ranges stored in the file header.
///
/// Unlike brick domains the voxel range is not clamped: it is `[0, dims + 1)`
/// on every axis, as existing readers of the format expect.
pub fn header_domain(dims: IVec3) -> VolumeDomain {
  let cell_range = Box3i::new(IVec3::ZERO, dims);
  VolumeDomain {
    cell_range,
    voxel_range: Box3i::new(IVec3::ZERO, dims.saturating_add(IVec3::ONE)),
    space_range: cell_range.as_box3(),
  }
}

/// Read the global header. The stream is left at the first record.
pub fn read_volume_header<R: Read + Seek>(reader: &mut R) -> Result<VolumeFileHeader, FormatError> {
  let end = stream_end(reader)?;
  read_header(reader, end)
}

/// [`read_volume_header`] against a known stream end. One record head per
/// cluster must fit in the stream.
pub(crate) fn read_header<R: Read + Seek>(reader: &mut R, end: u64) -> Result<VolumeFileHeader, FormatError> {
  let num_clusters = read_u64(reader)?;
  let domain = read_domain(reader)?;
  let needed = num_clusters
    .checked_mul(RECORD_HEAD_BYTES)
    .ok_or(FormatError::CountOverflow {
      what: "cluster",
      count: num_clusters,
    })?;
  ensure_remaining(reader, end, "brick records", needed)?;
  debug!(num_clusters, cells = ?domain.cell_range, "volume header");
  Ok(VolumeFileHeader {
    num_clusters: count_to_usize("cluster", num_clusters)?,
    domain,
  })
}

/// Read a record head. The stream is left at the brick's voxels.
pub(crate) fn read_record_header<R: Read + Seek>(
  reader: &mut R,
  end: u64,
  cluster: usize,
) -> Result<VolumeRecordHeader, FormatError> {
  let domain = read_domain(reader)?;
  let value_range: Box1 = read_word(reader)?;

  let voxels = domain.voxel_range;
  let invalid = || FormatError::InvalidVoxelRange {
    cluster,
    lower: voxels.lower.to_array(),
    upper: voxels.upper.to_array(),
  };
  if voxels.upper.cmplt(voxels.lower).any() {
    return Err(invalid());
  }
  let num_voxels = voxels.checked_volume().ok_or_else(invalid)? as u64;
  checked_payload::<f32, _>(reader, end, "voxel array", num_voxels)?;

  Ok(VolumeRecordHeader {
    domain,
    value_range,
    num_voxels: count_to_usize("voxel", num_voxels)?,
  })
}

pub(crate) fn read_voxels<R: Read>(reader: &mut R, record: &VolumeRecordHeader) -> Result<Vec<f32>, FormatError> {
  Ok(read_words(reader, record.num_voxels)?)
}

pub(crate) fn skip_voxels<R: Seek>(reader: &mut R, record: &VolumeRecordHeader) -> Result<(), FormatError> {
  skip(reader, record.num_voxels as u64 * std::mem::size_of::<f32>() as u64)?;
  Ok(())
}

fn write_domain<W: Write>(writer: &mut W, domain: &VolumeDomain) -> Result<(), FormatError> {
  write_words(writer, &[domain.cell_range, domain.voxel_range])?;
  write_words(writer, &[domain.space_range])?;
  Ok(())
}

fn read_domain<R: Read>(reader: &mut R) -> Result<VolumeDomain, FormatError> {
  let cell_range: Box3i = read_word(reader)?;
  let voxel_range: Box3i = read_word(reader)?;
  let space_range: Box3 = read_word(reader)?;
  Ok(VolumeDomain {
    cell_range,
    voxel_range,
    space_range,
  })
}
