//! Partitioned file formats.
//!
//! Both formats are little-endian streams of a `u64` cluster count, a global
//! header and one record per cluster. Records are variable sized, so a
//! reader walks them in order and seeks past the ones it does not need.
//!
//! ```text
//! mesh:   u64 numClusters | box3 bounds | u64 numVerts | float3[numVerts]
//!         { u64 numTriangles | box3 domain | int3[numTriangles] }[numClusters]
//! volume: u64 numClusters | box3i cells | box3i voxels | box3 space
//!         { box3i cells | box3i voxels | box3 space | box1 values | f32[numVoxels] }[numClusters]
//! ```

pub mod mesh;
pub mod volume;

use std::io::{self, Read, Seek, SeekFrom, Write};

use bytemuck::Pod;

use crate::error::FormatError;

pub use mesh::{read_mesh_header, save_mesh_file, write_mesh_file, MeshFileHeader, MeshRecordHeader};
pub use volume::{
  header_domain, read_volume_header, save_volume_file, write_volume_file, VolumeFileHeader, VolumeRecordHeader,
};

pub(crate) fn write_u64<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
  writer.write_all(&value.to_le_bytes())
}

pub(crate) fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
  let mut bytes = [0u8; 8];
  reader.read_exact(&mut bytes)?;
  Ok(u64::from_le_bytes(bytes))
}

/// Write a slice of values made of 4-byte words (`f32`, `i32` and the box
/// and vector types built from them).
pub(crate) fn write_words<T: Pod, W: Write>(writer: &mut W, data: &[T]) -> io::Result<()> {
  if cfg!(target_endian = "big") {
    let words: Vec<u32> = bytemuck::cast_slice::<T, u32>(data)
      .iter()
      .map(|word| word.to_le())
      .collect();
    writer.write_all(bytemuck::cast_slice(&words))
  } else {
    writer.write_all(bytemuck::cast_slice(data))
  }
}

/// Read `count` values made of 4-byte words.
pub(crate) fn read_words<T: Pod, R: Read>(reader: &mut R, count: usize) -> io::Result<Vec<T>> {
  let mut data = vec![T::zeroed(); count];
  reader.read_exact(bytemuck::cast_slice_mut(&mut data))?;
  // Files are little-endian.
  if cfg!(target_endian = "big") {
    for word in bytemuck::cast_slice_mut::<T, u32>(&mut data) {
      *word = u32::from_le(*word);
    }
  }
  Ok(data)
}

pub(crate) fn read_word<T: Pod, R: Read>(reader: &mut R) -> io::Result<T> {
  let mut value = T::zeroed();
  reader.read_exact(bytemuck::bytes_of_mut(&mut value))?;
  if cfg!(target_endian = "big") {
    for word in bytemuck::cast_slice_mut::<T, u32>(std::slice::from_mut(&mut value)) {
      *word = u32::from_le(*word);
    }
  }
  Ok(value)
}

/// Convert an on-disk count to `usize`.
pub(crate) fn count_to_usize(what: &'static str, count: u64) -> Result<usize, FormatError> {
  usize::try_from(count).map_err(|_| FormatError::CountOverflow { what, count })
}

/// End offset of the stream. Readers take it once and pass it to the
/// checks below.
pub(crate) fn stream_end<R: Seek>(reader: &mut R) -> io::Result<u64> {
  let position = reader.stream_position()?;
  let end = reader.seek(SeekFrom::End(0))?;
  reader.seek(SeekFrom::Start(position))?;
  Ok(end)
}

/// Byte size of `count` elements of `T`, checked against the bytes left
/// before `end` so that corrupt counts fail before allocating.
pub(crate) fn checked_payload<T, R: Seek>(
  reader: &mut R,
  end: u64,
  what: &'static str,
  count: u64,
) -> Result<u64, FormatError> {
  let needed = count
    .checked_mul(std::mem::size_of::<T>() as u64)
    .ok_or(FormatError::CountOverflow { what, count })?;
  ensure_remaining(reader, end, what, needed)?;
  Ok(needed)
}

/// Fail with [`FormatError::Truncated`] unless `needed` bytes remain before
/// `end`.
pub(crate) fn ensure_remaining<R: Seek>(
  reader: &mut R,
  end: u64,
  what: &'static str,
  needed: u64,
) -> Result<(), FormatError> {
  let available = end.saturating_sub(reader.stream_position()?);
  if needed > available {
    return Err(FormatError::Truncated {
      what,
      needed,
      available,
    });
  }
  Ok(())
}

/// Move `bytes` forward. Buffered readers keep their buffer when the target
/// is already in it.
pub(crate) fn skip<R: Seek>(reader: &mut R, bytes: u64) -> io::Result<()> {
  let offset = i64::try_from(bytes).map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "skip too large"))?;
  reader.seek_relative(offset)
}
