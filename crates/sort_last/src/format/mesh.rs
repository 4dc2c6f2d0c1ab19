use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;

use glam::Vec3;
use tracing::{debug, info};

use super::{
  checked_payload, count_to_usize, ensure_remaining, read_u64, read_word, read_words, skip, stream_end, write_u64,
  write_words,
};
use crate::error::FormatError;
use crate::mesh::{Mesh, MeshDomain};
use crate::types::Box3;

/// Leading section of a partitioned mesh file, up to the vertex array.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshFileHeader {
  pub num_clusters: usize,
  pub bounds: Box3,
  pub num_verts: usize,
}

/// Bytes of a record head: `u64` triangle count and `box3` domain.
const RECORD_HEAD_BYTES: u64 = 8 + 24;

/// Fixed-size head of one cluster record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshRecordHeader {
  pub num_triangles: usize,
  pub domain: Box3,
}

/// Write `mesh` as a partitioned file with one cluster per domain.
///
/// Every domain must lie inside the triangle array; cluster `i` is
/// `domains[i]`.
pub fn write_mesh_file<W: Write>(writer: &mut W, mesh: &Mesh, domains: &[MeshDomain]) -> Result<(), FormatError> {
  if let Some(domain) = domains
    .iter()
    .find(|d| d.first > d.last || d.last > mesh.triangles.len())
  {
    return Err(FormatError::InvalidInput {
      what: "mesh domain",
      reason: format!(
        "range {}..{} outside {} triangles",
        domain.first,
        domain.last,
        mesh.triangles.len()
      ),
    });
  }

  write_u64(writer, domains.len() as u64)?;
  write_words(writer, &[mesh.bounds])?;
  write_u64(writer, mesh.vertices.len() as u64)?;
  write_words(writer, &mesh.vertices)?;

  for (cluster, domain) in domains.iter().enumerate() {
    let triangles = mesh.triangles[domain.first..domain.last]
      .iter()
      .map(|triangle| to_disk_triangle(*triangle))
      .collect::<Result<Vec<[i32; 3]>, _>>()?;

    write_u64(writer, triangles.len() as u64)?;
    write_words(writer, &[domain.bounds])?;
    write_words(writer, &triangles)?;
    debug!(cluster, triangles = triangles.len(), "wrote mesh cluster");
  }
  Ok(())
}

/// Create `path` and write the partitioned mesh into it.
pub fn save_mesh_file(path: impl AsRef<Path>, mesh: &Mesh, domains: &[MeshDomain]) -> Result<(), FormatError> {
  let path = path.as_ref();
  let mut writer = BufWriter::new(File::create(path)?);
  write_mesh_file(&mut writer, mesh, domains)?;
  writer.flush()?;
  info!(
    path = %path.display(),
    clusters = domains.len(),
    vertices = mesh.vertices.len(),
    "saved partitioned mesh"
  );
  Ok(())
}

/// Read the global header. The stream is left at the vertex array.
pub fn read_mesh_header<R: Read + Seek>(reader: &mut R) -> Result<MeshFileHeader, FormatError> {
  let end = stream_end(reader)?;
  read_header(reader, end)
}

/// [`read_mesh_header`] against a known stream end.
///
/// Both counts are checked before anything is allocated: the vertex array
/// plus one record head per cluster must fit in the stream.
pub(crate) fn read_header<R: Read + Seek>(reader: &mut R, end: u64) -> Result<MeshFileHeader, FormatError> {
  let num_clusters = read_u64(reader)?;
  let bounds: Box3 = read_word(reader)?;
  let num_verts = read_u64(reader)?;

  let vertex_bytes = checked_payload::<Vec3, _>(reader, end, "vertex array", num_verts)?;
  let needed = num_clusters
    .checked_mul(RECORD_HEAD_BYTES)
    .and_then(|bytes| bytes.checked_add(vertex_bytes))
    .ok_or(FormatError::CountOverflow {
      what: "cluster",
      count: num_clusters,
    })?;
  ensure_remaining(reader, end, "cluster records", needed)?;

  Ok(MeshFileHeader {
    num_clusters: count_to_usize("cluster", num_clusters)?,
    bounds,
    num_verts: count_to_usize("vertex", num_verts)?,
  })
}

pub(crate) fn read_vertices<R: Read>(reader: &mut R, num_verts: usize) -> Result<Vec<Vec3>, FormatError> {
  Ok(read_words(reader, num_verts)?)
}

/// Read a record head. The stream is left at the record's triangles.
pub(crate) fn read_record_header<R: Read + Seek>(reader: &mut R, end: u64) -> Result<MeshRecordHeader, FormatError> {
  let num_triangles = read_u64(reader)?;
  let domain: Box3 = read_word(reader)?;
  checked_payload::<[i32; 3], _>(reader, end, "triangle array", num_triangles)?;
  Ok(MeshRecordHeader {
    num_triangles: count_to_usize("triangle", num_triangles)?,
    domain,
  })
}

/// Read a record's triangles and check them against the vertex count.
pub(crate) fn read_triangles<R: Read>(
  reader: &mut R,
  cluster: usize,
  record: &MeshRecordHeader,
  num_verts: usize,
) -> Result<Vec<[u32; 3]>, FormatError> {
  let triangles: Vec<[i32; 3]> = read_words(reader, record.num_triangles)?;
  triangles
    .into_iter()
    .enumerate()
    .map(|(triangle, indices)| from_disk_triangle(indices, cluster, triangle, num_verts))
    .collect()
}

pub(crate) fn skip_triangles<R: Seek>(reader: &mut R, record: &MeshRecordHeader) -> Result<(), FormatError> {
  skip(reader, record.num_triangles as u64 * std::mem::size_of::<[i32; 3]>() as u64)?;
  Ok(())
}

fn to_disk_triangle(triangle: [u32; 3]) -> Result<[i32; 3], FormatError> {
  let mut out = [0i32; 3];
  for (dst, &index) in out.iter_mut().zip(&triangle) {
    *dst = i32::try_from(index).map_err(|_| FormatError::InvalidInput {
      what: "triangle index",
      reason: format!("{} exceeds the signed 32-bit range", index),
    })?;
  }
  Ok(out)
}

fn from_disk_triangle(
  indices: [i32; 3],
  cluster: usize,
  triangle: usize,
  num_verts: usize,
) -> Result<[u32; 3], FormatError> {
  let mut out = [0u32; 3];
  for (dst, &index) in out.iter_mut().zip(&indices) {
    if index < 0 || index as usize >= num_verts {
      return Err(FormatError::IndexOutOfRange {
        cluster,
        triangle,
        index: index as i64,
        num_verts,
      });
    }
    *dst = index as u32;
  }
  Ok(out)
}
