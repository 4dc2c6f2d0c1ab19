//! Minimal Wavefront OBJ reader.
//!
//! Only positions (`v`) and faces (`f`) are read. Face corners may use the
//! `v`, `v/vt`, `v//vn` or `v/vt/vn` forms and negative (relative) indices.
//! Polygons are fan-triangulated. All groups and objects end up in one mesh.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use glam::Vec3;
use tracing::info;

use super::Mesh;
use crate::error::ObjError;

/// Load an OBJ file into a single mesh.
pub fn load_obj(path: impl AsRef<Path>) -> Result<Mesh, ObjError> {
  let path = path.as_ref();
  let file = File::open(path).map_err(|source| ObjError::Open {
    path: path.to_path_buf(),
    source,
  })?;
  let mesh = parse_obj(BufReader::new(file))?;
  info!(
    path = %path.display(),
    vertices = mesh.vertices.len(),
    triangles = mesh.triangles.len(),
    "loaded obj mesh"
  );
  Ok(mesh)
}

/// Parse OBJ text from any buffered reader.
pub fn parse_obj(reader: impl BufRead) -> Result<Mesh, ObjError> {
  let mut vertices = Vec::new();
  let mut triangles = Vec::new();
  let mut polygon: Vec<u32> = Vec::new();

  for (line_index, line) in reader.lines().enumerate() {
    let line = line?;
    let line_number = line_index + 1;
    let mut tokens = line.split_whitespace();

    match tokens.next() {
      Some("v") => {
        let mut coords = [0.0f32; 3];
        for coord in &mut coords {
          let token = tokens.next().ok_or_else(|| parse_error(line_number, "vertex needs three coordinates"))?;
          *coord = token
            .parse()
            .map_err(|_| parse_error(line_number, format!("invalid coordinate '{}'", token)))?;
        }
        vertices.push(Vec3::from_array(coords));
      }
      Some("f") => {
        polygon.clear();
        for token in tokens {
          polygon.push(resolve_index(token, vertices.len(), line_number)?);
        }
        if polygon.len() < 3 {
          return Err(parse_error(line_number, "face needs at least three vertices"));
        }
        for i in 1..polygon.len() - 1 {
          triangles.push([polygon[0], polygon[i], polygon[i + 1]]);
        }
      }
      _ => {}
    }
  }

  if triangles.is_empty() {
    return Err(ObjError::Empty);
  }

  let mesh = Mesh::new(vertices, triangles);
  if let Some((triangle, index)) = mesh.find_invalid_index() {
    return Err(ObjError::Parse {
      line: 0,
      message: format!(
        "triangle {} references vertex {} but only {} vertices exist",
        triangle,
        index + 1,
        mesh.vertices.len()
      ),
    });
  }
  Ok(mesh)
}

/// Turn a face corner token into a zero-based vertex index.
fn resolve_index(token: &str, num_verts: usize, line: usize) -> Result<u32, ObjError> {
  let position = token.split('/').next().unwrap_or_default();
  let index: i64 = position
    .parse()
    .map_err(|_| parse_error(line, format!("invalid face index '{}'", token)))?;

  let resolved = match index {
    0 => return Err(parse_error(line, "face index 0 is not valid")),
    i if i > 0 => i - 1,
    i => num_verts as i64 + i,
  };

  u32::try_from(resolved).map_err(|_| parse_error(line, format!("face index '{}' out of range", token)))
}

fn parse_error(line: usize, message: impl Into<String>) -> ObjError {
  ObjError::Parse {
    line,
    message: message.into(),
  }
}
