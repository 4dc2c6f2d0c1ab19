//! End-to-end tests: split a dataset offline, write the partitioned file,
//! load it back per rank and order the ranks for compositing.

use std::path::PathBuf;

use glam::{IVec3, Vec3};
use sort_last::{
  load_mesh, load_obj, load_volume, save_mesh_file, save_volume_file, Box3i, CompositeDirection, LoadError,
  MeshSplitter, Partitioner, RawVolume, ScalarType, SplitConfig, SplitStrategy, VolumeSplitter,
};

fn temp_dir(name: &str) -> PathBuf {
  let dir = std::env::temp_dir().join(format!("sort_last_test_{name}"));
  let _ = std::fs::remove_dir_all(&dir);
  std::fs::create_dir_all(&dir).unwrap();
  dir
}

/// `n` x `n` quad grid on a gentle height field, as OBJ text.
fn terrain_obj(n: usize) -> String {
  let mut text = String::from("# terrain\no terrain\n");
  for z in 0..=n {
    for x in 0..=n {
      let height = ((x * 7 + z * 3) % 5) as f32 * 0.1;
      text.push_str(&format!("v {} {} {}\n", x, height, z));
    }
  }
  let row = n + 1;
  for z in 0..n {
    for x in 0..n {
      let a = z * row + x + 1;
      text.push_str(&format!("f {} {} {} {}\n", a, a + 1, a + row + 1, a + row));
    }
  }
  text
}

#[test]
fn mesh_split_write_and_load_per_rank() {
  let dir = temp_dir("mesh_round_trip");
  let obj_path = dir.join("terrain.obj");
  std::fs::write(&obj_path, terrain_obj(12)).unwrap();

  let mut mesh = load_obj(&obj_path).unwrap();
  assert_eq!(mesh.triangle_count(), 288);

  let splitter = MeshSplitter::new(SplitConfig::new(8).with_strategy(SplitStrategy::Median));
  let domains = splitter.split(&mut mesh).unwrap();
  assert_eq!(domains.len(), 8);

  let tri_path = dir.join("terrain.tri");
  save_mesh_file(&tri_path, &mesh, &domains).unwrap();

  // One rank per cluster: each rank sees exactly its domain.
  for (rank, domain) in domains.iter().enumerate() {
    let local = load_mesh(&tri_path, rank, domains.len()).unwrap();
    assert_eq!(local.bounds, mesh.bounds);
    assert_eq!(local.parts.len(), 1);

    let part = &local.parts[0];
    assert_eq!(part.cluster_id, rank);
    assert_eq!(part.domain, domain.bounds);
    assert_eq!(part.triangles.len(), domain.len());
    for (loaded, original) in part.triangles.iter().zip(&mesh.triangles[domain.first..domain.last]) {
      let positions: Vec<Vec3> = loaded.iter().map(|&i| local.vertices[i as usize]).collect();
      assert_eq!(positions, mesh.corners(*original).to_vec());
    }
  }

  // Three ranks: ceil(8 / 3) = 3 clusters per rank.
  let counts: Vec<usize> = (0..3)
    .map(|rank| load_mesh(&tri_path, rank, 3).unwrap().parts.len())
    .collect();
  assert_eq!(counts, vec![3, 3, 2]);

  let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn loaded_domains_drive_composite_order() {
  let dir = temp_dir("composite");
  let obj_path = dir.join("terrain.obj");
  std::fs::write(&obj_path, terrain_obj(16)).unwrap();

  let mut mesh = load_obj(&obj_path).unwrap();
  let domains = MeshSplitter::new(SplitConfig::new(16)).split(&mut mesh).unwrap();
  let tri_path = dir.join("terrain.tri");
  save_mesh_file(&tri_path, &mesh, &domains).unwrap();

  let local = load_mesh(&tri_path, 0, 1).unwrap();
  let cluster_domains = local.parts.iter().map(|part| part.domain);
  let mut partitioner = Partitioner::from_domains(cluster_domains, 4).unwrap();
  partitioner.partition_kd();

  let assigned: usize = (0..4).map(|rank| partitioner.clusters_of(rank).len()).sum();
  assert_eq!(assigned, domains.len());

  for eye in [Vec3::new(-5.0, 2.0, -5.0), Vec3::new(8.0, 40.0, 8.0), Vec3::new(30.0, 0.0, 1.0)] {
    let mut order = partitioner.compute_composite_order(eye, CompositeDirection::FrontToBack);
    let back_to_front = partitioner.compute_composite_order(eye, CompositeDirection::BackToFront);
    assert_eq!(order.iter().rev().copied().collect::<Vec<_>>(), back_to_front);
    order.sort_unstable();
    assert_eq!(order, vec![0, 1, 2, 3]);
  }

  let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn volume_split_write_and_load_per_rank() {
  let dir = temp_dir("volume_round_trip");
  let dims = IVec3::new(10, 6, 5);
  let raw_path = dir.join("ramp_10x6x5_uint16.raw");
  let samples: Vec<u8> = (0..300u16).flat_map(|v| (v * 200).to_le_bytes()).collect();
  std::fs::write(&raw_path, samples).unwrap();

  let mut volume = RawVolume::open(&raw_path, dims, ScalarType::U16).unwrap();
  let domains = VolumeSplitter::new(6).split(dims).unwrap();
  let vol_path = dir.join("ramp.vol");
  save_volume_file(&vol_path, &mut volume, &domains).unwrap();

  let mut reference = RawVolume::open(&raw_path, dims, ScalarType::U16).unwrap();
  let mut cells = 0;
  for rank in 0..3 {
    let local = load_volume(&vol_path, rank, 3).unwrap();
    assert_eq!(local.domain.cell_range, Box3i::new(IVec3::ZERO, dims));
    assert_eq!(local.bricks.len(), 2);
    for brick in &local.bricks {
      let (expected, range) = reference.read_brick(brick.domain.voxel_range).unwrap();
      assert_eq!(brick.voxels, expected);
      assert_eq!(brick.value_range, range);
      cells += brick.domain.cell_range.volume();
    }
  }
  assert_eq!(cells, 300);

  let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_and_truncated_files_are_errors() {
  let dir = temp_dir("bad_files");

  assert!(matches!(
    load_mesh(dir.join("nope.tri"), 0, 1),
    Err(LoadError::Open { .. })
  ));

  let obj_path = dir.join("terrain.obj");
  std::fs::write(&obj_path, terrain_obj(4)).unwrap();
  let mut mesh = load_obj(&obj_path).unwrap();
  let domains = MeshSplitter::new(SplitConfig::new(2)).split(&mut mesh).unwrap();
  let tri_path = dir.join("terrain.tri");
  save_mesh_file(&tri_path, &mesh, &domains).unwrap();

  let bytes = std::fs::read(&tri_path).unwrap();
  std::fs::write(&tri_path, &bytes[..bytes.len() - 10]).unwrap();
  assert!(matches!(load_mesh(&tri_path, 0, 1), Err(LoadError::Format(_))));

  let _ = std::fs::remove_dir_all(&dir);
}
