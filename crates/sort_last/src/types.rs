//! Core data types shared by the partitioner, the splitters and the loaders.
//!
//! The box types are `#[repr(C)]` and `Pod` so they can be written to and
//! read from partitioned files as raw little-endian records.

use bytemuck::{Pod, Zeroable};
use glam::{I64Vec3, IVec3, Vec3};

/// Float axis-aligned bounding box (`box3` on disk: lower xyz, upper xyz).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Box3 {
	pub lower: Vec3,
	pub upper: Vec3,
}

impl Box3 {
	/// Create box with inverted extents (ready for extension).
	pub fn empty() -> Self {
		Self {
			lower: Vec3::splat(f32::INFINITY),
			upper: Vec3::splat(f32::NEG_INFINITY),
		}
	}

	pub fn new(lower: Vec3, upper: Vec3) -> Self {
		Self { lower, upper }
	}

	/// Expand box to include a point.
	#[inline]
	pub fn extend(&mut self, point: Vec3) {
		self.lower = self.lower.min(point);
		self.upper = self.upper.max(point);
	}

	/// Expand box to include another box.
	#[inline]
	pub fn extend_box(&mut self, other: &Box3) {
		self.extend(other.lower);
		self.extend(other.upper);
	}

	/// Check if box is valid (lower <= upper on all axes).
	pub fn is_valid(&self) -> bool {
		self.lower.cmple(self.upper).all()
	}

	#[inline]
	pub fn size(&self) -> Vec3 {
		self.upper - self.lower
	}

	#[inline]
	pub fn center(&self) -> Vec3 {
		self.lower + self.size() * 0.5
	}

	#[inline]
	pub fn volume(&self) -> f32 {
		let size = self.size();
		size.x * size.y * size.z
	}

	/// Axis with the largest extent. Ties favor x, then y.
	#[inline]
	pub fn largest_axis(&self) -> usize {
		let size = self.size();
		largest_axis([size.x, size.y, size.z])
	}
}

impl Default for Box3 {
	fn default() -> Self {
		Self::empty()
	}
}

/// Integer box over cell or voxel coordinates, half-open `[lower, upper)`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Box3i {
	pub lower: IVec3,
	pub upper: IVec3,
}

impl Box3i {
	pub fn new(lower: IVec3, upper: IVec3) -> Self {
		Self { lower, upper }
	}

	/// Per-axis extent. Callers pass boxes whose extents fit in `i32`; use
	/// [`extent`](Self::extent) for untrusted ranges.
	#[inline]
	pub fn size(&self) -> IVec3 {
		self.upper - self.lower
	}

	/// Per-axis extent without overflow.
	#[inline]
	pub fn extent(&self) -> I64Vec3 {
		self.upper.as_i64vec3() - self.lower.as_i64vec3()
	}

	/// Number of cells covered; zero when any extent is non-positive, `None`
	/// when the count does not fit in an `i64`.
	pub fn checked_volume(&self) -> Option<i64> {
		let extent = self.extent();
		if extent.cmple(I64Vec3::ZERO).any() {
			return Some(0);
		}
		extent.x.checked_mul(extent.y)?.checked_mul(extent.z)
	}

	/// Number of cells covered, saturating at `i64::MAX`.
	#[inline]
	pub fn volume(&self) -> i64 {
		self.checked_volume().unwrap_or(i64::MAX)
	}

	pub fn is_empty(&self) -> bool {
		self.volume() == 0
	}

	#[inline]
	pub fn contains(&self, point: IVec3) -> bool {
		point.cmpge(self.lower).all() && point.cmplt(self.upper).all()
	}

	/// Axis with the largest extent. Ties favor x, then y.
	#[inline]
	pub fn largest_axis(&self) -> usize {
		let size = self.size();
		largest_axis([size.x, size.y, size.z])
	}

	/// Float box spanning the same coordinates.
	pub fn as_box3(&self) -> Box3 {
		Box3::new(self.lower.as_vec3(), self.upper.as_vec3())
	}
}

/// Scalar value range (`box1` on disk).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Box1 {
	pub lower: f32,
	pub upper: f32,
}

impl Box1 {
	pub fn empty() -> Self {
		Self {
			lower: f32::MAX,
			upper: -f32::MAX,
		}
	}

	pub fn new(lower: f32, upper: f32) -> Self {
		Self { lower, upper }
	}

	#[inline]
	pub fn extend(&mut self, value: f32) {
		self.lower = self.lower.min(value);
		self.upper = self.upper.max(value);
	}

	pub fn extend_range(&mut self, other: &Box1) {
		self.extend(other.lower);
		self.extend(other.upper);
	}

	pub fn is_valid(&self) -> bool {
		self.lower <= self.upper
	}
}

impl Default for Box1 {
	fn default() -> Self {
		Self::empty()
	}
}

/// Pick the split axis from per-axis extents.
///
/// y wins only if strictly larger than x and at least z; z wins only if
/// strictly larger than x and at least y; otherwise x.
pub fn largest_axis<T: PartialOrd + Copy>(size: [T; 3]) -> usize {
	if size[1] > size[0] && size[1] >= size[2] {
		1
	} else if size[2] > size[0] && size[2] >= size[1] {
		2
	} else {
		0
	}
}

/// A named, bounded group of primitives assigned to exactly one rank.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cluster {
	/// Unique id; equals the cluster's index in its list.
	pub id: usize,
	/// Owning rank, `None` until a partitioner has run.
	pub rank: Option<usize>,
	/// Domain bounds; domains of distinct clusters do not overlap.
	pub domain: Box3,
}

impl Cluster {
	pub fn new(id: usize, domain: Box3) -> Self {
		Self {
			id,
			rank: None,
			domain,
		}
	}
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
