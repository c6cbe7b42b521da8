use glam::{IVec2, Vec2};
use itertools::Itertools;

/// An axis-aligned rectangle given by its `min` and `max` corners.
///
/// Unlike a half-open pixel rectangle, both corners are part of the box: a
/// point lying exactly on `max` is contained, and iterating the grid of a
/// floored box visits `max` as well.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds2 {
	pub min: Vec2,
	pub max: Vec2,
}

impl Default for Bounds2 {
	fn default() -> Self {
		Self::empty()
	}
}

impl Bounds2 {
	pub fn new(min: Vec2, max: Vec2) -> Self {
		Self { min, max }
	}

	/// The identity of `extend`: any point extends it to exactly that point.
	pub fn empty() -> Self {
		Self::new(Vec2::INFINITY, Vec2::NEG_INFINITY)
	}

	pub fn is_empty(&self) -> bool {
		self.min.x > self.max.x || self.min.y > self.max.y
	}

	pub fn extend(self, point: Vec2) -> Self {
		Self::new(self.min.min(point), self.max.max(point))
	}

	/// Extends the box to cover a disc of `radius` around `center`.
	pub fn extend_by_radius(self, center: Vec2, radius: f32) -> Self {
		self.extend(center - radius).extend(center + radius)
	}

	pub fn containing(points: impl IntoIterator<Item = Vec2>) -> Self {
		points.into_iter().fold(Self::empty(), Self::extend)
	}

	pub fn union(self, other: Self) -> Self {
		Self::new(self.min.min(other.min), self.max.max(other.max))
	}

	pub fn intersection(self, other: Self) -> Self {
		Self::new(self.min.max(other.min), self.max.min(other.max))
	}

	pub fn translated(self, offset: Vec2) -> Self {
		Self::new(self.min + offset, self.max + offset)
	}

	pub fn scaled(self, factor: Vec2) -> Self {
		Self::new(self.min * factor, self.max * factor)
	}

	/// Divides both corners component-wise, e.g. to convert canvas units into tile units.
	pub fn divided(self, divisor: Vec2) -> Self {
		Self::new(self.min / divisor, self.max / divisor)
	}

	pub fn floor(self) -> Self {
		Self::new(self.min.floor(), self.max.floor())
	}

	pub fn contains(&self, point: Vec2) -> bool {
		point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
	}

	/// Every integer coordinate inside the box, row by row.
	///
	/// Empty and unbounded boxes yield nothing.
	pub fn grid_points(&self) -> impl Iterator<Item = IVec2> {
		let (start, end) = if self.is_empty() || !self.min.is_finite() || !self.max.is_finite() {
			(IVec2::ONE, IVec2::ZERO)
		} else {
			(self.min.ceil().as_ivec2(), self.max.floor().as_ivec2())
		};
		(start.y..=end.y)
			.cartesian_product(start.x..=end.x)
			.map(|(y, x)| IVec2::new(x, y))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use glam::{ivec2, vec2};
	use itertools::Itertools;

	#[test]
	fn empty_is_identity_of_extend() {
		let bounds = Bounds2::empty();
		assert!(bounds.is_empty());
		assert!(!bounds.contains(Vec2::ZERO));

		let bounds = bounds.extend(vec2(3.0, -2.0));
		assert!(!bounds.is_empty());
		assert_eq!(bounds, Bounds2::new(vec2(3.0, -2.0), vec2(3.0, -2.0)));
	}

	#[test]
	fn contains_is_inclusive() {
		let bounds = Bounds2::new(vec2(0.0, 0.0), vec2(2.0, 1.0));
		assert!(bounds.contains(vec2(0.0, 0.0)));
		assert!(bounds.contains(vec2(2.0, 1.0)));
		assert!(bounds.contains(vec2(1.0, 0.5)));
		assert!(!bounds.contains(vec2(2.0001, 0.5)));
		assert!(!bounds.contains(vec2(1.0, -0.0001)));
	}

	#[test]
	fn extend_by_radius() {
		let bounds = Bounds2::empty()
			.extend_by_radius(vec2(10.0, 10.0), 2.0)
			.extend_by_radius(vec2(20.0, 5.0), 0.5);
		assert_eq!(bounds.min, vec2(8.0, 4.5));
		assert_eq!(bounds.max, vec2(20.5, 12.0));
	}

	#[test]
	fn transforms() {
		let bounds = Bounds2::containing([vec2(-10.0, 5.0), vec2(30.0, 25.0)]);
		assert_eq!(
			bounds.translated(vec2(10.0, -5.0)),
			Bounds2::new(vec2(0.0, 0.0), vec2(40.0, 20.0))
		);
		assert_eq!(
			bounds.divided(vec2(20.0, 10.0)).floor(),
			Bounds2::new(vec2(-1.0, 0.0), vec2(1.0, 2.0))
		);
		assert_eq!(
			bounds.scaled(vec2(2.0, 0.5)),
			Bounds2::new(vec2(-20.0, 2.5), vec2(60.0, 12.5))
		);
	}

	#[test]
	fn divided_by_zero_is_infinite() {
		let bounds = Bounds2::new(vec2(1.0, -1.0), vec2(2.0, 2.0)).divided(vec2(0.0, 1.0));
		assert_eq!(bounds.min.x, f32::INFINITY);
		assert_eq!(bounds.max.y, 2.0);
		assert_eq!(bounds.grid_points().count(), 0);
	}

	#[test]
	fn grid_points_are_inclusive() {
		let bounds = Bounds2::new(vec2(-1.0, 0.0), vec2(1.0, 1.0));
		assert_eq!(
			bounds.grid_points().collect_vec(),
			vec![
				ivec2(-1, 0),
				ivec2(0, 0),
				ivec2(1, 0),
				ivec2(-1, 1),
				ivec2(0, 1),
				ivec2(1, 1),
			]
		);
		assert_eq!(Bounds2::empty().grid_points().count(), 0);
	}

	#[test]
	fn intersection_and_union() {
		let a = Bounds2::new(vec2(0.0, 0.0), vec2(4.0, 4.0));
		let b = Bounds2::new(vec2(2.0, -2.0), vec2(6.0, 2.0));
		assert_eq!(a.intersection(b), Bounds2::new(vec2(2.0, 0.0), vec2(4.0, 2.0)));
		assert_eq!(a.union(b), Bounds2::new(vec2(0.0, -2.0), vec2(6.0, 4.0)));
		assert!(a
			.intersection(Bounds2::new(vec2(5.0, 5.0), vec2(6.0, 6.0)))
			.is_empty());
	}
}
