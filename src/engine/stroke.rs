use glam::Vec2;

/// Pressure is transmitted in fixed point with this many steps per unit.
pub const PRESSURE_QUANTUM: f32 = 8.0;
/// Decompressed pressure is clamped into this range.
pub const PRESSURE_CLAMP: (f32, f32) = (0.0, 100.0);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
	/// Seconds since the first point of the stroke.
	pub time: f32,
	/// Brush diameter at this point.
	pub pressure: f32,
	pub position: Vec2,
}

static_assertions::assert_impl_all!(Point: Copy, Send, Sync);

impl Point {
	pub fn new(time: f32, pressure: f32, position: Vec2) -> Self {
		Self {
			time,
			pressure,
			position,
		}
	}

	/// Snaps the point to the precision it will have after a `deflate`/`inflate` round trip.
	pub fn quantized(self) -> Self {
		Self {
			time: self.time,
			pressure: (self.pressure * PRESSURE_QUANTUM).floor() / PRESSURE_QUANTUM,
			position: self.position.floor(),
		}
	}

	pub fn translated(self, offset: Vec2) -> Self {
		Self {
			position: self.position + offset,
			..self
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stroke {
	pub color: String,
	pub points: Vec<Point>,
}

/// The wire and storage form of a `Stroke`.
///
/// `data` holds one `(pressure * 8, x, y)` triple per point, all floored to integers. Time is not
/// transmitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CompressedStroke {
	pub color: String,
	pub data: Vec<i32>,
}

impl Stroke {
	pub fn new(color: impl Into<String>) -> Self {
		Self {
			color: color.into(),
			points: Vec::new(),
		}
	}

	pub fn with_points(color: impl Into<String>, points: Vec<Point>) -> Self {
		Self {
			color: color.into(),
			points,
		}
	}

	pub fn deflate(&self) -> CompressedStroke {
		let data = self
			.points
			.iter()
			.flat_map(|point| {
				[
					(point.pressure * PRESSURE_QUANTUM).floor() as i32,
					point.position.x.floor() as i32,
					point.position.y.floor() as i32,
				]
			})
			.collect();
		CompressedStroke {
			color: self.color.clone(),
			data,
		}
	}
}

impl CompressedStroke {
	pub fn len(&self) -> usize {
		self.data.len() / 3
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Trailing values that do not form a full triple are ignored.
	pub fn inflate(&self) -> Stroke {
		let (min_pressure, max_pressure) = PRESSURE_CLAMP;
		let points = self
			.data
			.chunks_exact(3)
			.map(|triple| Point {
				time: 0.0,
				pressure: (triple[0] as f32 / PRESSURE_QUANTUM).clamp(min_pressure, max_pressure),
				position: Vec2::new(triple[1] as f32, triple[2] as f32),
			})
			.collect();
		Stroke {
			color: self.color.clone(),
			points,
		}
	}
}

impl From<&Stroke> for CompressedStroke {
	fn from(stroke: &Stroke) -> Self {
		stroke.deflate()
	}
}

impl From<&CompressedStroke> for Stroke {
	fn from(stroke: &CompressedStroke) -> Self {
		stroke.inflate()
	}
}
