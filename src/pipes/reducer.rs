use super::Pipe;
use crate::config::{check_positive, ConfigError};
use crate::engine::Point;

#[derive(Debug, Clone, Copy, PartialEq, bon::Builder)]
pub struct ReducerConfig {
	/// Points closer than this to the previous one are dropped.
	#[builder(default = 3.0)]
	pub min_distance: f32,
	/// When set, the distance is always measured from the last emitted point. Otherwise the path
	/// length travelled since the last emitted point counts.
	#[builder(default)]
	pub hard: bool,
}

impl Default for ReducerConfig {
	fn default() -> Self {
		Self::builder().build()
	}
}

impl ReducerConfig {
	pub fn validate(&self) -> Result<(), ConfigError> {
		check_positive("min_distance", self.min_distance)
	}
}

/// Decimates a stroke so that successive points are at least `min_distance` apart.
#[derive(Debug, Clone, Default)]
pub struct Reducer {
	config: ReducerConfig,
	reference: Option<Point>,
	last: Option<Point>,
	distance: f32,
	flushed: bool,
}

impl Reducer {
	pub fn new(config: ReducerConfig) -> Self {
		Self {
			config,
			..Default::default()
		}
	}

	pub fn config(&self) -> &ReducerConfig {
		&self.config
	}
}

impl Pipe for Reducer {
	fn pipe(&mut self, point: Point) -> Vec<Point> {
		debug_assert!(!self.flushed, "Reducer::pipe after flush");
		self.last = Some(point);

		let Some(reference) = self.reference else {
			self.reference = Some(point);
			self.distance = 0.0;
			return vec![point];
		};

		if self.config.hard {
			self.distance = 0.0;
		}
		self.distance += reference.position.distance(point.position);

		if self.distance > self.config.min_distance {
			self.distance = 0.0;
			self.reference = Some(point);
			vec![point]
		} else {
			if !self.config.hard {
				self.reference = Some(point);
			}
			vec![]
		}
	}

	fn flush(&mut self) -> Vec<Point> {
		if std::mem::replace(&mut self.flushed, true) {
			return vec![];
		}
		// Unemitted movement is pending, so end the stroke where the input ended.
		match self.last {
			Some(last) if self.distance > 0.0 => vec![last],
			_ => vec![],
		}
	}
}
