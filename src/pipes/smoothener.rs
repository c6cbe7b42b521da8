use super::Pipe;
use crate::config::{check_unit, ConfigError};
use crate::engine::Point;

#[derive(Debug, Clone, Copy, PartialEq, bon::Builder)]
pub struct SmoothenerConfig {
	/// How far the running mean moves towards each new position. `1.0` disables smoothing.
	#[builder(default = 0.9)]
	pub position_weight: f32,
	#[builder(default = 0.5)]
	pub pressure_weight: f32,
}

impl Default for SmoothenerConfig {
	fn default() -> Self {
		Self::builder().build()
	}
}

impl SmoothenerConfig {
	pub fn validate(&self) -> Result<(), ConfigError> {
		check_unit("position_weight", self.position_weight)?;
		check_unit("pressure_weight", self.pressure_weight)
	}
}

/// Replaces points with an exponential moving average to suppress jitter.
#[derive(Debug, Clone, Default)]
pub struct Smoothener {
	config: SmoothenerConfig,
	mean: Option<Point>,
	last_input: Option<Point>,
	flushed: bool,
}

impl Smoothener {
	pub fn new(config: SmoothenerConfig) -> Self {
		Self {
			config,
			..Default::default()
		}
	}

	pub fn config(&self) -> &SmoothenerConfig {
		&self.config
	}

	pub fn mean(&self) -> Option<Point> {
		self.mean
	}
}

impl Pipe for Smoothener {
	fn pipe(&mut self, point: Point) -> Vec<Point> {
		debug_assert!(!self.flushed, "Smoothener::pipe after flush");
		self.last_input = Some(point);

		let SmoothenerConfig {
			position_weight,
			pressure_weight,
		} = self.config;
		let mean = match self.mean {
			None => point,
			Some(mean) => Point {
				time: point.time,
				pressure: (1.0 - pressure_weight) * mean.pressure + pressure_weight * point.pressure,
				position: mean.position * (1.0 - position_weight) + point.position * position_weight,
			},
		};
		self.mean = Some(mean);
		vec![mean]
	}

	fn flush(&mut self) -> Vec<Point> {
		if std::mem::replace(&mut self.flushed, true) {
			return vec![];
		}
		// End exactly at the raw final position. Repeating a position the mean already reached
		// would leave the interpolator a zero-length closing segment. In that case the stroke ends
		// on the smoothed pressure rather than the raw final one.
		match (self.last_input, self.mean) {
			(Some(last), Some(mean)) if last.position != mean.position => vec![last],
			_ => vec![],
		}
	}
}
