use super::Pipe;
use crate::config::{check_at_least, check_positive, check_unit, ConfigError};
use crate::engine::Point;
use glam::{Vec2, Vec4};

/// Keeps the parameter advancing even when the configured bounds do not.
const MIN_STEP: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, bon::Builder)]
pub struct InterpolatorConfig {
	/// Tension: `0` gives Catmull-Rom tangents, `1` gives straight lines.
	#[builder(default = 0.0)]
	pub c: f32,
	/// Desired spacing between output points relative to the segment length. Higher is coarser.
	#[builder(default = 1.0)]
	pub quality: f32,
	/// How much changing pressure counts towards curve detail.
	#[builder(default = 30.0)]
	pub pressure_weight: f32,
	/// Minimum advance of the curve parameter per output point.
	#[builder(default = 0.07)]
	pub t0: f32,
	/// Maximum advance of the curve parameter per output point.
	#[builder(default = 0.4)]
	pub t1: f32,
	/// Maximum advance from the start of a segment.
	#[builder(default = 0.2)]
	pub tx: f32,
}

impl Default for InterpolatorConfig {
	fn default() -> Self {
		Self::builder().build()
	}
}

impl InterpolatorConfig {
	pub fn validate(&self) -> Result<(), ConfigError> {
		check_unit("c", self.c)?;
		check_positive("quality", self.quality)?;
		check_at_least("pressure_weight", "non-negative", self.pressure_weight, 0.0)?;
		check_positive("t0", self.t0)?;
		check_at_least("t1", "at least t0", self.t1, self.t0)?;
		check_at_least("tx", "at least t0", self.tx, self.t0)
	}
}

/// A point as the four channels that are interpolated independently.
fn channels(point: &Point) -> Vec4 {
	Vec4::new(point.time, point.pressure, point.position.x, point.position.y)
}

fn from_channels(v: Vec4) -> Point {
	Point {
		time: v.x,
		pressure: v.y,
		position: Vec2::new(v.z, v.w),
	}
}

/// A cubic Hermite segment over `t` in `[0, 1]`, evaluated on all channels at once.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Hermite {
	p0: Vec4,
	m0: Vec4,
	p1: Vec4,
	m1: Vec4,
}

impl Hermite {
	fn value(&self, t: f32) -> Vec4 {
		let t2 = t * t;
		let t3 = t2 * t;
		self.p0 * (2.0 * t3 - 3.0 * t2 + 1.0)
			+ self.m0 * (t3 - 2.0 * t2 + t)
			+ self.p1 * (-2.0 * t3 + 3.0 * t2)
			+ self.m1 * (t3 - t2)
	}

	fn derivative(&self, t: f32) -> Vec4 {
		let t2 = t * t;
		self.p0 * (6.0 * t2 - 6.0 * t)
			+ self.m0 * (3.0 * t2 - 4.0 * t + 1.0)
			+ self.p1 * (-6.0 * t2 + 6.0 * t)
			+ self.m1 * (3.0 * t2 - 2.0 * t)
	}

	fn second_derivative(&self, t: f32) -> Vec4 {
		self.p0 * (12.0 * t - 6.0)
			+ self.m0 * (6.0 * t - 4.0)
			+ self.p1 * (-12.0 * t + 6.0)
			+ self.m1 * (6.0 * t - 2.0)
	}
}

/// Refines a sparse polyline into a dense Hermite spline, placing more points where the curve
/// bends or the pressure changes quickly.
///
/// The tangent at a point depends on its successor, so output lags one segment behind the input:
/// the segment between the third- and second-newest points is emitted when a point arrives.
#[derive(Debug, Clone, Default)]
pub struct Interpolator {
	config: InterpolatorConfig,
	points: Vec<Point>,
	flushed: bool,
}

impl Interpolator {
	/// The number of raw points, ending at the one just piped, that the output of a single `pipe`
	/// call depends on.
	pub const SUPPORT_REGION: usize = 4;

	pub fn new(config: InterpolatorConfig) -> Self {
		Self {
			config,
			..Default::default()
		}
	}

	pub fn config(&self) -> &InterpolatorConfig {
		&self.config
	}

	pub fn points(&self) -> &[Point] {
		&self.points
	}

	fn tangent(&self, i: usize) -> Vec4 {
		let n = self.points.len();
		if i == 0 || i + 1 >= n {
			// Clamped boundary condition.
			return Vec4::ZERO;
		}
		(channels(&self.points[i + 1]) - channels(&self.points[i - 1])) * (0.5 * (1.0 - self.config.c))
	}

	fn interpolate_newest_segment(&mut self, point: Point) -> Vec<Point> {
		self.points.push(point);
		let n = self.points.len();
		if n < 3 {
			return vec![];
		}

		let left = n - 3;
		let right = left + 1;
		let segment = Hermite {
			p0: channels(&self.points[left]),
			m0: self.tangent(left),
			p1: channels(&self.points[right]),
			m1: self.tangent(right),
		};
		let chord = self.points[left]
			.position
			.distance(self.points[right].position);

		let InterpolatorConfig {
			quality,
			pressure_weight,
			t0,
			t1,
			tx,
			..
		} = self.config;

		let mut result = Vec::new();
		let mut t = 0f32;
		while t < 1.0 {
			let value = segment.value(t);
			let d1 = segment.derivative(t);
			let d2 = segment.second_derivative(t);
			result.push(from_channels(value));

			let (dx, dy) = (d1.z, d1.w);
			let hyp = dx.hypot(dy);
			let curvature = (d2.z * dy - d2.w * dx).abs() / (hyp + 1e-8);
			let pressure_rate = (d1.y * d1.y / (value.y + 32.0)).abs();
			let speed = curvature + pressure_weight * pressure_rate;

			let wanted = quality * chord / (speed + 1e-5);
			let max_step = if t == 0.0 { tx } else { t1 };
			// `max` ignores NaN, so a motionless segment advances by `t0`.
			let step = (wanted / hyp).max(t0).min(max_step);
			t += step.max(MIN_STEP);
		}
		result
	}
}

impl Pipe for Interpolator {
	fn pipe(&mut self, point: Point) -> Vec<Point> {
		debug_assert!(!self.flushed, "Interpolator::pipe after flush");
		self.interpolate_newest_segment(point)
	}

	/// Closes the final segment by repeating the last point, then ends exactly on it.
	fn flush(&mut self) -> Vec<Point> {
		if std::mem::replace(&mut self.flushed, true) {
			return vec![];
		}
		let Some(&last) = self.points.last() else {
			return vec![];
		};
		let mut result = self.interpolate_newest_segment(last);
		result.push(last);
		result
	}
}
