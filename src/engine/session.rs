use super::{Point, Stroke};
use crate::config::{PipelineConfig, SmoothingMode};
use crate::geom::Bounds2;
use crate::pipes::{Interpolator, Pipe, Reducer, Smoothener};
use glam::Vec2;
use std::time::Duration;

pub const DEFAULT_BRUSH_SIZE: f32 = 4.0;
pub const DEFAULT_COLOR: &str = "#000000";
/// Simulated pressure reaches one half at this distance between samples.
const SIMULATED_HALF_PRESSURE_SPEED: f32 = 20.0;

/// Where the pressure of each point comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PressureMode {
	/// Every point has full pressure.
	None,
	#[default]
	Device,
	/// Faster movement draws wider lines.
	Simulate,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("invalid color `{color}`")]
	Color {
		color: String,
		#[source]
		source: csscolorparser::ParseColorError,
	},
	#[error("brush size must be positive and finite, got {0}")]
	Size(f32),
}

static_assertions::assert_impl_all!(SettingsError: std::error::Error, Send, Sync);

/// The user's brush, applied to every stroke started with it.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeSettings {
	size: f32,
	color: String,
	pressure_mode: PressureMode,
	smoothing_mode: SmoothingMode,
}

impl Default for StrokeSettings {
	fn default() -> Self {
		Self {
			size: DEFAULT_BRUSH_SIZE,
			color: DEFAULT_COLOR.to_owned(),
			pressure_mode: PressureMode::default(),
			smoothing_mode: SmoothingMode::default(),
		}
	}
}

impl StrokeSettings {
	/// Accepts any CSS color and stores it as lowercase hex.
	pub fn new(size: f32, color: &str) -> Result<Self, SettingsError> {
		if !(size > 0.0 && size.is_finite()) {
			return Err(SettingsError::Size(size));
		}
		let parsed = csscolorparser::parse(color).map_err(|source| SettingsError::Color {
			color: color.to_owned(),
			source,
		})?;
		let [r, g, b, a] = parsed.to_rgba8();
		let color = if a == u8::MAX {
			format!("#{r:02x}{g:02x}{b:02x}")
		} else {
			format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
		};
		Ok(Self {
			size,
			color,
			..Default::default()
		})
	}

	pub fn with_pressure_mode(self, pressure_mode: PressureMode) -> Self {
		Self {
			pressure_mode,
			..self
		}
	}

	pub fn with_smoothing_mode(self, smoothing_mode: SmoothingMode) -> Self {
		Self {
			smoothing_mode,
			..self
		}
	}

	pub fn size(&self) -> f32 {
		self.size
	}

	pub fn color(&self) -> &str {
		&self.color
	}

	pub fn pressure_mode(&self) -> PressureMode {
		self.pressure_mode
	}

	pub fn smoothing_mode(&self) -> SmoothingMode {
		self.smoothing_mode
	}

	pub fn pipeline(&self) -> PipelineConfig {
		PipelineConfig::from(self.smoothing_mode)
	}
}

/// One raw pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
	pub position: Vec2,
	/// Device pressure in `[0, 1]`.
	pub pressure: f32,
	pub timestamp: Duration,
}

impl PointerSample {
	pub fn new(position: Vec2, pressure: f32, timestamp: Duration) -> Self {
		Self {
			position,
			pressure,
			timestamp,
		}
	}
}

/// Everything a session produced once the pointer was lifted.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedStroke {
	/// The smoothed points, at wire precision.
	pub stroke: Stroke,
	/// Screen-space region of everything drawn, including line width.
	pub bounds: Bounds2,
	/// The points still to be drawn to complete the stroke.
	pub tail: Vec<Point>,
}

/// A stroke being drawn. Dropping it cancels the stroke.
#[derive(Debug, Clone)]
pub struct StrokeSession {
	settings: StrokeSettings,
	start: Duration,
	reducer: Reducer,
	smoothener: Smoothener,
	interpolator: Interpolator,
	stroke: Stroke,
	bounds: Bounds2,
	last_position: Option<Vec2>,
	last_drawn: Option<Point>,
}

impl StrokeSession {
	pub fn new(settings: StrokeSettings, start: Duration) -> Self {
		Self::with_pipeline(settings.pipeline(), settings, start)
	}

	pub fn with_pipeline(config: PipelineConfig, settings: StrokeSettings, start: Duration) -> Self {
		Self {
			stroke: Stroke::new(settings.color()),
			settings,
			start,
			reducer: Reducer::new(config.reducer),
			smoothener: Smoothener::new(config.smoothener),
			interpolator: Interpolator::new(config.interpolator),
			bounds: Bounds2::empty(),
			last_position: None,
			last_drawn: None,
		}
	}

	pub fn settings(&self) -> &StrokeSettings {
		&self.settings
	}

	pub fn stroke(&self) -> &Stroke {
		&self.stroke
	}

	pub fn bounds(&self) -> Bounds2 {
		self.bounds
	}

	/// The most recently drawn point, which the next batch continues from.
	pub fn last_drawn(&self) -> Option<Point> {
		self.last_drawn
	}

	fn point(&mut self, sample: PointerSample) -> Point {
		let speed = self
			.last_position
			.map_or(0.0, |last| last.distance(sample.position));
		self.last_position = Some(sample.position);

		let pressure = match self.settings.pressure_mode {
			PressureMode::None => 1.0,
			PressureMode::Device => sample.pressure,
			PressureMode::Simulate => speed / (speed + SIMULATED_HALF_PRESSURE_SPEED),
		};
		Point::new(
			sample.timestamp.saturating_sub(self.start).as_secs_f32(),
			pressure * self.settings.size,
			sample.position,
		)
	}

	/// Adds smoothed points to the stroke at wire precision and returns the ones that were kept.
	fn store(&mut self, points: Vec<Point>) -> Vec<Point> {
		let mut stored = Vec::with_capacity(points.len());
		for point in points.into_iter().map(Point::quantized) {
			// Same-pixel neighbours would give the interpolator a degenerate segment.
			if self
				.stroke
				.points
				.last()
				.is_some_and(|last| last.position == point.position)
			{
				continue;
			}
			self.stroke.points.push(point);
			stored.push(point);
		}
		stored
	}

	fn track(&mut self, drawn: &[Point]) {
		self.bounds = drawn.iter().fold(self.bounds, |bounds, point| {
			bounds.extend_by_radius(point.position, point.pressure / 2.0)
		});
		if let Some(&last) = drawn.last() {
			self.last_drawn = Some(last);
		}
	}

	/// Feeds one sample through the pipeline and returns the points that are ready to draw.
	pub fn add_sample(&mut self, sample: PointerSample) -> Vec<Point> {
		let point = self.point(sample);
		let reduced = self.reducer.pipe(point);
		let smoothed = self.smoothener.pipe_all(reduced);
		let stored = self.store(smoothed);
		let drawn = self.interpolator.pipe_all(stored);
		self.track(&drawn);
		drawn
	}

	pub fn finish(mut self) -> FinishedStroke {
		let reduced = self.reducer.flush();
		let smoothed = self.smoothener.process(reduced);
		let stored = self.store(smoothed);
		let tail = self.interpolator.process(stored);
		self.track(&tail);
		tracing::debug!(
			points = self.stroke.points.len(),
			bounds = ?self.bounds,
			"finished stroke"
		);
		FinishedStroke {
			stroke: self.stroke,
			bounds: self.bounds,
			tail,
		}
	}
}
