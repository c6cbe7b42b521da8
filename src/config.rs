use crate::pipes::{InterpolatorConfig, ReducerConfig, SmoothenerConfig};

/// Rendering quality used for live strokes and for replaying stored ones. Higher is coarser.
pub const STROKE_QUALITY: f32 = 4.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
	#[error("`{name}` must be {expected}, got {value}")]
	OutOfRange {
		name: &'static str,
		expected: &'static str,
		value: f32,
	},
}

static_assertions::assert_impl_all!(ConfigError: std::error::Error, Send, Sync);

pub(crate) fn check_positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
	if value > 0.0 && value.is_finite() {
		Ok(())
	} else {
		Err(ConfigError::OutOfRange {
			name,
			expected: "positive and finite",
			value,
		})
	}
}

pub(crate) fn check_unit(name: &'static str, value: f32) -> Result<(), ConfigError> {
	if (0.0..=1.0).contains(&value) {
		Ok(())
	} else {
		Err(ConfigError::OutOfRange {
			name,
			expected: "within [0, 1]",
			value,
		})
	}
}

pub(crate) fn check_at_least(
	name: &'static str,
	expected: &'static str,
	value: f32,
	min: f32,
) -> Result<(), ConfigError> {
	if value >= min {
		Ok(())
	} else {
		Err(ConfigError::OutOfRange {
			name,
			expected,
			value,
		})
	}
}

/// How strongly raw input is decimated and smoothed before interpolation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SmoothingMode {
	Off,
	#[default]
	Gentle,
	Strong,
}

/// The parameters of all three stages of a drawing session.
#[derive(Debug, Clone, Copy, PartialEq, bon::Builder)]
pub struct PipelineConfig {
	#[builder(default)]
	pub reducer: ReducerConfig,
	#[builder(default)]
	pub smoothener: SmoothenerConfig,
	#[builder(default = InterpolatorConfig::builder().quality(STROKE_QUALITY).build())]
	pub interpolator: InterpolatorConfig,
}

impl Default for PipelineConfig {
	fn default() -> Self {
		Self::from(SmoothingMode::default())
	}
}

impl From<SmoothingMode> for PipelineConfig {
	fn from(mode: SmoothingMode) -> Self {
		let (position_weight, pressure_weight, min_distance) = match mode {
			SmoothingMode::Off => (1.0, 0.7, 3.0),
			SmoothingMode::Gentle => (0.7, 0.35, 5.0),
			SmoothingMode::Strong => (0.3, 0.25, 8.0),
		};
		Self::builder()
			.reducer(ReducerConfig::builder().min_distance(min_distance).build())
			.smoothener(
				SmoothenerConfig::builder()
					.position_weight(position_weight)
					.pressure_weight(pressure_weight)
					.build(),
			)
			.build()
	}
}

impl PipelineConfig {
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.reducer.validate()?;
		self.smoothener.validate()?;
		self.interpolator.validate()
	}
}
