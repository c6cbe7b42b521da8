//! Streaming transforms applied to the points of a single stroke.
//!
//! Every stage is a one-shot session: it is fed with `pipe` until the stroke ends, then `flush`ed
//! exactly once and dropped. Stages never share state, so concurrent strokes simply use separate
//! instances.

use crate::engine::Point;

mod reducer;
pub use reducer::*;

mod smoothener;
pub use smoothener::*;

mod interpolator;
pub use interpolator::*;

pub trait Pipe {
	/// Consumes one point and returns the points that are ready downstream. May return nothing
	/// while the stage is buffering.
	fn pipe(&mut self, point: Point) -> Vec<Point>;

	/// Ends the stream and returns whatever the stage was holding back. Calling it again returns
	/// nothing.
	fn flush(&mut self) -> Vec<Point>;

	/// Pipes a batch of points without flushing.
	fn pipe_all(&mut self, points: impl IntoIterator<Item = Point>) -> Vec<Point>
	where
		Self: Sized,
	{
		points
			.into_iter()
			.flat_map(|point| self.pipe(point))
			.collect()
	}

	/// Pipes a batch of points and flushes.
	fn process(&mut self, points: impl IntoIterator<Item = Point>) -> Vec<Point>
	where
		Self: Sized,
	{
		let mut result = self.pipe_all(points);
		result.extend(self.flush());
		result
	}
}
