use super::{CompressedStroke, Point, Stroke, TileGrid, TileId};
use crate::geom::Bounds2;
use crate::pipes::{Interpolator, InterpolatorConfig, Pipe};
use glam::Vec2;
use itertools::Itertools;
use std::collections::BTreeMap;

/// The pieces of one stroke, in tile-local coordinates, keyed by the tile they belong to.
pub type StrokesByTile = BTreeMap<TileId, Vec<CompressedStroke>>;

/// Cuts finished strokes into per-tile pieces.
///
/// A piece keeps every raw point whose interpolated neighbourhood touches the tile, so replaying
/// the piece through an interpolator reproduces the part of the curve that lands on the tile.
#[derive(Debug, Clone, Default)]
pub struct StrokeClipper {
	grid: TileGrid,
	interpolator: InterpolatorConfig,
}

impl StrokeClipper {
	pub fn new(grid: TileGrid, interpolator: InterpolatorConfig) -> Self {
		Self { grid, interpolator }
	}

	pub fn grid(&self) -> &TileGrid {
		&self.grid
	}

	/// The screen-space region covered by `points` once interpolated and given width.
	pub fn stroke_bounds(&self, points: &[Point]) -> Bounds2 {
		Interpolator::new(self.interpolator)
			.process(points.iter().copied())
			.into_iter()
			.fold(Bounds2::empty(), |bounds, point| {
				bounds.extend_by_radius(point.position, point.pressure / 2.0)
			})
	}

	/// Tiles that may receive a piece of a stroke covering `bounds` on a screen scrolled to
	/// `scroll`.
	pub fn candidate_tiles(&self, bounds: Bounds2, scroll: Vec2) -> impl Iterator<Item = TileId> {
		self.grid.tiles_intersecting(bounds.translated(scroll))
	}

	/// Marks the raw points needed to redraw the part of the stroke inside `tile`.
	fn important_points(&self, points: &[Point], tile: TileId, scroll: Vec2) -> Vec<bool> {
		let tile_bounds = self.grid.tile_bounds(tile);
		let touches_tile = |point: &Point| {
			let radius = point.pressure / 2.0;
			Bounds2::new(tile_bounds.min - radius, tile_bounds.max + radius)
				.contains(point.position + scroll)
		};

		let mut interpolator = Interpolator::new(self.interpolator);
		let mut important = vec![false; points.len()];
		// The final step is the flush, which closes the segment ending at the last point.
		for step in 0..=points.len() {
			let output = match points.get(step) {
				Some(&point) => interpolator.pipe(point),
				None => interpolator.flush(),
			};
			if output.iter().any(touches_tile) {
				let first = step.saturating_sub(Interpolator::SUPPORT_REGION - 1);
				for flag in important.iter_mut().take(step + 1).skip(first) {
					*flag = true;
				}
			}
		}
		important
	}

	/// The maximal runs of consecutive points needed to draw `tile`, translated into the tile's
	/// local coordinates.
	pub fn clip_to_tile(&self, points: &[Point], tile: TileId, scroll: Vec2) -> Vec<Vec<Point>> {
		let important = self.important_points(points, tile, scroll);
		let offset = scroll - self.grid.origin(tile);
		let pieces = points
			.iter()
			.zip(important)
			.chunk_by(|&(_, important)| important)
			.into_iter()
			.filter(|(important, _)| *important)
			.map(|(_, run)| run.map(|(point, _)| point.translated(offset)).collect_vec())
			.collect();
		pieces
	}

	/// Splits `stroke` into compressed pieces for every tile it touches. `bounds` is the
	/// screen-space region of the drawn stroke and limits which tiles are examined.
	#[tracing::instrument(skip_all, fields(color = %stroke.color, points = stroke.points.len()))]
	pub fn split(&self, stroke: &Stroke, bounds: Bounds2, scroll: Vec2) -> StrokesByTile {
		let mut result = StrokesByTile::new();
		for tile in self.candidate_tiles(bounds, scroll) {
			let pieces = self.clip_to_tile(&stroke.points, tile, scroll);
			if pieces.is_empty() {
				continue;
			}
			tracing::trace!(%tile, pieces = pieces.len(), "clipped");
			let compressed = pieces
				.into_iter()
				.map(|points| Stroke::with_points(stroke.color.clone(), points).deflate())
				.collect();
			result.insert(tile, compressed);
		}
		tracing::debug!(tiles = result.len(), "split stroke");
		result
	}
}
