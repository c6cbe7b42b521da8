use super::{TileGrid, TileId};
use glam::{vec2, Vec2};
use std::collections::BTreeSet;

/// Something that can be told which tiles a client wants to receive.
pub trait TileSubscriber {
	fn subscribe(&mut self, tile: TileId);
	fn unsubscribe(&mut self, tile: TileId);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid scroll position `{0}`, expected `x/y`")]
pub struct ScrollParseError(String);

static_assertions::assert_impl_all!(ScrollParseError: std::error::Error, Send, Sync);

/// The tiles loaded and unloaded by one viewport update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileChanges {
	pub loaded: Vec<TileId>,
	pub unloaded: Vec<TileId>,
}

/// Tracks which tiles must be loaded for a scrolled viewport.
#[derive(Debug, Clone)]
pub struct TileViewport {
	grid: TileGrid,
	scroll: Vec2,
	size: Vec2,
	loaded: BTreeSet<TileId>,
}

impl TileViewport {
	/// Nothing is loaded until the first update.
	pub fn new(grid: TileGrid, size: Vec2) -> Self {
		Self {
			grid,
			scroll: Vec2::ZERO,
			size,
			loaded: BTreeSet::new(),
		}
	}

	pub fn grid(&self) -> &TileGrid {
		&self.grid
	}

	pub fn scroll(&self) -> Vec2 {
		self.scroll
	}

	pub fn size(&self) -> Vec2 {
		self.size
	}

	pub fn loaded_tiles(&self) -> impl Iterator<Item = TileId> + '_ {
		self.loaded.iter().copied()
	}

	pub fn is_loaded(&self, tile: TileId) -> bool {
		self.loaded.contains(&tile)
	}

	/// Strokes are stored on whole pixels, so the scroll is rounded to keep tile pieces aligned
	/// with the local drawing.
	pub fn set_scroll(&mut self, scroll: Vec2, subscriber: &mut impl TileSubscriber) -> TileChanges {
		self.scroll = scroll.round();
		self.update(subscriber)
	}

	pub fn scroll_relative(&mut self, delta: Vec2, subscriber: &mut impl TileSubscriber) -> TileChanges {
		self.set_scroll(self.scroll + delta, subscriber)
	}

	/// Jumps to a random position on a lattice of spacing `distance` around the origin.
	pub fn set_random_scroll(&mut self, distance: f32, subscriber: &mut impl TileSubscriber) -> TileChanges {
		let coordinate = || fastrand::i32(-20..20) as f32 * distance;
		let scroll = vec2(coordinate(), coordinate());
		self.set_scroll(scroll, subscriber)
	}

	pub fn resize(&mut self, size: Vec2, subscriber: &mut impl TileSubscriber) -> TileChanges {
		self.size = size;
		self.update(subscriber)
	}

	/// The scroll position formatted for a location fragment, e.g. `-150/320`.
	pub fn fragment(&self) -> String {
		format!("{}/{}", self.scroll.x, self.scroll.y)
	}

	pub fn parse_scroll(s: &str) -> Result<Vec2, ScrollParseError> {
		let error = || ScrollParseError(s.to_owned());
		let (x, y) = s.trim_start_matches('#').split_once('/').ok_or_else(error)?;
		let x: f32 = x.trim().parse().map_err(|_| error())?;
		let y: f32 = y.trim().parse().map_err(|_| error())?;
		if !x.is_finite() || !y.is_finite() {
			return Err(error());
		}
		Ok(vec2(x, y))
	}

	/// Subscribes to newly visible tiles and unsubscribes from the ones that went out of range.
	#[tracing::instrument(skip_all, fields(scroll = %self.scroll, size = %self.size))]
	fn update(&mut self, subscriber: &mut impl TileSubscriber) -> TileChanges {
		let visible: BTreeSet<TileId> = self
			.grid
			.visible_tiles(self.scroll, self.size)
			.grid_points()
			.map(|p| TileId::new(p.x, p.y))
			.collect();

		let changes = TileChanges {
			loaded: visible.difference(&self.loaded).copied().collect(),
			unloaded: self.loaded.difference(&visible).copied().collect(),
		};
		for &tile in &changes.unloaded {
			subscriber.unsubscribe(tile);
		}
		for &tile in &changes.loaded {
			subscriber.subscribe(tile);
		}
		tracing::debug!(
			loaded = changes.loaded.len(),
			unloaded = changes.unloaded.len(),
			"updated visible tiles"
		);
		self.loaded = visible;
		changes
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test::*;
	use itertools::Itertools;

	fn viewport() -> TileViewport {
		TileViewport::new(TileGrid::default(), vec2(1024.0, 700.0))
	}

	fn tiles(coordinates: &[(i32, i32)]) -> Vec<TileId> {
		coordinates.iter().map(|&(x, y)| TileId::new(x, y)).collect()
	}

	#[test]
	fn first_update_loads_visible_tiles_with_margin() {
		let mut viewport = viewport();
		let mut transport = RecordingTransport::default();
		let changes = viewport.set_scroll(Vec2::ZERO, &mut transport);

		let expected = (-1..=1)
			.cartesian_product(-1..=1)
			.map(|(x, y)| TileId::new(x, y))
			.sorted()
			.collect_vec();
		assert_eq!(changes.loaded, expected);
		assert!(changes.unloaded.is_empty());
		assert_eq!(transport.subscribed(), expected);
		assert_eq!(viewport.loaded_tiles().collect_vec(), expected);
	}

	#[test]
	fn scrolling_swaps_columns() {
		let mut viewport = viewport();
		let mut transport = RecordingTransport::default();
		viewport.set_scroll(Vec2::ZERO, &mut transport);
		let changes = viewport.scroll_relative(vec2(400.0, 0.0), &mut transport);

		assert_eq!(changes.loaded, tiles(&[(2, -1), (2, 0), (2, 1)]));
		assert_eq!(changes.unloaded, tiles(&[(-1, -1), (-1, 0), (-1, 1)]));
		assert!(viewport.is_loaded(TileId::new(2, 0)));
		assert!(!viewport.is_loaded(TileId::new(-1, 0)));
		assert_eq!(transport.subscribed().len(), 9);
	}

	#[test]
	fn small_scroll_changes_nothing() {
		let mut viewport = viewport();
		let mut transport = RecordingTransport::default();
		viewport.set_scroll(Vec2::ZERO, &mut transport);
		let events = transport.events.len();

		assert_eq!(
			viewport.scroll_relative(vec2(10.0, 10.0), &mut transport),
			TileChanges::default()
		);
		assert_eq!(transport.events.len(), events);
		assert_eq!(viewport.scroll(), vec2(10.0, 10.0));
	}

	#[test]
	fn resize_loads_more() {
		let mut viewport = viewport();
		let mut transport = RecordingTransport::default();
		viewport.set_scroll(Vec2::ZERO, &mut transport);
		let changes = viewport.resize(vec2(1800.0, 700.0), &mut transport);
		assert_eq!(changes.loaded, tiles(&[(2, -1), (2, 0), (2, 1)]));
		assert!(changes.unloaded.is_empty());
	}

	#[test]
	fn random_scroll_is_on_the_lattice() {
		let mut viewport = viewport();
		let mut transport = RecordingTransport::default();
		for _ in 0..20 {
			viewport.set_random_scroll(100.0, &mut transport);
			let scroll = viewport.scroll();
			for coordinate in [scroll.x, scroll.y] {
				assert_eq!(coordinate % 100.0, 0.0);
				assert!((-2000.0..2000.0).contains(&coordinate));
			}
			assert_eq!(
				transport.subscribed(),
				viewport.loaded_tiles().collect_vec()
			);
		}
	}

	#[test]
	fn scroll_snaps_to_whole_pixels() {
		let mut viewport = viewport();
		let mut transport = RecordingTransport::default();
		viewport.set_scroll(vec2(-150.4, 320.6), &mut transport);
		assert_eq!(viewport.scroll(), vec2(-150.0, 321.0));
		viewport.scroll_relative(vec2(0.3, -0.7), &mut transport);
		assert_eq!(viewport.scroll(), vec2(-150.0, 320.0));
	}

	#[test]
	fn fragment_round_trip() {
		let mut viewport = viewport();
		viewport.set_scroll(vec2(-150.0, 320.0), &mut RecordingTransport::default());
		assert_eq!(viewport.fragment(), "-150/320");
		assert_eq!(TileViewport::parse_scroll("#-150/320.5"), Ok(vec2(-150.0, 320.5)));
		assert!(TileViewport::parse_scroll("12").is_err());
		assert!(TileViewport::parse_scroll("x/1").is_err());
		assert!(TileViewport::parse_scroll("inf/1").is_err());
	}
}
