use crate::config::{check_at_least, check_positive, ConfigError};
use crate::geom::Bounds2;
use glam::{vec2, Vec2};
use std::str::FromStr;

pub const TILE_SIZE: f32 = 768.0;
/// Tiles this far (in tile units) outside the viewport are kept loaded.
pub const TILE_MARGIN: f32 = 0.5;

/// The grid position of a tile. Tile `(x, y)` covers the canvas square starting at
/// `(x, y) * tile_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[display("{x}/{y}")]
pub struct TileId {
	pub x: i32,
	pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid tile id `{0}`, expected `x/y`")]
pub struct TileIdError(String);

static_assertions::assert_impl_all!(TileIdError: std::error::Error, Send, Sync);

impl TileId {
	pub fn new(x: i32, y: i32) -> Self {
		Self { x, y }
	}

	pub fn find_containing(point: Vec2, grid: &TileGrid) -> Self {
		grid.tile_containing(point)
	}

	pub fn origin(&self, grid: &TileGrid) -> Vec2 {
		grid.origin(*self)
	}

	pub fn bounds(&self, grid: &TileGrid) -> Bounds2 {
		grid.tile_bounds(*self)
	}
}

impl FromStr for TileId {
	type Err = TileIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let error = || TileIdError(s.to_owned());
		let (x, y) = s.split_once('/').ok_or_else(error)?;
		Ok(Self {
			x: x.trim().parse().map_err(|_| error())?,
			y: y.trim().parse().map_err(|_| error())?,
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq, bon::Builder)]
pub struct TileGrid {
	#[builder(default = Vec2::splat(TILE_SIZE))]
	pub tile_size: Vec2,
	#[builder(default = TILE_MARGIN)]
	pub margin: f32,
}

impl Default for TileGrid {
	fn default() -> Self {
		Self::builder().build()
	}
}

impl TileGrid {
	pub fn validate(&self) -> Result<(), ConfigError> {
		check_positive("tile_size.x", self.tile_size.x)?;
		check_positive("tile_size.y", self.tile_size.y)?;
		check_at_least("margin", "non-negative", self.margin, 0.0)
	}

	pub fn tile_containing(&self, point: Vec2) -> TileId {
		let tile = (point / self.tile_size).floor();
		TileId::new(tile.x as i32, tile.y as i32)
	}

	pub fn origin(&self, tile: TileId) -> Vec2 {
		vec2(tile.x as f32, tile.y as f32) * self.tile_size
	}

	/// The canvas region of `tile`, including its far edges.
	pub fn tile_bounds(&self, tile: TileId) -> Bounds2 {
		let origin = self.origin(tile);
		Bounds2::new(origin, origin + self.tile_size)
	}

	/// Every tile overlapping the canvas region `bounds`.
	pub fn tiles_intersecting(&self, bounds: Bounds2) -> impl Iterator<Item = TileId> {
		bounds
			.divided(self.tile_size)
			.floor()
			.grid_points()
			.map(|p| TileId::new(p.x, p.y))
	}

	/// The tiles, in tile units, that must be loaded to cover a viewport of `size` scrolled to
	/// `scroll`.
	pub fn visible_tiles(&self, scroll: Vec2, size: Vec2) -> Bounds2 {
		Bounds2::new(
			(scroll / self.tile_size - self.margin).floor(),
			((scroll + size) / self.tile_size + self.margin).floor(),
		)
	}
}
