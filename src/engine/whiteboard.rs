use super::{
	CompressedStroke, FinishedStroke, Point, PointerSample, Stroke, StrokeClipper, StrokeSession,
	StrokeSettings, StrokesByTile, TileChanges, TileGrid, TileId, TileSubscriber, TileViewport,
};
use crate::config::STROKE_QUALITY;
use crate::pipes::{Interpolator, InterpolatorConfig, Pipe};
use glam::Vec2;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[display("stroke {_0}")]
pub struct StrokeId(pub u64);

/// A layer points can be drawn onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
	/// Screen-space overlay showing a local stroke until the server has accepted it.
	Pending(StrokeId),
	/// The contents of a tile, in tile-local coordinates.
	Tile(TileId),
}

pub trait Renderer {
	/// Draws a polyline of round-capped points, connected to `previous` when given.
	fn draw_points(&mut self, surface: Surface, color: &str, points: &[Point], previous: Option<Point>);
	fn release(&mut self, surface: Surface);
}

/// The connection to the tile server.
pub trait Transport: TileSubscriber {
	fn send_strokes(&mut self, stroke: StrokeId, strokes: &StrokesByTile);
}

/// Replays a stored stroke at display quality.
pub fn draw_stroke(renderer: &mut impl Renderer, surface: Surface, stroke: &Stroke) {
	let config = InterpolatorConfig::builder().quality(STROKE_QUALITY).build();
	let points = Interpolator::new(config).process(stroke.points.iter().copied());
	if !points.is_empty() {
		renderer.draw_points(surface, &stroke.color, &points, None);
	}
}

/// Turns pointer input into strokes on a tiled canvas.
///
/// A stroke is drawn onto its own pending surface while in progress. When it ends it is split by
/// tile and sent off, and its surface is kept until the server's `accept` so that the stroke shows
/// up exactly once: stored strokes arrive through `receive_strokes` like everybody else's.
pub struct Whiteboard<T, R> {
	settings: StrokeSettings,
	viewport: TileViewport,
	clipper: StrokeClipper,
	transport: T,
	renderer: R,
	active: Option<(StrokeId, StrokeSession)>,
	pending: BTreeSet<StrokeId>,
	next_id: u64,
}

impl<T: Transport, R: Renderer> Whiteboard<T, R> {
	/// Subscribes to the tiles visible at the origin.
	pub fn new(grid: TileGrid, size: Vec2, mut transport: T, renderer: R) -> Self {
		let mut viewport = TileViewport::new(grid, size);
		viewport.set_scroll(Vec2::ZERO, &mut transport);
		Self {
			settings: StrokeSettings::default(),
			viewport,
			clipper: StrokeClipper::new(grid, InterpolatorConfig::default()),
			transport,
			renderer,
			active: None,
			pending: BTreeSet::new(),
			next_id: 0,
		}
	}

	pub fn settings(&self) -> &StrokeSettings {
		&self.settings
	}

	/// Takes effect from the next stroke.
	pub fn set_settings(&mut self, settings: StrokeSettings) {
		self.settings = settings;
	}

	pub fn viewport(&self) -> &TileViewport {
		&self.viewport
	}

	pub fn transport(&self) -> &T {
		&self.transport
	}

	pub fn transport_mut(&mut self) -> &mut T {
		&mut self.transport
	}

	pub fn renderer(&self) -> &R {
		&self.renderer
	}

	pub fn into_parts(self) -> (T, R) {
		(self.transport, self.renderer)
	}

	pub fn active_stroke(&self) -> Option<StrokeId> {
		self.active.as_ref().map(|&(id, _)| id)
	}

	pub fn pending_strokes(&self) -> impl Iterator<Item = StrokeId> + '_ {
		self.pending.iter().copied()
	}

	/// Starts a new stroke, ending the current one first.
	pub fn begin_stroke(&mut self, sample: PointerSample) -> StrokeId {
		if self.active.is_some() {
			self.end_stroke();
		}
		let id = StrokeId(self.next_id);
		self.next_id += 1;
		tracing::trace!(%id, "begin stroke");
		self.active = Some((id, StrokeSession::new(self.settings.clone(), sample.timestamp)));
		self.move_stroke(sample);
		id
	}

	/// Ignored when no stroke is active.
	pub fn move_stroke(&mut self, sample: PointerSample) {
		let Some((id, session)) = &mut self.active else {
			return;
		};
		let previous = session.last_drawn();
		let points = session.add_sample(sample);
		if !points.is_empty() {
			self.renderer.draw_points(
				Surface::Pending(*id),
				session.settings().color(),
				&points,
				previous,
			);
		}
	}

	/// Finishes the active stroke and sends it to the server.
	#[tracing::instrument(skip(self))]
	pub fn end_stroke(&mut self) -> Option<StrokeId> {
		let (id, session) = self.active.take()?;
		let previous = session.last_drawn();
		let FinishedStroke { stroke, bounds, tail } = session.finish();
		if !tail.is_empty() {
			self.renderer.draw_points(Surface::Pending(id), &stroke.color, &tail, previous);
		}

		let strokes = self.clipper.split(&stroke, bounds, self.viewport.scroll());
		tracing::debug!(%id, tiles = strokes.len(), "sending stroke");
		self.transport.send_strokes(id, &strokes);
		self.pending.insert(id);
		Some(id)
	}

	/// Drops the active stroke and every stroke still waiting for the server.
	pub fn abort_strokes(&mut self) {
		let active = self.active.take().map(|(id, _)| id);
		for id in active.into_iter().chain(std::mem::take(&mut self.pending)) {
			tracing::debug!(%id, "aborted stroke");
			self.renderer.release(Surface::Pending(id));
		}
	}

	/// The server stored the stroke, so its copy will arrive through `receive_strokes`.
	pub fn accept(&mut self, id: StrokeId) {
		if self.pending.remove(&id) {
			self.renderer.release(Surface::Pending(id));
		}
	}

	pub fn receive_strokes(&mut self, tile: TileId, strokes: &[CompressedStroke]) {
		if !self.viewport.is_loaded(tile) {
			tracing::trace!(%tile, "ignoring strokes for unloaded tile");
			return;
		}
		for stroke in strokes {
			draw_stroke(&mut self.renderer, Surface::Tile(tile), &stroke.inflate());
		}
	}

	pub fn set_scroll(&mut self, scroll: Vec2) {
		let changes = self.viewport.set_scroll(scroll, &mut self.transport);
		self.release_unloaded(changes);
	}

	pub fn scroll_relative(&mut self, delta: Vec2) {
		let changes = self.viewport.scroll_relative(delta, &mut self.transport);
		self.release_unloaded(changes);
	}

	pub fn set_random_scroll(&mut self, distance: f32) {
		let changes = self.viewport.set_random_scroll(distance, &mut self.transport);
		self.release_unloaded(changes);
	}

	pub fn resize(&mut self, size: Vec2) {
		let changes = self.viewport.resize(size, &mut self.transport);
		self.release_unloaded(changes);
	}

	fn release_unloaded(&mut self, changes: TileChanges) {
		for tile in changes.unloaded {
			self.renderer.release(Surface::Tile(tile));
		}
	}
}
