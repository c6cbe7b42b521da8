use crate::engine::*;
use crate::pipes::*;
use glam::{vec2, Vec2};
use itertools::Itertools;
use std::collections::HashMap;

pub fn point_at(time: f32, x: f32, y: f32) -> Point {
	Point::new(time, 1.0, vec2(x, y))
}

/// An outward spiral sampled at a constant rate with varying pressure.
pub fn spiral(count: usize) -> Vec<Point> {
	(0..count)
		.map(|i| {
			let i = i as f32;
			let radius = 20.0 + 2.0 * i;
			let angle = 0.5 * i;
			Point::new(
				0.05 * i,
				4.0 + 2.0 * (0.3 * i).sin(),
				radius * Vec2::from_angle(angle),
			)
		})
		.collect()
}

/// A horizontal sine wave starting at `origin`, one point every `spacing` units.
pub fn wave(origin: Vec2, count: usize, spacing: f32) -> Vec<Point> {
	(0..count)
		.map(|i| {
			let x = spacing * i as f32;
			Point::new(0.02 * i as f32, 6.0, origin + vec2(x, 30.0 * (x / 60.0).sin()))
		})
		.collect()
}

pub fn path_length(points: &[Point]) -> f32 {
	points
		.iter()
		.tuple_windows()
		.map(|(a, b)| a.position.distance(b.position))
		.sum()
}

pub fn interpolate(points: &[Point]) -> Vec<Point> {
	Interpolator::default().process(points.iter().copied())
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
	pub color: String,
	pub points: Vec<Point>,
	pub previous: Option<Point>,
}

/// Records everything drawn, per surface.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
	pub surfaces: HashMap<Surface, Vec<DrawCall>>,
	pub released: Vec<Surface>,
}

impl RecordingRenderer {
	pub fn points(&self, surface: Surface) -> Vec<Point> {
		self
			.surfaces
			.get(&surface)
			.into_iter()
			.flatten()
			.flat_map(|call| call.points.iter().copied())
			.collect()
	}
}

impl Renderer for RecordingRenderer {
	fn draw_points(&mut self, surface: Surface, color: &str, points: &[Point], previous: Option<Point>) {
		self.surfaces.entry(surface).or_default().push(DrawCall {
			color: color.to_owned(),
			points: points.to_vec(),
			previous,
		});
	}

	fn release(&mut self, surface: Surface) {
		self.surfaces.remove(&surface);
		self.released.push(surface);
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
	Subscribe(TileId),
	Unsubscribe(TileId),
	Strokes(StrokeId, StrokesByTile),
}

#[derive(Debug, Default)]
pub struct RecordingTransport {
	pub events: Vec<TransportEvent>,
}

impl RecordingTransport {
	pub fn subscribed(&self) -> Vec<TileId> {
		let mut tiles = Vec::new();
		for event in &self.events {
			match event {
				TransportEvent::Subscribe(tile) => tiles.push(*tile),
				TransportEvent::Unsubscribe(tile) => tiles.retain(|t| t != tile),
				TransportEvent::Strokes(..) => {}
			}
		}
		tiles.sort();
		tiles
	}

	pub fn sent(&self) -> Vec<(StrokeId, StrokesByTile)> {
		self
			.events
			.iter()
			.filter_map(|event| match event {
				TransportEvent::Strokes(id, strokes) => Some((*id, strokes.clone())),
				_ => None,
			})
			.collect()
	}
}

impl TileSubscriber for RecordingTransport {
	fn subscribe(&mut self, tile: TileId) {
		self.events.push(TransportEvent::Subscribe(tile));
	}

	fn unsubscribe(&mut self, tile: TileId) {
		self.events.push(TransportEvent::Unsubscribe(tile));
	}
}

impl Transport for RecordingTransport {
	fn send_strokes(&mut self, stroke: StrokeId, strokes: &StrokesByTile) {
		self.events.push(TransportEvent::Strokes(stroke, strokes.clone()));
	}
}
