use glam::{vec2, Vec2};
use std::collections::{HashMap, VecDeque};
use std::f32::consts::TAU;
use std::time::Duration;
use strokes::engine::*;

fn configure_logging() -> anyhow::Result<()> {
	let max_level = if cfg!(debug_assertions) {
		tracing::Level::TRACE
	} else {
		tracing::Level::INFO
	};
	tracing::subscriber::set_global_default(
		tracing_subscriber::FmtSubscriber::builder()
			.with_max_level(max_level)
			.finish(),
	)?;
	Ok(())
}

const CLIENT: ClientId = ClientId(0);

enum Reply {
	Accept(StrokeId),
	Strokes(TileId, Vec<CompressedStroke>),
}

/// Stands in for the network: requests go straight to a local store and replies are queued.
struct LocalServer {
	store: TileStore<MemoryPersistence>,
	replies: VecDeque<Reply>,
	sent: StrokesByTile,
}

impl LocalServer {
	fn new() -> Self {
		Self {
			store: TileStore::new(MemoryPersistence::default()),
			replies: VecDeque::new(),
			sent: StrokesByTile::new(),
		}
	}
}

impl TileSubscriber for LocalServer {
	fn subscribe(&mut self, tile: TileId) {
		let strokes = self.store.subscribe(tile, CLIENT);
		if !strokes.is_empty() {
			self.replies.push_back(Reply::Strokes(tile, strokes.to_vec()));
		}
	}

	fn unsubscribe(&mut self, tile: TileId) {
		self.store.unsubscribe(tile, CLIENT);
	}
}

impl Transport for LocalServer {
	fn send_strokes(&mut self, stroke: StrokeId, strokes: &StrokesByTile) {
		for (tile, clients) in self.store.append_all(strokes) {
			if clients.contains(&CLIENT) {
				self.replies.push_back(Reply::Strokes(tile, strokes[&tile].clone()));
			}
		}
		self.replies.push_back(Reply::Accept(stroke));
		self.sent.extend(strokes.iter().map(|(&tile, pieces)| (tile, pieces.clone())));
	}
}

/// Counts what would be drawn on each surface.
#[derive(Default)]
struct CountingRenderer {
	points: HashMap<Surface, usize>,
}

impl Renderer for CountingRenderer {
	fn draw_points(&mut self, surface: Surface, color: &str, points: &[Point], _previous: Option<Point>) {
		tracing::trace!(?surface, color, points = points.len(), "draw");
		*self.points.entry(surface).or_default() += points.len();
	}

	fn release(&mut self, surface: Surface) {
		if let Some(points) = self.points.remove(&surface) {
			tracing::debug!(?surface, points, "released surface");
		}
	}
}

type Board = Whiteboard<LocalServer, CountingRenderer>;

fn deliver(board: &mut Board) {
	while let Some(reply) = board.transport_mut().replies.pop_front() {
		match reply {
			Reply::Accept(id) => board.accept(id),
			Reply::Strokes(tile, strokes) => board.receive_strokes(tile, &strokes),
		}
	}
}

/// A jittery sine wave sampled every few pixels, as a mouse would report it.
fn wavy_samples(origin: Vec2, length: f32) -> Vec<PointerSample> {
	let amplitude = 20.0 + 60.0 * fastrand::f32();
	let wavelength = 100.0 + 200.0 * fastrand::f32();
	(0..)
		.map(|i| (i, 4.0 * i as f32))
		.take_while(|&(_, x)| x <= length)
		.map(|(i, x)| {
			let jitter = vec2(fastrand::f32(), fastrand::f32()) - 0.5;
			let position = origin + vec2(x, amplitude * (TAU * x / wavelength).sin()) + jitter;
			PointerSample::new(
				position,
				0.5 + 0.5 * fastrand::f32(),
				Duration::from_millis(8 * i as u64),
			)
		})
		.collect()
}

fn main() -> anyhow::Result<()> {
	if let Err(error) = configure_logging() {
		// We can technically continue without logging.
		eprintln!("{error:#}");
	}

	let grid = TileGrid::default();
	let mut board = Whiteboard::new(
		grid,
		vec2(1280.0, 800.0),
		LocalServer::new(),
		CountingRenderer::default(),
	);
	board.set_random_scroll(grid.tile_size.x / 2.0);
	deliver(&mut board);
	tracing::info!(scroll = %board.viewport().fragment(), "scrolled");

	board.set_settings(
		StrokeSettings::new(6.0, "rebeccapurple")?.with_pressure_mode(PressureMode::Simulate),
	);
	let samples = wavy_samples(vec2(100.0, 400.0), 1000.0);
	if let Some((&first, rest)) = samples.split_first() {
		board.begin_stroke(first);
		for &sample in rest {
			board.move_stroke(sample);
		}
		board.end_stroke();
	}
	deliver(&mut board);

	let (mut server, renderer) = board.into_parts();
	// A server would do this every `SAVE_INTERVAL`.
	tracing::debug!(interval = ?SAVE_INTERVAL, "saving tiles");
	server.store.save_all();
	for (tile, pieces) in &server.sent {
		tracing::info!(
			%tile,
			pieces = pieces.len(),
			points = pieces.iter().map(CompressedStroke::len).sum::<usize>(),
			saved = server.store.persistence().get(*tile).map_or(0, <[_]>::len),
			"stored stroke"
		);
	}
	let stats = server.store.stats();
	tracing::info!(
		tiles = stats.tiles,
		tiles_loaded = stats.tiles_loaded,
		subscriptions = stats.subscriptions,
		strokes_received = stats.strokes_received,
		strokes_sent = stats.strokes_sent,
		"store activity"
	);
	tracing::info!(
		surfaces = renderer.points.len(),
		points = renderer.points.values().sum::<usize>(),
		"rendered"
	);
	Ok(())
}
