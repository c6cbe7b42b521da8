use super::{CompressedStroke, StrokesByTile, TileId};
use crate::util::ResultExt;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

/// How often dirty tiles are written back.
pub const SAVE_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[display("client {_0}")]
pub struct ClientId(pub u64);

/// Durable storage for the strokes of each tile.
pub trait TilePersistence {
	/// `None` means the tile has never been saved.
	fn load(&mut self, tile: TileId) -> anyhow::Result<Option<Vec<CompressedStroke>>>;
	fn save(&mut self, tile: TileId, strokes: &[CompressedStroke]) -> anyhow::Result<()>;
}

/// Keeps everything in a map. Saves can be made to fail for testing error paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
	tiles: HashMap<TileId, Vec<CompressedStroke>>,
	pub saves: usize,
	pub fail: bool,
}

impl MemoryPersistence {
	pub fn get(&self, tile: TileId) -> Option<&[CompressedStroke]> {
		self.tiles.get(&tile).map(Vec::as_slice)
	}
}

impl TilePersistence for MemoryPersistence {
	fn load(&mut self, tile: TileId) -> anyhow::Result<Option<Vec<CompressedStroke>>> {
		anyhow::ensure!(!self.fail, "failed to load tile {tile}");
		Ok(self.tiles.get(&tile).cloned())
	}

	fn save(&mut self, tile: TileId, strokes: &[CompressedStroke]) -> anyhow::Result<()> {
		anyhow::ensure!(!self.fail, "failed to save tile {tile}");
		self.saves += 1;
		self.tiles.insert(tile, strokes.to_vec());
		Ok(())
	}
}

/// Running totals of store activity. `tiles` and `subscriptions` are current counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
	pub tiles: usize,
	pub tiles_loaded: usize,
	pub subscriptions: usize,
	pub strokes_received: usize,
	pub strokes_sent: usize,
}

#[derive(Debug, Default)]
struct StoredTile {
	strokes: Vec<CompressedStroke>,
	subscribers: BTreeSet<ClientId>,
	dirty: bool,
}

/// The authoritative, in-memory copy of every tile somebody is looking at.
///
/// Tiles are loaded on first subscription and written back by `save_all`. A tile nobody subscribes
/// to any more is saved and dropped.
#[derive(Debug)]
pub struct TileStore<P> {
	persistence: P,
	tiles: HashMap<TileId, StoredTile>,
	stats: StoreStats,
}

impl<P: TilePersistence> TileStore<P> {
	pub fn new(persistence: P) -> Self {
		Self {
			persistence,
			tiles: HashMap::new(),
			stats: StoreStats::default(),
		}
	}

	pub fn stats(&self) -> StoreStats {
		StoreStats {
			tiles: self.tiles.len(),
			..self.stats
		}
	}

	pub fn persistence(&self) -> &P {
		&self.persistence
	}

	pub fn persistence_mut(&mut self) -> &mut P {
		&mut self.persistence
	}

	pub fn is_loaded(&self, tile: TileId) -> bool {
		self.tiles.contains_key(&tile)
	}

	pub fn strokes(&self, tile: TileId) -> Option<&[CompressedStroke]> {
		self.tiles.get(&tile).map(|stored| stored.strokes.as_slice())
	}

	pub fn subscribers(&self, tile: TileId) -> impl Iterator<Item = ClientId> + '_ {
		self.tiles.get(&tile).into_iter().flat_map(|stored| stored.subscribers.iter().copied())
	}

	fn load(&mut self, tile: TileId) -> &mut StoredTile {
		let persistence = &mut self.persistence;
		let stats = &mut self.stats;
		self.tiles.entry(tile).or_insert_with(|| {
			// A tile that cannot be read starts out blank.
			let strokes = persistence.load(tile).ok_or_warn().flatten().unwrap_or_default();
			stats.tiles_loaded += 1;
			tracing::debug!(
				%tile,
				strokes = strokes.len(),
				tiles_loaded = stats.tiles_loaded,
				"loaded tile"
			);
			StoredTile {
				strokes,
				..Default::default()
			}
		})
	}

	/// Adds `client` to the tile's subscribers and returns the strokes it should be sent.
	#[tracing::instrument(skip(self))]
	pub fn subscribe(&mut self, tile: TileId, client: ClientId) -> &[CompressedStroke] {
		self.load(tile);
		let stats = &mut self.stats;
		let Some(stored) = self.tiles.get_mut(&tile) else {
			return &[];
		};
		if stored.subscribers.insert(client) {
			stats.subscriptions += 1;
		}
		stats.strokes_sent += stored.strokes.len();
		tracing::debug!(
			subscriptions = stats.subscriptions,
			strokes_sent = stats.strokes_sent,
			"subscribed"
		);
		&stored.strokes
	}

	#[tracing::instrument(skip(self))]
	pub fn unsubscribe(&mut self, tile: TileId, client: ClientId) {
		let Some(stored) = self.tiles.get_mut(&tile) else {
			return;
		};
		if stored.subscribers.remove(&client) {
			self.stats.subscriptions -= 1;
		}
		if stored.subscribers.is_empty() {
			self.unload(tile);
		}
	}

	/// Unsubscribes `client` from every tile.
	#[tracing::instrument(skip(self))]
	pub fn disconnect(&mut self, client: ClientId) {
		let tiles: Vec<TileId> = self
			.tiles
			.iter()
			.filter(|(_, stored)| stored.subscribers.contains(&client))
			.map(|(&tile, _)| tile)
			.collect();
		for tile in tiles {
			self.unsubscribe(tile, client);
		}
	}

	/// Appends strokes to a tile and returns the clients that must be notified.
	pub fn append(
		&mut self,
		tile: TileId,
		strokes: impl IntoIterator<Item = CompressedStroke>,
	) -> Vec<ClientId> {
		let stored = self.load(tile);
		let count = stored.strokes.len();
		stored.strokes.extend(strokes);
		let added = stored.strokes.len() - count;
		stored.dirty |= added > 0;
		let subscribers: Vec<ClientId> = stored.subscribers.iter().copied().collect();
		self.stats.strokes_sent += added * subscribers.len();
		subscribers
	}

	/// Appends every piece of a split stroke and returns, per tile, who must be notified.
	#[tracing::instrument(skip_all, fields(tiles = strokes.len()))]
	pub fn append_all(&mut self, strokes: &StrokesByTile) -> Vec<(TileId, Vec<ClientId>)> {
		self.stats.strokes_received += 1;
		let notified = strokes
			.iter()
			.map(|(&tile, pieces)| (tile, self.append(tile, pieces.iter().cloned())))
			.collect();
		tracing::debug!(
			strokes_received = self.stats.strokes_received,
			strokes_sent = self.stats.strokes_sent,
			"appended stroke"
		);
		notified
	}

	/// Writes back every dirty tile, then drops saved tiles without subscribers. Tiles that fail
	/// to save stay dirty and loaded.
	#[tracing::instrument(skip(self))]
	pub fn save_all(&mut self) {
		let mut saved = 0;
		for (&tile, stored) in self.tiles.iter_mut().filter(|(_, stored)| stored.dirty) {
			if self.persistence.save(tile, &stored.strokes).ok_or_log().is_some() {
				stored.dirty = false;
				saved += 1;
			}
		}
		self
			.tiles
			.retain(|_, stored| stored.dirty || !stored.subscribers.is_empty());
		tracing::debug!(saved, loaded = self.tiles.len(), "saved tiles");
	}

	/// Saves and drops a tile. A tile that fails to save stays loaded and dirty until a later
	/// `save_all` gets it written.
	fn unload(&mut self, tile: TileId) {
		let Some(stored) = self.tiles.get_mut(&tile) else {
			return;
		};
		if stored.dirty {
			if self.persistence.save(tile, &stored.strokes).ok_or_log().is_none() {
				return;
			}
			stored.dirty = false;
		}
		self.tiles.remove(&tile);
		tracing::debug!(%tile, "unloaded tile");
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn stroke(n: i32) -> CompressedStroke {
		CompressedStroke {
			color: "#000000".to_owned(),
			data: vec![8, n, n],
		}
	}

	const A: ClientId = ClientId(1);
	const B: ClientId = ClientId(2);

	#[test]
	fn subscribe_loads_saved_strokes() {
		let mut persistence = MemoryPersistence::default();
		persistence.save(TileId::new(0, 0), &[stroke(1)]).unwrap();
		let mut store = TileStore::new(persistence);

		assert_eq!(store.subscribe(TileId::new(0, 0), A), &[stroke(1)]);
		assert!(store.subscribe(TileId::new(1, 0), A).is_empty());
		assert!(store.is_loaded(TileId::new(1, 0)));
	}

	#[test]
	fn append_notifies_subscribers() {
		let mut store = TileStore::new(MemoryPersistence::default());
		let tile = TileId::new(0, 0);
		store.subscribe(tile, A);
		store.subscribe(tile, B);

		assert_eq!(store.append(tile, [stroke(1)]), vec![A, B]);
		assert_eq!(store.strokes(tile), Some(&[stroke(1)][..]));
		assert_eq!(store.append(TileId::new(5, 5), [stroke(2)]), vec![]);
	}

	#[test]
	fn append_all_routes_each_tile() {
		let mut store = TileStore::new(MemoryPersistence::default());
		store.subscribe(TileId::new(1, 0), B);
		let strokes = StrokesByTile::from([
			(TileId::new(0, 0), vec![stroke(1)]),
			(TileId::new(1, 0), vec![stroke(2), stroke(3)]),
		]);

		let notified = store.append_all(&strokes);
		assert_eq!(
			notified,
			vec![(TileId::new(0, 0), vec![]), (TileId::new(1, 0), vec![B])]
		);
		assert_eq!(store.strokes(TileId::new(1, 0)).map(<[_]>::len), Some(2));

		store.save_all();
		assert!(!store.is_loaded(TileId::new(0, 0)));
		assert!(store.is_loaded(TileId::new(1, 0)));
		assert_eq!(store.persistence().get(TileId::new(0, 0)), Some(&[stroke(1)][..]));
	}

	#[test]
	fn save_all_writes_dirty_tiles_once() {
		let mut store = TileStore::new(MemoryPersistence::default());
		let tile = TileId::new(0, 0);
		store.subscribe(tile, A);
		store.save_all();
		assert_eq!(store.persistence().saves, 0);

		store.append(tile, [stroke(1)]);
		store.save_all();
		store.save_all();
		assert_eq!(store.persistence().saves, 1);
		assert_eq!(store.persistence().get(tile), Some(&[stroke(1)][..]));
	}

	#[test]
	fn failed_saves_are_retried() {
		let mut store = TileStore::new(MemoryPersistence::default());
		let tile = TileId::new(0, 0);
		store.subscribe(tile, A);
		store.append(tile, [stroke(1)]);

		store.persistence_mut().fail = true;
		store.save_all();
		assert_eq!(store.persistence().saves, 0);

		store.persistence_mut().fail = false;
		store.save_all();
		assert_eq!(store.persistence().saves, 1);
	}

	#[test]
	fn failed_load_starts_blank() {
		let mut store = TileStore::new(MemoryPersistence {
			fail: true,
			..Default::default()
		});
		assert!(store.subscribe(TileId::new(0, 0), A).is_empty());
	}

	#[test]
	fn last_unsubscribe_saves_and_unloads() {
		let mut store = TileStore::new(MemoryPersistence::default());
		let tile = TileId::new(0, 0);
		store.subscribe(tile, A);
		store.subscribe(tile, B);
		store.append(tile, [stroke(1)]);

		store.unsubscribe(tile, A);
		assert!(store.is_loaded(tile));
		store.unsubscribe(tile, B);
		assert!(!store.is_loaded(tile));
		assert_eq!(store.persistence().get(tile), Some(&[stroke(1)][..]));

		assert_eq!(store.subscribe(tile, A), &[stroke(1)]);
	}

	#[test]
	fn failed_unload_is_saved_later() {
		let mut store = TileStore::new(MemoryPersistence::default());
		let tile = TileId::new(0, 0);
		store.subscribe(tile, A);
		store.append(tile, [stroke(1)]);

		store.persistence_mut().fail = true;
		store.unsubscribe(tile, A);
		assert!(store.is_loaded(tile));
		assert_eq!(store.subscribers(tile).count(), 0);
		assert_eq!(store.persistence().get(tile), None);

		store.persistence_mut().fail = false;
		store.save_all();
		assert_eq!(store.persistence().get(tile), Some(&[stroke(1)][..]));
		assert!(!store.is_loaded(tile));
	}

	#[test]
	fn stats_count_activity() {
		let mut store = TileStore::new(MemoryPersistence::default());
		store.subscribe(TileId::new(0, 0), A);
		store.subscribe(TileId::new(0, 0), B);
		store.subscribe(TileId::new(0, 0), B);
		store.subscribe(TileId::new(1, 0), A);
		let strokes = StrokesByTile::from([
			(TileId::new(0, 0), vec![stroke(1)]),
			(TileId::new(1, 0), vec![stroke(2)]),
		]);
		store.append_all(&strokes);
		assert_eq!(
			store.stats(),
			StoreStats {
				tiles: 2,
				tiles_loaded: 2,
				subscriptions: 3,
				strokes_received: 1,
				strokes_sent: 3,
			}
		);

		store.disconnect(A);
		store.subscribe(TileId::new(1, 0), B);
		let stats = store.stats();
		assert_eq!((stats.tiles, stats.tiles_loaded, stats.subscriptions), (2, 3, 2));
		assert_eq!(stats.strokes_sent, 4);
	}

	#[test]
	fn disconnect_leaves_every_tile() {
		let mut store = TileStore::new(MemoryPersistence::default());
		store.subscribe(TileId::new(0, 0), A);
		store.subscribe(TileId::new(1, 0), A);
		store.subscribe(TileId::new(1, 0), B);

		store.disconnect(A);
		assert!(!store.is_loaded(TileId::new(0, 0)));
		assert_eq!(store.subscribers(TileId::new(1, 0)).collect::<Vec<_>>(), vec![B]);
	}
}
