//! Progressive panorama texture streaming.
//!
//! A scene's imagery arrives in two waves: one low-resolution thumbnail
//! that replaces the previous scene's sphere with a cross-fade, then a
//! fixed grid of high-resolution tiles installed patch by patch over the
//! thumbnail. Every asynchronous result is tagged with the scene key it
//! was requested for; a result whose key has been superseded is released,
//! never applied.

use std::time::{Duration, Instant};

use rustc_hash::FxHashSet;

use super::target::{LoadPoll, LoadTicket, RenderTarget, SphereHandle, TextureLoader};
use crate::animation::{EasingFunction, Tween};
use crate::scene::SceneKey;

/// Opacity the incoming sphere is created at and faded up from.
const FADE_LOW: f32 = 0.3;
/// Opacity of the thumbnail material before the fade starts.
const THUMB_INITIAL_OPACITY: f32 = 0.5;

/// A rows × cols grid of tile URLs.
#[derive(Debug, Clone, Default)]
pub struct TileGrid {
    urls: Vec<Vec<String>>,
}

impl TileGrid {
    /// Grid from the descriptor's row-major slice lists.
    pub fn new(urls: Vec<Vec<String>>) -> Self {
        Self { urls }
    }

    /// Number of rows.
    pub fn rows(&self) -> u32 {
        self.urls.len() as u32
    }

    /// Number of columns (of the first row; the grid is rectangular).
    pub fn cols(&self) -> u32 {
        self.urls.first().map_or(0, |row| row.len() as u32)
    }

    /// Total tile count.
    pub fn total(&self) -> u32 {
        self.rows() * self.cols()
    }

    /// URL at (row, col).
    pub fn url(&self, row: u32, col: u32) -> Option<&str> {
        self.urls
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .map(String::as_str)
    }
}

/// Progress notifications from [`TileStreamer::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The thumbnail sphere was swapped in; the scene is visible.
    ThumbnailReady(SceneKey),
    /// The cross-fade finished; the scene is fully opaque.
    FadeFinished(SceneKey),
    /// One tile was installed.
    TileInstalled {
        /// Tile row.
        row: u32,
        /// Tile column.
        col: u32,
    },
    /// Every tile of the grid is installed.
    GridComplete(SceneKey),
}

#[derive(Debug)]
struct PendingTile {
    ticket: LoadTicket,
    row: u32,
    col: u32,
    key: SceneKey,
}

/// Streams a scene's thumbnail and tile grid onto the render target.
pub struct TileStreamer {
    scene_key: Option<SceneKey>,
    completion: FxHashSet<(u32, u32)>,
    complete: bool,
    grid: TileGrid,
    pending_thumb: Option<(LoadTicket, SceneKey)>,
    pending_tiles: Vec<PendingTile>,
    sphere: Option<SphereHandle>,
    last_sphere: Option<SphereHandle>,
    opacity: f32,
    fade_in: Option<Tween<f32>>,
    fade_out: Option<Tween<f32>>,
    fade_duration: Duration,
}

impl TileStreamer {
    /// Streamer with the given cross-fade duration.
    pub fn new(fade_duration: Duration) -> Self {
        Self {
            scene_key: None,
            completion: FxHashSet::default(),
            complete: false,
            grid: TileGrid::default(),
            pending_thumb: None,
            pending_tiles: Vec::new(),
            sphere: None,
            last_sphere: None,
            opacity: FADE_LOW,
            fade_in: None,
            fade_out: None,
            fade_duration,
        }
    }

    /// Key of the scene currently being streamed.
    pub const fn scene_key(&self) -> Option<&SceneKey> {
        self.scene_key.as_ref()
    }

    /// Whether every tile of the active grid is installed.
    pub const fn complete(&self) -> bool {
        self.complete
    }

    /// Whether the tile at (row, col) is installed for the active scene.
    pub fn is_tile_complete(&self, row: u32, col: u32) -> bool {
        self.completion.contains(&(row, col))
    }

    /// Handle of the live panorama sphere, if one exists.
    pub const fn sphere(&self) -> Option<SphereHandle> {
        self.sphere
    }

    /// Begin streaming a new scene: reset per-scene state and request the
    /// thumbnail. Results still in flight for the previous key become
    /// stale and will be discarded when they arrive.
    pub fn load_thumbnail(&mut self, url: &str, key: SceneKey, loader: &mut dyn TextureLoader) {
        log::debug!("thumbnail requested for scene {key}");
        self.scene_key = Some(key.clone());
        self.completion.clear();
        self.complete = false;
        self.grid = TileGrid::default();
        self.pending_thumb = Some((loader.request(url), key));
    }

    /// Request every tile of the grid that is neither installed nor in
    /// flight. Safe to call repeatedly (drag end, zoom change); only
    /// missing tiles are fetched.
    pub fn load_tile_grid(&mut self, grid: &TileGrid, key: &SceneKey, loader: &mut dyn TextureLoader) {
        if self.scene_key.as_ref() != Some(key) {
            log::debug!("tile grid for stale scene {key} ignored");
            return;
        }
        if self.complete || grid.total() == 0 {
            return;
        }
        self.grid = grid.clone();
        for row in 0..grid.rows() {
            for col in 0..grid.cols() {
                if self.completion.contains(&(row, col)) {
                    continue;
                }
                if self
                    .pending_tiles
                    .iter()
                    .any(|p| p.row == row && p.col == col && p.key == *key)
                {
                    continue;
                }
                if let Some(url) = grid.url(row, col) {
                    self.pending_tiles.push(PendingTile {
                        ticket: loader.request(url),
                        row,
                        col,
                        key: key.clone(),
                    });
                }
            }
        }
    }

    /// Poll in-flight loads and advance the cross-fade.
    pub fn tick(
        &mut self,
        now: Instant,
        loader: &mut dyn TextureLoader,
        target: &mut dyn RenderTarget,
    ) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        self.poll_thumbnail(now, loader, target, &mut events);
        self.advance_fades(now, target, &mut events);
        self.poll_tiles(loader, target, &mut events);
        events
    }

    fn poll_thumbnail(
        &mut self,
        now: Instant,
        loader: &mut dyn TextureLoader,
        target: &mut dyn RenderTarget,
        events: &mut Vec<StreamEvent>,
    ) {
        let Some((ticket, key)) = self.pending_thumb.take() else {
            return;
        };
        match loader.poll(ticket) {
            LoadPoll::Pending => self.pending_thumb = Some((ticket, key)),
            LoadPoll::Ready(texture) => {
                if self.scene_key.as_ref() != Some(&key) {
                    log::debug!("stale thumbnail for scene {key} released");
                    loader.release(texture);
                    return;
                }
                // Swap: the current sphere becomes the fading-out
                // previous one.
                if let Some(old_last) = self.last_sphere.take() {
                    target.remove_sphere(old_last);
                }
                self.last_sphere = self.sphere.take();
                let sphere = target.create_sphere(texture, THUMB_INITIAL_OPACITY);
                self.sphere = Some(sphere);
                self.opacity = FADE_LOW;
                self.fade_in = Some(Tween::new(
                    now,
                    self.fade_duration,
                    FADE_LOW,
                    1.0,
                    EasingFunction::QuadraticOut,
                ));
                if self.last_sphere.is_some() {
                    self.fade_out = Some(Tween::new(
                        now,
                        self.fade_duration,
                        1.0,
                        FADE_LOW,
                        EasingFunction::QuadraticOut,
                    ));
                }
                events.push(StreamEvent::ThumbnailReady(key));
            }
            LoadPoll::Failed => {
                log::warn!("thumbnail load failed for scene {key}");
            }
        }
    }

    fn advance_fades(
        &mut self,
        now: Instant,
        target: &mut dyn RenderTarget,
        events: &mut Vec<StreamEvent>,
    ) {
        if let Some(fade) = self.fade_out.as_mut() {
            let value = fade.sample(now);
            if let Some(last) = self.last_sphere {
                target.set_sphere_opacity(last, value);
            }
            if fade.is_done() {
                self.fade_out = None;
                if let Some(last) = self.last_sphere.take() {
                    target.remove_sphere(last);
                }
            }
        }
        if let Some(fade) = self.fade_in.as_mut() {
            let value = fade.sample(now);
            self.opacity = value;
            if let Some(sphere) = self.sphere {
                target.set_sphere_opacity(sphere, value);
            }
            if fade.is_done() {
                self.fade_in = None;
                if let Some(key) = self.scene_key.clone() {
                    events.push(StreamEvent::FadeFinished(key));
                }
            }
        }
    }

    fn poll_tiles(
        &mut self,
        loader: &mut dyn TextureLoader,
        target: &mut dyn RenderTarget,
        events: &mut Vec<StreamEvent>,
    ) {
        let mut index = 0;
        while index < self.pending_tiles.len() {
            match loader.poll(self.pending_tiles[index].ticket) {
                LoadPoll::Pending => {
                    index += 1;
                }
                LoadPoll::Ready(texture) => {
                    let tile = self.pending_tiles.swap_remove(index);
                    let current = self.scene_key.as_ref() == Some(&tile.key);
                    match (current, self.sphere) {
                        (true, Some(sphere)) => {
                            target.set_sphere_tile(
                                sphere,
                                tile.row,
                                tile.col,
                                texture,
                                self.opacity,
                            );
                            let _inserted = self.completion.insert((tile.row, tile.col));
                            events.push(StreamEvent::TileInstalled {
                                row: tile.row,
                                col: tile.col,
                            });
                            let total = self.grid.total();
                            if total > 0 && self.completion.len() as u32 == total {
                                self.complete = true;
                                events.push(StreamEvent::GridComplete(tile.key));
                            }
                        }
                        _ => {
                            // Superseded scene (or no sphere yet): the
                            // texture must not be applied.
                            log::debug!(
                                "stale tile {}-{} for scene {} released",
                                tile.row,
                                tile.col,
                                tile.key
                            );
                            loader.release(texture);
                        }
                    }
                }
                LoadPoll::Failed => {
                    let tile = self.pending_tiles.swap_remove(index);
                    // Degraded but not fatal: the thumbnail keeps showing
                    // beneath and `complete` stays false.
                    log::warn!("tile {}-{} failed for scene {}", tile.row, tile.col, tile.key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{EntityId, FillMesh, Rgba, Stroke};
    use crate::camera::Camera;
    use crate::streaming::target::TextureHandle;
    use glam::Vec3;
    use rustc_hash::FxHashMap;

    /// Loader whose results are settled explicitly by the test.
    #[derive(Default)]
    struct FakeLoader {
        next: u64,
        requests: Vec<(LoadTicket, String)>,
        settled: FxHashMap<u64, LoadPoll>,
        released: Vec<TextureHandle>,
    }

    impl FakeLoader {
        fn settle(&mut self, url: &str, poll: LoadPoll) {
            let ticket = self
                .requests
                .iter()
                .find(|(_, u)| u == url)
                .map(|(t, _)| *t)
                .unwrap();
            let _ = self.settled.insert(ticket.0, poll);
        }

        fn settle_all(&mut self) {
            for (index, (ticket, _)) in self.requests.iter().enumerate() {
                let _ = self
                    .settled
                    .entry(ticket.0)
                    .or_insert(LoadPoll::Ready(TextureHandle(1000 + index as u64)));
            }
        }
    }

    impl TextureLoader for FakeLoader {
        fn request(&mut self, url: &str) -> LoadTicket {
            self.next += 1;
            let ticket = LoadTicket(self.next);
            self.requests.push((ticket, url.to_owned()));
            ticket
        }

        fn poll(&mut self, ticket: LoadTicket) -> LoadPoll {
            self.settled
                .get(&ticket.0)
                .copied()
                .unwrap_or(LoadPoll::Pending)
        }

        fn release(&mut self, texture: TextureHandle) {
            self.released.push(texture);
        }
    }

    /// Target that records sphere and tile operations.
    #[derive(Default)]
    struct FakeTarget {
        next: u64,
        spheres: Vec<SphereHandle>,
        removed: Vec<SphereHandle>,
        tiles: Vec<(SphereHandle, u32, u32)>,
        opacities: Vec<(SphereHandle, f32)>,
    }

    impl RenderTarget for FakeTarget {
        fn create_sphere(&mut self, _texture: TextureHandle, _opacity: f32) -> SphereHandle {
            self.next += 1;
            let handle = SphereHandle(self.next);
            self.spheres.push(handle);
            handle
        }

        fn remove_sphere(&mut self, sphere: SphereHandle) {
            self.removed.push(sphere);
        }

        fn set_sphere_opacity(&mut self, sphere: SphereHandle, opacity: f32) {
            self.opacities.push((sphere, opacity));
        }

        fn set_sphere_tile(
            &mut self,
            sphere: SphereHandle,
            row: u32,
            col: u32,
            _texture: TextureHandle,
            _opacity: f32,
        ) {
            self.tiles.push((sphere, row, col));
        }

        fn upsert_fill_mesh(&mut self, _id: EntityId, _mesh: &FillMesh, _color: Rgba) {}
        fn upsert_stroke_mesh(
            &mut self,
            _id: EntityId,
            _positions: &[Vec3],
            _closed: bool,
            _stroke: &Stroke,
        ) {
        }
        fn remove_annotation(&mut self, _id: EntityId) {}
        fn set_camera(&mut self, _camera: &Camera) {}
    }

    fn grid_4x2() -> TileGrid {
        TileGrid::new(
            (0..2)
                .map(|r| (0..4).map(|c| format!("tile-{r}-{c}.jpg")).collect())
                .collect(),
        )
    }

    fn ready_streamer(
        loader: &mut FakeLoader,
        target: &mut FakeTarget,
        now: Instant,
    ) -> TileStreamer {
        let mut streamer = TileStreamer::new(Duration::from_millis(1000));
        streamer.load_thumbnail("thumb.jpg", SceneKey::new("a"), loader);
        loader.settle("thumb.jpg", LoadPoll::Ready(TextureHandle(1)));
        let events = streamer.tick(now, loader, target);
        assert!(events.contains(&StreamEvent::ThumbnailReady(SceneKey::new("a"))));
        streamer
    }

    #[test]
    fn test_grid_dimensions() {
        let grid = grid_4x2();
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.cols(), 4);
        assert_eq!(grid.total(), 8);
    }

    #[test]
    fn test_completes_with_exactly_eight_unique_tiles() {
        let mut loader = FakeLoader::default();
        let mut target = FakeTarget::default();
        let now = Instant::now();
        let mut streamer = ready_streamer(&mut loader, &mut target, now);

        let key = SceneKey::new("a");
        streamer.load_tile_grid(&grid_4x2(), &key, &mut loader);
        assert_eq!(loader.requests.len(), 9); // thumb + 8 tiles

        // Settle 7 tiles: not complete.
        for r in 0..2 {
            for c in 0..4 {
                if (r, c) == (1, 3) {
                    continue;
                }
                loader.settle(
                    &format!("tile-{r}-{c}.jpg"),
                    LoadPoll::Ready(TextureHandle(100 + (r * 4 + c) as u64)),
                );
            }
        }
        let events = streamer.tick(now, &mut loader, &mut target);
        assert!(!streamer.complete());
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, StreamEvent::TileInstalled { .. }))
                .count(),
            7
        );

        // Re-requesting must not duplicate in-flight or installed tiles.
        streamer.load_tile_grid(&grid_4x2(), &key, &mut loader);
        assert_eq!(loader.requests.len(), 9); // 1-3 is still in flight

        loader.settle("tile-1-3.jpg", LoadPoll::Ready(TextureHandle(999)));
        let events = streamer.tick(now, &mut loader, &mut target);
        assert!(streamer.complete());
        assert!(events.contains(&StreamEvent::GridComplete(key)));
    }

    #[test]
    fn test_stale_scene_tiles_never_counted() {
        let mut loader = FakeLoader::default();
        let mut target = FakeTarget::default();
        let now = Instant::now();
        let mut streamer = ready_streamer(&mut loader, &mut target, now);

        let key_a = SceneKey::new("a");
        streamer.load_tile_grid(&grid_4x2(), &key_a, &mut loader);

        // Scene switch while the grid is in flight.
        streamer.load_thumbnail("thumb-b.jpg", SceneKey::new("b"), &mut loader);
        loader.settle_all();
        let _ = streamer.tick(now, &mut loader, &mut target);

        // Old tiles were released, not installed; the new scene starts
        // with an empty completion map.
        assert!(!streamer.complete());
        assert!(!streamer.is_tile_complete(0, 0));
        assert_eq!(loader.released.len(), 8);
    }

    #[test]
    fn test_failed_tile_leaves_grid_incomplete() {
        let mut loader = FakeLoader::default();
        let mut target = FakeTarget::default();
        let now = Instant::now();
        let mut streamer = ready_streamer(&mut loader, &mut target, now);

        let key = SceneKey::new("a");
        streamer.load_tile_grid(&grid_4x2(), &key, &mut loader);
        loader.settle("tile-0-0.jpg", LoadPoll::Failed);
        for r in 0..2 {
            for c in 0..4 {
                if (r, c) == (0, 0) {
                    continue;
                }
                loader.settle(
                    &format!("tile-{r}-{c}.jpg"),
                    LoadPoll::Ready(TextureHandle(100 + (r * 4 + c) as u64)),
                );
            }
        }
        let _ = streamer.tick(now, &mut loader, &mut target);
        assert!(!streamer.complete());
        assert!(!streamer.is_tile_complete(0, 0));
        assert!(streamer.is_tile_complete(0, 1));
    }

    #[test]
    fn test_cross_fade_removes_previous_sphere() {
        let mut loader = FakeLoader::default();
        let mut target = FakeTarget::default();
        let start = Instant::now();
        let mut streamer = ready_streamer(&mut loader, &mut target, start);

        // Fade the first sphere fully in.
        let events = streamer.tick(start + Duration::from_millis(1000), &mut loader, &mut target);
        assert!(events.contains(&StreamEvent::FadeFinished(SceneKey::new("a"))));

        // Second scene: its thumbnail swap fades the first sphere out.
        streamer.load_thumbnail("thumb-b.jpg", SceneKey::new("b"), &mut loader);
        loader.settle("thumb-b.jpg", LoadPoll::Ready(TextureHandle(2)));
        let _ = streamer.tick(start + Duration::from_millis(1100), &mut loader, &mut target);
        assert_eq!(target.spheres.len(), 2);
        assert!(target.removed.is_empty());

        let _ = streamer.tick(start + Duration::from_millis(2200), &mut loader, &mut target);
        assert_eq!(target.removed, vec![target.spheres[0]]);
    }
}
