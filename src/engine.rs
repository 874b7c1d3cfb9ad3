//! The panorama engine: one object owning orientation, streaming,
//! annotations and interaction, advanced once per display frame.
//!
//! Hosts drive it with commands (scene switches, edit mode, pointer
//! input) and call [`PanoramaEngine::tick`] every frame with the current
//! instant, their texture loader and their render target. The tick
//! returns everything the host's 2D overlay layer needs to draw; 3D
//! output (sphere, tiles, polygon meshes) goes through the render
//! target directly.

use std::time::{Duration, Instant};

use glam::Quat;
use rustc_hash::FxHashSet;

use crate::animation::{EasingFunction, Tween};
use crate::annotation::{
    self, AnnotationLayer, Dot, EntityId, ProjectedPath, Shape, ShapeKind, Stroke,
};
use crate::camera::{Camera, Eye, OrientationComposer, StereoRig, DEFAULT_FOV, ENTRY_POSE};
use crate::camera::Frustum;
use crate::error::SphairaError;
use crate::events::{AnnotationKind, EngineEvent, EventSink};
use crate::input::{DragController, DragTarget};
use crate::options::EngineOptions;
use crate::projection::{AngleProjector, ScreenPoint, SphereCoord, Viewport};
use crate::scene::{DotData, OverlayData, SceneDescriptor};
use crate::streaming::{RenderTarget, StreamEvent, TextureLoader, TileGrid, TileStreamer};

/// Pointer button reported to [`PanoramaEngine::pointer_down`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Left button: place points, start drags.
    Primary,
    /// Right button: remove the last placed point while drawing.
    Secondary,
}

/// Screen placement of a point annotation for one camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Pixel position (meaningful only when visible).
    pub point: ScreenPoint,
    /// Whether the annotation is inside the view.
    pub visible: bool,
}

/// Mono or per-eye placement, depending on display mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayPlacement {
    /// Normal display: one placement.
    Mono(Placement),
    /// Stereo display: independent placements per eye. An annotation may
    /// be visible in one eye and hidden in the other.
    Stereo {
        /// Left-eye placement, mapped into the left/top half viewport.
        left: Placement,
        /// Right-eye placement, mapped into the right/bottom half
        /// viewport.
        right: Placement,
    },
}

/// Per-frame output for one dot.
#[derive(Debug, Clone)]
pub struct DotFrame {
    /// Entity handle.
    pub id: EntityId,
    /// Display label.
    pub title: String,
    /// Where to draw it.
    pub placement: DisplayPlacement,
}

/// Per-frame output for one navigation overlay.
#[derive(Debug, Clone)]
pub struct OverlayFrame {
    /// Index into the scene's overlay list.
    pub index: usize,
    /// Display label.
    pub title: String,
    /// Scene key the overlay walks to.
    pub walk_key: Option<String>,
    /// Where to draw it.
    pub placement: DisplayPlacement,
}

/// Per-frame output for one line or polygon.
#[derive(Debug, Clone)]
pub struct ShapeFrame {
    /// Entity handle.
    pub id: EntityId,
    /// Resolved stroke (hover-aware).
    pub stroke: Stroke,
    /// Visible screen-space path.
    pub path: ProjectedPath,
    /// Label text drawn at the path's anchor, when enabled and anchored.
    pub label: Option<(ScreenPoint, String)>,
    /// Whether the pointer is over the shape this frame.
    pub hovered: bool,
}

/// Preview output while a shape is being drawn.
#[derive(Debug, Clone)]
pub struct DraftFrame {
    /// Which layer is being edited.
    pub kind: ShapeKind,
    /// The working shape's projected path.
    pub path: ProjectedPath,
    /// Segment from the last placed point to the cursor.
    pub preview: Option<annotation::PathSegment>,
}

/// Everything the host's overlay layer draws in one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameOutput {
    /// Dots, in scene order.
    pub dots: Vec<DotFrame>,
    /// Navigation overlays, in scene order.
    pub overlays: Vec<OverlayFrame>,
    /// Committed lines.
    pub lines: Vec<ShapeFrame>,
    /// Committed polygons.
    pub polygons: Vec<ShapeFrame>,
    /// In-progress shape, if any.
    pub draft: Option<DraftFrame>,
    /// Overlay index currently under the stereo gaze focus, if any.
    pub gaze: Option<usize>,
    /// Streaming progress this frame.
    pub stream: Vec<StreamEvent>,
}

/// The orientation/projection/annotation engine.
pub struct PanoramaEngine {
    options: EngineOptions,
    scenes: Vec<SceneDescriptor>,
    current: Option<usize>,

    composer: OrientationComposer,
    camera: Camera,
    projector: AngleProjector,
    streamer: TileStreamer,
    stereo: Option<StereoRig>,
    sensor_quat: Option<Quat>,

    overlays: Vec<OverlayData>,
    dots: Vec<Dot>,
    lines: AnnotationLayer,
    polygons: AnnotationLayer,
    adding_dot: bool,
    dot_counter: u32,

    flight: Option<Tween<[f32; 3]>>,
    tiles_due: Option<Instant>,

    drags: DragController,
    pointer: Option<(f32, f32)>,
    lock_x: bool,
    lock_y: bool,

    pushed_meshes: FxHashSet<EntityId>,
    sink: Box<dyn EventSink>,
}

impl PanoramaEngine {
    /// Engine over a viewport, notifying the given sink.
    pub fn new(viewport: Viewport, options: EngineOptions, sink: Box<dyn EventSink>) -> Self {
        let mut camera = Camera::default();
        camera.resize(viewport.width, viewport.height);
        let composer = OrientationComposer::new();
        camera.orientation = composer.quaternion();
        let fade = Duration::from_millis(options.fade_ms);
        Self {
            options,
            scenes: Vec::new(),
            current: None,
            composer,
            camera,
            projector: AngleProjector::new(viewport),
            streamer: TileStreamer::new(fade),
            stereo: None,
            sensor_quat: None,
            overlays: Vec::new(),
            dots: Vec::new(),
            lines: AnnotationLayer::new(ShapeKind::Line),
            polygons: AnnotationLayer::new(ShapeKind::Polygon),
            adding_dot: false,
            dot_counter: 1,
            flight: None,
            tiles_due: None,
            drags: DragController::default(),
            pointer: None,
            lock_x: false,
            lock_y: false,
            pushed_meshes: FxHashSet::default(),
            sink,
        }
    }

    // -- scenes ----------------------------------------------------------

    /// Replace the loaded scene set. Does not show anything until
    /// [`PanoramaEngine::start`] or a scene switch.
    pub fn set_scenes(&mut self, scenes: Vec<SceneDescriptor>) {
        self.scenes = scenes;
        self.current = None;
    }

    /// Show the default scene (the one flagged `isDefault`, else the
    /// first) with the entry flight animation.
    pub fn start(&mut self, now: Instant, loader: &mut dyn TextureLoader) {
        if self.scenes.is_empty() {
            log::warn!("start called with no scenes loaded");
            return;
        }
        let index = self
            .scenes
            .iter()
            .position(|s| s.scene.is_default == 1)
            .unwrap_or(0);
        self.enter_scene(index, now, loader, true);
    }

    /// Switch to the scene with the given key, writing the live
    /// rotation back into the departing scene first.
    pub fn switch_scene(
        &mut self,
        key: &str,
        now: Instant,
        loader: &mut dyn TextureLoader,
    ) -> Result<(), SphairaError> {
        let Some(index) = self.scenes.iter().position(|s| s.id == key) else {
            return Err(SphairaError::SceneNotFound(key.to_owned()));
        };
        self.save_orientation();
        self.enter_scene(index, now, loader, false);
        Ok(())
    }

    fn enter_scene(
        &mut self,
        index: usize,
        now: Instant,
        loader: &mut dyn TextureLoader,
        entry_flight: bool,
    ) {
        self.current = Some(index);
        let params = self.scenes[index].scene.clone();
        let key = self.scenes[index].key();
        log::info!("entering scene {key}");

        // Orientation first, textures second, annotations after the fade.
        self.clear_annotations();
        if entry_flight {
            self.composer
                .set_init_rotation(Some(params.correction), Some(ENTRY_POSE));
            self.flight = Some(Tween::new(
                now,
                Duration::from_millis(self.options.entry_flight_duration_ms()),
                ENTRY_POSE,
                params.rotation,
                EasingFunction::Linear,
            ));
        } else {
            self.composer
                .set_init_rotation(Some(params.correction), Some(params.rotation));
            self.flight = None;
        }
        self.camera.fovy = DEFAULT_FOV;
        self.camera.orientation = self.composer.quaternion();
        self.tiles_due = None;
        self.streamer
            .load_thumbnail(&params.sphere_source.thumb, key, loader);
    }

    fn clear_annotations(&mut self) {
        self.overlays.clear();
        self.dots.clear();
        self.lines.set_shapes(Vec::new());
        self.polygons.set_shapes(Vec::new());
        self.adding_dot = false;
    }

    /// The loaded scene descriptors, including any written-back
    /// rotations.
    pub fn scenes(&self) -> &[SceneDescriptor] {
        &self.scenes
    }

    /// The current scene's committed dots.
    pub fn dots(&self) -> &[Dot] {
        &self.dots
    }

    /// Copy the live manual/correction rotations into the current
    /// scene's persisted fields and return them as
    /// `(rotation, correction)`.
    pub fn save_orientation(&mut self) -> Option<([f32; 3], [f32; 3])> {
        let index = self.current?;
        let rotation = self.composer.manual_angles();
        let correction = self.composer.correction_angles();
        self.scenes[index].scene.rotation = rotation;
        self.scenes[index].scene.correction = correction;
        Some((rotation, correction))
    }

    fn apply_scene_content(&mut self) {
        let Some(index) = self.current else {
            return;
        };
        let descriptor = self.scenes[index].clone();
        let center = self.projector.pixel_to_angle(&self.camera, None);

        self.overlays = descriptor
            .overlays
            .into_iter()
            .filter(|o| o.enable)
            .map(|mut o| {
                // Unauthored overlays land at the current screen centre.
                if o.x.is_none() || o.y.is_none() {
                    o.x = Some(center.lg);
                    o.y = Some(center.lt);
                }
                o
            })
            .collect();
        self.dots = descriptor
            .dots
            .into_iter()
            .filter(|d| !d.is_hidden)
            .map(Dot::from_data)
            .collect();
        self.lines.set_shapes(descriptor.lines);
        self.polygons.set_shapes(descriptor.polygons);
    }

    // -- accessors -------------------------------------------------------

    /// Live manual rotation `[alpha, beta, gamma]` degrees.
    pub const fn manual_rotation(&self) -> [f32; 3] {
        self.composer.manual_angles()
    }

    /// Live correction rotation `[alpha, beta, gamma]` degrees.
    pub const fn correction_rotation(&self) -> [f32; 3] {
        self.composer.correction_angles()
    }

    /// Current vertical field of view in degrees.
    pub const fn fov(&self) -> f32 {
        self.camera.fovy
    }

    /// The mono camera (orientation already composed).
    pub const fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Whether every tile of the current scene is installed.
    pub const fn tiles_complete(&self) -> bool {
        self.streamer.complete()
    }

    // -- rotation commands ----------------------------------------------

    /// Set the correction yaw in degrees.
    pub fn set_yaw(&mut self, value: f32) {
        self.composer.set_yaw(value);
        self.camera.orientation = self.composer.quaternion();
    }

    /// Set the correction pitch in degrees (clamped ±90).
    pub fn set_pitch(&mut self, value: f32) {
        self.composer.set_pitch(value);
        self.camera.orientation = self.composer.quaternion();
    }

    /// Set the correction roll in degrees.
    pub fn set_roll(&mut self, value: f32) {
        self.composer.set_roll(value);
        self.camera.orientation = self.composer.quaternion();
    }

    /// Set the manual yaw (alpha) in degrees.
    pub fn set_manual_yaw(&mut self, value: f32) {
        self.composer.set_manual_yaw(value);
        self.camera.orientation = self.composer.quaternion();
    }

    /// Set the manual pitch (beta) in degrees (clamped ±90).
    pub fn set_manual_pitch(&mut self, value: f32) {
        self.composer.set_manual_pitch(value);
        self.camera.orientation = self.composer.quaternion();
    }

    /// Lock or unlock horizontal manual rotation.
    pub fn set_x_lock(&mut self, lock: bool) {
        self.lock_x = lock;
    }

    /// Lock or unlock vertical manual rotation.
    pub fn set_y_lock(&mut self, lock: bool) {
        self.lock_y = lock;
    }

    fn apply_manual(&mut self, alpha: f32, beta: f32) {
        if !self.lock_x {
            self.composer.set_manual_yaw(alpha);
        }
        if !self.lock_y {
            self.composer.set_manual_pitch(beta);
        }
        self.camera.orientation = self.composer.quaternion();
        self.sink
            .emit(EngineEvent::ManualRotation(self.composer.manual_angles()));
    }

    /// Feed an externally sensed camera quaternion (device orientation
    /// mode). The engine renders with it directly.
    pub fn set_sensor_quaternion(&mut self, quat: Quat) {
        self.sensor_quat = Some(quat);
        self.camera.orientation = quat;
    }

    /// Leave sensor mode: the manual rotation is derived from the last
    /// sensed quaternion so manual control continues seamlessly.
    pub fn clear_sensor_mode(&mut self) {
        if let Some(quat) = self.sensor_quat.take() {
            self.composer.derive_manual_from_camera(quat);
            self.camera.orientation = self.composer.quaternion();
        }
    }

    /// Zoom by changing the field of view, clamped to the scene's
    /// `[angle_near, angle_far]` range.
    pub fn zoom(&mut self, delta: f32, loader: &mut dyn TextureLoader) {
        let (near, far) = self
            .current
            .map(|i| (self.scenes[i].scene.angle_near, self.scenes[i].scene.angle_far))
            .unwrap_or((30.0, 110.0));
        self.camera.fovy = (self.camera.fovy + delta).clamp(near, far);
        // Zooming reveals detail: make sure missing tiles are on the way.
        self.request_tiles(loader);
    }

    /// Resize the viewport.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.projector = AngleProjector::new(Viewport::new(width, height));
        self.camera.resize(width, height);
    }

    /// Enable or disable stereo (dual-eye) display.
    pub fn set_stereo(&mut self, enabled: bool) {
        self.stereo = enabled.then(|| StereoRig::new(self.options.eye_separation));
    }

    // -- annotation commands --------------------------------------------

    /// Arm dot-add mode: the next primary click places one dot.
    pub fn begin_add_dot(&mut self) {
        self.adding_dot = true;
    }

    /// Disarm dot-add mode without placing anything.
    pub fn cancel_add_dot(&mut self) {
        self.adding_dot = false;
    }

    /// Begin building a new line point by point.
    pub fn begin_add_line(&mut self) {
        self.lines.start_add(&mut *self.sink);
    }

    /// Begin building a new polygon point by point.
    pub fn begin_add_polygon(&mut self) {
        self.polygons.start_add(&mut *self.sink);
    }

    /// Begin editing the line with the given host id; unknown ids are a
    /// no-op.
    pub fn begin_edit_line(&mut self, host_id: &str) -> bool {
        self.lines.start_edit(host_id, &mut *self.sink)
    }

    /// Begin editing the polygon with the given host id; unknown ids
    /// are a no-op.
    pub fn begin_edit_polygon(&mut self, host_id: &str) -> bool {
        self.polygons.start_edit(host_id, &mut *self.sink)
    }

    /// Commit the working line (needs ≥ 2 points).
    pub fn finish_line(&mut self) {
        self.lines.finish(&mut *self.sink);
    }

    /// Commit the working polygon (needs ≥ 2 points; 3 for a meaningful
    /// fill).
    pub fn finish_polygon(&mut self) {
        self.polygons.finish(&mut *self.sink);
    }

    /// Abandon the working line, restoring any pre-edit snapshot.
    pub fn cancel_line(&mut self) {
        self.lines.cancel(&mut *self.sink);
    }

    /// Abandon the working polygon, restoring any pre-edit snapshot.
    pub fn cancel_polygon(&mut self) {
        self.polygons.cancel(&mut *self.sink);
    }

    fn next_dot_title(&mut self) -> String {
        loop {
            let title = format!("Dot {}", self.dot_counter);
            self.dot_counter += 1;
            if !self.dots.iter().any(|d| d.meta.title == title) {
                return title;
            }
        }
    }

    fn place_dot(&mut self, px: f32, py: f32) {
        let angle = self.projector.pixel_to_angle(&self.camera, Some((px, py)));
        let meta = DotData {
            title: self.next_dot_title(),
            x: angle.lg,
            y: angle.lt,
            ..DotData::default()
        };
        let dot = Dot::from_data(meta);
        self.sink.emit(EngineEvent::DotCreated(dot.meta.clone()));
        self.dots.push(dot);
        self.adding_dot = false;
    }

    /// Animated recenter onto a dot (by host id).
    pub fn jump_to_dot(&mut self, host_id: &str, now: Instant) {
        let target = self
            .dots
            .iter()
            .find(|d| d.meta.id.as_deref() == Some(host_id))
            .map(|d| d.angle);
        self.turn_camera_to(target, now);
    }

    /// Animated recenter onto a line's last point (by host id).
    pub fn jump_to_line(&mut self, host_id: &str, now: Instant) {
        let target = self
            .lines
            .shape_by_host_id(host_id)
            .and_then(|s| s.points.last().copied());
        self.turn_camera_to(target, now);
    }

    /// Animated recenter onto a polygon's last point (by host id).
    pub fn jump_to_polygon(&mut self, host_id: &str, now: Instant) {
        let target = self
            .polygons
            .shape_by_host_id(host_id)
            .and_then(|s| s.points.last().copied());
        self.turn_camera_to(target, now);
    }

    fn turn_camera_to(&mut self, target: Option<SphereCoord>, now: Instant) {
        let Some(angle) = target else {
            return;
        };
        // Latest request wins: a new flight replaces any running one.
        self.flight = Some(Tween::new(
            now,
            Duration::from_millis(self.options.recenter_ms),
            self.composer.manual_angles(),
            [angle.lg.to_degrees(), angle.lt.to_degrees(), 0.0],
            EasingFunction::Linear,
        ));
    }

    /// Activate a navigation overlay (click or completed gaze dwell).
    /// Emits a walk request carrying the target scene key.
    pub fn activate_overlay(&mut self, index: usize) {
        if let Some(key) = self
            .overlays
            .get(index)
            .and_then(|o| o.next_photo_key.clone())
        {
            self.sink.emit(EngineEvent::WalkRequested(key));
        }
    }

    /// Hit-test committed shapes at a pixel and emit a selection event.
    /// Polygons win over lines; misses clear nothing.
    pub fn select_at(&mut self, px: f32, py: f32) {
        let frustum = Frustum::from_view_projection(self.camera.build_matrix());
        if let Some(data) = self.hit_polygon(&frustum, px, py) {
            self.sink.emit(EngineEvent::Selected {
                kind: AnnotationKind::Polygon,
                data: Some(data),
            });
            return;
        }
        if let Some(data) = self.hit_line(&frustum, px, py) {
            self.sink.emit(EngineEvent::Selected {
                kind: AnnotationKind::Line,
                data: Some(data),
            });
        }
    }

    fn hit_polygon(&self, frustum: &Frustum, px: f32, py: f32) -> Option<crate::scene::ShapeData> {
        self.polygons
            .shapes
            .iter()
            .find(|shape| annotation::hit_fill(&self.visible_ring(frustum, shape), px, py))
            .map(Shape::to_data)
    }

    fn hit_line(&self, frustum: &Frustum, px: f32, py: f32) -> Option<crate::scene::ShapeData> {
        self.lines
            .shapes
            .iter()
            .find(|shape| {
                let path = annotation::project_path(
                    &self.projector,
                    &self.camera,
                    frustum,
                    &shape.points,
                    false,
                    self.options.bisection_steps,
                );
                let width = shape.meta.line_width.unwrap_or(4.0);
                annotation::hit_path(&path.segments, px, py, width / 2.0 + 2.0)
            })
            .map(Shape::to_data)
    }

    fn visible_ring(&self, frustum: &Frustum, shape: &Shape) -> Vec<ScreenPoint> {
        shape
            .points
            .iter()
            .filter(|p| !annotation::is_hidden(frustum, **p))
            .map(|p| self.projector.angle_to_screen(&self.camera, *p).point)
            .collect()
    }

    // -- pointer input ---------------------------------------------------

    /// Pointer pressed.
    pub fn pointer_down(&mut self, px: f32, py: f32, button: PointerButton) {
        self.pointer = Some((px, py));
        if self.adding_dot {
            if button == PointerButton::Primary {
                self.place_dot(px, py);
            }
            return;
        }
        if self.lines.is_editing() || self.polygons.is_editing() {
            let angle = self.projector.pixel_to_angle(&self.camera, Some((px, py)));
            let layer = if self.lines.is_editing() {
                &mut self.lines
            } else {
                &mut self.polygons
            };
            match button {
                PointerButton::Primary => layer.append_point(angle, &mut *self.sink),
                PointerButton::Secondary => layer.remove_last_point(&mut *self.sink),
            }
            return;
        }
        if button == PointerButton::Primary {
            let [alpha, beta, _gamma] = self.composer.manual_angles();
            let _ = self.drags.begin(
                DragTarget::Camera {
                    start_alpha: alpha,
                    start_beta: beta,
                },
                (px, py),
            );
        }
    }

    /// Start dragging a committed dot (the host knows which marker was
    /// grabbed). No-op when another drag is active.
    pub fn begin_dot_drag(&mut self, id: EntityId, px: f32, py: f32) {
        let Some(dot) = self.dots.iter().find(|d| d.id == id) else {
            return;
        };
        let origin = self
            .projector
            .angle_to_screen(&self.camera, dot.angle)
            .point;
        let _ = self.drags.begin(
            DragTarget::Dot {
                id,
                origin: (origin.x, origin.y),
            },
            (px, py),
        );
    }

    /// Start dragging one point of the working shape.
    pub fn begin_point_drag(&mut self, kind: ShapeKind, index: usize, px: f32, py: f32) {
        let layer = match kind {
            ShapeKind::Line => &self.lines,
            ShapeKind::Polygon => &self.polygons,
        };
        let Some(angle) = layer
            .working
            .as_ref()
            .and_then(|s| s.points.get(index).copied())
        else {
            return;
        };
        let origin = self.projector.angle_to_screen(&self.camera, angle).point;
        let _ = self.drags.begin(
            DragTarget::ShapePoint {
                kind,
                index,
                origin: (origin.x, origin.y),
            },
            (px, py),
        );
    }

    /// Pointer moved.
    pub fn pointer_move(&mut self, px: f32, py: f32) {
        self.pointer = Some((px, py));
        let Some(state) = self.drags.current().copied() else {
            return;
        };
        let (dx, dy) = state.delta((px, py));
        match state.target {
            DragTarget::Camera {
                start_alpha,
                start_beta,
            } => {
                // Degrees per pixel scale with the field of view so a
                // drag feels the same at any zoom.
                let k = self.camera.fovy * self.options.drag_sensitivity
                    / self.projector.viewport.height;
                self.apply_manual(start_alpha + dx * k, start_beta + dy * k);
            }
            DragTarget::Dot { id, origin } => {
                let angle = self.projector.pixel_to_angle(
                    &self.camera,
                    Some((origin.0 + dx, origin.1 + dy)),
                );
                if let Some(dot) = self.dots.iter_mut().find(|d| d.id == id) {
                    dot.set_angle(angle);
                }
            }
            DragTarget::ShapePoint { kind, index, origin } => {
                let angle = self.projector.pixel_to_angle(
                    &self.camera,
                    Some((origin.0 + dx, origin.1 + dy)),
                );
                let layer = match kind {
                    ShapeKind::Line => &mut self.lines,
                    ShapeKind::Polygon => &mut self.polygons,
                };
                layer.move_point(index, angle, &mut *self.sink);
            }
        }
    }

    /// Pointer released: end the drag and emit the committed
    /// notification.
    pub fn pointer_up(&mut self, loader: &mut dyn TextureLoader) {
        let Some(state) = self.drags.end() else {
            return;
        };
        match state.target {
            DragTarget::Camera { .. } => {
                // Rotation settled: fill in any tiles newly in view.
                self.request_tiles(loader);
                self.sink
                    .emit(EngineEvent::ManualRotation(self.composer.manual_angles()));
            }
            DragTarget::Dot { id, .. } => {
                if let Some(dot) = self.dots.iter().find(|d| d.id == id) {
                    self.sink.emit(EngineEvent::DotUpdated(dot.meta.clone()));
                }
            }
            DragTarget::ShapePoint { .. } => {}
        }
    }

    // -- frame tick ------------------------------------------------------

    fn request_tiles(&mut self, loader: &mut dyn TextureLoader) {
        let Some(index) = self.current else {
            return;
        };
        let key = self.scenes[index].key();
        let grid = TileGrid::new(self.scenes[index].scene.sphere_source.slices.clone());
        self.streamer.load_tile_grid(&grid, &key, loader);
    }

    /// Advance one display frame.
    pub fn tick(
        &mut self,
        now: Instant,
        loader: &mut dyn TextureLoader,
        target: &mut dyn RenderTarget,
    ) -> FrameOutput {
        // 1. Animated orientation flight (entry or recenter).
        if let Some(flight) = self.flight.as_mut() {
            let angles = flight.sample(now);
            self.composer.set_init_rotation(None, Some(angles));
            if flight.is_done() {
                self.flight = None;
            }
        }
        if let Some(quat) = self.sensor_quat {
            self.camera.orientation = quat;
        } else {
            self.camera.orientation = self.composer.quaternion();
        }

        // 2. Texture streaming.
        let stream = self.streamer.tick(now, loader, target);
        for event in &stream {
            match event {
                StreamEvent::FadeFinished(key) => {
                    // Scene fully visible: restore the authored fov,
                    // attach its annotations, schedule the tile grid.
                    if let Some(index) = self.current {
                        let params = &self.scenes[index].scene;
                        self.camera.fovy = params
                            .angle_init
                            .clamp(params.angle_near, params.angle_far);
                    }
                    self.apply_scene_content();
                    self.tiles_due =
                        Some(now + Duration::from_millis(self.options.tile_delay_ms));
                    self.sink.emit(EngineEvent::SceneReady(key.clone()));
                }
                StreamEvent::GridComplete(key) => {
                    log::info!("all tiles installed for scene {key}");
                }
                StreamEvent::ThumbnailReady(_) | StreamEvent::TileInstalled { .. } => {}
            }
        }
        if self.tiles_due.is_some_and(|due| now >= due) {
            self.tiles_due = None;
            self.request_tiles(loader);
        }

        // 3. 3D pass: camera and annotation meshes.
        target.set_camera(&self.camera);
        self.push_annotation_meshes(target);

        // 4. 2D overlay output.
        let mut output = self.project_frame();
        output.stream = stream;
        output
    }

    fn push_annotation_meshes(&mut self, target: &mut dyn RenderTarget) {
        let mut current: FxHashSet<EntityId> = FxHashSet::default();

        let line_shapes = self.lines.shapes.iter().chain(self.lines.working.iter());
        for shape in line_shapes {
            if shape.points.len() < 2 {
                continue;
            }
            let stroke = resolve_stroke(&shape.meta, false);
            target.upsert_stroke_mesh(
                shape.id,
                &annotation::outline_positions(&shape.points),
                false,
                &stroke,
            );
            let _ = current.insert(shape.id);
        }

        let hovered = self.hovered_polygon();
        let polygon_shapes = self
            .polygons
            .shapes
            .iter()
            .chain(self.polygons.working.iter());
        for shape in polygon_shapes {
            if shape.points.len() < 2 {
                continue;
            }
            let is_hovered = hovered == Some(shape.id);
            let stroke = resolve_stroke(&shape.meta, is_hovered);
            target.upsert_stroke_mesh(
                shape.id,
                &annotation::outline_positions(&shape.points),
                true,
                &stroke,
            );
            if let Some(mesh) = annotation::triangulate_fill(&shape.points) {
                let fill = resolve_fill(&shape.meta, is_hovered);
                target.upsert_fill_mesh(shape.id, &mesh, fill);
            }
            let _ = current.insert(shape.id);
        }

        for stale in self.pushed_meshes.difference(&current) {
            target.remove_annotation(*stale);
        }
        self.pushed_meshes = current;
    }

    fn hovered_polygon(&self) -> Option<EntityId> {
        let (px, py) = self.pointer?;
        let frustum = Frustum::from_view_projection(self.camera.build_matrix());
        self.polygons
            .shapes
            .iter()
            .find(|shape| annotation::hit_fill(&self.visible_ring(&frustum, shape), px, py))
            .map(|shape| shape.id)
    }

    fn project_frame(&mut self) -> FrameOutput {
        let mut output = FrameOutput::default();
        let frustum = Frustum::from_view_projection(self.camera.build_matrix());

        for dot in &self.dots {
            output.dots.push(DotFrame {
                id: dot.id,
                title: dot.meta.title.clone(),
                placement: self.place_angle(dot.angle),
            });
        }

        for (index, overlay) in self.overlays.iter().enumerate() {
            let angle = SphereCoord::new(
                overlay.x.unwrap_or_default(),
                overlay.y.unwrap_or_default(),
            );
            let placement = self.place_angle(angle);
            if output.gaze.is_none() {
                if let Some(gazed) = self.gazed(&placement) {
                    if gazed {
                        output.gaze = Some(index);
                    }
                }
            }
            output.overlays.push(OverlayFrame {
                index,
                title: overlay.title.clone(),
                walk_key: overlay.next_photo_key.clone(),
                placement,
            });
        }

        let hovered = self.hovered_polygon();
        for shape in &self.lines.shapes {
            output.lines.push(self.shape_frame(&frustum, shape, false, false));
        }
        for shape in &self.polygons.shapes {
            let is_hovered = hovered == Some(shape.id);
            output
                .polygons
                .push(self.shape_frame(&frustum, shape, true, is_hovered));
        }

        output.draft = self.draft_frame(&frustum);
        output
    }

    fn shape_frame(
        &self,
        frustum: &Frustum,
        shape: &Shape,
        closed: bool,
        hovered: bool,
    ) -> ShapeFrame {
        let path = annotation::project_path(
            &self.projector,
            &self.camera,
            frustum,
            &shape.points,
            closed,
            self.options.bisection_steps,
        );
        let label = (shape.meta.show_content)
            .then(|| {
                path.label_anchor
                    .map(|anchor| (anchor, shape.meta.title.clone()))
            })
            .flatten();
        ShapeFrame {
            id: shape.id,
            stroke: resolve_stroke(&shape.meta, hovered),
            path,
            label,
            hovered,
        }
    }

    fn draft_frame(&self, frustum: &Frustum) -> Option<DraftFrame> {
        let (kind, layer) = if self.lines.is_editing() {
            (ShapeKind::Line, &self.lines)
        } else if self.polygons.is_editing() {
            (ShapeKind::Polygon, &self.polygons)
        } else {
            return None;
        };
        let working = layer.working.as_ref()?;
        let path = annotation::project_path(
            &self.projector,
            &self.camera,
            frustum,
            &working.points,
            false,
            self.options.bisection_steps,
        );
        let preview = match (working.points.last(), self.pointer) {
            (Some(last), Some(cursor)) => Some(annotation::draft_segment(
                &self.projector,
                &self.camera,
                frustum,
                *last,
                cursor,
                self.options.bisection_steps,
            )),
            _ => None,
        };
        Some(DraftFrame {
            kind,
            path,
            preview,
        })
    }

    fn place_angle(&self, angle: SphereCoord) -> DisplayPlacement {
        match self.stereo {
            None => {
                let projection = self.projector.angle_to_screen(&self.camera, angle);
                DisplayPlacement::Mono(Placement {
                    point: projection.point,
                    visible: !projection.off_screen,
                })
            }
            Some(rig) => {
                let full = self.projector.viewport;
                let mut eyes = [Placement {
                    point: ScreenPoint::default(),
                    visible: false,
                }; 2];
                for (slot, eye) in [Eye::Left, Eye::Right].into_iter().enumerate() {
                    let camera = rig.eye_camera(&self.camera, eye);
                    let (half, origin_x, origin_y) = rig.eye_viewport(full, eye);
                    let projector = AngleProjector::new(half);
                    let projection = projector.angle_to_screen(&camera, angle);
                    eyes[slot] = Placement {
                        point: ScreenPoint::new(
                            projection.point.x + origin_x,
                            projection.point.y + origin_y,
                        ),
                        visible: !projection.off_screen,
                    };
                }
                DisplayPlacement::Stereo {
                    left: eyes[0],
                    right: eyes[1],
                }
            }
        }
    }

    fn gazed(&self, placement: &DisplayPlacement) -> Option<bool> {
        let rig = self.stereo?;
        let DisplayPlacement::Stereo { left, .. } = *placement else {
            return Some(false);
        };
        if !left.visible {
            return Some(false);
        }
        let rect = rig.focus_rect(self.projector.viewport, Eye::Left);
        Some(rect.contains(left.point.x, left.point.y))
    }
}

fn resolve_stroke(meta: &crate::scene::ShapeData, hovered: bool) -> Stroke {
    use crate::annotation::{resolve_color, StrokePattern, DEFAULT_HOVER_COLOR, DEFAULT_STROKE_COLOR};
    if hovered {
        Stroke {
            color: resolve_color(meta.line_color_hover.as_deref(), DEFAULT_HOVER_COLOR),
            width: meta.line_width_hover.unwrap_or(4.0),
            pattern: StrokePattern::parse(meta.line_type_hover.as_deref().unwrap_or("solid")),
        }
    } else {
        Stroke {
            color: resolve_color(meta.line_color.as_deref(), DEFAULT_STROKE_COLOR),
            width: meta.line_width.unwrap_or(4.0),
            pattern: StrokePattern::parse(meta.line_type.as_deref().unwrap_or("solid")),
        }
    }
}

fn resolve_fill(meta: &crate::scene::ShapeData, hovered: bool) -> crate::annotation::Rgba {
    use crate::annotation::{resolve_color, DEFAULT_HOVER_COLOR, DEFAULT_STROKE_COLOR};
    if hovered {
        resolve_color(meta.fill_color_hover.as_deref(), DEFAULT_HOVER_COLOR)
    } else {
        resolve_color(meta.fill_color.as_deref(), DEFAULT_STROKE_COLOR)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::annotation::FillMesh;
    use crate::scene::{SceneParams, SphereSource};
    use crate::streaming::{LoadPoll, LoadTicket, SphereHandle, TextureHandle};
    use glam::Vec3;

    /// Loader that completes every request on the next poll.
    #[derive(Default)]
    struct InstantLoader {
        next: u64,
    }

    impl TextureLoader for InstantLoader {
        fn request(&mut self, _url: &str) -> LoadTicket {
            self.next += 1;
            LoadTicket(self.next)
        }

        fn poll(&mut self, ticket: LoadTicket) -> LoadPoll {
            LoadPoll::Ready(TextureHandle(ticket.0 + 500))
        }

        fn release(&mut self, _texture: TextureHandle) {}
    }

    /// Target that accepts everything.
    #[derive(Default)]
    struct NullTarget {
        next: u64,
    }

    impl RenderTarget for NullTarget {
        fn create_sphere(&mut self, _texture: TextureHandle, _opacity: f32) -> SphereHandle {
            self.next += 1;
            SphereHandle(self.next)
        }
        fn remove_sphere(&mut self, _sphere: SphereHandle) {}
        fn set_sphere_opacity(&mut self, _sphere: SphereHandle, _opacity: f32) {}
        fn set_sphere_tile(
            &mut self,
            _sphere: SphereHandle,
            _row: u32,
            _col: u32,
            _texture: TextureHandle,
            _opacity: f32,
        ) {
        }
        fn upsert_fill_mesh(&mut self, _id: EntityId, _mesh: &FillMesh, _color: crate::annotation::Rgba) {}
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

    /// Sink sharing its buffer with the test body.
    #[derive(Clone, Default)]
    struct SharedSink(Rc<RefCell<Vec<EngineEvent>>>);

    impl EventSink for SharedSink {
        fn emit(&mut self, event: EngineEvent) {
            self.0.borrow_mut().push(event);
        }
    }

    fn scene(id: &str, is_default: i32, rotation: [f32; 3]) -> SceneDescriptor {
        SceneDescriptor {
            id: id.to_owned(),
            scene: SceneParams {
                rotation,
                correction: [0.0, 0.0, 0.0],
                angle_near: 40.0,
                angle_init: 90.0,
                angle_far: 100.0,
                is_default,
                sphere_source: SphereSource {
                    thumb: format!("{id}-thumb.jpg"),
                    slices: vec![
                        vec![format!("{id}-0-0.jpg"), format!("{id}-0-1.jpg")],
                        vec![format!("{id}-1-0.jpg"), format!("{id}-1-1.jpg")],
                    ],
                },
            },
            overlays: Vec::new(),
            dots: Vec::new(),
            lines: Vec::new(),
            polygons: Vec::new(),
        }
    }

    fn engine_with(scenes: Vec<SceneDescriptor>) -> (PanoramaEngine, SharedSink) {
        let sink = SharedSink::default();
        let mut engine = PanoramaEngine::new(
            Viewport::new(1280.0, 720.0),
            EngineOptions::default(),
            Box::new(sink.clone()),
        );
        engine.set_scenes(scenes);
        (engine, sink)
    }

    /// Run the startup sequence: thumbnail, fade, entry flight.
    fn run_startup(engine: &mut PanoramaEngine, start: Instant) -> (InstantLoader, NullTarget) {
        let mut loader = InstantLoader::default();
        let mut target = NullTarget::default();
        engine.start(start, &mut loader);
        let _ = engine.tick(start, &mut loader, &mut target);
        let _ = engine.tick(start + Duration::from_millis(1000), &mut loader, &mut target);
        let _ = engine.tick(start + Duration::from_millis(1400), &mut loader, &mut target);
        (loader, target)
    }

    #[test]
    fn test_entry_flight_lands_on_scene_rotation() {
        let (mut engine, _sink) = engine_with(vec![scene("a", 1, [30.0, -10.0, 0.0])]);
        let start = Instant::now();
        let _ = run_startup(&mut engine, start);
        let [alpha, beta, gamma] = engine.manual_rotation();
        assert!((alpha - 30.0).abs() < 1e-3, "alpha {alpha}");
        assert!((beta + 10.0).abs() < 1e-3, "beta {beta}");
        assert!(gamma.abs() < 1e-3);
    }

    #[test]
    fn test_startup_emits_scene_ready_and_loads_tiles() {
        let (mut engine, sink) = engine_with(vec![scene("a", 1, [0.0, 0.0, 0.0])]);
        let start = Instant::now();
        let (mut loader, mut target) = run_startup(&mut engine, start);
        assert!(sink
            .0
            .borrow()
            .iter()
            .any(|e| matches!(e, EngineEvent::SceneReady(_))));

        // Tiles are requested one delay after the fade and complete.
        let _ = engine.tick(start + Duration::from_millis(2100), &mut loader, &mut target);
        let output = engine.tick(start + Duration::from_millis(2200), &mut loader, &mut target);
        assert!(engine.tiles_complete());
        assert!(output
            .stream
            .iter()
            .any(|e| matches!(e, StreamEvent::GridComplete(_))));
    }

    #[test]
    fn test_click_places_dot_at_pixel_angle() {
        let (mut engine, sink) = engine_with(Vec::new());
        engine.begin_add_dot();
        engine.pointer_down(640.0, 360.0, PointerButton::Primary);
        let events = sink.0.borrow();
        let created = events
            .iter()
            .find_map(|e| match e {
                EngineEvent::DotCreated(data) => Some(data.clone()),
                _ => None,
            })
            .unwrap();
        drop(events);
        let expected = AngleProjector::new(Viewport::new(1280.0, 720.0))
            .pixel_to_angle(engine.camera(), Some((640.0, 360.0)));
        assert!((created.x - expected.lg).abs() < 1e-4);
        assert!((created.y - expected.lt).abs() < 1e-4);
        assert_eq!(engine.dots().len(), 1);
        // One-shot mode: the next click rotates instead of placing.
        engine.pointer_down(100.0, 100.0, PointerButton::Primary);
        assert_eq!(engine.dots().len(), 1);
    }

    #[test]
    fn test_three_click_polygon_emits_three_points_in_order() {
        let (mut engine, sink) = engine_with(Vec::new());
        engine.begin_add_polygon();
        engine.pointer_down(400.0, 300.0, PointerButton::Primary);
        engine.pointer_down(800.0, 300.0, PointerButton::Primary);
        engine.pointer_down(600.0, 500.0, PointerButton::Primary);
        engine.finish_polygon();

        let events = sink.0.borrow();
        let created = events
            .iter()
            .find_map(|e| match e {
                EngineEvent::ShapeCreated {
                    kind: AnnotationKind::Polygon,
                    data,
                } => Some(data.clone()),
                _ => None,
            })
            .unwrap();
        drop(events);
        assert_eq!(created.points.len(), 3);
        let projector = AngleProjector::new(Viewport::new(1280.0, 720.0));
        let first = projector.pixel_to_angle(engine.camera(), Some((400.0, 300.0)));
        assert!((created.points[0].x - first.lg).abs() < 1e-4);
    }

    #[test]
    fn test_camera_drag_rotates_and_reloads_tiles() {
        let (mut engine, sink) = engine_with(vec![scene("a", 1, [0.0, 0.0, 0.0])]);
        let start = Instant::now();
        let (mut loader, _target) = run_startup(&mut engine, start);
        let before = engine.manual_rotation();
        engine.pointer_down(600.0, 400.0, PointerButton::Primary);
        engine.pointer_move(700.0, 380.0);
        engine.pointer_up(&mut loader);
        let after = engine.manual_rotation();
        assert!((after[0] - before[0]).abs() > 1.0, "alpha should move");
        assert!(sink
            .0
            .borrow()
            .iter()
            .any(|e| matches!(e, EngineEvent::ManualRotation(_))));
    }

    #[test]
    fn test_axis_locks_freeze_rotation() {
        let (mut engine, _sink) = engine_with(vec![scene("a", 1, [0.0, 0.0, 0.0])]);
        let start = Instant::now();
        let (mut loader, _target) = run_startup(&mut engine, start);
        engine.set_x_lock(true);
        engine.set_y_lock(true);
        let before = engine.manual_rotation();
        engine.pointer_down(600.0, 400.0, PointerButton::Primary);
        engine.pointer_move(900.0, 100.0);
        engine.pointer_up(&mut loader);
        assert_eq!(engine.manual_rotation(), before);
    }

    #[test]
    fn test_switch_scene_writes_back_rotation() {
        let (mut engine, _sink) = engine_with(vec![
            scene("a", 1, [0.0, 0.0, 0.0]),
            scene("b", 0, [90.0, 0.0, 0.0]),
        ]);
        let start = Instant::now();
        let (mut loader, _target) = run_startup(&mut engine, start);

        // Drag, then walk to scene b.
        engine.pointer_down(600.0, 400.0, PointerButton::Primary);
        engine.pointer_move(900.0, 400.0);
        engine.pointer_up(&mut loader);
        let live = engine.manual_rotation();
        engine
            .switch_scene("b", start + Duration::from_secs(3), &mut loader)
            .unwrap();
        assert_eq!(engine.scenes()[0].scene.rotation, live);
        // The new scene's stored rotation is applied without a flight.
        assert_eq!(engine.manual_rotation(), [90.0, 0.0, 0.0]);
    }

    #[test]
    fn test_switch_to_unknown_scene_errors() {
        let (mut engine, _sink) = engine_with(vec![scene("a", 1, [0.0, 0.0, 0.0])]);
        let mut loader = InstantLoader::default();
        let err = engine
            .switch_scene("ghost", Instant::now(), &mut loader)
            .unwrap_err();
        assert!(matches!(err, SphairaError::SceneNotFound(_)));
    }

    #[test]
    fn test_zoom_clamps_to_scene_limits() {
        let (mut engine, _sink) = engine_with(vec![scene("a", 1, [0.0, 0.0, 0.0])]);
        let start = Instant::now();
        let (mut loader, _target) = run_startup(&mut engine, start);
        engine.zoom(500.0, &mut loader);
        assert_eq!(engine.fov(), 100.0);
        engine.zoom(-500.0, &mut loader);
        assert_eq!(engine.fov(), 40.0);
    }

    #[test]
    fn test_stereo_dot_visible_in_both_eyes() {
        let (mut engine, _sink) = engine_with(Vec::new());
        engine.begin_add_dot();
        engine.pointer_down(640.0, 360.0, PointerButton::Primary);
        engine.set_stereo(true);
        let mut loader = InstantLoader::default();
        let mut target = NullTarget::default();
        let output = engine.tick(Instant::now(), &mut loader, &mut target);
        let DisplayPlacement::Stereo { left, right } = output.dots[0].placement else {
            panic!("expected stereo placement");
        };
        // A point straight ahead is seen by both eyes, in different
        // halves of the split viewport.
        assert!(left.visible && right.visible);
        assert!(left.point.x < 640.0);
        assert!(right.point.x > 640.0);
    }

    #[test]
    fn test_overlay_auto_placed_at_screen_center() {
        let mut descriptor = scene("a", 1, ENTRY_POSE);
        descriptor.overlays.push(OverlayData {
            title: "next".to_owned(),
            enable: true,
            next_photo_key: Some("b".to_owned()),
            ..OverlayData::default()
        });
        let (mut engine, _sink) = engine_with(vec![descriptor]);
        let start = Instant::now();
        let (mut loader, mut target) = run_startup(&mut engine, start);
        let output = engine.tick(start + Duration::from_millis(1500), &mut loader, &mut target);
        assert_eq!(output.overlays.len(), 1);
        let DisplayPlacement::Mono(placement) = output.overlays[0].placement else {
            panic!("expected mono placement");
        };
        assert!(placement.visible);
        assert!((placement.point.x - 640.0).abs() < 2.0);
        assert!((placement.point.y - 360.0).abs() < 2.0);
    }

    #[test]
    fn test_activate_overlay_requests_walk() {
        let mut descriptor = scene("a", 1, ENTRY_POSE);
        descriptor.overlays.push(OverlayData {
            title: "next".to_owned(),
            enable: true,
            next_photo_key: Some("b".to_owned()),
            ..OverlayData::default()
        });
        let (mut engine, sink) = engine_with(vec![descriptor]);
        let start = Instant::now();
        let _ = run_startup(&mut engine, start);
        engine.activate_overlay(0);
        assert!(sink
            .0
            .borrow()
            .iter()
            .any(|e| matches!(e, EngineEvent::WalkRequested(key) if key == "b")));
    }

    #[test]
    fn test_jump_to_dot_recenters_camera() {
        let mut descriptor = scene("a", 1, [0.0, 0.0, 0.0]);
        descriptor.dots.push(DotData {
            id: Some("poi".to_owned()),
            title: "poi".to_owned(),
            x: 1.0,
            y: 0.3,
            ..DotData::default()
        });
        let (mut engine, _sink) = engine_with(vec![descriptor]);
        let start = Instant::now();
        let (mut loader, mut target) = run_startup(&mut engine, start);
        let jump_at = start + Duration::from_secs(2);
        engine.jump_to_dot("poi", jump_at);
        let _ = engine.tick(jump_at + Duration::from_millis(600), &mut loader, &mut target);
        let [alpha, beta, _] = engine.manual_rotation();
        assert!((alpha - 1.0_f32.to_degrees()).abs() < 1e-2);
        assert!((beta - 0.3_f32.to_degrees()).abs() < 1e-2);
    }

    #[test]
    fn test_line_draft_preview_follows_cursor() {
        let (mut engine, _sink) = engine_with(Vec::new());
        engine.begin_add_line();
        engine.pointer_down(500.0, 300.0, PointerButton::Primary);
        engine.pointer_move(700.0, 420.0);
        let mut loader = InstantLoader::default();
        let mut target = NullTarget::default();
        let output = engine.tick(Instant::now(), &mut loader, &mut target);
        let draft = output.draft.unwrap();
        assert_eq!(draft.kind, ShapeKind::Line);
        let preview = draft.preview.unwrap();
        assert!((preview.b.x - 700.0).abs() < 1e-3);
        assert!((preview.b.y - 420.0).abs() < 1e-3);
        assert!((preview.a.x - 500.0).abs() < 1.5);
    }
}
