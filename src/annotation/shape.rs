//! Runtime annotation entities.
//!
//! Entities are built from wire data ([`ShapeData`]/[`DotData`]) at scene
//! load and converted back when notifying the host. Only the angle values
//! are authoritative; screen placement is recomputed every frame.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::projection::SphereCoord;
use crate::scene::{DotData, PointData, ShapeData};

/// Unique entity identifier (atomic counter, assigned on creation).
///
/// Replaces the original string-tag identity: handles are cheap, `Copy`
/// and collision-free within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Allocate the next id.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Which path entity a shape is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Open path, stroked only.
    Line,
    /// Implicitly closed path, stroked and filled.
    Polygon,
}

impl ShapeKind {
    /// Whether the path wraps last→first.
    pub const fn closed(&self) -> bool {
        matches!(self, Self::Polygon)
    }
}

/// A line or polygon annotation with its authoritative angle points.
#[derive(Debug, Clone)]
pub struct Shape {
    /// Process-unique handle.
    pub id: EntityId,
    /// Line or polygon.
    pub kind: ShapeKind,
    /// Wire metadata (title, styling, popup). `meta.points` is stale;
    /// [`Shape::to_data`] rebuilds it.
    pub meta: ShapeData,
    /// Ordered path points. Point order defines path order.
    pub points: Vec<SphereCoord>,
}

impl Shape {
    /// Build a runtime shape from wire data.
    pub fn from_data(kind: ShapeKind, meta: ShapeData) -> Self {
        let points = meta
            .points
            .iter()
            .map(|p| SphereCoord::new(p.x, p.y))
            .collect();
        Self {
            id: EntityId::next(),
            kind,
            meta,
            points,
        }
    }

    /// Export wire data with the live points.
    pub fn to_data(&self) -> ShapeData {
        let mut data = self.meta.clone();
        data.points = self
            .points
            .iter()
            .map(|p| PointData { x: p.lg, y: p.lt })
            .collect();
        data
    }
}

/// A point marker annotation.
#[derive(Debug, Clone)]
pub struct Dot {
    /// Process-unique handle.
    pub id: EntityId,
    /// Wire metadata.
    pub meta: DotData,
    /// Authoritative position.
    pub angle: SphereCoord,
}

impl Dot {
    /// Build a runtime dot from wire data.
    pub fn from_data(meta: DotData) -> Self {
        let angle = SphereCoord::new(meta.x, meta.y);
        Self {
            id: EntityId::next(),
            meta,
            angle,
        }
    }

    /// Move the dot and keep the wire metadata in sync.
    pub fn set_angle(&mut self, angle: SphereCoord) {
        self.angle = angle;
        self.meta.x = angle.lg;
        self.meta.y = angle.lt;
    }
}
