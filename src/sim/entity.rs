//! Entity record and bounding-box primitives
//!
//! Entities are plain data: position, velocity, validated dimensions and an
//! active flag. The bounding box is always derived from position + size,
//! never stored, so it can't drift out of sync.

use glam::Vec2;

use super::SimError;

/// Opaque entity identity token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

/// Monotonic [`EntityId`] allocator.
///
/// One allocator per game instance; passing it around explicitly (instead of
/// a process-wide counter) keeps multiple independent games and test
/// setup/teardown deterministic.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }
}

/// Entity variant tag. Collision reactions are resolved per-kind by the game
/// logic layer; the core only carries the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Player,
    Enemy,
    Projectile,
    Particle,
}

/// Validated entity dimensions (width, height), both strictly positive for
/// the lifetime of the value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size(Vec2);

impl Size {
    /// Fails with a configuration error unless both dimensions are positive
    /// and finite.
    pub fn new(width: f32, height: f32) -> Result<Self, SimError> {
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(SimError::Config(format!(
                "entity dimensions must be positive, got {width}x{height}"
            )));
        }
        Ok(Size(Vec2::new(width, height)))
    }

    pub fn width(&self) -> f32 {
        self.0.x
    }

    pub fn height(&self) -> f32 {
        self.0.y
    }

    pub fn as_vec2(&self) -> Vec2 {
        self.0
    }
}

/// Axis-aligned bounding box in world units.
///
/// Half-open on both axes: a box occupies `[left, right) x [top, bottom)`,
/// so boxes that merely share an edge do not overlap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Aabb {
    pub fn from_pos_size(pos: Vec2, size: Vec2) -> Self {
        Aabb {
            left: pos.x,
            top: pos.y,
            right: pos.x + size.x,
            bottom: pos.y + size.y,
        }
    }

    /// Box translated by `vel * t` (linear projection to a future instant)
    pub fn projected(&self, vel: Vec2, t: f32) -> Self {
        let d = vel * t;
        Aabb {
            left: self.left + d.x,
            top: self.top + d.y,
            right: self.right + d.x,
            bottom: self.bottom + d.y,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// A game entity: the only mutable simulation state the core knows about.
///
/// Velocity is in world units per second; callers convert the scheduler's
/// millisecond step before integrating.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: Size,
    pub active: bool,
}

impl Entity {
    pub fn new(id: EntityId, kind: EntityKind, pos: Vec2, size: Size) -> Self {
        Entity {
            id,
            kind,
            pos,
            vel: Vec2::ZERO,
            size,
            active: true,
        }
    }

    /// Derived bounding box: `{x, y, x+w, y+h}`
    pub fn aabb(&self) -> Aabb {
        Aabb::from_pos_size(self.pos, self.size.as_vec2())
    }

    /// Advance position by one step. `dt` is in seconds.
    pub fn integrate(&mut self, dt: f32) {
        self.pos += self.vel * dt;
    }

    /// Mark dead/expired. Inactive entities are skipped by collision
    /// evaluation and are eligible for pool release.
    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

/// Capability interface for anything the collision system can evaluate.
///
/// The bounding-box accessor is mandatory; the overlap notification has a
/// default empty body, since many entity kinds (particles) don't care who
/// they touched.
pub trait Collider {
    fn collider_id(&self) -> EntityId;
    fn aabb(&self) -> Aabb;
    fn is_active(&self) -> bool;

    /// Called once per overlapping pair, on both participants, with the
    /// other participant as seen at dispatch time.
    fn on_overlap(&mut self, _other: &Self) {}
}

impl Collider for Entity {
    fn collider_id(&self) -> EntityId {
        self.id
    }

    fn aabb(&self) -> Aabb {
        Entity::aabb(self)
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
