//! AABB collision detection
//!
//! Naive O(n^2) pairwise broad phase over the registered entities. That is a
//! known scaling limit, acceptable for arcade entity counts (tens, not
//! thousands); there is deliberately no spatial partitioning here.
//!
//! All overlap tests use half-open interval semantics (strict inequalities):
//! boxes that only share an edge, circles that only touch, do NOT collide.

use glam::Vec2;

use super::entity::{Aabb, Collider, EntityId};

/// Discrete AABB overlap test.
///
/// Two boxes overlap iff each starts before the other ends on both axes.
/// Edge-touching boxes (zero overlap area) do not collide.
pub fn aabb_overlap(a: Aabb, b: Aabb) -> bool {
    a.left < b.right && a.right > b.left && a.top < b.bottom && a.bottom > b.top
}

/// Point containment with the same half-open semantics: the left/top edges
/// are inside, the right/bottom edges are not.
pub fn point_in_aabb(p: Vec2, b: Aabb) -> bool {
    p.x >= b.left && p.x < b.right && p.y >= b.top && p.y < b.bottom
}

/// Circle-circle overlap: strict `distance < r1 + r2`, so tangent circles do
/// not collide.
pub fn circles_overlap(c1: Vec2, r1: f32, c2: Vec2, r2: f32) -> bool {
    let r = r1 + r2;
    c1.distance_squared(c2) < r * r
}

/// Circle-box overlap via closest-point projection: clamp the circle center
/// onto the box, then compare against the radius (strict).
pub fn circle_aabb_overlap(center: Vec2, radius: f32, b: Aabb) -> bool {
    let closest = Vec2::new(
        center.x.clamp(b.left, b.right),
        center.y.clamp(b.top, b.bottom),
    );
    center.distance_squared(closest) < radius * radius
}

/// Predictive overlap: project both boxes linearly by `vel * t` and apply
/// the discrete test at that single future instant.
///
/// This is an endpoint check, not a continuous sweep. A fast mover can pass
/// clean through a thin target between the two instants and never report an
/// overlap.
pub fn aabb_overlap_at(a: Aabb, va: Vec2, b: Aabb, vb: Vec2, t: f32) -> bool {
    aabb_overlap(a.projected(va, t), b.projected(vb, t))
}

/// Membership registry plus pairwise overlap evaluation.
///
/// The world holds entity ids only; the entities themselves stay owned by
/// the game logic and are passed in per evaluation. Registration order is
/// the iteration order, which keeps pair enumeration deterministic.
#[derive(Debug, Default)]
pub struct CollisionWorld {
    registered: Vec<EntityId>,
}

impl CollisionWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity to the membership set. Registering an id that is
    /// already present is a no-op (documented choice; the alternative of
    /// erroring punishes idempotent spawn code for no gain).
    pub fn register(&mut self, id: EntityId) {
        if !self.registered.contains(&id) {
            self.registered.push(id);
        }
    }

    /// Remove an entity from the membership set. Returns false if it was
    /// not registered.
    pub fn unregister(&mut self, id: EntityId) -> bool {
        match self.registered.iter().position(|&r| r == id) {
            Some(idx) => {
                self.registered.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.registered.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    pub fn clear(&mut self) {
        self.registered.clear();
    }

    /// Indices of registered, active items in registration order.
    ///
    /// Registered ids with no backing item are skipped: unregistering on
    /// despawn is the caller's job, but a stale id must not break the pass.
    fn active_indices<T: Collider>(&self, items: &[T]) -> Vec<usize> {
        self.registered
            .iter()
            .filter_map(|&id| {
                items
                    .iter()
                    .position(|e| e.collider_id() == id && e.is_active())
            })
            .collect()
    }

    /// Compute all overlapping unordered pairs among registered, active
    /// items. Each pair is reported exactly once, as `(id_a, id_b)` in
    /// registration order.
    pub fn evaluate<T: Collider>(&self, items: &[T]) -> Vec<(EntityId, EntityId)> {
        let idx = self.active_indices(items);
        let mut pairs = Vec::new();
        for (n, &i) in idx.iter().enumerate() {
            for &j in &idx[n + 1..] {
                if aabb_overlap(items[i].aabb(), items[j].aabb()) {
                    pairs.push((items[i].collider_id(), items[j].collider_id()));
                }
            }
        }
        pairs
    }

    /// Evaluate, then notify each overlapping pair symmetrically: both
    /// participants get [`Collider::on_overlap`] with the other, then `hook`
    /// runs with the pair's ids.
    ///
    /// All pairs are enumerated before any notification is dispatched, so a
    /// handler that mutates an entity (or unregisters it) cannot corrupt the
    /// current pass.
    pub fn evaluate_and_notify<T: Collider>(
        &self,
        items: &mut [T],
        mut hook: impl FnMut(EntityId, EntityId),
    ) {
        let idx = self.active_indices(items);
        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for (n, &i) in idx.iter().enumerate() {
            for &j in &idx[n + 1..] {
                if aabb_overlap(items[i].aabb(), items[j].aabb()) {
                    pairs.push((i.min(j), i.max(j)));
                }
            }
        }

        for (lo, hi) in pairs {
            let (head, tail) = items.split_at_mut(hi);
            let a = &mut head[lo];
            let b = &mut tail[0];
            a.on_overlap(&*b);
            b.on_overlap(&*a);
            hook(a.collider_id(), b.collider_id());
        }
    }
}
