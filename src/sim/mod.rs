//! Deterministic simulation core
//!
//! Everything in this module must stay pure and deterministic:
//! - Fixed timestep only; all timestamps are supplied by the host
//! - Stable iteration order (registration order, slot id order)
//! - No rendering or platform dependencies
//!
//! The three subsystems are independent: the [`Scheduler`] drives the tick
//! cadence, the [`CollisionWorld`] evaluates AABB overlaps among registered
//! entities, and [`ObjectPool`] recycles short-lived instances. Game logic
//! sits on top and wires them together (see the demo binary).

pub mod collision;
pub mod entity;
pub mod pool;
pub mod scheduler;

pub use collision::{
    CollisionWorld, aabb_overlap, aabb_overlap_at, circle_aabb_overlap, circles_overlap,
    point_in_aabb,
};
pub use entity::{Aabb, Collider, Entity, EntityId, EntityKind, IdAllocator, Size};
pub use pool::{ObjectPool, PoolStats, SlotId};
pub use scheduler::{FrameReport, LoopState, Scheduler, Simulation};

use thiserror::Error;

/// Error type for caller-supplied `update`/`render` callbacks.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the simulation core.
///
/// Configuration and state errors are local and recoverable by the caller.
/// Callback errors are fatal to the current run loop instance: the scheduler
/// stops itself before re-raising them, and never silently continues with a
/// partially applied tick.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid construction or setter argument. Never retried.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Operation not valid in the current loop state.
    #[error("{op} is not valid while the loop is {state:?}")]
    State { op: &'static str, state: LoopState },
    /// An error escaped a caller-supplied callback; the loop has stopped.
    #[error("{phase} callback failed: {source}")]
    Callback {
        phase: &'static str,
        #[source]
        source: CallbackError,
    },
}
