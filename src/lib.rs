//! Nebula Strike - simulation core for a 2D arcade shooter
//!
//! Core modules:
//! - `sim`: deterministic simulation core (entities, AABB collision, object
//!   pooling, fixed-timestep scheduler)
//! - `tuning`: data-driven simulation tuning
//!
//! Rendering, audio and input live outside this crate. They talk to the core
//! through the [`sim::Simulation`] callbacks: input intents are resolved
//! before each `update`, and the renderer reads a snapshot of active entities
//! in `render`. The headless demo binary stands in for all three.

pub mod sim;
pub mod tuning;

pub use sim::{
    Aabb, CollisionWorld, Entity, EntityId, EntityKind, FrameReport, IdAllocator, LoopState,
    ObjectPool, Scheduler, SimError, Simulation, Size, SlotId,
};
pub use tuning::Tuning;

/// Core configuration constants
pub mod consts {
    /// Default logic tick rate (Hz)
    pub const DEFAULT_TICK_HZ: f64 = 60.0;
    /// Default panic threshold; frames stalled longer than this are clamped
    /// to a single step instead of triggering a catch-up burst
    pub const DEFAULT_PANIC_THRESHOLD_MS: f64 = 300.0;
    /// Milliseconds per second, for step/velocity unit conversion
    pub const MS_PER_SEC: f64 = 1000.0;
}
