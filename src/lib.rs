//! Event-driven simulator of an infectious disease spreading through a
//! population of disks bouncing elastically inside a rectangular arena.
//!
//! The engine advances a priority queue of predicted events (pair
//! collisions, wall bounces, redraws, infection endings) rather than fixed
//! timesteps. Stale predictions are left in the queue and filtered out on
//! dequeue via per-individual epoch counters, so a collision never has to
//! search the queue for entries it obsoleted.

pub mod event;
pub mod individual;
pub mod queue;
pub mod render;
pub mod rng;
pub mod simulation;

pub use event::Event;
pub use individual::Individual;
pub use queue::EventQueue;
pub use render::{ChannelRenderer, DrawProcedure, GraphicsContext, NullRenderer, Renderer};
pub use rng::SimRng;
pub use simulation::{RunSummary, Simulation, MAX_PLACEMENT_ATTEMPTS};
