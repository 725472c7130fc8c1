//! Shared vocabulary of the epidemic simulation workspace: arena geometry,
//! health states, configuration, and the frame/history types the engine
//! records and the visualizer replays.

pub mod arena;
pub mod config;
pub mod error;
pub mod health;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use arena::{Arena, ARENA_HEIGHT, ARENA_WIDTH};
pub use config::{
    DiseaseConfig, OutputConfig, PopulationConfig, RunConfig, SimParams, SimulationConfig,
    INDIVIDUAL_MASS, INDIVIDUAL_RADIUS,
};
pub use error::SimError;
pub use health::Health;
pub use snapshot::{Frame, FrameParticle, History, Statistics, HISTORY_RESOLUTION};
pub use vecmath::Vec2;
