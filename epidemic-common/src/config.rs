use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::arena::Arena;
use crate::error::SimError;

/// Disk radius shared by every individual, in world units.
pub const INDIVIDUAL_RADIUS: f64 = 8.0;
/// Mass shared by every individual.
pub const INDIVIDUAL_MASS: f64 = 1.0;

/// Run-level settings: seeding and the simulated-time window.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RunConfig {
    /// PRNG seed. Identical configurations produce identical runs.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Event horizon: events scheduled past this simulated time are dropped,
    /// which is what ends the run.
    #[serde(default = "default_time_limit")]
    pub time_limit: f64,
    /// Redraw events per simulated time unit. 0 disables redraws entirely.
    #[serde(default = "default_redraw_hz")]
    pub redraw_hz: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PopulationConfig {
    /// Number of individuals placed at startup.
    #[serde(default = "default_population")]
    pub size: u32,
    /// Standard deviation of the per-axis Normal(0, sigma) initial velocity.
    #[serde(default = "default_velocity_sigma")]
    pub velocity_sigma: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DiseaseConfig {
    /// Transmission probability per infectious contact.
    #[serde(default = "default_prob_infection")]
    pub prob_infection: f64,
    /// Probability that an infection ends in death rather than recovery.
    #[serde(default = "default_prob_dying")]
    pub prob_dying: f64,
    /// Mean of the Normal(mean, 1) infectious duration.
    #[serde(default = "default_time_infectious")]
    pub time_infectious: f64,
}

/// Configuration for output settings.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_base_filename")]
    pub base_filename: String,
    /// Output format for history/frame files: "json", "bincode", "messagepack".
    pub format: Option<String>,
    #[serde(default = "default_true")]
    pub save_history: bool,
    #[serde(default)]
    pub save_frames: bool,
    /// Write frames incrementally instead of holding them all in memory.
    #[serde(default)]
    pub streaming_frames: bool,
    /// Write the final per-individual state as CSV.
    #[serde(default)]
    pub save_state: bool,
    /// Pace redraws against the wall clock (interactive front-ends).
    #[serde(default)]
    pub realtime: bool,
}

fn default_seed() -> u64 {
    1
}
fn default_time_limit() -> f64 {
    1000.0
}
fn default_redraw_hz() -> u32 {
    48
}
fn default_population() -> u32 {
    500
}
fn default_velocity_sigma() -> f64 {
    15.0
}
fn default_prob_infection() -> f64 {
    1.0 / 3.0
}
fn default_prob_dying() -> f64 {
    0.15
}
fn default_time_infectious() -> f64 {
    12.0
}
fn default_base_filename() -> String {
    "epidemic_run".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            seed: default_seed(),
            time_limit: default_time_limit(),
            redraw_hz: default_redraw_hz(),
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        PopulationConfig {
            size: default_population(),
            velocity_sigma: default_velocity_sigma(),
        }
    }
}

impl Default for DiseaseConfig {
    fn default() -> Self {
        DiseaseConfig {
            prob_infection: default_prob_infection(),
            prob_dying: default_prob_dying(),
            time_infectious: default_time_infectious(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: default_base_filename(),
            format: None,
            save_history: true,
            save_frames: false,
            streaming_frames: false,
            save_state: false,
            realtime: false,
        }
    }
}

/// Main simulation configuration structure, loaded from a TOML file.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SimulationConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub disease: DiseaseConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file and validates it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let config_str = std::fs::read_to_string(path.as_ref())?;
        let config: SimulationConfig = toml::from_str(&config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects any parameter outside its accepted range.
    pub fn validate(&self) -> Result<(), SimError> {
        if !self.run.time_limit.is_finite() || self.run.time_limit <= 0.0 {
            return Err(SimError::Config(format!(
                "time_limit must be positive and finite, got {}",
                self.run.time_limit
            )));
        }
        if self.run.redraw_hz > 60 {
            return Err(SimError::Config(format!(
                "redraw_hz must be in [0, 60], got {}",
                self.run.redraw_hz
            )));
        }
        if self.population.size > 1500 {
            return Err(SimError::Config(format!(
                "population size must be in [0, 1500], got {}",
                self.population.size
            )));
        }
        if !(0.0..=100.0).contains(&self.population.velocity_sigma) {
            return Err(SimError::Config(format!(
                "velocity_sigma must be in [0, 100], got {}",
                self.population.velocity_sigma
            )));
        }
        if !(0.0..=1.0).contains(&self.disease.prob_infection) {
            return Err(SimError::Config(format!(
                "prob_infection must be in [0, 1], got {}",
                self.disease.prob_infection
            )));
        }
        if !(0.0..=1.0).contains(&self.disease.prob_dying) {
            return Err(SimError::Config(format!(
                "prob_dying must be in [0, 1], got {}",
                self.disease.prob_dying
            )));
        }
        if !(0.0..=100.0).contains(&self.disease.time_infectious) {
            return Err(SimError::Config(format!(
                "time_infectious must be in [0, 100], got {}",
                self.disease.time_infectious
            )));
        }
        Ok(())
    }

    /// Converts the configuration into the frozen parameter bundle used at
    /// runtime.
    pub fn params(&self) -> SimParams {
        let period = if self.run.redraw_hz == 0 {
            f64::INFINITY
        } else {
            1.0 / f64::from(self.run.redraw_hz)
        };
        SimParams {
            arena: Arena::default(),
            radius: INDIVIDUAL_RADIUS,
            mass: INDIVIDUAL_MASS,
            population: self.population.size as usize,
            velocity_sigma: self.population.velocity_sigma,
            seed: self.run.seed,
            time_limit: self.run.time_limit,
            period,
            prob_infection: self.disease.prob_infection,
            prob_dying: self.disease.prob_dying,
            time_infectious: self.disease.time_infectious,
        }
    }
}

/// Simulation parameters derived from the configuration, used frequently
/// during event dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct SimParams {
    pub arena: Arena,
    pub radius: f64,
    pub mass: f64,
    pub population: usize,
    pub velocity_sigma: f64,
    pub seed: u64,
    /// Event horizon of the queue.
    pub time_limit: f64,
    /// Simulated time between redraws; infinite when redraws are disabled.
    pub period: f64,
    pub prob_infection: f64,
    pub prob_dying: f64,
    pub time_infectious: f64,
}
