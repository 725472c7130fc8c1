use serde::{Deserialize, Serialize};

use crate::health::Health;

/// History samples per simulated time unit.
pub const HISTORY_RESOLUTION: f64 = 3.0;

/// Population composition at a point in simulated time.
///
/// `susceptible` is the user-visible "non-infected" count.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub infected: u32,
    pub susceptible: u32,
    pub recovered: u32,
    pub dead: u32,
}

impl Statistics {
    pub fn total(&self) -> u32 {
        self.infected + self.susceptible + self.recovered + self.dead
    }

    pub fn alive(&self) -> u32 {
        self.total() - self.dead
    }

    pub fn percent_infected(&self) -> f32 {
        self.percent_of_total(self.infected)
    }

    pub fn percent_susceptible(&self) -> f32 {
        self.percent_of_total(self.susceptible)
    }

    fn percent_of_total(&self, count: u32) -> f32 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            100.0 * count as f32 / total as f32
        }
    }
}

/// Time series of the population composition, sampled at
/// [`HISTORY_RESOLUTION`] samples per time unit.
///
/// Two series are stored; the third (recovered) is derived as
/// `100 − infected − susceptible`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    resolution: f64,
    filled: usize,
    percent_infected: Vec<f32>,
    percent_susceptible: Vec<f32>,
}

impl History {
    /// Allocates a series covering `[0, time_limit]`.
    pub fn new(time_limit: f64) -> Self {
        let capacity = (HISTORY_RESOLUTION * time_limit).floor() as usize + 1;
        History {
            resolution: HISTORY_RESOLUTION,
            filled: 0,
            percent_infected: vec![0.0; capacity],
            percent_susceptible: vec![0.0; capacity],
        }
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Number of samples recorded so far.
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn capacity(&self) -> usize {
        self.percent_infected.len()
    }

    /// Sample slot for a simulated time, clamped to the allocated range.
    pub fn sample_index(&self, time: f64) -> usize {
        ((self.resolution * time).floor() as usize).min(self.capacity() - 1)
    }

    /// Records the composition at `time`. Slots skipped since the previous
    /// sample are forward-filled with the previous value so the series
    /// stays contiguous.
    pub fn record(&mut self, time: f64, stats: &Statistics) {
        let idx = self.sample_index(time);
        if idx >= self.filled {
            let (prev_infected, prev_susceptible) = if self.filled == 0 {
                (stats.percent_infected(), stats.percent_susceptible())
            } else {
                (
                    self.percent_infected[self.filled - 1],
                    self.percent_susceptible[self.filled - 1],
                )
            };
            for slot in self.filled..idx {
                self.percent_infected[slot] = prev_infected;
                self.percent_susceptible[slot] = prev_susceptible;
            }
            self.filled = idx + 1;
        }
        self.percent_infected[idx] = stats.percent_infected();
        self.percent_susceptible[idx] = stats.percent_susceptible();
    }

    /// Clones the series with everything recorded after `time` hidden, for
    /// handing to a draw procedure. The allocated capacity is kept so a
    /// chart's x-scale stays fixed over the run.
    pub fn up_to(&self, time: f64) -> History {
        let mut prefix = self.clone();
        prefix.filled = (self.sample_index(time) + 1).min(self.filled);
        prefix
    }

    /// Recorded percent-infected series.
    pub fn percent_infected(&self) -> &[f32] {
        &self.percent_infected[..self.filled]
    }

    /// Recorded percent-non-infected series.
    pub fn percent_susceptible(&self) -> &[f32] {
        &self.percent_susceptible[..self.filled]
    }

    /// Derived percent-recovered value for a recorded sample.
    pub fn percent_recovered_at(&self, idx: usize) -> f32 {
        100.0 - self.percent_infected[idx] - self.percent_susceptible[idx]
    }

    pub fn clear(&mut self) {
        self.filled = 0;
        self.percent_infected.fill(0.0);
        self.percent_susceptible.fill(0.0);
    }
}

/// Position and health of one individual as published to a front-end.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameParticle {
    pub x: f32,
    pub y: f32,
    pub health: Health,
}

/// A snapshot of the simulation state at a redraw.
///
/// Front-ends paint from frames, never from live simulation state; the
/// simulation thread publishes one per redraw event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// The simulated time at which the frame was captured.
    pub time: f64,
    pub stats: Statistics,
    pub particles: Vec<FrameParticle>,
}
