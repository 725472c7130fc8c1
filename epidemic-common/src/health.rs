use serde::{Deserialize, Serialize};

/// Disease progression state of an individual.
///
/// Transitions are Susceptible → Infected (through a collision with an
/// infectious individual) and Infected → Recovered or Dead (when the
/// infection ends). Recovered and Dead are terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Susceptible,
    Infected,
    Recovered,
    Dead,
}

impl Health {
    /// Only susceptible individuals can contract the infection.
    pub fn can_get_infected(self) -> bool {
        self == Health::Susceptible
    }

    pub fn is_infected(self) -> bool {
        self == Health::Infected
    }

    pub fn is_dead(self) -> bool {
        self == Health::Dead
    }

    /// Display color (RGB) used for this state by every front-end.
    pub fn color(self) -> [u8; 3] {
        match self {
            Health::Susceptible => [0, 0, 220],
            Health::Infected => [255, 0, 0],
            Health::Recovered => [0, 200, 0],
            Health::Dead => [50, 50, 50],
        }
    }
}
