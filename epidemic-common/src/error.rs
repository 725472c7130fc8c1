//! Error types shared by the engine and its front-ends.

use std::fmt;

/// Errors surfaced by simulation setup and execution.
#[derive(Debug)]
pub enum SimError {
    /// A configuration parameter is outside its accepted range.
    Config(String),
    /// The population could not be placed without overlap within the
    /// per-slot attempt cap.
    Placement {
        placed: usize,
        requested: usize,
        attempts: usize,
    },
    /// A renderer callback failed. Treated as non-fatal by the dispatch
    /// loop; a missed frame is preferable to aborting a long run.
    Render(String),
    /// Failed to read a configuration file from disk.
    Io(std::io::Error),
    /// Failed to parse a configuration file.
    Parse(toml::de::Error),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Config(msg) => write!(f, "Invalid configuration: {}", msg),
            SimError::Placement { placed, requested, attempts } => write!(
                f,
                "Could not place individual {} of {} without overlap after {} attempts; \
                 the population does not fit the arena",
                placed + 1,
                requested,
                attempts
            ),
            SimError::Render(msg) => write!(f, "Renderer failed: {}", msg),
            SimError::Io(e) => write!(f, "Failed to read configuration: {}", e),
            SimError::Parse(e) => write!(f, "Failed to parse configuration: {}", e),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::Io(e) => Some(e),
            SimError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SimError {
    fn from(e: std::io::Error) -> Self {
        SimError::Io(e)
    }
}

impl From<toml::de::Error> for SimError {
    fn from(e: toml::de::Error) -> Self {
        SimError::Parse(e)
    }
}
