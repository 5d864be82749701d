// Error types for the navigation engine.
//
// Out-of-range terrain samples are NOT errors: `HeightField` returns 0.0 for
// them (see terrain.rs). Everything here is recoverable at the call site.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavError {
    /// A PathTrack was built with (or asked for a node from) zero nodes.
    #[error("path has no nodes")]
    EmptyPath,

    /// A pursuit was requested but every treasure is already tagged.
    #[error("no untagged treasure to pursue")]
    NoReachableGoal,

    #[error("invalid height grid: {reason}")]
    InvalidGrid { reason: String },
}

#[derive(Error, Debug)]
pub enum SimError {
    #[error("navigation error: {0}")]
    Nav(#[from] NavError),

    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type NavResult<T> = Result<T, NavError>;
pub type SimResult<T> = Result<T, SimError>;
