// Engine module - terrain navigation and pack flocking
// Terrain and paths are plain data; agents, treasures and packs live in a
// bevy_ecs World owned by the Stage.

pub mod components;
pub mod config;
pub mod error;
pub mod flock;
pub mod inspector;
pub mod navigation;
pub mod path;
pub mod stage;
pub mod systems;
pub mod terrain;

// Re-export commonly used items
pub use components::*;
pub use config::{AgentConfig, FlockConfig, NoGoalPolicy, SimConfig};
pub use error::{NavError, NavResult, SimError, SimResult};
pub use flock::{FlockGroup, FlockLevel, FlockTickReport};
pub use navigation::{NavMode, NpAgent};
pub use path::{NavNode, NavNodeKind, PathTrack, TraversalPolicy};
pub use stage::{Stage, TickSummary};
pub use terrain::HeightField;
