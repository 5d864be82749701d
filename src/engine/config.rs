// Simulation tuning, loadable from TOML. Defaults describe the demo
// terrain world: 512x512 grid, 150 units between vertices.

use serde::{Deserialize, Serialize};
use std::path::Path;
use super::error::SimResult;
use super::path::TraversalPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub terrain: TerrainConfig,
    pub agent: AgentConfig,
    pub flock: FlockConfig,
    pub stage: StageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Vertices per side.
    pub grid_size: usize,
    /// World units between neighbouring vertices.
    pub spacing: f32,
    /// Scale applied to 0..255 heightmap bytes.
    pub height_multiplier: f32,
}

/// What an agent does when asked to pursue but nothing is left to tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoGoalPolicy {
    /// Stay exploring but stop moving until the next mode switch.
    Halt,
    /// Stay exploring and keep walking the exploration route.
    KeepExploring,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Planar distance at which a goal node counts as reached.
    pub snap_distance: f32,
    /// Planar distance at which an untagged treasure is noticed.
    pub sensing_radius: f32,
    /// World units moved per tick.
    pub step_size: f32,
    pub exploration_policy: TraversalPolicy,
    pub pursuit_policy: TraversalPolicy,
    pub no_goal_policy: NoGoalPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockConfig {
    /// Per-tick chance that a wandering follower changes heading.
    pub turn_probability: f64,
    /// Heading change in radians for one wander turn.
    pub turn_angle: f32,
    /// World units a wandering follower moves per tick.
    pub wander_step: f32,
    pub cohesion_gain: f32,
    /// Distance at which cohesion reaches half of its gain.
    pub cohesion_falloff: f32,
    pub separation_gain: f32,
    pub separation_radius: f32,
    /// Smallest distance used in separation; closer pairs get the maximum push.
    pub min_separation: f32,
    /// 0 keeps the follower's heading, 1 snaps it to the group heading.
    pub alignment_gain: f32,
    /// Copy the leader's heading instead of blending.
    pub copy_leader_heading: bool,
    /// Fixed seed for the pack's RNG; `None` seeds from the OS.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Planar distance at which an agent tags a treasure.
    pub tag_radius: f32,
    pub player_step_size: f32,
}

impl SimConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> SimResult<Self> {
        Ok(toml::from_str(content)?)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            terrain: TerrainConfig::default(),
            agent: AgentConfig::default(),
            flock: FlockConfig::default(),
            stage: StageConfig::default(),
        }
    }
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self { grid_size: 512, spacing: 150.0, height_multiplier: 20.0 }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            snap_distance: 20.0,
            sensing_radius: 1000.0,
            step_size: 10.0,
            exploration_policy: TraversalPolicy::Reverse,
            pursuit_policy: TraversalPolicy::OneShot,
            no_goal_policy: NoGoalPolicy::Halt,
        }
    }
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            // about four turns a second at 60 ticks per second
            turn_probability: 0.07,
            turn_angle: 0.3,
            wander_step: 4.0,
            cohesion_gain: 10.0,
            cohesion_falloff: 300.0,
            separation_gain: 2.0,
            separation_radius: 600.0,
            min_separation: 30.0,
            alignment_gain: 0.5,
            copy_leader_heading: false,
            seed: None,
        }
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self { tag_radius: 750.0, player_step_size: 8.0 }
    }
}
