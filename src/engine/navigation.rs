// Per-agent navigation: a three-mode state machine on top of PathTrack.
//
//   EXPLORE ──(treasure sensed / switch_mode)──▶ PURSUE
//      ▲                                           │
//      │                               (treasure reached)
//      │                                           ▼
//      └──────(saved goal reached)────────────── RETURN
//
// EXPLORE and RETURN drive the agent along its exploration track; PURSUE
// drives it along a one-node track ending at the nearest untagged treasure.
// The goal that was active when pursuit started is saved and restored
// exactly when the agent heads back.

use bevy_ecs::prelude::*;
use glam::Vec3;
use super::components::{Transform, TreasureSnapshot, planar_distance};
use super::config::{AgentConfig, NoGoalPolicy};
use super::error::{NavError, NavResult};
use super::inspector::{InfoSink, line};
use super::path::{NavNode, NavNodeKind, PathTrack};
use super::terrain::HeightField;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavMode {
    Explore,
    Pursue,
    Return,
}

/// Autonomous (non-player) agent. Position and heading live in the
/// entity's `Transform`; this component holds the navigation state.
#[derive(Component, Debug, Clone)]
pub struct NpAgent {
    pub name: String,
    settings: AgentConfig,
    mode: NavMode,
    exploration: PathTrack,
    /// Only present while pursuing.
    pursuit: Option<PathTrack>,
    goal: NavNode,
    saved_goal: Option<NavNode>,
    /// Goals faced after arriving somewhere. Diagnostics only.
    turn_count: u64,
    /// Forward motion stopped (route finished or nothing to pursue).
    halted: bool,
}

impl NpAgent {
    /// Create an agent on the given exploration route and turn `transform`
    /// toward its first node.
    pub fn new(
        name: impl Into<String>,
        route: Vec<NavNode>,
        settings: AgentConfig,
        transform: &mut Transform,
    ) -> NavResult<Self> {
        let exploration = PathTrack::non_empty(route, settings.exploration_policy)?;
        let goal = exploration.current()?;
        transform.turn_to_face(goal.position);
        Ok(Self {
            name: name.into(),
            settings,
            mode: NavMode::Explore,
            exploration,
            pursuit: None,
            goal,
            saved_goal: None,
            turn_count: 0,
            halted: false,
        })
    }

    pub fn mode(&self) -> NavMode { self.mode }
    pub fn goal(&self) -> NavNode { self.goal }
    pub fn saved_goal(&self) -> Option<NavNode> { self.saved_goal }
    pub fn turn_count(&self) -> u64 { self.turn_count }
    pub fn is_halted(&self) -> bool { self.halted }
    pub fn exploration(&self) -> &PathTrack { &self.exploration }

    /// The track driving the agent in its current mode.
    pub fn active_path(&self) -> &PathTrack {
        match (self.mode, &self.pursuit) {
            (NavMode::Pursue, Some(track)) => track,
            _ => &self.exploration,
        }
    }

    /// Navigate, then take one step and settle onto the terrain. Use this
    /// when nothing else constrains where the agent may go.
    pub fn update(
        &mut self,
        transform: &mut Transform,
        treasures: &[TreasureSnapshot],
        terrain: &HeightField,
        info: &mut dyn InfoSink,
    ) {
        self.navigate(transform, treasures, info);
        if let Some(next) = self.proposed_step(transform) {
            transform.position = terrain.snap(next.x, next.z);
        }
    }

    /// One tick of decision making: arrival check, mode transitions and
    /// treasure sensing. Does not move the agent.
    pub fn navigate(
        &mut self,
        transform: &mut Transform,
        treasures: &[TreasureSnapshot],
        info: &mut dyn InfoSink,
    ) {
        let p = transform.position;
        let f = transform.forward;
        info.set_info(
            line::AGENT_LOCATION,
            format!(
                "{}: Location ({:.0},{:.0},{:.0})  Looking at ({:.2},{:.2},{:.2})",
                self.name, p.x, p.y, p.z, f.x, f.y, f.z
            ),
        );

        let distance = transform.planar_distance(self.goal.position);
        info.set_info(line::AGENT_GOAL, format!("distance to goal = {:5.2}", distance));

        if distance <= self.settings.snap_distance {
            self.arrive(transform, info);
        }

        if self.mode == NavMode::Explore && self.senses_treasure(p, treasures) {
            log::info!("{}: treasure detected", self.name);
            self.begin_pursuit(transform, treasures);
        }

        info.set_info(line::AGENT_MODE, format!("{}: mode {:?}", self.name, self.mode));
    }

    /// Where the agent would be after one step toward its goal, before
    /// terrain clamping. `None` while halted or already on the goal.
    pub fn proposed_step(&self, transform: &mut Transform) -> Option<Vec3> {
        if self.halted {
            return None;
        }
        let distance = transform.planar_distance(self.goal.position);
        if distance <= f32::EPSILON {
            return None;
        }
        transform.turn_to_face(self.goal.position);
        let step = self.settings.step_size.min(distance);
        Some(transform.position + transform.forward * step)
    }

    /// Force the next transition in the EXPLORE → PURSUE → RETURN cycle.
    pub fn switch_mode(&mut self, transform: &mut Transform, treasures: &[TreasureSnapshot]) {
        match self.mode {
            NavMode::Explore => self.begin_pursuit(transform, treasures),
            NavMode::Pursue => self.begin_return(transform),
            NavMode::Return => {
                log::info!("{}: switching Return --> Explore", self.name);
                self.mode = NavMode::Explore;
                self.pursuit = None;
                // Keep heading for the saved goal if we never got there.
                if let Some(saved) = self.saved_goal.take() {
                    self.goal = saved;
                }
                transform.turn_to_face(self.goal.position);
            }
        }
    }

    // ========================================================================
    // TRANSITIONS
    // ========================================================================

    /// Called when the agent is within snap distance of its goal.
    fn arrive(&mut self, transform: &mut Transform, info: &mut dyn InfoSink) {
        match self.mode {
            NavMode::Explore => self.advance_exploration(transform, info),
            NavMode::Pursue => {
                let step = self
                    .pursuit
                    .as_mut()
                    .map(|track| track.next().map(|_| track.is_done() || track.passes() > 0));
                let finished = match step {
                    Some(Ok(finished)) => finished,
                    Some(Err(e)) => {
                        self.halt(&e.to_string());
                        return;
                    }
                    None => true,
                };
                if finished {
                    self.begin_return(transform);
                }
            }
            NavMode::Return => {
                log::info!("{}: switching Return --> Explore", self.name);
                self.saved_goal = None;
                self.mode = NavMode::Explore;
                self.advance_exploration(transform, info);
            }
        }
    }

    fn advance_exploration(&mut self, transform: &mut Transform, info: &mut dyn InfoSink) {
        match self.exploration.next() {
            Ok(node) if !self.exploration.is_done() => {
                self.goal = node;
                transform.turn_to_face(node.position);
                self.turn_count += 1;
                info.set_info(line::AGENT_TURNS, format!("turnToFace count = {}", self.turn_count));
            }
            Ok(_) => {
                info.set_info(line::AGENT_DONE, "path traversal is done".to_string());
                self.halt("exploration route finished");
            }
            Err(e) => self.halt(&e.to_string()),
        }
    }

    fn begin_pursuit(&mut self, transform: &mut Transform, treasures: &[TreasureSnapshot]) {
        let target = match nearest_untagged(transform.position, treasures) {
            Ok(target) => target,
            Err(e) => {
                match self.settings.no_goal_policy {
                    NoGoalPolicy::Halt => self.halt(&e.to_string()),
                    NoGoalPolicy::KeepExploring => {
                        log::info!("{}: {}, continuing exploration", self.name, e);
                    }
                }
                return;
            }
        };

        let node = NavNode::new(target, NavNodeKind::Path);
        let track = match PathTrack::non_empty(vec![node], self.settings.pursuit_policy) {
            Ok(track) => track,
            Err(e) => {
                self.halt(&e.to_string());
                return;
            }
        };

        log::info!("{}: switching Explore --> Pursue, target {:?}", self.name, target);
        self.saved_goal = Some(self.goal);
        self.goal = node;
        self.pursuit = Some(track);
        self.mode = NavMode::Pursue;
        self.halted = false;
        transform.turn_to_face(node.position);
        self.turn_count += 1;
    }

    fn begin_return(&mut self, transform: &mut Transform) {
        log::info!("{}: switching Pursue --> Return", self.name);
        self.pursuit = None;
        self.mode = NavMode::Return;
        self.goal = match self.saved_goal {
            Some(saved) => saved,
            None => match self.exploration.current() {
                Ok(node) => node,
                Err(e) => {
                    self.halt(&e.to_string());
                    return;
                }
            },
        };
        transform.turn_to_face(self.goal.position);
        self.turn_count += 1;
    }

    fn halt(&mut self, reason: &str) {
        if !self.halted {
            log::warn!("{}: halting ({})", self.name, reason);
        }
        self.halted = true;
    }

    fn senses_treasure(&self, position: Vec3, treasures: &[TreasureSnapshot]) -> bool {
        treasures
            .iter()
            .filter(|t| !t.tagged)
            .any(|t| planar_distance(t.position, position) < self.settings.sensing_radius)
    }
}

/// Position of the closest untagged treasure, measured on the XZ plane.
/// Ties go to whichever comes first in `treasures`.
pub fn nearest_untagged(from: Vec3, treasures: &[TreasureSnapshot]) -> NavResult<Vec3> {
    let mut best: Option<(f32, Vec3)> = None;
    for t in treasures.iter().filter(|t| !t.tagged) {
        let d = planar_distance(t.position, from);
        if best.map_or(true, |(bd, _)| d < bd) {
            best = Some((d, t.position));
        }
    }
    best.map(|(_, p)| p).ok_or(NavError::NoReachableGoal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::inspector::{InfoPane, NullSink};
    use crate::engine::path::TraversalPolicy;

    fn flat() -> HeightField {
        HeightField::from_fn(64, 100.0, |_, _| 0.0).unwrap()
    }

    fn route() -> Vec<NavNode> {
        [(1000.0, 1000.0), (3000.0, 1000.0), (3000.0, 3000.0)]
            .iter()
            .map(|&(x, z)| NavNode::new(Vec3::new(x, 0.0, z), NavNodeKind::Waypoint))
            .collect()
    }

    fn agent_at(pos: Vec3, settings: AgentConfig) -> (NpAgent, Transform) {
        let mut t = Transform::from_position(pos);
        let agent = NpAgent::new("np", route(), settings, &mut t).unwrap();
        (agent, t)
    }

    fn treasure(x: f32, z: f32) -> TreasureSnapshot {
        TreasureSnapshot { position: Vec3::new(x, 0.0, z), tagged: false }
    }

    #[test]
    fn starts_exploring_toward_first_node() {
        let (agent, t) = agent_at(Vec3::new(500.0, 0.0, 1000.0), AgentConfig::default());
        assert_eq!(agent.mode(), NavMode::Explore);
        assert_eq!(agent.goal(), route()[0]);
        assert_eq!(t.forward, Vec3::X);
    }

    #[test]
    fn empty_route_is_rejected() {
        let mut t = Transform::default();
        let err = NpAgent::new("np", Vec::new(), AgentConfig::default(), &mut t).unwrap_err();
        assert_eq!(err, NavError::EmptyPath);
    }

    #[test]
    fn advances_when_within_snap_distance() {
        let (mut agent, mut t) = agent_at(Vec3::new(1015.0, 0.0, 1000.0), AgentConfig::default());
        let terrain = flat();
        agent.update(&mut t, &[], &terrain, &mut NullSink);
        assert_eq!(agent.goal(), route()[1]);
        assert_eq!(agent.turn_count(), 1);
        assert_eq!(t.forward, Vec3::X);
        // Stepped toward the new goal.
        assert!((t.position.x - 1025.0).abs() < 1e-3);
    }

    #[test]
    fn walks_toward_goal_without_overshooting() {
        let (mut agent, mut t) = agent_at(Vec3::new(995.0, 50.0, 1000.0), AgentConfig {
            snap_distance: 1.0,
            ..AgentConfig::default()
        });
        let terrain = flat();
        agent.update(&mut t, &[], &terrain, &mut NullSink);
        assert_eq!(t.position, Vec3::new(1000.0, 0.0, 1000.0));
    }

    #[test]
    fn sensing_one_treasure_starts_pursuit() {
        let (mut agent, mut t) = agent_at(Vec3::new(500.0, 0.0, 1000.0), AgentConfig::default());
        let treasures = [treasure(900.0, 1500.0)];
        let before = agent.goal();

        agent.navigate(&mut t, &treasures, &mut NullSink);

        assert_eq!(agent.mode(), NavMode::Pursue);
        assert_eq!(agent.goal().position, treasures[0].position);
        assert_eq!(agent.saved_goal(), Some(before));
        assert_eq!(agent.active_path().len(), 1);
    }

    #[test]
    fn tagged_or_distant_treasures_are_ignored() {
        let (mut agent, mut t) = agent_at(Vec3::new(500.0, 0.0, 1000.0), AgentConfig::default());
        let treasures = [
            TreasureSnapshot { position: Vec3::new(600.0, 0.0, 1000.0), tagged: true },
            treasure(5000.0, 5000.0),
        ];
        agent.navigate(&mut t, &treasures, &mut NullSink);
        assert_eq!(agent.mode(), NavMode::Explore);
    }

    #[test]
    fn nearest_picks_first_on_ties() {
        let from = Vec3::ZERO;
        let treasures = [treasure(100.0, 0.0), treasure(0.0, 100.0), treasure(50.0, 0.0)];
        assert_eq!(nearest_untagged(from, &treasures).unwrap(), Vec3::new(50.0, 0.0, 0.0));

        let tie = [treasure(100.0, 0.0), treasure(-100.0, 0.0)];
        assert_eq!(nearest_untagged(from, &tie).unwrap(), Vec3::new(100.0, 0.0, 0.0));

        assert_eq!(nearest_untagged(from, &[]), Err(NavError::NoReachableGoal));
    }

    #[test]
    fn full_cycle_restores_saved_goal_exactly() {
        let (mut agent, mut t) = agent_at(Vec3::new(500.0, 0.0, 1000.0), AgentConfig::default());
        let mut treasures = [treasure(900.0, 1500.0)];
        let saved = agent.goal();

        agent.navigate(&mut t, &treasures, &mut NullSink);
        assert_eq!(agent.mode(), NavMode::Pursue);

        // Reach the treasure.
        t.position = treasures[0].position;
        agent.navigate(&mut t, &treasures, &mut NullSink);
        assert_eq!(agent.mode(), NavMode::Return);
        assert_eq!(agent.goal(), saved);
        assert_eq!(agent.goal().position.to_array(), saved.position.to_array());

        // Back at the saved goal: exploration resumes with the next node.
        treasures[0].tagged = true;
        t.position = saved.position;
        agent.navigate(&mut t, &treasures, &mut NullSink);
        assert_eq!(agent.mode(), NavMode::Explore);
        assert_eq!(agent.saved_goal(), None);
        assert_eq!(agent.goal(), route()[1]);
    }

    #[test]
    fn loop_pursuit_returns_after_one_pass() {
        let settings = AgentConfig { pursuit_policy: TraversalPolicy::Loop, ..AgentConfig::default() };
        let (mut agent, mut t) = agent_at(Vec3::new(500.0, 0.0, 1000.0), settings);
        let treasures = [treasure(900.0, 1500.0)];

        agent.navigate(&mut t, &treasures, &mut NullSink);
        t.position = treasures[0].position;
        agent.navigate(&mut t, &treasures, &mut NullSink);
        assert_eq!(agent.mode(), NavMode::Return);
    }

    #[test]
    fn broken_pursuit_track_halts_instead_of_returning() {
        let (mut agent, mut t) = agent_at(Vec3::new(500.0, 0.0, 1000.0), AgentConfig::default());
        agent.switch_mode(&mut t, &[treasure(900.0, 1500.0)]);
        agent.pursuit = Some(PathTrack::new(Vec::new(), TraversalPolicy::OneShot));
        t.position = agent.goal().position;

        agent.navigate(&mut t, &[], &mut NullSink);
        assert!(agent.is_halted());
        assert_eq!(agent.mode(), NavMode::Pursue);
    }

    #[test]
    fn no_goal_halt_policy_stops_the_agent() {
        let (mut agent, mut t) = agent_at(Vec3::new(500.0, 0.0, 1000.0), AgentConfig {
            no_goal_policy: NoGoalPolicy::Halt,
            ..AgentConfig::default()
        });
        agent.switch_mode(&mut t, &[]);
        assert_eq!(agent.mode(), NavMode::Explore);
        assert!(agent.is_halted());

        let before = t.position;
        agent.update(&mut t, &[], &flat(), &mut NullSink);
        assert_eq!(t.position, before);

        // A treasure showing up later gets the agent moving again.
        agent.switch_mode(&mut t, &[treasure(5000.0, 5000.0)]);
        assert_eq!(agent.mode(), NavMode::Pursue);
        assert!(!agent.is_halted());
    }

    #[test]
    fn no_goal_keep_exploring_policy_keeps_moving() {
        let (mut agent, mut t) = agent_at(Vec3::new(500.0, 0.0, 1000.0), AgentConfig {
            no_goal_policy: NoGoalPolicy::KeepExploring,
            ..AgentConfig::default()
        });
        agent.switch_mode(&mut t, &[TreasureSnapshot { position: Vec3::ZERO, tagged: true }]);
        assert_eq!(agent.mode(), NavMode::Explore);
        assert!(!agent.is_halted());

        agent.update(&mut t, &[], &flat(), &mut NullSink);
        assert!((t.position.x - 510.0).abs() < 1e-3);
    }

    #[test]
    fn one_shot_exploration_halts_at_the_end() {
        let settings = AgentConfig {
            exploration_policy: TraversalPolicy::OneShot,
            ..AgentConfig::default()
        };
        let mut t = Transform::from_position(Vec3::new(1000.0, 0.0, 1000.0));
        let single = vec![route()[0]];
        let mut agent = NpAgent::new("np", single, settings, &mut t).unwrap();
        let mut pane = InfoPane::new();

        agent.navigate(&mut t, &[], &mut pane);
        assert!(agent.is_halted());
        assert_eq!(pane.line(line::AGENT_DONE), Some("path traversal is done"));
        assert!(agent.proposed_step(&mut t).is_none());
    }

    #[test]
    fn forced_switches_cycle_modes() {
        let (mut agent, mut t) = agent_at(Vec3::new(500.0, 0.0, 1000.0), AgentConfig::default());
        let treasures = [treasure(9000.0, 9000.0)];
        let first = agent.goal();

        agent.switch_mode(&mut t, &treasures);
        assert_eq!(agent.mode(), NavMode::Pursue);
        agent.switch_mode(&mut t, &treasures);
        assert_eq!(agent.mode(), NavMode::Return);
        assert_eq!(agent.goal(), first);
        agent.switch_mode(&mut t, &treasures);
        assert_eq!(agent.mode(), NavMode::Explore);
        assert_eq!(agent.goal(), first, "saved goal not yet reached, keep it");
        assert_eq!(agent.saved_goal(), None);
    }

    #[test]
    fn diagnostics_do_not_change_behaviour() {
        let (mut a, mut ta) = agent_at(Vec3::new(500.0, 0.0, 1000.0), AgentConfig::default());
        let (mut b, mut tb) = (a.clone(), ta);
        let terrain = flat();
        let mut pane = InfoPane::new();
        for _ in 0..200 {
            a.update(&mut ta, &[], &terrain, &mut pane);
            b.update(&mut tb, &[], &terrain, &mut NullSink);
        }
        assert_eq!(ta, tb);
        assert_eq!(a.goal(), b.goal());
        assert!(pane.line(line::AGENT_GOAL).is_some());
    }
}
