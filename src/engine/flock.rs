// Pack flocking: followers that either wander on their own or steer around
// a leader with cohesion / separation / alignment.
//
// The flock level decides what fraction of followers flock. Membership is
// rolled once per level change and kept until the next one, so a pack at
// 66% shows roughly two thirds structured motion and one third wandering.
//
// Forces are computed from a snapshot of all followers taken at the start
// of the tick, so the result does not depend on iteration order.

use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use super::components::{Transform, flatten};
use super::config::FlockConfig;
use super::terrain::HeightField;

const EPSILON: f32 = 1e-5;

// ============================================================================
// FLOCK LEVEL
// ============================================================================

/// Percentage of followers that take part in flocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlockLevel {
    #[default]
    Low,
    LowMid,
    HighMid,
    High,
}

impl FlockLevel {
    pub fn percent(self) -> u32 {
        match self {
            FlockLevel::Low => 0,
            FlockLevel::LowMid => 33,
            FlockLevel::HighMid => 66,
            FlockLevel::High => 99,
        }
    }

    /// 0 → 33 → 66 → 99 → 0
    pub fn next(self) -> Self {
        match self {
            FlockLevel::Low => FlockLevel::LowMid,
            FlockLevel::LowMid => FlockLevel::HighMid,
            FlockLevel::HighMid => FlockLevel::High,
            FlockLevel::High => FlockLevel::Low,
        }
    }

    fn probability(self) -> f64 {
        self.percent() as f64 / 100.0
    }
}

// ============================================================================
// FLOCK GROUP
// ============================================================================

/// What happened during one `FlockGroup::update`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlockTickReport {
    /// Wandering followers that changed heading this tick.
    pub turns: usize,
    /// Followers moved by flocking forces this tick.
    pub members_flocked: usize,
}

/// A leader plus the followers that move around it.
///
/// The leader is only referenced, never owned: the group stores its
/// `Entity` and the caller passes the leader's transform each tick (or
/// `None` once it is gone, in which case everybody wanders).
#[derive(Component, Debug)]
pub struct FlockGroup {
    pub label: String,
    leader: Option<Entity>,
    followers: Vec<Transform>,
    /// members[i] is true when followers[i] flocks at the current level.
    members: Vec<bool>,
    level: FlockLevel,
    settings: FlockConfig,
    rng: StdRng,
}

impl FlockGroup {
    /// Group whose RNG is seeded from `settings.seed`, or from the OS if unset.
    pub fn new(label: impl Into<String>, leader: Option<Entity>, settings: FlockConfig) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(label, leader, settings, rng)
    }

    pub fn with_rng(
        label: impl Into<String>,
        leader: Option<Entity>,
        settings: FlockConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            label: label.into(),
            leader,
            followers: Vec::new(),
            members: Vec::new(),
            level: FlockLevel::Low,
            settings,
            rng,
        }
    }

    /// Add a follower and return its index, which stays valid for the
    /// lifetime of the group. It joins the flock with the current level's
    /// probability.
    pub fn add_follower(&mut self, transform: Transform) -> usize {
        let member = self.roll_membership();
        self.followers.push(transform);
        self.members.push(member);
        self.followers.len() - 1
    }

    pub fn leader(&self) -> Option<Entity> { self.leader }
    pub fn set_leader(&mut self, leader: Option<Entity>) { self.leader = leader; }
    pub fn followers(&self) -> &[Transform] { &self.followers }
    pub fn follower(&self, index: usize) -> Option<&Transform> { self.followers.get(index) }
    pub fn follower_mut(&mut self, index: usize) -> Option<&mut Transform> { self.followers.get_mut(index) }
    pub fn members(&self) -> &[bool] { &self.members }
    pub fn level(&self) -> FlockLevel { self.level }
    pub fn level_value(&self) -> u32 { self.level.percent() }

    pub fn is_member(&self, index: usize) -> bool {
        self.members.get(index).copied().unwrap_or(false)
    }

    /// Override one follower's membership until the next level change.
    /// Returns false for an unknown index.
    pub fn set_member(&mut self, index: usize, member: bool) -> bool {
        match self.members.get_mut(index) {
            Some(slot) => {
                *slot = member;
                true
            }
            None => false,
        }
    }

    /// Cycle to the next flock level and re-roll membership.
    pub fn change_flock_level(&mut self) -> FlockLevel {
        self.set_level(self.level.next());
        log::info!("{}: flocking level {}%", self.label, self.level.percent());
        self.level
    }

    pub fn set_level(&mut self, level: FlockLevel) {
        self.level = level;
        for i in 0..self.members.len() {
            self.members[i] = self.roll_membership();
        }
    }

    fn roll_membership(&mut self) -> bool {
        match self.level {
            FlockLevel::Low => false,
            level => self.rng.gen_bool(level.probability()),
        }
    }

    /// Move every follower one tick and settle it onto the terrain.
    pub fn update(&mut self, leader: Option<&Transform>, terrain: &HeightField) -> FlockTickReport {
        let mut report = FlockTickReport::default();
        let snapshot = self.followers.clone();
        let leader = leader.filter(|_| self.level != FlockLevel::Low);

        for i in 0..self.followers.len() {
            match leader {
                Some(lead) if self.members[i] => {
                    self.followers[i] = flock_step(i, &snapshot, lead, &self.settings);
                    report.members_flocked += 1;
                }
                _ => {
                    if self.wander(i) {
                        report.turns += 1;
                    }
                }
            }
            let p = self.followers[i].position;
            self.followers[i].position = terrain.snap(p.x, p.z);
        }
        report
    }

    /// Random walk: occasionally turn left or right, then step forward.
    /// Returns true if the follower turned.
    fn wander(&mut self, index: usize) -> bool {
        let chance = self.settings.turn_probability.clamp(0.0, 1.0);
        let turned = self.rng.gen_bool(chance);
        let follower = &mut self.followers[index];
        if turned {
            let angle = if self.rng.gen_bool(0.5) {
                self.settings.turn_angle
            } else {
                -self.settings.turn_angle
            };
            follower.yaw(angle);
        }
        follower.position += follower.forward * self.settings.wander_step;
        turned
    }
}

// ============================================================================
// STEERING
// ============================================================================

/// New transform for flocking follower `index`, before terrain clamping.
fn flock_step(index: usize, snapshot: &[Transform], leader: &Transform, s: &FlockConfig) -> Transform {
    let current = snapshot[index];
    let cohesion = cohesion(current.position, leader.position, s);
    let separation = separation(index, snapshot, leader.position, s);
    Transform {
        position: current.position + cohesion + separation,
        forward: alignment(index, snapshot, leader.forward, s),
    }
}

/// Pull toward the leader on the XZ plane. Grows with distance and
/// saturates at `cohesion_gain`.
fn cohesion(position: Vec3, leader: Vec3, s: &FlockConfig) -> Vec3 {
    let offset = leader - position;
    let offset = Vec3::new(offset.x, 0.0, offset.z);
    let distance = offset.length();
    if distance <= EPSILON {
        return Vec3::ZERO;
    }
    let attenuation = distance / (distance + s.cohesion_falloff.max(EPSILON));
    offset / distance * s.cohesion_gain * attenuation
}

/// Push away from the leader and from every other follower closer than
/// `separation_radius`, inversely proportional to distance.
fn separation(index: usize, snapshot: &[Transform], leader: Vec3, s: &FlockConfig) -> Vec3 {
    let me = snapshot[index];
    // Sitting on the leader: back off along our own heading.
    let behind = if me.forward != Vec3::ZERO { -me.forward } else { Vec3::X };

    let mut total = repulsion(me.position, leader, behind, s);
    for (j, other) in snapshot.iter().enumerate() {
        if j != index {
            let split = coincident_split(index, j, snapshot);
            total += repulsion(me.position, other.position, split, s);
        }
    }
    total
}

/// Direction pushing follower `index` off follower `other` when the two
/// share a position. Opposite for the two members of a pair, sideways to
/// their common heading.
fn coincident_split(index: usize, other: usize, snapshot: &[Transform]) -> Vec3 {
    let (low, high) = if index < other { (index, other) } else { (other, index) };
    let (low, high) = (snapshot[low].forward, snapshot[high].forward);
    let across = |v: Vec3| flatten(Vec3::Y.cross(v));
    let mut axis = across(low + high);
    if axis == Vec3::ZERO {
        axis = across(low);
    }
    if axis == Vec3::ZERO {
        axis = Vec3::X;
    }
    if index < other { axis } else { -axis }
}

fn repulsion(position: Vec3, other: Vec3, coincident: Vec3, s: &FlockConfig) -> Vec3 {
    let offset = position - other;
    let offset = Vec3::new(offset.x, 0.0, offset.z);
    let distance = offset.length();
    if distance >= s.separation_radius {
        return Vec3::ZERO;
    }
    let dir = if distance > EPSILON { offset / distance } else { coincident };
    dir * s.separation_gain * s.separation_radius / distance.max(s.min_separation.max(EPSILON))
}

/// Heading after steering toward the group heading (leader plus the other
/// followers). Never changes position.
fn alignment(index: usize, snapshot: &[Transform], leader_forward: Vec3, s: &FlockConfig) -> Vec3 {
    let current = snapshot[index].forward;
    let leader_forward = flatten(leader_forward);
    if s.copy_leader_heading {
        return if leader_forward != Vec3::ZERO { leader_forward } else { current };
    }

    let group: Vec3 = snapshot
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != index)
        .fold(leader_forward, |acc, (_, t)| acc + t.forward);
    let target = flatten(group);
    if target == Vec3::ZERO {
        return current;
    }

    let steered = flatten(current + (target - current) * s.alignment_gain.clamp(0.0, 1.0));
    if steered != Vec3::ZERO { steered } else { target }
}
