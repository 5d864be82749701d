// Core ECS components shared by the stage, agents and packs.

use bevy_ecs::prelude::*;
use glam::{Quat, Vec2, Vec3};
use super::path::PathTrack;

/// Position and facing of an entity. `forward` is kept unit length on the
/// XZ plane; vertical placement comes from the terrain, not from heading.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub forward: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::Z,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self { position, ..Default::default() }
    }

    pub fn with_forward(mut self, forward: Vec3) -> Self {
        let flat = flatten(forward);
        if flat != Vec3::ZERO {
            self.forward = flat;
        }
        self
    }

    /// Face `target` on the XZ plane. Keeps the old heading if the target
    /// is directly above or below.
    pub fn turn_to_face(&mut self, target: Vec3) {
        let dir = flatten(target - self.position);
        if dir != Vec3::ZERO {
            self.forward = dir;
        }
    }

    /// Rotate the heading about +Y (right-hand rule).
    pub fn yaw(&mut self, radians: f32) {
        self.forward = flatten(Quat::from_rotation_y(radians) * self.forward);
    }

    /// Distance to `other` ignoring height.
    pub fn planar_distance(&self, other: Vec3) -> f32 {
        planar_distance(self.position, other)
    }
}

/// XZ projection of a 3D point.
#[inline]
pub fn planar(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.z)
}

#[inline]
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    planar(a).distance(planar(b))
}

/// Drop the vertical component and normalise; zero in, zero out.
#[inline]
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z).normalize_or_zero()
}

/// Something an agent can tag once per game.
#[derive(Component, Debug, Clone)]
pub struct Treasure {
    pub label: String,
    pub position: Vec3,
    pub tagged_by: Option<Entity>,
}

impl Treasure {
    pub fn new(label: impl Into<String>, position: Vec3) -> Self {
        Self { label: label.into(), position, tagged_by: None }
    }

    pub fn is_tagged(&self) -> bool {
        self.tagged_by.is_some()
    }

    /// Mark as tagged. Returns false (and changes nothing) if already tagged.
    pub fn tag(&mut self, by: Entity) -> bool {
        if self.is_tagged() {
            return false;
        }
        self.tagged_by = Some(by);
        true
    }
}

/// Read-only view of one treasure, collected from the ECS before agents
/// run so that sensing sees a consistent snapshot for the whole tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreasureSnapshot {
    pub position: Vec3,
    pub tagged: bool,
}

impl From<&Treasure> for TreasureSnapshot {
    fn from(t: &Treasure) -> Self {
        Self { position: t.position, tagged: t.is_tagged() }
    }
}

/// Running total of treasures an agent has tagged. `rank` orders
/// collectors by spawn time; lower ranks win treasures reached in the same
/// tick. Entity indices are recycled after despawn, so they can't be used.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct TreasureCount {
    pub tagged: u32,
    pub rank: u64,
}

impl TreasureCount {
    pub fn ranked(rank: u64) -> Self {
        Self { tagged: 0, rank }
    }
}

/// Scripted player: walks its own looping route and leads the pack.
#[derive(Component, Debug, Clone)]
pub struct Patrol {
    pub route: PathTrack,
    pub step_size: f32,
    pub snap_distance: f32,
}

/// Marks the entity a pack follows.
#[derive(Component, Debug, Clone, Copy)]
pub struct PackLeader;
