// Per-tick systems run by the Stage, in this order:
//   patrol → agents → packs → treasure tagging
// Each one works directly on the ECS world; cross-entity reads (treasure
// positions, leader transforms) are snapshotted before anything is mutated.

use bevy_ecs::prelude::*;
use glam::Vec3;
use super::components::*;
use super::flock::{FlockGroup, FlockTickReport};
use super::inspector::{InfoSink, line};
use super::navigation::NpAgent;
use super::terrain::HeightField;

/// Region movers may occupy: one grid cell in from the near edges and two
/// from the far edges.
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    pub min: f32,
    pub max: f32,
}

impl Bounds {
    pub fn for_terrain(terrain: &HeightField) -> Self {
        let spacing = terrain.spacing();
        let size = terrain.width().min(terrain.depth()) as f32 * spacing;
        Self { min: spacing, max: size - 2.0 * spacing }
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min && p.x <= self.max && p.z >= self.min && p.z <= self.max
    }
}

/// Move scripted players along their looping routes.
pub fn patrol_system(world: &mut World, terrain: &HeightField, bounds: Bounds) {
    let mut query = world.query::<(&mut Transform, &mut Patrol)>();
    for (mut transform, mut patrol) in query.iter_mut(world) {
        let Ok(mut goal) = patrol.route.current() else { continue };
        if transform.planar_distance(goal.position) <= patrol.snap_distance {
            match patrol.route.next() {
                Ok(node) => goal = node,
                Err(_) => continue,
            }
        }
        transform.turn_to_face(goal.position);
        let step = patrol.step_size.min(transform.planar_distance(goal.position));
        let next = transform.position + transform.forward * step;
        if bounds.contains(next) {
            transform.position = terrain.snap(next.x, next.z);
        }
    }
}

/// Run navigation for every NPC agent and step it, refusing steps that
/// would leave the terrain.
pub fn agent_system(world: &mut World, terrain: &HeightField, bounds: Bounds, info: &mut dyn InfoSink) {
    let treasures: Vec<TreasureSnapshot> = world
        .query::<&Treasure>()
        .iter(world)
        .map(TreasureSnapshot::from)
        .collect();

    let mut query = world.query::<(&mut Transform, &mut NpAgent)>();
    for (mut transform, mut agent) in query.iter_mut(world) {
        agent.navigate(&mut transform, &treasures, info);
        let Some(next) = agent.proposed_step(&mut transform) else { continue };
        if bounds.contains(next) {
            transform.position = terrain.snap(next.x, next.z);
            info.set_info(line::BOUNDS, String::new());
        } else {
            info.set_info(line::BOUNDS, format!("{} can't move out of range", agent.name));
        }
    }
}

/// Update every pack. A pack whose leader entity no longer exists, has no
/// transform or is not marked `PackLeader` wanders as if leaderless.
pub fn flock_system(world: &mut World, terrain: &HeightField) -> FlockTickReport {
    let leaders: Vec<(Entity, Option<Entity>)> = world
        .query::<(Entity, &FlockGroup)>()
        .iter(world)
        .map(|(entity, group)| (entity, group.leader()))
        .collect();
    let packs: Vec<(Entity, Option<Transform>)> = leaders
        .into_iter()
        .map(|(entity, leader)| {
            let lead = leader
                .filter(|&l| world.get::<PackLeader>(l).is_some())
                .and_then(|l| world.get::<Transform>(l).copied());
            (entity, lead)
        })
        .collect();

    let mut total = FlockTickReport::default();
    for (entity, leader) in packs {
        if let Some(mut group) = world.get_mut::<FlockGroup>(entity) {
            let report = group.update(leader.as_ref(), terrain);
            total.turns += report.turns;
            total.members_flocked += report.members_flocked;
        }
    }
    total
}

/// Tag every untagged treasure that a collecting entity is within
/// `tag_radius` of. Collectors with the lower `TreasureCount::rank` win
/// ties. Returns the labels tagged this tick.
pub fn treasure_tagging_system(world: &mut World, tag_radius: f32) -> Vec<String> {
    let mut collectors: Vec<(Entity, Vec3, u64)> = world
        .query::<(Entity, &Transform, &TreasureCount)>()
        .iter(world)
        .map(|(entity, t, count)| (entity, t.position, count.rank))
        .collect();
    collectors.sort_by_key(|&(_, _, rank)| rank);

    let mut tagged = Vec::new();
    let mut query = world.query::<&mut Treasure>();
    for mut treasure in query.iter_mut(world) {
        if treasure.is_tagged() {
            continue;
        }
        let finder = collectors
            .iter()
            .find(|(_, p, _)| planar_distance(*p, treasure.position) <= tag_radius)
            .map(|(entity, _, _)| *entity);
        if let Some(finder) = finder {
            treasure.tag(finder);
            tagged.push((finder, treasure.label.clone()));
        }
    }

    for (finder, _) in &tagged {
        if let Some(mut count) = world.get_mut::<TreasureCount>(*finder) {
            count.tagged += 1;
        }
    }
    tagged.into_iter().map(|(_, label)| label).collect()
}
