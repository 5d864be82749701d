// The stage: host world that owns the terrain, the ECS world and the
// diagnostics pane, and runs one simulation tick per `update()`.
//
// `Stage::demo` builds the demo layout: a player leading a pack of
// eight dogs, one NPC agent exploring near the player's start, and four
// treasures scattered over the terrain.

use bevy_ecs::prelude::*;
use glam::Vec3;
use super::components::*;
use super::config::SimConfig;
use super::error::{NavError, SimResult};
use super::flock::{FlockGroup, FlockTickReport};
use super::inspector::{InfoPane, InfoSink, line};
use super::navigation::NpAgent;
use super::path::{NavNode, NavNodeKind, PathTrack, TraversalPolicy};
use super::systems::{self, Bounds};
use super::terrain::HeightField;

/// Grid size the demo layout is authored for.
const DEMO_GRID: usize = 512;

/// What one tick did, for logging by the host.
#[derive(Debug, Clone, Default)]
pub struct TickSummary {
    pub tick: u64,
    pub flock: FlockTickReport,
    pub tagged: Vec<String>,
}

pub struct Stage {
    world: World,
    terrain: HeightField,
    config: SimConfig,
    bounds: Bounds,
    info: InfoPane,
    tick: u64,
    collectors: u64,
}

impl Stage {
    /// Empty stage over the given terrain.
    pub fn new(terrain: HeightField, config: SimConfig) -> Self {
        let bounds = Bounds::for_terrain(&terrain);
        Self {
            world: World::new(),
            terrain,
            config,
            bounds,
            info: InfoPane::new(),
            tick: 0,
            collectors: 0,
        }
    }

    /// Stage with procedurally generated terrain and the demo layout.
    /// Returns the stage plus (player, npc, pack) entities.
    pub fn demo(config: SimConfig) -> SimResult<(Self, Entity, Entity, Entity)> {
        let size = config.terrain.grid_size;
        if size < DEMO_GRID {
            return Err(NavError::InvalidGrid {
                reason: format!("demo layout needs a {}x{} grid, got {}", DEMO_GRID, DEMO_GRID, size),
            }
            .into());
        }
        let terrain = rolling_hills(size, config.terrain.spacing, config.terrain.height_multiplier)?;
        let mut stage = Stage::new(terrain, config);
        let s = stage.terrain.spacing();
        let at = |stage: &Stage, gx: f32, gz: f32| stage.terrain.snap(gx * s, gz * s);

        // Player walks a square loop around the pack's start.
        let player_route: Vec<NavNode> = [(510, 507), (470, 507), (470, 460), (510, 460)]
            .iter()
            .map(|&(x, z)| NavNode::on_terrain(&stage.terrain, x, z, NavNodeKind::Waypoint))
            .collect();
        let player = stage.spawn_player(at(&stage, 510.0, 507.0), player_route)?;

        let np_route = vec![
            NavNode::on_terrain(&stage.terrain, 505, 505, NavNodeKind::Path),
            NavNode::on_terrain(&stage.terrain, 500, 500, NavNodeKind::Vertex),
            NavNode::on_terrain(&stage.terrain, 495, 495, NavNodeKind::AStar),
            NavNode::on_terrain(&stage.terrain, 495, 505, NavNodeKind::Waypoint),
            NavNode::on_terrain(&stage.terrain, 383, 500, NavNodeKind::Waypoint),
        ];
        let npc = stage.spawn_agent("npAgent", at(&stage, 490.0, 475.0), np_route)?;

        for (label, gx, gz, lift) in [
            ("t1", 477.0, 290.0, 110.0),
            ("t2", 446.0, 450.0, 110.0),
            ("t3", 507.0, 425.0, 110.0),
            ("t4", 470.0, 144.0, 210.0),
        ] {
            let ground = at(&stage, gx, gz);
            stage.spawn_treasure(label, ground + Vec3::Y * lift);
        }

        let mut dogs = Vec::new();
        for dx in [-9.0, -3.0, 3.0, 9.0] {
            for dz in [-3.0, 3.0] {
                dogs.push(at(&stage, 480.0 + dx, 480.0 + dz));
            }
        }
        let pack = stage.spawn_pack("dog", Some(player), &dogs);

        Ok((stage, player, npc, pack))
    }

    // ========================================================================
    // SPAWNING
    // ========================================================================

    /// Scripted player that loops `route` and can tag treasures.
    pub fn spawn_player(&mut self, position: Vec3, route: Vec<NavNode>) -> SimResult<Entity> {
        let route = PathTrack::non_empty(route, TraversalPolicy::Loop)?;
        let mut transform = Transform::from_position(position);
        transform.turn_to_face(route.current()?.position);
        let patrol = Patrol {
            route,
            step_size: self.config.stage.player_step_size,
            snap_distance: self.config.agent.snap_distance,
        };
        let count = self.next_collector();
        Ok(self.world.spawn((transform, patrol, PackLeader, count)).id())
    }

    pub fn spawn_agent(&mut self, name: &str, position: Vec3, route: Vec<NavNode>) -> SimResult<Entity> {
        let mut transform = Transform::from_position(position);
        let agent = NpAgent::new(name, route, self.config.agent.clone(), &mut transform)?;
        let count = self.next_collector();
        Ok(self.world.spawn((transform, agent, count)).id())
    }

    fn next_collector(&mut self) -> TreasureCount {
        self.collectors += 1;
        TreasureCount::ranked(self.collectors)
    }

    pub fn spawn_treasure(&mut self, label: &str, position: Vec3) -> Entity {
        self.world.spawn(Treasure::new(label, position)).id()
    }

    /// Pack of followers placed on the terrain at `positions`, facing +Z.
    pub fn spawn_pack(&mut self, label: &str, leader: Option<Entity>, positions: &[Vec3]) -> Entity {
        let mut group = FlockGroup::new(label, leader, self.config.flock.clone());
        for p in positions {
            group.add_follower(Transform::from_position(self.terrain.snap(p.x, p.z)));
        }
        self.world.spawn(group).id()
    }

    pub fn despawn(&mut self, entity: Entity) -> bool {
        self.world.despawn(entity)
    }

    // ========================================================================
    // TICK
    // ========================================================================

    pub fn update(&mut self) -> TickSummary {
        self.tick += 1;
        systems::patrol_system(&mut self.world, &self.terrain, self.bounds);
        systems::agent_system(&mut self.world, &self.terrain, self.bounds, &mut self.info);
        let flock = systems::flock_system(&mut self.world, &self.terrain);
        let tagged = systems::treasure_tagging_system(&mut self.world, self.config.stage.tag_radius);
        for label in &tagged {
            log::info!("tick {}: treasure {} tagged", self.tick, label);
        }
        TickSummary { tick: self.tick, flock, tagged }
    }

    /// External trigger (a debug key in a windowed host) forcing the
    /// agent's next mode transition. Returns false if `agent` is not an NPC.
    pub fn switch_agent_mode(&mut self, agent: Entity) -> bool {
        let treasures: Vec<TreasureSnapshot> = self
            .world
            .query::<&Treasure>()
            .iter(&self.world)
            .map(TreasureSnapshot::from)
            .collect();
        let Some(mut transform) = self.transform(agent) else { return false };
        let Some(mut npc) = self.world.get_mut::<NpAgent>(agent) else { return false };
        npc.switch_mode(&mut transform, &treasures);
        if let Some(mut t) = self.world.get_mut::<Transform>(agent) {
            *t = transform;
        }
        true
    }

    /// Cycle a pack's flock level. Returns the new percentage.
    pub fn change_flock_level(&mut self, pack: Entity) -> Option<u32> {
        let value = {
            let mut group = self.world.get_mut::<FlockGroup>(pack)?;
            group.change_flock_level();
            group.level_value()
        };
        self.info.set_info(line::FLOCK_LEVEL, format!("Flocking Level:    {}%", value));
        Some(value)
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn tick(&self) -> u64 { self.tick }
    pub fn terrain(&self) -> &HeightField { &self.terrain }
    pub fn config(&self) -> &SimConfig { &self.config }
    pub fn info(&self) -> &InfoPane { &self.info }
    pub fn world(&self) -> &World { &self.world }
    pub fn world_mut(&mut self) -> &mut World { &mut self.world }

    pub fn transform(&self, entity: Entity) -> Option<Transform> {
        self.world.get::<Transform>(entity).copied()
    }

    pub fn agent(&self, entity: Entity) -> Option<&NpAgent> {
        self.world.get::<NpAgent>(entity)
    }

    pub fn pack(&self, entity: Entity) -> Option<&FlockGroup> {
        self.world.get::<FlockGroup>(entity)
    }

    pub fn pack_mut(&mut self, entity: Entity) -> Option<Mut<'_, FlockGroup>> {
        self.world.get_mut::<FlockGroup>(entity)
    }

    pub fn tagged_count(&self, entity: Entity) -> Option<u32> {
        self.world.get::<TreasureCount>(entity).map(|c| c.tagged)
    }

    /// Every treasure, tagged or not.
    pub fn treasures(&mut self) -> Vec<Treasure> {
        self.world.query::<&Treasure>().iter(&self.world).cloned().collect()
    }
}

/// Smooth procedural heightmap standing in for a loaded texture.
pub fn rolling_hills(size: usize, spacing: f32, multiplier: f32) -> SimResult<HeightField> {
    let bytes: Vec<u8> = (0..size * size)
        .map(|i| {
            let (x, z) = ((i % size) as f32, (i / size) as f32);
            let h = 0.5 + 0.3 * (x * 0.021).sin() * (z * 0.017).cos() + 0.2 * ((x + z) * 0.006).sin();
            (h.clamp(0.0, 1.0) * 255.0) as u8
        })
        .collect();
    Ok(HeightField::from_heightmap(size, spacing, &bytes, multiplier)?)
}
