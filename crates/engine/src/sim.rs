use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info};

use crate::math::Vec2;
use crate::movement::{intent_delta, resolve_step, step_toward};
use crate::nav::{validate_grid, GridError, GridSize, LayerGrid, TileCoord, TileGrid, TileSize};
use crate::physics::{ColliderDesc, ColliderId, ColliderLayer, ColliderObservers, Shape, SweepReport};
use crate::pursuit::{
    PursuitAgent, PursuitConfig, PursuitContext, PursuitEvent, PursuitEventBus,
    PursuitEventCounts,
};
use crate::world::{Entity, EntityId, EntitySpawn, EntityWorld};

/// Distance at which a walking entity counts as having reached its destination.
pub const DEFAULT_ARRIVAL_THRESHOLD: f32 = 0.5;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("no map grid configured; call set_map before adding tiles or ticking")]
    MissingGrid,
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("entity {0:?} does not exist")]
    UnknownEntity(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MapBounds {
    tile_size: TileSize,
    grid_size: GridSize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickSummary {
    pub tick: u64,
    pub sweep: SweepReport,
    pub pursuit: PursuitEventCounts,
    pub events: Vec<PursuitEvent>,
    pub moved_entities: u32,
}

/// Owns the entity table, the collider layer and the pursuit agents, and
/// advances them together one fixed tick at a time.
#[derive(Debug)]
pub struct Simulation {
    world: EntityWorld,
    layer: ColliderLayer,
    map: Option<MapBounds>,
    agents: BTreeMap<EntityId, PursuitAgent>,
    events: PursuitEventBus,
    arrival_threshold: f32,
    tick_count: u64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    pub fn new() -> Self {
        Self {
            world: EntityWorld::default(),
            layer: ColliderLayer::new(),
            map: None,
            agents: BTreeMap::new(),
            events: PursuitEventBus::default(),
            arrival_threshold: DEFAULT_ARRIVAL_THRESHOLD,
            tick_count: 0,
        }
    }

    pub fn set_map(&mut self, tile_size: TileSize, grid_size: GridSize) -> Result<(), SimError> {
        validate_grid(tile_size, grid_size)?;
        self.map = Some(MapBounds {
            tile_size,
            grid_size,
        });
        info!(
            tiles_x = grid_size.width,
            tiles_y = grid_size.height,
            tile_w = tile_size.width,
            tile_h = tile_size.height,
            "map_configured"
        );
        Ok(())
    }

    pub fn grid(&self) -> Result<LayerGrid<'_>, SimError> {
        let map = self.map.ok_or(SimError::MissingGrid)?;
        Ok(LayerGrid::new(&self.layer, map.tile_size, map.grid_size)?)
    }

    /// Adds a static box covering exactly one tile.
    pub fn add_solid_tile(&mut self, tile: TileCoord) -> Result<ColliderId, SimError> {
        let map = self.map.ok_or(SimError::MissingGrid)?;
        let center = self.grid()?.tile_center(tile);
        Ok(self.layer.add(ColliderDesc::rect(
            center,
            map.tile_size.width,
            map.tile_size.height,
        )))
    }

    pub fn add_static_box(&mut self, center: Vec2, width: f32, height: f32) -> ColliderId {
        self.layer.add(ColliderDesc::rect(center, width, height))
    }

    pub fn spawn_entity(&mut self, spawn: EntitySpawn, shape: Option<Shape>) -> EntityId {
        let position = spawn.position;
        let id = self.world.spawn(spawn);
        if let Some(shape) = shape {
            let collider = self.layer.add(ColliderDesc {
                shape,
                center: position,
                dynamic: true,
                entity: Some(id),
            });
            if let Some(entity) = self.world.find_entity_mut(id) {
                entity.collider = Some(collider);
            }
        }
        id
    }

    /// Queues the entity for removal. Its collider is pruned by the next sweep
    /// and any agent driving it is dropped.
    pub fn despawn_entity(&mut self, id: EntityId) -> bool {
        let collider = self.world.find_entity(id).and_then(|entity| entity.collider);
        if !self.world.despawn(id) {
            return false;
        }
        if let Some(collider) = collider {
            self.layer.mark_discarded(collider);
        }
        self.agents.remove(&id);
        true
    }

    pub fn add_agent(&mut self, entity: EntityId, config: PursuitConfig) -> Result<(), SimError> {
        if self.world.find_entity(entity).is_none() {
            return Err(SimError::UnknownEntity(entity));
        }
        self.agents.insert(entity, PursuitAgent::new(entity, config));
        Ok(())
    }

    pub fn set_move_intent(&mut self, id: EntityId, intent: Vec2) -> bool {
        match self.world.find_entity_mut(id) {
            Some(entity) => {
                entity.move_intent = intent;
                true
            }
            None => false,
        }
    }

    pub fn set_move_destination(&mut self, id: EntityId, destination: Option<Vec2>) -> bool {
        match self.world.find_entity_mut(id) {
            Some(entity) => {
                entity.move_destination = destination;
                true
            }
            None => false,
        }
    }

    pub fn apply_pending(&mut self) {
        self.world.apply_pending();
    }

    pub fn click(&mut self, position: Vec2) -> usize {
        self.layer.send_user_click(position)
    }

    pub fn hover(&mut self, position: Vec2) -> usize {
        self.layer.send_user_hover(position)
    }

    pub fn observers_mut(&mut self, id: EntityId) -> Option<&mut ColliderObservers> {
        let collider = self.world.find_entity(id)?.collider?;
        self.layer.observers_mut(collider)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.world.find_entity(id)
    }

    pub fn world(&self) -> &EntityWorld {
        &self.world
    }

    pub fn layer(&self) -> &ColliderLayer {
        &self.layer
    }

    pub fn agent(&self, entity: EntityId) -> Option<&PursuitAgent> {
        self.agents.get(&entity)
    }

    pub fn agents(&self) -> impl Iterator<Item = &PursuitAgent> {
        self.agents.values()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// One fixed step: pending spawns/despawns, pursuit, movement, collider
    /// sync, then the collision sweep.
    pub fn tick(&mut self, fixed_dt_seconds: f32) -> Result<TickSummary, SimError> {
        let map = self.map.ok_or(SimError::MissingGrid)?;
        self.world.apply_pending();
        let world = &self.world;
        self.agents.retain(|id, _| world.find_entity(*id).is_some());

        {
            let grid = LayerGrid::new(&self.layer, map.tile_size, map.grid_size)?;
            let context = PursuitContext {
                world: &self.world,
                layer: &self.layer,
                grid: &grid,
            };
            for agent in self.agents.values_mut() {
                agent.tick(&context, fixed_dt_seconds, &mut self.events);
            }
        }
        for agent in self.agents.values() {
            if let Some(entity) = self.world.find_entity_mut(agent.entity()) {
                entity.move_destination = agent.move_destination();
            }
        }

        let moved_entities = self.run_movement(fixed_dt_seconds);
        let sweep = self.layer.check_collisions();
        let events = self.events.finish_tick_rollover();
        let pursuit = self.events.last_tick_counts();
        self.tick_count = self.tick_count.saturating_add(1);

        debug!(
            tick = self.tick_count,
            moved_entities,
            enters = sweep.enters,
            leaves = sweep.leaves,
            pursuit_events = pursuit.total,
            "sim_tick"
        );

        Ok(TickSummary {
            tick: self.tick_count,
            sweep,
            pursuit,
            events,
            moved_entities,
        })
    }

    fn run_movement(&mut self, fixed_dt_seconds: f32) -> u32 {
        let mut moved = 0u32;
        for entity in self.world.entities_mut() {
            let (desired, arrived) = match entity.move_destination {
                Some(destination) => {
                    let (next, arrived) = step_toward(
                        entity.position,
                        destination,
                        entity.move_speed,
                        fixed_dt_seconds,
                        self.arrival_threshold,
                    );
                    (next - entity.position, arrived)
                }
                None => (
                    intent_delta(entity.move_intent, entity.move_speed, fixed_dt_seconds),
                    false,
                ),
            };
            if arrived {
                entity.move_destination = None;
            }
            if desired == Vec2::ZERO {
                continue;
            }

            let step = resolve_step(&self.layer, entity, desired);
            if step == Vec2::ZERO {
                continue;
            }
            entity.position += step;
            if let Some(collider) = entity.collider {
                self.layer.set_center(collider, entity.position);
            }
            moved = moved.saturating_add(1);
        }
        moved
    }
}
