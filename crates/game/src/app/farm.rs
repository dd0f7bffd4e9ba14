use std::cell::{Cell, RefCell};
use std::rc::Rc;

use engine::{
    EntityId, EntitySpawn, GridSize, PursuitEvent, Scene, SceneCommand, Shape, SimError,
    Simulation, TickSummary, TileCoord, TileGrid, TileSize, Vec2,
};
use tracing::{debug, info};

use super::config::GameConfig;

/// `#` wall, `P` player, `S` slime, `c` crop. Everything else is open ground.
const FARM_LAYOUT: &[&str] = &[
    "####################",
    "#..................#",
    "#..P.......c..c....#",
    "#..................#",
    "#.....#####........#",
    "#.....#...#....S...#",
    "#.....#...#........#",
    "#..........c.......#",
    "#..S...............#",
    "#..........####....#",
    "#..................#",
    "####################",
];

/// Loop the player walks, clockwise along the inside of the fence.
const PATROL_TILES: [TileCoord; 4] = [
    TileCoord::new(17, 1),
    TileCoord::new(17, 10),
    TileCoord::new(2, 10),
    TileCoord::new(2, 1),
];

const HARVEST_INTERVAL_TICKS: u64 = 90;
const MAX_PLAYER_HITS: u32 = 5;
const CROP_FOOTPRINT: f32 = 0.75;

#[derive(Debug, Clone, Copy)]
struct Crop {
    entity: EntityId,
    position: Vec2,
}

pub(crate) struct FarmScene {
    config: GameConfig,
    player: Option<EntityId>,
    slimes: Vec<EntityId>,
    crops: Vec<Crop>,
    crop_total: usize,
    patrol_index: usize,
    harvest_queue: Rc<RefCell<Vec<EntityId>>>,
    bumps: Rc<Cell<u32>>,
    harvested: u32,
    hits_taken: u32,
    ticks: u64,
}

impl FarmScene {
    pub(crate) fn new(config: GameConfig) -> Self {
        Self {
            config,
            player: None,
            slimes: Vec::new(),
            crops: Vec::new(),
            crop_total: 0,
            patrol_index: 0,
            harvest_queue: Rc::new(RefCell::new(Vec::new())),
            bumps: Rc::new(Cell::new(0)),
            harvested: 0,
            hits_taken: 0,
            ticks: 0,
        }
    }

    fn layout_size() -> GridSize {
        GridSize {
            width: FARM_LAYOUT.first().map_or(0, |row| row.len()) as u32,
            height: FARM_LAYOUT.len() as u32,
        }
    }

    fn spawn_player(&mut self, sim: &mut Simulation, position: Vec2) {
        let settings = self.config.player;
        let player = sim.spawn_entity(
            EntitySpawn::new("player", position)
                .pursuit_target()
                .with_move_speed(settings.move_speed),
            Some(Shape::circle(settings.radius)),
        );
        if let Some(observers) = sim.observers_mut(player) {
            let bumps = Rc::clone(&self.bumps);
            observers.on_collision_enter(move |contact| {
                bumps.set(bumps.get().saturating_add(1));
                debug!(other = ?contact.other_entity, "player_bumped");
            });
        }
        self.player = Some(player);
    }

    fn spawn_slime(&mut self, sim: &mut Simulation, position: Vec2) -> Result<(), SimError> {
        let settings = self.config.slime;
        let slime = sim.spawn_entity(
            EntitySpawn::new("slime", position)
                .hostile()
                .with_move_speed(settings.move_speed),
            Some(Shape::circle(settings.radius)),
        );
        sim.add_agent(slime, settings.pursuit)?;
        self.slimes.push(slime);
        Ok(())
    }

    fn spawn_crop(&mut self, sim: &mut Simulation, position: Vec2, tile_size: TileSize) {
        let crop = sim.spawn_entity(
            EntitySpawn::new("crop", position),
            Some(Shape::rect(
                tile_size.width * CROP_FOOTPRINT,
                tile_size.height * CROP_FOOTPRINT,
            )),
        );
        if let Some(observers) = sim.observers_mut(crop) {
            let queue = Rc::clone(&self.harvest_queue);
            observers.on_click(move |event| {
                if let Some(entity) = event.entity {
                    queue.borrow_mut().push(entity);
                }
            });
            observers.on_hover(move |event| {
                debug!(crop = ?event.entity, "crop_hovered");
            });
        }
        self.crops.push(Crop {
            entity: crop,
            position,
        });
    }

    fn drive_player(&mut self, sim: &mut Simulation) {
        let Some(player) = self.player else {
            return;
        };
        let Some(entity) = sim.entity(player) else {
            self.player = None;
            return;
        };
        if entity.move_destination.is_some() {
            return;
        }
        let tile = PATROL_TILES[self.patrol_index % PATROL_TILES.len()];
        self.patrol_index = self.patrol_index.wrapping_add(1);
        let destination = match sim.grid() {
            Ok(grid) => grid.tile_center(tile),
            Err(_) => return,
        };
        sim.set_move_destination(player, Some(destination));
        debug!(x = tile.x, y = tile.y, "player_patrol_leg");
    }

    fn tend_crops(&mut self, sim: &mut Simulation) {
        if let Some(next) = self.crops.first() {
            sim.hover(next.position);
            if self.ticks % HARVEST_INTERVAL_TICKS == 0 {
                sim.click(next.position);
            }
        }

        let picked: Vec<EntityId> = self.harvest_queue.borrow_mut().drain(..).collect();
        for entity in picked {
            let Some(index) = self.crops.iter().position(|crop| crop.entity == entity) else {
                continue;
            };
            self.crops.remove(index);
            sim.despawn_entity(entity);
            self.harvested = self.harvested.saturating_add(1);
            info!(
                harvested = self.harvested,
                remaining = self.crops.len(),
                "crop_harvested"
            );
        }
    }
}

impl Scene for FarmScene {
    fn load(&mut self, sim: &mut Simulation) -> Result<(), SimError> {
        let tile_size = self.config.tile_size();
        sim.set_map(tile_size, Self::layout_size())?;

        for (y, row) in FARM_LAYOUT.iter().enumerate() {
            for (x, cell) in row.chars().enumerate() {
                let tile = TileCoord::new(x as i32, y as i32);
                let center = sim.grid()?.tile_center(tile);
                match cell {
                    '#' => {
                        sim.add_solid_tile(tile)?;
                    }
                    'P' => self.spawn_player(sim, center),
                    'S' => self.spawn_slime(sim, center)?,
                    'c' => self.spawn_crop(sim, center, tile_size),
                    _ => {}
                }
            }
        }
        sim.apply_pending();
        self.crop_total = self.crops.len();

        info!(
            entity_count = sim.world().entity_count(),
            colliders = sim.layer().len(),
            slimes = self.slimes.len(),
            crops = self.crop_total,
            "scene_loaded"
        );
        Ok(())
    }

    fn update(&mut self, _fixed_dt_seconds: f32, sim: &mut Simulation) -> SceneCommand {
        self.ticks = self.ticks.saturating_add(1);
        self.drive_player(sim);
        self.tend_crops(sim);

        if self.crop_total > 0 && self.crops.is_empty() {
            info!(ticks = self.ticks, harvested = self.harvested, "harvest_complete");
            return SceneCommand::Quit;
        }
        SceneCommand::None
    }

    fn after_tick(&mut self, summary: &TickSummary, _sim: &mut Simulation) -> SceneCommand {
        let Some(player) = self.player else {
            return SceneCommand::None;
        };
        for event in &summary.events {
            if let PursuitEvent::Attacked { agent, target } = event {
                if *target == player {
                    self.hits_taken = self.hits_taken.saturating_add(1);
                    info!(slime = agent.0, hits = self.hits_taken, "player_hit");
                }
            }
        }
        if self.hits_taken >= MAX_PLAYER_HITS {
            info!(tick = summary.tick, hits = self.hits_taken, "player_defeated");
            return SceneCommand::Quit;
        }
        SceneCommand::None
    }

    fn unload(&mut self, sim: &mut Simulation) {
        info!(
            entity_count = sim.world().entity_count(),
            harvested = self.harvested,
            hits_taken = self.hits_taken,
            bumps = self.bumps.get(),
            "scene_unload"
        );
        self.player = None;
        self.slimes.clear();
        self.crops.clear();
        self.harvest_queue.borrow_mut().clear();
    }

    fn debug_title(&self, sim: &Simulation) -> Option<String> {
        Some(format!(
            "Farmcore | T:{} | crops {}/{} | hits {}",
            sim.tick_count(),
            self.harvested,
            self.crop_total,
            self.hits_taken
        ))
    }
}
