use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::math::Vec2;
use crate::nav::{AiPath, PathStatus, TileGrid};
use crate::physics::ColliderLayer;
use crate::world::{Entity, EntityId, EntityWorld};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PursuitConfig {
    pub vision_radius: f32,
    pub attack_range: f32,
    pub attack_cooldown_seconds: f32,
    /// Accumulated out-of-vision time after which the target is dropped.
    pub forget_after_seconds: f32,
    pub recalculate_interval_seconds: f32,
    pub arrival_threshold: f32,
    pub corner_smoothing: f32,
    pub min_smoothing_distance: f32,
}

impl Default for PursuitConfig {
    fn default() -> Self {
        Self {
            vision_radius: 96.0,
            attack_range: 14.0,
            attack_cooldown_seconds: 1.0,
            forget_after_seconds: 3.0,
            recalculate_interval_seconds: 0.5,
            arrival_threshold: 2.0,
            corner_smoothing: 4.0,
            min_smoothing_distance: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PursuitEvent {
    TargetAcquired { agent: EntityId, target: EntityId },
    Attacked { agent: EntityId, target: EntityId },
    TargetLost { agent: EntityId, target: EntityId },
    PathRecalculated { agent: EntityId, status: PathStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PursuitEventKind {
    TargetAcquired,
    Attacked,
    TargetLost,
    PathRecalculated,
}

impl PursuitEvent {
    fn kind(&self) -> PursuitEventKind {
        match self {
            Self::TargetAcquired { .. } => PursuitEventKind::TargetAcquired,
            Self::Attacked { .. } => PursuitEventKind::Attacked,
            Self::TargetLost { .. } => PursuitEventKind::TargetLost,
            Self::PathRecalculated { .. } => PursuitEventKind::PathRecalculated,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PursuitEventCounts {
    pub total: u32,
    pub target_acquired: u32,
    pub attacked: u32,
    pub target_lost: u32,
    pub path_recalculated: u32,
}

impl PursuitEventCounts {
    fn record(&mut self, kind: PursuitEventKind) {
        self.total = self.total.saturating_add(1);
        match kind {
            PursuitEventKind::TargetAcquired => {
                self.target_acquired = self.target_acquired.saturating_add(1)
            }
            PursuitEventKind::Attacked => self.attacked = self.attacked.saturating_add(1),
            PursuitEventKind::TargetLost => self.target_lost = self.target_lost.saturating_add(1),
            PursuitEventKind::PathRecalculated => {
                self.path_recalculated = self.path_recalculated.saturating_add(1)
            }
        }
    }
}

/// Per-tick pursuit events. `finish_tick_rollover` folds the tick's events
/// into counts and hands them to the caller.
#[derive(Debug, Default)]
pub struct PursuitEventBus {
    current_tick_events: Vec<PursuitEvent>,
    last_tick_counts: PursuitEventCounts,
}

impl PursuitEventBus {
    pub fn emit(&mut self, event: PursuitEvent) {
        self.current_tick_events.push(event);
    }

    pub fn iter_emitted_so_far(&self) -> impl Iterator<Item = &PursuitEvent> {
        self.current_tick_events.iter()
    }

    pub fn finish_tick_rollover(&mut self) -> Vec<PursuitEvent> {
        let mut counts = PursuitEventCounts::default();
        for event in &self.current_tick_events {
            counts.record(event.kind());
        }
        self.last_tick_counts = counts;
        std::mem::take(&mut self.current_tick_events)
    }

    pub fn last_tick_counts(&self) -> PursuitEventCounts {
        self.last_tick_counts
    }
}

pub struct PursuitContext<'a, G: TileGrid + ?Sized> {
    pub world: &'a EntityWorld,
    pub layer: &'a ColliderLayer,
    pub grid: &'a G,
}

/// Hostile behaviour bound to one entity. Idle while `target` is `None`;
/// otherwise chases the target along an `AiPath`.
#[derive(Debug)]
pub struct PursuitAgent {
    entity: EntityId,
    config: PursuitConfig,
    target: Option<EntityId>,
    path: Option<AiPath>,
    move_destination: Option<Vec2>,
    time_not_seeing_target: f32,
    time_to_recalculate_path: f32,
    attack_cooldown: f32,
}

impl PursuitAgent {
    pub fn new(entity: EntityId, config: PursuitConfig) -> Self {
        Self {
            entity,
            config,
            target: None,
            path: None,
            move_destination: None,
            time_not_seeing_target: 0.0,
            time_to_recalculate_path: 0.0,
            attack_cooldown: 0.0,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn config(&self) -> &PursuitConfig {
        &self.config
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    pub fn path(&self) -> Option<&AiPath> {
        self.path.as_ref()
    }

    /// Point the agent's entity should walk toward this tick.
    pub fn move_destination(&self) -> Option<Vec2> {
        self.move_destination
    }

    pub fn time_not_seeing_target(&self) -> f32 {
        self.time_not_seeing_target
    }

    pub fn tick<G: TileGrid + ?Sized>(
        &mut self,
        context: &PursuitContext<'_, G>,
        dt_seconds: f32,
        events: &mut PursuitEventBus,
    ) {
        let Some(agent) = context.world.find_entity(self.entity) else {
            self.forget_target();
            return;
        };

        let Some(target_id) = self.target else {
            self.search(context, agent, events);
            return;
        };

        let Some(target) = resolve_target(context.world, target_id) else {
            debug!(agent = self.entity.0, target = target_id.0, "target_vanished");
            self.forget_target();
            events.emit(PursuitEvent::TargetLost {
                agent: self.entity,
                target: target_id,
            });
            return;
        };

        let distance = agent.position.distance(target.position);

        if distance <= self.config.attack_range && self.attack_cooldown <= 0.0 {
            events.emit(PursuitEvent::Attacked {
                agent: self.entity,
                target: target_id,
            });
            self.attack_cooldown = self.config.attack_cooldown_seconds;
        } else {
            self.attack_cooldown = (self.attack_cooldown - dt_seconds).max(0.0);
        }

        if distance > self.config.vision_radius {
            self.time_not_seeing_target += dt_seconds;
        } else {
            self.time_not_seeing_target = 0.0;
        }

        if self.time_not_seeing_target > self.config.forget_after_seconds {
            info!(
                agent = self.entity.0,
                target = target_id.0,
                unseen_seconds = self.time_not_seeing_target,
                "target_lost"
            );
            self.forget_target();
            events.emit(PursuitEvent::TargetLost {
                agent: self.entity,
                target: target_id,
            });
            return;
        }

        if self.time_to_recalculate_path >= self.config.recalculate_interval_seconds {
            self.time_to_recalculate_path = 0.0;
            let status = match self.path.as_mut() {
                Some(path) => path.recalculate(context.grid, agent, target.position),
                None => {
                    let path = AiPath::new(context.grid, agent, target.position);
                    let status = path.status();
                    self.path = Some(path);
                    status
                }
            };
            events.emit(PursuitEvent::PathRecalculated {
                agent: self.entity,
                status,
            });
        } else {
            self.time_to_recalculate_path += dt_seconds;
        }

        self.advance(agent.position, dt_seconds);
    }

    fn search<G: TileGrid + ?Sized>(
        &mut self,
        context: &PursuitContext<'_, G>,
        agent: &Entity,
        events: &mut PursuitEventBus,
    ) {
        let vision_sq = self.config.vision_radius * self.config.vision_radius;
        let found = context.layer.dynamic_colliders().iter().find_map(|collider| {
            let owner = collider.entity()?;
            if owner == self.entity {
                return None;
            }
            if (collider.center() - agent.position).length_squared() > vision_sq {
                return None;
            }
            resolve_target(context.world, owner)
        });
        let Some(target) = found else {
            return;
        };

        info!(agent = self.entity.0, target = target.id.0, "target_acquired");
        self.target = Some(target.id);
        self.path = Some(AiPath::new(context.grid, agent, target.position));
        self.move_destination = None;
        self.time_not_seeing_target = 0.0;
        self.time_to_recalculate_path = 0.0;
        events.emit(PursuitEvent::TargetAcquired {
            agent: self.entity,
            target: target.id,
        });
    }

    fn advance(&mut self, position: Vec2, dt_seconds: f32) {
        let Some(path) = self.path.as_mut() else {
            return;
        };
        if path.is_done() {
            return;
        }

        let arrived = self.move_destination.map_or(true, |destination| {
            destination.distance(position) <= self.config.arrival_threshold
        });
        if arrived {
            self.move_destination = path.next();
        }

        if let (Some(destination), Some(second)) = (self.move_destination, path.second_next()) {
            let span = destination
                .distance(second)
                .max(self.config.min_smoothing_distance);
            let pull = dt_seconds * self.config.corner_smoothing / span;
            self.move_destination = Some(destination + (second - destination) * pull);
        }
    }

    fn forget_target(&mut self) {
        self.target = None;
        self.path = None;
        self.move_destination = None;
        self.time_not_seeing_target = 0.0;
        self.time_to_recalculate_path = 0.0;
    }
}

fn resolve_target(world: &EntityWorld, id: EntityId) -> Option<&Entity> {
    if world.is_pending_despawn(id) {
        return None;
    }
    world
        .find_entity(id)
        .filter(|entity| entity.pursuit_target && !entity.hostile)
}
