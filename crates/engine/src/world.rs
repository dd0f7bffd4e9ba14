use crate::math::Vec2;
use crate::physics::ColliderId;

/// Non-owning entity handle. Once the entity is despawned the handle simply
/// stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub position: Vec2,
    pub collider: Option<ColliderId>,
    /// Hostile agents may pick this entity as a pursuit target.
    pub pursuit_target: bool,
    /// Never chosen as a pursuit target, even when flagged as one.
    pub hostile: bool,
    pub move_speed: f32,
    pub move_intent: Vec2,
    pub move_destination: Option<Vec2>,
    pub debug_name: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntitySpawn {
    pub position: Vec2,
    pub pursuit_target: bool,
    pub hostile: bool,
    pub move_speed: f32,
    pub debug_name: &'static str,
}

impl EntitySpawn {
    pub fn new(debug_name: &'static str, position: Vec2) -> Self {
        Self {
            position,
            pursuit_target: false,
            hostile: false,
            move_speed: 0.0,
            debug_name,
        }
    }

    pub fn pursuit_target(mut self) -> Self {
        self.pursuit_target = true;
        self
    }

    pub fn hostile(mut self) -> Self {
        self.hostile = true;
        self
    }

    pub fn with_move_speed(mut self, move_speed: f32) -> Self {
        self.move_speed = move_speed;
        self
    }
}

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Entity table. Spawns and despawns are queued and take effect on
/// `apply_pending`, which the simulation calls at tick boundaries.
#[derive(Debug, Default)]
pub struct EntityWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
}

impl EntityWorld {
    pub fn spawn(&mut self, spawn: EntitySpawn) -> EntityId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Entity {
            id,
            position: spawn.position,
            collider: None,
            pursuit_target: spawn.pursuit_target,
            hostile: spawn.hostile,
            move_speed: spawn.move_speed,
            move_intent: Vec2::ZERO,
            move_destination: None,
            debug_name: spawn.debug_name,
        });
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.entities.iter().any(|entity| entity.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort_by_key(|id| id.0);
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.entities.retain(|entity| {
                pending
                    .binary_search_by_key(&entity.id.0, |id| id.0)
                    .is_err()
            });
            self.pending_spawns.retain(|entity| {
                pending
                    .binary_search_by_key(&entity.id.0, |id| id.0)
                    .is_err()
            });
            self.pending_despawns.clear();
        }

        self.entities.append(&mut self.pending_spawns);
    }

    /// Pending spawns are visible here so callers can attach colliders before
    /// the next tick boundary.
    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities
            .iter()
            .chain(self.pending_spawns.iter())
            .find(|entity| entity.id == id)
    }

    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities
            .iter_mut()
            .chain(self.pending_spawns.iter_mut())
            .find(|entity| entity.id == id)
    }

    pub fn is_pending_despawn(&self, id: EntityId) -> bool {
        self.pending_despawns.contains(&id)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}
