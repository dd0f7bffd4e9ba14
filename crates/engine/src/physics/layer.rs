use tracing::debug;

use crate::math::Vec2;

use super::collider::{Collider, ColliderDesc, ColliderId, COLLISION_EPSILON};
use super::events::{
    ColliderObservers, CollisionContact, CollisionPhase, PointerEvent, PointerPhase,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryScope {
    All,
    /// Only non-dynamic colliders, i.e. solid terrain.
    Static,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub enters: u32,
    pub stays: u32,
    pub leaves: u32,
    pub pruned: u32,
}

impl SweepReport {
    fn record(&mut self, phase: CollisionPhase) {
        match phase {
            CollisionPhase::Enter => self.enters = self.enters.saturating_add(1),
            CollisionPhase::Stay => self.stays = self.stays.saturating_add(1),
            CollisionPhase::Leave => self.leaves = self.leaves.saturating_add(1),
        }
    }
}

/// Ordered collider storage. Dynamic colliders always occupy a contiguous
/// prefix of `colliders`; `dynamic_len` marks where the static tail begins.
#[derive(Debug, Default)]
pub struct ColliderLayer {
    colliders: Vec<Collider>,
    dynamic_len: usize,
    next_id: u64,
}

impl ColliderLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, desc: ColliderDesc) -> ColliderId {
        let id = ColliderId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        let collider = Collider::from_desc(id, desc);
        if desc.dynamic {
            self.colliders.insert(self.dynamic_len, collider);
            self.dynamic_len += 1;
        } else {
            self.colliders.push(collider);
        }
        id
    }

    pub fn remove(&mut self, id: ColliderId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let removed = self.colliders.remove(index);
        if removed.is_dynamic() {
            self.dynamic_len -= 1;
        }
        for collider in &mut self.colliders {
            collider.intersecting.remove(&id);
        }
        true
    }

    /// Flags `id` for removal once the current or next sweep completes.
    pub fn mark_discarded(&mut self, id: ColliderId) -> bool {
        match self.get_mut(id) {
            Some(collider) => {
                collider.discarded = true;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders.iter().find(|collider| collider.id() == id)
    }

    pub fn get_mut(&mut self, id: ColliderId) -> Option<&mut Collider> {
        self.colliders.iter_mut().find(|collider| collider.id() == id)
    }

    pub fn observers_mut(&mut self, id: ColliderId) -> Option<&mut ColliderObservers> {
        self.get_mut(id).map(Collider::observers_mut)
    }

    pub fn set_center(&mut self, id: ColliderId, center: Vec2) -> bool {
        match self.get_mut(id) {
            Some(collider) => {
                collider.set_center(center);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    pub fn dynamic_len(&self) -> usize {
        self.dynamic_len
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collider> {
        self.colliders.iter()
    }

    pub fn dynamic_colliders(&self) -> &[Collider] {
        &self.colliders[..self.dynamic_len]
    }

    pub fn static_colliders(&self) -> &[Collider] {
        &self.colliders[self.dynamic_len..]
    }

    /// Sweeps every dynamic collider against every other collider and
    /// dispatches enter/stay/leave. Static colliders are never primary actors,
    /// so their side of each contact is mirrored from the dynamic one.
    pub fn check_collisions(&mut self) -> SweepReport {
        let mut report = SweepReport::default();
        let count = self.colliders.len();

        for a_index in 0..self.dynamic_len {
            for b_index in 0..count {
                if a_index == b_index {
                    continue;
                }

                let (a_id, a_entity, b_id, b_entity, b_static, now, was) = {
                    let a = &self.colliders[a_index];
                    let b = &self.colliders[b_index];
                    (
                        a.id(),
                        a.entity(),
                        b.id(),
                        b.entity(),
                        !b.is_dynamic(),
                        overlaps_at(a, a.center(), b),
                        a.is_intersecting(b.id()),
                    )
                };

                let phase = match (now, was) {
                    (true, true) => CollisionPhase::Stay,
                    (true, false) => CollisionPhase::Enter,
                    (false, true) => CollisionPhase::Leave,
                    (false, false) => continue,
                };

                match phase {
                    CollisionPhase::Enter => {
                        self.colliders[a_index].intersecting.insert(b_id);
                        if b_static {
                            self.colliders[b_index].intersecting.insert(a_id);
                        }
                    }
                    CollisionPhase::Leave => {
                        self.colliders[a_index].intersecting.remove(&b_id);
                        if b_static {
                            self.colliders[b_index].intersecting.remove(&a_id);
                        }
                    }
                    CollisionPhase::Stay => {}
                }

                self.colliders[a_index].observers_mut().dispatch_collision(
                    phase,
                    &CollisionContact {
                        this: a_id,
                        other: b_id,
                        other_entity: b_entity,
                    },
                );
                if b_static {
                    self.colliders[b_index].observers_mut().dispatch_collision(
                        phase,
                        &CollisionContact {
                            this: b_id,
                            other: a_id,
                            other_entity: a_entity,
                        },
                    );
                }
                report.record(phase);
            }
        }

        report.pruned = self.prune_discarded();
        report
    }

    /// Fires `click` on every collider containing `position`, not just the topmost.
    pub fn send_user_click(&mut self, position: Vec2) -> usize {
        let mut hits = 0usize;
        for collider in &mut self.colliders {
            if !collider.contains_point(position) {
                continue;
            }
            let event = PointerEvent {
                collider: collider.id(),
                entity: collider.entity(),
                position,
            };
            collider
                .observers_mut()
                .dispatch_pointer(PointerPhase::Click, &event);
            hits += 1;
        }
        hits
    }

    pub fn send_user_hover(&mut self, position: Vec2) -> usize {
        let mut transitions = 0usize;
        for collider in &mut self.colliders {
            let inside = collider.contains_point(position);
            let phase = match (inside, collider.hovered) {
                (true, false) => PointerPhase::Hover,
                (false, true) => PointerPhase::StopHover,
                _ => continue,
            };
            collider.hovered = inside;
            let event = PointerEvent {
                collider: collider.id(),
                entity: collider.entity(),
                position,
            };
            collider.observers_mut().dispatch_pointer(phase, &event);
            transitions += 1;
        }
        transitions
    }

    /// Whether collider `id` would overlap anything in `scope` if its center
    /// were at `position`. Nothing is mutated and no events fire.
    pub fn would_collide_at(&self, id: ColliderId, position: Vec2, scope: QueryScope) -> bool {
        let Some(subject) = self.get(id) else {
            return false;
        };
        let candidates = match scope {
            QueryScope::All => &self.colliders[..],
            QueryScope::Static => self.static_colliders(),
        };
        candidates
            .iter()
            .filter(|other| other.id() != id)
            .any(|other| overlaps_at(subject, position, other))
    }

    pub fn nondynamic_collision_at_position(&self, position: Vec2) -> bool {
        self.static_colliders()
            .iter()
            .any(|collider| collider.contains_point(position))
    }

    fn index_of(&self, id: ColliderId) -> Option<usize> {
        self.colliders.iter().position(|collider| collider.id() == id)
    }

    fn prune_discarded(&mut self) -> u32 {
        let discarded = self
            .colliders
            .iter()
            .filter(|collider| collider.is_discarded())
            .map(Collider::id)
            .collect::<Vec<_>>();
        for id in &discarded {
            self.remove(*id);
            debug!(collider = id.0, "collider_pruned");
        }
        discarded.len() as u32
    }
}

fn overlaps_at(subject: &Collider, subject_center: Vec2, other: &Collider) -> bool {
    let reach = subject.activation_radius() + other.activation_radius();
    if subject_center.distance(other.center()) - reach >= COLLISION_EPSILON {
        return false;
    }
    subject.intersects(other, Some(subject_center))
}
