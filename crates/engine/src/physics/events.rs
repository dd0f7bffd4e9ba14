use std::fmt;

use crate::math::Vec2;
use crate::world::EntityId;

use super::collider::ColliderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionPhase {
    Enter,
    Stay,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerPhase {
    Click,
    Hover,
    StopHover,
}

/// Delivered to the collider identified by `this`; `other` is the collider it touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionContact {
    pub this: ColliderId,
    pub other: ColliderId,
    pub other_entity: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub collider: ColliderId,
    pub entity: Option<EntityId>,
    pub position: Vec2,
}

type CollisionHandler = Box<dyn FnMut(&CollisionContact)>;
type PointerHandler = Box<dyn FnMut(&PointerEvent)>;

/// Subscriber lists owned by a single collider.
///
/// Handlers run synchronously, in subscription order, on the tick that
/// produced the event. A handler cannot reach back into the layer that is
/// dispatching to it; gameplay code that needs to react with world changes
/// records what it saw and applies it after the sweep.
#[derive(Default)]
pub struct ColliderObservers {
    next_id: u64,
    collision: Vec<(SubscriptionId, CollisionPhase, CollisionHandler)>,
    pointer: Vec<(SubscriptionId, PointerPhase, PointerHandler)>,
}

impl ColliderObservers {
    pub fn subscribe_collision(
        &mut self,
        phase: CollisionPhase,
        handler: impl FnMut(&CollisionContact) + 'static,
    ) -> SubscriptionId {
        let id = self.alloc_id();
        self.collision.push((id, phase, Box::new(handler)));
        id
    }

    pub fn subscribe_pointer(
        &mut self,
        phase: PointerPhase,
        handler: impl FnMut(&PointerEvent) + 'static,
    ) -> SubscriptionId {
        let id = self.alloc_id();
        self.pointer.push((id, phase, Box::new(handler)));
        id
    }

    pub fn on_collision_enter(
        &mut self,
        handler: impl FnMut(&CollisionContact) + 'static,
    ) -> SubscriptionId {
        self.subscribe_collision(CollisionPhase::Enter, handler)
    }

    pub fn on_collision_stay(
        &mut self,
        handler: impl FnMut(&CollisionContact) + 'static,
    ) -> SubscriptionId {
        self.subscribe_collision(CollisionPhase::Stay, handler)
    }

    pub fn on_collision_leave(
        &mut self,
        handler: impl FnMut(&CollisionContact) + 'static,
    ) -> SubscriptionId {
        self.subscribe_collision(CollisionPhase::Leave, handler)
    }

    pub fn on_click(&mut self, handler: impl FnMut(&PointerEvent) + 'static) -> SubscriptionId {
        self.subscribe_pointer(PointerPhase::Click, handler)
    }

    pub fn on_hover(&mut self, handler: impl FnMut(&PointerEvent) + 'static) -> SubscriptionId {
        self.subscribe_pointer(PointerPhase::Hover, handler)
    }

    pub fn on_stop_hover(
        &mut self,
        handler: impl FnMut(&PointerEvent) + 'static,
    ) -> SubscriptionId {
        self.subscribe_pointer(PointerPhase::StopHover, handler)
    }

    /// Returns false when `id` was never issued by this list or is already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.collision.len() + self.pointer.len();
        self.collision.retain(|(entry_id, _, _)| *entry_id != id);
        self.pointer.retain(|(entry_id, _, _)| *entry_id != id);
        before != self.collision.len() + self.pointer.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.collision.len() + self.pointer.len()
    }

    pub(crate) fn dispatch_collision(&mut self, phase: CollisionPhase, contact: &CollisionContact) {
        for (_, entry_phase, handler) in &mut self.collision {
            if *entry_phase == phase {
                handler(contact);
            }
        }
    }

    pub(crate) fn dispatch_pointer(&mut self, phase: PointerPhase, event: &PointerEvent) {
        for (_, entry_phase, handler) in &mut self.pointer {
            if *entry_phase == phase {
                handler(event);
            }
        }
    }

    fn alloc_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }
}

impl fmt::Debug for ColliderObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColliderObservers")
            .field("collision_subscribers", &self.collision.len())
            .field("pointer_subscribers", &self.pointer.len())
            .finish()
    }
}
