mod collider;
mod events;
mod layer;

pub use collider::{shapes_intersect, Collider, ColliderDesc, ColliderId, Shape, COLLISION_EPSILON};
pub use events::{
    ColliderObservers, CollisionContact, CollisionPhase, PointerEvent, PointerPhase,
    SubscriptionId,
};
pub use layer::{ColliderLayer, QueryScope, SweepReport};
