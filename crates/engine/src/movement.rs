use crate::math::Vec2;
use crate::physics::{ColliderLayer, QueryScope};
use crate::world::Entity;

pub const BACKOFF_FRACTION: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FavoredAxes {
    Both,
    X,
    Y,
}

impl FavoredAxes {
    fn x(self) -> bool {
        matches!(self, Self::Both | Self::X)
    }

    fn y(self) -> bool {
        matches!(self, Self::Both | Self::Y)
    }
}

/// Shrinks `desired` until the entity's collider no longer overlaps solid
/// terrain. Passes: both axes, X alone, Y alone.
pub fn resolve_step(layer: &ColliderLayer, entity: &Entity, desired: Vec2) -> Vec2 {
    let Some(collider_id) = entity.collider else {
        return desired;
    };
    let Some(origin) = layer.get(collider_id).map(|collider| collider.center()) else {
        return desired;
    };
    let blocked =
        |step: Vec2| layer.would_collide_at(collider_id, origin + step, QueryScope::Static);

    let mut resolved = desired;
    for favored in [FavoredAxes::Both, FavoredAxes::X, FavoredAxes::Y] {
        resolved = backoff_pass(favored, desired, resolved, &blocked);
    }
    resolved
}

fn backoff_pass(
    favored: FavoredAxes,
    intended: Vec2,
    mut current: Vec2,
    blocked: &impl Fn(Vec2) -> bool,
) -> Vec2 {
    if favored.x() {
        current.x = intended.x;
    }
    if favored.y() {
        current.y = intended.y;
    }

    let mut fraction = 0.0f32;
    while fraction < 1.0 && blocked(current) {
        fraction = (fraction + BACKOFF_FRACTION).min(1.0);
        let keep = 1.0 - fraction;
        if favored.x() {
            current.x = intended.x * keep;
        }
        if favored.y() {
            current.y = intended.y * keep;
        }
    }
    current
}

pub fn intent_delta(intent: Vec2, speed: f32, fixed_dt_seconds: f32) -> Vec2 {
    intent.normalized_or_zero() * (speed * fixed_dt_seconds)
}

pub fn step_toward(
    current: Vec2,
    target: Vec2,
    speed: f32,
    fixed_dt_seconds: f32,
    arrival_threshold: f32,
) -> (Vec2, bool) {
    let offset = target - current;
    let distance_sq = offset.length_squared();
    let threshold_sq = arrival_threshold * arrival_threshold;
    if distance_sq <= threshold_sq {
        return (target, true);
    }

    let distance = distance_sq.sqrt();
    let max_step = speed * fixed_dt_seconds;
    if max_step >= distance {
        return (target, true);
    }

    let inv_distance = distance.recip();
    (current + offset * (inv_distance * max_step), false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::ColliderDesc;
    use crate::world::{EntityId, EntitySpawn, EntityWorld};

    fn walker(layer: &mut ColliderLayer, position: Vec2, radius: f32) -> Entity {
        let mut world = EntityWorld::default();
        let id = world.spawn(EntitySpawn::new("walker", position));
        world.apply_pending();
        let collider = layer.add(ColliderDesc::circle(position, radius).dynamic().with_entity(id));
        let mut entity = world.find_entity(id).cloned().expect("walker");
        entity.collider = Some(collider);
        entity
    }

    #[test]
    fn entity_without_collider_moves_freely() {
        let mut layer = ColliderLayer::new();
        layer.add(ColliderDesc::rect(Vec2::new(10.0, 0.0), 16.0, 16.0));
        let mut world = EntityWorld::default();
        let id = world.spawn(EntitySpawn::new("ghost", Vec2::ZERO));
        world.apply_pending();
        let ghost = world.find_entity(id).expect("ghost");

        let desired = Vec2::new(12.0, -3.0);
        assert_eq!(resolve_step(&layer, ghost, desired), desired);
    }

    #[test]
    fn open_ground_keeps_full_step() {
        let mut layer = ColliderLayer::new();
        let entity = walker(&mut layer, Vec2::new(8.0, 8.0), 4.0);
        let desired = Vec2::new(2.0, 1.5);
        assert_eq!(resolve_step(&layer, &entity, desired), desired);
    }

    #[test]
    fn blocked_axis_stops_and_free_axis_slides() {
        let mut layer = ColliderLayer::new();
        layer.add(ColliderDesc::rect(Vec2::new(40.0, 8.0), 16.0, 16.0));
        let entity = walker(&mut layer, Vec2::new(27.5, 8.0), 4.0);

        let resolved = resolve_step(&layer, &entity, Vec2::new(4.0, 3.0));
        assert!(resolved.x.abs() < 1e-6, "{resolved:?}");
        assert!((resolved.y - 3.0).abs() < 1e-6, "{resolved:?}");
        let collider = entity.collider.expect("collider");
        assert!(!layer.would_collide_at(
            collider,
            Vec2::new(27.5, 8.0) + resolved,
            QueryScope::Static
        ));
    }

    #[test]
    fn backoff_never_flips_direction() {
        let mut layer = ColliderLayer::new();
        layer.add(ColliderDesc::rect(Vec2::new(40.0, 8.0), 16.0, 16.0));
        let entity = walker(&mut layer, Vec2::new(25.0, 8.0), 4.0);

        let resolved = resolve_step(&layer, &entity, Vec2::new(8.0, 0.0));
        assert!(resolved.x >= 0.0);
        assert!(resolved.x < 8.0);
        assert_eq!(resolved.y, 0.0);
    }

    #[test]
    fn dynamic_colliders_do_not_block_steps() {
        let mut layer = ColliderLayer::new();
        let entity = walker(&mut layer, Vec2::new(8.0, 8.0), 4.0);
        layer.add(
            ColliderDesc::circle(Vec2::new(14.0, 8.0), 4.0)
                .dynamic()
                .with_entity(EntityId(99)),
        );

        let desired = Vec2::new(3.0, 0.0);
        assert_eq!(resolve_step(&layer, &entity, desired), desired);
    }

    #[test]
    fn step_toward_arrives_within_threshold() {
        let (position, arrived) =
            step_toward(Vec2::ZERO, Vec2::new(10.0, 0.0), 60.0, 1.0 / 60.0, 0.1);
        assert!(!arrived);
        assert!((position.x - 1.0).abs() < 1e-5);

        let (position, arrived) =
            step_toward(Vec2::new(9.95, 0.0), Vec2::new(10.0, 0.0), 60.0, 1.0 / 60.0, 0.1);
        assert!(arrived);
        assert_eq!(position, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn diagonal_intent_is_normalized() {
        let delta = intent_delta(Vec2::new(1.0, 1.0), 30.0, 0.5);
        assert!((delta.length() - 15.0).abs() < 1e-4);
        assert_eq!(intent_delta(Vec2::ZERO, 30.0, 0.5), Vec2::ZERO);
    }
}
