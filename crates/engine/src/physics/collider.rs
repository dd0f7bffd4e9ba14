use std::collections::HashSet;

use crate::math::Vec2;
use crate::world::EntityId;

use super::events::ColliderObservers;

/// Absorbs floating point noise at circle boundaries and in the sweep's cheap reject.
pub const COLLISION_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderId(pub u64);

/// Collider geometry. Dimensions are fixed once a collider is built; only the
/// center moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { radius: f32 },
    Box { half_width: f32, half_height: f32 },
}

impl Shape {
    pub fn circle(radius: f32) -> Self {
        Self::Circle {
            radius: radius.abs(),
        }
    }

    /// Axis-aligned box from its full width and height.
    pub fn rect(width: f32, height: f32) -> Self {
        Self::Box {
            half_width: width.abs() * 0.5,
            half_height: height.abs() * 0.5,
        }
    }

    /// Conservative bound: no point of the shape lies farther than this from the center.
    pub fn activation_radius(&self) -> f32 {
        match *self {
            Self::Circle { radius } => radius,
            Self::Box {
                half_width,
                half_height,
            } => (half_width * half_width + half_height * half_height).sqrt(),
        }
    }

    pub fn contains_point(&self, center: Vec2, point: Vec2) -> bool {
        match *self {
            Self::Circle { radius } => center.distance(point) <= radius + COLLISION_EPSILON,
            // Half-open on the high side so adjacent tiles never both own a shared edge.
            Self::Box {
                half_width,
                half_height,
            } => {
                point.x >= center.x - half_width
                    && point.x < center.x + half_width
                    && point.y >= center.y - half_height
                    && point.y < center.y + half_height
            }
        }
    }

    /// Point on this shape's boundary in the direction of `toward`, for a shape
    /// centered at `center`.
    pub fn find_border_point(&self, center: Vec2, toward: Vec2) -> Vec2 {
        let offset = toward - center;
        if offset == Vec2::ZERO {
            return center;
        }
        match *self {
            Self::Circle { radius } => center + offset.normalized_or_zero() * radius,
            Self::Box {
                half_width,
                half_height,
            } => {
                let abs_x = offset.x.abs();
                let abs_y = offset.y.abs();
                if abs_x > abs_y {
                    Vec2 {
                        x: center.x + half_width.copysign(offset.x),
                        y: toward
                            .y
                            .clamp(center.y - half_height, center.y + half_height),
                    }
                } else if abs_y > abs_x {
                    Vec2 {
                        x: toward.x.clamp(center.x - half_width, center.x + half_width),
                        y: center.y + half_height.copysign(offset.y),
                    }
                } else {
                    Vec2 {
                        x: center.x + half_width.copysign(offset.x),
                        y: center.y + half_height.copysign(offset.y),
                    }
                }
            }
        }
    }
}

/// Two-sided border point test. Either shape's border point, taken toward the
/// other's center, landing inside the other shape counts as an intersection.
pub fn shapes_intersect(a: &Shape, a_center: Vec2, b: &Shape, b_center: Vec2) -> bool {
    let a_border = a.find_border_point(a_center, b_center);
    if b.contains_point(b_center, a_border) {
        return true;
    }
    let b_border = b.find_border_point(b_center, a_center);
    a.contains_point(a_center, b_border)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderDesc {
    pub shape: Shape,
    pub center: Vec2,
    pub dynamic: bool,
    pub entity: Option<EntityId>,
}

impl ColliderDesc {
    pub fn circle(center: Vec2, radius: f32) -> Self {
        Self {
            shape: Shape::circle(radius),
            center,
            dynamic: false,
            entity: None,
        }
    }

    pub fn rect(center: Vec2, width: f32, height: f32) -> Self {
        Self {
            shape: Shape::rect(width, height),
            center,
            dynamic: false,
            entity: None,
        }
    }

    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }

    pub fn with_entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }
}

#[derive(Debug)]
pub struct Collider {
    id: ColliderId,
    center: Vec2,
    shape: Shape,
    dynamic: bool,
    entity: Option<EntityId>,
    pub(crate) intersecting: HashSet<ColliderId>,
    pub(crate) hovered: bool,
    pub(crate) discarded: bool,
    observers: ColliderObservers,
}

impl Collider {
    pub(crate) fn from_desc(id: ColliderId, desc: ColliderDesc) -> Self {
        Self {
            id,
            center: desc.center,
            shape: desc.shape,
            dynamic: desc.dynamic,
            entity: desc.entity,
            intersecting: HashSet::new(),
            hovered: false,
            discarded: false,
            observers: ColliderObservers::default(),
        }
    }

    pub fn id(&self) -> ColliderId {
        self.id
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn set_center(&mut self, center: Vec2) {
        self.center = center;
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn entity(&self) -> Option<EntityId> {
        self.entity
    }

    pub fn activation_radius(&self) -> f32 {
        self.shape.activation_radius()
    }

    pub fn is_intersecting(&self, other: ColliderId) -> bool {
        self.intersecting.contains(&other)
    }

    pub fn intersecting_count(&self) -> usize {
        self.intersecting.len()
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn is_discarded(&self) -> bool {
        self.discarded
    }

    pub fn observers(&self) -> &ColliderObservers {
        &self.observers
    }

    pub fn observers_mut(&mut self) -> &mut ColliderObservers {
        &mut self.observers
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        self.shape.contains_point(self.center, point)
    }

    /// `from` overrides this collider's center for the query.
    pub fn find_border_point(&self, toward: Vec2, from: Option<Vec2>) -> Vec2 {
        self.shape
            .find_border_point(from.unwrap_or(self.center), toward)
    }

    /// `self_center` evaluates the test as if this collider sat there instead.
    pub fn intersects(&self, other: &Collider, self_center: Option<Vec2>) -> bool {
        shapes_intersect(
            &self.shape,
            self_center.unwrap_or(self.center),
            &other.shape,
            other.center,
        )
    }
}
