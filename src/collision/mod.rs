use serde::{Deserialize, Serialize};

use crate::ecs::component::{ComponentHandle, ComponentType, Transform};
use crate::ecs::entity::EntityId;
use crate::ecs::world::World;
use crate::math::Vector2;

/// Axis aligned box, `size` is the full width and height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxCollider {
    pub size: Vector2,
}

impl BoxCollider {
    pub fn half_extents(&self) -> Vector2 {
        self.size.abs() / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleCollider {
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Box(BoxCollider),
    Circle(CircleCollider),
}

impl ColliderShape {
    pub fn rectangle(width: f32, height: f32) -> Self {
        ColliderShape::Box(BoxCollider {
            size: Vector2::new(width, height),
        })
    }

    pub fn circle(radius: f32) -> Self {
        ColliderShape::Circle(CircleCollider { radius })
    }
}

/// Collider component, either a box or a circle
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    pub shape: ColliderShape,
    /// Offset of the collider center from the owner's position
    pub offset: Vector2,
    pub is_trigger: bool,
    pub tag: String,
    pub debug_draw: bool,
}

impl Collider {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            offset: Vector2::ZERO,
            is_trigger: false,
            tag: String::new(),
            debug_draw: false,
        }
    }

    pub fn with_offset(mut self, offset: Vector2) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_trigger(mut self, is_trigger: bool) -> Self {
        self.is_trigger = is_trigger;
        self
    }

    pub fn with_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_debug_draw(mut self, debug_draw: bool) -> Self {
        self.debug_draw = debug_draw;
        self
    }

    /// Concrete discriminator of this collider
    pub fn component_type(&self) -> ComponentType {
        match self.shape {
            ColliderShape::Box(_) => ComponentType::BoxCollider,
            ColliderShape::Circle(_) => ComponentType::CircleCollider,
        }
    }

    pub fn as_box(&self) -> Option<&BoxCollider> {
        match &self.shape {
            ColliderShape::Box(shape) => Some(shape),
            ColliderShape::Circle(_) => None,
        }
    }

    pub fn as_circle(&self) -> Option<&CircleCollider> {
        match &self.shape {
            ColliderShape::Circle(shape) => Some(shape),
            ColliderShape::Box(_) => None,
        }
    }

    /// World-space volume of this collider for an owner at `transform`
    pub fn volume(&self, transform: &Transform) -> ColliderVolume {
        ColliderVolume {
            center: transform.position + self.offset,
            shape: self.shape,
        }
    }
}

/// Collider shape placed in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderVolume {
    pub center: Vector2,
    pub shape: ColliderShape,
}

impl ColliderVolume {
    /// Strict overlap test, touching edges do not count
    pub fn intersects(&self, other: &ColliderVolume) -> bool {
        match (self.shape, other.shape) {
            (ColliderShape::Box(a), ColliderShape::Box(b)) => {
                let delta = (self.center - other.center).abs();
                let reach = a.half_extents() + b.half_extents();
                delta.x < reach.x && delta.y < reach.y
            }
            (ColliderShape::Circle(a), ColliderShape::Circle(b)) => {
                let reach = a.radius + b.radius;
                (self.center - other.center).magnitude_squared() < reach * reach
            }
            (ColliderShape::Box(rect), ColliderShape::Circle(circle)) => {
                box_circle(self.center, &rect, other.center, &circle)
            }
            (ColliderShape::Circle(circle), ColliderShape::Box(rect)) => {
                box_circle(other.center, &rect, self.center, &circle)
            }
        }
    }

    pub fn contains_point(&self, point: Vector2) -> bool {
        match self.shape {
            ColliderShape::Box(rect) => {
                let delta = (point - self.center).abs();
                let half = rect.half_extents();
                delta.x < half.x && delta.y < half.y
            }
            ColliderShape::Circle(circle) => {
                (point - self.center).magnitude_squared() < circle.radius * circle.radius
            }
        }
    }
}

fn box_circle(
    box_center: Vector2,
    rect: &BoxCollider,
    circle_center: Vector2,
    circle: &CircleCollider,
) -> bool {
    let half = rect.half_extents();
    let closest = Vector2::new(
        circle_center.x.max(box_center.x - half.x).min(box_center.x + half.x),
        circle_center.y.max(box_center.y - half.y).min(box_center.y + half.y),
    );
    (circle_center - closest).magnitude_squared() < circle.radius * circle.radius
}

/// Flat list of every live collider, plus the subset drawn by the debug overlay
#[derive(Debug, Default)]
pub struct ColliderRegistry {
    active: Vec<ComponentHandle>,
    debug: Vec<ComponentHandle>,
}

impl ColliderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, handle: ComponentHandle, debug_draw: bool) {
        if !self.active.contains(&handle) {
            self.active.push(handle);
        }
        if debug_draw && !self.debug.contains(&handle) {
            self.debug.push(handle);
        }
    }

    pub(crate) fn unregister(&mut self, handle: ComponentHandle) {
        self.active.retain(|h| *h != handle);
        self.debug.retain(|h| *h != handle);
    }

    pub fn iter(&self) -> impl Iterator<Item = ComponentHandle> + '_ {
        self.active.iter().copied()
    }

    pub fn debug(&self) -> &[ComponentHandle] {
        &self.debug
    }

    pub fn contains(&self, handle: ComponentHandle) -> bool {
        self.active.contains(&handle)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.active.clear();
        self.debug.clear();
    }
}

impl World {
    /// World-space volume of an enabled collider on an active entity
    pub fn collider_volume(&self, handle: ComponentHandle) -> Option<ColliderVolume> {
        let entity = self.entity(handle.entity)?;
        if !entity.is_active() {
            return None;
        }
        let component = entity.component(handle.component)?;
        if !component.enabled {
            return None;
        }
        let collider = component.view::<Collider>()?;
        Some(collider.volume(entity.transform()?))
    }

    fn collider_ref(&self, handle: ComponentHandle) -> Option<&Collider> {
        self.get::<Collider>(handle)
    }

    /// Whether two colliders currently overlap
    pub fn is_colliding(&self, a: ComponentHandle, b: ComponentHandle) -> bool {
        match (self.collider_volume(a), self.collider_volume(b)) {
            (Some(a), Some(b)) => a.intersects(&b),
            _ => false,
        }
    }

    /// Every other collider overlapping `handle`
    ///
    /// Triggers are only returned when `include_triggers` is set.
    pub fn overlap_collider(
        &self,
        handle: ComponentHandle,
        include_triggers: bool,
    ) -> Vec<ComponentHandle> {
        let Some(volume) = self.collider_volume(handle) else {
            return Vec::new();
        };

        self.colliders
            .iter()
            .filter(|other| *other != handle)
            .filter(|other| {
                include_triggers
                    || self
                        .collider_ref(*other)
                        .is_some_and(|collider| !collider.is_trigger)
            })
            .filter(|other| {
                self.collider_volume(*other)
                    .is_some_and(|other| other.intersects(&volume))
            })
            .collect()
    }

    /// Colliders whose volume contains a world-space point
    pub fn overlap_point(&self, point: Vector2, include_triggers: bool) -> Vec<ComponentHandle> {
        self.colliders
            .iter()
            .filter(|handle| {
                include_triggers
                    || self
                        .collider_ref(*handle)
                        .is_some_and(|collider| !collider.is_trigger)
            })
            .filter(|handle| {
                self.collider_volume(*handle)
                    .is_some_and(|volume| volume.contains_point(point))
            })
            .collect()
    }

    pub fn colliders_with_tag(&self, tag: &str) -> Vec<ComponentHandle> {
        self.colliders
            .iter()
            .filter(|handle| {
                self.collider_ref(*handle)
                    .is_some_and(|collider| collider.tag == tag)
            })
            .collect()
    }

    /// Entities owning a collider that overlaps `handle`, deduplicated
    pub fn overlapping_entities(
        &self,
        handle: ComponentHandle,
        include_triggers: bool,
    ) -> Vec<EntityId> {
        let mut owners: Vec<EntityId> = self
            .overlap_collider(handle, include_triggers)
            .into_iter()
            .map(|other| other.entity)
            .collect();
        owners.sort_unstable();
        owners.dedup();
        owners
    }
}
