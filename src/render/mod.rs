//! Render queues and the per-frame draw list handed to the renderer

use log::warn;

use crate::collision::{Collider, ColliderShape};
use crate::ecs::component::{ComponentHandle, ComponentKind, ImageState};
use crate::ecs::entity::EntityId;
use crate::ecs::world::World;
use crate::math::Vector2;

/// Where a drawable goes in its queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOrder {
    At(usize),
    Append,
}

impl From<Option<i32>> for RenderOrder {
    fn from(order_in_layer: Option<i32>) -> Self {
        match order_in_layer {
            Some(index) => RenderOrder::At(index.max(0) as usize),
            None => RenderOrder::Append,
        }
    }
}

/// Ordered list of drawables, earlier entries are drawn first
#[derive(Debug, Default)]
pub struct RenderQueue {
    entries: Vec<ComponentHandle>,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at `order`, clamped to the queue length. Returns the index used.
    pub fn insert(&mut self, handle: ComponentHandle, order: RenderOrder) -> usize {
        let index = match order {
            RenderOrder::At(index) => index.min(self.entries.len()),
            RenderOrder::Append => self.entries.len(),
        };
        self.entries.insert(index, handle);
        index
    }

    /// Remove the first drawable owned by `entity`
    pub fn remove(&mut self, entity: EntityId) -> Option<ComponentHandle> {
        let index = self.entries.iter().position(|h| h.entity == entity)?;
        Some(self.entries.remove(index))
    }

    pub fn remove_handle(&mut self, handle: ComponentHandle) -> bool {
        match self.position(handle) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Move a drawable by removing and reinserting it
    pub fn reorder(&mut self, handle: ComponentHandle, order: RenderOrder) -> Option<usize> {
        if !self.remove_handle(handle) {
            return None;
        }
        Some(self.insert(handle, order))
    }

    pub fn position(&self, handle: ComponentHandle) -> Option<usize> {
        self.entries.iter().position(|h| *h == handle)
    }

    pub fn entries(&self) -> &[ComponentHandle] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

/// World-space and screen-space queues
#[derive(Debug, Default)]
pub struct RenderQueues {
    pub world: RenderQueue,
    pub ui: RenderQueue,
}

impl RenderQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn clear(&mut self) {
        self.world.clear();
        self.ui.clear();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Visual {
    Image(ImageState),
    Tilemap {
        columns: usize,
        rows: usize,
        tile_size: Vector2,
        /// Row-major, `None` marks a cell with an unknown symbol
        cells: Vec<Option<ImageState>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub entity: EntityId,
    pub component: ComponentHandle,
    pub visual: Visual,
    pub position: Vector2,
    pub rotation: f32,
    pub scale: Vector2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DebugShape {
    pub handle: ComponentHandle,
    pub center: Vector2,
    pub shape: ColliderShape,
    pub is_trigger: bool,
}

/// Everything the renderer needs for one frame, in draw order
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderFrame {
    pub world: Vec<DrawItem>,
    pub ui: Vec<DrawItem>,
    pub debug: Vec<DebugShape>,
}

impl RenderFrame {
    pub fn len(&self) -> usize {
        self.world.len() + self.ui.len()
    }

    pub fn is_empty(&self) -> bool {
        self.world.is_empty() && self.ui.is_empty() && self.debug.is_empty()
    }
}

impl World {
    fn draw_item(&self, handle: ComponentHandle) -> Option<DrawItem> {
        let entity = self.entity(handle.entity)?;
        if !entity.is_active() {
            return None;
        }
        let component = entity.component(handle.component)?;
        if !component.enabled {
            return None;
        }
        let transform = entity.transform()?;
        let asset_root = self.config.asset_root.as_path();

        let mut position = transform.position;
        let visual = match component.kind() {
            ComponentKind::Sprite(sprite) => Visual::Image(sprite.image.resolve(asset_root).clone()),
            ComponentKind::UiSprite(sprite) => {
                position += sprite.offset + sprite.screen_anchor_offset;
                Visual::Image(sprite.image.resolve(asset_root).clone())
            }
            ComponentKind::Tilemap(tilemap) => {
                let definition = tilemap.definition();
                Visual::Tilemap {
                    columns: definition.map_width,
                    rows: definition.map_height,
                    tile_size: tilemap.tile_size(),
                    cells: tilemap
                        .cells()
                        .iter()
                        .map(|cell| cell.as_ref().map(|image| image.resolve(asset_root).clone()))
                        .collect(),
                }
            }
            other => {
                warn!("{} is not drawable", other.component_type());
                return None;
            }
        };

        Some(DrawItem {
            entity: entity.id(),
            component: handle,
            visual,
            position,
            rotation: transform.rotation,
            scale: transform.size,
        })
    }

    /// Build the draw lists from both queues and the debug collider list
    pub fn render_frame(&self) -> RenderFrame {
        let world = self
            .render_queues
            .world
            .entries()
            .iter()
            .filter_map(|handle| self.draw_item(*handle))
            .collect();
        let ui = self
            .render_queues
            .ui
            .entries()
            .iter()
            .filter_map(|handle| self.draw_item(*handle))
            .collect();

        let debug = self
            .colliders
            .debug()
            .iter()
            .filter_map(|handle| {
                let volume = self.collider_volume(*handle)?;
                let is_trigger = self.get::<Collider>(*handle)?.is_trigger;
                Some(DebugShape {
                    handle: *handle,
                    center: volume.center,
                    shape: volume.shape,
                    is_trigger,
                })
            })
            .collect();

        RenderFrame { world, ui, debug }
    }

    /// Change the order in layer of a Sprite or UISprite and move it in its queue
    pub fn set_order_in_layer(&mut self, handle: ComponentHandle, order_in_layer: i32) -> bool {
        let Some(component) = self.component_mut(handle) else {
            return false;
        };
        let in_ui = match component.kind_mut() {
            ComponentKind::Sprite(sprite) => {
                sprite.order_in_layer = Some(order_in_layer);
                false
            }
            ComponentKind::UiSprite(sprite) => {
                sprite.order_in_layer = Some(order_in_layer);
                true
            }
            _ => return false,
        };

        let queue = if in_ui {
            &mut self.render_queues.ui
        } else {
            &mut self.render_queues.world
        };
        queue
            .reorder(handle, RenderOrder::from(Some(order_in_layer)))
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::{Sprite, Transform, UiSprite};

    fn handle(entity: EntityId) -> ComponentHandle {
        ComponentHandle::new(entity, entity * 10)
    }

    #[test]
    fn test_insert_clamps_and_shifts() {
        let mut queue = RenderQueue::new();
        assert_eq!(queue.insert(handle(1), RenderOrder::Append), 0);
        assert_eq!(queue.insert(handle(2), RenderOrder::At(0)), 0);
        assert_eq!(queue.insert(handle(3), RenderOrder::At(99)), 2);
        assert_eq!(queue.insert(handle(4), RenderOrder::from(Some(-5))), 0);

        let order: Vec<EntityId> = queue.entries().iter().map(|h| h.entity).collect();
        assert_eq!(order, vec![4, 2, 1, 3]);
    }

    #[test]
    fn test_remove_and_reorder() {
        let mut queue = RenderQueue::new();
        for entity in 1..=4 {
            queue.insert(handle(entity), RenderOrder::Append);
        }

        assert_eq!(queue.remove(2), Some(handle(2)));
        assert_eq!(queue.remove(2), None);

        assert_eq!(queue.reorder(handle(4), RenderOrder::At(0)), Some(0));
        let order: Vec<EntityId> = queue.entries().iter().map(|h| h.entity).collect();
        assert_eq!(order, vec![4, 1, 3]);

        assert_eq!(queue.reorder(handle(9), RenderOrder::At(0)), None);
    }

    #[test]
    fn test_render_frame_follows_queue_order() {
        let mut world = World::default();
        let back = world
            .spawn(
                "Background",
                true,
                vec![Transform::at(Vector2::ZERO).into(), Sprite::new("bg.png").into()],
            )
            .unwrap();
        let front = world
            .spawn(
                "Player",
                true,
                vec![
                    Transform::at(Vector2::new(3.0, 4.0)).into(),
                    Sprite::new("player.png").into(),
                ],
            )
            .unwrap();
        let hidden = world
            .spawn(
                "Hidden",
                false,
                vec![Transform::at(Vector2::ZERO).into(), Sprite::new("x.png").into()],
            )
            .unwrap();
        world
            .spawn(
                "Health",
                true,
                vec![
                    Transform::at(Vector2::new(1.0, 1.0)).into(),
                    UiSprite::new("hp.png").with_order(0).into(),
                ],
            )
            .unwrap();

        let frame = world.render_frame();
        let drawn: Vec<EntityId> = frame.world.iter().map(|item| item.entity).collect();
        assert_eq!(drawn, vec![back, front]);
        assert!(!drawn.contains(&hidden));
        assert_eq!(frame.world[1].position, Vector2::new(3.0, 4.0));
        // Nothing exists under the default asset root
        assert_eq!(frame.world[0].visual, Visual::Image(ImageState::Placeholder));
        assert_eq!(frame.ui.len(), 1);
    }

    #[test]
    fn test_set_order_in_layer_moves_sprite() {
        let mut world = World::default();
        let mut handles = Vec::new();
        for name in ["A", "B", "C"] {
            let id = world
                .spawn(name, true, vec![Transform::at(Vector2::ZERO).into()])
                .unwrap();
            handles.push(world.add_component(id, Sprite::new("s.png")).unwrap());
        }

        assert!(world.set_order_in_layer(handles[2], 0));
        assert_eq!(
            world.render_queues().world.entries(),
            &[handles[2], handles[0], handles[1]]
        );
        assert_eq!(
            world.get::<Sprite>(handles[2]).unwrap().order_in_layer,
            Some(0)
        );
    }

    #[test]
    fn test_debug_shapes_follow_debug_list() {
        let mut world = World::default();
        let id = world
            .spawn("Wall", true, vec![Transform::at(Vector2::new(2.0, 0.0)).into()])
            .unwrap();
        let collider = world
            .add_component(
                id,
                Collider::new(ColliderShape::rectangle(4.0, 4.0)).with_debug_draw(true),
            )
            .unwrap();

        let frame = world.render_frame();
        assert_eq!(frame.debug.len(), 1);
        assert_eq!(frame.debug[0].handle, collider);
        assert_eq!(frame.debug[0].center, Vector2::new(2.0, 0.0));

        world.remove_component_by_id(collider);
        assert!(world.render_frame().debug.is_empty());

        assert!(World::default().render_frame().is_empty());
    }
}
