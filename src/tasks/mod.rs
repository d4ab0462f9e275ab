//! Cancellable work scheduled to run some milliseconds after a component
//! is initialized

use log::{debug, info};

use crate::collision::{Collider, ColliderShape};
use crate::ecs::component::{ComponentHandle, ComponentId};
use crate::ecs::entity::EntityId;
use crate::ecs::world::World;
use crate::inventory::{DroppedItem, Inventory};
use crate::math::Vector2;

pub type TaskId = u64;

pub const INTERACT_TAG: &str = "Interactible";
pub const DROPPED_ITEM_TAG: &str = "droppedItem";

/// Work a component asks to have done later
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    /// Give a non-player inventory its interact collider
    SetupInteractCollider { inventory: ComponentId },
    /// Give a dropped item its collection hitbox
    AddDroppedItemHitbox { dropped_item: ComponentId },
    EnableComponent { component: ComponentId },
}

impl DeferredAction {
    /// Component the action operates on
    pub fn target(&self) -> ComponentId {
        match *self {
            DeferredAction::SetupInteractCollider { inventory } => inventory,
            DeferredAction::AddDroppedItemHitbox { dropped_item } => dropped_item,
            DeferredAction::EnableComponent { component } => component,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredTask {
    pub id: TaskId,
    pub owner: EntityId,
    pub due_ms: u64,
    pub action: DeferredAction,
}

/// Pending tasks ordered by due time, then by scheduling order
#[derive(Debug, Default)]
pub struct TaskQueue {
    now_ms: u64,
    next_id: TaskId,
    pending: Vec<DeferredTask>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of the task clock
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn schedule(&mut self, owner: EntityId, delay_ms: u64, action: DeferredAction) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push(DeferredTask {
            id,
            owner,
            due_ms: self.now_ms + delay_ms,
            action,
        });
        debug!("Task #{id} {action:?} scheduled in {delay_ms} ms for entity #{owner}");
        id
    }

    /// Drop every task owned by `owner`, returning how many were dropped
    pub fn cancel_owner(&mut self, owner: EntityId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|task| task.owner != owner);
        before - self.pending.len()
    }

    pub fn cancel_component(&mut self, handle: ComponentHandle) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|task| !(task.owner == handle.entity && task.action.target() == handle.component));
        before - self.pending.len()
    }

    pub fn advance(&mut self, elapsed_ms: u64) {
        self.now_ms += elapsed_ms;
    }

    /// Remove and return every task that is due, earliest first
    pub fn take_due(&mut self) -> Vec<DeferredTask> {
        let now = self.now_ms;
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|task| task.due_ms <= now);
        self.pending = pending;
        due.sort_by_key(|task| (task.due_ms, task.id));
        due
    }

    pub fn pending(&self) -> &[DeferredTask] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }
}

impl World {
    /// Advance the task clock and run whatever became due
    ///
    /// Tasks scheduled by a running task wait for a later call.
    pub fn run_deferred_tasks(&mut self, elapsed_ms: u64) -> usize {
        self.tasks.advance(elapsed_ms);
        let due = self.tasks.take_due();
        let mut ran = 0;
        for task in due {
            let target = ComponentHandle::new(task.owner, task.action.target());
            if self.component(target).is_none() {
                debug!("Task #{} skipped, its component is gone", task.id);
                continue;
            }
            self.run_task(target, task.action);
            ran += 1;
        }
        ran
    }

    fn run_task(&mut self, target: ComponentHandle, action: DeferredAction) {
        match action {
            DeferredAction::SetupInteractCollider { .. } => self.setup_interact_collider(target),
            DeferredAction::AddDroppedItemHitbox { .. } => self.add_dropped_item_hitbox(target),
            DeferredAction::EnableComponent { .. } => {
                if let Some(component) = self.component_mut(target) {
                    component.enabled = true;
                }
            }
        }
    }

    fn setup_interact_collider(&mut self, inventory: ComponentHandle) {
        let Some(state) = self.get::<Inventory>(inventory) else {
            return;
        };
        if state.is_player_inventory() || state.interact_collider().is_some() {
            return;
        }

        let collider = Collider::new(ColliderShape::circle(self.config.inventory.interact_range))
            .with_tag(INTERACT_TAG)
            .with_trigger(true)
            .with_debug_draw(self.config.debug_draw);
        let Ok(handle) = self.add_component(inventory.entity, collider) else {
            return;
        };
        if let Some(state) = self.get_mut::<Inventory>(inventory) {
            state.set_interact_collider(handle.component);
        }
        info!(
            "Interact collider set up for entity \"{}\"",
            self.entity_label(inventory.entity)
        );
    }

    fn add_dropped_item_hitbox(&mut self, dropped_item: ComponentHandle) {
        let already_set = self
            .get::<DroppedItem>(dropped_item)
            .map_or(true, |state| state.collection_hitbox().is_some());
        if already_set {
            return;
        }

        let size = self.config.inventory.dropped_item_hitbox_size;
        let hitbox = Collider::new(ColliderShape::rectangle(size, size))
            .with_tag(DROPPED_ITEM_TAG)
            .with_trigger(true)
            .with_debug_draw(self.config.debug_draw);
        let Ok(handle) = self.add_component(dropped_item.entity, hitbox) else {
            return;
        };
        if let Some(state) = self.get_mut::<DroppedItem>(dropped_item) {
            state.set_collection_hitbox(handle.component);
        }

        let scale = self.config.inventory.dropped_item_scale;
        if let Some(entity) = self.entity_mut(dropped_item.entity) {
            if let Some(transform) = entity.transform_mut() {
                transform.size = Vector2::ONE * scale;
            }
        }
    }

    /// Actions still waiting to run for an entity
    pub fn pending_tasks_for(&self, entity: EntityId) -> Vec<DeferredAction> {
        self.tasks
            .pending()
            .iter()
            .filter(|task| task.owner == entity)
            .map(|task| task.action)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::Transform;
    use crate::inventory::ItemStack;

    #[test]
    fn test_take_due_orders_and_removes() {
        let mut queue = TaskQueue::new();
        queue.schedule(1, 30, DeferredAction::EnableComponent { component: 1 });
        queue.schedule(2, 10, DeferredAction::EnableComponent { component: 2 });
        queue.schedule(3, 10, DeferredAction::EnableComponent { component: 3 });

        queue.advance(9);
        assert!(queue.take_due().is_empty());

        queue.advance(1);
        let owners: Vec<EntityId> = queue.take_due().iter().map(|t| t.owner).collect();
        assert_eq!(owners, vec![2, 3]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_cancel() {
        let mut queue = TaskQueue::new();
        queue.schedule(1, 10, DeferredAction::EnableComponent { component: 4 });
        queue.schedule(1, 10, DeferredAction::AddDroppedItemHitbox { dropped_item: 5 });
        queue.schedule(2, 10, DeferredAction::EnableComponent { component: 4 });

        assert_eq!(queue.cancel_component(ComponentHandle::new(1, 5)), 1);
        assert_eq!(queue.cancel_owner(1), 1);
        assert_eq!(queue.pending()[0].owner, 2);
    }

    #[test]
    fn test_interact_collider_appears_after_delay() {
        let mut world = World::default();
        let id = world
            .spawn(
                "Chest",
                true,
                vec![
                    Transform::at(Vector2::new(100.0, 0.0)).into(),
                    Inventory::new(false).into(),
                ],
            )
            .unwrap();
        assert!(world.get_component::<Collider>(id).is_none());

        world.run_deferred_tasks(5);
        assert!(world.get_component::<Collider>(id).is_none());

        assert_eq!(world.run_deferred_tasks(5), 1);
        let collider = world.get_component::<Collider>(id).unwrap();
        assert_eq!(collider.tag, INTERACT_TAG);
        assert!(collider.is_trigger);
        assert_eq!(collider.as_circle().unwrap().radius, 75.0);
        assert_eq!(world.colliders_with_tag(INTERACT_TAG).len(), 1);
    }

    #[test]
    fn test_player_inventory_gets_no_collider() {
        let mut world = World::default();
        let id = world
            .spawn(
                "Player",
                true,
                vec![Transform::at(Vector2::ZERO).into(), Inventory::new(true).into()],
            )
            .unwrap();
        world.run_deferred_tasks(100);
        assert!(world.get_component::<Collider>(id).is_none());
        assert!(world.player_inventory().is_some());
    }

    #[test]
    fn test_task_of_destroyed_owner_does_nothing() {
        let mut world = World::default();
        let id = world
            .spawn(
                "Chest",
                true,
                vec![Transform::at(Vector2::ZERO).into(), Inventory::new(false).into()],
            )
            .unwrap();
        assert_eq!(world.tasks().len(), 1);

        world.destroy_entity(id);
        assert!(world.tasks().is_empty());
        assert_eq!(world.run_deferred_tasks(50), 0);
        assert!(world.colliders().is_empty());
    }

    #[test]
    fn test_task_of_removed_component_does_nothing() {
        let mut world = World::default();
        let id = world
            .spawn(
                "Loot",
                true,
                vec![
                    Transform::at(Vector2::ZERO).into(),
                    DroppedItem::new(ItemStack::new("Apple", 1, "apple.png")).into(),
                ],
            )
            .unwrap();

        assert!(world.remove_component::<DroppedItem>(id));
        world.run_deferred_tasks(50);
        assert!(world.get_component::<Collider>(id).is_none());
        assert_eq!(world.entity(id).unwrap().transform().unwrap().size, Vector2::ONE);
    }

    #[test]
    fn test_dropped_item_hitbox() {
        let mut world = World::default();
        let id = world
            .spawn(
                "Loot",
                true,
                vec![
                    Transform::at(Vector2::ZERO).into(),
                    DroppedItem::new(ItemStack::new("Apple", 1, "apple.png")).into(),
                ],
            )
            .unwrap();

        world.run_deferred_tasks(10);
        let hitbox = world.get_component::<Collider>(id).unwrap();
        assert_eq!(hitbox.tag, DROPPED_ITEM_TAG);
        assert_eq!(hitbox.as_box().unwrap().size, Vector2::new(100.0, 100.0));
        assert_eq!(
            world.entity(id).unwrap().transform().unwrap().size,
            Vector2::new(2.5, 2.5)
        );

        // Removing the item takes its hitbox with it
        assert!(world.remove_component::<DroppedItem>(id));
        assert!(world.colliders().is_empty());
    }
}
