//! Item stacks held by entities, and items lying on the ground

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::ecs::component::{ComponentHandle, ComponentId, ComponentType, Sprite, Transform};
use crate::ecs::entity::EntityId;
use crate::ecs::world::World;
use crate::error::{EngineError, Result};
use crate::math::Vector2;
use crate::tasks::DeferredAction;

/// Number of distinct stacks an inventory can hold
pub const INVENTORY_CAPACITY: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStack {
    pub item_name: String,
    pub item_count: u32,
    #[serde(alias = "fileSourceDirectory")]
    pub icon_path: String,
}

impl ItemStack {
    pub fn new<N: Into<String>, P: Into<String>>(item_name: N, item_count: u32, icon_path: P) -> Self {
        Self {
            item_name: item_name.into(),
            item_count,
            icon_path: icon_path.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    #[serde(default)]
    items: Vec<ItemStack>,
    #[serde(default)]
    is_player_inventory: bool,
    #[serde(skip)]
    interact_collider: Option<ComponentId>,
}

impl Inventory {
    pub fn new(is_player_inventory: bool) -> Self {
        Self {
            items: Vec::new(),
            is_player_inventory,
            interact_collider: None,
        }
    }

    pub fn with_items(mut self, items: Vec<ItemStack>) -> Self {
        for item in items {
            self.add_item(item);
        }
        self
    }

    pub fn items(&self) -> &[ItemStack] {
        &self.items
    }

    pub fn is_player_inventory(&self) -> bool {
        self.is_player_inventory
    }

    pub fn empty_slots(&self) -> usize {
        INVENTORY_CAPACITY.saturating_sub(self.items.len())
    }

    pub fn is_full(&self) -> bool {
        self.empty_slots() == 0
    }

    pub fn contains(&self, item_name: &str) -> bool {
        self.stack(item_name).is_some()
    }

    pub fn stack(&self, item_name: &str) -> Option<&ItemStack> {
        self.items.iter().find(|stack| stack.item_name == item_name)
    }

    /// Add a stack, merging with an existing stack of the same name
    ///
    /// Returns false without changing anything when the stack is empty, the
    /// merged count would overflow, or the name is new and every slot is taken.
    pub fn add_item(&mut self, item: ItemStack) -> bool {
        if item.item_count == 0 {
            warn!("Refusing to add an empty stack of {}", item.item_name);
            return false;
        }

        if let Some(stack) = self.items.iter_mut().find(|s| s.item_name == item.item_name) {
            let Some(total) = stack.item_count.checked_add(item.item_count) else {
                warn!("Stack of {} can't hold {} more", item.item_name, item.item_count);
                return false;
            };
            stack.item_count = total;
            return true;
        }
        if self.is_full() {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Add every stack or none of them
    pub fn add_items(&mut self, items: Vec<ItemStack>) -> bool {
        if items.iter().any(|item| item.item_count == 0) {
            return false;
        }

        // Per-name totals after the merge, checked before anything changes
        let mut totals: HashMap<&str, u32> = HashMap::new();
        for item in &items {
            let name = item.item_name.as_str();
            let current = match totals.get(name) {
                Some(count) => *count,
                None => self.stack(name).map_or(0, |stack| stack.item_count),
            };
            let Some(total) = current.checked_add(item.item_count) else {
                warn!("Stack of {name} can't hold {} more", item.item_count);
                return false;
            };
            totals.insert(name, total);
        }

        let new_names = totals.keys().filter(|name| !self.contains(name)).count();
        if new_names > self.empty_slots() {
            return false;
        }

        for item in items {
            self.add_item(item);
        }
        true
    }

    pub fn remove_item(&mut self, item_name: &str) -> Option<ItemStack> {
        let index = self.items.iter().position(|s| s.item_name == item_name)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Check the stack invariants of a decoded inventory
    pub fn validate(&self) -> Result<()> {
        if self.items.len() > INVENTORY_CAPACITY {
            return Err(EngineError::Malformed(format!(
                "inventory holds {} stacks, capacity is {INVENTORY_CAPACITY}",
                self.items.len()
            )));
        }

        let mut seen = HashSet::new();
        for stack in &self.items {
            if stack.item_count == 0 {
                return Err(EngineError::Malformed(format!(
                    "empty stack of {}",
                    stack.item_name
                )));
            }
            if !seen.insert(stack.item_name.as_str()) {
                return Err(EngineError::Malformed(format!(
                    "duplicate stack of {}",
                    stack.item_name
                )));
            }
        }
        Ok(())
    }

    pub fn interact_collider(&self) -> Option<ComponentId> {
        self.interact_collider
    }

    pub(crate) fn set_interact_collider(&mut self, collider: ComponentId) {
        self.interact_collider = Some(collider);
    }

    pub(crate) fn take_interact_collider(&mut self) -> Option<ComponentId> {
        self.interact_collider.take()
    }
}

/// An item stack lying in the world, waiting to be collected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroppedItem {
    pub item: ItemStack,
    #[serde(skip)]
    collection_hitbox: Option<ComponentId>,
}

impl DroppedItem {
    pub fn new(item: ItemStack) -> Self {
        Self {
            item,
            collection_hitbox: None,
        }
    }

    pub fn collection_hitbox(&self) -> Option<ComponentId> {
        self.collection_hitbox
    }

    pub(crate) fn set_collection_hitbox(&mut self, hitbox: ComponentId) {
        self.collection_hitbox = Some(hitbox);
    }

    pub(crate) fn take_collection_hitbox(&mut self) -> Option<ComponentId> {
        self.collection_hitbox.take()
    }
}

impl World {
    /// The inventory that registered itself as the player's
    pub fn player_inventory(&self) -> Option<ComponentHandle> {
        self.player_inventory
    }

    fn inventory_mut(&mut self, handle: ComponentHandle) -> Result<&mut Inventory> {
        let entity = self.entity_label(handle.entity);
        self.get_mut::<Inventory>(handle)
            .ok_or_else(|| EngineError::ComponentNotFound {
                entity,
                component: format!("Inventory #{}", handle.component),
            })
    }

    /// Move a whole stack between inventories
    ///
    /// When the target has no room the stack goes back where it came from.
    pub fn transfer_item(
        &mut self,
        from: ComponentHandle,
        to: ComponentHandle,
        item_name: &str,
    ) -> Result<()> {
        self.inventory_mut(to)?;
        let stack = self
            .inventory_mut(from)?
            .remove_item(item_name)
            .ok_or_else(|| EngineError::ItemNotFound(item_name.to_string()))?;

        if self.inventory_mut(to)?.add_item(stack.clone()) {
            info!("Moved {}x{}", stack.item_name, stack.item_count);
            return Ok(());
        }

        warn!("Target inventory has no room, {item_name} stays where it was");
        self.inventory_mut(from)?.add_item(stack);
        Err(EngineError::InventoryFull(item_name.to_string()))
    }

    /// Take a stack out of an inventory and spawn it on the ground at the
    /// inventory owner's position
    pub fn drop_item(&mut self, inventory: ComponentHandle, item_name: &str) -> Result<EntityId> {
        let position = self
            .entity(inventory.entity)
            .and_then(|entity| entity.transform())
            .map_or(Vector2::ZERO, |transform| transform.position);
        let stack = match self.inventory_mut(inventory)?.remove_item(item_name) {
            Some(stack) => stack,
            None => {
                let err = EngineError::ItemNotFound(item_name.to_string());
                error!("Couldn't drop item: {err}");
                return Err(err);
            }
        };

        info!("Dropped {}x{}", stack.item_name, stack.item_count);
        let name = format!(
            "Dropped Item {}x{}, {}",
            stack.item_name,
            stack.item_count,
            rand::random::<u32>()
        );
        let scale = self.config.inventory.dropped_item_scale;
        let icon = stack.icon_path.clone();
        let spawned = self.spawn(
            name,
            true,
            vec![
                DroppedItem::new(stack.clone()).into(),
                Transform::new(position, 0.0, Vector2::ONE * scale).into(),
                Sprite::new(icon).into(),
            ],
        );
        let id = match spawned {
            Ok(id) => id,
            Err(err) => {
                // Keep the item rather than losing it
                if let Ok(state) = self.inventory_mut(inventory) {
                    state.add_item(stack);
                }
                return Err(err);
            }
        };

        if let Some(dropped) = self.entity_mut(id).and_then(|e| {
            let component = e.component_id::<DroppedItem>()?;
            e.component_mut(component)
        }) {
            dropped.enabled = false;
            let component = dropped.id();
            self.tasks.schedule(
                id,
                self.config.inventory.dropped_item_pickup_delay_ms,
                DeferredAction::EnableComponent { component },
            );
        }
        Ok(id)
    }

    /// Put a dropped item into an inventory and destroy it
    ///
    /// Returns false while the item is still disabled or when the
    /// inventory has no room for it.
    pub fn collect_dropped_item(&mut self, entity: EntityId, inventory: ComponentHandle) -> bool {
        let Some(dropped) = self
            .entity(entity)
            .and_then(|e| e.find(ComponentType::DroppedItem))
        else {
            return false;
        };
        if !dropped.enabled {
            return false;
        }
        let Some(item) = dropped.view::<DroppedItem>().map(|d| d.item.clone()) else {
            return false;
        };

        let added = match self.inventory_mut(inventory) {
            Ok(state) => state.add_item(item),
            Err(err) => {
                error!("Couldn't collect item: {err}");
                false
            }
        };
        if added {
            self.destroy_entity(entity);
        }
        added
    }
}
