use log::{debug, info};

use super::component::ComponentHandle;
use super::entity::EntityId;
use super::world::World;
use crate::collision::Collider;
use crate::inventory::DroppedItem;
use crate::tasks::{DROPPED_ITEM_TAG, INTERACT_TAG};

/// Trait for all systems
pub trait System {
    /// Update the system, called once per frame while the game is not paused
    fn update(&mut self, world: &mut World, delta_ms: u64);

    /// Called after every system has run `update` for this frame
    fn late_update(&mut self, _world: &mut World, _delta_ms: u64) {}

    /// Get the system name
    fn name(&self) -> &str;
}

/// Collects enabled dropped items whose hitbox contains the player
pub struct PickupSystem;

impl PickupSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PickupSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for PickupSystem {
    fn update(&mut self, world: &mut World, _delta_ms: u64) {
        let Some(inventory) = world.player_inventory() else {
            return;
        };
        let Some(position) = world
            .entity(inventory.entity)
            .and_then(|player| player.transform())
            .map(|transform| transform.position)
        else {
            return;
        };

        let mut candidates: Vec<EntityId> = world
            .overlap_point(position, true)
            .into_iter()
            .filter(|hitbox| {
                world
                    .get::<Collider>(*hitbox)
                    .is_some_and(|collider| collider.tag == DROPPED_ITEM_TAG)
            })
            .map(|hitbox| hitbox.entity)
            .filter(|entity| world.get_component::<DroppedItem>(*entity).is_some())
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        for entity in candidates {
            if world.collect_dropped_item(entity, inventory) {
                info!("Player picked up dropped item #{entity}");
            }
        }
    }

    fn name(&self) -> &str {
        "PickupSystem"
    }
}

/// Tracks the interactible closest to the player within its interact range
pub struct InteractionSystem {
    focused: Option<ComponentHandle>,
}

impl InteractionSystem {
    pub fn new() -> Self {
        Self { focused: None }
    }

    /// Interact collider of the closest interactible, if any is in range
    pub fn focused(&self) -> Option<ComponentHandle> {
        self.focused
    }
}

impl Default for InteractionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for InteractionSystem {
    fn update(&mut self, world: &mut World, _delta_ms: u64) {
        let position = world
            .player_inventory()
            .and_then(|inventory| world.entity(inventory.entity))
            .and_then(|player| player.transform())
            .map(|transform| transform.position);
        let Some(position) = position else {
            self.focused = None;
            return;
        };

        let closest = world
            .overlap_point(position, true)
            .into_iter()
            .filter_map(|handle| {
                let volume = world.collider_volume(handle)?;
                let collider = world.get::<Collider>(handle)?;
                (collider.tag == INTERACT_TAG)
                    .then(|| (handle, (volume.center - position).magnitude_squared()))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(handle, _)| handle);

        if closest != self.focused {
            debug!("Interaction focus changed to {closest:?}");
            self.focused = closest;
        }
    }

    fn name(&self) -> &str {
        "InteractionSystem"
    }
}
