use log::{debug, error, info, warn};
use std::collections::{BTreeMap, HashMap};

use super::component::{
    Component, ComponentHandle, ComponentId, ComponentKind, ComponentQuery, Transform,
};
use super::entity::{Entity, EntityId};
use crate::animation::AnimationScheduler;
use crate::collision::ColliderRegistry;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::render::{RenderOrder, RenderQueues};
use crate::tasks::{DeferredAction, TaskQueue};

/// Main world struct that owns all entities and the subsystems their
/// components register into
pub struct World {
    pub(crate) config: EngineConfig,

    // Entity management
    pub(crate) entities: BTreeMap<EntityId, Entity>,
    names: HashMap<String, EntityId>,
    next_entity_id: EntityId,
    next_component_id: ComponentId,

    // Subsystems
    pub(crate) colliders: ColliderRegistry,
    pub(crate) render_queues: RenderQueues,
    pub(crate) animations: AnimationScheduler,
    pub(crate) tasks: TaskQueue,
    pub(crate) player_inventory: Option<ComponentHandle>,
}

impl World {
    /// Create a new empty world
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            entities: BTreeMap::new(),
            names: HashMap::new(),
            next_entity_id: 0,
            next_component_id: 0,
            colliders: ColliderRegistry::new(),
            render_queues: RenderQueues::new(),
            animations: AnimationScheduler::new(),
            tasks: TaskQueue::new(),
            player_inventory: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn colliders(&self) -> &ColliderRegistry {
        &self.colliders
    }

    pub fn render_queues(&self) -> &RenderQueues {
        &self.render_queues
    }

    pub fn animations(&self) -> &AnimationScheduler {
        &self.animations
    }

    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    /// Create an entity from its components and register it
    ///
    /// The component list must contain exactly one Transform, otherwise the
    /// entity is never registered and none of its components are initialized.
    pub fn spawn<S: Into<String>>(
        &mut self,
        name: S,
        active: bool,
        components: Vec<ComponentKind>,
    ) -> Result<EntityId> {
        let name = name.into();
        let transforms = components
            .iter()
            .filter(|kind| matches!(kind, ComponentKind::Transform(_)))
            .count();
        match transforms {
            1 => {}
            0 => {
                let err = EngineError::MissingTransform(name);
                error!("Entity couldn't be created: {err} (did you forget to add a Transform component?)");
                return Err(err);
            }
            count => {
                let err = EngineError::DuplicateTransform { name, count };
                error!("Entity couldn't be created: {err}");
                return Err(err);
            }
        }

        let id = self.next_entity_id;
        self.register(Entity::new(id, name.clone(), active))?;
        self.next_entity_id += 1;

        for kind in components {
            self.add_component(id, kind)?;
        }

        info!("Entity \"{name}\" registered");
        Ok(id)
    }

    /// Insert an entity into the registry, refusing duplicate names
    pub(crate) fn register(&mut self, entity: Entity) -> Result<()> {
        if self.names.contains_key(entity.name()) {
            let err = EngineError::DuplicateName(entity.name().to_string());
            error!("{err}");
            return Err(err);
        }

        self.names.insert(entity.name().to_string(), entity.id());
        self.entities.insert(entity.id(), entity);
        Ok(())
    }

    /// Remove an entity from the registry, a no-op when it is absent
    pub(crate) fn unregister(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        self.names.remove(entity.name());
        Some(entity)
    }

    pub fn lookup(&self, name: &str) -> Option<EntityId> {
        self.names.get(name).copied()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn entity_by_name(&self, name: &str) -> Option<&Entity> {
        self.lookup(name).and_then(|id| self.entities.get(&id))
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Get number of registered entities
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Registered entities in creation order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn set_active(&mut self, id: EntityId, active: bool) -> bool {
        match self.entities.get_mut(&id) {
            Some(entity) => {
                entity.active = active;
                true
            }
            None => false,
        }
    }

    /// Rename an entity, keeping names unique among live entities
    pub fn rename<S: Into<String>>(&mut self, id: EntityId, name: S) -> Result<()> {
        let name = name.into();
        if let Some(&owner) = self.names.get(&name) {
            if owner == id {
                return Ok(());
            }
            let err = EngineError::DuplicateName(name);
            error!("{err}");
            return Err(err);
        }

        let entity = self
            .entities
            .get_mut(&id)
            .ok_or_else(|| EngineError::EntityNotFound(format!("#{id}")))?;
        self.names.remove(entity.name());
        self.names.insert(name.clone(), id);
        entity.set_name(name);
        Ok(())
    }

    pub fn get_component<T: ComponentQuery>(&self, entity: EntityId) -> Option<&T> {
        self.entities.get(&entity)?.get_component::<T>()
    }

    pub fn get_component_mut<T: ComponentQuery>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.entities.get_mut(&entity)?.get_component_mut::<T>()
    }

    pub fn get_components<T: ComponentQuery>(&self, entity: EntityId) -> Option<Vec<&T>> {
        self.entities.get(&entity)?.get_components::<T>()
    }

    pub fn component(&self, handle: ComponentHandle) -> Option<&Component> {
        self.entities.get(&handle.entity)?.component(handle.component)
    }

    pub fn component_mut(&mut self, handle: ComponentHandle) -> Option<&mut Component> {
        self.entities
            .get_mut(&handle.entity)?
            .component_mut(handle.component)
    }

    /// The component behind `handle`, if it satisfies capability `T`
    pub fn get<T: ComponentQuery>(&self, handle: ComponentHandle) -> Option<&T> {
        self.component(handle)?.view::<T>()
    }

    pub fn get_mut<T: ComponentQuery>(&mut self, handle: ComponentHandle) -> Option<&mut T> {
        self.component_mut(handle)?.view_mut::<T>()
    }

    pub(crate) fn entity_label(&self, id: EntityId) -> String {
        match self.entities.get(&id) {
            Some(entity) => entity.name().to_string(),
            None => format!("#{id}"),
        }
    }

    /// Attach a component to an entity and initialize it
    pub fn add_component<K: Into<ComponentKind>>(
        &mut self,
        entity: EntityId,
        kind: K,
    ) -> Result<ComponentHandle> {
        let kind = kind.into();
        let owner = self
            .entities
            .get_mut(&entity)
            .ok_or_else(|| EngineError::EntityNotFound(format!("#{entity}")))?;

        if matches!(kind, ComponentKind::Transform(_)) && owner.has_component::<Transform>() {
            let err = EngineError::DuplicateTransform {
                name: owner.name().to_string(),
                count: 2,
            };
            error!("{err}");
            return Err(err);
        }

        let id = self.next_component_id;
        self.next_component_id += 1;

        let component_type = kind.component_type();
        owner.push(Component::new(id, entity, kind));
        info!(
            "Component {component_type} has been added onto entity \"{}\"",
            owner.name()
        );

        let handle = ComponentHandle::new(entity, id);
        self.initialize(handle);
        Ok(handle)
    }

    /// Registers a freshly attached component into the subsystems it uses
    fn initialize(&mut self, handle: ComponentHandle) {
        let Some(component) = self
            .entities
            .get_mut(&handle.entity)
            .and_then(|entity| entity.component_mut(handle.component))
        else {
            return;
        };

        match component.kind_mut() {
            ComponentKind::Transform(_) | ComponentKind::Animator(_) => {}
            ComponentKind::Sprite(sprite) => {
                let order = RenderOrder::from(sprite.order_in_layer);
                self.render_queues.world.insert(handle, order);
            }
            ComponentKind::UiSprite(sprite) => {
                let order = RenderOrder::from(sprite.order_in_layer);
                self.render_queues.ui.insert(handle, order);
            }
            ComponentKind::Tilemap(tilemap) => {
                tilemap.build_grid();
                self.render_queues.world.insert(handle, RenderOrder::Append);
            }
            ComponentKind::Collider(collider) => {
                self.colliders.register(handle, collider.debug_draw);
            }
            ComponentKind::Inventory(inventory) => {
                if inventory.is_player_inventory() {
                    self.player_inventory = Some(handle);
                } else {
                    self.tasks.schedule(
                        handle.entity,
                        self.config.inventory.interact_collider_delay_ms,
                        DeferredAction::SetupInteractCollider {
                            inventory: handle.component,
                        },
                    );
                }
            }
            ComponentKind::DroppedItem(_) => {
                self.tasks.schedule(
                    handle.entity,
                    self.config.inventory.dropped_item_hitbox_delay_ms,
                    DeferredAction::AddDroppedItemHitbox {
                        dropped_item: handle.component,
                    },
                );
            }
        }
    }

    /// Undoes everything `initialize` and the deferred follow-up work did
    fn destroy_self(&mut self, component: &mut Component) {
        let handle = component.handle();
        match component.kind_mut() {
            ComponentKind::Transform(_) => {}
            ComponentKind::Sprite(_) | ComponentKind::Tilemap(_) => {
                self.render_queues.world.remove_handle(handle);
            }
            ComponentKind::UiSprite(_) => {
                self.render_queues.ui.remove_handle(handle);
            }
            ComponentKind::Animator(animator) => {
                if animator.stop_playing().is_some() {
                    self.animations.unschedule(handle);
                }
            }
            ComponentKind::Collider(_) => {
                self.colliders.unregister(handle);
            }
            ComponentKind::Inventory(inventory) => {
                inventory.clear();
                if let Some(collider) = inventory.take_interact_collider() {
                    self.detach(ComponentHandle::new(handle.entity, collider));
                }
                if self.player_inventory == Some(handle) {
                    self.player_inventory = None;
                }
            }
            ComponentKind::DroppedItem(dropped) => {
                if let Some(hitbox) = dropped.take_collection_hitbox() {
                    self.detach(ComponentHandle::new(handle.entity, hitbox));
                }
            }
        }
        self.tasks.cancel_component(handle);
    }

    /// Take a component out of its entity and unregister it
    fn detach(&mut self, handle: ComponentHandle) -> Option<Component> {
        let mut component = self.entities.get_mut(&handle.entity)?.take(handle.component)?;
        self.destroy_self(&mut component);
        info!(
            "Component {} has been removed from entity \"{}\"",
            component.component_type(),
            self.entity_label(handle.entity)
        );
        Some(component)
    }

    /// Remove the first component satisfying capability `T`
    ///
    /// Transform is never removed this way, destroy the entity instead.
    pub fn remove_component<T: ComponentQuery>(&mut self, entity: EntityId) -> bool {
        let Some(owner) = self.entities.get(&entity) else {
            error!("Tried removing a component from a non-existing entity #{entity}!");
            return false;
        };

        if T::CAPABILITY.satisfies(Transform::CAPABILITY) {
            warn!("{}", EngineError::TransformRemoval(owner.name().to_string()));
            return false;
        }

        let Some(id) = owner.component_id::<T>() else {
            error!(
                "Tried removing a non-existing component {} from entity \"{}\"!",
                T::CAPABILITY,
                owner.name()
            );
            return false;
        };

        self.detach(ComponentHandle::new(entity, id)).is_some()
    }

    /// Remove one specific component, refusing Transform
    pub fn remove_component_by_id(&mut self, handle: ComponentHandle) -> bool {
        match self.component(handle) {
            None => {
                error!(
                    "Tried removing non-existing component #{} from entity \"{}\"!",
                    handle.component,
                    self.entity_label(handle.entity)
                );
                false
            }
            Some(component) if matches!(component.kind(), ComponentKind::Transform(_)) => {
                warn!("{}", EngineError::TransformRemoval(self.entity_label(handle.entity)));
                false
            }
            Some(_) => self.detach(handle).is_some(),
        }
    }

    /// Destroy a single component
    ///
    /// Destroying a Transform destroys the whole entity.
    pub fn destroy_component(&mut self, handle: ComponentHandle) -> bool {
        let is_transform = matches!(
            self.component(handle).map(Component::kind),
            Some(ComponentKind::Transform(_))
        );
        if is_transform {
            warn!(
                "Tried to destroy Transform component, destroying the whole entity \"{}\"",
                self.entity_label(handle.entity)
            );
            return self.destroy_entity(handle.entity);
        }
        self.detach(handle).is_some()
    }

    /// Destroy every non-Transform component of an entity and unregister it
    pub fn destroy_entity(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.entities.get(&id) else {
            debug!("Entity #{id} is already destroyed");
            return false;
        };

        let doomed: Vec<ComponentId> = entity
            .components()
            .iter()
            .filter(|c| !matches!(c.kind(), ComponentKind::Transform(_)))
            .map(Component::id)
            .collect();
        for component in doomed {
            // Cascades may already have removed it
            self.detach(ComponentHandle::new(id, component));
        }

        let cancelled = self.tasks.cancel_owner(id);
        if cancelled > 0 {
            debug!("Cancelled {cancelled} deferred tasks of entity #{id}");
        }

        match self.unregister(id) {
            Some(entity) => {
                info!("Entity \"{}\" destroyed", entity.name());
                true
            }
            None => false,
        }
    }

    /// Destroy every entity and empty every registry
    pub fn clear(&mut self) {
        let ids: Vec<EntityId> = self.entities.keys().copied().collect();
        for id in ids {
            self.destroy_entity(id);
        }

        self.entities.clear();
        self.names.clear();
        self.colliders.clear();
        self.render_queues.clear();
        self.animations.clear();
        self.tasks.clear();
        self.player_inventory = None;
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
