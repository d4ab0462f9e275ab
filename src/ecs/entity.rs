use super::component::{Component, ComponentId, ComponentQuery, ComponentType, Transform};

/// Unique identifier for entities, never reused within a world
pub type EntityId = u64;

/// Entity struct representing a game object
///
/// Components keep their insertion order. Entities are only handed out by the
/// world once they hold exactly one Transform.
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    name: String,
    pub active: bool,
    components: Vec<Component>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, name: String, active: bool) -> Self {
        Self {
            id,
            name,
            active,
            components: Vec::new(),
        }
    }

    /// Get the entity's unique ID
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn transform(&self) -> Option<&Transform> {
        self.get_component::<Transform>()
    }

    pub fn transform_mut(&mut self) -> Option<&mut Transform> {
        self.get_component_mut::<Transform>()
    }

    /// First component satisfying capability `T`
    pub fn get_component<T: ComponentQuery>(&self) -> Option<&T> {
        self.components.iter().find_map(|c| c.view::<T>())
    }

    pub fn get_component_mut<T: ComponentQuery>(&mut self) -> Option<&mut T> {
        self.components.iter_mut().find_map(|c| c.view_mut::<T>())
    }

    /// Every component satisfying capability `T`, or `None` when there are none
    pub fn get_components<T: ComponentQuery>(&self) -> Option<Vec<&T>> {
        let found: Vec<&T> = self.components.iter().filter_map(|c| c.view::<T>()).collect();
        if found.is_empty() {
            None
        } else {
            Some(found)
        }
    }

    pub fn has_component<T: ComponentQuery>(&self) -> bool {
        self.get_component::<T>().is_some()
    }

    /// Id of the first component satisfying capability `T`
    pub fn component_id<T: ComponentQuery>(&self) -> Option<ComponentId> {
        self.components
            .iter()
            .find(|c| c.view::<T>().is_some())
            .map(Component::id)
    }

    /// First component whose discriminator satisfies `capability`
    pub fn find(&self, capability: ComponentType) -> Option<&Component> {
        self.components.iter().find(|c| c.satisfies(capability))
    }

    pub fn find_all(&self, capability: ComponentType) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(move |c| c.satisfies(capability))
    }

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.iter().find(|c| c.id() == id)
    }

    pub fn component_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.id() == id)
    }

    pub(crate) fn push(&mut self, component: Component) {
        self.components.push(component);
    }

    /// Detach a component from the list, keeping the order of the rest
    pub(crate) fn take(&mut self, id: ComponentId) -> Option<Component> {
        let index = self.components.iter().position(|c| c.id() == id)?;
        Some(self.components.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{Collider, ColliderShape};
    use crate::ecs::component::Sprite;
    use crate::math::Vector2;

    fn entity_with(components: Vec<crate::ecs::component::ComponentKind>) -> Entity {
        let mut entity = Entity::new(7, "Crate".to_string(), true);
        for (index, kind) in components.into_iter().enumerate() {
            entity.push(Component::new(index as ComponentId, 7, kind));
        }
        entity
    }

    #[test]
    fn test_base_capability_query() {
        let entity = entity_with(vec![
            Transform::at(Vector2::ZERO).into(),
            Collider::new(ColliderShape::circle(5.0)).into(),
            Collider::new(ColliderShape::rectangle(10.0, 10.0)).into(),
        ]);

        let collider = entity.get_component::<Collider>().unwrap();
        assert_eq!(collider.component_type(), ComponentType::CircleCollider);
        assert_eq!(entity.get_components::<Collider>().unwrap().len(), 2);

        let boxed = entity.find(ComponentType::BoxCollider).unwrap();
        assert_eq!(boxed.id(), 2);
        assert_eq!(entity.find_all(ComponentType::Collider).count(), 2);
    }

    #[test]
    fn test_missing_queries_are_none() {
        let entity = entity_with(vec![Transform::at(Vector2::ZERO).into()]);

        assert!(entity.get_component::<Sprite>().is_none());
        assert!(entity.get_components::<Sprite>().is_none());
        assert!(!entity.has_component::<Sprite>());
        assert!(entity.transform().is_some());
    }

    #[test]
    fn test_take_preserves_order() {
        let mut entity = entity_with(vec![
            Transform::at(Vector2::ZERO).into(),
            Sprite::new("a.png").into(),
            Sprite::new("b.png").into(),
        ]);

        let taken = entity.take(1).unwrap();
        assert_eq!(taken.owner(), 7);
        let ids: Vec<ComponentId> = entity.components().iter().map(Component::id).collect();
        assert_eq!(ids, vec![0, 2]);
        assert!(entity.take(1).is_none());
    }
}
