pub mod component;
pub mod entity;
pub mod system;
pub mod world;

// Re-export the types gameplay code touches most
pub use self::component::{
    Component, ComponentHandle, ComponentId, ComponentKind, ComponentQuery, ComponentType,
    ImageRef, ImageState, Sprite, Transform, UiSprite,
};
pub use self::entity::{Entity, EntityId};
pub use self::system::{InteractionSystem, PickupSystem, System};
pub use self::world::World;
