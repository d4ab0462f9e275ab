use log::warn;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};

use super::entity::EntityId;
use crate::animation::Animator;
use crate::collision::Collider;
use crate::inventory::{DroppedItem, Inventory};
use crate::math::Vector2;
use crate::tilemap::Tilemap;

/// Identifier of a component, unique within its world
pub type ComponentId = u64;

/// Enum defining all possible component types
///
/// Every concrete variant has a discriminator tag used by the save format.
/// `Collider` is a base capability with no tag of its own: it is satisfied by
/// both `BoxCollider` and `CircleCollider`.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ComponentType {
    Transform,
    Sprite,
    UiSprite,
    Tilemap,
    Animator,
    Collider,
    BoxCollider,
    CircleCollider,
    Inventory,
    DroppedItem,
}

impl ComponentType {
    /// Discriminator written to the `"Type"` field of a component document
    pub const fn tag(self) -> &'static str {
        match self {
            ComponentType::Transform => "Transform",
            ComponentType::Sprite => "Sprite",
            ComponentType::UiSprite => "UISprite",
            ComponentType::Tilemap => "Tilemap",
            ComponentType::Animator => "Animator",
            ComponentType::Collider => "Collider",
            ComponentType::BoxCollider => "BoxCollider",
            ComponentType::CircleCollider => "CircleCollider",
            ComponentType::Inventory => "Inventory",
            ComponentType::DroppedItem => "DroppedItem",
        }
    }

    /// Resolve a discriminator tag to its concrete type
    ///
    /// Abstract capabilities are never returned, so a document tagged
    /// `"Collider"` is rejected like any other unknown tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let component_type = match tag {
            "Transform" => ComponentType::Transform,
            "Sprite" => ComponentType::Sprite,
            "UISprite" => ComponentType::UiSprite,
            "Tilemap" => ComponentType::Tilemap,
            "Animator" => ComponentType::Animator,
            "BoxCollider" => ComponentType::BoxCollider,
            "CircleCollider" => ComponentType::CircleCollider,
            "Inventory" => ComponentType::Inventory,
            "DroppedItem" => ComponentType::DroppedItem,
            _ => return None,
        };
        Some(component_type)
    }

    pub const fn is_abstract(self) -> bool {
        matches!(self, ComponentType::Collider)
    }

    /// Whether a component of this type answers a query for `capability`
    pub fn satisfies(self, capability: ComponentType) -> bool {
        self == capability
            || (capability == ComponentType::Collider
                && matches!(
                    self,
                    ComponentType::BoxCollider | ComponentType::CircleCollider
                ))
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Non-owning reference to a component attached to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentHandle {
    pub entity: EntityId,
    pub component: ComponentId,
}

impl ComponentHandle {
    pub const fn new(entity: EntityId, component: ComponentId) -> Self {
        Self { entity, component }
    }
}

/// Closed set of component variants
#[derive(Debug, Clone)]
pub enum ComponentKind {
    Transform(Transform),
    Sprite(Sprite),
    UiSprite(UiSprite),
    Tilemap(Tilemap),
    Animator(Animator),
    Collider(Collider),
    Inventory(Inventory),
    DroppedItem(DroppedItem),
}

impl ComponentKind {
    pub fn component_type(&self) -> ComponentType {
        match self {
            ComponentKind::Transform(_) => ComponentType::Transform,
            ComponentKind::Sprite(_) => ComponentType::Sprite,
            ComponentKind::UiSprite(_) => ComponentType::UiSprite,
            ComponentKind::Tilemap(_) => ComponentType::Tilemap,
            ComponentKind::Animator(_) => ComponentType::Animator,
            ComponentKind::Collider(collider) => collider.component_type(),
            ComponentKind::Inventory(_) => ComponentType::Inventory,
            ComponentKind::DroppedItem(_) => ComponentType::DroppedItem,
        }
    }
}

/// A component attached to an entity
///
/// The owner is set when the component is attached and never changes, so it
/// always names the entity whose list holds the component.
#[derive(Debug, Clone)]
pub struct Component {
    id: ComponentId,
    owner: EntityId,
    pub enabled: bool,
    kind: ComponentKind,
}

impl Component {
    pub(crate) fn new(id: ComponentId, owner: EntityId, kind: ComponentKind) -> Self {
        Self {
            id,
            owner,
            enabled: true,
            kind,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    pub fn handle(&self) -> ComponentHandle {
        ComponentHandle::new(self.owner, self.id)
    }

    /// Get the type of this component
    pub fn component_type(&self) -> ComponentType {
        self.kind.component_type()
    }

    pub fn satisfies(&self, capability: ComponentType) -> bool {
        self.component_type().satisfies(capability)
    }

    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut ComponentKind {
        &mut self.kind
    }

    pub fn view<T: ComponentQuery>(&self) -> Option<&T> {
        T::view(&self.kind)
    }

    pub fn view_mut<T: ComponentQuery>(&mut self) -> Option<&mut T> {
        T::view_mut(&mut self.kind)
    }
}

/// Capability query over the closed component set
///
/// Implemented for every variant payload plus the `Collider` base
/// capability, which matches both collider shapes.
pub trait ComponentQuery: Sized + 'static {
    const CAPABILITY: ComponentType;

    fn view(kind: &ComponentKind) -> Option<&Self>;

    fn view_mut(kind: &mut ComponentKind) -> Option<&mut Self>;
}

macro_rules! component_variant {
    ($payload:ident, $variant:ident, $capability:ident) => {
        impl ComponentQuery for $payload {
            const CAPABILITY: ComponentType = ComponentType::$capability;

            fn view(kind: &ComponentKind) -> Option<&Self> {
                match kind {
                    ComponentKind::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn view_mut(kind: &mut ComponentKind) -> Option<&mut Self> {
                match kind {
                    ComponentKind::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }

        impl From<$payload> for ComponentKind {
            fn from(inner: $payload) -> Self {
                ComponentKind::$variant(inner)
            }
        }
    };
}

component_variant!(Transform, Transform, Transform);
component_variant!(Sprite, Sprite, Sprite);
component_variant!(UiSprite, UiSprite, UiSprite);
component_variant!(Tilemap, Tilemap, Tilemap);
component_variant!(Animator, Animator, Animator);
component_variant!(Collider, Collider, Collider);
component_variant!(Inventory, Inventory, Inventory);
component_variant!(DroppedItem, DroppedItem, DroppedItem);

/// Component responsible for position, rotation and scale of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub position: Vector2,
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "default_transform_size")]
    pub size: Vector2,
}

fn default_transform_size() -> Vector2 {
    Vector2::ONE
}

impl Transform {
    pub fn new(position: Vector2, rotation: f32, size: Vector2) -> Self {
        Self {
            position,
            rotation,
            size,
        }
    }

    pub fn at(position: Vector2) -> Self {
        Self::new(position, 0.0, Vector2::ONE)
    }
}

/// Result of resolving an image reference against the asset root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageState {
    Ready(PathBuf),
    /// The file was missing, the renderer draws an empty image instead
    Placeholder,
}

/// Relative path to an image, resolved the first time it is needed
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef {
    path: String,
    #[serde(skip)]
    resolved: OnceCell<ImageState>,
}

impl ImageRef {
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self {
            path: path.into(),
            resolved: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    pub fn resolve(&self, asset_root: &Path) -> &ImageState {
        self.resolved.get_or_init(|| {
            let full_path = asset_root.join(&self.path);
            if full_path.is_file() {
                ImageState::Ready(full_path)
            } else {
                warn!("Missing asset {}, using placeholder image", full_path.display());
                ImageState::Placeholder
            }
        })
    }
}

// Two references are equal when they point at the same file, whether or not
// either one has been resolved yet.
impl PartialEq for ImageRef {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl fmt::Debug for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ImageRef").field(&self.path).finish()
    }
}

/// Component holding the world-space visual of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprite {
    pub image: ImageRef,
    /// Render queue index, appended to the end when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_in_layer: Option<i32>,
}

impl Sprite {
    pub fn new<S: Into<String>>(image: S) -> Self {
        Self {
            image: ImageRef::new(image),
            order_in_layer: None,
        }
    }

    pub fn with_order(mut self, order_in_layer: i32) -> Self {
        self.order_in_layer = Some(order_in_layer);
        self
    }
}

/// Screen-space counterpart of [`Sprite`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSprite {
    pub image: ImageRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_in_layer: Option<i32>,
    #[serde(default)]
    pub offset: Vector2,
    #[serde(default)]
    pub screen_anchor_offset: Vector2,
}

impl UiSprite {
    pub fn new<S: Into<String>>(image: S) -> Self {
        Self {
            image: ImageRef::new(image),
            order_in_layer: None,
            offset: Vector2::ZERO,
            screen_anchor_offset: Vector2::ZERO,
        }
    }

    pub fn with_order(mut self, order_in_layer: i32) -> Self {
        self.order_in_layer = Some(order_in_layer);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{Collider, ColliderShape};

    #[test]
    fn test_tags_round_trip() {
        for component_type in [
            ComponentType::Transform,
            ComponentType::Sprite,
            ComponentType::UiSprite,
            ComponentType::Tilemap,
            ComponentType::Animator,
            ComponentType::BoxCollider,
            ComponentType::CircleCollider,
            ComponentType::Inventory,
            ComponentType::DroppedItem,
        ] {
            assert_eq!(ComponentType::from_tag(component_type.tag()), Some(component_type));
        }

        assert_eq!(ComponentType::from_tag("Collider"), None);
        assert_eq!(ComponentType::from_tag("Rigidbody"), None);
    }

    #[test]
    fn test_collider_capability() {
        assert!(ComponentType::BoxCollider.satisfies(ComponentType::Collider));
        assert!(ComponentType::CircleCollider.satisfies(ComponentType::Collider));
        assert!(!ComponentType::Sprite.satisfies(ComponentType::Collider));
        assert!(!ComponentType::Collider.satisfies(ComponentType::BoxCollider));
    }

    #[test]
    fn test_query_views() {
        let kind: ComponentKind = Collider::new(ColliderShape::rectangle(10.0, 10.0)).into();
        assert_eq!(kind.component_type(), ComponentType::BoxCollider);
        assert!(Collider::view(&kind).is_some());
        assert!(Transform::view(&kind).is_none());

        let mut kind: ComponentKind = Transform::at(Vector2::new(1.0, 2.0)).into();
        if let Some(transform) = Transform::view_mut(&mut kind) {
            transform.position.x = 5.0;
        }
        assert_eq!(Transform::view(&kind).unwrap().position, Vector2::new(5.0, 2.0));
    }

    #[test]
    fn test_image_ref_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("grass.png"), b"png").unwrap();

        let present = ImageRef::new("grass.png");
        let missing = ImageRef::new("stone.png");
        assert!(!present.is_resolved());

        assert_eq!(
            present.resolve(dir.path()),
            &ImageState::Ready(dir.path().join("grass.png"))
        );
        assert_eq!(missing.resolve(dir.path()), &ImageState::Placeholder);
        assert!(present.is_resolved());
    }

    #[test]
    fn test_transform_defaults() {
        let transform: Transform = serde_json::from_str(r#"{ "position": { "x": 3.0, "y": 4.0 } }"#).unwrap();
        assert_eq!(transform.rotation, 0.0);
        assert_eq!(transform.size, Vector2::ONE);
    }
}
