//! Tagged JSON documents for entities and whole levels

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::animation::Animator;
use crate::collision::{BoxCollider, CircleCollider, Collider, ColliderShape};
use crate::ecs::component::{ComponentId, ComponentKind, ComponentType, Sprite, Transform, UiSprite};
use crate::ecs::entity::{Entity, EntityId};
use crate::ecs::world::World;
use crate::error::{EngineError, Result};
use crate::inventory::{DroppedItem, Inventory};
use crate::math::Vector2;
use crate::tilemap::{TileDefinition, Tilemap};

/// Discriminator field of every component document
pub const TYPE_FIELD: &str = "Type";

/// One entity as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDocument {
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub components: Vec<Value>,
}

fn default_active() -> bool {
    true
}

/// An entity decoded from its document, not yet spawned
#[derive(Debug, Clone)]
pub struct DecodedEntity {
    pub name: String,
    pub active: bool,
    pub components: Vec<ComponentKind>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColliderCommon {
    #[serde(default)]
    offset: Vector2,
    #[serde(default)]
    is_trigger: bool,
    #[serde(default)]
    tag: String,
    #[serde(default)]
    debug_draw: bool,
}

#[derive(Serialize, Deserialize)]
struct BoxColliderDocument {
    #[serde(flatten)]
    shape: BoxCollider,
    #[serde(flatten)]
    common: ColliderCommon,
}

#[derive(Serialize, Deserialize)]
struct CircleColliderDocument {
    #[serde(flatten)]
    shape: CircleCollider,
    #[serde(flatten)]
    common: ColliderCommon,
}

impl ColliderCommon {
    fn of(collider: &Collider) -> Self {
        Self {
            offset: collider.offset,
            is_trigger: collider.is_trigger,
            tag: collider.tag.clone(),
            debug_draw: collider.debug_draw,
        }
    }

    fn apply(self, shape: ColliderShape) -> Collider {
        Collider::new(shape)
            .with_offset(self.offset)
            .with_trigger(self.is_trigger)
            .with_tag(self.tag)
            .with_debug_draw(self.debug_draw)
    }
}

/// Encode one component as a JSON object carrying its `"Type"` tag
pub fn encode_component(kind: &ComponentKind) -> Result<Value> {
    let mut value = match kind {
        ComponentKind::Transform(transform) => serde_json::to_value(transform)?,
        ComponentKind::Sprite(sprite) => serde_json::to_value(sprite)?,
        ComponentKind::UiSprite(sprite) => serde_json::to_value(sprite)?,
        ComponentKind::Tilemap(tilemap) => match tilemap.source() {
            Some(source) => json!({ "source": source }),
            None => serde_json::to_value(tilemap.definition())?,
        },
        ComponentKind::Animator(animator) => serde_json::to_value(animator)?,
        ComponentKind::Collider(collider) => {
            let common = ColliderCommon::of(collider);
            match collider.shape {
                ColliderShape::Box(shape) => {
                    serde_json::to_value(BoxColliderDocument { shape, common })?
                }
                ColliderShape::Circle(shape) => {
                    serde_json::to_value(CircleColliderDocument { shape, common })?
                }
            }
        }
        ComponentKind::Inventory(inventory) => serde_json::to_value(inventory)?,
        ComponentKind::DroppedItem(dropped) => serde_json::to_value(dropped)?,
    };

    let Some(object) = value.as_object_mut() else {
        return Err(EngineError::Malformed(format!(
            "{} did not encode to an object",
            kind.component_type()
        )));
    };
    object.insert(
        TYPE_FIELD.to_string(),
        Value::String(kind.component_type().tag().to_string()),
    );
    Ok(value)
}

/// Decode one component document, dispatching on its `"Type"` tag first
///
/// Relative tile definition sources are resolved against `asset_root`.
pub fn decode_component(value: &Value, asset_root: &Path) -> Result<ComponentKind> {
    let tag = value
        .get(TYPE_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::Malformed(format!("component without a \"{TYPE_FIELD}\" field")))?;
    let component_type =
        ComponentType::from_tag(tag).ok_or_else(|| EngineError::UnknownComponentType(tag.to_string()))?;

    let kind: ComponentKind = match component_type {
        ComponentType::Transform => Transform::deserialize(value)?.into(),
        ComponentType::Sprite => Sprite::deserialize(value)?.into(),
        ComponentType::UiSprite => UiSprite::deserialize(value)?.into(),
        ComponentType::Tilemap => match value.get("source").and_then(Value::as_str) {
            Some(source) => Tilemap::from_definition_file(asset_root, source)?.into(),
            None => {
                let definition = TileDefinition::deserialize(value)?;
                definition.validate()?;
                Tilemap::new(definition).into()
            }
        },
        ComponentType::Animator => Animator::deserialize(value)?.into(),
        ComponentType::BoxCollider => {
            let document = BoxColliderDocument::deserialize(value)?;
            document.common.apply(ColliderShape::Box(document.shape)).into()
        }
        ComponentType::CircleCollider => {
            let document = CircleColliderDocument::deserialize(value)?;
            document.common.apply(ColliderShape::Circle(document.shape)).into()
        }
        ComponentType::Inventory => {
            let inventory = Inventory::deserialize(value)?;
            inventory.validate()?;
            inventory.into()
        }
        ComponentType::DroppedItem => DroppedItem::deserialize(value)?.into(),
        ComponentType::Collider => return Err(EngineError::UnknownComponentType(tag.to_string())),
    };
    Ok(kind)
}

/// Components the engine attaches on its own, which are recreated on load
fn derived_components(entity: &Entity) -> HashSet<ComponentId> {
    let mut derived = HashSet::new();
    for component in entity.components() {
        match component.kind() {
            ComponentKind::Inventory(inventory) => derived.extend(inventory.interact_collider()),
            ComponentKind::DroppedItem(dropped) => derived.extend(dropped.collection_hitbox()),
            _ => {}
        }
    }
    derived
}

pub fn encode_entity(entity: &Entity) -> Result<EntityDocument> {
    let derived = derived_components(entity);
    let components = entity
        .components()
        .iter()
        .filter(|component| !derived.contains(&component.id()))
        .map(|component| encode_component(component.kind()))
        .collect::<Result<Vec<_>>>()?;

    Ok(EntityDocument {
        name: entity.name().to_string(),
        is_active: entity.is_active(),
        components,
    })
}

/// Decode every component of a document, failing on the first bad one
pub fn decode_entity(document: EntityDocument, asset_root: &Path) -> Result<DecodedEntity> {
    let components = document
        .components
        .iter()
        .map(|value| decode_component(value, asset_root))
        .collect::<Result<Vec<_>>>()?;

    Ok(DecodedEntity {
        name: document.name,
        active: document.is_active,
        components,
    })
}

pub fn serialize_entity(entity: &Entity) -> Result<String> {
    Ok(serde_json::to_string_pretty(&encode_entity(entity)?)?)
}

pub fn deserialize_entity(json: &str, asset_root: &Path) -> Result<DecodedEntity> {
    let document: EntityDocument = serde_json::from_str(json)?;
    decode_entity(document, asset_root)
}

/// Result of loading every entity file in a directory
#[derive(Debug, Default)]
pub struct LevelLoadReport {
    pub loaded: Vec<String>,
    pub skipped: Vec<(PathBuf, EngineError)>,
}

impl LevelLoadReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

fn read_to_string(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

fn file_name_for(entity: &Entity) -> String {
    let sanitized: String = entity
        .name()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{:04}_{sanitized}.json", entity.id())
}

impl World {
    /// Decode an entity document and spawn it
    pub fn load_entity_from_str(&mut self, json: &str) -> Result<EntityId> {
        let decoded = deserialize_entity(json, &self.config.asset_root).map_err(|err| {
            error!("Entity couldn't be loaded: {err}");
            err
        })?;
        self.spawn(decoded.name, decoded.active, decoded.components)
    }

    pub fn load_entity_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<EntityId> {
        let path = path.as_ref();
        let contents = read_to_string(path).map_err(|err| {
            error!("Couldn't read {}: {err}", path.display());
            err
        })?;
        self.load_entity_from_str(&contents)
    }

    pub fn save_entity_to_file<P: AsRef<Path>>(&self, id: EntityId, path: P) -> Result<()> {
        let Some(entity) = self.entity(id) else {
            let err = EngineError::EntityNotFound(format!("#{id}"));
            error!("Couldn't save entity: {err}");
            return Err(err);
        };
        let path = path.as_ref();
        let serialized = serialize_entity(entity).map_err(|err| {
            error!("Entity \"{}\" couldn't be serialized: {err}", entity.name());
            err
        })?;
        File::create(path)
            .and_then(|mut file| file.write_all(serialized.as_bytes()))
            .map_err(|err| {
                error!("Couldn't write {}: {err}", path.display());
                EngineError::from(err)
            })
    }

    /// Load every `*.json` file in `dir` as one entity, in file name order
    ///
    /// A file that fails to load is logged and skipped.
    pub fn load_level<P: AsRef<Path>>(&mut self, dir: P) -> Result<LevelLoadReport> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|err| {
            error!("Couldn't read level directory {}: {err}", dir.display());
            err
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut report = LevelLoadReport::default();
        for path in paths {
            match self.load_entity_from_file(&path) {
                Ok(id) => report.loaded.push(self.entity_label(id)),
                Err(err) => {
                    warn!("Skipping {}: {err}", path.display());
                    report.skipped.push((path, err));
                }
            }
        }

        info!(
            "Level {} loaded: {} entities, {} skipped",
            dir.display(),
            report.loaded.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Write every live entity to its own file in `dir`
    pub fn save_level<P: AsRef<Path>>(&self, dir: P) -> Result<usize> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|err| {
            error!("Couldn't create level directory {}: {err}", dir.display());
            err
        })?;

        let mut written = 0;
        for entity in self.entities() {
            self.save_entity_to_file(entity.id(), dir.join(file_name_for(entity)))?;
            written += 1;
        }
        info!("Saved {written} entities to {}", dir.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Animation, AnimationFrame};
    use crate::inventory::ItemStack;
    use std::collections::BTreeMap;

    fn full_entity(world: &mut World) -> EntityId {
        let definition = TileDefinition {
            tile_sources: BTreeMap::from([("g".to_string(), "grass.png".to_string())]),
            map_width: 2,
            map_height: 1,
            tile_width: 32.0,
            tile_height: 32.0,
            tiles: vec!["g".to_string(), "g".to_string()],
        };
        let animator = Animator::new(1.5).with_animation(
            Animation::new("idle", vec![AnimationFrame::new("idle_0.png", 120)]).with_looping(false),
        );

        world
            .spawn(
                "Everything",
                false,
                vec![
                    Transform::new(Vector2::new(1.0, 2.0), 45.0, Vector2::new(2.0, 2.0)).into(),
                    Sprite::new("body.png").with_order(3).into(),
                    UiSprite::new("icon.png").into(),
                    Tilemap::new(definition).into(),
                    animator.into(),
                    Collider::new(ColliderShape::rectangle(4.0, 6.0))
                        .with_offset(Vector2::new(0.5, 0.0))
                        .with_tag("wall")
                        .into(),
                    Collider::new(ColliderShape::circle(2.0)).with_trigger(true).into(),
                    Inventory::new(false)
                        .with_items(vec![ItemStack::new("Apple", 2, "apple.png")])
                        .into(),
                    DroppedItem::new(ItemStack::new("Pear", 1, "pear.png")).into(),
                ],
            )
            .unwrap()
    }

    #[test]
    fn test_round_trip_fidelity() {
        let mut world = World::default();
        let id = full_entity(&mut world);
        let original = encode_entity(world.entity(id).unwrap()).unwrap();

        let json = serde_json::to_string(&original).unwrap();
        let mut other = World::default();
        let copy = other.load_entity_from_str(&json).unwrap();
        let reencoded = encode_entity(other.entity(copy).unwrap()).unwrap();

        assert_eq!(original, reencoded);
        assert_eq!(original.components.len(), 9);
        assert_eq!(original.components[5][TYPE_FIELD], "BoxCollider");
        assert_eq!(original.components[6][TYPE_FIELD], "CircleCollider");
    }

    #[test]
    fn test_derived_colliders_not_persisted() {
        let mut world = World::default();
        let id = full_entity(&mut world);
        world.run_deferred_tasks(10);
        // Interact collider and collection hitbox were added
        assert_eq!(world.entity(id).unwrap().components().len(), 11);

        let document = encode_entity(world.entity(id).unwrap()).unwrap();
        assert_eq!(document.components.len(), 9);
    }

    #[test]
    fn test_unknown_type_aborts_entity() {
        let mut world = World::default();
        let json = r#"{
            "name": "Broken",
            "components": [
                { "Type": "Transform", "position": { "x": 0.0, "y": 0.0 } },
                { "Type": "Rigidbody", "mass": 3.0 }
            ]
        }"#;

        let err = world.load_entity_from_str(json).unwrap_err();
        assert!(matches!(err, EngineError::UnknownComponentType(ref tag) if tag == "Rigidbody"));
        assert_eq!(world.entity_count(), 0);

        let err = decode_component(&json!({ "Type": "Collider" }), Path::new(".")).unwrap_err();
        assert!(matches!(err, EngineError::UnknownComponentType(_)));
        let err = decode_component(&json!({ "radius": 1.0 }), Path::new(".")).unwrap_err();
        assert!(matches!(err, EngineError::Malformed(_)));
    }

    #[test]
    fn test_oversized_tilemap_aborts_entity() {
        let mut world = World::default();
        let json = json!({
            "name": "Huge",
            "components": [
                { "Type": "Transform" },
                {
                    "Type": "Tilemap", "tileSources": {},
                    "mapWidth": 4294967296u64, "mapHeight": 4294967296u64,
                    "tileWidth": 1.0, "tileHeight": 1.0, "tiles": []
                }
            ]
        });

        let err = world.load_entity_from_str(&json.to_string()).unwrap_err();
        assert!(matches!(err, EngineError::Malformed(_)));
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn test_missing_transform_rejected_at_spawn() {
        let mut world = World::default();
        let json = r#"{ "name": "Ghost", "components": [{ "Type": "Sprite", "image": "ghost.png" }] }"#;
        let err = world.load_entity_from_str(json).unwrap_err();
        assert!(matches!(err, EngineError::MissingTransform(_)));
    }

    #[test]
    fn test_tilemap_source_resolved_against_asset_root() {
        let dir = tempfile::tempdir().unwrap();
        let definition = json!({
            "tileSources": { "w": "water.png" },
            "mapWidth": 1, "mapHeight": 1, "tileWidth": 8.0, "tileHeight": 8.0,
            "tiles": ["w"]
        });
        fs::write(dir.path().join("map.json"), definition.to_string()).unwrap();

        let kind = decode_component(&json!({ "Type": "Tilemap", "source": "map.json" }), dir.path()).unwrap();
        let ComponentKind::Tilemap(tilemap) = &kind else {
            panic!("expected a tilemap, got {kind:?}");
        };
        assert_eq!(tilemap.definition().tiles, vec!["w".to_string()]);
        assert_eq!(encode_component(&kind).unwrap(), json!({ "Type": "Tilemap", "source": "map.json" }));
    }

    #[test]
    fn test_save_and_load_entity_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player.json");

        let mut world = World::default();
        let id = world
            .spawn("Player", true, vec![Transform::at(Vector2::new(4.0, 2.0)).into()])
            .unwrap();
        world.save_entity_to_file(id, &path).unwrap();

        let mut other = World::default();
        let loaded = other.load_entity_from_file(&path).unwrap();
        assert_eq!(other.entity(loaded).unwrap().name(), "Player");
        assert_eq!(
            other.entity(loaded).unwrap().transform().unwrap().position,
            Vector2::new(4.0, 2.0)
        );

        assert!(other.load_entity_from_file(dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn test_level_io_failures_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut world = World::default();
        let id = world
            .spawn("Player", true, vec![Transform::at(Vector2::ZERO).into()])
            .unwrap();

        let err = world.load_level(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));

        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        assert!(matches!(world.save_level(&blocker), Err(EngineError::Io(_))));
        let err = world
            .save_entity_to_file(id, blocker.join("player.json"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
    }

    #[test]
    fn test_file_names() {
        let mut world = World::default();
        let id = world
            .spawn("Dropped Item Applex3, 42", true, vec![Transform::at(Vector2::ZERO).into()])
            .unwrap();
        assert_eq!(
            file_name_for(world.entity(id).unwrap()),
            "0000_Dropped_Item_Applex3__42.json"
        );
    }
}
