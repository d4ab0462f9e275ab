//! A small entity/component game engine core: named entities with ordered
//! components, collider overlap queries, frame animations, render queues and
//! a tagged JSON format for saving and loading entities.

pub mod animation;
pub mod collision;
pub mod config;
pub mod ecs;
pub mod error;
pub mod game;
pub mod inventory;
pub mod math;
pub mod render;
pub mod save;
pub mod tasks;
pub mod tilemap;

pub use crate::config::EngineConfig;
pub use crate::ecs::{ComponentHandle, ComponentKind, Entity, EntityId, System, World};
pub use crate::error::{EngineError, ErrorKind, Result};
pub use crate::game::Game;
pub use crate::math::Vector2;
