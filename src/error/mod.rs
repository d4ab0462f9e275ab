//! Error taxonomy shared by every subsystem of the engine

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Broad classification of an [`EngineError`], used by callers that only
/// care whether a failure was caused by bad data, a broken invariant, a
/// missing lookup target or a missing asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    InvariantViolation,
    LookupFailure,
    Resource,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("unknown component type \"{0}\"")]
    UnknownComponentType(String),

    #[error("entity \"{0}\" does not contain a (mandatory) Transform component")]
    MissingTransform(String),

    #[error("entity \"{name}\" contains {count} Transform components, exactly one is allowed")]
    DuplicateTransform { name: String, count: usize },

    #[error("an entity named \"{0}\" is already registered")]
    DuplicateName(String),

    #[error("can't remove the Transform component from entity \"{0}\"")]
    TransformRemoval(String),

    #[error("no room for \"{0}\" in the target inventory")]
    InventoryFull(String),

    #[error("entity {0} not found")]
    EntityNotFound(String),

    #[error("component {component} not found on entity \"{entity}\"")]
    ComponentNotFound { entity: String, component: String },

    #[error("animation \"{0}\" not found")]
    AnimationNotFound(String),

    #[error("animator on entity \"{0}\" is not playing")]
    NotPlaying(String),

    #[error("item \"{0}\" not found")]
    ItemNotFound(String),

    #[error("missing asset {}", .0.display())]
    MissingAsset(PathBuf),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Malformed(_)
            | EngineError::UnknownComponentType(_)
            | EngineError::Io(_)
            | EngineError::Json(_) => ErrorKind::Configuration,
            EngineError::MissingTransform(_)
            | EngineError::DuplicateTransform { .. }
            | EngineError::DuplicateName(_)
            | EngineError::TransformRemoval(_)
            | EngineError::InventoryFull(_) => ErrorKind::InvariantViolation,
            EngineError::EntityNotFound(_)
            | EngineError::ComponentNotFound { .. }
            | EngineError::AnimationNotFound(_)
            | EngineError::NotPlaying(_)
            | EngineError::ItemNotFound(_) => ErrorKind::LookupFailure,
            EngineError::MissingAsset(_) => ErrorKind::Resource,
        }
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
