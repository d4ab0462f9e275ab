//! Engine configuration loaded from a JSON file

use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::Result;

/// Main configuration for an engine instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory that relative image and tile paths are resolved against
    #[serde(default = "default_asset_root")]
    pub asset_root: PathBuf,
    /// Interval of the animation driver
    #[serde(default = "default_animation_tick_ms")]
    pub animation_tick_ms: u64,
    /// Interval of the update/render driver
    #[serde(default = "default_frame_tick_ms")]
    pub frame_tick_ms: u64,
    /// Debug overlay flag given to colliders the engine creates on its own
    #[serde(default)]
    pub debug_draw: bool,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Radius of the interact collider given to non-player inventories
    #[serde(default = "default_interact_range")]
    pub interact_range: f32,
    #[serde(default = "default_setup_delay_ms")]
    pub interact_collider_delay_ms: u64,
    #[serde(default = "default_setup_delay_ms")]
    pub dropped_item_hitbox_delay_ms: u64,
    /// How long a freshly dropped item refuses to be collected
    #[serde(default = "default_pickup_delay_ms")]
    pub dropped_item_pickup_delay_ms: u64,
    #[serde(default = "default_hitbox_size")]
    pub dropped_item_hitbox_size: f32,
    #[serde(default = "default_dropped_item_scale")]
    pub dropped_item_scale: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_asset_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_animation_tick_ms() -> u64 {
    10
}

fn default_frame_tick_ms() -> u64 {
    16
}

fn default_interact_range() -> f32 {
    75.0
}

fn default_setup_delay_ms() -> u64 {
    10
}

fn default_pickup_delay_ms() -> u64 {
    3000
}

fn default_hitbox_size() -> f32 {
    100.0
}

fn default_dropped_item_scale() -> f32 {
    2.5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            asset_root: default_asset_root(),
            animation_tick_ms: default_animation_tick_ms(),
            frame_tick_ms: default_frame_tick_ms(),
            debug_draw: false,
            inventory: InventoryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            interact_range: default_interact_range(),
            interact_collider_delay_ms: default_setup_delay_ms(),
            dropped_item_hitbox_delay_ms: default_setup_delay_ms(),
            dropped_item_pickup_delay_ms: default_pickup_delay_ms(),
            dropped_item_hitbox_size: default_hitbox_size(),
            dropped_item_scale: default_dropped_item_scale(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// Parsed log level, falling back to `Info` for unrecognised names
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(&self.level).unwrap_or_else(|_| {
            warn!("Unknown log level \"{}\", using info", self.level);
            LevelFilter::Info
        })
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: EngineConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(serialized.as_bytes())?;
        Ok(())
    }

    pub fn with_asset_root<P: Into<PathBuf>>(mut self, asset_root: P) -> Self {
        self.asset_root = asset_root.into();
        self
    }
}
