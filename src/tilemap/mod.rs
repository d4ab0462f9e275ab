use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::ecs::component::ImageRef;
use crate::error::{EngineError, Result};
use crate::math::Vector2;

/// Tile definition document: a symbol table plus a row-major symbol array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileDefinition {
    pub tile_sources: BTreeMap<String, String>,
    pub map_width: usize,
    pub map_height: usize,
    pub tile_width: f32,
    pub tile_height: f32,
    pub tiles: Vec<String>,
}

impl TileDefinition {
    /// Load and validate a tile definition file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(EngineError::MissingAsset(path.to_path_buf()));
        }

        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let definition: TileDefinition = serde_json::from_str(&contents)?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn validate(&self) -> Result<()> {
        let Some(expected) = self.map_width.checked_mul(self.map_height) else {
            return Err(EngineError::Malformed(format!(
                "tilemap dimensions {}x{} are too large",
                self.map_width, self.map_height
            )));
        };
        if self.tiles.len() != expected {
            return Err(EngineError::Malformed(format!(
                "tilemap is {}x{} but has {} tiles",
                self.map_width,
                self.map_height,
                self.tiles.len()
            )));
        }
        Ok(())
    }
}

/// Component drawing a grid of tiles
#[derive(Debug, Clone)]
pub struct Tilemap {
    /// Definition file the map was loaded from, relative to the asset root
    source: Option<String>,
    definition: TileDefinition,
    grid: Option<Vec<Option<ImageRef>>>,
}

impl Tilemap {
    pub fn new(definition: TileDefinition) -> Self {
        Self {
            source: None,
            definition,
            grid: None,
        }
    }

    pub fn with_source<S: Into<String>>(mut self, source: S) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Load the definition file at `asset_root/source`
    pub fn from_definition_file(asset_root: &Path, source: &str) -> Result<Self> {
        let definition = TileDefinition::from_file(asset_root.join(source))?;
        Ok(Self::new(definition).with_source(source))
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn definition(&self) -> &TileDefinition {
        &self.definition
    }

    pub fn tile_size(&self) -> Vector2 {
        Vector2::new(self.definition.tile_width, self.definition.tile_height)
    }

    pub fn is_built(&self) -> bool {
        self.grid.is_some()
    }

    /// Build the image grid once, unknown symbols become empty cells
    pub fn build_grid(&mut self) {
        if self.grid.is_some() {
            return;
        }

        let mut unknown = 0;
        let grid: Vec<Option<ImageRef>> = self
            .definition
            .tiles
            .iter()
            .map(|symbol| match self.definition.tile_sources.get(symbol) {
                Some(path) => Some(ImageRef::new(path.as_str())),
                None => {
                    unknown += 1;
                    error!("Tile symbol \"{symbol}\" has no image, leaving the cell empty");
                    None
                }
            })
            .collect();
        self.grid = Some(grid);

        info!(
            "Tilemap {}x{} built ({unknown} empty cells)",
            self.definition.map_width, self.definition.map_height
        );
    }

    /// Row-major cells, empty until the grid is built
    pub fn cells(&self) -> &[Option<ImageRef>] {
        self.grid.as_deref().unwrap_or(&[])
    }

    pub fn cell(&self, column: usize, row: usize) -> Option<&ImageRef> {
        if column >= self.definition.map_width || row >= self.definition.map_height {
            return None;
        }
        let index = row
            .checked_mul(self.definition.map_width)?
            .checked_add(column)?;
        self.cells().get(index)?.as_ref()
    }
}
