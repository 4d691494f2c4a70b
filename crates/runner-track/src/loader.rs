//! Segment catalog loading from TOML.
//!
//! A catalog file lists segments in catalog order; the first one is the
//! start platform. Socket and item frames are given as a position plus a
//! yaw in degrees, rails as named point lists (`CenterIn`, `LeftOutL`, ...).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use runner_common::{CatalogError, SchemaVersion, SegmentId, Transform};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::SegmentCatalog;
use crate::segment::{
    DecorationGroup, DecorationItem, LocalBox, RailKey, SegmentDefinition, SlotTag, SocketRole,
};

/// Default catalog location.
pub const DEFAULT_CATALOG_PATH: &str = "assets/segments.toml";

/// Errors that can occur while loading a catalog file.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    /// File not found.
    #[error("Catalog file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read file.
    #[error("Failed to read catalog file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse catalog TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Schema version not readable by this build.
    #[error("Unsupported catalog version {found} (expected {expected})")]
    Version {
        /// Supported version
        expected: SchemaVersion,
        /// Version string in the file
        found: String,
    },

    /// A segment failed validation.
    #[error("Invalid catalog: {0}")]
    Invalid(#[from] CatalogError),
}

/// Result type for catalog loading.
pub type CatalogLoadResult<T> = Result<T, CatalogLoadError>;

/// A position and heading in a catalog file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrameDef {
    /// Local position
    pub position: Vec3,
    /// Heading around +Y in degrees, positive turns right
    #[serde(default)]
    pub yaw: f32,
}

impl FrameDef {
    fn transform(self) -> Transform {
        Transform::from_yaw_degrees(self.position, self.yaw)
    }
}

/// An item slot in a catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotDef {
    /// Accepted categories
    pub tag: SlotTag,
    /// Slot frame
    #[serde(flatten)]
    pub frame: FrameDef,
}

/// A decoration prop in a catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecorationDef {
    /// Prefab name
    pub prefab: String,
    /// Prop frame
    #[serde(flatten)]
    pub frame: FrameDef,
    /// Plays a looping animation when enabled
    #[serde(default)]
    pub animated: bool,
}

/// A decoration group in a catalog file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupDef {
    /// Props
    #[serde(default)]
    pub items: Vec<DecorationDef>,
}

/// An axis-aligned floor collider in a catalog file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ColliderDef {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

/// A segment definition as written in a catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentFileDef {
    /// Unique segment identifier
    pub id: u32,
    /// Display name
    pub name: String,
    /// Prefab name (defaults to `Objects/<name>.xml`)
    #[serde(default)]
    pub prefab: Option<String>,
    /// Declared exit count
    #[serde(default)]
    pub exits: u32,
    /// Sockets by role name
    pub sockets: BTreeMap<String, FrameDef>,
    /// Rails by name
    pub rails: BTreeMap<String, Vec<Vec3>>,
    /// Item slots
    #[serde(default)]
    pub slots: Vec<SlotDef>,
    /// Decoration groups
    #[serde(default)]
    pub groups: Vec<GroupDef>,
    /// Floor colliders
    #[serde(default)]
    pub colliders: Vec<ColliderDef>,
}

fn parse_socket_role(segment: &str, name: &str) -> Result<SocketRole, CatalogError> {
    SocketRole::ALL
        .into_iter()
        .find(|role| role.suffix() == name)
        .ok_or_else(|| CatalogError::InvalidData(format!("segment '{segment}': unknown socket '{name}'")))
}

impl SegmentFileDef {
    /// Validates and converts into a rebased definition.
    pub fn into_definition(self) -> Result<SegmentDefinition, CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::InvalidData(format!("segment {} has no name", self.id)));
        }

        let prefab = self
            .prefab
            .unwrap_or_else(|| format!("Objects/{}.xml", self.name));
        let mut builder = SegmentDefinition::builder(SegmentId::new(self.id), &self.name)
            .prefab(prefab)
            .exits(self.exits);

        for (name, frame) in &self.sockets {
            builder = builder.socket(parse_socket_role(&self.name, name)?, frame.transform());
        }
        for (name, points) in self.rails {
            let key: RailKey = name.parse()?;
            builder = builder.rail(key.side, key.socket, points);
        }
        for slot in &self.slots {
            builder = builder.slot(slot.tag, slot.frame.transform());
        }
        for group in self.groups {
            builder = builder.group(DecorationGroup {
                items: group
                    .items
                    .into_iter()
                    .map(|item| DecorationItem {
                        local: item.frame.transform(),
                        prefab: item.prefab,
                        animated: item.animated,
                    })
                    .collect(),
            });
        }
        for collider in &self.colliders {
            builder = builder.collider(LocalBox::from_min_max(collider.min, collider.max));
        }

        builder.build()
    }
}

/// A whole catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    /// File format version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Segments in catalog order.
    pub segments: Vec<SegmentFileDef>,
}

fn default_version() -> String {
    SchemaVersion::SEGMENT_CATALOG.to_string()
}

impl CatalogFile {
    /// Parses a catalog file from TOML text.
    pub fn from_toml(content: &str) -> CatalogLoadResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Checks the version and builds the catalog.
    pub fn into_catalog(self) -> CatalogLoadResult<SegmentCatalog> {
        let supported = SchemaVersion::SEGMENT_CATALOG;
        match SchemaVersion::parse(&self.version) {
            Some(version) if supported.can_read(&version) => {},
            _ => {
                return Err(CatalogLoadError::Version {
                    expected: supported,
                    found: self.version,
                })
            },
        }

        let definitions = self
            .segments
            .into_iter()
            .map(SegmentFileDef::into_definition)
            .collect::<Result<Vec<_>, _>>()?;
        if definitions.is_empty() {
            return Err(CatalogError::Empty.into());
        }
        Ok(SegmentCatalog::from_definitions(definitions)?)
    }
}

/// Statistics for the catalog loader.
#[derive(Debug, Default, Clone)]
pub struct CatalogLoaderStats {
    /// Number of files loaded.
    pub files_loaded: u32,
    /// Number of segments loaded.
    pub segments_loaded: u32,
    /// Number of fork segments loaded.
    pub forks_loaded: u32,
    /// Number of failed loads.
    pub failures: u32,
}

/// Loads segment catalogs from disk.
#[derive(Debug)]
pub struct CatalogLoader {
    path: PathBuf,
    stats: CatalogLoaderStats,
}

impl CatalogLoader {
    /// Creates a loader for a catalog file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stats: CatalogLoaderStats::default(),
        }
    }

    /// Creates a loader for [`DEFAULT_CATALOG_PATH`].
    #[must_use]
    pub fn with_default_path() -> Self {
        Self::new(DEFAULT_CATALOG_PATH)
    }

    /// Returns the catalog path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns loader statistics.
    #[must_use]
    pub fn stats(&self) -> &CatalogLoaderStats {
        &self.stats
    }

    /// Loads and validates the catalog.
    pub fn load(&mut self) -> CatalogLoadResult<SegmentCatalog> {
        let result = self.load_inner();
        match &result {
            Ok(catalog) => {
                self.stats.files_loaded += 1;
                self.stats.segments_loaded += catalog.len() as u32;
                self.stats.forks_loaded += catalog.fork_count() as u32;
                info!(
                    "Loaded {} segments ({} forks) from {}",
                    catalog.len(),
                    catalog.fork_count(),
                    self.path.display()
                );
            },
            Err(_) => self.stats.failures += 1,
        }
        result
    }

    fn load_inner(&self) -> CatalogLoadResult<SegmentCatalog> {
        if !self.path.exists() {
            return Err(CatalogLoadError::NotFound(self.path.clone()));
        }
        debug!("Loading catalog file: {:?}", self.path);
        let content = fs::read_to_string(&self.path)?;
        CatalogFile::from_toml(&content)?.into_catalog()
    }
}
