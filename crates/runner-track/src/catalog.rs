//! Segment catalog with ordered storage and fast lookup.
//!
//! Catalog order matters: index 0 is the designated start segment placed
//! first in every fresh level.

use std::sync::Arc;

use ahash::AHashMap;
use runner_common::{CatalogError, SegmentId};

use crate::segment::SegmentDefinition;

/// Ordered registry of segment definitions.
#[derive(Debug, Clone, Default)]
pub struct SegmentCatalog {
    /// Definitions in catalog order
    segments: Vec<Arc<SegmentDefinition>>,
    /// Catalog index by ID
    by_id: AHashMap<SegmentId, usize>,
    /// Catalog index by name (lowercase)
    by_name: AHashMap<String, usize>,
}

impl SegmentCatalog {
    /// Creates a new empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from definitions in order.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = SegmentDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for definition in definitions {
            catalog.register(definition)?;
        }
        Ok(catalog)
    }

    /// Appends a definition.
    pub fn register(&mut self, definition: SegmentDefinition) -> Result<(), CatalogError> {
        if self.by_id.contains_key(&definition.id()) {
            return Err(CatalogError::DuplicateId(definition.id().raw()));
        }

        let index = self.segments.len();
        self.by_id.insert(definition.id(), index);
        self.by_name.insert(definition.name().to_lowercase(), index);
        self.segments.push(Arc::new(definition));
        Ok(())
    }

    /// Returns the number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Definition at a catalog index.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Arc<SegmentDefinition>> {
        self.segments.get(index)
    }

    /// The designated start segment (index 0).
    pub fn start(&self) -> Result<&Arc<SegmentDefinition>, CatalogError> {
        self.segments.first().ok_or(CatalogError::Empty)
    }

    /// Gets a definition by ID.
    #[must_use]
    pub fn get(&self, id: SegmentId) -> Option<&Arc<SegmentDefinition>> {
        self.by_id.get(&id).and_then(|&i| self.segments.get(i))
    }

    /// Gets a definition by name (case-insensitive).
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Arc<SegmentDefinition>> {
        self.by_name
            .get(&name.to_lowercase())
            .and_then(|&i| self.segments.get(i))
    }

    /// Iterates definitions in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<SegmentDefinition>> {
        self.segments.iter()
    }

    /// Number of fork segments.
    #[must_use]
    pub fn fork_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_fork()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{fork_segment, straight_segment};

    #[test]
    fn test_register_and_lookup() {
        let catalog = SegmentCatalog::from_definitions([
            straight_segment(0, "Start", 10.0).expect("start"),
            fork_segment(1, "Fork", 10.0).expect("fork"),
        ])
        .expect("valid catalog");

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.start().expect("start").name(), "Start");
        assert_eq!(catalog.get(SegmentId::new(1)).expect("fork").exits(), 2);
        assert!(catalog.get_by_name("FORK").is_some());
        assert!(catalog.get_by_name("missing").is_none());
        assert_eq!(catalog.fork_count(), 1);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut catalog = SegmentCatalog::new();
        catalog
            .register(straight_segment(4, "A", 10.0).expect("a"))
            .expect("first");
        let result = catalog.register(straight_segment(4, "B", 10.0).expect("b"));
        assert_eq!(result, Err(CatalogError::DuplicateId(4)));
    }

    #[test]
    fn test_empty_catalog_has_no_start() {
        let catalog = SegmentCatalog::new();
        assert!(catalog.is_empty());
        assert_eq!(catalog.start().err(), Some(CatalogError::Empty));
    }
}
