//! Presentation catalog
//!
//! Presentations are TOML files seeded from a directory at startup and
//! editable over the API. Slide image bytes are not stored here; slides
//! carry image references the agents resolve themselves.

use dashmap::DashMap;
use std::path::Path;

use sw_core::error::ConfigError;
use sw_protocol::{Presentation, PresentationId};

/// Catalog of presentations keyed by ID
pub struct PresentationStore {
    presentations: DashMap<PresentationId, Presentation>,
}

impl PresentationStore {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            presentations: DashMap::new(),
        }
    }

    /// Load every `*.toml` file in a directory into the catalog.
    ///
    /// Files that fail to parse are skipped with a warning so one bad deck
    /// cannot keep the daemon from starting.
    pub fn load_dir(&self, dir: &Path) -> Result<usize, ConfigError> {
        if !dir.is_dir() {
            return Err(ConfigError::Invalid(format!(
                "Presentation directory not found: {}",
                dir.display()
            )));
        }

        let mut loaded = 0;
        let entries = std::fs::read_dir(dir)
            .map_err(|e| ConfigError::Invalid(format!("Failed to read {}: {}", dir.display(), e)))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            match std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::Invalid(format!("Failed to read {}: {}", path.display(), e)))
                .and_then(|text| toml::from_str::<Presentation>(&text).map_err(ConfigError::from))
            {
                Ok(presentation) => {
                    tracing::debug!(
                        "Loaded {} ({} slides) from {}",
                        presentation.id,
                        presentation.slides.len(),
                        path.display()
                    );
                    self.upsert(presentation);
                    loaded += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                }
            }
        }
        Ok(loaded)
    }

    /// Insert or replace a presentation
    pub fn upsert(&self, presentation: Presentation) {
        self.presentations.insert(presentation.id, presentation);
    }

    /// Fetch a presentation by ID
    pub fn get(&self, id: PresentationId) -> Option<Presentation> {
        self.presentations.get(&id).map(|p| p.clone())
    }

    /// Whether a presentation exists
    pub fn contains(&self, id: PresentationId) -> bool {
        self.presentations.contains_key(&id)
    }

    /// Number of catalog entries
    pub fn len(&self) -> usize {
        self.presentations.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.presentations.is_empty()
    }
}

impl Default for PresentationStore {
    fn default() -> Self {
        Self::new()
    }
}
