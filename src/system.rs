//! Topic map systems: the factory, its feature flags and the registry of maps.
//!
//! A [`TopicMapSystemFactory`] collects features and properties and produces
//! a [`TopicMapSystem`], which owns every topic map it creates keyed by the
//! map's storage locator.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{SystemError, SystemResult, TmResult};
use crate::index::IndexMode;
use crate::locator::{IntoLocator, Locator};
use crate::map::TopicMap;

/// Feature names understood by the factory.
pub mod features {
    /// Merge topics on identity collisions instead of failing.
    pub const AUTOMERGE: &str = "http://tmapi.org/features/automerge";
    pub const MERGE_BY_TOPIC_NAME: &str = "http://tmapi.org/features/merge/byTopicName";
    pub const READ_ONLY: &str = "http://tmapi.org/features/readOnly";
    pub const TYPE_INSTANCE_ASSOCIATIONS: &str =
        "http://tmapi.org/features/type-instance-associations";

    /// Features that exist but can only be switched off.
    pub(crate) const FIXED_OFF: [&str; 3] =
        [MERGE_BY_TOPIC_NAME, READ_ONLY, TYPE_INSTANCE_ASSOCIATIONS];
}

/// Settings for a topic map system, typically loaded from TOML.
///
/// ```toml
/// automerge = true
/// index_mode = "manual"
///
/// [properties]
/// "com.example.cache" = "off"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub automerge: bool,
    pub index_mode: IndexMode,
    pub properties: HashMap<String, String>,
}

impl SystemConfig {
    pub fn from_toml_str(content: &str) -> SystemResult<Self> {
        toml::from_str(content).map_err(|e| SystemError::InvalidConfig {
            message: e.to_string(),
        })
    }

    /// Read a configuration file.
    pub fn load(path: impl AsRef<Path>) -> SystemResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SystemError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    fn feature(&self, name: &str) -> SystemResult<bool> {
        if name == features::AUTOMERGE {
            Ok(self.automerge)
        } else if features::FIXED_OFF.contains(&name) {
            Ok(false)
        } else {
            Err(SystemError::FeatureNotRecognized { name: name.into() })
        }
    }

    fn set_feature(&mut self, name: &str, value: bool) -> SystemResult<()> {
        if name == features::AUTOMERGE {
            self.automerge = value;
            Ok(())
        } else if features::FIXED_OFF.contains(&name) {
            if value {
                Err(SystemError::FeatureNotSupported {
                    name: name.into(),
                    value,
                })
            } else {
                Ok(())
            }
        } else {
            Err(SystemError::FeatureNotRecognized { name: name.into() })
        }
    }
}

/// Builds [`TopicMapSystem`]s with a chosen set of features and properties.
#[derive(Debug, Clone, Default)]
pub struct TopicMapSystemFactory {
    config: SystemConfig,
}

impl TopicMapSystemFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SystemConfig) -> Self {
        Self { config }
    }

    /// Current value of a feature.
    pub fn feature(&self, name: &str) -> SystemResult<bool> {
        self.config.feature(name)
    }

    /// Whether the factory knows the feature at all.
    pub fn has_feature(&self, name: &str) -> bool {
        self.config.feature(name).is_ok()
    }

    pub fn set_feature(&mut self, name: &str, value: bool) -> SystemResult<()> {
        self.config.set_feature(name, value)
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.config.properties.get(name).map(String::as_str)
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.config.properties.insert(name.into(), value.into());
    }

    pub fn remove_property(&mut self, name: &str) -> Option<String> {
        self.config.properties.remove(name)
    }

    pub fn new_topic_map_system(&self) -> TopicMapSystem {
        tracing::info!(
            automerge = self.config.automerge,
            index_mode = ?self.config.index_mode,
            "creating topic map system"
        );
        TopicMapSystem {
            config: self.config.clone(),
            maps: DashMap::new(),
        }
    }
}

/// Registry of topic maps keyed by their storage locator.
pub struct TopicMapSystem {
    config: SystemConfig,
    maps: DashMap<Locator, Arc<TopicMap>>,
}

impl TopicMapSystem {
    /// Create an empty topic map at `locator`.
    ///
    /// Fails if the system already holds a map at that address.
    pub fn create_topic_map(&self, locator: impl IntoLocator) -> TmResult<Arc<TopicMap>> {
        let locator = locator.into_locator()?;
        match self.maps.entry(locator.clone()) {
            Entry::Occupied(_) => Err(SystemError::TopicMapExists { locator }.into()),
            Entry::Vacant(slot) => {
                let map = Arc::new(TopicMap::new(
                    locator.clone(),
                    self.config.automerge,
                    self.config.index_mode,
                )?);
                slot.insert(Arc::clone(&map));
                tracing::info!(%locator, "created topic map");
                Ok(map)
            }
        }
    }

    pub fn topic_map(&self, locator: &Locator) -> Option<Arc<TopicMap>> {
        self.maps.get(locator).map(|entry| Arc::clone(entry.value()))
    }

    /// Storage locators of every map in the system.
    pub fn locators(&self) -> Vec<Locator> {
        self.maps.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Drop a map from the system, freeing its address.
    pub fn remove_topic_map(&self, locator: &Locator) -> Option<Arc<TopicMap>> {
        let removed = self.maps.remove(locator).map(|(_, map)| map);
        if removed.is_some() {
            tracing::info!(%locator, "removed topic map");
        }
        removed
    }

    /// Parse an absolute IRI into a locator.
    pub fn create_locator(&self, reference: &str) -> TmResult<Locator> {
        Ok(Locator::parse(reference)?)
    }

    pub fn feature(&self, name: &str) -> SystemResult<bool> {
        self.config.feature(name)
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.config.properties.get(name).map(String::as_str)
    }

    /// Release every topic map held by the system.
    pub fn close(&self) {
        tracing::info!(maps = self.maps.len(), "closing topic map system");
        self.maps.clear();
    }
}

impl std::fmt::Debug for TopicMapSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicMapSystem")
            .field("config", &self.config)
            .field("maps", &self.maps.len())
            .finish()
    }
}
