//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use tm_engine::index::{Index, IndexMode};
use tm_engine::{Locator, SystemConfig, TopicMap, TopicMapSystem, TopicMapSystemFactory};
use tracing_subscriber::EnvFilter;

/// Both index modes; tests that query indices run once per mode.
pub const MODES: [IndexMode; 2] = [IndexMode::Auto, IndexMode::Manual];

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn loc(reference: &str) -> Locator {
    Locator::parse(reference).unwrap()
}

pub fn system(mode: IndexMode, automerge: bool) -> TopicMapSystem {
    init_tracing();
    let config = SystemConfig {
        automerge,
        index_mode: mode,
        ..Default::default()
    };
    TopicMapSystemFactory::with_config(config).new_topic_map_system()
}

/// A fresh map in its own system.
pub fn map(mode: IndexMode) -> Arc<TopicMap> {
    system(mode, false)
        .create_topic_map("http://example.org/test")
        .unwrap()
}

pub fn automerge_map(mode: IndexMode) -> Arc<TopicMap> {
    system(mode, true)
        .create_topic_map("http://example.org/test")
        .unwrap()
}

/// Manual indices only answer for the state as of their last reindex.
pub fn reindex_if_manual(index: &mut impl Index) {
    if !index.is_auto_updated() {
        index.reindex();
    }
}

pub fn sorted<T: Ord>(mut items: Vec<T>) -> Vec<T> {
    items.sort();
    items
}
