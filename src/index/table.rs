//! Posting tables backing the literal, scoped and type-instance indices.
//!
//! The topic map keeps one [`IndexTables`] in sync with every mutation by
//! removing a construct's [`TableEntry`] set before the change and
//! re-adding it afterwards. Manual-mode indices instead read a copy rebuilt
//! from the construct store with [`IndexTables::rebuild`].

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::construct::{AssociationId, NameId, OccurrenceId, RoleId, TopicId, VariantId};
use crate::locator::Locator;
use crate::map::MapState;

/// Multimap from a key to a set of values. Empty buckets are pruned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Postings<K: Eq + Hash, V: Eq + Hash> {
    map: HashMap<K, HashSet<V>>,
}

impl<K: Eq + Hash + Clone, V: Eq + Hash + Copy> Postings<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, key: K, value: V) {
        self.map.entry(key).or_default().insert(value);
    }

    pub(crate) fn remove(&mut self, key: &K, value: &V) {
        if let Some(bucket) = self.map.get_mut(key) {
            bucket.remove(value);
            if bucket.is_empty() {
                self.map.remove(key);
            }
        }
    }

    pub(crate) fn get(&self, key: &K) -> Option<&HashSet<V>> {
        self.map.get(key)
    }

    /// Values stored under `key`, as an owned list.
    pub(crate) fn values(&self, key: &K) -> Vec<V> {
        self.map
            .get(key)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &K> {
        self.map.keys()
    }

    /// Values stored under every key (`match_all`) or any key of `keys`.
    pub(crate) fn matching(&self, keys: &[K], match_all: bool) -> Vec<V> {
        if match_all {
            let mut buckets = keys.iter().map(|k| self.map.get(k));
            let Some(Some(first)) = buckets.next() else {
                return Vec::new();
            };
            let mut acc: HashSet<V> = first.clone();
            for bucket in buckets {
                match bucket {
                    Some(bucket) => acc.retain(|v| bucket.contains(v)),
                    None => return Vec::new(),
                }
            }
            acc.into_iter().collect()
        } else {
            let mut acc: HashSet<V> = HashSet::new();
            for key in keys {
                if let Some(bucket) = self.map.get(key) {
                    acc.extend(bucket.iter().copied());
                }
            }
            acc.into_iter().collect()
        }
    }
}

impl<K: Eq + Hash + Clone, V: Eq + Hash + Copy> Default for Postings<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// One posting contributed by a construct.
///
/// Scope keys use `None` for the unconstrained scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TableEntry {
    TopicType(Option<TopicId>, TopicId),
    AssociationType(TopicId, AssociationId),
    RoleType(TopicId, RoleId),
    NameType(TopicId, NameId),
    OccurrenceType(TopicId, OccurrenceId),
    AssociationTheme(Option<TopicId>, AssociationId),
    NameTheme(Option<TopicId>, NameId),
    OccurrenceTheme(Option<TopicId>, OccurrenceId),
    VariantTheme(TopicId, VariantId),
    NameValue(String, NameId),
    OccurrenceValue((String, Locator), OccurrenceId),
    VariantValue((String, Locator), VariantId),
}

/// Every posting table maintained for a topic map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct IndexTables {
    pub(crate) topic_types: Postings<Option<TopicId>, TopicId>,
    pub(crate) association_types: Postings<TopicId, AssociationId>,
    pub(crate) role_types: Postings<TopicId, RoleId>,
    pub(crate) name_types: Postings<TopicId, NameId>,
    pub(crate) occurrence_types: Postings<TopicId, OccurrenceId>,
    pub(crate) association_themes: Postings<Option<TopicId>, AssociationId>,
    pub(crate) name_themes: Postings<Option<TopicId>, NameId>,
    pub(crate) occurrence_themes: Postings<Option<TopicId>, OccurrenceId>,
    pub(crate) variant_themes: Postings<TopicId, VariantId>,
    pub(crate) name_values: Postings<String, NameId>,
    pub(crate) occurrence_values: Postings<(String, Locator), OccurrenceId>,
    pub(crate) variant_values: Postings<(String, Locator), VariantId>,
}

impl IndexTables {
    pub(crate) fn insert(&mut self, entry: TableEntry) {
        match entry {
            TableEntry::TopicType(k, v) => self.topic_types.insert(k, v),
            TableEntry::AssociationType(k, v) => self.association_types.insert(k, v),
            TableEntry::RoleType(k, v) => self.role_types.insert(k, v),
            TableEntry::NameType(k, v) => self.name_types.insert(k, v),
            TableEntry::OccurrenceType(k, v) => self.occurrence_types.insert(k, v),
            TableEntry::AssociationTheme(k, v) => self.association_themes.insert(k, v),
            TableEntry::NameTheme(k, v) => self.name_themes.insert(k, v),
            TableEntry::OccurrenceTheme(k, v) => self.occurrence_themes.insert(k, v),
            TableEntry::VariantTheme(k, v) => self.variant_themes.insert(k, v),
            TableEntry::NameValue(k, v) => self.name_values.insert(k, v),
            TableEntry::OccurrenceValue(k, v) => self.occurrence_values.insert(k, v),
            TableEntry::VariantValue(k, v) => self.variant_values.insert(k, v),
        }
    }

    pub(crate) fn remove(&mut self, entry: &TableEntry) {
        match entry {
            TableEntry::TopicType(k, v) => self.topic_types.remove(k, v),
            TableEntry::AssociationType(k, v) => self.association_types.remove(k, v),
            TableEntry::RoleType(k, v) => self.role_types.remove(k, v),
            TableEntry::NameType(k, v) => self.name_types.remove(k, v),
            TableEntry::OccurrenceType(k, v) => self.occurrence_types.remove(k, v),
            TableEntry::AssociationTheme(k, v) => self.association_themes.remove(k, v),
            TableEntry::NameTheme(k, v) => self.name_themes.remove(k, v),
            TableEntry::OccurrenceTheme(k, v) => self.occurrence_themes.remove(k, v),
            TableEntry::VariantTheme(k, v) => self.variant_themes.remove(k, v),
            TableEntry::NameValue(k, v) => self.name_values.remove(k, v),
            TableEntry::OccurrenceValue(k, v) => self.occurrence_values.remove(k, v),
            TableEntry::VariantValue(k, v) => self.variant_values.remove(k, v),
        }
    }

    /// Build the tables from scratch out of the construct store.
    pub(crate) fn rebuild(state: &MapState) -> Self {
        let mut tables = Self::default();
        for construct in state.all_constructs() {
            for entry in state.table_entries(construct) {
                tables.insert(entry);
            }
        }
        tables
    }
}

/// Scope keys for a posting table: `None` stands for the unconstrained scope.
pub(crate) fn scope_keys(scope: &HashSet<TopicId>) -> Vec<Option<TopicId>> {
    if scope.is_empty() {
        vec![None]
    } else {
        scope.iter().copied().map(Some).collect()
    }
}
