//! Topic maps: the construct store, identity registry, merge engine and
//! scope/type model behind a single lock.
//!
//! A [`TopicMap`] owns every construct created through it. Callers hold
//! typed ids ([`TopicId`], [`NameId`], ...) and pass them back to the map;
//! every public mutation takes the write lock once, so the identity
//! registry and the index tables never observe a half-applied change.
//!
//! The operations are split by concern:
//!
//! - [`store`]: creation, removal and child collections
//! - [`identity`]: item identifiers, subject identifiers, subject locators, reification
//! - [`scope`]: scope themes, types and topic types
//! - [`merge`]: topic merging and whole-map merging

pub mod identity;
mod merge;
mod scope;
mod store;

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::construct::{
    self, AssociationId, ConstructRef, NameId, OccurrenceId, RoleId, TopicId, TopicMapId,
    VariantId,
};
use crate::error::{ModelError, TmResult};
use crate::index::table::{scope_keys, IndexTables, TableEntry};
use crate::index::IndexMode;
use crate::literal::Literal;
use crate::locator::Locator;

pub use identity::IdentityKind;
use identity::IdentityRegistry;

/// Subject identifier of the default topic name type.
pub const TOPIC_NAME_TYPE: &str = "http://psi.topicmaps.org/iso13250/model/topic-name";

#[derive(Debug, Clone, Default)]
pub(crate) struct TopicData {
    pub(crate) item_identifiers: HashSet<Locator>,
    /// Item identifiers generated only to give the topic an identity.
    pub(crate) placeholders: HashSet<Locator>,
    pub(crate) subject_identifiers: HashSet<Locator>,
    pub(crate) subject_locators: HashSet<Locator>,
    pub(crate) types: HashSet<TopicId>,
    pub(crate) names: HashSet<NameId>,
    pub(crate) occurrences: HashSet<OccurrenceId>,
    pub(crate) roles_played: HashSet<RoleId>,
    pub(crate) reified: Option<ConstructRef>,
}

impl TopicData {
    /// Whether any identifier was supplied by a caller.
    pub(crate) fn has_supplied_identity(&self) -> bool {
        !self.subject_identifiers.is_empty()
            || !self.subject_locators.is_empty()
            || self.item_identifiers.len() > self.placeholders.len()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AssociationData {
    pub(crate) item_identifiers: HashSet<Locator>,
    pub(crate) reifier: Option<TopicId>,
    pub(crate) ty: TopicId,
    pub(crate) scope: HashSet<TopicId>,
    pub(crate) roles: HashSet<RoleId>,
}

#[derive(Debug, Clone)]
pub(crate) struct RoleData {
    pub(crate) item_identifiers: HashSet<Locator>,
    pub(crate) reifier: Option<TopicId>,
    pub(crate) parent: AssociationId,
    pub(crate) ty: TopicId,
    pub(crate) player: TopicId,
}

#[derive(Debug, Clone)]
pub(crate) struct NameData {
    pub(crate) item_identifiers: HashSet<Locator>,
    pub(crate) reifier: Option<TopicId>,
    pub(crate) parent: TopicId,
    pub(crate) ty: TopicId,
    pub(crate) scope: HashSet<TopicId>,
    pub(crate) value: String,
    pub(crate) variants: HashSet<VariantId>,
}

#[derive(Debug, Clone)]
pub(crate) struct OccurrenceData {
    pub(crate) item_identifiers: HashSet<Locator>,
    pub(crate) reifier: Option<TopicId>,
    pub(crate) parent: TopicId,
    pub(crate) ty: TopicId,
    pub(crate) scope: HashSet<TopicId>,
    pub(crate) literal: Literal,
}

#[derive(Debug, Clone)]
pub(crate) struct VariantData {
    pub(crate) item_identifiers: HashSet<Locator>,
    pub(crate) reifier: Option<TopicId>,
    pub(crate) parent: NameId,
    /// Themes added by the variant itself; the observed scope also
    /// includes the parent name's scope.
    pub(crate) scope: HashSet<TopicId>,
    pub(crate) literal: Literal,
}

/// Everything a topic map owns. Cloned wholesale to roll back failed merges.
#[derive(Debug, Clone)]
pub(crate) struct MapState {
    pub(crate) id: TopicMapId,
    pub(crate) base: Locator,
    pub(crate) automerge: bool,
    pub(crate) item_identifiers: HashSet<Locator>,
    pub(crate) reifier: Option<TopicId>,
    pub(crate) topics: HashMap<TopicId, TopicData>,
    pub(crate) associations: HashMap<AssociationId, AssociationData>,
    pub(crate) roles: HashMap<RoleId, RoleData>,
    pub(crate) names: HashMap<NameId, NameData>,
    pub(crate) occurrences: HashMap<OccurrenceId, OccurrenceData>,
    pub(crate) variants: HashMap<VariantId, VariantData>,
    pub(crate) identities: IdentityRegistry,
    pub(crate) tables: IndexTables,
}

impl MapState {
    pub(crate) fn new(id: TopicMapId, base: Locator, automerge: bool) -> Self {
        Self {
            id,
            base,
            automerge,
            item_identifiers: HashSet::new(),
            reifier: None,
            topics: HashMap::new(),
            associations: HashMap::new(),
            roles: HashMap::new(),
            names: HashMap::new(),
            occurrences: HashMap::new(),
            variants: HashMap::new(),
            identities: IdentityRegistry::default(),
            tables: IndexTables::default(),
        }
    }

    /// Run `f`, restoring the previous state if it fails.
    pub(crate) fn transact<T>(&mut self, f: impl FnOnce(&mut Self) -> TmResult<T>) -> TmResult<T> {
        let checkpoint = self.clone();
        let result = f(self);
        if let Err(ref e) = result {
            tracing::warn!(map = %self.base, error = %e, "rolling back topic map change");
            *self = checkpoint;
        }
        result
    }

    pub(crate) fn contains(&self, construct: ConstructRef) -> bool {
        match construct {
            ConstructRef::TopicMap(id) => id == self.id,
            ConstructRef::Topic(id) => self.topics.contains_key(&id),
            ConstructRef::Association(id) => self.associations.contains_key(&id),
            ConstructRef::Role(id) => self.roles.contains_key(&id),
            ConstructRef::Name(id) => self.names.contains_key(&id),
            ConstructRef::Occurrence(id) => self.occurrences.contains_key(&id),
            ConstructRef::Variant(id) => self.variants.contains_key(&id),
        }
    }

    pub(crate) fn require(&self, construct: impl Into<ConstructRef>) -> TmResult<()> {
        let construct = construct.into();
        if self.contains(construct) {
            Ok(())
        } else {
            Err(ModelError::NotFound { construct }.into())
        }
    }

    /// Fail with a model constraint attributed to `reporter` unless `topic`
    /// belongs to this map.
    pub(crate) fn require_topic(&self, reporter: ConstructRef, topic: TopicId) -> TmResult<()> {
        if self.topics.contains_key(&topic) {
            Ok(())
        } else {
            Err(ModelError::Constraint {
                reporter,
                message: format!("{topic} is not a topic of this topic map"),
            }
            .into())
        }
    }

    pub(crate) fn require_topics(&self, reporter: ConstructRef, topics: &[TopicId]) -> TmResult<()> {
        topics
            .iter()
            .try_for_each(|&topic| self.require_topic(reporter, topic))
    }

    pub(crate) fn topic(&self, id: TopicId) -> TmResult<&TopicData> {
        self.topics
            .get(&id)
            .ok_or_else(|| ModelError::NotFound { construct: id.into() }.into())
    }

    pub(crate) fn topic_mut(&mut self, id: TopicId) -> TmResult<&mut TopicData> {
        self.topics
            .get_mut(&id)
            .ok_or_else(|| ModelError::NotFound { construct: id.into() }.into())
    }

    /// Every construct except the topic map itself.
    pub(crate) fn all_constructs(&self) -> Vec<ConstructRef> {
        let mut all = Vec::new();
        all.extend(self.topics.keys().map(|&id| ConstructRef::from(id)));
        all.extend(self.associations.keys().map(|&id| ConstructRef::from(id)));
        all.extend(self.roles.keys().map(|&id| ConstructRef::from(id)));
        all.extend(self.names.keys().map(|&id| ConstructRef::from(id)));
        all.extend(self.occurrences.keys().map(|&id| ConstructRef::from(id)));
        all.extend(self.variants.keys().map(|&id| ConstructRef::from(id)));
        all
    }

    pub(crate) fn item_identifiers(&self, construct: ConstructRef) -> Option<&HashSet<Locator>> {
        match construct {
            ConstructRef::TopicMap(id) => (id == self.id).then_some(&self.item_identifiers),
            ConstructRef::Topic(id) => self.topics.get(&id).map(|d| &d.item_identifiers),
            ConstructRef::Association(id) => self.associations.get(&id).map(|d| &d.item_identifiers),
            ConstructRef::Role(id) => self.roles.get(&id).map(|d| &d.item_identifiers),
            ConstructRef::Name(id) => self.names.get(&id).map(|d| &d.item_identifiers),
            ConstructRef::Occurrence(id) => self.occurrences.get(&id).map(|d| &d.item_identifiers),
            ConstructRef::Variant(id) => self.variants.get(&id).map(|d| &d.item_identifiers),
        }
    }

    pub(crate) fn item_identifiers_mut(
        &mut self,
        construct: ConstructRef,
    ) -> Option<&mut HashSet<Locator>> {
        match construct {
            ConstructRef::TopicMap(id) => (id == self.id).then_some(&mut self.item_identifiers),
            ConstructRef::Topic(id) => self.topics.get_mut(&id).map(|d| &mut d.item_identifiers),
            ConstructRef::Association(id) => {
                self.associations.get_mut(&id).map(|d| &mut d.item_identifiers)
            }
            ConstructRef::Role(id) => self.roles.get_mut(&id).map(|d| &mut d.item_identifiers),
            ConstructRef::Name(id) => self.names.get_mut(&id).map(|d| &mut d.item_identifiers),
            ConstructRef::Occurrence(id) => {
                self.occurrences.get_mut(&id).map(|d| &mut d.item_identifiers)
            }
            ConstructRef::Variant(id) => self.variants.get_mut(&id).map(|d| &mut d.item_identifiers),
        }
    }

    pub(crate) fn reifier(&self, construct: ConstructRef) -> Option<TopicId> {
        match construct {
            ConstructRef::TopicMap(_) => self.reifier,
            ConstructRef::Topic(_) => None,
            ConstructRef::Association(id) => self.associations.get(&id)?.reifier,
            ConstructRef::Role(id) => self.roles.get(&id)?.reifier,
            ConstructRef::Name(id) => self.names.get(&id)?.reifier,
            ConstructRef::Occurrence(id) => self.occurrences.get(&id)?.reifier,
            ConstructRef::Variant(id) => self.variants.get(&id)?.reifier,
        }
    }

    pub(crate) fn reifier_mut(&mut self, construct: ConstructRef) -> Option<&mut Option<TopicId>> {
        match construct {
            ConstructRef::TopicMap(id) => (id == self.id).then_some(&mut self.reifier),
            ConstructRef::Topic(_) => None,
            ConstructRef::Association(id) => self.associations.get_mut(&id).map(|d| &mut d.reifier),
            ConstructRef::Role(id) => self.roles.get_mut(&id).map(|d| &mut d.reifier),
            ConstructRef::Name(id) => self.names.get_mut(&id).map(|d| &mut d.reifier),
            ConstructRef::Occurrence(id) => self.occurrences.get_mut(&id).map(|d| &mut d.reifier),
            ConstructRef::Variant(id) => self.variants.get_mut(&id).map(|d| &mut d.reifier),
        }
    }

    pub(crate) fn type_of(&self, construct: ConstructRef) -> Option<TopicId> {
        match construct {
            ConstructRef::Association(id) => Some(self.associations.get(&id)?.ty),
            ConstructRef::Role(id) => Some(self.roles.get(&id)?.ty),
            ConstructRef::Name(id) => Some(self.names.get(&id)?.ty),
            ConstructRef::Occurrence(id) => Some(self.occurrences.get(&id)?.ty),
            _ => None,
        }
    }

    pub(crate) fn type_mut(&mut self, construct: ConstructRef) -> Option<&mut TopicId> {
        match construct {
            ConstructRef::Association(id) => self.associations.get_mut(&id).map(|d| &mut d.ty),
            ConstructRef::Role(id) => self.roles.get_mut(&id).map(|d| &mut d.ty),
            ConstructRef::Name(id) => self.names.get_mut(&id).map(|d| &mut d.ty),
            ConstructRef::Occurrence(id) => self.occurrences.get_mut(&id).map(|d| &mut d.ty),
            _ => None,
        }
    }

    /// The observed scope. For variants this is the parent name's scope
    /// united with the variant's own themes.
    pub(crate) fn scope(&self, construct: ConstructRef) -> Option<HashSet<TopicId>> {
        match construct {
            ConstructRef::Association(id) => Some(self.associations.get(&id)?.scope.clone()),
            ConstructRef::Name(id) => Some(self.names.get(&id)?.scope.clone()),
            ConstructRef::Occurrence(id) => Some(self.occurrences.get(&id)?.scope.clone()),
            ConstructRef::Variant(id) => {
                let variant = self.variants.get(&id)?;
                let name = self.names.get(&variant.parent)?;
                Some(name.scope.union(&variant.scope).copied().collect())
            }
            _ => None,
        }
    }

    /// The themes stored on the construct itself.
    pub(crate) fn local_scope_mut(&mut self, construct: ConstructRef) -> Option<&mut HashSet<TopicId>> {
        match construct {
            ConstructRef::Association(id) => self.associations.get_mut(&id).map(|d| &mut d.scope),
            ConstructRef::Name(id) => self.names.get_mut(&id).map(|d| &mut d.scope),
            ConstructRef::Occurrence(id) => self.occurrences.get_mut(&id).map(|d| &mut d.scope),
            ConstructRef::Variant(id) => self.variants.get_mut(&id).map(|d| &mut d.scope),
            _ => None,
        }
    }

    pub(crate) fn parent(&self, construct: ConstructRef) -> Option<ConstructRef> {
        match construct {
            ConstructRef::TopicMap(_) => None,
            ConstructRef::Topic(id) => self.topics.contains_key(&id).then_some(self.id.into()),
            ConstructRef::Association(id) => {
                self.associations.contains_key(&id).then_some(self.id.into())
            }
            ConstructRef::Role(id) => Some(self.roles.get(&id)?.parent.into()),
            ConstructRef::Name(id) => Some(self.names.get(&id)?.parent.into()),
            ConstructRef::Occurrence(id) => Some(self.occurrences.get(&id)?.parent.into()),
            ConstructRef::Variant(id) => Some(self.variants.get(&id)?.parent.into()),
        }
    }

    /// The postings a construct contributes to the index tables.
    pub(crate) fn table_entries(&self, construct: ConstructRef) -> Vec<TableEntry> {
        let mut entries = Vec::new();
        match construct {
            ConstructRef::TopicMap(_) => {}
            ConstructRef::Topic(id) => {
                if let Some(topic) = self.topics.get(&id) {
                    if topic.types.is_empty() {
                        entries.push(TableEntry::TopicType(None, id));
                    }
                    for &ty in &topic.types {
                        entries.push(TableEntry::TopicType(Some(ty), id));
                    }
                }
            }
            ConstructRef::Association(id) => {
                if let Some(assoc) = self.associations.get(&id) {
                    entries.push(TableEntry::AssociationType(assoc.ty, id));
                    for key in scope_keys(&assoc.scope) {
                        entries.push(TableEntry::AssociationTheme(key, id));
                    }
                }
            }
            ConstructRef::Role(id) => {
                if let Some(role) = self.roles.get(&id) {
                    entries.push(TableEntry::RoleType(role.ty, id));
                }
            }
            ConstructRef::Name(id) => {
                if let Some(name) = self.names.get(&id) {
                    entries.push(TableEntry::NameType(name.ty, id));
                    for key in scope_keys(&name.scope) {
                        entries.push(TableEntry::NameTheme(key, id));
                    }
                    entries.push(TableEntry::NameValue(name.value.clone(), id));
                }
            }
            ConstructRef::Occurrence(id) => {
                if let Some(occ) = self.occurrences.get(&id) {
                    entries.push(TableEntry::OccurrenceType(occ.ty, id));
                    for key in scope_keys(&occ.scope) {
                        entries.push(TableEntry::OccurrenceTheme(key, id));
                    }
                    let (value, datatype) = occ.literal.clone().into_parts();
                    entries.push(TableEntry::OccurrenceValue((value, datatype), id));
                }
            }
            ConstructRef::Variant(id) => {
                if let (Some(variant), Some(scope)) = (self.variants.get(&id), self.scope(construct)) {
                    for theme in scope {
                        entries.push(TableEntry::VariantTheme(theme, id));
                    }
                    let (value, datatype) = variant.literal.clone().into_parts();
                    entries.push(TableEntry::VariantValue((value, datatype), id));
                }
            }
        }
        entries
    }

    fn unindex(&mut self, construct: ConstructRef) {
        for entry in self.table_entries(construct) {
            self.tables.remove(&entry);
        }
    }

    fn index(&mut self, construct: ConstructRef) {
        for entry in self.table_entries(construct) {
            self.tables.insert(entry);
        }
    }

    /// Run a mutation with `targets` taken out of the index tables, then
    /// re-index whichever of them still exist.
    pub(crate) fn with_reindex<T>(
        &mut self,
        targets: &[ConstructRef],
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        for &target in targets {
            self.unindex(target);
        }
        let result = f(self);
        for &target in targets {
            if self.contains(target) {
                self.index(target);
            }
        }
        result
    }

    /// A construct plus every variant whose observed scope depends on it.
    pub(crate) fn with_dependents(&self, construct: ConstructRef) -> Vec<ConstructRef> {
        let mut targets = vec![construct];
        if let ConstructRef::Name(id) = construct {
            if let Some(name) = self.names.get(&id) {
                targets.extend(name.variants.iter().map(|&v| ConstructRef::from(v)));
            }
        }
        targets
    }
}

/// A topic map: the root aggregate owning all topics and associations.
pub struct TopicMap {
    id: TopicMapId,
    locator: Locator,
    index_mode: IndexMode,
    state: RwLock<MapState>,
}

impl TopicMap {
    /// Create an empty topic map stored at `locator`.
    pub fn new(locator: Locator, automerge: bool, index_mode: IndexMode) -> TmResult<Self> {
        let id = TopicMapId::from_id(construct::allocate()?);
        tracing::debug!(%locator, automerge, ?index_mode, "creating topic map");
        Ok(Self {
            id,
            state: RwLock::new(MapState::new(id, locator.clone(), automerge)),
            locator,
            index_mode,
        })
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, MapState> {
        self.state.read().expect("topic map lock poisoned")
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, MapState> {
        self.state.write().expect("topic map lock poisoned")
    }

    pub fn id(&self) -> TopicMapId {
        self.id
    }

    /// The storage address of this map.
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn index_mode(&self) -> IndexMode {
        self.index_mode
    }

    /// Whether identity collisions merge topics instead of failing.
    pub fn automerge(&self) -> bool {
        self.read().automerge
    }

    /// Resolve `reference` against this map's locator.
    pub fn create_locator(&self, reference: &str) -> TmResult<Locator> {
        Ok(self.locator.resolve(reference)?)
    }

    /// Whether `construct` currently belongs to this map.
    pub fn contains(&self, construct: impl Into<ConstructRef>) -> bool {
        self.read().contains(construct.into())
    }
}

impl std::fmt::Debug for TopicMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("TopicMap")
            .field("locator", &self.locator)
            .field("topics", &state.topics.len())
            .field("associations", &state.associations.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn map() -> TopicMap {
        TopicMap::new(
            Locator::parse("http://example.org/map").unwrap(),
            false,
            IndexMode::Auto,
        )
        .unwrap()
    }

    /// Incremental tables must always equal tables rebuilt from scratch.
    pub(crate) fn assert_tables_consistent(tm: &TopicMap) {
        let state = tm.read();
        assert_eq!(state.tables, IndexTables::rebuild(&state));
    }

    #[test]
    fn new_map_is_empty() {
        let tm = map();
        let state = tm.read();
        assert!(state.topics.is_empty());
        assert!(state.associations.is_empty());
        assert!(state.contains(tm.id().into()));
        assert_eq!(state.parent(tm.id().into()), None);
    }

    #[test]
    fn create_locator_resolves_relative_references() {
        let tm = map();
        let loc = tm.create_locator("#topic").unwrap();
        assert_eq!(loc.reference(), "http://example.org/map#topic");
        let abs = tm.create_locator("http://other.example/x").unwrap();
        assert_eq!(abs.reference(), "http://other.example/x");
    }

    #[test]
    fn transact_rolls_back_on_error() {
        let tm = map();
        let mut state = tm.write();
        let result: TmResult<()> = state.transact(|s| {
            s.item_identifiers
                .insert(Locator::parse("http://example.org/tmp").unwrap());
            Err(ModelError::AllocatorExhausted.into())
        });
        assert!(result.is_err());
        assert!(state.item_identifiers.is_empty());
    }

    #[test]
    fn require_topic_reports_foreign_ids() {
        let a = map();
        let b = map();
        let foreign = b.create_topic().unwrap();
        let err = a
            .read()
            .require_topic(a.id().into(), foreign)
            .unwrap_err();
        assert_eq!(err.reporter(), Some(a.id().into()));
    }
}
