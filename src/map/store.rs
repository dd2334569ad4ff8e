//! Construct store: creation, removal and child collections.

use std::collections::HashSet;

use crate::construct::{
    self, AssociationId, ConstructId, ConstructRef, DatatypeAware, NameId, OccurrenceId, RoleId,
    TopicId, VariantId,
};
use crate::error::{ModelError, TmResult};
use crate::literal::Literal;
use crate::locator::Locator;

use super::{
    AssociationData, IdentityKind, MapState, NameData, OccurrenceData, RoleData, TopicData,
    TopicMap, VariantData, TOPIC_NAME_TYPE,
};

impl MapState {
    /// Insert a topic with no identity at all.
    pub(crate) fn insert_topic(&mut self) -> TmResult<TopicId> {
        let id = TopicId::from_id(construct::allocate()?);
        self.topics.insert(id, TopicData::default());
        self.with_reindex(&[id.into()], |_| ());
        Ok(id)
    }

    /// Insert a topic whose only identity is a generated item identifier.
    ///
    /// The identifier is `base#__t{id}`, suffixed with a counter while that
    /// locator is already taken.
    pub(crate) fn insert_placeholder_topic(&mut self) -> TmResult<TopicId> {
        let id = self.insert_topic()?;
        let mut iid = self.base.with_fragment(&format!("__t{}", id.id()));
        let mut attempt = 0u64;
        while self.identities.conflict(IdentityKind::ItemIdentifier, &iid, id.into()).is_some() {
            attempt += 1;
            iid = self.base.with_fragment(&format!("__t{}-{attempt}", id.id()));
        }
        self.bind_identity(id.into(), IdentityKind::ItemIdentifier, iid.clone());
        self.topic_mut(id)?.placeholders.insert(iid);
        Ok(id)
    }

    pub(crate) fn insert_association(
        &mut self,
        ty: TopicId,
        scope: HashSet<TopicId>,
    ) -> TmResult<AssociationId> {
        let id = AssociationId::from_id(construct::allocate()?);
        self.associations.insert(
            id,
            AssociationData {
                item_identifiers: HashSet::new(),
                reifier: None,
                ty,
                scope,
                roles: HashSet::new(),
            },
        );
        self.with_reindex(&[id.into()], |_| ());
        Ok(id)
    }

    pub(crate) fn insert_role(
        &mut self,
        parent: AssociationId,
        ty: TopicId,
        player: TopicId,
    ) -> TmResult<RoleId> {
        let id = RoleId::from_id(construct::allocate()?);
        self.roles.insert(
            id,
            RoleData {
                item_identifiers: HashSet::new(),
                reifier: None,
                parent,
                ty,
                player,
            },
        );
        if let Some(assoc) = self.associations.get_mut(&parent) {
            assoc.roles.insert(id);
        }
        self.topic_mut(player)?.roles_played.insert(id);
        self.with_reindex(&[id.into()], |_| ());
        Ok(id)
    }

    pub(crate) fn insert_name(
        &mut self,
        parent: TopicId,
        ty: TopicId,
        value: String,
        scope: HashSet<TopicId>,
    ) -> TmResult<NameId> {
        let id = NameId::from_id(construct::allocate()?);
        self.names.insert(
            id,
            NameData {
                item_identifiers: HashSet::new(),
                reifier: None,
                parent,
                ty,
                scope,
                value,
                variants: HashSet::new(),
            },
        );
        self.topic_mut(parent)?.names.insert(id);
        self.with_reindex(&[id.into()], |_| ());
        Ok(id)
    }

    pub(crate) fn insert_occurrence(
        &mut self,
        parent: TopicId,
        ty: TopicId,
        literal: Literal,
        scope: HashSet<TopicId>,
    ) -> TmResult<OccurrenceId> {
        let id = OccurrenceId::from_id(construct::allocate()?);
        self.occurrences.insert(
            id,
            OccurrenceData {
                item_identifiers: HashSet::new(),
                reifier: None,
                parent,
                ty,
                scope,
                literal,
            },
        );
        self.topic_mut(parent)?.occurrences.insert(id);
        self.with_reindex(&[id.into()], |_| ());
        Ok(id)
    }

    pub(crate) fn insert_variant(
        &mut self,
        parent: NameId,
        literal: Literal,
        scope: HashSet<TopicId>,
    ) -> TmResult<VariantId> {
        let id = VariantId::from_id(construct::allocate()?);
        self.variants.insert(
            id,
            VariantData {
                item_identifiers: HashSet::new(),
                reifier: None,
                parent,
                scope,
                literal,
            },
        );
        if let Some(name) = self.names.get_mut(&parent) {
            name.variants.insert(id);
        }
        self.with_reindex(&[id.into()], |_| ());
        Ok(id)
    }

    /// The default name type topic, created on first use.
    pub(crate) fn default_name_type(&mut self) -> TmResult<TopicId> {
        let psi = Locator::parse(TOPIC_NAME_TYPE)?;
        self.topic_for_identity(IdentityKind::SubjectIdentifier, psi)
    }

    /// Clear the reifier link of `construct` on both sides.
    fn release_reifier(&mut self, construct: ConstructRef) {
        if let Some(topic) = self.reifier(construct) {
            if let Some(data) = self.topics.get_mut(&topic) {
                data.reified = None;
            }
        }
        if let Some(slot) = self.reifier_mut(construct) {
            *slot = None;
        }
    }

    /// Remove a construct and everything it owns, without usage checks.
    pub(crate) fn detach(&mut self, construct: ConstructRef) {
        if !self.contains(construct) {
            return;
        }
        match construct {
            ConstructRef::TopicMap(_) => return,
            ConstructRef::Topic(id) => {
                let topic = &self.topics[&id];
                let mut children: Vec<ConstructRef> = Vec::new();
                children.extend(topic.names.iter().map(|&n| ConstructRef::from(n)));
                children.extend(topic.occurrences.iter().map(|&o| ConstructRef::from(o)));
                children.extend(topic.roles_played.iter().map(|&r| ConstructRef::from(r)));
                let reified = topic.reified;
                for child in children {
                    self.detach(child);
                }
                if let Some(reified) = reified {
                    if let Some(slot) = self.reifier_mut(reified) {
                        *slot = None;
                    }
                }
            }
            ConstructRef::Association(id) => {
                let roles: Vec<RoleId> = self.associations[&id].roles.iter().copied().collect();
                for role in roles {
                    self.detach(role.into());
                }
            }
            ConstructRef::Role(id) => {
                let role = &self.roles[&id];
                let (parent, player) = (role.parent, role.player);
                if let Some(assoc) = self.associations.get_mut(&parent) {
                    assoc.roles.remove(&id);
                }
                if let Some(topic) = self.topics.get_mut(&player) {
                    topic.roles_played.remove(&id);
                }
            }
            ConstructRef::Name(id) => {
                let variants: Vec<VariantId> = self.names[&id].variants.iter().copied().collect();
                for variant in variants {
                    self.detach(variant.into());
                }
                let parent = self.names[&id].parent;
                if let Some(topic) = self.topics.get_mut(&parent) {
                    topic.names.remove(&id);
                }
            }
            ConstructRef::Occurrence(id) => {
                let parent = self.occurrences[&id].parent;
                if let Some(topic) = self.topics.get_mut(&parent) {
                    topic.occurrences.remove(&id);
                }
            }
            ConstructRef::Variant(id) => {
                let parent = self.variants[&id].parent;
                if let Some(name) = self.names.get_mut(&parent) {
                    name.variants.remove(&id);
                }
            }
        }
        self.release_reifier(construct);
        self.unbind_all(construct);
        self.with_reindex(&[construct], |s| match construct {
            ConstructRef::TopicMap(_) => {}
            ConstructRef::Topic(id) => {
                s.topics.remove(&id);
            }
            ConstructRef::Association(id) => {
                s.associations.remove(&id);
            }
            ConstructRef::Role(id) => {
                s.roles.remove(&id);
            }
            ConstructRef::Name(id) => {
                s.names.remove(&id);
            }
            ConstructRef::Occurrence(id) => {
                s.occurrences.remove(&id);
            }
            ConstructRef::Variant(id) => {
                s.variants.remove(&id);
            }
        });
    }

    /// The topic owning a name, occurrence or variant.
    pub(crate) fn owner_topic(&self, construct: ConstructRef) -> Option<TopicId> {
        match construct {
            ConstructRef::Name(id) => Some(self.names.get(&id)?.parent),
            ConstructRef::Occurrence(id) => Some(self.occurrences.get(&id)?.parent),
            ConstructRef::Variant(id) => {
                let name = self.variants.get(&id)?.parent;
                Some(self.names.get(&name)?.parent)
            }
            _ => None,
        }
    }

    /// How `topic` is still referenced by constructs it does not own.
    pub(crate) fn topic_usage(&self, topic: TopicId) -> Option<String> {
        let data = self.topics.get(&topic)?;
        let foreign = |c: ConstructRef| self.owner_topic(c) != Some(topic);
        if !data.roles_played.is_empty() {
            return Some("role player".into());
        }
        if let Some(reified) = data.reified.filter(|&c| foreign(c)) {
            return Some(format!("reifier of {reified}"));
        }
        let t = &self.tables;
        if t.topic_types
            .get(&Some(topic))
            .is_some_and(|s| s.iter().any(|&i| i != topic))
        {
            return Some("topic type".into());
        }
        if t.association_types.get(&topic).is_some() {
            return Some("association type".into());
        }
        if t.role_types.get(&topic).is_some() {
            return Some("role type".into());
        }
        if t.name_types
            .get(&topic)
            .is_some_and(|s| s.iter().any(|&n| foreign(n.into())))
        {
            return Some("name type".into());
        }
        if t.occurrence_types
            .get(&topic)
            .is_some_and(|s| s.iter().any(|&o| foreign(o.into())))
        {
            return Some("occurrence type".into());
        }
        if t.association_themes.get(&Some(topic)).is_some()
            || t.name_themes
                .get(&Some(topic))
                .is_some_and(|s| s.iter().any(|&n| foreign(n.into())))
            || t.occurrence_themes
                .get(&Some(topic))
                .is_some_and(|s| s.iter().any(|&o| foreign(o.into())))
            || t.variant_themes
                .get(&topic)
                .is_some_and(|s| s.iter().any(|&v| foreign(v.into())))
        {
            return Some("theme".into());
        }
        None
    }
}

impl TopicMap {
    /// Create a topic with one generated item identifier.
    pub fn create_topic(&self) -> TmResult<TopicId> {
        self.write().insert_placeholder_topic()
    }

    /// The topic with this subject identifier, created if missing.
    pub fn create_topic_by_subject_identifier(&self, locator: &Locator) -> TmResult<TopicId> {
        self.write()
            .topic_for_identity(IdentityKind::SubjectIdentifier, locator.clone())
    }

    /// The topic with this subject locator, created if missing.
    pub fn create_topic_by_subject_locator(&self, locator: &Locator) -> TmResult<TopicId> {
        self.write()
            .topic_for_identity(IdentityKind::SubjectLocator, locator.clone())
    }

    /// The topic with this item identifier, created if missing.
    ///
    /// Fails if a construct other than a topic carries the item identifier.
    pub fn create_topic_by_item_identifier(&self, locator: &Locator) -> TmResult<TopicId> {
        self.write()
            .topic_for_identity(IdentityKind::ItemIdentifier, locator.clone())
    }

    pub fn create_association(&self, ty: TopicId, themes: &[TopicId]) -> TmResult<AssociationId> {
        let mut state = self.write();
        let reporter = self.id().into();
        state.require_topic(reporter, ty)?;
        state.require_topics(reporter, themes)?;
        state.insert_association(ty, themes.iter().copied().collect())
    }

    /// Add a role to `association`.
    pub fn create_role(&self, association: AssociationId, ty: TopicId, player: TopicId) -> TmResult<RoleId> {
        let mut state = self.write();
        state.require(association)?;
        state.require_topic(association.into(), ty)?;
        state.require_topic(association.into(), player)?;
        state.insert_role(association, ty, player)
    }

    /// Create an unscoped name with the default name type.
    pub fn create_name(&self, topic: TopicId, value: impl Into<String>) -> TmResult<NameId> {
        let mut state = self.write();
        state.require(topic)?;
        let ty = state.default_name_type()?;
        state.insert_name(topic, ty, value.into(), HashSet::new())
    }

    pub fn create_typed_name(
        &self,
        topic: TopicId,
        ty: TopicId,
        value: impl Into<String>,
        themes: &[TopicId],
    ) -> TmResult<NameId> {
        let mut state = self.write();
        state.require(topic)?;
        state.require_topic(topic.into(), ty)?;
        state.require_topics(topic.into(), themes)?;
        state.insert_name(topic, ty, value.into(), themes.iter().copied().collect())
    }

    pub fn create_occurrence(
        &self,
        topic: TopicId,
        ty: TopicId,
        value: impl Into<Literal>,
        themes: &[TopicId],
    ) -> TmResult<OccurrenceId> {
        let mut state = self.write();
        state.require(topic)?;
        state.require_topic(topic.into(), ty)?;
        state.require_topics(topic.into(), themes)?;
        state.insert_occurrence(topic, ty, value.into(), themes.iter().copied().collect())
    }

    /// Create a variant of `name`.
    ///
    /// `themes` must add at least one theme to the name's scope.
    pub fn create_variant(
        &self,
        name: NameId,
        value: impl Into<Literal>,
        themes: &[TopicId],
    ) -> TmResult<VariantId> {
        let mut state = self.write();
        state.require(name)?;
        if themes.is_empty() {
            return Err(ModelError::Constraint {
                reporter: name.into(),
                message: "a variant needs at least one theme".into(),
            }
            .into());
        }
        state.require_topics(name.into(), themes)?;
        let name_scope = &state.names[&name].scope;
        if themes.iter().all(|t| name_scope.contains(t)) {
            return Err(ModelError::Constraint {
                reporter: name.into(),
                message: "variant scope must be a true superset of the name's scope".into(),
            }
            .into());
        }
        state.insert_variant(name, value.into(), themes.iter().copied().collect())
    }

    /// Remove a construct and everything it owns.
    ///
    /// Topics still used as a type, theme, role player or reifier by
    /// constructs they do not own cannot be removed.
    pub fn remove(&self, construct: impl Into<ConstructRef>) -> TmResult<()> {
        let construct = construct.into();
        let mut state = self.write();
        state.require(construct)?;
        match construct {
            ConstructRef::TopicMap(_) => {
                return Err(ModelError::Constraint {
                    reporter: construct,
                    message: "topic maps are removed through their system".into(),
                }
                .into());
            }
            ConstructRef::Topic(topic) => {
                if let Some(usage) = state.topic_usage(topic) {
                    return Err(ModelError::TopicInUse { topic, usage }.into());
                }
            }
            _ => {}
        }
        state.detach(construct);
        Ok(())
    }

    pub fn topics(&self) -> Vec<TopicId> {
        self.read().topics.keys().copied().collect()
    }

    pub fn associations(&self) -> Vec<AssociationId> {
        self.read().associations.keys().copied().collect()
    }

    /// Look up any construct of this map by its id.
    pub fn construct_by_id(&self, id: ConstructId) -> Option<ConstructRef> {
        let state = self.read();
        let candidates = [
            ConstructRef::from(TopicId::from_id(id)),
            AssociationId::from_id(id).into(),
            RoleId::from_id(id).into(),
            NameId::from_id(id).into(),
            OccurrenceId::from_id(id).into(),
            VariantId::from_id(id).into(),
        ];
        if state.id.id() == id {
            return Some(state.id.into());
        }
        candidates.into_iter().find(|&c| state.contains(c))
    }

    /// The parent of a construct; `None` for the topic map itself.
    pub fn parent(&self, construct: impl Into<ConstructRef>) -> TmResult<Option<ConstructRef>> {
        let construct = construct.into();
        let state = self.read();
        state.require(construct)?;
        Ok(state.parent(construct))
    }

    pub fn names(&self, topic: TopicId) -> TmResult<Vec<NameId>> {
        Ok(self.read().topic(topic)?.names.iter().copied().collect())
    }

    pub fn names_by_type(&self, topic: TopicId, ty: TopicId) -> TmResult<Vec<NameId>> {
        let state = self.read();
        Ok(state
            .topic(topic)?
            .names
            .iter()
            .copied()
            .filter(|n| state.names[n].ty == ty)
            .collect())
    }

    pub fn occurrences(&self, topic: TopicId) -> TmResult<Vec<OccurrenceId>> {
        Ok(self.read().topic(topic)?.occurrences.iter().copied().collect())
    }

    pub fn occurrences_by_type(&self, topic: TopicId, ty: TopicId) -> TmResult<Vec<OccurrenceId>> {
        let state = self.read();
        Ok(state
            .topic(topic)?
            .occurrences
            .iter()
            .copied()
            .filter(|o| state.occurrences[o].ty == ty)
            .collect())
    }

    pub fn roles(&self, association: AssociationId) -> TmResult<Vec<RoleId>> {
        let state = self.read();
        state.require(association)?;
        Ok(state.associations[&association].roles.iter().copied().collect())
    }

    pub fn roles_by_type(&self, association: AssociationId, ty: TopicId) -> TmResult<Vec<RoleId>> {
        let state = self.read();
        state.require(association)?;
        Ok(state.associations[&association]
            .roles
            .iter()
            .copied()
            .filter(|r| state.roles[r].ty == ty)
            .collect())
    }

    /// Distinct types of the roles of `association`.
    pub fn role_types(&self, association: AssociationId) -> TmResult<Vec<TopicId>> {
        let state = self.read();
        state.require(association)?;
        let types: HashSet<TopicId> = state.associations[&association]
            .roles
            .iter()
            .map(|r| state.roles[r].ty)
            .collect();
        Ok(types.into_iter().collect())
    }

    pub fn roles_played(&self, topic: TopicId) -> TmResult<Vec<RoleId>> {
        Ok(self.read().topic(topic)?.roles_played.iter().copied().collect())
    }

    pub fn roles_played_by_type(&self, topic: TopicId, ty: TopicId) -> TmResult<Vec<RoleId>> {
        let state = self.read();
        Ok(state
            .topic(topic)?
            .roles_played
            .iter()
            .copied()
            .filter(|r| state.roles[r].ty == ty)
            .collect())
    }

    /// Roles of type `ty` played by `topic` in associations of type `association_type`.
    pub fn roles_played_by_association_type(
        &self,
        topic: TopicId,
        ty: TopicId,
        association_type: TopicId,
    ) -> TmResult<Vec<RoleId>> {
        let state = self.read();
        Ok(state
            .topic(topic)?
            .roles_played
            .iter()
            .copied()
            .filter(|r| {
                let role = &state.roles[r];
                role.ty == ty && state.associations[&role.parent].ty == association_type
            })
            .collect())
    }

    pub fn variants(&self, name: NameId) -> TmResult<Vec<VariantId>> {
        let state = self.read();
        state.require(name)?;
        Ok(state.names[&name].variants.iter().copied().collect())
    }

    pub fn player(&self, role: RoleId) -> TmResult<TopicId> {
        let state = self.read();
        state.require(role)?;
        Ok(state.roles[&role].player)
    }

    pub fn set_player(&self, role: RoleId, player: TopicId) -> TmResult<()> {
        let mut state = self.write();
        state.require(role)?;
        state.require_topic(role.into(), player)?;
        let previous = state.roles[&role].player;
        if previous == player {
            return Ok(());
        }
        if let Some(topic) = state.topics.get_mut(&previous) {
            topic.roles_played.remove(&role);
        }
        state.topic_mut(player)?.roles_played.insert(role);
        if let Some(data) = state.roles.get_mut(&role) {
            data.player = player;
        }
        Ok(())
    }

    pub fn name_value(&self, name: NameId) -> TmResult<String> {
        let state = self.read();
        state.require(name)?;
        Ok(state.names[&name].value.clone())
    }

    pub fn set_name_value(&self, name: NameId, value: impl Into<String>) -> TmResult<()> {
        let value = value.into();
        let mut state = self.write();
        state.require(name)?;
        state.with_reindex(&[name.into()], |s| {
            if let Some(data) = s.names.get_mut(&name) {
                data.value = value;
            }
        });
        Ok(())
    }

    /// Value and datatype of an occurrence or variant.
    pub fn literal(&self, construct: impl DatatypeAware) -> TmResult<Literal> {
        let construct = construct.into();
        let state = self.read();
        state.require(construct)?;
        Ok(match construct {
            ConstructRef::Occurrence(id) => state.occurrences[&id].literal.clone(),
            ConstructRef::Variant(id) => state.variants[&id].literal.clone(),
            _ => return Err(ModelError::NotFound { construct }.into()),
        })
    }

    pub fn set_literal(&self, construct: impl DatatypeAware, value: impl Into<Literal>) -> TmResult<()> {
        let construct = construct.into();
        let literal = value.into();
        let mut state = self.write();
        state.require(construct)?;
        state.with_reindex(&[construct], |s| match construct {
            ConstructRef::Occurrence(id) => {
                if let Some(data) = s.occurrences.get_mut(&id) {
                    data.literal = literal;
                }
            }
            ConstructRef::Variant(id) => {
                if let Some(data) = s.variants.get_mut(&id) {
                    data.literal = literal;
                }
            }
            _ => {}
        });
        Ok(())
    }
}
