//! Identity registry: item identifiers, subject identifiers, subject locators.
//!
//! Item identifiers address any construct; subject identifiers and subject
//! locators identify the subject of a topic. Item identifiers and subject
//! identifiers share one namespace for collision purposes (a topic's item
//! identifier equal to another topic's subject identifier means both denote
//! the same subject); subject locators form their own namespace.

use std::collections::{HashMap, HashSet};

use crate::construct::{ConstructRef, Reifiable, TopicId};
use crate::error::{IdentityError, ModelError, TmResult};
use crate::locator::Locator;

use super::{MapState, TopicMap};

/// The three kinds of identity a construct can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityKind {
    ItemIdentifier,
    SubjectIdentifier,
    SubjectLocator,
}

impl std::fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityKind::ItemIdentifier => write!(f, "item identifier"),
            IdentityKind::SubjectIdentifier => write!(f, "subject identifier"),
            IdentityKind::SubjectLocator => write!(f, "subject locator"),
        }
    }
}

/// Reverse maps from locators to the constructs that carry them.
#[derive(Debug, Clone, Default)]
pub(crate) struct IdentityRegistry {
    item_identifiers: HashMap<Locator, ConstructRef>,
    subject_identifiers: HashMap<Locator, TopicId>,
    subject_locators: HashMap<Locator, TopicId>,
}

impl IdentityRegistry {
    pub(crate) fn by_item_identifier(&self, locator: &Locator) -> Option<ConstructRef> {
        self.item_identifiers.get(locator).copied()
    }

    pub(crate) fn by_subject_identifier(&self, locator: &Locator) -> Option<TopicId> {
        self.subject_identifiers.get(locator).copied()
    }

    pub(crate) fn by_subject_locator(&self, locator: &Locator) -> Option<TopicId> {
        self.subject_locators.get(locator).copied()
    }

    pub(crate) fn bind(&mut self, kind: IdentityKind, locator: Locator, construct: ConstructRef) {
        match (kind, construct.as_topic()) {
            (IdentityKind::ItemIdentifier, _) => {
                self.item_identifiers.insert(locator, construct);
            }
            (IdentityKind::SubjectIdentifier, Some(topic)) => {
                self.subject_identifiers.insert(locator, topic);
            }
            (IdentityKind::SubjectLocator, Some(topic)) => {
                self.subject_locators.insert(locator, topic);
            }
            _ => {}
        }
    }

    pub(crate) fn unbind(&mut self, kind: IdentityKind, locator: &Locator) {
        match kind {
            IdentityKind::ItemIdentifier => self.item_identifiers.remove(locator).map(|_| ()),
            IdentityKind::SubjectIdentifier => self.subject_identifiers.remove(locator).map(|_| ()),
            IdentityKind::SubjectLocator => self.subject_locators.remove(locator).map(|_| ()),
        };
    }

    /// The construct that keeps `claimant` from taking `locator` as `kind`.
    pub(crate) fn conflict(
        &self,
        kind: IdentityKind,
        locator: &Locator,
        claimant: ConstructRef,
    ) -> Option<ConstructRef> {
        let by_iid = self.item_identifiers.get(locator).copied();
        let by_sid = self.subject_identifiers.get(locator).map(|&t| ConstructRef::from(t));
        let by_slo = self.subject_locators.get(locator).map(|&t| ConstructRef::from(t));
        let candidates = match kind {
            IdentityKind::ItemIdentifier if claimant.as_topic().is_some() => [by_iid, by_sid],
            IdentityKind::ItemIdentifier => [by_iid, None],
            IdentityKind::SubjectIdentifier => {
                [by_sid, by_iid.filter(|c| c.as_topic().is_some())]
            }
            IdentityKind::SubjectLocator => [by_slo, None],
        };
        candidates.into_iter().flatten().find(|&c| c != claimant)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.item_identifiers.len() + self.subject_identifiers.len() + self.subject_locators.len()
    }
}

impl MapState {
    pub(crate) fn identity_set(
        &self,
        construct: ConstructRef,
        kind: IdentityKind,
    ) -> Option<&HashSet<Locator>> {
        match kind {
            IdentityKind::ItemIdentifier => self.item_identifiers(construct),
            IdentityKind::SubjectIdentifier => {
                Some(&self.topics.get(&construct.as_topic()?)?.subject_identifiers)
            }
            IdentityKind::SubjectLocator => {
                Some(&self.topics.get(&construct.as_topic()?)?.subject_locators)
            }
        }
    }

    fn identity_set_mut(
        &mut self,
        construct: ConstructRef,
        kind: IdentityKind,
    ) -> Option<&mut HashSet<Locator>> {
        match kind {
            IdentityKind::ItemIdentifier => self.item_identifiers_mut(construct),
            IdentityKind::SubjectIdentifier => Some(
                &mut self
                    .topics
                    .get_mut(&construct.as_topic()?)?
                    .subject_identifiers,
            ),
            IdentityKind::SubjectLocator => {
                Some(&mut self.topics.get_mut(&construct.as_topic()?)?.subject_locators)
            }
        }
    }

    /// Attach an identity, merging topics on collision when automerge is on.
    pub(crate) fn add_identity(
        &mut self,
        construct: ConstructRef,
        kind: IdentityKind,
        locator: Locator,
    ) -> TmResult<()> {
        self.require(construct)?;
        if let Some(existing) = self.identities.conflict(kind, &locator, construct) {
            match (construct.as_topic(), existing.as_topic()) {
                (Some(reporter), Some(other)) if self.automerge => {
                    tracing::debug!(%reporter, %other, %locator, %kind, "identity collision, merging topics");
                    self.transact(|s| s.merge_topics(reporter, other))?;
                }
                _ => {
                    return Err(IdentityError::Conflict {
                        reporter: construct,
                        existing,
                        locator,
                    }
                    .into());
                }
            }
        }
        self.bind_identity(construct, kind, locator);
        Ok(())
    }

    /// Record an identity without collision checks.
    pub(crate) fn bind_identity(&mut self, construct: ConstructRef, kind: IdentityKind, locator: Locator) {
        if let Some(set) = self.identity_set_mut(construct, kind) {
            set.insert(locator.clone());
            self.identities.bind(kind, locator, construct);
        }
    }

    pub(crate) fn remove_identity(
        &mut self,
        construct: ConstructRef,
        kind: IdentityKind,
        locator: &Locator,
    ) -> TmResult<()> {
        self.require(construct)?;
        let removed = self
            .identity_set_mut(construct, kind)
            .is_some_and(|set| set.remove(locator));
        if removed {
            self.identities.unbind(kind, locator);
        }
        if let (IdentityKind::ItemIdentifier, Some(topic)) = (kind, construct.as_topic()) {
            if let Some(data) = self.topics.get_mut(&topic) {
                data.placeholders.remove(locator);
            }
        }
        Ok(())
    }

    /// Drop every identity `construct` carries from the registry.
    pub(crate) fn unbind_all(&mut self, construct: ConstructRef) {
        for kind in [
            IdentityKind::ItemIdentifier,
            IdentityKind::SubjectIdentifier,
            IdentityKind::SubjectLocator,
        ] {
            let locators: Vec<Locator> = self
                .identity_set(construct, kind)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default();
            for locator in locators {
                self.identities.unbind(kind, &locator);
            }
            if let Some(set) = self.identity_set_mut(construct, kind) {
                set.clear();
            }
        }
    }

    /// Move every item identifier of `from` onto `to`.
    pub(crate) fn transfer_item_identifiers(&mut self, from: ConstructRef, to: ConstructRef) {
        let locators: Vec<Locator> = self
            .item_identifiers_mut(from)
            .map(|set| set.drain().collect())
            .unwrap_or_default();
        for locator in locators {
            self.bind_identity(to, IdentityKind::ItemIdentifier, locator);
        }
    }

    /// Topic carrying `locator` as `kind`, created if missing.
    ///
    /// Item identifiers and subject identifiers cross-match: asking for a
    /// subject identifier that some topic holds as an item identifier adds
    /// the subject identifier to that topic, and vice versa.
    pub(crate) fn topic_for_identity(&mut self, kind: IdentityKind, locator: Locator) -> TmResult<TopicId> {
        match kind {
            IdentityKind::SubjectIdentifier => {
                if let Some(topic) = self.identities.by_subject_identifier(&locator) {
                    return Ok(topic);
                }
                if let Some(topic) = self
                    .identities
                    .by_item_identifier(&locator)
                    .and_then(ConstructRef::as_topic)
                {
                    self.bind_identity(topic.into(), kind, locator);
                    return Ok(topic);
                }
            }
            IdentityKind::ItemIdentifier => {
                if let Some(existing) = self.identities.by_item_identifier(&locator) {
                    return existing.as_topic().ok_or_else(|| {
                        IdentityError::Conflict {
                            reporter: self.id.into(),
                            existing,
                            locator: locator.clone(),
                        }
                        .into()
                    });
                }
                if let Some(topic) = self.identities.by_subject_identifier(&locator) {
                    self.bind_identity(topic.into(), kind, locator);
                    return Ok(topic);
                }
            }
            IdentityKind::SubjectLocator => {
                if let Some(topic) = self.identities.by_subject_locator(&locator) {
                    return Ok(topic);
                }
            }
        }
        let topic = self.insert_topic()?;
        self.bind_identity(topic.into(), kind, locator);
        Ok(topic)
    }

    pub(crate) fn set_reifier(&mut self, construct: ConstructRef, reifier: Option<TopicId>) -> TmResult<()> {
        self.require(construct)?;
        if let Some(topic) = reifier {
            self.require_topic(construct, topic)?;
            if let Some(other) = self.topics[&topic].reified.filter(|&c| c != construct) {
                return Err(ModelError::Constraint {
                    reporter: construct,
                    message: format!("{topic} already reifies {other}"),
                }
                .into());
            }
        }
        let previous = self.reifier(construct);
        if previous == reifier {
            return Ok(());
        }
        if let Some(old) = previous.and_then(|t| self.topics.get_mut(&t)) {
            old.reified = None;
        }
        if let Some(slot) = self.reifier_mut(construct) {
            *slot = reifier;
        }
        if let Some(new) = reifier.and_then(|t| self.topics.get_mut(&t)) {
            new.reified = Some(construct);
        }
        Ok(())
    }
}

impl TopicMap {
    fn add_identity(&self, construct: ConstructRef, kind: IdentityKind, locator: &Locator) -> TmResult<()> {
        self.write().add_identity(construct, kind, locator.clone())
    }

    /// Add an item identifier to any construct of this map.
    ///
    /// Fails with an identity conflict if another construct already has the
    /// locator as item identifier, or (for topics) another topic has it as
    /// subject identifier. With automerge enabled a conflict between two
    /// topics merges them instead; `construct` survives.
    pub fn add_item_identifier(&self, construct: impl Into<ConstructRef>, locator: &Locator) -> TmResult<()> {
        self.add_identity(construct.into(), IdentityKind::ItemIdentifier, locator)
    }

    /// Add a subject identifier; collides with other topics' subject or item identifiers.
    pub fn add_subject_identifier(&self, topic: TopicId, locator: &Locator) -> TmResult<()> {
        self.add_identity(topic.into(), IdentityKind::SubjectIdentifier, locator)
    }

    /// Add a subject locator; collides only with other topics' subject locators.
    pub fn add_subject_locator(&self, topic: TopicId, locator: &Locator) -> TmResult<()> {
        self.add_identity(topic.into(), IdentityKind::SubjectLocator, locator)
    }

    pub fn remove_item_identifier(&self, construct: impl Into<ConstructRef>, locator: &Locator) -> TmResult<()> {
        self.write()
            .remove_identity(construct.into(), IdentityKind::ItemIdentifier, locator)
    }

    pub fn remove_subject_identifier(&self, topic: TopicId, locator: &Locator) -> TmResult<()> {
        self.write()
            .remove_identity(topic.into(), IdentityKind::SubjectIdentifier, locator)
    }

    pub fn remove_subject_locator(&self, topic: TopicId, locator: &Locator) -> TmResult<()> {
        self.write()
            .remove_identity(topic.into(), IdentityKind::SubjectLocator, locator)
    }

    fn identities(&self, construct: ConstructRef, kind: IdentityKind) -> TmResult<Vec<Locator>> {
        let state = self.read();
        state.require(construct)?;
        Ok(state
            .identity_set(construct, kind)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    pub fn item_identifiers(&self, construct: impl Into<ConstructRef>) -> TmResult<Vec<Locator>> {
        self.identities(construct.into(), IdentityKind::ItemIdentifier)
    }

    pub fn subject_identifiers(&self, topic: TopicId) -> TmResult<Vec<Locator>> {
        self.identities(topic.into(), IdentityKind::SubjectIdentifier)
    }

    pub fn subject_locators(&self, topic: TopicId) -> TmResult<Vec<Locator>> {
        self.identities(topic.into(), IdentityKind::SubjectLocator)
    }

    /// The construct carrying `locator` as item identifier, if any.
    pub fn construct_by_item_identifier(&self, locator: &Locator) -> Option<ConstructRef> {
        self.read().identities.by_item_identifier(locator)
    }

    pub fn topic_by_subject_identifier(&self, locator: &Locator) -> Option<TopicId> {
        self.read().identities.by_subject_identifier(locator)
    }

    pub fn topic_by_subject_locator(&self, locator: &Locator) -> Option<TopicId> {
        self.read().identities.by_subject_locator(locator)
    }

    pub fn reifier(&self, construct: impl Reifiable) -> TmResult<Option<TopicId>> {
        let construct = construct.into();
        let state = self.read();
        state.require(construct)?;
        Ok(state.reifier(construct))
    }

    /// Set or clear the topic reifying `construct`.
    ///
    /// A topic reifies at most one construct.
    pub fn set_reifier(&self, construct: impl Reifiable, reifier: Option<TopicId>) -> TmResult<()> {
        self.write().set_reifier(construct.into(), reifier)
    }

    /// The construct reified by `topic`, if any.
    pub fn reified(&self, topic: TopicId) -> TmResult<Option<ConstructRef>> {
        Ok(self.read().topic(topic)?.reified)
    }
}
