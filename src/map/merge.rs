//! Topic merging and whole-map merging.
//!
//! Merging a source topic into a target redirects every reference to the
//! source (as type, theme, role player or reifier) to the target, moves the
//! source's identities and characteristics over, and removes the source.
//! Afterwards constructs that became equal under the Topic Maps Data Model
//! are collapsed into one, which can in turn require merging their
//! reifiers; those follow-up merges are queued on a [`MergeContext`] and
//! drained until none are left.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;

use crate::construct::{AssociationId, ConstructRef, NameId, RoleId, TopicId, VariantId};
use crate::error::{IdentityError, ModelError, TmResult};
use crate::locator::Locator;

use super::{IdentityKind, MapState, TopicData, TopicMap};

/// Bookkeeping shared by the merges triggered from one operation.
#[derive(Debug, Default)]
pub(crate) struct MergeContext {
    pending: VecDeque<(TopicId, TopicId)>,
    /// Removed topic -> topic it was merged into.
    topics: HashMap<TopicId, TopicId>,
    /// Removed duplicate -> construct it was collapsed into.
    constructs: HashMap<ConstructRef, ConstructRef>,
    /// Topic of the merged-in map -> topic of this map.
    imported: HashMap<TopicId, TopicId>,
}

impl MergeContext {
    fn resolve(&self, mut topic: TopicId) -> TopicId {
        while let Some(&next) = self.topics.get(&topic) {
            topic = next;
        }
        topic
    }

    fn resolve_construct(&self, mut construct: ConstructRef) -> ConstructRef {
        loop {
            if let Some(topic) = construct.as_topic() {
                return self.resolve(topic).into();
            }
            match self.constructs.get(&construct) {
                Some(&next) => construct = next,
                None => return construct,
            }
        }
    }

    fn import(&self, topic: TopicId) -> TmResult<TopicId> {
        self.imported
            .get(&topic)
            .map(|&t| self.resolve(t))
            .ok_or_else(|| ModelError::NotFound { construct: topic.into() }.into())
    }

    fn import_all(&self, topics: &HashSet<TopicId>) -> TmResult<HashSet<TopicId>> {
        topics.iter().map(|&t| self.import(t)).collect()
    }
}

/// Pairs `(first, later)` of ids sharing a key; `first` is the smallest id.
fn duplicates<I, K>(ids: impl IntoIterator<Item = I>, key: impl Fn(I) -> Option<K>) -> Vec<(I, I)>
where
    I: Copy + Ord,
    K: Eq + Hash,
{
    let mut ids: Vec<I> = ids.into_iter().collect();
    ids.sort();
    let mut seen: HashMap<K, I> = HashMap::new();
    let mut pairs = Vec::new();
    for id in ids {
        let Some(k) = key(id) else { continue };
        match seen.entry(k) {
            Entry::Occupied(first) => pairs.push((*first.get(), id)),
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
    }
    pairs
}

fn theme_set(scope: &HashSet<TopicId>) -> BTreeSet<TopicId> {
    scope.iter().copied().collect()
}

type AssociationSignature = (TopicId, BTreeSet<TopicId>, BTreeSet<(TopicId, TopicId)>);

impl MapState {
    /// Merge `source` into `target`. Callers run this inside [`MapState::transact`].
    pub(crate) fn merge_topics(&mut self, target: TopicId, source: TopicId) -> TmResult<()> {
        let mut ctx = MergeContext::default();
        ctx.pending.push_back((target, source));
        self.run_pending(&mut ctx)
    }

    fn run_pending(&mut self, ctx: &mut MergeContext) -> TmResult<()> {
        while let Some((target, source)) = ctx.pending.pop_front() {
            let (target, source) = (ctx.resolve(target), ctx.resolve(source));
            if target != source {
                self.merge_pair(ctx, target, source)?;
            }
        }
        Ok(())
    }

    /// Every construct whose type or scope names `topic`, plus topics typed by it.
    fn references_to(&self, topic: TopicId) -> Vec<ConstructRef> {
        let t = &self.tables;
        let mut refs: Vec<ConstructRef> = Vec::new();
        refs.extend(t.topic_types.values(&Some(topic)).into_iter().map(ConstructRef::from));
        refs.extend(t.association_types.values(&topic).into_iter().map(ConstructRef::from));
        refs.extend(t.role_types.values(&topic).into_iter().map(ConstructRef::from));
        refs.extend(t.name_types.values(&topic).into_iter().map(ConstructRef::from));
        refs.extend(t.occurrence_types.values(&topic).into_iter().map(ConstructRef::from));
        refs.extend(t.association_themes.values(&Some(topic)).into_iter().map(ConstructRef::from));
        refs.extend(t.name_themes.values(&Some(topic)).into_iter().map(ConstructRef::from));
        refs.extend(t.occurrence_themes.values(&Some(topic)).into_iter().map(ConstructRef::from));
        refs.extend(t.variant_themes.values(&topic).into_iter().map(ConstructRef::from));
        refs
    }

    fn merge_pair(&mut self, ctx: &mut MergeContext, target: TopicId, source: TopicId) -> TmResult<()> {
        let target_reified = self.topic(target)?.reified;
        let source_reified = self.topic(source)?.reified;
        if let (Some(a), Some(b)) = (target_reified, source_reified) {
            if a != b {
                return Err(ModelError::Constraint {
                    reporter: target.into(),
                    message: format!("{target} reifies {a} and {source} reifies {b}"),
                }
                .into());
            }
        }
        tracing::debug!(survivor = %target, merged = %source, "merging topics");

        let refs = self.references_to(source);
        let mut owners: HashSet<TopicId> = HashSet::from([target]);
        let mut associations: HashSet<AssociationId> = HashSet::new();
        for &c in &refs {
            match c {
                ConstructRef::Association(id) => {
                    associations.insert(id);
                }
                ConstructRef::Role(id) => associations.extend(self.roles.get(&id).map(|r| r.parent)),
                _ => owners.extend(self.owner_topic(c)),
            }
        }
        associations.extend(
            self.topics[&source]
                .roles_played
                .iter()
                .filter_map(|r| self.roles.get(r))
                .map(|r| r.parent),
        );

        let mut targets = refs;
        targets.push(source.into());
        targets.push(target.into());
        targets.sort();
        targets.dedup();
        self.with_reindex(&targets, |s| s.absorb_topic(&targets, target, source));
        ctx.topics.insert(source, target);

        self.dedupe(ctx, owners, associations);
        Ok(())
    }

    /// Redirect `refs` from `source` to `target` and fold `source` into `target`.
    fn absorb_topic(&mut self, refs: &[ConstructRef], target: TopicId, source: TopicId) {
        for &c in refs {
            if let ConstructRef::Topic(id) = c {
                if let Some(data) = self.topics.get_mut(&id) {
                    if data.types.remove(&source) {
                        data.types.insert(target);
                    }
                }
                continue;
            }
            if let Some(ty) = self.type_mut(c) {
                if *ty == source {
                    *ty = target;
                }
            }
            if let Some(scope) = self.local_scope_mut(c) {
                if scope.remove(&source) {
                    scope.insert(target);
                }
            }
        }

        let Some(data) = self.topics.remove(&source) else {
            return;
        };
        for role in &data.roles_played {
            if let Some(r) = self.roles.get_mut(role) {
                r.player = target;
            }
        }
        for name in &data.names {
            if let Some(n) = self.names.get_mut(name) {
                n.parent = target;
            }
        }
        for occurrence in &data.occurrences {
            if let Some(o) = self.occurrences.get_mut(occurrence) {
                o.parent = target;
            }
        }
        if let Some(reified) = data.reified {
            if let Some(slot) = self.reifier_mut(reified) {
                *slot = Some(target);
            }
        }

        let TopicData {
            item_identifiers,
            placeholders,
            subject_identifiers,
            subject_locators,
            types,
            names,
            occurrences,
            roles_played,
            reified,
        } = data;
        let own_placeholders = self
            .topics
            .get(&target)
            .map(|t| t.placeholders.clone())
            .unwrap_or_default();
        if let Some(t) = self.topics.get_mut(&target) {
            t.types.extend(types);
            t.names.extend(names);
            t.occurrences.extend(occurrences);
            t.roles_played.extend(roles_played);
            t.placeholders.extend(placeholders);
            if reified.is_some() {
                t.reified = reified;
            }
        }
        for locator in item_identifiers {
            self.bind_identity(target.into(), IdentityKind::ItemIdentifier, locator);
        }
        for locator in subject_identifiers {
            self.bind_identity(target.into(), IdentityKind::SubjectIdentifier, locator);
        }
        for locator in subject_locators {
            self.bind_identity(target.into(), IdentityKind::SubjectLocator, locator);
        }
        self.settle_placeholders(target, &own_placeholders);
    }

    /// Drop generated item identifiers made redundant by a merge.
    ///
    /// A topic with a caller-supplied identifier keeps none; otherwise only
    /// the placeholders in `keep` survive.
    fn settle_placeholders(&mut self, topic: TopicId, keep: &HashSet<Locator>) {
        let Some(data) = self.topics.get(&topic) else {
            return;
        };
        let dropped: Vec<Locator> = if data.has_supplied_identity() {
            data.placeholders.iter().cloned().collect()
        } else if keep.is_empty() {
            Vec::new()
        } else {
            data.placeholders.difference(keep).cloned().collect()
        };
        for locator in dropped {
            if let Some(data) = self.topics.get_mut(&topic) {
                data.placeholders.remove(&locator);
                data.item_identifiers.remove(&locator);
            }
            self.identities.unbind(IdentityKind::ItemIdentifier, &locator);
        }
    }

    fn dedupe(
        &mut self,
        ctx: &mut MergeContext,
        owners: HashSet<TopicId>,
        associations: HashSet<AssociationId>,
    ) {
        let mut owners: Vec<TopicId> = owners.into_iter().collect();
        owners.sort();
        for topic in owners {
            self.dedupe_names(ctx, topic);
            self.dedupe_occurrences(ctx, topic);
        }
        let mut associations: Vec<AssociationId> = associations.into_iter().collect();
        associations.sort();
        for &association in &associations {
            self.dedupe_roles(ctx, association);
        }
        for association in associations {
            self.dedupe_association(ctx, association);
        }
    }

    fn dedupe_names(&mut self, ctx: &mut MergeContext, topic: TopicId) {
        let Some(data) = self.topics.get(&topic) else {
            return;
        };
        let pairs = duplicates(data.names.iter().copied(), |n| {
            let name = self.names.get(&n)?;
            Some((name.ty, theme_set(&name.scope), name.value.clone()))
        });
        for (keep, dup) in pairs {
            let variants: Vec<VariantId> = self
                .names
                .get_mut(&dup)
                .map(|n| n.variants.drain().collect())
                .unwrap_or_default();
            for variant in &variants {
                if let Some(v) = self.variants.get_mut(variant) {
                    v.parent = keep;
                }
            }
            if let Some(n) = self.names.get_mut(&keep) {
                n.variants.extend(variants);
            }
            self.merge_duplicate(ctx, keep.into(), dup.into());
        }
        let names: Vec<NameId> = self
            .topics
            .get(&topic)
            .map(|d| d.names.iter().copied().collect())
            .unwrap_or_default();
        for name in names {
            self.dedupe_variants(ctx, name);
        }
    }

    fn dedupe_variants(&mut self, ctx: &mut MergeContext, name: NameId) {
        let Some(data) = self.names.get(&name) else {
            return;
        };
        let pairs = duplicates(data.variants.iter().copied(), |v| {
            let scope = self.scope(v.into())?;
            Some((theme_set(&scope), self.variants.get(&v)?.literal.clone()))
        });
        for (keep, dup) in pairs {
            self.merge_duplicate(ctx, keep.into(), dup.into());
        }
    }

    fn dedupe_occurrences(&mut self, ctx: &mut MergeContext, topic: TopicId) {
        let Some(data) = self.topics.get(&topic) else {
            return;
        };
        let pairs = duplicates(data.occurrences.iter().copied(), |o| {
            let occ = self.occurrences.get(&o)?;
            Some((occ.ty, theme_set(&occ.scope), occ.literal.clone()))
        });
        for (keep, dup) in pairs {
            self.merge_duplicate(ctx, keep.into(), dup.into());
        }
    }

    fn dedupe_roles(&mut self, ctx: &mut MergeContext, association: AssociationId) {
        let Some(data) = self.associations.get(&association) else {
            return;
        };
        let pairs = duplicates(data.roles.iter().copied(), |r| {
            let role = self.roles.get(&r)?;
            Some((role.ty, role.player))
        });
        for (keep, dup) in pairs {
            self.merge_duplicate(ctx, keep.into(), dup.into());
        }
    }

    fn association_signature(&self, association: AssociationId) -> Option<AssociationSignature> {
        let data = self.associations.get(&association)?;
        let roles = data
            .roles
            .iter()
            .filter_map(|r| self.roles.get(r))
            .map(|r| (r.ty, r.player))
            .collect();
        Some((data.ty, theme_set(&data.scope), roles))
    }

    fn dedupe_association(&mut self, ctx: &mut MergeContext, association: AssociationId) {
        let mut current = association;
        loop {
            let Some(signature) = self.association_signature(current) else {
                return;
            };
            let twin = self
                .tables
                .association_types
                .values(&signature.0)
                .into_iter()
                .filter(|&a| a != current)
                .filter(|&a| self.association_signature(a).as_ref() == Some(&signature))
                .min();
            let Some(twin) = twin else { return };
            let (keep, dup) = if twin < current {
                (twin, current)
            } else {
                (current, twin)
            };
            self.merge_associations(ctx, keep, dup);
            current = keep;
        }
    }

    fn merge_associations(&mut self, ctx: &mut MergeContext, keep: AssociationId, dup: AssociationId) {
        let mut dup_roles: Vec<RoleId> = self
            .associations
            .get(&dup)
            .map(|a| a.roles.iter().copied().collect())
            .unwrap_or_default();
        dup_roles.sort();
        for role in dup_roles {
            let Some(data) = self.roles.get(&role) else { continue };
            let (ty, player) = (data.ty, data.player);
            let twin = self.associations.get(&keep).and_then(|a| {
                a.roles.iter().copied().find(|r| {
                    self.roles
                        .get(r)
                        .is_some_and(|d| d.ty == ty && d.player == player)
                })
            });
            if let Some(twin) = twin {
                self.merge_duplicate(ctx, twin.into(), role.into());
            }
        }
        self.merge_duplicate(ctx, keep.into(), dup.into());
    }

    /// Fold `dup` into the equal construct `keep` and remove it.
    fn merge_duplicate(&mut self, ctx: &mut MergeContext, keep: ConstructRef, dup: ConstructRef) {
        tracing::debug!(%keep, %dup, "collapsing duplicate construct");
        self.transfer_item_identifiers(dup, keep);
        if let Some(dup_reifier) = self.reifier(dup) {
            if let Some(slot) = self.reifier_mut(dup) {
                *slot = None;
            }
            if let Some(topic) = self.topics.get_mut(&dup_reifier) {
                topic.reified = None;
            }
            match self.reifier(keep) {
                None => {
                    if let Some(slot) = self.reifier_mut(keep) {
                        *slot = Some(dup_reifier);
                    }
                    if let Some(topic) = self.topics.get_mut(&dup_reifier) {
                        topic.reified = Some(keep);
                    }
                }
                Some(keep_reifier) if keep_reifier != dup_reifier => {
                    ctx.pending.push_back((keep_reifier, dup_reifier));
                }
                Some(_) => {}
            }
        }
        ctx.constructs.insert(dup, keep);
        self.detach(dup);
    }

    /// Topics of this map sharing an identity with `incoming`, each with
    /// the first locator found in common.
    fn matching_topics(&self, incoming: &TopicData) -> Vec<(TopicId, Locator)> {
        let reg = &self.identities;
        let mut found: BTreeMap<TopicId, Locator> = BTreeMap::new();
        let mut record = |candidates: [Option<TopicId>; 2], locator: &Locator| {
            for topic in candidates.into_iter().flatten() {
                found.entry(topic).or_insert_with(|| locator.clone());
            }
        };
        for locator in &incoming.item_identifiers {
            let by_iid = reg.by_item_identifier(locator).and_then(ConstructRef::as_topic);
            record([by_iid, reg.by_subject_identifier(locator)], locator);
        }
        for locator in &incoming.subject_identifiers {
            let by_iid = reg.by_item_identifier(locator).and_then(ConstructRef::as_topic);
            record([reg.by_subject_identifier(locator), by_iid], locator);
        }
        for locator in &incoming.subject_locators {
            record([reg.by_subject_locator(locator), None], locator);
        }
        found.into_iter().collect()
    }

    /// The topic of this map standing for `incoming`, created or merged as needed.
    fn import_topic(&mut self, ctx: &mut MergeContext, other: &MapState, incoming: TopicId) -> TmResult<TopicId> {
        let data = other.topic(incoming)?;
        let matches = self.matching_topics(data);
        let (topic, fresh) = match matches.split_first() {
            None => (self.insert_topic()?, true),
            Some(((first, _), rest)) => {
                for (existing, locator) in rest {
                    if !self.automerge {
                        return Err(IdentityError::Conflict {
                            reporter: incoming.into(),
                            existing: (*existing).into(),
                            locator: locator.clone(),
                        }
                        .into());
                    }
                    ctx.pending.push_back((*first, *existing));
                }
                self.run_pending(ctx)?;
                (ctx.resolve(*first), false)
            }
        };

        let own_placeholders = self.topic(topic)?.placeholders.clone();
        let identities = [
            (IdentityKind::ItemIdentifier, &data.item_identifiers),
            (IdentityKind::SubjectIdentifier, &data.subject_identifiers),
            (IdentityKind::SubjectLocator, &data.subject_locators),
        ];
        for (kind, locators) in identities {
            for locator in locators {
                if let Some(existing) = self.identities.conflict(kind, locator, topic.into()) {
                    return Err(IdentityError::Conflict {
                        reporter: incoming.into(),
                        existing,
                        locator: locator.clone(),
                    }
                    .into());
                }
                self.bind_identity(topic.into(), kind, locator.clone());
            }
        }
        self.topic_mut(topic)?
            .placeholders
            .extend(data.placeholders.iter().cloned());
        if !fresh {
            self.settle_placeholders(topic, &own_placeholders);
        }
        Ok(topic)
    }

    /// Copy every topic, characteristic and association of `other` into this map.
    pub(crate) fn absorb(&mut self, other: &MapState) -> TmResult<()> {
        let mut ctx = MergeContext::default();
        let mut topics: Vec<TopicId> = other.topics.keys().copied().collect();
        topics.sort();
        for &incoming in &topics {
            let topic = self.import_topic(&mut ctx, other, incoming)?;
            ctx.imported.insert(incoming, topic);
        }

        let mut copied: Vec<(ConstructRef, ConstructRef)> = vec![(other.id.into(), self.id.into())];
        for &incoming in &topics {
            let topic = ctx.import(incoming)?;
            let data = other.topic(incoming)?;
            let types = ctx.import_all(&data.types)?;
            self.with_reindex(&[topic.into()], |s| {
                if let Some(t) = s.topics.get_mut(&topic) {
                    t.types.extend(types);
                }
            });

            let mut names: Vec<NameId> = data.names.iter().copied().collect();
            names.sort();
            for name in names {
                let n = &other.names[&name];
                let id = self.insert_name(topic, ctx.import(n.ty)?, n.value.clone(), ctx.import_all(&n.scope)?)?;
                copied.push((name.into(), id.into()));
                let mut variants: Vec<VariantId> = n.variants.iter().copied().collect();
                variants.sort();
                for variant in variants {
                    let v = &other.variants[&variant];
                    let vid = self.insert_variant(id, v.literal.clone(), ctx.import_all(&v.scope)?)?;
                    copied.push((variant.into(), vid.into()));
                }
            }

            let mut occurrences: Vec<_> = data.occurrences.iter().copied().collect();
            occurrences.sort();
            for occurrence in occurrences {
                let o = &other.occurrences[&occurrence];
                let id = self.insert_occurrence(
                    topic,
                    ctx.import(o.ty)?,
                    o.literal.clone(),
                    ctx.import_all(&o.scope)?,
                )?;
                copied.push((occurrence.into(), id.into()));
            }
        }

        let mut associations: Vec<AssociationId> = other.associations.keys().copied().collect();
        associations.sort();
        for association in associations {
            let a = &other.associations[&association];
            let id = self.insert_association(ctx.import(a.ty)?, ctx.import_all(&a.scope)?)?;
            copied.push((association.into(), id.into()));
            let mut roles: Vec<RoleId> = a.roles.iter().copied().collect();
            roles.sort();
            for role in roles {
                let r = &other.roles[&role];
                let rid = self.insert_role(id, ctx.import(r.ty)?, ctx.import(r.player)?)?;
                copied.push((role.into(), rid.into()));
            }
        }

        // Only constructs that received imported content are collapsed.
        let owners: HashSet<TopicId> = ctx.imported.values().map(|&t| ctx.resolve(t)).collect();
        let associations: HashSet<AssociationId> = copied
            .iter()
            .filter_map(|&(_, to)| match to {
                ConstructRef::Association(id) => Some(id),
                _ => None,
            })
            .collect();
        self.dedupe(&mut ctx, owners, associations);
        self.run_pending(&mut ctx)?;

        // Item identifiers and reifiers attach to whatever the copies collapsed into.
        for (from, to) in copied {
            let to = ctx.resolve_construct(to);
            if !self.contains(to) {
                continue;
            }
            if let Some(locators) = other.item_identifiers(from) {
                for locator in locators {
                    if let Some(existing) =
                        self.identities.conflict(IdentityKind::ItemIdentifier, locator, to)
                    {
                        return Err(IdentityError::Conflict {
                            reporter: from,
                            existing,
                            locator: locator.clone(),
                        }
                        .into());
                    }
                    self.bind_identity(to, IdentityKind::ItemIdentifier, locator.clone());
                }
            }
            let Some(reifier) = other.reifier(from) else {
                continue;
            };
            let reifier = ctx.import(reifier)?;
            match self.reifier(to) {
                Some(existing) if existing == reifier => {}
                Some(existing) => {
                    ctx.pending.push_back((existing, reifier));
                    self.run_pending(&mut ctx)?;
                }
                None => self.set_reifier(to, Some(reifier))?,
            }
        }
        Ok(())
    }
}

impl TopicMap {
    /// Merge `source` into `target`; `source` no longer exists afterwards.
    ///
    /// The merge is atomic: on failure the map is left unchanged.
    pub fn merge_topics(&self, target: TopicId, source: TopicId) -> TmResult<()> {
        let mut state = self.write();
        state.require(target)?;
        state.require_topic(target.into(), source)?;
        if target == source {
            return Ok(());
        }
        state.transact(|s| s.merge_topics(target, source))
    }

    /// Merge every construct of `other` into this map.
    ///
    /// Topics sharing an identity with a topic of this map are merged into
    /// it; everything else is copied. Merging a map into itself does nothing.
    pub fn merge_in(&self, other: &TopicMap) -> TmResult<()> {
        if std::ptr::eq(self, other) {
            return Ok(());
        }
        // Copy `other` so no two map locks are ever held together.
        let source = other.read().clone();
        let mut state = self.write();
        tracing::debug!(into = %state.base, from = %source.base, "merging topic maps");
        state.transact(|s| s.absorb(&source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TopicMapError;
    use crate::index::IndexMode;
    use crate::map::tests::{assert_tables_consistent, map};

    fn loc(s: &str) -> Locator {
        Locator::parse(s).unwrap()
    }

    #[test]
    fn merge_moves_characteristics_and_references() {
        let tm = map();
        let a = tm.create_topic().unwrap();
        let b = tm.create_topic().unwrap();
        let other = tm.create_topic().unwrap();
        let name = tm.create_name(b, "bee").unwrap();
        let occ = tm.create_occurrence(other, b, "typed by b", &[b]).unwrap();
        let assoc = tm.create_association(a, &[]).unwrap();
        let role = tm.create_role(assoc, a, b).unwrap();
        tm.add_type(other, b).unwrap();

        tm.merge_topics(a, b).unwrap();

        assert!(!tm.contains(b));
        assert_eq!(tm.parent(name).unwrap(), Some(a.into()));
        assert_eq!(tm.type_of(occ).unwrap(), a);
        assert!(tm.scope(occ).unwrap().contains(&a));
        assert_eq!(tm.player(role).unwrap(), a);
        assert!(tm.types(other).unwrap().contains(&a));
        assert_tables_consistent(&tm);
    }

    #[test]
    fn placeholders_dropped_when_supplied_identity_survives() {
        let tm = map();
        let a = tm.create_topic().unwrap();
        let b = tm.create_topic().unwrap();
        let sid = loc("http://example.org/subject");
        tm.add_subject_identifier(b, &sid).unwrap();

        tm.merge_topics(a, b).unwrap();
        assert!(tm.item_identifiers(a).unwrap().is_empty());
        assert_eq!(tm.subject_identifiers(a).unwrap(), vec![sid]);
    }

    #[test]
    fn placeholder_of_target_kept_without_supplied_identity() {
        let tm = map();
        let a = tm.create_topic().unwrap();
        let b = tm.create_topic().unwrap();
        let kept = tm.item_identifiers(a).unwrap();
        let dropped = tm.item_identifiers(b).unwrap();

        tm.merge_topics(a, b).unwrap();
        assert_eq!(tm.item_identifiers(a).unwrap(), kept);
        assert_eq!(tm.construct_by_item_identifier(&dropped[0]), None);
    }

    #[test]
    fn duplicate_names_collapse() {
        let tm = map();
        let a = tm.create_topic().unwrap();
        let b = tm.create_topic().unwrap();
        let n1 = tm.create_name(a, "same").unwrap();
        let n2 = tm.create_name(b, "same").unwrap();
        let iid = loc("http://example.org/name");
        tm.add_item_identifier(n2, &iid).unwrap();

        tm.merge_topics(a, b).unwrap();
        assert_eq!(tm.names(a).unwrap(), vec![n1]);
        assert_eq!(tm.construct_by_item_identifier(&iid), Some(n1.into()));
        assert_tables_consistent(&tm);
    }

    #[test]
    fn duplicate_associations_collapse() {
        let tm = map();
        let ty = tm.create_topic().unwrap();
        let a = tm.create_topic().unwrap();
        let b = tm.create_topic().unwrap();
        let x = tm.create_association(ty, &[]).unwrap();
        tm.create_role(x, ty, a).unwrap();
        let y = tm.create_association(ty, &[]).unwrap();
        tm.create_role(y, ty, b).unwrap();

        tm.merge_topics(a, b).unwrap();
        assert_eq!(tm.associations(), vec![x]);
        assert_eq!(tm.roles_played(a).unwrap().len(), 1);
        assert_tables_consistent(&tm);
    }

    #[test]
    fn reifiers_of_duplicates_are_merged() {
        let tm = map();
        let a = tm.create_topic().unwrap();
        let b = tm.create_topic().unwrap();
        let n1 = tm.create_name(a, "same").unwrap();
        let n2 = tm.create_name(b, "same").unwrap();
        let r1 = tm.create_topic().unwrap();
        let r2 = tm.create_topic().unwrap();
        tm.set_reifier(n1, Some(r1)).unwrap();
        tm.set_reifier(n2, Some(r2)).unwrap();

        tm.merge_topics(a, b).unwrap();
        let reifier = tm.reifier(n1).unwrap().unwrap();
        assert!(reifier == r1 || reifier == r2);
        assert_eq!(tm.reified(reifier).unwrap(), Some(n1.into()));
        assert!(!(tm.contains(r1) && tm.contains(r2)));
    }

    #[test]
    fn topics_reifying_different_constructs_cannot_merge() {
        let tm = map();
        let t = tm.create_topic().unwrap();
        let n1 = tm.create_name(t, "one").unwrap();
        let n2 = tm.create_name(t, "two").unwrap();
        let r1 = tm.create_topic().unwrap();
        let r2 = tm.create_topic().unwrap();
        tm.set_reifier(n1, Some(r1)).unwrap();
        tm.set_reifier(n2, Some(r2)).unwrap();

        let err = tm.merge_topics(r1, r2).unwrap_err();
        assert!(matches!(err, TopicMapError::Model(ModelError::Constraint { .. })));
        assert_eq!(err.reporter(), Some(r1.into()));
        assert!(tm.contains(r2));
    }

    #[test]
    fn merge_in_counts_distinct_subjects() {
        let left = map();
        let right = TopicMap::new(loc("http://example.org/right"), false, IndexMode::Auto).unwrap();
        let shared = loc("http://example.org/shared");
        let l = left.create_topic_by_subject_identifier(&shared).unwrap();
        left.create_name(l, "shared").unwrap();
        let r = right.create_topic_by_item_identifier(&shared).unwrap();
        right.create_name(r, "shared").unwrap();
        right.create_topic().unwrap();

        let before = left.topics().len();
        left.merge_in(&right).unwrap();
        // The incoming name type matches by subject identifier; the
        // placeholder-only topic is copied.
        assert_eq!(left.topics().len(), before + 1);
        assert_eq!(left.names(l).unwrap().len(), 1);
        assert_tables_consistent(&left);

        left.merge_in(&left).unwrap();
        assert_eq!(left.topics().len(), before + 1);
    }

    #[test]
    fn merge_in_conflict_leaves_map_unchanged() {
        let left = map();
        let right = TopicMap::new(loc("http://example.org/right"), false, IndexMode::Auto).unwrap();
        let one = loc("http://example.org/one");
        let two = loc("http://example.org/two");
        let a = left.create_topic_by_subject_identifier(&one).unwrap();
        let b = left.create_topic_by_subject_identifier(&two).unwrap();
        let incoming = right.create_topic_by_subject_identifier(&one).unwrap();
        right.add_subject_identifier(incoming, &two).unwrap();

        let err = left.merge_in(&right).unwrap_err();
        match err {
            TopicMapError::Identity(IdentityError::Conflict { reporter, existing, .. }) => {
                assert_eq!(reporter, incoming.into());
                assert!(existing == a.into() || existing == b.into());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(left.topics().len(), 2);
        assert_tables_consistent(&left);
    }

    #[test]
    fn merge_in_leaves_untouched_duplicates_alone() {
        let left = map();
        let right = TopicMap::new(loc("http://example.org/right"), false, IndexMode::Auto).unwrap();
        let t = left.create_topic().unwrap();
        let n1 = left.create_name(t, "same").unwrap();
        let n2 = left.create_name(t, "same").unwrap();
        let ty = left.create_topic().unwrap();
        let a1 = left.create_association(ty, &[]).unwrap();
        let a2 = left.create_association(ty, &[]).unwrap();

        left.merge_in(&right).unwrap();
        assert!(left.contains(n1) && left.contains(n2));
        assert!(left.contains(a1) && left.contains(a2));

        right.create_name(right.create_topic().unwrap(), "elsewhere").unwrap();
        left.merge_in(&right).unwrap();
        let names = left.names(t).unwrap();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&n1) && names.contains(&n2));
        assert_eq!(left.associations().len(), 2);
        assert_tables_consistent(&left);
    }

    #[test]
    fn merge_in_both_directions_concurrently() {
        let left = map();
        let right = TopicMap::new(loc("http://example.org/right"), false, IndexMode::Auto).unwrap();
        let shared = loc("http://example.org/shared");
        left.create_topic_by_subject_identifier(&shared).unwrap();
        right.create_topic_by_subject_identifier(&shared).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| left.merge_in(&right).unwrap());
                scope.spawn(|| right.merge_in(&left).unwrap());
            }
        });
        assert!(left.topic_by_subject_identifier(&shared).is_some());
        assert_eq!(left.topics().len(), right.topics().len());
        assert_tables_consistent(&left);
        assert_tables_consistent(&right);
    }
}
