//! Scope themes, construct types and topic types.

use std::collections::HashSet;

use crate::construct::{ConstructRef, Scoped, TopicId, Typed, VariantId};
use crate::error::{ModelError, TmResult};

use super::TopicMap;

impl TopicMap {
    /// The observed scope of a scoped construct.
    ///
    /// For variants this is the parent name's scope united with the
    /// variant's own themes. An empty set is the unconstrained scope.
    pub fn scope(&self, construct: impl Scoped) -> TmResult<HashSet<TopicId>> {
        let construct = construct.into();
        let state = self.read();
        state.require(construct)?;
        Ok(state.scope(construct).unwrap_or_default())
    }

    /// The themes a variant adds on top of its name's scope.
    pub fn local_scope(&self, variant: VariantId) -> TmResult<HashSet<TopicId>> {
        let state = self.read();
        state.require(variant)?;
        Ok(state.variants[&variant].scope.clone())
    }

    /// Add a theme. Adding a theme already present changes nothing.
    pub fn add_theme(&self, construct: impl Scoped, theme: TopicId) -> TmResult<()> {
        let construct = construct.into();
        let mut state = self.write();
        state.require(construct)?;
        state.require_topic(construct, theme)?;
        let targets = state.with_dependents(construct);
        state.with_reindex(&targets, |s| {
            if let Some(scope) = s.local_scope_mut(construct) {
                scope.insert(theme);
            }
        });
        Ok(())
    }

    /// Remove a theme. Removing an absent theme changes nothing.
    ///
    /// Only a variant's own themes can be removed, and not if the variant
    /// would be left with no theme beyond its name's scope. A theme the
    /// variant inherits from its name is a constraint error.
    pub fn remove_theme(&self, construct: impl Scoped, theme: TopicId) -> TmResult<()> {
        let construct = construct.into();
        let mut state = self.write();
        state.require(construct)?;
        if let ConstructRef::Variant(id) = construct {
            let variant = &state.variants[&id];
            let name_scope = &state.names[&variant.parent].scope;
            if !variant.scope.contains(&theme) {
                if name_scope.contains(&theme) {
                    return Err(ModelError::Constraint {
                        reporter: construct,
                        message: format!("{theme} belongs to the scope of {}", variant.parent),
                    }
                    .into());
                }
                return Ok(());
            }
            let remains_superset = variant
                .scope
                .iter()
                .any(|t| *t != theme && !name_scope.contains(t));
            if !remains_superset {
                return Err(ModelError::Constraint {
                    reporter: construct,
                    message: format!(
                        "removing {theme} leaves the variant scope equal to its name's scope"
                    ),
                }
                .into());
            }
        }
        let targets = state.with_dependents(construct);
        state.with_reindex(&targets, |s| {
            if let Some(scope) = s.local_scope_mut(construct) {
                scope.remove(&theme);
            }
        });
        Ok(())
    }

    pub fn type_of(&self, construct: impl Typed) -> TmResult<TopicId> {
        let construct = construct.into();
        let state = self.read();
        state
            .type_of(construct)
            .ok_or_else(|| ModelError::NotFound { construct }.into())
    }

    /// Replace the type of a typed construct.
    pub fn set_type(&self, construct: impl Typed, ty: TopicId) -> TmResult<()> {
        let construct = construct.into();
        let mut state = self.write();
        state.require(construct)?;
        state.require_topic(construct, ty)?;
        state.with_reindex(&[construct], |s| {
            if let Some(slot) = s.type_mut(construct) {
                *slot = ty;
            }
        });
        Ok(())
    }

    /// The topics `topic` is an instance of.
    pub fn types(&self, topic: TopicId) -> TmResult<HashSet<TopicId>> {
        Ok(self.read().topic(topic)?.types.clone())
    }

    pub fn add_type(&self, topic: TopicId, ty: TopicId) -> TmResult<()> {
        let mut state = self.write();
        state.require(topic)?;
        state.require_topic(topic.into(), ty)?;
        state.with_reindex(&[topic.into()], |s| {
            if let Some(data) = s.topics.get_mut(&topic) {
                data.types.insert(ty);
            }
        });
        Ok(())
    }

    pub fn remove_type(&self, topic: TopicId, ty: TopicId) -> TmResult<()> {
        let mut state = self.write();
        state.require(topic)?;
        state.with_reindex(&[topic.into()], |s| {
            if let Some(data) = s.topics.get_mut(&topic) {
                data.types.remove(&ty);
            }
        });
        Ok(())
    }
}
