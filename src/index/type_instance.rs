//! Constructs by type, and topics by the types they are instances of.

use crate::construct::{AssociationId, NameId, OccurrenceId, RoleId, TopicId};
use crate::error::IndexResult;
use crate::map::TopicMap;

use super::{delegate_index, require_some, IndexHandle};

pub struct TypeInstanceIndex<'a> {
    handle: IndexHandle<'a>,
}

delegate_index!(TypeInstanceIndex);

impl<'a> TypeInstanceIndex<'a> {
    pub(crate) fn new(map: &'a TopicMap) -> Self {
        Self {
            handle: IndexHandle::new(map, "type-instance"),
        }
    }

    /// Topics used as the type of some topic.
    pub fn topic_types(&self) -> IndexResult<Vec<TopicId>> {
        self.handle
            .query(|t| t.topic_types.keys().filter_map(|k| *k).collect())
    }

    pub fn association_types(&self) -> IndexResult<Vec<TopicId>> {
        self.handle
            .query(|t| t.association_types.keys().copied().collect())
    }

    pub fn role_types(&self) -> IndexResult<Vec<TopicId>> {
        self.handle.query(|t| t.role_types.keys().copied().collect())
    }

    pub fn name_types(&self) -> IndexResult<Vec<TopicId>> {
        self.handle.query(|t| t.name_types.keys().copied().collect())
    }

    pub fn occurrence_types(&self) -> IndexResult<Vec<TopicId>> {
        self.handle
            .query(|t| t.occurrence_types.keys().copied().collect())
    }

    /// Instances of `ty`; `None` returns the topics without any type.
    pub fn topics(&self, ty: Option<TopicId>) -> IndexResult<Vec<TopicId>> {
        self.handle.query(|t| t.topic_types.values(&ty))
    }

    /// Topics that are instances of every type (`match_all`) or of any.
    pub fn topics_matching(&self, types: &[TopicId], match_all: bool) -> IndexResult<Vec<TopicId>> {
        require_some(types, "types")?;
        let keys: Vec<Option<TopicId>> = types.iter().copied().map(Some).collect();
        self.handle
            .query(|t| t.topic_types.matching(&keys, match_all))
    }

    pub fn associations(&self, ty: TopicId) -> IndexResult<Vec<AssociationId>> {
        self.handle.query(|t| t.association_types.values(&ty))
    }

    pub fn roles(&self, ty: TopicId) -> IndexResult<Vec<RoleId>> {
        self.handle.query(|t| t.role_types.values(&ty))
    }

    pub fn names(&self, ty: TopicId) -> IndexResult<Vec<NameId>> {
        self.handle.query(|t| t.name_types.values(&ty))
    }

    pub fn occurrences(&self, ty: TopicId) -> IndexResult<Vec<OccurrenceId>> {
        self.handle.query(|t| t.occurrence_types.values(&ty))
    }
}
