//! Constructs by scope theme.
//!
//! The single-theme queries take `None` to mean the unconstrained scope.
//! Variants are never unconstrained, so their single-theme query takes a
//! plain topic. The `_matching` queries require every theme (`match_all`)
//! or at least one of them.

use crate::construct::{AssociationId, NameId, OccurrenceId, TopicId, VariantId};
use crate::error::IndexResult;
use crate::map::TopicMap;

use super::{delegate_index, require_some, IndexHandle};

pub struct ScopedIndex<'a> {
    handle: IndexHandle<'a>,
}

delegate_index!(ScopedIndex);

fn some_keys(themes: &[TopicId]) -> Vec<Option<TopicId>> {
    themes.iter().copied().map(Some).collect()
}

impl<'a> ScopedIndex<'a> {
    pub(crate) fn new(map: &'a TopicMap) -> Self {
        Self {
            handle: IndexHandle::new(map, "scoped"),
        }
    }

    pub fn associations(&self, theme: Option<TopicId>) -> IndexResult<Vec<AssociationId>> {
        self.handle.query(|t| t.association_themes.values(&theme))
    }

    pub fn associations_matching(
        &self,
        themes: &[TopicId],
        match_all: bool,
    ) -> IndexResult<Vec<AssociationId>> {
        require_some(themes, "themes")?;
        let keys = some_keys(themes);
        self.handle
            .query(|t| t.association_themes.matching(&keys, match_all))
    }

    /// Topics used as a theme of some association.
    pub fn association_themes(&self) -> IndexResult<Vec<TopicId>> {
        self.handle
            .query(|t| t.association_themes.keys().filter_map(|k| *k).collect())
    }

    pub fn names(&self, theme: Option<TopicId>) -> IndexResult<Vec<NameId>> {
        self.handle.query(|t| t.name_themes.values(&theme))
    }

    pub fn names_matching(&self, themes: &[TopicId], match_all: bool) -> IndexResult<Vec<NameId>> {
        require_some(themes, "themes")?;
        let keys = some_keys(themes);
        self.handle.query(|t| t.name_themes.matching(&keys, match_all))
    }

    pub fn name_themes(&self) -> IndexResult<Vec<TopicId>> {
        self.handle
            .query(|t| t.name_themes.keys().filter_map(|k| *k).collect())
    }

    pub fn occurrences(&self, theme: Option<TopicId>) -> IndexResult<Vec<OccurrenceId>> {
        self.handle.query(|t| t.occurrence_themes.values(&theme))
    }

    pub fn occurrences_matching(
        &self,
        themes: &[TopicId],
        match_all: bool,
    ) -> IndexResult<Vec<OccurrenceId>> {
        require_some(themes, "themes")?;
        let keys = some_keys(themes);
        self.handle
            .query(|t| t.occurrence_themes.matching(&keys, match_all))
    }

    pub fn occurrence_themes(&self) -> IndexResult<Vec<TopicId>> {
        self.handle
            .query(|t| t.occurrence_themes.keys().filter_map(|k| *k).collect())
    }

    /// Variants whose observed scope (name scope included) contains `theme`.
    pub fn variants(&self, theme: TopicId) -> IndexResult<Vec<VariantId>> {
        self.handle.query(|t| t.variant_themes.values(&theme))
    }

    pub fn variants_matching(&self, themes: &[TopicId], match_all: bool) -> IndexResult<Vec<VariantId>> {
        require_some(themes, "themes")?;
        self.handle
            .query(|t| t.variant_themes.matching(themes, match_all))
    }

    pub fn variant_themes(&self) -> IndexResult<Vec<TopicId>> {
        self.handle
            .query(|t| t.variant_themes.keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexError;
    use crate::index::Index;
    use crate::map::tests::map;

    #[test]
    fn unconstrained_scope_is_queryable() {
        let tm = map();
        let ty = tm.create_topic().unwrap();
        let theme = tm.create_topic().unwrap();
        let plain = tm.create_association(ty, &[]).unwrap();
        let scoped = tm.create_association(ty, &[theme]).unwrap();

        let mut index = tm.scoped_index();
        index.open();
        assert_eq!(index.associations(None).unwrap(), vec![plain]);
        assert_eq!(index.associations(Some(theme)).unwrap(), vec![scoped]);
        assert_eq!(index.association_themes().unwrap(), vec![theme]);
    }

    #[test]
    fn match_all_versus_any() {
        let tm = map();
        let t = tm.create_topic().unwrap();
        let ty = tm.create_topic().unwrap();
        let a = tm.create_topic().unwrap();
        let b = tm.create_topic().unwrap();
        let both = tm.create_occurrence(t, ty, "both", &[a, b]).unwrap();
        let only_a = tm.create_occurrence(t, ty, "a", &[a]).unwrap();

        let mut index = tm.scoped_index();
        index.open();
        assert_eq!(index.occurrences_matching(&[a, b], true).unwrap(), vec![both]);
        let mut any = index.occurrences_matching(&[a, b], false).unwrap();
        any.sort();
        let mut expected = vec![both, only_a];
        expected.sort();
        assert_eq!(any, expected);
    }

    #[test]
    fn variants_see_name_themes() {
        let tm = map();
        let t = tm.create_topic().unwrap();
        let name_theme = tm.create_topic().unwrap();
        let local = tm.create_topic().unwrap();
        let name = tm.create_typed_name(t, t, "n", &[name_theme]).unwrap();
        let variant = tm.create_variant(name, "v", &[local]).unwrap();

        let mut index = tm.scoped_index();
        index.open();
        assert_eq!(index.variants(name_theme).unwrap(), vec![variant]);
        assert_eq!(index.variants_matching(&[name_theme, local], true).unwrap(), vec![variant]);
    }

    #[test]
    fn empty_theme_list_is_an_argument_error() {
        let tm = map();
        let mut index = tm.scoped_index();
        index.open();
        assert!(matches!(
            index.names_matching(&[], true),
            Err(IndexError::MissingArgument { argument: "themes" })
        ));
    }
}
