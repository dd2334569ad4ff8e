//! Query indices over a topic map.
//!
//! Three views are available from a [`TopicMap`]: the [`LiteralIndex`]
//! (constructs by value), the [`ScopedIndex`] (constructs by theme) and the
//! [`TypeInstanceIndex`] (constructs by type). Each starts closed and must be
//! opened before it answers queries.
//!
//! In [`IndexMode::Auto`] the views read the posting tables the map keeps in
//! sync with every mutation. In [`IndexMode::Manual`] they read a snapshot
//! taken on [`Index::open`] and refreshed only by [`Index::reindex`].

pub mod literal;
pub mod scoped;
pub(crate) mod table;
pub mod type_instance;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexResult};
use crate::map::TopicMap;
use table::IndexTables;

pub use literal::LiteralIndex;
pub use scoped::ScopedIndex;
pub use type_instance::TypeInstanceIndex;

/// How index views follow changes to the topic map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    /// Every mutation is visible to queries immediately.
    #[default]
    Auto,
    /// Queries see the state as of the last `open` or `reindex`.
    Manual,
}

/// Lifecycle shared by all index views.
pub trait Index {
    /// Open the index. Opening an open index does nothing.
    fn open(&mut self);

    /// Close the index. Closing a closed index does nothing.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Whether queries reflect mutations without an explicit [`Index::reindex`].
    fn is_auto_updated(&self) -> bool;

    /// Bring a manual index up to date with the topic map.
    fn reindex(&mut self);
}

/// Open/closed state and, in manual mode, the snapshot a view reads.
pub(crate) struct IndexHandle<'a> {
    map: &'a TopicMap,
    name: &'static str,
    open: bool,
    snapshot: Option<IndexTables>,
}

impl<'a> IndexHandle<'a> {
    pub(crate) fn new(map: &'a TopicMap, name: &'static str) -> Self {
        Self {
            map,
            name,
            open: false,
            snapshot: None,
        }
    }

    fn auto(&self) -> bool {
        self.map.index_mode() == IndexMode::Auto
    }

    fn refresh(&mut self) {
        if !self.auto() {
            let state = self.map.read();
            self.snapshot = Some(IndexTables::rebuild(&state));
            tracing::debug!(index = self.name, map = %self.map.locator(), "rebuilt manual index");
        }
    }

    /// Run `f` against the tables this view reads.
    pub(crate) fn query<T>(&self, f: impl FnOnce(&IndexTables) -> T) -> IndexResult<T> {
        if !self.open {
            return Err(IndexError::Closed { index: self.name });
        }
        match &self.snapshot {
            Some(snapshot) => Ok(f(snapshot)),
            None => Ok(f(&self.map.read().tables)),
        }
    }
}

impl Index for IndexHandle<'_> {
    fn open(&mut self) {
        if !self.open {
            self.open = true;
            self.refresh();
        }
    }

    fn close(&mut self) {
        self.open = false;
        self.snapshot = None;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn is_auto_updated(&self) -> bool {
        self.auto()
    }

    fn reindex(&mut self) {
        if self.open {
            self.refresh();
        }
    }
}

/// Reject an empty theme or type list.
pub(crate) fn require_some<T>(items: &[T], argument: &'static str) -> IndexResult<()> {
    if items.is_empty() {
        Err(IndexError::MissingArgument { argument })
    } else {
        Ok(())
    }
}

macro_rules! delegate_index {
    ($view:ident) => {
        impl crate::index::Index for $view<'_> {
            fn open(&mut self) {
                crate::index::Index::open(&mut self.handle);
            }

            fn close(&mut self) {
                crate::index::Index::close(&mut self.handle);
            }

            fn is_open(&self) -> bool {
                crate::index::Index::is_open(&self.handle)
            }

            fn is_auto_updated(&self) -> bool {
                crate::index::Index::is_auto_updated(&self.handle)
            }

            fn reindex(&mut self) {
                crate::index::Index::reindex(&mut self.handle);
            }
        }
    };
}
pub(crate) use delegate_index;

impl TopicMap {
    /// A closed literal index over this map.
    pub fn literal_index(&self) -> LiteralIndex<'_> {
        LiteralIndex::new(self)
    }

    /// A closed scoped index over this map.
    pub fn scoped_index(&self) -> ScopedIndex<'_> {
        ScopedIndex::new(self)
    }

    /// A closed type-instance index over this map.
    pub fn type_instance_index(&self) -> TypeInstanceIndex<'_> {
        TypeInstanceIndex::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Locator;

    fn manual_map() -> TopicMap {
        TopicMap::new(
            Locator::parse("http://example.org/manual").unwrap(),
            false,
            IndexMode::Manual,
        )
        .unwrap()
    }

    #[test]
    fn index_mode_from_toml_value() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: IndexMode,
        }
        let w: Wrapper = toml::from_str("mode = \"manual\"").unwrap();
        assert_eq!(w.mode, IndexMode::Manual);
        assert_eq!(IndexMode::default(), IndexMode::Auto);
    }

    #[test]
    fn closed_handle_rejects_queries() {
        let tm = manual_map();
        let mut handle = IndexHandle::new(&tm, "test");
        assert!(!handle.is_open());
        assert!(matches!(
            handle.query(|_| ()),
            Err(IndexError::Closed { index: "test" })
        ));
        handle.open();
        handle.open();
        assert!(handle.is_open());
        assert!(handle.query(|_| ()).is_ok());
        handle.close();
        handle.close();
        assert!(!handle.is_open());
    }

    #[test]
    fn manual_snapshot_changes_only_on_reindex() {
        let tm = manual_map();
        let mut handle = IndexHandle::new(&tm, "test");
        assert!(!handle.is_auto_updated());
        handle.open();
        let t = tm.create_topic().unwrap();
        let untyped = |h: &IndexHandle<'_>| h.query(|tables| tables.topic_types.values(&None)).unwrap();
        assert!(untyped(&handle).is_empty());
        handle.reindex();
        assert_eq!(untyped(&handle), vec![t]);
    }

    #[test]
    fn require_some_rejects_empty() {
        let empty: [u8; 0] = [];
        assert!(require_some(&empty, "themes").is_err());
        assert!(require_some(&[1], "themes").is_ok());
    }
}
