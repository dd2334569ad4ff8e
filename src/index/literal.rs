//! Constructs by value.
//!
//! String queries match `xsd:string` values, locator queries match
//! `xsd:anyURI` values by reference, and the `_with_datatype` variants
//! match any explicit datatype.

use crate::construct::{NameId, OccurrenceId, VariantId};
use crate::error::IndexResult;
use crate::literal::{xsd_any_uri, xsd_string};
use crate::locator::Locator;
use crate::map::TopicMap;

use super::{delegate_index, IndexHandle};

pub struct LiteralIndex<'a> {
    handle: IndexHandle<'a>,
}

delegate_index!(LiteralIndex);

impl<'a> LiteralIndex<'a> {
    pub(crate) fn new(map: &'a TopicMap) -> Self {
        Self {
            handle: IndexHandle::new(map, "literal"),
        }
    }

    /// Names whose value is exactly `value`.
    pub fn names(&self, value: &str) -> IndexResult<Vec<NameId>> {
        self.handle.query(|t| t.name_values.values(&value.to_string()))
    }

    pub fn occurrences(&self, value: &str) -> IndexResult<Vec<OccurrenceId>> {
        self.occurrences_with_datatype(value, &xsd_string())
    }

    pub fn occurrences_by_locator(&self, locator: &Locator) -> IndexResult<Vec<OccurrenceId>> {
        self.occurrences_with_datatype(locator.reference(), &xsd_any_uri())
    }

    pub fn occurrences_with_datatype(
        &self,
        value: &str,
        datatype: &Locator,
    ) -> IndexResult<Vec<OccurrenceId>> {
        let key = (value.to_string(), datatype.clone());
        self.handle.query(|t| t.occurrence_values.values(&key))
    }

    pub fn variants(&self, value: &str) -> IndexResult<Vec<VariantId>> {
        self.variants_with_datatype(value, &xsd_string())
    }

    pub fn variants_by_locator(&self, locator: &Locator) -> IndexResult<Vec<VariantId>> {
        self.variants_with_datatype(locator.reference(), &xsd_any_uri())
    }

    pub fn variants_with_datatype(&self, value: &str, datatype: &Locator) -> IndexResult<Vec<VariantId>> {
        let key = (value.to_string(), datatype.clone());
        self.handle.query(|t| t.variant_values.values(&key))
    }
}
