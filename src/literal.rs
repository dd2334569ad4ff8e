//! Datatype-aware literal values for occurrences and variants.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::{LocatorResult, ModelError, TmResult};
use crate::locator::Locator;

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_ANY_URI: &str = "http://www.w3.org/2001/XMLSchema#anyURI";
pub const XSD_INT: &str = "http://www.w3.org/2001/XMLSchema#int";
pub const XSD_LONG: &str = "http://www.w3.org/2001/XMLSchema#long";
pub const XSD_FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";

fn builtin(reference: &str) -> Locator {
    match Locator::parse(reference) {
        Ok(locator) => locator,
        Err(e) => panic!("built-in datatype {reference} must parse: {e}"),
    }
}

static STRING: LazyLock<Locator> = LazyLock::new(|| builtin(XSD_STRING));
static ANY_URI: LazyLock<Locator> = LazyLock::new(|| builtin(XSD_ANY_URI));
static INT: LazyLock<Locator> = LazyLock::new(|| builtin(XSD_INT));
static LONG: LazyLock<Locator> = LazyLock::new(|| builtin(XSD_LONG));
static FLOAT: LazyLock<Locator> = LazyLock::new(|| builtin(XSD_FLOAT));
static DECIMAL: LazyLock<Locator> = LazyLock::new(|| builtin(XSD_DECIMAL));

/// `xsd:string`.
pub fn xsd_string() -> Locator {
    STRING.clone()
}

/// `xsd:anyURI`.
pub fn xsd_any_uri() -> Locator {
    ANY_URI.clone()
}

/// A value together with its datatype.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    value: String,
    datatype: Locator,
}

impl Literal {
    /// A plain string (`xsd:string`).
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: xsd_string(),
        }
    }

    /// A locator value (`xsd:anyURI`), stored as its reference.
    pub fn iri(locator: &Locator) -> Self {
        Self {
            value: locator.reference().to_string(),
            datatype: xsd_any_uri(),
        }
    }

    /// A value with an explicit datatype.
    pub fn typed(value: impl Into<String>, datatype: Locator) -> Self {
        Self {
            value: value.into(),
            datatype,
        }
    }

    /// A decimal number (`xsd:decimal`) given in its lexical form.
    pub fn decimal(lexical: impl Into<String>) -> Self {
        Self::typed(lexical, DECIMAL.clone())
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn datatype(&self) -> &Locator {
        &self.datatype
    }

    pub fn into_parts(self) -> (String, Locator) {
        (self.value, self.datatype)
    }

    /// Interpret the value as a locator.
    pub fn to_locator(&self) -> LocatorResult<Locator> {
        Locator::parse(&self.value)
    }

    pub fn int_value(&self) -> TmResult<i32> {
        self.parse_as(XSD_INT)
    }

    pub fn long_value(&self) -> TmResult<i64> {
        self.parse_as(XSD_LONG)
    }

    pub fn float_value(&self) -> TmResult<f32> {
        self.parse_as(XSD_FLOAT)
    }

    fn parse_as<T: std::str::FromStr>(&self, datatype: &str) -> TmResult<T> {
        self.value.trim().parse().map_err(|_| {
            ModelError::InvalidLiteral {
                value: self.value.clone(),
                datatype: datatype.to_string(),
            }
            .into()
        })
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::string(value)
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::string(value)
    }
}

impl From<&Locator> for Literal {
    fn from(locator: &Locator) -> Self {
        Literal::iri(locator)
    }
}

impl From<Locator> for Literal {
    fn from(locator: Locator) -> Self {
        Literal::iri(&locator)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::typed(value.to_string(), INT.clone())
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::typed(value.to_string(), LONG.clone())
    }
}

impl From<f32> for Literal {
    fn from(value: f32) -> Self {
        Literal::typed(value.to_string(), FLOAT.clone())
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}^^<{}>", self.value, self.datatype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_literal_defaults_to_xsd_string() {
        let lit = Literal::from("Value1");
        assert_eq!(lit.value(), "Value1");
        assert_eq!(lit.datatype().reference(), XSD_STRING);
    }

    #[test]
    fn locator_literal_uses_reference() {
        let loc = Locator::parse("http://example.org/doc").unwrap();
        let lit = Literal::from(&loc);
        assert_eq!(lit.value(), "http://example.org/doc");
        assert_eq!(lit.datatype().reference(), XSD_ANY_URI);
        assert_eq!(lit.to_locator().unwrap(), loc);
    }

    #[test]
    fn numeric_round_trip() {
        assert_eq!(Literal::from(42i32).int_value().unwrap(), 42);
        assert_eq!(Literal::from(-7i64).long_value().unwrap(), -7);
        assert!((Literal::from(1.5f32).float_value().unwrap() - 1.5).abs() < f32::EPSILON);
        assert_eq!(Literal::decimal("12.50").datatype().reference(), XSD_DECIMAL);
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        let err = Literal::string("abc").int_value().unwrap_err();
        assert!(matches!(
            err,
            crate::error::TopicMapError::Model(ModelError::InvalidLiteral { .. })
        ));
    }

    #[test]
    fn equality_includes_datatype() {
        let a = Literal::string("1");
        let b = Literal::from(1i32);
        assert_ne!(a, b);
    }
}
