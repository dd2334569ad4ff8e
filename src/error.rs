//! Rich diagnostic error types for the topic map engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. [`TopicMapError`] aggregates them so a
//! caller can match on the failing subsystem or simply propagate with `?`.

use miette::Diagnostic;
use thiserror::Error;

use crate::construct::{ConstructRef, TopicId};
use crate::locator::Locator;

/// Top-level error type for the topic map engine.
#[derive(Debug, Error, Diagnostic)]
pub enum TopicMapError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    System(#[from] SystemError),
}

impl TopicMapError {
    /// The construct whose invariant the failed operation would have broken.
    pub fn reporter(&self) -> Option<ConstructRef> {
        match self {
            TopicMapError::Model(ModelError::Constraint { reporter, .. }) => Some(*reporter),
            TopicMapError::Model(ModelError::TopicInUse { topic, .. }) => Some((*topic).into()),
            TopicMapError::Identity(IdentityError::Conflict { reporter, .. }) => Some(*reporter),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Model errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    #[error("model constraint violated by {reporter}: {message}")]
    #[diagnostic(
        code(tm::model::constraint),
        help(
            "The arguments break a structural rule of the topic map data model. \
             Check that every topic argument belongs to this topic map and that \
             variant scopes add at least one theme to their name's scope."
        )
    )]
    Constraint {
        reporter: ConstructRef,
        message: String,
    },

    #[error("{construct} is not part of this topic map")]
    #[diagnostic(
        code(tm::model::not_found),
        help(
            "The construct was removed, merged into another topic, or was created \
             by a different topic map."
        )
    )]
    NotFound { construct: ConstructRef },

    #[error("{topic} is still in use as {usage}")]
    #[diagnostic(
        code(tm::model::topic_in_use),
        help(
            "A topic can only be removed once nothing else refers to it. \
             Retype, rescope or remove the constructs that use it first."
        )
    )]
    TopicInUse { topic: TopicId, usage: String },

    #[error("literal {value:?} cannot be read as {datatype}")]
    #[diagnostic(
        code(tm::model::invalid_literal),
        help("The stored value does not parse as the requested type.")
    )]
    InvalidLiteral { value: String, datatype: String },

    #[error("construct allocator exhausted: cannot allocate more than u64::MAX constructs")]
    #[diagnostic(
        code(tm::model::exhausted),
        help("The construct id space is exhausted. Check for allocation loops.")
    )]
    AllocatorExhausted,
}

// ---------------------------------------------------------------------------
// Identity errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IdentityError {
    #[error("identity conflict: {reporter} cannot take {locator}, already used by {existing}")]
    #[diagnostic(
        code(tm::identity::conflict),
        help(
            "Item identifiers, subject identifiers and subject locators must be unique. \
             Enable the automerge feature to merge topics that share an identity \
             instead of failing."
        )
    )]
    Conflict {
        reporter: ConstructRef,
        existing: ConstructRef,
        locator: Locator,
    },
}

// ---------------------------------------------------------------------------
// Index errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IndexError {
    #[error("{index} index is closed")]
    #[diagnostic(
        code(tm::index::closed),
        help("Call `open()` on the index before querying it.")
    )]
    Closed { index: &'static str },

    #[error("missing argument: {argument}")]
    #[diagnostic(
        code(tm::index::missing_argument),
        help("Index queries need at least one theme or type to match against.")
    )]
    MissingArgument { argument: &'static str },
}

// ---------------------------------------------------------------------------
// Locator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum LocatorError {
    #[error("malformed locator {reference:?}: {source}")]
    #[diagnostic(
        code(tm::locator::malformed),
        help(
            "Locators must be absolute IRIs such as `http://example.org/topic`. \
             Resolve relative references against a base locator."
        )
    )]
    Malformed {
        reference: String,
        #[source]
        source: url::ParseError,
    },
}

// ---------------------------------------------------------------------------
// System errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SystemError {
    #[error("a topic map already exists at {locator}")]
    #[diagnostic(
        code(tm::system::exists),
        help("Each storage address holds at most one topic map. Pick another locator or remove the existing map.")
    )]
    TopicMapExists { locator: Locator },

    #[error("feature not recognized: {name}")]
    #[diagnostic(
        code(tm::system::feature_not_recognized),
        help("Known features are listed in `tm_engine::system::features`.")
    )]
    FeatureNotRecognized { name: String },

    #[error("feature not supported: {name} = {value}")]
    #[diagnostic(
        code(tm::system::feature_not_supported),
        help("The feature is recognized but this engine cannot run with that setting.")
    )]
    FeatureNotSupported { name: String, value: bool },

    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(tm::system::invalid_config),
        help("Check the system configuration file. {message}")
    )]
    InvalidConfig { message: String },

    #[error("configuration I/O error for {path}: {source}")]
    #[diagnostic(
        code(tm::system::io),
        help("Check that the configuration file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for functions returning topic map results.
pub type TmResult<T> = std::result::Result<T, TopicMapError>;

/// Result type for index queries.
pub type IndexResult<T> = std::result::Result<T, IndexError>;

/// Result type for locator parsing.
pub type LocatorResult<T> = std::result::Result<T, LocatorError>;

/// Result type for system and factory operations.
pub type SystemResult<T> = std::result::Result<T, SystemError>;
