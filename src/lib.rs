// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # tm-engine
//!
//! An in-memory Topic Maps engine: topics, associations, names, occurrences
//! and variants with identity-based merging and query indices.
//!
//! ## Architecture
//!
//! - **Constructs** (`construct`): typed ids and capability traits
//! - **Topic maps** (`map`): construct store, identity registry, scope/type model, merge engine
//! - **Indices** (`index`): literal, scoped and type-instance views, auto or manual
//! - **Systems** (`system`): factory, feature flags and the registry of maps
//!
//! ## Library usage
//!
//! ```no_run
//! use tm_engine::index::Index;
//! use tm_engine::system::{features, TopicMapSystemFactory};
//!
//! let mut factory = TopicMapSystemFactory::new();
//! factory.set_feature(features::AUTOMERGE, true).unwrap();
//! let system = factory.new_topic_map_system();
//! let tm = system.create_topic_map("http://example.org/map").unwrap();
//!
//! let sun = tm.create_topic().unwrap();
//! tm.create_name(sun, "Sun").unwrap();
//!
//! let mut names = tm.literal_index();
//! names.open();
//! assert_eq!(names.names("Sun").unwrap().len(), 1);
//! ```

pub mod construct;
pub mod error;
pub mod index;
pub mod literal;
pub mod locator;
pub mod map;
pub mod system;

pub use construct::{
    AssociationId, ConstructId, ConstructKind, ConstructRef, NameId, OccurrenceId, RoleId,
    TopicId, TopicMapId, VariantId,
};
pub use error::{TmResult, TopicMapError};
pub use literal::Literal;
pub use locator::Locator;
pub use map::TopicMap;
pub use system::{SystemConfig, TopicMapSystem, TopicMapSystemFactory};
