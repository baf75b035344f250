//! Parameter model for flowform node editors.
//!
//! This crate provides the typed parameter trees that node editors manipulate:
//!
//! - **Schema**: `PropertySchema` with eight kinds, ordered children and an
//!   expression mode that stashes the original kind
//! - **Values**: literal values and reference bindings that mirror the schema
//! - **Tree**: `ParameterTree` edits (add, rename, retype, toggle, delete)
//! - **Persistence**: plain JSON documents and debounced commits
//! - **Templates**: initial parameters per node type

pub mod commit;
pub mod document;
pub mod error;
pub mod kind;
pub mod observe;
pub mod ordered;
pub mod path;
pub mod schema;
pub mod settings;
pub mod template;
pub mod tree;
pub mod value;

pub use commit::{Commit, CommitDebouncer, CommitSink};
pub use document::ParameterDocument;
pub use error::{DocumentError, TemplateError, TreeError};
pub use kind::{ParseKindError, PropertyKind};
pub use observe::{TreeObserver, TreeSnapshot};
pub use ordered::OrderedMap;
pub use path::{PropertyPath, Segment};
pub use schema::PropertySchema;
pub use settings::{EditorSettings, PathStrategy, TypeEquality};
pub use template::{NodeTemplate, StaticTemplate, TemplateRegistry};
pub use tree::ParameterTree;
pub use value::{LiteralValue, ValueBinding};
