//! Reconcile a declarative entity model with a live database.
//!
//! This crate provides:
//! - Normalization of the entity model ([`DesiredSchema`]) and of raw
//!   introspection rows ([`ActualSchema`]) into one canonical shape
//! - A [`SchemaComparator`] producing a [`ChangeSet`] of tables and columns
//!   to add, remove, or update
//! - An ordered [`MigrationPlan`] rendered as MySQL DDL
//! - A [`Migrator`] that drives external introspection/execution collaborators
//!
//! # Conventions
//!
//! Every table has an implicit auto-increment `id` primary key. It is never
//! part of a normalized schema and never shows up in a diff.
//!
//! Nullability uses the database's encoding: a *required* field is `"NO"`
//! (not nullable). See [`Nullability`].
//!
//! # Example
//!
//! ```ignore
//! let (model, _) = tabula_config::load()?;
//! let migrator = Migrator::new(&model)?;
//! let applied = migrator.migrate(&introspector, &executor).await?;
//! for change in applied.plan().iter() {
//!     println!("{}", change);
//! }
//! ```

mod diff;
mod error;
mod migrate;
mod normalize;
mod plan;
pub mod schema;

pub use diff::{ChangeSet, ColumnChangeSet, SchemaComparator};
pub use error::{BoxError, ConfigSubject, Error, RelationKind};
pub use migrate::{Executor, Introspector, Migrator};
pub use plan::{Change, MigrationPlan};
pub use schema::{ActualSchema, DesiredSchema, SchemaView};

pub use tabula_config::{self as config, Model};
pub use tabula_schema::{
    Attribute, ColumnRow, FK_TYPE, FieldDescription, NormalizedSchema, Nullability, PRIMARY_KEY,
    SchemaError, TableDescription, canonical_type,
};

/// Quote a MySQL identifier.
///
/// Always quotes to avoid clashes with reserved words like `order` or
/// `group`. Doubles any embedded backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Result type for tabula operations.
pub type Result<T> = std::result::Result<T, Error>;
