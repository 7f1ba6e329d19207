//! Normalized schema types for tabula.
//!
//! This crate contains the canonical schema shape shared by both sides of a
//! comparison: the declarative entity model and the live database. Each side
//! is reduced to table name -> column name -> [`FieldDescription`], keeping
//! insertion order so diffs come out in a reproducible order.
//!
//! # Nullability polarity
//!
//! The model speaks in terms of `required`, the database speaks in terms of
//! `Null` (the column of `DESC <table>`). A **required** field is stored as
//! [`Nullability::No`] ("NO", the column is *not* nullable) and an optional
//! field as [`Nullability::Yes`] ("YES"). Every comparison happens on those
//! encoded strings. Do not "fix" the mapping to `required -> YES`.

use facet::Facet;
use indexmap::IndexMap;
use std::fmt;

/// Implicit primary key column. Never part of a normalized schema.
pub const PRIMARY_KEY: &str = "id";

/// Canonical type of every generated foreign key column (a 32-bit integer).
pub const FK_TYPE: &str = "int(11)";

/// Pseudo-field that expands into [`CREATED_AT`] and [`UPDATED_AT`].
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Audit column injected by the `timestamp` pseudo-field.
pub const CREATED_AT: &str = "created_at";

/// Audit column injected by the `timestamp` pseudo-field.
pub const UPDATED_AT: &str = "updated_at";

/// Canonical type of the audit columns.
pub const TIMESTAMP_TYPE: &str = "DATETIME";

/// Map a friendly model type to its canonical SQL type.
///
/// Known tokens (`word`, `sentence`, `text`, `integer`) map to fixed types.
/// Anything else is assumed to already be a SQL type and is uppercased.
///
/// ```
/// use tabula_schema::canonical_type;
/// assert_eq!(canonical_type("word"), "varchar(25)");
/// assert_eq!(canonical_type("datetime"), "DATETIME");
/// ```
pub fn canonical_type(name: &str) -> String {
    match name {
        "word" => "varchar(25)".to_string(),
        "sentence" => "varchar(255)".to_string(),
        "text" => "text".to_string(),
        "integer" => FK_TYPE.to_string(),
        other => other.to_uppercase(),
    }
}

/// Column nullability, encoded the way MySQL reports it.
///
/// See the crate docs: `required` maps to [`Nullability::No`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Nullability {
    /// "NO": the column is NOT NULL. This is what `required: true` produces.
    No,
    /// "YES": the column accepts NULL. This is what `required: false` produces.
    Yes,
    /// Any other `Null` value reported by introspection, kept verbatim.
    Other(String),
}

impl Nullability {
    /// Encode a model-level `required` flag.
    pub fn from_required(required: bool) -> Self {
        if required {
            Nullability::No
        } else {
            Nullability::Yes
        }
    }

    /// Read the `Null` column of an introspection row.
    ///
    /// "YES"/"NO" are recognized case-insensitively; anything else is kept
    /// as [`Nullability::Other`].
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("no") {
            Nullability::No
        } else if s.eq_ignore_ascii_case("yes") {
            Nullability::Yes
        } else {
            Nullability::Other(s.to_string())
        }
    }

    /// The encoded form, `"NO"`, `"YES"`, or the verbatim introspected value.
    pub fn as_str(&self) -> &str {
        match self {
            Nullability::No => "NO",
            Nullability::Yes => "YES",
            Nullability::Other(value) => value,
        }
    }

    /// Whether the column accepts NULL.
    pub fn is_nullable(&self) -> bool {
        matches!(self, Nullability::Yes)
    }

    /// Column constraint keyword for DDL. Only "YES" allows NULL.
    pub fn to_sql(&self) -> &'static str {
        if self.is_nullable() { "NULL" } else { "NOT NULL" }
    }
}

impl fmt::Display for Nullability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The attributes of a [`FieldDescription`] that take part in comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Type,
    Required,
    Default,
    /// Target table of a generated foreign key. Only the model side knows it.
    References,
}

impl Attribute {
    /// All attributes, in comparison order.
    pub const ALL: [Attribute; 4] = [
        Attribute::Type,
        Attribute::Required,
        Attribute::Default,
        Attribute::References,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Type => "type",
            Attribute::Required => "required",
            Attribute::Default => "default",
            Attribute::References => "references",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical description of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescription {
    /// Canonical SQL type, e.g. `varchar(25)`.
    pub type_name: String,
    /// Encoded nullability ("NO" for required columns).
    pub required: Nullability,
    /// Default value. `None` is an explicit null default.
    pub default: Option<String>,
    /// Table referenced by a generated foreign key column.
    pub references: Option<String>,
}

impl FieldDescription {
    /// A description with a null default.
    pub fn new(type_name: impl Into<String>, required: Nullability) -> Self {
        Self {
            type_name: type_name.into(),
            required,
            default: None,
            references: None,
        }
    }

    /// A foreign key column pointing at `table`.
    pub fn foreign_key(table: impl Into<String>, required: Nullability) -> Self {
        Self {
            references: Some(table.into()),
            ..Self::new(FK_TYPE, required)
        }
    }

    /// Set the default value.
    pub fn with_default(mut self, default: Option<String>) -> Self {
        self.default = default;
        self
    }

    /// Value of `attr` as a comparable string, or `None` when this
    /// description does not carry the attribute at all.
    ///
    /// A null default is carried, and compares as the empty string.
    pub fn attribute(&self, attr: Attribute) -> Option<&str> {
        match attr {
            Attribute::Type => Some(&self.type_name),
            Attribute::Required => Some(self.required.as_str()),
            Attribute::Default => Some(self.default.as_deref().unwrap_or("")),
            Attribute::References => self.references.as_deref(),
        }
    }

    /// Attributes whose values differ from `other`, compared case-insensitively.
    ///
    /// Attributes missing on either side are skipped rather than reported.
    pub fn differing_attributes<'a>(
        &'a self,
        other: &'a FieldDescription,
    ) -> impl Iterator<Item = Attribute> + 'a {
        Attribute::ALL.into_iter().filter(move |attr| {
            match (self.attribute(*attr), other.attribute(*attr)) {
                (Some(mine), Some(theirs)) => mine.to_lowercase() != theirs.to_lowercase(),
                _ => false,
            }
        })
    }

    /// Whether any shared attribute differs from `other`.
    pub fn differs_from(&self, other: &FieldDescription) -> bool {
        self.differing_attributes(other).next().is_some()
    }
}

impl fmt::Display for FieldDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.type_name, self.required.to_sql())?;
        if let Some(default) = &self.default {
            write!(f, " DEFAULT {}", default)?;
        }
        if let Some(table) = &self.references {
            write!(f, " -> {}", table)?;
        }
        Ok(())
    }
}

/// Columns of one table, keyed by column name.
pub type TableDescription = IndexMap<String, FieldDescription>;

/// Tables keyed by table name.
pub type NormalizedSchema = IndexMap<String, TableDescription>;

/// One row of `DESC <table>` as returned by the database.
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct ColumnRow {
    /// Column name.
    #[facet(rename = "Field")]
    pub field: String,
    /// Native column type, e.g. `varchar(25)`.
    #[facet(rename = "Type")]
    pub type_name: String,
    /// "YES" or "NO".
    #[facet(rename = "Null")]
    pub null: String,
    #[facet(rename = "Default", default)]
    pub default: Option<String>,
}

impl ColumnRow {
    pub fn new(
        field: impl Into<String>,
        type_name: impl Into<String>,
        null: impl Into<String>,
        default: Option<String>,
    ) -> Self {
        Self {
            field: field.into(),
            type_name: type_name.into(),
            null: null.into(),
            default,
        }
    }
}

/// Lookup failures against a normalized schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("unknown column: {table}.{column}")]
    UnknownColumn { table: String, column: String },
}
