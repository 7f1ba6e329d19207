use std::fmt;
use tabula_schema::SchemaError;
use thiserror::Error;

/// Error type used by the external collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    /// A `required` flag that is not a boolean. Normalization stops here.
    #[error("invalid `required` value {value} for {subject}: expected a boolean")]
    InvalidConfig { subject: ConfigSubject, value: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("introspection failed: {0}")]
    Introspection(#[source] BoxError),

    #[error("failed to execute `{sql}`: {source}")]
    Execution {
        sql: String,
        #[source]
        source: BoxError,
    },
}

/// The model element an [`Error::InvalidConfig`] points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSubject {
    Field {
        entity: String,
        field: String,
    },
    Relation {
        kind: RelationKind,
        from: String,
        to: String,
    },
}

impl fmt::Display for ConfigSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSubject::Field { entity, field } => write!(f, "field {}.{}", entity, field),
            ConfigSubject::Relation { kind, from, to } => {
                write!(f, "{} relation {} -> {}", kind, from, to)
            }
        }
    }
}

/// Kinds of relation declared in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl RelationKind {
    /// Key of the relation list in the model file.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::OneToOne => "oneToOne",
            RelationKind::OneToMany => "oneToMany",
            RelationKind::ManyToMany => "manyToMany",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
