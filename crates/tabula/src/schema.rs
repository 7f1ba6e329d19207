//! The two normalized schema variants and the view they share.
//!
//! [`DesiredSchema`] is built from the entity model, [`ActualSchema`] from
//! database introspection rows. Once built, both are immutable and read
//! through [`SchemaView`].

use tabula_schema::{FieldDescription, NormalizedSchema, SchemaError, TableDescription};

/// Read access to a normalized schema.
pub trait SchemaView {
    /// The underlying table map.
    fn schema(&self) -> &NormalizedSchema;

    /// Table names, in insertion order.
    fn tables(&self) -> impl Iterator<Item = &str> + '_ {
        self.schema().keys().map(String::as_str)
    }

    fn contains_table(&self, table: &str) -> bool {
        self.schema().contains_key(table)
    }

    /// Columns of `table`.
    fn describe(&self, table: &str) -> Result<&TableDescription, SchemaError> {
        self.schema()
            .get(table)
            .ok_or_else(|| SchemaError::UnknownTable(table.to_string()))
    }

    /// Description of a single column.
    fn column(&self, table: &str, column: &str) -> Result<&FieldDescription, SchemaError> {
        self.describe(table)?
            .get(column)
            .ok_or_else(|| SchemaError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            })
    }
}

impl<T: SchemaView + ?Sized> SchemaView for &T {
    fn schema(&self) -> &NormalizedSchema {
        (**self).schema()
    }
}

/// The schema the entity model asks for.
///
/// Built with [`DesiredSchema::from_model`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesiredSchema {
    pub(crate) schema: NormalizedSchema,
}

/// The schema the database currently has.
///
/// Built with [`ActualSchema::from_rows`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActualSchema {
    pub(crate) schema: NormalizedSchema,
}

impl DesiredSchema {
    /// Wrap an already-normalized schema.
    pub fn from_normalized(schema: NormalizedSchema) -> Self {
        Self { schema }
    }

    pub fn into_inner(self) -> NormalizedSchema {
        self.schema
    }
}

impl ActualSchema {
    /// Wrap an already-normalized schema.
    pub fn from_normalized(schema: NormalizedSchema) -> Self {
        Self { schema }
    }

    pub fn into_inner(self) -> NormalizedSchema {
        self.schema
    }
}

impl SchemaView for DesiredSchema {
    fn schema(&self) -> &NormalizedSchema {
        &self.schema
    }
}

impl SchemaView for ActualSchema {
    fn schema(&self) -> &NormalizedSchema {
        &self.schema
    }
}
