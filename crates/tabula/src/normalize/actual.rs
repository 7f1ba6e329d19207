//! Introspection normalization.
//!
//! Rows come from `DESC <table>` and are taken verbatim: the database already
//! speaks the canonical dialect, so no type canonicalization happens here.
//! An unexpected `Null` value is kept as is and left to the comparator.

use crate::ActualSchema;
use tabula_schema::{
    ColumnRow, FieldDescription, NormalizedSchema, Nullability, PRIMARY_KEY, TableDescription,
};
use tracing::debug;

impl ActualSchema {
    /// Normalize `table -> DESC rows`, leaving out the `id` primary key.
    ///
    /// A table whose only column is `id` is kept with no columns.
    pub fn from_rows<I>(tables: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<ColumnRow>)>,
    {
        let mut schema = NormalizedSchema::new();

        for (table, rows) in tables {
            let mut description = TableDescription::with_capacity(rows.len());
            for row in rows {
                if row.field == PRIMARY_KEY {
                    continue;
                }
                let required = Nullability::parse(&row.null);
                description.insert(
                    row.field,
                    FieldDescription::new(row.type_name, required).with_default(row.default),
                );
            }
            schema.insert(table, description);
        }

        debug!(tables = schema.len(), "normalized actual schema");
        Self { schema }
    }
}
