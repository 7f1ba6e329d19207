//! Schema diffing - compare the desired schema against the database schema.
//!
//! The desired schema is the baseline. The actual schema is the possibly
//! stale target that needs to catch up:
//!
//! - a table only in the desired schema is **added** with its full description
//! - a table only in the actual schema is **removed** (name only)
//! - a table in both is **updated** if its columns differ
//!
//! Column diffing follows the same rules one level down. A column whose
//! attributes differ is reported with its whole desired description, not
//! per attribute, since `MODIFY COLUMN` rewrites the whole column anyway.
//!
//! Empty categories are `None` rather than empty containers.

use crate::schema::{ActualSchema, DesiredSchema, SchemaView};
use crate::{Model, Result};
use indexmap::IndexMap;
use tabula_schema::{ColumnRow, PRIMARY_KEY, SchemaError, TableDescription};
use tracing::{debug, trace};

/// Table-level changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Tables to create, with every column they need.
    pub added: Option<IndexMap<String, TableDescription>>,
    /// Tables to drop.
    pub removed: Option<Vec<String>>,
    /// Tables whose columns need changes.
    pub updated: Option<IndexMap<String, ColumnChangeSet>>,
}

impl ChangeSet {
    /// Returns true if there are no differences.
    pub fn is_empty(&self) -> bool {
        self.added.is_none() && self.removed.is_none() && self.updated.is_none()
    }
}

/// Column-level changes for one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnChangeSet {
    /// Columns to add.
    pub added: Option<TableDescription>,
    /// Columns to drop.
    pub removed: Option<Vec<String>>,
    /// Columns to modify, with their full desired description.
    pub updated: Option<TableDescription>,
}

impl ColumnChangeSet {
    /// Returns true if there are no differences.
    pub fn is_empty(&self) -> bool {
        self.added.is_none() && self.removed.is_none() && self.updated.is_none()
    }
}

/// Compares a desired schema against an actual one.
///
/// Both schemas are fixed at construction; every call to [`compare`]
/// produces a fresh [`ChangeSet`].
///
/// [`compare`]: SchemaComparator::compare
#[derive(Debug, Clone)]
pub struct SchemaComparator<D = DesiredSchema, A = ActualSchema> {
    desired: D,
    actual: A,
}

impl SchemaComparator {
    /// Normalize both raw inputs and build a comparator over them.
    pub fn from_sources<I>(model: &Model, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Vec<ColumnRow>)>,
    {
        let desired = DesiredSchema::from_model(model)?;
        let actual = ActualSchema::from_rows(rows);
        Ok(Self::new(desired, actual))
    }
}

impl<D: SchemaView, A: SchemaView> SchemaComparator<D, A> {
    pub fn new(desired: D, actual: A) -> Self {
        Self { desired, actual }
    }

    pub fn desired(&self) -> &D {
        &self.desired
    }

    pub fn actual(&self) -> &A {
        &self.actual
    }

    /// Compute the changes needed to bring the actual schema in line with
    /// the desired one.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let comparator = SchemaComparator::from_sources(&model, rows)?;
    /// let changes = comparator.compare();
    /// if changes.is_empty() {
    ///     println!("Schemas match!");
    /// }
    /// ```
    pub fn compare(&self) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for (table, description) in self.desired.schema() {
            match self.actual.describe(table) {
                Ok(current) => {
                    let columns = diff_columns(description, current);
                    if !columns.is_empty() {
                        trace!(table = %table, "table updated");
                        changes
                            .updated
                            .get_or_insert_with(IndexMap::new)
                            .insert(table.clone(), columns);
                    }
                }
                Err(_) => {
                    trace!(table = %table, "table added");
                    changes
                        .added
                        .get_or_insert_with(IndexMap::new)
                        .insert(table.clone(), description.clone());
                }
            }
        }

        for table in self.actual.tables() {
            if !self.desired.contains_table(table) {
                trace!(table, "table removed");
                changes
                    .removed
                    .get_or_insert_with(Vec::new)
                    .push(table.to_string());
            }
        }

        debug!(
            added = changes.added.as_ref().map_or(0, |t| t.len()),
            removed = changes.removed.as_ref().map_or(0, |t| t.len()),
            updated = changes.updated.as_ref().map_or(0, |t| t.len()),
            "compared schemas"
        );
        changes
    }

    /// Column changes for a table present in both schemas.
    pub fn compare_columns(&self, table: &str) -> std::result::Result<ColumnChangeSet, SchemaError> {
        let desired = self.desired.describe(table)?;
        let current = self.actual.describe(table)?;
        Ok(diff_columns(desired, current))
    }
}

/// Diff columns between desired and current state.
fn diff_columns(desired: &TableDescription, current: &TableDescription) -> ColumnChangeSet {
    let mut changes = ColumnChangeSet::default();

    for (column, description) in desired {
        if column == PRIMARY_KEY {
            continue;
        }
        match current.get(column) {
            Some(existing) => {
                if description.differs_from(existing) {
                    changes
                        .updated
                        .get_or_insert_with(TableDescription::new)
                        .insert(column.clone(), description.clone());
                }
            }
            None => {
                changes
                    .added
                    .get_or_insert_with(TableDescription::new)
                    .insert(column.clone(), description.clone());
            }
        }
    }

    for column in current.keys() {
        if column != PRIMARY_KEY && !desired.contains_key(column) {
            changes
                .removed
                .get_or_insert_with(Vec::new)
                .push(column.clone());
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_schema::{FieldDescription, NormalizedSchema, Nullability};

    fn field(ty: &str, required: Nullability) -> FieldDescription {
        FieldDescription::new(ty, required)
    }

    fn table(columns: Vec<(&str, FieldDescription)>) -> TableDescription {
        columns
            .into_iter()
            .map(|(name, field)| (name.to_string(), field))
            .collect()
    }

    fn schema(tables: Vec<(&str, TableDescription)>) -> NormalizedSchema {
        tables
            .into_iter()
            .map(|(name, table)| (name.to_string(), table))
            .collect()
    }

    fn comparator(desired: NormalizedSchema, actual: NormalizedSchema) -> SchemaComparator {
        SchemaComparator::new(
            DesiredSchema::from_normalized(desired),
            ActualSchema::from_normalized(actual),
        )
    }

    fn users(name_type: &str) -> NormalizedSchema {
        schema(vec![(
            "users",
            table(vec![("name", field(name_type, Nullability::No))]),
        )])
    }

    #[test]
    fn test_diff_empty_schemas() {
        let diff = comparator(NormalizedSchema::new(), NormalizedSchema::new()).compare();
        assert!(diff.is_empty());
        assert_eq!(diff, ChangeSet::default());
    }

    #[test]
    fn test_diff_no_changes() {
        let diff = comparator(users("varchar(25)"), users("varchar(25)")).compare();
        assert!(diff.is_empty());
    }

    #[test]
    fn test_diff_ignores_case() {
        let diff = comparator(users("int(11)"), users("INT(11)")).compare();
        assert!(diff.is_empty());
    }

    #[test]
    fn test_diff_add_table() {
        let desired = schema(vec![
            ("users", table(vec![("name", field("varchar(25)", Nullability::No))])),
            ("posts", table(vec![("title", field("varchar(255)", Nullability::Yes))])),
        ]);
        let diff = comparator(desired.clone(), users("varchar(25)")).compare();

        let added = diff.added.unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added["posts"], desired["posts"]);
        assert!(diff.removed.is_none());
        assert!(diff.updated.is_none());
    }

    #[test]
    fn test_diff_drop_table() {
        let actual = schema(vec![
            ("users", table(vec![("name", field("varchar(25)", Nullability::No))])),
            ("legacy", table(vec![("data", field("text", Nullability::Yes))])),
        ]);
        let diff = comparator(users("varchar(25)"), actual).compare();

        assert_eq!(diff.removed, Some(vec!["legacy".to_string()]));
        assert!(diff.added.is_none());
        assert!(diff.updated.is_none());
    }

    #[test]
    fn test_diff_add_column() {
        let desired = schema(vec![(
            "users",
            table(vec![
                ("name", field("varchar(25)", Nullability::No)),
                ("email", field("varchar(255)", Nullability::No)),
            ]),
        )]);
        let diff = comparator(desired, users("varchar(25)")).compare();

        let updated = diff.updated.unwrap();
        let columns = &updated["users"];
        let added = columns.added.as_ref().unwrap();
        assert_eq!(added.keys().collect::<Vec<_>>(), vec!["email"]);
        assert!(columns.removed.is_none());
        assert!(columns.updated.is_none());
    }

    #[test]
    fn test_diff_drop_column() {
        let actual = schema(vec![(
            "users",
            table(vec![
                ("name", field("varchar(25)", Nullability::No)),
                ("email", field("varchar(255)", Nullability::No)),
            ]),
        )]);
        let diff = comparator(users("varchar(25)"), actual).compare();

        let updated = diff.updated.unwrap();
        let columns = &updated["users"];
        assert_eq!(columns.removed, Some(vec!["email".to_string()]));
        assert!(columns.added.is_none());
        assert!(columns.updated.is_none());
    }

    #[test]
    fn test_diff_alter_column_reports_whole_description() {
        let desired = schema(vec![(
            "users",
            table(vec![(
                "name",
                field("varchar(25)", Nullability::No).with_default(Some("anon".into())),
            )]),
        )]);
        let actual = schema(vec![(
            "users",
            table(vec![(
                "name",
                field("varchar(10)", Nullability::No).with_default(Some("anon".into())),
            )]),
        )]);
        let diff = comparator(desired.clone(), actual).compare();

        let updated = diff.updated.unwrap()["users"].updated.clone().unwrap();
        assert_eq!(updated["name"], desired["users"]["name"]);
    }

    #[test]
    fn test_diff_alter_column_nullable() {
        let desired = schema(vec![("users", table(vec![("bio", field("text", Nullability::Yes))]))]);
        let actual = schema(vec![("users", table(vec![("bio", field("text", Nullability::No))]))]);
        let diff = comparator(desired, actual).compare();

        let updated = diff.updated.unwrap();
        let columns = &updated["users"];
        assert!(columns.updated.as_ref().unwrap().contains_key("bio"));
    }

    #[test]
    fn test_diff_never_reports_primary_key() {
        let desired = schema(vec![(
            "users",
            table(vec![
                ("id", field("int(11)", Nullability::No)),
                ("name", field("varchar(25)", Nullability::No)),
            ]),
        )]);
        let actual = schema(vec![(
            "users",
            table(vec![
                ("id", field("bigint", Nullability::No)),
                ("name", field("varchar(25)", Nullability::No)),
            ]),
        )]);
        assert!(comparator(desired.clone(), actual).compare().is_empty());

        // Present on one side only.
        assert!(comparator(desired, users("varchar(25)")).compare().is_empty());
        let actual_with_id = schema(vec![(
            "users",
            table(vec![
                ("id", field("int(11)", Nullability::No)),
                ("name", field("varchar(25)", Nullability::No)),
            ]),
        )]);
        assert!(comparator(users("varchar(25)"), actual_with_id).compare().is_empty());
    }

    #[test]
    fn test_diff_foreign_key_metadata_is_skipped() {
        let desired = schema(vec![(
            "post",
            table(vec![("user_id", FieldDescription::foreign_key("user", Nullability::No))]),
        )]);
        let actual = schema(vec![("post", table(vec![("user_id", field("INT(11)", Nullability::No))]))]);
        assert!(comparator(desired, actual).compare().is_empty());
    }

    #[test]
    fn test_diff_categories_together() {
        let desired = schema(vec![
            ("a", table(vec![("x", field("text", Nullability::No))])),
            ("b", table(vec![("y", field("text", Nullability::No))])),
        ]);
        let actual = schema(vec![
            ("c", table(vec![])),
            ("b", table(vec![("y", field("text", Nullability::Yes))])),
            ("d", table(vec![])),
        ]);
        let diff = comparator(desired, actual).compare();

        assert_eq!(diff.added.unwrap().keys().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(diff.removed.unwrap(), vec!["c", "d"]);
        assert_eq!(diff.updated.unwrap().keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_compare_is_repeatable() {
        let c = comparator(users("varchar(25)"), users("varchar(10)"));
        assert_eq!(c.compare(), c.compare());
    }

    #[test]
    fn test_compare_columns_unknown_table() {
        let c = comparator(users("varchar(25)"), NormalizedSchema::new());
        assert_eq!(
            c.compare_columns("users").unwrap_err(),
            SchemaError::UnknownTable("users".to_string())
        );
        assert!(matches!(
            c.compare_columns("ghost"),
            Err(SchemaError::UnknownTable(t)) if t == "ghost"
        ));
    }

    #[test]
    fn test_compare_columns_direct() {
        let c = comparator(users("varchar(25)"), users("varchar(10)"));
        let columns = c.compare_columns("users").unwrap();
        assert!(columns.updated.unwrap().contains_key("name"));
    }
}
