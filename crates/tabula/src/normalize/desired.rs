//! Entity model normalization.
//!
//! Turns a [`Model`] into a [`DesiredSchema`] in two passes:
//!
//! 1. Per-field normalization: canonical types, `required` encoded as
//!    [`Nullability`], null defaults, and the `timestamp` pseudo-field
//!    replaced by `created_at`/`updated_at`.
//! 2. Relation expansion into foreign key columns and junction tables.
//!    Generated columns are already canonical and skip the first pass.
//!
//! The relations block is consumed here; normalized schemas never carry it.

use crate::{ConfigSubject, DesiredSchema, Error, RelationKind, Result};
use tabula_config::{Entity, Model, Relations, Requirement};
use tabula_schema::{
    CREATED_AT, FieldDescription, NormalizedSchema, Nullability, PRIMARY_KEY, TIMESTAMP_FIELD,
    TIMESTAMP_TYPE, TableDescription, UPDATED_AT, canonical_type,
};
use tracing::{debug, trace, warn};

impl DesiredSchema {
    /// Normalize an entity model.
    ///
    /// Fails with [`Error::InvalidConfig`] on the first `required` flag that
    /// is not a boolean; no partial schema is returned.
    pub fn from_model(model: &Model) -> Result<Self> {
        let mut schema = NormalizedSchema::with_capacity(model.entities.len());

        for (entity, fields) in &model.entities {
            let table = normalize_entity(entity, fields)?;
            schema.insert(entity.clone(), table);
        }

        expand_relations(&mut schema, &model.relations)?;

        debug!(tables = schema.len(), "normalized desired schema");
        Ok(Self { schema })
    }
}

fn normalize_entity(entity: &str, fields: &Entity) -> Result<TableDescription> {
    let mut table = TableDescription::with_capacity(fields.len());
    let mut audit_columns = false;

    for (name, field) in fields {
        if name == TIMESTAMP_FIELD {
            audit_columns = true;
            continue;
        }
        if name == PRIMARY_KEY {
            warn!(entity, "ignoring explicit `id` field, the primary key is implicit");
            continue;
        }

        let required = nullability(field.requirement(), || ConfigSubject::Field {
            entity: entity.to_string(),
            field: name.clone(),
        })?;

        table.insert(
            name.clone(),
            FieldDescription::new(canonical_type(&field.type_name), required)
                .with_default(field.default_text()),
        );
    }

    if audit_columns {
        for column in [CREATED_AT, UPDATED_AT] {
            table.insert(
                column.to_string(),
                FieldDescription::new(TIMESTAMP_TYPE, Nullability::No),
            );
        }
    }

    Ok(table)
}

fn expand_relations(schema: &mut NormalizedSchema, relations: &Relations) -> Result<()> {
    for rel in &relations.one_to_one {
        let required = nullability(rel.requirement(), || ConfigSubject::Relation {
            kind: RelationKind::OneToOne,
            from: rel.entity_a.clone(),
            to: rel.entity_b.clone(),
        })?;
        add_foreign_key(schema, &rel.entity_a, &rel.entity_b, required.clone());
        add_foreign_key(schema, &rel.entity_b, &rel.entity_a, required);
    }

    for rel in &relations.one_to_many {
        let required = nullability(rel.requirement(), || ConfigSubject::Relation {
            kind: RelationKind::OneToMany,
            from: rel.one.clone(),
            to: rel.many.clone(),
        })?;
        add_foreign_key(schema, &rel.many, &rel.one, required);
    }

    // Junction columns are always nullable.
    for rel in &relations.many_to_many {
        let junction = format!("{}_{}", rel.entity_a, rel.entity_b);
        let table = [&rel.entity_a, &rel.entity_b]
            .into_iter()
            .map(|target| {
                (
                    foreign_key_column(target),
                    FieldDescription::foreign_key(target.as_str(), Nullability::Yes),
                )
            })
            .collect();
        trace!(table = %junction, "junction table");
        schema.insert(junction, table);
    }

    Ok(())
}

/// Add `{target}_id` to `table`, creating the table if the model never declared it.
fn add_foreign_key(
    schema: &mut NormalizedSchema,
    table: &str,
    target: &str,
    required: Nullability,
) {
    let column = foreign_key_column(target);
    trace!(table, column = %column, "foreign key column");
    schema
        .entry(table.to_string())
        .or_default()
        .insert(column, FieldDescription::foreign_key(target, required));
}

fn foreign_key_column(target: &str) -> String {
    format!("{}_id", target)
}

/// Encode a `required` flag, failing on anything but omitted/true/false.
fn nullability(
    requirement: Requirement,
    subject: impl FnOnce() -> ConfigSubject,
) -> Result<Nullability> {
    requirement
        .is_required()
        .map(Nullability::from_required)
        .map_err(|value| Error::InvalidConfig {
            subject: subject(),
            value: value.to_string(),
        })
}
