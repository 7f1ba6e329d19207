//! Driving a live database.
//!
//! tabula never opens connections itself. The caller supplies an
//! [`Introspector`] answering `SHOW TABLES` / `DESC <table>` and an
//! [`Executor`] that runs DDL, and [`Migrator`] sequences them.
//!
//! Statements are applied one by one with no transaction around them. A
//! failure stops the run; earlier statements stay applied.

use crate::diff::{ChangeSet, SchemaComparator};
use crate::schema::{ActualSchema, DesiredSchema};
use crate::{BoxError, Error, Model, Result};
use std::future::Future;
use tabula_schema::ColumnRow;
use tracing::{Instrument, debug, info};

/// Read access to the live schema.
pub trait Introspector: Send + Sync {
    /// Names of every table (`SHOW TABLES`).
    fn list_tables(&self) -> impl Future<Output = std::result::Result<Vec<String>, BoxError>> + Send;

    /// Column rows of one table (`DESC <table>`).
    fn describe_table(
        &self,
        table: &str,
    ) -> impl Future<Output = std::result::Result<Vec<ColumnRow>, BoxError>> + Send;
}

/// Runs DDL statements.
pub trait Executor: Send + Sync {
    fn execute(&self, sql: &str) -> impl Future<Output = std::result::Result<(), BoxError>> + Send;
}

/// Reconciles a database with an entity model.
///
/// # Example
///
/// ```ignore
/// let migrator = Migrator::new(&model)?;
/// let pending = migrator.plan(&db).await?;
/// println!("{}", pending.plan());
/// migrator.migrate(&db, &db).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Migrator {
    desired: DesiredSchema,
}

impl Migrator {
    /// Normalize `model` up front so configuration errors surface here.
    pub fn new(model: &Model) -> Result<Self> {
        Ok(Self {
            desired: DesiredSchema::from_model(model)?,
        })
    }

    pub fn from_desired(desired: DesiredSchema) -> Self {
        Self { desired }
    }

    pub fn desired(&self) -> &DesiredSchema {
        &self.desired
    }

    /// Read and normalize the live schema.
    pub async fn inspect<I: Introspector>(&self, introspector: &I) -> Result<ActualSchema> {
        let tables = introspector
            .list_tables()
            .await
            .map_err(Error::Introspection)?;

        let mut rows = Vec::with_capacity(tables.len());
        for table in tables {
            let columns = introspector
                .describe_table(&table)
                .await
                .map_err(Error::Introspection)?;
            debug!(table = %table, columns = columns.len(), "described table");
            rows.push((table, columns));
        }

        Ok(ActualSchema::from_rows(rows))
    }

    /// Changes needed to bring the live schema in line with the model.
    pub async fn plan<I: Introspector>(&self, introspector: &I) -> Result<ChangeSet> {
        let actual = self.inspect(introspector).await?;
        Ok(SchemaComparator::new(&self.desired, &actual).compare())
    }

    /// Compute and apply the pending changes, returning what was applied.
    pub async fn migrate<I, E>(&self, introspector: &I, executor: &E) -> Result<ChangeSet>
    where
        I: Introspector,
        E: Executor,
    {
        let changes = self.plan(introspector).await?;
        let plan = changes.plan();
        if plan.is_empty() {
            info!("schema is up to date");
            return Ok(changes);
        }

        for change in &plan {
            let sql = change.to_sql();
            let span = tracing::debug_span!("db.execute", sql = %sql);
            executor
                .execute(&sql)
                .instrument(span)
                .await
                .map_err(|source| Error::Execution {
                    sql: sql.clone(),
                    source,
                })?;
            info!("{}", change);
        }

        info!(changes = plan.change_count(), "migration applied");
        Ok(changes)
    }
}
