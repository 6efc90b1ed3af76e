pub mod memory;

use std::fmt::Debug;

use quarry_error::Result;

use crate::arrays::batch::Batch;
use crate::arrays::field::Schema;
use crate::engine::compile::CompiledQuery;
use crate::sql::dialect::SqlDialect;

/// What the backend behind an adapter can do. Consulted while compiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterCapabilities {
    /// If FULL OUTER joins can be executed. Compiling one against an adapter
    /// without support fails instead of degrading to another join kind.
    pub supports_full_outer_join: bool,
    /// Identifier quoting and literal rules for generated SQL.
    pub dialect: SqlDialect,
}

impl Default for AdapterCapabilities {
    fn default() -> Self {
        AdapterCapabilities {
            supports_full_outer_join: true,
            dialect: SqlDialect::default(),
        }
    }
}

/// What to do when creating a table that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnConflict {
    #[default]
    Error,
    Ignore,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CreateTableOptions {
    pub on_conflict: OnConflict,
}

/// Backend that runs compiled queries and manages tables.
///
/// Errors reported by the backend are wrapped with `DbError::adapter`,
/// keeping the original cause as the error source.
pub trait ExecutionAdapter: Debug + Send + Sync {
    /// Name of the backend, used in logs.
    fn name(&self) -> &str;

    fn capabilities(&self) -> &AdapterCapabilities;

    /// Schema of an existing table.
    fn get_schema(&self, table_name: &str) -> Result<Schema>;

    /// Schema of the result of running raw query text, without producing
    /// the rows.
    fn get_schema_using_query(&self, query: &str) -> Result<Schema>;

    /// Run a compiled query. Any limit was already applied during
    /// compilation.
    fn execute(&self, query: &CompiledQuery) -> Result<Batch>;

    /// Create a table from a schema, optionally with initial data.
    fn create_table(
        &self,
        table_name: &str,
        schema: &Schema,
        data: Option<Batch>,
        options: CreateTableOptions,
    ) -> Result<()>;

    /// Append rows to a table. `data` columns are in the table's column
    /// order.
    fn insert(&self, table_name: &str, data: Batch) -> Result<()>;

    /// Remove all rows from a table, keeping its schema.
    fn truncate_table(&self, table_name: &str) -> Result<()>;

    /// Drop a table. With `force`, a missing table is not an error.
    fn drop_table(&self, table_name: &str, force: bool) -> Result<()>;

    /// Names of all tables, sorted.
    fn list_tables(&self) -> Result<Vec<String>>;
}
