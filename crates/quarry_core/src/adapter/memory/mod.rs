//! In-memory adapter suitable for testing.
pub mod errors;
pub mod raw_query;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use quarry_error::Result;
use tracing::{debug, trace};

use self::errors::MemoryError;
use self::raw_query::RawQuery;
use super::{AdapterCapabilities, CreateTableOptions, ExecutionAdapter, OnConflict};
use crate::arrays::batch::{Array, Batch};
use crate::arrays::datatype::DataType;
use crate::arrays::field::Schema;
use crate::arrays::scalar::ScalarValue;
use crate::engine::compile::CompiledQuery;
use crate::execution::{DataSource, execute_plan};

#[derive(Debug, Clone)]
struct MemoryTable {
    schema: Schema,
    data: Batch,
}

/// Adapter holding tables in memory and executing physical plans directly.
///
/// Raw query text is limited to the subset accepted by [`RawQuery`].
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    capabilities: AdapterCapabilities,
    tables: RwLock<IndexMap<String, MemoryTable>>,
    /// SQL of every compiled query executed.
    executed: Mutex<Vec<String>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: AdapterCapabilities) -> Self {
        MemoryAdapter {
            capabilities,
            ..Default::default()
        }
    }

    /// SQL text of all queries executed so far, oldest first.
    pub fn executed_queries(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    fn table(&self, table_name: &str) -> Result<MemoryTable, MemoryError> {
        self.tables
            .read()
            .get(table_name)
            .cloned()
            .ok_or_else(|| MemoryError::MissingTable(table_name.to_string()))
    }

    /// Resolve a raw query against the catalog, returning the source table
    /// and the selected column indices with their output names.
    fn resolve(&self, raw: &RawQuery) -> Result<(MemoryTable, Vec<(usize, String)>), MemoryError> {
        let table = self.table(&raw.table_name)?;
        let columns = match &raw.projections {
            None => table
                .schema
                .names()
                .enumerate()
                .map(|(idx, name)| (idx, name.to_string()))
                .collect(),
            Some(projections) => projections
                .iter()
                .map(|proj| {
                    let idx = table.schema.index_of(&proj.column).ok_or_else(|| {
                        MemoryError::MissingColumn {
                            table: raw.table_name.clone(),
                            column: proj.column.clone(),
                        }
                    })?;
                    Ok((idx, proj.output_name().to_string()))
                })
                .collect::<Result<Vec<_>, MemoryError>>()?,
        };
        Ok((table, columns))
    }
}

/// Check `data` against a table's schema, tagging arrays with the schema's
/// types.
fn conform(table_name: &str, schema: &Schema, data: Batch) -> Result<Batch, MemoryError> {
    if data.num_columns() != schema.len() {
        return Err(MemoryError::ColumnCountMismatch {
            table: table_name.to_string(),
            expected: schema.len(),
            got: data.num_columns(),
        });
    }

    let arrays = schema
        .iter()
        .zip(data.into_arrays())
        .map(|((name, datatype), array)| {
            if !datatype.nullable && array.iter().any(ScalarValue::is_null) {
                return Err(MemoryError::NullInNonNullable {
                    table: table_name.to_string(),
                    column: name.to_string(),
                });
            }
            Ok(Array::new(datatype.clone(), array.values))
        })
        .collect::<Result<Vec<_>, MemoryError>>()?;

    let num_rows = arrays.first().map(Array::len).unwrap_or(0);
    Batch::try_new(arrays).map_err(|_| MemoryError::ColumnCountMismatch {
        table: table_name.to_string(),
        expected: schema.len(),
        got: num_rows,
    })
}

fn empty_data(schema: &Schema) -> Batch {
    Batch::try_new(schema.types().map(|typ| Array::new(typ.clone(), Vec::new())))
        .unwrap_or_default()
}

impl DataSource for MemoryAdapter {
    fn scan(&self, table_name: &str) -> Result<Batch> {
        Ok(self.table(table_name)?.data)
    }

    fn query(&self, query: &str) -> Result<Batch> {
        let raw = RawQuery::parse(query)?;
        let (table, columns) = self.resolve(&raw)?;

        let indices: Vec<_> = columns.iter().map(|(idx, _)| *idx).collect();
        let arrays = table.data.into_arrays();
        let projected = Batch::try_new(indices.iter().map(|&idx| arrays[idx].clone()))?;

        projected.slice(raw.offset, raw.limit)
    }
}

impl ExecutionAdapter for MemoryAdapter {
    fn name(&self) -> &str {
        "memory"
    }

    fn capabilities(&self) -> &AdapterCapabilities {
        &self.capabilities
    }

    fn get_schema(&self, table_name: &str) -> Result<Schema> {
        Ok(self.table(table_name)?.schema)
    }

    fn get_schema_using_query(&self, query: &str) -> Result<Schema> {
        let raw = RawQuery::parse(query)?;
        let (table, columns) = self.resolve(&raw)?;

        Schema::try_new(columns.into_iter().map(|(idx, name)| {
            let datatype = table
                .schema
                .types()
                .nth(idx)
                .cloned()
                .unwrap_or_else(DataType::unknown);
            (name, datatype)
        }))
    }

    fn execute(&self, query: &CompiledQuery) -> Result<Batch> {
        debug!(query_id = %query.query_id, sql = %query.sql, "executing query");
        self.executed.lock().push(query.sql.clone());

        let output = execute_plan(&query.plan, self)?;
        trace!(query_id = %query.query_id, rows = output.num_rows(), "query complete");

        Ok(output)
    }

    fn create_table(
        &self,
        table_name: &str,
        schema: &Schema,
        data: Option<Batch>,
        options: CreateTableOptions,
    ) -> Result<()> {
        let data = match data {
            Some(data) => conform(table_name, schema, data)?,
            None => empty_data(schema),
        };

        let mut tables = self.tables.write();
        if tables.contains_key(table_name) {
            match options.on_conflict {
                OnConflict::Error => {
                    return Err(MemoryError::TableExists(table_name.to_string()).into());
                }
                OnConflict::Ignore => {
                    debug!(%table_name, "table exists, ignoring create");
                    return Ok(());
                }
                OnConflict::Replace => debug!(%table_name, "replacing table"),
            }
        }

        debug!(%table_name, rows = data.num_rows(), "created table");
        tables.insert(
            table_name.to_string(),
            MemoryTable {
                schema: schema.clone(),
                data,
            },
        );

        Ok(())
    }

    fn insert(&self, table_name: &str, data: Batch) -> Result<()> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(table_name)
            .ok_or_else(|| MemoryError::MissingTable(table_name.to_string()))?;

        let data = conform(table_name, &table.schema, data)?;
        trace!(%table_name, rows = data.num_rows(), "inserting rows");
        table.data.append(data)
    }

    fn truncate_table(&self, table_name: &str) -> Result<()> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(table_name)
            .ok_or_else(|| MemoryError::MissingTable(table_name.to_string()))?;
        table.data = empty_data(&table.schema);
        Ok(())
    }

    fn drop_table(&self, table_name: &str, force: bool) -> Result<()> {
        let removed = self.tables.write().shift_remove(table_name);
        if removed.is_none() && !force {
            return Err(MemoryError::MissingTable(table_name.to_string()).into());
        }
        Ok(())
    }

    fn list_tables(&self) -> Result<Vec<String>> {
        let mut names: Vec<_> = self.tables.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
