use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use quarry_error::{DbError, Result};
use tracing::{debug, info};

use super::compile::{CompiledQuery, LimitArg, QueryCompiler};
use super::query::Query;
use super::query_result::QueryResult;
use crate::adapter::{CreateTableOptions, ExecutionAdapter};
use crate::arrays::batch::Batch;
use crate::arrays::field::Schema;
use crate::arrays::native::ColumnarSource;
use crate::arrays::scalar::ScalarValue;
use crate::config::session::SessionConfig;
use crate::infer::infer_schema;
use crate::logical::planner::plan_join::JoinSuffixes;
use crate::logical::table::{Table, TableOptions};

/// Receives the text of every query the session sends to its adapter while
/// verbose.
pub type VerboseLog = Arc<dyn Fn(&str) + Send + Sync>;

/// Entry point for building and running table expressions against an
/// adapter.
///
/// The session owns its config. Scoped overrides are made with
/// `with_setting`, which returns a modified clone sharing the same adapter,
/// leaving this session untouched.
pub struct Session<A: ExecutionAdapter> {
    adapter: Arc<A>,
    config: SessionConfig,
    /// Where verbose output goes. Defaults to `tracing::info!`.
    verbose_log: Option<VerboseLog>,
}

impl<A: ExecutionAdapter> Clone for Session<A> {
    fn clone(&self) -> Self {
        Session {
            adapter: self.adapter.clone(),
            config: self.config.clone(),
            verbose_log: self.verbose_log.clone(),
        }
    }
}

impl<A: ExecutionAdapter> fmt::Debug for Session<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("adapter", &self.adapter)
            .field("config", &self.config)
            .field("verbose_log", &self.verbose_log.is_some())
            .finish()
    }
}

impl<A: ExecutionAdapter> Session<A> {
    pub fn new(adapter: A) -> Self {
        Self::with_shared_adapter(Arc::new(adapter))
    }

    pub fn with_shared_adapter(adapter: Arc<A>) -> Self {
        Session {
            adapter,
            config: SessionConfig::default(),
            verbose_log: None,
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn set_setting(&mut self, name: &str, value: impl Into<ScalarValue>) -> Result<()> {
        self.config.set_from_scalar(name, value.into())
    }

    pub fn get_setting(&self, name: &str) -> Result<ScalarValue> {
        self.config.get_as_scalar(name)
    }

    pub fn reset_setting(&mut self, name: &str) -> Result<()> {
        self.config.reset(name)
    }

    /// A clone of this session with one setting changed.
    pub fn with_setting(&self, name: &str, value: impl Into<ScalarValue>) -> Result<Self> {
        let mut session = self.clone();
        session.set_setting(name, value)?;
        Ok(session)
    }

    /// Route verbose output to `log` instead of the tracing subscriber.
    pub fn set_verbose_log(&mut self, log: impl Fn(&str) + Send + Sync + 'static) {
        self.verbose_log = Some(Arc::new(log));
    }

    fn report(&self, query: &str) {
        if !self.config.verbose {
            return;
        }
        match &self.verbose_log {
            Some(log) => log(query),
            None => info!(adapter = self.adapter.name(), %query, "query"),
        }
    }

    fn table_options(&self) -> TableOptions {
        TableOptions {
            join_suffixes: JoinSuffixes::right(self.config.join_suffix.clone()),
        }
    }

    /// Reference an existing table on the adapter.
    pub fn table(&self, table_name: &str) -> Result<Table> {
        let dialect = &self.adapter.capabilities().dialect;
        self.report(&format!("DESCRIBE {}", dialect.quote_identifier(table_name)));

        let schema = self.adapter.get_schema(table_name)?;
        Ok(Table::scan(table_name, schema).with_options(self.table_options()))
    }

    /// A table defined by raw query text. The text is embedded as a subquery
    /// when compiled.
    pub fn sql(&self, query: &str) -> Result<Table> {
        self.report(query);
        let schema = self.adapter.get_schema_using_query(query)?;
        Ok(Table::sql_query(query, schema).with_options(self.table_options()))
    }

    /// Compile a query for this session's adapter without executing it.
    pub fn compile(
        &self,
        query: impl Into<Query>,
        limit: impl Into<LimitArg>,
    ) -> Result<CompiledQuery> {
        QueryCompiler {
            capabilities: self.adapter.capabilities(),
            config: &self.config,
        }
        .compile(&query.into(), limit.into())
    }

    /// Compile and execute a query.
    ///
    /// Table and column results are capped by `limit`, falling back to
    /// `sql.default_limit`. Scalar results ignore limits.
    pub fn execute(
        &self,
        query: impl Into<Query>,
        limit: impl Into<LimitArg>,
    ) -> Result<QueryResult> {
        let compiled = self.compile(query, limit)?;
        self.report(&compiled.sql);

        let batch = self.adapter.execute(&compiled)?;
        if batch.num_columns() != compiled.output_schema.len() {
            return Err(DbError::new("Adapter returned an unexpected number of columns")
                .with_field("expected", compiled.output_schema.len())
                .with_field("got", batch.num_columns()));
        }

        debug!(query_id = %compiled.query_id, rows = batch.num_rows(), "query executed");
        QueryResult::from_batch(compiled.query_id, compiled.output_schema, compiled.shape, batch)
    }

    /// Create an empty table.
    pub fn create_table(
        &self,
        table_name: &str,
        schema: &Schema,
        options: CreateTableOptions,
    ) -> Result<Table> {
        self.create_table_inner(table_name, schema, None, options)
    }

    /// Create a table holding `data`. Without a schema, one is inferred from
    /// the data.
    pub fn create_table_from(
        &self,
        table_name: &str,
        data: &ColumnarSource,
        schema: Option<&Schema>,
        options: CreateTableOptions,
    ) -> Result<Table> {
        let inferred;
        let schema = match schema {
            Some(schema) => schema,
            None => {
                inferred = infer_schema(data)?;
                &inferred
            }
        };
        check_column_set(table_name, schema, data)?;
        let batch = data.to_batch(schema)?;
        self.create_table_inner(table_name, schema, Some(batch), options)
    }

    fn create_table_inner(
        &self,
        table_name: &str,
        schema: &Schema,
        data: Option<Batch>,
        options: CreateTableOptions,
    ) -> Result<Table> {
        if self.config.verbose {
            let sql = self
                .adapter
                .capabilities()
                .dialect
                .create_table(table_name, schema)?;
            self.report(&sql);
        }

        self.adapter
            .create_table(table_name, schema, data, options)?;
        self.table(table_name)
    }

    /// Append rows to a table.
    ///
    /// The data must have exactly the table's columns, in any order.
    pub fn insert(&self, table_name: &str, data: &ColumnarSource) -> Result<()> {
        let schema = self.adapter.get_schema(table_name)?;
        check_column_set(table_name, &schema, data)?;

        let batch = data.to_batch(&schema)?;
        debug!(%table_name, rows = batch.num_rows(), "inserting rows");
        self.adapter.insert(table_name, batch)
    }

    pub fn truncate_table(&self, table_name: &str) -> Result<()> {
        self.adapter.truncate_table(table_name)
    }

    pub fn drop_table(&self, table_name: &str, force: bool) -> Result<()> {
        self.adapter.drop_table(table_name, force)
    }

    pub fn list_tables(&self) -> Result<Vec<String>> {
        self.adapter.list_tables()
    }
}

/// Check that `data` has exactly the columns of `schema`.
fn check_column_set(table_name: &str, schema: &Schema, data: &ColumnarSource) -> Result<()> {
    let expected: BTreeSet<&str> = schema.names().collect();
    let got: BTreeSet<&str> = data.names().collect();
    if expected == got && got.len() == data.columns.len() {
        return Ok(());
    }

    let missing: Vec<_> = expected.difference(&got).copied().collect();
    let extra: Vec<_> = got.difference(&expected).copied().collect();
    Err(
        DbError::schema(format!("Columns of data do not match table '{table_name}'"))
            .with_field("missing", missing.join(", "))
            .with_field("extra", extra.join(", ")),
    )
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use quarry_error::ErrorKind;

    use super::*;
    use crate::adapter::memory::MemoryAdapter;
    use crate::arrays::native::NativeColumn;
    use crate::engine::query_result::Output;

    fn source() -> ColumnarSource {
        ColumnarSource::new(vec![
            NativeColumn::from_values("a", vec![1i64, 2, 3]),
            NativeColumn::from_options("b", vec![Some("x"), None, Some("z")]),
        ])
        .unwrap()
    }

    fn session() -> Session<MemoryAdapter> {
        let session = Session::new(MemoryAdapter::new());
        session
            .create_table_from("t", &source(), None, CreateTableOptions::default())
            .unwrap();
        session
    }

    #[test]
    fn create_infers_schema() {
        let session = session();
        let t = session.table("t").unwrap();
        assert_eq!(&Schema::parse([("a", "!int64"), ("b", "string")]).unwrap(), t.schema());
    }

    #[test]
    fn insert_reorders_columns() {
        let session = session();
        let reordered = ColumnarSource::new(vec![
            NativeColumn::from_options("b", vec![Some("w")]),
            NativeColumn::from_values("a", vec![4i64]),
        ])
        .unwrap();
        session.insert("t", &reordered).unwrap();

        let t = session.table("t").unwrap();
        let count = session.execute(t.count().unwrap(), LimitArg::Default).unwrap();
        assert_eq!(Output::Scalar(ScalarValue::Int64(4)), count.output);
    }

    #[test]
    fn insert_column_mismatch() {
        let session = session();
        let fewer = ColumnarSource::new(vec![NativeColumn::from_values("a", vec![4i64])]).unwrap();
        let err = session.insert("t", &fewer).unwrap_err();
        assert_eq!(ErrorKind::Schema, err.kind());

        let extra = ColumnarSource::new(vec![
            NativeColumn::from_values("a", vec![4i64]),
            NativeColumn::from_options("b", vec![Some("w")]),
            NativeColumn::from_values("c", vec![true]),
        ])
        .unwrap();
        let err = session.insert("t", &extra).unwrap_err();
        assert_eq!(ErrorKind::Schema, err.kind());
    }

    #[test]
    fn verbose_reports_queries() {
        let mut session = session();
        let logged = Arc::new(Mutex::new(Vec::new()));
        let sink = logged.clone();
        session.set_verbose_log(move |q| sink.lock().push(q.to_string()));
        session.set_setting("verbose", true).unwrap();

        let t = session.table("t").unwrap();
        session.execute(&t, LimitArg::Default).unwrap();

        let logged = logged.lock();
        assert_eq!("DESCRIBE t", logged[0]);
        assert!(logged[1].starts_with("SELECT"), "{}", logged[1]);
    }

    #[test]
    fn not_verbose_by_default() {
        let mut session = session();
        let logged = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = logged.clone();
        session.set_verbose_log(move |q| sink.lock().push(q.to_string()));

        session.table("t").unwrap();
        assert!(logged.lock().is_empty());
    }

    #[test]
    fn scoped_setting_leaves_session_untouched() {
        let session = session();
        let scoped = session.with_setting("sql.default_limit", 2i64).unwrap();
        assert_eq!(Some(2), scoped.config().default_limit);
        assert_eq!(None, session.config().default_limit);

        let t = scoped.table("t").unwrap();
        assert_eq!(2, scoped.execute(&t, LimitArg::Default).unwrap().num_rows());
        assert_eq!(3, session.execute(&t, LimitArg::Default).unwrap().num_rows());
    }

    #[test]
    fn join_suffix_setting_applies_to_tables() {
        let mut session = session();
        session.set_setting("join_suffix", "_y").unwrap();
        let left = session.table("t").unwrap();
        let right = session.table("t").unwrap();
        let joined = left.inner_join(&right, "a").unwrap();
        assert!(joined.schema().contains("b_y"));
    }

    #[test]
    fn missing_table() {
        let session = session();
        let err = session.table("nope").unwrap_err();
        assert_eq!(ErrorKind::Adapter, err.kind());
    }
}
