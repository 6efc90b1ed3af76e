use quarry_error::DbError;

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("Missing table: {0}")]
    MissingTable(String),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Missing column '{column}' in table '{table}'")]
    MissingColumn { table: String, column: String },

    #[error("Expected {expected} columns for table '{table}', got {got}")]
    ColumnCountMismatch {
        table: String,
        expected: usize,
        got: usize,
    },

    #[error("Null value in non-nullable column '{column}' of table '{table}'")]
    NullInNonNullable { table: String, column: String },

    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    #[error(transparent)]
    Parse(#[from] sqlparser::parser::ParserError),
}

impl From<MemoryError> for DbError {
    fn from(err: MemoryError) -> Self {
        DbError::adapter("Memory adapter error", Box::new(err))
    }
}

pub type Result<T, E = MemoryError> = std::result::Result<T, E>;
