//! Error type shared across all quarry crates.
use std::error::Error;
use std::fmt;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

/// Category of an error.
///
/// Callers match on this to decide how to react (e.g. pick a different join
/// strategy on `Unsupported`), the message is for humans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Irreconcilable column types during schema inference, or data that
    /// doesn't match a table's schema.
    Schema,
    /// Malformed expression tree: unknown column reference, type-incompatible
    /// operation.
    Expression,
    /// Invalid join predicate or unresolvable output name collision.
    Join,
    /// The adapter lacks a capability required by the query.
    Unsupported,
    /// Failure reported by an execution adapter, passed through as the
    /// source.
    Adapter,
    /// Invalid configuration setting or value.
    Config,
    /// Everything else. Usually a bug.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema => write!(f, "Schema error"),
            Self::Expression => write!(f, "Expression error"),
            Self::Join => write!(f, "Join error"),
            Self::Unsupported => write!(f, "Unsupported operation"),
            Self::Adapter => write!(f, "Adapter error"),
            Self::Config => write!(f, "Config error"),
            Self::Internal => write!(f, "Internal error"),
        }
    }
}

#[derive(Debug)]
pub struct DbError {
    inner: Box<DbErrorInner>,
}

#[derive(Debug)]
struct DbErrorInner {
    kind: ErrorKind,
    msg: String,
    source: Option<Box<dyn Error + Send + Sync>>,
    fields: Vec<(String, String)>,
}

impl DbError {
    /// Create a new internal error.
    pub fn new(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Internal, msg)
    }

    pub fn with_kind(kind: ErrorKind, msg: impl Into<String>) -> Self {
        DbError {
            inner: Box::new(DbErrorInner {
                kind,
                msg: msg.into(),
                source: None,
                fields: Vec::new(),
            }),
        }
    }

    pub fn with_source(msg: impl Into<String>, source: Box<dyn Error + Send + Sync>) -> Self {
        let mut err = Self::new(msg);
        err.inner.source = Some(source);
        err
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Schema, msg)
    }

    pub fn expression(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Expression, msg)
    }

    pub fn join(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Join, msg)
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Unsupported, msg)
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Config, msg)
    }

    /// Wrap an error reported by an execution adapter.
    ///
    /// The source is kept as-is and reachable through `Error::source`.
    pub fn adapter(msg: impl Into<String>, source: Box<dyn Error + Send + Sync>) -> Self {
        let mut err = Self::with_kind(ErrorKind::Adapter, msg);
        err.inner.source = Some(source);
        err
    }

    /// Attach an additional key/value pair to the error for context.
    pub fn with_field(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.inner.fields.push((key.into(), value.to_string()));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }

    pub fn get_msg(&self) -> &str {
        &self.inner.msg
    }

    pub fn get_fields(&self) -> &[(String, String)] {
        &self.inner.fields
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.inner.kind == kind
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.inner.kind, self.inner.msg)?;

        for (key, val) in &self.inner.fields {
            write!(f, "\n  {key}: {val}")?;
        }

        if let Some(source) = &self.inner.source {
            write!(f, "\nError source: {source}")?;
        }

        Ok(())
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<fmt::Error> for DbError {
    fn from(value: fmt::Error) -> Self {
        DbError::with_source("Format error", Box::new(value))
    }
}

/// Helper for converting foreign errors into a `DbError` with a message.
pub trait ResultExt<T, E> {
    fn context(self, msg: &'static str) -> Result<T>;
    fn context_fn<F, S>(self, f: F) -> Result<T>
    where
        F: Fn() -> S,
        S: Into<String>;
}

impl<T, E: Error + Send + Sync + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn context(self, msg: &'static str) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(DbError::with_source(msg, Box::new(e))),
        }
    }

    fn context_fn<F, S>(self, f: F) -> Result<T>
    where
        F: Fn() -> S,
        S: Into<String>,
    {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(DbError::with_source(f(), Box::new(e))),
        }
    }
}

pub trait OptionExt<T> {
    /// Return an error if the option is None.
    fn required(self, msg: &'static str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, msg: &'static str) -> Result<T> {
        match self {
            Some(v) => Ok(v),
            None => Err(DbError::new(format!("Missing required value: {msg}"))),
        }
    }
}

/// Return early with an "unsupported" error.
#[macro_export]
macro_rules! not_implemented {
    ($($arg:tt)*) => {
        return Err($crate::DbError::unsupported(format!(
            "Not yet implemented: {}",
            format!($($arg)*)
        )))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_fields() {
        let err = DbError::join("Duplicate output column")
            .with_field("column", "a_right")
            .with_field("suffix", "_right");

        let s = err.to_string();
        assert!(s.starts_with("Join error: Duplicate output column"));
        assert!(s.contains("column: a_right"));
        assert_eq!(ErrorKind::Join, err.kind());
    }

    #[test]
    fn adapter_error_keeps_source() {
        let io = std::io::Error::other("connection reset");
        let err = DbError::adapter("query failed", Box::new(io));

        assert_eq!(ErrorKind::Adapter, err.kind());
        let source = err.source().expect("source to be set");
        assert_eq!("connection reset", source.to_string());
    }

    #[test]
    fn option_required() {
        let v: Option<u8> = None;
        let err = v.required("limit").unwrap_err();
        assert!(err.get_msg().contains("limit"));
    }

    fn unimplemented_thing() -> Result<()> {
        not_implemented!("window frame {}", "ROWS");
    }

    #[test]
    fn not_implemented_is_unsupported() {
        let err = unimplemented_thing().unwrap_err();
        assert_eq!(ErrorKind::Unsupported, err.kind());
    }
}
