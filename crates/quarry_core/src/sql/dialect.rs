use std::fmt::Write as _;
use std::sync::LazyLock;

use quarry_error::{DbError, Result};
use regex::Regex;
use sqlparser::ast::{Ident, Value};
use sqlparser::keywords::{
    ALL_KEYWORDS,
    ALL_KEYWORDS_INDEX,
    RESERVED_FOR_COLUMN_ALIAS,
    RESERVED_FOR_TABLE_ALIAS,
};

use crate::arrays::datatype::{DataType, DataTypeKind, IntervalUnit};
use crate::arrays::field::Schema;
use crate::arrays::scalar::ScalarValue;

static SAFE_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierQuote {
    /// ANSI style `"name"`.
    #[default]
    DoubleQuote,
    /// MySQL style `` `name` ``.
    Backtick,
}

impl IdentifierQuote {
    pub const fn char(&self) -> char {
        match self {
            Self::DoubleQuote => '"',
            Self::Backtick => '`',
        }
    }
}

/// Rules for writing identifiers, literals and type names for a backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SqlDialect {
    pub quote: IdentifierQuote,
    /// Quote every identifier, not only the ones that need it.
    pub always_quote: bool,
}

impl SqlDialect {
    /// If an identifier can be written without quotes.
    pub fn is_safe_identifier(name: &str) -> bool {
        SAFE_IDENT.is_match(name) && !Self::is_reserved(name)
    }

    /// If a word is reserved in column or table position.
    pub fn is_reserved(word: &str) -> bool {
        let upper = word.to_ascii_uppercase();
        match ALL_KEYWORDS.binary_search(&upper.as_str()) {
            Ok(idx) => {
                let keyword = ALL_KEYWORDS_INDEX[idx];
                RESERVED_FOR_COLUMN_ALIAS.contains(&keyword)
                    || RESERVED_FOR_TABLE_ALIAS.contains(&keyword)
            }
            Err(_) => false,
        }
    }

    /// Write an identifier, quoting it if it contains characters outside the
    /// safe set or collides with a reserved word. Embedded quote characters
    /// are doubled.
    pub fn quote_identifier(&self, name: &str) -> String {
        if !self.always_quote && Self::is_safe_identifier(name) {
            return name.to_string();
        }
        Ident::with_quote(self.quote.char(), name).to_string()
    }

    pub fn literal(&self, value: &ScalarValue) -> Result<String> {
        Ok(match value {
            ScalarValue::Null => "NULL".to_string(),
            ScalarValue::Boolean(true) => "TRUE".to_string(),
            ScalarValue::Boolean(false) => "FALSE".to_string(),
            ScalarValue::Int8(_)
            | ScalarValue::Int16(_)
            | ScalarValue::Int32(_)
            | ScalarValue::Int64(_)
            | ScalarValue::UInt8(_)
            | ScalarValue::UInt16(_)
            | ScalarValue::UInt32(_)
            | ScalarValue::UInt64(_)
            | ScalarValue::Decimal(_) => value.to_string(),
            ScalarValue::Float16(_) | ScalarValue::Float32(_) | ScalarValue::Float64(_) => {
                let v = value.try_as_f64()?;
                if v.is_nan() {
                    "CAST('NaN' AS DOUBLE)".to_string()
                } else if v.is_infinite() {
                    let sign = if v > 0.0 { "" } else { "-" };
                    format!("CAST('{sign}Infinity' AS DOUBLE)")
                } else {
                    format!("{v:?}")
                }
            }
            ScalarValue::Utf8(s) => Value::SingleQuotedString(s.clone()).to_string(),
            ScalarValue::Binary(bytes) => {
                let mut s = String::with_capacity(bytes.len() * 2 + 3);
                s.push_str("X'");
                for b in bytes {
                    let _ = write!(s, "{b:02X}");
                }
                s.push('\'');
                s
            }
            ScalarValue::Date(v) => format!("DATE '{v}'"),
            ScalarValue::Time(v) => format!("TIME '{v}'"),
            ScalarValue::Timestamp(v) => match &v.timezone {
                Some(tz) => format!("TIMESTAMPTZ '{} {tz}'", v.value),
                None => format!("TIMESTAMP '{}'", v.value),
            },
            ScalarValue::Interval(v) => format!("INTERVAL '{}' {}", v.value, v.unit.sql_name()),
            ScalarValue::List(values) => {
                let values = values
                    .iter()
                    .map(|v| self.literal(v))
                    .collect::<Result<Vec<_>>>()?;
                format!("[{}]", values.join(", "))
            }
            ScalarValue::Struct(fields) => {
                let fields = fields
                    .iter()
                    .map(|(name, v)| {
                        Ok(format!("{}: {}", self.string_literal(name), self.literal(v)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                format!("{{{}}}", fields.join(", "))
            }
        })
    }

    fn string_literal(&self, s: &str) -> String {
        Value::SingleQuotedString(s.to_string()).to_string()
    }

    /// SQL type name for a data type, as used in `CREATE TABLE` and `CAST`.
    pub fn type_name(&self, datatype: &DataType) -> Result<String> {
        Ok(match &datatype.kind {
            DataTypeKind::Null => "NULL".to_string(),
            DataTypeKind::Boolean => "BOOLEAN".to_string(),
            DataTypeKind::Int8 => "TINYINT".to_string(),
            DataTypeKind::Int16 => "SMALLINT".to_string(),
            DataTypeKind::Int32 => "INTEGER".to_string(),
            DataTypeKind::Int64 => "BIGINT".to_string(),
            DataTypeKind::UInt8 => "UTINYINT".to_string(),
            DataTypeKind::UInt16 => "USMALLINT".to_string(),
            DataTypeKind::UInt32 => "UINTEGER".to_string(),
            DataTypeKind::UInt64 => "UBIGINT".to_string(),
            DataTypeKind::Float16 | DataTypeKind::Float32 => "REAL".to_string(),
            DataTypeKind::Float64 => "DOUBLE".to_string(),
            DataTypeKind::Decimal(meta) => format!("DECIMAL({}, {})", meta.precision, meta.scale),
            DataTypeKind::Utf8 => "VARCHAR".to_string(),
            DataTypeKind::Binary => "BLOB".to_string(),
            DataTypeKind::Date => "DATE".to_string(),
            DataTypeKind::Time => "TIME".to_string(),
            DataTypeKind::Timestamp(meta) => match meta.timezone {
                Some(_) => "TIMESTAMP WITH TIME ZONE".to_string(),
                None => "TIMESTAMP".to_string(),
            },
            DataTypeKind::Interval(_) => "INTERVAL".to_string(),
            DataTypeKind::List(meta) => format!("{}[]", self.type_name(&meta.datatype)?),
            DataTypeKind::Struct(meta) => {
                let fields = meta
                    .fields
                    .iter()
                    .map(|(name, typ)| {
                        Ok(format!("{} {}", self.quote_identifier(name), self.type_name(typ)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                format!("STRUCT({})", fields.join(", "))
            }
            DataTypeKind::Map(meta) => format!(
                "MAP({}, {})",
                self.type_name(&meta.key)?,
                self.type_name(&meta.value)?
            ),
            DataTypeKind::Unknown => {
                return Err(DbError::unsupported(
                    "Cannot write a SQL type for a column with unknown type",
                ));
            }
        })
    }

    /// `CREATE TABLE` statement for a schema. Non-nullable columns get
    /// `NOT NULL`.
    pub fn create_table(&self, table_name: &str, schema: &Schema) -> Result<String> {
        let mut sql = format!("CREATE TABLE {} (", self.quote_identifier(table_name));
        for (idx, (name, datatype)) in schema.iter().enumerate() {
            if idx > 0 {
                sql.push_str(", ");
            }
            write!(sql, "{} {}", self.quote_identifier(name), self.type_name(datatype)?)?;
            if !datatype.nullable {
                sql.push_str(" NOT NULL");
            }
        }
        sql.push(')');
        Ok(sql)
    }

    /// Parse a SQL type name as reported by a backend.
    ///
    /// Accepts the names written by `type_name` plus common aliases. The
    /// parsed type is nullable.
    pub fn parse_type_name(&self, name: &str) -> Result<DataType> {
        let name = name.trim();
        let upper = name.to_ascii_uppercase();

        if let Some(element) = upper.strip_suffix("[]") {
            return Ok(DataType::list(self.parse_type_name(element)?));
        }

        if let Some(args) = upper
            .strip_prefix("DECIMAL")
            .or_else(|| upper.strip_prefix("NUMERIC"))
        {
            let args = args.trim();
            if args.is_empty() {
                return Ok(DataType::decimal(18, 3));
            }
            let parsed = args
                .strip_prefix('(')
                .and_then(|a| a.strip_suffix(')'))
                .and_then(|a| a.split_once(','))
                .and_then(|(p, s)| {
                    Some((p.trim().parse::<u8>().ok()?, s.trim().parse::<u8>().ok()?))
                });
            return match parsed {
                Some((precision, scale)) => Ok(DataType::decimal(precision, scale)),
                None => Err(DbError::schema(format!("Invalid decimal type: '{name}'"))),
            };
        }

        Ok(match upper.as_str() {
            "NULL" => DataType::null(),
            "BOOLEAN" | "BOOL" => DataType::boolean(),
            "TINYINT" | "INT1" => DataType::int8(),
            "SMALLINT" | "INT2" => DataType::int16(),
            "INTEGER" | "INT" | "INT4" => DataType::int32(),
            "BIGINT" | "INT8" => DataType::int64(),
            "UTINYINT" => DataType::uint8(),
            "USMALLINT" => DataType::uint16(),
            "UINTEGER" => DataType::uint32(),
            "UBIGINT" => DataType::uint64(),
            "REAL" | "FLOAT" | "FLOAT4" => DataType::float32(),
            "DOUBLE" | "FLOAT8" | "DOUBLE PRECISION" => DataType::float64(),
            "VARCHAR" | "TEXT" | "STRING" => DataType::utf8(),
            "BLOB" | "BYTEA" | "VARBINARY" => DataType::binary(),
            "DATE" => DataType::date(),
            "TIME" => DataType::time(),
            "TIMESTAMP" => DataType::timestamp(None),
            "TIMESTAMP WITH TIME ZONE" | "TIMESTAMPTZ" => DataType::timestamp(Some("UTC")),
            "INTERVAL" => DataType::interval(IntervalUnit::Second),
            _ => return Err(DbError::schema(format!("Unknown SQL type name: '{name}'"))),
        })
    }
}
