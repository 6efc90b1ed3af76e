use std::fmt;
use std::str::FromStr;

use quarry_error::{DbError, Result};
use serde::{Deserialize, Serialize};

/// Identifier for a type without any of its parameters or nullability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataTypeId {
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    Float32,
    Float64,
    Decimal,
    Utf8,
    Binary,
    Date,
    Time,
    Timestamp,
    Interval,
    List,
    Struct,
    Map,
    Unknown,
}

impl fmt::Display for DataTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Int8 => write!(f, "Int8"),
            Self::Int16 => write!(f, "Int16"),
            Self::Int32 => write!(f, "Int32"),
            Self::Int64 => write!(f, "Int64"),
            Self::UInt8 => write!(f, "UInt8"),
            Self::UInt16 => write!(f, "UInt16"),
            Self::UInt32 => write!(f, "UInt32"),
            Self::UInt64 => write!(f, "UInt64"),
            Self::Float16 => write!(f, "Float16"),
            Self::Float32 => write!(f, "Float32"),
            Self::Float64 => write!(f, "Float64"),
            Self::Decimal => write!(f, "Decimal"),
            Self::Utf8 => write!(f, "Utf8"),
            Self::Binary => write!(f, "Binary"),
            Self::Date => write!(f, "Date"),
            Self::Time => write!(f, "Time"),
            Self::Timestamp => write!(f, "Timestamp"),
            Self::Interval => write!(f, "Interval"),
            Self::List => write!(f, "List"),
            Self::Struct => write!(f, "Struct"),
            Self::Map => write!(f, "Map"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Units an interval can be expressed in, ordered from coarsest to finest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntervalUnit {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
    Microsecond,
    Nanosecond,
}

impl IntervalUnit {
    pub const fn short(&self) -> &'static str {
        match self {
            Self::Year => "Y",
            Self::Quarter => "Q",
            Self::Month => "M",
            Self::Week => "W",
            Self::Day => "D",
            Self::Hour => "h",
            Self::Minute => "m",
            Self::Second => "s",
            Self::Millisecond => "ms",
            Self::Microsecond => "us",
            Self::Nanosecond => "ns",
        }
    }

    /// Long name, used when rendering SQL interval literals.
    pub const fn sql_name(&self) -> &'static str {
        match self {
            Self::Year => "YEAR",
            Self::Quarter => "QUARTER",
            Self::Month => "MONTH",
            Self::Week => "WEEK",
            Self::Day => "DAY",
            Self::Hour => "HOUR",
            Self::Minute => "MINUTE",
            Self::Second => "SECOND",
            Self::Millisecond => "MILLISECOND",
            Self::Microsecond => "MICROSECOND",
            Self::Nanosecond => "NANOSECOND",
        }
    }

    /// Number of nanoseconds in one unit.
    ///
    /// Returns None for calendar units that don't have a fixed length.
    pub const fn nanos(&self) -> Option<i64> {
        Some(match self {
            Self::Year | Self::Quarter | Self::Month => return None,
            Self::Week => 7 * 86_400_000_000_000,
            Self::Day => 86_400_000_000_000,
            Self::Hour => 3_600_000_000_000,
            Self::Minute => 60_000_000_000,
            Self::Second => 1_000_000_000,
            Self::Millisecond => 1_000_000,
            Self::Microsecond => 1_000,
            Self::Nanosecond => 1,
        })
    }

    /// Returns the finer of two units.
    pub fn finest(self, other: Self) -> Self {
        std::cmp::max(self, other)
    }
}

impl FromStr for IntervalUnit {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "Y" | "year" | "years" => Self::Year,
            "Q" | "quarter" | "quarters" => Self::Quarter,
            "M" | "month" | "months" => Self::Month,
            "W" | "week" | "weeks" => Self::Week,
            "D" | "day" | "days" => Self::Day,
            "h" | "hour" | "hours" => Self::Hour,
            "m" | "minute" | "minutes" => Self::Minute,
            "s" | "second" | "seconds" => Self::Second,
            "ms" | "millisecond" | "milliseconds" => Self::Millisecond,
            "us" | "microsecond" | "microseconds" => Self::Microsecond,
            "ns" | "nanosecond" | "nanoseconds" => Self::Nanosecond,
            other => return Err(DbError::schema(format!("Unknown interval unit: '{other}'"))),
        })
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short())
    }
}

/// Metadata associated with decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecimalTypeMeta {
    pub precision: u8,
    pub scale: u8,
}

impl DecimalTypeMeta {
    pub const MAX_PRECISION: u8 = 38;

    pub const fn new(precision: u8, scale: u8) -> Self {
        DecimalTypeMeta { precision, scale }
    }
}

/// Metadata associated with timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimestampTypeMeta {
    /// IANA timezone name, e.g. "US/Eastern". None for naive timestamps.
    pub timezone: Option<String>,
}

/// Metadata associated with lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListTypeMeta {
    pub datatype: Box<DataType>,
}

/// Metadata associated with structs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructTypeMeta {
    pub fields: Vec<(String, DataType)>,
}

/// Metadata associated with maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapTypeMeta {
    pub key: Box<DataType>,
    pub value: Box<DataType>,
}

/// The parameterized part of a data type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataTypeKind {
    /// Constant null values.
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    Float32,
    Float64,
    Decimal(DecimalTypeMeta),
    Utf8,
    Binary,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    Timestamp(TimestampTypeMeta),
    Interval(IntervalUnit),
    /// A list of values all of the same type.
    List(ListTypeMeta),
    Struct(StructTypeMeta),
    Map(MapTypeMeta),
    /// Values we couldn't assign a type to.
    Unknown,
}

/// Portable data type.
///
/// Two types are equal only if their kind, all parameters, and nullability
/// match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataType {
    pub kind: DataTypeKind,
    pub nullable: bool,
}

macro_rules! simple_ctor {
    ($name:ident, $kind:ident) => {
        pub const fn $name() -> Self {
            DataType {
                kind: DataTypeKind::$kind,
                nullable: true,
            }
        }
    };
}

impl DataType {
    /// Create a nullable data type.
    pub const fn new(kind: DataTypeKind) -> Self {
        DataType {
            kind,
            nullable: true,
        }
    }

    simple_ctor!(null, Null);
    simple_ctor!(boolean, Boolean);
    simple_ctor!(int8, Int8);
    simple_ctor!(int16, Int16);
    simple_ctor!(int32, Int32);
    simple_ctor!(int64, Int64);
    simple_ctor!(uint8, UInt8);
    simple_ctor!(uint16, UInt16);
    simple_ctor!(uint32, UInt32);
    simple_ctor!(uint64, UInt64);
    simple_ctor!(float16, Float16);
    simple_ctor!(float32, Float32);
    simple_ctor!(float64, Float64);
    simple_ctor!(utf8, Utf8);
    simple_ctor!(binary, Binary);
    simple_ctor!(date, Date);
    simple_ctor!(time, Time);
    simple_ctor!(unknown, Unknown);

    pub const fn decimal(precision: u8, scale: u8) -> Self {
        Self::new(DataTypeKind::Decimal(DecimalTypeMeta::new(precision, scale)))
    }

    pub fn timestamp(timezone: Option<&str>) -> Self {
        Self::new(DataTypeKind::Timestamp(TimestampTypeMeta {
            timezone: timezone.map(|s| s.to_string()),
        }))
    }

    pub const fn interval(unit: IntervalUnit) -> Self {
        Self::new(DataTypeKind::Interval(unit))
    }

    pub fn list(element: DataType) -> Self {
        Self::new(DataTypeKind::List(ListTypeMeta {
            datatype: Box::new(element),
        }))
    }

    pub fn structure(fields: impl IntoIterator<Item = (String, DataType)>) -> Self {
        Self::new(DataTypeKind::Struct(StructTypeMeta {
            fields: fields.into_iter().collect(),
        }))
    }

    pub fn map(key: DataType, value: DataType) -> Self {
        Self::new(DataTypeKind::Map(MapTypeMeta {
            key: Box::new(key),
            value: Box::new(value),
        }))
    }

    /// Return a copy of this type with the given nullability.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        // Null is always nullable.
        self.nullable = nullable || self.kind == DataTypeKind::Null;
        self
    }

    pub fn non_null(self) -> Self {
        self.with_nullable(false)
    }

    /// Get the data type id from the data type.
    pub const fn datatype_id(&self) -> DataTypeId {
        match &self.kind {
            DataTypeKind::Null => DataTypeId::Null,
            DataTypeKind::Boolean => DataTypeId::Boolean,
            DataTypeKind::Int8 => DataTypeId::Int8,
            DataTypeKind::Int16 => DataTypeId::Int16,
            DataTypeKind::Int32 => DataTypeId::Int32,
            DataTypeKind::Int64 => DataTypeId::Int64,
            DataTypeKind::UInt8 => DataTypeId::UInt8,
            DataTypeKind::UInt16 => DataTypeId::UInt16,
            DataTypeKind::UInt32 => DataTypeId::UInt32,
            DataTypeKind::UInt64 => DataTypeId::UInt64,
            DataTypeKind::Float16 => DataTypeId::Float16,
            DataTypeKind::Float32 => DataTypeId::Float32,
            DataTypeKind::Float64 => DataTypeId::Float64,
            DataTypeKind::Decimal(_) => DataTypeId::Decimal,
            DataTypeKind::Utf8 => DataTypeId::Utf8,
            DataTypeKind::Binary => DataTypeId::Binary,
            DataTypeKind::Date => DataTypeId::Date,
            DataTypeKind::Time => DataTypeId::Time,
            DataTypeKind::Timestamp(_) => DataTypeId::Timestamp,
            DataTypeKind::Interval(_) => DataTypeId::Interval,
            DataTypeKind::List(_) => DataTypeId::List,
            DataTypeKind::Struct(_) => DataTypeId::Struct,
            DataTypeKind::Map(_) => DataTypeId::Map,
            DataTypeKind::Unknown => DataTypeId::Unknown,
        }
    }

    /// Return if this datatype is null.
    pub const fn is_null(&self) -> bool {
        matches!(self.kind, DataTypeKind::Null)
    }

    pub const fn is_boolean(&self) -> bool {
        matches!(self.kind, DataTypeKind::Boolean)
    }

    pub const fn is_signed_integer(&self) -> bool {
        matches!(
            self.kind,
            DataTypeKind::Int8 | DataTypeKind::Int16 | DataTypeKind::Int32 | DataTypeKind::Int64
        )
    }

    pub const fn is_unsigned_integer(&self) -> bool {
        matches!(
            self.kind,
            DataTypeKind::UInt8
                | DataTypeKind::UInt16
                | DataTypeKind::UInt32
                | DataTypeKind::UInt64
        )
    }

    pub const fn is_integer(&self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub const fn is_floating(&self) -> bool {
        matches!(
            self.kind,
            DataTypeKind::Float16 | DataTypeKind::Float32 | DataTypeKind::Float64
        )
    }

    pub const fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_floating() || matches!(self.kind, DataTypeKind::Decimal(_))
    }

    pub const fn is_temporal(&self) -> bool {
        matches!(
            self.kind,
            DataTypeKind::Date | DataTypeKind::Time | DataTypeKind::Timestamp(_)
        )
    }

    /// Bit width for integer and float types.
    pub const fn bit_width(&self) -> Option<u8> {
        Some(match self.kind {
            DataTypeKind::Int8 | DataTypeKind::UInt8 => 8,
            DataTypeKind::Int16 | DataTypeKind::UInt16 | DataTypeKind::Float16 => 16,
            DataTypeKind::Int32 | DataTypeKind::UInt32 | DataTypeKind::Float32 => 32,
            DataTypeKind::Int64 | DataTypeKind::UInt64 | DataTypeKind::Float64 => 64,
            _ => return None,
        })
    }

    /// Compare kinds while ignoring nullability (at every nesting level).
    pub fn eq_ignore_nullability(&self, other: &DataType) -> bool {
        match (&self.kind, &other.kind) {
            (DataTypeKind::List(a), DataTypeKind::List(b)) => {
                a.datatype.eq_ignore_nullability(&b.datatype)
            }
            (DataTypeKind::Struct(a), DataTypeKind::Struct(b)) => {
                a.fields.len() == b.fields.len()
                    && a.fields
                        .iter()
                        .zip(&b.fields)
                        .all(|((n1, t1), (n2, t2))| n1 == n2 && t1.eq_ignore_nullability(t2))
            }
            (DataTypeKind::Map(a), DataTypeKind::Map(b)) => {
                a.key.eq_ignore_nullability(&b.key) && a.value.eq_ignore_nullability(&b.value)
            }
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.nullable && !self.is_null() {
            write!(f, "!")?;
        }
        match &self.kind {
            DataTypeKind::Null => write!(f, "null"),
            DataTypeKind::Boolean => write!(f, "boolean"),
            DataTypeKind::Int8 => write!(f, "int8"),
            DataTypeKind::Int16 => write!(f, "int16"),
            DataTypeKind::Int32 => write!(f, "int32"),
            DataTypeKind::Int64 => write!(f, "int64"),
            DataTypeKind::UInt8 => write!(f, "uint8"),
            DataTypeKind::UInt16 => write!(f, "uint16"),
            DataTypeKind::UInt32 => write!(f, "uint32"),
            DataTypeKind::UInt64 => write!(f, "uint64"),
            DataTypeKind::Float16 => write!(f, "float16"),
            DataTypeKind::Float32 => write!(f, "float32"),
            DataTypeKind::Float64 => write!(f, "float64"),
            DataTypeKind::Decimal(meta) => write!(f, "decimal({}, {})", meta.precision, meta.scale),
            DataTypeKind::Utf8 => write!(f, "string"),
            DataTypeKind::Binary => write!(f, "binary"),
            DataTypeKind::Date => write!(f, "date"),
            DataTypeKind::Time => write!(f, "time"),
            DataTypeKind::Timestamp(meta) => match &meta.timezone {
                Some(tz) => write!(f, "timestamp('{tz}')"),
                None => write!(f, "timestamp"),
            },
            DataTypeKind::Interval(unit) => write!(f, "interval('{unit}')"),
            DataTypeKind::List(meta) => write!(f, "array<{}>", meta.datatype),
            DataTypeKind::Struct(meta) => {
                write!(f, "struct<")?;
                for (idx, (name, typ)) in meta.fields.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {typ}")?;
                }
                write!(f, ">")
            }
            DataTypeKind::Map(meta) => write!(f, "map<{}, {}>", meta.key, meta.value),
            DataTypeKind::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for DataType {
    type Err = DbError;

    /// Parse a type string like "!int64", "timestamp('UTC')" or
    /// "array<string>".
    fn from_str(s: &str) -> Result<Self> {
        let mut parser = TypeParser { input: s, pos: 0 };
        let datatype = parser.parse_type()?;
        parser.skip_whitespace();
        if parser.pos != parser.input.len() {
            return Err(DbError::schema(format!(
                "Unexpected trailing input in type string: '{}'",
                &parser.input[parser.pos..]
            )));
        }
        Ok(datatype)
    }
}

/// Small recursive descent parser for type strings.
struct TypeParser<'a> {
    input: &'a str,
    pos: usize,
}

impl TypeParser<'_> {
    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn consume(&mut self, c: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if !self.consume(c) {
            return Err(DbError::schema(format!(
                "Expected '{c}' at position {} in type string '{}'",
                self.pos, self.input
            )));
        }
        Ok(())
    }

    fn ident(&mut self) -> Result<&str> {
        self.skip_whitespace();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(DbError::schema(format!(
                "Expected identifier at position {start} in type string '{}'",
                self.input
            )));
        }
        Ok(&self.input[start..self.pos])
    }

    fn quoted(&mut self) -> Result<String> {
        self.skip_whitespace();
        let quote = match self.peek() {
            Some(c @ ('\'' | '"')) => c,
            _ => return Ok(self.ident()?.to_string()),
        };
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != quote) {
            self.pos += self.peek().map(|c| c.len_utf8()).unwrap_or(1);
        }
        let s = self.input[start..self.pos].to_string();
        self.expect(quote)?;
        Ok(s)
    }

    fn number(&mut self) -> Result<u8> {
        let ident = self.ident()?;
        ident
            .parse::<u8>()
            .map_err(|_| DbError::schema(format!("Expected number in type string, got '{ident}'")))
    }

    fn parse_type(&mut self) -> Result<DataType> {
        let nullable = !self.consume('!');
        let name = self.ident()?.to_ascii_lowercase();

        let datatype = match name.as_str() {
            "null" => DataType::null(),
            "bool" | "boolean" => DataType::boolean(),
            "int8" => DataType::int8(),
            "int16" => DataType::int16(),
            "int32" => DataType::int32(),
            "int" | "int64" => DataType::int64(),
            "uint8" => DataType::uint8(),
            "uint16" => DataType::uint16(),
            "uint32" => DataType::uint32(),
            "uint64" => DataType::uint64(),
            "float16" | "halffloat" => DataType::float16(),
            "float32" | "float" => DataType::float32(),
            "float64" | "double" => DataType::float64(),
            "string" | "str" => DataType::utf8(),
            "binary" | "bytes" => DataType::binary(),
            "date" => DataType::date(),
            "time" => DataType::time(),
            "unknown" => DataType::unknown(),
            "decimal" => {
                if self.consume('(') {
                    let precision = self.number()?;
                    self.expect(',')?;
                    let scale = self.number()?;
                    self.expect(')')?;
                    DataType::decimal(precision, scale)
                } else {
                    DataType::decimal(DecimalTypeMeta::MAX_PRECISION, 9)
                }
            }
            "timestamp" => {
                if self.consume('(') {
                    let tz = self.quoted()?;
                    self.expect(')')?;
                    DataType::timestamp(Some(&tz))
                } else {
                    DataType::timestamp(None)
                }
            }
            "interval" => {
                if self.consume('(') {
                    let unit: IntervalUnit = self.quoted()?.parse()?;
                    self.expect(')')?;
                    DataType::interval(unit)
                } else {
                    DataType::interval(IntervalUnit::Second)
                }
            }
            "array" => {
                self.expect('<')?;
                let inner = self.parse_type()?;
                self.expect('>')?;
                DataType::list(inner)
            }
            "map" => {
                self.expect('<')?;
                let key = self.parse_type()?;
                self.expect(',')?;
                let value = self.parse_type()?;
                self.expect('>')?;
                DataType::map(key, value)
            }
            "struct" => {
                self.expect('<')?;
                let mut fields = Vec::new();
                loop {
                    let field_name = self.ident()?.to_string();
                    self.expect(':')?;
                    fields.push((field_name, self.parse_type()?));
                    if !self.consume(',') {
                        break;
                    }
                }
                self.expect('>')?;
                DataType::structure(fields)
            }
            other => return Err(DbError::schema(format!("Unknown type name: '{other}'"))),
        };

        Ok(datatype.with_nullable(nullable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_timezone_equality() {
        assert_ne!(DataType::timestamp(None), DataType::timestamp(Some("US/Eastern")));
        assert_eq!(
            DataType::timestamp(Some("US/Eastern")),
            DataType::timestamp(Some("US/Eastern"))
        );
    }

    #[test]
    fn nullability_participates_in_equality() {
        assert_ne!(DataType::int8(), DataType::int8().non_null());
        assert!(DataType::int8().eq_ignore_nullability(&DataType::int8().non_null()));
    }

    #[test]
    fn null_is_always_nullable() {
        assert!(DataType::null().non_null().nullable);
    }

    #[test]
    fn parse_type_strings() {
        let cases = [
            ("!int", DataType::int64().non_null()),
            ("string", DataType::utf8()),
            ("bool", DataType::boolean()),
            ("double", DataType::float64()),
            ("timestamp", DataType::timestamp(None)),
            ("timestamp('US/Eastern')", DataType::timestamp(Some("US/Eastern"))),
            ("interval('ns')", DataType::interval(IntervalUnit::Nanosecond)),
            ("decimal(2, 1)", DataType::decimal(2, 1)),
            ("array<!int32>", DataType::list(DataType::int32().non_null())),
            (
                "map<string, float64>",
                DataType::map(DataType::utf8(), DataType::float64()),
            ),
            (
                "struct<a: int8, b: string>",
                DataType::structure([
                    ("a".to_string(), DataType::int8()),
                    ("b".to_string(), DataType::utf8()),
                ]),
            ),
        ];

        for (s, expected) in cases {
            let got: DataType = s.parse().unwrap();
            assert_eq!(expected, got, "parsing {s}");
        }
    }

    #[test]
    fn display_parses_back() {
        let types = [
            DataType::uint16().non_null(),
            DataType::timestamp(Some("UTC")),
            DataType::list(DataType::decimal(10, 2)),
            DataType::interval(IntervalUnit::Microsecond),
        ];

        for typ in types {
            let parsed: DataType = typ.to_string().parse().unwrap();
            assert_eq!(typ, parsed);
        }
    }

    #[test]
    fn parse_errors() {
        assert!("int128".parse::<DataType>().is_err());
        assert!("array<int8".parse::<DataType>().is_err());
        assert!("interval('fortnight')".parse::<DataType>().is_err());
    }

    #[test]
    fn interval_unit_ordering() {
        assert_eq!(
            IntervalUnit::Nanosecond,
            IntervalUnit::Microsecond.finest(IntervalUnit::Nanosecond)
        );
        assert_eq!(IntervalUnit::Second, IntervalUnit::Day.finest(IntervalUnit::Second));
    }
}
