use std::fmt;

use indexmap::IndexMap;
use quarry_error::{DbError, Result};
use serde::{Deserialize, Serialize};

use super::datatype::DataType;

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub datatype: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        Field {
            name: name.into(),
            datatype,
        }
    }
}

/// Ordered mapping of column name to type.
///
/// Equality ignores column order, the (name, type) pairs must match exactly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    fields: IndexMap<String, DataType>,
}

impl Schema {
    /// Create a schema from (name, type) pairs, erroring on duplicate names.
    pub fn try_new<S>(fields: impl IntoIterator<Item = (S, DataType)>) -> Result<Self>
    where
        S: Into<String>,
    {
        let mut map = IndexMap::new();
        for (name, datatype) in fields {
            let name = name.into();
            if map.contains_key(&name) {
                return Err(DbError::schema(format!("Duplicate column name '{name}' in schema")));
            }
            map.insert(name, datatype);
        }
        Ok(Schema { fields: map })
    }

    /// Parse a schema from (name, type string) pairs.
    ///
    /// E.g. `[("a", "!int64"), ("b", "string")]`.
    pub fn parse<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let fields = fields
            .into_iter()
            .map(|(name, typ)| Ok((name, typ.parse::<DataType>()?)))
            .collect::<Result<Vec<_>>>()?;
        Self::try_new(fields)
    }

    pub fn empty() -> Self {
        Schema::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&DataType> {
        self.fields.get(name)
    }

    /// Get the type of a column, erroring if the column doesn't exist.
    pub fn try_get(&self, name: &str) -> Result<&DataType> {
        self.fields.get(name).ok_or_else(|| {
            DbError::expression(format!("Column '{name}' not found in schema"))
                .with_field("columns", self.names().collect::<Vec<_>>().join(", "))
        })
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.get_index_of(name)
    }

    pub fn field_at(&self, idx: usize) -> Option<Field> {
        self.fields
            .get_index(idx)
            .map(|(name, datatype)| Field::new(name.clone(), datatype.clone()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|s| s.as_str())
    }

    pub fn types(&self) -> impl Iterator<Item = &DataType> {
        self.fields.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataType)> {
        self.fields.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.iter().map(|(n, t)| Field::new(n, t.clone()))
    }

    /// Return a copy where every column is nullable.
    pub fn into_nullable(self) -> Self {
        Schema {
            fields: self
                .fields
                .into_iter()
                .map(|(n, t)| (n, t.with_nullable(true)))
                .collect(),
        }
    }

    /// Compare column names and types in order.
    pub fn eq_ordered(&self, other: &Schema) -> bool {
        self.fields.len() == other.fields.len()
            && self.fields.iter().zip(other.fields.iter()).all(|(a, b)| a == b)
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .all(|(name, typ)| other.fields.get(name) == Some(typ))
    }
}

impl Eq for Schema {}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.names().map(|n| n.len()).max().unwrap_or(0);
        writeln!(f, "Schema {{")?;
        for (name, typ) in self.iter() {
            writeln!(f, "  {name:<width$}  {typ}")?;
        }
        write!(f, "}}")
    }
}
