use std::fmt;

use serde::{Deserialize, Serialize};

use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    /// Standard INNER join.
    Inner,
    /// Standard LEFT join.
    Left,
    /// Standard RIGHT join.
    Right,
    /// Standard full/outer join.
    Full,
    /// Left rows with at least one match. Emits left columns only.
    LeftSemi,
    /// Left rows with no match. Emits left columns only.
    LeftAnti,
}

impl JoinType {
    /// If only columns from the left side are emitted.
    pub const fn is_left_only(&self) -> bool {
        matches!(self, Self::LeftSemi | Self::LeftAnti)
    }

    /// If left columns may be null filled.
    pub const fn nulls_left(&self) -> bool {
        matches!(self, Self::Right | Self::Full)
    }

    /// If right columns may be null filled.
    pub const fn nulls_right(&self) -> bool {
        matches!(self, Self::Left | Self::Full)
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => write!(f, "INNER"),
            Self::Left => write!(f, "LEFT"),
            Self::Right => write!(f, "RIGHT"),
            Self::Full => write!(f, "FULL"),
            Self::LeftSemi => write!(f, "LEFT SEMI"),
            Self::LeftAnti => write!(f, "LEFT ANTI"),
        }
    }
}

/// Equality between a column on the left and a column on the right.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinCondition {
    pub left: String,
    pub right: String,
}

impl JoinCondition {
    /// Swap the sides of the condition.
    pub fn flip_sides(&mut self) {
        std::mem::swap(&mut self.left, &mut self.right);
    }

    /// If both sides name the same column. These keys collapse into a single
    /// output column.
    pub fn is_same_name(&self) -> bool {
        self.left == self.right
    }
}

impl fmt::Display for JoinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "left.{} = right.{}", self.left, self.right)
    }
}

/// Where the values of a join output column come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinColumnSource {
    Left(String),
    Right(String),
    /// First non-null of the left and right column.
    Coalesce { left: String, right: String },
}

impl fmt::Display for JoinColumnSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left(name) => write!(f, "left.{name}"),
            Self::Right(name) => write!(f, "right.{name}"),
            Self::Coalesce { left, right } => write!(f, "coalesce(left.{left}, right.{right})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinOutputColumn {
    pub name: String,
    pub source: JoinColumnSource,
}

impl fmt::Display for JoinOutputColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} AS {}", self.source, self.name)
    }
}

/// A join with resolved keys and output columns.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalJoin {
    pub join_type: JoinType,
    /// Equality conditions. May be empty for cross joins or joins using only
    /// an arbitrary predicate.
    pub conditions: Vec<JoinCondition>,
    /// Remaining predicate after extracting equalities.
    ///
    /// Every column reference carries the table ref of the side it belongs
    /// to.
    pub residual: Option<Expression>,
    /// Output columns in order. Matches the node's schema.
    pub outputs: Vec<JoinOutputColumn>,
}

impl Explainable for LogicalJoin {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        let mut ent = ExplainEntry::new("Join")
            .with_value("join_type", self.join_type)
            .with_values("conditions", &self.conditions)
            .with_optional_value("residual", self.residual.as_ref());
        if conf.verbose {
            ent = ent.with_values("outputs", &self.outputs);
        }
        ent
    }
}
