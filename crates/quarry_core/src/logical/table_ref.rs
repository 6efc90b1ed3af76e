use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_TABLE_REF: AtomicU64 = AtomicU64::new(0);

/// Identity of a relational node.
///
/// Column expressions built from a table carry its ref so join predicates can
/// tell which side a column comes from even when both sides share a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub table_idx: u64,
}

impl TableRef {
    /// Allocate a new unique table ref.
    pub fn next() -> Self {
        TableRef {
            table_idx: NEXT_TABLE_REF.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.table_idx)
    }
}
