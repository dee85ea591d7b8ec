use serde::Serialize;

use crate::graph::topo::CopyOrder;

/// Row counts for one table's copy into the working schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: String,
    /// Rows the working copy held before it was truncated.
    pub truncated: u64,
    pub inserted: u64,
}

/// Rows rewritten for one anonymized column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnonymizedColumn {
    pub table: String,
    pub column: String,
    pub rows: u64,
}

/// Rows loaded into one target table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub table: String,
    pub rows: u64,
}

/// Sample keyset sizes, in table-name order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleReport {
    pub table: String,
    pub size: u64,
    pub target_size: u64,
    pub density: f64,
}

/// Everything a finished run did, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CopyReport {
    pub order: CopyOrder,
    pub samples: Vec<SampleReport>,
    pub tables: Vec<TableReport>,
    pub anonymized: Vec<AnonymizedColumn>,
    pub transfers: Vec<TransferReport>,
}

impl CopyReport {
    pub fn total_inserted(&self) -> u64 {
        self.tables.iter().map(|t| t.inserted).sum()
    }

    pub fn total_transferred(&self) -> u64 {
        self.transfers.iter().map(|t| t.rows).sum()
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }
}
