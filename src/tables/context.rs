//! Table context for calculating index sizes.

use crate::tables::{CodedIndexKind, Column, TableId};

/// Rows at or above this count force a 4-byte simple table index.
pub const WIDE_TABLE_ROWS: u32 = 1 << 15;

/// Index widths for one #~ stream.
///
/// Every width is resolved once, in [`TableContext::new`], from the heap
/// size flags and row counts; nothing is recomputed while tables are read.
#[derive(Debug, Clone)]
pub struct TableContext {
    /// HeapSizes byte from tables header.
    pub heap_sizes: u8,
    /// Row counts for each table (indexed by TableId).
    pub row_counts: [u32; 64],
    coded_wide: [bool; 13],
    table_wide: [bool; 64],
}

impl TableContext {
    /// Resolve all index widths.
    #[must_use]
    pub fn new(heap_sizes: u8, row_counts: [u32; 64]) -> Self {
        let coded_wide = CodedIndexKind::ALL.map(|kind| {
            let max_rows = kind
                .tables()
                .iter()
                .filter_map(|&t| t)
                .map(|t| row_counts[t as usize])
                .max()
                .unwrap_or(0);
            max_rows >= kind.max_small_rows()
        });
        let table_wide = row_counts.map(|rows| rows >= WIDE_TABLE_ROWS);

        Self {
            heap_sizes,
            row_counts,
            coded_wide,
            table_wide,
        }
    }

    /// Check if #Strings heap uses 4-byte indices.
    #[must_use]
    pub fn wide_string_indices(&self) -> bool {
        self.heap_sizes & 0x01 != 0
    }

    /// Check if #GUID heap uses 4-byte indices.
    #[must_use]
    pub fn wide_guid_indices(&self) -> bool {
        self.heap_sizes & 0x02 != 0
    }

    /// Check if #Blob heap uses 4-byte indices.
    #[must_use]
    pub fn wide_blob_indices(&self) -> bool {
        self.heap_sizes & 0x04 != 0
    }

    /// Get the size of a blob index (2 or 4 bytes).
    #[must_use]
    pub fn blob_index_size(&self) -> usize {
        if self.wide_blob_indices() { 4 } else { 2 }
    }

    /// Get the row count for a table.
    #[must_use]
    pub fn row_count(&self, table: TableId) -> u32 {
        self.row_counts[table as usize]
    }

    /// Check if a row index into `table` uses 4 bytes.
    #[must_use]
    pub fn wide_table_index(&self, table: TableId) -> bool {
        self.table_wide[table as usize]
    }

    /// Check if a coded index uses 4 bytes.
    #[must_use]
    pub fn wide_coded_index(&self, kind: CodedIndexKind) -> bool {
        self.coded_wide[kind as usize]
    }

    /// Get the size of a coded index (2 or 4 bytes).
    #[must_use]
    pub fn coded_index_size(&self, kind: CodedIndexKind) -> usize {
        if self.wide_coded_index(kind) { 4 } else { 2 }
    }

    /// Get the size of a table index (2 or 4 bytes).
    #[must_use]
    pub fn table_index_size(&self, table: TableId) -> usize {
        if self.wide_table_index(table) { 4 } else { 2 }
    }

    /// Byte width of one column.
    #[must_use]
    pub fn column_size(&self, column: Column) -> usize {
        let wide = match column {
            Column::U16 => return 2,
            Column::U32 => return 4,
            Column::Str => self.wide_string_indices(),
            Column::Guid => self.wide_guid_indices(),
            Column::Blob => self.wide_blob_indices(),
            Column::Index(table) => self.wide_table_index(table),
            Column::Coded(kind) => self.wide_coded_index(kind),
        };
        if wide { 4 } else { 2 }
    }

    /// Calculate the row size for a given table.
    #[must_use]
    pub fn row_size(&self, table: TableId) -> usize {
        table
            .columns()
            .iter()
            .map(|&column| self.column_size(column))
            .sum()
    }
}
