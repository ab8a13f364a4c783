//! Metadata tables: ids, layouts, index widths and captured rows.

mod coded_index;
mod context;
mod header;
mod layout;
mod rows;
mod table_id;

pub use coded_index::CodedIndexKind;
pub use context::{TableContext, WIDE_TABLE_ROWS};
pub use header::TablesHeader;
pub use layout::Column;
pub use rows::{AssemblyRefRow, AssemblyRow, ModuleRow};
pub use table_id::TableId;
