//! Tables stream (#~) header parsing and writing.

use std::io::{Read, Seek};

use crate::error::Result;
use crate::reader::Reader;
use crate::tables::{TableContext, TableId};
use crate::writer::Writer;

/// The tables stream (#~) header.
#[derive(Debug, Clone)]
pub struct TablesHeader {
    /// Major version (typically 2).
    pub major_version: u8,
    /// Minor version (typically 0).
    pub minor_version: u8,
    /// Heap size flags.
    /// - Bit 0: #Strings uses 4-byte indices
    /// - Bit 1: #GUID uses 4-byte indices
    /// - Bit 2: #Blob uses 4-byte indices
    pub heap_sizes: u8,
    /// Bitmask of valid (present) tables.
    pub valid: u64,
    /// Bitmask of sorted tables.
    pub sorted: u64,
    /// Row counts for each table; zero for absent tables.
    pub row_counts: [u32; 64],
}

impl TablesHeader {
    /// Size of the fixed part, before the row counts.
    pub const FIXED_SIZE: usize = 24;

    /// Parse the tables header from a reader.
    pub fn parse<R: Read + Seek>(reader: &mut Reader<R>) -> Result<Self> {
        let _reserved = reader.read_u32()?;
        let major_version = reader.read_u8()?;
        let minor_version = reader.read_u8()?;
        let heap_sizes = reader.read_u8()?;
        let _reserved2 = reader.read_u8()?;
        let valid = reader.read_u64()?;
        let sorted = reader.read_u64()?;

        // Read row counts for each valid table
        let mut row_counts = [0u32; 64];
        for (i, count) in row_counts.iter_mut().enumerate() {
            if valid & (1u64 << i) != 0 {
                *count = reader.read_u32()?;
            }
        }

        Ok(Self {
            major_version,
            minor_version,
            heap_sizes,
            valid,
            sorted,
            row_counts,
        })
    }

    /// Write the tables header to a writer.
    pub fn write_to(&self, writer: &mut Writer) {
        writer.write_u32(0);
        writer.write_u8(self.major_version);
        writer.write_u8(self.minor_version);
        writer.write_u8(self.heap_sizes);
        writer.write_u8(1);
        writer.write_u64(self.valid);
        writer.write_u64(self.sorted);

        for (i, &count) in self.row_counts.iter().enumerate() {
            if self.valid & (1u64 << i) != 0 {
                writer.write_u32(count);
            }
        }
    }

    /// Check if a table is present.
    #[must_use]
    pub fn has_table(&self, table: TableId) -> bool {
        self.valid & (1u64 << (table as u8)) != 0
    }

    /// Get the row count for a table.
    #[must_use]
    pub fn row_count(&self, table: TableId) -> u32 {
        self.row_counts[table as usize]
    }

    /// Resolve the index widths for this stream.
    #[must_use]
    pub fn context(&self) -> TableContext {
        TableContext::new(self.heap_sizes, self.row_counts)
    }

    /// Iterate over present table ids (known or not) in ascending order.
    pub fn present(&self) -> impl Iterator<Item = u8> + '_ {
        (0..64u8).filter(move |&i| self.valid & (1u64 << i) != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_header_round_trip_through_writer() {
        let mut row_counts = [0u32; 64];
        row_counts[TableId::Module as usize] = 1;
        row_counts[TableId::TypeDef as usize] = 7;
        row_counts[TableId::AssemblyRef as usize] = 3;
        let header = TablesHeader {
            major_version: 2,
            minor_version: 0,
            heap_sizes: 0x04,
            valid: (1 << 0x00) | (1 << 0x02) | (1 << 0x23),
            sorted: 0,
            row_counts,
        };

        let mut writer = Writer::new();
        header.write_to(&mut writer);
        assert_eq!(writer.len(), TablesHeader::FIXED_SIZE + 3 * 4);

        let mut reader = Reader::new(Cursor::new(writer.into_inner()));
        let parsed = TablesHeader::parse(&mut reader).unwrap();
        assert_eq!(parsed.heap_sizes, 0x04);
        assert!(parsed.has_table(TableId::TypeDef));
        assert!(!parsed.has_table(TableId::Field));
        assert_eq!(parsed.row_count(TableId::TypeDef), 7);
        assert_eq!(parsed.row_count(TableId::AssemblyRef), 3);
        assert_eq!(parsed.present().collect::<Vec<_>>(), vec![0x00, 0x02, 0x23]);
        assert!(parsed.context().wide_blob_indices());
    }
}
