//! Metadata stream header parsing.

use std::io::{Read, Seek};

use crate::error::{Error, Result};
use crate::reader::Reader;

/// Longest stream name ECMA-335 allows, excluding the terminator.
const MAX_NAME_LEN: usize = 32;

/// A metadata stream header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Stream name (e.g., "#~", "#Strings", "#US", "#GUID", "#Blob").
    pub name: String,
    /// Absolute file offset of the stream.
    pub offset: u64,
    /// Size of the stream in bytes.
    pub size: u32,
}

impl StreamHeader {
    /// Well-known stream names.
    pub const TABLES: &'static str = "#~";
    pub const STRINGS: &'static str = "#Strings";
    pub const USER_STRINGS: &'static str = "#US";
    pub const GUID: &'static str = "#GUID";
    pub const BLOB: &'static str = "#Blob";

    /// Parse a stream header; `root_offset` is the metadata root's file
    /// offset, which the stored offset is relative to.
    pub fn parse<R: Read + Seek>(reader: &mut Reader<R>, root_offset: u64) -> Result<Self> {
        let offset = reader.read_u32()?;
        let size = reader.read_u32()?;

        let name_start = reader.position()?;
        let mut name = Vec::new();
        loop {
            let byte = reader.read_u8()?;
            if byte == 0 {
                break;
            }
            if name.len() == MAX_NAME_LEN {
                return Err(Error::UnexpectedEof {
                    offset: name_start,
                    needed: 1,
                });
            }
            name.push(byte);
        }
        // Name plus terminator is padded to 4 bytes.
        reader.align_from(name_start, 4)?;

        Ok(Self {
            name: String::from_utf8_lossy(&name).into_owned(),
            offset: root_offset + u64::from(offset),
            size,
        })
    }

    /// One past the last byte of the stream.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset + u64::from(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_padded_names() {
        let mut data = Vec::new();
        data.extend_from_slice(&0x6Cu32.to_le_bytes());
        data.extend_from_slice(&0x100u32.to_le_bytes());
        data.extend_from_slice(b"#~\0\0");
        data.extend_from_slice(&0x16Cu32.to_le_bytes());
        data.extend_from_slice(&0x40u32.to_le_bytes());
        data.extend_from_slice(b"#Strings\0\0\0\0");

        let mut reader = Reader::new(Cursor::new(data));
        let tables = StreamHeader::parse(&mut reader, 0x1000).unwrap();
        assert_eq!(tables.name, StreamHeader::TABLES);
        assert_eq!(tables.offset, 0x106C);
        assert_eq!(tables.size, 0x100);
        assert_eq!(reader.position().unwrap(), 12);

        let strings = StreamHeader::parse(&mut reader, 0x1000).unwrap();
        assert_eq!(strings.name, StreamHeader::STRINGS);
        assert_eq!(strings.offset, 0x116C);
        assert_eq!(strings.end(), 0x11AC);
        assert_eq!(reader.position().unwrap(), 32);
    }
}
