//! PE/COFF header and section table reading.
//!
//! Only the handful of fields needed to reach the CLR runtime header are
//! decoded: the DOS magic, `e_lfanew`, the section count, the CLR data
//! directory entry and the section table.

use std::io::{Read, Seek};

use crate::error::{Error, Result};
use crate::reader::Reader;

/// "MZ" read as a little-endian u16.
pub const DOS_SIGNATURE: u16 = 0x5A4D;

/// Offset of the PE header pointer in the DOS header.
pub const E_LFANEW_OFFSET: u64 = 0x3C;

/// Offset of `NumberOfSections` from the PE signature.
pub const SECTION_COUNT_OFFSET: u64 = 0x06;

/// Offset of the CLR runtime header data directory (index 14) from the PE signature.
pub const CLR_DIRECTORY_OFFSET: u64 = 0xE8;

/// Offset of the section table from the PE signature.
pub const SECTION_TABLE_OFFSET: u64 = 0xF8;

/// A data directory entry (RVA, size).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataDirectory {
    /// RVA of the directory.
    pub rva: u32,
    /// Size of the directory in bytes.
    pub size: u32,
}

/// Section header (IMAGE_SECTION_HEADER).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section name (8-byte null-padded ASCII).
    pub name: [u8; 8],
    /// Virtual size of the section.
    pub virtual_size: u32,
    /// RVA of the section.
    pub rva: u32,
    /// Size of raw data on disk.
    pub raw_size: u32,
    /// File offset to raw data.
    pub raw_offset: u32,
    /// File offset to relocations.
    pub relocations_offset: u32,
    /// File offset to line numbers.
    pub line_numbers_offset: u32,
    /// Number of relocations.
    pub relocation_count: u16,
    /// Number of line numbers.
    pub line_number_count: u16,
    /// Section characteristics.
    pub characteristics: u32,
}

impl Section {
    /// Size of a section header in bytes.
    pub const SIZE: usize = 0x28;

    /// Parse a section header from the reader.
    pub fn parse<R: Read + Seek>(reader: &mut Reader<R>) -> Result<Self> {
        let mut name = [0u8; 8];
        reader.read_exact(&mut name)?;
        Ok(Self {
            name,
            virtual_size: reader.read_u32()?,
            rva: reader.read_u32()?,
            raw_size: reader.read_u32()?,
            raw_offset: reader.read_u32()?,
            relocations_offset: reader.read_u32()?,
            line_numbers_offset: reader.read_u32()?,
            relocation_count: reader.read_u16()?,
            line_number_count: reader.read_u16()?,
            characteristics: reader.read_u32()?,
        })
    }

    /// Section name as a string, trimmed at the first NUL.
    #[must_use]
    pub fn name(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(8);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    /// Whether `rva` lies inside this section's virtual range.
    #[must_use]
    pub fn contains_rva(&self, rva: u32) -> bool {
        rva >= self.rva && u64::from(rva) < u64::from(self.rva) + u64::from(self.virtual_size)
    }
}

/// The subset of the PE headers this crate consumes.
#[derive(Debug, Clone)]
pub struct PeHeader {
    /// File offset of the "PE\0\0" signature (`e_lfanew`).
    pub pe_offset: u32,
    /// CLR runtime header directory entry.
    pub clr_directory: DataDirectory,
    /// Section table.
    pub sections: Vec<Section>,
}

impl PeHeader {
    /// Parse the PE headers from the start of the file.
    pub fn parse<R: Read + Seek>(reader: &mut Reader<R>) -> Result<Self> {
        reader.seek(0)?;
        let magic = reader.read_u16()?;
        if magic != DOS_SIGNATURE {
            return Err(Error::InvalidDosSignature(magic));
        }

        reader.seek(E_LFANEW_OFFSET)?;
        let pe_offset = reader.read_u32()?;
        let base = u64::from(pe_offset);

        reader.seek(base + CLR_DIRECTORY_OFFSET)?;
        let clr_directory = DataDirectory {
            rva: reader.read_u32()?,
            size: reader.read_u32()?,
        };

        reader.seek(base + SECTION_COUNT_OFFSET)?;
        let section_count = reader.read_u16()? as usize;

        reader.seek(base + SECTION_TABLE_OFFSET)?;
        let mut sections = Vec::with_capacity(section_count);
        for _ in 0..section_count {
            sections.push(Section::parse(reader)?);
        }

        log::debug!(
            "PE header at {pe_offset:#x}: {section_count} sections, CLR directory {:#x}+{:#x}",
            clr_directory.rva,
            clr_directory.size
        );

        Ok(Self {
            pe_offset,
            clr_directory,
            sections,
        })
    }

    /// Translate an RVA to a file offset.
    pub fn rva_to_file_offset(&self, rva: u32) -> Result<u32> {
        rva_to_file_offset(&self.sections, rva)
    }
}

/// Convert an RVA to a file offset using the first section that covers it.
///
/// Offsets that do not fit in 32 bits are rejected like uncovered RVAs.
pub fn rva_to_file_offset(sections: &[Section], rva: u32) -> Result<u32> {
    sections
        .iter()
        .find(|s| s.contains_rva(rva))
        .and_then(|s| (rva - s.rva).checked_add(s.raw_offset))
        .ok_or(Error::InvalidOffset(rva))
}
