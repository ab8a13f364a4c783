//! CLR runtime header (IMAGE_COR20_HEADER) reading and writing.

use std::io::{Read, Seek};

use crate::error::{Error, Result};
use crate::pe::PeHeader;
use crate::reader::Reader;
use crate::writer::Writer;

/// Largest CLR header size accepted from the data directory.
pub const MAX_CLR_HEADER_SIZE: u32 = 0x1000;

/// COMIMAGE_FLAGS_ILONLY.
pub const FLAG_IL_ONLY: u32 = 0x0000_0001;
/// COMIMAGE_FLAGS_32BITREQUIRED.
pub const FLAG_32BIT_REQUIRED: u32 = 0x0000_0002;
/// COMIMAGE_FLAGS_IL_LIBRARY.
pub const FLAG_IL_LIBRARY: u32 = 0x0000_0004;
/// COMIMAGE_FLAGS_STRONGNAMESIGNED.
pub const FLAG_STRONG_NAME_SIGNED: u32 = 0x0000_0008;
/// COMIMAGE_FLAGS_NATIVE_ENTRYPOINT.
pub const FLAG_NATIVE_ENTRY_POINT: u32 = 0x0000_0010;
/// COMIMAGE_FLAGS_TRACKDEBUGDATA.
pub const FLAG_TRACK_DEBUG_DATA: u32 = 0x0001_0000;

/// The CLR runtime header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClrHeader {
    /// Size of the header (72 for every known runtime).
    pub cb: u32,
    /// Major runtime version required.
    pub major_runtime_version: u16,
    /// Minor runtime version required.
    pub minor_runtime_version: u16,
    /// RVA of the metadata root.
    pub metadata_rva: u32,
    /// Size of the metadata.
    pub metadata_size: u32,
    /// COMIMAGE_FLAGS_* bits.
    pub flags: u32,
    /// Entry point token or native RVA.
    pub entry_point: u32,
    pub resources_rva: u32,
    pub resources_size: u32,
    /// RVA of the strong name signature.
    pub strong_name_signature_rva: u32,
    /// Size of the strong name signature.
    pub strong_name_signature_size: u32,
    pub code_manager_table_rva: u32,
    pub code_manager_table_size: u32,
    pub vtable_fixups_rva: u32,
    pub vtable_fixups_size: u32,
    pub export_address_table_jumps_rva: u32,
    pub export_address_table_jumps_size: u32,
    pub managed_native_header_rva: u32,
    pub managed_native_header_size: u32,
}

impl ClrHeader {
    /// Serialized size of the record.
    pub const SIZE: usize = 72;

    /// Locate and parse the CLR header of a PE file.
    ///
    /// Returns the header together with its file offset.
    pub fn locate<R: Read + Seek>(reader: &mut Reader<R>, pe: &PeHeader) -> Result<(Self, u32)> {
        let dir = pe.clr_directory;
        if dir.rva == 0 {
            return Err(Error::NotManagedAssembly);
        }
        if dir.size > MAX_CLR_HEADER_SIZE {
            return Err(Error::ClrHeaderTooLarge(dir.size));
        }

        let offset = pe.rva_to_file_offset(dir.rva)?;
        reader.seek(u64::from(offset))?;
        let header = Self::parse(reader)?;

        log::debug!(
            "CLR header at {offset:#x}: runtime {}.{}, metadata {:#x}+{:#x}, flags {:#x}",
            header.major_runtime_version,
            header.minor_runtime_version,
            header.metadata_rva,
            header.metadata_size,
            header.flags
        );

        Ok((header, offset))
    }

    /// Parse the fixed-layout record at the reader's position.
    pub fn parse<R: Read + Seek>(reader: &mut Reader<R>) -> Result<Self> {
        Ok(Self {
            cb: reader.read_u32()?,
            major_runtime_version: reader.read_u16()?,
            minor_runtime_version: reader.read_u16()?,
            metadata_rva: reader.read_u32()?,
            metadata_size: reader.read_u32()?,
            flags: reader.read_u32()?,
            entry_point: reader.read_u32()?,
            resources_rva: reader.read_u32()?,
            resources_size: reader.read_u32()?,
            strong_name_signature_rva: reader.read_u32()?,
            strong_name_signature_size: reader.read_u32()?,
            code_manager_table_rva: reader.read_u32()?,
            code_manager_table_size: reader.read_u32()?,
            vtable_fixups_rva: reader.read_u32()?,
            vtable_fixups_size: reader.read_u32()?,
            export_address_table_jumps_rva: reader.read_u32()?,
            export_address_table_jumps_size: reader.read_u32()?,
            managed_native_header_rva: reader.read_u32()?,
            managed_native_header_size: reader.read_u32()?,
        })
    }

    /// Write the record to bytes.
    #[must_use]
    pub fn write(&self) -> Vec<u8> {
        let mut writer = Writer::with_capacity(Self::SIZE);
        self.write_to(&mut writer);
        writer.into_inner()
    }

    /// Write the record to a writer.
    pub fn write_to(&self, writer: &mut Writer) {
        writer.write_u32(self.cb);
        writer.write_u16(self.major_runtime_version);
        writer.write_u16(self.minor_runtime_version);
        writer.write_u32(self.metadata_rva);
        writer.write_u32(self.metadata_size);
        writer.write_u32(self.flags);
        writer.write_u32(self.entry_point);
        writer.write_u32(self.resources_rva);
        writer.write_u32(self.resources_size);
        writer.write_u32(self.strong_name_signature_rva);
        writer.write_u32(self.strong_name_signature_size);
        writer.write_u32(self.code_manager_table_rva);
        writer.write_u32(self.code_manager_table_size);
        writer.write_u32(self.vtable_fixups_rva);
        writer.write_u32(self.vtable_fixups_size);
        writer.write_u32(self.export_address_table_jumps_rva);
        writer.write_u32(self.export_address_table_jumps_size);
        writer.write_u32(self.managed_native_header_rva);
        writer.write_u32(self.managed_native_header_size);
    }

    /// Whether the strong-name-signed flag is set.
    #[must_use]
    pub fn is_strong_name_signed(&self) -> bool {
        self.flags & FLAG_STRONG_NAME_SIGNED != 0
    }

    /// Drop the strong name flag and signature directory.
    pub fn clear_strong_name(&mut self) {
        self.flags &= !FLAG_STRONG_NAME_SIGNED;
        self.strong_name_signature_rva = 0;
        self.strong_name_signature_size = 0;
    }
}
