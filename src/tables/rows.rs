//! Rows of the tables the registry captures.
//!
//! Each row remembers the file offsets of the fields that patching rewrites.

use std::io::{Read, Seek};

use crate::error::Result;
use crate::reader::Reader;
use crate::tables::TableContext;

/// Module table row (0x00).
#[derive(Debug, Clone, Default)]
pub struct ModuleRow {
    /// Generation (reserved, should be 0).
    pub generation: u16,
    /// Module name index into #Strings.
    pub name: u32,
    /// Module GUID index into #GUID.
    pub mvid: u32,
    /// EncId GUID index (reserved).
    pub enc_id: u32,
    /// EncBaseId GUID index (reserved).
    pub enc_base_id: u32,
}

impl ModuleRow {
    pub fn parse<R: Read + Seek>(reader: &mut Reader<R>, ctx: &TableContext) -> Result<Self> {
        Ok(Self {
            generation: reader.read_u16()?,
            name: reader.read_index(ctx.wide_string_indices())?,
            mvid: reader.read_index(ctx.wide_guid_indices())?,
            enc_id: reader.read_index(ctx.wide_guid_indices())?,
            enc_base_id: reader.read_index(ctx.wide_guid_indices())?,
        })
    }
}

/// Assembly table row (0x20).
#[derive(Debug, Clone, Default)]
pub struct AssemblyRow {
    /// Hash algorithm ID.
    pub hash_alg_id: u32,
    pub major_version: u16,
    pub minor_version: u16,
    pub build_number: u16,
    pub revision_number: u16,
    /// Assembly flags.
    pub flags: u32,
    /// File offset of `flags`.
    pub flags_offset: u64,
    /// Public key index into #Blob.
    pub public_key: u32,
    /// File offset of the `public_key` index.
    pub public_key_offset: u64,
    /// Name index into #Strings.
    pub name: u32,
    /// Culture index into #Strings.
    pub culture: u32,
}

impl AssemblyRow {
    pub fn parse<R: Read + Seek>(reader: &mut Reader<R>, ctx: &TableContext) -> Result<Self> {
        let hash_alg_id = reader.read_u32()?;
        let major_version = reader.read_u16()?;
        let minor_version = reader.read_u16()?;
        let build_number = reader.read_u16()?;
        let revision_number = reader.read_u16()?;
        let flags_offset = reader.position()?;
        let flags = reader.read_u32()?;
        let public_key_offset = reader.position()?;
        Ok(Self {
            hash_alg_id,
            major_version,
            minor_version,
            build_number,
            revision_number,
            flags,
            flags_offset,
            public_key: reader.read_index(ctx.wide_blob_indices())?,
            public_key_offset,
            name: reader.read_index(ctx.wide_string_indices())?,
            culture: reader.read_index(ctx.wide_string_indices())?,
        })
    }
}

/// AssemblyRef table row (0x23).
#[derive(Debug, Clone, Default)]
pub struct AssemblyRefRow {
    pub major_version: u16,
    pub minor_version: u16,
    pub build_number: u16,
    pub revision_number: u16,
    /// File offset of the 8-byte version quad.
    pub version_offset: u64,
    /// Assembly flags.
    pub flags: u32,
    /// File offset of `flags`.
    pub flags_offset: u64,
    /// Public key or token index into #Blob.
    pub public_key_or_token: u32,
    /// File offset of the `public_key_or_token` index.
    pub public_key_or_token_offset: u64,
    /// Name index into #Strings.
    pub name: u32,
    /// File offset of the `name` index.
    pub name_offset: u64,
    /// Culture index into #Strings.
    pub culture: u32,
    /// Hash value index into #Blob.
    pub hash_value: u32,
}

impl AssemblyRefRow {
    pub fn parse<R: Read + Seek>(reader: &mut Reader<R>, ctx: &TableContext) -> Result<Self> {
        let version_offset = reader.position()?;
        let major_version = reader.read_u16()?;
        let minor_version = reader.read_u16()?;
        let build_number = reader.read_u16()?;
        let revision_number = reader.read_u16()?;
        let flags_offset = reader.position()?;
        let flags = reader.read_u32()?;
        let public_key_or_token_offset = reader.position()?;
        let public_key_or_token = reader.read_index(ctx.wide_blob_indices())?;
        let name_offset = reader.position()?;
        Ok(Self {
            major_version,
            minor_version,
            build_number,
            revision_number,
            version_offset,
            flags,
            flags_offset,
            public_key_or_token,
            public_key_or_token_offset,
            name: reader.read_index(ctx.wide_string_indices())?,
            name_offset,
            culture: reader.read_index(ctx.wide_string_indices())?,
            hash_value: reader.read_index(ctx.wide_blob_indices())?,
        })
    }
}
