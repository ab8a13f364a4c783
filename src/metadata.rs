//! Metadata walk: locate the streams, step through every table and collect
//! the module name, the assembly definition and the AssemblyRef registry.

use std::fmt;
use std::io::{Read, Seek};

use crate::clr::ClrHeader;
use crate::error::{Error, Result};
use crate::heaps::{BlobHeap, StringsHeap};
use crate::pe::PeHeader;
use crate::reader::Reader;
use crate::root::MetadataRoot;
use crate::tables::{
    AssemblyRefRow, AssemblyRow, ModuleRow, TableContext, TableId, TablesHeader,
};

/// AssemblyFlags.PublicKey: the blob holds a full key, not a token.
pub const ASSEMBLY_FLAG_PUBLIC_KEY: u32 = 0x0001;

/// A four-part assembly version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssemblyVersion {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
    pub revision: u16,
}

impl AssemblyVersion {
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// The on-disk form: four little-endian u16s.
    #[must_use]
    pub fn to_le_bytes(self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[0..2].copy_from_slice(&self.major.to_le_bytes());
        bytes[2..4].copy_from_slice(&self.minor.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.build.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.revision.to_le_bytes());
        bytes
    }

    #[must_use]
    pub fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Self {
            major: u16::from_le_bytes([bytes[0], bytes[1]]),
            minor: u16::from_le_bytes([bytes[2], bytes[3]]),
            build: u16::from_le_bytes([bytes[4], bytes[5]]),
            revision: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// A resolved AssemblyRef row.
#[derive(Debug, Clone)]
pub struct AssemblyRef {
    /// Referenced assembly name.
    pub name: String,
    /// Culture, empty when neutral.
    pub culture: String,
    /// Referenced version.
    pub version: AssemblyVersion,
    /// AssemblyFlags.
    pub flags: u32,
    /// Public key token (derived when the row carries a full key).
    pub public_key: Vec<u8>,
    /// File offset of the public key blob (its length prefix).
    pub public_key_blob_offset: u64,
    /// Declared length of the public key blob.
    pub public_key_blob_len: u32,
    /// The raw row with field offsets.
    pub row: AssemblyRefRow,
}

impl AssemblyRef {
    /// Whether the row stores a full public key rather than a token.
    #[must_use]
    pub fn has_full_public_key(&self) -> bool {
        self.flags & ASSEMBLY_FLAG_PUBLIC_KEY != 0
    }

    /// File offset of the version quad.
    #[must_use]
    pub fn version_offset(&self) -> u64 {
        self.row.version_offset
    }

    /// File offset of the flags word.
    #[must_use]
    pub fn flags_offset(&self) -> u64 {
        self.row.flags_offset
    }

    /// File offset of the public key or token blob index.
    #[must_use]
    pub fn public_key_or_token_offset(&self) -> u64 {
        self.row.public_key_or_token_offset
    }
}

impl fmt::Display for AssemblyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let culture = if self.culture.is_empty() {
            "neutral"
        } else {
            &self.culture
        };
        write!(
            f,
            "{}, Version={}, Culture={culture}, PublicKeyToken=",
            self.name, self.version
        )?;
        if self.public_key.is_empty() {
            write!(f, "null")
        } else {
            self.public_key.iter().try_for_each(|b| write!(f, "{b:02x}"))
        }
    }
}

/// The file's own Assembly row.
#[derive(Debug, Clone)]
pub struct AssemblyDefinition {
    pub name: String,
    pub culture: String,
    pub version: AssemblyVersion,
    /// AssemblyFlags.
    pub flags: u32,
    /// Public key token, empty for unsigned assemblies.
    pub public_key_token: Vec<u8>,
    /// The raw row with field offsets.
    pub row: AssemblyRow,
}

/// Everything one pass over the metadata produces.
#[derive(Debug, Clone)]
pub struct Metadata {
    /// The metadata root (BSJB header).
    pub root: MetadataRoot,
    /// The tables header.
    pub tables_header: TablesHeader,
    /// Index widths resolved from the tables header.
    pub context: TableContext,
    /// Name from the Module row.
    pub module_name: String,
    /// Assembly row, absent for netmodules.
    pub assembly: Option<AssemblyDefinition>,
    /// AssemblyRef rows in table order.
    pub references: Vec<AssemblyRef>,
}

impl Metadata {
    /// Parse the metadata the CLR header points at.
    pub fn parse<R: Read + Seek>(
        reader: &mut Reader<R>,
        pe: &PeHeader,
        clr: &ClrHeader,
    ) -> Result<Self> {
        let root_offset = pe.rva_to_file_offset(clr.metadata_rva)?;
        let root = MetadataRoot::parse(reader, u64::from(root_offset))?;
        let streams = root.required_streams()?;

        let strings = StringsHeap::new(streams.strings);
        let blobs = BlobHeap::new(streams.blob);

        reader.seek(streams.tables.offset)?;
        let tables_header = TablesHeader::parse(reader)?;
        let context = tables_header.context();

        log::debug!(
            "tables stream v{}.{}: heap sizes {:#x}, {} tables present",
            tables_header.major_version,
            tables_header.minor_version,
            tables_header.heap_sizes,
            tables_header.valid.count_ones()
        );

        let mut module_name = None;
        let mut assembly = None;
        let mut references = Vec::new();

        for id in tables_header.present() {
            let Some(table) = TableId::from_u8(id) else {
                // Nothing after GenericParamConstraint feeds the registry.
                log::debug!("stopping table walk at unknown table {id:#x}");
                break;
            };
            let rows = context.row_count(table);

            // Row counts come from the file; refuse any table that cannot
            // fit in what is left of the #~ stream before touching it.
            let position = reader.position()?;
            let size = u64::from(rows) * context.row_size(table) as u64;
            let remaining = streams.tables.end().saturating_sub(position);
            if size > remaining {
                return Err(Error::UnexpectedEof {
                    offset: position,
                    needed: usize::try_from(size).unwrap_or(usize::MAX),
                });
            }

            match table {
                TableId::Module => {
                    for _ in 0..rows {
                        let row = ModuleRow::parse(reader, &context)?;
                        if module_name.is_none() {
                            module_name = Some(strings.get(reader, row.name)?);
                        }
                    }
                }
                TableId::Assembly => {
                    for _ in 0..rows {
                        let row = AssemblyRow::parse(reader, &context)?;
                        let definition = Self::resolve_assembly(reader, &strings, &blobs, row)?;
                        assembly.get_or_insert(definition);
                    }
                }
                TableId::AssemblyRef => {
                    for _ in 0..rows {
                        let row = AssemblyRefRow::parse(reader, &context)?;
                        references.push(Self::resolve_reference(reader, &strings, &blobs, row)?);
                    }
                }
                _ => reader.skip(size)?,
            }
        }

        log::debug!(
            "module {:?}: {} assembly references",
            module_name.as_deref().unwrap_or(""),
            references.len()
        );

        Ok(Self {
            root,
            tables_header,
            context,
            module_name: module_name.unwrap_or_default(),
            assembly,
            references,
        })
    }

    fn resolve_assembly<R: Read + Seek>(
        reader: &mut Reader<R>,
        strings: &StringsHeap,
        blobs: &BlobHeap,
        row: AssemblyRow,
    ) -> Result<AssemblyDefinition> {
        let full_key = row.flags & ASSEMBLY_FLAG_PUBLIC_KEY != 0;
        let key = blobs.public_key_or_token(reader, row.public_key, full_key)?;
        Ok(AssemblyDefinition {
            name: strings.get(reader, row.name)?,
            culture: strings.get(reader, row.culture)?,
            version: AssemblyVersion::new(
                row.major_version,
                row.minor_version,
                row.build_number,
                row.revision_number,
            ),
            flags: row.flags,
            public_key_token: key.token,
            row,
        })
    }

    fn resolve_reference<R: Read + Seek>(
        reader: &mut Reader<R>,
        strings: &StringsHeap,
        blobs: &BlobHeap,
        row: AssemblyRefRow,
    ) -> Result<AssemblyRef> {
        let full_key = row.flags & ASSEMBLY_FLAG_PUBLIC_KEY != 0;
        let key = blobs.public_key_or_token(reader, row.public_key_or_token, full_key)?;
        Ok(AssemblyRef {
            name: strings.get(reader, row.name)?,
            culture: strings.get(reader, row.culture)?,
            version: AssemblyVersion::new(
                row.major_version,
                row.minor_version,
                row.build_number,
                row.revision_number,
            ),
            flags: row.flags,
            public_key: key.token,
            public_key_blob_offset: key.offset,
            public_key_blob_len: key.length,
            row,
        })
    }
}
