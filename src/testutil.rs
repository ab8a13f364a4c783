//! Synthetic managed PE images for tests.
//!
//! The image has one `.text` section at RVA 0x2000 / file offset 0x200
//! holding the CLR header, the metadata root and the five streams.

use std::collections::HashMap;
use std::io::Write as _;

use tempfile::TempPath;

use crate::clr::{ClrHeader, FLAG_IL_ONLY, FLAG_STRONG_NAME_SIGNED};
use crate::metadata::{ASSEMBLY_FLAG_PUBLIC_KEY, AssemblyVersion};
use crate::root::METADATA_SIGNATURE;
use crate::stream::StreamHeader;
use crate::tables::{TableContext, TableId, TablesHeader};
use crate::writer::Writer;

pub const PE_OFFSET: u32 = 0x80;
pub const SECTION_RVA: u32 = 0x2000;
pub const SECTION_RAW_OFFSET: u32 = 0x200;
const FILE_ALIGNMENT: usize = 0x200;
const RUNTIME_VERSION: &str = "v4.0.30319";
const SIGNATURE_SIZE: usize = 0x80;

#[derive(Debug, Clone)]
pub struct FixtureRef {
    pub name: String,
    pub culture: String,
    pub version: AssemblyVersion,
    pub flags: u32,
    pub key: Vec<u8>,
}

impl FixtureRef {
    /// A reference carrying a public key token (or nothing, if `token` is empty).
    pub fn token(name: &str, version: AssemblyVersion, token: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            culture: String::new(),
            version,
            flags: 0,
            key: token.to_vec(),
        }
    }

    /// A reference carrying a full public key.
    pub fn full_key(name: &str, version: AssemblyVersion, key: &[u8]) -> Self {
        Self {
            flags: ASSEMBLY_FLAG_PUBLIC_KEY,
            ..Self::token(name, version, key)
        }
    }

    pub fn culture(mut self, culture: &str) -> Self {
        self.culture = culture.to_string();
        self
    }
}

#[derive(Debug, Clone)]
pub struct FixtureAssembly {
    pub name: String,
    pub version: AssemblyVersion,
    pub flags: u32,
    pub key: Vec<u8>,
}

impl FixtureAssembly {
    pub fn unsigned(name: &str, version: AssemblyVersion) -> Self {
        Self {
            name: name.to_string(),
            version,
            flags: 0,
            key: Vec::new(),
        }
    }

    pub fn signed(name: &str, version: AssemblyVersion, key: &[u8]) -> Self {
        Self {
            flags: ASSEMBLY_FLAG_PUBLIC_KEY,
            key: key.to_vec(),
            ..Self::unsigned(name, version)
        }
    }
}

/// Builds a minimal managed PE image.
#[derive(Debug, Clone)]
pub struct FixtureBuilder {
    clr_flags: u32,
    clr_directory: bool,
    clr_directory_size: u32,
    heap_sizes: u8,
    module_name: String,
    assembly: Option<FixtureAssembly>,
    references: Vec<FixtureRef>,
    fillers: Vec<(TableId, u32)>,
    unknown_tables: Vec<(u8, u32)>,
    declared_rows: Vec<(TableId, u32)>,
    omitted_streams: Vec<&'static str>,
    tables_size_delta: i64,
}

impl Default for FixtureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self {
            clr_flags: FLAG_IL_ONLY,
            clr_directory: true,
            clr_directory_size: ClrHeader::SIZE as u32,
            heap_sizes: 0,
            module_name: "Fixture.dll".to_string(),
            assembly: None,
            references: Vec::new(),
            fillers: Vec::new(),
            unknown_tables: Vec::new(),
            declared_rows: Vec::new(),
            omitted_streams: Vec::new(),
            tables_size_delta: 0,
        }
    }

    /// CLR header flags. Setting the strong name flag also emits a signature directory.
    pub fn clr_flags(mut self, flags: u32) -> Self {
        self.clr_flags = flags;
        self
    }

    pub fn without_clr_directory(mut self) -> Self {
        self.clr_directory = false;
        self
    }

    pub fn clr_directory_size(mut self, size: u32) -> Self {
        self.clr_directory_size = size;
        self
    }

    pub fn module_name(mut self, name: &str) -> Self {
        self.module_name = name.to_string();
        self
    }

    pub fn assembly(mut self, assembly: FixtureAssembly) -> Self {
        self.assembly = Some(assembly);
        self
    }

    pub fn references(mut self, references: impl IntoIterator<Item = FixtureRef>) -> Self {
        self.references.extend(references);
        self
    }

    /// Add a table of zeroed rows the walker has to step over.
    pub fn filler(mut self, table: TableId, rows: u32) -> Self {
        self.fillers.push((table, rows));
        self
    }

    /// Mark a table id past the known range as present, with no row data.
    pub fn unknown_table(mut self, id: u8, rows: u32) -> Self {
        self.unknown_tables.push((id, rows));
        self
    }

    /// Row count written to the #~ header for `table`, independent of the
    /// rows actually emitted.
    pub fn declared_rows(mut self, table: TableId, rows: u32) -> Self {
        self.declared_rows.push((table, rows));
        self
    }

    pub fn wide_strings(mut self) -> Self {
        self.heap_sizes |= 0x01;
        self
    }

    pub fn wide_guids(mut self) -> Self {
        self.heap_sizes |= 0x02;
        self
    }

    pub fn wide_blobs(mut self) -> Self {
        self.heap_sizes |= 0x04;
        self
    }

    pub fn omit_stream(mut self, name: &'static str) -> Self {
        self.omitted_streams.push(name);
        self
    }

    /// Declare the #~ stream `delta` bytes longer or shorter than its content.
    pub fn tables_stream_size_delta(mut self, delta: i64) -> Self {
        self.tables_size_delta = delta;
        self
    }

    /// Produce the image bytes.
    pub fn build(&self) -> Vec<u8> {
        let metadata = self.build_metadata();

        let signed = self.clr_flags & FLAG_STRONG_NAME_SIGNED != 0;
        let metadata_rva = SECTION_RVA + ClrHeader::SIZE as u32;
        let signature_rva = metadata_rva + metadata.len() as u32;
        let clr = ClrHeader {
            cb: ClrHeader::SIZE as u32,
            major_runtime_version: 2,
            minor_runtime_version: 5,
            metadata_rva,
            metadata_size: metadata.len() as u32,
            flags: self.clr_flags,
            strong_name_signature_rva: if signed { signature_rva } else { 0 },
            strong_name_signature_size: if signed { SIGNATURE_SIZE as u32 } else { 0 },
            ..Default::default()
        };

        let mut body = Writer::new();
        clr.write_to(&mut body);
        body.write_bytes(&metadata);
        if signed {
            body.write_bytes(&[0xA5; SIGNATURE_SIZE]);
        }
        let body = body.into_inner();

        let mut image = Writer::new();
        image.write_u16(crate::pe::DOS_SIGNATURE);
        image.pad_to(crate::pe::E_LFANEW_OFFSET as usize);
        image.write_u32(PE_OFFSET);
        image.pad_to(PE_OFFSET as usize);

        let pe = PE_OFFSET as usize;
        image.write_bytes(b"PE\0\0");
        image.write_u16(0x014C); // i386
        image.write_u16(1);
        image.write_u32(0);
        image.write_u32(0);
        image.write_u32(0);
        image.write_u16(0xE0);
        image.write_u16(0x2102);
        image.write_u16(0x010B); // PE32
        image.pad_to(pe + crate::pe::CLR_DIRECTORY_OFFSET as usize);
        if self.clr_directory {
            image.write_u32(SECTION_RVA);
            image.write_u32(self.clr_directory_size);
        }
        image.pad_to(pe + crate::pe::SECTION_TABLE_OFFSET as usize);

        let raw_size = body.len().div_ceil(FILE_ALIGNMENT) * FILE_ALIGNMENT;
        image.write_bytes(b".text\0\0\0");
        image.write_u32(body.len() as u32);
        image.write_u32(SECTION_RVA);
        image.write_u32(raw_size as u32);
        image.write_u32(SECTION_RAW_OFFSET);
        image.write_u32(0);
        image.write_u32(0);
        image.write_u16(0);
        image.write_u16(0);
        image.write_u32(0x6000_0020);

        image.pad_to(SECTION_RAW_OFFSET as usize);
        image.write_bytes(&body);
        image.pad_to(SECTION_RAW_OFFSET as usize + raw_size);
        image.into_inner()
    }

    fn build_metadata(&self) -> Vec<u8> {
        let mut strings = StringHeapBuilder::new();
        let mut blobs = BlobHeapBuilder::new();

        let mut row_counts = [0u32; 64];
        row_counts[TableId::Module as usize] = 1;
        if self.assembly.is_some() {
            row_counts[TableId::Assembly as usize] = 1;
        }
        row_counts[TableId::AssemblyRef as usize] = self.references.len() as u32;
        for &(table, rows) in &self.fillers {
            row_counts[table as usize] = rows;
        }
        for &(id, rows) in &self.unknown_tables {
            row_counts[id as usize] = rows;
        }
        let mut declared = row_counts;
        for &(table, rows) in &self.declared_rows {
            declared[table as usize] = rows;
        }
        let valid = declared
            .iter()
            .enumerate()
            .filter(|(_, rows)| **rows != 0)
            .fold(0u64, |mask, (i, _)| mask | (1 << i));

        let header = TablesHeader {
            major_version: 2,
            minor_version: 0,
            heap_sizes: self.heap_sizes,
            valid,
            sorted: 0,
            row_counts: declared,
        };
        let ctx = TableContext::new(self.heap_sizes, declared);
        let wide_str = ctx.wide_string_indices();
        let wide_guid = ctx.wide_guid_indices();
        let wide_blob = ctx.wide_blob_indices();

        let mut tables = Writer::new();
        header.write_to(&mut tables);
        for table in TableId::ALL {
            let rows = row_counts[table as usize];
            if rows == 0 {
                continue;
            }
            match table {
                TableId::Module => {
                    tables.write_u16(0);
                    tables.write_index(strings.add(&self.module_name), wide_str);
                    tables.write_index(1, wide_guid);
                    tables.write_index(0, wide_guid);
                    tables.write_index(0, wide_guid);
                }
                TableId::Assembly => {
                    if let Some(assembly) = &self.assembly {
                        tables.write_u32(0x8004);
                        tables.write_bytes(&assembly.version.to_le_bytes());
                        tables.write_u32(assembly.flags);
                        tables.write_index(blobs.add(&assembly.key), wide_blob);
                        tables.write_index(strings.add(&assembly.name), wide_str);
                        tables.write_index(0, wide_str);
                    }
                }
                TableId::AssemblyRef => {
                    for reference in &self.references {
                        tables.write_bytes(&reference.version.to_le_bytes());
                        tables.write_u32(reference.flags);
                        tables.write_index(blobs.add(&reference.key), wide_blob);
                        tables.write_index(strings.add(&reference.name), wide_str);
                        tables.write_index(strings.add(&reference.culture), wide_str);
                        tables.write_index(0, wide_blob);
                    }
                }
                _ => {
                    let len = tables.len() + rows as usize * ctx.row_size(table);
                    tables.pad_to(len);
                }
            }
        }
        let tables_size = (tables.len() as i64 + self.tables_size_delta) as u32;

        let mut guid = Writer::new();
        guid.write_bytes(&[0x11; 16]);

        let streams: Vec<(&'static str, Vec<u8>, u32)> = [
            (StreamHeader::TABLES, tables.into_inner(), Some(tables_size)),
            (StreamHeader::STRINGS, strings.finish(), None),
            (StreamHeader::USER_STRINGS, vec![0u8; 4], None),
            (StreamHeader::GUID, guid.into_inner(), None),
            (StreamHeader::BLOB, blobs.finish(), None),
        ]
        .into_iter()
        .filter(|(name, _, _)| !self.omitted_streams.contains(name))
        .map(|(name, data, size)| {
            let size = size.unwrap_or(data.len() as u32);
            (name, data, size)
        })
        .collect();

        let version_len = (RUNTIME_VERSION.len() + 1).next_multiple_of(4);
        let headers_len: usize = streams
            .iter()
            .map(|(name, _, _)| 8 + (name.len() + 1).next_multiple_of(4))
            .sum();

        let mut root = Writer::new();
        root.write_u32(METADATA_SIGNATURE);
        root.write_u16(1);
        root.write_u16(1);
        root.write_u32(0);
        root.write_u32(version_len as u32);
        root.write_null_str(RUNTIME_VERSION);
        root.align(4);
        root.write_u16(0);
        root.write_u16(streams.len() as u16);

        let mut offset = root.len() + headers_len;
        for (name, data, size) in &streams {
            root.write_u32(offset as u32);
            root.write_u32(*size);
            root.write_null_str(name);
            root.align(4);
            offset += data.len().next_multiple_of(4);
        }
        for (_, data, _) in &streams {
            root.write_bytes(data);
            root.align(4);
        }
        root.into_inner()
    }
}

struct StringHeapBuilder {
    data: Writer,
    interned: HashMap<String, u32>,
}

impl StringHeapBuilder {
    fn new() -> Self {
        let mut data = Writer::new();
        data.write_u8(0);
        Self {
            data,
            interned: HashMap::new(),
        }
    }

    fn add(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }
        if let Some(&index) = self.interned.get(s) {
            return index;
        }
        let index = self.data.len() as u32;
        self.data.write_null_str(s);
        self.interned.insert(s.to_string(), index);
        index
    }

    fn finish(self) -> Vec<u8> {
        self.data.into_inner()
    }
}

struct BlobHeapBuilder {
    data: Writer,
}

impl BlobHeapBuilder {
    fn new() -> Self {
        let mut data = Writer::new();
        data.write_u8(0);
        Self { data }
    }

    fn add(&mut self, bytes: &[u8]) -> u32 {
        if bytes.is_empty() {
            return 0;
        }
        let index = self.data.len() as u32;
        self.data.write_compressed_uint(bytes.len() as u32);
        self.data.write_bytes(bytes);
        index
    }

    fn finish(self) -> Vec<u8> {
        self.data.into_inner()
    }
}

/// Write `image` to a closed temporary file and return its path.
pub fn temp_image(image: &[u8]) -> TempPath {
    let mut file = tempfile::Builder::new()
        .suffix(".dll")
        .tempfile()
        .unwrap();
    file.write_all(image).unwrap();
    file.into_temp_path()
}

/// SHA-1 of a file's contents.
pub fn file_digest(path: &std::path::Path) -> [u8; 20] {
    use sha1::{Digest, Sha1};
    let digest = Sha1::digest(std::fs::read(path).unwrap());
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest);
    out
}
