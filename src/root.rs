//! Metadata root (BSJB header) parsing.

use std::io::{Read, Seek};

use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::stream::StreamHeader;

/// BSJB signature (0x424A5342 = "BSJB" in little-endian).
pub const METADATA_SIGNATURE: u32 = 0x424A5342;

/// Largest version string allocation ECMA-335 allows, terminator included.
pub const MAX_VERSION_LEN: u32 = 255;

/// The metadata root header (BSJB header).
#[derive(Debug, Clone)]
pub struct MetadataRoot {
    /// File offset of the root.
    pub offset: u64,
    /// Major version (typically 1).
    pub major_version: u16,
    /// Minor version (typically 1).
    pub minor_version: u16,
    /// Runtime version string (e.g., "v4.0.30319").
    pub version: String,
    /// Stream headers, in directory order.
    pub streams: Vec<StreamHeader>,
}

impl MetadataRoot {
    /// Parse the metadata root located at file offset `offset`.
    pub fn parse<R: Read + Seek>(reader: &mut Reader<R>, offset: u64) -> Result<Self> {
        reader.seek(offset)?;

        let signature = reader.read_u32()?;
        if signature != METADATA_SIGNATURE {
            return Err(Error::InvalidMetadataSignature(signature));
        }

        let major_version = reader.read_u16()?;
        let minor_version = reader.read_u16()?;
        let _reserved = reader.read_u32()?;

        // Length covers the padded area, not just the string.
        let version_len = reader.read_u32()?;
        if version_len > MAX_VERSION_LEN {
            return Err(Error::VersionTooLong(version_len));
        }
        let version_start = reader.position()?;
        let version_bytes = reader.read_bytes(version_len as usize)?;
        let version = version_bytes
            .iter()
            .position(|&b| b == 0)
            .map_or(&version_bytes[..], |pos| &version_bytes[..pos]);
        let version = String::from_utf8_lossy(version).into_owned();
        reader.align_from(version_start, 4)?;

        let _flags = reader.read_u16()?;
        let stream_count = reader.read_u16()? as usize;

        let mut streams = Vec::with_capacity(stream_count);
        for _ in 0..stream_count {
            streams.push(StreamHeader::parse(reader, offset)?);
        }

        log::debug!(
            "metadata root at {offset:#x}: {version}, streams [{}]",
            streams
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            offset,
            major_version,
            minor_version,
            version,
            streams,
        })
    }

    /// Find a stream by name.
    #[must_use]
    pub fn find_stream(&self, name: &str) -> Option<&StreamHeader> {
        self.streams.iter().find(|s| s.name == name)
    }

    /// Resolve the five streams every assembly must carry.
    pub fn required_streams(&self) -> Result<RequiredStreams> {
        let find = |name: &'static str| {
            self.find_stream(name)
                .cloned()
                .ok_or(Error::MissingMetadataStream(name))
        };
        Ok(RequiredStreams {
            strings: find(StreamHeader::STRINGS)?,
            tables: find(StreamHeader::TABLES)?,
            user_strings: find(StreamHeader::USER_STRINGS)?,
            guid: find(StreamHeader::GUID)?,
            blob: find(StreamHeader::BLOB)?,
        })
    }
}

/// The five streams a parse depends on.
#[derive(Debug, Clone)]
pub struct RequiredStreams {
    pub strings: StreamHeader,
    pub tables: StreamHeader,
    pub user_strings: StreamHeader,
    pub guid: StreamHeader,
    pub blob: StreamHeader,
}
