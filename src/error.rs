//! Error types for clrpatch.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for clrpatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing or patching an assembly.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file could not be reopened for writing.
    #[error("cannot open {} for writing: {source}", path.display())]
    WriteAccess {
        /// File that was being reopened.
        path: PathBuf,
        /// The OS error.
        #[source]
        source: std::io::Error,
    },

    /// First two bytes are not "MZ".
    #[error("invalid DOS signature: expected 0x5A4D, got 0x{0:04X}")]
    InvalidDosSignature(u16),

    /// CLR directory reports a header larger than the sanity bound.
    #[error("CLR header size {0:#x} exceeds the {max:#x} byte limit", max = crate::clr::MAX_CLR_HEADER_SIZE)]
    ClrHeaderTooLarge(u32),

    /// Unexpected end of data while reading.
    #[error("unexpected end of data at offset {offset}, needed {needed} bytes")]
    UnexpectedEof {
        /// Offset where the read was attempted.
        offset: u64,
        /// Number of bytes needed.
        needed: usize,
    },

    /// Compressed integer with a reserved `111` lead pattern.
    #[error("invalid compressed integer at offset {0:#x}")]
    InvalidCompressedInt(u64),

    /// Metadata root version length above the 255 byte maximum.
    #[error("metadata version string length {0} exceeds 255 bytes")]
    VersionTooLong(u32),

    /// The PE has no CLR runtime header.
    #[error("not a managed assembly: CLR header RVA is zero")]
    NotManagedAssembly,

    /// Invalid BSJB signature (expected 0x424A5342).
    #[error("invalid metadata signature: expected 0x424A5342, got 0x{0:08X}")]
    InvalidMetadataSignature(u32),

    /// One of the five required streams is absent.
    #[error("missing metadata stream: {0}")]
    MissingMetadataStream(&'static str),

    /// RVA is not covered by any section.
    #[error("RVA {0:#x} is not inside any section")]
    InvalidOffset(u32),

    /// Heap index points past the end of its heap.
    #[error("{heap} index {index:#x} is out of bounds")]
    InvalidHeapIndex {
        /// Heap name.
        heap: &'static str,
        /// The offending index.
        index: u32,
    },

    /// Operation needs a loaded assembly.
    #[error("no assembly is loaded")]
    NotLoaded,

    /// No AssemblyRef with the requested name.
    #[error("assembly reference not found: {0}")]
    ReferenceNotFound(String),

    /// The reference carries a full public key (or a token of the wrong
    /// length), so an 8-byte token cannot be written over it.
    #[error("reference {name} has a {length}-byte public key blob, expected an 8-byte token")]
    PublicKeyNotToken {
        /// Reference name.
        name: String,
        /// Declared blob length.
        length: u32,
    },

    /// A patch would write past the end of the file.
    #[error("patch of {len} bytes at {offset:#x} exceeds file length {file_len}")]
    PatchOutOfBounds {
        /// Target offset.
        offset: u64,
        /// Number of bytes to write.
        len: usize,
        /// Current file length.
        file_len: u64,
    },
}

/// Coarse error categories callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or truncated PE/metadata.
    Format,
    /// The file is a PE but carries no (valid) managed metadata.
    NotManagedAssembly,
    /// A required metadata stream is absent.
    MissingMetadataStream,
    /// An RVA maps to no section.
    InvalidOffset,
    /// File could not be opened, read or written.
    Io,
    /// Operation attempted before a successful load.
    NotLoaded,
    /// Patch target name not present in the registry.
    ReferenceNotFound,
    /// Replacement data does not fit the target field.
    InvalidPatch,
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::WriteAccess { .. } => ErrorKind::Io,
            Self::InvalidDosSignature(_)
            | Self::ClrHeaderTooLarge(_)
            | Self::UnexpectedEof { .. }
            | Self::InvalidCompressedInt(_)
            | Self::VersionTooLong(_)
            | Self::InvalidHeapIndex { .. } => ErrorKind::Format,
            Self::NotManagedAssembly | Self::InvalidMetadataSignature(_) => {
                ErrorKind::NotManagedAssembly
            }
            Self::MissingMetadataStream(_) => ErrorKind::MissingMetadataStream,
            Self::InvalidOffset(_) => ErrorKind::InvalidOffset,
            Self::NotLoaded => ErrorKind::NotLoaded,
            Self::ReferenceNotFound(_) => ErrorKind::ReferenceNotFound,
            Self::PublicKeyNotToken { .. } | Self::PatchOutOfBounds { .. } => {
                ErrorKind::InvalidPatch
            }
        }
    }
}
