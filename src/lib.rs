//! # clrpatch
//!
//! In-place reader and patcher for the AssemblyRef table of managed
//! (ECMA-335) PE files.
//!
//! The crate walks a compiled assembly from the DOS header down to the
//! metadata tables, records where every AssemblyRef field lives on disk and
//! can overwrite those fields without re-serializing the file.
//!
//! ## Features
//!
//! - PE section table and CLR runtime header
//! - BSJB metadata root and stream directory
//! - #~ table walk with ECMA-335 index width resolution
//! - AssemblyRef registry with file offsets and public key tokens
//! - Fixed-width patches: reference version and token, strong name removal,
//!   orphaning signed references
//!
//! ## Example
//!
//! ```no_run
//! use clrpatch::{Assembly, AssemblyVersion};
//!
//! let mut assembly = Assembly::open("Game.exe")?;
//! for reference in assembly.references()? {
//!     println!("{reference}");
//! }
//!
//! let token = [0x96, 0x9d, 0xb8, 0x05, 0x3d, 0x33, 0x22, 0xac];
//! assembly.set_reference_version("mscorlib", AssemblyVersion::new(2, 0, 5, 0), token)?;
//! # Ok::<(), clrpatch::Error>(())
//! ```

pub mod assembly;
pub mod clr;
pub mod crypto;
pub mod error;
pub mod heaps;
pub mod metadata;
pub mod patch;
pub mod pe;
pub mod reader;
pub mod root;
pub mod stream;
pub mod tables;
pub mod writer;

#[cfg(test)]
mod testutil;

pub use assembly::Assembly;
pub use clr::ClrHeader;
pub use error::{Error, ErrorKind, Result};
pub use metadata::{AssemblyDefinition, AssemblyRef, AssemblyVersion, Metadata};
pub use patch::{MissingReference, PatchOptions, WriteFailure};
pub use pe::{PeHeader, Section};
pub use root::MetadataRoot;
pub use stream::StreamHeader;

pub use heaps::{BlobHeap, StringsHeap};
pub use tables::{CodedIndexKind, TableContext, TableId, TablesHeader};
