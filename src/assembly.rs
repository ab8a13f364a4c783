//! Load lifecycle of a managed assembly on disk.
//!
//! An [`Assembly`] starts unloaded. [`Assembly::load`] runs one parse pass
//! over the file and only marks the instance loaded if every step
//! succeeds. Loading always drops the previous file first, so a failed load
//! leaves the instance unloaded.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::clr::{ClrHeader, FLAG_STRONG_NAME_SIGNED};
use crate::error::{Error, Result};
use crate::metadata::{ASSEMBLY_FLAG_PUBLIC_KEY, AssemblyRef, Metadata};
use crate::patch::PatchOptions;
use crate::pe::PeHeader;
use crate::reader::Reader;

/// State that only exists after a successful load.
#[derive(Debug)]
pub(crate) struct Loaded {
    pub(crate) path: PathBuf,
    /// Read-only handle; `None` while a patch holds the file or after a
    /// failed reopen.
    pub(crate) reader: Option<Reader<File>>,
    pub(crate) writable: bool,
    pub(crate) pe: PeHeader,
    pub(crate) clr: ClrHeader,
    pub(crate) clr_offset: u64,
    pub(crate) metadata: Metadata,
}

/// A managed PE file and its parsed AssemblyRef registry.
#[derive(Debug, Default)]
pub struct Assembly {
    pub(crate) options: PatchOptions,
    pub(crate) state: Option<Loaded>,
}

impl Assembly {
    /// Create an unloaded instance with default patch options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unloaded instance with the given patch options.
    #[must_use]
    pub fn with_options(options: PatchOptions) -> Self {
        Self {
            options,
            state: None,
        }
    }

    /// Create an instance and load `path` into it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut assembly = Self::new();
        assembly.load(path)?;
        Ok(assembly)
    }

    /// Parse the file at `path`, replacing any previously loaded file.
    ///
    /// The previous file is released before parsing starts; on error the
    /// instance is left unloaded. A file that cannot be opened for writing
    /// still loads; patches on it then fail according to
    /// [`PatchOptions::write_failure`].
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.state = None;
        let path = std::path::absolute(path.as_ref())?;

        let mut reader = Reader::new(File::open(&path)?);
        let pe = PeHeader::parse(&mut reader)?;
        let (clr, clr_offset) = ClrHeader::locate(&mut reader, &pe)?;
        let metadata = Metadata::parse(&mut reader, &pe, &clr)?;

        // Only a file that parsed is ever opened with write access.
        let writable = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .is_ok();
        if !writable {
            log::warn!("{} is not writable; patches will fail", path.display());
        }

        log::debug!(
            "loaded {}: {} references",
            path.display(),
            metadata.references.len()
        );

        self.state = Some(Loaded {
            path,
            reader: Some(reader),
            writable,
            pe,
            clr,
            clr_offset: u64::from(clr_offset),
            metadata,
        });
        Ok(())
    }

    /// Release the file handle and return to the unloaded state.
    pub fn close(&mut self) {
        self.state = None;
    }

    /// Whether a file is currently loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state.is_some()
    }

    /// Whether the file is strong-name signed, either through the CLR header
    /// flag or through a public key on its Assembly row. False when unloaded.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.state.as_ref().is_some_and(|s| {
            s.clr.flags & FLAG_STRONG_NAME_SIGNED != 0
                || s.metadata
                    .assembly
                    .as_ref()
                    .is_some_and(|a| a.flags & ASSEMBLY_FLAG_PUBLIC_KEY != 0)
        })
    }

    /// The AssemblyRef registry, in table order.
    pub fn references(&self) -> Result<&[AssemblyRef]> {
        Ok(&self.loaded()?.metadata.references)
    }

    /// Find the first reference named `name`.
    pub fn reference(&self, name: &str) -> Result<Option<&AssemblyRef>> {
        Ok(self.references()?.iter().find(|r| r.name == name))
    }

    /// Absolute path of the loaded file.
    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.state.as_ref().map(|s| s.path.as_path())
    }

    /// Module name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.metadata.module_name.as_str())
    }

    /// Public key token of the file's own Assembly row; empty when unsigned.
    #[must_use]
    pub fn public_key_token(&self) -> Option<&[u8]> {
        self.state
            .as_ref()
            .and_then(|s| s.metadata.assembly.as_ref())
            .map(|a| a.public_key_token.as_slice())
    }

    /// Whether read-write access succeeded when the file was loaded.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.writable)
    }

    /// CLR runtime header as it was read at load time, or as last patched
    /// by [`Assembly::remove_signing`].
    pub fn clr_header(&self) -> Option<&ClrHeader> {
        self.state.as_ref().map(|s| &s.clr)
    }

    /// Section table and CLR data directory of the loaded file.
    pub fn pe_header(&self) -> Option<&PeHeader> {
        self.state.as_ref().map(|s| &s.pe)
    }

    /// Parsed metadata: root, tables header and the reference registry.
    pub fn metadata(&self) -> Option<&Metadata> {
        self.state.as_ref().map(|s| &s.metadata)
    }

    /// Policy applied by the patch operations.
    pub fn options(&self) -> &PatchOptions {
        &self.options
    }

    pub(crate) fn loaded(&self) -> Result<&Loaded> {
        self.state.as_ref().ok_or(Error::NotLoaded)
    }

    pub(crate) fn loaded_mut(&mut self) -> Result<&mut Loaded> {
        self.state.as_mut().ok_or(Error::NotLoaded)
    }
}
