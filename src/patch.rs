//! In-place patching of AssemblyRef and signing fields.
//!
//! Every patch overwrites fixed-width fields at offsets recorded during the
//! load; file length and row counts never change. Each call drops the
//! read-only handle, reopens the file for writing, applies all of its
//! writes and reopens read-only. Only [`Assembly::remove_signing`] updates
//! in-memory state; call [`Assembly::load`] again to see patched references.

use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::hash::Hash;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use crate::assembly::Assembly;
use crate::error::{Error, Result};
use crate::metadata::{ASSEMBLY_FLAG_PUBLIC_KEY, AssemblyVersion};
use crate::reader::Reader;

/// Length of a public key token.
pub const TOKEN_LEN: usize = 8;

/// What a patch does when the named reference is not in the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingReference {
    /// Leave the file alone and return `Ok(false)`.
    #[default]
    Ignore,
    /// Fail with [`Error::ReferenceNotFound`].
    Error,
}

/// What a patch does when the file cannot be reopened for writing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteFailure {
    /// Fail with [`Error::WriteAccess`].
    #[default]
    Report,
    /// Leave the file alone and return `Ok(false)`.
    Skip,
}

/// Policy for patch operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchOptions {
    pub missing_reference: MissingReference,
    pub write_failure: WriteFailure,
}

impl PatchOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn missing_reference(mut self, policy: MissingReference) -> Self {
        self.missing_reference = policy;
        self
    }

    #[must_use]
    pub fn write_failure(mut self, policy: WriteFailure) -> Self {
        self.write_failure = policy;
        self
    }
}

/// One fixed-width overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Patch {
    offset: u64,
    bytes: Vec<u8>,
}

impl Patch {
    fn new(offset: u64, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            bytes: bytes.into(),
        }
    }

    fn zeroed(offset: u64, len: usize) -> Self {
        Self::new(offset, vec![0u8; len])
    }
}

impl Assembly {
    /// Overwrite the version quad and public key token of the first
    /// reference named `name`.
    ///
    /// Returns `Ok(true)` if the file was written. The reference must carry
    /// an 8-byte token; a full public key or an empty blob cannot be
    /// overwritten in place.
    pub fn set_version_for_reference(
        &mut self,
        name: &str,
        version: [u8; 8],
        public_key_token: [u8; TOKEN_LEN],
    ) -> Result<bool> {
        let loaded = self.loaded()?;
        let Some(reference) = loaded.metadata.references.iter().find(|r| r.name == name)
        else {
            return self.missing_reference(name);
        };

        if reference.has_full_public_key()
            || reference.public_key_blob_len as usize != TOKEN_LEN
        {
            return Err(Error::PublicKeyNotToken {
                name: name.to_string(),
                length: reference.public_key_blob_len,
            });
        }

        let patches = [
            Patch::new(reference.version_offset(), version),
            Patch::new(reference.public_key_blob_offset + 1, public_key_token),
        ];
        let written = self.apply(&patches)?;
        if written {
            log::info!(
                "patched reference {name} to version {}",
                AssemblyVersion::from_le_bytes(version)
            );
        }
        Ok(written)
    }

    /// Typed form of [`Assembly::set_version_for_reference`].
    pub fn set_reference_version(
        &mut self,
        name: &str,
        version: AssemblyVersion,
        public_key_token: [u8; TOKEN_LEN],
    ) -> Result<bool> {
        self.set_version_for_reference(name, version.to_le_bytes(), public_key_token)
    }

    /// Strip the strong name: clear the CLR header flag and signature
    /// directory, clear the Assembly row's public key flag and orphan its
    /// public key blob.
    pub fn remove_signing(&mut self) -> Result<bool> {
        let loaded = self.loaded()?;

        let mut clr = loaded.clr;
        clr.clear_strong_name();
        let mut patches = vec![Patch::new(loaded.clr_offset, clr.write())];

        let assembly_flags = loaded.metadata.assembly.as_ref().map(|assembly| {
            let flags = assembly.flags & !ASSEMBLY_FLAG_PUBLIC_KEY;
            patches.push(Patch::new(assembly.row.flags_offset, flags.to_le_bytes()));
            patches.push(Patch::zeroed(
                assembly.row.public_key_offset,
                loaded.metadata.context.blob_index_size(),
            ));
            flags
        });

        let written = self.apply(&patches)?;
        if written {
            let loaded = self.loaded_mut()?;
            loaded.clr = clr;
            if let (Some(assembly), Some(flags)) =
                (loaded.metadata.assembly.as_mut(), assembly_flags)
            {
                assembly.flags = flags;
                assembly.row.flags = flags;
                assembly.row.public_key = 0;
                assembly.public_key_token.clear();
            }
            log::info!("removed strong name from {}", loaded.path.display());
        }
        Ok(written)
    }

    /// Orphan the public key of every reference whose name maps, through
    /// `name_to_assembly`, to an assembly in `marked`.
    ///
    /// Returns the number of references patched.
    pub fn remove_signed_references<K: Eq + Hash>(
        &mut self,
        name_to_assembly: &HashMap<String, K>,
        marked: &HashSet<K>,
    ) -> Result<usize> {
        let loaded = self.loaded()?;
        let width = loaded.metadata.context.blob_index_size();

        let patches: Vec<_> = loaded
            .metadata
            .references
            .iter()
            .filter(|r| {
                name_to_assembly
                    .get(&r.name)
                    .is_some_and(|assembly| marked.contains(assembly))
            })
            .map(|r| Patch::zeroed(r.public_key_or_token_offset(), width))
            .collect();

        if patches.is_empty() || !self.apply(&patches)? {
            return Ok(0);
        }
        log::info!("orphaned public keys of {} references", patches.len());
        Ok(patches.len())
    }

    fn missing_reference(&self, name: &str) -> Result<bool> {
        match self.options.missing_reference {
            MissingReference::Ignore => {
                log::warn!("reference {name} not found; nothing patched");
                Ok(false)
            }
            MissingReference::Error => Err(Error::ReferenceNotFound(name.to_string())),
        }
    }

    /// Write `patches` to disk and reopen read-only.
    ///
    /// Bounds are checked for every patch before the file is opened for
    /// writing.
    fn apply(&mut self, patches: &[Patch]) -> Result<bool> {
        let policy = self.options.write_failure;
        let loaded = self.loaded_mut()?;

        // Length of the file that was parsed, through the handle it was
        // parsed from.
        let file_len = match &loaded.reader {
            Some(reader) => reader.get_ref().metadata()?.len(),
            None => std::fs::metadata(&loaded.path)?.len(),
        };
        for patch in patches {
            if patch.offset + patch.bytes.len() as u64 > file_len {
                return Err(Error::PatchOutOfBounds {
                    offset: patch.offset,
                    len: patch.bytes.len(),
                    file_len,
                });
            }
        }

        loaded.reader = None;
        let outcome = match write_patches(&loaded.path, patches) {
            Ok(()) => Ok(true),
            Err(Error::WriteAccess { path, source }) if policy == WriteFailure::Skip => {
                log::warn!("skipping patch, cannot write {}: {source}", path.display());
                Ok(false)
            }
            Err(err) => Err(err),
        };

        // The write outcome wins over a failed reopen.
        match File::open(&loaded.path) {
            Ok(file) => loaded.reader = Some(Reader::new(file)),
            Err(err) if outcome.is_ok() => return Err(err.into()),
            Err(err) => log::warn!("cannot reopen {}: {err}", loaded.path.display()),
        }
        outcome
    }
}

fn open_for_write(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true);
    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        options.share_mode(0);
    }
    options.open(path)
}

fn write_patches(path: &Path, patches: &[Patch]) -> Result<()> {
    let mut file = open_for_write(path).map_err(|source| Error::WriteAccess {
        path: path.to_path_buf(),
        source,
    })?;
    for patch in patches {
        file.seek(SeekFrom::Start(patch.offset))?;
        file.write_all(&patch.bytes)?;
        log::debug!("wrote {} bytes at {:#x}", patch.bytes.len(), patch.offset);
    }
    file.sync_all()?;
    Ok(())
}
