//! #Blob heap - length-prefixed binary data, read on demand.

use std::io::{Read, Seek};

use crate::crypto;
use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::stream::StreamHeader;

/// A public key or token blob as found in the heap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicKeyBlob {
    /// File offset of the blob (its length prefix).
    pub offset: u64,
    /// Declared length of the blob contents.
    pub length: u32,
    /// The token: the blob verbatim, or derived from a full key.
    pub token: Vec<u8>,
}

/// A view of the #Blob heap inside the file.
#[derive(Debug, Clone)]
pub struct BlobHeap {
    stream: StreamHeader,
}

impl BlobHeap {
    /// Create a view over the given stream.
    #[must_use]
    pub fn new(stream: StreamHeader) -> Self {
        Self { stream }
    }

    /// File offset of the blob at `index`.
    pub fn offset_of(&self, index: u32) -> Result<u64> {
        if index >= self.stream.size {
            return Err(Error::InvalidHeapIndex {
                heap: StreamHeader::BLOB,
                index,
            });
        }
        Ok(self.stream.offset + u64::from(index))
    }

    /// Read the blob at `index`.
    pub fn get<R: Read + Seek>(&self, reader: &mut Reader<R>, index: u32) -> Result<Vec<u8>> {
        let offset = self.offset_of(index)?;
        let (_, bytes) = reader.with_saved_position(|r| self.read_contents(r, offset))?;
        Ok(bytes)
    }

    /// Read the length prefix at `offset` and the contents behind it. The
    /// contents must end inside the heap.
    fn read_contents<R: Read + Seek>(
        &self,
        reader: &mut Reader<R>,
        offset: u64,
    ) -> Result<(u32, Vec<u8>)> {
        reader.seek(offset)?;
        let length = reader.read_compressed_uint()?;
        let start = reader.position()?;
        if start + u64::from(length) > self.stream.end() {
            return Err(Error::UnexpectedEof {
                offset: start,
                needed: length as usize,
            });
        }
        Ok((length, reader.read_bytes(length as usize)?))
    }

    /// Read a public key or token blob.
    ///
    /// With `full_key` set the blob holds a complete public key and the
    /// returned token is derived from it; otherwise the blob already is the
    /// token.
    pub fn public_key_or_token<R: Read + Seek>(
        &self,
        reader: &mut Reader<R>,
        index: u32,
        full_key: bool,
    ) -> Result<PublicKeyBlob> {
        let offset = self.offset_of(index)?;
        let (length, bytes) = reader.with_saved_position(|r| self.read_contents(r, offset))?;

        let token = if full_key && !bytes.is_empty() {
            crypto::public_key_token(&bytes).to_vec()
        } else {
            bytes
        };

        Ok(PublicKeyBlob {
            offset,
            length,
            token,
        })
    }
}
