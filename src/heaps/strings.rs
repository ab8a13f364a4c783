//! #Strings heap - null-terminated UTF-8 strings, read on demand.

use std::io::{Read, Seek};

use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::stream::StreamHeader;

/// Longest string read from the heap; anything past it is cut off.
pub const MAX_STRING_LEN: usize = 1024;

/// A view of the #Strings heap inside the file.
#[derive(Debug, Clone)]
pub struct StringsHeap {
    stream: StreamHeader,
}

impl StringsHeap {
    /// Create a view over the given stream.
    #[must_use]
    pub fn new(stream: StreamHeader) -> Self {
        Self { stream }
    }

    /// Get the string at `index`.
    ///
    /// Index 0 is the empty string and never touches the file. The reader's
    /// position is the same on return as on entry.
    pub fn get<R: Read + Seek>(&self, reader: &mut Reader<R>, index: u32) -> Result<String> {
        if index == 0 {
            return Ok(String::new());
        }
        if index >= self.stream.size {
            return Err(Error::InvalidHeapIndex {
                heap: StreamHeader::STRINGS,
                index,
            });
        }

        let available = (self.stream.size - index) as usize;
        let bytes = reader.with_saved_position(|r| {
            r.seek(self.stream.offset + u64::from(index))?;
            r.read_up_to(available.min(MAX_STRING_LEN))
        })?;

        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}
