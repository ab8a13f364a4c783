//! Metadata heaps: #Strings and #Blob, read lazily from the file.

mod blob;
mod strings;

pub use blob::{BlobHeap, PublicKeyBlob};
pub use strings::{MAX_STRING_LEN, StringsHeap};
