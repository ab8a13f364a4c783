//! Binary reader for parsing structures straight from a seekable source.

use std::io::{self, Read, Seek, SeekFrom};

use crate::error::{Error, Result};

/// A little-endian reader over any `Read + Seek` source, usually an open file.
#[derive(Debug)]
pub struct Reader<R> {
    inner: R,
}

impl<R: Read + Seek> Reader<R> {
    /// Create a new reader over `inner`.
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Borrow the wrapped source.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Give back the wrapped source.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Get the current position.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Seek to an absolute position.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    /// Advance the cursor by `len` bytes without reading them.
    pub fn skip(&mut self, len: u64) -> Result<()> {
        let pos = self.position()?;
        self.seek(pos + len)
    }

    /// Run `f` and put the cursor back where it was, whether `f` succeeded
    /// or not.
    pub fn with_saved_position<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.position()?;
        let result = f(self);
        self.seek(saved)?;
        result
    }

    /// Fill `buf` completely.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let offset = self.position()?;
        self.inner.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::UnexpectedEof {
                offset,
                needed: buf.len(),
            },
            _ => Error::Io(e),
        })
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Read a little-endian u16.
    pub fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Read a little-endian u32.
    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Read a little-endian u64.
    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Read exactly `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read up to `max` bytes, stopping early at end of data.
    pub fn read_up_to(&mut self, max: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(max);
        (&mut self.inner).take(max as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Read a 2 or 4 byte index based on size flag.
    pub fn read_index(&mut self, wide: bool) -> Result<u32> {
        if wide {
            self.read_u32()
        } else {
            self.read_u16().map(u32::from)
        }
    }

    /// Read a compressed unsigned integer (ECMA-335 II.23.2).
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let start = self.position()?;
        let first = self.read_u8()?;

        if first & 0x80 == 0 {
            // 1 byte: 0xxxxxxx
            Ok(u32::from(first))
        } else if first & 0xC0 == 0x80 {
            // 2 bytes: 10xxxxxx xxxxxxxx
            let second = self.read_u8()?;
            Ok(u32::from(first & 0x3F) << 8 | u32::from(second))
        } else if first & 0xE0 == 0xC0 {
            // 4 bytes: 110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx
            let mut rest = [0u8; 3];
            self.read_exact(&mut rest)?;
            Ok(u32::from(first & 0x1F) << 24
                | u32::from(rest[0]) << 16
                | u32::from(rest[1]) << 8
                | u32::from(rest[2]))
        } else {
            Err(Error::InvalidCompressedInt(start))
        }
    }

    /// Skip forward to the next multiple of `alignment`, measured from `base`.
    pub fn align_from(&mut self, base: u64, alignment: u64) -> Result<()> {
        let pos = self.position()?;
        let rel = pos - base;
        let rounded = rel.div_ceil(alignment) * alignment;
        self.seek(base + rounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_little_endian_reads() {
        let data = [0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xFF];
        let mut reader = Reader::new(Cursor::new(&data[..]));
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0x12345678);
        assert_eq!(reader.read_u8().unwrap(), 0xFF);
        assert!(matches!(
            reader.read_u8(),
            Err(Error::UnexpectedEof {
                offset: 7,
                needed: 1
            })
        ));
    }

    #[test]
    fn test_saved_position_restored() {
        let data = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut reader = Reader::new(Cursor::new(&data[..]));
        reader.seek(2).unwrap();
        let value = reader
            .with_saved_position(|r| {
                r.seek(6)?;
                r.read_u8()
            })
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(reader.position().unwrap(), 2);

        // Restored on failure too.
        let err = reader.with_saved_position(|r| {
            r.seek(7)?;
            r.read_u32()
        });
        assert!(err.is_err());
        assert_eq!(reader.position().unwrap(), 2);
    }

    #[test]
    fn test_read_index_widths() {
        let data = [0x01, 0x00, 0x02, 0x00, 0x00, 0x00];
        let mut reader = Reader::new(Cursor::new(&data[..]));
        assert_eq!(reader.read_index(false).unwrap(), 1);
        assert_eq!(reader.read_index(true).unwrap(), 2);
        assert_eq!(reader.position().unwrap(), 6);
    }

    #[test]
    fn test_compressed_uint() {
        let data = [0x08, 0x80, 0xA0, 0xC0, 0x00, 0x40, 0x00];
        let mut reader = Reader::new(Cursor::new(&data[..]));
        assert_eq!(reader.read_compressed_uint().unwrap(), 8);
        assert_eq!(reader.read_compressed_uint().unwrap(), 160);
        assert_eq!(reader.read_compressed_uint().unwrap(), 0x4000);
    }

    #[test]
    fn test_compressed_uint_reserved_lead_byte() {
        for lead in [0xE0u8, 0xFF] {
            let data = [0x01, lead, 0x00, 0x00, 0x00];
            let mut reader = Reader::new(Cursor::new(&data[..]));
            assert_eq!(reader.read_compressed_uint().unwrap(), 1);
            let err = reader.read_compressed_uint().unwrap_err();
            assert!(matches!(err, Error::InvalidCompressedInt(1)));
        }

        let data = [0xDF, 0xFF, 0xFF, 0xFF];
        let mut reader = Reader::new(Cursor::new(&data[..]));
        assert_eq!(reader.read_compressed_uint().unwrap(), 0x1FFF_FFFF);
    }

    #[test]
    fn test_read_up_to_stops_at_end() {
        let data = b"abc";
        let mut reader = Reader::new(Cursor::new(&data[..]));
        reader.seek(1).unwrap();
        assert_eq!(reader.read_up_to(256).unwrap(), b"bc");
    }

    #[test]
    fn test_align_from_base() {
        let data = [0u8; 32];
        let mut reader = Reader::new(Cursor::new(&data[..]));
        reader.seek(13).unwrap();
        reader.align_from(10, 4).unwrap();
        assert_eq!(reader.position().unwrap(), 14);
        reader.align_from(10, 4).unwrap();
        assert_eq!(reader.position().unwrap(), 14);
    }
}
