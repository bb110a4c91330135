//! Binary primitive I/O
//!
//! Everything in a MATL file is big-endian except a handful of documented
//! fields, so the byte order is chosen per call rather than per stream.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};

use crate::error::{MatlError, Result};

/// Byte order of a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Big,
    Little,
}

/// Encode a u32 in the given byte order
pub(crate) fn u32_bytes(value: u32, order: Endian) -> [u8; 4] {
    let mut buf = [0u8; 4];
    match order {
        Endian::Big => BigEndian::write_u32(&mut buf, value),
        Endian::Little => LittleEndian::write_u32(&mut buf, value),
    }
    buf
}

/// Encode an f32 in the given byte order
pub(crate) fn f32_bytes(value: f32, order: Endian) -> [u8; 4] {
    let mut buf = [0u8; 4];
    match order {
        Endian::Big => BigEndian::write_f32(&mut buf, value),
        Endian::Little => LittleEndian::write_f32(&mut buf, value),
    }
    buf
}

/// Encode a string as one byte per character followed by a null terminator
pub(crate) fn cstring_bytes(value: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(value.len() + 1);
    for c in value.chars() {
        let byte = u8::try_from(u32::from(c))
            .map_err(|_| MatlError::UnencodableString(value.to_string()))?;
        out.push(byte);
    }
    out.push(0);
    Ok(out)
}

/// Number of bytes a string occupies in the string region, terminator included
pub(crate) fn cstring_len(value: &str) -> u32 {
    value.chars().count() as u32 + 1
}

/// Seekable read cursor over a whole file
pub(crate) struct BinaryReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    /// Current absolute position
    pub fn position(&self) -> u32 {
        self.cursor.position() as u32
    }

    /// Total file length
    pub fn len(&self) -> u32 {
        self.cursor.get_ref().len() as u32
    }

    pub fn remaining(&self) -> u32 {
        self.len().saturating_sub(self.position())
    }

    /// Seek to an absolute position; the end of the file is a valid target
    pub fn seek(&mut self, address: u32) -> Result<()> {
        if address > self.len() {
            return Err(MatlError::UnexpectedEof {
                offset: address,
                need: 0,
                have: 0,
            });
        }
        self.cursor.set_position(u64::from(address));
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.cursor.read_u8()?)
    }

    pub fn read_u32(&mut self, order: Endian) -> Result<u32> {
        self.ensure(4)?;
        Ok(match order {
            Endian::Big => self.cursor.read_u32::<BigEndian>()?,
            Endian::Little => self.cursor.read_u32::<LittleEndian>()?,
        })
    }

    pub fn read_f32(&mut self, order: Endian) -> Result<f32> {
        self.ensure(4)?;
        Ok(match order {
            Endian::Big => self.cursor.read_f32::<BigEndian>()?,
            Endian::Little => self.cursor.read_f32::<LittleEndian>()?,
        })
    }

    /// Fill `buf` from the current position
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.ensure(buf.len() as u32)?;
        self.cursor.read_exact(buf)?;
        Ok(())
    }

    pub fn read_magic(&mut self) -> Result<[u8; 4]> {
        let mut magic = [0u8; 4];
        self.read_exact(&mut magic)?;
        Ok(magic)
    }

    /// Read a null-terminated string at the current position, consuming the terminator
    pub fn read_cstring(&mut self) -> Result<String> {
        let start = self.position() as usize;
        let data = &self.cursor.get_ref()[start..];
        let Some(len) = data.iter().position(|&b| b == 0) else {
            return Err(MatlError::UnexpectedEof {
                offset: start as u32,
                need: data.len() as u32 + 1,
                have: data.len() as u32,
            });
        };
        let value = data[..len].iter().map(|&b| char::from(b)).collect();
        self.cursor.set_position((start + len + 1) as u64);
        Ok(value)
    }

    fn ensure(&self, need: u32) -> Result<()> {
        let have = self.remaining();
        if need > have {
            return Err(MatlError::UnexpectedEof {
                offset: self.position(),
                need,
                have,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u32_byte_orders() {
        assert_eq!(u32_bytes(0x0102_0304, Endian::Big), [1, 2, 3, 4]);
        assert_eq!(u32_bytes(0x0102_0304, Endian::Little), [4, 3, 2, 1]);
    }

    #[test]
    fn test_f32_little_endian() {
        assert_eq!(f32_bytes(1.0, Endian::Little), [0x00, 0x00, 0x80, 0x3F]);
        assert_eq!(f32_bytes(1.0, Endian::Big), [0x3F, 0x80, 0x00, 0x00]);
    }

    #[test]
    fn test_reader_advances_exactly() {
        let data = [0x00, 0x00, 0x00, 0x2A, 0x2A, 0x00, 0x00, 0x00, 0x07];
        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_u32(Endian::Big).unwrap(), 42);
        assert_eq!(reader.position(), 4);
        assert_eq!(reader.read_u32(Endian::Little).unwrap(), 42);
        assert_eq!(reader.position(), 8);
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_reader_eof() {
        let data = [0x00, 0x01];
        let mut reader = BinaryReader::new(&data);
        assert!(matches!(
            reader.read_u32(Endian::Big),
            Err(MatlError::UnexpectedEof {
                offset: 0,
                need: 4,
                have: 2
            })
        ));
        // A failed read leaves the cursor in place
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_cstring_roundtrip() {
        let bytes = cstring_bytes("Diffuse").unwrap();
        assert_eq!(bytes, b"Diffuse\0");
        assert_eq!(cstring_len("Diffuse"), 8);

        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(reader.read_cstring().unwrap(), "Diffuse");
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn test_cstring_latin1() {
        let bytes = cstring_bytes("caf\u{e9}").unwrap();
        assert_eq!(bytes, [b'c', b'a', b'f', 0xE9, 0]);
        assert_eq!(cstring_len("caf\u{e9}"), 5);
        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(reader.read_cstring().unwrap(), "caf\u{e9}");
    }

    #[test]
    fn test_cstring_rejects_wide_chars() {
        assert!(matches!(
            cstring_bytes("\u{3b1}"),
            Err(MatlError::UnencodableString(_))
        ));
    }

    #[test]
    fn test_unterminated_cstring() {
        let mut reader = BinaryReader::new(b"abc");
        assert!(matches!(
            reader.read_cstring(),
            Err(MatlError::UnexpectedEof { offset: 0, .. })
        ));
    }

    #[test]
    fn test_seek_bounds() {
        let data = [0u8; 8];
        let mut reader = BinaryReader::new(&data);
        assert!(reader.seek(8).is_ok());
        assert!(reader.seek(9).is_err());
    }
}
