use std::fmt;
use std::io::{Read, Write};

use crate::chl::format_error::FormatError;
use crate::chl::io::{ChlReadExt, ChlWriteExt};

pub const MAGIC: &[u8; 4] = b"LHVM";

/// Format versions. Only the Creature Isle layout is supported.
pub mod version {
    pub const BW1: i32 = 7;
    pub const BWCI: i32 = 8;
    pub const BW2: i32 = 12;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: i32,
}

impl Default for Header {
    fn default() -> Self {
        Header { version: version::BWCI }
    }
}

impl Header {
    pub const LENGTH: usize = 8;

    pub fn check_version(v: i32) -> Result<i32, FormatError> {
        match v {
            version::BWCI => Ok(v),
            version::BW1 => Err(FormatError::UnsupportedVersion {
                name: "Black & White 1",
                version: v,
            }),
            version::BW2 => Err(FormatError::UnsupportedVersion {
                name: "Black & White 2",
                version: v,
            }),
            _ => Err(FormatError::UnknownVersion(v)),
        }
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Header, FormatError> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(FormatError::BadMagic);
        }
        let version = Self::check_version(r.read_int()?)?;
        Ok(Header { version })
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<(), FormatError> {
        w.write_all(MAGIC)?;
        w.write_int(self.version)?;
        Ok(())
    }

    /// Size of the zero padding section that follows the data section.
    pub fn null_section_size(&self) -> usize {
        4100
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LHVM version {}", self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header_bytes(magic: &[u8], version: i32) -> Vec<u8> {
        let mut v = magic.to_vec();
        v.extend_from_slice(&version.to_le_bytes());
        v
    }

    #[test]
    fn test_reads_creature_isle_header() {
        let h = Header::read(&mut Cursor::new(header_bytes(b"LHVM", 8))).unwrap();
        assert_eq!(h.version, version::BWCI);
        assert_eq!(h.to_string(), "LHVM version 8");
    }

    #[test]
    fn test_rejects_other_versions() {
        let err = Header::read(&mut Cursor::new(header_bytes(b"LHVM", 7))).unwrap_err();
        assert!(err.to_string().contains("Black & White 1"));
        let err = Header::read(&mut Cursor::new(header_bytes(b"LHVM", 12))).unwrap_err();
        assert!(err.to_string().contains("Black & White 2"));
        let err = Header::read(&mut Cursor::new(header_bytes(b"LHVM", 99))).unwrap_err();
        assert!(matches!(err, FormatError::UnknownVersion(99)));
    }

    #[test]
    fn test_rejects_bad_magic() {
        let err = Header::read(&mut Cursor::new(header_bytes(b"LHVX", 8))).unwrap_err();
        assert!(matches!(err, FormatError::BadMagic));
    }
}
