use std::fmt;
use std::io::{Read, Write};

use crate::chl::format_error::FormatError;
use crate::chl::io::{ChlReadExt, ChlWriteExt};

/// Raw bytes referenced by string pointers in the code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSection {
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstType {
    Byte,
    String,
}

impl ConstType {
    pub fn keyword(self) -> &'static str {
        match self {
            ConstType::Byte => "byte",
            ConstType::String => "string",
        }
    }
}

/// A constant recovered from the data section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Const {
    pub offset: usize,
    pub const_type: ConstType,
    bytes: Vec<u8>,
}

impl Const {
    pub fn byte(&self) -> i8 {
        self.bytes.first().map_or(0, |b| *b as i8)
    }

    pub fn string(&self) -> String {
        self.bytes.iter().map(|b| *b as char).collect()
    }

    /// `string c12 = "..."` or `byte c3 = 7`.
    pub fn declaration(&self) -> String {
        format!("{} c{} = {}", self.const_type.keyword(), self.offset, self)
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.const_type {
            ConstType::Byte => write!(f, "{}", self.byte()),
            ConstType::String => {
                let escaped = self.string().replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{}\"", escaped)
            }
        }
    }
}

fn is_printable(b: u8) -> bool {
    (32..127).contains(&b)
}

/// Length of the printable null-terminated string at `offset`, if any.
fn zstring_at(data: &[u8], offset: usize) -> Option<usize> {
    let tail = &data[offset..];
    let end = tail.iter().position(|b| *b == 0)?;
    tail[..end].iter().all(|b| is_printable(*b)).then_some(end)
}

impl DataSection {
    pub fn new(data: Vec<u8>) -> Self {
        DataSection { data }
    }

    pub fn length(&self) -> usize {
        4 + self.data.len()
    }

    pub fn read<R: Read>(r: &mut R) -> Result<DataSection, FormatError> {
        let count = r.read_count("data")?;
        let mut data = Vec::new();
        let read = r.take(count as u64).read_to_end(&mut data)?;
        if read < count {
            return Err(FormatError::TruncatedData { read, count });
        }
        Ok(DataSection { data })
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<(), FormatError> {
        w.write_count(self.data.len())?;
        w.write_all(&self.data)?;
        Ok(())
    }

    /// Splits the blob into printable null-terminated strings and single
    /// bytes. Best effort, only used for listings.
    pub fn analyze(&self) -> Vec<Const> {
        let mut res = Vec::new();
        let mut offset = 0;
        while offset < self.data.len() {
            match zstring_at(&self.data, offset) {
                Some(n) if n > 0 => {
                    res.push(Const {
                        offset,
                        const_type: ConstType::String,
                        bytes: self.data[offset..offset + n].to_vec(),
                    });
                    offset += n + 1;
                }
                _ => {
                    res.push(Const {
                        offset,
                        const_type: ConstType::Byte,
                        bytes: vec![self.data[offset]],
                    });
                    offset += 1;
                }
            }
        }
        res
    }
}

impl fmt::Display for DataSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} bytes of data]", self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_analyze_splits_strings_and_bytes() {
        let data = DataSection::new(b"go\0\x01say \"hi\"\0\0".to_vec());
        let consts = data.analyze();
        let decls: Vec<String> = consts.iter().map(Const::declaration).collect();
        assert_eq!(
            decls,
            vec![
                "string c0 = \"go\"".to_string(),
                "byte c3 = 1".to_string(),
                "string c4 = \"say \\\"hi\\\"\"".to_string(),
                "byte c13 = 0".to_string(),
            ]
        );
    }

    #[test]
    fn test_unterminated_tail_is_bytes() {
        let consts = DataSection::new(b"ab".to_vec()).analyze();
        assert_eq!(consts.len(), 2);
        assert!(consts.iter().all(|c| c.const_type == ConstType::Byte));
    }

    #[test]
    fn test_truncated_read() {
        let mut bytes = 10i32.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"abc");
        let err = DataSection::read(&mut Cursor::new(bytes)).unwrap_err();
        assert!(err.to_string().contains("3 bytes read out of 10"));
    }
}
