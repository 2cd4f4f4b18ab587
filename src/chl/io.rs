//! Little-endian primitives shared by every CHL section.
//!
//! Strings are stored as null-terminated single-byte text. Bytes are mapped
//! one-to-one onto `char`s in the 0..=255 range so that reading and writing
//! back is lossless even for non-ASCII content.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::chl::format_error::FormatError;

pub trait ChlReadExt: Read {
    fn read_int(&mut self) -> io::Result<i32> {
        self.read_i32::<LittleEndian>()
    }

    fn read_float(&mut self) -> io::Result<f32> {
        self.read_f32::<LittleEndian>()
    }

    /// Reads an element count, rejecting negative values.
    fn read_count(&mut self, section: &'static str) -> Result<usize, FormatError> {
        let count = self.read_int()?;
        usize::try_from(count).map_err(|_| FormatError::NegativeCount { section, count })
    }

    fn read_zstring(&mut self) -> io::Result<String> {
        let mut s = String::new();
        loop {
            let b = self.read_u8()?;
            if b == 0 {
                return Ok(s);
            }
            s.push(b as char);
        }
    }

    fn read_zstring_array(&mut self, section: &'static str) -> Result<Vec<String>, FormatError> {
        let count = self.read_count(section)?;
        let mut names = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            names.push(self.read_zstring()?);
        }
        Ok(names)
    }
}

impl<R: Read + ?Sized> ChlReadExt for R {}

pub trait ChlWriteExt: Write {
    fn write_int(&mut self, v: i32) -> io::Result<()> {
        self.write_i32::<LittleEndian>(v)
    }

    fn write_float(&mut self, v: f32) -> io::Result<()> {
        self.write_f32::<LittleEndian>(v)
    }

    fn write_count(&mut self, n: usize) -> io::Result<()> {
        let n = i32::try_from(n)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many items"))?;
        self.write_int(n)
    }

    fn write_zstring(&mut self, s: &str) -> io::Result<()> {
        let bytes: Vec<u8> = s
            .chars()
            .map(|c| u8::try_from(c).unwrap_or(b'?'))
            .collect();
        self.write_all(&bytes)?;
        self.write_u8(0)
    }

    fn write_zstring_array(&mut self, names: &[String]) -> io::Result<()> {
        self.write_count(names.len())?;
        for name in names {
            self.write_zstring(name)?;
        }
        Ok(())
    }
}

impl<W: Write + ?Sized> ChlWriteExt for W {}

/// Encoded size of a null-terminated string.
pub fn zstring_size(s: &str) -> usize {
    s.chars().count() + 1
}

/// Encoded size of a counted string array.
pub fn zstring_array_size(names: &[String]) -> usize {
    4 + names.iter().map(|n| zstring_size(n)).sum::<usize>()
}
