//! Utilities for reading and writing data structures from and to disk.
//!
//! The `DataBytes`/`DataBytesMut` traits expose plain `Copy` data as raw
//! bytes, the way the index keeps its label buffers in memory. The
//! `ReadLe`/`WriteLe` extension traits handle the structured, little-endian
//! index file records.

use std::{
    io::{Read, Result, Write},
    mem, slice,
};

/// A trait which allows accessing the data of an object as a slice of bytes.
/// The bytes represent a serialization of the object and allow recreating it
/// when reading them back from disk.
pub trait DataBytes {
    /// Should return the serialized object as a slice of bytes
    fn data_bytes(&self) -> &[u8];
}

/// A trait which mutably exposes the internal data of an object so that
/// a serialized object can be loaded from disk and written back into a
/// precreated object of the right size.
pub trait DataBytesMut {
    /// Should return a mutable slice of the internal data of the object
    fn data_bytes_mut(&mut self) -> &mut [u8];
}

impl<T: Copy> DataBytes for [T] {
    fn data_bytes(&self) -> &[u8] {
        let num_bytes = self.len() * mem::size_of::<T>();
        unsafe { slice::from_raw_parts(self.as_ptr() as *const u8, num_bytes) }
    }
}

impl<T: Copy> DataBytes for Vec<T> {
    fn data_bytes(&self) -> &[u8] {
        self[..].data_bytes()
    }
}

impl<T: Copy> DataBytesMut for [T] {
    fn data_bytes_mut(&mut self) -> &mut [u8] {
        let num_bytes = self.len() * mem::size_of::<T>();
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr() as *mut u8, num_bytes) }
    }
}

impl<T: Copy> DataBytesMut for Vec<T> {
    fn data_bytes_mut(&mut self) -> &mut [u8] {
        self[..].data_bytes_mut()
    }
}

/// Little-endian record writing for the structured index files.
pub trait WriteLe: Write {
    fn write_u64_le(&mut self, value: u64) -> Result<()> {
        self.write_all(&value.to_le_bytes())
    }
    fn write_u32_le(&mut self, value: u32) -> Result<()> {
        self.write_all(&value.to_le_bytes())
    }
    fn write_u16_le(&mut self, value: u16) -> Result<()> {
        self.write_all(&value.to_le_bytes())
    }
}

impl<W: Write + ?Sized> WriteLe for W {}

/// Little-endian record reading for the structured index files.
pub trait ReadLe: Read {
    fn read_u64_le(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }
    fn read_u32_le(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }
    fn read_u16_le(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }
}

impl<R: Read + ?Sized> ReadLe for R {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_le_round_trip() {
        let mut buf = Vec::new();
        buf.write_u64_le(42).unwrap();
        buf.write_u32_le(0xDEAD_BEEF).unwrap();
        buf.write_u16_le(65535).unwrap();

        let mut cursor = &buf[..];
        assert_eq!(cursor.read_u64_le().unwrap(), 42);
        assert_eq!(cursor.read_u32_le().unwrap(), 0xDEAD_BEEF);
        assert_eq!(cursor.read_u16_le().unwrap(), 65535);
    }

    #[test]
    fn test_data_bytes_views() {
        let mut words: Vec<u32> = vec![1, 0x0201];
        assert_eq!(words.data_bytes(), &[1, 0, 0, 0, 1, 2, 0, 0]);
        words.data_bytes_mut()[0] = 7;
        assert_eq!(words[0], 7);
    }
}
