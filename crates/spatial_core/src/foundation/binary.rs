//! Little-endian binary reading and writing
//!
//! The octree and world configuration files are flat little-endian records
//! of `u32`, `f32` and byte strings. These wrappers keep the loaders free of
//! byte fiddling.

use std::io::{self, Read, Write};

use crate::foundation::math::Vec3;

/// Reader over a little-endian record stream
pub struct BinaryReader<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> BinaryReader<R> {
    /// Wrap a reader
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        self.offset += N as u64;
        Ok(buf)
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a `u32`
    pub fn read_u32(&mut self) -> io::Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Read an `f32`
    pub fn read_f32(&mut self) -> io::Result<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    /// Read three `f32` as a vector
    pub fn read_vec3(&mut self) -> io::Result<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    /// Read a fixed-size tag such as a file magic
    pub fn read_magic<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        self.read_array()
    }

    /// Read exactly `len` bytes
    pub fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        let read = (&mut self.inner).take(len as u64).read_to_end(&mut buf)?;
        self.offset += read as u64;
        if read < len {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "byte string cut short"));
        }
        Ok(buf)
    }
}

/// Writer producing a little-endian record stream
pub struct BinaryWriter<W> {
    inner: W,
}

impl<W: Write> BinaryWriter<W> {
    /// Wrap a writer
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Write one byte
    pub fn write_u8(&mut self, value: u8) -> io::Result<()> {
        self.inner.write_all(&[value])
    }

    /// Write a `u32`
    pub fn write_u32(&mut self, value: u32) -> io::Result<()> {
        self.inner.write_all(&value.to_le_bytes())
    }

    /// Write an `f32`
    pub fn write_f32(&mut self, value: f32) -> io::Result<()> {
        self.inner.write_all(&value.to_le_bytes())
    }

    /// Write a vector as three `f32`
    pub fn write_vec3(&mut self, value: &Vec3) -> io::Result<()> {
        self.write_f32(value.x)?;
        self.write_f32(value.y)?;
        self.write_f32(value.z)
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)
    }
}

/// Whether an IO error means the stream ended early
pub fn is_truncation(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::UnexpectedEof
}
