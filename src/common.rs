pub use crate::error::*;
use std::io;

pub type Vec2<T> = mint::Vector2<T>;

pub fn read_buf<T: AsMut<[u8]>>(mut input: impl io::Read, mut buffer: T) -> io::Result<T> {
    input.read_exact(buffer.as_mut())?;
    Ok(buffer)
}

pub fn read_vec(input: impl io::Read, len: usize) -> io::Result<Vec<u8>> {
    read_buf(input, vec![0u8; len])
}

pub fn read_u16(input: impl io::Read) -> io::Result<u16> {
    read_buf(input, [0u8; 2]).map(u16::from_le_bytes)
}

pub fn read_u32(input: impl io::Read) -> io::Result<u32> {
    read_buf(input, [0u8; 4]).map(u32::from_le_bytes)
}

/// Serialization contract shared by every decoded resource that can be
/// written back out as bytes.
pub trait GameResource {
    /// Writes the resource to `output`, returning the number of bytes written.
    fn save(&self, output: &mut dyn io::Write) -> Result<usize>;
}
