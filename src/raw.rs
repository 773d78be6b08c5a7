use std::io;

use crate::common::*;

/// Indexed-pixel image with no header: one palette index per pixel,
/// row-major. Dimensions are not stored in the data and must be
/// supplied by the caller.
pub struct RawImage {
    pub size: Vec2<u32>,
    data: Vec<u8>,
}

impl RawImage {
    pub fn from_data(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            size: Vec2 {
                x: width,
                y: height,
            },
            data,
        }
    }

    /// Height is however many rows of `width` the buffer fills, the
    /// last one possibly partial.
    pub fn from_data_with_width(data: Vec<u8>, width: u32) -> Self {
        let height = (data.len() as u32 + width - 1) / width;
        Self::from_data(data, width, height)
    }

    /// An empty buffer is no image at all, not a 0x0 one.
    pub fn from_raw_data(data: Vec<u8>) -> Option<Self> {
        if data.is_empty() {
            None
        } else {
            Some(Self::from_data(data, 0, 0))
        }
    }

    pub fn read(file: impl io::Read, width: u32, height: u32) -> Result<Self> {
        let data = read_vec(file, width as usize * height as usize)?;
        Ok(Self::from_data(data, width, height))
    }

    pub fn read_length(file: impl io::Read, length: usize) -> Result<Self> {
        let data = read_vec(file, length)?;
        Ok(Self::from_data(data, 0, 0))
    }

    pub fn width(&self) -> u32 {
        self.size.x
    }

    pub fn height(&self) -> u32 {
        self.size.y
    }

    /// The format is the absence of a format: the raw data is the
    /// pixel buffer itself.
    pub fn to_raw_data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw_data(self) -> Vec<u8> {
        self.data
    }
}

impl GameResource for RawImage {
    fn save(&self, output: &mut dyn io::Write) -> Result<usize> {
        output.write_all(&self.data)?;
        Ok(self.data.len())
    }
}
