use std::fs::File;
use std::io;
use std::path::Path;
use std::str::FromStr;

use nom::bytes::complete::tag;
use nom::character::complete::{digit1, line_ending, space0};
use nom::combinator::{map, map_res, opt};
use nom::multi::many_m_n;
use nom::sequence::{preceded, terminated, tuple};

use crate::common::*;

/// Rescales a 6-bit VGA DAC channel (0-63) to 8 bits.
pub const VGA_DAC_SCALE: f64 = 255.0 / 63.0;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn gray(value: u8) -> Self {
        Self {
            r: value,
            g: value,
            b: value,
        }
    }
}

fn distance(a: Color, b: Color) -> f64 {
    let dr = f64::from(a.r) - f64::from(b.r);
    let dg = f64::from(a.g) - f64::from(b.g);
    let db = f64::from(a.b) - f64::from(b.b);
    (dr * dr + dg * dg + db * db).sqrt()
}

/// An ordered, fixed-length, read-only sequence of colors.
///
/// Implementors provide `len` and `get`; everything else is derived.
/// There are no mutating operations, palettes are immutable once built.
pub trait Palette {
    fn len(&self) -> usize;

    /// Color at `index`, or `None` past the end.
    fn get(&self, index: usize) -> Option<Color>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Like `get`, but an out-of-range index is an error.
    fn color_at(&self, index: usize) -> Result<Color> {
        self.get(index).ok_or(Error::OutOfRange {
            index,
            len: self.len(),
        })
    }

    fn contains(&self, color: Color) -> bool {
        self.index_of(color).is_some()
    }

    /// Index of the first entry equal to `color`.
    fn index_of(&self, color: Color) -> Option<usize> {
        (0..self.len()).find(|&i| self.get(i) == Some(color))
    }

    /// Copies all entries into `dest` starting at `offset`.
    fn copy_to(&self, dest: &mut [Color], offset: usize) -> Result<()> {
        let end = offset + self.len();
        if end > dest.len() {
            return Err(Error::OutOfRange {
                index: end,
                len: dest.len(),
            });
        }
        for i in 0..self.len() {
            dest[offset + i] = self.color_at(i)?;
        }
        Ok(())
    }

    fn to_vec(&self) -> Vec<Color> {
        (0..self.len()).filter_map(|i| self.get(i)).collect()
    }

    /// Index of the entry nearest to `target` by euclidean RGB distance.
    ///
    /// An exact match returns immediately; otherwise the first entry at
    /// the minimum distance wins. `None` only for an empty palette.
    fn nearest_color_index(&self, target: Color) -> Option<usize> {
        // above the ~441.7 diagonal of the RGB cube
        let mut best_distance = 500.0;
        let mut best = None;
        for i in 0..self.len() {
            if let Some(color) = self.get(i) {
                let d = distance(color, target);
                if d == 0.0 {
                    return Some(i);
                }
                if d < best_distance {
                    best_distance = d;
                    best = Some(i);
                }
            }
        }
        best
    }

    /// Iterates the entries in index order. Restart by calling again.
    fn colors(&self) -> Colors<'_>
    where
        Self: Sized,
    {
        Colors {
            palette: self,
            index: 0,
        }
    }
}

pub struct Colors<'a> {
    palette: &'a dyn Palette,
    index: usize,
}

impl<'a> Colors<'a> {
    pub fn new(palette: &'a dyn Palette) -> Self {
        Self { palette, index: 0 }
    }
}

impl Iterator for Colors<'_> {
    type Item = Color;

    fn next(&mut self) -> Option<Color> {
        let color = self.palette.get(self.index)?;
        self.index += 1;
        Some(color)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.palette.len() - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Colors<'_> {}

/// Palette backed by an owned list of colors.
pub struct List {
    colors: Vec<Color>,
}

impl List {
    pub fn new(colors: Vec<Color>) -> Self {
        Self { colors }
    }
}

impl Palette for List {
    fn len(&self) -> usize {
        self.colors.len()
    }

    fn get(&self, index: usize) -> Option<Color> {
        self.colors.get(index).copied()
    }

    fn copy_to(&self, dest: &mut [Color], offset: usize) -> Result<()> {
        let end = offset + self.colors.len();
        if end > dest.len() {
            return Err(Error::OutOfRange {
                index: end,
                len: dest.len(),
            });
        }
        dest[offset..end].copy_from_slice(&self.colors);
        Ok(())
    }

    fn to_vec(&self) -> Vec<Color> {
        self.colors.clone()
    }
}

impl GameResource for List {
    fn save(&self, output: &mut dyn io::Write) -> Result<usize> {
        for color in &self.colors {
            output.write_all(&[color.r, color.g, color.b])?;
        }
        Ok(self.colors.len() * 3)
    }
}

/// Procedural black-to-white palette, 256 entries, no backing storage.
pub struct Grayscale;

impl Palette for Grayscale {
    fn len(&self) -> usize {
        256
    }

    fn get(&self, index: usize) -> Option<Color> {
        if index < 256 {
            Some(Color::gray(index as u8))
        } else {
            None
        }
    }
}

/// Two palettes seen as one, left entries first. Borrows both.
pub struct Join<'a> {
    left: &'a dyn Palette,
    right: &'a dyn Palette,
}

pub fn join<'a>(left: &'a dyn Palette, right: &'a dyn Palette) -> Join<'a> {
    Join { left, right }
}

impl Palette for Join<'_> {
    fn len(&self) -> usize {
        self.left.len() + self.right.len()
    }

    fn get(&self, index: usize) -> Option<Color> {
        if index < self.left.len() {
            self.left.get(index)
        } else {
            self.right.get(index - self.left.len())
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub enum Format {
    /// 3 bytes per color, R then G then B.
    Binary,
    /// One line per color, three decimal channels 0-255.
    Text,
    /// As `Text`, but channels are VGA DAC values 0-63.
    TextDos,
}

pub fn load(mut input: impl io::Read, num_colors: usize, format: Format) -> Result<List> {
    match format {
        Format::Binary => {
            let mut colors = Vec::with_capacity(num_colors);
            for _ in 0..num_colors {
                let [r, g, b] = read_buf(&mut input, [0u8; 3])?;
                colors.push(Color { r, g, b });
            }
            Ok(List::new(colors))
        }
        Format::Text | Format::TextDos => {
            let mut text = String::new();
            input.read_to_string(&mut text)?;
            let (_, mut colors) =
                many_m_n(num_colors, num_colors, color_line)(text.as_str())
                    .map_err(|err| nom_error(&text, err))?;
            if let Format::TextDos = format {
                for color in &mut colors {
                    *color = scale_dac(*color);
                }
            }
            Ok(List::new(colors))
        }
    }
}

pub fn load_file(path: impl AsRef<Path>, num_colors: usize, format: Format) -> Result<List> {
    load(File::open(path)?, num_colors, format)
}

/// Loads a JASC-PAL file: `JASC-PAL`, `0100`, a color count, then
/// `Text`-format lines.
pub fn load_jasc(mut input: impl io::Read) -> Result<List> {
    let mut text = String::new();
    input.read_to_string(&mut text)?;

    let rest = magic_line(&text, "JASC-PAL")?;
    let rest = magic_line(rest, "0100")?;
    let (rest, num_colors) =
        terminated(uint::<usize>, line_ending)(rest).map_err(|err| nom_error(rest, err))?;
    let (_, colors) = many_m_n(num_colors, num_colors, color_line)(rest)
        .map_err(|err| nom_error(rest, err))?;
    Ok(List::new(colors))
}

/// Binary decode of a raw `N * 3` byte palette block.
pub fn read_palette(data: &[u8]) -> Result<List> {
    read_palette_stream(data, data.len())
}

/// As `read_palette`, reading `length` bytes from a stream.
pub fn read_palette_stream(input: impl io::Read, length: usize) -> Result<List> {
    if length % 3 != 0 {
        return Err(Error::Malformed(format!(
            "palette length {} is not a multiple of 3",
            length
        )));
    }
    load(input, length / 3, Format::Binary)
}

fn scale_dac(color: Color) -> Color {
    let scale = |v: u8| (f64::from(v) * VGA_DAC_SCALE).round() as u8;
    Color {
        r: scale(color.r),
        g: scale(color.g),
        b: scale(color.b),
    }
}

type NomError<'a> = nom::error::VerboseError<&'a str>;
type NomResult<'a, O> = nom::IResult<&'a str, O, NomError<'a>>;

fn nom_error(input: &str, err: nom::Err<NomError>) -> Error {
    match err {
        nom::Err::Incomplete(_) => Error::Malformed("truncated palette text".to_string()),
        nom::Err::Error(error) | nom::Err::Failure(error) => {
            Error::Malformed(nom::error::convert_error(input, error))
        }
    }
}

fn uint<T: FromStr>(input: &str) -> NomResult<T> {
    map_res(terminated(digit1, space0), T::from_str)(input)
}

fn color_line(input: &str) -> NomResult<Color> {
    map(
        terminated(preceded(space0, tuple((uint, uint, uint))), opt(line_ending)),
        |(r, g, b)| Color { r, g, b },
    )(input)
}

/// The whole line must be exactly `magic`.
fn magic_line<'a>(input: &'a str, magic: &'static str) -> Result<&'a str> {
    let parsed: NomResult<&str> = terminated(tag(magic), line_ending)(input);
    match parsed {
        Ok((rest, _)) => Ok(rest),
        Err(_) => Err(Error::Signature(magic)),
    }
}
