//! Common types shared between the encoder and decoder
use std::io::{self, Write};
use std::{error, fmt};

use crate::chunk;

/// The eight bytes every PNG file starts with.
pub const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Color type of the image data, as stored in the `IHDR` chunk.
///
/// Indexed (palette) images are not supported by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColorType {
    Grayscale = 0,
    Rgb = 2,
    GrayscaleAlpha = 4,
    Rgba = 6,
}

impl ColorType {
    /// Returns the number of samples used per pixel encoded in this way.
    pub fn samples(self) -> usize {
        use self::ColorType::*;
        match self {
            Grayscale => 1,
            GrayscaleAlpha => 2,
            Rgb => 3,
            Rgba => 4,
        }
    }

    /// Picks the color type for a greyscale or color image, with or without an alpha channel.
    pub fn from_flags(greyscale: bool, alpha: bool) -> ColorType {
        match (greyscale, alpha) {
            (true, false) => ColorType::Grayscale,
            (true, true) => ColorType::GrayscaleAlpha,
            (false, false) => ColorType::Rgb,
            (false, true) => ColorType::Rgba,
        }
    }

    /// u8 -> Self. Returns `None` for codes this crate does not handle, including palettes.
    pub fn from_u8(n: u8) -> Option<ColorType> {
        match n {
            0 => Some(ColorType::Grayscale),
            2 => Some(ColorType::Rgb),
            4 => Some(ColorType::GrayscaleAlpha),
            6 => Some(ColorType::Rgba),
            _ => None,
        }
    }

    pub fn is_greyscale(self) -> bool {
        matches!(self, ColorType::Grayscale | ColorType::GrayscaleAlpha)
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, ColorType::GrayscaleAlpha | ColorType::Rgba)
    }

    /// Number of components a transparent or background color needs for this color type.
    pub fn color_components(self) -> usize {
        if self.is_greyscale() {
            1
        } else {
            3
        }
    }
}

/// Bit depth of the png file. Only whole-byte samples are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BitDepth {
    Eight = 8,
    Sixteen = 16,
}

impl BitDepth {
    /// u8 -> Self. Returns `None` for sub-byte and invalid depths.
    pub fn from_u8(n: u8) -> Option<BitDepth> {
        match n {
            8 => Some(BitDepth::Eight),
            16 => Some(BitDepth::Sixteen),
            _ => None,
        }
    }

    pub fn from_bytes_per_sample(n: u8) -> Option<BitDepth> {
        match n {
            1 => Some(BitDepth::Eight),
            2 => Some(BitDepth::Sixteen),
            _ => None,
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            BitDepth::Eight => 1,
            BitDepth::Sixteen => 2,
        }
    }

    /// Largest value a single sample can hold.
    pub fn max_sample(self) -> u16 {
        match self {
            BitDepth::Eight => u16::from(u8::MAX),
            BitDepth::Sixteen => u16::MAX,
        }
    }
}

/// The number of bytes per complete pixel (`psize`). Filters look this many bytes to the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BytesPerPixel {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Six = 6,
    Eight = 8,
}

impl BytesPerPixel {
    pub(crate) fn from_usize(bpp: usize) -> Self {
        match bpp {
            1 => BytesPerPixel::One,
            2 => BytesPerPixel::Two,
            3 => BytesPerPixel::Three,
            4 => BytesPerPixel::Four,
            6 => BytesPerPixel::Six,
            8 => BytesPerPixel::Eight,
            _ => unreachable!("Not a possible byte rounded pixel width"),
        }
    }

    pub fn into_usize(self) -> usize {
        self as usize
    }
}

/// Result of resolving the color flags of an image descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorModel {
    pub color_type: ColorType,
    pub bit_depth: BitDepth,
}

impl ColorModel {
    /// Derives the wire color type and sample depth.
    ///
    /// `transparent` tells whether a transparent color key was requested as well, which is
    /// meaningless next to a full alpha channel.
    pub fn resolve(
        greyscale: bool,
        alpha: bool,
        bytes_per_sample: u8,
        transparent: bool,
    ) -> Result<ColorModel, ConfigurationError> {
        let bit_depth = BitDepth::from_bytes_per_sample(bytes_per_sample)
            .ok_or(ConfigurationError::InvalidBytesPerSample(bytes_per_sample))?;
        if alpha && transparent {
            return Err(ConfigurationError::AlphaWithTransparent);
        }
        Ok(ColorModel {
            color_type: ColorType::from_flags(greyscale, alpha),
            bit_depth,
        })
    }

    /// Byte stride of one pixel.
    pub fn bytes_per_pixel(&self) -> BytesPerPixel {
        BytesPerPixel::from_usize(self.color_type.samples() * self.bit_depth.bytes_per_sample())
    }
}

/// Gamma value stored as fixed point with a scale of 100000, the way `gAMA` stores it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScaledFloat(u32);

impl ScaledFloat {
    const SCALING: f64 = 100_000.0;

    /// Returns `None` if the value is not positive or does not survive scaling.
    pub fn new(value: f64) -> Option<Self> {
        if !value.is_finite() || value <= 0.0 {
            return None;
        }
        let scaled = (value * Self::SCALING).round();
        if scaled < 1.0 || scaled > f64::from(u32::MAX) {
            None
        } else {
            Some(ScaledFloat(scaled as u32))
        }
    }

    pub fn from_scaled(val: u32) -> Self {
        ScaledFloat(val)
    }

    pub fn into_scaled(self) -> u32 {
        self.0
    }

    pub fn into_value(self) -> f64 {
        f64::from(self.0) / Self::SCALING
    }
}

/// Image descriptor shared by the writer and the reader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Info {
    pub width: u32,
    pub height: u32,
    pub color_type: ColorType,
    pub bit_depth: BitDepth,
    pub interlaced: bool,
    /// Color key, one sample per color component.
    pub transparent: Option<Vec<u16>>,
    pub background: Option<Vec<u16>>,
    pub gamma: Option<ScaledFloat>,
    /// zlib level `1..=9`, `None` picks the compressor default.
    pub compression_level: Option<u8>,
}

impl Info {
    /// An 8-bit RGB, non-interlaced descriptor without metadata.
    pub fn new(width: u32, height: u32) -> Info {
        Info {
            width,
            height,
            color_type: ColorType::Rgb,
            bit_depth: BitDepth::Eight,
            interlaced: false,
            transparent: None,
            background: None,
            gamma: None,
            compression_level: None,
        }
    }

    /// Size of the image
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn color_model(&self) -> ColorModel {
        ColorModel {
            color_type: self.color_type,
            bit_depth: self.bit_depth,
        }
    }

    /// Returns the bytes per pixel
    pub fn bytes_per_pixel(&self) -> BytesPerPixel {
        self.color_model().bytes_per_pixel()
    }

    /// Returns the number of sample bytes in one full row, without the filter byte.
    pub fn row_bytes(&self) -> usize {
        self.row_bytes_from_width(self.width)
    }

    /// Returns the number of sample bytes in a row of width `width`, without the filter byte.
    pub fn row_bytes_from_width(&self, width: u32) -> usize {
        width as usize * self.bytes_per_pixel().into_usize()
    }

    /// Returns the number of bytes needed for one deinterlaced row, including the filter byte.
    pub fn raw_row_length(&self) -> usize {
        self.row_bytes() + 1
    }

    /// Returns the size of the whole raster, or `None` if it does not fit in memory.
    pub fn checked_raw_bytes(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.bytes_per_pixel().into_usize())?
            .checked_mul(self.height as usize)
    }

    /// Writes the `IHDR` chunk followed by the metadata chunks that are set.
    pub(crate) fn encode<W: Write>(&self, mut w: W) -> io::Result<()> {
        chunk::IHDR_encode(
            &mut w,
            self.width,
            self.height,
            self.bit_depth,
            self.color_type,
            self.interlaced,
        )?;

        if let Some(transparent) = &self.transparent {
            chunk::tRNS_encode(&mut w, transparent)?;
        }

        if let Some(background) = &self.background {
            chunk::bKGD_encode(&mut w, background)?;
        }

        if let Some(gamma) = self.gamma {
            chunk::gAMA_encode(&mut w, gamma)?;
        }

        Ok(())
    }
}

/// An image descriptor that cannot be encoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigurationError {
    ZeroWidth,
    ZeroHeight,
    ImageTooLarge { width: u32, height: u32 },
    InvalidBytesPerSample(u8),
    AlphaWithTransparent,
    ComponentCount { expected: usize, found: usize },
    ComponentOutOfRange { value: u16, max: u16 },
    InvalidGamma(f64),
    InvalidCompressionLevel(u8),
    MissingAlpha,
}

impl error::Error for ConfigurationError {}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use self::ConfigurationError::*;
        match self {
            ZeroWidth => write!(fmt, "Image width must be greater than zero"),
            ZeroHeight => write!(fmt, "Image height must be greater than zero"),
            ImageTooLarge { width, height } => {
                write!(fmt, "An image of {}x{} pixels does not fit in memory", width, height)
            }
            InvalidBytesPerSample(n) => {
                write!(fmt, "Samples must be 1 or 2 bytes wide, got {}", n)
            }
            AlphaWithTransparent => write!(
                fmt,
                "A transparent color can not be combined with an alpha channel"
            ),
            ComponentCount { expected, found } => write!(
                fmt,
                "Expected a color with {} components, found {}",
                expected, found
            ),
            ComponentOutOfRange { value, max } => write!(
                fmt,
                "Color component {} exceeds the maximum sample value {}",
                value, max
            ),
            InvalidGamma(g) => write!(fmt, "Gamma must be a positive number, got {}", g),
            InvalidCompressionLevel(l) => {
                write!(fmt, "Compression level must be within 1..=9, got {}", l)
            }
            MissingAlpha => write!(fmt, "An alpha plane was supplied for an image without alpha"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_model_table() {
        let cases = [
            (true, false, 0, 1),
            (true, true, 4, 2),
            (false, false, 2, 3),
            (false, true, 6, 4),
        ];
        for &(grey, alpha, code, channels) in cases.iter() {
            for bytes in 1..=2u8 {
                let model = ColorModel::resolve(grey, alpha, bytes, false).unwrap();
                assert_eq!(model.color_type as u8, code);
                assert_eq!(model.color_type.samples(), channels);
                assert_eq!(
                    model.bytes_per_pixel().into_usize(),
                    channels * usize::from(bytes)
                );
            }
        }
    }

    #[test]
    fn color_model_rejects_invalid_sample_width() {
        for bytes in [0u8, 3, 4, 8] {
            assert_eq!(
                ColorModel::resolve(false, false, bytes, false),
                Err(ConfigurationError::InvalidBytesPerSample(bytes))
            );
        }
    }

    #[test]
    fn color_model_rejects_alpha_with_transparent() {
        assert_eq!(
            ColorModel::resolve(true, true, 1, true),
            Err(ConfigurationError::AlphaWithTransparent)
        );
        assert!(ColorModel::resolve(true, false, 1, true).is_ok());
    }

    #[test]
    fn scaled_float() {
        assert_eq!(ScaledFloat::new(0.45455).map(ScaledFloat::into_scaled), Some(45455));
        assert_eq!(ScaledFloat::new(2.2).map(ScaledFloat::into_scaled), Some(220000));
        assert_eq!(ScaledFloat::new(0.000004).map(ScaledFloat::into_scaled), None);
        assert_eq!(ScaledFloat::new(0.0), None);
        assert_eq!(ScaledFloat::new(-1.0), None);
        assert_eq!(ScaledFloat::new(f64::NAN), None);
        assert_eq!(ScaledFloat::new(1e9), None);
        assert_eq!(ScaledFloat::from_scaled(100000).into_value(), 1.0);
    }

    #[test]
    fn raw_sizes() {
        let mut info = Info::new(5, 3);
        assert_eq!(info.row_bytes(), 15);
        assert_eq!(info.raw_row_length(), 16);
        assert_eq!(info.checked_raw_bytes(), Some(45));
        info.bit_depth = BitDepth::Sixteen;
        info.color_type = ColorType::Rgba;
        assert_eq!(info.row_bytes(), 40);
        assert_eq!(info.checked_raw_bytes(), Some(120));
    }
}
