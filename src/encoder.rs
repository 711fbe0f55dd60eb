use std::io::{self, Write};
use std::{error, fmt, result};

use flate2::Compression;

use crate::chunk::{self, IEND};
use crate::common::{ColorModel, ConfigurationError, Info, ScaledFloat, SIGNATURE};
use crate::filter::RowFilter;
use crate::interleave::interleave;

mod deflate;
mod scanlines;

pub use self::deflate::DEFAULT_CHUNK_LIMIT;
use self::deflate::IdatWriter;
use self::scanlines::Scanlines;

pub type Result<T = ()> = result::Result<T, EncodingError>;

#[derive(Debug)]
pub enum EncodingError {
    IoError(io::Error),
    Configuration(ConfigurationError),
    /// Pixel data of the wrong length, in bytes.
    SizeMismatch {
        expected: usize,
        actual: usize,
    },
}

impl error::Error for EncodingError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            EncodingError::IoError(err) => Some(err),
            EncodingError::Configuration(err) => Some(err),
            EncodingError::SizeMismatch { .. } => None,
        }
    }
}

impl fmt::Display for EncodingError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        match self {
            Self::IoError(err) => write!(fmt, "{}", err),
            Self::Configuration(err) => write!(fmt, "{}", err),
            Self::SizeMismatch { expected, actual } => {
                write!(fmt, "Expected {} bytes, found {} bytes", expected, actual)
            }
        }
    }
}

impl From<io::Error> for EncodingError {
    fn from(err: io::Error) -> Self {
        Self::IoError(err)
    }
}

impl From<ConfigurationError> for EncodingError {
    fn from(err: ConfigurationError) -> Self {
        Self::Configuration(err)
    }
}

impl From<EncodingError> for io::Error {
    fn from(err: EncodingError) -> Self {
        match err {
            EncodingError::IoError(err) => err,
            err => Self::new(io::ErrorKind::Other, err),
        }
    }
}

/// Collects the settings of an image before anything is written.
///
/// The defaults describe an 8-bit RGB image without interlacing or metadata. Nothing is checked
/// until [`Encoder::build`], which turns the settings into a [`Writer`].
#[derive(Clone, Debug)]
pub struct Encoder {
    width: u32,
    height: u32,
    greyscale: bool,
    alpha: bool,
    bytes_per_sample: u8,
    interlaced: bool,
    transparent: Option<Vec<u16>>,
    background: Option<Vec<u16>>,
    gamma: Option<f64>,
    compression_level: Option<u8>,
    chunk_limit: usize,
}

impl Encoder {
    pub fn new(width: u32, height: u32) -> Self {
        Encoder {
            width,
            height,
            greyscale: false,
            alpha: false,
            bytes_per_sample: 1,
            interlaced: false,
            transparent: None,
            background: None,
            gamma: None,
            compression_level: None,
            chunk_limit: DEFAULT_CHUNK_LIMIT,
        }
    }

    /// One grey sample per pixel instead of red, green and blue.
    pub fn set_greyscale(&mut self, greyscale: bool) -> &mut Self {
        self.greyscale = greyscale;
        self
    }

    /// Adds an alpha sample to every pixel.
    pub fn set_alpha(&mut self, alpha: bool) -> &mut Self {
        self.alpha = alpha;
        self
    }

    /// Width of a single sample: 1 for 8-bit, 2 for 16-bit big-endian samples.
    pub fn set_bytes_per_sample(&mut self, bytes: u8) -> &mut Self {
        self.bytes_per_sample = bytes;
        self
    }

    /// Stores the pixels in Adam7 order.
    pub fn set_interlaced(&mut self, interlaced: bool) -> &mut Self {
        self.interlaced = interlaced;
        self
    }

    /// Marks one color as fully transparent (`tRNS`).
    ///
    /// Takes one component for greyscale images and three for color images. Can not be combined
    /// with an alpha channel.
    pub fn set_transparent(&mut self, color: &[u16]) -> &mut Self {
        self.transparent = Some(color.to_vec());
        self
    }

    /// Suggests a color to show the image against (`bKGD`).
    pub fn set_background(&mut self, color: &[u16]) -> &mut Self {
        self.background = Some(color.to_vec());
        self
    }

    /// Records the gamma of the pixel data (`gAMA`).
    pub fn set_gamma(&mut self, gamma: f64) -> &mut Self {
        self.gamma = Some(gamma);
        self
    }

    /// zlib level from 1 (fastest) to 9 (smallest). Unset uses the compressor default.
    pub fn set_compression_level(&mut self, level: u8) -> &mut Self {
        self.compression_level = Some(level);
        self
    }

    /// Buffered scanline bytes after which an `IDAT` chunk is written.
    ///
    /// This bounds the memory used while streaming and decides how the compressed stream is
    /// split, but never changes the stream itself.
    pub fn set_chunk_limit(&mut self, limit: usize) -> &mut Self {
        self.chunk_limit = limit;
        self
    }

    /// Validates the settings and returns a writer for them.
    pub fn build(&self) -> Result<Writer> {
        if self.width == 0 {
            return Err(ConfigurationError::ZeroWidth.into());
        }
        if self.height == 0 {
            return Err(ConfigurationError::ZeroHeight.into());
        }

        let model = ColorModel::resolve(
            self.greyscale,
            self.alpha,
            self.bytes_per_sample,
            self.transparent.is_some(),
        )?;
        for color in self.transparent.iter().chain(&self.background) {
            check_color(model, color)?;
        }

        let gamma = match self.gamma {
            Some(gamma) => {
                Some(ScaledFloat::new(gamma).ok_or(ConfigurationError::InvalidGamma(gamma))?)
            }
            None => None,
        };

        if let Some(level) = self.compression_level {
            if !(1..=9).contains(&level) {
                return Err(ConfigurationError::InvalidCompressionLevel(level).into());
            }
        }

        let info = Info {
            width: self.width,
            height: self.height,
            color_type: model.color_type,
            bit_depth: model.bit_depth,
            interlaced: self.interlaced,
            transparent: self.transparent.clone(),
            background: self.background.clone(),
            gamma,
            compression_level: self.compression_level,
        };

        if info.checked_raw_bytes().is_none() {
            return Err(ConfigurationError::ImageTooLarge {
                width: info.width,
                height: info.height,
            }
            .into());
        }

        Ok(Writer {
            info,
            chunk_limit: self.chunk_limit,
        })
    }
}

fn check_color(model: ColorModel, color: &[u16]) -> result::Result<(), ConfigurationError> {
    let expected = model.color_type.color_components();
    if color.len() != expected {
        return Err(ConfigurationError::ComponentCount {
            expected,
            found: color.len(),
        });
    }
    let max = model.bit_depth.max_sample();
    match color.iter().find(|&&value| value > max) {
        Some(&value) => Err(ConfigurationError::ComponentOutOfRange { value, max }),
        None => Ok(()),
    }
}

/// Writes PNG files for one validated image descriptor.
///
/// A writer is immutable and can be used for any number of images of the same shape. Every
/// write produces a complete file: signature, header and metadata chunks, image data, `IEND`.
/// Pixels are packed big-endian, `bytes_per_pixel * width` bytes per row, rows top to bottom.
#[derive(Clone, Debug)]
pub struct Writer {
    info: Info,
    chunk_limit: usize,
}

impl Writer {
    pub fn info(&self) -> &Info {
        &self.info
    }

    /// Number of bytes a full raster for this writer must have.
    pub fn image_len(&self) -> usize {
        self.info.row_bytes() * self.info.height as usize
    }

    /// Writes an image from a flat raster buffer.
    pub fn write_image<W: Write>(&self, w: W, pixels: &[u8]) -> Result<()> {
        let expected = self.image_len();
        if pixels.len() != expected {
            return Err(EncodingError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }

        let mut idat = self.start(w)?;
        for line in Scanlines::new(pixels, &self.info) {
            idat.write_scanline(RowFilter::NoFilter, &line)?;
        }
        self.finish(idat)
    }

    /// Writes an image from rows handed over one at a time.
    ///
    /// Sequential images are compressed as the rows arrive. A row of the wrong length or a
    /// wrong number of rows is reported when it is found, by then part of the file may already
    /// be written. Interlaced images need every row before the first pass can be written, so
    /// they are collected and checked before anything is written.
    pub fn write_rows<W, I>(&self, w: W, rows: I) -> Result<()>
    where
        W: Write,
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        if self.info.interlaced {
            let mut pixels = Vec::with_capacity(self.image_len());
            for row in rows {
                let row = row.as_ref();
                self.check_row(row, pixels.len())?;
                pixels.extend_from_slice(row);
            }
            return self.write_image(w, &pixels);
        }

        let mut idat = self.start(w)?;
        let mut written = 0;
        for row in rows {
            let row = row.as_ref();
            self.check_row(row, written)?;
            idat.write_scanline(RowFilter::NoFilter, row)?;
            written += row.len();
        }
        if written != self.image_len() {
            return Err(EncodingError::SizeMismatch {
                expected: self.image_len(),
                actual: written,
            });
        }
        self.finish(idat)
    }

    /// Writes an image whose alpha samples are stored apart from the color samples.
    ///
    /// `alpha` holds one sample per pixel, `color` the remaining samples of each pixel.
    pub fn write_planes<W: Write>(&self, w: W, color: &[u8], alpha: &[u8]) -> Result<()> {
        if !self.info.color_type.has_alpha() {
            return Err(ConfigurationError::MissingAlpha.into());
        }
        let sample = self.info.bit_depth.bytes_per_sample();
        let pixel = self.info.bytes_per_pixel().into_usize();
        let pixels = interleave(
            color,
            alpha,
            self.info.width,
            self.info.height,
            pixel - sample,
            sample,
        )?;
        self.write_image(w, &pixels)
    }

    fn check_row(&self, row: &[u8], received: usize) -> Result<()> {
        let row_bytes = self.info.row_bytes();
        if row.len() != row_bytes {
            return Err(EncodingError::SizeMismatch {
                expected: row_bytes,
                actual: row.len(),
            });
        }
        if received + row.len() > self.image_len() {
            return Err(EncodingError::SizeMismatch {
                expected: self.image_len(),
                actual: received + row.len(),
            });
        }
        Ok(())
    }

    fn start<W: Write>(&self, mut w: W) -> Result<IdatWriter<W>> {
        log::debug!(
            "writing {}x{} {:?} image, {} bit, interlaced: {}",
            self.info.width,
            self.info.height,
            self.info.color_type,
            self.info.bit_depth as u8,
            self.info.interlaced
        );
        w.write_all(&SIGNATURE)?;
        self.info.encode(&mut w)?;

        let compression = self
            .info
            .compression_level
            .map_or_else(Compression::default, |level| {
                Compression::new(u32::from(level))
            });
        Ok(IdatWriter::new(w, compression, self.chunk_limit))
    }

    fn finish<W: Write>(&self, idat: IdatWriter<W>) -> Result<()> {
        let mut w = idat.finish()?;
        chunk::encode_chunk(&mut w, IEND, &[])?;
        w.flush()?;
        Ok(())
    }
}

/// Writes an 8-bit RGB image with default settings.
pub fn encode<W: Write>(w: W, width: u32, height: u32, pixels: &[u8]) -> Result<()> {
    Encoder::new(width, height).build()?.write_image(w, pixels)
}
