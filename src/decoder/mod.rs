mod zlib;

use self::zlib::ZlibStream;

use std::io::{self, Read};
use std::{error, fmt};

use crate::chunk::{self, ChunkType, IDAT, IEND, IHDR, PLTE};
use crate::common::{BitDepth, ColorType, Info, SIGNATURE};
use crate::filter::{unfilter, RowFilter};

/// An error that occurred while reading a PNG file.
#[derive(Debug)]
pub enum DecodingError {
    IoError(io::Error),
    /// A chunk's stored CRC does not match its contents.
    Checksum {
        chunk: ChunkType,
        stored: u32,
        computed: u32,
    },
    /// The input ended before the data it promised.
    TruncatedStream,
    /// A well formed file this decoder does not handle.
    UnsupportedFormat(UnsupportedFormat),
    Format(FormatError),
}

/// A valid header value outside of what the decoder handles.
///
/// Only 8-bit RGB images without interlacing are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedFormat {
    BitDepth(u8),
    ColorType(u8),
    CompressionMethod(u8),
    FilterMethod(u8),
    InterlaceMethod(u8),
    /// A critical chunk the decoder does not know, which can not be skipped.
    CriticalChunk(ChunkType),
}

/// The file breaks the structure of a PNG.
#[derive(Debug)]
pub enum FormatError {
    InvalidSignature,
    /// The first chunk is not `IHDR`, carries the type found instead.
    MissingIhdr(ChunkType),
    DuplicateIhdr,
    /// `IEND` came before any `IDAT`.
    MissingImageData,
    InvalidFilterType(u8),
    CorruptFlateStream {
        err: fdeflate::DecompressionError,
    },
    InvalidChunkLength(u32),
    InvalidChunkType(ChunkType),
    /// A chunk with a payload of the wrong size.
    InvalidChunkPayload {
        chunk: ChunkType,
        len: usize,
    },
    ZeroDimension,
}

impl error::Error for DecodingError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            DecodingError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for DecodingError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::IoError(err) => write!(fmt, "{}", err),
            Self::Checksum {
                chunk,
                stored,
                computed,
            } => write!(
                fmt,
                "CRC error in {} chunk: stored {:#010x}, computed {:#010x}",
                chunk, stored, computed
            ),
            Self::TruncatedStream => write!(fmt, "Unexpected end of data"),
            Self::UnsupportedFormat(what) => write!(fmt, "{}", what),
            Self::Format(err) => write!(fmt, "{}", err),
        }
    }
}

impl fmt::Display for UnsupportedFormat {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::BitDepth(n) => write!(fmt, "Unsupported bit depth {}", n),
            Self::ColorType(n) => write!(fmt, "Unsupported color type {}", n),
            Self::CompressionMethod(n) => write!(fmt, "Unknown compression method {}", n),
            Self::FilterMethod(n) => write!(fmt, "Unknown filter method {}", n),
            Self::InterlaceMethod(n) => write!(fmt, "Unsupported interlace method {}", n),
            Self::CriticalChunk(chunk) => write!(fmt, "Unknown critical chunk {}", chunk),
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use self::FormatError::*;
        match self {
            InvalidSignature => write!(fmt, "Invalid PNG signature."),
            MissingIhdr(found) => write!(fmt, "Expected IHDR as first chunk, found {}.", found),
            DuplicateIhdr => write!(fmt, "Found a second IHDR chunk."),
            MissingImageData => write!(fmt, "IDAT chunk missing."),
            InvalidFilterType(n) => write!(fmt, "Invalid filter method ({}).", n),
            CorruptFlateStream { err } => {
                write!(fmt, "Corrupt deflate stream. ")?;
                write!(fmt, "{:?}", err)
            }
            InvalidChunkLength(len) => write!(fmt, "Chunk length {} exceeds 2^31-1.", len),
            InvalidChunkType(chunk) => write!(fmt, "Invalid chunk type {:?}.", chunk),
            InvalidChunkPayload { chunk, len } => {
                write!(fmt, "Payload of {} bytes is invalid for a {} chunk.", len, chunk)
            }
            ZeroDimension => write!(fmt, "Image width and height must be greater than zero."),
        }
    }
}

impl From<io::Error> for DecodingError {
    fn from(err: io::Error) -> DecodingError {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            DecodingError::TruncatedStream
        } else {
            DecodingError::IoError(err)
        }
    }
}

impl From<FormatError> for DecodingError {
    fn from(err: FormatError) -> DecodingError {
        DecodingError::Format(err)
    }
}

impl From<UnsupportedFormat> for DecodingError {
    fn from(err: UnsupportedFormat) -> DecodingError {
        DecodingError::UnsupportedFormat(err)
    }
}

impl From<DecodingError> for io::Error {
    fn from(err: DecodingError) -> io::Error {
        match err {
            DecodingError::IoError(err) => err,
            DecodingError::TruncatedStream => {
                io::Error::new(io::ErrorKind::UnexpectedEof, err.to_string())
            }
            err => io::Error::new(io::ErrorKind::InvalidData, err.to_string()),
        }
    }
}

/// PNG Decoder
pub struct Decoder<R: Read> {
    r: R,
}

impl<R: Read> Decoder<R> {
    pub fn new(r: R) -> Decoder<R> {
        Decoder { r }
    }

    /// Reads the signature and every chunk up to the first `IDAT`.
    ///
    /// The header must describe an image the decoder supports, the known metadata chunks are
    /// parsed into the returned reader's [`Info`].
    pub fn read_info(mut self) -> Result<Reader<R>, DecodingError> {
        let mut signature = [0; 8];
        self.r.read_exact(&mut signature)?;
        if signature != SIGNATURE {
            return Err(FormatError::InvalidSignature.into());
        }

        let (chunk, data) = chunk::read_chunk(&mut self.r)?;
        if chunk != IHDR {
            return Err(FormatError::MissingIhdr(chunk).into());
        }
        let mut info = parse_ihdr(&data)?;
        log::debug!(
            "reading {}x{} {:?} image, {} bit",
            info.width,
            info.height,
            info.color_type,
            info.bit_depth as u8
        );

        loop {
            let (chunk, data) = chunk::read_chunk(&mut self.r)?;
            match chunk {
                IDAT => {
                    return Ok(Reader {
                        r: self.r,
                        info,
                        first_idat: data,
                    })
                }
                IEND => return Err(FormatError::MissingImageData.into()),
                _ => read_metadata(&mut info, chunk, &data)?,
            }
        }
    }
}

/// Handles a chunk between `IHDR` and the image data.
fn read_metadata(info: &mut Info, chunk: ChunkType, data: &[u8]) -> Result<(), DecodingError> {
    let components = info.color_type.color_components();
    match chunk {
        IHDR => return Err(FormatError::DuplicateIhdr.into()),
        chunk::tRNS => info.transparent = Some(chunk::parse_color(chunk, data, components)?),
        chunk::bKGD => info.background = Some(chunk::parse_color(chunk, data, components)?),
        chunk::gAMA => info.gamma = Some(chunk::parse_gAMA(data)?),
        // Only a suggestion for truecolor images.
        PLTE => log::debug!("ignoring PLTE chunk of {} bytes", data.len()),
        _ if chunk::is_critical(chunk) => {
            return Err(UnsupportedFormat::CriticalChunk(chunk).into())
        }
        _ => log::debug!("skipping ancillary chunk {} of {} bytes", chunk, data.len()),
    }
    Ok(())
}

fn parse_ihdr(data: &[u8]) -> Result<Info, DecodingError> {
    let invalid = || FormatError::InvalidChunkPayload {
        chunk: IHDR,
        len: data.len(),
    };
    let header: &[u8; 13] = data.try_into().map_err(|_| invalid())?;

    let width = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let height = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    let [bit_depth, color_type, compression, filter, interlace] = [
        header[8], header[9], header[10], header[11], header[12],
    ];

    if width == 0 || height == 0 {
        return Err(FormatError::ZeroDimension.into());
    }

    let bit_depth = match BitDepth::from_u8(bit_depth) {
        Some(BitDepth::Eight) => BitDepth::Eight,
        _ => return Err(UnsupportedFormat::BitDepth(bit_depth).into()),
    };
    let color_type = match ColorType::from_u8(color_type) {
        Some(ColorType::Rgb) => ColorType::Rgb,
        _ => return Err(UnsupportedFormat::ColorType(color_type).into()),
    };
    if compression != 0 {
        return Err(UnsupportedFormat::CompressionMethod(compression).into());
    }
    if filter != 0 {
        return Err(UnsupportedFormat::FilterMethod(filter).into());
    }
    if interlace != 0 {
        return Err(UnsupportedFormat::InterlaceMethod(interlace).into());
    }

    let mut info = Info::new(width, height);
    info.bit_depth = bit_depth;
    info.color_type = color_type;
    Ok(info)
}

/// PNG reader, positioned at the image data.
pub struct Reader<R: Read> {
    r: R,
    info: Info,
    first_idat: Vec<u8>,
}

impl<R: Read> Reader<R> {
    /// Get information on the image.
    pub fn info(&self) -> &Info {
        &self.info
    }

    /// Returns the number of bytes required to hold the decoded image.
    pub fn output_buffer_size(&self) -> usize {
        self.info.row_bytes() * self.info.height as usize
    }

    /// Decodes the image data and returns the pixels, `row_bytes` per row, top to bottom.
    ///
    /// Reads up to and including `IEND`. Chunks after the first `IDAT` other than further
    /// image data are checked but otherwise ignored.
    pub fn read_image(mut self) -> Result<Vec<u8>, DecodingError> {
        let raw_len = self
            .info
            .raw_row_length()
            .checked_mul(self.info.height as usize)
            .ok_or_else(|| io::Error::new(io::ErrorKind::OutOfMemory, "image too large"))?;

        let mut zlib = ZlibStream::new(raw_len);
        zlib.decompress(&self.first_idat)?;
        log::trace!("IDAT chunk of {} bytes", self.first_idat.len());
        self.first_idat = Vec::new();

        loop {
            let (chunk, data) = chunk::read_chunk(&mut self.r)?;
            match chunk {
                IDAT => {
                    log::trace!("IDAT chunk of {} bytes", data.len());
                    zlib.decompress(&data)?;
                }
                IEND => break,
                _ if chunk::is_critical(chunk) && chunk != PLTE => {
                    return Err(UnsupportedFormat::CriticalChunk(chunk).into())
                }
                _ => log::debug!("ignoring {} chunk after image data", chunk),
            }
        }

        let mut raw = zlib.finish()?;
        unfilter_rows(&mut raw, &self.info)?;
        Ok(strip_filter_bytes(raw, self.info.raw_row_length()))
    }
}

/// Reverses the filter of every row in place. Each row keeps its leading filter type byte.
fn unfilter_rows(raw: &mut [u8], info: &Info) -> Result<(), DecodingError> {
    let bpp = info.bytes_per_pixel();
    let mut previous: &[u8] = &[];
    for line in raw.chunks_exact_mut(info.raw_row_length()) {
        let filter = RowFilter::from_u8(line[0]).ok_or(FormatError::InvalidFilterType(line[0]))?;
        let row = &mut line[1..];
        unfilter(filter, bpp, previous, row);
        previous = row;
    }
    Ok(())
}

fn strip_filter_bytes(raw: Vec<u8>, row_len: usize) -> Vec<u8> {
    let mut pixels = raw;
    let mut out = 0;
    for start in (0..pixels.len()).step_by(row_len) {
        pixels.copy_within(start + 1..start + row_len, out);
        out += row_len - 1;
    }
    pixels.truncate(out);
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{encode, Encoder};
    use std::io::Cursor;

    fn ihdr(width: u32, height: u32, bit_depth: u8, color_type: u8, tail: [u8; 3]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&[bit_depth, color_type]);
        data.extend_from_slice(&tail);
        data
    }

    fn file(chunks: &[(ChunkType, &[u8])]) -> Vec<u8> {
        let mut out = SIGNATURE.to_vec();
        for &(chunk, data) in chunks {
            chunk::encode_chunk(&mut out, chunk, data).unwrap();
        }
        out
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        use flate2::{write::ZlibEncoder, Compression};
        use std::io::Write;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn decode(data: Vec<u8>) -> Result<Vec<u8>, DecodingError> {
        Decoder::new(Cursor::new(data)).read_info()?.read_image()
    }

    #[test]
    fn all_filters_decode() {
        // 2x4 RGB, one filter per row. The first three rows reconstruct to 1..=18.
        let raw = [
            1, 1, 2, 3, 3, 3, 3, // Sub
            2, 6, 6, 6, 6, 6, 6, // Up
            3, 10, 10, 11, 5, 5, 5, // Avg: 13 - (0 + 7) / 2 = 10, 16 - (13 + 10) / 2 = 5
            0, 100, 101, 102, 103, 104, 105,
        ];
        let zlib = zlib(&raw);
        let header = ihdr(2, 4, 8, 2, [0, 0, 0]);
        let png = file(&[(IHDR, &header[..]), (IDAT, &zlib[..]), (IEND, &[][..])]);

        let pixels = decode(png).unwrap();
        assert_eq!(
            pixels,
            [
                1, 2, 3, 4, 5, 6, //
                7, 8, 9, 10, 11, 12, //
                13, 14, 15, 16, 17, 18, //
                100, 101, 102, 103, 104, 105,
            ]
        );
    }

    #[test]
    fn paeth_rows() {
        let raw = [
            4, 10, 20, 30, 1, 1, 1, // first row: Paeth acts as Sub
            4, 1, 1, 1, 1, 1, 1,
        ];
        let zlib = zlib(&raw);
        let header = ihdr(2, 2, 8, 2, [0, 0, 0]);
        let png = file(&[(IHDR, &header[..]), (IDAT, &zlib[..]), (IEND, &[][..])]);
        // row 1: column 0 predicts from above, column 1 from a = 11, b = 11, c = 10 -> 12
        assert_eq!(
            decode(png).unwrap(),
            [10, 20, 30, 11, 21, 31, 11, 21, 31, 12, 22, 32]
        );
    }

    #[test]
    fn metadata_and_skipped_chunks() {
        let mut encoder = Encoder::new(3, 2);
        encoder
            .set_transparent(&[1, 2, 3])
            .set_background(&[255, 255, 0])
            .set_gamma(1.0 / 2.2);
        let mut png = Vec::new();
        let pixels: Vec<u8> = (0..18).collect();
        encoder.build().unwrap().write_image(&mut png, &pixels).unwrap();

        // Splice an unknown ancillary chunk and a palette in front of the image data.
        let at = png.windows(4).position(|w| w == b"IDAT").unwrap() - 4;
        let mut extra = Vec::new();
        chunk::encode_chunk(&mut extra, ChunkType(*b"teXt"), b"hello").unwrap();
        chunk::encode_chunk(&mut extra, PLTE, &[0, 0, 0]).unwrap();
        png.splice(at..at, extra);

        let reader = Decoder::new(Cursor::new(png)).read_info().unwrap();
        assert_eq!(reader.info().transparent, Some(vec![1, 2, 3]));
        assert_eq!(reader.info().background, Some(vec![255, 255, 0]));
        assert_eq!(reader.info().gamma.map(|g| g.into_scaled()), Some(45455));
        assert_eq!(reader.output_buffer_size(), 18);
        assert_eq!(reader.read_image().unwrap(), pixels);
    }

    #[test]
    fn unknown_critical_chunk() {
        let header = ihdr(1, 1, 8, 2, [0, 0, 0]);
        let png = file(&[(IHDR, &header[..]), (ChunkType(*b"ABCD"), &[][..]), (IEND, &[][..])]);
        assert!(matches!(
            decode(png),
            Err(DecodingError::UnsupportedFormat(
                UnsupportedFormat::CriticalChunk(ChunkType(ty))
            )) if &ty == b"ABCD"
        ));
    }

    #[test]
    fn unsupported_headers() {
        let cases = [
            (ihdr(1, 1, 16, 2, [0, 0, 0]), UnsupportedFormat::BitDepth(16)),
            (ihdr(1, 1, 4, 2, [0, 0, 0]), UnsupportedFormat::BitDepth(4)),
            (ihdr(1, 1, 8, 6, [0, 0, 0]), UnsupportedFormat::ColorType(6)),
            (ihdr(1, 1, 8, 3, [0, 0, 0]), UnsupportedFormat::ColorType(3)),
            (ihdr(1, 1, 8, 0, [0, 0, 0]), UnsupportedFormat::ColorType(0)),
            (ihdr(1, 1, 8, 2, [1, 0, 0]), UnsupportedFormat::CompressionMethod(1)),
            (ihdr(1, 1, 8, 2, [0, 1, 0]), UnsupportedFormat::FilterMethod(1)),
            (ihdr(1, 1, 8, 2, [0, 0, 1]), UnsupportedFormat::InterlaceMethod(1)),
        ];
        for (header, expected) in cases {
            let png = file(&[(IHDR, &header[..]), (IEND, &[][..])]);
            match decode(png) {
                Err(DecodingError::UnsupportedFormat(found)) => assert_eq!(found, expected),
                other => panic!("expected {:?}, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn structural_errors() {
        let header = ihdr(1, 1, 8, 2, [0, 0, 0]);

        let mut png = file(&[(IHDR, &header[..]), (IEND, &[][..])]);
        png[1] = b'X';
        assert!(matches!(
            decode(png),
            Err(DecodingError::Format(FormatError::InvalidSignature))
        ));

        let png = file(&[(chunk::gAMA, &[0, 0, 0, 1][..]), (IHDR, &header[..])]);
        assert!(matches!(
            decode(png),
            Err(DecodingError::Format(FormatError::MissingIhdr(chunk::gAMA)))
        ));

        let png = file(&[(IHDR, &header[..]), (IEND, &[][..])]);
        assert!(matches!(
            decode(png),
            Err(DecodingError::Format(FormatError::MissingImageData))
        ));

        let png = file(&[(IHDR, &header[..12]), (IEND, &[][..])]);
        assert!(matches!(
            decode(png),
            Err(DecodingError::Format(FormatError::InvalidChunkPayload { len: 12, .. }))
        ));

        let png = file(&[(IHDR, &ihdr(0, 1, 8, 2, [0, 0, 0])[..]), (IEND, &[][..])]);
        assert!(matches!(
            decode(png),
            Err(DecodingError::Format(FormatError::ZeroDimension))
        ));

        let png = file(&[(IHDR, &header[..]), (chunk::gAMA, &[0, 1][..]), (IEND, &[][..])]);
        assert!(matches!(
            decode(png),
            Err(DecodingError::Format(FormatError::InvalidChunkPayload { len: 2, .. }))
        ));

        let png = file(&[(IHDR, &header[..]), (IHDR, &header[..]), (IEND, &[][..])]);
        assert!(matches!(
            decode(png),
            Err(DecodingError::Format(FormatError::DuplicateIhdr))
        ));
    }

    #[test]
    fn invalid_filter_type() {
        let zlib = zlib(&[5, 0, 0, 0]);
        let header = ihdr(1, 1, 8, 2, [0, 0, 0]);
        let png = file(&[(IHDR, &header[..]), (IDAT, &zlib[..]), (IEND, &[][..])]);
        assert!(matches!(
            decode(png),
            Err(DecodingError::Format(FormatError::InvalidFilterType(5)))
        ));
    }

    #[test]
    fn short_image_data() {
        let zlib = zlib(&[0, 1, 2, 3]);
        let header = ihdr(1, 2, 8, 2, [0, 0, 0]);
        let png = file(&[(IHDR, &header[..]), (IDAT, &zlib[..]), (IEND, &[][..])]);
        assert!(matches!(decode(png), Err(DecodingError::TruncatedStream)));
    }

    #[test]
    fn missing_iend() {
        let mut png = Vec::new();
        encode(&mut png, 4, 4, &[9; 48]).unwrap();
        png.truncate(png.len() - 12);
        assert!(matches!(decode(png), Err(DecodingError::TruncatedStream)));
    }

    #[test]
    fn data_after_iend_is_not_read() {
        let mut png = Vec::new();
        encode(&mut png, 1, 1, &[1, 2, 3]).unwrap();
        png.extend_from_slice(b"trailing garbage");
        assert_eq!(decode(png).unwrap(), [1, 2, 3]);
    }

    #[test]
    fn strip_rows() {
        let raw = vec![0, 1, 2, 0, 3, 4, 0, 5, 6];
        assert_eq!(strip_filter_bytes(raw, 3), [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn errors_convert_to_io() {
        let err: io::Error = DecodingError::TruncatedStream.into();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        let err: io::Error = DecodingError::Format(FormatError::InvalidSignature).into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
