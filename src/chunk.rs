//! Chunk types and functions
#![allow(non_upper_case_globals)]
#![allow(non_snake_case)]
use core::fmt;
use std::io::{self, Read, Write};

use crate::common::{BitDepth, ColorType, ScaledFloat};
use crate::decoder::{DecodingError, FormatError};
use crate::traits::{ReadBytesExt, WriteBytesExt};

/// Largest chunk payload a PNG may declare.
pub const MAX_CHUNK_LEN: u32 = (1 << 31) - 1;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkType(pub [u8; 4]);

// -- Critical chunks --

/// Image header
pub const IHDR: ChunkType = ChunkType(*b"IHDR");
/// Palette
pub const PLTE: ChunkType = ChunkType(*b"PLTE");
/// Image data
pub const IDAT: ChunkType = ChunkType(*b"IDAT");
/// Image trailer
pub const IEND: ChunkType = ChunkType(*b"IEND");

// -- Ancillary chunks --

/// Transparency
pub const tRNS: ChunkType = ChunkType(*b"tRNS");
/// Background colour
pub const bKGD: ChunkType = ChunkType(*b"bKGD");
/// Source system's gamma value
pub const gAMA: ChunkType = ChunkType(*b"gAMA");

// -- Chunk type determination --

/// Returns true if the chunk is critical.
pub fn is_critical(ChunkType(type_): ChunkType) -> bool {
    type_[0] & 32 == 0
}

/// Returns true if the chunk is private.
pub fn is_private(ChunkType(type_): ChunkType) -> bool {
    type_[1] & 32 != 0
}

/// Checks whether the reserved bit of the chunk name is set.
/// If it is set the chunk name is invalid.
pub fn reserved_set(ChunkType(type_): ChunkType) -> bool {
    type_[2] & 32 != 0
}

/// Returns true if the chunk is safe to copy if unknown.
pub fn safe_to_copy(ChunkType(type_): ChunkType) -> bool {
    type_[3] & 32 != 0
}

/// Chunk names are restricted to ASCII letters.
pub fn is_valid(ChunkType(type_): ChunkType) -> bool {
    type_.iter().all(u8::is_ascii_alphabetic)
}

impl fmt::Debug for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        struct DebugType([u8; 4]);

        impl fmt::Debug for DebugType {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                for &c in &self.0[..] {
                    write!(f, "{}", char::from(c).escape_debug())?;
                }
                Ok(())
            }
        }

        f.debug_struct("ChunkType")
            .field("type", &DebugType(self.0))
            .field("critical", &is_critical(*self))
            .field("private", &is_private(*self))
            .field("reserved", &reserved_set(*self))
            .field("safecopy", &safe_to_copy(*self))
            .finish()
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for &c in &self.0[..] {
            write!(f, "{}", char::from(c).escape_default())?;
        }
        Ok(())
    }
}

/// CRC-32 over the chunk name followed by its payload.
pub fn crc(chunk: ChunkType, data: &[u8]) -> u32 {
    let mut crc = crc32fast::Hasher::new();
    crc.update(&chunk.0);
    crc.update(data);
    crc.finalize()
}

pub fn encode_chunk<W: Write>(w: &mut W, chunk: ChunkType, data: &[u8]) -> io::Result<()> {
    let len = u32::try_from(data.len())
        .ok()
        .filter(|&len| len <= MAX_CHUNK_LEN)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} payload of {} bytes is too long", chunk, data.len()),
            )
        })?;
    w.write_be(len)?;
    w.write_all(&chunk.0)?;
    w.write_all(data)?;
    w.write_be(crc(chunk, data))
}

/// Reads one complete chunk and verifies its checksum.
pub fn read_chunk<R: Read>(r: &mut R) -> Result<(ChunkType, Vec<u8>), DecodingError> {
    let length: u32 = r.read_be()?;
    if length > MAX_CHUNK_LEN {
        return Err(FormatError::InvalidChunkLength(length).into());
    }

    let mut type_ = [0; 4];
    r.read_exact(&mut type_)?;
    let chunk = ChunkType(type_);
    if !is_valid(chunk) {
        return Err(FormatError::InvalidChunkType(chunk).into());
    }

    // Never trust the declared length for an up-front allocation.
    let mut data = Vec::new();
    r.by_ref().take(u64::from(length)).read_to_end(&mut data)?;
    if data.len() != length as usize {
        return Err(DecodingError::TruncatedStream);
    }

    let stored: u32 = r.read_be()?;
    let computed = crc(chunk, &data);
    if stored != computed {
        return Err(DecodingError::Checksum {
            chunk,
            stored,
            computed,
        });
    }

    Ok((chunk, data))
}

pub fn IHDR_encode<W: Write>(
    w: &mut W,
    width: u32,
    height: u32,
    bit_depth: BitDepth,
    color_type: ColorType,
    interlaced: bool,
) -> io::Result<()> {
    let mut data = [0; 13];
    data[..4].copy_from_slice(&width.to_be_bytes());
    data[4..8].copy_from_slice(&height.to_be_bytes());
    data[8] = bit_depth as u8;
    data[9] = color_type as u8;
    // compression method and filter method stay 0
    data[12] = interlaced as u8;
    encode_chunk(w, IHDR, &data)
}

/// Encodes a color as one big endian `u16` per component, the layout shared by `tRNS` and
/// `bKGD` for non-palette images.
fn encode_color<W: Write>(w: &mut W, chunk: ChunkType, color: &[u16]) -> io::Result<()> {
    let mut data = Vec::with_capacity(2 * color.len());
    for &sample in color {
        data.write_be(sample)?;
    }
    encode_chunk(w, chunk, &data)
}

pub fn tRNS_encode<W: Write>(w: &mut W, color: &[u16]) -> io::Result<()> {
    encode_color(w, tRNS, color)
}

pub fn bKGD_encode<W: Write>(w: &mut W, color: &[u16]) -> io::Result<()> {
    encode_color(w, bKGD, color)
}

pub fn gAMA_encode<W: Write>(w: &mut W, gamma: ScaledFloat) -> io::Result<()> {
    encode_chunk(w, gAMA, &gamma.into_scaled().to_be_bytes())
}

/// Parses the payload of a `tRNS` or `bKGD` chunk for an image with `components` color
/// components.
pub fn parse_color(
    chunk: ChunkType,
    data: &[u8],
    components: usize,
) -> Result<Vec<u16>, DecodingError> {
    if data.len() != 2 * components {
        return Err(FormatError::InvalidChunkPayload {
            chunk,
            len: data.len(),
        }
        .into());
    }
    Ok(data
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}

pub fn parse_gAMA(data: &[u8]) -> Result<ScaledFloat, DecodingError> {
    let bytes: [u8; 4] = data.try_into().map_err(|_| FormatError::InvalidChunkPayload {
        chunk: gAMA,
        len: data.len(),
    })?;
    Ok(ScaledFloat::from_scaled(u32::from_be_bytes(bytes)))
}
