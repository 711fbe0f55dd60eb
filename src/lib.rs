//! # PNG encoder and decoder
//! This crate writes PNG files from raw pixel buffers and reads a subset of them back.
//!
//! ## The encoder
//! [`Encoder`] collects the shape of an image: size, greyscale or color, alpha, 8 or 16 bit
//! samples, Adam7 interlacing and the optional `tRNS`, `bKGD` and `gAMA` metadata. Calling
//! [`Encoder::build`] validates all of it at once and returns a [`Writer`], which can then write
//! any number of images of that shape to anything implementing `std::io::Write`.
//!
//! ```
//! let mut encoder = pngcodec::Encoder::new(2, 1); // Width is 2 pixels and height is 1.
//! encoder.set_alpha(true).set_gamma(1.0 / 2.2);
//! let writer = encoder.build().unwrap();
//!
//! let data = [255, 0, 0, 255, 0, 0, 0, 255]; // An RGBA sequence: a red and a black pixel.
//! let mut png = Vec::new();
//! writer.write_image(&mut png, &data).unwrap();
//! ```
//!
//! Rows can also be handed over one at a time with [`Writer::write_rows`], and an alpha plane
//! stored apart from the color samples with [`Writer::write_planes`]. Image data is compressed
//! as it arrives and written in `IDAT` chunks of bounded size, see
//! [`Encoder::set_chunk_limit`].
//!
//! ## The decoder
//! [`Decoder`] wraps a `std::io::Read` and serves as a builder for [`Reader`]. Calling
//! [`Decoder::read_info`] reads until the image data is reached. The decoder handles 8-bit RGB
//! images without interlacing and reports everything else as [`UnsupportedFormat`].
//!
//! ```
//! # let mut png = Vec::new();
//! # pngcodec::encode(&mut png, 2, 1, &[255, 0, 0, 0, 0, 255]).unwrap();
//! let reader = pngcodec::Decoder::new(&png[..]).read_info().unwrap();
//! assert_eq!(reader.info().size(), (2, 1));
//! let pixels = reader.read_image().unwrap();
//! assert_eq!(pixels, [255, 0, 0, 0, 0, 255]);
//! ```

#![forbid(unsafe_code)]

mod adam7;
pub mod chunk;
mod common;
mod decoder;
mod encoder;
mod filter;
mod interleave;
mod traits;

#[cfg(feature = "benchmarks")]
pub mod benchable_apis;

pub use crate::adam7::{expand_pass, Adam7Info, Adam7Iterator, PASSES};
pub use crate::common::*;
pub use crate::decoder::{Decoder, DecodingError, FormatError, Reader, UnsupportedFormat};
pub use crate::encoder::{encode, Encoder, EncodingError, Writer, DEFAULT_CHUNK_LIMIT};
pub use crate::filter::RowFilter;
pub use crate::interleave::interleave;
