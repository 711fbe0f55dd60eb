use std::io::{self, Write};

use flate2::{Compress, Compression, FlushCompress, Status};

use crate::chunk::{self, IDAT};
use crate::filter::RowFilter;

/// Default number of buffered scanline bytes that triggers a new `IDAT` chunk.
pub const DEFAULT_CHUNK_LIMIT: usize = 1 << 20;

/// Spare output capacity offered to the compressor on each call.
const OUT_RESERVE: usize = 32 * 1024;

/// Compresses filtered scanlines into one zlib stream, split over `IDAT` chunks.
///
/// Scanlines are buffered until more than `chunk_limit` bytes are waiting, then compressed, and
/// whatever output the compressor released so far is written as one chunk. Only the chunk
/// boundaries depend on the limit, the concatenated chunk payloads are the same zlib stream.
pub(crate) struct IdatWriter<W: Write> {
    w: W,
    compress: Compress,
    in_buf: Vec<u8>,
    out_buf: Vec<u8>,
    chunk_limit: usize,
    chunks: usize,
}

impl<W: Write> IdatWriter<W> {
    pub fn new(w: W, compression: Compression, chunk_limit: usize) -> Self {
        IdatWriter {
            w,
            compress: Compress::new(compression, true),
            in_buf: Vec::new(),
            out_buf: Vec::new(),
            chunk_limit,
            chunks: 0,
        }
    }

    /// Queues one scanline, prefixed with its filter type byte.
    pub fn write_scanline(&mut self, filter: RowFilter, line: &[u8]) -> io::Result<()> {
        self.in_buf.push(filter as u8);
        self.in_buf.extend_from_slice(line);
        if self.in_buf.len() > self.chunk_limit {
            self.compress_buffered(false)?;
        }
        Ok(())
    }

    /// Flushes the compressor, writes the last chunk and returns the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.compress_buffered(true)?;
        log::trace!(
            "zlib stream finished: {} bytes in, {} bytes out, {} IDAT chunks",
            self.compress.total_in(),
            self.compress.total_out(),
            self.chunks
        );
        Ok(self.w)
    }

    fn compress_buffered(&mut self, finish: bool) -> io::Result<()> {
        let flush = if finish {
            FlushCompress::Finish
        } else {
            FlushCompress::None
        };

        let mut consumed = 0;
        loop {
            self.out_buf.reserve(OUT_RESERVE);
            let before = self.compress.total_in();
            let status = self
                .compress
                .compress_vec(&self.in_buf[consumed..], &mut self.out_buf, flush)
                .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
            consumed += (self.compress.total_in() - before) as usize;

            let done = if finish {
                matches!(status, Status::StreamEnd)
            } else {
                consumed == self.in_buf.len()
            };
            if done {
                break;
            }
        }

        self.in_buf.clear();
        self.emit()
    }

    fn emit(&mut self) -> io::Result<()> {
        if self.out_buf.is_empty() {
            return Ok(());
        }
        chunk::encode_chunk(&mut self.w, IDAT, &self.out_buf)?;
        log::trace!("wrote IDAT chunk of {} bytes", self.out_buf.len());
        self.chunks += 1;
        self.out_buf.clear();
        Ok(())
    }
}
