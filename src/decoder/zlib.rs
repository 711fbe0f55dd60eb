use super::{DecodingError, FormatError};

use fdeflate::{DecompressionError, Decompressor};

/// Smallest step the output buffer grows by.
const GROWTH_BYTES: usize = 32 * 1024;

/// Inflates the zlib stream carried by the `IDAT` chunks.
///
/// The payloads are fed in file order, chunk boundaries carry no meaning. Output stops at the
/// size promised by the header, anything the stream holds beyond that is ignored. The buffer
/// grows with the data actually decompressed, so a header claiming a huge image does not
/// allocate up front.
pub(super) struct ZlibStream {
    state: Box<Decompressor>,
    out: Vec<u8>,
    filled: usize,
    limit: usize,
}

impl ZlibStream {
    pub(crate) fn new(limit: usize) -> Self {
        let mut state = Box::new(Decompressor::new());
        // Every payload byte is already covered by a chunk CRC.
        state.ignore_adler32();
        ZlibStream {
            state,
            out: Vec::new(),
            filled: 0,
            limit,
        }
    }

    fn is_complete(&self) -> bool {
        self.state.is_done() || self.filled == self.limit
    }

    /// Decompresses as much of `data` as the stream and the output limit allow.
    pub(crate) fn decompress(&mut self, mut data: &[u8]) -> Result<(), DecodingError> {
        while !data.is_empty() && !self.is_complete() {
            let (consumed, produced) = self.read(data, false)?;
            data = &data[consumed..];
            if consumed == 0 && produced == 0 {
                break;
            }
        }
        Ok(())
    }

    /// Drains the decompressor once all image data was fed.
    ///
    /// Fails with `TruncatedStream` when the stream ends before the promised size.
    pub(crate) fn finish(mut self) -> Result<Vec<u8>, DecodingError> {
        while !self.is_complete() {
            let (_, produced) = self.read(&[], true)?;
            if produced == 0 {
                break;
            }
        }

        if self.filled < self.limit {
            return Err(DecodingError::TruncatedStream);
        }
        self.out.truncate(self.filled);
        Ok(self.out)
    }

    fn read(&mut self, input: &[u8], end_of_input: bool) -> Result<(usize, usize), DecodingError> {
        if self.filled == self.out.len() {
            let len = self
                .limit
                .min(self.out.len().saturating_mul(2).max(GROWTH_BYTES));
            self.out.resize(len, 0);
        }

        let (consumed, produced) = self
            .state
            .read(input, &mut self.out, self.filled, end_of_input)
            .map_err(|err| match err {
                DecompressionError::InsufficientInput => DecodingError::TruncatedStream,
                err => FormatError::CorruptFlateStream { err }.into(),
            })?;
        self.filled += produced;
        Ok((consumed, produced))
    }
}
