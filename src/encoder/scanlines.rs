use std::borrow::Cow;
use std::slice::ChunksExact;

use crate::adam7::Adam7Iterator;
use crate::common::Info;

enum Order<'a> {
    Sequential(ChunksExact<'a, u8>),
    Interlaced(Adam7Iterator),
}

/// The scanlines of a raster buffer in the order they are stored in the file.
///
/// Sequential images yield each row of the buffer as is. Interlaced images yield the rows of the
/// seven Adam7 passes, each a freshly packed selection of pixels, except where a pass covers a
/// whole row.
pub(crate) struct Scanlines<'a> {
    data: &'a [u8],
    row_bytes: usize,
    bpp: usize,
    order: Order<'a>,
}

impl<'a> Scanlines<'a> {
    /// `data` must hold exactly `info.row_bytes() * info.height` bytes.
    pub fn new(data: &'a [u8], info: &Info) -> Self {
        let row_bytes = info.row_bytes();
        debug_assert_eq!(Some(data.len()), info.checked_raw_bytes());

        let order = if info.interlaced {
            Order::Interlaced(Adam7Iterator::new(info.width, info.height))
        } else {
            Order::Sequential(data.chunks_exact(row_bytes))
        };

        Scanlines {
            data,
            row_bytes,
            bpp: info.bytes_per_pixel().into_usize(),
            order,
        }
    }
}

impl<'a> Iterator for Scanlines<'a> {
    type Item = Cow<'a, [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.order {
            Order::Sequential(rows) => rows.next().map(Cow::Borrowed),
            Order::Interlaced(passes) => {
                let info = passes.next()?;
                let start = info.image_row() as usize * self.row_bytes;
                let row = &self.data[start..][..self.row_bytes];
                let line_len = info.width() as usize * self.bpp;

                // Only possible when the pass samples every column.
                if line_len == self.row_bytes {
                    return Some(Cow::Borrowed(row));
                }

                let mut line = Vec::with_capacity(line_len);
                for x in info.image_columns() {
                    line.extend_from_slice(&row[x as usize * self.bpp..][..self.bpp]);
                }
                Some(Cow::Owned(line))
            }
        }
    }
}
