use crate::common::BytesPerPixel;

mod paeth;

use self::paeth::filter_paeth;

/// The byte level filter applied to scanlines to prepare them for compression.
///
/// Compression in general benefits from repetitive data. The filter is a content-aware method of
/// compressing the range of occurring byte values to help the compression algorithm. Note that
/// this does not operate on pixels but on raw bytes of a scanline.
///
/// Details on how each filter works can be found in the [PNG Book](http://www.libpng.org/pub/png/book/chapter09.html).
///
/// The writer always emits `NoFilter`; the reader reverses all five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RowFilter {
    #[default]
    NoFilter = 0,
    Sub = 1,
    Up = 2,
    Avg = 3,
    Paeth = 4,
}

impl RowFilter {
    pub fn from_u8(n: u8) -> Option<Self> {
        match n {
            0 => Some(Self::NoFilter),
            1 => Some(Self::Sub),
            2 => Some(Self::Up),
            3 => Some(Self::Avg),
            4 => Some(Self::Paeth),
            _ => None,
        }
    }
}

/// Reconstructs `current` in place from its filtered bytes.
///
/// `previous` is the already reconstructed row above, or empty for the first row of an image.
/// Bytes left of the first pixel and above the first row read as zero.
pub(crate) fn unfilter(
    mut filter: RowFilter,
    tbpp: BytesPerPixel,
    previous: &[u8],
    current: &mut [u8],
) {
    use self::RowFilter::*;
    let bpp = tbpp.into_usize();
    debug_assert!(previous.is_empty() || previous.len() == current.len());

    // If the previous row is empty, then treat it as if it were filled with zeros.
    if previous.is_empty() {
        if filter == Paeth {
            filter = Sub;
        } else if filter == Up {
            filter = NoFilter;
        }
    }

    match filter {
        NoFilter => {}
        Sub => {
            for i in bpp..current.len() {
                current[i] = current[i].wrapping_add(current[i - bpp]);
            }
        }
        Up => {
            for (curr, &above) in current.iter_mut().zip(previous) {
                *curr = curr.wrapping_add(above);
            }
        }
        Avg if previous.is_empty() => {
            for i in bpp..current.len() {
                current[i] = current[i].wrapping_add(current[i - bpp] / 2);
            }
        }
        Avg => {
            for (curr, &above) in current.iter_mut().zip(previous).take(bpp) {
                *curr = curr.wrapping_add(above / 2);
            }
            for i in bpp..current.len() {
                let left = u16::from(current[i - bpp]);
                let above = u16::from(previous[i]);
                current[i] = current[i].wrapping_add(((left + above) / 2) as u8);
            }
        }
        Paeth => {
            // Paeth filter pixels:
            // C B D
            // A X
            for (curr, &above) in current.iter_mut().zip(previous).take(bpp) {
                *curr = curr.wrapping_add(filter_paeth(0, above, 0));
            }
            for i in bpp..current.len() {
                let a = current[i - bpp];
                let b = previous[i];
                let c = previous[i - bpp];
                current[i] = current[i].wrapping_add(filter_paeth(a, b, c));
            }
        }
    }
}
