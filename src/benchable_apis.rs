//! Development-time-only helper module for exporting private APIs so that they can be benchmarked.
//! This module is gated behind the "benchmarks" feature.

use crate::common::BytesPerPixel;
use crate::filter::RowFilter;

/// Re-exporting `unfilter` to make it easier to benchmark, despite some items being only
/// `pub(crate)`: `fn unfilter`, `BytesPerPixel::from_usize`.
pub fn unfilter(filter: RowFilter, tbpp: u8, previous: &[u8], current: &mut [u8]) {
    let tbpp = BytesPerPixel::from_usize(usize::from(tbpp));
    crate::filter::unfilter(filter, tbpp, previous, current)
}
