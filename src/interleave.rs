//! Merging of separately stored sample planes into one pixel stream.
use crate::common::ConfigurationError;
use crate::encoder::EncodingError;

/// Interleaves two planes pixel by pixel: `stride_a` bytes from `plane_a`, then `stride_b`
/// bytes from `plane_b`, for each of the `width * height` pixels.
///
/// Each plane must hold exactly `width * height * stride` bytes.
///
/// ```
/// let rgb = [1, 2, 3, 4, 5, 6];
/// let alpha = [7, 8];
/// let rgba = pngcodec::interleave(&rgb, &alpha, 2, 1, 3, 1).unwrap();
/// assert_eq!(rgba, [1, 2, 3, 7, 4, 5, 6, 8]);
/// ```
pub fn interleave(
    plane_a: &[u8],
    plane_b: &[u8],
    width: u32,
    height: u32,
    stride_a: usize,
    stride_b: usize,
) -> Result<Vec<u8>, EncodingError> {
    let too_large = || EncodingError::from(ConfigurationError::ImageTooLarge { width, height });
    let pixels = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(too_large)?;
    let len_a = pixels.checked_mul(stride_a).ok_or_else(too_large)?;
    let len_b = pixels.checked_mul(stride_b).ok_or_else(too_large)?;

    if plane_a.len() != len_a {
        return Err(EncodingError::SizeMismatch {
            expected: len_a,
            actual: plane_a.len(),
        });
    }
    if plane_b.len() != len_b {
        return Err(EncodingError::SizeMismatch {
            expected: len_b,
            actual: plane_b.len(),
        });
    }

    match (stride_a, stride_b) {
        (0, _) => return Ok(plane_b.to_vec()),
        (_, 0) => return Ok(plane_a.to_vec()),
        _ => {}
    }

    let mut combined = Vec::with_capacity(len_a + len_b);
    for (a, b) in plane_a
        .chunks_exact(stride_a)
        .zip(plane_b.chunks_exact(stride_b))
    {
        combined.extend_from_slice(a);
        combined.extend_from_slice(b);
    }
    Ok(combined)
}
