//! Row-stride normalization.
//!
//! Pure byte reshaping with no I/O: rows captured at `src_stride` are laid
//! out again at `dst_stride`. Every row copy is bounded by
//! `min(src_stride, dst_stride)`, so neither a wider nor a narrower target
//! can spill one row into the next.

use std::borrow::Cow;

use bytes::Bytes;

use crate::errors::StrideError;

/// Reshape `src` (rows at `src_stride`) into rows at `dst_stride`.
///
/// Equal strides borrow the input unchanged. Otherwise the result is
/// `dst_stride × height` bytes, zero-initialised, with the first
/// `min(src_stride, dst_stride)` bytes of each row copied from the source.
pub fn normalize_rows(
    src: &[u8],
    src_stride: usize,
    dst_stride: usize,
    height: usize,
) -> Result<Cow<'_, [u8]>, StrideError> {
    check_source(src, src_stride, dst_stride, height)?;

    if src_stride == dst_stride {
        return Ok(Cow::Borrowed(src));
    }

    Ok(Cow::Owned(copy_rows(src, src_stride, dst_stride, height)?))
}

/// Owned variant of [`normalize_rows`] used on the reporting path.
///
/// Equal strides hand the source allocation over as [`Bytes`] without copying.
pub fn normalize_owned(
    src: Vec<u8>,
    src_stride: usize,
    dst_stride: usize,
    height: usize,
) -> Result<Bytes, StrideError> {
    check_source(&src, src_stride, dst_stride, height)?;

    if src_stride == dst_stride {
        return Ok(Bytes::from(src));
    }

    copy_rows(&src, src_stride, dst_stride, height).map(Bytes::from)
}

fn check_source(
    src: &[u8],
    src_stride: usize,
    dst_stride: usize,
    height: usize,
) -> Result<(), StrideError> {
    if src_stride == 0 || dst_stride == 0 {
        return Err(StrideError::ZeroStride { src_stride, dst_stride });
    }
    let required = src_stride
        .checked_mul(height)
        .ok_or(StrideError::Overflow { stride: src_stride, height })?;
    if src.len() < required {
        return Err(StrideError::SourceTooShort { actual: src.len(), required, height });
    }
    Ok(())
}

fn copy_rows(
    src: &[u8],
    src_stride: usize,
    dst_stride: usize,
    height: usize,
) -> Result<Vec<u8>, StrideError> {
    let dst_len = dst_stride
        .checked_mul(height)
        .ok_or(StrideError::Overflow { stride: dst_stride, height })?;
    let copy_width = src_stride.min(dst_stride);

    let mut out = vec![0u8; dst_len];
    for (dst_row, src_row) in out
        .chunks_exact_mut(dst_stride)
        .zip(src.chunks(src_stride))
        .take(height)
    {
        dst_row[..copy_width].copy_from_slice(&src_row[..copy_width]);
    }
    Ok(out)
}
