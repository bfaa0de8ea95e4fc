//! Git delta instruction stream.
//!
//! A delta starts with two LEB128 sizes (base, result) followed by
//! instructions: a byte with the high bit set copies a range of the base,
//! a non-zero byte without it inserts that many literal bytes.

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DeltaError {
    #[error("delta stream truncated")]
    Truncated,
    #[error("size varint overflows 64 bits")]
    VarintOverflow,
    #[error("base is {actual} bytes, delta expects {expected}")]
    BaseSizeMismatch { expected: usize, actual: usize },
    #[error("copy range {offset}+{size} exceeds base")]
    CopyOutOfRange { offset: usize, size: usize },
    #[error("output would exceed declared result size")]
    OutputOverrun,
    #[error("result is {actual} bytes, delta declares {expected}")]
    ResultSizeMismatch { expected: usize, actual: usize },
    #[error("reserved instruction 0")]
    ReservedCommand,
}

fn read_varint(data: &[u8], pos: &mut usize) -> Result<u64, DeltaError> {
    let mut result = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *data.get(*pos).ok_or(DeltaError::Truncated)?;
        *pos += 1;
        result |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift > 63 {
            return Err(DeltaError::VarintOverflow);
        }
    }
}

/// Reconstruct an object from its base and a delta.
pub fn apply_delta(base: &[u8], delta: &[u8]) -> Result<Vec<u8>, DeltaError> {
    let mut pos = 0usize;
    let base_size = read_varint(delta, &mut pos)? as usize;
    let result_size = read_varint(delta, &mut pos)? as usize;
    if base_size != base.len() {
        return Err(DeltaError::BaseSizeMismatch {
            expected: base_size,
            actual: base.len(),
        });
    }

    // The declared size is untrusted: reserve at most 1 MiB up front.
    let mut out = Vec::with_capacity(result_size.min(1 << 20));
    while pos < delta.len() {
        let cmd = delta[pos];
        pos += 1;

        if cmd & 0x80 != 0 {
            // Bits 0-3 select offset bytes, bits 4-6 select size bytes,
            // both little-endian.
            let mut offset = 0usize;
            let mut size = 0usize;
            for bit in 0..4 {
                if cmd & (1 << bit) != 0 {
                    let byte = *delta.get(pos).ok_or(DeltaError::Truncated)?;
                    offset |= usize::from(byte) << (8 * bit);
                    pos += 1;
                }
            }
            for bit in 0..3 {
                if cmd & (0x10 << bit) != 0 {
                    let byte = *delta.get(pos).ok_or(DeltaError::Truncated)?;
                    size |= usize::from(byte) << (8 * bit);
                    pos += 1;
                }
            }
            if size == 0 {
                size = 0x10000;
            }
            let chunk = offset
                .checked_add(size)
                .and_then(|end| base.get(offset..end))
                .ok_or(DeltaError::CopyOutOfRange { offset, size })?;
            if out.len() + chunk.len() > result_size {
                return Err(DeltaError::OutputOverrun);
            }
            out.extend_from_slice(chunk);
        } else if cmd != 0 {
            let size = usize::from(cmd);
            let chunk = delta.get(pos..pos + size).ok_or(DeltaError::Truncated)?;
            if out.len() + size > result_size {
                return Err(DeltaError::OutputOverrun);
            }
            out.extend_from_slice(chunk);
            pos += size;
        } else {
            return Err(DeltaError::ReservedCommand);
        }
    }

    if out.len() != result_size {
        return Err(DeltaError::ResultSizeMismatch {
            expected: result_size,
            actual: out.len(),
        });
    }
    Ok(out)
}

#[cfg(any(test, feature = "testing"))]
pub(crate) fn encode_varint(mut n: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (n & 0x7f) as u8;
        n >>= 7;
        if n == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(base: usize, result: usize) -> Vec<u8> {
        let mut out = Vec::new();
        encode_varint(base as u64, &mut out);
        encode_varint(result as u64, &mut out);
        out
    }

    #[test]
    fn copy_then_insert() {
        let base = b"hello world";
        let mut delta = header(base.len(), 11);
        // copy offset 0, size 6: "hello "
        delta.extend_from_slice(&[0x80 | 0x10, 6]);
        delta.push(5);
        delta.extend_from_slice(b"there");
        assert_eq!(apply_delta(base, &delta).unwrap(), b"hello there");
    }

    #[test]
    fn copy_with_offset_bytes() {
        let base = b"0123456789";
        let mut delta = header(base.len(), 3);
        delta.extend_from_slice(&[0x80 | 0x01 | 0x10, 4, 3]);
        assert_eq!(apply_delta(base, &delta).unwrap(), b"456");
    }

    #[test]
    fn zero_size_means_64k() {
        let base = vec![7u8; 0x10000];
        let mut delta = header(base.len(), 0x10000);
        delta.push(0x80);
        assert_eq!(apply_delta(&base, &delta).unwrap().len(), 0x10000);
    }

    #[test]
    fn base_size_checked() {
        let delta = header(4, 0);
        assert_eq!(
            apply_delta(b"abc", &delta),
            Err(DeltaError::BaseSizeMismatch {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn copy_past_base_rejected() {
        let mut delta = header(3, 5);
        delta.extend_from_slice(&[0x80 | 0x10, 5]);
        assert!(matches!(
            apply_delta(b"abc", &delta),
            Err(DeltaError::CopyOutOfRange { .. })
        ));
    }

    #[test]
    fn short_result_rejected() {
        let mut delta = header(3, 5);
        delta.extend_from_slice(&[1, b'x']);
        assert!(matches!(
            apply_delta(b"abc", &delta),
            Err(DeltaError::ResultSizeMismatch { .. })
        ));
    }

    #[test]
    fn truncated_insert_rejected() {
        let mut delta = header(0, 4);
        delta.extend_from_slice(&[4, b'a']);
        assert_eq!(apply_delta(b"", &delta), Err(DeltaError::Truncated));
    }

    #[test]
    fn command_zero_rejected() {
        let mut delta = header(0, 0);
        delta.push(0);
        assert_eq!(apply_delta(b"", &delta), Err(DeltaError::ReservedCommand));
    }

    #[test]
    fn huge_declared_result_is_an_error() {
        // base 0, result u64::MAX, no instructions
        let mut delta = vec![0x00];
        delta.extend_from_slice(&[0xff; 9]);
        delta.push(0x01);
        assert!(matches!(
            apply_delta(b"", &delta),
            Err(DeltaError::ResultSizeMismatch { actual: 0, .. })
        ));
    }
}
