//! Delta coding for ordered integer sequences (part numbers, part sizes).
//!
//! A sequence is written as an array header followed by, for each element,
//! its signed difference from the previous element (the first is relative
//! to zero). Sequences need not be monotonic. Differences and running sums
//! that leave the `i64` range are errors, never wrapped.

use crate::config::DecodeLimits;
use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::error::{CodecError, CodecResult};

/// Successive differences of `values`, or `None` if one does not fit in `i64`.
pub fn to_deltas(values: &[i64]) -> Option<Vec<i64>> {
    let mut prev = 0i64;
    values
        .iter()
        .map(|&v| {
            let delta = v.checked_sub(prev)?;
            prev = v;
            Some(delta)
        })
        .collect()
}

/// Running sums of `deltas`, or `None` on overflow.
pub fn from_deltas(deltas: &[i64]) -> Option<Vec<i64>> {
    let mut acc = 0i64;
    deltas
        .iter()
        .map(|&d| {
            acc = acc.checked_add(d)?;
            Some(acc)
        })
        .collect()
}

/// Encode a sequence on its own: array header plus deltas.
///
/// No length limit applies; [`decode`] accepts anything this produces.
pub fn encode(values: &[i64]) -> CodecResult<Vec<u8>> {
    encode_with_limits(values, DecodeLimits::unbounded())
}

/// Encode a sequence, failing with `LimitExceeded` beyond `limits.max_parts`.
pub fn encode_with_limits(values: &[i64], limits: DecodeLimits) -> CodecResult<Vec<u8>> {
    let mut enc = Encoder::with_limits(limits);
    enc.write_deltas(values)?;
    Ok(enc.finish())
}

/// Decode a sequence written by [`encode`].
///
/// The declared length is bounded only by the bytes in `buf`.
pub fn decode(buf: &[u8]) -> CodecResult<Vec<i64>> {
    decode_with_limits(buf, DecodeLimits::unbounded())
}

pub fn decode_with_limits(buf: &[u8], limits: DecodeLimits) -> CodecResult<Vec<i64>> {
    let mut dec = Decoder::with_limits(buf, limits);
    let mut out = Vec::new();
    dec.read_deltas_into(&mut out)?;
    Ok(out)
}

impl Encoder {
    pub(crate) fn write_deltas(&mut self, values: &[i64]) -> CodecResult<()> {
        self.array_len("delta sequence", values.len(), self.limits().max_parts)?;
        let mut prev = 0i64;
        for (i, &v) in values.iter().enumerate() {
            let delta = v.checked_sub(prev).ok_or_else(|| CodecError::Overflow {
                path: self.path().at(i),
            })?;
            self.sint(delta)?;
            prev = v;
        }
        Ok(())
    }
}

impl Decoder<'_> {
    /// Decode a delta sequence into `out`, replacing its contents.
    ///
    /// A `nil` in place of the array reads as the empty sequence.
    pub(crate) fn read_deltas_into(&mut self, out: &mut Vec<i64>) -> CodecResult<()> {
        out.clear();
        if self.try_nil()? {
            return Ok(());
        }
        let len = self.read_array_header("delta sequence", self.limits().max_parts)?;
        out.reserve(len);
        let mut acc = 0i64;
        for i in 0..len {
            let delta = self.indexed(i, Self::read_i64)?;
            acc = acc
                .checked_add(delta)
                .ok_or_else(|| CodecError::Overflow {
                    path: self.path().at(i),
                })?;
            out.push(acc);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    #[test]
    fn consecutive_parts_become_ones() {
        assert_eq!(to_deltas(&[1, 2, 3, 4, 5]).unwrap(), vec![1, 1, 1, 1, 1]);
        assert_eq!(from_deltas(&[1, 1, 1, 1, 1]).unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn wire_bytes_for_consecutive_parts() {
        let buf = encode(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(buf, vec![0x95, 1, 1, 1, 1, 1]);
        assert_eq!(decode(&buf).unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn equal_sizes_collapse_to_zeros() {
        let sizes = vec![5_242_880; 4];
        assert_eq!(to_deltas(&sizes).unwrap(), vec![5_242_880, 0, 0, 0]);
    }

    #[test]
    fn empty_sequence() {
        let buf = encode(&[]).unwrap();
        assert_eq!(buf, vec![0x90]);
        assert!(decode(&buf).unwrap().is_empty());
    }

    #[test]
    fn non_monotonic_sequence() {
        let values = vec![10, 3, -7, 100, 99];
        assert_eq!(to_deltas(&values).unwrap(), vec![10, -7, -10, 107, -1]);
        assert_eq!(decode(&encode(&values).unwrap()).unwrap(), values);
    }

    #[test]
    fn extremes_that_fit() {
        let values = vec![i64::MAX, i64::MAX, 0, i64::MIN];
        assert_eq!(decode(&encode(&values).unwrap()).unwrap(), values);
    }

    #[test]
    fn encode_overflow_reports_index() {
        let err = encode(&[i64::MIN, i64::MAX]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overflow);
        assert_eq!(err.path().to_string(), "[1]");
        assert!(to_deltas(&[i64::MIN, i64::MAX]).is_none());
    }

    #[test]
    fn decode_overflow_is_an_error() {
        // [i64::MAX, 1] as raw deltas: the running sum overflows at index 1.
        let mut buf = vec![0x92, 0xcf];
        buf.extend_from_slice(&(i64::MAX as u64).to_be_bytes());
        buf.push(0x01);
        let err = decode(&buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overflow);
        assert_eq!(err.path().to_string(), "[1]");
        assert!(from_deltas(&[i64::MAX, 1]).is_none());
    }

    #[test]
    fn truncated_stream() {
        let buf = encode(&[1, 2, 3]).unwrap();
        let err = decode(&buf[..buf.len() - 1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncated);
    }

    #[test]
    fn malformed_header() {
        let err = decode(&[0xa1, b'x']).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedHeader);
    }

    #[test]
    fn declared_length_beyond_buffer() {
        // array16 claiming 1000 elements with none present
        let err = decode(&[0xdc, 0x03, 0xe8]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncated);
    }

    #[test]
    fn long_sequence_roundtrips_past_default_limit() {
        let values: Vec<i64> = (1..=10_001).collect();
        let buf = encode(&values).unwrap();
        assert_eq!(decode(&buf).unwrap(), values);
    }

    #[test]
    fn limits_apply_to_both_directions() {
        let limits = DecodeLimits::default();
        let values: Vec<i64> = (1..=limits.max_parts as i64 + 1).collect();

        let err = encode_with_limits(&values, limits.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LimitExceeded);

        let err = decode_with_limits(&encode(&values).unwrap(), limits.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LimitExceeded);

        let at_limit = &values[..limits.max_parts];
        let buf = encode_with_limits(at_limit, limits.clone()).unwrap();
        assert_eq!(decode_with_limits(&buf, limits).unwrap(), at_limit);
    }

    #[test]
    fn nil_is_empty() {
        assert!(decode(&[0xc0]).unwrap().is_empty());
    }

    #[test]
    fn non_integer_delta() {
        let err = decode(&[0x91, 0xa1, b'x']).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(err.path().to_string(), "[0]");
    }

    proptest! {
        #[test]
        fn roundtrip_any_sequence(values in prop::collection::vec(i64::MIN / 2..i64::MAX / 2, 0..64)) {
            let buf = encode(&values).unwrap();
            prop_assert_eq!(decode(&buf).unwrap(), values.clone());
            prop_assert_eq!(from_deltas(&to_deltas(&values).unwrap()).unwrap(), values);
        }

        #[test]
        fn roundtrip_small_values(values in prop::collection::vec(-1000i64..1000, 0..256)) {
            prop_assert_eq!(decode(&encode(&values).unwrap()).unwrap(), values);
        }
    }
}
