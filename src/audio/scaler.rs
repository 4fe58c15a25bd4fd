//! Volume scaling of raw sample chunks
//!
//! A pure transform applied by the sender just before transmission. Only
//! 16-bit chunks are scaled; chunks at any other depth pass through
//! untouched. This is a documented limitation carried over from the wire
//! format's primary use, not a failure mode.

use bytes::Bytes;

/// Scale a chunk of signed little-endian PCM by `level` percent.
///
/// - `level >= 100` is the identity: the input is returned as-is.
/// - `level == 0` yields silence of the same length.
/// - Non-16-bit chunks and chunks that are not a whole number of 16-bit
///   samples are returned unchanged (fail-open: a scaler problem must never
///   drop audio).
pub fn scale_chunk(chunk: Bytes, level: u8, bits_per_sample: u16) -> Bytes {
    if chunk.is_empty() || level >= 100 || bits_per_sample != 16 || chunk.len() % 2 != 0 {
        return chunk;
    }
    if level == 0 {
        return Bytes::from(vec![0u8; chunk.len()]);
    }

    let factor = level as i32;
    let mut out = Vec::with_capacity(chunk.len());
    for pair in chunk.chunks_exact(2) {
        let sample = i16::from_le_bytes([pair[0], pair[1]]) as i32;
        let scaled = (sample * factor / 100).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        out.extend_from_slice(&scaled.to_le_bytes());
    }
    Bytes::from(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn chunk_of(samples: &[i16]) -> Bytes {
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        Bytes::from(bytes)
    }

    fn samples_of(chunk: &Bytes) -> Vec<i16> {
        chunk
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }

    #[test]
    fn test_full_level_is_identity() {
        let chunk = chunk_of(&[100, -100, i16::MAX, i16::MIN]);
        let scaled = scale_chunk(chunk.clone(), 100, 16);
        assert_eq!(scaled, chunk);
    }

    #[test]
    fn test_zero_level_is_silence() {
        let chunk = chunk_of(&[100, -100, 1234]);
        let scaled = scale_chunk(chunk.clone(), 0, 16);
        assert_eq!(scaled.len(), chunk.len());
        assert!(scaled.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_half_level() {
        let chunk = chunk_of(&[1000, -1000, 0]);
        let scaled = scale_chunk(chunk, 50, 16);
        assert_eq!(samples_of(&scaled), vec![500, -500, 0]);
    }

    #[test]
    fn test_extremes_stay_in_range() {
        let chunk = chunk_of(&[i16::MAX, i16::MIN]);
        let scaled = scale_chunk(chunk, 99, 16);
        let samples = samples_of(&scaled);
        assert!(samples[0] > 0 && samples[0] < i16::MAX);
        assert!(samples[1] < 0 && samples[1] > i16::MIN);
    }

    #[test]
    fn test_other_bit_depths_pass_through() {
        let chunk = Bytes::from_static(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(scale_chunk(chunk.clone(), 50, 24), chunk);
        assert_eq!(scale_chunk(chunk.clone(), 50, 8), chunk);
    }

    #[test]
    fn test_odd_length_passes_through() {
        let chunk = Bytes::from_static(&[1, 2, 3]);
        assert_eq!(scale_chunk(chunk.clone(), 50, 16), chunk);
    }

    #[test]
    fn test_empty_chunk() {
        assert!(scale_chunk(Bytes::new(), 50, 16).is_empty());
    }

    proptest! {
        #[test]
        fn prop_length_preserved(samples in prop::collection::vec(any::<i16>(), 0..512), level in 0u8..=100) {
            let chunk = chunk_of(&samples);
            let scaled = scale_chunk(chunk.clone(), level, 16);
            prop_assert_eq!(scaled.len(), chunk.len());
        }

        #[test]
        fn prop_never_louder(samples in prop::collection::vec(any::<i16>(), 0..512), level in 0u8..=100) {
            let chunk = chunk_of(&samples);
            let scaled = scale_chunk(chunk, level, 16);
            for (out, input) in samples_of(&scaled).iter().zip(&samples) {
                prop_assert!((*out as i32).abs() <= (*input as i32).abs());
            }
        }

        #[test]
        fn prop_level_100_identity(samples in prop::collection::vec(any::<i16>(), 0..512)) {
            let chunk = chunk_of(&samples);
            prop_assert_eq!(scale_chunk(chunk.clone(), 100, 16), chunk);
        }
    }
}
