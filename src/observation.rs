//! Observation normalization.
//!
//! Junctions control varying numbers of lanes, so raw per-lane vehicle
//! counts have varying length. The approximator expects a fixed input
//! dimension; [`normalize`] is the single place where the two meet, and it
//! must be applied before a vector is stored or fed to the network.

/// Normalizes a raw observation to exactly `dims` components.
///
/// Shorter inputs are padded with trailing zeros, longer inputs are
/// truncated, equal-length inputs pass through unchanged. No scaling or
/// other transformation is applied.
pub fn normalize(raw: &[f64], dims: usize) -> Vec<f64> {
    let mut out = vec![0.0; dims];
    let n = raw.len().min(dims);
    out[..n].copy_from_slice(&raw[..n]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_is_zero_padded() {
        let out = normalize(&[1.0, 2.0], 4);
        assert_eq!(out, vec![1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn long_input_is_truncated() {
        let out = normalize(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 4);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn equal_length_passes_through() {
        let raw = [7.0, 8.0, 9.0, 10.0];
        assert_eq!(normalize(&raw, 4), raw.to_vec());
    }

    #[test]
    fn output_length_always_matches() {
        for len in 0..10 {
            let raw: Vec<f64> = (0..len).map(|i| i as f64).collect();
            assert_eq!(normalize(&raw, 4).len(), 4);
        }
    }

    #[test]
    fn empty_input_gives_zeros() {
        assert_eq!(normalize(&[], 3), vec![0.0, 0.0, 0.0]);
    }
}
