//! Vector similarity core: pure, stateless distance computation.
//!
//! All matching and clustering in this crate measures Euclidean distance over
//! L2-normalized vectors, which approximates cosine distance. Normalization
//! must be applied to both sides before measuring or the numbers are
//! meaningless; callers normalize once up front and pass normalized vectors
//! here.

use facegraph_common::FaceGraphError;

/// Normalize a vector to unit L2 length. A zero vector is returned unchanged
/// rather than dividing by zero.
pub fn l2_normalize(v: &[f64]) -> Vec<f64> {
    let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm == 0.0 {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

/// Euclidean distance between two vectors of equal dimension.
/// Fails with `DimensionMismatch` on length disagreement — never truncates.
pub fn distance(a: &[f64], b: &[f64]) -> Result<f64, FaceGraphError> {
    if a.len() != b.len() {
        return Err(FaceGraphError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum();
    Ok(sum.sqrt())
}

/// Find the closest candidate to a query vector.
///
/// Returns `Ok(None)` for zero candidates. On exact ties the incumbent wins
/// (strict `<` comparison), so the first candidate in input order is kept —
/// there is no natural "best" answer for equidistant candidates, and stable
/// first-wins behavior keeps repeated runs deterministic.
pub fn nearest<'a, K>(
    query: &[f64],
    candidates: &'a [(K, Vec<f64>)],
) -> Result<Option<(&'a K, f64)>, FaceGraphError> {
    let mut best: Option<(&'a K, f64)> = None;
    for (key, vector) in candidates {
        let d = distance(query, vector)?;
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((key, d)),
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_unit_length() {
        let v = l2_normalize(&[3.0, 4.0]);
        let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
        assert!((v[0] - 0.6).abs() < 1e-12);
        assert!((v[1] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn normalize_zero_vector_passes_through() {
        assert_eq!(l2_normalize(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn distance_basic() {
        let d = distance(&[0.0, 0.0], &[3.0, 4.0]).unwrap();
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn distance_dimension_mismatch() {
        let err = distance(&[1.0, 2.0, 3.0], &[1.0, 2.0]).unwrap_err();
        match err {
            FaceGraphError::DimensionMismatch { expected, actual } => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("expected DimensionMismatch, got {other}"),
        }
    }

    #[test]
    fn nearest_empty_candidates() {
        let candidates: Vec<(String, Vec<f64>)> = Vec::new();
        assert!(nearest(&[1.0, 0.0], &candidates).unwrap().is_none());
    }

    #[test]
    fn nearest_picks_closest() {
        let candidates = vec![
            ("far".to_string(), vec![0.0, 1.0]),
            ("near".to_string(), vec![0.9, 0.1]),
        ];
        let (key, d) = nearest(&[1.0, 0.0], &candidates).unwrap().unwrap();
        assert_eq!(key, "near");
        assert!(d < 0.2);
    }

    #[test]
    fn nearest_tie_goes_to_first() {
        // Both candidates exactly one unit from the query.
        let candidates = vec![
            ("first".to_string(), vec![1.0, 0.0]),
            ("second".to_string(), vec![-1.0, 0.0]),
        ];
        let (key, d) = nearest(&[0.0, 0.0], &candidates).unwrap().unwrap();
        assert_eq!(key, "first");
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn nearest_propagates_dimension_mismatch() {
        let candidates = vec![("bad".to_string(), vec![1.0, 0.0, 0.0])];
        assert!(nearest(&[1.0, 0.0], &candidates).is_err());
    }
}
