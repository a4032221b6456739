//! Identity matching: decide match-or-new for a single face embedding.

use tracing::info;

use facegraph_common::{FaceGraphError, KnownPerson, MatchResult, SimilarPerson};

use crate::reader::GraphReader;
use crate::similarity::{distance, l2_normalize, nearest};
use crate::GraphClient;

/// Matches face embeddings against all known Person embeddings.
pub struct IdentityMatcher {
    reader: GraphReader,
    tolerance: f64,
}

impl IdentityMatcher {
    pub fn new(client: GraphClient, tolerance: f64) -> Self {
        Self {
            reader: GraphReader::new(client),
            tolerance,
        }
    }

    /// Fetch the known identities and decide match-or-new for one embedding.
    pub async fn identify_face(&self, embedding: &[f64]) -> Result<MatchResult, FaceGraphError> {
        let known = self.reader.person_embeddings().await?;
        let result = identify(embedding, &known, self.tolerance)?;
        if let MatchResult::Matched {
            person_id,
            name,
            confidence,
        } = &result
        {
            info!(person_id = %person_id, name, confidence, "Face matched known person");
        }
        Ok(result)
    }

    /// All Persons within `threshold` normalized distance of the embedding,
    /// sorted by descending similarity, at most `limit` entries.
    pub async fn find_similar(
        &self,
        embedding: &[f64],
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<SimilarPerson>, FaceGraphError> {
        let known = self.reader.person_embeddings().await?;
        let q = l2_normalize(embedding);

        let mut similar = Vec::new();
        for person in &known {
            let d = distance(&q, &l2_normalize(&person.embedding))?;
            if d <= threshold {
                similar.push(SimilarPerson {
                    person_id: person.id,
                    name: person.name.clone(),
                    similarity: 1.0 - d,
                });
            }
        }

        similar.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        similar.truncate(limit);
        Ok(similar)
    }
}

/// Decide match-or-new for one embedding against a known set.
///
/// Both the query and every candidate are L2-normalized before measuring, so
/// the Euclidean distance approximates cosine distance. An empty known set is
/// always `New`. On equidistant candidates the first in input order wins.
pub fn identify(
    embedding: &[f64],
    known: &[KnownPerson],
    tolerance: f64,
) -> Result<MatchResult, FaceGraphError> {
    if known.is_empty() {
        return Ok(MatchResult::New);
    }

    let q = l2_normalize(embedding);
    let candidates: Vec<(usize, Vec<f64>)> = known
        .iter()
        .enumerate()
        .map(|(i, p)| (i, l2_normalize(&p.embedding)))
        .collect();

    match nearest(&q, &candidates)? {
        Some((&idx, d)) if d <= tolerance => {
            let person = &known[idx];
            Ok(MatchResult::Matched {
                person_id: person.id,
                name: person.name.clone(),
                confidence: 1.0 - d,
            })
        }
        _ => Ok(MatchResult::New),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn person(name: &str, embedding: Vec<f64>) -> KnownPerson {
        KnownPerson {
            id: Uuid::new_v4(),
            name: name.to_string(),
            embedding,
        }
    }

    #[test]
    fn empty_known_set_is_always_new() {
        let result = identify(&[1.0, 0.0], &[], 0.6).unwrap();
        assert_eq!(result, MatchResult::New);
    }

    #[test]
    fn matches_nearest_within_tolerance() {
        let known = vec![
            person("Alice", vec![1.0, 0.0]),
            person("Bob", vec![0.0, 1.0]),
        ];
        let result = identify(&[0.99, 0.1], &known, 0.3).unwrap();
        match result {
            MatchResult::Matched {
                person_id,
                name,
                confidence,
            } => {
                assert_eq!(person_id, known[0].id);
                assert_eq!(name, "Alice");
                // Normalized distance to Alice is ~0.10, so confidence ~0.90.
                assert!(confidence > 0.85 && confidence < 1.0);
            }
            MatchResult::New => panic!("expected a match to Alice"),
        }
    }

    #[test]
    fn beyond_tolerance_is_new() {
        let known = vec![person("Alice", vec![1.0, 0.0])];
        let result = identify(&[0.0, 1.0], &known, 0.3).unwrap();
        assert_eq!(result, MatchResult::New);
    }

    #[test]
    fn equidistant_tie_goes_to_first_listed() {
        // Query is orthogonal to both, same distance after normalization.
        let known = vec![
            person("First", vec![1.0, 0.0, 0.0]),
            person("Second", vec![0.0, 1.0, 0.0]),
        ];
        let result = identify(&[0.0, 0.0, 1.0], &known, 2.0).unwrap();
        match result {
            MatchResult::Matched { name, .. } => assert_eq!(name, "First"),
            MatchResult::New => panic!("tolerance 2.0 covers any normalized pair"),
        }
    }

    #[test]
    fn dimension_mismatch_surfaces() {
        let known = vec![person("Alice", vec![1.0, 0.0, 0.0])];
        assert!(identify(&[1.0, 0.0], &known, 0.6).is_err());
    }

    fn embedding_strategy() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(-10.0f64..10.0, 8)
    }

    proptest! {
        /// identify returns Matched iff the minimum normalized distance to
        /// some known person is within tolerance.
        #[test]
        fn matched_iff_within_tolerance(
            query in embedding_strategy(),
            others in prop::collection::vec(embedding_strategy(), 1..6),
            tolerance in 0.0f64..2.0,
        ) {
            let known: Vec<KnownPerson> = others
                .into_iter()
                .enumerate()
                .map(|(i, e)| person(&format!("p{i}"), e))
                .collect();

            let q = l2_normalize(&query);
            let min_distance = known
                .iter()
                .map(|p| distance(&q, &l2_normalize(&p.embedding)).unwrap())
                .fold(f64::INFINITY, f64::min);

            let result = identify(&query, &known, tolerance).unwrap();
            prop_assert_eq!(!result.is_new(), min_distance <= tolerance);

            if let MatchResult::Matched { confidence, .. } = result {
                prop_assert!((confidence - (1.0 - min_distance)).abs() < 1e-9);
            }
        }
    }
}
