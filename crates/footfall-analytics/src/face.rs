//! Face-identity matching — nearest-neighbour search over stored embeddings
//! by cosine distance.
//!
//! A match is confident iff its distance is below 0.4; anything farther is
//! reported as "no confident match", which is a result, not an error.

use footfall_core::{Result, face::FaceEmbedding, face::check_dimension};
use serde::Serialize;

/// Matches at or beyond this cosine distance are not confident.
pub const CONFIDENT_DISTANCE: f64 = 0.4;

#[derive(Debug, Clone, Serialize)]
pub struct FaceMatch {
  pub face_id:   String,
  pub entity_id: Option<String>,
  pub distance:  f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchOutcome {
  Confident { matched: FaceMatch },
  /// The nearest candidate (if any stored embeddings exist) fell outside
  /// the confidence cutoff.
  NoConfidentMatch { nearest: Option<FaceMatch> },
}

/// Cosine distance in [0, 2]; zero-norm vectors compare as maximally far.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
  let mut dot = 0.0f64;
  let mut norm_a = 0.0f64;
  let mut norm_b = 0.0f64;
  for (&x, &y) in a.iter().zip(b) {
    dot += x as f64 * y as f64;
    norm_a += x as f64 * x as f64;
    norm_b += y as f64 * y as f64;
  }
  if norm_a == 0.0 || norm_b == 0.0 {
    return 1.0;
  }
  1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Scan all stored embeddings for the single nearest match. The query is
/// validated for dimensionality before any computation; stored vectors of
/// the wrong width (which the write path rejects) are skipped defensively
/// at read time by the length check in the distance loop.
pub fn nearest_match(query: &[f32], stored: &[FaceEmbedding]) -> Result<MatchOutcome> {
  check_dimension(query)?;

  let nearest = stored
    .iter()
    .filter(|e| e.embedding.len() == query.len())
    .map(|e| FaceMatch {
      face_id:   e.face_id.clone(),
      entity_id: e.entity_id.clone(),
      distance:  cosine_distance(query, &e.embedding),
    })
    .min_by(|a, b| a.distance.total_cmp(&b.distance));

  Ok(match nearest {
    Some(m) if m.distance < CONFIDENT_DISTANCE => MatchOutcome::Confident { matched: m },
    other => MatchOutcome::NoConfidentMatch { nearest: other },
  })
}

#[cfg(test)]
mod tests {
  use footfall_core::face::FaceEmbedding;

  use super::*;

  fn embedding(face_id: &str, fill: impl Fn(usize) -> f32) -> FaceEmbedding {
    FaceEmbedding::new(
      face_id.to_owned(),
      Some(format!("entity-{face_id}")),
      (0..512).map(fill).collect(),
    )
    .unwrap()
  }

  #[test]
  fn identical_embedding_is_a_confident_match() {
    let stored = vec![
      embedding("F1", |i| (i as f32).sin()),
      embedding("F2", |i| (i as f32).cos()),
    ];
    let query: Vec<f32> = (0..512).map(|i| (i as f32).sin()).collect();

    let outcome = nearest_match(&query, &stored).unwrap();
    let MatchOutcome::Confident { matched } = outcome else {
      panic!("expected a confident match");
    };
    assert_eq!(matched.face_id, "F1");
    assert!(matched.distance.abs() < 1e-6);
  }

  #[test]
  fn orthogonal_embedding_is_not_confident() {
    // Disjoint support → cosine similarity 0, distance 1.
    let stored = vec![embedding("F1", |i| if i < 256 { 1.0 } else { 0.0 })];
    let query: Vec<f32> = (0..512).map(|i| if i < 256 { 0.0 } else { 1.0 }).collect();

    let outcome = nearest_match(&query, &stored).unwrap();
    let MatchOutcome::NoConfidentMatch { nearest } = outcome else {
      panic!("expected no confident match");
    };
    assert!((nearest.unwrap().distance - 1.0).abs() < 1e-6);
  }

  #[test]
  fn empty_store_reports_no_match() {
    let query = vec![1.0f32; 512];
    let outcome = nearest_match(&query, &[]).unwrap();
    assert!(matches!(outcome, MatchOutcome::NoConfidentMatch { nearest: None }));
  }

  #[test]
  fn wrong_dimension_is_rejected_before_search() {
    let err = nearest_match(&[1.0f32; 128], &[]).unwrap_err();
    assert!(matches!(
      err,
      footfall_core::Error::EmbeddingDimension { expected: 512, got: 128 }
    ));
  }

  #[test]
  fn scaled_copy_still_matches() {
    // Cosine distance is scale-invariant.
    let stored = vec![embedding("F1", |i| (i as f32 % 7.0) + 1.0)];
    let query: Vec<f32> = (0..512).map(|i| ((i as f32 % 7.0) + 1.0) * 3.5).collect();

    let outcome = nearest_match(&query, &stored).unwrap();
    assert!(matches!(outcome, MatchOutcome::Confident { .. }));
  }
}
