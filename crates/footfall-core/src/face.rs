//! Face embeddings — write-once 512-dimension vectors tied to a profile via
//! its face id. Multiple embeddings may exist per profile (different
//! enrollment images).

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Dimensionality of all stored face embeddings.
pub const EMBEDDING_DIM: usize = 512;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceEmbedding {
  pub face_id:   String,
  pub entity_id: Option<String>,
  pub embedding: Vec<f32>,
  /// Name of the extractor that produced the vector.
  pub model:     Option<String>,
}

impl FaceEmbedding {
  pub fn new(
    face_id: String,
    entity_id: Option<String>,
    embedding: Vec<f32>,
  ) -> Result<Self> {
    check_dimension(&embedding)?;
    Ok(Self {
      face_id,
      entity_id,
      embedding,
      model: Some("InceptionResnetV1".to_owned()),
    })
  }
}

/// Reject vectors of the wrong dimensionality before any computation starts.
pub fn check_dimension(embedding: &[f32]) -> Result<()> {
  if embedding.len() != EMBEDDING_DIM {
    return Err(Error::EmbeddingDimension {
      expected: EMBEDDING_DIM,
      got:      embedding.len(),
    });
  }
  Ok(())
}
