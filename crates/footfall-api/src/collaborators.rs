//! HTTP client for the external narrative/explanation generation service.
//!
//! The service accepts a compact textual rendering of structured facts and
//! returns free-form prose. It is strictly best-effort: every method returns
//! `None` on any failure (unreachable service, non-success status, bad
//! payload, timeout) and the caller substitutes the fixed fallback string.
//! The client owns its configuration; there is no process-wide state.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Connection settings for the generation service. `base_url = None`
/// disables the collaborator entirely, degrading every call to fallback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NarrativeConfig {
  pub base_url:     Option<String>,
  /// Request-level timeout in seconds (default 10).
  pub timeout_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
  kind:  &'a str,
  input: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
  text: String,
}

/// Async HTTP client for the generation service.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct NarrativeClient {
  client:   reqwest::Client,
  base_url: Option<String>,
}

impl NarrativeClient {
  pub fn new(config: NarrativeConfig) -> Self {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs.unwrap_or(10)))
      .build()
      .unwrap_or_default();
    Self {
      client,
      base_url: config.base_url,
    }
  }

  /// A client with no upstream; every call degrades to fallback.
  pub fn disabled() -> Self {
    Self::new(NarrativeConfig::default())
  }

  async fn generate(&self, kind: &str, input: &str) -> Option<String> {
    let base = self.base_url.as_deref()?;
    let url = format!("{}/generate", base.trim_end_matches('/'));

    let result = self
      .client
      .post(&url)
      .json(&GenerateRequest { kind, input })
      .send()
      .await;

    let response = match result {
      Ok(r) => r,
      Err(e) => {
        warn!(kind, error = %e, "narrative service unreachable");
        return None;
      }
    };
    if !response.status().is_success() {
      warn!(kind, status = %response.status(), "narrative service error");
      return None;
    }
    match response.json::<GenerateResponse>().await {
      Ok(body) => Some(body.text.trim().to_owned()),
      Err(e) => {
        warn!(kind, error = %e, "narrative service returned a bad payload");
        None
      }
    }
  }

  /// Prose summary of a rendered stay-interval sequence.
  pub async fn timeline_summary(&self, rendered: &str) -> Option<String> {
    self.generate("timeline_summary", rendered).await
  }

  /// Short rationale for a next-location prediction.
  pub async fn prediction_rationale(&self, context: &str) -> Option<String> {
    self.generate("prediction_rationale", context).await
  }

  /// Short rationale for an occupancy forecast.
  pub async fn occupancy_rationale(&self, context: &str) -> Option<String> {
    self.generate("occupancy_rationale", context).await
  }
}
