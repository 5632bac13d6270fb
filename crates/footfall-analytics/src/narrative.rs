//! Inputs and fallbacks for the external narrative/explanation generators.
//!
//! The generators are best-effort collaborators: the core renders compact
//! structured facts into text for them, and when a call fails the fixed
//! fallback string is used instead. A generator failure never propagates.

use chrono::{DateTime, Utc};

use crate::{occupancy::OccupancyAnalysis, predict::LocationObservation};

// ─── Fallback strings ────────────────────────────────────────────────────────

pub const SUMMARY_UNAVAILABLE: &str =
  "An error occurred while generating the summary.";

pub const NO_LOCATED_ACTIVITY: &str =
  "No activity with location data found for this person in the selected time range.";

pub const SUMMARY_TOO_THIN: &str =
  "Not enough data to generate a meaningful summary.";

pub const EXPLANATION_UNAVAILABLE: &str =
  "An error occurred while generating the explanation.";

pub const EXPLANATION_TOO_THIN: &str =
  "Not enough historical data for an explanation.";

/// Fallback rationale when the prediction-explanation generator fails.
pub fn prediction_fallback(predicted_location: &str) -> String {
  format!(
    "Based on historical data patterns, the entity's next likely location is \
     {predicted_location}."
  )
}

// ─── Structured inputs ───────────────────────────────────────────────────────

const DAY_NAMES: [&str; 7] = [
  "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

/// Render the recent-activity context handed to the prediction explainer:
/// the last five observations, oldest first.
pub fn render_prediction_context(
  history: &[LocationObservation],
  predicted_location: &str,
  at: DateTime<Utc>,
) -> String {
  let recent = history.iter().rev().take(5).rev();
  let mut lines: Vec<String> = recent
    .map(|o| {
      format!(
        "- At {}, they were at {}.",
        o.timestamp.format("%I:%M %p"),
        o.location
      )
    })
    .collect();
  lines.push(format!(
    "Predicted location at {}: {predicted_location}.",
    at.to_rfc3339()
  ));
  lines.join("\n")
}

/// Render the historical-pattern context handed to the occupancy explainer.
pub fn render_occupancy_context(
  location_id: &str,
  predicted: u32,
  analysis: &OccupancyAnalysis,
) -> String {
  let day = DAY_NAMES
    .get(analysis.target_dow as usize)
    .copied()
    .unwrap_or("Unknown");
  format!(
    "Location: {location_id}\n\
     Day: {day} ({})\n\
     Time: {}:00 ({})\n\
     Expected count: {predicted} people\n\
     Typical count here: {:.0}\n\
     Typical at this hour: {:.0}\n\
     Typical on this day: {:.0}",
    if analysis.is_weekend { "Weekend" } else { "Weekday" },
    analysis.target_hour,
    analysis.period,
    analysis.avg_count,
    analysis.same_hour_avg,
    analysis.same_dow_avg,
  )
}
