//! The assessment attached to every statement, its evaluation status, and the
//! rating lookup tables.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

// ─── Evaluation status ───────────────────────────────────────────────────────

/// Position of an assessment in the editorial workflow.
///
/// `being_evaluated → approval_needed → proofreading_needed → approved`, with
/// every stage able to fall back to `being_evaluated`. See
/// [`crate::workflow`] for the transition rules.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EvaluationStatus {
  BeingEvaluated,
  ApprovalNeeded,
  ProofreadingNeeded,
  Approved,
}

impl EvaluationStatus {
  /// Human-readable label used in notification texts.
  pub fn label(self) -> &'static str {
    match self {
      Self::BeingEvaluated => "being evaluated",
      Self::ApprovalNeeded => "approval needed",
      Self::ProofreadingNeeded => "proofreading needed",
      Self::Approved => "approved",
    }
  }
}

// ─── Assessment ──────────────────────────────────────────────────────────────

/// Maximum length of [`Assessment::short_explanation`] in characters.
pub const SHORT_EXPLANATION_MAX_CHARS: usize = 280;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
  pub id:                    i64,
  pub statement_id:          i64,
  /// `None` only for records that have never been saved with a status.
  pub evaluation_status:     Option<EvaluationStatus>,
  pub veracity_id:           Option<i64>,
  pub promise_rating_id:     Option<i64>,
  pub short_explanation:     Option<String>,
  pub explanation_html:      Option<String>,
  /// Structured editor document for the explanation.
  pub explanation_slatejson: Option<serde_json::Value>,
  pub evaluator_id:          Option<i64>,
}

impl Assessment {
  pub fn is_approved(&self) -> bool {
    self.evaluation_status == Some(EvaluationStatus::Approved)
  }

  pub fn is_evaluator(&self, user_id: i64) -> bool {
    self.evaluator_id == Some(user_id)
  }

  /// The assessment with ratings and explanations removed, for viewers that
  /// may not see an unapproved evaluation.
  pub fn redacted(&self) -> Self {
    Self {
      veracity_id: None,
      promise_rating_id: None,
      short_explanation: None,
      explanation_html: None,
      explanation_slatejson: None,
      ..self.clone()
    }
  }
}

/// `true` when an optional text field carries something other than whitespace.
pub fn is_filled(text: &Option<String>) -> bool {
  text.as_deref().is_some_and(|t| !t.trim().is_empty())
}

// ─── Lookup tables ───────────────────────────────────────────────────────────

/// A veracity rating row, e.g. `true`, `misleading`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Veracity {
  pub id:   i64,
  pub key:  String,
  pub name: String,
}

/// A promise rating row, e.g. `fulfilled`, `broken`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromiseRating {
  pub id:   i64,
  pub key:  String,
  pub name: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_strings_are_snake_case() {
    assert_eq!(EvaluationStatus::ProofreadingNeeded.as_ref(), "proofreading_needed");
    assert_eq!(
      "approval_needed".parse::<EvaluationStatus>().unwrap(),
      EvaluationStatus::ApprovalNeeded
    );
    assert!("published".parse::<EvaluationStatus>().is_err());
  }

  #[test]
  fn blank_text_is_not_filled() {
    assert!(!is_filled(&None));
    assert!(!is_filled(&Some("  ".into())));
    assert!(is_filled(&Some("x".into())));
  }
}
