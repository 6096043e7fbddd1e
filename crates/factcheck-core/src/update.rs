//! Partial update payloads and the pure planning steps of `update_statement`.
//!
//! Storage backends own the transaction and the lookups; everything that can
//! be decided without I/O lives here:
//!
//! 1. [`AssessmentUpdate::apply`] / [`StatementUpdate::apply`] stage changes;
//! 2. [`plan_assessment`] authorizes, derives notifications and validates;
//! 3. [`plan_statement`] authorizes the statement changes and re-checks the
//!    rating model against the final assessment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::{
  Error, Result,
  assessment::{Assessment, EvaluationStatus},
  authz,
  changes::{AssessmentDiff, Diff, StatementDiff},
  notification::{self, NotificationDraft},
  statement::{Speaker, Statement, StatementType, normalize_tags},
  user::User,
  workflow,
};

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field
/// (`None`) when used with `#[serde(default)]`.
fn double_option<'de, T, D>(de: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
  T: Deserialize<'de>,
  D: Deserializer<'de>,
{
  Option::<T>::deserialize(de).map(Some)
}

// ─── Payloads ────────────────────────────────────────────────────────────────

/// Partial update of a statement. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementUpdate {
  pub content:             Option<String>,
  #[serde(default, deserialize_with = "double_option")]
  pub title:               Option<Option<String>>,
  pub statement_type:      Option<StatementType>,
  pub published:           Option<bool>,
  pub important:           Option<bool>,
  pub count_in_statistics: Option<bool>,
  #[serde(default, deserialize_with = "double_option")]
  pub source_order:        Option<Option<i64>>,
  pub excerpted_at:        Option<DateTime<Utc>>,
  /// Replacement tag set, by id.
  pub tags:                Option<Vec<i64>>,
  /// Replacement speaker, by id.
  pub speaker:             Option<i64>,
  pub assessment:          Option<AssessmentUpdate>,
}

/// Partial update of an assessment. For nullable fields `Some(None)` clears.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssessmentUpdate {
  #[serde(default, deserialize_with = "double_option")]
  pub evaluator_id:          Option<Option<i64>>,
  #[serde(default, deserialize_with = "double_option")]
  pub veracity_id:           Option<Option<i64>>,
  #[serde(default, deserialize_with = "double_option")]
  pub promise_rating_id:     Option<Option<i64>>,
  #[serde(default, deserialize_with = "double_option")]
  pub short_explanation:     Option<Option<String>>,
  #[serde(default, deserialize_with = "double_option")]
  pub explanation_html:      Option<Option<String>>,
  #[serde(default, deserialize_with = "double_option")]
  pub explanation_slatejson: Option<Option<serde_json::Value>>,
  pub evaluation_status:     Option<EvaluationStatus>,
}

fn stage<T: Clone>(current: &T, update: &Option<T>) -> T {
  update.as_ref().unwrap_or(current).clone()
}

impl AssessmentUpdate {
  /// The assessment with this update applied. References are not checked.
  pub fn apply(&self, current: &Assessment) -> Assessment {
    Assessment {
      id:                    current.id,
      statement_id:          current.statement_id,
      evaluation_status:     self.evaluation_status.or(current.evaluation_status),
      veracity_id:           stage(&current.veracity_id, &self.veracity_id),
      promise_rating_id:     stage(&current.promise_rating_id, &self.promise_rating_id),
      short_explanation:     stage(&current.short_explanation, &self.short_explanation),
      explanation_html:      stage(&current.explanation_html, &self.explanation_html),
      explanation_slatejson: stage(
        &current.explanation_slatejson,
        &self.explanation_slatejson,
      ),
      evaluator_id:          stage(&current.evaluator_id, &self.evaluator_id),
    }
  }
}

impl StatementUpdate {
  /// The statement with this update applied (the nested assessment payload is
  /// ignored). References are not checked.
  pub fn apply(&self, current: &Statement) -> Statement {
    Statement {
      id:                  current.id,
      content:             stage(&current.content, &self.content),
      title:               stage(&current.title, &self.title),
      statement_type:      self.statement_type.unwrap_or(current.statement_type),
      speaker_id:          self.speaker.unwrap_or(current.speaker_id),
      source_id:           current.source_id,
      published:           self.published.unwrap_or(current.published),
      important:           self.important.unwrap_or(current.important),
      count_in_statistics: self.count_in_statistics.unwrap_or(current.count_in_statistics),
      source_order:        stage(&current.source_order, &self.source_order),
      excerpted_at:        self.excerpted_at.unwrap_or(current.excerpted_at),
      deleted_at:          current.deleted_at,
      tags:                match &self.tags {
        Some(tags) => normalize_tags(tags.clone()),
        None => current.tags.clone(),
      },
    }
  }
}

// ─── Planning ────────────────────────────────────────────────────────────────

/// The outcome of planning an assessment update: what to persist and whom to
/// notify.
#[derive(Debug, Clone)]
pub struct AssessmentPlan {
  pub diff:   AssessmentDiff,
  pub drafts: Vec<NotificationDraft>,
}

/// Stage `update` on `before`, then authorize, derive notifications and
/// validate, in that order.
///
/// `statement` is the persisted statement the assessment belongs to.
pub fn plan_assessment(
  actor: &User,
  statement: &Statement,
  speaker: &Speaker,
  before: Assessment,
  update: &AssessmentUpdate,
) -> Result<AssessmentPlan> {
  let after = update.apply(&before);
  let diff = Diff::new(before, after);

  if !authz::can_save_assessment(actor, &diff) {
    return Err(Error::NotAuthorized);
  }

  let drafts = notification::derive(&diff, actor, statement, speaker);
  workflow::check(&diff, statement)?;

  Ok(AssessmentPlan { diff, drafts })
}

/// Stage `update` on `before`, authorize the result and re-check the rating
/// model against the final assessment.
///
/// `assessment_before` is the assessment as it stood before this update and
/// decides authorization; `assessment_after` is what will be persisted.
pub fn plan_statement(
  actor: &User,
  before: Statement,
  assessment_before: &Assessment,
  assessment_after: &Assessment,
  update: &StatementUpdate,
) -> Result<StatementDiff> {
  let after = update.apply(&before);
  let diff = Diff::new(before, after);

  if !authz::can_save_statement(actor, &diff, assessment_before) {
    return Err(Error::NotAuthorized);
  }
  workflow::check_rating_model(assessment_after, diff.after())?;
  Ok(diff)
}

/// The statement an assessment update is validated against: the persisted
/// one, with the rating model the statement will have once `update` lands.
/// Everything else, `published` in particular, stays as persisted.
pub fn validation_basis(persisted: &Statement, update: &StatementUpdate) -> Statement {
  Statement {
    statement_type: update.statement_type.unwrap_or(persisted.statement_type),
    ..persisted.clone()
  }
}
