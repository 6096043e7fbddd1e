//! Assessment status validator.
//!
//! | From | Allowed next |
//! |------|--------------|
//! | `being_evaluated` | `approval_needed` (rating and both explanations filled in) |
//! | `approval_needed` | `being_evaluated`, `proofreading_needed` |
//! | `proofreading_needed` | `being_evaluated`, `approved` |
//! | `approved` | `being_evaluated` (statement must be unpublished) |
//!
//! Transitions are only checked when the status changes and a previous status
//! exists; a freshly created assessment is not validated.

use std::fmt;

use serde::Serialize;

use crate::{
  Error, Result,
  assessment::{Assessment, EvaluationStatus, SHORT_EXPLANATION_MAX_CHARS, is_filled},
  changes::{AssessmentDiff, AssessmentField},
  statement::{RatingModel, Statement},
};

use crate::assessment::EvaluationStatus::*;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// A message attached to one assessment field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field:   AssessmentField,
  pub message: String,
}

impl FieldError {
  fn new(field: AssessmentField, message: impl Into<String>) -> Self {
    Self { field, message: message.into() }
  }
}

/// Every field error produced by one validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn on(&self, field: AssessmentField) -> impl Iterator<Item = &FieldError> {
    self.0.iter().filter(move |e| e.field == field)
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for e in &self.0 {
      if !first {
        f.write_str("; ")?;
      }
      write!(f, "{}: {}", e.field, e.message)?;
      first = false;
    }
    Ok(())
  }
}

// ─── Transition table ────────────────────────────────────────────────────────

/// Statuses reachable from `from` in one step.
pub fn allowed_next(from: EvaluationStatus) -> &'static [EvaluationStatus] {
  match from {
    BeingEvaluated => &[ApprovalNeeded],
    ApprovalNeeded => &[BeingEvaluated, ProofreadingNeeded],
    ProofreadingNeeded => &[BeingEvaluated, Approved],
    Approved => &[BeingEvaluated],
  }
}

fn transition_message(from: EvaluationStatus) -> String {
  match allowed_next(from) {
    [only] => format!("can only change status to {only} when assessment has status {from}"),
    [a, b] => {
      format!("can change status either to {a} or {b} when assessment has status {from}")
    }
    _ => format!("invalid status change from {from}"),
  }
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// The rating of the other model must be blank.
fn rating_errors(assessment: &Assessment, rating_model: RatingModel) -> Vec<FieldError> {
  let mut errors = Vec::new();
  if assessment.veracity_id.is_some() && rating_model != RatingModel::Veracity {
    errors.push(FieldError::new(
      AssessmentField::VeracityId,
      "veracity must be blank for statements rated by promise rating",
    ));
  }
  if assessment.promise_rating_id.is_some() && rating_model != RatingModel::PromiseRating {
    errors.push(FieldError::new(
      AssessmentField::PromiseRatingId,
      "promise rating must be blank for statements rated by veracity",
    ));
  }
  errors
}

/// Validate a staged assessment against the statement it belongs to.
///
/// `statement` is the persisted statement; its type selects the rating model
/// and its `published` flag guards reopening approved assessments.
pub fn validate(diff: &AssessmentDiff, statement: &Statement) -> Vec<FieldError> {
  let after = diff.after();
  let rating_model = statement.rating_model();
  let mut errors = rating_errors(after, rating_model);

  if let Some(text) = &after.short_explanation
    && text.chars().count() > SHORT_EXPLANATION_MAX_CHARS
  {
    errors.push(FieldError::new(
      AssessmentField::ShortExplanation,
      format!("short explanation is limited to {SHORT_EXPLANATION_MAX_CHARS} characters"),
    ));
  }

  if !diff.changed(AssessmentField::EvaluationStatus) {
    return errors;
  }
  let Some(from) = diff.before().evaluation_status else {
    return errors;
  };

  let to = after.evaluation_status;
  if !to.is_some_and(|to| allowed_next(from).contains(&to)) {
    errors.push(FieldError::new(
      AssessmentField::EvaluationStatus,
      transition_message(from),
    ));
  }

  match from {
    BeingEvaluated => {
      let explained =
        is_filled(&after.short_explanation) && is_filled(&after.explanation_html);
      match rating_model {
        RatingModel::Veracity if after.veracity_id.is_none() || !explained => {
          errors.push(FieldError::new(
            AssessmentField::EvaluationStatus,
            format!(
              "to change status to {}, fill in veracity, short explanation and explanation",
              ApprovalNeeded
            ),
          ));
        }
        RatingModel::PromiseRating if after.promise_rating_id.is_none() || !explained => {
          errors.push(FieldError::new(
            AssessmentField::EvaluationStatus,
            format!(
              "to change status to {}, fill in promise rating, short explanation and explanation",
              ApprovalNeeded
            ),
          ));
        }
        _ => {}
      }
    }
    Approved if statement.published => {
      errors.push(FieldError::new(
        AssessmentField::EvaluationStatus,
        "cannot change status of a published statement, unpublish it first",
      ));
    }
    _ => {}
  }

  errors
}

/// [`validate`], folded into a [`Result`].
pub fn check(diff: &AssessmentDiff, statement: &Statement) -> Result<()> {
  let errors = validate(diff, statement);
  if errors.is_empty() {
    Ok(())
  } else {
    Err(Error::Validation(ValidationErrors(errors)))
  }
}

/// Re-check the rating model once the statement itself has been staged, so a
/// `statement_type` change cannot leave a rating of the other model behind.
pub fn check_rating_model(assessment: &Assessment, statement: &Statement) -> Result<()> {
  let errors = rating_errors(assessment, statement.rating_model());
  if errors.is_empty() {
    Ok(())
  } else {
    Err(Error::Validation(ValidationErrors(errors)))
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use strum::IntoEnumIterator as _;

  use super::*;
  use crate::{changes::Diff, statement::StatementType};

  fn statement(statement_type: StatementType, published: bool) -> Statement {
    Statement {
      id: 1,
      content: "Unemployment is the lowest in the EU".into(),
      title: None,
      statement_type,
      speaker_id: 1,
      source_id: None,
      published,
      important: false,
      count_in_statistics: true,
      source_order: None,
      excerpted_at: Utc::now(),
      deleted_at: None,
      tags: vec![],
    }
  }

  fn assessment(status: EvaluationStatus) -> Assessment {
    Assessment {
      id:                    1,
      statement_id:          1,
      evaluation_status:     Some(status),
      veracity_id:           None,
      promise_rating_id:     None,
      short_explanation:     None,
      explanation_html:      None,
      explanation_slatejson: None,
      evaluator_id:          None,
    }
  }

  fn filled(mut a: Assessment, model: RatingModel) -> Assessment {
    match model {
      RatingModel::Veracity => a.veracity_id = Some(1),
      RatingModel::PromiseRating => a.promise_rating_id = Some(1),
    }
    a.short_explanation = Some("Eurostat says otherwise.".into());
    a.explanation_html = Some("<p>According to Eurostat…</p>".into());
    a
  }

  fn transition(
    before: Assessment,
    to: EvaluationStatus,
    statement: &Statement,
  ) -> Vec<FieldError> {
    let mut after = before.clone();
    after.evaluation_status = Some(to);
    validate(&Diff::new(before, after), statement)
  }

  #[test]
  fn every_pair_outside_the_table_is_rejected() {
    let st = statement(StatementType::Factual, false);
    for from in EvaluationStatus::iter() {
      for to in EvaluationStatus::iter() {
        if from == to || allowed_next(from).contains(&to) {
          continue;
        }
        let before = filled(assessment(from), RatingModel::Veracity);
        let errors = transition(before, to, &st);
        assert!(
          errors.iter().any(|e| e.field == AssessmentField::EvaluationStatus),
          "{from} -> {to} should be rejected"
        );
      }
    }
  }

  #[test]
  fn every_pair_in_the_table_is_accepted_when_preconditions_hold() {
    let st = statement(StatementType::Factual, false);
    for from in EvaluationStatus::iter() {
      for &to in allowed_next(from) {
        let before = filled(assessment(from), RatingModel::Veracity);
        assert!(transition(before, to, &st).is_empty(), "{from} -> {to}");
      }
    }
  }

  #[test]
  fn approval_needed_requires_veracity_for_factual_statements() {
    let st = statement(StatementType::Factual, false);
    let mut before = filled(assessment(BeingEvaluated), RatingModel::Veracity);
    before.veracity_id = None;
    assert!(!transition(before.clone(), ApprovalNeeded, &st).is_empty());

    before.veracity_id = Some(2);
    assert!(transition(before, ApprovalNeeded, &st).is_empty());
  }

  #[test]
  fn approval_needed_requires_both_explanations() {
    let st = statement(StatementType::Factual, false);
    let mut before = filled(assessment(BeingEvaluated), RatingModel::Veracity);
    before.explanation_html = Some("   ".into());
    assert!(!transition(before, ApprovalNeeded, &st).is_empty());
  }

  #[test]
  fn approval_needed_requires_promise_rating_for_promises() {
    let st = statement(StatementType::Promise, false);
    let before = assessment(BeingEvaluated);
    let mut before = filled(before, RatingModel::PromiseRating);
    before.promise_rating_id = None;
    assert!(!transition(before.clone(), ApprovalNeeded, &st).is_empty());

    before.promise_rating_id = Some(4);
    assert!(transition(before, ApprovalNeeded, &st).is_empty());
  }

  #[test]
  fn reopening_a_published_statement_fails_until_unpublished() {
    let before = filled(assessment(Approved), RatingModel::Veracity);

    let published = statement(StatementType::Factual, true);
    let errors = transition(before.clone(), BeingEvaluated, &published);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, AssessmentField::EvaluationStatus);

    let unpublished = statement(StatementType::Factual, false);
    assert!(transition(before, BeingEvaluated, &unpublished).is_empty());
  }

  #[test]
  fn first_status_is_not_validated() {
    let st = statement(StatementType::Factual, false);
    let mut before = assessment(Approved);
    before.evaluation_status = None;
    assert!(transition(before, Approved, &st).is_empty());
  }

  #[test]
  fn unchanged_status_is_not_validated() {
    let st = statement(StatementType::Factual, true);
    let before = assessment(Approved);
    let mut after = before.clone();
    after.short_explanation = Some("tweak".into());
    assert!(validate(&Diff::new(before, after), &st).is_empty());
  }

  #[test]
  fn rating_must_match_the_rating_model() {
    let st = statement(StatementType::Promise, false);
    let before = assessment(BeingEvaluated);
    let mut after = before.clone();
    after.veracity_id = Some(1);
    let errors = validate(&Diff::new(before, after), &st);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, AssessmentField::VeracityId);
  }

  #[test]
  fn short_explanation_is_bounded() {
    let st = statement(StatementType::Factual, false);
    let before = assessment(BeingEvaluated);
    let mut after = before.clone();
    after.short_explanation = Some("x".repeat(SHORT_EXPLANATION_MAX_CHARS + 1));
    let result = check(&Diff::new(before, after), &st);
    let Err(Error::Validation(errors)) = result else {
      panic!("expected a validation error");
    };
    assert_eq!(errors.on(AssessmentField::ShortExplanation).count(), 1);
  }

  #[test]
  fn changing_the_statement_type_rechecks_the_rating() {
    let mut rated = filled(assessment(Approved), RatingModel::Veracity);
    let promise = statement(StatementType::Promise, false);
    let Err(Error::Validation(errors)) = check_rating_model(&rated, &promise) else {
      panic!("expected a validation error");
    };
    assert_eq!(errors.on(AssessmentField::VeracityId).count(), 1);

    rated.veracity_id = None;
    rated.promise_rating_id = Some(2);
    assert!(check_rating_model(&rated, &promise).is_ok());
  }
}
