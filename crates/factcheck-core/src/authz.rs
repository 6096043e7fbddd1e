//! Authorization predicates.
//!
//! Saves are authorized from the *diff* of staged changes, not from the target
//! values: a role can be trusted with narrow write access to a handful of
//! fields without being trusted with the whole record. An empty diff is
//! always authorized.

use crate::{
  assessment::{Assessment, EvaluationStatus},
  changes::{AssessmentDiff, AssessmentField, StatementDiff, StatementField},
  user::{Permission, User},
};

use crate::assessment::EvaluationStatus::*;

const STATEMENT_EVALUATOR_FIELDS: &[StatementField] =
  &[StatementField::Content, StatementField::Title, StatementField::Tags];

const STATEMENT_PROOFREADER_FIELDS: &[StatementField] =
  &[StatementField::Content, StatementField::Title];

const ASSESSMENT_EVALUATOR_FIELDS: &[AssessmentField] = &[
  AssessmentField::VeracityId,
  AssessmentField::PromiseRatingId,
  AssessmentField::ExplanationHtml,
  AssessmentField::ExplanationSlatejson,
  AssessmentField::ShortExplanation,
  AssessmentField::EvaluationStatus,
];

const ASSESSMENT_PROOFREADER_FIELDS: &[AssessmentField] = &[
  AssessmentField::ExplanationHtml,
  AssessmentField::ExplanationSlatejson,
  AssessmentField::ShortExplanation,
];

/// Statuses in which proofreaders may touch texts.
const OPEN_STATUSES: &[EvaluationStatus] =
  &[BeingEvaluated, ApprovalNeeded, ProofreadingNeeded];

fn is_open(status: Option<EvaluationStatus>) -> bool {
  status.is_some_and(|s| OPEN_STATUSES.contains(&s))
}

/// May `user` save the staged statement changes?
///
/// `assessment` is the statement's assessment as it stood before this
/// update; its status and evaluator gate the narrow roles.
pub fn can_save_statement(
  user: &User,
  diff: &StatementDiff,
  assessment: &Assessment,
) -> bool {
  if user.has(Permission::StatementsEdit) {
    return true;
  }

  let changes = diff.changes();

  let as_evaluator = user.has(Permission::StatementsEditAsEvaluator)
    && assessment.is_evaluator(user.id)
    && assessment.evaluation_status == Some(BeingEvaluated)
    && changes.only(STATEMENT_EVALUATOR_FIELDS);
  if as_evaluator {
    return true;
  }

  let as_proofreader = user.has(Permission::StatementsEditAsProofreader)
    && is_open(assessment.evaluation_status)
    && changes.only(STATEMENT_PROOFREADER_FIELDS);
  if as_proofreader {
    return true;
  }

  changes.is_empty()
}

/// May `user` save the staged assessment changes?
pub fn can_save_assessment(user: &User, diff: &AssessmentDiff) -> bool {
  if user.has(Permission::StatementsEdit) {
    return true;
  }

  let changes = diff.changes();
  let was = diff.before().evaluation_status;
  let now = diff.after().evaluation_status;

  // Evaluators work on their own assessment while it is being evaluated, and
  // may take it back from approval.
  let evaluator_changes = (was == Some(BeingEvaluated)
    && changes.only(ASSESSMENT_EVALUATOR_FIELDS))
    || (was == Some(ApprovalNeeded)
      && now == Some(BeingEvaluated)
      && changes.is_exactly(AssessmentField::EvaluationStatus));
  if evaluator_changes
    && user.has(Permission::StatementsEditAsEvaluator)
    && diff.after().is_evaluator(user.id)
  {
    return true;
  }

  let proofreader_changes = (is_open(was) && changes.only(ASSESSMENT_PROOFREADER_FIELDS))
    || was == Some(ProofreadingNeeded);
  if proofreader_changes && user.has(Permission::StatementsEditAsProofreader) {
    return true;
  }

  changes.is_empty()
}

/// May `user` (or an anonymous visitor) see the evaluation of `assessment`,
/// that is its ratings and explanations?
pub fn can_view_evaluation(user: Option<&User>, assessment: &Assessment) -> bool {
  if assessment.is_approved() {
    return true;
  }

  let Some(user) = user else {
    return false;
  };
  user.has(Permission::StatementsViewUnapprovedEvaluation)
    || (user.has(Permission::StatementsViewEvaluationAsEvaluator)
      && assessment.is_evaluator(user.id))
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::{
    changes::Diff,
    statement::{Statement, StatementType},
    user::{PermissionSet, Role},
  };

  fn user(id: i64, permissions: &[Permission]) -> User {
    User {
      id,
      email: format!("user{id}@example.com"),
      first_name: "Test".into(),
      last_name: format!("User{id}"),
      password_hash: None,
      active: true,
      notify_on_approval: false,
      role: Role {
        id:          1,
        key:         "test".into(),
        name:        "Test".into(),
        permissions: permissions.iter().copied().collect::<PermissionSet>(),
      },
    }
  }

  fn statement() -> Statement {
    Statement {
      id:                  1,
      content:             "Taxes went down".into(),
      title:               None,
      statement_type:      StatementType::Factual,
      speaker_id:          1,
      source_id:           None,
      published:           false,
      important:           false,
      count_in_statistics: true,
      source_order:        None,
      excerpted_at:        Utc::now(),
      deleted_at:          None,
      tags:                vec![],
    }
  }

  fn assessment(status: EvaluationStatus, evaluator_id: Option<i64>) -> Assessment {
    Assessment {
      id: 1,
      statement_id: 1,
      evaluation_status: Some(status),
      veracity_id: None,
      promise_rating_id: None,
      short_explanation: None,
      explanation_html: None,
      explanation_slatejson: None,
      evaluator_id,
    }
  }

  fn statement_diff(edit: impl FnOnce(&mut Statement)) -> StatementDiff {
    let before = statement();
    let mut after = before.clone();
    edit(&mut after);
    Diff::new(before, after)
  }

  fn assessment_diff(before: Assessment, edit: impl FnOnce(&mut Assessment)) -> AssessmentDiff {
    let mut after = before.clone();
    edit(&mut after);
    Diff::new(before, after)
  }

  // ── Statements ──────────────────────────────────────────────────────────────

  #[test]
  fn evaluator_may_edit_content_of_own_statement() {
    let evaluator = user(5, &[Permission::StatementsEditAsEvaluator]);
    let a = assessment(BeingEvaluated, Some(5));
    let diff = statement_diff(|s| s.content = "Taxes went up".into());
    assert!(can_save_statement(&evaluator, &diff, &a));
  }

  #[test]
  fn evaluator_may_not_publish() {
    let evaluator = user(5, &[Permission::StatementsEditAsEvaluator]);
    let a = assessment(BeingEvaluated, Some(5));
    let diff = statement_diff(|s| s.published = true);
    assert!(!can_save_statement(&evaluator, &diff, &a));
  }

  #[test]
  fn evaluator_of_another_statement_may_not_edit() {
    let evaluator = user(5, &[Permission::StatementsEditAsEvaluator]);
    let a = assessment(BeingEvaluated, Some(6));
    let diff = statement_diff(|s| s.content = "Taxes went up".into());
    assert!(!can_save_statement(&evaluator, &diff, &a));
  }

  #[test]
  fn evaluator_may_not_edit_after_handing_over() {
    let evaluator = user(5, &[Permission::StatementsEditAsEvaluator]);
    let a = assessment(ApprovalNeeded, Some(5));
    let diff = statement_diff(|s| s.tags = vec![3]);
    assert!(!can_save_statement(&evaluator, &diff, &a));
  }

  #[test]
  fn proofreader_may_edit_texts_until_approved() {
    let proofreader = user(7, &[Permission::StatementsEditAsProofreader]);
    let diff = statement_diff(|s| s.title = Some("Taxes".into()));
    for status in [BeingEvaluated, ApprovalNeeded, ProofreadingNeeded] {
      assert!(can_save_statement(&proofreader, &diff, &assessment(status, None)));
    }
    assert!(!can_save_statement(&proofreader, &diff, &assessment(Approved, None)));
  }

  #[test]
  fn proofreader_may_not_retag() {
    let proofreader = user(7, &[Permission::StatementsEditAsProofreader]);
    let diff = statement_diff(|s| s.tags = vec![1]);
    assert!(!can_save_statement(&proofreader, &diff, &assessment(BeingEvaluated, None)));
  }

  #[test]
  fn blanket_edit_allows_anything() {
    let editor = user(1, &[Permission::StatementsEdit]);
    let diff = statement_diff(|s| {
      s.published = true;
      s.important = true;
    });
    assert!(can_save_statement(&editor, &diff, &assessment(Approved, None)));
  }

  #[test]
  fn empty_diff_is_always_authorized() {
    let nobody = user(9, &[]);
    let diff = statement_diff(|_| {});
    assert!(can_save_statement(&nobody, &diff, &assessment(Approved, None)));

    let adiff = assessment_diff(assessment(Approved, None), |_| {});
    assert!(can_save_assessment(&nobody, &adiff));
  }

  // ── Assessments ─────────────────────────────────────────────────────────────

  #[test]
  fn evaluator_may_rate_and_submit() {
    let evaluator = user(5, &[Permission::StatementsEditAsEvaluator]);
    let diff = assessment_diff(assessment(BeingEvaluated, Some(5)), |a| {
      a.veracity_id = Some(1);
      a.short_explanation = Some("short".into());
      a.explanation_html = Some("<p>long</p>".into());
      a.evaluation_status = Some(ApprovalNeeded);
    });
    assert!(can_save_assessment(&evaluator, &diff));
  }

  #[test]
  fn evaluator_may_not_reassign() {
    let evaluator = user(5, &[Permission::StatementsEditAsEvaluator]);
    let diff = assessment_diff(assessment(BeingEvaluated, Some(5)), |a| {
      a.evaluator_id = Some(6);
    });
    assert!(!can_save_assessment(&evaluator, &diff));
  }

  #[test]
  fn evaluator_may_take_back_from_approval() {
    let evaluator = user(5, &[Permission::StatementsEditAsEvaluator]);
    let diff = assessment_diff(assessment(ApprovalNeeded, Some(5)), |a| {
      a.evaluation_status = Some(BeingEvaluated);
    });
    assert!(can_save_assessment(&evaluator, &diff));

    let diff = assessment_diff(assessment(ApprovalNeeded, Some(5)), |a| {
      a.evaluation_status = Some(BeingEvaluated);
      a.veracity_id = Some(2);
    });
    assert!(!can_save_assessment(&evaluator, &diff));
  }

  #[test]
  fn proofreader_may_edit_explanations_while_open() {
    let proofreader = user(7, &[Permission::StatementsEditAsProofreader]);
    let diff = assessment_diff(assessment(ApprovalNeeded, None), |a| {
      a.short_explanation = Some("fixed typo".into());
    });
    assert!(can_save_assessment(&proofreader, &diff));

    let diff = assessment_diff(assessment(ApprovalNeeded, None), |a| {
      a.veracity_id = Some(3);
    });
    assert!(!can_save_assessment(&proofreader, &diff));
  }

  #[test]
  fn proofreader_may_change_anything_during_proofreading() {
    let proofreader = user(7, &[Permission::StatementsEditAsProofreader]);
    let diff = assessment_diff(assessment(ProofreadingNeeded, None), |a| {
      a.evaluation_status = Some(Approved);
      a.veracity_id = Some(3);
    });
    assert!(can_save_assessment(&proofreader, &diff));
  }

  #[test]
  fn proofreader_may_not_touch_approved_assessments() {
    let proofreader = user(7, &[Permission::StatementsEditAsProofreader]);
    let diff = assessment_diff(assessment(Approved, None), |a| {
      a.short_explanation = Some("late fix".into());
    });
    assert!(!can_save_assessment(&proofreader, &diff));
  }

  // ── Viewing ─────────────────────────────────────────────────────────────────

  #[test]
  fn anonymous_sees_only_approved_evaluations() {
    let mut a = assessment(ProofreadingNeeded, Some(5));
    assert!(!can_view_evaluation(None, &a));
    a.evaluation_status = Some(Approved);
    assert!(can_view_evaluation(None, &a));
  }

  #[test]
  fn assigned_evaluator_sees_own_evaluation() {
    let a = assessment(BeingEvaluated, Some(5));
    let own = user(5, &[Permission::StatementsViewEvaluationAsEvaluator]);
    let other = user(6, &[Permission::StatementsViewEvaluationAsEvaluator]);
    assert!(can_view_evaluation(Some(&own), &a));
    assert!(!can_view_evaluation(Some(&other), &a));
  }

  #[test]
  fn reviewers_see_unapproved_evaluations() {
    let a = assessment(ApprovalNeeded, None);
    let reviewer = user(2, &[Permission::StatementsViewUnapprovedEvaluation]);
    assert!(can_view_evaluation(Some(&reviewer), &a));
    assert!(!can_view_evaluation(Some(&user(3, &[])), &a));
  }
}
