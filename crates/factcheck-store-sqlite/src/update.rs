//! The `update_statement` transaction.
//!
//! Runs entirely on the connection thread. The transaction is committed only
//! at the very end; any early return drops it, which rolls back the
//! statement, assessment, tag and notification writes together.

use rusqlite::Connection;

use factcheck_core::{
  alert::ProofreadingQueue,
  assessment::EvaluationStatus,
  changes::AssessmentField,
  notification::{Batch, NotificationDraft, Recipient},
  statement::Statement,
  store::UpdateOutcome,
  update::{
    AssessmentUpdate, StatementUpdate, plan_assessment, plan_statement, validation_basis,
  },
};

use crate::{Error, Result, queries};

pub(crate) fn update_in_tx(
  conn: &mut Connection,
  id: i64,
  update: StatementUpdate,
  actor_id: i64,
) -> Result<UpdateOutcome> {
  let tx = conn.transaction()?;

  let actor =
    queries::load_user(&tx, actor_id)?.ok_or_else(|| Error::not_found("user", actor_id))?;
  let record =
    queries::load_record(&tx, id)?.ok_or_else(|| Error::not_found("statement", id))?;
  let statement = record.statement;
  let mut assessment = record.assessment;
  let speaker = queries::load_speaker(&tx, statement.speaker_id)?
    .ok_or_else(|| Error::not_found("speaker", statement.speaker_id))?;
  let assessment_before = assessment.clone();

  // ── Assessment ────────────────────────────────────────────────────────
  let mut drafts = Vec::new();
  let mut entered_proofreading = false;
  if let Some(payload) = &update.assessment {
    check_assessment_refs(&tx, payload)?;

    let basis = validation_basis(&statement, &update);
    let plan = plan_assessment(&actor, &basis, &speaker, assessment, payload)?;
    if !plan.diff.changes().is_empty() {
      queries::save_assessment(&tx, plan.diff.after())?;
    }
    entered_proofreading = plan.diff.changed(AssessmentField::EvaluationStatus)
      && plan.diff.after().evaluation_status == Some(EvaluationStatus::ProofreadingNeeded);
    drafts = plan.drafts;
    assessment = plan.diff.into_after();
  }

  // ── Statement ─────────────────────────────────────────────────────────
  check_statement_refs(&tx, &update)?;
  let diff = plan_statement(&actor, statement, &assessment_before, &assessment, &update)?;
  if !diff.changes().is_empty() {
    queries::save_statement(&tx, diff.after())?;
  }
  let statement = diff.into_after();

  // ── Notifications ─────────────────────────────────────────────────────
  let batch = resolve_recipients(&tx, &statement, &drafts)?;
  let notifications_created = batch.len();
  queries::insert_notifications(&tx, &batch.into_items())?;

  // ── Proofreading queue ────────────────────────────────────────────────
  let proofreading_queue = match (entered_proofreading, statement.source_id) {
    (true, Some(source_id)) => match queries::load_source(&tx, source_id)? {
      Some(source) => Some(ProofreadingQueue {
        source_id,
        source_name: source.name,
        pending: queries::proofreading_pending(&tx, source_id)?,
      }),
      None => None,
    },
    _ => None,
  };

  let record =
    queries::load_record(&tx, id)?.ok_or_else(|| Error::not_found("statement", id))?;
  tx.commit()?;

  tracing::debug!(
    statement = id,
    actor = actor_id,
    notifications = notifications_created,
    status = ?assessment.evaluation_status,
    "statement updated"
  );

  Ok(UpdateOutcome { record, notifications_created, proofreading_queue })
}

/// Referenced evaluator and rating rows must exist. Explicit nulls clear and
/// omissions keep, so only `Some(Some(id))` is checked.
fn check_assessment_refs(conn: &Connection, payload: &AssessmentUpdate) -> Result<()> {
  let refs = [
    ("users", "user", payload.evaluator_id),
    ("veracities", "veracity", payload.veracity_id),
    ("promise_ratings", "promise rating", payload.promise_rating_id),
  ];
  for (table, entity, value) in refs {
    if let Some(Some(id)) = value
      && !queries::exists(conn, table, id)?
    {
      return Err(Error::not_found(entity, id));
    }
  }
  Ok(())
}

fn check_statement_refs(conn: &Connection, update: &StatementUpdate) -> Result<()> {
  if let Some(speaker_id) = update.speaker
    && !queries::exists(conn, "speakers", speaker_id)?
  {
    return Err(Error::not_found("speaker", speaker_id));
  }
  for tag_id in update.tags.iter().flatten() {
    if !queries::exists(conn, "tags", *tag_id)? {
      return Err(Error::not_found("tag", *tag_id));
    }
  }
  Ok(())
}

/// Expand symbolic recipients to user ids. Within a draft group the first
/// draft per user wins; unknown users are skipped.
fn resolve_recipients(
  conn: &Connection,
  statement: &Statement,
  drafts: &[NotificationDraft],
) -> Result<Batch> {
  let mut batch = Batch::new(statement.id);

  for draft in drafts {
    let ids = match draft.recipient {
      Recipient::User(user_id) => vec![user_id],
      Recipient::SourceExperts => match statement.source_id {
        Some(source_id) => queries::source_expert_ids(conn, source_id)?,
        None => Vec::new(),
      },
      Recipient::ApprovalSubscribers => queries::approval_subscriber_ids(conn)?,
    };

    for user_id in ids {
      if !queries::exists(conn, "users", user_id)? {
        tracing::debug!(user = user_id, kind = ?draft.kind, "skipping notification for unknown user");
        continue;
      }
      batch.push(user_id, draft);
    }
  }

  Ok(batch)
}
