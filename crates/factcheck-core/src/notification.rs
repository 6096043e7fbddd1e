//! In-app notifications emitted as a side effect of assessment changes.
//!
//! Derivation is pure: [`derive`] turns an assessment diff into drafts
//! addressed to symbolic [`Recipient`]s. The store resolves recipients to user
//! ids inside the update transaction and collects the rows with a [`Batch`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  assessment::EvaluationStatus,
  changes::{AssessmentDiff, AssessmentField},
  statement::{Speaker, Statement},
  user::User,
};

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  pub id:             i64,
  pub recipient_id:   i64,
  pub statement_id:   i64,
  /// Short text shown in lists.
  pub statement_text: String,
  pub full_text:      String,
  pub created_at:     DateTime<Utc>,
  pub read_at:        Option<DateTime<Utc>>,
}

/// A notification row ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
  pub recipient_id:   i64,
  pub statement_id:   i64,
  pub statement_text: String,
  pub full_text:      String,
}

// ─── Drafts ──────────────────────────────────────────────────────────────────

/// Who a draft is addressed to, before lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
  User(i64),
  /// Every expert linked to the statement's source.
  SourceExperts,
  /// Every active user who opted into approval notifications.
  ApprovalSubscribers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftKind {
  Assigned,
  Unassigned,
  StatusChanged(EvaluationStatus),
}

/// Drafts are deduplicated per recipient within a group, never across groups:
/// an evaluator assigned and moved to a new status in one update hears about
/// both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftGroup {
  Evaluator,
  Status,
}

impl DraftKind {
  pub fn group(self) -> DraftGroup {
    match self {
      Self::Assigned | Self::Unassigned => DraftGroup::Evaluator,
      Self::StatusChanged(_) => DraftGroup::Status,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
  pub kind:           DraftKind,
  pub recipient:      Recipient,
  pub statement_text: String,
  pub full_text:      String,
}

/// Derive the notifications caused by a staged assessment update.
///
/// `statement` and `speaker` are only used to quote the statement.
pub fn derive(
  diff: &AssessmentDiff,
  actor: &User,
  statement: &Statement,
  speaker: &Speaker,
) -> Vec<NotificationDraft> {
  let mut drafts = Vec::new();
  let who = actor.display_name();
  let quoted = statement.display_in_notification(speaker);

  if diff.changed(AssessmentField::Evaluator) {
    if let Some(new_id) = diff.after().evaluator_id {
      drafts.push(NotificationDraft {
        kind:           DraftKind::Assigned,
        recipient:      Recipient::User(new_id),
        statement_text: format!("{who} assigned you as evaluator"),
        full_text:      format!("{who} assigned you as evaluator of statement {quoted}"),
      });
    }
    if let Some(old_id) = diff.before().evaluator_id {
      drafts.push(NotificationDraft {
        kind:           DraftKind::Unassigned,
        recipient:      Recipient::User(old_id),
        statement_text: format!("{who} removed you as evaluator"),
        full_text:      format!("{who} removed you as evaluator of statement {quoted}"),
      });
    }
  }

  let status_change = diff.changed(AssessmentField::EvaluationStatus)
    && diff.before().evaluation_status.is_some();
  if status_change && let Some(status) = diff.after().evaluation_status {
    let label = status.label();
    let kind = DraftKind::StatusChanged(status);
    let short = format!("{who} changed status to {label}");

    if status == EvaluationStatus::ApprovalNeeded {
      drafts.push(NotificationDraft {
        kind,
        recipient: Recipient::SourceExperts,
        statement_text: short.clone(),
        full_text: format!("{who} changed status of statement {quoted} you edit to {label}"),
      });
    }

    if let Some(evaluator_id) = diff.after().evaluator_id {
      drafts.push(NotificationDraft {
        kind,
        recipient: Recipient::User(evaluator_id),
        statement_text: short.clone(),
        full_text: format!(
          "{who} changed status of statement {quoted} you evaluate to {label}"
        ),
      });
    }

    if status == EvaluationStatus::Approved {
      drafts.push(NotificationDraft {
        kind,
        recipient: Recipient::ApprovalSubscribers,
        statement_text: short,
        full_text: format!("{who} changed status of statement {quoted} to {label}"),
      });
    }
  }

  drafts
}

// ─── Batch ───────────────────────────────────────────────────────────────────

/// Collects resolved notifications, keeping at most one per recipient and
/// [`DraftGroup`].
#[derive(Debug)]
pub struct Batch {
  statement_id: i64,
  seen:         HashSet<(i64, DraftGroup)>,
  items:        Vec<NewNotification>,
}

impl Batch {
  pub fn new(statement_id: i64) -> Self {
    Self { statement_id, seen: HashSet::new(), items: Vec::new() }
  }

  /// Add `draft` for `recipient_id`. Returns `false` when the recipient was
  /// already notified by a draft of the same group.
  pub fn push(&mut self, recipient_id: i64, draft: &NotificationDraft) -> bool {
    if !self.seen.insert((recipient_id, draft.kind.group())) {
      return false;
    }
    self.items.push(NewNotification {
      recipient_id,
      statement_id: self.statement_id,
      statement_text: draft.statement_text.clone(),
      full_text: draft.full_text.clone(),
    });
    true
  }

  pub fn len(&self) -> usize { self.items.len() }

  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  pub fn into_items(self) -> Vec<NewNotification> { self.items }
}
