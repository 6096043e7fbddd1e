//! Explicit before/after tracking for staged updates.
//!
//! A [`Diff`] is computed once per update from the persisted record and the
//! staged record, and the same value is threaded through authorization,
//! notification derivation and validation.

use std::collections::BTreeSet;

use serde::Serialize;
use strum::{AsRefStr, Display};

use crate::{assessment::Assessment, statement::Statement};

// ─── Fields ──────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, AsRefStr, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatementField {
  Content,
  Title,
  StatementType,
  Speaker,
  Source,
  Published,
  Important,
  CountInStatistics,
  SourceOrder,
  ExcerptedAt,
  Tags,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, AsRefStr, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AssessmentField {
  #[strum(serialize = "evaluator_id")]
  #[serde(rename = "evaluator_id")]
  Evaluator,
  VeracityId,
  PromiseRatingId,
  ShortExplanation,
  ExplanationHtml,
  ExplanationSlatejson,
  EvaluationStatus,
}

// ─── ChangeSet ───────────────────────────────────────────────────────────────

/// The names of the fields that differ between two versions of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet<F: Ord>(BTreeSet<F>);

impl<F: Ord + Copy> ChangeSet<F> {
  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn contains(&self, field: F) -> bool { self.0.contains(&field) }

  pub fn iter(&self) -> impl Iterator<Item = F> + '_ { self.0.iter().copied() }

  /// `true` when every changed field is in `allowed`. Vacuously true for an
  /// empty change set.
  pub fn only(&self, allowed: &[F]) -> bool {
    self.0.iter().all(|f| allowed.contains(f))
  }

  /// `true` when exactly `field` changed and nothing else.
  pub fn is_exactly(&self, field: F) -> bool {
    self.0.len() == 1 && self.0.contains(&field)
  }
}

impl<F: Ord> Default for ChangeSet<F> {
  fn default() -> Self { Self(BTreeSet::new()) }
}

impl<F: Ord> FromIterator<F> for ChangeSet<F> {
  fn from_iter<T: IntoIterator<Item = F>>(iter: T) -> Self {
    Self(iter.into_iter().collect())
  }
}

// ─── Tracked / Diff ──────────────────────────────────────────────────────────

/// A record whose field-level changes can be enumerated.
pub trait Tracked {
  type Field: Copy + Ord;

  /// Fields whose value in `after` differs from `self`.
  fn changed_fields(&self, after: &Self) -> ChangeSet<Self::Field>;
}

/// A persisted record paired with its staged replacement.
#[derive(Debug, Clone)]
pub struct Diff<T: Tracked> {
  before:  T,
  after:   T,
  changes: ChangeSet<T::Field>,
}

impl<T: Tracked> Diff<T> {
  pub fn new(before: T, after: T) -> Self {
    let changes = before.changed_fields(&after);
    Self { before, after, changes }
  }

  pub fn before(&self) -> &T { &self.before }

  pub fn after(&self) -> &T { &self.after }

  pub fn changes(&self) -> &ChangeSet<T::Field> { &self.changes }

  pub fn changed(&self, field: T::Field) -> bool { self.changes.contains(field) }

  pub fn into_after(self) -> T { self.after }
}

pub type StatementDiff = Diff<Statement>;
pub type AssessmentDiff = Diff<Assessment>;

macro_rules! collect_changes {
  ($before:expr, $after:expr, { $($field:ident => $variant:expr),+ $(,)? }) => {{
    let mut changed = BTreeSet::new();
    $(
      if $before.$field != $after.$field {
        changed.insert($variant);
      }
    )+
    ChangeSet(changed)
  }};
}

impl Tracked for Statement {
  type Field = StatementField;

  fn changed_fields(&self, after: &Self) -> ChangeSet<StatementField> {
    collect_changes!(self, after, {
      content             => StatementField::Content,
      title               => StatementField::Title,
      statement_type      => StatementField::StatementType,
      speaker_id          => StatementField::Speaker,
      source_id           => StatementField::Source,
      published           => StatementField::Published,
      important           => StatementField::Important,
      count_in_statistics => StatementField::CountInStatistics,
      source_order        => StatementField::SourceOrder,
      excerpted_at        => StatementField::ExcerptedAt,
      tags                => StatementField::Tags,
    })
  }
}

impl Tracked for Assessment {
  type Field = AssessmentField;

  fn changed_fields(&self, after: &Self) -> ChangeSet<AssessmentField> {
    collect_changes!(self, after, {
      evaluator_id          => AssessmentField::Evaluator,
      veracity_id           => AssessmentField::VeracityId,
      promise_rating_id     => AssessmentField::PromiseRatingId,
      short_explanation     => AssessmentField::ShortExplanation,
      explanation_html      => AssessmentField::ExplanationHtml,
      explanation_slatejson => AssessmentField::ExplanationSlatejson,
      evaluation_status     => AssessmentField::EvaluationStatus,
    })
  }
}
