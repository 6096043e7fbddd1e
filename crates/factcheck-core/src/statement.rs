//! Statements and the passive records around them: speakers, sources, tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

// ─── Statement type / rating model ───────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatementType {
  #[default]
  Factual,
  Promise,
}

/// Which rating scale applies to an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingModel {
  Veracity,
  PromiseRating,
}

impl StatementType {
  pub fn rating_model(self) -> RatingModel {
    match self {
      Self::Factual => RatingModel::Veracity,
      Self::Promise => RatingModel::PromiseRating,
    }
  }
}

// ─── Statement ───────────────────────────────────────────────────────────────

/// One utterance by a speaker. Owns exactly one
/// [`Assessment`](crate::assessment::Assessment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
  pub id:                  i64,
  pub content:             String,
  pub title:               Option<String>,
  pub statement_type:      StatementType,
  pub speaker_id:          i64,
  pub source_id:           Option<i64>,
  pub published:           bool,
  pub important:           bool,
  pub count_in_statistics: bool,
  /// Explicit position within the source; `None` sorts last.
  pub source_order:        Option<i64>,
  pub excerpted_at:        DateTime<Utc>,
  /// Soft-delete marker. Discarded statements are invisible to every scope.
  pub deleted_at:          Option<DateTime<Utc>>,
  /// Tag ids, kept sorted and free of duplicates.
  pub tags:                Vec<i64>,
}

impl Statement {
  pub fn is_kept(&self) -> bool { self.deleted_at.is_none() }

  pub fn rating_model(&self) -> RatingModel {
    self.statement_type.rating_model()
  }

  /// How the statement is quoted in notification texts:
  /// `First Last: "content…"`.
  pub fn display_in_notification(&self, speaker: &Speaker) -> String {
    format!(
      "{} {}: \"{}\"",
      speaker.first_name,
      speaker.last_name,
      truncate(&self.content, 50)
    )
  }
}

/// Shorten `s` to at most `max` characters, marking the cut with `…`.
pub fn truncate(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    return s.to_owned();
  }
  let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
  out.push('…');
  out
}

/// Normalise a tag id list: sorted, deduplicated.
pub fn normalize_tags(mut tags: Vec<i64>) -> Vec<i64> {
  tags.sort_unstable();
  tags.dedup();
  tags
}

/// Input to [`crate::store::EditorialStore::create_statement`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewStatement {
  pub content:             String,
  #[serde(default)]
  pub title:               Option<String>,
  #[serde(default)]
  pub statement_type:      StatementType,
  pub speaker_id:          i64,
  #[serde(default)]
  pub source_id:           Option<i64>,
  #[serde(default)]
  pub important:           bool,
  #[serde(default = "default_true")]
  pub count_in_statistics: bool,
  #[serde(default)]
  pub excerpted_at:        Option<DateTime<Utc>>,
  #[serde(default)]
  pub tags:                Vec<i64>,
  #[serde(default)]
  pub evaluator_id:        Option<i64>,
}

fn default_true() -> bool { true }

impl NewStatement {
  pub fn new(content: impl Into<String>, speaker_id: i64) -> Self {
    Self {
      content: content.into(),
      title: None,
      statement_type: StatementType::default(),
      speaker_id,
      source_id: None,
      important: false,
      count_in_statistics: true,
      excerpted_at: None,
      tags: Vec::new(),
      evaluator_id: None,
    }
  }
}

// ─── Speaker / Source / Tag ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speaker {
  pub id:         i64,
  pub first_name: String,
  pub last_name:  String,
}

/// A debate, interview or other occasion where statements were made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
  pub id:         i64,
  pub name:       String,
  /// Users notified when a statement of this source enters approval.
  pub expert_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
  pub id:   i64,
  pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSpeaker {
  pub first_name: String,
  pub last_name:  String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSource {
  pub name:       String,
  #[serde(default)]
  pub expert_ids: Vec<i64>,
}
