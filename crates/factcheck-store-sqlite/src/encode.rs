//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that string
//! order matches time order. Permission sets and explanation documents are
//! stored as compact JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use factcheck_core::{
  assessment::{Assessment, EvaluationStatus},
  notification::Notification,
  statement::{Statement, StatementType},
  user::{PermissionSet, Role, User},
};
use rusqlite::Row;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<EvaluationStatus> {
  s.parse()
    .map_err(|_| Error::configuration(format!("unknown evaluation status: {s:?}")))
}

pub fn decode_statement_type(s: &str) -> Result<StatementType> {
  s.parse()
    .map_err(|_| Error::configuration(format!("unknown statement type: {s:?}")))
}

// ─── Permissions ─────────────────────────────────────────────────────────────

pub fn encode_permissions(permissions: &PermissionSet) -> Result<String> {
  Ok(serde_json::to_string(permissions)?)
}

/// Unknown permission tags are dropped with a warning rather than failing the
/// whole user lookup.
pub fn decode_permissions(role_key: &str, s: &str) -> Result<PermissionSet> {
  let raw: Vec<String> = serde_json::from_str(s)?;
  let (set, unknown) = PermissionSet::parse_lossy(&raw);
  for tag in unknown {
    tracing::warn!(role = role_key, permission = %tag, "ignoring unknown permission");
  }
  Ok(set)
}

// ─── JSON documents ──────────────────────────────────────────────────────────

pub fn encode_document(doc: &Option<serde_json::Value>) -> Result<Option<String>> {
  Ok(doc.as_ref().map(serde_json::to_string).transpose()?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawStatement::from_row`]; statements are aliased `s`.
pub const STATEMENT_COLUMNS: &str = "s.id, s.content, s.title, s.statement_type, s.speaker_id, \
   s.source_id, s.published, s.important, s.count_in_statistics, s.source_order, \
   s.excerpted_at, s.deleted_at";

/// Column list matching [`RawAssessment::from_row`]; assessments are aliased
/// `a`.
pub const ASSESSMENT_COLUMNS: &str = "a.id, a.statement_id, a.evaluation_status, \
   a.veracity_id, a.promise_rating_id, a.short_explanation, a.explanation_html, \
   a.explanation_slatejson, a.evaluator_id";

/// Number of columns in [`STATEMENT_COLUMNS`].
pub const STATEMENT_WIDTH: usize = 12;

/// Raw values read directly from a `statements` row.
pub struct RawStatement {
  pub id:                  i64,
  pub content:             String,
  pub title:               Option<String>,
  pub statement_type:      String,
  pub speaker_id:          i64,
  pub source_id:           Option<i64>,
  pub published:           bool,
  pub important:           bool,
  pub count_in_statistics: bool,
  pub source_order:        Option<i64>,
  pub excerpted_at:        String,
  pub deleted_at:          Option<String>,
}

impl RawStatement {
  /// Read [`STATEMENT_COLUMNS`] starting at column `at`.
  pub fn from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                  row.get(at)?,
      content:             row.get(at + 1)?,
      title:               row.get(at + 2)?,
      statement_type:      row.get(at + 3)?,
      speaker_id:          row.get(at + 4)?,
      source_id:           row.get(at + 5)?,
      published:           row.get(at + 6)?,
      important:           row.get(at + 7)?,
      count_in_statistics: row.get(at + 8)?,
      source_order:        row.get(at + 9)?,
      excerpted_at:        row.get(at + 10)?,
      deleted_at:          row.get(at + 11)?,
    })
  }

  pub fn into_statement(self, tags: Vec<i64>) -> Result<Statement> {
    Ok(Statement {
      id: self.id,
      content: self.content,
      title: self.title,
      statement_type: decode_statement_type(&self.statement_type)?,
      speaker_id: self.speaker_id,
      source_id: self.source_id,
      published: self.published,
      important: self.important,
      count_in_statistics: self.count_in_statistics,
      source_order: self.source_order,
      excerpted_at: decode_dt(&self.excerpted_at)?,
      deleted_at: self.deleted_at.as_deref().map(decode_dt).transpose()?,
      tags,
    })
  }
}

/// Raw values read directly from an `assessments` row.
pub struct RawAssessment {
  pub id:                    i64,
  pub statement_id:          i64,
  pub evaluation_status:     Option<String>,
  pub veracity_id:           Option<i64>,
  pub promise_rating_id:     Option<i64>,
  pub short_explanation:     Option<String>,
  pub explanation_html:      Option<String>,
  pub explanation_slatejson: Option<String>,
  pub evaluator_id:          Option<i64>,
}

impl RawAssessment {
  /// Read [`ASSESSMENT_COLUMNS`] starting at column `at`.
  pub fn from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                    row.get(at)?,
      statement_id:          row.get(at + 1)?,
      evaluation_status:     row.get(at + 2)?,
      veracity_id:           row.get(at + 3)?,
      promise_rating_id:     row.get(at + 4)?,
      short_explanation:     row.get(at + 5)?,
      explanation_html:      row.get(at + 6)?,
      explanation_slatejson: row.get(at + 7)?,
      evaluator_id:          row.get(at + 8)?,
    })
  }

  pub fn into_assessment(self) -> Result<Assessment> {
    let evaluation_status = match self.evaluation_status.as_deref() {
      Some(s) => Some(decode_status(s).inspect_err(|e| {
        tracing::error!(assessment = self.id, error = %e, "corrupt assessment row");
      })?),
      None => None,
    };
    let explanation_slatejson = self
      .explanation_slatejson
      .as_deref()
      .map(serde_json::from_str)
      .transpose()?;

    Ok(Assessment {
      id: self.id,
      statement_id: self.statement_id,
      evaluation_status,
      veracity_id: self.veracity_id,
      promise_rating_id: self.promise_rating_id,
      short_explanation: self.short_explanation,
      explanation_html: self.explanation_html,
      explanation_slatejson,
      evaluator_id: self.evaluator_id,
    })
  }
}

/// Column list matching [`RawUser::from_row`]; users are aliased `u`, roles
/// `r`.
pub const USER_COLUMNS: &str = "u.id, u.email, u.first_name, u.last_name, u.password_hash, \
   u.active, u.notify_on_approval, r.id, r.key, r.name, r.permissions";

/// Raw values read from a `users` row joined with its role.
pub struct RawUser {
  pub id:                 i64,
  pub email:              String,
  pub first_name:         String,
  pub last_name:          String,
  pub password_hash:      Option<String>,
  pub active:             bool,
  pub notify_on_approval: bool,
  pub role_id:            i64,
  pub role_key:           String,
  pub role_name:          String,
  pub permissions:        String,
}

impl RawUser {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                 row.get(0)?,
      email:              row.get(1)?,
      first_name:         row.get(2)?,
      last_name:          row.get(3)?,
      password_hash:      row.get(4)?,
      active:             row.get(5)?,
      notify_on_approval: row.get(6)?,
      role_id:            row.get(7)?,
      role_key:           row.get(8)?,
      role_name:          row.get(9)?,
      permissions:        row.get(10)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    let permissions = decode_permissions(&self.role_key, &self.permissions)?;
    Ok(User {
      id: self.id,
      email: self.email,
      first_name: self.first_name,
      last_name: self.last_name,
      password_hash: self.password_hash,
      active: self.active,
      notify_on_approval: self.notify_on_approval,
      role: Role {
        id: self.role_id,
        key: self.role_key,
        name: self.role_name,
        permissions,
      },
    })
  }
}

/// Raw values read directly from a `notifications` row.
pub struct RawNotification {
  pub id:             i64,
  pub recipient_id:   i64,
  pub statement_id:   i64,
  pub statement_text: String,
  pub full_text:      String,
  pub created_at:     String,
  pub read_at:        Option<String>,
}

impl RawNotification {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      recipient_id:   row.get(1)?,
      statement_id:   row.get(2)?,
      statement_text: row.get(3)?,
      full_text:      row.get(4)?,
      created_at:     row.get(5)?,
      read_at:        row.get(6)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      id:             self.id,
      recipient_id:   self.recipient_id,
      statement_id:   self.statement_id,
      statement_text: self.statement_text,
      full_text:      self.full_text,
      created_at:     decode_dt(&self.created_at)?,
      read_at:        self.read_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_sort_as_strings() {
    let early = "2024-01-01T09:00:00Z".parse::<DateTime<Utc>>().unwrap();
    let late = "2024-01-01T10:00:00.5Z".parse::<DateTime<Utc>>().unwrap();
    assert!(encode_dt(early) < encode_dt(late));
    assert_eq!(decode_dt(&encode_dt(late)).unwrap(), late);
  }

  #[test]
  fn unknown_status_is_a_configuration_error() {
    let err = decode_status("waiting").unwrap_err();
    assert!(matches!(err, Error::Core(factcheck_core::Error::Configuration(_))));
  }

  #[test]
  fn unknown_permissions_are_dropped() {
    let set = decode_permissions("admin", r#"["statements:add","statements:fly"]"#).unwrap();
    assert!(set.contains(factcheck_core::user::Permission::StatementsAdd));
    assert_eq!(set.iter().count(), 1);
  }
}
