//! Synchronous queries run on the connection thread.
//!
//! Every function takes a plain [`Connection`] so it can be used both
//! directly inside `tokio_rusqlite::Connection::call` and on a
//! [`rusqlite::Transaction`] (which derefs to `Connection`).

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, params};

use factcheck_core::{
  assessment::{Assessment, EvaluationStatus, PromiseRating, Veracity},
  notification::{NewNotification, Notification},
  statement::{NewSource, NewSpeaker, Source, Speaker, Statement, Tag},
  store::{INTERESTING_LIMIT, SpeakerStats, StatementQuery, StatementRecord, StatementScope},
  user::{NewRole, NewUser, User},
};

use crate::{
  Error, Result,
  encode::{
    ASSESSMENT_COLUMNS, RawAssessment, RawNotification, RawStatement, RawUser,
    STATEMENT_COLUMNS, STATEMENT_WIDTH, USER_COLUMNS, encode_document, encode_dt,
    encode_permissions,
  },
};

// ─── Inserts ─────────────────────────────────────────────────────────────────

pub fn insert_role(conn: &Connection, input: &NewRole) -> Result<i64> {
  conn.execute(
    "INSERT INTO roles (key, name, permissions) VALUES (?1, ?2, ?3)",
    params![input.key, input.name, encode_permissions(&input.permissions)?],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn insert_user(conn: &Connection, input: &NewUser) -> Result<i64> {
  if !exists(conn, "roles", input.role_id)? {
    return Err(Error::not_found("role", input.role_id));
  }
  conn.execute(
    "INSERT INTO users (
       email, first_name, last_name, password_hash, role_id, active, notify_on_approval
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      input.email,
      input.first_name,
      input.last_name,
      input.password_hash,
      input.role_id,
      input.active,
      input.notify_on_approval,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn insert_speaker(conn: &Connection, input: &NewSpeaker) -> Result<Speaker> {
  conn.execute(
    "INSERT INTO speakers (first_name, last_name) VALUES (?1, ?2)",
    params![input.first_name, input.last_name],
  )?;
  Ok(Speaker {
    id:         conn.last_insert_rowid(),
    first_name: input.first_name.clone(),
    last_name:  input.last_name.clone(),
  })
}

pub fn insert_source(conn: &Connection, input: &NewSource) -> Result<Source> {
  conn.execute("INSERT INTO sources (name) VALUES (?1)", params![input.name])?;
  let id = conn.last_insert_rowid();

  let mut expert_ids = input.expert_ids.clone();
  expert_ids.sort_unstable();
  expert_ids.dedup();
  for user_id in &expert_ids {
    if !exists(conn, "users", *user_id)? {
      return Err(Error::not_found("user", *user_id));
    }
    conn.execute(
      "INSERT INTO source_experts (source_id, user_id) VALUES (?1, ?2)",
      params![id, user_id],
    )?;
  }

  Ok(Source { id, name: input.name.clone(), expert_ids })
}

pub fn insert_tag(conn: &Connection, name: &str) -> Result<Tag> {
  conn.execute("INSERT INTO tags (name) VALUES (?1)", params![name])?;
  Ok(Tag { id: conn.last_insert_rowid(), name: name.to_owned() })
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

/// Whether a row with `id` exists in `table`.
pub fn exists(conn: &Connection, table: &'static str, id: i64) -> Result<bool> {
  let sql = format!("SELECT 1 FROM {table} WHERE id = ?1");
  Ok(
    conn
      .query_row(&sql, params![id], |_| Ok(()))
      .optional()?
      .is_some(),
  )
}

pub fn load_user(conn: &Connection, id: i64) -> Result<Option<User>> {
  let sql = format!(
    "SELECT {USER_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.id = ?1"
  );
  let raw = conn.query_row(&sql, params![id], RawUser::from_row).optional()?;
  raw.map(RawUser::into_user).transpose()
}

pub fn load_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
  let sql = format!(
    "SELECT {USER_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id
     WHERE u.email = ?1 COLLATE NOCASE"
  );
  let raw = conn.query_row(&sql, params![email], RawUser::from_row).optional()?;
  raw.map(RawUser::into_user).transpose()
}

pub fn load_speaker(conn: &Connection, id: i64) -> Result<Option<Speaker>> {
  Ok(
    conn
      .query_row(
        "SELECT id, first_name, last_name FROM speakers WHERE id = ?1",
        params![id],
        |row| {
          Ok(Speaker {
            id:         row.get(0)?,
            first_name: row.get(1)?,
            last_name:  row.get(2)?,
          })
        },
      )
      .optional()?,
  )
}

/// A live source with its expert ids.
pub fn load_source(conn: &Connection, id: i64) -> Result<Option<Source>> {
  let name: Option<String> = conn
    .query_row(
      "SELECT name FROM sources WHERE id = ?1 AND deleted_at IS NULL",
      params![id],
      |row| row.get(0),
    )
    .optional()?;

  match name {
    Some(name) => Ok(Some(Source { id, name, expert_ids: source_expert_ids(conn, id)? })),
    None => Ok(None),
  }
}

pub fn source_expert_ids(conn: &Connection, source_id: i64) -> Result<Vec<i64>> {
  let mut stmt =
    conn.prepare("SELECT user_id FROM source_experts WHERE source_id = ?1 ORDER BY user_id")?;
  let ids = stmt
    .query_map(params![source_id], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<i64>>>()?;
  Ok(ids)
}

/// Active users who asked to hear about approvals.
pub fn approval_subscriber_ids(conn: &Connection) -> Result<Vec<i64>> {
  let mut stmt = conn.prepare(
    "SELECT id FROM users WHERE active = 1 AND notify_on_approval = 1 ORDER BY id",
  )?;
  let ids = stmt
    .query_map([], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<i64>>>()?;
  Ok(ids)
}

pub fn load_tag(conn: &Connection, id: i64) -> Result<Option<Tag>> {
  Ok(
    conn
      .query_row("SELECT id, name FROM tags WHERE id = ?1", params![id], |row| {
        Ok(Tag { id: row.get(0)?, name: row.get(1)? })
      })
      .optional()?,
  )
}

pub fn list_veracities(conn: &Connection) -> Result<Vec<Veracity>> {
  let mut stmt = conn.prepare("SELECT id, key, name FROM veracities ORDER BY id")?;
  let rows = stmt
    .query_map([], |row| {
      Ok(Veracity { id: row.get(0)?, key: row.get(1)?, name: row.get(2)? })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

pub fn list_promise_ratings(conn: &Connection) -> Result<Vec<PromiseRating>> {
  let mut stmt = conn.prepare("SELECT id, key, name FROM promise_ratings ORDER BY id")?;
  let rows = stmt
    .query_map([], |row| {
      Ok(PromiseRating { id: row.get(0)?, key: row.get(1)?, name: row.get(2)? })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

// ─── Statements ──────────────────────────────────────────────────────────────

pub fn load_tags(conn: &Connection, statement_id: i64) -> Result<Vec<i64>> {
  let mut stmt = conn.prepare(
    "SELECT tag_id FROM statement_tags WHERE statement_id = ?1 ORDER BY tag_id",
  )?;
  let tags = stmt
    .query_map(params![statement_id], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<i64>>>()?;
  Ok(tags)
}

fn decode_record(
  conn: &Connection,
  raw: (RawStatement, RawAssessment),
) -> Result<StatementRecord> {
  let (raw_statement, raw_assessment) = raw;
  let tags = load_tags(conn, raw_statement.id)?;
  Ok(StatementRecord {
    statement:  raw_statement.into_statement(tags)?,
    assessment: raw_assessment.into_assessment()?,
  })
}

fn read_pair(row: &rusqlite::Row<'_>) -> rusqlite::Result<(RawStatement, RawAssessment)> {
  Ok((RawStatement::from_row(row, 0)?, RawAssessment::from_row(row, STATEMENT_WIDTH)?))
}

/// A kept statement with its assessment.
pub fn load_record(conn: &Connection, id: i64) -> Result<Option<StatementRecord>> {
  let sql = format!(
    "SELECT {STATEMENT_COLUMNS}, {ASSESSMENT_COLUMNS}
     FROM statements s JOIN assessments a ON a.statement_id = s.id
     WHERE s.id = ?1 AND s.deleted_at IS NULL"
  );
  let raw = conn.query_row(&sql, params![id], read_pair).optional()?;
  raw.map(|raw| decode_record(conn, raw)).transpose()
}

const ORDERED: &str = "s.source_order IS NULL, s.source_order, s.excerpted_at, s.id";

/// `WHERE` and `ORDER BY` fragments for a scope. Every scope excludes
/// discarded statements and honours the optional source and speaker filters
/// bound as `?1` and `?2`.
fn scope_sql(scope: StatementScope) -> (String, String) {
  let mut conds = vec![
    "s.deleted_at IS NULL",
    "(?1 IS NULL OR s.source_id = ?1)",
    "(?2 IS NULL OR s.speaker_id = ?2)",
  ];
  let published = ["s.published = 1", "a.evaluation_status = 'approved'"];

  let order = match scope {
    StatementScope::Ordered => ORDERED.to_owned(),
    StatementScope::Published => {
      conds.extend(published);
      ORDERED.to_owned()
    }
    StatementScope::FactualAndPublished => {
      conds.extend(published);
      conds.push("s.statement_type = 'factual'");
      ORDERED.to_owned()
    }
    StatementScope::RelevantForStatistics => {
      conds.extend(published);
      conds.push("s.statement_type = 'factual'");
      conds.push("s.count_in_statistics = 1");
      ORDERED.to_owned()
    }
    StatementScope::PublishedImportantFirst => {
      conds.extend(published);
      format!("s.important DESC, {ORDERED}")
    }
    StatementScope::Interesting => {
      conds.extend(published);
      conds.push("s.statement_type = 'factual'");
      conds.push("s.important = 1");
      format!("s.excerpted_at DESC, s.id DESC LIMIT {INTERESTING_LIMIT}")
    }
  };

  (conds.join(" AND "), order)
}

pub fn list_records(conn: &Connection, query: &StatementQuery) -> Result<Vec<StatementRecord>> {
  let (where_clause, order) = scope_sql(query.scope);
  let sql = format!(
    "SELECT {STATEMENT_COLUMNS}, {ASSESSMENT_COLUMNS}
     FROM statements s JOIN assessments a ON a.statement_id = s.id
     WHERE {where_clause}
     ORDER BY {order}"
  );

  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params![query.source_id, query.speaker_id], read_pair)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raws.into_iter().map(|raw| decode_record(conn, raw)).collect()
}

/// Per-veracity counts of the speaker's statements in the
/// `relevant_for_statistics` scope.
pub fn speaker_stats(conn: &Connection, speaker_id: i64) -> Result<SpeakerStats> {
  if !exists(conn, "speakers", speaker_id)? {
    return Err(Error::not_found("speaker", speaker_id));
  }

  let (where_clause, _) = scope_sql(StatementScope::RelevantForStatistics);
  let sql = format!(
    "SELECT v.key, (
       SELECT COUNT(*) FROM statements s JOIN assessments a ON a.statement_id = s.id
       WHERE a.veracity_id = v.id AND {where_clause}
     )
     FROM veracities v ORDER BY v.id"
  );
  let mut stmt = conn.prepare(&sql)?;
  let counts = stmt
    .query_map(params![Option::<i64>::None, speaker_id], |row| {
      Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?
    .collect::<rusqlite::Result<_>>()?;
  Ok(SpeakerStats(counts))
}

pub fn insert_statement(conn: &Connection, statement: &Statement) -> Result<i64> {
  conn.execute(
    "INSERT INTO statements (
       content, title, statement_type, speaker_id, source_id, published,
       important, count_in_statistics, source_order, excerpted_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    params![
      statement.content,
      statement.title,
      statement.statement_type.as_ref(),
      statement.speaker_id,
      statement.source_id,
      statement.published,
      statement.important,
      statement.count_in_statistics,
      statement.source_order,
      encode_dt(statement.excerpted_at),
    ],
  )?;
  let id = conn.last_insert_rowid();
  replace_tags(conn, id, &statement.tags)?;
  Ok(id)
}

pub fn save_statement(conn: &Connection, statement: &Statement) -> Result<()> {
  conn.execute(
    "UPDATE statements SET
       content = ?2, title = ?3, statement_type = ?4, speaker_id = ?5,
       published = ?6, important = ?7, count_in_statistics = ?8,
       source_order = ?9, excerpted_at = ?10
     WHERE id = ?1",
    params![
      statement.id,
      statement.content,
      statement.title,
      statement.statement_type.as_ref(),
      statement.speaker_id,
      statement.published,
      statement.important,
      statement.count_in_statistics,
      statement.source_order,
      encode_dt(statement.excerpted_at),
    ],
  )?;
  replace_tags(conn, statement.id, &statement.tags)
}

fn replace_tags(conn: &Connection, statement_id: i64, tags: &[i64]) -> Result<()> {
  conn.execute("DELETE FROM statement_tags WHERE statement_id = ?1", params![statement_id])?;
  let mut stmt =
    conn.prepare("INSERT INTO statement_tags (statement_id, tag_id) VALUES (?1, ?2)")?;
  for tag_id in tags {
    stmt.execute(params![statement_id, tag_id])?;
  }
  Ok(())
}

pub fn insert_assessment(
  conn: &Connection,
  statement_id: i64,
  evaluator_id: Option<i64>,
) -> Result<()> {
  conn.execute(
    "INSERT INTO assessments (statement_id, evaluation_status, evaluator_id)
     VALUES (?1, ?2, ?3)",
    params![statement_id, EvaluationStatus::BeingEvaluated.as_ref(), evaluator_id],
  )?;
  Ok(())
}

pub fn save_assessment(conn: &Connection, assessment: &Assessment) -> Result<()> {
  let slatejson = encode_document(&assessment.explanation_slatejson)?;
  conn.execute(
    "UPDATE assessments SET
       evaluation_status = ?2, veracity_id = ?3, promise_rating_id = ?4,
       short_explanation = ?5, explanation_html = ?6, explanation_slatejson = ?7,
       evaluator_id = ?8
     WHERE id = ?1",
    params![
      assessment.id,
      assessment.evaluation_status.as_ref().map(AsRef::<str>::as_ref),
      assessment.veracity_id,
      assessment.promise_rating_id,
      assessment.short_explanation,
      assessment.explanation_html,
      slatejson,
      assessment.evaluator_id,
    ],
  )?;
  Ok(())
}

/// Kept statements of `source_id` whose assessment awaits proofreading.
pub fn proofreading_pending(conn: &Connection, source_id: i64) -> Result<usize> {
  let count: i64 = conn.query_row(
    "SELECT COUNT(*) FROM statements s JOIN assessments a ON a.statement_id = s.id
     WHERE s.source_id = ?1 AND s.deleted_at IS NULL AND a.evaluation_status = ?2",
    params![source_id, EvaluationStatus::ProofreadingNeeded.as_ref()],
    |row| row.get(0),
  )?;
  Ok(usize::try_from(count).unwrap_or_default())
}

pub fn discard_statement(conn: &Connection, id: i64) -> Result<()> {
  let changed = conn.execute(
    "UPDATE statements SET deleted_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
    params![id, encode_dt(Utc::now())],
  )?;
  if changed == 0 {
    return Err(Error::not_found("statement", id));
  }
  Ok(())
}

/// Clear every position within the source, then number `ids` from zero.
pub fn reorder_source(conn: &Connection, source_id: i64, ids: &[i64]) -> Result<()> {
  if load_source(conn, source_id)?.is_none() {
    return Err(Error::not_found("source", source_id));
  }
  conn.execute(
    "UPDATE statements SET source_order = NULL WHERE source_id = ?1",
    params![source_id],
  )?;

  let mut stmt = conn.prepare(
    "UPDATE statements SET source_order = ?3
     WHERE id = ?1 AND source_id = ?2 AND deleted_at IS NULL",
  )?;
  for (position, id) in ids.iter().enumerate() {
    if stmt.execute(params![id, source_id, position as i64])? == 0 {
      return Err(Error::not_found("statement", *id));
    }
  }
  Ok(())
}

// ─── Notifications ───────────────────────────────────────────────────────────

pub fn insert_notifications(conn: &Connection, items: &[NewNotification]) -> Result<()> {
  let created_at = encode_dt(Utc::now());
  let mut stmt = conn.prepare(
    "INSERT INTO notifications (recipient_id, statement_id, statement_text, full_text, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
  )?;
  for item in items {
    stmt.execute(params![
      item.recipient_id,
      item.statement_id,
      item.statement_text,
      item.full_text,
      created_at,
    ])?;
  }
  Ok(())
}

pub fn notifications_for(conn: &Connection, user_id: i64) -> Result<Vec<Notification>> {
  let mut stmt = conn.prepare(
    "SELECT id, recipient_id, statement_id, statement_text, full_text, created_at, read_at
     FROM notifications WHERE recipient_id = ?1
     ORDER BY created_at DESC, id DESC",
  )?;
  let raws = stmt
    .query_map(params![user_id], RawNotification::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawNotification::into_notification).collect()
}
