//! [`SqliteStore`], the SQLite implementation of [`EditorialStore`].

use std::path::Path;

use chrono::Utc;

use factcheck_core::{
  assessment::{PromiseRating, Veracity},
  notification::Notification,
  statement::{NewSource, NewSpeaker, NewStatement, Source, Speaker, Statement, Tag, normalize_tags},
  store::{EditorialStore, SpeakerStats, StatementQuery, StatementRecord, UpdateOutcome},
  update::StatementUpdate,
  user::{NewRole, NewUser, Role, User},
};

use crate::{Error, Result, queries, schema::{SCHEMA, SCHEMA_VERSION}, update::update_in_tx};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A fact-checking store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version > SCHEMA_VERSION {
          return Ok(Err(Error::configuration(format!(
            "database schema version {version} is newer than supported version {SCHEMA_VERSION}"
          ))));
        }
        conn.execute_batch(SCHEMA)?;
        Ok(Ok(()))
      })
      .await?
  }
}

// ─── EditorialStore impl ─────────────────────────────────────────────────────

impl EditorialStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_role(&self, input: NewRole) -> Result<Role> {
    let row = input.clone();
    let id = self
      .conn
      .call(move |conn| Ok(queries::insert_role(conn, &row)))
      .await??;
    Ok(Role { id, key: input.key, name: input.name, permissions: input.permissions })
  }

  async fn create_user(&self, input: NewUser) -> Result<User> {
    self
      .conn
      .call(move |conn| {
        Ok(queries::insert_user(conn, &input).and_then(|id| {
          queries::load_user(conn, id)?.ok_or_else(|| Error::not_found("user", id))
        }))
      })
      .await?
  }

  async fn get_user(&self, id: i64) -> Result<Option<User>> {
    self.conn.call(move |conn| Ok(queries::load_user(conn, id))).await?
  }

  async fn find_user_by_email<'a>(&'a self, email: &'a str) -> Result<Option<User>> {
    let email = email.to_owned();
    self
      .conn
      .call(move |conn| Ok(queries::load_user_by_email(conn, &email)))
      .await?
  }

  // ── Passive records ───────────────────────────────────────────────────────

  async fn create_speaker(&self, input: NewSpeaker) -> Result<Speaker> {
    self.conn.call(move |conn| Ok(queries::insert_speaker(conn, &input))).await?
  }

  async fn create_source(&self, input: NewSource) -> Result<Source> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let source = match queries::insert_source(&tx, &input) {
          Ok(source) => source,
          Err(e) => return Ok(Err(e)),
        };
        tx.commit()?;
        Ok(Ok(source))
      })
      .await?
  }

  async fn create_tag(&self, name: String) -> Result<Tag> {
    self.conn.call(move |conn| Ok(queries::insert_tag(conn, &name))).await?
  }

  async fn list_veracities(&self) -> Result<Vec<Veracity>> {
    self.conn.call(|conn| Ok(queries::list_veracities(conn))).await?
  }

  async fn list_promise_ratings(&self) -> Result<Vec<PromiseRating>> {
    self.conn.call(|conn| Ok(queries::list_promise_ratings(conn))).await?
  }

  // ── Statements ────────────────────────────────────────────────────────────

  async fn create_statement(&self, input: NewStatement) -> Result<StatementRecord> {
    let statement = Statement {
      id:                  0,
      content:             input.content,
      title:               input.title,
      statement_type:      input.statement_type,
      speaker_id:          input.speaker_id,
      source_id:           input.source_id,
      published:           false,
      important:           input.important,
      count_in_statistics: input.count_in_statistics,
      source_order:        None,
      excerpted_at:        input.excerpted_at.unwrap_or_else(Utc::now),
      deleted_at:          None,
      tags:                normalize_tags(input.tags),
    };
    let evaluator_id = input.evaluator_id;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let record = match create_in_tx(&tx, &statement, evaluator_id) {
          Ok(record) => record,
          Err(e) => return Ok(Err(e)),
        };
        tx.commit()?;
        Ok(Ok(record))
      })
      .await?
  }

  async fn get_statement(&self, id: i64) -> Result<Option<StatementRecord>> {
    self.conn.call(move |conn| Ok(queries::load_record(conn, id))).await?
  }

  async fn list_statements<'a>(
    &'a self,
    query: &'a StatementQuery,
  ) -> Result<Vec<StatementRecord>> {
    let query = query.clone();
    self
      .conn
      .call(move |conn| Ok(queries::list_records(conn, &query)))
      .await?
  }

  async fn update_statement(
    &self,
    id: i64,
    update: StatementUpdate,
    actor_id: i64,
  ) -> Result<UpdateOutcome> {
    self
      .conn
      .call(move |conn| Ok(update_in_tx(conn, id, update, actor_id)))
      .await?
  }

  async fn discard_statement(&self, id: i64) -> Result<()> {
    self.conn.call(move |conn| Ok(queries::discard_statement(conn, id))).await?
  }

  async fn reorder_source_statements(
    &self,
    source_id: i64,
    statement_ids: Option<Vec<i64>>,
  ) -> Result<()> {
    let ids = statement_ids.unwrap_or_default();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Err(e) = queries::reorder_source(&tx, source_id, &ids) {
          return Ok(Err(e));
        }
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?
  }

  async fn speaker_stats(&self, speaker_id: i64) -> Result<SpeakerStats> {
    self
      .conn
      .call(move |conn| Ok(queries::speaker_stats(conn, speaker_id)))
      .await?
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn notifications_for(&self, user_id: i64) -> Result<Vec<Notification>> {
    self
      .conn
      .call(move |conn| Ok(queries::notifications_for(conn, user_id)))
      .await?
  }
}

/// Insert a statement, its tags and its assessment. References are checked
/// up front so a bad id surfaces as not-found rather than a constraint error.
fn create_in_tx(
  conn: &rusqlite::Connection,
  statement: &Statement,
  evaluator_id: Option<i64>,
) -> Result<StatementRecord> {
  if !queries::exists(conn, "speakers", statement.speaker_id)? {
    return Err(Error::not_found("speaker", statement.speaker_id));
  }
  if let Some(source_id) = statement.source_id
    && queries::load_source(conn, source_id)?.is_none()
  {
    return Err(Error::not_found("source", source_id));
  }
  if let Some(user_id) = evaluator_id
    && !queries::exists(conn, "users", user_id)?
  {
    return Err(Error::not_found("user", user_id));
  }
  for tag_id in &statement.tags {
    if !queries::exists(conn, "tags", *tag_id)? {
      return Err(Error::not_found("tag", *tag_id));
    }
  }

  let id = queries::insert_statement(conn, statement)?;
  queries::insert_assessment(conn, id, evaluator_id)?;
  queries::load_record(conn, id)?.ok_or_else(|| Error::not_found("statement", id))
}
