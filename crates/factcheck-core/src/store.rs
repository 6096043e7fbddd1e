//! The `EditorialStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `factcheck-store-sqlite`). The HTTP layer depends on this abstraction, not
//! on any concrete backend.

use std::{collections::BTreeMap, future::Future};

use serde::{Deserialize, Serialize};

use crate::{
  alert::ProofreadingQueue,
  assessment::{Assessment, PromiseRating, Veracity},
  error::DomainError,
  notification::Notification,
  statement::{NewSource, NewSpeaker, NewStatement, Source, Speaker, Statement, Tag},
  update::StatementUpdate,
  user::{NewRole, NewUser, Role, User},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Named statement listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementScope {
  /// Every kept statement: `source_order` ascending (unset last), then
  /// `excerpted_at` ascending.
  #[default]
  Ordered,
  /// [`Ordered`](Self::Ordered), published with an approved assessment.
  Published,
  /// [`Published`](Self::Published), factual only.
  FactualAndPublished,
  /// [`FactualAndPublished`](Self::FactualAndPublished), counted in
  /// statistics.
  RelevantForStatistics,
  /// [`Published`](Self::Published), important statements first.
  PublishedImportantFirst,
  /// Up to four important, published factual statements, newest first.
  Interesting,
}

impl StatementScope {
  /// Whether the scope exposes only approved evaluations.
  pub fn is_public(self) -> bool { !matches!(self, Self::Ordered) }
}

/// Number of statements returned by [`StatementScope::Interesting`].
pub const INTERESTING_LIMIT: usize = 4;

/// Parameters for [`EditorialStore::list_statements`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementQuery {
  #[serde(default)]
  pub scope:      StatementScope,
  pub source_id:  Option<i64>,
  pub speaker_id: Option<i64>,
}

/// A statement together with its assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementRecord {
  pub statement:  Statement,
  pub assessment: Assessment,
}

/// A speaker's rated statements per veracity key, over
/// [`StatementScope::RelevantForStatistics`]. Every seeded veracity is
/// present, zero counts included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SpeakerStats(pub BTreeMap<String, i64>);

impl SpeakerStats {
  pub fn count(&self, veracity_key: &str) -> i64 {
    self.0.get(veracity_key).copied().unwrap_or(0)
  }
}

/// Result of [`EditorialStore::update_statement`].
#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
  pub record:                StatementRecord,
  pub notifications_created: usize,
  /// Set when the update moved the assessment into proofreading and the
  /// statement belongs to a source.
  pub proofreading_queue:    Option<ProofreadingQueue>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a fact-checking store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait EditorialStore: Send + Sync {
  type Error: std::error::Error + DomainError + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  fn create_role(
    &self,
    input: NewRole,
  ) -> impl Future<Output = Result<Role, Self::Error>> + Send + '_;

  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Retrieve a user with their role. Returns `None` if not found.
  fn get_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up a user by e-mail (case-insensitive). Used for authentication.
  fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  // ── Passive records ───────────────────────────────────────────────────

  fn create_speaker(
    &self,
    input: NewSpeaker,
  ) -> impl Future<Output = Result<Speaker, Self::Error>> + Send + '_;

  /// Create a source and link its experts. Fails with not-found if an
  /// expert id does not name a user.
  fn create_source(
    &self,
    input: NewSource,
  ) -> impl Future<Output = Result<Source, Self::Error>> + Send + '_;

  fn create_tag(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Tag, Self::Error>> + Send + '_;

  fn list_veracities(
    &self,
  ) -> impl Future<Output = Result<Vec<Veracity>, Self::Error>> + Send + '_;

  fn list_promise_ratings(
    &self,
  ) -> impl Future<Output = Result<Vec<PromiseRating>, Self::Error>> + Send + '_;

  // ── Statements ────────────────────────────────────────────────────────

  /// Create a statement and its assessment (status `being_evaluated`) in one
  /// transaction.
  fn create_statement(
    &self,
    input: NewStatement,
  ) -> impl Future<Output = Result<StatementRecord, Self::Error>> + Send + '_;

  /// Retrieve a kept statement. Discarded statements return `None`.
  fn get_statement(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<StatementRecord>, Self::Error>> + Send + '_;

  fn list_statements<'a>(
    &'a self,
    query: &'a StatementQuery,
  ) -> impl Future<Output = Result<Vec<StatementRecord>, Self::Error>> + Send + 'a;

  /// Apply a partial update on behalf of `actor_id` in one transaction:
  /// either the statement, its assessment, its tags and the resulting
  /// notifications are all written, or nothing is.
  fn update_statement(
    &self,
    id: i64,
    update: StatementUpdate,
    actor_id: i64,
  ) -> impl Future<Output = Result<UpdateOutcome, Self::Error>> + Send + '_;

  /// Soft-delete a statement.
  fn discard_statement(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Clear `source_order` for every statement of the source, then number the
  /// given statements `0..n` in order.
  fn reorder_source_statements(
    &self,
    source_id: i64,
    statement_ids: Option<Vec<i64>>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Veracity counts for a speaker. Fails with not-found for an unknown
  /// speaker.
  fn speaker_stats(
    &self,
    speaker_id: i64,
  ) -> impl Future<Output = Result<SpeakerStats, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  /// A user's notifications, newest first.
  fn notifications_for(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;
}
