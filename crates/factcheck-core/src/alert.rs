//! Proofreading-queue alerts posted to a team chat.

use serde::Serialize;

/// Every this-many statements waiting for proofreading in one source, the
/// team is pinged.
pub const PROOFREADING_ALERT_EVERY: usize = 5;

/// The proofreading backlog of one source after an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProofreadingQueue {
  pub source_id:   i64,
  pub source_name: String,
  /// Kept statements of the source whose assessment awaits proofreading.
  pub pending:     usize,
}

/// A fire-and-forget chat channel. Implementations must not block and must
/// swallow (and log) their own delivery failures.
pub trait ChatSink: Send + Sync {
  fn post(&self, text: String);
}

/// A sink that drops every message; used when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ChatSink for NoopSink {
  fn post(&self, _text: String) {}
}

/// The alert text for `queue`, or `None` when the backlog is not at an alert
/// threshold.
pub fn proofreading_alert(queue: &ProofreadingQueue, admin_base_url: &str) -> Option<String> {
  if queue.pending == 0 || queue.pending % PROOFREADING_ALERT_EVERY != 0 {
    return None;
  }
  let base = admin_base_url.trim_end_matches('/');
  let link = format!(
    "{base}/admin/sources/{}?filter=%7B%22field%22%3A%22assessment.evaluationStatus%22%2C%22value%22%3A%22proofreading_needed%22%7D",
    queue.source_id
  );
  Some(format!(
    "<!channel> Source *{}* now has {} statements waiting for proofreading. Please take a look, thanks!\n{link}",
    queue.source_name, queue.pending
  ))
}
