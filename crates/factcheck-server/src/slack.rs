//! Slack-compatible incoming-webhook [`ChatSink`].

use std::time::Duration;

use anyhow::Context as _;
use factcheck_core::alert::ChatSink;
use reqwest::Client;
use serde_json::json;

/// Posts `{"text": …}` to an incoming-webhook URL on a detached task.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct SlackWebhook {
  client: Client,
  url:    String,
}

impl SlackWebhook {
  pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(10))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, url: url.into() })
  }
}

impl ChatSink for SlackWebhook {
  fn post(&self, text: String) {
    let request = self.client.post(&self.url).json(&json!({ "text": text }));
    tokio::spawn(async move {
      match request.send().await {
        Ok(resp) if resp.status().is_success() => tracing::debug!("chat alert delivered"),
        Ok(resp) => tracing::warn!(status = %resp.status(), "chat webhook rejected alert"),
        Err(e) => tracing::warn!(error = %e, "chat webhook unreachable"),
      }
    });
  }
}
