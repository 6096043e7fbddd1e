//! factcheck server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the editorial JSON API over HTTP.
//!
//! # Bootstrapping
//!
//! A fresh database has no users. Create the first administrator with:
//!
//! ```sh
//! cargo run -p factcheck-server -- --create-admin editor@example.org
//! ```
//!
//! The password is read from stdin.

mod settings;
mod slack;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use factcheck_api::AppState;
use factcheck_core::{
  alert::{ChatSink, NoopSink},
  store::EditorialStore,
  user::{NewRole, NewUser, Permission},
};
use factcheck_store_sqlite::SqliteStore;
use rand_core::OsRng;
use strum::IntoEnumIterator as _;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{settings::ServerConfig, slack::SlackWebhook};

#[derive(Parser)]
#[command(author, version, about = "Fact-checking editorial server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Create an `admin` role holding every permission plus a user with this
  /// e-mail, then exit.
  #[arg(long, value_name = "EMAIL")]
  create_admin: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    println!("{}", hash_password(&password)?);
    return Ok(());
  }

  let server_cfg = ServerConfig::load(cli.config)?;

  let store_path = server_cfg.resolved_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if let Some(email) = cli.create_admin {
    return create_admin(&store, email).await;
  }

  let alerts: Arc<dyn ChatSink> = match &server_cfg.proofreading_webhook_url {
    Some(url) => Arc::new(SlackWebhook::new(url.clone())?),
    None => {
      tracing::info!("no proofreading webhook configured; alerts are disabled");
      Arc::new(NoopSink)
    }
  };

  let state = AppState::new(Arc::new(store), alerts, server_cfg.admin_base_url.clone());
  let app = factcheck_api::router(state).layer(TraceLayer::new_for_http());
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn create_admin(store: &SqliteStore, email: String) -> anyhow::Result<()> {
  let password = read_password()?;
  let role = store
    .create_role(NewRole {
      key:         "admin".into(),
      name:        "Administrator".into(),
      permissions: Permission::iter().collect(),
    })
    .await
    .context("failed to create the admin role (does it already exist?)")?;

  let mut user = NewUser::new(email, "Site", "Administrator", role.id);
  user.password_hash = Some(hash_password(&password)?);
  user.notify_on_approval = true;
  let user = store.create_user(user).await.context("failed to create admin user")?;

  tracing::info!(user_id = user.id, email = %user.email, "created administrator");
  Ok(())
}

fn hash_password(password: &str) -> anyhow::Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string(),
  )
}

fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  let password = line.trim_end_matches(['\n', '\r']).to_string();
  anyhow::ensure!(!password.is_empty(), "empty password");
  Ok(password)
}
