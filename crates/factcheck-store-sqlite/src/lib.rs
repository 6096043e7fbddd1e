//! SQLite backend for the factcheck editorial store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every mutation runs inside a single
//! rusqlite transaction.

mod encode;
mod queries;
mod schema;
mod store;
mod update;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
