//! Core types and rules for the factcheck editorial back end.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! workflow validator, the authorization predicates and notification
//! derivation are pure functions; storage backends implement
//! [`store::EditorialStore`] and call into them inside their transactions.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod alert;
pub mod assessment;
pub mod authz;
pub mod changes;
pub mod error;
pub mod notification;
pub mod statement;
pub mod store;
pub mod update;
pub mod user;
pub mod workflow;

pub use error::{DomainError, Error, Result};
