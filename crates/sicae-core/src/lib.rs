//! Core types and trait definitions for the SICAE access-control client.
//!
//! This crate is deliberately free of HTTP, camera and filesystem
//! dependencies. The scanner, client and CLI crates depend on it; it depends
//! on nothing proprietary.

// We intentionally use native `async fn` in trait impls (stabilised in Rust
// 1.75). Suppress the advisory lint about `Send` bounds on the returned
// futures.
#![allow(async_fn_in_trait)]

pub mod api;
pub mod domain;
pub mod error;
pub mod identity;
pub mod role_view;

pub use error::{ApiError, AuthError, Collection, SyncError};
pub use identity::{Identity, Role, Session, Token};
