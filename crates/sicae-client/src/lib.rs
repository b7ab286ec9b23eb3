//! Session and data-synchronisation engine for the SICAE client.
//!
//! - [`SessionStore`]: who is logged in, persisted across restarts.
//! - [`DataSync`]: role-filtered snapshot of server state, last-issued-wins.
//! - [`ValidationGateway`]: submit scanned codes, fold results into the
//!   snapshot.
//! - [`AccessReader`]: wires a scanner to the gateway at one access point.
//! - [`AccessConsole`]: the operator-facing facade over all of the above.
//! - [`HttpApi`]: [`sicae_core::api::AccessApi`] over HTTP/JSON.

pub mod console;
pub mod error;
pub mod gateway;
pub mod http;
pub mod reader;
pub mod session;
pub mod sync;

pub use console::AccessConsole;
pub use error::{Error, Result, SessionError};
pub use gateway::ValidationGateway;
pub use http::{ApiConfig, HttpApi};
pub use reader::{AccessReader, ReaderContext, ReaderOutcome};
pub use session::SessionStore;
pub use sync::DataSync;

#[cfg(test)]
mod tests;
