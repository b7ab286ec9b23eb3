//! The `AccessApi` trait: the remote service as seen by the client.
//!
//! The trait is implemented by transports (e.g. the HTTP adapter in
//! `sicae-client`) and by test doubles. Higher layers depend on this
//! abstraction, not on any concrete transport.

use std::future::Future;

use uuid::Uuid;

use crate::{
  domain::{
    AccessEvent, AccessPoint, Credential, NewAccessPoint, NewPerson, NewUser, Person, UserRecord,
  },
  error::{ApiError, AuthError},
  identity::{Session, Token},
};

/// Request/response contract of the remote access-control service.
///
/// All methods return `Send` futures so implementations can be shared across
/// tasks of a multi-threaded runtime.
pub trait AccessApi: Send + Sync {
  // ── Authentication ────────────────────────────────────────────────────

  /// Exchange credentials for an identity and token.
  fn login<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Session, AuthError>> + Send + 'a;

  /// Create a new operator account.
  fn register<'a>(
    &'a self,
    user: &'a NewUser,
  ) -> impl Future<Output = Result<UserRecord, AuthError>> + Send + 'a;

  // ── Collections ───────────────────────────────────────────────────────

  fn list_people<'a>(
    &'a self,
    token: &'a Token,
  ) -> impl Future<Output = Result<Vec<Person>, ApiError>> + Send + 'a;

  fn list_credentials<'a>(
    &'a self,
    token: &'a Token,
  ) -> impl Future<Output = Result<Vec<Credential>, ApiError>> + Send + 'a;

  /// Access events, most recent first.
  fn list_events<'a>(
    &'a self,
    token: &'a Token,
  ) -> impl Future<Output = Result<Vec<AccessEvent>, ApiError>> + Send + 'a;

  fn list_access_points<'a>(
    &'a self,
    token: &'a Token,
  ) -> impl Future<Output = Result<Vec<AccessPoint>, ApiError>> + Send + 'a;

  /// Operator accounts. Only administrators are allowed to call this.
  fn list_users<'a>(
    &'a self,
    token: &'a Token,
  ) -> impl Future<Output = Result<Vec<UserRecord>, ApiError>> + Send + 'a;

  // ── Writes ────────────────────────────────────────────────────────────

  fn create_person<'a>(
    &'a self,
    person: &'a NewPerson,
    token: &'a Token,
  ) -> impl Future<Output = Result<Person, ApiError>> + Send + 'a;

  /// Issue a fresh QR credential for `person_id`.
  fn issue_credential<'a>(
    &'a self,
    person_id: Uuid,
    token: &'a Token,
  ) -> impl Future<Output = Result<Credential, ApiError>> + Send + 'a;

  fn register_access_point<'a>(
    &'a self,
    point: &'a NewAccessPoint,
    token: &'a Token,
  ) -> impl Future<Output = Result<AccessPoint, ApiError>> + Send + 'a;

  // ── Validation ────────────────────────────────────────────────────────

  /// Ask the server to judge a scanned code. Requires no token: readers
  /// authenticate by network position.
  fn validate_code<'a>(
    &'a self,
    code: &'a str,
    access_point_id: Option<Uuid>,
    source_ip: Option<&'a str>,
  ) -> impl Future<Output = Result<AccessEvent, ApiError>> + Send + 'a;
}
