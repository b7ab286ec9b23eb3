//! [`AccessConsole`]: the operator-facing facade.
//!
//! Owns the session store and wires [`DataSync`] and [`ValidationGateway`]
//! together. Every operation leaves a short human-readable status line behind
//! for the front end to show.

use std::sync::{
  Arc, Mutex, PoisonError,
  atomic::{AtomicUsize, Ordering},
};

use sicae_core::{
  ApiError, Session, Token,
  api::AccessApi,
  domain::{
    AccessEvent, AccessPoint, Credential, DomainSnapshot, NewAccessPoint, NewPerson, NewUser,
    Person, UserRecord,
  },
  identity::Role,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  error::Result, gateway::ValidationGateway, session::SessionStore, sync::DataSync,
};

pub struct AccessConsole<A> {
  api:     Arc<A>,
  session: SessionStore,
  sync:    Arc<DataSync<A>>,
  gateway: Arc<ValidationGateway<A>>,
  status:  Mutex<Option<String>>,
  loading: AtomicUsize,
}

impl<A: AccessApi> AccessConsole<A> {
  pub fn new(api: A, session: SessionStore) -> Self {
    let api = Arc::new(api);
    let sync = Arc::new(DataSync::new(Arc::clone(&api)));
    let gateway = Arc::new(ValidationGateway::new(Arc::clone(&api), Arc::clone(&sync)));
    Self {
      api,
      session,
      sync,
      gateway,
      status: Mutex::new(None),
      loading: AtomicUsize::new(0),
    }
  }

  /// Restore a persisted session and, if there is one, load its data. A
  /// failed load is reported through [`status`](Self::status) only.
  pub async fn start(&self) -> Option<Session> {
    let session = self.session.restore()?;
    info!(user = %session.identity.display_name, role = %session.identity.role, "session restored");
    let _ = self.refresh().await;
    Some(session)
  }

  /// Restore a persisted session without contacting the server.
  pub fn restore(&self) -> Option<Session> { self.session.restore() }

  // ─── Authentication ────────────────────────────────────────────────────────

  pub async fn authenticate(&self, email: &str, password: &str) -> Result<Session> {
    let session = {
      let _loading = self.loading();
      match self.api.login(email, password).await {
        Ok(session) => session,
        Err(e) => {
          self.set_status(e.to_string());
          return Err(e.into());
        }
      }
    };
    self.session.save(session.clone())?;
    info!(user = %session.identity.display_name, role = %session.identity.role, "logged in");
    self.set_status(format!("Welcome, {}", session.identity.display_name));
    let _ = self.refresh().await;
    Ok(session)
  }

  pub async fn register_user(
    &self,
    full_name: &str,
    email: &str,
    password: &str,
    role: Role,
  ) -> Result<UserRecord> {
    let _loading = self.loading();
    let user = NewUser {
      full_name: full_name.to_owned(),
      email: email.to_owned(),
      password: password.to_owned(),
      role,
    };
    match self.api.register(&user).await {
      Ok(created) => {
        self.sync.record_user(created.clone());
        self.set_status("User created.");
        Ok(created)
      }
      Err(e) => {
        self.set_status(e.to_string());
        Err(e.into())
      }
    }
  }

  /// Forget the session and everything loaded under it.
  pub fn logout(&self) -> Result<()> {
    self.sync.clear();
    self.session.clear()?;
    *self.status_lock() = None;
    info!("logged out");
    Ok(())
  }

  // ─── Data ──────────────────────────────────────────────────────────────────

  pub async fn refresh(&self) -> Result<DomainSnapshot> {
    let session = self.require_session()?;
    let _loading = self.loading();
    self.sync.refresh(&session).await.map_err(|e| {
      self.set_status(format!("Could not load data: {e}"));
      e.into()
    })
  }

  pub async fn create_person(&self, person: &NewPerson) -> Result<Person> {
    let token = self.require_token()?;
    let _loading = self.loading();
    let created = self.report(self.sync.create_person(person, &token).await)?;
    self.set_status("Person registered.");
    Ok(created)
  }

  pub async fn issue_credential(&self, person_id: Uuid) -> Result<Credential> {
    let token = self.require_token()?;
    let _loading = self.loading();
    let issued = self.report(self.sync.issue_credential(person_id, &token).await)?;
    self.set_status("QR code issued (valid for 1 minute by default).");
    Ok(issued)
  }

  pub async fn register_access_point(&self, point: &NewAccessPoint) -> Result<AccessPoint> {
    let token = self.require_token()?;
    let _loading = self.loading();
    let created = self.report(self.sync.register_access_point(point, &token).await)?;
    self.set_status("Access point registered.");
    Ok(created)
  }

  pub async fn validate(
    &self,
    code: &str,
    access_point_id: Option<Uuid>,
    source_ip: Option<&str>,
  ) -> Result<AccessEvent> {
    let _loading = self.loading();
    let event = self.report(self.gateway.validate(code, access_point_id, source_ip).await)?;
    self.set_status(format!("Result: {} ({})", event.result, event.reason));
    Ok(event)
  }

  // ─── Accessors ─────────────────────────────────────────────────────────────

  /// The last status line, if any.
  pub fn status(&self) -> Option<String> { self.status_lock().clone() }

  /// Whether any operation is waiting on the server.
  pub fn is_loading(&self) -> bool { self.loading.load(Ordering::SeqCst) > 0 }

  pub fn session(&self) -> Option<Session> { self.session.current() }

  pub fn snapshot(&self) -> DomainSnapshot { self.sync.snapshot() }

  pub fn sync(&self) -> &Arc<DataSync<A>> { &self.sync }

  /// Shared with any [`crate::AccessReader`] running alongside the console.
  pub fn gateway(&self) -> Arc<ValidationGateway<A>> { Arc::clone(&self.gateway) }

  // ─── Internals ─────────────────────────────────────────────────────────────

  fn require_session(&self) -> Result<Session, ApiError> {
    self.session.current().ok_or(ApiError::Unauthorized)
  }

  fn require_token(&self) -> Result<Token, ApiError> {
    self.session.token().ok_or(ApiError::Unauthorized)
  }

  fn report<T>(&self, result: Result<T, ApiError>) -> Result<T> {
    result.map_err(|e| {
      warn!("operation failed: {e}");
      self.set_status(e.to_string());
      e.into()
    })
  }

  fn set_status(&self, message: impl Into<String>) {
    *self.status_lock() = Some(message.into());
  }

  fn status_lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
    self.status.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn loading(&self) -> Loading<'_> {
    self.loading.fetch_add(1, Ordering::SeqCst);
    Loading(&self.loading)
  }
}

/// Marks one operation in flight for as long as it lives.
struct Loading<'a>(&'a AtomicUsize);

impl Drop for Loading<'_> {
  fn drop(&mut self) { self.0.fetch_sub(1, Ordering::SeqCst); }
}
