//! [`DataSync`]: the client's view of the server's collections.
//!
//! A refresh fetches every collection concurrently and either publishes a
//! complete, role-filtered snapshot or publishes nothing. Refreshes may
//! overlap; each one takes an issuance number when it starts, and a result is
//! only published if no refresh issued after it has published already.

use std::sync::{
  Arc, PoisonError, RwLock,
  atomic::{AtomicU64, Ordering},
};

use sicae_core::{
  ApiError, Collection, Session, SyncError,
  api::AccessApi,
  domain::{
    AccessEvent, AccessPoint, Credential, DashboardStats, DomainSnapshot, NewAccessPoint,
    NewPerson, Person, UserRecord,
  },
  identity::{Role, Token},
  role_view::RoleView,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

struct Published {
  /// Issuance number of the refresh that produced `snapshot`.
  seq:      u64,
  snapshot: DomainSnapshot,
  /// Scope of the session that produced `snapshot`. `None` before the first
  /// refresh.
  view:     Option<RoleView>,
}

pub struct DataSync<A> {
  api:       Arc<A>,
  issued:    AtomicU64,
  published: RwLock<Published>,
}

impl<A: AccessApi> DataSync<A> {
  pub fn new(api: Arc<A>) -> Self {
    Self {
      api,
      issued: AtomicU64::new(0),
      published: RwLock::new(Published {
        seq:      0,
        snapshot: DomainSnapshot::default(),
        view:     None,
      }),
    }
  }

  /// Fetch every collection visible to `session` and publish the result.
  ///
  /// On failure nothing is published and the previous snapshot stays
  /// visible. If a refresh issued later has already published, the fetched
  /// data is dropped and the current snapshot is returned instead.
  pub async fn refresh(&self, session: &Session) -> Result<DomainSnapshot, SyncError> {
    let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
    let token = &session.token;
    let with_users = session.identity.role == Role::Admin;
    debug!(seq, with_users, "refresh issued");

    let api = &*self.api;
    let (people, credentials, events, access_points, users) = tokio::join!(
      api.list_people(token),
      api.list_credentials(token),
      api.list_events(token),
      api.list_access_points(token),
      async {
        if with_users { api.list_users(token).await } else { Ok(Vec::new()) }
      },
    );

    let mut failures = Vec::new();
    let people = collect(Collection::People, people, &mut failures);
    let credentials = collect(Collection::Credentials, credentials, &mut failures);
    let events = collect(Collection::Events, events, &mut failures);
    let access_points = collect(Collection::AccessPoints, access_points, &mut failures);
    let users = collect(Collection::Users, users, &mut failures);

    let attempted = if with_users { 5 } else { 4 };
    if let Some(err) = classify(failures, attempted) {
      warn!(seq, "refresh failed: {err}");
      return Err(err);
    }

    let view = RoleView::for_identity(&session.identity);
    let mut snapshot = DomainSnapshot { people, credentials, events, access_points, users };
    view.apply(&mut snapshot);

    let mut published = self.write();
    if seq <= published.seq {
      info!(seq, published = published.seq, "discarding superseded refresh");
      return Ok(published.snapshot.clone());
    }
    published.seq = seq;
    published.snapshot = snapshot.clone();
    published.view = Some(view);
    debug!(
      seq,
      people = snapshot.people.len(),
      credentials = snapshot.credentials.len(),
      events = snapshot.events.len(),
      "refresh published"
    );
    Ok(snapshot)
  }

  /// The currently published snapshot.
  pub fn snapshot(&self) -> DomainSnapshot { self.read().snapshot.clone() }

  pub fn stats(&self) -> DashboardStats { self.read().snapshot.stats() }

  pub fn recent_events(&self, n: usize) -> Vec<AccessEvent> {
    self.read().snapshot.recent_events(n).to_vec()
  }

  /// Drop everything, e.g. on logout. Refreshes still in flight will not
  /// publish.
  pub fn clear(&self) {
    let mut published = self.write();
    published.seq = self.issued.load(Ordering::SeqCst);
    published.snapshot = DomainSnapshot::default();
    published.view = None;
  }

  // ─── Remote writes ─────────────────────────────────────────────────────────

  pub async fn create_person(&self, person: &NewPerson, token: &Token) -> Result<Person, ApiError> {
    let created = self.api.create_person(person, token).await?;
    self.record_person(created.clone());
    Ok(created)
  }

  pub async fn issue_credential(
    &self,
    person_id: Uuid,
    token: &Token,
  ) -> Result<Credential, ApiError> {
    let issued = self.api.issue_credential(person_id, token).await?;
    self.record_credential(issued.clone());
    Ok(issued)
  }

  pub async fn register_access_point(
    &self,
    point: &NewAccessPoint,
    token: &Token,
  ) -> Result<AccessPoint, ApiError> {
    let created = self.api.register_access_point(point, token).await?;
    self.record_access_point(created.clone());
    Ok(created)
  }

  // ─── Local mutations ───────────────────────────────────────────────────────
  //
  // Applied only after the server accepted the corresponding write.

  pub fn record_person(&self, person: Person) {
    let mut published = self.write();
    if permits(&published, &person) {
      published.snapshot.people.push(person);
    }
  }

  pub fn record_credential(&self, credential: Credential) {
    let mut published = self.write();
    if permits(&published, &credential) {
      published.snapshot.credentials.push(credential);
    }
  }

  pub fn record_access_point(&self, point: AccessPoint) {
    self.write().snapshot.access_points.push(point);
  }

  pub fn record_user(&self, user: UserRecord) { self.write().snapshot.users.push(user); }

  /// Insert a validation result at the head of the event sequence.
  pub fn prepend_event(&self, event: AccessEvent) {
    let mut published = self.write();
    if permits(&published, &event) {
      published.snapshot.events.insert(0, event);
    }
  }

  fn read(&self) -> std::sync::RwLockReadGuard<'_, Published> {
    self.published.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> std::sync::RwLockWriteGuard<'_, Published> {
    self.published.write().unwrap_or_else(PoisonError::into_inner)
  }
}

fn permits<T: sicae_core::role_view::PersonOwned>(published: &Published, item: &T) -> bool {
  published.view.is_none_or(|view| view.permits(item))
}

fn collect<T>(
  collection: Collection,
  result: Result<Vec<T>, ApiError>,
  failures: &mut Vec<(Collection, ApiError)>,
) -> Vec<T> {
  match result {
    Ok(items) => items,
    Err(e) => {
      failures.push((collection, e));
      Vec::new()
    }
  }
}

/// Reduce per-collection failures to one error. Every attempted fetch failing
/// at the transport level is a network failure; anything else names the
/// first collection that failed.
fn classify(failures: Vec<(Collection, ApiError)>, attempted: usize) -> Option<SyncError> {
  if failures.len() == attempted && failures.iter().all(|(_, e)| e.is_network()) {
    let message = match &failures[0].1 {
      ApiError::NetworkFailure(m) => m.clone(),
      other => other.to_string(),
    };
    return Some(SyncError::NetworkFailure(message));
  }
  failures
    .into_iter()
    .next()
    .map(|(collection, source)| SyncError::PartialFetchFailure { collection, source })
}
