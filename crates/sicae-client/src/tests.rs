//! Scenario tests for synchronisation, validation and the operator console,
//! run against an in-memory [`AccessApi`].

use std::{
  collections::VecDeque,
  sync::{Arc, Mutex},
  time::Duration,
};

use chrono::Utc;
use sicae_core::{
  ApiError, AuthError, Collection, Identity, Role, Session, SyncError, Token,
  api::AccessApi,
  domain::{
    AccessEvent, AccessPoint, AccessResult, Credential, CredentialStatus, DomainSnapshot,
    NewAccessPoint, NewPerson, NewUser, Person, PersonKind, UserRecord,
  },
};
use sicae_scan::{
  CameraError, CaptureBackend, DeviceTrack, Facing, FrameSource, PixelBuffer, ScanOrigin,
  ScanState,
};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
  AccessConsole, AccessReader, DataSync, Error, ReaderContext, SessionStore, ValidationGateway,
};

// ─── Fake API ────────────────────────────────────────────────────────────────

const PASSWORD: &str = "secret";

#[derive(Default)]
struct FakeApi {
  data:             Mutex<DomainSnapshot>,
  account:          Mutex<Option<Identity>>,
  /// Collections that fail on every fetch until cleared.
  failing:          Mutex<Vec<(Collection, ApiError)>>,
  /// Per-call delay and result for `list_people`, consumed in call order.
  people_script:    Mutex<VecDeque<(Duration, Vec<Person>)>>,
  validate_failure: Mutex<Option<ApiError>>,
  validations:      Mutex<Vec<String>>,
  user_fetches:     Mutex<usize>,
}

impl FakeApi {
  fn with_data(data: DomainSnapshot) -> Self {
    let api = Self::default();
    *api.data.lock().unwrap() = data;
    api
  }

  fn with_account(self, identity: Identity) -> Self {
    *self.account.lock().unwrap() = Some(identity);
    self
  }

  fn fail(&self, collection: Collection, error: ApiError) {
    self.failing.lock().unwrap().push((collection, error));
  }

  fn heal(&self) { self.failing.lock().unwrap().clear(); }

  fn failure(&self, collection: Collection) -> Option<ApiError> {
    let failing = self.failing.lock().unwrap();
    failing.iter().find(|(c, _)| *c == collection).map(|(_, e)| e.clone())
  }

  fn validations(&self) -> Vec<String> { self.validations.lock().unwrap().clone() }

  fn list<T: Clone>(
    &self,
    collection: Collection,
    pick: impl FnOnce(&DomainSnapshot) -> &Vec<T>,
  ) -> Result<Vec<T>, ApiError> {
    if let Some(e) = self.failure(collection) {
      return Err(e);
    }
    Ok(pick(&self.data.lock().unwrap()).clone())
  }
}

impl AccessApi for FakeApi {
  async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
    let account = self.account.lock().unwrap().clone();
    match account {
      Some(identity) if identity.email == email && password == PASSWORD => {
        Ok(Session { identity, token: Token::new("token-1") })
      }
      _ => Err(AuthError::InvalidCredentials("invalid email or password".into())),
    }
  }

  async fn register(&self, user: &NewUser) -> Result<UserRecord, AuthError> {
    Ok(UserRecord {
      id:        Uuid::new_v4(),
      full_name: user.full_name.clone(),
      email:     user.email.clone(),
      role:      user.role,
    })
  }

  async fn list_people(&self, _token: &Token) -> Result<Vec<Person>, ApiError> {
    let scripted = self.people_script.lock().unwrap().pop_front();
    if let Some((delay, people)) = scripted {
      tokio::time::sleep(delay).await;
      return Ok(people);
    }
    self.list(Collection::People, |d| &d.people)
  }

  async fn list_credentials(&self, _token: &Token) -> Result<Vec<Credential>, ApiError> {
    self.list(Collection::Credentials, |d| &d.credentials)
  }

  async fn list_events(&self, _token: &Token) -> Result<Vec<AccessEvent>, ApiError> {
    self.list(Collection::Events, |d| &d.events)
  }

  async fn list_access_points(&self, _token: &Token) -> Result<Vec<AccessPoint>, ApiError> {
    self.list(Collection::AccessPoints, |d| &d.access_points)
  }

  async fn list_users(&self, _token: &Token) -> Result<Vec<UserRecord>, ApiError> {
    *self.user_fetches.lock().unwrap() += 1;
    self.list(Collection::Users, |d| &d.users)
  }

  async fn create_person(&self, person: &NewPerson, _token: &Token) -> Result<Person, ApiError> {
    if person.document.is_empty() {
      return Err(ApiError::Validation("document is required".into()));
    }
    Ok(Person {
      id:             Uuid::new_v4(),
      full_name:      person.full_name.clone(),
      document:       person.document.clone(),
      phone:          person.phone.clone(),
      kind:           person.kind,
      company:        person.company.clone(),
      contact_person: person.contact_person.clone(),
      visit_reason:   person.visit_reason.clone(),
    })
  }

  async fn issue_credential(&self, person_id: Uuid, _token: &Token) -> Result<Credential, ApiError> {
    Ok(credential(person_id))
  }

  async fn register_access_point(
    &self,
    point: &NewAccessPoint,
    _token: &Token,
  ) -> Result<AccessPoint, ApiError> {
    Ok(AccessPoint {
      id:       Uuid::new_v4(),
      name:     point.name.clone(),
      location: point.location.clone(),
      kind:     point.kind.clone(),
      active:   point.active,
    })
  }

  async fn validate_code(
    &self,
    code: &str,
    access_point_id: Option<Uuid>,
    _source_ip: Option<&str>,
  ) -> Result<AccessEvent, ApiError> {
    self.validations.lock().unwrap().push(code.to_owned());
    if let Some(e) = self.validate_failure.lock().unwrap().clone() {
      return Err(e);
    }
    let mut verdict = event(Uuid::new_v4());
    verdict.reason = "valid credential".into();
    verdict.access_point_id = access_point_id;
    Ok(verdict)
  }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn identity(role: Role, linked: Option<Uuid>) -> Identity {
  Identity {
    id: Some(Uuid::new_v4()),
    display_name: "Marta Gómez".into(),
    email: "marta@example.com".into(),
    role,
    linked_person_id: linked,
  }
}

fn session(role: Role, linked: Option<Uuid>) -> Session {
  Session { identity: identity(role, linked), token: Token::new("token-1") }
}

fn person(id: Uuid, name: &str) -> Person {
  Person {
    id,
    full_name: name.into(),
    document: format!("DOC-{name}"),
    phone: String::new(),
    kind: PersonKind::Visitor,
    company: None,
    contact_person: None,
    visit_reason: None,
  }
}

fn credential(person_id: Uuid) -> Credential {
  Credential {
    id: Uuid::new_v4(),
    person_id,
    status: CredentialStatus::Active,
    payload: Some(format!("QR-{person_id}")),
    expires_at: None,
  }
}

fn event(person_id: Uuid) -> AccessEvent {
  AccessEvent {
    id: Uuid::new_v4(),
    person_id,
    timestamp: Utc::now(),
    result: AccessResult::Allowed,
    reason: String::new(),
    access_point_id: None,
  }
}

fn point(name: &str) -> AccessPoint {
  AccessPoint {
    id:       Uuid::new_v4(),
    name:     name.into(),
    location: "Lobby".into(),
    kind:     "TORNIQUETE".into(),
    active:   true,
  }
}

/// Two people, each with a credential and an event, one access point.
fn populated(me: Uuid, other: Uuid) -> DomainSnapshot {
  DomainSnapshot {
    people:        vec![person(me, "me"), person(other, "other")],
    credentials:   vec![credential(other), credential(me)],
    events:        vec![event(other), event(me)],
    access_points: vec![point("Main gate")],
    users:         vec![UserRecord {
      id:        Uuid::new_v4(),
      full_name: "Admin".into(),
      email:     "admin@example.com".into(),
      role:      Role::Admin,
    }],
  }
}

fn data_sync(api: FakeApi) -> (Arc<FakeApi>, DataSync<FakeApi>) {
  let api = Arc::new(api);
  let sync = DataSync::new(Arc::clone(&api));
  (api, sync)
}

// ─── DataSync ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn visitor_refresh_sees_only_own_records() {
  let (me, other) = (Uuid::new_v4(), Uuid::new_v4());
  let (api, sync) = data_sync(FakeApi::with_data(populated(me, other)));

  let snapshot = sync.refresh(&session(Role::Visitor, Some(me))).await.unwrap();
  assert_eq!(snapshot.people.len(), 1);
  assert!(snapshot.people.iter().all(|p| p.id == me));
  assert!(snapshot.credentials.iter().all(|c| c.person_id == me));
  assert!(snapshot.events.iter().all(|e| e.person_id == me));
  assert_eq!(snapshot.access_points.len(), 1);
  assert!(snapshot.users.is_empty());
  assert_eq!(*api.user_fetches.lock().unwrap(), 0);
  assert_eq!(sync.snapshot(), snapshot);
}

#[tokio::test]
async fn security_sees_everything_but_users() {
  let (me, other) = (Uuid::new_v4(), Uuid::new_v4());
  let (api, sync) = data_sync(FakeApi::with_data(populated(me, other)));

  let snapshot = sync.refresh(&session(Role::Security, None)).await.unwrap();
  assert_eq!(snapshot.people.len(), 2);
  assert_eq!(snapshot.credentials.len(), 2);
  assert_eq!(snapshot.events.len(), 2);
  assert!(snapshot.users.is_empty());
  assert_eq!(*api.user_fetches.lock().unwrap(), 0);
}

#[tokio::test]
async fn admin_refresh_includes_users() {
  let (api, sync) = data_sync(FakeApi::with_data(populated(Uuid::new_v4(), Uuid::new_v4())));
  let snapshot = sync.refresh(&session(Role::Admin, None)).await.unwrap();
  assert_eq!(snapshot.users.len(), 1);
  assert_eq!(*api.user_fetches.lock().unwrap(), 1);
  assert_eq!(sync.stats().active_credentials, 2);
}

#[tokio::test(start_paused = true)]
async fn overlapping_refresh_publishes_the_last_issued() {
  let (api, sync) = data_sync(FakeApi::with_data(populated(Uuid::new_v4(), Uuid::new_v4())));
  let stale = vec![person(Uuid::new_v4(), "stale")];
  let fresh = vec![person(Uuid::new_v4(), "fresh")];
  {
    let mut script = api.people_script.lock().unwrap();
    script.push_back((Duration::from_millis(200), stale));
    script.push_back((Duration::from_millis(10), fresh.clone()));
  }

  let s = session(Role::Security, None);
  let (first, second) = tokio::join!(sync.refresh(&s), sync.refresh(&s));

  assert_eq!(second.unwrap().people, fresh);
  // The earlier refresh finished last and was dropped.
  assert_eq!(first.unwrap().people, fresh);
  assert_eq!(sync.snapshot().people, fresh);
}

#[tokio::test(start_paused = true)]
async fn sequential_refreshes_publish_in_order() {
  let (api, sync) = data_sync(FakeApi::with_data(populated(Uuid::new_v4(), Uuid::new_v4())));
  let first = vec![person(Uuid::new_v4(), "first")];
  let second = vec![person(Uuid::new_v4(), "second")];
  {
    let mut script = api.people_script.lock().unwrap();
    script.push_back((Duration::from_millis(10), first));
    script.push_back((Duration::from_millis(200), second.clone()));
  }

  let s = session(Role::Security, None);
  let _ = tokio::join!(sync.refresh(&s), sync.refresh(&s));
  assert_eq!(sync.snapshot().people, second);
}

#[tokio::test]
async fn credentials_failure_keeps_prior_snapshot() {
  let (api, sync) = data_sync(FakeApi::with_data(populated(Uuid::new_v4(), Uuid::new_v4())));
  let s = session(Role::Security, None);
  let before = sync.refresh(&s).await.unwrap();

  api.data.lock().unwrap().people.push(person(Uuid::new_v4(), "newcomer"));
  api.fail(Collection::Credentials, ApiError::ServerError("boom".into()));

  let err = sync.refresh(&s).await.unwrap_err();
  assert_eq!(
    err,
    SyncError::PartialFetchFailure {
      collection: Collection::Credentials,
      source:     ApiError::ServerError("boom".into()),
    }
  );
  assert_eq!(sync.snapshot(), before);

  api.heal();
  assert_eq!(sync.refresh(&s).await.unwrap().people.len(), 3);
}

#[tokio::test]
async fn unreachable_server_is_a_network_failure() {
  let (api, sync) = data_sync(FakeApi::default());
  for collection in
    [Collection::People, Collection::Credentials, Collection::Events, Collection::AccessPoints]
  {
    api.fail(collection, ApiError::NetworkFailure("connection refused".into()));
  }
  let err = sync.refresh(&session(Role::Security, None)).await.unwrap_err();
  assert_eq!(err, SyncError::NetworkFailure("connection refused".into()));
}

#[tokio::test]
async fn clear_forgets_everything() {
  let (_api, sync) = data_sync(FakeApi::with_data(populated(Uuid::new_v4(), Uuid::new_v4())));
  sync.refresh(&session(Role::Security, None)).await.unwrap();
  sync.clear();
  assert_eq!(sync.snapshot(), DomainSnapshot::default());
}

// ─── ValidationGateway ───────────────────────────────────────────────────────

fn gateway(api: FakeApi) -> (Arc<FakeApi>, Arc<ValidationGateway<FakeApi>>) {
  let api = Arc::new(api);
  let sync = Arc::new(DataSync::new(Arc::clone(&api)));
  (Arc::clone(&api), Arc::new(ValidationGateway::new(api, sync)))
}

#[tokio::test]
async fn validation_prepends_one_event() {
  let (_api, gateway) = gateway(FakeApi::with_data(populated(Uuid::new_v4(), Uuid::new_v4())));
  let sync = gateway.sync();
  let before = sync.refresh(&session(Role::Security, None)).await.unwrap();

  let event = gateway.validate("ABC123", None, None).await.unwrap();
  let after = sync.snapshot();
  assert_eq!(after.events.len(), before.events.len() + 1);
  assert_eq!(after.events[0], event);
  assert_eq!(&after.events[1..], &before.events[..]);
}

#[tokio::test]
async fn failed_validation_changes_nothing() {
  let (api, gateway) = gateway(FakeApi::with_data(populated(Uuid::new_v4(), Uuid::new_v4())));
  let sync = gateway.sync();
  let before = sync.refresh(&session(Role::Security, None)).await.unwrap();
  *api.validate_failure.lock().unwrap() = Some(ApiError::NetworkFailure("timeout".into()));

  let err = gateway.validate("ABC123", None, None).await.unwrap_err();
  assert_eq!(err, ApiError::NetworkFailure("timeout".into()));
  assert_eq!(sync.snapshot(), before);
  assert_eq!(api.validations(), vec!["ABC123"]);
}

// ─── AccessReader ────────────────────────────────────────────────────────────

/// A camera whose frames are pushed by the test. Each frame's bytes are the
/// payload, read back by [`text_decoder`].
struct FeedCamera {
  denied: bool,
  feed:   mpsc::UnboundedReceiver<PixelBuffer>,
}

impl CaptureBackend for FeedCamera {
  async fn open(&mut self, facing: Facing) -> Result<DeviceTrack, CameraError> {
    if self.denied {
      return Err(CameraError::Denied("permission dismissed".into()));
    }
    Ok(DeviceTrack { id: 1, label: "feed".into(), facing })
  }

  async fn read(&mut self, _track: &DeviceTrack) -> Result<Option<PixelBuffer>, CameraError> {
    Ok(self.feed.recv().await)
  }

  fn stop(&mut self, _track: DeviceTrack) {}
}

fn text_decoder(frame: &PixelBuffer) -> Option<String> {
  String::from_utf8(frame.data.clone()).ok().filter(|s| !s.is_empty())
}

fn show(tx: &mpsc::UnboundedSender<PixelBuffer>, payload: &str) {
  tx.send(PixelBuffer::luma(payload.len(), 1, payload.as_bytes().to_vec())).unwrap();
}

fn reader(denied: bool) -> (Arc<FakeApi>, AccessReader, mpsc::UnboundedSender<PixelBuffer>) {
  let (api, gateway) = gateway(FakeApi::default());
  let (tx, feed) = mpsc::unbounded_channel();
  let camera = FeedCamera { denied, feed };
  let ctx = ReaderContext { access_point_id: Some(Uuid::new_v4()), source_ip: None };
  let reader = AccessReader::spawn(gateway, FrameSource::new(camera), text_decoder, ctx);
  (api, reader, tx)
}

async fn settle() { tokio::time::sleep(Duration::from_millis(1)).await; }

#[tokio::test(start_paused = true)]
async fn repeated_scan_inside_window_is_validated_once() {
  let (api, mut reader, frames) = reader(false);
  reader.activate();

  show(&frames, "QR-001");
  settle().await;
  tokio::time::advance(Duration::from_millis(500)).await;
  show(&frames, "QR-001");
  settle().await;
  assert_eq!(api.validations(), vec!["QR-001"]);

  tokio::time::advance(Duration::from_millis(2600)).await;
  show(&frames, "QR-001");
  settle().await;
  assert_eq!(api.validations(), vec!["QR-001", "QR-001"]);

  let outcome = reader.next_outcome().await.unwrap();
  assert_eq!(outcome.scan.origin, ScanOrigin::Camera);
  assert!(outcome.result.is_ok());
  reader.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_validation_keeps_the_debounce_window() {
  let (api, mut reader, frames) = reader(false);
  *api.validate_failure.lock().unwrap() = Some(ApiError::NetworkFailure("timeout".into()));
  reader.activate();

  show(&frames, "QR-001");
  settle().await;
  let outcome = reader.next_outcome().await.unwrap();
  assert_eq!(outcome.result, Err(ApiError::NetworkFailure("timeout".into())));

  tokio::time::advance(Duration::from_millis(500)).await;
  show(&frames, "QR-001");
  settle().await;
  assert_eq!(api.validations(), vec!["QR-001"]);

  tokio::time::advance(Duration::from_millis(2600)).await;
  show(&frames, "QR-001");
  settle().await;
  assert_eq!(api.validations(), vec!["QR-001", "QR-001"]);
  assert!(reader.next_outcome().await.unwrap().result.is_err());
  reader.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn denied_camera_still_validates_manual_entry() {
  let (api, mut reader, _frames) = reader(true);
  reader.activate();
  let state = reader.scanner().wait_for(|s| matches!(s, ScanState::Unsupported { .. })).await;
  assert!(matches!(state, ScanState::Unsupported { .. }));

  reader.submit_manual("MANUAL-42");
  let outcome = reader.next_outcome().await.unwrap();
  assert_eq!(outcome.scan.payload, "MANUAL-42");
  assert_eq!(outcome.scan.origin, ScanOrigin::Manual);
  assert_eq!(api.validations(), vec!["MANUAL-42"]);
  reader.shutdown().await;
}

// ─── AccessConsole ───────────────────────────────────────────────────────────

fn console(api: FakeApi) -> AccessConsole<FakeApi> {
  AccessConsole::new(api, SessionStore::in_memory())
}

fn staffed() -> FakeApi {
  FakeApi::with_data(populated(Uuid::new_v4(), Uuid::new_v4()))
    .with_account(identity(Role::Security, None))
}

#[tokio::test]
async fn login_welcomes_and_loads_data() {
  let console = console(staffed());
  let session = console.authenticate("marta@example.com", PASSWORD).await.unwrap();

  assert_eq!(console.session(), Some(session));
  assert_eq!(console.status().as_deref(), Some("Welcome, Marta Gómez"));
  assert_eq!(console.snapshot().people.len(), 2);
  assert!(!console.is_loading());
}

#[tokio::test]
async fn wrong_password_leaves_no_session() {
  let console = console(staffed());
  let err = console.authenticate("marta@example.com", "nope").await.unwrap_err();
  assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials(_))));
  assert_eq!(console.session(), None);
  assert!(console.status().is_some());
}

#[tokio::test]
async fn operations_without_session_are_unauthorized() {
  let console = console(staffed());
  assert!(matches!(console.refresh().await, Err(Error::Api(ApiError::Unauthorized))));
  assert!(matches!(
    console.issue_credential(Uuid::new_v4()).await,
    Err(Error::Api(ApiError::Unauthorized))
  ));
}

#[tokio::test]
async fn failed_load_is_reported_in_status() {
  let api = staffed();
  api.fail(Collection::Events, ApiError::ServerError("boom".into()));
  let console = console(api);
  console.authenticate("marta@example.com", PASSWORD).await.unwrap();

  let status = console.status().unwrap();
  assert!(status.starts_with("Could not load data: "), "{status}");
  assert!(console.session().is_some());
}

#[tokio::test]
async fn writes_update_snapshot_and_status() {
  let console = console(staffed());
  console.authenticate("marta@example.com", PASSWORD).await.unwrap();

  let new_person = NewPerson {
    full_name:      "Luis Rojas".into(),
    document:       "12345".into(),
    phone:          "555-0100".into(),
    kind:           PersonKind::Contractor,
    company:        Some("Obras SA".into()),
    contact_person: None,
    visit_reason:   None,
  };
  let created = console.create_person(&new_person).await.unwrap();
  assert_eq!(console.status().as_deref(), Some("Person registered."));
  assert!(console.snapshot().people.contains(&created));

  let issued = console.issue_credential(created.id).await.unwrap();
  assert_eq!(console.status().as_deref(), Some("QR code issued (valid for 1 minute by default)."));
  assert!(console.snapshot().credentials.contains(&issued));

  let point = NewAccessPoint {
    name:     "Loading dock".into(),
    location: "North".into(),
    kind:     "PUERTA".into(),
    active:   true,
  };
  console.register_access_point(&point).await.unwrap();
  assert_eq!(console.status().as_deref(), Some("Access point registered."));
  assert_eq!(console.snapshot().access_points.len(), 2);

  let event = console.validate("ABC123", None, Some("10.0.0.7")).await.unwrap();
  assert_eq!(console.status().as_deref(), Some("Result: ALLOWED (valid credential)"));
  assert_eq!(console.snapshot().events[0], event);
}

#[tokio::test]
async fn rejected_write_changes_nothing() {
  let console = console(staffed());
  console.authenticate("marta@example.com", PASSWORD).await.unwrap();
  let before = console.snapshot();

  let invalid = NewPerson {
    full_name:      "Nameless".into(),
    document:       String::new(),
    phone:          String::new(),
    kind:           PersonKind::Visitor,
    company:        None,
    contact_person: None,
    visit_reason:   None,
  };
  let err = console.create_person(&invalid).await.unwrap_err();
  assert!(matches!(err, Error::Api(ApiError::Validation(_))));
  assert_eq!(console.snapshot(), before);
  assert_eq!(console.status().as_deref(), Some("validation failed: document is required"));
}

#[tokio::test]
async fn register_user_reports_creation() {
  let console = console(staffed());
  let user = console
    .register_user("Nuevo Guardia", "guardia@example.com", "pw", Role::Security)
    .await
    .unwrap();
  assert_eq!(user.role, Role::Security);
  assert_eq!(console.status().as_deref(), Some("User created."));
}

#[tokio::test]
async fn logout_clears_session_and_data() {
  let console = console(staffed());
  console.authenticate("marta@example.com", PASSWORD).await.unwrap();
  console.logout().unwrap();

  assert_eq!(console.session(), None);
  assert_eq!(console.snapshot(), DomainSnapshot::default());
  assert_eq!(console.status(), None);
}

#[tokio::test]
async fn start_restores_persisted_session_and_loads() {
  let dir = tempfile::tempdir().unwrap();
  SessionStore::open(dir.path()).save(session(Role::Security, None)).unwrap();

  let console = AccessConsole::new(staffed(), SessionStore::open(dir.path()));
  let restored = console.start().await.unwrap();
  assert_eq!(restored.identity.role, Role::Security);
  assert_eq!(console.snapshot().people.len(), 2);
}

#[tokio::test]
async fn start_without_session_loads_nothing() {
  let dir = tempfile::tempdir().unwrap();
  let console = AccessConsole::new(staffed(), SessionStore::open(dir.path()));
  assert_eq!(console.start().await, None);
  assert_eq!(console.snapshot(), DomainSnapshot::default());
}
