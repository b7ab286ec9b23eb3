//! One function per subcommand. Output goes to stdout; diagnostics to the
//! tracing subscriber.

use anyhow::{Context as _, Result, bail};
use sicae_client::AccessConsole;
use sicae_core::{
  Role,
  api::AccessApi,
  domain::{AccessEvent, AccessResult, DomainSnapshot, NewAccessPoint, NewPerson},
};
use uuid::Uuid;

/// How many events the dashboard lists.
const RECENT_EVENTS: usize = 6;

pub async fn login<A: AccessApi>(console: &AccessConsole<A>, email: &str, password: &str) -> Result<()> {
  let session = console.authenticate(email, password).await.context("login failed")?;
  print_status(console);
  println!("role: {}", session.identity.role);
  Ok(())
}

pub fn logout<A: AccessApi>(console: &AccessConsole<A>) -> Result<()> {
  console.logout().context("failed to clear session")?;
  println!("Logged out.");
  Ok(())
}

pub fn whoami<A: AccessApi>(console: &AccessConsole<A>) -> Result<()> {
  let Some(session) = console.restore() else {
    bail!("not logged in; run `sicae login`");
  };
  let identity = session.identity;
  println!("{} <{}>", identity.display_name, identity.email);
  println!("role: {}", identity.role);
  if let Some(person) = identity.linked_person_id {
    println!("person: {person}");
  }
  Ok(())
}

pub async fn sync<A: AccessApi>(console: &AccessConsole<A>) -> Result<()> {
  let snapshot = load(console).await?;
  let stats = snapshot.stats();
  println!("people:             {}", stats.people);
  println!("credentials:        {} ({} active)", snapshot.credentials.len(), stats.active_credentials);
  println!("access points:      {}", stats.access_points);
  println!("events:             {}", stats.events);
  if !snapshot.users.is_empty() {
    println!("users:              {}", snapshot.users.len());
  }
  Ok(())
}

pub async fn dashboard<A: AccessApi>(console: &AccessConsole<A>) -> Result<()> {
  let snapshot = load(console).await?;
  let stats = snapshot.stats();
  println!(
    "{} people · {} active credentials · {} access points · {} events",
    stats.people, stats.active_credentials, stats.access_points, stats.events
  );
  println!();
  let recent = snapshot.recent_events(RECENT_EVENTS);
  if recent.is_empty() {
    println!("No access events yet.");
  }
  for event in recent {
    print_event(&snapshot, event);
  }
  Ok(())
}

/// The event log, optionally narrowed to one verdict.
pub async fn events<A: AccessApi>(
  console: &AccessConsole<A>,
  result: Option<AccessResult>,
) -> Result<()> {
  let snapshot = load(console).await?;
  let events = snapshot.events_with(result);
  if events.is_empty() {
    println!("No events match.");
  }
  for event in events {
    print_event(&snapshot, event);
  }
  Ok(())
}

// ─── People & credentials ─────────────────────────────────────────────────────

pub async fn list_people<A: AccessApi>(console: &AccessConsole<A>) -> Result<()> {
  let snapshot = load(console).await?;
  for p in &snapshot.people {
    let kind = kind_label(p.kind);
    println!("{}  {:<28} {:<14} {}", p.id, p.full_name, p.document, kind);
  }
  Ok(())
}

pub async fn add_person<A: AccessApi>(console: &AccessConsole<A>, person: &NewPerson) -> Result<()> {
  require_session(console)?;
  let created = console.create_person(person).await.context("failed to register person")?;
  print_status(console);
  println!("{}", created.id);
  Ok(())
}

pub async fn list_credentials<A: AccessApi>(console: &AccessConsole<A>) -> Result<()> {
  let snapshot = load(console).await?;
  for c in &snapshot.credentials {
    let expires = c.expires_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".into());
    println!(
      "{}  {:<28} {:<9} expires {}",
      c.id,
      person_name(&snapshot, c.person_id),
      format!("{:?}", c.status),
      expires
    );
  }
  Ok(())
}

pub async fn issue_credential<A: AccessApi>(console: &AccessConsole<A>, person: Uuid) -> Result<()> {
  require_session(console)?;
  let credential = console.issue_credential(person).await.context("failed to issue credential")?;
  print_status(console);
  if let Some(payload) = &credential.payload {
    println!("{payload}");
  }
  Ok(())
}

// ─── Access points & users ────────────────────────────────────────────────────

pub async fn list_points<A: AccessApi>(console: &AccessConsole<A>) -> Result<()> {
  let snapshot = load(console).await?;
  for p in &snapshot.access_points {
    let active = if p.active { "active" } else { "inactive" };
    println!("{}  {:<24} {:<20} {:<12} {active}", p.id, p.name, p.location, p.kind);
  }
  Ok(())
}

pub async fn add_point<A: AccessApi>(console: &AccessConsole<A>, point: &NewAccessPoint) -> Result<()> {
  require_session(console)?;
  let created =
    console.register_access_point(point).await.context("failed to register access point")?;
  print_status(console);
  println!("{}", created.id);
  Ok(())
}

pub async fn list_users<A: AccessApi>(console: &AccessConsole<A>) -> Result<()> {
  let snapshot = load(console).await?;
  if console.session().is_some_and(|s| s.identity.role != Role::Admin) {
    bail!("only administrators can list users");
  }
  for u in &snapshot.users {
    println!("{}  {:<28} {:<32} {}", u.id, u.full_name, u.email, u.role);
  }
  Ok(())
}

pub async fn add_user<A: AccessApi>(
  console: &AccessConsole<A>,
  name: &str,
  email: &str,
  password: &str,
  role: Role,
) -> Result<()> {
  let user =
    console.register_user(name, email, password, role).await.context("failed to create user")?;
  print_status(console);
  println!("{}", user.id);
  Ok(())
}

// ─── Validation ───────────────────────────────────────────────────────────────

pub async fn validate<A: AccessApi>(
  console: &AccessConsole<A>,
  code: &str,
  point: Option<Uuid>,
  ip: Option<&str>,
) -> Result<()> {
  console.validate(code, point, ip).await.context("validation failed")?;
  print_status(console);
  Ok(())
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Read a password from stdin.
pub fn read_password() -> Result<String> {
  use std::io::{self, BufRead, Write};
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line).context("reading password")?;
  Ok(line.trim_end_matches('\n').trim_end_matches('\r').to_string())
}

/// Restore the session and load everything it can see.
async fn load<A: AccessApi>(console: &AccessConsole<A>) -> Result<DomainSnapshot> {
  require_session(console)?;
  console.refresh().await.context("could not load data")
}

fn require_session<A: AccessApi>(console: &AccessConsole<A>) -> Result<()> {
  if console.session().is_none() && console.restore().is_none() {
    bail!("not logged in; run `sicae login`");
  }
  Ok(())
}

fn print_status<A: AccessApi>(console: &AccessConsole<A>) {
  if let Some(status) = console.status() {
    println!("{status}");
  }
}

fn print_event(snapshot: &DomainSnapshot, event: &AccessEvent) {
  let point = event
    .access_point_id
    .and_then(|id| snapshot.access_points.iter().find(|p| p.id == id))
    .map(|p| p.name.as_str())
    .unwrap_or("-");
  println!(
    "{}  {:<8} {:<28} {:<20} {}",
    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
    event.result.to_string(),
    person_name(snapshot, event.person_id),
    point,
    event.reason
  );
}

fn person_name(snapshot: &DomainSnapshot, id: Uuid) -> String {
  snapshot
    .people
    .iter()
    .find(|p| p.id == id)
    .map(|p| p.full_name.clone())
    .unwrap_or_else(|| id.to_string())
}

fn kind_label(kind: sicae_core::domain::PersonKind) -> &'static str {
  use sicae_core::domain::PersonKind;
  match kind {
    PersonKind::Employee => "employee",
    PersonKind::Visitor => "visitor",
    PersonKind::Contractor => "contractor",
  }
}
