//! Domain records synchronised from the server.
//!
//! Every record here is created by the server and only ever *held* by the
//! client: nothing is edited in place after it arrives. Field names on the
//! wire follow the server's JSON; English names are accepted on input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::Role;

// ─── People ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersonKind {
  #[serde(rename = "EMPLEADO")]
  Employee,
  #[serde(rename = "VISITANTE")]
  Visitor,
  #[serde(rename = "CONTRATISTA")]
  Contractor,
}

/// Someone who can hold credentials and pass through access points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub id:             Uuid,
  #[serde(rename = "nombreCompleto", alias = "fullName")]
  pub full_name:      String,
  #[serde(default, rename = "documento", alias = "document")]
  pub document:       String,
  #[serde(default, rename = "telefono", alias = "phone")]
  pub phone:          String,
  #[serde(rename = "tipo", alias = "kind")]
  pub kind:           PersonKind,
  #[serde(default, rename = "empresa", alias = "company")]
  pub company:        Option<String>,
  #[serde(default, rename = "personaContacto", alias = "contactPerson")]
  pub contact_person: Option<String>,
  #[serde(default, rename = "motivoVisita", alias = "visitReason")]
  pub visit_reason:   Option<String>,
}

/// Input to [`crate::api::AccessApi::create_person`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPerson {
  #[serde(rename = "nombreCompleto")]
  pub full_name:      String,
  #[serde(rename = "documento")]
  pub document:       String,
  #[serde(rename = "telefono")]
  pub phone:          String,
  #[serde(rename = "tipo")]
  pub kind:           PersonKind,
  #[serde(rename = "empresa")]
  pub company:        Option<String>,
  #[serde(rename = "personaContacto")]
  pub contact_person: Option<String>,
  #[serde(rename = "motivoVisita")]
  pub visit_reason:   Option<String>,
}

// ─── Credentials ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
  #[serde(rename = "ACTIVA", alias = "ACTIVE")]
  Active,
  #[serde(rename = "EXPIRADA", alias = "EXPIRED")]
  Expired,
  #[serde(rename = "REVOCADA", alias = "REVOKED")]
  Revoked,
  #[serde(other)]
  Unknown,
}

/// A time-bounded QR credential tied to one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
  pub id:         Uuid,
  #[serde(rename = "personaId", alias = "personId")]
  pub person_id:  Uuid,
  #[serde(rename = "estado", alias = "status")]
  pub status:     CredentialStatus,
  /// The text encoded in the QR symbol.
  #[serde(default, rename = "codigo", alias = "payload")]
  pub payload:    Option<String>,
  #[serde(default, rename = "expiraEn", alias = "expiresAt")]
  pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
  pub fn is_active(&self) -> bool { self.status == CredentialStatus::Active }
}

// ─── Access events ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessResult {
  #[serde(rename = "PERMITIDO", alias = "ALLOWED")]
  Allowed,
  #[serde(rename = "DENEGADO", alias = "DENIED")]
  Denied,
  #[serde(rename = "PENDIENTE", alias = "PENDING")]
  Pending,
}

impl std::fmt::Display for AccessResult {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      Self::Allowed => "ALLOWED",
      Self::Denied => "DENIED",
      Self::Pending => "PENDING",
    })
  }
}

/// The server's verdict on one validation request. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
  pub id:              Uuid,
  #[serde(rename = "personaId", alias = "personId")]
  pub person_id:       Uuid,
  #[serde(rename = "fechaHora", alias = "timestamp")]
  pub timestamp:       DateTime<Utc>,
  #[serde(rename = "resultado", alias = "result")]
  pub result:          AccessResult,
  #[serde(default, rename = "motivo", alias = "reason")]
  pub reason:          String,
  #[serde(default, rename = "puntoAccesoId", alias = "accessPointId")]
  pub access_point_id: Option<Uuid>,
}

// ─── Access points ───────────────────────────────────────────────────────────

/// A physical location where credentials are checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPoint {
  pub id:       Uuid,
  #[serde(rename = "nombre", alias = "name")]
  pub name:     String,
  #[serde(default, rename = "ubicacion", alias = "location")]
  pub location: String,
  #[serde(default, rename = "tipo", alias = "kind")]
  pub kind:     String,
  #[serde(default = "default_true", rename = "activo", alias = "active")]
  pub active:   bool,
}

fn default_true() -> bool { true }

/// Input to [`crate::api::AccessApi::register_access_point`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccessPoint {
  #[serde(rename = "nombre")]
  pub name:     String,
  #[serde(rename = "ubicacion")]
  pub location: String,
  #[serde(rename = "tipo")]
  pub kind:     String,
  #[serde(rename = "activo")]
  pub active:   bool,
}

// ─── Users ───────────────────────────────────────────────────────────────────

/// An operator account as listed to administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
  #[serde(rename = "usuarioId", alias = "id")]
  pub id:        Uuid,
  #[serde(rename = "nombreCompleto", alias = "fullName")]
  pub full_name: String,
  #[serde(rename = "correo", alias = "email")]
  pub email:     String,
  #[serde(rename = "rol", alias = "role")]
  pub role:      Role,
}

/// Input to [`crate::api::AccessApi::register`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
  #[serde(rename = "nombreCompleto")]
  pub full_name: String,
  #[serde(rename = "correo")]
  pub email:     String,
  pub password:  String,
  #[serde(rename = "rol")]
  pub role:      Role,
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Everything the client holds about the server's state at one point in time.
///
/// `events` is ordered most-recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainSnapshot {
  pub people:        Vec<Person>,
  pub credentials:   Vec<Credential>,
  pub events:        Vec<AccessEvent>,
  pub access_points: Vec<AccessPoint>,
  pub users:         Vec<UserRecord>,
}

/// Headline counters shown on the operator dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
  pub people:             usize,
  pub active_credentials: usize,
  pub access_points:      usize,
  pub events:             usize,
}

impl DomainSnapshot {
  pub fn stats(&self) -> DashboardStats {
    DashboardStats {
      people:             self.people.len(),
      active_credentials: self.credentials.iter().filter(|c| c.is_active()).count(),
      access_points:      self.access_points.len(),
      events:             self.events.len(),
    }
  }

  /// The `n` most recent access events.
  pub fn recent_events(&self, n: usize) -> &[AccessEvent] {
    &self.events[..self.events.len().min(n)]
  }

  /// Events with the given verdict, most recent first. `None` keeps all.
  pub fn events_with(&self, result: Option<AccessResult>) -> Vec<&AccessEvent> {
    self.events.iter().filter(|e| result.is_none_or(|r| e.result == r)).collect()
  }
}
