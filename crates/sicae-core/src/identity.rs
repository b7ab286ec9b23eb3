//! Identity, role and session: who the operator is for the lifetime of a
//! session.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role the server assigned to an account.
///
/// Wire names follow the server (`ADMIN`, `SEGURIDAD`, `VISITANTE`). Roles the
/// client does not know about deserialise to [`Role::Other`], which is never
/// privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
  #[serde(rename = "ADMIN")]
  Admin,
  #[serde(rename = "SEGURIDAD")]
  Security,
  #[serde(rename = "VISITANTE")]
  Visitor,
  #[serde(rename = "EMPLEADO")]
  Employee,
  #[serde(other, rename = "OTRO")]
  Other,
}

impl Role {
  /// Privileged roles see every person, credential and event.
  pub fn is_privileged(self) -> bool { matches!(self, Self::Admin | Self::Security) }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Admin => "ADMIN",
      Self::Security => "SEGURIDAD",
      Self::Visitor => "VISITANTE",
      Self::Employee => "EMPLEADO",
      Self::Other => "OTRO",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl std::str::FromStr for Role {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_uppercase().as_str() {
      "ADMIN" => Ok(Self::Admin),
      "SEGURIDAD" | "SECURITY" => Ok(Self::Security),
      "VISITANTE" | "VISITOR" => Ok(Self::Visitor),
      "EMPLEADO" | "EMPLOYEE" => Ok(Self::Employee),
      other => Err(format!("unknown role: {other}")),
    }
  }
}

/// The authenticated account. Issued by the server; never modified locally.
///
/// Wire names follow the server's JSON (`nombreCompleto`, `rol`, ...); the
/// English names are accepted too. The login response may omit the account
/// id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  #[serde(default, rename = "usuarioId", alias = "id")]
  pub id:               Option<Uuid>,
  #[serde(rename = "nombreCompleto", alias = "displayName")]
  pub display_name:     String,
  #[serde(default, rename = "correo", alias = "email")]
  pub email:            String,
  #[serde(rename = "rol", alias = "role")]
  pub role:             Role,
  /// The person record this account acts for, if any.
  #[serde(default, rename = "personaId", alias = "linkedPersonId")]
  pub linked_person_id: Option<Uuid>,
}

/// Opaque bearer token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
  pub fn new(raw: impl Into<String>) -> Self { Self(raw.into()) }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Debug for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("Token(***)") }
}

/// An authenticated session: who, and the token proving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub identity: Identity,
  pub token:    Token,
}
