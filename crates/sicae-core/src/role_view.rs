//! RoleView: the role-conditioned filter applied to synchronised collections.
//!
//! Privileged identities see everything. Anyone else only sees records owned
//! by the person their account is linked to; an account with no linked person
//! sees nothing.

use uuid::Uuid;

use crate::{
  domain::{AccessEvent, Credential, DomainSnapshot, Person},
  identity::Identity,
};

/// A record that belongs to exactly one person.
pub trait PersonOwned {
  fn owner_id(&self) -> Uuid;
}

impl PersonOwned for Person {
  fn owner_id(&self) -> Uuid { self.id }
}

impl PersonOwned for Credential {
  fn owner_id(&self) -> Uuid { self.person_id }
}

impl PersonOwned for AccessEvent {
  fn owner_id(&self) -> Uuid { self.person_id }
}

/// The visibility scope derived from an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleView {
  Unrestricted,
  /// Only records owned by this person. `None` hides everything.
  Person(Option<Uuid>),
}

impl RoleView {
  pub fn for_identity(identity: &Identity) -> Self {
    if identity.role.is_privileged() {
      Self::Unrestricted
    } else {
      Self::Person(identity.linked_person_id)
    }
  }

  pub fn permits<T: PersonOwned>(&self, item: &T) -> bool {
    match self {
      Self::Unrestricted => true,
      Self::Person(linked) => *linked == Some(item.owner_id()),
    }
  }

  pub fn retain<T: PersonOwned>(&self, items: &mut Vec<T>) {
    if matches!(self, Self::Unrestricted) {
      return;
    }
    items.retain(|item| self.permits(item));
  }

  /// Filter the person-owned collections of `snapshot` in place. Access
  /// points and users are not person-owned and pass through untouched.
  pub fn apply(&self, snapshot: &mut DomainSnapshot) {
    self.retain(&mut snapshot.people);
    self.retain(&mut snapshot.credentials);
    self.retain(&mut snapshot.events);
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::{
    domain::{AccessResult, CredentialStatus, PersonKind},
    identity::Role,
  };

  fn identity(role: Role, linked: Option<Uuid>) -> Identity {
    Identity {
      id: Some(Uuid::new_v4()),
      display_name: "Operator".into(),
      email: "op@example.com".into(),
      role,
      linked_person_id: linked,
    }
  }

  fn person(id: Uuid) -> Person {
    Person {
      id,
      full_name: "P".into(),
      document: String::new(),
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
      payload: None,
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

  fn mixed(me: Uuid, other: Uuid) -> DomainSnapshot {
    DomainSnapshot {
      people: vec![person(me), person(other)],
      credentials: vec![credential(other), credential(me), credential(me)],
      events: vec![event(other), event(me)],
      ..Default::default()
    }
  }

  #[test]
  fn visitor_sees_only_own_records() {
    let (me, other) = (Uuid::new_v4(), Uuid::new_v4());
    let mut snapshot = mixed(me, other);
    RoleView::for_identity(&identity(Role::Visitor, Some(me))).apply(&mut snapshot);

    assert_eq!(snapshot.people.len(), 1);
    assert_eq!(snapshot.credentials.len(), 2);
    assert_eq!(snapshot.events.len(), 1);
    assert!(snapshot.people.iter().all(|p| p.id == me));
    assert!(snapshot.credentials.iter().all(|c| c.person_id == me));
    assert!(snapshot.events.iter().all(|e| e.person_id == me));
  }

  #[test]
  fn privileged_roles_see_everything() {
    let (me, other) = (Uuid::new_v4(), Uuid::new_v4());
    for role in [Role::Admin, Role::Security] {
      let original = mixed(me, other);
      let mut snapshot = original.clone();
      RoleView::for_identity(&identity(role, Some(me))).apply(&mut snapshot);
      assert_eq!(snapshot, original);
    }
  }

  #[test]
  fn unlinked_visitor_sees_nothing() {
    let mut snapshot = mixed(Uuid::new_v4(), Uuid::new_v4());
    RoleView::for_identity(&identity(Role::Visitor, None)).apply(&mut snapshot);
    assert!(snapshot.people.is_empty());
    assert!(snapshot.credentials.is_empty());
    assert!(snapshot.events.is_empty());
  }
}
