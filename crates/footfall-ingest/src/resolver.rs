//! Identifier index — maps each external identifier kind to the canonical
//! entity id.
//!
//! Built once per batch import from all profiles holding a non-null value
//! for that identifier. A duplicate identifier across two profiles is a
//! data-integrity error surfaced here, at import time; it is never resolved
//! automatically and never reaches the read path.

use std::collections::HashMap;

use footfall_core::entity::{IdentifierKind, Profile};

use crate::Result;

#[derive(Debug, Default)]
pub struct IdentifierIndex {
  card:   HashMap<String, String>,
  face:   HashMap<String, String>,
  device: HashMap<String, String>,
  entity: HashMap<String, String>,
}

impl IdentifierIndex {
  /// Build the index from a profile snapshot, rejecting collisions.
  pub fn build(profiles: &[Profile]) -> Result<Self> {
    let mut index = Self::default();
    for profile in profiles {
      for kind in [
        IdentifierKind::CardId,
        IdentifierKind::FaceId,
        IdentifierKind::DeviceHash,
        IdentifierKind::EntityId,
      ] {
        let Some(value) = profile.identifier(kind) else { continue };
        let map = index.map_mut(kind);
        if let Some(first) = map.get(value) {
          return Err(
            footfall_core::Error::IdentifierCollision {
              kind:   kind.as_str(),
              value:  value.to_owned(),
              first:  first.clone(),
              second: profile.entity_id.clone(),
            }
            .into(),
          );
        }
        map.insert(value.to_owned(), profile.entity_id.clone());
      }
    }
    Ok(index)
  }

  /// Resolve a raw identifier to a canonical entity id. `None` means the
  /// source record stays unresolved: kept in the raw store, never linked.
  pub fn lookup(&self, kind: IdentifierKind, value: &str) -> Option<&str> {
    self.map(kind).get(value).map(String::as_str)
  }

  fn map(&self, kind: IdentifierKind) -> &HashMap<String, String> {
    match kind {
      IdentifierKind::CardId => &self.card,
      IdentifierKind::FaceId => &self.face,
      IdentifierKind::DeviceHash => &self.device,
      IdentifierKind::EntityId => &self.entity,
    }
  }

  fn map_mut(&mut self, kind: IdentifierKind) -> &mut HashMap<String, String> {
    match kind {
      IdentifierKind::CardId => &mut self.card,
      IdentifierKind::FaceId => &mut self.face,
      IdentifierKind::DeviceHash => &mut self.device,
      IdentifierKind::EntityId => &mut self.entity,
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use footfall_core::entity::{IdentifierKind, Profile, Role};

  use super::IdentifierIndex;

  fn profile(entity_id: &str, card_id: Option<&str>) -> Profile {
    Profile {
      entity_id:   entity_id.to_owned(),
      name:        entity_id.to_owned(),
      role:        Role::Student,
      email:       None,
      department:  None,
      student_id:  Some(format!("S-{entity_id}")),
      staff_id:    None,
      card_id:     card_id.map(str::to_owned),
      face_id:     None,
      device_hash: None,
      created_at:  Utc::now(),
    }
  }

  #[test]
  fn lookup_resolves_known_identifiers() {
    let index =
      IdentifierIndex::build(&[profile("E1", Some("C1")), profile("E2", None)])
        .unwrap();

    assert_eq!(index.lookup(IdentifierKind::CardId, "C1"), Some("E1"));
    assert_eq!(index.lookup(IdentifierKind::EntityId, "E2"), Some("E2"));
    assert_eq!(index.lookup(IdentifierKind::CardId, "C9"), None);
    assert_eq!(index.lookup(IdentifierKind::FaceId, "C1"), None);
  }

  #[test]
  fn duplicate_identifier_is_an_import_error() {
    let err =
      IdentifierIndex::build(&[profile("E1", Some("C1")), profile("E2", Some("C1"))])
        .unwrap_err();

    assert!(matches!(
      err,
      crate::Error::Core(footfall_core::Error::IdentifierCollision { kind: "card_id", .. })
    ));
  }
}
