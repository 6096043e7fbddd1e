//! Users, roles and the closed permission set.
//!
//! Permissions are flat capability tags. Roles are looked up from storage,
//! never computed; a user's effective capabilities are exactly the tags on
//! their role.

use std::{collections::BTreeSet, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

// ─── Permission ──────────────────────────────────────────────────────────────

/// A single capability tag, e.g. `statements:edit`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
pub enum Permission {
  #[serde(rename = "statements:add")]
  #[strum(serialize = "statements:add")]
  StatementsAdd,

  /// Blanket edit of statements and their assessments.
  #[serde(rename = "statements:edit")]
  #[strum(serialize = "statements:edit")]
  StatementsEdit,

  #[serde(rename = "statements:edit-as-evaluator")]
  #[strum(serialize = "statements:edit-as-evaluator")]
  StatementsEditAsEvaluator,

  #[serde(rename = "statements:edit-as-proofreader")]
  #[strum(serialize = "statements:edit-as-proofreader")]
  StatementsEditAsProofreader,

  #[serde(rename = "statements:delete")]
  #[strum(serialize = "statements:delete")]
  StatementsDelete,

  #[serde(rename = "statements:sort")]
  #[strum(serialize = "statements:sort")]
  StatementsSort,

  #[serde(rename = "statements:view-unapproved-evaluation")]
  #[strum(serialize = "statements:view-unapproved-evaluation")]
  StatementsViewUnapprovedEvaluation,

  #[serde(rename = "statements:view-evaluation-as-evaluator")]
  #[strum(serialize = "statements:view-evaluation-as-evaluator")]
  StatementsViewEvaluationAsEvaluator,
}

/// An unordered set of [`Permission`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
  pub fn new() -> Self { Self::default() }

  pub fn contains(&self, permission: Permission) -> bool {
    self.0.contains(&permission)
  }

  pub fn insert(&mut self, permission: Permission) -> bool {
    self.0.insert(permission)
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
    self.0.iter().copied()
  }

  /// Parse stored permission strings, returning the recognised set and the
  /// strings that did not match any known tag.
  pub fn parse_lossy<I, S>(raw: I) -> (Self, Vec<String>)
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut set = Self::new();
    let mut unknown = Vec::new();
    for s in raw {
      match Permission::from_str(s.as_ref()) {
        Ok(p) => {
          set.insert(p);
        }
        Err(_) => unknown.push(s.as_ref().to_owned()),
      }
    }
    (set, unknown)
  }
}

impl FromIterator<Permission> for PermissionSet {
  fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
    Self(iter.into_iter().collect())
  }
}

// ─── Role / User ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
  pub id:          i64,
  /// Stable machine key, e.g. `"admin"`, `"expert"`, `"proofreader"`.
  pub key:         String,
  pub name:        String,
  pub permissions: PermissionSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id:                 i64,
  pub email:              String,
  pub first_name:         String,
  pub last_name:          String,
  #[serde(skip_serializing)]
  pub password_hash:      Option<String>,
  pub active:             bool,
  pub notify_on_approval: bool,
  pub role:               Role,
}

impl User {
  pub fn has(&self, permission: Permission) -> bool {
    self.role.permissions.contains(permission)
  }

  /// How the user is named in notification texts.
  pub fn display_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
  }
}

/// Input to [`crate::store::EditorialStore::create_role`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewRole {
  pub key:         String,
  pub name:        String,
  pub permissions: PermissionSet,
}

/// Input to [`crate::store::EditorialStore::create_user`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
  pub email:              String,
  pub first_name:         String,
  pub last_name:          String,
  pub password_hash:      Option<String>,
  pub role_id:            i64,
  #[serde(default = "default_true")]
  pub active:             bool,
  #[serde(default)]
  pub notify_on_approval: bool,
}

fn default_true() -> bool { true }

impl NewUser {
  pub fn new(
    email: impl Into<String>,
    first_name: impl Into<String>,
    last_name: impl Into<String>,
    role_id: i64,
  ) -> Self {
    Self {
      email: email.into(),
      first_name: first_name.into(),
      last_name: last_name.into(),
      password_hash: None,
      role_id,
      active: true,
      notify_on_approval: false,
    }
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator as _;

  use super::*;

  #[test]
  fn permission_tags_round_trip_through_strings() {
    for p in Permission::iter() {
      assert_eq!(Permission::from_str(p.as_ref()).unwrap(), p);
      let json = serde_json::to_string(&p).unwrap();
      assert_eq!(json, format!("\"{p}\""));
    }
  }

  #[test]
  fn parse_lossy_reports_unknown_tags() {
    let (set, unknown) = PermissionSet::parse_lossy([
      "statements:edit",
      "articles:edit",
      "statements:edit-as-evaluator",
    ]);
    assert!(set.contains(Permission::StatementsEdit));
    assert!(set.contains(Permission::StatementsEditAsEvaluator));
    assert!(!set.contains(Permission::StatementsDelete));
    assert_eq!(unknown, vec!["articles:edit".to_owned()]);
  }
}
