//! User type aggregate: the permission template every user belongs to.

use crate::model::validation::{is_valid_alias, require_non_empty, ValidationError};
use crate::query::{Field, FieldValue};
use crate::tracking::ChangeTracker;
use serde::Serialize;

/// Store-assigned user type identity.
pub type UserTypeId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UserTypeField {
    Alias,
    Name,
    Permissions,
}

impl UserTypeField {
    pub const ALL: [UserTypeField; 3] = [Self::Alias, Self::Name, Self::Permissions];
}

impl Field for UserTypeField {
    fn column(self) -> &'static str {
        match self {
            Self::Alias => "alias",
            Self::Name => "name",
            Self::Permissions => "permissions",
        }
    }

    fn name(self) -> &'static str {
        self.column()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserType {
    id: Option<UserTypeId>,
    /// Unique machine name, e.g. `editor`.
    pub alias: String,
    pub name: String,
    /// Default permission letters granted to members of this type.
    pub permissions: String,
    #[serde(skip)]
    tracker: ChangeTracker<UserTypeField>,
}

impl UserType {
    pub fn new(alias: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            alias: alias.into(),
            name: name.into(),
            permissions: String::new(),
            tracker: ChangeTracker::transient(),
        }
    }

    pub fn id(&self) -> Option<UserTypeId> {
        self.id
    }

    pub fn has_identity(&self) -> bool {
        self.id.is_some()
    }

    pub fn scalar_values(&self) -> Vec<(UserTypeField, FieldValue)> {
        vec![
            (UserTypeField::Alias, self.alias.as_str().into()),
            (UserTypeField::Name, self.name.as_str().into()),
            (UserTypeField::Permissions, self.permissions.as_str().into()),
        ]
    }

    pub fn changed_values(&self) -> Vec<(UserTypeField, FieldValue)> {
        self.tracker.changes(self.scalar_values())
    }

    pub fn is_dirty(&self) -> bool {
        self.tracker.is_dirty(self.scalar_values())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !is_valid_alias(&self.alias) {
            return Err(ValidationError::InvalidAlias(self.alias.clone()));
        }
        require_non_empty("user_type", "name", &self.name)
    }

    pub(crate) fn into_persisted(mut self, id: UserTypeId) -> Self {
        self.id = Some(id);
        self.tracker = ChangeTracker::baselined(self.scalar_values());
        self
    }

    pub(crate) fn assign_identity(&mut self, id: UserTypeId) {
        if self.id.is_none() {
            self.id = Some(id);
        }
    }

    pub(crate) fn mark_clean(&mut self) {
        self.tracker.rebaseline(self.scalar_values());
    }
}

impl PartialEq for UserType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.scalar_values() == other.scalar_values()
    }
}

impl Eq for UserType {}
