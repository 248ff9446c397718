//! User aggregate.
//!
//! # Responsibility
//! - Hold user account attributes and the allowed-sections set.
//! - Report dirty state by diffing against the last persisted snapshot.
//!
//! # Invariants
//! - `id` is assigned once by the store and is read-only afterwards.
//! - `allowed_sections` has set semantics; add/remove are idempotent.
//! - A user hydrated from storage is not dirty.

use crate::model::user_type::UserTypeId;
use crate::model::validation::{is_valid_alias, is_valid_email, require_non_empty, ValidationError};
use crate::query::{Field, FieldValue};
use crate::tracking::{ChangeTracker, MemberSet};
use serde::Serialize;

/// Store-assigned user identity.
pub type UserId = i64;

/// Content/media start node used when a user has no explicit start node.
pub const ROOT_NODE_ID: i64 = -1;

/// Scalar attributes of [`User`], usable in predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UserField {
    Name,
    Username,
    Email,
    Password,
    Language,
    Permissions,
    IsApproved,
    NoConsole,
    DefaultToLiveEditing,
    StartContentId,
    StartMediaId,
    UserType,
}

impl UserField {
    pub const ALL: [UserField; 12] = [
        Self::Name,
        Self::Username,
        Self::Email,
        Self::Password,
        Self::Language,
        Self::Permissions,
        Self::IsApproved,
        Self::NoConsole,
        Self::DefaultToLiveEditing,
        Self::StartContentId,
        Self::StartMediaId,
        Self::UserType,
    ];
}

impl Field for UserField {
    fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Username => "username",
            Self::Email => "email",
            Self::Password => "password_hash",
            Self::Language => "language",
            Self::Permissions => "permissions",
            Self::IsApproved => "is_approved",
            Self::NoConsole => "no_console",
            Self::DefaultToLiveEditing => "default_to_live_editing",
            Self::StartContentId => "start_content_id",
            Self::StartMediaId => "start_media_id",
            Self::UserType => "user_type_id",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Username => "username",
            Self::Email => "email",
            Self::Password => "password",
            Self::Language => "language",
            Self::Permissions => "permissions",
            Self::IsApproved => "is_approved",
            Self::NoConsole => "no_console",
            Self::DefaultToLiveEditing => "default_to_live_editing",
            Self::StartContentId => "start_content_id",
            Self::StartMediaId => "start_media_id",
            Self::UserType => "user_type",
        }
    }
}

/// Back-office user account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    id: Option<UserId>,
    pub name: String,
    pub username: String,
    pub email: String,
    /// Password hash. Never serialized.
    #[serde(skip_serializing)]
    pub password: String,
    pub language: String,
    /// Opaque permission letters; stored, never enforced here.
    pub permissions: String,
    pub is_approved: bool,
    /// Console (back-office) access is denied when `true`.
    pub no_console: bool,
    pub default_to_live_editing: bool,
    pub start_content_id: i64,
    pub start_media_id: i64,
    pub user_type: UserTypeId,
    allowed_sections: MemberSet,
    #[serde(skip)]
    tracker: ChangeTracker<UserField>,
}

impl User {
    /// Creates a transient user with default flags and no sections.
    pub fn new(
        user_type: UserTypeId,
        name: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            username: username.into(),
            email: email.into(),
            password: String::new(),
            language: "en".to_string(),
            permissions: String::new(),
            is_approved: true,
            no_console: false,
            default_to_live_editing: false,
            start_content_id: ROOT_NODE_ID,
            start_media_id: ROOT_NODE_ID,
            user_type,
            allowed_sections: MemberSet::new(),
            tracker: ChangeTracker::transient(),
        }
    }

    pub fn id(&self) -> Option<UserId> {
        self.id
    }

    pub fn has_identity(&self) -> bool {
        self.id.is_some()
    }

    pub fn allowed_sections(&self) -> impl Iterator<Item = &str> {
        self.allowed_sections.iter()
    }

    pub fn sections(&self) -> &MemberSet {
        &self.allowed_sections
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.allowed_sections.contains(section)
    }

    /// Grants one section; a no-op when already granted.
    pub fn add_allowed_section(&mut self, section: &str) -> bool {
        self.allowed_sections.insert(section)
    }

    /// Revokes one section; a no-op when not granted.
    pub fn remove_allowed_section(&mut self, section: &str) -> bool {
        self.allowed_sections.remove(section)
    }

    /// Current scalar attributes in [`UserField::ALL`] order.
    pub fn scalar_values(&self) -> Vec<(UserField, FieldValue)> {
        UserField::ALL
            .iter()
            .map(|field| (*field, self.value_of(*field)))
            .collect()
    }

    pub fn value_of(&self, field: UserField) -> FieldValue {
        match field {
            UserField::Name => self.name.as_str().into(),
            UserField::Username => self.username.as_str().into(),
            UserField::Email => self.email.as_str().into(),
            UserField::Password => self.password.as_str().into(),
            UserField::Language => self.language.as_str().into(),
            UserField::Permissions => self.permissions.as_str().into(),
            UserField::IsApproved => self.is_approved.into(),
            UserField::NoConsole => self.no_console.into(),
            UserField::DefaultToLiveEditing => self.default_to_live_editing.into(),
            UserField::StartContentId => self.start_content_id.into(),
            UserField::StartMediaId => self.start_media_id.into(),
            UserField::UserType => self.user_type.into(),
        }
    }

    /// Scalar attributes that differ from the last persisted snapshot.
    pub fn changed_values(&self) -> Vec<(UserField, FieldValue)> {
        self.tracker.changes(self.scalar_values())
    }

    pub fn changed_fields(&self) -> Vec<UserField> {
        self.tracker.changed_fields(self.scalar_values())
    }

    /// True when a scalar changed or a section grant/revoke is pending.
    pub fn is_dirty(&self) -> bool {
        self.tracker.is_dirty(self.scalar_values()) || self.allowed_sections.has_pending()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("user", "name", &self.name)?;
        require_non_empty("user", "username", &self.username)?;
        if !is_valid_email(&self.email) {
            return Err(ValidationError::InvalidEmail);
        }
        if self.user_type <= 0 {
            return Err(ValidationError::InvalidUserType(self.user_type));
        }
        if let Some(section) = self.allowed_sections().find(|section| !is_valid_alias(section)) {
            return Err(ValidationError::InvalidSection(section.to_string()));
        }
        Ok(())
    }

    /// Turns hydrated values into a clean, persisted user.
    pub(crate) fn into_persisted(mut self, id: UserId, sections: Vec<String>) -> Self {
        self.id = Some(id);
        self.allowed_sections = MemberSet::from_persisted(sections);
        self.tracker = ChangeTracker::baselined(self.scalar_values());
        self
    }

    pub(crate) fn assign_identity(&mut self, id: UserId) {
        if self.id.is_none() {
            self.id = Some(id);
        }
    }

    pub(crate) fn mark_clean(&mut self) {
        self.tracker.rebaseline(self.scalar_values());
        self.allowed_sections.mark_persisted();
    }
}

/// Equality over identity, scalar attributes and section membership.
impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.scalar_values() == other.scalar_values()
            && self.allowed_sections == other.allowed_sections
    }
}

impl Eq for User {}
