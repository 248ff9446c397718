//! Entity-to-row mappings for the aggregates.

use crate::model::user::{User, UserField};
use crate::model::user_type::{UserType, UserTypeField};
use crate::model::validation::ValidationError;
use crate::query::{Field, FieldValue};
use crate::repo::{RepoError, RepoResult};
use crate::tracking::MemberSet;
use rusqlite::Row;

/// Child table holding a pure membership set keyed by `(owner, member)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    pub table: &'static str,
    pub owner_column: &'static str,
    pub member_column: &'static str,
}

/// Hooks the unit of work calls on staged entities after a successful commit.
pub trait Persistable {
    fn identity(&self) -> Option<i64>;
    /// Back-fills the store-assigned id. Ignored once an id is present.
    fn assign_identity(&mut self, id: i64);
    /// Re-baselines dirty tracking on the committed values.
    fn mark_clean(&mut self);
}

/// Describes how one entity type maps onto its scalar table and optional
/// membership table.
pub trait EntityMapping: Persistable + Sized {
    type Field: Field;

    /// Entity name used in errors and log events.
    const ENTITY: &'static str;
    /// Scalar table keyed by an auto-assigned integer `id`.
    const TABLE: &'static str;
    const MEMBERSHIP: Option<Membership> = None;

    /// Persisted scalar fields, in select order.
    fn fields() -> &'static [Self::Field];
    fn scalar_values(&self) -> Vec<(Self::Field, FieldValue)>;
    fn changed_values(&self) -> Vec<(Self::Field, FieldValue)>;
    fn is_dirty(&self) -> bool;
    fn members(&self) -> Option<&MemberSet> {
        None
    }
    fn validate(&self) -> Result<(), ValidationError>;
    /// Builds a clean entity from its scalar row and member rows.
    fn hydrate(row: &Row<'_>, members: Vec<String>) -> RepoResult<Self>;
}

pub(crate) const USER_SECTIONS: Membership = Membership {
    table: "user_sections",
    owner_column: "user_id",
    member_column: "section",
};

impl Persistable for User {
    fn identity(&self) -> Option<i64> {
        self.id()
    }

    fn assign_identity(&mut self, id: i64) {
        User::assign_identity(self, id);
    }

    fn mark_clean(&mut self) {
        User::mark_clean(self);
    }
}

impl EntityMapping for User {
    type Field = UserField;

    const ENTITY: &'static str = "user";
    const TABLE: &'static str = "users";
    const MEMBERSHIP: Option<Membership> = Some(USER_SECTIONS);

    fn fields() -> &'static [UserField] {
        &UserField::ALL
    }

    fn scalar_values(&self) -> Vec<(UserField, FieldValue)> {
        User::scalar_values(self)
    }

    fn changed_values(&self) -> Vec<(UserField, FieldValue)> {
        User::changed_values(self)
    }

    fn is_dirty(&self) -> bool {
        User::is_dirty(self)
    }

    fn members(&self) -> Option<&MemberSet> {
        Some(self.sections())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        User::validate(self)
    }

    fn hydrate(row: &Row<'_>, members: Vec<String>) -> RepoResult<Self> {
        let id: i64 = row.get("id")?;
        let mut user = User::new(
            row.get::<_, i64>(UserField::UserType.column())?,
            row.get::<_, String>(UserField::Name.column())?,
            row.get::<_, String>(UserField::Username.column())?,
            row.get::<_, String>(UserField::Email.column())?,
        );
        user.password = row.get(UserField::Password.column())?;
        user.language = row.get(UserField::Language.column())?;
        user.permissions = row.get(UserField::Permissions.column())?;
        user.is_approved = read_flag(row, UserField::IsApproved)?;
        user.no_console = read_flag(row, UserField::NoConsole)?;
        user.default_to_live_editing = read_flag(row, UserField::DefaultToLiveEditing)?;
        user.start_content_id = row.get(UserField::StartContentId.column())?;
        user.start_media_id = row.get(UserField::StartMediaId.column())?;
        Ok(user.into_persisted(id, members))
    }
}

impl Persistable for UserType {
    fn identity(&self) -> Option<i64> {
        self.id()
    }

    fn assign_identity(&mut self, id: i64) {
        UserType::assign_identity(self, id);
    }

    fn mark_clean(&mut self) {
        UserType::mark_clean(self);
    }
}

impl EntityMapping for UserType {
    type Field = UserTypeField;

    const ENTITY: &'static str = "user_type";
    const TABLE: &'static str = "user_types";

    fn fields() -> &'static [UserTypeField] {
        &UserTypeField::ALL
    }

    fn scalar_values(&self) -> Vec<(UserTypeField, FieldValue)> {
        UserType::scalar_values(self)
    }

    fn changed_values(&self) -> Vec<(UserTypeField, FieldValue)> {
        UserType::changed_values(self)
    }

    fn is_dirty(&self) -> bool {
        UserType::is_dirty(self)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        UserType::validate(self)
    }

    fn hydrate(row: &Row<'_>, _members: Vec<String>) -> RepoResult<Self> {
        let id: i64 = row.get("id")?;
        let mut user_type = UserType::new(
            row.get::<_, String>(UserTypeField::Alias.column())?,
            row.get::<_, String>(UserTypeField::Name.column())?,
        );
        user_type.permissions = row.get(UserTypeField::Permissions.column())?;
        Ok(user_type.into_persisted(id))
    }
}

fn read_flag<F: Field>(row: &Row<'_>, field: F) -> RepoResult<bool> {
    match row.get::<_, i64>(field.column())? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in column `{}`",
            field.column()
        ))),
    }
}
