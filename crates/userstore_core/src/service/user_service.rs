//! User account use-case service.
//!
//! # Responsibility
//! - Provide registration and section grant/revoke entry points.
//! - Run each use case in its own unit of work.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Grant/revoke of an unknown user fails with `UserNotFound` and stages
//!   nothing.

use crate::model::user::{User, UserField, UserId};
use crate::model::user_type::{UserType, UserTypeField};
use crate::query::Query;
use crate::repo::{RepoError, Repository};
use crate::uow::{CommitSummary, Store};
use log::info;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("user not found: {0}")]
    UserNotFound(UserId),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Request model for registering one user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterUserRequest {
    pub user_type: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    /// Pre-hashed password text; stored as given.
    pub password: String,
    pub sections: Vec<String>,
}

/// Use-case service wrapper over one [`Store`].
pub struct UserService {
    store: Store,
}

impl UserService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Creates a user type and returns it with its assigned id.
    pub fn register_user_type(
        &mut self,
        alias: &str,
        name: &str,
        permissions: &str,
    ) -> ServiceResult<UserType> {
        let mut user_type = UserType::new(alias, name);
        user_type.permissions = permissions.to_string();

        let mut uow = self.store.unit_of_work();
        uow.user_types().add_or_update(&mut user_type)?;
        uow.commit()?;
        Ok(user_type)
    }

    /// Creates a user with its initial section grants in one commit.
    pub fn register_user(&mut self, request: &RegisterUserRequest) -> ServiceResult<User> {
        let mut user = User::new(
            request.user_type,
            request.name.as_str(),
            request.username.as_str(),
            request.email.as_str(),
        );
        user.password = request.password.clone();
        for section in &request.sections {
            user.add_allowed_section(section);
        }

        let mut uow = self.store.unit_of_work();
        uow.users().add_or_update(&mut user)?;
        uow.commit()?;
        info!(
            "event=user_register module=service status=ok user_id={} sections={}",
            user.id().unwrap_or_default(),
            user.sections().len()
        );
        Ok(user)
    }

    pub fn get_user(&mut self, id: UserId) -> ServiceResult<Option<User>> {
        Ok(self.store.unit_of_work().users().get(id)?)
    }

    pub fn find_by_username(&mut self, username: &str) -> ServiceResult<Option<User>> {
        let query = Query::eq(UserField::Username, username);
        let found = self.store.unit_of_work().users().get_by_query(&query)?;
        Ok(found.into_iter().next())
    }

    /// Lists users matching any of `usernames`, or every user when empty.
    pub fn list_users(&mut self, usernames: &[String]) -> ServiceResult<Vec<User>> {
        let query = Query::any_of(UserField::Username, usernames).unwrap_or_else(Query::all);
        Ok(self.store.unit_of_work().users().get_by_query(&query)?)
    }

    pub fn list_user_types(&mut self) -> ServiceResult<Vec<UserType>> {
        Ok(self
            .store
            .unit_of_work()
            .user_types()
            .get_by_query(&Query::<UserTypeField>::all())?)
    }

    /// Grants `section` to the user; returns the user after commit.
    pub fn grant_section(&mut self, id: UserId, section: &str) -> ServiceResult<User> {
        self.update_sections(id, |user| {
            user.add_allowed_section(section);
        })
    }

    /// Revokes `section` from the user; returns the user after commit.
    pub fn revoke_section(&mut self, id: UserId, section: &str) -> ServiceResult<User> {
        self.update_sections(id, |user| {
            user.remove_allowed_section(section);
        })
    }

    /// Deletes the user and its section grants; returns the deleted user.
    pub fn delete_user(&mut self, id: UserId) -> ServiceResult<User> {
        let mut user = self.require_user(id)?;
        let mut uow = self.store.unit_of_work();
        uow.users().delete(&mut user)?;
        uow.commit()?;
        Ok(user)
    }

    fn update_sections(
        &mut self,
        id: UserId,
        apply: impl FnOnce(&mut User),
    ) -> ServiceResult<User> {
        let mut user = self.require_user(id)?;
        apply(&mut user);

        let mut uow = self.store.unit_of_work();
        uow.users().add_or_update(&mut user)?;
        let summary: CommitSummary = uow.commit()?;
        info!(
            "event=user_sections module=service status=ok user_id={id} members_inserted={} members_deleted={}",
            summary.members_inserted, summary.members_deleted
        );
        Ok(user)
    }

    fn require_user(&mut self, id: UserId) -> ServiceResult<User> {
        self.get_user(id)?.ok_or(ServiceError::UserNotFound(id))
    }
}
