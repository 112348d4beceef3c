//! User business logic and explicit sessions.
//!
//! A [`Session`] is the signed-in identity handed to every operation that needs to
//! know who is acting. It is built once from the user record and passed along
//! explicitly instead of being read from ambient storage.

use crate::{
    entities::{Role, User, donation_request, user},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use tracing::info;

/// Identity of the user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Id of the signed-in user
    pub user_id: i64,
    /// What the user may do
    pub role: Role,
    /// Name to greet the user with
    pub display_name: String,
}

impl Session {
    /// Builds a session for a loaded user record.
    #[must_use]
    pub fn from_user(user: &user::Model) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            display_name: user.display_name.clone(),
        }
    }

    /// Whether the session belongs to an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails unless the session belongs to an administrator.
    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::PermissionDenied {
                reason: format!("user {} is a {}, not an admin", self.user_id, self.role),
            })
        }
    }

    /// Fails unless the session's role is one of `roles`.
    pub fn require_role(&self, roles: &[Role]) -> Result<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(Error::PermissionDenied {
                reason: format!("role {} cannot perform this action", self.role),
            })
        }
    }

    /// Whether the session may edit or delete the given request: its owner or an admin.
    #[must_use]
    pub fn can_manage(&self, request: &donation_request::Model) -> bool {
        self.is_admin() || request.user_id == self.user_id
    }
}

/// Creates a user account.
///
/// The display name must not be blank and the email must look like an address.
/// Both are trimmed before storing.
pub async fn create_user(
    db: &DatabaseConnection,
    display_name: &str,
    email: &str,
    role: Role,
) -> Result<user::Model> {
    let display_name = display_name.trim();
    let email = email.trim();

    if display_name.is_empty() {
        return Err(Error::Validation {
            message: "Display name cannot be empty".to_string(),
        });
    }

    if !email.contains('@') {
        return Err(Error::Validation {
            message: format!("'{email}' is not a valid email address"),
        });
    }

    let user = user::ActiveModel {
        display_name: Set(display_name.to_string()),
        email: Set(email.to_string()),
        role: Set(role),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let created = user.insert(db).await?;
    info!(user_id = created.id, role = %created.role, "Created user");
    Ok(created)
}

/// Finds a user by id.
pub async fn get_user_by_id(db: &DatabaseConnection, user_id: i64) -> Result<Option<user::Model>> {
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Loads a user and builds the session that represents them.
pub async fn session_for_user(db: &DatabaseConnection, user_id: i64) -> Result<Session> {
    let user = get_user_by_id(db, user_id)
        .await?
        .ok_or(Error::UserNotFound { id: user_id })?;
    Ok(Session::from_user(&user))
}
