use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::domain::entities::user::UserRole;

/// The authenticated caller of a use case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    /// Allow-list role check.
    pub fn require_role(&self, allowed: &[UserRole]) -> AppResult<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        self.require_role(&[UserRole::Admin, UserRole::SuperAdmin])
    }

    /// Owners may act on their own records; admins on anyone's.
    pub fn require_owner_or_admin(&self, owner_id: Uuid) -> AppResult<()> {
        if self.user_id == owner_id || self.role.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}
