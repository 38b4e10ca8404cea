//! Role lookup and the privileged admin procedures.

use std::sync::Arc;
use thiserror::Error;

use crate::session::Session;
use crate::store::{AdminUser, RemoteStore, StoreError, Table, UserStats};

pub const ADMIN_ROLE: &str = "admin";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdminError {
    #[error("Not signed in")]
    Unauthenticated,
    #[error("The {0} role is required")]
    Forbidden(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct AdminClient {
    store: Arc<dyn RemoteStore>,
    session: Session,
}

impl AdminClient {
    pub fn new(store: Arc<dyn RemoteStore>, session: Session) -> Self {
        Self { store, session }
    }

    /// Roles held by the signed-in subject; empty when signed out.
    pub async fn roles(&self) -> Result<Vec<String>, AdminError> {
        let Some(subject) = self.session.subject() else {
            return Ok(Vec::new());
        };
        Ok(self.store.select_keys(Table::UserRoles, &subject.id).await?)
    }

    pub async fn has_role(&self, role: &str) -> Result<bool, AdminError> {
        Ok(self.roles().await?.iter().any(|r| r == role))
    }

    pub async fn is_admin(&self) -> Result<bool, AdminError> {
        self.has_role(ADMIN_ROLE).await
    }

    pub async fn all_users(&self) -> Result<Vec<AdminUser>, AdminError> {
        self.require_admin().await?;
        Ok(self.store.get_all_users_for_admin().await?)
    }

    pub async fn user_stats(&self, user_id: &str) -> Result<UserStats, AdminError> {
        self.require_admin().await?;
        Ok(self.store.get_user_stats_for_admin(user_id).await?)
    }

    async fn require_admin(&self) -> Result<(), AdminError> {
        if self.session.subject().is_none() {
            return Err(AdminError::Unauthenticated);
        }
        if !self.is_admin().await? {
            tracing::warn!("Admin procedure requested without the admin role");
            return Err(AdminError::Forbidden(ADMIN_ROLE));
        }
        Ok(())
    }
}
