use std::sync::Arc;

use crate::application::error::AppError;
use crate::application::repos::AdminsRepo;
use crate::domain::password::verify_password;
use crate::domain::types::Role;
use crate::session::SessionTokenManager;

/// Administrator login. Admins are few and never cached.
#[derive(Clone)]
pub struct AdminService {
    admins: Arc<dyn AdminsRepo>,
    sessions: Arc<SessionTokenManager>,
}

impl AdminService {
    pub fn new(admins: Arc<dyn AdminsRepo>, sessions: Arc<SessionTokenManager>) -> Self {
        Self { admins, sessions }
    }

    pub async fn login(&self, name: &str, password: &str) -> Result<String, AppError> {
        let admin = self
            .admins
            .find_admin_by_name(name)
            .await
            .map_err(|err| AppError::from_repo("admin", err))?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &admin.salt, &admin.password) {
            return Err(AppError::InvalidCredentials);
        }

        self.sessions
            .create(admin.id, Role::Admin)
            .map_err(AppError::from)
    }
}
