use std::sync::Arc;

use tracing::warn;

use crate::application::error::AppError;
use crate::application::repos::{CreateUserParams, UserField};
use crate::cache::codes::VerificationCodes;
use crate::cache::users::{CachedUsers, Invalidation};
use crate::domain::entities::UserRecord;
use crate::domain::password::{hash_password, verify_password};
use crate::domain::types::{Gender, Role};
use crate::session::{Clock, SessionTokenManager};

const SOURCE: &str = "application::users";

#[derive(Debug, Clone)]
pub struct RegisterUserCommand {
    pub name: String,
    pub password: String,
    pub email: String,
    pub code: String,
    pub gender: Gender,
    pub introduce: String,
    pub github: String,
}

#[derive(Debug, Clone)]
pub struct UpdateProfileCommand {
    pub id: i64,
    pub gender: Gender,
    pub introduce: String,
    pub github: String,
}

/// Signed token handed out on a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub user_id: i64,
}

#[derive(Clone)]
pub struct UserService {
    users: CachedUsers,
    codes: VerificationCodes,
    sessions: Arc<SessionTokenManager>,
    clock: Arc<dyn Clock>,
}

impl UserService {
    pub fn new(
        users: CachedUsers,
        codes: VerificationCodes,
        sessions: Arc<SessionTokenManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            codes,
            sessions,
            clock,
        }
    }

    /// Create an account after checking the emailed verification code.
    pub async fn register(&self, command: RegisterUserCommand) -> Result<UserRecord, AppError> {
        let stored = self.codes.get(&command.email).await?;
        if stored.as_deref() != Some(command.code.as_str()) {
            return Err(AppError::InvalidVerificationCode);
        }

        let salted = hash_password(&command.password);
        let user = self
            .users
            .create(CreateUserParams {
                name: command.name,
                password: salted.digest,
                salt: salted.salt,
                gender: command.gender,
                introduce: command.introduce,
                github: command.github,
                email: command.email,
            })
            .await?;

        if let Err(err) = self.codes.invalidate(&user.email).await {
            warn!(
                target_module = SOURCE,
                user_id = user.id,
                error = %err,
                "Failed to invalidate registration code"
            );
        }

        Ok(user)
    }

    pub async fn get_user(&self, id: i64) -> Result<UserRecord, AppError> {
        self.users.get(id).await
    }

    pub async fn login_by_name(&self, name: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let user = hide_missing(self.users.get_by_name(name).await)?;
        self.login(user, password)
    }

    pub async fn login_by_email(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LoginOutcome, AppError> {
        let user = hide_missing(self.users.get_by_email(email).await)?;
        self.login(user, password)
    }

    pub async fn update_profile(&self, command: UpdateProfileCommand) -> Result<(), AppError> {
        let mut user = self.users.get(command.id).await?;
        user.gender = command.gender;
        user.introduce = command.introduce;
        user.github = command.github;

        self.users
            .update(
                &user,
                &[UserField::Gender, UserField::Introduce, UserField::Github],
                Invalidation::Invalidate,
            )
            .await
    }

    /// Revoke the caller's token.
    pub async fn logout(&self, token: &str) -> Result<(), AppError> {
        self.sessions.revoke(token).await.map_err(AppError::from)
    }

    fn login(&self, mut user: UserRecord, password: &str) -> Result<LoginOutcome, AppError> {
        if !verify_password(password, &user.salt, &user.password) {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.sessions.create(user.id, Role::Normal)?;
        let user_id = user.id;

        user.login_at = self.clock.now();
        let users = self.users.clone();
        tokio::spawn(async move {
            if let Err(err) = users
                .update(&user, &[UserField::LoginAt], Invalidation::Skip)
                .await
            {
                warn!(
                    target_module = SOURCE,
                    user_id = user.id,
                    error = %err,
                    "Failed to record login time"
                );
            }
        });

        Ok(LoginOutcome { token, user_id })
    }
}

/// Unknown accounts and wrong passwords are indistinguishable to callers.
fn hide_missing(result: Result<UserRecord, AppError>) -> Result<UserRecord, AppError> {
    match result {
        Err(AppError::NotFound { .. }) => Err(AppError::InvalidCredentials),
        other => other,
    }
}
