use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        actor::Actor,
        jwt,
        use_cases::subscription::SubscriptionUseCases,
        validators::{is_valid_email, is_valid_phone, is_within_length},
    },
    domain::entities::{
        subscription::CancelReason,
        user::{User, UserRole, UserStatus},
    },
    infra::password,
};

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>>;
    /// Newest first.
    async fn list(&self) -> AppResult<Vec<User>>;
    async fn count(&self) -> AppResult<i64>;
    async fn insert(&self, user: &User) -> AppResult<User>;
    async fn update(&self, user: &User) -> AppResult<User>;
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct UserUseCases {
    users: Arc<dyn UserRepo>,
    subscriptions: Arc<SubscriptionUseCases>,
    jwt_secret: SecretString,
    token_ttl: time::Duration,
}

impl UserUseCases {
    pub fn new(
        users: Arc<dyn UserRepo>,
        subscriptions: Arc<SubscriptionUseCases>,
        jwt_secret: SecretString,
        token_ttl: time::Duration,
    ) -> Self {
        Self {
            users,
            subscriptions,
            jwt_secret,
            token_ttl,
        }
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthSession> {
        let user = self.create_user(input, UserRole::User).await?;
        tracing::info!(user_id = %user.id, "User registered");
        self.session_for(user)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let email = email.trim().to_lowercase();
        let Some(mut user) = self.users.get_by_email(&email).await? else {
            return Err(AppError::InvalidCredentials);
        };
        if !password::verify(password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(AppError::InvalidCredentials);
        }
        if user.status != UserStatus::Active {
            return Err(AppError::Forbidden);
        }

        user.last_login = Some(Utc::now());
        let user = self.users.update(&user).await?;
        self.session_for(user)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, actor: &Actor, id: Uuid) -> AppResult<User> {
        actor.require_owner_or_admin(id)?;
        self.users.get_by_id(id).await?.ok_or(AppError::NotFound)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, actor: &Actor) -> AppResult<Vec<User>> {
        actor.require_admin()?;
        self.users.list().await
    }

    #[instrument(skip(self))]
    pub async fn set_status(&self, actor: &Actor, id: Uuid, status: UserStatus) -> AppResult<User> {
        actor.require_admin()?;
        let mut user = self.users.get_by_id(id).await?.ok_or(AppError::NotFound)?;
        user.status = status;
        self.users.update(&user).await
    }

    /// Cancels the user's subscriptions before removing the account.
    #[instrument(skip(self))]
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        actor.require_admin()?;
        if self.users.get_by_id(id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let cancelled = self
            .subscriptions
            .cancel_all_for_user(id, CancelReason::AdminAction)
            .await?;
        self.users.delete(id).await?;

        tracing::info!(user_id = %id, cancelled, "User deleted");
        Ok(())
    }

    /// Create the configured administrator account if it does not exist yet.
    #[instrument(skip(self, password))]
    pub async fn ensure_admin(&self, email: &str, password: &str) -> AppResult<()> {
        if self.users.get_by_email(&email.trim().to_lowercase()).await?.is_some() {
            return Ok(());
        }
        let admin = self
            .create_user(
                RegisterInput {
                    name: "Administrator".into(),
                    email: email.into(),
                    phone: "1".into(),
                    password: password.into(),
                },
                UserRole::SuperAdmin,
            )
            .await?;
        tracing::info!(user_id = %admin.id, "Bootstrap administrator created");
        Ok(())
    }

    async fn create_user(&self, input: RegisterInput, role: UserRole) -> AppResult<User> {
        let name = input.name.trim().to_string();
        if !is_within_length(&name, 2, 100) {
            return Err(AppError::InvalidInput(
                "Name must be between 2 and 100 characters".into(),
            ));
        }
        let email = input.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AppError::InvalidInput("Please provide a valid email".into()));
        }
        let phone = input.phone.trim().to_string();
        if !is_valid_phone(&phone) {
            return Err(AppError::InvalidInput(
                "Please provide a valid phone number".into(),
            ));
        }
        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AppError::InvalidInput("Email is already registered".into()));
        }

        let user = User {
            id: Uuid::new_v4(),
            name,
            email,
            phone,
            password_hash: password::hash(&input.password)?,
            status: UserStatus::Active,
            role,
            email_verified: false,
            last_login: None,
            created_at: None,
            updated_at: None,
        };
        self.users.insert(&user).await
    }

    fn session_for(&self, user: User) -> AppResult<AuthSession> {
        let token = jwt::issue(user.id, user.role, &self.jwt_secret, self.token_ttl)?;
        Ok(AuthSession { token, user })
    }
}
