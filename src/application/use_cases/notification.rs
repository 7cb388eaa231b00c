use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{actor::Actor, validators::is_within_length},
    domain::entities::notification::{Notification, NotificationKind},
};

const MAX_MESSAGE_LEN: usize = 500;

#[async_trait]
pub trait NotificationRepo: Send + Sync {
    async fn insert(&self, notification: &Notification) -> AppResult<Notification>;
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Notification>>;
    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Notification>>;
    async fn mark_read(&self, id: Uuid) -> AppResult<Option<Notification>>;
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNotificationInput {
    pub user_id: Uuid,
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: NotificationKind,
}

#[derive(Clone)]
pub struct NotificationUseCases {
    repo: Arc<dyn NotificationRepo>,
}

impl NotificationUseCases {
    pub fn new(repo: Arc<dyn NotificationRepo>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        actor: &Actor,
        input: CreateNotificationInput,
    ) -> AppResult<Notification> {
        actor.require_admin()?;
        self.insert(input.user_id, input.kind, &input.message).await
    }

    #[instrument(skip(self))]
    pub async fn list_for_user(&self, actor: &Actor, user_id: Uuid) -> AppResult<Vec<Notification>> {
        actor.require_owner_or_admin(user_id)?;
        self.repo.list_by_user(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn mark_read(&self, actor: &Actor, id: Uuid) -> AppResult<Notification> {
        self.get_owned(actor, id).await?;
        self.repo.mark_read(id).await?.ok_or(AppError::NotFound)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        self.get_owned(actor, id).await?;
        if !self.repo.delete(id).await? {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Write a notification on behalf of the system. Failures are logged, not
    /// returned, so callers' state changes stand on their own.
    pub async fn notify(&self, user_id: Uuid, kind: NotificationKind, message: &str) {
        if let Err(e) = self.insert(user_id, kind, message).await {
            tracing::warn!(user_id = %user_id, error = ?e, "Failed to record notification");
        }
    }

    async fn insert(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        message: &str,
    ) -> AppResult<Notification> {
        if !is_within_length(message, 1, MAX_MESSAGE_LEN) {
            return Err(AppError::InvalidInput(format!(
                "Message must be between 1 and {} characters",
                MAX_MESSAGE_LEN
            )));
        }

        let notification = Notification {
            id: Uuid::new_v4(),
            user_id,
            message: message.trim().to_string(),
            kind,
            is_read: false,
            created_at: Some(chrono::Utc::now()),
        };
        self.repo.insert(&notification).await
    }

    async fn get_owned(&self, actor: &Actor, id: Uuid) -> AppResult<Notification> {
        let notification = self.repo.get_by_id(id).await?.ok_or(AppError::NotFound)?;
        actor.require_owner_or_admin(notification.user_id)?;
        Ok(notification)
    }
}
