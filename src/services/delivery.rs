use async_trait::async_trait;

use crate::{error::AppResult, models::PublicUser};

/// Out-of-band channel for freshly generated credentials.
#[async_trait]
pub trait PasswordDelivery: Send + Sync {
    async fn deliver(&self, user: &PublicUser, password: &str) -> AppResult<()>;
}

/// Stand-in for an email sender: records the dispatch, never the credential.
pub struct LogDelivery;

#[async_trait]
impl PasswordDelivery for LogDelivery {
    async fn deliver(&self, user: &PublicUser, _password: &str) -> AppResult<()> {
        log::info!("New password for user {} queued for delivery to {}", user.id, user.email);
        Ok(())
    }
}
