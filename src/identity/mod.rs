pub mod gotrue;

use crate::auth::AuthUser;
use thiserror::Error;
use uuid::Uuid;

pub use gotrue::{AdminAuthClient, PublicAuthClient};

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The provider refused the caller's credential.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("{message}")]
    Upstream { status: u16, message: String },
    #[error("Identity provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Identity provider is not configured: {0}")]
    NotConfigured(&'static str),
}

/// Verifies caller credentials with the public (anonymous) key.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to the account it belongs to. `Ok(None)` when the
    /// provider accepts the request but reports no user.
    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>, IdentityError>;
}

/// Operations that require the privileged service key.
#[async_trait::async_trait]
pub trait IdentityAdmin: Send + Sync {
    /// Irreversibly remove an account.
    async fn delete_user(&self, user_id: &Uuid) -> Result<(), IdentityError>;
}
