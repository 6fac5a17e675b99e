use crate::auth::BearerToken;
use crate::error::app_error::AppError;
use crate::identity::{IdentityAdmin, IdentityProvider};
use tracing::{error, info};
use uuid::Uuid;

pub const ACCOUNT_DELETED_MESSAGE: &str = "Conta apagada com sucesso.";

/// Self-service account removal: the caller can only ever delete themselves.
pub struct AccountDeletionService<'a> {
    identity: &'a dyn IdentityProvider,
    admin: &'a dyn IdentityAdmin,
}

impl<'a> AccountDeletionService<'a> {
    pub fn new(identity: &'a dyn IdentityProvider, admin: &'a dyn IdentityAdmin) -> Self {
        Self { identity, admin }
    }

    /// Resolve the caller from their token, then remove that account with the privileged key.
    /// Returns the id that was deleted.
    pub async fn delete_caller_account(&self, token: &BearerToken) -> Result<Uuid, AppError> {
        let user = token.authenticate(self.identity).await?;

        info!(user_id = %user.id, "attempting to delete user");

        if let Err(e) = self.admin.delete_user(&user.id).await {
            error!(user_id = %user.id, error = %e, "failed to delete user");
            return Err(AppError::Upstream(format!("Não foi possível apagar o utilizador: {}", e)));
        }

        info!(user_id = %user.id, "user deleted");
        Ok(user.id)
    }
}
