pub mod account;
pub mod dispatch;
pub mod email;
pub mod notification;

use crate::config::Config;
use crate::database::postgres_repository::PostgresRepository;
use crate::database::profile::ProfileDirectory;
use crate::database::proximity::ProximityDirectory;
use crate::db::init_pool;
use crate::error::app_error::AppError;
use crate::identity::{AdminAuthClient, IdentityAdmin, IdentityProvider, PublicAuthClient};
use crate::service::dispatch::NotificationDispatcher;
use crate::service::email::{EmailService, build_sender};
use crate::site::i18n::{DictionarySource, FileDictionarySource};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared handles every handler builds its per-request services from.
#[derive(Clone)]
pub struct Services {
    pub identity: Arc<dyn IdentityProvider>,
    pub identity_admin: Arc<dyn IdentityAdmin>,
    pub proximity: Arc<dyn ProximityDirectory>,
    pub profiles: Arc<dyn ProfileDirectory>,
    pub dictionaries: Arc<dyn DictionarySource>,
    pub composer: Arc<EmailService>,
    pub dispatcher: NotificationDispatcher,
}

impl Services {
    /// Wire the real providers. Must run inside the Tokio runtime.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let pool = init_pool(&config.database).map_err(|e| AppError::Configuration(format!("Invalid database configuration: {}", e)))?;
        let repository = Arc::new(PostgresRepository { pool });

        let identity = PublicAuthClient::new(&config.identity).map_err(|e| AppError::Configuration(e.to_string()))?;
        let identity_admin = AdminAuthClient::new(&config.identity).map_err(|e| AppError::Configuration(e.to_string()))?;

        let sender = build_sender(&config.email).map_err(|e| AppError::Configuration(e.to_string()))?;
        if sender.is_none() {
            warn!("no email API key configured; reports with nearby users will fail");
        }

        info!(
            provider = ?config.email.provider,
            radius_meters = config.notifications.radius_meters,
            max_concurrent_sends = config.notifications.max_concurrent_sends,
            "services initialized"
        );

        Ok(Self {
            identity: Arc::new(identity),
            identity_admin: Arc::new(identity_admin),
            proximity: repository.clone(),
            profiles: repository,
            dictionaries: Arc::new(FileDictionarySource::new(&config.site.i18n_dir)),
            composer: Arc::new(EmailService::new(config.email.sender(), config.site.clone())),
            dispatcher: NotificationDispatcher::new(sender, config.notifications.max_concurrent_sends),
        })
    }
}
