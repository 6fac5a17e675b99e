use crate::auth::AuthUser;
use crate::config::{Config, NotificationConfig};
use crate::database::profile::ProfileDirectory;
use crate::database::proximity::ProximityDirectory;
use crate::error::app_error::AppError;
use crate::identity::{IdentityAdmin, IdentityError, IdentityProvider};
use crate::models::notification::NotificationTarget;
use crate::models::profile::Profile;
use crate::service::Services;
use crate::service::dispatch::NotificationDispatcher;
use crate::service::email::{EmailError, EmailSender, EmailService, OutgoingEmail};
use crate::site::i18n::FileDictionarySource;
use rocket::local::asynchronous::Client;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::Notify;
use uuid::Uuid;

/// Identity provider that knows a fixed set of tokens. Unknown tokens resolve to no user.
#[derive(Default)]
pub struct MockIdentity {
    users: HashMap<String, AuthUser>,
    failure: Option<IdentityFailure>,
    lookups: AtomicUsize,
}

#[derive(Clone)]
enum IdentityFailure {
    Rejected { status: u16, message: String },
    Unreachable,
}

impl MockIdentity {
    pub fn with_user(mut self, token: &str, id: Uuid, email: &str) -> Self {
        self.users.insert(
            token.to_string(),
            AuthUser {
                id,
                email: Some(email.to_string()),
            },
        );
        self
    }

    /// Every lookup is refused by the provider with `status` and `message`.
    pub fn rejecting(status: u16, message: &str) -> Self {
        Self {
            failure: Some(IdentityFailure::Rejected {
                status,
                message: message.to_string(),
            }),
            ..Self::default()
        }
    }

    /// Every lookup fails on the provider's side.
    pub fn unreachable() -> Self {
        Self {
            failure: Some(IdentityFailure::Unreachable),
            ..Self::default()
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for MockIdentity {
    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>, IdentityError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        match self.failure.clone() {
            Some(IdentityFailure::Rejected { status, message }) => Err(IdentityError::Rejected { status, message }),
            Some(IdentityFailure::Unreachable) => Err(IdentityError::Upstream {
                status: 503,
                message: "Service Unavailable".to_string(),
            }),
            None => Ok(self.users.get(access_token).cloned()),
        }
    }
}

/// Records every deletion; optionally fails them all. An account can only be deleted once.
#[derive(Default)]
pub struct MockAdmin {
    deleted: Mutex<Vec<Uuid>>,
    failure: Option<String>,
}

impl MockAdmin {
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn deleted(&self) -> Vec<Uuid> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IdentityAdmin for MockAdmin {
    async fn delete_user(&self, user_id: &Uuid) -> Result<(), IdentityError> {
        if let Some(message) = &self.failure {
            return Err(IdentityError::Upstream {
                status: 500,
                message: message.clone(),
            });
        }
        let mut deleted = self.deleted.lock().unwrap();
        if deleted.contains(user_id) {
            return Err(IdentityError::Upstream {
                status: 404,
                message: "User not found".to_string(),
            });
        }
        deleted.push(*user_id);
        Ok(())
    }
}

/// Returns the same targets for every point and remembers what it was asked.
#[derive(Default)]
pub struct MockDirectory {
    targets: Vec<NotificationTarget>,
    fail: bool,
    calls: Mutex<Vec<(f64, f64, u32)>>,
}

impl MockDirectory {
    pub fn with_targets(targets: &[(&str, Option<&str>)]) -> Self {
        Self {
            targets: targets
                .iter()
                .map(|(email, name)| NotificationTarget {
                    id: Uuid::new_v4(),
                    email: email.to_string(),
                    full_name: name.map(str::to_string),
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(f64, f64, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ProximityDirectory for MockDirectory {
    async fn users_in_radius(&self, lat: f64, lng: f64, radius_meters: u32) -> Result<Vec<NotificationTarget>, AppError> {
        self.calls.lock().unwrap().push((lat, lng, radius_meters));
        if self.fail {
            return Err(AppError::db("Failed to look up users in radius", sqlx::Error::PoolTimedOut));
        }
        Ok(self.targets.clone())
    }
}

#[derive(Default)]
pub struct MockProfiles {
    names: HashMap<Uuid, String>,
    fail: bool,
}

impl MockProfiles {
    pub fn with_name(mut self, id: Uuid, full_name: &str) -> Self {
        self.names.insert(id, full_name.to_string());
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl ProfileDirectory for MockProfiles {
    async fn get_profile(&self, user_id: &Uuid) -> Result<Option<Profile>, AppError> {
        if self.fail {
            return Err(AppError::db("Failed to load profile", sqlx::Error::PoolTimedOut));
        }
        Ok(self.names.get(user_id).map(|name| Profile {
            id: *user_id,
            full_name: Some(name.clone()),
        }))
    }
}

/// Captures every send; addresses in `fail_for` are rejected by the "provider".
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<OutgoingEmail>>,
    attempts: AtomicUsize,
    fail_for: Option<String>,
}

impl RecordingSender {
    pub fn failing_for(address: &str) -> Self {
        Self {
            fail_for: Some(address.to_string()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent().into_iter().map(|email| email.to).collect()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EmailSender for RecordingSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_for.as_deref() == Some(email.to.as_str()) {
            return Err(EmailError::Rejected {
                status: 422,
                body: "invalid recipient".to_string(),
            });
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Holds every send (or only the one to `held`) until `release` is called.
#[derive(Default)]
pub struct GatedSender {
    held: Option<String>,
    released: AtomicBool,
    gate: Notify,
    progress: Notify,
    started: AtomicUsize,
    completed: AtomicUsize,
    current: AtomicUsize,
    max_concurrent: AtomicUsize,
}

impl GatedSender {
    pub fn holding_only(recipient: &str) -> Self {
        Self {
            held: Some(recipient.to_string()),
            ..Self::default()
        }
    }

    pub fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
        self.gate.notify_waiters();
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }

    pub async fn wait_for_started(&self, count: usize) {
        loop {
            let notified = self.progress.notified();
            if self.started() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait::async_trait]
impl EmailSender for GatedSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(current, Ordering::SeqCst);
        self.started.fetch_add(1, Ordering::SeqCst);
        self.progress.notify_waiters();

        let held = self.held.as_deref().is_none_or(|recipient| recipient == email.to);
        if held {
            loop {
                let opened = self.gate.notified();
                if self.released.load(Ordering::SeqCst) {
                    break;
                }
                opened.await;
            }
        }

        self.current.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Mock-backed `Services`. Keep the struct around to inspect the mocks after requests.
#[derive(Default)]
pub struct MockServices {
    pub identity: Arc<MockIdentity>,
    pub admin: Arc<MockAdmin>,
    pub directory: Arc<MockDirectory>,
    pub profiles: Arc<MockProfiles>,
    pub sender: Option<Arc<dyn EmailSender>>,
    pub dispatcher: OnceLock<NotificationDispatcher>,
}

impl MockServices {
    /// The dispatcher the server will use, created on first call.
    pub fn dispatcher(&self) -> NotificationDispatcher {
        self.dispatcher
            .get_or_init(|| NotificationDispatcher::new(self.sender.clone(), NotificationConfig::default().max_concurrent_sends))
            .clone()
    }

    pub fn build(&self, config: &Config) -> Services {
        Services {
            identity: self.identity.clone(),
            identity_admin: self.admin.clone(),
            proximity: self.directory.clone(),
            profiles: self.profiles.clone(),
            dictionaries: Arc::new(FileDictionarySource::new(&config.site.i18n_dir)),
            composer: Arc::new(EmailService::new(config.email.sender(), config.site.clone())),
            dispatcher: self.dispatcher(),
        }
    }

    pub async fn client(&self, config: Config) -> Client {
        let services = self.build(&config);
        Client::tracked(crate::build_rocket_with(config, services))
            .await
            .expect("valid rocket instance")
    }
}
