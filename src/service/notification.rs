use crate::database::proximity::ProximityDirectory;
use crate::error::app_error::AppError;
use crate::models::report::Report;
use crate::service::dispatch::NotificationDispatcher;
use crate::service::email::EmailService;
use tracing::info;

pub const NO_TARGETS_MESSAGE: &str = "Nenhum utilizador para notificar.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Nobody lives within the radius. Nothing was sent.
    NoTargets,
    /// This many alerts were handed to the dispatcher.
    Dispatched(usize),
}

impl NotificationOutcome {
    pub fn message(&self) -> String {
        match self {
            NotificationOutcome::NoTargets => NO_TARGETS_MESSAGE.to_string(),
            NotificationOutcome::Dispatched(count) => format!("Processo de notificação iniciado para {} utilizadores.", count),
        }
    }
}

/// Turns a validated fire report into alerts for every profile near it.
pub struct ProximityNotificationService<'a> {
    directory: &'a dyn ProximityDirectory,
    composer: &'a EmailService,
    dispatcher: &'a NotificationDispatcher,
    radius_meters: u32,
}

impl<'a> ProximityNotificationService<'a> {
    pub fn new(directory: &'a dyn ProximityDirectory, composer: &'a EmailService, dispatcher: &'a NotificationDispatcher, radius_meters: u32) -> Self {
        Self {
            directory,
            composer,
            dispatcher,
            radius_meters,
        }
    }

    pub async fn notify(&self, report: &Report) -> Result<NotificationOutcome, AppError> {
        info!(
            report_id = %report.display_id(),
            lat = report.lat,
            lng = report.lng,
            radius_meters = self.radius_meters,
            "processing fire report"
        );

        let targets = self.directory.users_in_radius(report.lat, report.lng, self.radius_meters).await?;

        if targets.is_empty() {
            info!(report_id = %report.display_id(), "no users within notification radius");
            return Ok(NotificationOutcome::NoTargets);
        }

        info!(report_id = %report.display_id(), targets = targets.len(), "users found within notification radius");

        // The provider is only required once there is someone to notify.
        if !self.dispatcher.is_configured() {
            return Err(AppError::Configuration(crate::service::dispatch::MISSING_EMAIL_KEY_MESSAGE.to_string()));
        }

        let emails = targets.iter().map(|target| self.composer.fire_alert(target, report)).collect();
        let accepted = self.dispatcher.dispatch(report.display_id(), emails)?;

        Ok(NotificationOutcome::Dispatched(accepted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_SENDER, SiteConfig};
    use crate::service::dispatch::MISSING_EMAIL_KEY_MESSAGE;
    use crate::test_utils::{MockDirectory, RecordingSender};
    use std::sync::Arc;

    fn report() -> Report {
        Report {
            id: Some("abc".to_string()),
            lat: 40.1,
            lng: -8.4,
            created_at: None,
        }
    }

    fn composer() -> EmailService {
        EmailService::new(DEFAULT_SENDER, SiteConfig::default())
    }

    #[tokio::test]
    async fn no_matches_means_no_sends_even_without_provider() {
        let directory = MockDirectory::default();
        let composer = composer();
        let dispatcher = NotificationDispatcher::new(None, 4);

        let outcome = ProximityNotificationService::new(&directory, &composer, &dispatcher, 10_000)
            .notify(&report())
            .await
            .unwrap();

        assert_eq!(outcome, NotificationOutcome::NoTargets);
        assert_eq!(outcome.message(), "Nenhum utilizador para notificar.");
        assert_eq!(directory.calls(), vec![(40.1, -8.4, 10_000)]);
    }

    #[tokio::test]
    async fn matches_without_provider_is_a_configuration_error() {
        let directory = MockDirectory::with_targets(&[("a@x.com", Some("Ana"))]);
        let composer = composer();
        let dispatcher = NotificationDispatcher::new(None, 4);

        let err = ProximityNotificationService::new(&directory, &composer, &dispatcher, 10_000)
            .notify(&report())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Configuration(ref m) if m == MISSING_EMAIL_KEY_MESSAGE));
    }

    #[tokio::test]
    async fn every_match_gets_exactly_one_alert() {
        let directory = MockDirectory::with_targets(&[("a@x.com", Some("Ana")), ("b@x.com", None)]);
        let composer = composer();
        let sender = Arc::new(RecordingSender::default());
        let dispatcher = NotificationDispatcher::new(Some(sender.clone()), 4);

        let outcome = ProximityNotificationService::new(&directory, &composer, &dispatcher, 10_000)
            .notify(&report())
            .await
            .unwrap();

        assert_eq!(outcome, NotificationOutcome::Dispatched(2));
        assert_eq!(outcome.message(), "Processo de notificação iniciado para 2 utilizadores.");

        dispatcher.wait_idle().await;
        let sent = sender.sent();
        assert_eq!(sent.len(), 2);
        let to_b = sent.iter().find(|e| e.to == "b@x.com").unwrap();
        assert!(to_b.html.contains("Olá utilizador,"));
        assert!(to_b.html.contains("Latitude 40.1000, Longitude -8.4000"));
    }

    #[tokio::test]
    async fn configured_radius_is_used() {
        let directory = MockDirectory::default();
        let composer = composer();
        let dispatcher = NotificationDispatcher::new(None, 4);

        ProximityNotificationService::new(&directory, &composer, &dispatcher, 2_500)
            .notify(&report())
            .await
            .unwrap();

        assert_eq!(directory.calls(), vec![(40.1, -8.4, 2_500)]);
    }

    #[tokio::test]
    async fn lookup_failures_propagate() {
        let directory = MockDirectory::failing();
        let composer = composer();
        let dispatcher = NotificationDispatcher::new(None, 4);

        let err = ProximityNotificationService::new(&directory, &composer, &dispatcher, 10_000)
            .notify(&report())
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Erro na Base de Dados: "));
    }
}
