use crate::error::app_error::AppError;
use crate::service::email::{EmailSender, OutgoingEmail};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub const MISSING_EMAIL_KEY_MESSAGE: &str = "A chave da API do Resend não está configurada.";

/// Background delivery of fire alerts.
///
/// Each accepted batch runs on a detached supervisor task; at most `max_concurrent`
/// sends are in flight across all batches. Delivery is best-effort: failures are
/// logged per recipient and never reported back to the caller, and nothing is retried.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: Option<Arc<dyn EmailSender>>,
    permits: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl NotificationDispatcher {
    pub fn new(sender: Option<Arc<dyn EmailSender>>, max_concurrent: usize) -> Self {
        Self {
            sender,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            in_flight: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.sender.is_some()
    }

    /// Emails accepted but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Queue one email per recipient and return immediately with the number accepted.
    pub fn dispatch(&self, report_id: &str, emails: Vec<OutgoingEmail>) -> Result<usize, AppError> {
        let sender = self
            .sender
            .clone()
            .ok_or_else(|| AppError::Configuration(MISSING_EMAIL_KEY_MESSAGE.to_string()))?;

        let accepted = emails.len();
        if accepted == 0 {
            return Ok(0);
        }

        self.in_flight.fetch_add(accepted, Ordering::SeqCst);

        let permits = Arc::clone(&self.permits);
        let in_flight = Arc::clone(&self.in_flight);
        let idle = Arc::clone(&self.idle);
        let report_id = report_id.to_string();

        tokio::spawn(async move {
            let mut deliveries = JoinSet::new();
            let mut unsent = accepted;

            for email in emails {
                let permit = match Arc::clone(&permits).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!(report_id = %report_id, "dispatcher closed, dropping remaining alerts");
                        break;
                    }
                };
                unsent -= 1;

                let slot = InFlightSlot {
                    in_flight: Arc::clone(&in_flight),
                    idle: Arc::clone(&idle),
                };
                let sender = Arc::clone(&sender);
                let report_id = report_id.clone();
                deliveries.spawn(async move {
                    let _slot = slot;
                    let _permit = permit;
                    match sender.send(&email).await {
                        Ok(()) => debug!(report_id = %report_id, recipient = %email.to, "fire alert delivered"),
                        Err(e) => error!(report_id = %report_id, recipient = %email.to, error = %e, "failed to deliver fire alert"),
                    }
                });
            }

            if unsent > 0 {
                release(&in_flight, &idle, unsent);
            }

            while let Some(result) = deliveries.join_next().await {
                if let Err(e) = result {
                    error!(report_id = %report_id, error = %e, "fire alert task aborted");
                }
            }

            info!(report_id = %report_id, emails = accepted, "notification batch finished");
        });

        Ok(accepted)
    }

    /// Resolve once every accepted email has finished (successfully or not).
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Wait for in-flight work, giving up after `grace`. Returns whether the set drained.
    pub async fn drain(&self, grace: Duration) -> bool {
        let pending = self.in_flight();
        if pending == 0 {
            return true;
        }

        info!(pending, grace_seconds = grace.as_secs(), "waiting for fire alerts to finish");
        match tokio::time::timeout(grace, self.wait_idle()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(pending = self.in_flight(), "shutting down with fire alerts still in flight");
                false
            }
        }
    }
}

fn release(in_flight: &AtomicUsize, idle: &Notify, count: usize) {
    if in_flight.fetch_sub(count, Ordering::SeqCst) == count {
        idle.notify_waiters();
    }
}

/// One accepted email; released when its delivery task ends, however it ends.
struct InFlightSlot {
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        release(&self.in_flight, &self.idle, 1);
    }
}
