use crate::config::{EmailConfig, EmailProvider, SiteConfig};
use crate::models::notification::NotificationTarget;
use crate::models::report::Report;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use reqwest::Client;
use rocket::serde::json::serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const FIRE_ALERT_SUBJECT: &str = "🔥 Alerta de Incêndio na Sua Área";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("Network error while contacting the email provider: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// A fully composed message, ready for any provider.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Delivery backend. One call per recipient.
#[async_trait::async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError>;
}

/// Build the configured sender. `None` when the HTTP provider has no API key, which
/// the notification flow reports only once there is someone to notify.
pub fn build_sender(config: &EmailConfig) -> Result<Option<Arc<dyn EmailSender>>, EmailError> {
    match config.provider {
        EmailProvider::Resend => match config.resend_api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(Some(Arc::new(ResendSender::new(&config.resend_api_url, key)?))),
            _ => Ok(None),
        },
        EmailProvider::Smtp => Ok(Some(Arc::new(SmtpSender::new(config)?))),
    }
}

/// Composes fire-alert emails for one sender address and one public site.
pub struct EmailService {
    from: String,
    site: SiteConfig,
}

impl EmailService {
    pub fn new(from: impl Into<String>, site: SiteConfig) -> Self {
        Self { from: from.into(), site }
    }

    /// Deep link to the collaborative map, centred on the report.
    pub fn map_url(&self, report: &Report) -> String {
        format!(
            "{}/{}?lat={}&lng={}&zoom={}#{}",
            self.site.base_url.trim_end_matches('/'),
            self.site.map_page.trim_start_matches('/'),
            report.lat,
            report.lng,
            self.site.map_zoom,
            self.site.map_anchor
        )
    }

    pub fn fire_alert(&self, target: &NotificationTarget, report: &Report) -> OutgoingEmail {
        let map_url = self.map_url(report);
        let name = target.greeting_name();

        OutgoingEmail {
            from: self.from.clone(),
            to: target.email.clone(),
            subject: FIRE_ALERT_SUBJECT.to_string(),
            html: self.generate_fire_alert_html(name, report, &map_url),
            text: self.generate_fire_alert_text(name, report, &map_url),
        }
    }

    fn generate_fire_alert_html(&self, name: &str, report: &Report, map_url: &str) -> String {
        format!(
            r#"
<h1>🔥 Alerta de Incêndio Próximo</h1>
<p>Olá {},</p>
<p>Foi registado um novo alerta de incêndio perto da sua localização guardada.</p>
<p><strong>Localização do Alerta:</strong> Latitude {:.4}, Longitude {:.4}</p>
<p>Por favor, mantenha-se atento aos canais oficiais da Proteção Civil e tome as devidas precauções.</p>
<p>Para mais detalhes, visite o nosso mapa colaborativo:</p>
<a href="{}">Ver Mapa de Alertas</a>
<hr>
<p><small>Recebeu este e-mail porque a sua localização está na área de notificação. Pode gerir as suas preferências no seu perfil.</small></p>
"#,
            escape_html(name),
            report.lat,
            report.lng,
            map_url
        )
    }

    fn generate_fire_alert_text(&self, name: &str, report: &Report, map_url: &str) -> String {
        format!(
            r#"Alerta de Incêndio Próximo

Olá {},

Foi registado um novo alerta de incêndio perto da sua localização guardada.

Localização do Alerta: Latitude {:.4}, Longitude {:.4}

Por favor, mantenha-se atento aos canais oficiais da Proteção Civil e tome as devidas precauções.

Ver Mapa de Alertas: {}

Recebeu este e-mail porque a sua localização está na área de notificação. Pode gerir as suas preferências no seu perfil.
"#,
            name, report.lat, report.lng, map_url
        )
    }
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Resend HTTP API.
pub struct ResendSender {
    http: Client,
    api_url: String,
    api_key: String,
}

impl ResendSender {
    pub fn new(api_url: &str, api_key: &str) -> Result<Self, EmailError> {
        let http = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            http,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl EmailSender for ResendSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": email.from,
                "to": [email.to],
                "subject": email.subject,
                "html": email.html,
                "text": email.text,
            }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(EmailError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// SMTP relay through lettre.
pub struct SmtpSender {
    mailer: SmtpTransport,
}

impl SmtpSender {
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        let mailer = SmtpTransport::relay(&config.smtp_host)
            .map_err(|e| EmailError::Smtp(format!("Failed to create SMTP transport: {}", e)))?
            .credentials(creds)
            .port(config.smtp_port)
            .build();

        Ok(Self { mailer })
    }

    fn build_message(email: &OutgoingEmail) -> Result<Message, EmailError> {
        Message::builder()
            .from(
                email
                    .from
                    .parse()
                    .map_err(|e| EmailError::InvalidAddress(format!("from {}: {}", email.from, e)))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|e| EmailError::InvalidAddress(format!("to {}: {}", email.to, e)))?)
            .subject(email.subject.clone())
            .multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text.clone()),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html.clone()),
                    ),
            )
            .map_err(|e| EmailError::Smtp(format!("Failed to build email: {}", e)))
    }
}

#[async_trait::async_trait]
impl EmailSender for SmtpSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let message = Self::build_message(email)?;
        let mailer = self.mailer.clone();

        // The SMTP transport blocks.
        let result = tokio::task::spawn_blocking(move || mailer.send(&message))
            .await
            .map_err(|e| EmailError::Smtp(format!("Failed to spawn email sending task: {}", e)))?;

        result.map(|_| ()).map_err(|e| EmailError::Smtp(format!("Failed to send email: {}", e)))
    }
}
