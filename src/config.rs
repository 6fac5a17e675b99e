use rocket::figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_PATH: &str = "/functions/v1";
pub const DEFAULT_SENDER: &str = "Aldeias Seguras <onboarding@resend.dev>";
pub const DEFAULT_SITE_BASE_URL: &str = "https://rubensousa100.github.io/Aldeias-Seguras-Site";
pub const DEFAULT_NOTIFICATION_RADIUS_METERS: u32 = 10_000;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cors: CorsConfig,
    pub api: ApiConfig,
    pub identity: IdentityConfig,
    pub email: EmailConfig,
    pub notifications: NotificationConfig,
    pub site: SiteConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub address: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub base_path: String,
    pub enable_swagger: bool,
}

/// Identity provider (Supabase GoTrue) endpoint and its two credential tiers.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IdentityConfig {
    pub url: String,
    /// Public key, safe to ship to browsers. Used to verify caller tokens.
    pub anon_key: String,
    /// Privileged key. Never leaves the server.
    pub service_role_key: String,
    pub request_timeout: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    Resend,
    Smtp,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmailConfig {
    pub provider: EmailProvider,
    pub from: String,
    pub resend_api_key: Option<String>,
    pub resend_api_url: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NotificationConfig {
    pub radius_meters: u32,
    pub max_concurrent_sends: usize,
    pub shutdown_grace_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SiteConfig {
    pub base_url: String,
    pub map_page: String,
    pub map_anchor: String,
    pub map_zoom: u8,
    pub i18n_dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/aldeias_seguras".to_string(),
            max_connections: 8,
            min_connections: 0,
            acquire_timeout: 5,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            address: "127.0.0.1".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: false,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_API_BASE_PATH.to_string(),
            enable_swagger: false,
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            service_role_key: String::new(),
            request_timeout: 10,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: EmailProvider::Resend,
            from: DEFAULT_SENDER.to_string(),
            resend_api_key: None,
            resend_api_url: "https://api.resend.com/emails".to_string(),
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            radius_meters: DEFAULT_NOTIFICATION_RADIUS_METERS,
            max_concurrent_sends: 8,
            shutdown_grace_seconds: 20,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SITE_BASE_URL.to_string(),
            map_page: "Incendio.html".to_string(),
            map_anchor: "ffr-map-collab".to_string(),
            map_zoom: 13,
            i18n_dir: "i18n".to_string(),
        }
    }
}

impl NotificationConfig {
    /// The radius is bound as an `int4` by the lookup procedure.
    fn validate(&self) -> Result<(), figment::Error> {
        if i32::try_from(self.radius_meters).is_err() {
            return Err(figment::Error::from(format!(
                "notifications.radius_meters must be at most {} (got {})",
                i32::MAX,
                self.radius_meters
            )));
        }
        Ok(())
    }
}

impl EmailConfig {
    /// An empty sender override behaves as if it were unset.
    pub fn sender(&self) -> &str {
        let from = self.from.trim();
        if from.is_empty() { DEFAULT_SENDER } else { from }
    }
}

impl Config {
    /// Load configuration from multiple sources in priority order:
    /// 1. Aldeias.toml (base configuration file)
    /// 2. Environment variables prefixed with ALDEIAS_, nested with `__`
    ///    (e.g. ALDEIAS_NOTIFICATIONS__RADIUS_METERS)
    /// 3. The platform variables the hosted functions were deployed with
    pub fn load() -> Result<Self, figment::Error> {
        let config: Config = Self::figment().extract()?;
        config.notifications.validate()?;
        Ok(config)
    }

    fn figment() -> Figment {
        let defaults = toml::to_string(&Config::default()).unwrap_or_default();

        Figment::new()
            .merge(Toml::string(&defaults))
            .merge(Toml::file("Aldeias.toml").nested())
            .merge(Env::prefixed("ALDEIAS_").split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "database.url".into()))
            .merge(Env::raw().only(&["SUPABASE_URL"]).map(|_| "identity.url".into()))
            .merge(Env::raw().only(&["SUPABASE_ANON_KEY"]).map(|_| "identity.anon_key".into()))
            .merge(Env::raw().only(&["SUPABASE_SERVICE_ROLE_KEY"]).map(|_| "identity.service_role_key".into()))
            .merge(Env::raw().only(&["RESEND_API_KEY"]).map(|_| "email.resend_api_key".into()))
            .merge(Env::raw().only(&["RESEND_FROM_EMAIL"]).map(|_| "email.from".into()))
            .merge(Env::raw().only(&["SITE_BASE_URL"]).map(|_| "site.base_url".into()))
    }
}
