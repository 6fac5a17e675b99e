use super::{IdentityAdmin, IdentityError, IdentityProvider};
use crate::auth::AuthUser;
use crate::config::IdentityConfig;
use reqwest::{Client, Response, StatusCode};
use rocket::serde::Deserialize;
use rocket::serde::json::serde_json::Value;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Thin REST client for the identity provider's auth API, bound to one key.
#[derive(Clone)]
struct AuthApi {
    http: Client,
    base_url: String,
    api_key: String,
}

impl AuthApi {
    fn new(config: &IdentityConfig, api_key: &str) -> Result<Self, IdentityError> {
        let http = Client::builder().timeout(Duration::from_secs(config.request_timeout.max(1))).build()?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn ensure_configured(&self) -> Result<(), IdentityError> {
        if self.base_url.is_empty() {
            return Err(IdentityError::NotConfigured("identity.url"));
        }
        if self.api_key.is_empty() {
            return Err(IdentityError::NotConfigured("identity key"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: Option<Uuid>,
    email: Option<String>,
}

/// Client holding the public key. Used to check who is calling.
#[derive(Clone)]
pub struct PublicAuthClient {
    api: AuthApi,
}

impl PublicAuthClient {
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        Ok(Self {
            api: AuthApi::new(config, &config.anon_key)?,
        })
    }
}

/// Client holding the service-role key. Never handed a caller's token.
#[derive(Clone)]
pub struct AdminAuthClient {
    api: AuthApi,
}

impl AdminAuthClient {
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        Ok(Self {
            api: AuthApi::new(config, &config.service_role_key)?,
        })
    }
}

#[async_trait::async_trait]
impl IdentityProvider for PublicAuthClient {
    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>, IdentityError> {
        self.api.ensure_configured()?;

        let response = self
            .api
            .http
            .get(self.api.endpoint("user"))
            .header("apikey", &self.api.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            debug!(status = status.as_u16(), message = %message, "identity provider refused token");
            return Err(if status.is_client_error() {
                IdentityError::Rejected {
                    status: status.as_u16(),
                    message,
                }
            } else {
                IdentityError::Upstream {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let payload: UserPayload = response.json().await?;
        Ok(payload.id.map(|id| AuthUser { id, email: payload.email }))
    }
}

#[async_trait::async_trait]
impl IdentityAdmin for AdminAuthClient {
    async fn delete_user(&self, user_id: &Uuid) -> Result<(), IdentityError> {
        self.api.ensure_configured()?;

        let response = self
            .api
            .http
            .delete(self.api.endpoint(&format!("admin/users/{}", user_id)))
            .header("apikey", &self.api.api_key)
            .bearer_auth(&self.api.api_key)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        Err(IdentityError::Upstream {
            status: status.as_u16(),
            message: error_message(response).await,
        })
    }
}

/// The auth API is not consistent about where it puts the human-readable message.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    message_from_body(status, &body)
}

fn message_from_body(status: StatusCode, body: &str) -> String {
    let parsed = rocket::serde::json::serde_json::from_str::<Value>(body).ok();
    let from_json = parsed.as_ref().and_then(|value| {
        ["msg", "message", "error_description", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .map(str::to_string)
    });

    match from_json {
        Some(message) => message,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => status.canonical_reason().unwrap_or("Unknown error").to_string(),
    }
}
