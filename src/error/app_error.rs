use crate::identity::IdentityError;
use crate::models::report::ValidationError;
use rocket::http::{ContentType, Status};
use rocket::response::Responder;
use rocket::serde::json::serde_json;
use rocket::{Request, Response};
use rocket_okapi::OpenApiError;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::response::OpenApiResponderInner;
use std::io::Cursor;
use thiserror::Error;
use tracing::error;

pub const UNAUTHENTICATED_MESSAGE: &str = "Utilizador não autenticado.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthenticated(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Erro na Base de Dados: {source}")]
    Db {
        message: String,
        #[source]
        source: sqlx::error::Error,
    },
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Configuration(String),
}

impl AppError {
    pub fn db(message: impl Into<String>, source: sqlx::error::Error) -> Self {
        Self::Db {
            message: message.into(),
            source,
        }
    }

    pub fn unauthenticated() -> Self {
        Self::Unauthenticated(UNAUTHENTICATED_MESSAGE.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::db("Database error", e)
    }
}

/// Token rejections become 401s; anything else the provider says is passed through.
impl From<IdentityError> for AppError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::Rejected { message, .. } => AppError::Unauthenticated(message),
            other @ IdentityError::NotConfigured(_) => AppError::Configuration(other.to_string()),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl From<&AppError> for Status {
    fn from(e: &AppError) -> Self {
        match e {
            AppError::Unauthenticated(_) => Status::Unauthorized,
            // Malformed events are reported as server errors, as the database webhook expects.
            AppError::Validation(_) => Status::InternalServerError,
            AppError::Db { .. } => Status::InternalServerError,
            AppError::Upstream(_) => Status::InternalServerError,
            AppError::Configuration(_) => Status::InternalServerError,
        }
    }
}

/// Body of every failed response: `{"error": "..."}`.
pub fn error_body(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &Request<'_>) -> rocket::response::Result<'static> {
        let method = req.method();
        let uri = req.uri();

        let request_id = req
            .local_cache(|| None::<crate::middleware::RequestId>)
            .as_ref()
            .map(|r| r.0.as_str())
            .unwrap_or("unknown");

        error!(
            error = ?self,
            request_id = %request_id,
            method = %method,
            uri = %uri,
            "request failed"
        );

        let status = Status::from(&self);
        let body = error_body(&self.to_string());

        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

impl OpenApiResponderInner for AppError {
    fn responses(_gen: &mut OpenApiGenerator) -> Result<Responses, OpenApiError> {
        use rocket_okapi::okapi::openapi3::{RefOr, Response as OpenApiResponse};
        let mut responses = Responses::default();
        responses.responses.insert(
            "401".to_string(),
            RefOr::Object(OpenApiResponse {
                description: "Unauthorized - missing or rejected bearer token".to_string(),
                ..Default::default()
            }),
        );
        responses.responses.insert(
            "500".to_string(),
            RefOr::Object(OpenApiResponse {
                description: "Invalid event payload or upstream failure".to_string(),
                ..Default::default()
            }),
        );
        Ok(responses)
    }
}
