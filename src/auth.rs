use crate::error::app_error::AppError;
use crate::identity::IdentityProvider;
use rocket::request::{FromRequest, Outcome, Request};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{Object, SecurityRequirement, SecurityScheme, SecuritySchemeData};
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use serde::Serialize;
use uuid::Uuid;

/// Account identity as verified by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// The caller's `Authorization: Bearer` credential, if any.
///
/// The guard never fails: handlers decide how a missing token is reported so the
/// response keeps the function's JSON error envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct BearerToken(pub Option<String>);

pub(crate) fn parse_bearer(header: &str) -> Option<String> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() { None } else { Some(token.to_string()) }
}

impl BearerToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Exchange the credential for a verified identity. Missing tokens and tokens the
    /// provider does not recognise are both unauthenticated.
    pub async fn authenticate(&self, provider: &dyn IdentityProvider) -> Result<AuthUser, AppError> {
        let token = self.as_deref().ok_or_else(AppError::unauthenticated)?;
        provider.get_user(token).await?.ok_or_else(AppError::unauthenticated)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BearerToken {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = req.headers().get_one("Authorization").and_then(parse_bearer);
        Outcome::Success(BearerToken(token))
    }
}

impl<'a> OpenApiFromRequest<'a> for BearerToken {
    fn from_request_input(_gen: &mut OpenApiGenerator, _name: String, _required: bool) -> rocket_okapi::Result<RequestHeaderInput> {
        let security_scheme = SecurityScheme {
            description: Some("Access token issued by the identity provider after sign-in.".to_string()),
            data: SecuritySchemeData::Http {
                scheme: "bearer".to_string(),
                bearer_format: Some("JWT".to_string()),
            },
            extensions: Object::default(),
        };

        let mut security_req = SecurityRequirement::new();
        security_req.insert("bearerAuth".to_string(), Vec::new());

        Ok(RequestHeaderInput::Security("bearerAuth".to_string(), security_scheme, security_req))
    }
}
