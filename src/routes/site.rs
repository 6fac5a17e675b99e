use crate::auth::{AuthUser, BearerToken};
use crate::error::app_error::AppError;
use crate::identity::IdentityError;
use crate::service::Services;
use crate::site::i18n::{DictionaryResolver, ResolvedDictionary};
use crate::site::session_gate::{AuthView, GateDecision, PageKind, gate};
use rocket::serde::json::Json;
use rocket::{State, get, routes};
use serde::Serialize;
use tracing::{debug, error};

#[derive(Debug, Serialize)]
pub struct AuthViewResponse {
    pub page: PageKind,
    pub decision: GateDecision,
    pub view: Option<AuthView>,
}

/// Published dictionary for `lang`, or the bundled fallback.
#[get("/<lang>")]
pub async fn get_dictionary(services: &State<Services>, lang: &str) -> Json<ResolvedDictionary> {
    let lang = lang.strip_suffix(".json").unwrap_or(lang);
    Json(DictionaryResolver::new(services.dictionaries.as_ref()).resolve(lang).await)
}

/// Gate decision and header auth slot for the page the browser is on.
#[get("/auth-view?<page>")]
pub async fn get_auth_view(services: &State<Services>, token: BearerToken, page: Option<&str>) -> Result<Json<AuthViewResponse>, AppError> {
    let page = PageKind::from_path(page.unwrap_or_default());
    let session = current_session(services, &token).await?;

    let decision = gate(page, session.is_some());
    let view = match (&decision, session) {
        (GateDecision::Redirect(_), _) => None,
        (GateDecision::Render, Some(user)) => Some(AuthView::signed_in(display_name(services, &user).await.as_deref())),
        (GateDecision::Render, None) => Some(AuthView::signed_out()),
    };

    Ok(Json(AuthViewResponse { page, decision, view }))
}

/// A missing or rejected token is simply "signed out".
async fn current_session(services: &Services, token: &BearerToken) -> Result<Option<AuthUser>, AppError> {
    let Some(access_token) = token.as_deref() else {
        return Ok(None);
    };

    match services.identity.get_user(access_token).await {
        Ok(user) => Ok(user),
        Err(IdentityError::Rejected { status, .. }) => {
            debug!(status, "session token rejected");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Profile lookup failures fall back to the default label.
async fn display_name(services: &Services, user: &AuthUser) -> Option<String> {
    match services.profiles.get_profile(&user.id).await {
        Ok(profile) => profile.and_then(|p| p.full_name),
        Err(e) => {
            error!(user_id = %user.id, error = %e, "failed to load profile");
            None
        }
    }
}

pub fn i18n_routes() -> Vec<rocket::Route> {
    routes![get_dictionary]
}

pub fn routes() -> Vec<rocket::Route> {
    routes![get_auth_view]
}

#[cfg(test)]
mod tests {
    use crate::Config;
    use crate::test_utils::{MockIdentity, MockProfiles, MockServices};
    use rocket::http::{Header, Status};
    use rocket::serde::json::serde_json::{self, Value, json};
    use std::sync::Arc;
    use uuid::Uuid;

    async fn get_json(client: &rocket::local::asynchronous::Client, uri: &str, token: Option<&str>) -> (Status, Value) {
        let mut request = client.get(uri);
        if let Some(token) = token {
            request = request.header(Header::new("Authorization", format!("Bearer {token}")));
        }
        let response = request.dispatch().await;
        let status = response.status();
        let body = response.into_string().await.unwrap_or_default();
        (status, serde_json::from_str(&body).unwrap_or(Value::Null))
    }

    #[rocket::async_test]
    async fn dictionary_is_served_from_published_files() {
        let mut config = Config::default();
        config.site.i18n_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/i18n").to_string();
        let client = MockServices::default().client(config).await;

        let (status, body) = get_json(&client, "/i18n/en", None).await;
        assert_eq!(status, Status::Ok);
        assert_eq!(body["lang"], "en");
        assert_eq!(body["fallback"], false);
        assert_eq!(body["dictionary"]["nav.home"], "Home");
    }

    #[rocket::async_test]
    async fn unknown_language_gets_bundled_portuguese() {
        let mut config = Config::default();
        config.site.i18n_dir = "/nonexistent".to_string();
        let client = MockServices::default().client(config).await;

        let (status, body) = get_json(&client, "/i18n/fr.json", None).await;
        assert_eq!(status, Status::Ok);
        assert_eq!(body["lang"], "pt");
        assert_eq!(body["fallback"], true);
        assert_eq!(body["dictionary"]["nav.home"], "Início");
    }

    #[rocket::async_test]
    async fn protected_page_without_session_redirects_to_login() {
        let client = MockServices::default().client(Config::default()).await;

        let (status, body) = get_json(&client, "/site/auth-view?page=/site/perfil.html", None).await;
        assert_eq!(status, Status::Ok);
        assert_eq!(body["decision"], json!({"action": "redirect", "target": "login.html"}));
        assert_eq!(body["view"], Value::Null);
    }

    #[rocket::async_test]
    async fn login_page_with_session_redirects_to_profile() {
        let mocks = MockServices {
            identity: Arc::new(MockIdentity::default().with_user("tok", Uuid::new_v4(), "ana@example.pt")),
            ..MockServices::default()
        };
        let client = mocks.client(Config::default()).await;

        let (_, body) = get_json(&client, "/site/auth-view?page=login.html", Some("tok")).await;
        assert_eq!(body["decision"], json!({"action": "redirect", "target": "perfil.html"}));
    }

    #[rocket::async_test]
    async fn signed_in_view_shows_profile_name() {
        let user_id = Uuid::new_v4();
        let mocks = MockServices {
            identity: Arc::new(MockIdentity::default().with_user("tok", user_id, "ana@example.pt")),
            profiles: Arc::new(MockProfiles::default().with_name(user_id, "Ana Silva")),
            ..MockServices::default()
        };
        let client = mocks.client(Config::default()).await;

        let (_, body) = get_json(&client, "/site/auth-view?page=/index.html", Some("tok")).await;
        assert_eq!(body["decision"], json!({"action": "render"}));
        assert_eq!(body["view"]["link"]["text"], "Ana Silva");
        assert_eq!(body["view"]["link"]["href"], "perfil.html");
        assert_eq!(body["view"]["logout"]["text"], "Sair");
    }

    #[rocket::async_test]
    async fn profile_failure_uses_default_name() {
        let user_id = Uuid::new_v4();
        let mocks = MockServices {
            identity: Arc::new(MockIdentity::default().with_user("tok", user_id, "ana@example.pt")),
            profiles: Arc::new(MockProfiles::failing()),
            ..MockServices::default()
        };
        let client = mocks.client(Config::default()).await;

        let (status, body) = get_json(&client, "/site/auth-view?page=perfil.html", Some("tok")).await;
        assert_eq!(status, Status::Ok);
        assert_eq!(body["view"]["link"]["text"], "O Meu Perfil");
    }

    #[rocket::async_test]
    async fn unknown_token_is_signed_out() {
        let client = MockServices::default().client(Config::default()).await;

        let (_, body) = get_json(&client, "/site/auth-view?page=index.html", Some("stale")).await;
        assert_eq!(body["view"]["link"]["text"], "Login / Registar");
        assert_eq!(body["view"]["logout"], Value::Null);
    }

    #[rocket::async_test]
    async fn rejected_token_is_signed_out() {
        let mocks = MockServices {
            identity: Arc::new(MockIdentity::rejecting(401, "invalid JWT")),
            ..MockServices::default()
        };
        let client = mocks.client(Config::default()).await;

        let (status, body) = get_json(&client, "/site/auth-view?page=index.html", Some("expired")).await;
        assert_eq!(status, Status::Ok);
        assert_eq!(body["decision"], json!({"action": "render"}));
        assert_eq!(body["view"]["link"]["text"], "Login / Registar");

        let (_, body) = get_json(&client, "/site/auth-view?page=perfil.html", Some("expired")).await;
        assert_eq!(body["decision"], json!({"action": "redirect", "target": "login.html"}));
    }

    #[rocket::async_test]
    async fn identity_outage_is_a_server_error() {
        let mocks = MockServices {
            identity: Arc::new(MockIdentity::unreachable()),
            ..MockServices::default()
        };
        let client = mocks.client(Config::default()).await;

        let (status, body) = get_json(&client, "/site/auth-view?page=index.html", Some("tok")).await;
        assert_eq!(status, Status::InternalServerError);
        assert_eq!(body, json!({"error": "Service Unavailable"}));
    }
}
