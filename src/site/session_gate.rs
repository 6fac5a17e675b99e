use serde::Serialize;

pub const LOGIN_PAGE: &str = "login.html";
pub const PROFILE_PAGE: &str = "perfil.html";
pub const HOME_PAGE: &str = "index.html";
pub const DEFAULT_DISPLAY_NAME: &str = "O Meu Perfil";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// Requires a session.
    Protected,
    /// Sign-in, sign-up and password recovery. Pointless with a session.
    AuthEntry,
    Public,
}

impl PageKind {
    /// Classify by the last path segment, as the browser reports it.
    pub fn from_path(path: &str) -> Self {
        let page = path.split(['?', '#']).next().unwrap_or_default();
        match page.rsplit('/').next().unwrap_or_default() {
            "perfil.html" => PageKind::Protected,
            "login.html" | "Registro.html" | "recuperar_senha.html" => PageKind::AuthEntry,
            _ => PageKind::Public,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "target", rename_all = "snake_case")]
pub enum GateDecision {
    Redirect(&'static str),
    Render,
}

pub fn gate(page: PageKind, signed_in: bool) -> GateDecision {
    match (page, signed_in) {
        (PageKind::Protected, false) => GateDecision::Redirect(LOGIN_PAGE),
        (PageKind::AuthEntry, true) => GateDecision::Redirect(PROFILE_PAGE),
        _ => GateDecision::Render,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
    Other,
}

impl AuthEvent {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "INITIAL_SESSION" => AuthEvent::InitialSession,
            "SIGNED_IN" => AuthEvent::SignedIn,
            "SIGNED_OUT" => AuthEvent::SignedOut,
            "TOKEN_REFRESHED" => AuthEvent::TokenRefreshed,
            "USER_UPDATED" => AuthEvent::UserUpdated,
            "PASSWORD_RECOVERY" => AuthEvent::PasswordRecovery,
            _ => AuthEvent::Other,
        }
    }
}

/// Where to go after an auth state change, if anywhere.
pub fn on_auth_event(event: AuthEvent, page: PageKind) -> Option<&'static str> {
    match (event, page) {
        (AuthEvent::SignedOut, PageKind::Protected) => Some(HOME_PAGE),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthLink {
    pub href: &'static str,
    pub text: String,
    pub add_class: &'static str,
    pub remove_class: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogoutButton {
    pub text: &'static str,
    pub href: &'static str,
    pub class: &'static str,
}

/// What the header auth slot shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthView {
    pub link: AuthLink,
    pub logout: Option<LogoutButton>,
}

impl AuthView {
    pub fn signed_in(display_name: Option<&str>) -> Self {
        let text = display_name.map(str::trim).filter(|name| !name.is_empty()).unwrap_or(DEFAULT_DISPLAY_NAME);

        AuthView {
            link: AuthLink {
                href: PROFILE_PAGE,
                text: text.to_string(),
                add_class: "profile-link",
                remove_class: "login-btn",
            },
            logout: Some(LogoutButton {
                text: "Sair",
                href: "#",
                class: "login-btn logout-btn-main",
            }),
        }
    }

    pub fn signed_out() -> Self {
        AuthView {
            link: AuthLink {
                href: LOGIN_PAGE,
                text: "Login / Registar".to_string(),
                add_class: "login-btn",
                remove_class: "profile-link",
            },
            logout: None,
        }
    }
}
