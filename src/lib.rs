mod auth;
mod config;
mod database;
mod db;
mod error;
mod identity;
mod middleware;
mod models;
mod routes;
mod service;
pub mod site;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;
pub use models::report::Report;
pub use service::Services;
pub use service::notification::{NotificationOutcome, ProximityNotificationService};

use crate::middleware::RequestLogger;
use crate::routes as app_routes;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket, catchers, http::Method};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};
use rocket_okapi::{get_openapi_route, okapi::merge::marge_spec_list};
use std::time::Duration;
use tracing::error;
use tracing_subscriber::EnvFilter;

const ALLOWED_HEADERS: [&str; 4] = ["authorization", "x-client-info", "apikey", "content-type"];

pub fn init_tracing(log_level: &str, json_format: bool) {
    // RUST_LOG takes precedence over the configured level, e.g.
    //   RUST_LOG=aldeias_seguras::service=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_line_number(true);

    // Ignored when a subscriber is already installed (tests build many rockets).
    let _ = if json_format { subscriber.json().try_init() } else { subscriber.try_init() };
}

fn build_cors(cors_config: &config::CorsConfig) -> Result<CorsOptions, String> {
    let is_wildcard = cors_config.allowed_origins.len() == 1 && cors_config.allowed_origins[0] == "*";

    if is_wildcard && cors_config.allow_credentials {
        return Err("Invalid CORS configuration: wildcard origins (*) cannot be combined with credentials".to_string());
    }

    let allowed_origins = if cors_config.allowed_origins.is_empty() {
        AllowedOrigins::some_exact::<&str>(&[])
    } else if is_wildcard {
        AllowedOrigins::all()
    } else {
        AllowedOrigins::some_exact(&cors_config.allowed_origins.iter().map(String::as_str).collect::<Vec<_>>())
    };

    Ok(CorsOptions {
        allowed_origins,
        allowed_methods: vec![Method::Get, Method::Post, Method::Options].into_iter().map(From::from).collect(),
        allowed_headers: rocket_cors::AllowedHeaders::some(&ALLOWED_HEADERS),
        allow_credentials: cors_config.allow_credentials,
        ..Default::default()
    })
}

fn get_swagger_config(openapi_url: &str) -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: openapi_url.to_string(),
        ..Default::default()
    }
}

fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return config::DEFAULT_API_BASE_PATH.to_string();
    }

    let mut normalized = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };

    while normalized.ends_with('/') && normalized.len() > 1 {
        normalized.pop();
    }

    normalized
}

fn join_base_path(base_path: &str, path: &str) -> String {
    let base = base_path.trim_end_matches('/');
    let suffix = path.trim_start_matches('/');

    if base.is_empty() {
        format!("/{}", suffix)
    } else {
        format!("{}/{}", base, suffix)
    }
}

struct RouteSpec {
    path: &'static str,
    routes: Vec<rocket::Route>,
    openapi: rocket_okapi::okapi::openapi3::OpenApi,
}

fn collect_route_specs() -> Vec<RouteSpec> {
    let (account_routes, account_openapi) = app_routes::account::routes();
    let (notification_routes, notification_openapi) = app_routes::notification::routes();

    vec![
        RouteSpec {
            path: "/delete-user",
            routes: account_routes,
            openapi: account_openapi,
        },
        RouteSpec {
            path: "/notify-nearby-users",
            routes: notification_routes,
            openapi: notification_openapi,
        },
    ]
}

fn mount_function_routes(mut rocket: Rocket<Build>, base_path: &str, enable_swagger: bool) -> Rocket<Build> {
    let route_specs = collect_route_specs();

    if !enable_swagger {
        for spec in route_specs {
            rocket = rocket.mount(join_base_path(base_path, spec.path), spec.routes);
        }
        return rocket;
    }

    let mut openapi_list = Vec::new();
    for spec in route_specs {
        rocket = rocket.mount(join_base_path(base_path, spec.path), spec.routes);
        openapi_list.push((spec.path, spec.openapi));
    }

    match marge_spec_list(&openapi_list) {
        Ok(docs) => {
            let settings = rocket_okapi::settings::OpenApiSettings::default();
            rocket = rocket.mount(base_path, vec![get_openapi_route(docs, &settings)]);

            let openapi_url = join_base_path(base_path, "openapi.json");
            rocket.mount(join_base_path(base_path, "docs"), make_swagger_ui(&get_swagger_config(&openapi_url)))
        }
        Err(err) => {
            error!(error = %err, "could not merge OpenAPI documents; docs disabled");
            rocket
        }
    }
}

fn rocket_figment(server: &config::ServerConfig) -> rocket::figment::Figment {
    rocket::Config::figment()
        .merge(("address", server.address.clone()))
        .merge(("port", server.port))
}

/// Build the real providers once the runtime is up (the pool needs it).
fn stage_services(config: Config) -> AdHoc {
    AdHoc::try_on_ignite("Services", move |rocket| {
        Box::pin(async move {
            match Services::from_config(&config) {
                Ok(services) => Ok(rocket.manage(services)),
                Err(e) => {
                    error!(error = %e, "failed to initialize services");
                    Err(rocket)
                }
            }
        })
    })
}

/// Give accepted alerts a chance to go out before the process exits.
fn drain_notifications(grace: Duration) -> AdHoc {
    AdHoc::on_shutdown("Drain notifications", move |rocket| {
        Box::pin(async move {
            if let Some(services) = rocket.state::<Services>() {
                services.dispatcher.drain(grace).await;
            }
        })
    })
}

fn assemble(config: Config, services: Option<Services>) -> Rocket<Build> {
    init_tracing(&config.logging.level, config.logging.json_format);

    let mut rocket = rocket::custom(rocket_figment(&config.server));

    rocket = match build_cors(&config.cors).and_then(|options| options.to_cors().map_err(|e| e.to_string())) {
        Ok(cors) => rocket.attach(cors),
        Err(e) => {
            error!(error = %e, "invalid CORS configuration");
            rocket.attach(AdHoc::try_on_ignite("CORS", |rocket| Box::pin(async move { Err(rocket) })))
        }
    };

    rocket = rocket
        .attach(RequestLogger)
        .attach(drain_notifications(Duration::from_secs(config.notifications.shutdown_grace_seconds)));

    rocket = match services {
        Some(services) => rocket.manage(services),
        None => rocket.attach(stage_services(config.clone())),
    };

    let base_path = normalize_base_path(&config.api.base_path);
    rocket = mount_function_routes(rocket, &base_path, config.api.enable_swagger);

    rocket
        .mount("/health", app_routes::health::routes())
        .mount("/i18n", app_routes::site::i18n_routes())
        .mount("/site", app_routes::site::routes())
        .register(
            "/",
            catchers![app_routes::error::not_found, app_routes::error::unprocessable, app_routes::error::internal_error],
        )
        .manage(config)
}

/// The server with providers built from `config`.
pub fn build_rocket(config: Config) -> Rocket<Build> {
    assemble(config, None)
}

/// The server with caller-supplied providers.
pub fn build_rocket_with(config: Config, services: Services) -> Rocket<Build> {
    assemble(config, Some(services))
}
