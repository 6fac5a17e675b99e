use crate::service::Services;
use rocket::serde::json::Json;
use rocket::{State, routes};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub email_configured: bool,
    pub alerts_in_flight: usize,
}

#[rocket::get("/")]
pub async fn healthcheck(services: &State<Services>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        email_configured: services.dispatcher.is_configured(),
        alerts_in_flight: services.dispatcher.in_flight(),
    })
}

pub fn routes() -> Vec<rocket::Route> {
    routes![healthcheck]
}
