use crate::config::Config;
use crate::error::app_error::AppError;
use crate::error::json::EventBody;
use crate::models::message::MessageResponse;
use crate::models::report::Report;
use crate::service::Services;
use crate::service::notification::{NotificationOutcome, ProximityNotificationService};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, post};
use rocket_okapi::openapi;

/// Database webhook fired for every new fire report. Emails every profile within the
/// configured radius; delivery continues in the background after the response.
#[openapi(tag = "Notifications")]
#[post("/", data = "<event>")]
pub async fn notify_nearby_users(services: &State<Services>, config: &State<Config>, event: EventBody) -> Result<(Status, Json<MessageResponse>), AppError> {
    let event = event.into_inner()?;
    let report = Report::from_event(&event)?;

    let service = ProximityNotificationService::new(
        services.proximity.as_ref(),
        services.composer.as_ref(),
        &services.dispatcher,
        config.notifications.radius_meters,
    );

    let outcome = service.notify(&report).await?;
    let status = match outcome {
        NotificationOutcome::NoTargets => Status::Ok,
        NotificationOutcome::Dispatched(_) => Status::Accepted,
    };

    Ok((status, Json(MessageResponse::new(outcome.message()))))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![notify_nearby_users]
}
