use crate::auth::BearerToken;
use crate::error::app_error::AppError;
use crate::models::message::MessageResponse;
use crate::service::Services;
use crate::service::account::{ACCOUNT_DELETED_MESSAGE, AccountDeletionService};
use rocket::serde::json::Json;
use rocket::{State, post};
use rocket_okapi::openapi;

/// Permanently delete the calling user's account.
#[openapi(tag = "Account")]
#[post("/")]
pub async fn delete_user(services: &State<Services>, token: BearerToken) -> Result<Json<MessageResponse>, AppError> {
    AccountDeletionService::new(services.identity.as_ref(), services.identity_admin.as_ref())
        .delete_caller_account(&token)
        .await?;

    Ok(Json(MessageResponse::new(ACCOUNT_DELETED_MESSAGE)))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![delete_user]
}
