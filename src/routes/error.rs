use crate::error::app_error::error_body;
use rocket::http::ContentType;
use rocket::{Request, catch};

#[catch(404)]
pub fn not_found(_: &Request) -> (ContentType, String) {
    (ContentType::JSON, error_body("Not found"))
}

#[catch(422)]
pub fn unprocessable(_: &Request) -> (ContentType, String) {
    (ContentType::JSON, error_body("Unprocessable request"))
}

#[catch(500)]
pub fn internal_error(_: &Request) -> (ContentType, String) {
    (ContentType::JSON, error_body("Internal server error"))
}
