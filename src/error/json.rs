use crate::models::report::{ReportEvent, ValidationError};
use rocket::data::{ByteUnit, Data, FromData, Outcome};
use rocket::http::Status;
use rocket::request::Request;
use rocket::serde::json::{Json, serde_json};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::RequestBody;
use rocket_okapi::request::OpenApiFromData;
use tracing::warn;

/// A JSON body whose parse failure is kept as a value instead of rejecting the request.
///
/// Rocket's built-in `Json` answers unparsable bodies with a 422 before the handler runs.
/// Event handlers need to answer with their own error envelope, so this guard logs the
/// failure (field, line, column, a preview of the body) and hands the outcome to the handler.
#[derive(Debug)]
pub struct EventBody(pub Result<serde_json::Value, ValidationError>);

impl EventBody {
    pub fn into_inner(self) -> Result<serde_json::Value, ValidationError> {
        self.0
    }
}

#[rocket::async_trait]
impl<'r> FromData<'r> for EventBody {
    type Error = std::io::Error;

    async fn from_data(req: &'r Request<'_>, data: Data<'r>) -> Outcome<'r, Self> {
        let limit = req.limits().get("json").unwrap_or(ByteUnit::Mebibyte(1));

        let bytes = match data.open(limit).into_bytes().await {
            Ok(bytes) if bytes.is_complete() => bytes.into_inner(),
            Ok(_) => {
                warn!(
                    method = %req.method(),
                    uri = %req.uri(),
                    "JSON payload exceeded size limit"
                );
                return Outcome::Error((Status::PayloadTooLarge, std::io::Error::other("payload too large")));
            }
            Err(e) => {
                warn!(
                    method = %req.method(),
                    uri = %req.uri(),
                    error = %e,
                    "Failed to read request body"
                );
                return Outcome::Error((Status::BadRequest, e));
            }
        };

        match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(value) => Outcome::Success(EventBody(Ok(value))),
            Err(e) => {
                let body_preview = String::from_utf8_lossy(&bytes);
                let body_preview: String = if body_preview.chars().count() > 500 {
                    format!("{}...", body_preview.chars().take(500).collect::<String>())
                } else {
                    body_preview.to_string()
                };

                warn!(
                    method = %req.method(),
                    uri = %req.uri(),
                    error_message = %e,
                    error_line = e.line(),
                    error_column = e.column(),
                    error_category = ?e.classify(),
                    request_body = %body_preview,
                    "Failed to parse JSON request body"
                );

                Outcome::Success(EventBody(Err(ValidationError::Malformed(e.to_string()))))
            }
        }
    }
}

impl<'r> OpenApiFromData<'r> for EventBody {
    fn request_body(generator: &mut OpenApiGenerator) -> rocket_okapi::Result<RequestBody> {
        Json::<ReportEvent>::request_body(generator)
    }
}
