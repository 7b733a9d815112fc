use actix_web::http::StatusCode;
use actix_web::HttpResponse;

/// Body of every error response: `{"status": 409, "message": "duplicated nickname"}`.
#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
}

/// Renders an error as the shared JSON error envelope.
pub fn error_response(status: StatusCode, message: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::build(status).json(ErrorBody {
        status: status.as_u16(),
        message: message.to_string(),
    })
}

pub fn e500<T>(e: T) -> actix_web::Error
where
    T: std::fmt::Debug + std::fmt::Display + 'static,
{
    actix_web::error::ErrorInternalServerError(e)
}

/// Iterates over a chain of errors via the `source` method and prints the error with its cause
pub fn error_chain_fmt(
    error: &impl std::error::Error,
    formatter: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(formatter, "{}\n", error)?;
    let mut current = error.source();
    while let Some(cause) = current {
        writeln!(formatter, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
