use actix_web::http::StatusCode;

/// Envelope for every successful response. `data` is omitted when a handler
/// has nothing to return beyond the status itself.
#[derive(serde::Serialize)]
pub struct SuccessBody<T: serde::Serialize> {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: serde::Serialize> SuccessBody<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        Self {
            status: status.as_u16(),
            message: "success".into(),
            data: Some(data),
        }
    }

    pub fn ok(data: T) -> Self {
        Self::new(StatusCode::OK, data)
    }
}

impl SuccessBody<()> {
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status: status.as_u16(),
            message: "success".into(),
            data: None,
        }
    }
}
