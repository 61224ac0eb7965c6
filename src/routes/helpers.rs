use actix_web::http::StatusCode;
use actix_web::ResponseError;

use crate::verification::ProtocolError;

/// Web form data for a subscription or unsubscription request
#[derive(serde::Deserialize)]
pub struct FormData {
    pub email: String,
}

/// Web form data for a confirmation
#[derive(serde::Deserialize)]
pub struct ConfirmFormData {
    pub email: String,
    pub code: String,
}

impl ResponseError for ProtocolError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::AlreadyExists => StatusCode::CONFLICT,
            Self::NotRegistered => StatusCode::NOT_FOUND,
            Self::InvalidOrExpired => StatusCode::UNAUTHORIZED,
            Self::ApplyError(_) | Self::IoError(_) | Self::UnexpectedError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
