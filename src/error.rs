use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::flow::SubmitError;
use crate::participants::LookupError;

impl SubmitError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SubmitError::InvalidCode => StatusCode::UNPROCESSABLE_ENTITY,
            SubmitError::InProgress => StatusCode::CONFLICT,
            SubmitError::Lookup(LookupError::NotFound) => StatusCode::NOT_FOUND,
            SubmitError::Lookup(_) => StatusCode::BAD_GATEWAY,
            SubmitError::NotEligible => StatusCode::FORBIDDEN,
            SubmitError::Generation => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SubmitError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}
