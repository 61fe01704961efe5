use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::code::{checksum_letter, is_valid_code, normalize_code};
use crate::flow::{self, Certificate, SubmitError};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CertificateRequest {
    code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CodeVerdict {
    pub code: String,
    pub valid: bool,
    /// Checksum letter for the digits, when the first five characters are digits.
    pub expected_letter: Option<char>,
}

pub async fn create_certificate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CertificateRequest>,
) -> Result<Response, SubmitError> {
    let code = normalize_code(&request.code);
    let certificate = flow::submit(&state, &code).await?;
    Ok(certificate_download(certificate))
}

pub async fn validate_code(Path(code): Path<String>) -> impl IntoResponse {
    let code = normalize_code(&code);
    let digits: String = code.chars().take(5).collect();
    let expected_letter = (digits.len() == 5 && digits.chars().all(|c| c.is_ascii_digit()))
        .then(|| checksum_letter(&digits));

    Json(CodeVerdict {
        valid: is_valid_code(&code),
        expected_letter,
        code,
    })
}

pub async fn check_status(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    Json(state.submissions.status(&normalize_code(&code)))
}

pub(crate) fn certificate_download(certificate: Certificate) -> Response {
    let disposition = content_disposition(&certificate.file_name());
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        certificate.pdf,
    )
        .into_response()
}

/// Attachment header with an ASCII fallback name and the exact UTF-8 name.
fn content_disposition(file_name: &str) -> HeaderValue {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c == ' ' || c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect();

    let value = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        percent_encode(file_name)
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}
