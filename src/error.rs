//! Request-facing error taxonomy.
//!
//! Every handler returns `Result<_, Error>`; the `IntoResponse` impl below turns
//! the variant into a status code and a `{"ok": false, "error": ...}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A required setting (bot token, Drive API key) is missing
    #[error("server is not configured: {0}")]
    Config(String),

    /// Login widget data failed verification. The reason is only logged.
    #[error("telegram login verification failed")]
    Auth(String),

    /// The Bot API or Drive API call failed, timed out or returned non-success
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// `getFile` returned no path for a file reference
    #[error("could not resolve file reference: {0}")]
    Resolution(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wraps a reqwest failure without its URL, which carries the bot token.
    pub fn upstream(context: &str, err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            Error::Upstream(format!("{}: timed out", context))
        } else {
            Error::Upstream(format!("{}: {}", context, err))
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::Upstream(_) | Error::Resolution(_) => StatusCode::BAD_GATEWAY,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "ok": false, "error": self.to_string() }));
        (status, body).into_response()
    }
}
