use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// PortalError
///
/// Every failure the portal can observe while talking to the remote backend or to the
/// local session store. None of these are fatal: the listing controller converts them
/// into an error string on its view, and the shell handlers convert them into responses.
#[derive(Error, Debug)]
pub enum PortalError {
    /// The request never produced an HTTP response (DNS, refused connection, reset).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The request exceeded the configured timeout.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The backend rejected the stored credential (missing, stale or expired).
    #[error("not authorized: {0}")]
    Unauthorized(String),

    /// Any other non-2xx response, carrying the best message found in the body.
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// A 2xx response whose body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// A shell request carried unusable input and was never forwarded.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// The durable key-value store could not be read or written.
    #[error("session storage failure: {0}")]
    Storage(String),
}

impl PortalError {
    /// Transport failures, timeouts and server-side (5xx) errors are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            PortalError::Transport(_) | PortalError::Timeout(_) => true,
            PortalError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The text shown to the user in place of the list.
    pub fn user_message(&self) -> String {
        match self {
            PortalError::Transport(_) => "تعذر الاتصال بالخادم، حاول مرة أخرى".to_string(),
            PortalError::Timeout(_) => "انتهت مهلة الطلب، حاول مرة أخرى".to_string(),
            PortalError::Unauthorized(_) => "انتهت صلاحية الجلسة، يرجى تسجيل الدخول".to_string(),
            PortalError::Status { message, .. } => message.clone(),
            PortalError::Decode(_) => "حدث خطأ أثناء تحميل البيانات".to_string(),
            PortalError::Invalid(message) => message.clone(),
            PortalError::Storage(_) => "تعذر حفظ بيانات الجلسة".to_string(),
        }
    }

    /// Raised by the shell when the gate does not offer an action to this session.
    pub fn not_offered() -> Self {
        PortalError::Status {
            status: 403,
            message: "هذا الإجراء غير متاح لحسابك".to_string(),
        }
    }

    /// Builds a status error from a response body, preferring the backend's own message.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                ["message", "title", "error"].iter().find_map(|key| {
                    value
                        .get(*key)
                        .and_then(|v| v.as_str())
                        .filter(|s| !s.trim().is_empty())
                        .map(str::to_string)
                })
            })
            .unwrap_or_else(|| format!("unknown error (HTTP {})", status));

        match status {
            401 => PortalError::Unauthorized(message),
            _ => PortalError::Status { status, message },
        }
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PortalError::Decode(err.to_string())
        } else {
            PortalError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        PortalError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for PortalError {
    fn from(err: std::io::Error) -> Self {
        PortalError::Storage(err.to_string())
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = match &self {
            PortalError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            PortalError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            PortalError::Status { status: 403, .. } => StatusCode::FORBIDDEN,
            PortalError::Status { status: 404, .. } => StatusCode::NOT_FOUND,
            PortalError::Invalid(_) => StatusCode::BAD_REQUEST,
            PortalError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        };

        tracing::warn!(error = %self, status = status.as_u16(), "request failed");

        let body = Json(json!({
            "message": self.user_message(),
            "retryable": self.is_retryable(),
        }));
        (status, body).into_response()
    }
}
