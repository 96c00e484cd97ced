use std::error::Error as _;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("There was a problem setting up a connection to the server: {}", describe_transport(.0))]
    Transport(#[from] reqwest::Error),

    #[error("There was a problem communicating with the server. Error code is: {0}")]
    Status(u16),

    #[error("Unexpected response from server: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    pub fn invalid_response(reason: impl ToString) -> Self {
        ApiError::InvalidResponse(reason.to_string())
    }

    /// HTTP 4xx: the server understood the request and refused it
    pub fn is_client_status(&self) -> bool {
        matches!(self, ApiError::Status(code) if (400..500).contains(code))
    }
}

/// reqwest's own message omits the cause; append the innermost one
fn describe_transport(error: &reqwest::Error) -> String {
    let kind = if error.is_timeout() {
        "request timed out"
    } else if error.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };

    let mut cause = None;
    let mut next = error.source();
    while let Some(source) = next {
        cause = Some(source);
        next = source.source();
    }

    match cause {
        Some(cause) => format!("{} ({})", kind, cause),
        None => kind.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_includes_code() {
        let error = ApiError::Status(503);
        assert_eq!(
            error.to_string(),
            "There was a problem communicating with the server. Error code is: 503"
        );
    }

    #[test]
    fn test_is_client_status() {
        assert!(ApiError::Status(401).is_client_status());
        assert!(ApiError::Status(404).is_client_status());
        assert!(!ApiError::Status(500).is_client_status());
        assert!(!ApiError::invalid_response("nope").is_client_status());
    }
}
