//! Blocking client for the Blender ID HTTP API.
//!
//! Every call is a single form POST. Transport failures, non-200 statuses
//! and unreadable payloads are folded into the returned result so callers
//! only ever branch on success or failure.

use std::fmt;

use reqwest::blocking::Client;
use reqwest::{header, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

const IDENTIFY_ROUTE: &str = "u/identify";
const VALIDATE_ROUTE: &str = "u/validate_token";
const DELETE_TOKEN_ROUTE: &str = "u/delete_token";

const UNKNOWN_USERNAME_MESSAGE: &str = "Username does not exist";
const WRONG_PASSWORD_MESSAGE: &str = "Password does not match!";
const LOGIN_REJECTED_MESSAGE: &str = "Login was rejected by the server";
const TOKEN_INVALID_MESSAGE: &str = "Authentication token invalid";
const REVOKE_REJECTED_MESSAGE: &str = "The server refused to revoke the token";

// ============================================================================
// Result types
// ============================================================================

/// Outcome of exchanging username/password for a token.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthResult {
    Success { user_id: String, token: String },
    Fail { error_message: String },
}

impl AuthResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AuthResult::Success { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            AuthResult::Success { .. } => None,
            AuthResult::Fail { error_message } => Some(error_message),
        }
    }

    fn fail(error_message: impl Into<String>) -> Self {
        AuthResult::Fail {
            error_message: error_message.into(),
        }
    }
}

impl fmt::Debug for AuthResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthResult::Success { user_id, .. } => f
                .debug_struct("Success")
                .field("user_id", user_id)
                .field("token", &"<redacted>")
                .finish(),
            AuthResult::Fail { error_message } => f
                .debug_struct("Fail")
                .field("error_message", error_message)
                .finish(),
        }
    }
}

/// Outcome of asking the server to forget a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevokeResult {
    Success,
    Fail { error_message: String },
}

impl RevokeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, RevokeResult::Success)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            RevokeResult::Success => None,
            RevokeResult::Fail { error_message } => Some(error_message),
        }
    }
}

/// The three remote operations the session layer needs.
pub trait AuthClient {
    /// Exchange credentials for a user id and bearer token
    fn authenticate(&self, username: &str, password: &str) -> AuthResult;

    /// `None` when the token is still accepted, otherwise the reason it is not
    fn validate(&self, token: &str) -> Option<String>;

    /// Invalidate `token` server-side
    fn revoke(&self, user_id: &str, token: &str) -> RevokeResult;
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum ReplyStatus {
    Success,
    Fail,
}

#[derive(Debug, Deserialize)]
struct ServiceReply {
    status: ReplyStatus,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Identity {
    user_id: UserId,
    oauth_token: OAuthToken,
}

/// The service has sent user ids both as numbers and as strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UserId {
    Text(String),
    Number(i64),
}

impl UserId {
    fn into_string(self) -> String {
        match self {
            UserId::Text(id) => id,
            UserId::Number(id) => id.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct OAuthToken {
    access_token: String,
}

impl fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OAuthToken(<redacted>)")
    }
}

fn parse_reply(body: &str) -> Result<ServiceReply, ApiError> {
    serde_json::from_str(body).map_err(ApiError::invalid_response)
}

/// Map the field the service flagged on a failed identify to a message
fn rejection_message(data: &serde_json::Value) -> &'static str {
    if data.get("username").is_some() {
        UNKNOWN_USERNAME_MESSAGE
    } else if data.get("password").is_some() {
        WRONG_PASSWORD_MESSAGE
    } else {
        LOGIN_REJECTED_MESSAGE
    }
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// API client for the Blender ID service.
/// Clone is cheap - the reqwest client shares its connection pool.
#[derive(Clone)]
pub struct HttpAuthClient {
    client: Client,
    endpoint: String,
    host_label: String,
}

impl HttpAuthClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            host_label: config.host_label.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST a form and return the body of a 200 response
    fn post_form(&self, route: &str, form: &[(&str, &str)]) -> Result<String, ApiError> {
        let url = format!("{}/{}", self.endpoint, route);
        debug!(url = %url, "Sending request");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .form(form)
            .send()?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "Response received");
        if status != StatusCode::OK {
            return Err(ApiError::Status(status.as_u16()));
        }

        Ok(response.text()?)
    }

    fn try_authenticate(&self, username: &str, password: &str) -> Result<AuthResult, ApiError> {
        let body = self.post_form(
            IDENTIFY_ROUTE,
            &[
                ("username", username),
                ("password", password),
                ("host_label", self.host_label.as_str()),
            ],
        )?;
        let reply = parse_reply(&body)?;

        if reply.status == ReplyStatus::Fail {
            return Ok(AuthResult::fail(rejection_message(&reply.data)));
        }

        let identity: Identity =
            serde_json::from_value(reply.data).map_err(ApiError::invalid_response)?;
        let user_id = identity.user_id.into_string();
        let token = identity.oauth_token.access_token;

        if user_id.is_empty() || token.is_empty() {
            return Err(ApiError::invalid_response("empty user id or token"));
        }

        Ok(AuthResult::Success { user_id, token })
    }

    fn try_revoke(&self, user_id: &str, token: &str) -> Result<ServiceReply, ApiError> {
        let body = self.post_form(DELETE_TOKEN_ROUTE, &[("user_id", user_id), ("token", token)])?;
        parse_reply(&body)
    }
}

impl AuthClient for HttpAuthClient {
    fn authenticate(&self, username: &str, password: &str) -> AuthResult {
        match self.try_authenticate(username, password) {
            Ok(result) => {
                if let AuthResult::Success { ref user_id, .. } = result {
                    debug!(user_id = %user_id, "Authenticated");
                }
                result
            }
            Err(e) => {
                warn!(error = %e, "Authentication request failed");
                AuthResult::fail(e.to_string())
            }
        }
    }

    fn validate(&self, token: &str) -> Option<String> {
        match self.post_form(VALIDATE_ROUTE, &[("token", token)]) {
            Ok(body) => match parse_reply(&body) {
                Ok(reply) if reply.status == ReplyStatus::Success => None,
                Ok(_) => Some(TOKEN_INVALID_MESSAGE.to_string()),
                Err(e) => {
                    warn!(error = %e, "Token validation returned an unreadable reply");
                    Some(e.to_string())
                }
            },
            Err(e) if e.is_client_status() => Some(TOKEN_INVALID_MESSAGE.to_string()),
            Err(e) => {
                warn!(error = %e, "Token validation request failed");
                Some(e.to_string())
            }
        }
    }

    fn revoke(&self, user_id: &str, token: &str) -> RevokeResult {
        match self.try_revoke(user_id, token) {
            Ok(reply) if reply.status == ReplyStatus::Success => RevokeResult::Success,
            Ok(_) => RevokeResult::Fail {
                error_message: REVOKE_REJECTED_MESSAGE.to_string(),
            },
            Err(e) => {
                warn!(error = %e, user_id, "Token revocation failed");
                RevokeResult::Fail {
                    error_message: e.to_string(),
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
