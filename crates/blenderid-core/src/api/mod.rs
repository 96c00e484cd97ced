//! HTTP client module for the Blender ID service.
//!
//! This module provides the `AuthClient` seam and its production
//! implementation `HttpAuthClient`, which talks to three routes:
//!
//! - `POST {endpoint}/u/identify`: exchange username/password for a token
//! - `POST {endpoint}/u/validate_token`: check a token is still accepted
//! - `POST {endpoint}/u/delete_token`: revoke a token server-side
//!
//! Expected failures never escape as errors; they come back as
//! `AuthResult::Fail` / `RevokeResult::Fail` carrying a user-facing message.

pub mod client;
pub mod error;

pub use client::{AuthClient, AuthResult, HttpAuthClient, RevokeResult};
pub use error::ApiError;
