//! Core library for the Blender ID client.
//!
//! This crate provides:
//! - `store`: the on-disk profile store (`profiles.json`) with self-repair
//! - `api`: the HTTP client for the Blender ID identify/validate/revoke calls
//! - `auth`: the session controller tying the two together
//! - `config`: endpoint, store path and transport settings

pub mod api;
pub mod auth;
pub mod config;
pub mod store;

pub use api::{AuthClient, AuthResult, HttpAuthClient, RevokeResult};
pub use auth::{ActiveSession, Outcome, SessionController};
pub use config::Config;
pub use store::{ActiveProfile, Profile, ProfileStore, ProfileStoreDocument, StorageError};
