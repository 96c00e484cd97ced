//! Session management for the Blender ID client.
//!
//! This module provides:
//! - `SessionController`: login / logout / validate over an `AuthClient`
//!   and the `ProfileStore`
//! - `ActiveSession`: the in-memory handle of the logged-in identity
//! - `scrub_password`: in-place overwrite of password buffers after use
//!
//! The store is the durable copy of the session; the controller keeps the
//! in-memory handle in step with it on every transition.

pub mod credentials;
pub mod session;

pub use credentials::scrub_password;
pub use session::{ActiveSession, Outcome, SessionController};
