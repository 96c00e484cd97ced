//! Local profile store.
//!
//! This module provides the `ProfileStore`, which owns the `profiles.json`
//! document holding every known profile and which one is active.
//!
//! Every call re-reads the file; every mutation rewrites the whole document
//! through a temp file and rename. A missing or malformed file is replaced
//! with the default document instead of failing.

pub mod error;
pub mod profiles;

pub use error::StorageError;
pub use profiles::{ActiveProfile, Profile, ProfileStore, ProfileStoreDocument};
