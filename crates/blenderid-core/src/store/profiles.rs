use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::StorageError;

/// Keys that must be present for the document to be considered valid
const ACTIVE_PROFILE_KEY: &str = "active_profile";
const PROFILES_KEY: &str = "profiles";

/// Extension of the sibling file used for atomic replacement
const TEMP_EXTENSION: &str = "json.tmp";

/// A stored credential, keyed by user id in [`ProfileStoreDocument::profiles`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub token: String,
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// The active profile together with the user id it is stored under.
#[derive(Clone, PartialEq, Eq)]
pub struct ActiveProfile {
    pub user_id: String,
    pub username: String,
    pub token: String,
}

impl fmt::Debug for ActiveProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveProfile")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Contents of `profiles.json`.
///
/// "No active profile" is always written as `null`. Older files may hold
/// `""` or `0` instead; both read back as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStoreDocument {
    #[serde(deserialize_with = "deserialize_active_profile")]
    pub active_profile: Option<String>,
    pub profiles: BTreeMap<String, Profile>,
}

impl ProfileStoreDocument {
    /// Active user id, only if it refers to a stored profile
    pub fn active_user_id(&self) -> Option<&str> {
        self.active_profile
            .as_deref()
            .filter(|id| self.profiles.contains_key(*id))
    }
}

fn deserialize_active_profile<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Legacy(u64),
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        None => None,
        Some(RawId::Text(id)) if id.is_empty() => None,
        Some(RawId::Text(id)) => Some(id),
        Some(RawId::Legacy(0)) => None,
        Some(RawId::Legacy(id)) => Some(id.to_string()),
    })
}

/// Why a store file was rejected and reset
#[derive(Error, Debug)]
enum Corruption {
    #[error("invalid JSON: {0}")]
    Syntax(serde_json::Error),

    #[error("missing '{0}' key")]
    MissingKey(&'static str),

    #[error("unexpected structure: {0}")]
    Shape(serde_json::Error),
}

fn parse_document(contents: &[u8]) -> Result<ProfileStoreDocument, Corruption> {
    let value: serde_json::Value = serde_json::from_slice(contents).map_err(Corruption::Syntax)?;

    for key in [ACTIVE_PROFILE_KEY, PROFILES_KEY] {
        if value.get(key).is_none() {
            return Err(Corruption::MissingKey(key));
        }
    }

    serde_json::from_value(value).map_err(Corruption::Shape)
}

/// Handle to the single `profiles.json` file.
///
/// Holds no cached state: concurrent writers are last-writer-wins.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the store, creating or repairing it when needed.
    ///
    /// A missing file is created with the default document. A file that is
    /// not valid JSON, or lacks `active_profile`/`profiles`, is overwritten
    /// with the default document. A dangling `active_profile` reads as `None`.
    pub fn load(&self) -> Result<ProfileStoreDocument, StorageError> {
        let contents = match fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Profile store missing, creating it");
                return self.reset();
            }
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut document = match parse_document(&contents) {
            Ok(document) => document,
            Err(reason) => {
                warn!(
                    path = %self.path.display(),
                    %reason,
                    "profiles.json is either empty or malformed, resetting it"
                );
                return self.reset();
            }
        };

        if document.active_profile.is_some() && document.active_user_id().is_none() {
            debug!(active_profile = ?document.active_profile, "Active profile not in store, ignoring it");
            document.active_profile = None;
        }

        Ok(document)
    }

    /// User id of the active profile, if any
    pub fn get_active_user_id(&self) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.active_profile)
    }

    /// The active profile, or `None` when nothing valid is active
    pub fn get_active_profile(&self) -> Result<Option<ActiveProfile>, StorageError> {
        let mut document = self.load()?;
        let Some(user_id) = document.active_user_id().map(str::to_string) else {
            return Ok(None);
        };

        Ok(document.profiles.remove(&user_id).map(|profile| ActiveProfile {
            user_id,
            username: profile.username,
            token: profile.token,
        }))
    }

    /// Stored profile for `user_id`; `None` for an empty or unknown id
    pub fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StorageError> {
        if user_id.is_empty() {
            return Ok(None);
        }
        Ok(self.load()?.profiles.remove(user_id))
    }

    /// All stored profiles, ordered by user id
    pub fn profiles(&self) -> Result<Vec<(String, Profile)>, StorageError> {
        Ok(self.load()?.profiles.into_iter().collect())
    }

    /// Store (or replace) the profile for `user_id` and mark it active
    pub fn save_as_active(
        &self,
        user_id: &str,
        token: &str,
        username: &str,
    ) -> Result<(), StorageError> {
        let mut document = self.load()?;
        document.profiles.insert(
            user_id.to_string(),
            Profile {
                username: username.to_string(),
                token: token.to_string(),
            },
        );
        document.active_profile = Some(user_id.to_string());

        self.write(&document)?;
        debug!(user_id, "Saved active profile");
        Ok(())
    }

    /// Forget `user_id`, clearing the active pointer if it pointed there.
    ///
    /// The document is rewritten even when nothing changed.
    pub fn logout(&self, user_id: &str) -> Result<(), StorageError> {
        let mut document = self.load()?;

        if document.active_profile.as_deref() == Some(user_id) {
            document.active_profile = None;
        }
        let removed = document.profiles.remove(user_id).is_some();

        self.write(&document)?;
        debug!(user_id, removed, "Removed profile from store");
        Ok(())
    }

    fn reset(&self) -> Result<ProfileStoreDocument, StorageError> {
        let document = ProfileStoreDocument::default();
        self.write(&document)?;
        Ok(document)
    }

    /// Replace the whole file: write a private temp file, sync, rename
    fn write(&self, document: &ProfileStoreDocument) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                create_private_dir(parent).map_err(|source| StorageError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let contents = serde_json::to_string_pretty(document)?;
        let temp_path = self.path.with_extension(TEMP_EXTENSION);

        write_private_file(&temp_path, contents.as_bytes()).map_err(|source| {
            StorageError::Write {
                path: temp_path.clone(),
                source,
            }
        })?;

        fs::rename(&temp_path, &self.path).map_err(|source| {
            let _ = fs::remove_file(&temp_path);
            StorageError::Rename {
                path: self.path.clone(),
                source,
            }
        })
    }
}

fn create_private_dir(dir: &Path) -> io::Result<()> {
    #[cfg(unix)]
    let result = {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
    };

    #[cfg(not(unix))]
    let result = fs::create_dir_all(dir);

    match result {
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        other => other,
    }
}

/// Write `path` as a fresh owner-only file.
///
/// A leftover file at `path` is removed first so its permissions are never
/// inherited; a partially written file is removed on failure.
fn write_private_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    let written = write_and_sync(&mut file, contents);
    if written.is_err() {
        drop(file);
        let _ = fs::remove_file(path);
    }
    written
}

fn write_and_sync(file: &mut fs::File, contents: &[u8]) -> io::Result<()> {
    file.write_all(contents)?;
    file.write_all(b"\n")?;
    file.sync_all()
}

// ============================================================================
// Tests
// ============================================================================
