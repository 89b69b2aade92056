//! Client session persistence for `plantctl`.
//!
//! A [`Session`] is the explicit login state: the bearer token and who it
//! belongs to.  [`SessionStore`] keeps it in a small JSON file between
//! invocations.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AuthResponse, UserProfile};

/// Environment variable overriding the session file location.
pub const SESSION_PATH_ENV: &str = "PLANTCTL_SESSION";

/// Errors reading or writing the session file.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("could not access session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Login state carried between `plantctl` runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

impl Session {
    /// The session a successful register or login establishes.
    pub fn from_auth(response: AuthResponse) -> Self {
        Session {
            token: Some(response.token),
            expires_at: Some(response.expires_at),
            user: Some(response.user),
        }
    }

    /// The token, unless absent or past its expiry at `now`.
    pub fn active_token(&self, now: DateTime<Utc>) -> Option<&str> {
        match self.expires_at {
            Some(expiry) if expiry <= now => None,
            _ => self.token.as_deref(),
        }
    }
}

/// A session file on disk.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SessionStore { path: path.into() }
    }

    /// `$PLANTCTL_SESSION`, else `$HOME/.plantctl/session.json`, else
    /// `.plantctl-session.json` in the working directory.
    pub fn default_location() -> Self {
        if let Some(path) = std::env::var_os(SESSION_PATH_ENV).filter(|p| !p.is_empty()) {
            return Self::new(path);
        }
        match std::env::var_os("HOME").filter(|h| !h.is_empty()) {
            Some(home) => Self::new(Path::new(&home).join(".plantctl").join("session.json")),
            None => Self::new(".plantctl-session.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the session; a missing file is an empty session.
    pub fn load(&self) -> Result<Session, SessionError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Session::default()),
            Err(source) => {
                return Err(SessionError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes the session, creating the parent directory if needed.
    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        let io = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io)?;
        }
        let json = serde_json::to_vec_pretty(session).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(io)
    }

    /// Deletes the session file.  Already being logged out is fine.
    pub fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::process;
    use std::time::{SystemTime, UNIX_EPOCH};

    use crate::UserId;

    fn scratch_store(suffix: &str) -> SessionStore {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        SessionStore::new(std::env::temp_dir().join(format!(
            "plantctl_session_{}_{}_{}/session.json",
            process::id(),
            timestamp,
            suffix
        )))
    }

    fn sample_session(expires_at: DateTime<Utc>) -> Session {
        Session {
            token: Some("abc.def.ghi".to_string()),
            expires_at: Some(expires_at),
            user: Some(UserProfile {
                id: UserId::generate(),
                name: "Ash".to_string(),
                email: "ash@example.com".to_string(),
                age: None,
                affiliation: None,
            }),
        }
    }

    #[test]
    fn missing_file_is_logged_out() {
        let store = scratch_store("missing");
        assert_eq!(store.load().unwrap(), Session::default());
        store.clear().unwrap();
    }

    #[test]
    fn save_load_clear() {
        let store = scratch_store("cycle");
        let session = sample_session(Utc::now() + Duration::days(1));
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), session);
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), Session::default());
        if let Some(parent) = store.path().parent() {
            fs::remove_dir(parent).ok();
        }
    }

    #[test]
    fn corrupt_file_is_reported() {
        let store = scratch_store("corrupt");
        if let Some(parent) = store.path().parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(store.path(), b"{not json").unwrap();
        assert!(matches!(store.load(), Err(SessionError::Corrupt { .. })));
        store.clear().unwrap();
        if let Some(parent) = store.path().parent() {
            fs::remove_dir(parent).ok();
        }
    }

    #[test]
    fn expired_tokens_are_inactive() {
        let now = Utc::now();
        assert_eq!(
            sample_session(now + Duration::hours(1)).active_token(now),
            Some("abc.def.ghi")
        );
        assert_eq!(sample_session(now - Duration::hours(1)).active_token(now), None);
        assert_eq!(Session::default().active_token(now), None);
    }
}
