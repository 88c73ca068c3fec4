//! Persisted sign-in session with change notifications.
//!
//! The session owns the stored token and user under two fixed keys in one
//! JSON file. Auth state transitions are broadcast over a watch channel so
//! long-lived consumers can react to sign-ins and sign-outs without
//! polling the file.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::debug;

use crate::catalog::types::User;

/// On-disk session file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredSession {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  token: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  user: Option<User>,
}

/// Snapshot of the authentication state, published to subscribers on every
/// sign-in and sign-out.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
  pub user: Option<User>,
  pub authenticated: bool,
}

/// Shared handle to the persisted session.
///
/// Clones share one state: a sign-in through any handle is immediately
/// visible to every other handle and broadcast to subscribers.
#[derive(Clone)]
pub struct Session {
  inner: Arc<SessionInner>,
}

struct SessionInner {
  path: PathBuf,
  stored: Mutex<StoredSession>,
  notify: watch::Sender<AuthState>,
}

impl Session {
  /// Load the session from the default location, signed out if no file
  /// exists yet.
  pub fn load() -> Result<Self> {
    Self::load_from(Self::default_path()?)
  }

  /// Load the session from a specific file path.
  pub fn load_from(path: PathBuf) -> Result<Self> {
    let stored = if path.exists() {
      let contents = std::fs::read_to_string(&path)
        .map_err(|e| eyre!("Failed to read session file {}: {}", path.display(), e))?;
      serde_json::from_str(&contents)
        .map_err(|e| eyre!("Failed to parse session file {}: {}", path.display(), e))?
    } else {
      StoredSession::default()
    };

    let (notify, _) = watch::channel(Self::state_of(&stored));

    Ok(Self {
      inner: Arc::new(SessionInner {
        path,
        stored: Mutex::new(stored),
        notify,
      }),
    })
  }

  /// Get the default session file path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("reel").join("session.json"))
  }

  fn state_of(stored: &StoredSession) -> AuthState {
    AuthState {
      user: stored.user.clone(),
      authenticated: stored.token.is_some(),
    }
  }

  // The stored state is plain data; a poisoned lock still holds a usable
  // value.
  fn lock(&self) -> MutexGuard<'_, StoredSession> {
    self
      .inner
      .stored
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }

  /// The stored API token, if signed in.
  pub fn token(&self) -> Option<String> {
    self.lock().token.clone()
  }

  /// The stored user, if signed in.
  pub fn current_user(&self) -> Option<User> {
    self.lock().user.clone()
  }

  /// Whether a token is stored.
  pub fn is_authenticated(&self) -> bool {
    self.lock().token.is_some()
  }

  /// Subscribe to auth state transitions. The receiver starts at the
  /// current state.
  pub fn subscribe(&self) -> watch::Receiver<AuthState> {
    self.inner.notify.subscribe()
  }

  /// Store a token and user, persist them, and notify subscribers.
  pub fn sign_in(&self, token: String, user: User) -> Result<()> {
    debug!(user = %user.email, "signing in");

    let snapshot = {
      let mut stored = self.lock();
      stored.token = Some(token);
      stored.user = Some(user);
      stored.clone()
    };

    self.persist(&snapshot)?;
    self.inner.notify.send_replace(Self::state_of(&snapshot));

    Ok(())
  }

  /// Clear the stored token and user, persist the cleared state, and
  /// notify subscribers.
  pub fn sign_out(&self) -> Result<()> {
    debug!("signing out");

    let snapshot = {
      let mut stored = self.lock();
      stored.token = None;
      stored.user = None;
      stored.clone()
    };

    self.persist(&snapshot)?;
    self.inner.notify.send_replace(Self::state_of(&snapshot));

    Ok(())
  }

  /// Write the session file atomically via a temp file and rename.
  fn persist(&self, stored: &StoredSession) -> Result<()> {
    let path = &self.inner.path;

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create session directory: {}", e))?;
    }

    let contents = serde_json::to_string_pretty(stored)
      .map_err(|e| eyre!("Failed to serialize session: {}", e))?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, contents)
      .map_err(|e| eyre!("Failed to write session file {}: {}", tmp.display(), e))?;
    std::fs::rename(&tmp, path)
      .map_err(|e| eyre!("Failed to replace session file {}: {}", path.display(), e))?;

    Ok(())
  }
}
