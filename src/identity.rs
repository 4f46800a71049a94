//! Active identity: a generated session id or a connected wallet address.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::wallet::{is_address, WalletError, WalletProvider};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access identity store at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Identity store at {path} is corrupt: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredIdentity {
    session_id: Option<String>,
}

/// Single-key persistent store holding the active identity string.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `identity.json` inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("identity.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<String>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        let stored: StoredIdentity =
            serde_json::from_str(&content).map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?;
        Ok(stored.session_id.filter(|id| !id.trim().is_empty()))
    }

    pub fn save(&self, identity: &str) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let stored = StoredIdentity {
            session_id: Some(identity.to_string()),
        };
        let content = serde_json::to_string_pretty(&stored).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, content).map_err(io_err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Session(String),
    Wallet(String),
}

impl Identity {
    pub fn token(&self) -> &str {
        match self {
            Identity::Session(id) | Identity::Wallet(id) => id,
        }
    }

    pub fn is_wallet(&self) -> bool {
        matches!(self, Identity::Wallet(_))
    }

    fn from_stored(value: String) -> Self {
        if is_address(&value) {
            Identity::Wallet(value)
        } else {
            Identity::Session(value)
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Wallet(address) => write!(f, "wallet {}", address),
            Identity::Session(id) => write!(f, "session {}", id),
        }
    }
}

/// Generate a random session identifier
pub fn generate_session_id() -> String {
    format!("session-{}", Uuid::new_v4().simple())
}

/// Owns the active identity and keeps the store in sync with it.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    store: IdentityStore,
    current: Identity,
}

impl IdentityResolver {
    /// Restore the stored identity, or generate and persist a new session id.
    /// An unreadable store file is replaced with a fresh session id.
    pub fn load(store: IdentityStore) -> Result<Self, StoreError> {
        let stored = match store.load() {
            Ok(stored) => stored,
            Err(e @ StoreError::Parse { .. }) => {
                warn!("{}; starting a new session", e);
                None
            }
            Err(e) => return Err(e),
        };
        let current = match stored {
            Some(value) => Identity::from_stored(value),
            None => {
                let id = generate_session_id();
                store.save(&id)?;
                info!("Generated new session identity");
                Identity::Session(id)
            }
        };
        Ok(Self { store, current })
    }

    pub fn current(&self) -> &Identity {
        &self.current
    }

    pub fn token(&self) -> &str {
        self.current.token()
    }

    /// Authorize through `provider` and switch to the first returned account.
    /// On failure the identity is left unchanged.
    pub async fn connect(&mut self, provider: &dyn WalletProvider) -> Result<&Identity, ConnectError> {
        let accounts = provider.request_accounts().await?;
        self.apply_accounts(accounts)?;
        Ok(&self.current)
    }

    /// Switch to the first of `accounts`, as returned by a wallet provider
    pub fn apply_accounts(&mut self, accounts: Vec<String>) -> Result<&Identity, ConnectError> {
        let address = accounts
            .into_iter()
            .find(|a| !a.trim().is_empty())
            .ok_or(WalletError::NoAccounts)?;
        self.store.save(&address)?;
        info!(wallet = %crate::wallet::abbreviate(&address), "Wallet connected");
        self.current = Identity::Wallet(address);
        Ok(&self.current)
    }

    /// Drop the wallet identity and start a fresh session
    pub fn disconnect(&mut self) -> Result<&Identity, StoreError> {
        let previous = self.current.token().to_string();
        let mut id = generate_session_id();
        while id == previous {
            id = generate_session_id();
        }
        self.store.save(&id)?;
        info!("Disconnected; new session identity generated");
        self.current = Identity::Session(id);
        Ok(&self.current)
    }
}
