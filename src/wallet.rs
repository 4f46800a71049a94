use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// EIP-1193 code for a user-rejected request
const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("No wallet provider is configured")]
    Unavailable,

    #[error("Wallet connection was rejected: {0}")]
    Rejected(String),

    #[error("Wallet returned no accounts")]
    NoAccounts,

    #[error("Wallet request failed: {0}")]
    Transport(String),
}

/// External capability that can authorize accounts for this client.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Vec<String>>,
    error: Option<RpcError>,
}

/// Wallet reached over JSON-RPC (`eth_requestAccounts`).
#[derive(Clone)]
pub struct JsonRpcWallet {
    rpc_url: Option<String>,
    client: reqwest::Client,
}

impl JsonRpcWallet {
    pub fn new(rpc_url: Option<String>) -> Self {
        Self {
            rpc_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl WalletProvider for JsonRpcWallet {
    #[instrument(skip(self))]
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        let url = self.rpc_url.as_deref().ok_or(WalletError::Unavailable)?;

        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_requestAccounts",
            "params": []
        });

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WalletError::Transport(format!(
                "wallet RPC returned {}",
                response.status()
            )));
        }

        let body = response
            .json::<RpcResponse>()
            .await
            .map_err(|e| WalletError::Transport(e.to_string()))?;

        if let Some(error) = body.error {
            debug!(code = error.code, "Wallet RPC error");
            return Err(if error.code == USER_REJECTED_CODE {
                WalletError::Rejected(error.message)
            } else {
                WalletError::Transport(error.message)
            });
        }

        let accounts = body.result.unwrap_or_default();
        if accounts.is_empty() {
            return Err(WalletError::NoAccounts);
        }
        Ok(accounts)
    }
}

/// Whether `value` looks like a hex account address (`0x` + 40 hex digits)
pub fn is_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Shorten an address for display: `0xABCD…1234`
pub fn abbreviate(value: &str) -> String {
    if value.len() <= 12 || !value.is_char_boundary(6) || !value.is_char_boundary(value.len() - 4) {
        return value.to_string();
    }
    format!("{}…{}", &value[..6], &value[value.len() - 4..])
}
