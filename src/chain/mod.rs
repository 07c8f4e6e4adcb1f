//! Chain client abstraction.
//!
//! The engine and dispatcher talk to a node only through [`ChainClient`].
//! [`SekaidClient`] drives the node's CLI binary; tests supply their own
//! implementations.

mod keyring;
mod sekaid;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::scenario::BroadcastMode;

pub use keyring::StaticKeyring;
pub use sekaid::SekaidClient;

/// Errors from talking to a chain node.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The node command could not be started.
    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The node command exited unsuccessfully.
    #[error("'{command}' exited with {status}: {stderr}")]
    CommandFailed { command: String, status: String, stderr: String },

    /// The node command did not finish in time.
    #[error("'{command}' timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    /// The node answered with something that is not the expected JSON.
    #[error("Could not decode node output: {0}")]
    Decode(#[from] serde_json::Error),

    /// Key lookup failed for a reason other than the key being absent.
    #[error("Keyring error: {0}")]
    Keyring(String),
}

/// Result type for chain client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// A read-only query against a module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    /// Module to query
    pub module: String,

    /// Query subcommand path, e.g. `["balances"]`
    pub path: Vec<String>,

    /// Positional arguments
    pub args: Vec<String>,

    /// Named flags (`--key=value`)
    pub flags: BTreeMap<String, String>,
}

/// A transaction to sign and broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TxRequest {
    /// Module the message belongs to
    pub module: String,

    /// Transaction subcommand path, e.g. `["send"]`
    pub path: Vec<String>,

    /// Positional arguments
    pub args: Vec<String>,

    /// Named flags (`--key=value`)
    pub flags: BTreeMap<String, String>,

    /// Signing key name or address
    pub from: String,

    pub fees: Option<String>,
    pub gas: Option<String>,
    pub memo: Option<String>,
    pub broadcast_mode: BroadcastMode,

    /// Skip the interactive signing confirmation.
    ///
    /// Always set for unattended runs; see DESIGN.md.
    pub skip_confirmation: bool,
}

/// A broadcast or looked-up transaction as reported by the node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResponse {
    #[serde(alias = "txhash")]
    pub tx_hash: String,

    /// ABCI result code; zero means success
    #[serde(default)]
    pub code: u32,

    /// Inclusion height; zero until the transaction is in a block
    #[serde(default, deserialize_with = "int_or_string")]
    pub height: i64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub codespace: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_log: String,

    #[serde(default, deserialize_with = "int_or_string")]
    pub gas_wanted: i64,

    #[serde(default, deserialize_with = "int_or_string")]
    pub gas_used: i64,
}

impl TxResponse {
    /// Whether the chain accepted the transaction.
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }

    /// Whether the transaction has been included in a block.
    pub fn is_included(&self) -> bool {
        self.height > 0
    }
}

/// Cosmos nodes encode 64-bit integers as JSON strings.
fn int_or_string<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Str(String),
    }

    match IntOrString::deserialize(d)? {
        IntOrString::Int(i) => Ok(i),
        IntOrString::Str(s) if s.is_empty() => Ok(0),
        IntOrString::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Resolves local key names to addresses.
#[async_trait]
pub trait Keyring: Send + Sync {
    /// Address for `name`, or `None` when no such key exists.
    async fn address(&self, name: &str) -> ClientResult<Option<String>>;
}

/// A connection to a chain node.
///
/// Every call is a potentially slow, fallible remote operation.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Run a module query.
    async fn query(&self, request: &QueryRequest) -> ClientResult<serde_json::Value>;

    /// Sign and broadcast a transaction.
    async fn tx(&self, request: &TxRequest) -> ClientResult<TxResponse>;

    /// Node status.
    async fn status(&self) -> ClientResult<serde_json::Value>;

    /// Look a transaction up by hash.
    async fn query_tx(&self, hash: &str) -> ClientResult<TxResponse>;

    /// Key name resolution.
    fn keyring(&self) -> &dyn Keyring;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_response_from_node_json() {
        let json = r#"{
            "height": "42",
            "txhash": "ABC123",
            "codespace": "",
            "code": 0,
            "raw_log": "[]",
            "gas_wanted": "200000",
            "gas_used": "81234",
            "logs": []
        }"#;

        let resp: TxResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.tx_hash, "ABC123");
        assert_eq!(resp.height, 42);
        assert_eq!(resp.gas_used, 81234);
        assert!(resp.is_ok());
        assert!(resp.is_included());
    }

    #[test]
    fn test_tx_response_pending() {
        let json = r#"{"height": "0", "txhash": "FFEE", "code": 0}"#;

        let resp: TxResponse = serde_json::from_str(json).unwrap();
        assert!(!resp.is_included());
    }

    #[test]
    fn test_tx_response_serializes_tx_hash() {
        let resp = TxResponse { tx_hash: "ABC".to_string(), height: 3, ..Default::default() };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["tx_hash"], "ABC");
        assert_eq!(value["height"], 3);
    }
}
