//! Action dispatch.
//!
//! Turns a step's `(module, action, params)` into one call against a
//! [`ChainClient`]. Routing is a table lookup; see [`ActionRegistry`].

mod address;
mod registry;

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::chain::{ChainClient, ClientError, TxResponse};
use crate::scenario::{TransactionSettings, Value};

pub use address::resolve_address;
pub use registry::{cli_module, ActionContext, ActionHandler, ActionRegistry, ModuleAction};

/// Errors raised while dispatching an action.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No handler is registered for the pair.
    #[error("Unknown action '{action}' for module '{module}'")]
    UnknownAction { module: String, action: String },

    #[error("Missing required parameter '{0}'")]
    MissingParameter(String),

    /// A parameter was taken as a key name and no such key exists.
    #[error("Key '{0}' not found in keyring")]
    KeyNotFound(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// One action invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionCall {
    pub module: String,
    pub action: String,

    /// Parameters after template interpolation
    pub params: BTreeMap<String, String>,

    pub tx: Option<TransactionSettings>,
}

/// What an action produced.
#[derive(Debug, Clone)]
pub struct DispatchOutput {
    /// Value bound to the step's output name
    pub value: Value,

    /// Transaction response, for actions that broadcast
    pub tx: Option<TxResponse>,
}

impl DispatchOutput {
    /// Output of a read-only call.
    pub fn query(value: impl Into<Value>) -> Self {
        Self { value: value.into(), tx: None }
    }

    /// Output of a broadcast; the response doubles as the step value.
    pub fn transaction(response: TxResponse) -> Self {
        Self { value: Value::typed(response.clone()), tx: Some(response) }
    }
}

/// Whether an action reads or writes chain state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Query,
    Transaction,
}

/// Read-only action names.
const READ_ONLY_ACTIONS: &[&str] = &[
    "account",
    "accounts",
    "balance",
    "balances",
    "info",
    "list",
    "params",
    "permissions",
    "pools",
    "proposal",
    "proposals",
    "rate",
    "rates",
    "records",
    "show",
    "status",
    "total",
    "total-supply",
    "validator",
    "validators",
    "votes",
];

/// Prefixes that mark an action as read-only.
const READ_ONLY_PREFIXES: &[&str] = &["query-", "get-", "list-", "show-"];

impl ActionKind {
    /// Classify an action by name; anything not recognizably read-only is a transaction.
    pub fn classify(action: &str) -> Self {
        let action = action.to_ascii_lowercase();

        if READ_ONLY_ACTIONS.contains(&action.as_str())
            || READ_ONLY_PREFIXES.iter().any(|p| action.starts_with(p))
        {
            Self::Query
        } else {
            Self::Transaction
        }
    }

    /// Check if this is a transaction.
    pub fn is_transaction(&self) -> bool {
        matches!(self, Self::Transaction)
    }
}

/// Routes actions to the chain.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Perform one action.
    async fn dispatch(&self, call: &ActionCall) -> Result<DispatchOutput, DispatchError>;

    /// Look a transaction up by hash, for confirmation polling.
    async fn query_tx(&self, hash: &str) -> Result<TxResponse, DispatchError>;
}

/// [`Dispatcher`] backed by an [`ActionRegistry`] and a [`ChainClient`].
pub struct ActionDispatcher<C> {
    client: C,
    registry: ActionRegistry,
    address_prefix: String,
}

impl<C: ChainClient> ActionDispatcher<C> {
    /// Create a dispatcher with the builtin actions.
    pub fn new(client: C, address_prefix: impl Into<String>) -> Self {
        Self::with_registry(client, ActionRegistry::builtin(), address_prefix)
    }

    /// Create a dispatcher with a custom registry.
    pub fn with_registry(
        client: C,
        registry: ActionRegistry,
        address_prefix: impl Into<String>,
    ) -> Self {
        Self { client, registry, address_prefix: address_prefix.into() }
    }

    /// The chain client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The action registry.
    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }
}

impl<C> std::fmt::Debug for ActionDispatcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("actions", &self.registry.len())
            .field("address_prefix", &self.address_prefix)
            .finish()
    }
}

#[async_trait]
impl<C: ChainClient> Dispatcher for ActionDispatcher<C> {
    async fn dispatch(&self, call: &ActionCall) -> Result<DispatchOutput, DispatchError> {
        let module = call.module.to_ascii_lowercase();
        let action = call.action.to_ascii_lowercase();

        let handler = self.registry.get(&module, &action).ok_or_else(|| {
            DispatchError::UnknownAction { module: call.module.clone(), action: call.action.clone() }
        })?;

        tracing::debug!(module, action, "Dispatching action");

        let ctx = ActionContext {
            module: &module,
            action: &action,
            params: &call.params,
            tx: call.tx.as_ref(),
            client: &self.client,
            address_prefix: &self.address_prefix,
        };

        handler.handle(&ctx).await
    }

    async fn query_tx(&self, hash: &str) -> Result<TxResponse, DispatchError> {
        Ok(self.client.query_tx(hash).await?)
    }
}
