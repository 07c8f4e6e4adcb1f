//! Action registry.
//!
//! Maps `(module, action)` pairs to handlers. Most actions are described by a
//! [`ModuleAction`] row: which CLI subcommand to run, which parameters are
//! positional, and which parameters hold addresses.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::{resolve_address, ActionKind, DispatchError, DispatchOutput};
use crate::chain::{ChainClient, QueryRequest, TxRequest};
use crate::scenario::{TransactionSettings, Value};

/// Everything a handler needs for one invocation.
pub struct ActionContext<'a> {
    /// Lowercased module name
    pub module: &'a str,

    /// Lowercased action name
    pub action: &'a str,

    pub params: &'a BTreeMap<String, String>,
    pub tx: Option<&'a TransactionSettings>,
    pub client: &'a dyn ChainClient,
    pub address_prefix: &'a str,
}

impl ActionContext<'_> {
    /// A required parameter.
    pub fn param(&self, name: &str) -> Result<&str, DispatchError> {
        self.params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| DispatchError::MissingParameter(name.to_string()))
    }

    /// Resolve an address parameter value, accepting key names.
    pub async fn address(&self, value: &str) -> Result<String, DispatchError> {
        resolve_address(self.client.keyring(), self.address_prefix, value).await
    }
}

/// Performs one kind of action.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<DispatchOutput, DispatchError>;
}

/// A table-described module query or transaction.
#[derive(Debug, Clone, Copy)]
pub struct ModuleAction {
    kind: ActionKind,

    /// CLI subcommand path under the module
    path: &'static [&'static str],

    /// Required parameters, passed positionally in this order
    args: &'static [&'static str],

    /// Parameters that hold addresses and may be given as key names
    addresses: &'static [&'static str],
}

impl ModuleAction {
    /// A read-only query.
    pub const fn query(
        path: &'static [&'static str],
        args: &'static [&'static str],
        addresses: &'static [&'static str],
    ) -> Self {
        Self { kind: ActionKind::Query, path, args, addresses }
    }

    /// A transaction signed by the `from` parameter.
    pub const fn tx(
        path: &'static [&'static str],
        args: &'static [&'static str],
        addresses: &'static [&'static str],
    ) -> Self {
        Self { kind: ActionKind::Transaction, path, args, addresses }
    }

    /// Positional arguments and remaining flags, with addresses resolved.
    async fn arguments(
        &self,
        ctx: &ActionContext<'_>,
    ) -> Result<(Vec<String>, BTreeMap<String, String>), DispatchError> {
        let mut args = Vec::with_capacity(self.args.len());
        for name in self.args {
            let value = ctx.param(name)?;
            args.push(self.resolve(ctx, name, value).await?);
        }

        let mut flags = BTreeMap::new();
        for (name, value) in ctx.params {
            if self.args.contains(&name.as_str()) {
                continue;
            }
            if self.kind.is_transaction() && name == "from" {
                continue;
            }
            flags.insert(name.replace('_', "-"), self.resolve(ctx, name, value).await?);
        }

        Ok((args, flags))
    }

    async fn resolve(
        &self,
        ctx: &ActionContext<'_>,
        name: &str,
        value: &str,
    ) -> Result<String, DispatchError> {
        if self.addresses.contains(&name) {
            ctx.address(value).await
        } else {
            Ok(value.to_string())
        }
    }
}

#[async_trait]
impl ActionHandler for ModuleAction {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<DispatchOutput, DispatchError> {
        let (args, flags) = self.arguments(ctx).await?;
        let module = cli_module(ctx.module).to_string();
        let path = self.path.iter().map(|p| (*p).to_string()).collect();

        match self.kind {
            ActionKind::Query => {
                let request = QueryRequest { module, path, args, flags };
                let value = ctx.client.query(&request).await?;
                Ok(DispatchOutput::query(value))
            }
            ActionKind::Transaction => {
                let from = ctx.param("from")?.to_string();
                let settings = ctx.tx.cloned().unwrap_or_default();
                let request = TxRequest {
                    module,
                    path,
                    args,
                    flags,
                    from,
                    broadcast_mode: settings.mode(),
                    fees: settings.fees,
                    gas: settings.gas,
                    memo: settings.memo,
                    skip_confirmation: true,
                };
                let response = ctx.client.tx(&request).await?;
                Ok(DispatchOutput::transaction(response))
            }
        }
    }
}

/// `status show`: node status.
#[derive(Debug, Clone, Copy)]
struct NodeStatus;

#[async_trait]
impl ActionHandler for NodeStatus {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<DispatchOutput, DispatchError> {
        Ok(DispatchOutput::query(ctx.client.status().await?))
    }
}

/// `keys show`: resolve the `name` parameter to an address.
#[derive(Debug, Clone, Copy)]
struct KeyAddress;

#[async_trait]
impl ActionHandler for KeyAddress {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<DispatchOutput, DispatchError> {
        let name = ctx.param("name")?;
        let address = ctx.address(name).await?;
        Ok(DispatchOutput::query(json!({ "name": name, "address": address })))
    }
}

/// `tx show`: look a transaction up by the `hash` parameter.
#[derive(Debug, Clone, Copy)]
struct TxLookup;

#[async_trait]
impl ActionHandler for TxLookup {
    async fn handle(&self, ctx: &ActionContext<'_>) -> Result<DispatchOutput, DispatchError> {
        let response = ctx.client.query_tx(ctx.param("hash")?).await?;
        Ok(DispatchOutput::query(Value::typed(response)))
    }
}

/// Module name as the node CLI spells it.
pub fn cli_module(module: &str) -> &str {
    match module {
        "gov" => "customgov",
        "staking" => "customstaking",
        "slashing" => "customslashing",
        "evidence" => "customevidence",
        other => other,
    }
}

const BUILTIN_ACTIONS: &[(&str, &str, ModuleAction)] = &[
    ("auth", "account", ModuleAction::query(&["account"], &["address"], &["address"])),
    ("auth", "params", ModuleAction::query(&["params"], &[], &[])),
    ("bank", "balances", ModuleAction::query(&["balances"], &["address"], &["address"])),
    ("bank", "total", ModuleAction::query(&["total"], &[], &[])),
    ("bank", "send", ModuleAction::tx(&["send"], &["from", "to", "amount"], &["to"])),
    ("basket", "list", ModuleAction::query(&["token-baskets"], &[], &[])),
    ("collectives", "list", ModuleAction::query(&["collectives"], &[], &[])),
    ("custody", "get-custody", ModuleAction::query(&["get"], &["address"], &["address"])),
    ("distributor", "get-fees-treasury", ModuleAction::query(&["fees-treasury"], &[], &[])),
    ("gov", "proposals", ModuleAction::query(&["proposals"], &[], &[])),
    ("gov", "proposal", ModuleAction::query(&["proposal"], &["proposal_id"], &[])),
    ("gov", "votes", ModuleAction::query(&["votes"], &["proposal_id"], &[])),
    ("gov", "permissions", ModuleAction::query(&["permissions"], &["address"], &["address"])),
    ("gov", "get-network-properties", ModuleAction::query(&["network-properties"], &[], &[])),
    ("gov", "vote", ModuleAction::tx(&["proposal", "vote"], &["proposal_id", "option"], &[])),
    (
        "gov",
        "whitelist-permission",
        ModuleAction::tx(&["permission", "whitelist"], &[], &["addr"]),
    ),
    ("multistaking", "pools", ModuleAction::query(&["staking-pools"], &[], &[])),
    ("multistaking", "delegate", ModuleAction::tx(&["delegate"], &["validator", "coins"], &[])),
    (
        "multistaking",
        "undelegate",
        ModuleAction::tx(&["undelegate"], &["validator", "coins"], &[]),
    ),
    ("multistaking", "claim-rewards", ModuleAction::tx(&["claim-rewards"], &[], &[])),
    ("slashing", "list-signing-infos", ModuleAction::query(&["signing-infos"], &[], &[])),
    ("spending", "pools", ModuleAction::query(&["pool-names"], &[], &[])),
    ("spending", "claim", ModuleAction::tx(&["claim-spending-pool"], &[], &[])),
    ("staking", "validators", ModuleAction::query(&["validators"], &[], &[])),
    ("staking", "validator", ModuleAction::query(&["validator"], &[], &["addr"])),
    ("staking", "claim-validator-seat", ModuleAction::tx(&["claim-validator-seat"], &[], &[])),
    ("tokens", "rates", ModuleAction::query(&["all-rates"], &[], &[])),
    ("tokens", "rate", ModuleAction::query(&["rate"], &["denom"], &[])),
    ("tokens", "upsert-rate", ModuleAction::tx(&["upsert-rate"], &[], &[])),
    ("ubi", "records", ModuleAction::query(&["ubi-records"], &[], &[])),
    ("upgrade", "show-current-plan", ModuleAction::query(&["current-plan"], &[], &[])),
    ("upgrade", "show-next-plan", ModuleAction::query(&["next-plan"], &[], &[])),
];

/// Registry of action handlers keyed by lowercased `(module, action)`.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<(String, String), Arc<dyn ActionHandler>>,
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry").field("actions", &self.handlers.len()).finish()
    }
}

impl ActionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every builtin action.
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        for (module, action, entry) in BUILTIN_ACTIONS {
            registry.register(module, action, *entry);
        }
        registry.register("status", "show", NodeStatus);
        registry.register("keys", "show", KeyAddress);
        registry.register("tx", "show", TxLookup);

        registry
    }

    /// Register a handler, replacing any existing one for the pair.
    pub fn register(&mut self, module: &str, action: &str, handler: impl ActionHandler + 'static) {
        self.handlers
            .insert((module.to_ascii_lowercase(), action.to_ascii_lowercase()), Arc::new(handler));
    }

    /// Find the handler for a pair, ignoring case.
    pub fn get(&self, module: &str, action: &str) -> Option<&Arc<dyn ActionHandler>> {
        self.handlers.get(&(module.to_ascii_lowercase(), action.to_ascii_lowercase()))
    }

    /// Check if a pair is routed.
    pub fn contains(&self, module: &str, action: &str) -> bool {
        self.get(module, action).is_some()
    }

    /// All routed pairs, sorted.
    pub fn actions(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> =
            self.handlers.keys().map(|(m, a)| (m.as_str(), a.as_str())).collect();
        pairs.sort_unstable();
        pairs
    }

    /// Number of routed pairs.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
