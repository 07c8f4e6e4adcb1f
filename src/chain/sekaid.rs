//! Chain client backed by the node's CLI binary.
//!
//! Every call spawns `sekaid` (optionally inside a container through
//! `docker exec`) and decodes its JSON output.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command as ProcessCommand;

use super::{
    ChainClient, ClientError, ClientResult, Keyring, QueryRequest, StaticKeyring, TxRequest,
    TxResponse,
};
use crate::core::{Config, NodeConfig};

/// Output captured from a finished node command.
#[derive(Debug)]
struct CommandOutput {
    stdout: String,
    stderr: String,
}

/// [`ChainClient`] that shells out to `sekaid`.
#[derive(Debug, Clone)]
pub struct SekaidClient {
    node: NodeConfig,
    keys: StaticKeyring,
}

impl SekaidClient {
    /// Create a client for the given node settings.
    pub fn new(node: NodeConfig) -> Self {
        Self { node, keys: StaticKeyring::new() }
    }

    /// Create a client from the application configuration.
    ///
    /// Keys listed in `[keys]` resolve without asking the node.
    pub fn from_config(config: &Config) -> Self {
        Self { node: config.node.clone(), keys: config.keys.iter().collect() }
    }

    /// Node settings in use.
    pub fn node(&self) -> &NodeConfig {
        &self.node
    }

    /// Arguments for a module query.
    pub fn query_args(&self, request: &QueryRequest) -> Vec<String> {
        let mut args = vec!["query".to_string(), request.module.clone()];
        args.extend(request.path.iter().cloned());
        args.extend(request.args.iter().cloned());
        args.extend(request.flags.iter().map(|(k, v)| format!("--{k}={v}")));
        self.push_node_flags(&mut args);
        args
    }

    /// Arguments for a transaction.
    pub fn tx_args(&self, request: &TxRequest) -> Vec<String> {
        let mut args = vec!["tx".to_string(), request.module.clone()];
        args.extend(request.path.iter().cloned());
        args.extend(request.args.iter().cloned());
        args.extend(request.flags.iter().map(|(k, v)| format!("--{k}={v}")));

        args.push(format!("--from={}", request.from));
        args.push(format!("--chain-id={}", self.node.chain_id));
        args.push(format!("--keyring-backend={}", self.node.keyring_backend));
        if let Some(ref fees) = request.fees {
            args.push(format!("--fees={fees}"));
        }
        if let Some(ref gas) = request.gas {
            args.push(format!("--gas={gas}"));
        }
        if let Some(ref memo) = request.memo {
            args.push(format!("--note={memo}"));
        }
        args.push(format!("--broadcast-mode={}", request.broadcast_mode));
        if request.skip_confirmation {
            args.push("--yes".to_string());
        }

        self.push_node_flags(&mut args);
        args
    }

    /// Arguments for looking a transaction up by hash.
    pub fn query_tx_args(&self, hash: &str) -> Vec<String> {
        let mut args = vec!["query".to_string(), "tx".to_string(), hash.to_string()];
        self.push_node_flags(&mut args);
        args
    }

    /// Arguments for resolving a key name.
    pub fn key_args(&self, name: &str) -> Vec<String> {
        let mut args = vec![
            "keys".to_string(),
            "show".to_string(),
            name.to_string(),
            "--address".to_string(),
            format!("--keyring-backend={}", self.node.keyring_backend),
        ];
        if let Some(home) = self.node.expanded_home() {
            args.push(format!("--home={home}"));
        }
        args
    }

    fn push_node_flags(&self, args: &mut Vec<String>) {
        args.push("--output=json".to_string());
        args.push(format!("--node={}", self.node.node));
        if let Some(home) = self.node.expanded_home() {
            args.push(format!("--home={home}"));
        }
    }

    /// Program and full argument list, wrapping in `docker exec` when configured.
    fn command_line(&self, args: Vec<String>) -> (String, Vec<String>) {
        match self.node.container {
            Some(ref container) => {
                let mut full = vec!["exec".to_string(), container.clone(), self.node.binary.clone()];
                full.extend(args);
                ("docker".to_string(), full)
            }
            None => (self.node.binary.clone(), args),
        }
    }

    async fn run(&self, args: Vec<String>) -> ClientResult<CommandOutput> {
        let (program, args) = self.command_line(args);
        let command_text = format!("{} {}", program, args.join(" "));
        tracing::debug!(command = %command_text, "Running node command");

        let mut cmd = ProcessCommand::new(&program);
        cmd.args(&args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let limit = self.node.command_timeout;
        let output = match tokio::time::timeout(limit, cmd.output()).await {
            Ok(result) => result.map_err(|source| ClientError::Spawn { program, source })?,
            Err(_) => {
                return Err(ClientError::Timeout { command: command_text, seconds: secs(limit) });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(ClientError::CommandFailed {
                command: command_text,
                status: output.status.to_string(),
                stderr,
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

fn secs(d: Duration) -> u64 {
    d.as_secs().max(1)
}

#[async_trait]
impl Keyring for SekaidClient {
    async fn address(&self, name: &str) -> ClientResult<Option<String>> {
        if let Some(address) = self.keys.get(name) {
            return Ok(Some(address.to_string()));
        }

        match self.run(self.key_args(name)).await {
            Ok(out) if out.stdout.is_empty() => Ok(None),
            Ok(out) => Ok(Some(out.stdout)),
            Err(ClientError::CommandFailed { stderr, .. })
                if stderr.contains("not found") || stderr.contains("not a valid name") =>
            {
                Ok(None)
            }
            Err(ClientError::CommandFailed { stderr, .. }) => Err(ClientError::Keyring(stderr)),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ChainClient for SekaidClient {
    async fn query(&self, request: &QueryRequest) -> ClientResult<serde_json::Value> {
        let out = self.run(self.query_args(request)).await?;
        Ok(serde_json::from_str(&out.stdout)?)
    }

    async fn tx(&self, request: &TxRequest) -> ClientResult<TxResponse> {
        let out = self.run(self.tx_args(request)).await?;
        Ok(serde_json::from_str(&out.stdout)?)
    }

    async fn status(&self) -> ClientResult<serde_json::Value> {
        let mut args = vec!["status".to_string()];
        args.push(format!("--node={}", self.node.node));

        // Older node builds print status on stderr.
        let out = self.run(args).await?;
        let text = if out.stdout.is_empty() { &out.stderr } else { &out.stdout };
        Ok(serde_json::from_str(text)?)
    }

    async fn query_tx(&self, hash: &str) -> ClientResult<TxResponse> {
        let out = self.run(self.query_tx_args(hash)).await?;
        Ok(serde_json::from_str(&out.stdout)?)
    }

    fn keyring(&self) -> &dyn Keyring {
        self
    }
}
