//! Scenario schema definitions.
//!
//! Defines the YAML structure for playbook files. Decoding is strict: a field
//! the model does not know is an error rather than silently ignored.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::core::duration::human_opt;

/// Modules a step may address.
pub const KNOWN_MODULES: &[&str] = &[
    "auth",
    "bank",
    "basket",
    "bridge",
    "collectives",
    "custody",
    "distributor",
    "ethereum",
    "evidence",
    "genutil",
    "gov",
    "keys",
    "layer2",
    "multistaking",
    "recovery",
    "slashing",
    "spending",
    "staking",
    "status",
    "tokens",
    "tx",
    "ubi",
    "upgrade",
];

/// Whether `module` is one of [`KNOWN_MODULES`], ignoring case.
pub fn is_known_module(module: &str) -> bool {
    KNOWN_MODULES.iter().any(|m| m.eq_ignore_ascii_case(module))
}

/// A scenario definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Playbook {
    /// Name of the scenario
    #[serde(default)]
    pub name: String,

    /// Description of what this scenario does
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Format version of the document
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "scalar_string_opt"
    )]
    pub version: Option<String>,

    /// Default variables, overridable by the caller
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, serde_json::Value>,

    /// Steps to execute, in order
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A step in the scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    /// Name of the step
    #[serde(default)]
    pub name: String,

    /// Chain module the action belongs to
    #[serde(default)]
    pub module: String,

    /// Action within the module (e.g. `send`, `balances`)
    #[serde(default)]
    pub action: String,

    /// Action parameters; values may contain `{{ templates }}`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "scalar_map")]
    pub params: BTreeMap<String, String>,

    /// Variable name to bind the step output to; empty means unbound
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "non_empty_opt")]
    pub output: Option<String>,

    /// Transaction settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_options: Option<TransactionSettings>,
}

/// Per-step transaction settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TransactionSettings {
    /// Fee spec, e.g. `100ukex`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fees: Option<String>,

    /// Gas spec, e.g. `200000` or `auto`
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "scalar_string_opt"
    )]
    pub gas: Option<String>,

    /// Transaction memo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,

    /// `sync`, `async` or `block`; empty means the default
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "non_empty_opt")]
    pub broadcast_mode: Option<String>,

    /// How long to wait for inclusion of an async broadcast
    #[serde(default, skip_serializing_if = "Option::is_none", with = "human_opt")]
    pub wait_timeout: Option<Duration>,
}

/// Transaction broadcast semantics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastMode {
    /// Wait for initial acceptance
    #[default]
    Sync,
    /// Fire and poll for inclusion
    Async,
    /// Wait for inclusion
    Block,
}

impl BroadcastMode {
    /// Get the string representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Async => "async",
            Self::Block => "block",
        }
    }
}

impl FromStr for BroadcastMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sync" => Ok(Self::Sync),
            "async" => Ok(Self::Async),
            "block" => Ok(Self::Block),
            other => Err(format!("unknown broadcast mode '{other}'")),
        }
    }
}

impl fmt::Display for BroadcastMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TransactionSettings {
    /// The broadcast mode, defaulting to `sync` when unset or unparseable.
    ///
    /// Loaded playbooks have already been validated, so the fallback only
    /// applies to settings built by hand.
    pub fn mode(&self) -> BroadcastMode {
        self.broadcast_mode.as_deref().and_then(|m| m.parse().ok()).unwrap_or_default()
    }
}

impl Playbook {
    /// Get the number of steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Get default variable names.
    #[must_use]
    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.keys().map(String::as_str).collect()
    }

    /// Output names declared by steps, in step order.
    #[must_use]
    pub fn outputs(&self) -> Vec<&str> {
        self.steps.iter().filter_map(Step::output_name).collect()
    }
}

impl Step {
    /// The step's broadcast mode (`sync` when no settings are given).
    pub fn broadcast_mode(&self) -> BroadcastMode {
        self.tx_options.as_ref().map(TransactionSettings::mode).unwrap_or_default()
    }

    /// Output variable name, if the step binds one.
    pub fn output_name(&self) -> Option<&str> {
        self.output.as_deref().filter(|name| !name.is_empty())
    }
}

fn scalar_to_string<E: de::Error>(value: serde_yaml::Value) -> Result<String, E> {
    match value {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Null => Ok(String::new()),
        other => Err(E::custom(format!("expected a scalar value, found {other:?}"))),
    }
}

/// Accept strings, numbers and booleans for a string field.
fn scalar_string_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_yaml::Value>::deserialize(d)?;
    value.map(scalar_to_string).transpose()
}

/// Optional string where an empty or blank value counts as absent.
fn non_empty_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(d)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Accept a map whose values are strings, numbers or booleans.
fn scalar_map<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, String>, D::Error> {
    struct ScalarMapVisitor;

    impl<'de> Visitor<'de> for ScalarMapVisitor {
        type Value = BTreeMap<String, String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of scalar parameters")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(BTreeMap::new())
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut map = BTreeMap::new();
            while let Some((key, value)) = access.next_entry::<String, serde_yaml::Value>()? {
                map.insert(key, scalar_to_string(value)?);
            }
            Ok(map)
        }
    }

    d.deserialize_any(ScalarMapVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_playbook_yaml() {
        let yaml = r#"
name: fund-and-vote
description: Fund a voter and cast a vote
version: 2

variables:
  amount: 100ukex
  proposal: 7

steps:
  - name: fund
    module: bank
    action: send
    params:
      from: validator
      to: alice
      amount: "{{ amount }}"
    output: fund_tx
    tx_options:
      fees: 100ukex
      broadcast_mode: async
      wait_timeout: 30s

  - name: vote
    module: gov
    action: vote
    params:
      from: alice
      proposal_id: "{{ proposal }}"
      option: 1
"#;

        let playbook: Playbook = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(playbook.name, "fund-and-vote");
        assert_eq!(playbook.version.as_deref(), Some("2"));
        assert_eq!(playbook.step_count(), 2);
        assert_eq!(playbook.variable_names(), vec!["amount", "proposal"]);
        assert_eq!(playbook.outputs(), vec!["fund_tx"]);

        let fund = &playbook.steps[0];
        assert_eq!(fund.params["amount"], "{{ amount }}");
        assert_eq!(fund.broadcast_mode(), BroadcastMode::Async);
        let tx = fund.tx_options.as_ref().unwrap();
        assert_eq!(tx.wait_timeout, Some(Duration::from_secs(30)));
        assert_eq!(tx.fees.as_deref(), Some("100ukex"));

        let vote = &playbook.steps[1];
        assert_eq!(vote.params["option"], "1");
        assert_eq!(vote.broadcast_mode(), BroadcastMode::Sync);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = r"
name: typo
steps:
  - name: s
    module: bank
    action: send
    parmas:
      to: bob
";

        let result: Result<Playbook, _> = serde_yaml::from_str(yaml);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("parmas"), "unexpected error: {err}");
    }

    #[test]
    fn test_unknown_tx_option_rejected() {
        let yaml = r"
name: s
module: bank
action: send
tx_options:
  fee: 1ukex
";

        assert!(serde_yaml::from_str::<Step>(yaml).is_err());
    }

    #[test]
    fn test_broadcast_mode_parse_is_case_insensitive() {
        assert_eq!("ASYNC".parse::<BroadcastMode>().unwrap(), BroadcastMode::Async);
        assert_eq!("Block".parse::<BroadcastMode>().unwrap(), BroadcastMode::Block);
        assert!("instant".parse::<BroadcastMode>().is_err());
    }

    #[test]
    fn test_known_modules_case_insensitive() {
        assert!(is_known_module("bank"));
        assert!(is_known_module("BANK"));
        assert!(!is_known_module("banking"));
    }

    #[test]
    fn test_nested_params_rejected() {
        let yaml = r"
name: s
module: bank
action: send
params:
  to:
    nested: true
";

        assert!(serde_yaml::from_str::<Step>(yaml).is_err());
    }
}
