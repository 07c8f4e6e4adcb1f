//! Run and step result records.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::StepErrorKind;
use super::schema::Step;
use crate::chain::TxResponse;
use crate::core::duration::human;

/// Outcome of one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub module: String,
    pub action: String,
    pub success: bool,

    /// Set for dry-run steps, which are never dispatched
    #[serde(default, skip_serializing_if = "is_false")]
    pub skipped: bool,

    /// Parameters as sent, or as far as they rendered in a dry run
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_code: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<i64>,

    #[serde(with = "human")]
    pub duration: Duration,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<StepErrorKind>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl StepResult {
    /// A not-yet-successful record for `step`.
    pub(crate) fn pending(step: &Step) -> Self {
        Self {
            name: step.name.clone(),
            module: step.module.clone(),
            action: step.action.clone(),
            success: false,
            skipped: false,
            params: BTreeMap::new(),
            output: None,
            tx_hash: None,
            tx_code: None,
            block_height: None,
            duration: Duration::ZERO,
            error: None,
            error_kind: None,
        }
    }

    /// Copy hash, code and inclusion height from a transaction response.
    pub(crate) fn record_tx(&mut self, response: &TxResponse) {
        if !response.tx_hash.is_empty() {
            self.tx_hash = Some(response.tx_hash.clone());
        }
        self.tx_code = Some(response.code);
        self.block_height = response.is_included().then_some(response.height);
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        let status = if self.skipped {
            "SKIP"
        } else if self.success {
            "OK"
        } else {
            "FAIL"
        };

        let mut line = format!("[{status}] {} ({} {})", self.name, self.module, self.action);
        if let Some(ref hash) = self.tx_hash {
            line.push_str(&format!(" tx={hash}"));
        }
        if let Some(height) = self.block_height {
            line.push_str(&format!(" height={height}"));
        }
        if let Some(ref error) = self.error {
            line.push_str(&format!(": {error}"));
        }
        line
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Scenario name
    pub scenario: String,

    pub success: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub dry_run: bool,

    pub started_at: DateTime<Utc>,

    /// One entry per step the run reached, in order
    pub steps: Vec<StepResult>,

    #[serde(with = "human")]
    pub duration: Duration,

    /// Set only when the run stopped early
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Number of steps that succeeded, skipped ones included.
    pub fn passed(&self) -> usize {
        self.steps.iter().filter(|s| s.success).count()
    }

    /// Number of steps that failed.
    pub fn failed(&self) -> usize {
        self.steps.iter().filter(|s| !s.success).count()
    }

    /// Number of dry-run steps.
    pub fn skipped(&self) -> usize {
        self.steps.iter().filter(|s| s.skipped).count()
    }

    /// The first failed step, if any.
    pub fn first_failure(&self) -> Option<&StepResult> {
        self.steps.iter().find(|s| !s.success)
    }

    /// Step record by name.
    pub fn step(&self, name: &str) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.name == name)
    }
}
