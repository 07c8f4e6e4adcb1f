//! Step failure taxonomy.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::variables::ParamInterpolationError;
use crate::chain::TxResponse;
use crate::core::duration::format_duration;
use crate::dispatch::DispatchError;

/// Why a step failed.
#[derive(Debug, Error)]
pub enum StepError {
    /// A parameter referenced a variable that does not resolve.
    #[error(transparent)]
    Interpolation(#[from] ParamInterpolationError),

    /// The dispatcher could not perform the action.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The chain accepted the call but reported a non-zero result code.
    #[error("transaction {tx_hash} failed with code {code}: {raw_log}")]
    OnChain { tx_hash: String, code: u32, raw_log: String },

    /// Inclusion was not observed within the wait window.
    #[error("transaction {tx_hash} not confirmed within {}", wait_text(.waited))]
    Timeout { tx_hash: String, waited: Duration },

    /// The run was aborted while waiting for inclusion.
    #[error("cancelled while waiting for transaction {tx_hash}")]
    Cancelled { tx_hash: String },
}

fn wait_text(d: &Duration) -> String {
    format_duration(*d)
}

impl StepError {
    /// On-chain rejection for a response with a non-zero code.
    pub fn on_chain(response: &TxResponse) -> Self {
        Self::OnChain {
            tx_hash: response.tx_hash.clone(),
            code: response.code,
            raw_log: response.raw_log.clone(),
        }
    }

    /// Failure class of this error.
    pub fn kind(&self) -> StepErrorKind {
        match self {
            Self::Interpolation(_) => StepErrorKind::Interpolation,
            Self::Dispatch(DispatchError::UnknownAction { .. }) => StepErrorKind::UnknownAction,
            Self::Dispatch(_) => StepErrorKind::Dispatch,
            Self::OnChain { .. } => StepErrorKind::OnChain,
            Self::Timeout { .. } => StepErrorKind::Timeout,
            Self::Cancelled { .. } => StepErrorKind::Cancelled,
        }
    }
}

/// Why a run stopped before its last step.
#[derive(Debug, Error)]
pub enum RunError {
    /// A step failed and the run does not continue on error.
    #[error("step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: StepError,
    },

    /// The run was cancelled between steps.
    #[error("run cancelled before step '{step}'")]
    Cancelled { step: String },
}

impl RunError {
    /// Name of the step the run stopped at.
    pub fn step(&self) -> &str {
        match self {
            Self::StepFailed { step, .. } | Self::Cancelled { step } => step,
        }
    }
}

/// Failure class recorded on a step result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepErrorKind {
    Interpolation,
    UnknownAction,
    Dispatch,
    OnChain,
    Timeout,
    Cancelled,
}

impl StepErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interpolation => "interpolation",
            Self::UnknownAction => "unknown_action",
            Self::Dispatch => "dispatch",
            Self::OnChain => "on_chain",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for StepErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
