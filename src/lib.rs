#![allow(clippy::format_push_string)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::trivially_copy_pass_by_ref)]

//! # kira-scenario
//!
//! Scenario automation for KIRA networks - describe a sequence of chain
//! queries and transactions in YAML and run it against a node.
//!
//! ## Features
//!
//! - **Playbooks**: Named, ordered steps with default variables
//! - **Templates**: `{{ step_output.field }}` references between steps
//! - **Dry Run**: Render every step without touching the chain
//! - **Confirmation**: Async broadcasts are polled until included
//!
//! ## Quick Start
//!
//! ```bash
//! # Check a playbook
//! kira-scenario validate scenarios/transfer.yaml
//!
//! # See what it would do
//! kira-scenario --dry-run run scenarios/transfer.yaml --var amount=100ukex
//!
//! # Run it
//! kira-scenario run scenarios/transfer.yaml
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::use_self)]

pub mod chain;
pub mod core;
pub mod dispatch;
pub mod scenario;

// Re-export commonly used types
pub use chain::{ChainClient, SekaidClient};
pub use core::Config;
pub use dispatch::{ActionDispatcher, Dispatcher};
pub use scenario::{
    load_playbook, ExecuteOptions, ExecutionResult, Playbook, RunError, ScenarioRunner,
    VariableStore,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "kira-scenario";
