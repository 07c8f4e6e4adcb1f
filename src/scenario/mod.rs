//! Scenario playbooks.
//!
//! Playbooks are YAML files listing chain actions to run in order, with
//! default variables, `{{ templates }}` in parameters and named step outputs.

mod cancel;
mod error;
mod parser;
mod result;
mod runner;
mod schema;
mod value;
mod variables;

pub use cancel::CancelToken;
pub use error::{RunError, StepError, StepErrorKind};
pub use parser::{
    discover_scenarios, load_playbook, load_playbook_str, validate_playbook, ValidationError,
};
pub use result::{ExecutionResult, StepResult};
pub use runner::{ExecuteOptions, ScenarioRunner};
pub use schema::{
    is_known_module, BroadcastMode, Playbook, Step, TransactionSettings, KNOWN_MODULES,
};
pub use value::{render_json, TypedOutput, Value};
pub use variables::{
    template_references, InterpolationError, ParamInterpolationError, VariableStore,
};
