//! Scenario execution engine.
//!
//! Runs steps strictly in order: interpolate parameters, dispatch, check the
//! on-chain result, wait for inclusion of async broadcasts, then bind the
//! step output for later templates.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::Utc;

use super::cancel::CancelToken;
use super::error::{RunError, StepError};
use super::result::{ExecutionResult, StepResult};
use super::schema::{BroadcastMode, Playbook, Step};
use super::value::Value;
use super::variables::VariableStore;
use crate::chain::TxResponse;
use crate::core::EngineConfig;
use crate::dispatch::{ActionCall, ActionKind, Dispatcher};

/// Run-scoped options.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Render and report steps without dispatching anything
    pub dry_run: bool,

    /// Narrate progress on stderr
    pub verbose: bool,

    /// Variables that take precedence over the playbook defaults
    pub variable_overrides: BTreeMap<String, Value>,

    /// Confirmation wait for steps that do not set their own
    pub wait_timeout: Duration,

    /// Interval between confirmation checks
    pub poll_interval: Duration,

    /// Keep running steps after a failure
    pub continue_on_error: bool,

    pub cancel: CancelToken,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for ExecuteOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            dry_run: false,
            verbose: false,
            variable_overrides: BTreeMap::new(),
            wait_timeout: config.wait_timeout,
            poll_interval: config.poll_interval,
            continue_on_error: config.continue_on_error,
            cancel: CancelToken::new(),
        }
    }
}

/// Executes playbooks against a [`Dispatcher`].
#[derive(Debug)]
pub struct ScenarioRunner<D> {
    dispatcher: D,
}

impl<D: Dispatcher> ScenarioRunner<D> {
    /// Create a runner.
    pub fn new(dispatcher: D) -> Self {
        Self { dispatcher }
    }

    /// The dispatcher in use.
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Execute a playbook with a fresh variable store.
    ///
    /// Step failures are recorded in the returned result. The error is set
    /// exactly when the run stopped early, and `result.error` carries its text.
    pub async fn execute(
        &self,
        playbook: &Playbook,
        options: &ExecuteOptions,
    ) -> (ExecutionResult, Option<RunError>) {
        let mut variables = VariableStore::new();
        self.execute_with(playbook, options, &mut variables).await
    }

    /// Execute a playbook, leaving the final variables in `variables`.
    pub async fn execute_with(
        &self,
        playbook: &Playbook,
        options: &ExecuteOptions,
        variables: &mut VariableStore,
    ) -> (ExecutionResult, Option<RunError>) {
        let started_at = Utc::now();
        let start = Instant::now();

        variables.merge_from(playbook.variables.iter().map(|(k, v)| (k.clone(), v.clone())));
        variables.merge_from(options.variable_overrides.clone());

        tracing::debug!(scenario = playbook.name, dry_run = options.dry_run, "Run started");
        if options.verbose {
            let mode = if options.dry_run { " (dry run)" } else { "" };
            eprintln!("Scenario: {}{mode}", playbook.name);
        }

        let total = playbook.steps.len();
        let mut steps = Vec::with_capacity(total);
        let mut error = None;

        for (index, step) in playbook.steps.iter().enumerate() {
            if options.cancel.is_cancelled() {
                tracing::warn!(step = step.name, "Run cancelled before step");
                error = Some(RunError::Cancelled { step: step.name.clone() });
                break;
            }

            if options.verbose {
                eprintln!("[{}/{}] {} ({} {})", index + 1, total, step.name, step.module, step.action);
            }

            let (result, outcome) = if options.dry_run {
                (skip_step(step, variables), Ok(()))
            } else {
                self.run_step(step, variables, options).await
            };

            if options.verbose {
                eprintln!("      {}", result.summary());
            }
            steps.push(result);

            if let Err(source) = outcome {
                if !options.continue_on_error {
                    error = Some(RunError::StepFailed { step: step.name.clone(), source });
                    break;
                }
            }
        }

        let success = error.is_none() && steps.iter().all(|s| s.success);
        tracing::info!(scenario = playbook.name, success, "Scenario finished");

        let result = ExecutionResult {
            scenario: playbook.name.clone(),
            success,
            dry_run: options.dry_run,
            started_at,
            steps,
            duration: start.elapsed(),
            error: error.as_ref().map(ToString::to_string),
        };
        (result, error)
    }

    async fn run_step(
        &self,
        step: &Step,
        variables: &mut VariableStore,
        options: &ExecuteOptions,
    ) -> (StepResult, Result<(), StepError>) {
        let start = Instant::now();
        let mut result = StepResult::pending(step);
        tracing::debug!(step = step.name, phase = "executing", "Step phase");

        let outcome = self.perform(step, variables, options, &mut result).await;
        match outcome {
            Ok(()) => {
                result.success = true;
                tracing::debug!(step = step.name, phase = "succeeded", "Step phase");
            }
            Err(ref e) => {
                tracing::warn!(step = step.name, kind = %e.kind(), error = %e, "Step failed");
                result.error_kind = Some(e.kind());
                result.error = Some(e.to_string());
            }
        }

        result.duration = start.elapsed();
        (result, outcome)
    }

    async fn perform(
        &self,
        step: &Step,
        variables: &mut VariableStore,
        options: &ExecuteOptions,
        result: &mut StepResult,
    ) -> Result<(), StepError> {
        let params = variables.interpolate_params(&step.params)?;
        result.params.clone_from(&params);

        let call = ActionCall {
            module: step.module.clone(),
            action: step.action.clone(),
            params,
            tx: step.tx_options.clone(),
        };
        let mut output = self.dispatcher.dispatch(&call).await?;

        if ActionKind::classify(&step.action).is_transaction() {
            if let Some(response) = output.tx.take() {
                result.record_tx(&response);
                if !response.is_ok() {
                    return Err(StepError::on_chain(&response));
                }

                if step.broadcast_mode() == BroadcastMode::Async {
                    tracing::debug!(step = step.name, phase = "waiting_confirmation", "Step phase");
                    let wait = step
                        .tx_options
                        .as_ref()
                        .and_then(|t| t.wait_timeout)
                        .unwrap_or(options.wait_timeout);

                    let mut confirmed = self.confirm(&response.tx_hash, wait, options).await?;
                    if confirmed.tx_hash.is_empty() {
                        confirmed.tx_hash.clone_from(&response.tx_hash);
                    }
                    result.record_tx(&confirmed);
                    if !confirmed.is_ok() {
                        return Err(StepError::on_chain(&confirmed));
                    }
                    output.value = Value::typed(confirmed);
                }
            }
        }

        match output.value.canonical() {
            Ok(json) => result.output = Some(Cow::into_owned(json)),
            Err(e) => tracing::warn!(step = step.name, error = %e, "Output is not serializable"),
        }

        if let Some(name) = step.output_name() {
            tracing::debug!(step = step.name, output = name, "Binding step output");
            variables.set(name, output.value);
        }

        Ok(())
    }

    /// Poll for inclusion of `hash` until it lands, `wait` elapses, or the run is cancelled.
    ///
    /// Lookup errors count as "not yet included".
    async fn confirm(
        &self,
        hash: &str,
        wait: Duration,
        options: &ExecuteOptions,
    ) -> Result<TxResponse, StepError> {
        let deadline = tokio::time::Instant::now() + wait;
        let cancelled = || StepError::Cancelled { tx_hash: hash.to_string() };
        let mut attempt = 0u32;

        loop {
            if options.cancel.is_cancelled() {
                return Err(cancelled());
            }
            attempt += 1;

            tokio::select! {
                biased;
                () = options.cancel.cancelled() => return Err(cancelled()),
                lookup = tokio::time::timeout_at(deadline, self.dispatcher.query_tx(hash)) => {
                    match lookup {
                        Ok(Ok(response)) if response.is_included() || !response.is_ok() => {
                            tracing::debug!(tx_hash = hash, attempt, height = response.height, "Transaction included");
                            return Ok(response);
                        }
                        Ok(Ok(_)) => tracing::debug!(tx_hash = hash, attempt, "Transaction not yet included"),
                        Ok(Err(e)) => tracing::debug!(tx_hash = hash, attempt, error = %e, "Transaction lookup failed"),
                        Err(_) => {}
                    }
                }
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Err(StepError::Timeout { tx_hash: hash.to_string(), waited: wait });
            }

            let nap = options.poll_interval.min(deadline - now);
            tokio::select! {
                biased;
                () = options.cancel.cancelled() => return Err(cancelled()),
                () = tokio::time::sleep(nap) => {}
            }
        }
    }
}

/// Dry-run record: parameters rendered as far as possible, nothing dispatched.
fn skip_step(step: &Step, variables: &VariableStore) -> StepResult {
    let start = Instant::now();
    let mut result = StepResult::pending(step);

    result.params = variables.render_params_lossy(&step.params);
    result.success = true;
    result.skipped = true;
    tracing::debug!(step = step.name, phase = "skipped", "Step phase");

    result.duration = start.elapsed();
    result
}
