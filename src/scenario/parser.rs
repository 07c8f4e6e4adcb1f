//! Scenario loader and validator.
//!
//! Parses YAML (or JSON) playbook documents into [`Playbook`] values and
//! rejects malformed scenarios before anything runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::schema::{is_known_module, BroadcastMode, Playbook};

/// A playbook could not be loaded.
///
/// Validation stops at the first violation; nothing is aggregated.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The document could not be decoded (syntax, wrong types, unknown fields).
    #[error("Invalid playbook document: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The document could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Playbook name cannot be empty")]
    MissingName,

    #[error("Playbook must have at least one step")]
    NoSteps,

    /// Step `index` (1-based) has an empty `field`.
    #[error("Step {index} has no {field}")]
    MissingStepField { index: usize, field: &'static str },

    #[error("Step '{step}' uses unknown module '{module}'")]
    UnknownModule { step: String, module: String },

    #[error("Output '{output}' of step '{step}' is already bound by step '{first}'")]
    DuplicateOutput { output: String, step: String, first: String },

    #[error("Step '{step}' has invalid broadcast mode '{mode}' (expected sync, async or block)")]
    InvalidBroadcastMode { step: String, mode: String },
}

/// Load a playbook from a file.
pub fn load_playbook(path: &Path) -> Result<Playbook, ValidationError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| ValidationError::Io { path: path.to_path_buf(), source })?;
    load_playbook_str(&content)
}

/// Load a playbook from a string.
pub fn load_playbook_str(content: &str) -> Result<Playbook, ValidationError> {
    let playbook: Playbook = serde_yaml::from_str(content)?;
    validate_playbook(&playbook)?;
    Ok(playbook)
}

/// Validate a decoded playbook.
pub fn validate_playbook(playbook: &Playbook) -> Result<(), ValidationError> {
    if playbook.name.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }

    if playbook.steps.is_empty() {
        return Err(ValidationError::NoSteps);
    }

    for (i, step) in playbook.steps.iter().enumerate() {
        let missing = if step.name.trim().is_empty() {
            Some("name")
        } else if step.module.trim().is_empty() {
            Some("module")
        } else if step.action.trim().is_empty() {
            Some("action")
        } else {
            None
        };

        if let Some(field) = missing {
            return Err(ValidationError::MissingStepField { index: i + 1, field });
        }
    }

    for step in &playbook.steps {
        if !is_known_module(&step.module) {
            return Err(ValidationError::UnknownModule {
                step: step.name.clone(),
                module: step.module.clone(),
            });
        }
    }

    let mut bound: HashMap<&str, &str> = HashMap::new();
    for step in &playbook.steps {
        if let Some(output) = step.output_name() {
            if let Some(first) = bound.insert(output, &step.name) {
                return Err(ValidationError::DuplicateOutput {
                    output: output.to_string(),
                    step: step.name.clone(),
                    first: first.to_string(),
                });
            }
        }
    }

    for step in &playbook.steps {
        let mode = step
            .tx_options
            .as_ref()
            .and_then(|tx| tx.broadcast_mode.as_deref())
            .filter(|m| !m.trim().is_empty());
        if let Some(mode) = mode {
            if mode.parse::<BroadcastMode>().is_err() {
                return Err(ValidationError::InvalidBroadcastMode {
                    step: step.name.clone(),
                    mode: mode.to_string(),
                });
            }
        }
    }

    warn_forward_references(playbook);

    Ok(())
}

/// Warn about templates that name a step output bound only by a later step.
///
/// Such references are legal (defaults or overrides may still define the
/// name) but usually indicate a mis-ordered playbook.
fn warn_forward_references(playbook: &Playbook) {
    let outputs: HashMap<&str, usize> = playbook
        .steps
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.output_name().map(|o| (o, i)))
        .collect();

    for (i, step) in playbook.steps.iter().enumerate() {
        for template in step.params.values() {
            for reference in super::variables::template_references(template) {
                let root = reference.split('.').next().unwrap_or(reference);
                if playbook.variables.contains_key(root) {
                    continue;
                }
                if let Some(&bound_at) = outputs.get(root) {
                    if bound_at >= i {
                        tracing::warn!(
                            step = step.name,
                            variable = reference,
                            "Variable is bound by this or a later step"
                        );
                    }
                }
            }
        }
    }
}

/// Discover playbooks in a directory.
///
/// Looks in `.kira-scenario/scenarios/` and `scenarios/`. Files that fail to
/// load are skipped with a warning.
pub fn discover_scenarios(dir: &Path) -> anyhow::Result<Vec<(String, Playbook)>> {
    let mut scenarios = Vec::new();

    let hidden_dir = dir.join(".kira-scenario").join("scenarios");
    if hidden_dir.exists() {
        scenarios.extend(scan_scenario_dir(&hidden_dir)?);
    }

    let plain_dir = dir.join("scenarios");
    if plain_dir.exists() {
        scenarios.extend(scan_scenario_dir(&plain_dir)?);
    }

    Ok(scenarios)
}

/// Scan a directory for playbook files.
fn scan_scenario_dir(dir: &Path) -> anyhow::Result<Vec<(String, Playbook)>> {
    let mut scenarios = Vec::new();

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|e| e == "yaml" || e == "yml"))
        .collect();
    paths.sort();

    for path in paths {
        match load_playbook(&path) {
            Ok(playbook) => {
                let name =
                    path.file_stem().and_then(|n| n.to_str()).unwrap_or("unknown").to_string();
                scenarios.push((name, playbook));
            }
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Failed to load scenario");
            }
        }
    }

    Ok(scenarios)
}
