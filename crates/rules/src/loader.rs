//! Filesystem rule loader with load-time validation.
//!
//! Rules live as `*.yml`/`*.yaml` files in a directory; files are read in
//! sorted filename order and their rule lists concatenated, so rule order is
//! deterministic across runs. Any parse or validation error fails the whole
//! load — a run never starts with a partially understood configuration.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::info;

use bookping_notify::{ChannelSet, TemplateRenderer};

use crate::schema::{ActionSpec, RuleDefinition, RuleFile};
use crate::TemplateTable;

/// Errors from loading or validating rule files.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid rule configuration: {0}")]
    Validation(String),
}

/// Load every rule file under `dir`, validating all channel and template
/// references so a typo fails here instead of mid-run.
///
/// Returns rules in file order (files sorted by name, rules in document
/// order within each file). Disabled rules are kept; the engine skips them.
pub fn load_rules(
    dir: &Path,
    channels: &ChannelSet,
    templates: &TemplateTable,
) -> Result<Vec<RuleDefinition>, RuleError> {
    let mut paths = rule_file_paths(dir)?;
    paths.sort();

    let mut rules = Vec::new();
    for path in &paths {
        let text = std::fs::read_to_string(path).map_err(|source| RuleError::Io {
            path: path.clone(),
            source,
        })?;
        let file: RuleFile = serde_yaml::from_str(&text).map_err(|source| RuleError::Parse {
            path: path.clone(),
            source,
        })?;
        rules.extend(file.rules);
    }

    validate(&rules, channels, templates)?;

    info!(
        dir = %dir.display(),
        files = paths.len(),
        rules = rules.len(),
        "rules loaded"
    );
    Ok(rules)
}

fn rule_file_paths(dir: &Path) -> Result<Vec<PathBuf>, RuleError> {
    let entries = std::fs::read_dir(dir).map_err(|source| RuleError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| RuleError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        // Skip editor droppings and anything that isn't a YAML file.
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'))
        {
            continue;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml") | Some("yaml") => paths.push(path),
            _ => continue,
        }
    }
    Ok(paths)
}

fn validate(
    rules: &[RuleDefinition],
    channels: &ChannelSet,
    templates: &TemplateTable,
) -> Result<(), RuleError> {
    let renderer = TemplateRenderer::new();

    let mut seen = HashSet::new();
    for rule in rules {
        if !seen.insert(rule.name.as_str()) {
            return Err(RuleError::Validation(format!(
                "duplicate rule name '{}'",
                rule.name
            )));
        }

        if rule.actions.is_empty() {
            return Err(RuleError::Validation(format!(
                "rule '{}' has no actions",
                rule.name
            )));
        }

        for action in &rule.actions {
            let ActionSpec::SendNotification {
                channel, template, ..
            } = action
            else {
                continue;
            };

            if !channels.contains(channel) {
                return Err(RuleError::Validation(format!(
                    "rule '{}' references unknown channel '{}' (known: {})",
                    rule.name,
                    channel,
                    channels.names().join(", ")
                )));
            }

            let Some(source) = templates.get(template) else {
                return Err(RuleError::Validation(format!(
                    "rule '{}' references unknown template '{}'",
                    rule.name, template
                )));
            };
            renderer.validate(source).map_err(|e| {
                RuleError::Validation(format!(
                    "rule '{}': template '{}' is invalid: {e}",
                    rule.name, template
                ))
            })?;
        }
    }
    Ok(())
}
