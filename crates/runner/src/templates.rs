//! Template table loading.
//!
//! Templates live in one YAML file mapping template name to minijinja
//! source. Syntax is validated later by the rule loader, against the rules
//! that actually reference each template.

use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};

use bookping_rules::TemplateTable;

/// Load the template table from `path`.
///
/// A missing file yields an empty table with a warning; rules referencing
/// any template then fail validation with a precise message. A present but
/// unparsable file is an error.
pub fn load_templates(path: &Path) -> anyhow::Result<TemplateTable> {
    if !path.exists() {
        warn!(path = %path.display(), "template file missing, starting with empty table");
        return Ok(TemplateTable::new());
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read templates from {}", path.display()))?;
    let table: TemplateTable = serde_yaml::from_str(&text)
        .with_context(|| format!("failed to parse templates from {}", path.display()))?;

    info!(path = %path.display(), templates = table.len(), "templates loaded");
    Ok(table)
}
