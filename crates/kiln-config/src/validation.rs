//! Structural checks run once after the config is extracted.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::KilnConfig;
use crate::error::{ConfigError, Result};

pub fn validate(config: &KilnConfig) -> Result<()> {
    if config.targets.is_empty() {
        return Err(ConfigError::NoTargets);
    }

    if config.workspace.namespace.trim().is_empty() {
        return Err(invalid(
            "workspace.namespace",
            "set the scope shared by internal packages, e.g. \"@kiln\"",
        ));
    }

    if config.workspace.alias_token.trim().is_empty() {
        return Err(invalid(
            "workspace.alias_token",
            "an empty alias token would rewrite every character",
        ));
    }

    if config.paths.source_extension.trim().is_empty() {
        return Err(invalid("paths.source_extension", "e.g. \"ts\""));
    }

    let mut seen: HashMap<PathBuf, &str> = HashMap::new();
    for (id, target) in &config.targets {
        if id.trim().is_empty() || id.contains(char::is_whitespace) {
            return Err(invalid("targets", "target ids must be non-empty words"));
        }
        if target.extension.is_empty() || target.extension.starts_with('.') {
            return Err(invalid(
                &format!("targets.{id}.extension"),
                "give the extension without a leading dot",
            ));
        }
        if let Some(first) = seen.insert(target.output_dir.clone(), id) {
            return Err(ConfigError::DuplicateOutputDir {
                first: first.to_string(),
                second: id.clone(),
                dir: target.output_dir.clone(),
            });
        }
    }

    Ok(())
}

fn invalid(field: &str, hint: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        hint: Some(hint.to_string()),
    }
}
