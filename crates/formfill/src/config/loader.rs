use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Validate version
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.download_directory.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "download_directory must not be empty".to_string(),
        });
    }
    if config.output_directory.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "output_directory must not be empty".to_string(),
        });
    }

    if !(0.0..=1.0).contains(&config.confidence_threshold) {
        return Err(ConfigError::Validation {
            message: format!(
                "confidence_threshold {} is outside [0.0, 1.0]",
                config.confidence_threshold
            ),
        });
    }

    if config.adapter_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "adapter_timeout_secs must be greater than zero".to_string(),
        });
    }

    // Validate alias entries
    let mut canonicals = std::collections::HashSet::new();
    for entry in &config.aliases {
        if entry.canonical.trim().is_empty() {
            return Err(ConfigError::InvalidAlias {
                canonical: entry.canonical.clone(),
                reason: "Canonical key must not be empty".to_string(),
            });
        }
        if !canonicals.insert(&entry.canonical) {
            return Err(ConfigError::InvalidAlias {
                canonical: entry.canonical.clone(),
                reason: "Duplicate canonical key".to_string(),
            });
        }
        if entry.aliases.is_empty() {
            return Err(ConfigError::InvalidAlias {
                canonical: entry.canonical.clone(),
                reason: "Entry must list at least one alias".to_string(),
            });
        }
        if entry.aliases.iter().any(|alias| alias.trim().is_empty()) {
            return Err(ConfigError::InvalidAlias {
                canonical: entry.canonical.clone(),
                reason: "Aliases must not be empty".to_string(),
            });
        }
    }

    Ok(())
}
