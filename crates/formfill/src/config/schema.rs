use serde::{Deserialize, Serialize};

use crate::mapper::AliasTable;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// Directory downloaded forms are written into by the downloader.
    pub download_directory: String,
    /// Directory filled forms are written into by the filler.
    pub output_directory: String,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_adapter_timeout_secs")]
    pub adapter_timeout_secs: u64,
    /// Analysis provider hint passed to the extractors.
    #[serde(default)]
    pub analysis_provider: Option<String>,
    /// Additional alias entries merged into the built-in table.
    #[serde(default)]
    pub aliases: Vec<AliasEntry>,
}

fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_adapter_timeout_secs() -> u64 {
    60
}

/// One configured alias entry: canonical donor key plus the substrings
/// that refer to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasEntry {
    pub canonical: String,
    pub aliases: Vec<String>,
}

impl Config {
    /// Builds the alias table: built-in entries extended with the
    /// configured ones.
    pub fn alias_table(&self) -> AliasTable {
        let mut table = AliasTable::builtin();
        for entry in &self.aliases {
            table.extend_entry(&entry.canonical, entry.aliases.iter().cloned());
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply() {
        let config: Config = serde_json::from_str(
            r#"
            {
                "version": "1.0",
                "download_directory": "/downloads",
                "output_directory": "/output"
            }
            "#,
        )
        .unwrap();

        assert_eq!(config.confidence_threshold, 0.7);
        assert_eq!(config.adapter_timeout_secs, 60);
        assert!(config.analysis_provider.is_none());
        assert!(config.aliases.is_empty());
    }

    #[test]
    fn test_alias_table_extends_builtin() {
        let config: Config = serde_json::from_str(
            r#"
            {
                "version": "1.0",
                "download_directory": "/downloads",
                "output_directory": "/output",
                "aliases": [
                    { "canonical": "caseNumber", "aliases": ["case_no", "docket"] }
                ]
            }
            "#,
        )
        .unwrap();

        let table = config.alias_table();
        assert_eq!(table.canonicals_for("case_no"), vec!["caseNumber"]);
        assert_eq!(table.canonicals_for("first_name"), vec!["firstName"]);
    }
}
