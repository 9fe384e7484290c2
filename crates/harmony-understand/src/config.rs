//! Configuration loading for the harmony pipeline.
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/harmony/config.toml` (system)
//! 2. `~/.config/harmony/config.toml` (user)
//! 3. `./harmony.toml` (local override), or an explicit path
//! 4. Environment variables (`HARMONY_*`, `RUST_LOG`)
//!
//! Files are merged table by table, so each only needs the keys it changes:
//!
//! ```toml
//! [consolidation]
//! max_simultaneous = 3
//!
//! [progressions]
//! weirdness = 0.4
//!
//! [telemetry]
//! log_level = "debug"
//! ```

use std::env;
use std::path::{Path, PathBuf};

use note_analysis::{ConsolidationParams, OnsetParams};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chords::ChordParams;
use crate::features::FeatureParams;
use crate::key::KeyWeights;
use crate::progressions::ProgressionParams;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive for the binary's subscriber
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Every tunable parameter of the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonyConfig {
    pub consolidation: ConsolidationParams,
    pub onsets: OnsetParams,
    pub features: FeatureParams,
    pub key: KeyWeights,
    pub chords: ChordParams,
    pub progressions: ProgressionParams,
    pub telemetry: TelemetryConfig,
}

impl HarmonyConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load with an explicit file replacing `./harmony.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and report which files and variables contributed.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let files = discover_config_files_with_override(config_path);
        let (mut config, mut sources) = Self::load_files(&files)?;
        apply_env_overrides(&mut config, &mut sources, |key| env::var(key).ok());
        Ok((config, sources))
    }

    /// Merge the given files over the compiled defaults, without env overrides.
    pub fn load_files(paths: &[PathBuf]) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in paths {
            let table = load_table(path)?;
            merge_tables(&mut merged, table);
            sources.files.push(path.clone());
        }

        let origin = paths.last().cloned().unwrap_or_default();
        let config = parse_table(merged, &origin)?;
        Ok((config, sources))
    }

    /// Parse a single TOML document over the compiled defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let path = PathBuf::from("<inline>");
        parse_table(parse_toml(contents, &path)?, &path)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::from("# Harmony Configuration\n\n");
        match toml::to_string_pretty(self) {
            Ok(body) => output.push_str(&body),
            Err(e) => output.push_str(&format!("# failed to render configuration: {e}\n")),
        }
        output
    }
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/harmony/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("harmony/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("harmony.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let table = parse_toml(&contents, path)?;
    // Reject bad values here so the error names the file that carries them.
    parse_table(table.clone(), path)?;
    Ok(table)
}

fn parse_toml(contents: &str, path: &Path) -> Result<toml::Table, ConfigError> {
    contents
        .parse()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

fn parse_table(table: toml::Table, path: &Path) -> Result<HarmonyConfig, ConfigError> {
    toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Recursively merge `overlay` into `base`; nested tables merge key by key.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Apply environment variable overrides to config.
///
/// `lookup` returns the value of a variable, if set.
pub fn apply_env_overrides(
    config: &mut HarmonyConfig,
    sources: &mut ConfigSources,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = lookup("HARMONY_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("HARMONY_LOG_LEVEL".to_string());
    }
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
    if let Some(w) = lookup("HARMONY_WEIRDNESS").and_then(|v| v.parse::<f64>().ok()) {
        config.progressions.weirdness = w.clamp(0.0, 1.0);
        sources.env_overrides.push("HARMONY_WEIRDNESS".to_string());
    }
    if let Some(n) = lookup("HARMONY_MAX_POLYPHONY").and_then(|v| v.parse::<usize>().ok()) {
        config.consolidation.max_simultaneous = n;
        sources.env_overrides.push("HARMONY_MAX_POLYPHONY".to_string());
    }
    if let Some(gap) = lookup("HARMONY_MERGE_GAP").and_then(|v| v.parse::<f64>().ok()) {
        config.consolidation.merge_gap = gap;
        sources.env_overrides.push("HARMONY_MERGE_GAP".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = HarmonyConfig::default();
        assert_eq!(config.consolidation.max_simultaneous, 4);
        assert_eq!(config.key.top_n, 8);
        assert_eq!(config.chords.support_weight, 0.7);
        assert_eq!(config.telemetry.log_level, "info");
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = HarmonyConfig::default();
        let rendered = config.to_toml();
        assert!(rendered.contains("[consolidation]"));
        assert!(rendered.contains("[progressions]"));
        assert_eq!(HarmonyConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = HarmonyConfig::from_toml_str("[key]\ntop_n = 5\n").unwrap();
        assert_eq!(config.key.top_n, 5);
        assert_eq!(config.key.in_scale, KeyWeights::default().in_scale);
        assert_eq!(config.onsets, OnsetParams::default());
    }

    #[test]
    fn test_files_merge_table_by_table() {
        let dir = tempfile::tempdir().unwrap();
        let system = write_config(
            &dir,
            "system.toml",
            "[consolidation]\nmax_simultaneous = 2\nmerge_gap = 0.2\n",
        );
        let local = write_config(&dir, "local.toml", "[consolidation]\nmerge_gap = 0.1\n");

        let (config, sources) = HarmonyConfig::load_files(&[system.clone(), local.clone()]).unwrap();
        assert_eq!(config.consolidation.max_simultaneous, 2);
        assert_eq!(config.consolidation.merge_gap, 0.1);
        assert_eq!(sources.files, vec![system, local]);
    }

    #[test]
    fn test_bad_value_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write_config(&dir, "bad.toml", "[key]\ntop_n = \"many\"\n");
        let err = HarmonyConfig::load_files(&[bad.clone()]).unwrap_err();
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, bad),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            HarmonyConfig::load_files(&[missing]),
            Err(ConfigError::FileRead { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("HARMONY_WEIRDNESS", "1.7"),
            ("HARMONY_MAX_POLYPHONY", "3"),
            ("HARMONY_MERGE_GAP", "not-a-number"),
            ("RUST_LOG", "harmony_understand=debug"),
        ]
        .into_iter()
        .collect();

        let mut config = HarmonyConfig::default();
        let mut sources = ConfigSources::default();
        apply_env_overrides(&mut config, &mut sources, |k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.progressions.weirdness, 1.0);
        assert_eq!(config.consolidation.max_simultaneous, 3);
        assert_eq!(config.consolidation.merge_gap, 0.15);
        assert_eq!(config.telemetry.log_level, "harmony_understand=debug");
        assert_eq!(
            sources.env_overrides,
            vec!["RUST_LOG", "HARMONY_WEIRDNESS", "HARMONY_MAX_POLYPHONY"]
        );
    }

    #[test]
    fn test_cli_path_replaces_local() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = write_config(&dir, "explicit.toml", "");
        let files = discover_config_files_with_override(Some(&explicit));
        assert_eq!(files.last(), Some(&explicit));
    }
}
