use crate::dashboard::DashboardParams;
use crate::efficiency::DEFAULT_EXPORT_NAME;
use crate::errors::ConfigError;
use crate::model::{FactorConfig, Outcome};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;
pub const DEFAULT_CONFIG_FILE: &str = "promptlab.yaml";
pub const DEFAULT_DATA_FILE: &str = "causal_prompt_results.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_data")]
    pub data: PathBuf,
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub selection: FactorConfig,
    #[serde(default)]
    pub export: ExportSettings,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            data: default_data(),
            display: DisplaySettings::default(),
            selection: FactorConfig::default(),
            export: ExportSettings::default(),
        }
    }
}

impl LabConfig {
    pub fn params(&self) -> DashboardParams {
        DashboardParams {
            metric: self.display.metric,
            show_labels: self.display.show_labels,
            selection: self.selection,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplaySettings {
    #[serde(default)]
    pub metric: Outcome,
    #[serde(default)]
    pub show_labels: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    #[serde(default = "default_export_name")]
    pub file_name: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            file_name: default_export_name(),
        }
    }
}

fn default_version() -> u32 {
    SUPPORTED_CONFIG_VERSION
}

fn default_data() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_FILE)
}

fn default_export_name() -> String {
    DEFAULT_EXPORT_NAME.to_string()
}

pub fn load_config(path: &Path, strict: bool) -> Result<LabConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    let mut cfg = parse_config(&raw, strict)
        .map_err(|e| ConfigError(format!("{} (file: {})", e.0, path.display())))?;

    // Relative data paths are resolved against the config file's directory.
    if cfg.data.is_relative() {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            cfg.data = dir.join(&cfg.data);
        }
    }

    tracing::info!(
        event = "config_loaded",
        path = %path.display(),
        data = %cfg.data.display(),
        metric = %cfg.display.metric,
    );
    Ok(cfg)
}

pub fn parse_config(raw: &str, strict: bool) -> Result<LabConfig, ConfigError> {
    let mut ignored_keys = std::collections::BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(raw);

    let cfg: LabConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    let meaningful: Vec<_> = ignored_keys
        .iter()
        .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
        .collect();
    if !meaningful.is_empty() {
        if strict {
            return Err(ConfigError(format!(
                "unknown fields detected in strict mode: {:?}",
                meaningful
            )));
        }
        tracing::warn!(event = "config_unknown_fields", fields = ?meaningful);
    }

    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }

    Ok(cfg)
}

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(
        path,
        r#"version: 1
data: causal_prompt_results.csv
display:
  metric: correct        # correct | total_tokens | latency
  show_labels: false
selection:
  cot: 0
  fewshot: 0
  role: 0
  constraint: 0
export:
  file_name: efficiency_results.csv
"#,
    )
    .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_empty_document() {
        let cfg = parse_config("version: 1\n", true).unwrap();
        assert_eq!(cfg, LabConfig::default());
        assert_eq!(cfg.export.file_name, "efficiency_results.csv");
    }

    #[test]
    fn parses_selection_and_display() {
        let cfg = parse_config(
            "version: 1\ndisplay:\n  metric: latency\n  show_labels: true\nselection:\n  cot: 1\n  fewshot: 0\n  role: 1\n  constraint: 0\n",
            true,
        )
        .unwrap();
        let p = cfg.params();
        assert_eq!(p.metric, Outcome::Latency);
        assert!(p.show_labels);
        assert_eq!(p.selection, FactorConfig::new(true, false, true, false));
    }

    #[test]
    fn unknown_keys_fail_only_in_strict_mode() {
        let raw = "version: 1\ncolour: blue\n";
        assert!(parse_config(raw, false).is_ok());
        let err = parse_config(raw, true).unwrap_err();
        assert!(err.0.contains("colour"));
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = parse_config("version: 7\n", false).unwrap_err();
        assert!(err.to_string().contains("unsupported config version 7"));
    }

    #[test]
    fn rejects_non_binary_selection() {
        assert!(parse_config("version: 1\nselection:\n  cot: 3\n", false).is_err());
    }

    #[test]
    fn sample_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        write_sample_config(&path).unwrap();
        let cfg = load_config(&path, true).unwrap();
        assert_eq!(cfg.data, dir.path().join(DEFAULT_DATA_FILE));
        assert_eq!(cfg.selection, FactorConfig::default());
        assert_eq!(cfg, LabConfig { data: cfg.data.clone(), ..LabConfig::default() });
    }

    #[test]
    fn serialises_plain_version_key() {
        let yaml = serde_yaml::to_string(&LabConfig::default()).unwrap();
        assert!(yaml.starts_with("version: 1\n"), "{}", yaml);
        assert!(!yaml.contains("configVersion"));
        assert_eq!(parse_config(&yaml, true).unwrap(), LabConfig::default());
    }
}
