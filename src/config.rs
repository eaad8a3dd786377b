use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub jurisdiction: JurisdictionConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_tool_call_limit() -> u32 {
    5
}

fn default_confidence_finalize_threshold() -> u8 {
    80
}

fn default_retry_limit() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_call_timeout_ms() -> u64 {
    30_000
}

fn default_session_budget_ms() -> u64 {
    300_000
}

fn default_max_rejected_requests() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_tool_call_limit")]
    pub tool_call_limit: u32,
    #[serde(default = "default_confidence_finalize_threshold")]
    pub confidence_finalize_threshold: u8,
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    #[serde(default = "default_session_budget_ms")]
    pub session_budget_ms: u64,
    #[serde(default = "default_max_rejected_requests")]
    pub max_rejected_requests: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            tool_call_limit: default_tool_call_limit(),
            confidence_finalize_threshold: default_confidence_finalize_threshold(),
            retry_limit: default_retry_limit(),
            retry_backoff_ms: default_retry_backoff_ms(),
            call_timeout_ms: default_call_timeout_ms(),
            session_budget_ms: default_session_budget_ms(),
            max_rejected_requests: default_max_rejected_requests(),
        }
    }
}

fn default_conservative_factor() -> f64 {
    10.0
}

fn default_field_weights() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("settlement_value".to_string(), 3.0),
        ("case_outcome".to_string(), 2.0),
        ("injuries_described".to_string(), 2.0),
        ("incident_date".to_string(), 1.5),
        ("case_type".to_string(), 1.0),
        ("jurisdiction".to_string(), 1.0),
        ("summary".to_string(), 1.0),
        ("key_phrases".to_string(), 0.5),
        ("source".to_string(), 0.5),
    ])
}

fn default_recency_bands() -> Vec<RecencyBand> {
    vec![
        RecencyBand {
            max_age_years: 1.0,
            multiplier: 1.0,
        },
        RecencyBand {
            max_age_years: 3.0,
            multiplier: 0.8,
        },
        RecencyBand {
            max_age_years: 5.0,
            multiplier: 0.6,
        },
    ]
}

fn default_recency_fallback_multiplier() -> f64 {
    0.4
}

fn default_default_case_age_years() -> f64 {
    5.0
}

fn default_table_path() -> PathBuf {
    PathBuf::from("./state/jurisdictions.json")
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ModifierBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for ModifierBounds {
    fn default() -> Self {
        Self { min: 0.8, max: 1.15 }
    }
}

/// One step of the recency weighting ladder. Bands are evaluated in order;
/// the first band whose `max_age_years` is at or above the case age wins.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RecencyBand {
    pub max_age_years: f64,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JurisdictionConfig {
    #[serde(default = "default_conservative_factor")]
    pub conservative_factor: f64,
    #[serde(default = "default_field_weights")]
    pub field_weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub modifier_bounds: ModifierBounds,
    #[serde(default = "default_recency_bands")]
    pub recency_bands: Vec<RecencyBand>,
    #[serde(default = "default_recency_fallback_multiplier")]
    pub recency_fallback_multiplier: f64,
    #[serde(default = "default_default_case_age_years")]
    pub default_case_age_years: f64,
    #[serde(default = "default_table_path")]
    pub table_path: PathBuf,
}

impl Default for JurisdictionConfig {
    fn default() -> Self {
        Self {
            conservative_factor: default_conservative_factor(),
            field_weights: default_field_weights(),
            modifier_bounds: ModifierBounds::default(),
            recency_bands: default_recency_bands(),
            recency_fallback_multiplier: default_recency_fallback_multiplier(),
            default_case_age_years: default_default_case_age_years(),
            table_path: default_table_path(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./state/cache")
}

fn default_partition_count() -> u32 {
    8
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_partition_count")]
    pub partition_count: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            partition_count: default_partition_count(),
        }
    }
}

fn default_enabled_true() -> bool {
    true
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs/lexscore")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema_path = resolve_schema_path(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema_path)?;

        let mut config: Config =
            serde_json::from_value(config_value).context("failed to deserialize config")?;

        if !config.cache.dir.is_absolute() {
            config.cache.dir = config_base.join(&config.cache.dir);
        }
        if !config.jurisdiction.table_path.is_absolute() {
            config.jurisdiction.table_path = config_base.join(&config.jurisdiction.table_path);
        }

        Ok(config)
    }
}

fn resolve_schema_path(config_base: &Path, config_value: &Value) -> Result<PathBuf> {
    if let Some(path_text) = config_value.get("$schema").and_then(|value| value.as_str()) {
        let configured = PathBuf::from(path_text);
        if configured.is_absolute() {
            return Ok(configured);
        }
        return Ok(config_base.join(&configured));
    }

    let local_default = config_base.join("lexscore.schema.json");
    if local_default.exists() {
        return Ok(local_default);
    }

    Err(anyhow!(
        "unable to resolve schema path: expected $schema in config or lexscore.schema.json beside it"
    ))
}

fn validate_against_schema(config_value: &Value, schema_path: &Path) -> Result<()> {
    let schema_content = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    let schema: Value = serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))?;

    let compiled =
        JSONSchema::compile(&schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    match compiled.validate(config_value) {
        Ok(()) => Ok(()),
        Err(errors_iter) => {
            let validation_errors: Vec<ValidationError> = errors_iter.collect();
            let messages: Vec<String> = validation_errors
                .into_iter()
                .map(|error| error.to_string())
                .collect();
            Err(anyhow!("config validation failed: {}", messages.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use uuid::Uuid;

    use super::{Config, JurisdictionConfig, LoggingRotation, ScoringConfig};

    #[test]
    fn scoring_defaults_match_contract() {
        let config = ScoringConfig::default();
        assert_eq!(config.tool_call_limit, 5);
        assert_eq!(config.confidence_finalize_threshold, 80);
        assert_eq!(config.retry_limit, 2);
        assert_eq!(config.max_rejected_requests, 3);
    }

    #[test]
    fn jurisdiction_defaults_weight_settlement_highest() {
        let config = JurisdictionConfig::default();
        assert_eq!(config.conservative_factor, 10.0);
        assert_eq!(config.modifier_bounds.min, 0.8);
        assert_eq!(config.modifier_bounds.max, 1.15);
        let settlement = config.field_weights["settlement_value"];
        assert!(
            config
                .field_weights
                .iter()
                .all(|(field, weight)| field == "settlement_value" || *weight < settlement)
        );
    }

    #[test]
    fn config_load_applies_defaults_and_reroots_paths() {
        let work_dir = std::env::temp_dir().join(format!("lexscore-config-test-{}", Uuid::now_v7()));
        fs::create_dir_all(&work_dir).expect("temp work dir should be created");

        let config_path = work_dir.join("lexscore.jsonc");
        let schema_path =
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("lexscore.schema.json");
        let config_text = format!(
            r#"{{
  "$schema": "{}",
  // comments are allowed
  "scoring": {{
    "tool_call_limit": 3
  }}
}}"#,
            schema_path.display(),
        );
        fs::write(&config_path, config_text).expect("config should be written");

        let config = Config::load(&config_path).expect("config should load");
        assert_eq!(config.scoring.tool_call_limit, 3);
        assert_eq!(config.scoring.confidence_finalize_threshold, 80);
        assert_eq!(config.logging.rotation, LoggingRotation::Daily);
        assert!(config.cache.dir.is_absolute());
        assert!(config.jurisdiction.table_path.is_absolute());
        assert!(config.cache.dir.starts_with(&work_dir));

        let _ = fs::remove_file(&config_path);
        let _ = fs::remove_dir(&work_dir);
    }

    #[test]
    fn config_load_rejects_zero_tool_call_limit() {
        let work_dir = std::env::temp_dir().join(format!("lexscore-config-test-{}", Uuid::now_v7()));
        fs::create_dir_all(&work_dir).expect("temp work dir should be created");

        let config_path = work_dir.join("lexscore.jsonc");
        let schema_path =
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("lexscore.schema.json");
        let config_text = format!(
            r#"{{
  "$schema": "{}",
  "scoring": {{
    "tool_call_limit": 0
  }}
}}"#,
            schema_path.display(),
        );
        fs::write(&config_path, config_text).expect("config should be written");

        let err = Config::load(&config_path).expect_err("tool_call_limit=0 should fail schema");
        assert!(err.to_string().contains("minimum"), "unexpected error: {err}");

        let _ = fs::remove_file(&config_path);
        let _ = fs::remove_dir(&work_dir);
    }

    #[test]
    fn config_load_rejects_unknown_top_level_fields() {
        let work_dir = std::env::temp_dir().join(format!("lexscore-config-test-{}", Uuid::now_v7()));
        fs::create_dir_all(&work_dir).expect("temp work dir should be created");

        let config_path = work_dir.join("lexscore.jsonc");
        let schema_path =
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("lexscore.schema.json");
        let config_text = format!(
            r#"{{
  "$schema": "{}",
  "scorring": {{}}
}}"#,
            schema_path.display(),
        );
        fs::write(&config_path, config_text).expect("config should be written");

        let err = Config::load(&config_path).expect_err("unknown field should fail schema");
        assert!(
            err.to_string().contains("Additional properties"),
            "unexpected error: {err}",
        );

        let _ = fs::remove_file(&config_path);
        let _ = fs::remove_dir(&work_dir);
    }
}
