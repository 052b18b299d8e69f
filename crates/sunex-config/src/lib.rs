//! Layered YAML configuration for the exporter.
//!
//! Documents merge in order (later documents override earlier ones), then
//! deserialize into [`ExporterConfig`]. The sha256 hash of the canonical
//! JSON rendering is logged at run start so operators can attribute a run
//! to the exact configuration it saw. All process configuration is explicit;
//! there is no global mutable state.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;

/// Fully-resolved exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    pub device: DeviceConfig,
    #[serde(default)]
    pub recorder: RecorderConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// The inverter behind its register bridge. Defaults mirror the flags of the
/// exporter this one replaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Counter name recorded in measurements and the checkpoint
    /// (e.g. "Sunny TriPower 8.0").
    pub name: String,
    /// Base URL of the register bridge.
    pub bridge_url: String,
    #[serde(default = "default_register")]
    pub register: String,
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Toggle for the analytical store integration. Disabled runs still
    /// advance the checkpoint.
    #[serde(default = "default_true")]
    pub enable: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self { enable: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default = "default_checkpoint_path")]
    pub path: PathBuf,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: default_checkpoint_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum plausible increase per sampling window, in the counter's unit.
    #[serde(default = "default_max_delta_wh")]
    pub max_delta_wh: f64,
    /// The sampling window the bound is calibrated for.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_delta_wh: default_max_delta_wh(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_register() -> String {
    "total_wh_out".to_string()
}

fn default_unit_id() -> u8 {
    3
}

fn default_unit() -> String {
    "Wh".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("/configs/last-measurement.json")
}

fn default_max_delta_wh() -> f64 {
    10_000.0
}

fn default_window_secs() -> u64 {
    3600
}

/// Merged configuration plus its attribution hash.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config: ExporterConfig,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    // Merge YAML docs in order: earlier docs are base, later docs override.
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());

    let config: ExporterConfig =
        serde_json::from_value(merged).context("invalid exporter config")?;

    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

/// Canonical form: keys sorted recursively, compact rendering. The hash must
/// not depend on the key order of the source documents.
fn canonicalize_json(v: &Value) -> Result<String> {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).context("canonical json serialize failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
