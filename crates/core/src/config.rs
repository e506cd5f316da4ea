use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CfmvError, Result};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_parse<T: FromStr>(profile: &str, key: &str, default: T) -> T {
    match profiled_env_opt(profile, key) {
        Some(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparseable config value");
                default
            }
        },
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub engine: EngineConfig,
    pub io: IoConfig,
    pub imputation: ImputationConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `CFMV_PROFILE`. When set (e.g. `STRICT`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_opt("CFMV_PROFILE").unwrap_or_default().to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            engine: EngineConfig::from_env_profiled(p),
            io: IoConfig::from_env_profiled(p),
            imputation: ImputationConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  engine:      max_iterations={}, tolerance={}",
            self.engine.max_iterations,
            self.engine.tolerance
        );
        tracing::info!("  io:          delimiter={:?}", self.io.delimiter as char);
        tracing::info!("  imputation:  undefined_policy={}", self.imputation.undefined_policy);
    }

    /// JSON view of the effective configuration.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "engine": {
                "max_iterations": self.engine.max_iterations,
                "tolerance": self.engine.tolerance,
            },
            "io": { "delimiter": (self.io.delimiter as char).to_string() },
            "imputation": { "undefined_policy": self.imputation.undefined_policy.to_string() },
        })
    }
}

// ── Clustering engine ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on assign/recompute rounds before giving up on convergence.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Largest per-feature centroid move still counted as "unchanged".
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_max_iterations() -> usize { 1000 }
fn default_tolerance() -> f64 { 0.1 }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
        }
    }
}

impl EngineConfig {
    pub fn from_env_profiled(p: &str) -> Self {
        Self {
            max_iterations: profiled_env_parse(p, "CFMV_MAX_ITERATIONS", default_max_iterations()),
            tolerance: profiled_env_parse(p, "CFMV_TOLERANCE", default_tolerance()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(CfmvError::InvalidArgument(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(CfmvError::InvalidArgument(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

// ── File I/O ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoConfig {
    /// Field separator of input and output files.
    #[serde(default = "default_delimiter")]
    pub delimiter: u8,
}

fn default_delimiter() -> u8 { b',' }

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

impl IoConfig {
    pub fn from_env_profiled(p: &str) -> Self {
        let delimiter = profiled_env_opt(p, "CFMV_DELIMITER")
            .and_then(|raw| match parse_delimiter(&raw) {
                Ok(d) => Some(d),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring CFMV_DELIMITER");
                    None
                }
            })
            .unwrap_or_else(default_delimiter);
        Self { delimiter }
    }
}

/// Parse a delimiter spelled as a single ASCII character, `tab` or `\t`.
pub fn parse_delimiter(raw: &str) -> Result<u8> {
    match raw {
        "tab" | "\\t" | "\t" => return Ok(b'\t'),
        _ => {}
    }
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() && c != '"' && c != '\n' && c != '\r' => Ok(c as u8),
        _ => Err(CfmvError::InvalidArgument(format!(
            "delimiter must be a single ASCII character, got {:?}",
            raw
        ))),
    }
}

// ── Imputation ────────────────────────────────────────────────

/// What to do when every member of a cluster is missing the same feature,
/// leaving no value to average.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndefinedPolicy {
    /// Abort imputation with `CfmvError::UndefinedImputation`.
    #[default]
    Fail,
    /// Write NaN into the affected cells.
    Nan,
}

impl FromStr for UndefinedPolicy {
    type Err = CfmvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" | "error" => Ok(UndefinedPolicy::Fail),
            "nan" => Ok(UndefinedPolicy::Nan),
            other => Err(CfmvError::InvalidArgument(format!(
                "unknown undefined policy {:?} (expected fail or nan)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for UndefinedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UndefinedPolicy::Fail => write!(f, "fail"),
            UndefinedPolicy::Nan => write!(f, "nan"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImputationConfig {
    #[serde(default)]
    pub undefined_policy: UndefinedPolicy,
}

impl ImputationConfig {
    pub fn from_env_profiled(p: &str) -> Self {
        Self {
            undefined_policy: profiled_env_parse(p, "CFMV_UNDEFINED_POLICY", UndefinedPolicy::Fail),
        }
    }
}
