use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::location::S3Location;

/// Athena caps a single `GetQueryResults` page at 1000 rows.
pub const MAX_RESULT_PAGE_SIZE: u32 = 1000;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Load a specific env file, e.g. from a `--env-file` flag.
pub fn load_dotenv_from(path: &str) -> Result<(), dotenvy::Error> {
    dotenvy::from_filename(path).map(|_| ())
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
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

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub aws: AwsConfig,
    pub storage: StorageConfig,
    pub athena: AthenaConfig,
    pub polling: PollingConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `PIPELINE_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("PIPELINE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            aws: AwsConfig::from_env_profiled(p),
            storage: StorageConfig::from_env_profiled(p),
            athena: AthenaConfig::from_env_profiled(p),
            polling: PollingConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// S3 prefix Athena writes its result CSVs to.
    pub fn athena_output(&self) -> S3Location {
        S3Location::new(self.storage.output_bucket.clone(), "athena-results/")
    }

    pub fn athena_output_location(&self) -> String {
        self.athena_output().to_string()
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  aws:      region={}", self.aws.region);
        tracing::info!(
            "  storage:  source={}, output={}",
            self.storage.source_bucket,
            self.storage.output_bucket
        );
        tracing::info!(
            "  athena:   table={}.{}, workgroup={}, results={}",
            self.athena.database,
            self.athena.table,
            self.athena.workgroup,
            self.athena_output_location()
        );
        tracing::info!(
            "  polling:  query_timeout={}s, ddl_timeout={}s, interval={}ms, margin={}s",
            self.polling.query_timeout_secs,
            self.polling.ddl_timeout_secs,
            self.polling.poll_interval_ms,
            self.polling.safety_margin_secs
        );
    }
}

// ── AWS ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            region: profiled_env_or(p, "AWS_REGION", "us-east-1"),
            endpoint_url: profiled_env_opt(p, "AWS_ENDPOINT_URL"),
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bucket the facility JSON files land in (and the table's LOCATION).
    pub source_bucket: String,
    /// Bucket results are republished to.
    pub output_bucket: String,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            source_bucket: profiled_env_or(p, "SOURCE_BUCKET", "medlaunch-assignment"),
            output_bucket: profiled_env_or(p, "OUTPUT_BUCKET", "medlaunch-query-output"),
        }
    }
}

// ── Athena ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthenaConfig {
    pub database: String,
    pub table: String,
    pub workgroup: String,
}

impl AthenaConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            database: profiled_env_or(p, "DATABASE_NAME", "healthcare_db"),
            table: profiled_env_or(p, "TABLE_NAME", "facilities"),
            workgroup: profiled_env_or(p, "ATHENA_WORKGROUP", "primary"),
        }
    }
}

// ── Polling ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Upper bound on waiting for the aggregation query.
    pub query_timeout_secs: u64,
    /// Upper bound on waiting for each DDL statement.
    pub ddl_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Subtracted from the host's remaining time before it caps a wait.
    pub safety_margin_secs: u64,
    pub result_page_size: u32,
}

impl PollingConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            query_timeout_secs: profiled_env_u64(p, "QUERY_TIMEOUT_SECONDS", 240),
            ddl_timeout_secs: profiled_env_u64(p, "DDL_TIMEOUT_SECONDS", 30),
            poll_interval_ms: profiled_env_u64(p, "POLL_INTERVAL_MS", 2000),
            safety_margin_secs: profiled_env_u64(p, "TIMEOUT_SAFETY_MARGIN_SECONDS", 10),
            result_page_size: profiled_env_u32(p, "RESULT_PAGE_SIZE", MAX_RESULT_PAGE_SIZE)
                .clamp(1, MAX_RESULT_PAGE_SIZE),
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn ddl_timeout(&self) -> Duration {
        Duration::from_secs(self.ddl_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn safety_margin(&self) -> Duration {
        Duration::from_secs(self.safety_margin_secs)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            query_timeout_secs: 240,
            ddl_timeout_secs: 30,
            poll_interval_ms: 2000,
            safety_margin_secs: 10,
            result_page_size: MAX_RESULT_PAGE_SIZE,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────
