//! API service configuration.
//!
//! Read once from the process environment (after `.env` is loaded by
//! `dotenvy`), validated, then shared read-only as `Arc<Config>`.

use std::env;

use crate::error::AppError;

/// Which identity backend the handlers talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Supabase Auth (GoTrue) + PostgREST over HTTP.
    Supabase,
    /// In-process store; no Supabase needed. Local runs and tests.
    Memory,
}

/// Supabase endpoint and keys.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Gateway URL, no trailing slash.
    pub url: String,
    pub anon_key: String,
    pub service_key: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// Fully-resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_name: String,
    /// Route prefix for auth/user endpoints, e.g. `/api/v1`. No trailing slash.
    pub api_prefix: String,
    pub api_host: String,
    pub api_port: u16,
    pub cors_origins: Vec<String>,
    pub log_level: String,
    pub backend: BackendKind,
    pub supabase: SupabaseConfig,
}

impl Config {
    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

/// Load from the process environment.
pub fn load() -> Result<Config, AppError> {
    load_from(|key| env::var(key).ok())
}

/// Loader over an arbitrary lookup. Tests pass a map instead of mutating env vars.
pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, AppError> {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let backend = match get("IDENTITY_BACKEND").as_deref() {
        None | Some("supabase") => BackendKind::Supabase,
        Some("memory") => BackendKind::Memory,
        Some(other) => {
            return Err(AppError::Config(format!(
                "IDENTITY_BACKEND must be 'supabase' or 'memory', got '{other}'"
            )));
        }
    };

    let required = ["SUPABASE_URL", "SUPABASE_ANON_KEY", "SUPABASE_SERVICE_KEY"];
    if backend == BackendKind::Supabase {
        let missing: Vec<&str> = required.into_iter().filter(|k| get(*k).is_none()).collect();
        if !missing.is_empty() {
            return Err(AppError::Config(format!(
                "missing environment variables: {}",
                missing.join(", ")
            )));
        }
    }

    let api_port = parse_num::<u16>("API_PORT", get("API_PORT"), 8000)?;
    let timeout_seconds = parse_num::<u64>("SUPABASE_TIMEOUT_SECONDS", get("SUPABASE_TIMEOUT_SECONDS"), 30)?;

    let api_prefix = get("API_PREFIX").unwrap_or_else(|| "/api".to_string());
    let api_prefix = normalize_prefix(&api_prefix);

    let cors_origins = get("CORS_ORIGINS")
        .unwrap_or_else(|| "http://localhost:3000".to_string())
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    Ok(Config {
        project_name: get("PROJECT_NAME").unwrap_or_else(|| "API Backend".to_string()),
        api_prefix,
        api_host: get("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
        api_port,
        cors_origins,
        log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        backend,
        supabase: SupabaseConfig {
            url: get("SUPABASE_URL")
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            anon_key: get("SUPABASE_ANON_KEY").unwrap_or_default(),
            service_key: get("SUPABASE_SERVICE_KEY").unwrap_or_default(),
            timeout_seconds,
        },
    })
}

fn parse_num<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, AppError> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} must be a number, got '{v}'"))),
    }
}

/// `api/v1/` → `/api/v1`; `/` → `` (routes mounted at root).
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// In-memory backend, `/api/v1` prefix, no network.
#[cfg(test)]
impl Config {
    pub fn test_default() -> Self {
        Self {
            project_name: "test".into(),
            api_prefix: "/api/v1".into(),
            api_host: "127.0.0.1".into(),
            api_port: 0,
            cors_origins: vec!["http://localhost:3000".into()],
            log_level: "info".into(),
            backend: BackendKind::Memory,
            supabase: SupabaseConfig {
                url: "http://localhost:0".into(),
                anon_key: "anon".into(),
                service_key: "service".into(),
                timeout_seconds: 1,
            },
        }
    }
}
