//! Environment bootstrap: one-shot generator run before the stack starts.
//!
//! Sequence (see [`run`]):
//!   1. Load `.setup/.env.config` (fatal if missing; nothing written yet)
//!   2. Check the Supabase env template exists (fatal; nothing written yet)
//!   3. Generate the [`SecretBundle`]
//!   4. Write `frontend/.env.local` and `backend/.env`
//!   5. Rewrite `supabase/.env` in place
//!   6. Rename services in `supabase/docker-compose*.yml` (skipped if absent)
//!   7. Replace the `# Generated keys` block in `.setup/.env.config`
//!
//! Every write replaces the whole file through a temp file in the same
//! directory. A failure part way leaves earlier files updated; re-running is
//! safe and rotates all secrets again.

pub mod compose;
pub mod env_config;
pub mod rewrite;
pub mod secrets;
pub mod section;
pub mod targets;

use std::{
    fmt, fs,
    io::{self, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use thiserror::Error;
use tracing::{debug, info, warn};

use compose::ComposeNaming;
use env_config::EnvConfig;
use secrets::SecretBundle;
use targets::Endpoints;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("cannot read {}: {source}", path.display())]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("required template missing: {}", .0.display())]
    MissingTemplate(PathBuf),

    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("cannot write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("usage: {0}")]
    Usage(String),
}

// ── Deployment mode ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeploymentMode {
    #[default]
    Development,
    Production,
}

impl FromStr for DeploymentMode {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(BootstrapError::Usage(format!(
                "unknown deployment mode '{other}' (expected 'development' or 'production')"
            ))),
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Development => "development",
            Self::Production => "production",
        })
    }
}

// ── File layout ───────────────────────────────────────────────────────────────

/// Locations of every file the generator reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub config: PathBuf,
    pub frontend_env: PathBuf,
    pub backend_env: PathBuf,
    pub supabase_env: PathBuf,
    pub compose: PathBuf,
    pub compose_s3: PathBuf,
}

impl Layout {
    /// Conventional layout of a project checkout rooted at `root`.
    pub fn under(root: &Path) -> Self {
        Self {
            config: root.join(".setup/.env.config"),
            frontend_env: root.join("frontend/.env.local"),
            backend_env: root.join("backend/.env"),
            supabase_env: root.join("supabase/.env"),
            compose: root.join("supabase/docker-compose.yml"),
            compose_s3: root.join("supabase/docker-compose.s3.yml"),
        }
    }
}

// ── Report ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub mode: DeploymentMode,
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub endpoints: Option<Endpoints>,
}

// ── Runner ────────────────────────────────────────────────────────────────────

/// Run the whole generator with the current wall-clock time.
pub fn run(layout: &Layout, mode: DeploymentMode) -> Result<Report, BootstrapError> {
    run_at(layout, mode, chrono::Utc::now().timestamp())
}

/// [`run`] with an explicit token issue time (unix seconds).
pub fn run_at(layout: &Layout, mode: DeploymentMode, now: i64) -> Result<Report, BootstrapError> {
    info!(%mode, config = %layout.config.display(), "bootstrap starting");

    let cfg = EnvConfig::load(&layout.config)?;
    debug!(keys = cfg.len(), "config parsed");

    if !layout.supabase_env.exists() {
        return Err(BootstrapError::MissingTemplate(layout.supabase_env.clone()));
    }
    let naming: ComposeNaming = cfg.get_or("COMPOSE_NAMING", "prefix").parse()?;

    let bundle = SecretBundle::generate(now)?;
    let endpoints = Endpoints::resolve(mode, &cfg);
    let mut report = Report { mode, ..Report::default() };

    write_file(&layout.frontend_env, &targets::frontend_env(&cfg, &endpoints))?;
    report.written.push(layout.frontend_env.clone());

    write_file(&layout.backend_env, &targets::backend_env(&cfg, &endpoints, &bundle))?;
    report.written.push(layout.backend_env.clone());

    update_supabase_env(&layout.supabase_env, &cfg, &endpoints, &bundle)?;
    report.written.push(layout.supabase_env.clone());

    let slug = compose::slugify(&targets::project_name(&cfg));
    for descriptor in [&layout.compose, &layout.compose_s3] {
        if rename_services(descriptor, &slug, naming)? {
            report.written.push(descriptor.clone());
        } else {
            report.skipped.push(descriptor.clone());
        }
    }

    let source = read_file(&layout.config)?;
    write_file(&layout.config, &section::replace_generated_section(&source, &bundle))?;
    report.written.push(layout.config.clone());

    info!(%mode, written = report.written.len(), skipped = report.skipped.len(), "bootstrap finished");
    report.endpoints = Some(endpoints);
    Ok(report)
}

fn update_supabase_env(
    path: &Path,
    cfg: &EnvConfig,
    endpoints: &Endpoints,
    bundle: &SecretBundle,
) -> Result<(), BootstrapError> {
    let current = read_file(path)?;
    let rules = targets::supabase_replacements(cfg, endpoints, bundle);
    let rewritten = rewrite::apply(&current, &rules);
    for key in &rewritten.skipped {
        debug!(%key, path = %path.display(), "key not present in template, skipped");
    }
    write_file(path, &rewritten.text)
}

/// Returns `false` when the descriptor does not exist.
fn rename_services(path: &Path, slug: &str, naming: ComposeNaming) -> Result<bool, BootstrapError> {
    if !path.exists() {
        warn!(path = %path.display(), "compose descriptor not found, skipping");
        return Ok(false);
    }
    let current = read_file(path)?;
    write_file(path, &compose::rewrite(&current, slug, naming))?;
    info!(path = %path.display(), %slug, %naming, "compose services renamed");
    Ok(true)
}

fn read_file(path: &Path) -> Result<String, BootstrapError> {
    fs::read_to_string(path).map_err(|source| BootstrapError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace `path` with `content` via a temp file + rename in the same directory.
/// Missing parent directories are created.
pub fn write_file(path: &Path, content: &str) -> Result<(), BootstrapError> {
    let write_err = |source: io::Error| BootstrapError::Write { path: path.to_path_buf(), source };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(content.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    debug!(path = %path.display(), bytes = content.len(), "file written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn mode_parses_long_and_short_names() {
        assert_eq!("development".parse::<DeploymentMode>().unwrap(), DeploymentMode::Development);
        assert_eq!("prod".parse::<DeploymentMode>().unwrap(), DeploymentMode::Production);
        assert_eq!("PRODUCTION".parse::<DeploymentMode>().unwrap(), DeploymentMode::Production);
    }

    #[test]
    fn unknown_mode_is_usage_error() {
        let err = "staging".parse::<DeploymentMode>().unwrap_err();
        assert!(matches!(err, BootstrapError::Usage(_)));
        assert!(err.to_string().contains("staging"));
    }

    #[test]
    fn layout_uses_conventional_paths() {
        let layout = Layout::under(Path::new("/srv/app"));
        assert_eq!(layout.config, PathBuf::from("/srv/app/.setup/.env.config"));
        assert_eq!(layout.frontend_env, PathBuf::from("/srv/app/frontend/.env.local"));
        assert_eq!(layout.supabase_env, PathBuf::from("/srv/app/supabase/.env"));
    }

    #[test]
    fn write_file_creates_parents_and_replaces() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/.env");
        write_file(&path, "A=1\n").unwrap();
        write_file(&path, "A=2\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "A=2\n");
        // Only the target remains; the temp file was renamed over it.
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn missing_config_fails_before_any_write() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::under(tmp.path());
        let err = run(&layout, DeploymentMode::Development).unwrap_err();
        assert!(matches!(err, BootstrapError::ConfigNotFound(_)));
        assert!(!layout.frontend_env.exists());
    }

    #[test]
    fn missing_supabase_template_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::under(tmp.path());
        write_file(&layout.config, "PROJECT_NAME=Demo\n").unwrap();
        let err = run(&layout, DeploymentMode::Development).unwrap_err();
        assert!(matches!(err, BootstrapError::MissingTemplate(_)));
        assert!(!layout.backend_env.exists());
    }

    #[test]
    fn bad_compose_naming_fails_before_any_write() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::under(tmp.path());
        write_file(&layout.config, "COMPOSE_NAMING=fancy\n").unwrap();
        write_file(&layout.supabase_env, "JWT_SECRET=x\n").unwrap();
        assert!(matches!(
            run(&layout, DeploymentMode::Development),
            Err(BootstrapError::Usage(_))
        ));
        assert!(!layout.frontend_env.exists());
    }
}
