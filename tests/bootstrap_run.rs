//! End-to-end generator runs against a temporary project tree.

use std::fs;
use std::path::Path;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use supakit::bootstrap::{self, BootstrapError, DeploymentMode, Layout, env_config::EnvConfig};
use supakit::bootstrap::secrets::RoleClaims;
use tempfile::TempDir;

const SUPABASE_TEMPLATE: &str = "\
############
# Secrets
############

POSTGRES_PASSWORD=your-super-secret-and-long-postgres-password
JWT_SECRET=your-super-secret-jwt-token-with-at-least-32-characters-long
ANON_KEY=eyJhbGciOiJIUzI1NiJ9.old.anon
SERVICE_ROLE_KEY=eyJhbGciOiJIUzI1NiJ9.old.service
DASHBOARD_USERNAME=supabase
DASHBOARD_PASSWORD=this_password_is_insecure_and_should_be_updated
SECRET_KEY_BASE=old-base
VAULT_ENC_KEY=old-vault

POSTGRES_HOST=db
POSTGRES_PORT=5432
KONG_HTTP_PORT=8000
KONG_HTTPS_PORT=8443
POOLER_PROXY_PORT_TRANSACTION=6543
STUDIO_PORT=3000
SITE_URL=http://localhost:3000
ADDITIONAL_REDIRECT_URLS=
API_EXTERNAL_URL=http://localhost:8000
SUPABASE_PUBLIC_URL=http://localhost:8000
ENABLE_EMAIL_AUTOCONFIRM=false
";

const COMPOSE: &str = "\
name: supabase

services:
  studio:
    container_name: supabase-studio
  db:
    container_name: supabase-db
";

fn project(config: &str) -> (TempDir, Layout) {
    let tmp = TempDir::new().unwrap();
    let layout = Layout::under(tmp.path());
    write(&layout.config, config);
    write(&layout.supabase_env, SUPABASE_TEMPLATE);
    (tmp, layout)
}

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn read_env(path: &Path) -> EnvConfig {
    EnvConfig::load(path).unwrap()
}

fn verify(token: &str, secret: &str) -> RoleClaims {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&["supabase"]);
    decode::<RoleClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .unwrap()
        .claims
}

#[test]
fn development_run_writes_consistent_files() {
    let (_tmp, layout) = project("# Project\nPROJECT_NAME=\"Acme Corp\"\n");
    write(&layout.compose, COMPOSE);

    let report = bootstrap::run(&layout, DeploymentMode::Development).unwrap();
    assert_eq!(report.mode, DeploymentMode::Development);
    assert_eq!(report.skipped, vec![layout.compose_s3.clone()]);

    let frontend = fs::read_to_string(&layout.frontend_env).unwrap();
    assert!(frontend.contains("NEXT_PUBLIC_PROJECT_NAME=Acme Corp\n"));
    assert!(frontend.contains("NEXT_PUBLIC_API_URL=http://localhost:8000\n"));

    // Every file carries tokens signed by the secret written to supabase/.env.
    let supabase = read_env(&layout.supabase_env);
    let secret = supabase.get("JWT_SECRET").unwrap();
    assert_eq!(verify(supabase.get("ANON_KEY").unwrap(), secret).role, "anon");
    assert_eq!(verify(supabase.get("SERVICE_ROLE_KEY").unwrap(), secret).role, "service_role");
    assert_eq!(supabase.get("POSTGRES_HOST"), Some("db"));
    assert_eq!(supabase.get("ADDITIONAL_REDIRECT_URLS"), Some("http://localhost:3000/callback"));

    let backend = read_env(&layout.backend_env);
    assert_eq!(backend.get("SUPABASE_ANON_KEY"), supabase.get("ANON_KEY"));
    assert_eq!(backend.get("SUPABASE_SERVICE_KEY"), supabase.get("SERVICE_ROLE_KEY"));
    assert_eq!(backend.get("CORS_ORIGINS"), Some("http://localhost:3000"));

    let config = read_env(&layout.config);
    assert_eq!(config.get("SUPABASE_JWT_SECRET"), Some(secret));
    assert_eq!(config.get("VAULT_ENC_KEY"), supabase.get("VAULT_ENC_KEY"));

    let compose = fs::read_to_string(&layout.compose).unwrap();
    assert!(compose.starts_with("name: supabase-acme-corp\n"));
    assert!(compose.contains("container_name: supabase-acme-corp-db\n"));
}

#[test]
fn repeated_runs_keep_one_generated_section_and_rotate_secrets() {
    let (_tmp, layout) = project("PROJECT_NAME=Demo\n");

    bootstrap::run(&layout, DeploymentMode::Development).unwrap();
    let first = read_env(&layout.supabase_env).get("JWT_SECRET").unwrap().to_string();
    bootstrap::run(&layout, DeploymentMode::Development).unwrap();

    let config = fs::read_to_string(&layout.config).unwrap();
    assert_eq!(config.matches("# Generated keys").count(), 1);
    assert!(config.starts_with("PROJECT_NAME=Demo\n"));
    assert!(!config.contains("\n\n\n"));

    let second = read_env(&layout.supabase_env);
    assert_ne!(second.get("JWT_SECRET"), Some(first.as_str()));
    assert_eq!(read_env(&layout.config).get("SUPABASE_JWT_SECRET"), second.get("JWT_SECRET"));
}

#[test]
fn production_run_uses_domains() {
    let (_tmp, layout) = project("PROJECT_NAME=Acme\nFRONTEND_DOMAIN=app.acme.com\n");

    let report = bootstrap::run(&layout, DeploymentMode::Production).unwrap();
    let endpoints = report.endpoints.unwrap();
    assert_eq!(endpoints.frontend_url, "https://app.acme.com");

    assert_eq!(read_env(&layout.backend_env).get("CORS_ORIGINS"), Some("https://app.acme.com"));
    let supabase = read_env(&layout.supabase_env);
    assert_eq!(supabase.get("SITE_URL"), Some("https://app.acme.com"));
    assert_eq!(supabase.get("API_EXTERNAL_URL"), Some("https://supabase.example.com"));
    assert_eq!(
        supabase.get("ADDITIONAL_REDIRECT_URLS"),
        Some("https://app.acme.com/callback")
    );
}

#[test]
fn missing_compose_files_are_skipped() {
    let (_tmp, layout) = project("PROJECT_NAME=Demo\n");
    let report = bootstrap::run(&layout, DeploymentMode::Development).unwrap();
    assert_eq!(report.skipped, vec![layout.compose.clone(), layout.compose_s3.clone()]);
    assert!(!layout.compose.exists());
    assert!(report.written.contains(&layout.config));
}

#[test]
fn missing_config_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let layout = Layout::under(tmp.path());
    write(&layout.supabase_env, SUPABASE_TEMPLATE);

    let err = bootstrap::run(&layout, DeploymentMode::Development).unwrap_err();
    assert!(matches!(err, BootstrapError::ConfigNotFound(_)));
    assert!(!layout.frontend_env.exists());
    assert_eq!(fs::read_to_string(&layout.supabase_env).unwrap(), SUPABASE_TEMPLATE);
}
