//! Contents of the generated env files and the substitutions applied to the
//! Supabase env template.

use super::{
    DeploymentMode,
    env_config::EnvConfig,
    rewrite::Replacement,
    secrets::SecretBundle,
};

/// Defaults applied when a key is absent from `.env.config`.
pub mod defaults {
    pub const PROJECT_NAME: &str = "TheSuperProject";
    pub const API_PREFIX: &str = "/api/v1";
    pub const API_PORT: &str = "8000";
    pub const FRONTEND_PORT: &str = "3000";
    pub const KONG_HTTP_PORT: &str = "8000";
    pub const KONG_HTTPS_PORT: &str = "8443";
    pub const STUDIO_PORT: &str = "3000";
    pub const POSTGRES_PORT: &str = "5432";
    pub const POOLER_PROXY_PORT_TRANSACTION: &str = "6543";
    pub const PASSWORD_POSTGRES: &str = "passwordpostgres";
    pub const USERNAME_SUPABASE: &str = "supabase";
    pub const PASSWORD_SUPABASE: &str = "passwordsupabase";
    pub const ENABLE_EMAIL_AUTOCONFIRM: &str = "false";
    pub const BACKEND_DOMAIN: &str = "api.example.com";
    pub const FRONTEND_DOMAIN: &str = "example.com";
    pub const SUPABASE_DOMAIN: &str = "supabase.example.com";
}

/// Project name with stray quotes removed.
pub fn project_name(cfg: &EnvConfig) -> String {
    cfg.get_or("PROJECT_NAME", defaults::PROJECT_NAME)
        .trim_matches('"')
        .to_string()
}

/// Public URLs for one deployment mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Where the frontend reaches the API.
    pub api_url: String,
    /// Kong gateway in front of Supabase.
    pub supabase_url: String,
    /// Browser origin of the frontend (CORS, site URL).
    pub frontend_url: String,
}

impl Endpoints {
    pub fn resolve(mode: DeploymentMode, cfg: &EnvConfig) -> Self {
        match mode {
            DeploymentMode::Development => Self {
                api_url: localhost(cfg.get_or("API_PORT", defaults::API_PORT)),
                supabase_url: localhost(cfg.get_or("KONG_HTTP_PORT", defaults::KONG_HTTP_PORT)),
                frontend_url: localhost(cfg.get_or("FRONTEND_PORT", defaults::FRONTEND_PORT)),
            },
            DeploymentMode::Production => Self {
                api_url: https(cfg.get_or("BACKEND_DOMAIN", defaults::BACKEND_DOMAIN)),
                supabase_url: https(cfg.get_or("SUPABASE_DOMAIN", defaults::SUPABASE_DOMAIN)),
                frontend_url: https(cfg.get_or("FRONTEND_DOMAIN", defaults::FRONTEND_DOMAIN)),
            },
        }
    }

    /// OAuth redirect target registered with Supabase Auth.
    pub fn redirect_url(&self) -> String {
        format!("{}/callback", self.frontend_url)
    }
}

fn localhost(port: &str) -> String {
    format!("http://localhost:{port}")
}

fn https(domain: &str) -> String {
    format!("https://{domain}")
}

/// `frontend/.env.local`
pub fn frontend_env(cfg: &EnvConfig, endpoints: &Endpoints) -> String {
    format!(
        "# Frontend environment variables\n\
         \n\
         NEXT_PUBLIC_API_PREFIX={prefix}\n\
         NEXT_PUBLIC_API_URL={api_url}\n\
         NEXT_FRONTEND_PORT={port}\n\
         NEXT_PUBLIC_PROJECT_NAME={name}\n",
        prefix = cfg.get_or("API_PREFIX", defaults::API_PREFIX),
        api_url = endpoints.api_url,
        port = cfg.get_or("FRONTEND_PORT", defaults::FRONTEND_PORT),
        name = project_name(cfg),
    )
}

/// `backend/.env`
pub fn backend_env(cfg: &EnvConfig, endpoints: &Endpoints, bundle: &SecretBundle) -> String {
    format!(
        "# Backend environment variables\n\
         \n\
         PROJECT_NAME={name}\n\
         SUPABASE_URL={supabase_url}\n\
         SUPABASE_ANON_KEY={anon}\n\
         SUPABASE_SERVICE_KEY={service}\n\
         API_PREFIX={prefix}\n\
         API_PORT={port}\n\
         CORS_ORIGINS={cors}\n",
        name = project_name(cfg),
        supabase_url = endpoints.supabase_url,
        anon = bundle.anon_token,
        service = bundle.service_role_token,
        prefix = cfg.get_or("API_PREFIX", defaults::API_PREFIX),
        port = cfg.get_or("API_PORT", defaults::API_PORT),
        cors = endpoints.frontend_url,
    )
}

/// Substitutions for `supabase/.env`.
pub fn supabase_replacements(
    cfg: &EnvConfig,
    endpoints: &Endpoints,
    bundle: &SecretBundle,
) -> Vec<Replacement> {
    let from_cfg = |target: &str, key: &str, default: &str| {
        Replacement::new(target, cfg.get_or(key, default))
    };

    vec![
        // Credentials
        from_cfg("POSTGRES_PASSWORD", "PASSWORD_POSTGRES", defaults::PASSWORD_POSTGRES),
        from_cfg("DASHBOARD_USERNAME", "USERNAME_SUPABASE", defaults::USERNAME_SUPABASE),
        from_cfg("DASHBOARD_PASSWORD", "PASSWORD_SUPABASE", defaults::PASSWORD_SUPABASE),
        // Generated secrets
        Replacement::new("JWT_SECRET", &bundle.jwt_secret),
        Replacement::new("ANON_KEY", &bundle.anon_token),
        Replacement::new("SERVICE_ROLE_KEY", &bundle.service_role_token),
        Replacement::new("SECRET_KEY_BASE", &bundle.secret_key_base),
        Replacement::new("VAULT_ENC_KEY", &bundle.vault_enc_key),
        // Ports
        from_cfg("POSTGRES_PORT", "POSTGRES_PORT", defaults::POSTGRES_PORT),
        from_cfg(
            "POOLER_PROXY_PORT_TRANSACTION",
            "POOLER_PROXY_PORT_TRANSACTION",
            defaults::POOLER_PROXY_PORT_TRANSACTION,
        ),
        from_cfg("KONG_HTTP_PORT", "KONG_HTTP_PORT", defaults::KONG_HTTP_PORT),
        from_cfg("KONG_HTTPS_PORT", "KONG_HTTPS_PORT", defaults::KONG_HTTPS_PORT),
        from_cfg("STUDIO_PORT", "STUDIO_PORT", defaults::STUDIO_PORT),
        // Auth
        from_cfg(
            "ENABLE_EMAIL_AUTOCONFIRM",
            "ENABLE_EMAIL_AUTOCONFIRM",
            defaults::ENABLE_EMAIL_AUTOCONFIRM,
        ),
        // Public URLs
        Replacement::new("API_EXTERNAL_URL", &endpoints.supabase_url),
        Replacement::new("SUPABASE_PUBLIC_URL", &endpoints.supabase_url),
        Replacement::new("SITE_URL", &endpoints.frontend_url),
        Replacement::new("ADDITIONAL_REDIRECT_URLS", endpoints.redirect_url()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> SecretBundle {
        SecretBundle {
            jwt_secret: "jwt".into(),
            anon_token: "anon.tok.en".into(),
            service_role_token: "service.tok.en".into(),
            secret_key_base: "base".into(),
            vault_enc_key: "vault".into(),
        }
    }

    #[test]
    fn development_urls_use_localhost_ports() {
        let cfg = EnvConfig::parse("API_PORT=9000\nFRONTEND_PORT=3100");
        let ep = Endpoints::resolve(DeploymentMode::Development, &cfg);
        assert_eq!(ep.api_url, "http://localhost:9000");
        assert_eq!(ep.supabase_url, "http://localhost:8000");
        assert_eq!(ep.frontend_url, "http://localhost:3100");
        assert_eq!(ep.redirect_url(), "http://localhost:3100/callback");
    }

    #[test]
    fn production_urls_use_domains_with_defaults() {
        let cfg = EnvConfig::parse("FRONTEND_DOMAIN=app.acme.com");
        let ep = Endpoints::resolve(DeploymentMode::Production, &cfg);
        assert_eq!(ep.frontend_url, "https://app.acme.com");
        assert_eq!(ep.api_url, "https://api.example.com");
        assert_eq!(ep.supabase_url, "https://supabase.example.com");
    }

    #[test]
    fn frontend_env_applies_defaults() {
        let cfg = EnvConfig::parse("PROJECT_NAME=\"Acme Corp\"");
        let ep = Endpoints::resolve(DeploymentMode::Development, &cfg);
        let text = frontend_env(&cfg, &ep);
        assert!(text.contains("NEXT_PUBLIC_PROJECT_NAME=Acme Corp\n"));
        assert!(text.contains("NEXT_PUBLIC_API_URL=http://localhost:8000\n"));
        assert!(text.contains("NEXT_PUBLIC_API_PREFIX=/api/v1\n"));
        assert!(text.contains("NEXT_FRONTEND_PORT=3000\n"));
    }

    #[test]
    fn backend_env_carries_tokens_and_cors() {
        let cfg = EnvConfig::parse("FRONTEND_DOMAIN=app.acme.com");
        let ep = Endpoints::resolve(DeploymentMode::Production, &cfg);
        let text = backend_env(&cfg, &ep, &bundle());
        assert!(text.contains("CORS_ORIGINS=https://app.acme.com\n"));
        assert!(text.contains("SUPABASE_ANON_KEY=anon.tok.en\n"));
        assert!(text.contains("SUPABASE_SERVICE_KEY=service.tok.en\n"));
        assert!(text.contains("PROJECT_NAME=TheSuperProject\n"));
        let keys = text.lines().filter(|l| l.contains('=')).count();
        assert_eq!(keys, 7);
    }

    #[test]
    fn supabase_rules_cover_secrets_ports_and_urls() {
        let cfg = EnvConfig::parse("STUDIO_PORT=3300\nENABLE_EMAIL_AUTOCONFIRM=true");
        let ep = Endpoints::resolve(DeploymentMode::Development, &cfg);
        let rules = supabase_replacements(&cfg, &ep, &bundle());
        let get = |k: &str| rules.iter().find(|r| r.key == k).map(|r| r.value.as_str());
        assert_eq!(get("JWT_SECRET"), Some("jwt"));
        assert_eq!(get("STUDIO_PORT"), Some("3300"));
        assert_eq!(get("ENABLE_EMAIL_AUTOCONFIRM"), Some("true"));
        assert_eq!(get("POSTGRES_PASSWORD"), Some("passwordpostgres"));
        assert_eq!(get("SITE_URL"), Some("http://localhost:3000"));
        assert_eq!(rules.len(), 18);
    }
}
