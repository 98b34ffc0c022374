//! Project-specific naming inside the Supabase `docker-compose` descriptors.
//!
//! Two naming schemes exist:
//!
//! | Scheme | Container | Project `name:` |
//! |---|---|---|
//! | [`ComposeNaming::Prefix`] | `supabase-db` → `supabase-<slug>-db` | `supabase-<slug>` |
//! | [`ComposeNaming::Legacy`] | `thesuperproject-db` → `supabase-db-<slug>` | `<slug>` |
//!
//! Both rewrites are idempotent: a second run with the same slug is a no-op.
//! For the prefix scheme the top-level `name: supabase-<slug>` line marks a
//! file as already rewritten, since a slug may itself equal a service name.

use std::{fmt, str::FromStr};

use super::BootstrapError;

const SUPABASE_PREFIX: &str = "supabase-";
const LEGACY_CONTAINER_PREFIX: &str = "container_name: thesuperproject-";

/// Services renamed by the legacy scheme, in rewrite order.
const LEGACY_SERVICES: &[&str] = &[
    "studio",
    "kong",
    "auth",
    "rest",
    "storage",
    "imgproxy",
    "meta",
    "edge-functions",
    "analytics",
    "db",
    "vector",
    "pooler",
];

/// Realtime keeps its `.supabase-realtime` tenant suffix after the slug.
const LEGACY_REALTIME: &str = "realtime-dev.supabase-realtime";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ComposeNaming {
    /// Every `supabase-` identifier gets the slug spliced in after it.
    #[default]
    Prefix,
    /// Fixed `thesuperproject-<service>` container names become
    /// `supabase-<service>-<slug>`.
    Legacy,
}

impl FromStr for ComposeNaming {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "prefix" => Ok(Self::Prefix),
            "legacy" => Ok(Self::Legacy),
            other => Err(BootstrapError::Usage(format!(
                "unknown COMPOSE_NAMING '{other}' (expected 'prefix' or 'legacy')"
            ))),
        }
    }
}

impl fmt::Display for ComposeNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prefix => "prefix",
            Self::Legacy => "legacy",
        })
    }
}

/// Lowercase, spaces replaced by hyphens.
pub fn slugify(project_name: &str) -> String {
    project_name.trim().replace(' ', "-").to_lowercase()
}

/// Rewrite `text` for `slug` using `naming`. An empty slug leaves the text as is.
pub fn rewrite(text: &str, slug: &str, naming: ComposeNaming) -> String {
    if slug.is_empty() {
        return text.to_string();
    }
    match naming {
        ComposeNaming::Prefix => {
            let project = format!("{SUPABASE_PREFIX}{slug}");
            if project_name(text) == Some(project.as_str()) {
                return text.to_string();
            }
            let prefixed = splice_prefix(text, slug);
            rename_project(&prefixed, &project)
        }
        ComposeNaming::Legacy => {
            let renamed = rename_project(text, slug);
            rename_legacy_containers(&renamed, slug)
        }
    }
}

/// Value of the first top-level `name:` line.
fn project_name(text: &str) -> Option<&str> {
    text.lines()
        .find_map(|line| line.strip_prefix("name:"))
        .map(str::trim)
}

/// `supabase-X` → `supabase-<slug>-X` for every occurrence.
fn splice_prefix(text: &str, slug: &str) -> String {
    let mut out = String::with_capacity(text.len() + slug.len() * 8);
    let mut rest = text;
    while let Some(pos) = rest.find(SUPABASE_PREFIX) {
        let (head, tail) = rest.split_at(pos + SUPABASE_PREFIX.len());
        out.push_str(head);
        out.push_str(slug);
        out.push('-');
        rest = tail;
    }
    out.push_str(rest);
    out
}

/// Replace the value of a top-level `name: supabase` line.
fn rename_project(text: &str, new_name: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let body = line.trim_end_matches(['\n', '\r']);
        let is_project_name = body
            .strip_prefix("name:")
            .is_some_and(|value| value.trim() == "supabase");
        if is_project_name {
            out.push_str("name: ");
            out.push_str(new_name);
            out.push_str(&line[body.len()..]);
        } else {
            out.push_str(line);
        }
    }
    out
}

fn rename_legacy_containers(text: &str, slug: &str) -> String {
    let mut out = replace_token(
        text,
        &format!("{LEGACY_CONTAINER_PREFIX}{LEGACY_REALTIME}"),
        &format!("container_name: supabase-realtime-dev-{slug}.supabase-realtime"),
    );
    for service in LEGACY_SERVICES {
        out = replace_token(
            &out,
            &format!("{LEGACY_CONTAINER_PREFIX}{service}"),
            &format!("container_name: supabase-{service}-{slug}"),
        );
    }
    out
}

/// Replace `from` with `to` wherever `from` is not followed by more identifier
/// characters (so `...-db` does not hit `...-dbx`).
fn replace_token(text: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(from) {
        let end = pos + from.len();
        out.push_str(&rest[..pos]);
        if is_token_end(&rest[end..]) {
            out.push_str(to);
        } else {
            out.push_str(from);
        }
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

fn is_token_end(after: &str) -> bool {
    after
        .chars()
        .next()
        .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
}
