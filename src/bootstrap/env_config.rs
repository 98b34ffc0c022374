//! Key/value configuration file reader (`.setup/.env.config`).
//!
//! Accepted line shapes:
//! ```text
//! # comment
//! PROJECT_NAME="Acme Corp"
//! API_PORT=8000   # trailing comment
//! LEGACY_KEY==value
//! ```
//! Values are never typed here; callers pick defaults via [`EnvConfig::get_or`].

use std::{fs, io, path::Path};

use super::BootstrapError;

/// Ordered key → value set. A repeated key keeps its first position and takes
/// the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    entries: Vec<(String, String)>,
}

impl EnvConfig {
    /// Read and parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self, BootstrapError> {
        let raw = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                BootstrapError::ConfigNotFound(path.to_path_buf())
            } else {
                BootstrapError::ConfigRead { path: path.to_path_buf(), source }
            }
        })?;
        Ok(Self::parse(&raw))
    }

    pub fn parse(raw: &str) -> Self {
        let mut config = Self::default();
        for line in raw.lines() {
            if let Some((key, value)) = parse_line(line) {
                config.set(key, value);
            }
        }
        config
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value for `key`, or `default` when the key is absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn parse_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('=') {
        return None;
    }
    let (key, value) = line.split_once('=')?;

    // `KEY==value` splits into `KEY` and `=value`.
    let value = value.strip_prefix('=').unwrap_or(value);
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    let value = value.split('#').next().unwrap_or_default().trim();
    Some((key.to_string(), strip_quotes(value).to_string()))
}

fn strip_quotes(value: &str) -> &str {
    value
        .trim_matches('"')
        .trim_matches('\'')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_input_is_empty_set() {
        assert!(EnvConfig::parse("").is_empty());
        assert!(EnvConfig::parse("\n\n# only comments\n").is_empty());
    }

    #[test]
    fn quotes_and_inline_comments_are_stripped() {
        let cfg = EnvConfig::parse(
            "PROJECT_NAME=\"Acme Corp\"\nAPI_PORT=9000 # api\nUSERNAME_SUPABASE='admin'\n",
        );
        assert_eq!(cfg.get("PROJECT_NAME"), Some("Acme Corp"));
        assert_eq!(cfg.get("API_PORT"), Some("9000"));
        assert_eq!(cfg.get("USERNAME_SUPABASE"), Some("admin"));
    }

    #[test]
    fn double_equals_assignment() {
        let cfg = EnvConfig::parse("STUDIO_PORT==3100");
        assert_eq!(cfg.get("STUDIO_PORT"), Some("3100"));
    }

    #[test]
    fn duplicate_key_last_wins_first_position_kept() {
        let cfg = EnvConfig::parse("A=1\nB=2\nA=3");
        assert_eq!(cfg.get("A"), Some("3"));
        assert_eq!(cfg.len(), 2);
        let keys: Vec<_> = cfg.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["A", "B"]);
    }

    #[test]
    fn keys_are_case_sensitive() {
        let cfg = EnvConfig::parse("api_port=1\nAPI_PORT=2");
        assert_eq!(cfg.get("api_port"), Some("1"));
        assert_eq!(cfg.get("API_PORT"), Some("2"));
    }

    #[test]
    fn lines_without_key_are_ignored() {
        let cfg = EnvConfig::parse("=orphan\nnot a pair\nOK=yes");
        assert_eq!(cfg.len(), 1);
        assert_eq!(cfg.get_or("MISSING", "fallback"), "fallback");
    }

    #[test]
    fn crlf_and_missing_trailing_newline() {
        let cfg = EnvConfig::parse("A=1\r\nB=two");
        assert_eq!(cfg.get("A"), Some("1"));
        assert_eq!(cfg.get("B"), Some("two"));
    }

    #[test]
    fn load_missing_file_is_config_not_found() {
        let err = EnvConfig::load(Path::new("/nonexistent/.env.config")).unwrap_err();
        assert!(matches!(err, BootstrapError::ConfigNotFound(_)));
    }

    #[test]
    fn load_reads_file() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"PROJECT_NAME=Demo\n").unwrap();
        let cfg = EnvConfig::load(f.path()).unwrap();
        assert_eq!(cfg.get("PROJECT_NAME"), Some("Demo"));
    }
}
