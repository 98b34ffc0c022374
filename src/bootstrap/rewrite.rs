//! In-place `KEY=value` substitution for env templates.
//!
//! Only lines that start with `KEY=` are touched. Everything else, including
//! comments, blank lines, ordering and line endings, passes through verbatim.

/// One substitution: every line starting with `KEY=` becomes `KEY=value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub key: String,
    pub value: String,
}

impl Replacement {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }

    fn matches(&self, line: &str) -> bool {
        line.strip_prefix(self.key.as_str())
            .is_some_and(|rest| rest.starts_with('='))
    }
}

/// Result of [`apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    /// Keys with no matching line in the input.
    pub skipped: Vec<String>,
}

pub fn apply(text: &str, rules: &[Replacement]) -> Rewrite {
    let mut hits = vec![false; rules.len()];
    let mut out = String::with_capacity(text.len());

    for line in text.split_inclusive('\n') {
        let (body, ending) = split_ending(line);
        match rules.iter().position(|r| r.matches(body)) {
            Some(i) => {
                hits[i] = true;
                let rule = &rules[i];
                out.push_str(&rule.key);
                out.push('=');
                out.push_str(&rule.value);
                out.push_str(ending);
            }
            None => out.push_str(line),
        }
    }

    let skipped = rules
        .iter()
        .zip(hits)
        .filter(|(_, hit)| !hit)
        .map(|(r, _)| r.key.clone())
        .collect();

    Rewrite { text: out, skipped }
}

fn split_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "\
############
# Secrets
############

POSTGRES_PASSWORD=your-super-secret
JWT_SECRET=old
ANON_KEY=old-anon
SERVICE_ROLE_KEY=old-service
# keep me
STUDIO_PORT=3000
";

    #[test]
    fn replaces_matching_lines_only() {
        let rules = [
            Replacement::new("JWT_SECRET", "new"),
            Replacement::new("STUDIO_PORT", "3100"),
        ];
        let out = apply(TEMPLATE, &rules);
        assert!(out.text.contains("\nJWT_SECRET=new\n"));
        assert!(out.text.contains("\nSTUDIO_PORT=3100\n"));
        assert!(out.skipped.is_empty());
    }

    #[test]
    fn unrelated_lines_are_byte_identical() {
        let rules = [Replacement::new("ANON_KEY", "fresh")];
        let out = apply(TEMPLATE, &rules);
        let before: Vec<&str> = TEMPLATE.lines().collect();
        let after: Vec<&str> = out.text.lines().collect();
        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(&after) {
            if b.starts_with("ANON_KEY=") {
                assert_eq!(*a, "ANON_KEY=fresh");
            } else {
                assert_eq!(b, a);
            }
        }
    }

    #[test]
    fn key_prefix_does_not_match_longer_key() {
        // ANON_KEY must not clobber SUPABASE_ANON_KEY, nor KEY touch ANON_KEY.
        let text = "SUPABASE_ANON_KEY=a\nANON_KEY=b\n";
        let out = apply(text, &[Replacement::new("ANON_KEY", "c"), Replacement::new("KEY", "x")]);
        assert_eq!(out.text, "SUPABASE_ANON_KEY=a\nANON_KEY=c\n");
        assert_eq!(out.skipped, vec!["KEY".to_string()]);
    }

    #[test]
    fn missing_patterns_are_skipped_not_errors() {
        let out = apply(TEMPLATE, &[Replacement::new("SITE_URL", "http://localhost:3000")]);
        assert_eq!(out.text, TEMPLATE);
        assert_eq!(out.skipped, vec!["SITE_URL".to_string()]);
    }

    #[test]
    fn preserves_crlf_and_missing_final_newline() {
        let text = "A=1\r\nB=2";
        let out = apply(text, &[Replacement::new("A", "9"), Replacement::new("B", "8")]);
        assert_eq!(out.text, "A=9\r\nB=8");
    }

    #[test]
    fn empty_value_line_is_still_matched() {
        let out = apply("ADDITIONAL_REDIRECT_URLS=\n", &[Replacement::new("ADDITIONAL_REDIRECT_URLS", "x")]);
        assert_eq!(out.text, "ADDITIONAL_REDIRECT_URLS=x\n");
    }
}
