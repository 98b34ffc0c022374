//! The `# Generated keys` block appended to the source config file.
//!
//! A block runs from its header line up to (not including) the next line that
//! starts with `#`, or to end of file. Every run drops any existing block and
//! appends a fresh one at the end, so the file never holds more than one.

use super::secrets::SecretBundle;

pub const GENERATED_HEADER: &str = "# Generated keys";

/// Render the block for `bundle`, header included, newline-terminated.
pub fn render(bundle: &SecretBundle) -> String {
    let keys = [
        ("SUPABASE_JWT_SECRET", &bundle.jwt_secret),
        ("SUPABASE_ANON_KEY", &bundle.anon_token),
        ("SUPABASE_SERVICE_ROLE_KEY", &bundle.service_role_token),
        ("SECRET_KEY_BASE", &bundle.secret_key_base),
        ("VAULT_ENC_KEY", &bundle.vault_enc_key),
    ];
    let mut out = String::from(GENERATED_HEADER);
    out.push('\n');
    for (key, value) in keys {
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    out
}

/// Remove every generated block from `text`.
pub fn strip(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_block = false;
    for line in text.split_inclusive('\n') {
        if is_header(line) {
            in_block = true;
            continue;
        }
        if in_block && line.starts_with('#') {
            in_block = false;
        }
        if !in_block {
            out.push_str(line);
        }
    }
    out
}

/// Drop any previous block and append one for `bundle`.
pub fn replace_generated_section(text: &str, bundle: &SecretBundle) -> String {
    let kept = strip(text);
    let kept = kept.trim_end_matches(['\n', '\r']);
    let block = render(bundle);
    if kept.is_empty() {
        block
    } else {
        format!("{kept}\n\n{block}")
    }
}

fn is_header(line: &str) -> bool {
    line.trim_end() == GENERATED_HEADER
}
