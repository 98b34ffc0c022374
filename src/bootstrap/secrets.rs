//! Secret material for a Supabase stack: JWT secret, the `anon` and
//! `service_role` API tokens signed with it, and the Realtime/Vault
//! encryption keys.
//!
//! Randomness comes from the OS via [`OsRng`]; any failure there is fatal.

use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::BootstrapError;

/// Issuer claim carried by both API tokens.
pub const TOKEN_ISSUER: &str = "supabase";

pub const ANON_ROLE: &str = "anon";
pub const SERVICE_ROLE: &str = "service_role";

/// Tokens stay valid for 20 years (365-day years).
pub const TOKEN_LIFETIME_SECS: i64 = 20 * 365 * 24 * 60 * 60;

const SECRET_BYTES: usize = 32;

/// Claims of a generated API token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleClaims {
    pub role: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Everything generated in one bootstrap run. Fanned out to every target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretBundle {
    pub jwt_secret: String,
    pub anon_token: String,
    pub service_role_token: String,
    pub secret_key_base: String,
    pub vault_enc_key: String,
}

impl SecretBundle {
    /// Draw fresh randomness and sign both tokens at `now` (unix seconds).
    pub fn generate(now: i64) -> Result<Self, BootstrapError> {
        let jwt_secret = generate_jwt_secret()?;
        let anon_token = generate_signed_token(ANON_ROLE, TOKEN_ISSUER, now, &jwt_secret)?;
        let service_role_token =
            generate_signed_token(SERVICE_ROLE, TOKEN_ISSUER, now, &jwt_secret)?;
        let (secret_key_base, vault_enc_key) = generate_encryption_material()?;

        Ok(Self {
            jwt_secret,
            anon_token,
            service_role_token,
            secret_key_base,
            vault_enc_key,
        })
    }
}

/// 32 random bytes, URL-safe base64 without padding.
pub fn generate_jwt_secret() -> Result<String, BootstrapError> {
    let bytes = random_bytes()?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Compact HS256 token `<header>.<payload>.<signature>` asserting `role`.
///
/// Pure function of its inputs: the same `(role, issuer, now, secret)` always
/// yields the same token.
pub fn generate_signed_token(
    role: &str,
    issuer: &str,
    now: i64,
    secret: &str,
) -> Result<String, BootstrapError> {
    let claims = RoleClaims {
        role: role.to_string(),
        iss: issuer.to_string(),
        iat: now,
        exp: now + TOKEN_LIFETIME_SECS,
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| BootstrapError::Signing(format!("cannot sign {role} token: {e}")))
}

/// `(secret_key_base, vault_enc_key)` derived from a single 32-byte draw:
/// standard base64 of the bytes, and lowercase hex SHA-256 of the same bytes.
pub fn generate_encryption_material() -> Result<(String, String), BootstrapError> {
    let bytes = random_bytes()?;
    Ok(encryption_material_from(&bytes))
}

fn encryption_material_from(bytes: &[u8]) -> (String, String) {
    let secret_key_base = STANDARD.encode(bytes);
    let vault_enc_key = hex::encode(Sha256::digest(bytes));
    (secret_key_base, vault_enc_key)
}

fn random_bytes() -> Result<[u8; SECRET_BYTES], BootstrapError> {
    let mut buf = [0u8; SECRET_BYTES];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| BootstrapError::Entropy(e.to_string()))?;
    Ok(buf)
}
