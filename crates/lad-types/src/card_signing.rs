//! AgentCard signing and verification.
//!
//! A signed AgentCard is a compact JWS (ES256, ECDSA P-256 with SHA-256)
//! whose payload is `{"agent_card": <card>, "iat": <unix seconds>}`. The
//! header carries a `kid` when one is configured. Servers return the token
//! with media type `application/jose`; clients verify it against a public
//! key distributed out of band.

use crate::error::{LadError, LadResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use p256::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the generated private key.
pub const PRIVATE_KEY_FILE: &str = "private.pem";
/// File name of the generated public key.
pub const PUBLIC_KEY_FILE: &str = "public.pem";

/// Server-side signing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Whether AgentCards are signed.
    pub enabled: bool,
    /// PKCS#8 PEM private key.
    pub private_key_path: Option<PathBuf>,
    /// Key identifier placed in the JWS header.
    pub key_id: Option<String>,
    /// Signature algorithm. Only ES256 is supported.
    pub algorithm: Algorithm,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            private_key_path: None,
            key_id: None,
            algorithm: Algorithm::ES256,
        }
    }
}

impl SigningConfig {
    /// Check that an enabled configuration can actually sign.
    pub fn validate(&self) -> LadResult<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.algorithm != Algorithm::ES256 {
            return Err(LadError::Config(format!(
                "Unsupported signing algorithm {:?}, only ES256 is supported",
                self.algorithm
            )));
        }
        match &self.private_key_path {
            None => Err(LadError::Config(
                "Signing enabled but no private key path configured".to_string(),
            )),
            Some(path) if !path.exists() => Err(LadError::Config(format!(
                "Signing key not found: {}",
                path.display()
            ))),
            Some(_) => Ok(()),
        }
    }
}

/// JWS payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CardClaims {
    agent_card: serde_json::Value,
    iat: i64,
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// A loaded signing key, ready to sign AgentCards.
#[derive(Clone)]
pub struct CardSigner {
    key: EncodingKey,
    key_id: Option<String>,
}

impl fmt::Debug for CardSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardSigner")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl CardSigner {
    /// Load the private key named by `config`.
    ///
    /// Fails with [`LadError::Config`] if signing is disabled or the key is
    /// missing, unreadable, or not an EC P-256 PKCS#8 key.
    pub fn from_config(config: &SigningConfig) -> LadResult<Self> {
        if !config.enabled {
            return Err(LadError::Config("Signing is not enabled".to_string()));
        }
        config.validate()?;
        let path = config
            .private_key_path
            .as_deref()
            .ok_or_else(|| LadError::Config("No private key path configured".to_string()))?;
        let pem = std::fs::read(path).map_err(|e| {
            LadError::Config(format!("Failed to read signing key {}: {e}", path.display()))
        })?;
        let key = EncodingKey::from_ec_pem(&pem).map_err(|e| {
            LadError::Config(format!("Invalid signing key {}: {e}", path.display()))
        })?;
        Ok(Self {
            key,
            key_id: config.key_id.clone(),
        })
    }

    /// Key identifier placed in the JWS header, if any.
    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// Sign `card`, producing a compact JWS.
    pub fn sign<T: Serialize>(&self, card: &T) -> LadResult<String> {
        let claims = CardClaims {
            agent_card: serde_json::to_value(card)?,
            iat: Utc::now().timestamp(),
        };
        let mut header = Header::new(Algorithm::ES256);
        header.kid = self.key_id.clone();
        jsonwebtoken::encode(&header, &claims, &self.key)
            .map_err(|e| LadError::Signing(e.to_string()))
    }
}

/// Sign an AgentCard with the key named by `config`.
pub fn sign_agent_card<T: Serialize>(card: &T, config: &SigningConfig) -> LadResult<String> {
    CardSigner::from_config(config)?.sign(card)
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Why a signed AgentCard failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationFailure {
    /// The token carried an `exp` claim in the past.
    Expired,
    /// The signature does not match the payload and key.
    InvalidSignature,
    /// The token is not a well-formed JWS.
    Decode,
    /// Anything else (missing key, disallowed algorithm, bad key format).
    Other,
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationFailure::Expired => write!(f, "expired"),
            VerificationFailure::InvalidSignature => write!(f, "invalid_signature"),
            VerificationFailure::Decode => write!(f, "decode_error"),
            VerificationFailure::Other => write!(f, "other"),
        }
    }
}

/// Outcome of verifying a signed AgentCard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Whether the signature verified.
    pub valid: bool,
    /// The embedded AgentCard, present only when `valid`.
    pub agent_card: Option<serde_json::Value>,
    /// Human-readable failure reason.
    pub error: Option<String>,
    /// Failure classification, `None` when `valid`.
    pub failure: Option<VerificationFailure>,
    /// `iat` of the token.
    pub signed_at: Option<DateTime<Utc>>,
    /// `kid` from the token header.
    pub key_id: Option<String>,
}

impl VerificationResult {
    fn failed(failure: VerificationFailure, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            failure: Some(failure),
            ..Default::default()
        }
    }
}

/// Verify a compact JWS AgentCard against a PEM public key.
///
/// `algorithms` is the allow-list of accepted algorithms; an empty slice means
/// ES256 only. Never panics: every failure is reported in the result.
pub fn verify_agent_card(
    token: &str,
    public_key_pem: Option<&[u8]>,
    algorithms: &[Algorithm],
) -> VerificationResult {
    let Some(public_key_pem) = public_key_pem else {
        return VerificationResult::failed(
            VerificationFailure::Other,
            "No public key provided for verification",
        );
    };

    let key = match DecodingKey::from_ec_pem(public_key_pem) {
        Ok(k) => k,
        Err(e) => {
            return VerificationResult::failed(
                VerificationFailure::Other,
                format!("Invalid public key: {e}"),
            )
        }
    };

    let mut validation = Validation::new(Algorithm::ES256);
    if !algorithms.is_empty() {
        validation.algorithms = algorithms.to_vec();
    }
    // Only `exp` is checked, and only when present.
    validation.required_spec_claims.clear();
    validation.validate_exp = true;

    match jsonwebtoken::decode::<CardClaims>(token, &key, &validation) {
        Ok(data) => {
            debug!(kid = ?data.header.kid, "AgentCard signature verified");
            VerificationResult {
                valid: true,
                agent_card: Some(data.claims.agent_card),
                error: None,
                failure: None,
                signed_at: DateTime::from_timestamp(data.claims.iat, 0),
                key_id: data.header.kid,
            }
        }
        Err(e) => {
            let failure = match e.kind() {
                ErrorKind::ExpiredSignature => VerificationFailure::Expired,
                ErrorKind::InvalidSignature => VerificationFailure::InvalidSignature,
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => VerificationFailure::Decode,
                _ => VerificationFailure::Other,
            };
            let error = match failure {
                VerificationFailure::Expired => "Signature has expired".to_string(),
                VerificationFailure::InvalidSignature => "Invalid signature".to_string(),
                VerificationFailure::Decode => format!("Failed to decode token: {e}"),
                VerificationFailure::Other => format!("Verification failed: {e}"),
            };
            warn!(failure = %failure, error = %e, "AgentCard verification failed");
            let mut result = VerificationResult::failed(failure, error);
            result.key_id = jsonwebtoken::decode_header(token).ok().and_then(|h| h.kid);
            result
        }
    }
}

/// Decode the AgentCard embedded in a JWS payload **without** checking the
/// signature. Only for displaying a card whose verification failed.
pub fn decode_unverified_card(token: &str) -> Option<serde_json::Value> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let mut claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims.get_mut("agent_card").map(serde_json::Value::take)
}

/// Heuristic: a compact JWS has exactly three dot-separated, non-empty
/// base64url segments.
pub fn is_signed_agent_card(text: &str) -> bool {
    let segments: Vec<&str> = text.trim().split('.').collect();
    segments.len() == 3
        && segments.iter().all(|s| {
            !s.is_empty()
                && s
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        })
}

// ---------------------------------------------------------------------------
// Key management
// ---------------------------------------------------------------------------

/// Generate a P-256 key pair in `dir`, returning `(private, public)` paths.
///
/// The private key is PKCS#8 PEM readable by the owner only; the public key
/// is SPKI PEM.
pub fn generate_signing_keys(dir: &Path) -> LadResult<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)?;

    let secret = p256::SecretKey::random(&mut rand::rngs::OsRng);
    let private_pem = secret
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| LadError::Signing(format!("Failed to encode private key: {e}")))?;
    let public_pem = secret
        .public_key()
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| LadError::Signing(format!("Failed to encode public key: {e}")))?;

    let private_path = dir.join(PRIVATE_KEY_FILE);
    let public_path = dir.join(PUBLIC_KEY_FILE);
    std::fs::write(&private_path, private_pem.as_bytes())?;
    restrict_file_permissions(&private_path)?;
    std::fs::write(&public_path, public_pem.as_bytes())?;

    info!(
        private = %private_path.display(),
        public = %public_path.display(),
        "Generated AgentCard signing keys"
    );
    Ok((private_path, public_path))
}

/// Short hex fingerprint of a public key PEM, suitable as a `kid`.
pub fn key_fingerprint(public_key_pem: &str) -> String {
    let digest = Sha256::digest(public_key_pem.as_bytes());
    hex::encode(digest)[..16].to_string()
}

#[cfg(unix)]
fn restrict_file_permissions(path: &Path) -> LadResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_file_permissions(_path: &Path) -> LadResult<()> {
    Ok(())
}
