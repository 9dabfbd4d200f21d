//! Token issuance and verification.
//!
//! Tokens are HS256 JSON Web Tokens signed with the unit's secret.
//!
//! # Pre-conditions
//! - The secret must be non-empty (guaranteed by `Configuration`).
//!
//! # Post-conditions
//! - `TokenIssuer::issue` returns a token whose `exp` claim is
//!   `floor((now_ms + lifetime_minutes * 60_000) / 1000)`.
//! - `TokenVerifier::verify` returns claims only if the signature matches,
//!   the token is not expired, and `sub` is non-empty.
//!
//! # Invariants
//! - Issuance and verification are stateless. Nothing is recorded about
//!   issued tokens, so there is no revocation before expiry.
//! - Expiry is checked with zero leeway.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::time::{SystemTimeSource, TimeSource};

/// Claims carried by a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject claim containing the username.
    /// An absent claim decodes as empty and is rejected by `TokenVerifier::verify`.
    #[serde(default)]
    pub sub: String,
    /// Expiry in seconds since Unix epoch.
    pub exp: u64,
    /// Issuer claim, set to the provider name of the issuing unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// A freshly signed token and its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
    /// Encoded token.
    pub token: String,
    /// Expiry in milliseconds since Unix epoch.
    pub expires: u64,
}

/// Why a token could not be issued or verified.
///
/// The verification causes are informational; callers see them folded into a
/// single unauthorized outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token signature does not match the secret.
    InvalidSignature,
    /// The token has expired.
    TokenExpired,
    /// The token is malformed or cannot be parsed.
    MalformedToken,
    /// The 'sub' claim is missing or empty.
    MissingSubClaim,
    /// The token could not be signed.
    Signing(String),
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "invalid JWT signature"),
            Self::TokenExpired => write!(f, "JWT has expired"),
            Self::MalformedToken => write!(f, "malformed JWT"),
            Self::MissingSubClaim => write!(f, "missing 'sub' claim in JWT"),
            Self::Signing(reason) => write!(f, "failed to sign JWT: {reason}"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Signs expiring tokens for verified subjects.
pub struct TokenIssuer {
    key: EncodingKey,
    lifetime_minutes: u64,
    issuer: Option<String>,
    time_source: Box<dyn TimeSource>,
}

impl TokenIssuer {
    /// Create an issuer using the system clock.
    #[must_use]
    pub fn new(secret: &[u8], lifetime_minutes: u64, issuer: Option<String>) -> Self {
        Self::with_time_source(secret, lifetime_minutes, issuer, Box::new(SystemTimeSource))
    }

    /// Create an issuer with an explicit clock.
    #[must_use]
    pub fn with_time_source(
        secret: &[u8],
        lifetime_minutes: u64,
        issuer: Option<String>,
        time_source: Box<dyn TimeSource>,
    ) -> Self {
        Self {
            key: EncodingKey::from_secret(secret),
            lifetime_minutes,
            issuer,
            time_source,
        }
    }

    /// Sign a token for `subject`.
    ///
    /// # Errors
    /// Returns `TokenError::Signing` if the claims cannot be encoded.
    pub fn issue(&self, subject: &str) -> Result<IssuedToken, TokenError> {
        let lifetime_ms = self.lifetime_minutes.saturating_mul(60_000);
        let expires = self.time_source.now_ms().saturating_add(lifetime_ms);

        let claims = Claims {
            sub: subject.to_string(),
            exp: expires / 1000,
            iss: self.issuer.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires })
    }
}

/// Verifies tokens signed with the unit's secret.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Verify `token` and return its claims.
    ///
    /// # Errors
    /// Returns `TokenError` describing why the token was rejected.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let token_data = decode::<Claims>(token, &self.key, &self.validation).map_err(map_jwt_error)?;

        if token_data.claims.sub.is_empty() {
            return Err(TokenError::MissingSubClaim);
        }

        Ok(token_data.claims)
    }
}

/// Maps jsonwebtoken errors to our `TokenError` type.
fn map_jwt_error(error: jsonwebtoken::errors::Error) -> TokenError {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::TokenExpired,
        ErrorKind::MissingRequiredClaim(claim) if claim == "sub" => TokenError::MissingSubClaim,
        _ => TokenError::MalformedToken,
    }
}
