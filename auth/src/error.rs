//! Failures returned by `authenticate` and `authorize`.

use crate::config::ERROR_PREFIX;
use crate::store::StoreError;
use crate::token::TokenError;

/// Status code for every authentication or authorization failure.
pub const UNAUTHORIZED: u16 = 401;

/// Status code for faults on the unit's side (store or signing).
pub const INTERNAL_ERROR: u16 = 500;

/// Error returned by a request-time operation.
#[derive(Debug)]
pub enum AuthError {
    /// The credential store could not be read or parsed.
    StoreUnavailable(StoreError),
    /// No stored record matches the submitted username and password.
    InvalidCredentials,
    /// The request carried no token.
    NoToken,
    /// The token failed verification. The cause is kept for logging only.
    Unauthorized(TokenError),
    /// A token could not be signed.
    Signing(TokenError),
}

impl AuthError {
    /// HTTP-style status code for this failure.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::InvalidCredentials | Self::NoToken | Self::Unauthorized(_) => UNAUTHORIZED,
            Self::StoreUnavailable(_) | Self::Signing(_) => INTERNAL_ERROR,
        }
    }

    /// Whether the failure is the caller's (401) rather than the unit's.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        self.code() == UNAUTHORIZED
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoreUnavailable(_) => write!(f, "{ERROR_PREFIX}: error reading auth store"),
            Self::InvalidCredentials => write!(f, "Invalid credentials."),
            Self::NoToken => write!(f, "No authorization token."),
            Self::Unauthorized(_) => write!(f, "Invalid authorization token."),
            Self::Signing(_) => write!(f, "{ERROR_PREFIX}: error signing token"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::StoreUnavailable(e) => Some(e),
            Self::Unauthorized(e) | Self::Signing(e) => Some(e),
            Self::InvalidCredentials | Self::NoToken => None,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(error: StoreError) -> Self {
        Self::StoreUnavailable(error)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(AuthError::InvalidCredentials.code(), 401);
        assert_eq!(AuthError::NoToken.code(), 401);
        assert_eq!(AuthError::Unauthorized(TokenError::TokenExpired).code(), 401);
        assert_eq!(
            AuthError::StoreUnavailable(StoreError::Io(std::io::Error::other("disk"))).code(),
            500
        );
        assert_eq!(AuthError::Signing(TokenError::Signing("x".into())).code(), 500);
    }

    #[test]
    fn test_messages() {
        assert_eq!(AuthError::InvalidCredentials.to_string(), "Invalid credentials.");
        assert_eq!(AuthError::NoToken.to_string(), "No authorization token.");
        assert_eq!(
            AuthError::StoreUnavailable(StoreError::Io(std::io::Error::other("disk"))).to_string(),
            "Auth plugin: error reading auth store"
        );
    }

    #[test]
    fn test_unauthorized_message_hides_cause() {
        let expired = AuthError::Unauthorized(TokenError::TokenExpired);
        let tampered = AuthError::Unauthorized(TokenError::InvalidSignature);
        let malformed = AuthError::Unauthorized(TokenError::MalformedToken);

        assert_eq!(expired.to_string(), tampered.to_string());
        assert_eq!(tampered.to_string(), malformed.to_string());
        assert_eq!(
            expired.source().map(ToString::to_string),
            Some("JWT has expired".to_string())
        );
    }
}
