//! The authentication unit: one configured secret, one credential store.
//!
//! # Pre-conditions
//! - The unit is built through `AuthUnit::init` or `AuthUnit::with_store`,
//!   which validate the configuration exactly once.
//!
//! # Post-conditions
//! - `authenticate` returns a token only after a successful store lookup or
//!   after verifying a presented token (re-authentication).
//! - `authorize` returns claims only for a token that passes signature and
//!   expiry checks.
//!
//! # Invariants
//! - A unit never mutates after construction. Concurrent calls share nothing
//!   but read-only state, so units can be held in an `Arc` and called freely.
//! - Units are independent: several may coexist with different secrets and
//!   stores.

use std::path::PathBuf;

use crate::config::{Configuration, ConfigurationError, UnitOptions, check_store_location};
use crate::descriptor::CapabilityDescriptor;
use crate::error::AuthError;
use crate::request::AuthRequest;
use crate::store::{CredentialStore, FileCredentialStore};
use crate::time::TimeSource;
use crate::token::{Claims, IssuedToken, TokenIssuer, TokenVerifier};

/// Configured authentication unit.
pub struct AuthUnit<S = FileCredentialStore> {
    config: Configuration,
    store: S,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
}

impl AuthUnit<FileCredentialStore> {
    /// Build a unit over a JSON credential file.
    ///
    /// The store location is checked before any option, so a missing store is
    /// reported even when the options are also invalid.
    ///
    /// # Errors
    /// Returns the first `ConfigurationError` found; no unit is created.
    pub fn init(
        secret: impl Into<Vec<u8>>,
        store_location: impl Into<PathBuf>,
        options: UnitOptions,
    ) -> Result<Self, ConfigurationError> {
        let store_location = store_location.into();
        check_store_location(&store_location)?;

        let unit = Self::with_store(secret, FileCredentialStore::new(store_location), options)?;
        tracing::debug!(
            "auth unit ready: store={}, token_lifetime_minutes={}",
            unit.store.path().display(),
            unit.config.token_lifetime_minutes()
        );
        Ok(unit)
    }
}

impl<S: CredentialStore> AuthUnit<S> {
    /// Kind tag a host uses to recognize this as an authentication unit.
    pub const KIND: &'static str = "auth";

    /// Build a unit over any credential store.
    ///
    /// # Errors
    /// Returns the first `ConfigurationError` found; no unit is created.
    pub fn with_store(
        secret: impl Into<Vec<u8>>,
        store: S,
        options: UnitOptions,
    ) -> Result<Self, ConfigurationError> {
        let config = Configuration::validate(secret, options)?;
        let issuer = TokenIssuer::new(
            config.secret(),
            config.token_lifetime_minutes(),
            Some(config.provider_name().to_string()),
        );
        let verifier = TokenVerifier::new(config.secret());

        Ok(Self {
            config,
            store,
            issuer,
            verifier,
        })
    }

    /// Replace the clock used to stamp token expiry.
    #[must_use]
    pub fn with_time_source(mut self, time_source: Box<dyn TimeSource>) -> Self {
        self.issuer = TokenIssuer::with_time_source(
            self.config.secret(),
            self.config.token_lifetime_minutes(),
            Some(self.config.provider_name().to_string()),
            time_source,
        );
        self
    }

    #[must_use]
    pub const fn config(&self) -> &Configuration {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Exchange credentials (or a still-valid token) for a fresh token.
    ///
    /// # Errors
    /// - `InvalidCredentials` if no credentials are present or they match no record.
    /// - `Unauthorized` if a presented re-authentication token fails verification.
    /// - `StoreUnavailable` if the store cannot be read.
    /// - `Signing` if the new token cannot be signed.
    pub async fn authenticate(&self, request: &AuthRequest) -> Result<IssuedToken, AuthError> {
        let subject = if let Some(credentials) = request.credentials() {
            let valid = self
                .store
                .lookup(&credentials.username, &credentials.password)
                .await
                .map_err(|e| {
                    tracing::warn!("credential store unavailable: {e}");
                    AuthError::StoreUnavailable(e)
                })?;
            if !valid {
                tracing::debug!("rejected credentials for {}", credentials.username);
                return Err(AuthError::InvalidCredentials);
            }
            credentials.username
        } else if let Some(token) = request.token() {
            let claims = self.verify(token)?;
            tracing::debug!("re-authenticating {} from presented token", claims.sub);
            claims.sub
        } else {
            tracing::debug!("authenticate called without credentials");
            return Err(AuthError::InvalidCredentials);
        };

        let issued = self.issuer.issue(&subject).map_err(|e| {
            tracing::warn!("failed to issue token: {e}");
            AuthError::Signing(e)
        })?;
        tracing::debug!("issued token for {subject}, expires={}", issued.expires);
        Ok(issued)
    }

    /// Verify the token a request carries and return its claims.
    ///
    /// # Errors
    /// - `NoToken` if the request carries no token.
    /// - `Unauthorized` if the token is tampered, malformed or expired.
    pub async fn authorize(&self, request: &AuthRequest) -> Result<Claims, AuthError> {
        let Some(token) = request.token() else {
            tracing::debug!("authorize called without a token");
            return Err(AuthError::NoToken);
        };
        self.verify(token)
    }

    /// Capability descriptor derived from the configuration.
    #[must_use]
    pub fn describe(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::from_config(&self.config)
    }

    fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verifier.verify(token).map_err(|e| {
            tracing::debug!("token rejected: {e}");
            AuthError::Unauthorized(e)
        })
    }
}
