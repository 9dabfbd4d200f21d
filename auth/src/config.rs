//! Unit configuration and its validation.
//!
//! # Pre-conditions
//! - The options bag may come from code (builder methods) or from JSON using
//!   the camelCase keys `tokenExpirationMinutes`, `transportScheme`, `useHttp`,
//!   `providerName` and `authSpecOptions`.
//!
//! # Post-conditions
//! - A `Configuration` only exists if every rule passed. There is no partially
//!   validated configuration.
//! - `Configuration` instances are immutable once created.
//!
//! # Invariants
//! - `secret` is never empty.
//! - `token_lifetime_minutes` is always `>= MIN_TOKEN_LIFETIME_MINUTES`.
//! - `descriptor_options` never contains the keys `provider` or `secured`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Prefix carried by every error message this unit produces.
pub const ERROR_PREFIX: &str = "Auth plugin";

/// Token lifetime used when the options do not name one.
pub const DEFAULT_TOKEN_LIFETIME_MINUTES: u64 = 60;

/// Smallest accepted token lifetime.
pub const MIN_TOKEN_LIFETIME_MINUTES: u64 = 5;

/// Provider name reported by the capability descriptor when none is configured.
pub const DEFAULT_PROVIDER_NAME: &str = "auth";

/// Descriptor keys the unit owns; extra descriptor options may not set them.
const RESERVED_DESCRIPTOR_KEYS: [&str; 2] = ["provider", "secured"];

/// Transport a consumer should expect credentials to be submitted over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportScheme {
    /// TLS-protected transport (https).
    #[default]
    Secure,
    /// Plain transport (http).
    Insecure,
}

impl TransportScheme {
    /// The wire name used in options and descriptors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Secure => "secure",
            Self::Insecure => "insecure",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "secure" => Some(Self::Secure),
            "insecure" => Some(Self::Insecure),
            _ => None,
        }
    }

    const fn from_use_http(use_http: bool) -> Self {
        if use_http { Self::Insecure } else { Self::Secure }
    }
}

impl std::fmt::Display for TransportScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a unit cannot be constructed.
///
/// Configuration errors are fatal: no unit exists after one is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The credential store path does not exist.
    StoreNotFound {
        /// The configured path.
        path: PathBuf,
    },
    /// The credential store exists but cannot be read.
    StoreUnreadable {
        /// The configured path.
        path: PathBuf,
        /// Why opening the store failed.
        reason: String,
    },
    /// The signing secret is empty.
    EmptySecret,
    /// `tokenExpirationMinutes` is not an integer or is below the minimum.
    InvalidTokenLifetime(String),
    /// `transportScheme` is not a recognized value.
    InvalidTransportScheme(String),
    /// `transportScheme` and `useHttp` disagree.
    ConflictingTransportScheme,
    /// `authSpecOptions` tries to set a key the unit owns.
    ReservedDescriptorKey(String),
}

impl ConfigurationError {
    /// Configuration failures carry no status code; they are not request outcomes.
    #[must_use]
    pub const fn code(&self) -> Option<u16> {
        None
    }
}

impl std::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoreNotFound { path } => {
                write!(f, "{ERROR_PREFIX}: {} not found", path.display())
            }
            Self::StoreUnreadable { path, reason } => {
                write!(
                    f,
                    "{ERROR_PREFIX}: {} could not be read: {reason}",
                    path.display()
                )
            }
            Self::EmptySecret => write!(f, "{ERROR_PREFIX}: \"secret\" must not be empty"),
            Self::InvalidTokenLifetime(value) => write!(
                f,
                "{ERROR_PREFIX}: \"tokenExpirationMinutes\" must be an integer >= {MIN_TOKEN_LIFETIME_MINUTES} (got {value})"
            ),
            Self::InvalidTransportScheme(value) => write!(
                f,
                "{ERROR_PREFIX}: \"transportScheme\" must be \"secure\" or \"insecure\" (got \"{value}\")"
            ),
            Self::ConflictingTransportScheme => write!(
                f,
                "{ERROR_PREFIX}: \"transportScheme\" and \"useHttp\" disagree"
            ),
            Self::ReservedDescriptorKey(key) => write!(
                f,
                "{ERROR_PREFIX}: \"{key}\" not allowed as an authSpecOptions key"
            ),
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Raw, unvalidated options bag.
///
/// Every field is optional; `Configuration::validate` applies the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnitOptions {
    /// Minutes until an issued token expires.
    /// Kept as a JSON number so fractional values are rejected, not truncated.
    pub token_expiration_minutes: Option<Number>,
    /// `"secure"` or `"insecure"`.
    pub transport_scheme: Option<String>,
    /// Legacy boolean form of the transport hint; `true` means insecure.
    pub use_http: Option<bool>,
    /// Provider name advertised by the descriptor and stamped as token issuer.
    pub provider_name: Option<String>,
    /// Extra key/value pairs merged into the capability descriptor.
    pub auth_spec_options: Map<String, Value>,
}

impl UnitOptions {
    #[must_use]
    pub fn with_token_expiration_minutes(mut self, minutes: u64) -> Self {
        self.token_expiration_minutes = Some(Number::from(minutes));
        self
    }

    #[must_use]
    pub fn with_transport_scheme(mut self, scheme: TransportScheme) -> Self {
        self.transport_scheme = Some(scheme.as_str().to_string());
        self
    }

    #[must_use]
    pub fn with_use_http(mut self, use_http: bool) -> Self {
        self.use_http = Some(use_http);
        self
    }

    #[must_use]
    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_descriptor_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.auth_spec_options.insert(key.into(), value);
        self
    }
}

/// Validated, immutable configuration owned by one unit.
#[derive(Clone)]
pub struct Configuration {
    secret: Vec<u8>,
    token_lifetime_minutes: u64,
    transport_scheme: TransportScheme,
    provider_name: String,
    descriptor_options: Map<String, Value>,
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("secret", &"<redacted>")
            .field("token_lifetime_minutes", &self.token_lifetime_minutes)
            .field("transport_scheme", &self.transport_scheme)
            .field("provider_name", &self.provider_name)
            .field("descriptor_options", &self.descriptor_options)
            .finish()
    }
}

impl Configuration {
    /// Validate the secret and the options bag.
    ///
    /// The store location is checked separately by `check_store_location`,
    /// which runs first when a unit is built over a file store.
    ///
    /// # Errors
    /// Returns the first rule violation found; nothing is constructed.
    pub fn validate(secret: impl Into<Vec<u8>>, options: UnitOptions) -> Result<Self, ConfigurationError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigurationError::EmptySecret);
        }

        let token_lifetime_minutes = validate_lifetime(options.token_expiration_minutes.as_ref())?;
        let transport_scheme =
            validate_transport(options.transport_scheme.as_deref(), options.use_http)?;

        if let Some(key) = RESERVED_DESCRIPTOR_KEYS
            .iter()
            .find(|key| options.auth_spec_options.contains_key(**key))
        {
            return Err(ConfigurationError::ReservedDescriptorKey((*key).to_string()));
        }

        let provider_name = options
            .provider_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_PROVIDER_NAME.to_string());

        Ok(Self {
            secret,
            token_lifetime_minutes,
            transport_scheme,
            provider_name,
            descriptor_options: options.auth_spec_options,
        })
    }

    #[must_use]
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    #[must_use]
    pub const fn token_lifetime_minutes(&self) -> u64 {
        self.token_lifetime_minutes
    }

    #[must_use]
    pub const fn transport_scheme(&self) -> TransportScheme {
        self.transport_scheme
    }

    #[must_use]
    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    #[must_use]
    pub const fn descriptor_options(&self) -> &Map<String, Value> {
        &self.descriptor_options
    }
}

/// Check that the credential store exists and can be opened for reading.
///
/// # Errors
/// `StoreNotFound` if nothing is at `path` (or it is a directory),
/// `StoreUnreadable` if it cannot be opened.
pub fn check_store_location(path: &Path) -> Result<(), ConfigurationError> {
    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConfigurationError::StoreNotFound {
            path: path.to_path_buf(),
        },
        _ => ConfigurationError::StoreUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    if !metadata.is_file() {
        return Err(ConfigurationError::StoreNotFound {
            path: path.to_path_buf(),
        });
    }

    std::fs::File::open(path).map_err(|e| ConfigurationError::StoreUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(())
}

fn validate_lifetime(value: Option<&Number>) -> Result<u64, ConfigurationError> {
    let Some(number) = value else {
        return Ok(DEFAULT_TOKEN_LIFETIME_MINUTES);
    };

    match number.as_u64() {
        Some(minutes) if minutes >= MIN_TOKEN_LIFETIME_MINUTES => Ok(minutes),
        _ => Err(ConfigurationError::InvalidTokenLifetime(number.to_string())),
    }
}

fn validate_transport(
    scheme: Option<&str>,
    use_http: Option<bool>,
) -> Result<TransportScheme, ConfigurationError> {
    let from_scheme = scheme
        .map(|value| {
            TransportScheme::parse(value)
                .ok_or_else(|| ConfigurationError::InvalidTransportScheme(value.to_string()))
        })
        .transpose()?;
    let from_flag = use_http.map(TransportScheme::from_use_http);

    match (from_scheme, from_flag) {
        (Some(a), Some(b)) if a != b => Err(ConfigurationError::ConflictingTransportScheme),
        (Some(scheme), _) | (None, Some(scheme)) => Ok(scheme),
        (None, None) => Ok(TransportScheme::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options_from(value: Value) -> UnitOptions {
        serde_json::from_value(value).expect("valid options json")
    }

    #[test]
    fn test_defaults() {
        let config = Configuration::validate("secret", UnitOptions::default()).expect("valid config");

        assert_eq!(config.token_lifetime_minutes(), DEFAULT_TOKEN_LIFETIME_MINUTES);
        assert_eq!(config.transport_scheme(), TransportScheme::Secure);
        assert_eq!(config.provider_name(), DEFAULT_PROVIDER_NAME);
        assert!(config.descriptor_options().is_empty());
        assert_eq!(config.secret(), b"secret");
    }

    #[test]
    fn test_empty_secret() {
        let result = Configuration::validate(Vec::new(), UnitOptions::default());
        assert!(matches!(result, Err(ConfigurationError::EmptySecret)));
    }

    #[test]
    fn test_lifetime_minimum_accepted() {
        let options = UnitOptions::default().with_token_expiration_minutes(5);
        let config = Configuration::validate("secret", options).expect("valid config");
        assert_eq!(config.token_lifetime_minutes(), 5);
    }

    #[test]
    fn test_lifetime_below_minimum() {
        for minutes in [0, 1, 4] {
            let options = UnitOptions::default().with_token_expiration_minutes(minutes);
            let result = Configuration::validate("secret", options);
            assert!(
                matches!(result, Err(ConfigurationError::InvalidTokenLifetime(_))),
                "{minutes} minutes should be rejected"
            );
        }
    }

    #[test]
    fn test_lifetime_negative_and_fractional() {
        for value in [json!(-1), json!(7.5), json!(60.0)] {
            let options = options_from(json!({ "tokenExpirationMinutes": value }));
            let result = Configuration::validate("secret", options);
            assert!(matches!(result, Err(ConfigurationError::InvalidTokenLifetime(_))));
        }
    }

    #[test]
    fn test_lifetime_error_message() {
        let options = options_from(json!({ "tokenExpirationMinutes": -1 }));
        let error = Configuration::validate("secret", options).expect_err("must fail");

        assert!(error.to_string().starts_with("Auth plugin: "));
        assert!(
            error
                .to_string()
                .contains("\"tokenExpirationMinutes\" must be an integer >= 5")
        );
        assert_eq!(error.code(), None);
    }

    #[test]
    fn test_transport_scheme_values() {
        let insecure = options_from(json!({ "transportScheme": "insecure" }));
        let config = Configuration::validate("secret", insecure).expect("valid config");
        assert_eq!(config.transport_scheme(), TransportScheme::Insecure);

        let use_http = UnitOptions::default().with_use_http(true);
        let config = Configuration::validate("secret", use_http).expect("valid config");
        assert_eq!(config.transport_scheme(), TransportScheme::Insecure);

        let agreeing = UnitOptions::default()
            .with_use_http(false)
            .with_transport_scheme(TransportScheme::Secure);
        let config = Configuration::validate("secret", agreeing).expect("valid config");
        assert_eq!(config.transport_scheme(), TransportScheme::Secure);
    }

    #[test]
    fn test_transport_scheme_invalid() {
        let options = options_from(json!({ "transportScheme": "carrier-pigeon" }));
        let result = Configuration::validate("secret", options);
        assert_eq!(
            result.map(|_| ()),
            Err(ConfigurationError::InvalidTransportScheme("carrier-pigeon".to_string()))
        );
    }

    #[test]
    fn test_transport_scheme_conflict() {
        let options = UnitOptions::default()
            .with_transport_scheme(TransportScheme::Secure)
            .with_use_http(true);
        let result = Configuration::validate("secret", options);
        assert!(matches!(result, Err(ConfigurationError::ConflictingTransportScheme)));
    }

    #[test]
    fn test_reserved_descriptor_keys() {
        for key in ["provider", "secured"] {
            let options = UnitOptions::default().with_descriptor_option(key, json!(true));
            let error = Configuration::validate("secret", options).expect_err("must fail");
            assert_eq!(error, ConfigurationError::ReservedDescriptorKey(key.to_string()));
            assert_eq!(
                error.to_string(),
                format!("Auth plugin: \"{key}\" not allowed as an authSpecOptions key")
            );
        }
    }

    #[test]
    fn test_lifetime_checked_before_transport() {
        let options = options_from(json!({
            "tokenExpirationMinutes": 1,
            "transportScheme": "bogus",
        }));
        let result = Configuration::validate("secret", options);
        assert!(matches!(result, Err(ConfigurationError::InvalidTokenLifetime(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = Configuration::validate("super-secret-value", UnitOptions::default())
            .expect("valid config");
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-value"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_check_store_location_missing() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("userz-store.json");

        let error = check_store_location(&path).expect_err("must fail");
        assert_eq!(error, ConfigurationError::StoreNotFound { path: path.clone() });
        assert_eq!(
            error.to_string(),
            format!("Auth plugin: {} not found", path.display())
        );
    }

    #[test]
    fn test_check_store_location_directory() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let result = check_store_location(temp_dir.path());
        assert!(matches!(result, Err(ConfigurationError::StoreNotFound { .. })));
    }

    #[test]
    fn test_check_store_location_existing() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("user-store.json");
        std::fs::write(&path, "[]").expect("write store");

        assert!(check_store_location(&path).is_ok());
    }
}
