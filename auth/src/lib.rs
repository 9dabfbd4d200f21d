// Life of a request:
// 1. The host turns its framework request into an `AuthRequest`
// 2. authenticate:
//     - Username/password from query, else body
//     - Look the pair up in the credential store (re-read every call)
//     - On a match, sign a token that expires after the configured lifetime
//    authenticate with a token instead of credentials:
//     - Verify the token, then sign a fresh one for the same subject
//    authorize:
//     - Token from the authorization header, else query, else body
//     - Verify signature and expiry, return the claims
//
// Components:
//  - Configuration validation (runs once, at construction)
//  - Credential store
//  - Token issuer / verifier
//  - Capability descriptor

pub mod config;
pub mod descriptor;
pub mod error;
pub mod host;
pub mod request;
pub mod store;
pub mod time;
pub mod token;
pub mod unit;

pub use config::{Configuration, ConfigurationError, TransportScheme, UnitOptions};
pub use descriptor::CapabilityDescriptor;
pub use error::AuthError;
pub use request::{AuthRequest, Credentials};
pub use store::{CredentialRecord, CredentialStore, FileCredentialStore, InMemoryCredentialStore, StoreError};
pub use token::{Claims, IssuedToken, TokenError};
pub use unit::AuthUnit;
