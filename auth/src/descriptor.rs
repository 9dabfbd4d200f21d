//! Capability descriptor advertised to the owning provider.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{Configuration, TransportScheme};

/// Describes how a unit enforces authentication, independent of any request.
///
/// Serializes as the configured descriptor options with `provider`, `secured`
/// and `transportScheme` set on top.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDescriptor {
    pub secured: bool,
    pub provider: String,
    pub transport_scheme: TransportScheme,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl CapabilityDescriptor {
    /// Derive the descriptor for `config`.
    #[must_use]
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            secured: true,
            provider: config.provider_name().to_string(),
            transport_scheme: config.transport_scheme(),
            options: config.descriptor_options().clone(),
        }
    }
}
