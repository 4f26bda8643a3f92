//! Exonet DNS error types

use thiserror::Error;

/// Hint attached to zone lookup failures caused by a rejected token.
pub const INVALID_TOKEN_HINT: &str = "Did you provide a valid API token?";

/// Errors surfaced by the Exonet client, the DNS service and the credentials loader.
#[derive(Error, Debug)]
pub enum DnsError {
    #[error("Unable to find DNS zone for {domain}. Zone {zone} not found.")]
    ZoneNotFound { domain: String, zone: String },

    #[error("Unable to find DNS records for {0}.")]
    RecordsNotFound(String),

    /// HTTP failure while resolving a zone. The hint is rendered in parentheses.
    #[error("Error finding DNS zone using the Exonet API: {reason}{}", hint_suffix(.hint))]
    ZoneLookup {
        reason: String,
        hint: Option<&'static str>,
    },

    #[error("Error adding TXT record using the Exonet API: {0}")]
    CreateRecord(String),

    #[error("Record {record} is not part of DNS zone {zone}")]
    RecordOutsideZone { record: String, zone: String },

    #[error("Unable to determine the registered domain of {0}")]
    InvalidDomain(String),

    #[error("Malformed Exonet API resource: {0}")]
    MalformedResource(String),

    #[error("Invalid credentials: {0}")]
    Credentials(String),

    #[error("Credentials file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
}

fn hint_suffix(hint: &Option<&'static str>) -> String {
    hint.map(|h| format!(" ({})", h)).unwrap_or_default()
}
