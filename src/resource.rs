//! Exonet API Resources
//!
//! The Exonet API speaks JSON:API: every resource is a `{type, id,
//! attributes, relationships}` object wrapped in a `data` document.
//! This module holds the generic wire types and the typed `Zone` and
//! `DnsRecord` views the rest of the crate works with.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::DnsError;

/// Resource type of DNS zones.
pub const DNS_ZONES: &str = "dns_zones";
/// Resource type of DNS records.
pub const DNS_RECORDS: &str = "dns_records";

// ============================================================
// Generic JSON:API Types
// ============================================================

/// Top-level document; `T` is a single resource or a list of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document<T> {
    pub data: T,
}

/// Addresses a remote resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(resource_type: &str, id: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.id)
    }
}

/// Relationship object. Links sent by the API are ignored and `data` is
/// kept raw, since to-many relationships carry a list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Relationship {
    pub fn to_one(target: &ResourceIdentifier) -> Self {
        Self {
            data: serde_json::to_value(target).ok(),
        }
    }

    /// Target of a to-one relationship, if that is what this is.
    pub fn target(&self) -> Option<ResourceIdentifier> {
        self.data
            .clone()
            .and_then(|data| serde_json::from_value(data).ok())
    }
}

/// A resource as it travels over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, Relationship>,
}

impl ApiResource {
    /// Identifier of a resource that exists remotely.
    pub fn identifier(&self) -> Result<ResourceIdentifier, DnsError> {
        let id = self.id.as_deref().ok_or_else(|| {
            DnsError::MalformedResource(format!("{} resource without id", self.resource_type))
        })?;
        Ok(ResourceIdentifier::new(&self.resource_type, id))
    }

    fn expect_type(&self, resource_type: &str) -> Result<(), DnsError> {
        if self.resource_type != resource_type {
            return Err(DnsError::MalformedResource(format!(
                "expected {} resource, got {}",
                resource_type, self.resource_type
            )));
        }
        Ok(())
    }

    fn decode_attributes<T: serde::de::DeserializeOwned>(&self) -> Result<T, DnsError> {
        Ok(serde_json::from_value(serde_json::Value::Object(
            self.attributes.clone(),
        ))?)
    }
}

// ============================================================
// Typed Resources
// ============================================================

#[derive(Debug, Deserialize)]
struct ZoneAttributes {
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordAttributes {
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    content: String,
    #[serde(default)]
    ttl: u32,
}

/// A DNS zone; its name is the registered domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub id: String,
    pub name: String,
}

impl Zone {
    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(DNS_ZONES, &self.id)
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

impl TryFrom<ApiResource> for Zone {
    type Error = DnsError;

    fn try_from(resource: ApiResource) -> Result<Self, Self::Error> {
        resource.expect_type(DNS_ZONES)?;
        let id = resource.identifier()?.id;
        let attributes: ZoneAttributes = resource.decode_attributes()?;
        Ok(Self {
            id,
            name: attributes.name,
        })
    }
}

/// A DNS record. `id` is `None` until the record has been created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    pub id: Option<String>,
    pub record_type: String,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    pub zone: Option<ResourceIdentifier>,
}

impl DnsRecord {
    /// New TXT record in `zone`, not yet submitted.
    pub fn txt(zone: &Zone, name: &str, content: &str, ttl: u32) -> Self {
        Self {
            id: None,
            record_type: "TXT".to_string(),
            name: name.to_string(),
            content: content.to_string(),
            ttl,
            zone: Some(zone.identifier()),
        }
    }

    pub fn identifier(&self) -> Option<ResourceIdentifier> {
        self.id
            .as_deref()
            .map(|id| ResourceIdentifier::new(DNS_RECORDS, id))
    }
}

impl TryFrom<ApiResource> for DnsRecord {
    type Error = DnsError;

    fn try_from(resource: ApiResource) -> Result<Self, Self::Error> {
        resource.expect_type(DNS_RECORDS)?;
        let attributes: RecordAttributes = resource.decode_attributes()?;
        let zone = resource
            .relationships
            .get("zone")
            .and_then(Relationship::target);
        Ok(Self {
            id: resource.id,
            record_type: attributes.record_type,
            name: attributes.name,
            content: attributes.content,
            ttl: attributes.ttl,
            zone,
        })
    }
}

impl TryFrom<&DnsRecord> for ApiResource {
    type Error = DnsError;

    fn try_from(record: &DnsRecord) -> Result<Self, Self::Error> {
        let attributes = RecordAttributes {
            record_type: record.record_type.clone(),
            name: record.name.clone(),
            content: record.content.clone(),
            ttl: record.ttl,
        };
        let attributes = match serde_json::to_value(attributes)? {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(DnsError::MalformedResource(format!(
                    "record attributes serialized to {}",
                    other
                )))
            }
        };

        let mut relationships = BTreeMap::new();
        if let Some(zone) = &record.zone {
            relationships.insert("zone".to_string(), Relationship::to_one(zone));
        }

        Ok(Self {
            resource_type: DNS_RECORDS.to_string(),
            id: record.id.clone(),
            attributes,
            relationships,
        })
    }
}
