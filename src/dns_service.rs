//! DNS Service
//!
//! Adds and removes ACME challenge TXT records on top of the Exonet client.

use tracing::{debug, info};

use crate::error::DnsError;
use crate::exonet::ExonetApi;
use crate::resource::{ApiResource, DnsRecord, Zone};

/// TTL of created challenge records, in seconds.
pub const TXT_RECORD_TTL: u32 = 3600;

/// DNS service over any Exonet API implementation
pub struct DnsService<C> {
    client: C,
}

impl<C: ExonetApi> DnsService<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Create the challenge TXT record for `domain_name`.
    ///
    /// `record_name` is the fully qualified record name (typically starting
    /// with `_acme-challenge.`), `record_content` the validation token.
    pub async fn add_txt_record(
        &self,
        domain_name: &str,
        record_name: &str,
        record_content: &str,
    ) -> Result<(), DnsError> {
        let zone = self.find_zone(domain_name).await?;

        debug!("Adding TXT record to DNS.");
        let record = DnsRecord::txt(
            &zone,
            &compute_record_name(&zone, record_name)?,
            &compute_record_content(record_content),
            TXT_RECORD_TTL,
        );

        let created = self
            .client
            .post_api_resource(&ApiResource::try_from(&record)?)
            .await?;

        info!(
            "Successfully added TXT record with id: {}",
            created.id.as_deref().unwrap_or("<none>")
        );
        Ok(())
    }

    /// Delete the challenge TXT records for `domain_name`.
    ///
    /// Only records whose name and content both match are removed, so
    /// records from concurrent validations of the same name survive.
    /// Individual delete failures are logged by the client and do not
    /// stop the remaining deletions.
    pub async fn del_txt_record(
        &self,
        domain_name: &str,
        record_name: &str,
        record_content: &str,
    ) -> Result<(), DnsError> {
        let zone = self.find_zone(domain_name).await?;

        let records = self
            .client
            .get_relation(&zone.identifier(), "records")
            .await
            .ok_or_else(|| DnsError::RecordsNotFound(zone.to_string()))?;

        let name = compute_record_name(&zone, record_name)?;
        let content = compute_record_content(record_content);

        let matching: Vec<DnsRecord> = records
            .into_iter()
            .filter_map(|resource| match DnsRecord::try_from(resource) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!("Skipping unreadable DNS record: {}", e);
                    None
                }
            })
            .filter(|record| {
                record.record_type == "TXT" && record.name == name && record.content == content
            })
            .collect();

        debug!(
            "Found {} matching TXT record(s) for {} in {}",
            matching.len(),
            record_name,
            zone.name
        );

        for record in &matching {
            if let Some(identifier) = record.identifier() {
                debug!("Deleting DNS record with id: {}", identifier.id);
                self.client.delete_api_resource(&identifier).await;
            }
        }

        Ok(())
    }

    async fn find_zone(&self, domain_name: &str) -> Result<Zone, DnsError> {
        let domain = registered_domain(domain_name)?;

        self.client
            .find_dns_zone_by_name(&domain)
            .await?
            .ok_or_else(|| DnsError::ZoneNotFound {
                domain: domain_name.to_string(),
                zone: domain,
            })
    }
}

// ============================================================
// Name and Content Helpers
// ============================================================

/// Registered domain of `domain_name`, using the public suffix list.
///
/// `_acme-challenge.sub.example.co.uk` becomes `example.co.uk`.
pub fn registered_domain(domain_name: &str) -> Result<String, DnsError> {
    let normalized = domain_name
        .trim_start_matches("*.")
        .trim_end_matches('.')
        .to_ascii_lowercase();

    psl::domain_str(&normalized)
        .map(str::to_string)
        .ok_or_else(|| DnsError::InvalidDomain(domain_name.to_string()))
}

/// Record name relative to `zone`: the trailing `".{zone}"` is stripped once.
///
/// Comparison ignores ASCII case and a trailing root dot, and the result is
/// lowercased. A name outside the zone is an error rather than being passed
/// through.
pub fn compute_record_name(zone: &Zone, full_record_name: &str) -> Result<String, DnsError> {
    let full = full_record_name.trim_end_matches('.');
    let suffix = format!(".{}", zone.name.trim_end_matches('.'));

    let split = full.len().checked_sub(suffix.len()).filter(|&at| {
        full.is_char_boundary(at) && full[at..].eq_ignore_ascii_case(&suffix)
    });

    match split {
        Some(at) if at > 0 => Ok(full[..at].to_ascii_lowercase()),
        _ => Err(DnsError::RecordOutsideZone {
            record: full_record_name.to_string(),
            zone: zone.name.clone(),
        }),
    }
}

/// TXT content wrapped in exactly one pair of double quotes.
pub fn compute_record_content(record_content: &str) -> String {
    let already_quoted = record_content.len() >= 2
        && record_content.starts_with('"')
        && record_content.ends_with('"');

    if already_quoted {
        record_content.to_string()
    } else {
        format!("\"{}\"", record_content)
    }
}
