//! Exonet API Client
//!
//! Bearer-token client for the Exonet JSON:API. Handles zone lookup,
//! resource creation and deletion, and relationship traversal.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};

use crate::error::{DnsError, INVALID_TOKEN_HINT};
use crate::resource::{ApiResource, Document, ResourceIdentifier, Zone, DNS_ZONES};

pub const EXONET_API_BASE: &str = "https://api.exonet.nl";

const ACCEPT_HEADER: &str = "application/vnd.Exonet.v1+json";

/// Operations the DNS service needs from the provider.
#[async_trait]
pub trait ExonetApi: Send + Sync {
    /// Find the zone named exactly `domain`. HTTP failures are errors.
    async fn find_dns_zone_by_name(&self, domain: &str) -> Result<Option<Zone>, DnsError>;

    /// Create a resource. HTTP failures are errors carrying the response body.
    async fn post_api_resource(&self, resource: &ApiResource) -> Result<ApiResource, DnsError>;

    /// Delete a resource. Failures are logged, never returned.
    async fn delete_api_resource(&self, resource: &ResourceIdentifier);

    /// Fetch a related collection. Failures are logged and yield `None`.
    async fn get_relation(
        &self,
        resource: &ResourceIdentifier,
        relation: &str,
    ) -> Option<Vec<ApiResource>>;
}

/// Exonet API client
pub struct ExonetClient {
    http_client: Client,
    api_token: String,
    base_url: String,
}

impl ExonetClient {
    /// Create a client for the production API. The token is not checked until the first request.
    pub fn new(api_token: String) -> Result<Self, DnsError> {
        Self::with_base_url(api_token, EXONET_API_BASE.to_string())
    }

    /// Create a client against another API endpoint
    pub fn with_base_url(api_token: String, base_url: String) -> Result<Self, DnsError> {
        let http_client = Client::builder()
            .user_agent(concat!("certbot-dns-exonet/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            api_token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http_client
            .get(url)
            .bearer_auth(&self.api_token)
            .header(reqwest::header::ACCEPT, ACCEPT_HEADER)
    }

    /// Status line plus URL, the way the failure reads in logs.
    fn describe_failure(status: StatusCode, url: &str) -> String {
        format!("{} for url: {}", status, url)
    }

    async fn error_body(response: Response) -> String {
        response.text().await.unwrap_or_default()
    }
}

#[async_trait]
impl ExonetApi for ExonetClient {
    async fn find_dns_zone_by_name(&self, domain: &str) -> Result<Option<Zone>, DnsError> {
        debug!("Looking up DNS zone: {}", domain);

        let url = self.url(DNS_ZONES);
        let response = self
            .get(&url)
            .query(&[("filter[name]", domain)])
            .send()
            .await
            .map_err(|e| DnsError::ZoneLookup {
                reason: e.to_string(),
                hint: None,
            })?;

        let status = response.status();
        if !status.is_success() {
            let hint = (status == StatusCode::UNAUTHORIZED).then_some(INVALID_TOKEN_HINT);
            return Err(DnsError::ZoneLookup {
                reason: Self::describe_failure(status, &url),
                hint,
            });
        }

        let document: Document<Vec<ApiResource>> = response.json().await?;

        for resource in document.data {
            match Zone::try_from(resource) {
                Ok(zone) if zone.name == domain => {
                    debug!("Found DNS zone {} for domain {}", zone.name, domain);
                    return Ok(Some(zone));
                }
                Ok(_) => {}
                Err(e) => debug!("Skipping unreadable {} entry: {}", DNS_ZONES, e),
            }
        }

        Ok(None)
    }

    async fn post_api_resource(&self, resource: &ApiResource) -> Result<ApiResource, DnsError> {
        let url = self.url(&resource.resource_type);
        debug!("Posting {} resource", resource.resource_type);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_token)
            .header(reqwest::header::ACCEPT, ACCEPT_HEADER)
            .json(&Document { data: resource })
            .send()
            .await
            .map_err(|e| DnsError::CreateRecord(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            debug!(
                "Creating {} failed ({}): {}",
                resource.resource_type, status, body
            );
            return Err(DnsError::CreateRecord(body));
        }

        let created: Document<ApiResource> = response.json().await?;
        Ok(created.data)
    }

    async fn delete_api_resource(&self, resource: &ResourceIdentifier) {
        let url = self.url(&format!("{}/{}", resource.resource_type, resource.id));
        debug!("Deleting resource {}", resource);

        let result = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.api_token)
            .header(reqwest::header::ACCEPT, ACCEPT_HEADER)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Deleted resource {}", resource);
            }
            Ok(response) => {
                let status = response.status();
                let body = Self::error_body(response).await;
                warn!(
                    "Error deleting {} using the Exonet API: {}: {}",
                    resource,
                    Self::describe_failure(status, &url),
                    body
                );
            }
            Err(e) => {
                warn!("Error deleting {} using the Exonet API: {}", resource, e);
            }
        }
    }

    async fn get_relation(
        &self,
        resource: &ResourceIdentifier,
        relation: &str,
    ) -> Option<Vec<ApiResource>> {
        let url = self.url(&format!(
            "{}/{}/{}",
            resource.resource_type, resource.id, relation
        ));
        debug!("Fetching relation {} of {}", relation, resource);

        let response = match self.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Error fetching {} of {}: {}", relation, resource, e);
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = Self::error_body(response).await;
            warn!(
                "Error fetching {} of {} using the Exonet API: {}: {}",
                relation,
                resource,
                Self::describe_failure(status, &url),
                body
            );
            return None;
        }

        match response.json::<Document<Vec<ApiResource>>>().await {
            Ok(document) => Some(document.data),
            Err(e) => {
                warn!("Unreadable {} response for {}: {}", relation, resource, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{DnsRecord, DNS_RECORDS};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "kaSD0ffAD1ldSA92A0KODkaksda02KDAK";

    fn create_mock_client(mock_server: &MockServer) -> ExonetClient {
        ExonetClient::with_base_url(TOKEN.to_string(), mock_server.uri()).unwrap()
    }

    fn zone_json(id: &str, name: &str) -> serde_json::Value {
        json!({ "type": "dns_zones", "id": id, "attributes": { "name": name } })
    }

    #[test]
    fn test_new_does_no_io() {
        let client = ExonetClient::new("token".to_string()).unwrap();
        assert_eq!(client.base_url(), EXONET_API_BASE);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client =
            ExonetClient::with_base_url("token".to_string(), "http://localhost:1/".to_string())
                .unwrap();
        assert_eq!(client.url("dns_zones"), "http://localhost:1/dns_zones");
    }

    #[tokio::test]
    async fn test_find_dns_zone_by_name() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/dns_zones"))
            .and(query_param("filter[name]", "test.nl"))
            .and(header("Authorization", format!("Bearer {}", TOKEN).as_str()))
            .and(header("Accept", ACCEPT_HEADER))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [zone_json("BqgWr8dr0XV7", "test.nl")]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_mock_client(&mock_server);
        let zone = client.find_dns_zone_by_name("test.nl").await.unwrap();

        assert_eq!(
            zone,
            Some(Zone {
                id: "BqgWr8dr0XV7".to_string(),
                name: "test.nl".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_find_dns_zone_skips_inexact_matches() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/dns_zones"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    zone_json("AAAA", "sub.test.nl"),
                    zone_json("BBBB", "test.nl")
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = create_mock_client(&mock_server);
        let zone = client.find_dns_zone_by_name("test.nl").await.unwrap().unwrap();

        assert_eq!(zone.id, "BBBB");
    }

    #[tokio::test]
    async fn test_find_dns_zone_skips_malformed_entries() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/dns_zones"))
            .and(query_param("filter[name]", "test.nl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "type": "dns_zones", "id": "A", "attributes": { "name": null } },
                    zone_json("B", "test.nl")
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = create_mock_client(&mock_server);
        let zone = client.find_dns_zone_by_name("test.nl").await.unwrap();

        assert_eq!(
            zone,
            Some(Zone {
                id: "B".to_string(),
                name: "test.nl".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_find_dns_zone_absent() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/dns_zones"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&mock_server)
            .await;

        let client = create_mock_client(&mock_server);
        let zone = client.find_dns_zone_by_name("exodev.nl").await.unwrap();

        assert!(zone.is_none());
    }

    #[tokio::test]
    async fn test_find_dns_zone_unauthorized_hint() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/dns_zones"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthenticated."))
            .mount(&mock_server)
            .await;

        let client = create_mock_client(&mock_server);
        let err = client.find_dns_zone_by_name("exodev.nl").await.unwrap_err();

        assert!(matches!(err, DnsError::ZoneLookup { hint: Some(_), .. }));
        assert!(err
            .to_string()
            .contains("Did you provide a valid API token?"));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_find_dns_zone_server_error_has_no_hint() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/dns_zones"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let client = create_mock_client(&mock_server);
        let err = client.find_dns_zone_by_name("exodev.nl").await.unwrap_err();

        assert!(matches!(err, DnsError::ZoneLookup { hint: None, .. }));
        assert!(!err.to_string().contains("API token"));
    }

    #[tokio::test]
    async fn test_post_api_resource() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/dns_records"))
            .and(header("Authorization", format!("Bearer {}", TOKEN).as_str()))
            .and(body_partial_json(json!({
                "data": {
                    "type": "dns_records",
                    "attributes": { "type": "TXT", "name": "_acme-challenge", "ttl": 3600 },
                    "relationships": { "zone": { "data": { "type": "dns_zones", "id": "BqgWr8dr0XV7" } } }
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": {
                    "type": "dns_records",
                    "id": "LsaWr8dr0KSa",
                    "attributes": {
                        "type": "TXT",
                        "name": "_acme-challenge",
                        "content": "\"abc\"",
                        "ttl": 3600
                    }
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let zone = Zone {
            id: "BqgWr8dr0XV7".to_string(),
            name: "exodev.nl".to_string(),
        };
        let record = DnsRecord::txt(&zone, "_acme-challenge", "\"abc\"", 3600);
        let resource = ApiResource::try_from(&record).unwrap();

        let client = create_mock_client(&mock_server);
        let created = client.post_api_resource(&resource).await.unwrap();

        assert_eq!(created.id.as_deref(), Some("LsaWr8dr0KSa"));
    }

    #[tokio::test]
    async fn test_post_api_resource_error_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/dns_records"))
            .respond_with(
                ResponseTemplate::new(422).set_body_string(r#"{"errors":[{"detail":"Invalid name"}]}"#),
            )
            .mount(&mock_server)
            .await;

        let resource = ApiResource {
            resource_type: DNS_RECORDS.to_string(),
            id: None,
            attributes: Default::default(),
            relationships: Default::default(),
        };

        let client = create_mock_client(&mock_server);
        let err = client.post_api_resource(&resource).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            r#"Error adding TXT record using the Exonet API: {"errors":[{"detail":"Invalid name"}]}"#
        );
    }

    #[tokio::test]
    async fn test_delete_api_resource() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/dns_records/LsaWr8dr0KSa"))
            .and(header("Authorization", format!("Bearer {}", TOKEN).as_str()))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_mock_client(&mock_server);
        client
            .delete_api_resource(&ResourceIdentifier::new(DNS_RECORDS, "LsaWr8dr0KSa"))
            .await;
    }

    #[tokio::test]
    async fn test_delete_api_resource_failure_is_swallowed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_mock_client(&mock_server);
        // Returns unit; nothing to unwrap.
        client
            .delete_api_resource(&ResourceIdentifier::new(DNS_RECORDS, "missing"))
            .await;
    }

    #[tokio::test]
    async fn test_get_relation() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/dns_zones/BqgWr8dr0XV7/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "type": "dns_records",
                    "id": "LsaWr8dr0KSa",
                    "attributes": { "type": "TXT", "name": "_acme-challenge", "content": "\"abc\"", "ttl": 3600 }
                }]
            })))
            .mount(&mock_server)
            .await;

        let client = create_mock_client(&mock_server);
        let records = client
            .get_relation(&ResourceIdentifier::new(DNS_ZONES, "BqgWr8dr0XV7"), "records")
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_deref(), Some("LsaWr8dr0KSa"));
    }

    #[tokio::test]
    async fn test_get_relation_failure_is_absent() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/dns_zones/BqgWr8dr0XV7/records"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let client = create_mock_client(&mock_server);
        let records = client
            .get_relation(&ResourceIdentifier::new(DNS_ZONES, "BqgWr8dr0XV7"), "records")
            .await;

        assert!(records.is_none());
    }
}
