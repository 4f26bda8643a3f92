//! Exonet Authenticator
//!
//! Fulfills dns-01 challenges for Certbot using the Exonet API. Certbot
//! drives it through the manual hook interface; the hook binary maps
//! each invocation onto [`ExonetAuthenticator::perform`] or
//! [`ExonetAuthenticator::cleanup`].

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::credentials::CredentialsConfiguration;
use crate::dns_service::DnsService;
use crate::error::DnsError;
use crate::exonet::{ExonetApi, ExonetClient};

pub const DESCRIPTION: &str = "Obtain certificates using a DNS TXT record with the Exonet DNS.";

pub const MORE_INFO: &str =
    "This plugin configures a DNS TXT record to respond to a dns-01 challenge using the Exonet API.";

/// Default wait after creating a record, in seconds.
pub const DEFAULT_PROPAGATION_SECONDS: u64 = 10;

/// Plugin arguments, flattened into the hook's CLI.
#[derive(Args, Debug, Clone)]
pub struct AuthenticatorArgs {
    #[arg(
        long,
        env = "DNS_EXONET_PROPAGATION_SECONDS",
        default_value_t = DEFAULT_PROPAGATION_SECONDS,
        help = "The number of seconds to wait for DNS to propagate before asking the ACME server to verify the DNS record."
    )]
    pub propagation_seconds: u64,

    #[arg(long, env = "DNS_EXONET_CREDENTIALS", help = "Exonet credentials INI file.")]
    pub credentials: Option<PathBuf>,

    /// API token for Exonet API (takes precedence over the credentials file)
    #[arg(long, env = "EXONET_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

impl AuthenticatorArgs {
    /// Resolve the API token from `--token` or the credentials file.
    pub fn resolve_token(&self) -> Result<String, DnsError> {
        if let Some(token) = self.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            return Ok(token.to_string());
        }

        let path = self.credentials.as_ref().ok_or_else(|| {
            DnsError::Credentials(
                "either --credentials or --token must be provided".to_string(),
            )
        })?;

        let credentials = CredentialsConfiguration::load(path)?;
        credentials.conf("token").ok_or_else(|| {
            DnsError::Credentials(format!("no token in {}", credentials.path().display()))
        })
    }
}

/// DNS Authenticator for the Exonet API
pub struct ExonetAuthenticator<C> {
    dns_service: DnsService<C>,
    propagation: Duration,
}

impl ExonetAuthenticator<ExonetClient> {
    /// Build an authenticator against `api_url` from the plugin arguments.
    pub fn from_args(args: &AuthenticatorArgs, api_url: &str) -> Result<Self, DnsError> {
        let token = args.resolve_token()?;
        let client = ExonetClient::with_base_url(token, api_url.to_string())?;
        Ok(Self::new(
            client,
            Duration::from_secs(args.propagation_seconds),
        ))
    }
}

impl<C: ExonetApi> ExonetAuthenticator<C> {
    pub fn new(client: C, propagation: Duration) -> Self {
        Self {
            dns_service: DnsService::new(client),
            propagation,
        }
    }

    pub fn more_info(&self) -> &'static str {
        MORE_INFO
    }

    /// Add the TXT record for a challenge.
    pub async fn perform(
        &self,
        domain: &str,
        validation_name: &str,
        validation: &str,
    ) -> Result<(), DnsError> {
        info!("Adding TXT record {} for {}", validation_name, domain);
        self.dns_service
            .add_txt_record(domain, validation_name, validation)
            .await
    }

    /// Wait for the new records to reach the provider's nameservers.
    pub async fn wait_for_propagation(&self) {
        if self.propagation.is_zero() {
            return;
        }
        info!(
            "Waiting {} seconds for DNS changes to propagate",
            self.propagation.as_secs()
        );
        tokio::time::sleep(self.propagation).await;
    }

    /// Remove the TXT record of a challenge.
    pub async fn cleanup(
        &self,
        domain: &str,
        validation_name: &str,
        validation: &str,
    ) -> Result<(), DnsError> {
        info!("Removing TXT record {} for {}", validation_name, domain);
        self.dns_service
            .del_txt_record(domain, validation_name, validation)
            .await
    }
}

/// Name of the challenge record for `domain`.
pub fn validation_domain_name(domain: &str) -> String {
    format!("_acme-challenge.{}", domain.trim_start_matches("*."))
}
