//! Exonet DNS Authenticator Library
//!
//! Fulfills ACME dns-01 challenges by managing TXT records through the
//! Exonet API, for use as a Certbot manual hook.

pub mod authenticator;
pub mod credentials;
pub mod dns_service;
pub mod error;
pub mod exonet;
pub mod resource;

pub use authenticator::{AuthenticatorArgs, ExonetAuthenticator};
pub use dns_service::DnsService;
pub use error::DnsError;
pub use exonet::{ExonetApi, ExonetClient};
