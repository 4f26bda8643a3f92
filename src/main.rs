//! Exonet DNS Hook for Certbot
//!
//! Answers ACME dns-01 challenges by creating and removing TXT records
//! through the Exonet API. Certbot runs it as a manual hook and passes
//! the challenge through `CERTBOT_*` environment variables.
//!
//! # Usage
//! ```bash
//! certbot certonly --manual --preferred-challenges dns \
//!   --manual-auth-hook "certbot-dns-exonet perform --credentials /etc/letsencrypt/exonet.ini" \
//!   --manual-cleanup-hook "certbot-dns-exonet cleanup --credentials /etc/letsencrypt/exonet.ini" \
//!   -d example.com
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use certbot_dns_exonet::authenticator::{validation_domain_name, DESCRIPTION, MORE_INFO};
use certbot_dns_exonet::exonet::EXONET_API_BASE;
use certbot_dns_exonet::{AuthenticatorArgs, ExonetAuthenticator};

// ============================================================
// CLI Definition
// ============================================================

#[derive(Parser)]
#[command(name = "certbot-dns-exonet")]
#[command(about = DESCRIPTION, long_about = None)]
#[command(version)]
struct Cli {
    /// Exonet API base URL
    #[arg(long, env = "EXONET_API_URL", default_value = EXONET_API_BASE, global = true)]
    api_url: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Args)]
struct ChallengeArgs {
    /// Domain being validated
    #[arg(long, env = "CERTBOT_DOMAIN")]
    domain: String,

    /// Validation string to publish
    #[arg(long, env = "CERTBOT_VALIDATION")]
    validation: String,

    /// Fully qualified record name (default: _acme-challenge.<domain>)
    #[arg(long)]
    validation_name: Option<String>,

    #[command(flatten)]
    plugin: AuthenticatorArgs,
}

impl ChallengeArgs {
    fn validation_name(&self) -> String {
        self.validation_name
            .clone()
            .unwrap_or_else(|| validation_domain_name(&self.domain))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the challenge TXT record (manual auth hook)
    Perform {
        #[command(flatten)]
        challenge: ChallengeArgs,

        /// Challenges Certbot still has to run after this one
        #[arg(long, env = "CERTBOT_REMAINING_CHALLENGES")]
        remaining_challenges: Option<u32>,
    },

    /// Remove the challenge TXT record (manual cleanup hook)
    Cleanup {
        #[command(flatten)]
        challenge: ChallengeArgs,
    },

    /// Describe what this hook does
    Info,
}

// ============================================================
// Main Entry Point
// ============================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_format);

    match cli.command {
        Commands::Perform {
            challenge,
            remaining_challenges,
        } => {
            let authenticator = ExonetAuthenticator::from_args(&challenge.plugin, &cli.api_url)
                .context("Failed to set up the Exonet authenticator")?;
            let validation_name = challenge.validation_name();

            authenticator
                .perform(&challenge.domain, &validation_name, &challenge.validation)
                .await
                .with_context(|| format!("Failed to add TXT record for {}", challenge.domain))?;

            // Certbot validates once the last hook of a batch returns.
            match remaining_challenges {
                Some(remaining) if remaining > 0 => {
                    info!("{} challenge(s) remaining, not waiting yet", remaining);
                }
                _ => authenticator.wait_for_propagation().await,
            }
        }

        Commands::Cleanup { challenge } => {
            let authenticator = ExonetAuthenticator::from_args(&challenge.plugin, &cli.api_url)
                .context("Failed to set up the Exonet authenticator")?;
            let validation_name = challenge.validation_name();

            authenticator
                .cleanup(&challenge.domain, &validation_name, &challenge.validation)
                .await
                .with_context(|| format!("Failed to remove TXT record for {}", challenge.domain))?;
        }

        Commands::Info => {
            println!("{}\n\n{}", DESCRIPTION, MORE_INFO);
        }
    }

    Ok(())
}

/// Log to stderr; Certbot keeps hook stdout for its own output.
fn init_logging(verbose: bool, format: LogFormat) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
