//! Clap CLI definitions for `lad`.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub const AFTER_HELP: &str = "\
\x1b[1;36mExamples:\x1b[0m
  lad init                                 Write ~/.lad/config.toml
  lad serve --name \"Hotel Concierge\"       Advertise an agent on this network
  lad discover                             Find agents via mDNS
  lad discover --url https://hotel.example Fall back to the well-known endpoint
  lad discover --with-consent              Approve each agent interactively
  lad keygen ~/.lad/keys                   Generate an ES256 signing key pair";

/// LAD: discover AI agents on the local network.
#[derive(Parser, Debug)]
#[command(name = "lad", version, about, after_help = AFTER_HELP)]
pub struct Cli {
    /// Path to config file (default: ~/.lad/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a LAD server advertising one agent.
    Serve(ServeArgs),
    /// Discover agents on the local network.
    Discover(DiscoverArgs),
    /// Generate an ES256 key pair for AgentCard signing.
    Keygen {
        /// Directory for private.pem and public.pem.
        dir: PathBuf,
    },
    /// Write an example configuration file.
    Init {
        /// Destination (default: ~/.lad/config.toml).
        path: Option<PathBuf>,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Flags for `lad serve`. Each one overrides the configuration file.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Agent display name.
    #[arg(long)]
    pub name: Option<String>,
    /// Agent description.
    #[arg(long)]
    pub description: Option<String>,
    /// Agent role, e.g. hotel-concierge.
    #[arg(long)]
    pub role: Option<String>,
    /// Comma-separated capabilities.
    #[arg(long, value_delimiter = ',')]
    pub capabilities: Option<Vec<String>>,
    /// Bind address.
    #[arg(long)]
    pub host: Option<String>,
    /// Bind port.
    #[arg(long)]
    pub port: Option<u16>,
    /// Network SSID reported in the discovery document.
    #[arg(long)]
    pub ssid: Option<String>,
    /// Network realm (organization domain).
    #[arg(long)]
    pub realm: Option<String>,
    /// Address placed in generated URLs instead of the detected one.
    #[arg(long)]
    pub advertise_host: Option<String>,
    /// Disable mDNS advertisement.
    #[arg(long)]
    pub no_mdns: bool,
    /// TLS certificate (PEM). Enables HTTPS together with --ssl-keyfile.
    #[arg(long, requires = "ssl_keyfile")]
    pub ssl_certfile: Option<PathBuf>,
    /// TLS private key (PEM).
    #[arg(long, requires = "ssl_certfile")]
    pub ssl_keyfile: Option<PathBuf>,
    /// Private key (PEM) for AgentCard signing. Enables signing.
    #[arg(long)]
    pub signing_key: Option<PathBuf>,
    /// Key id placed in the JWS header.
    #[arg(long)]
    pub signing_key_id: Option<String>,
    /// Authentication method declared in the AgentCard.
    #[arg(long, value_enum)]
    pub auth_method: Option<AuthMethod>,
    /// OAuth2/OIDC token endpoint.
    #[arg(long)]
    pub auth_token_url: Option<String>,
    /// OAuth2/OIDC authorization endpoint.
    #[arg(long)]
    pub auth_authorization_url: Option<String>,
    /// OIDC issuer.
    #[arg(long)]
    pub auth_issuer: Option<String>,
    /// OIDC JWKS URI.
    #[arg(long)]
    pub auth_jwks_uri: Option<String>,
    /// Comma-separated OAuth2/OIDC scopes.
    #[arg(long, value_delimiter = ',')]
    pub auth_scopes: Option<Vec<String>>,
    /// Public OAuth2/OIDC client id.
    #[arg(long)]
    pub auth_client_id: Option<String>,
    /// Header carrying an API key.
    #[arg(long)]
    pub auth_header_name: Option<String>,
    /// Link to authentication setup docs.
    #[arg(long)]
    pub auth_docs_url: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMethod {
    #[value(name = "none")]
    None,
    #[value(name = "oauth2")]
    OAuth2,
    #[value(name = "oidc")]
    Oidc,
    #[value(name = "api_key")]
    ApiKey,
    #[value(name = "bearer")]
    Bearer,
}

/// Flags for `lad discover`. Each one overrides the configuration file.
#[derive(Args, Debug, Default)]
pub struct DiscoverArgs {
    /// Fallback base URL for /.well-known/lad/agents.
    #[arg(long)]
    pub url: Option<String>,
    /// Skip mDNS and use only the fallback URL.
    #[arg(long)]
    pub no_mdns: bool,
    /// Seconds to listen for mDNS announcements.
    #[arg(long)]
    pub timeout: Option<f64>,
    /// Accept invalid TLS certificates (development only).
    #[arg(long)]
    pub no_verify_tls: bool,
    /// Extra trusted CA bundle (PEM).
    #[arg(long)]
    pub ca_bundle: Option<PathBuf>,
    /// Drop agents that could not be verified.
    #[arg(long)]
    pub require_verified: bool,
    /// Ask before accepting each agent.
    #[arg(long)]
    pub with_consent: bool,
    /// Public key (PEM) for verifying signed AgentCards.
    #[arg(long)]
    pub signing_public_key: Option<PathBuf>,
    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_flags() {
        let cli = Cli::try_parse_from([
            "lad",
            "serve",
            "--name",
            "Hotel Concierge",
            "--capabilities",
            "info,dining",
            "--port",
            "9000",
            "--no-mdns",
            "--auth-method",
            "api_key",
        ])
        .unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.name.as_deref(), Some("Hotel Concierge"));
        assert_eq!(
            args.capabilities,
            Some(vec!["info".to_string(), "dining".to_string()])
        );
        assert_eq!(args.port, Some(9000));
        assert!(args.no_mdns);
        assert_eq!(args.auth_method, Some(AuthMethod::ApiKey));
    }

    #[test]
    fn test_tls_flags_come_in_pairs() {
        let err = Cli::try_parse_from(["lad", "serve", "--ssl-certfile", "cert.pem"]);
        assert!(err.is_err());
    }

    #[test]
    fn test_parse_discover_flags() {
        let cli = Cli::try_parse_from([
            "lad",
            "--config",
            "/tmp/lad.toml",
            "discover",
            "--url",
            "https://hotel.example",
            "--timeout",
            "1.5",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/lad.toml")));
        let Commands::Discover(args) = cli.command else {
            panic!("expected discover");
        };
        assert_eq!(args.url.as_deref(), Some("https://hotel.example"));
        assert_eq!(args.timeout, Some(1.5));
        assert!(args.json);
        assert!(!args.with_consent);
    }

    #[test]
    fn test_parse_init_and_keygen() {
        let cli = Cli::try_parse_from(["lad", "keygen", "/tmp/keys"]).unwrap();
        assert!(matches!(cli.command, Commands::Keygen { .. }));
        let cli = Cli::try_parse_from(["lad", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Init {
                path: None,
                force: true
            }
        ));
    }
}
