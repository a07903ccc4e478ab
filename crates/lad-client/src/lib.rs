//! Local Agent Discovery client.
//!
//! Finds agents on the local network via mDNS (`_a2a._tcp`) or a
//! `/.well-known/lad/agents` fallback, fetches and verifies their AgentCards
//! (TLS, JWS signature, or domain match), and gates the result behind a
//! consent callback.
//!
//! ```no_run
//! use lad_client::{DiscoverOptions, LadClient};
//! use lad_types::config::ClientConfig;
//!
//! # async fn run() -> lad_types::error::LadResult<()> {
//! let client = LadClient::new(ClientConfig::default())?;
//! let options = DiscoverOptions {
//!     fallback_url: Some("https://hotel.example".to_string()),
//!     ..Default::default()
//! };
//! let result = client.discover_with_consent(None, &options).await;
//! for agent in &result.agents {
//!     println!("{} ({})", agent.name, agent.verification_method);
//! }
//! # Ok(())
//! # }
//! ```

pub mod card;
pub mod client;
pub mod consent;
pub mod discovery;
pub mod mdns;
pub mod wellknown;

pub use card::{verify_domain, CardResponse, FetchOptions};
pub use client::LadClient;
pub use consent::{apply_consent, create_consent_request, ConsentCallback, DefaultConsent, FnConsent};
pub use discovery::DiscoverOptions;
pub use mdns::{MdnsEvent, MdnsListener, MdnsSdBrowser, ResolvedService, ServiceBrowser};
pub use wellknown::WellKnownListing;

use lad_types::agent::DiscoveryResult;
use lad_types::config::ClientConfig;
use lad_types::error::LadResult;

/// Discover agents with `config`, applying the default consent policy.
pub async fn discover_agents(config: ClientConfig) -> LadResult<DiscoveryResult> {
    let client = LadClient::new(config)?;
    let options = DiscoverOptions::from_config(client.config());
    Ok(client.discover_with_consent(None, &options).await)
}
