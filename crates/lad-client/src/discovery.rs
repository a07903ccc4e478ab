//! Discovery orchestration: mDNS first, well-known fallback, then per-agent
//! AgentCard verification.

use crate::client::LadClient;
use lad_types::agent::{DiscoveryMethod, DiscoveryResult};
use lad_types::config::ClientConfig;
use tracing::{error, info, warn};

/// Parameters of one discovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverOptions {
    /// Base URL for well-known discovery.
    pub fallback_url: Option<String>,
    /// Browse mDNS first.
    pub try_mdns: bool,
    /// Fetch and verify every agent's AgentCard.
    pub fetch_cards: bool,
    /// Drop agents that end up unverified.
    pub require_verified: bool,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self {
            fallback_url: None,
            try_mdns: true,
            fetch_cards: true,
            require_verified: false,
        }
    }
}

impl DiscoverOptions {
    /// Options taken from client configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            fallback_url: config.fallback_url.clone(),
            try_mdns: config.try_mdns,
            fetch_cards: config.fetch_cards,
            require_verified: config.require_verified,
        }
    }

    fn fallback_is_https(&self) -> bool {
        self.fallback_url
            .as_deref()
            .is_some_and(|u| u.starts_with("https://"))
    }
}

impl LadClient {
    /// Discover agents with options from the client configuration.
    pub async fn discover_default(&self) -> DiscoveryResult {
        self.discover(&DiscoverOptions::from_config(&self.config)).await
    }

    /// Run one discovery pass. Never fails; diagnostics land in
    /// `DiscoveryResult::errors`.
    ///
    /// The first source that yields at least one agent wins: if mDNS finds
    /// anything the well-known fallback is not consulted, even if none of the
    /// mDNS agents later verify.
    pub async fn discover(&self, options: &DiscoverOptions) -> DiscoveryResult {
        let mut result = DiscoveryResult::default();

        if options.try_mdns {
            match self.browse_mdns(options.fallback_is_https()).await {
                Ok(agents) if !agents.is_empty() => {
                    result.agents = agents;
                    result.discovery_method = DiscoveryMethod::Mdns;
                }
                Ok(_) => info!("No agents found via mDNS"),
                Err(e) => {
                    error!(error = %e, "mDNS discovery failed");
                    result.errors.push(format!("mDNS discovery failed: {e}"));
                }
            }
        }

        if result.agents.is_empty() {
            if let Some(base_url) = &options.fallback_url {
                match self.fetch_wellknown(base_url).await {
                    Ok(listing) => {
                        result.network_ssid = listing.network.ssid;
                        result.network_realm = listing.network.realm;
                        if !listing.agents.is_empty() {
                            result.agents = listing.agents;
                            result.discovery_method = DiscoveryMethod::WellKnown;
                        }
                    }
                    Err(e) => {
                        error!(url = %base_url, error = %e, "Well-known discovery failed");
                        result
                            .errors
                            .push(format!("Well-known discovery failed for {base_url}: {e}"));
                    }
                }
            }
        }

        if options.fetch_cards {
            for agent in result.agents.iter_mut() {
                if let Err(e) = self.fetch_agent_card(agent).await {
                    error!(agent = %agent.name, error = %e, "AgentCard fetch failed");
                    result
                        .errors
                        .push(format!("Failed to fetch AgentCard for {}: {e}", agent.name));
                }
            }
        }

        if options.require_verified {
            let before = result.agents.len();
            result.agents.retain(|a| a.verified);
            result.filtered_unverified = before - result.agents.len();
            if result.filtered_unverified > 0 {
                warn!(
                    filtered = result.filtered_unverified,
                    "Dropped unverified agents"
                );
            }
        }

        info!(
            method = %result.discovery_method,
            agents = result.agents.len(),
            errors = result.errors.len(),
            "Discovery complete"
        );
        result
    }
}
