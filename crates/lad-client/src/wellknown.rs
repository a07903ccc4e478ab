//! Well-known endpoint discovery (`/.well-known/lad/agents`).

use crate::client::LadClient;
use lad_types::agent::{DiscoveredAgent, DiscoverySource, VerificationMethod};
use lad_types::card::{DiscoveryEntry, NetworkInfo};
use lad_types::error::{LadError, LadResult};
use lad_types::DISCOVERY_PATH;
use tracing::{debug, info, warn};

/// Agents and network metadata from one well-known response.
#[derive(Debug, Clone, Default)]
pub struct WellKnownListing {
    pub agents: Vec<DiscoveredAgent>,
    pub network: NetworkInfo,
}

/// Discovery URL for a base URL.
pub fn discovery_url(base_url: &str) -> String {
    format!("{}{DISCOVERY_PATH}", base_url.trim_end_matches('/'))
}

impl LadClient {
    /// GET `{base_url}/.well-known/lad/agents` and parse the listing.
    ///
    /// An HTTP error status, transport error, or malformed body fails the
    /// whole call. Individual entries missing `name` or `agent_card_url` are
    /// skipped. Agents are marked `tls`-verified only when the discovery URL
    /// itself is HTTPS and certificate verification is enabled.
    pub async fn fetch_wellknown(&self, base_url: &str) -> LadResult<WellKnownListing> {
        let url = discovery_url(base_url);
        debug!(url = %url, "Fetching well-known agent listing");

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| LadError::Discovery(format!("Request error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LadError::Discovery(format!("HTTP error: {status}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LadError::Discovery(format!("Invalid discovery response: {e}")))?;

        let network = body
            .get("network")
            .cloned()
            .and_then(|n| serde_json::from_value::<NetworkInfo>(n).ok())
            .unwrap_or_default();

        let transport_verified = self.config.verify_tls && url.starts_with("https://");
        let mut agents = Vec::new();
        for entry in body
            .get("agents")
            .and_then(|a| a.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default()
        {
            let entry: DiscoveryEntry = match serde_json::from_value(entry.clone()) {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed well-known agent entry");
                    continue;
                }
            };
            let mut agent = DiscoveredAgent::new(
                entry.name,
                entry.description,
                entry.role,
                entry.agent_card_url,
                DiscoverySource::WellKnown,
            )
            .with_capabilities(entry.capabilities_preview);
            if transport_verified {
                agent.mark_verified(VerificationMethod::Tls);
            }
            agents.push(agent);
        }

        info!(
            url = %url,
            count = agents.len(),
            ssid = ?network.ssid,
            realm = ?network.realm,
            "Well-known discovery finished"
        );
        Ok(WellKnownListing { agents, network })
    }

    /// Agents listed at `{base_url}/.well-known/lad/agents`.
    pub async fn discover_wellknown(&self, base_url: &str) -> LadResult<Vec<DiscoveredAgent>> {
        Ok(self.fetch_wellknown(base_url).await?.agents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_url() {
        assert_eq!(
            discovery_url("http://localhost:8080"),
            "http://localhost:8080/.well-known/lad/agents"
        );
        assert_eq!(
            discovery_url("https://hotel.example/"),
            "https://hotel.example/.well-known/lad/agents"
        );
    }
}
