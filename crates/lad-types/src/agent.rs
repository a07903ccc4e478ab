//! Discovered agents and discovery results.
//!
//! A [`DiscoveredAgent`] is created by the mDNS listener or the well-known
//! fetcher, enriched in place by the AgentCard verification pipeline, and
//! finally collected into a [`DiscoveryResult`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an agent was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoverySource {
    /// Multicast DNS service announcement.
    Mdns,
    /// `/.well-known/lad/agents` endpoint.
    #[serde(rename = "wellknown")]
    WellKnown,
    /// Constructed by the caller.
    #[default]
    Unknown,
}

impl fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoverySource::Mdns => write!(f, "mdns"),
            DiscoverySource::WellKnown => write!(f, "wellknown"),
            DiscoverySource::Unknown => write!(f, "unknown"),
        }
    }
}

/// How an agent's identity was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMethod {
    /// Not verified.
    #[default]
    None,
    /// Fetched over HTTPS with certificate verification enabled.
    Tls,
    /// `provider.organization` matches the AgentCard URL host.
    Domain,
    /// AgentCard signature verified against a configured public key.
    Jws,
}

impl fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationMethod::None => write!(f, "none"),
            VerificationMethod::Tls => write!(f, "tls"),
            VerificationMethod::Domain => write!(f, "domain"),
            VerificationMethod::Jws => write!(f, "jws"),
        }
    }
}

/// Which discovery mechanism produced the agents in a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMethod {
    /// Nothing was found.
    #[default]
    None,
    /// mDNS/DNS-SD.
    Mdns,
    /// Well-known endpoint fallback.
    #[serde(rename = "wellknown")]
    WellKnown,
}

impl fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryMethod::None => write!(f, "none"),
            DiscoveryMethod::Mdns => write!(f, "mdns"),
            DiscoveryMethod::WellKnown => write!(f, "wellknown"),
        }
    }
}

/// An agent discovered on the local network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredAgent {
    /// Human-readable agent name.
    pub name: String,
    /// Agent description.
    pub description: String,
    /// Agent role (e.g. "hotel-concierge").
    pub role: String,
    /// URL of the agent's AgentCard. May be rewritten by an mDNS update.
    pub agent_card_url: String,
    /// Capability names advertised before the card is fetched.
    #[serde(default)]
    pub capabilities_preview: Vec<String>,
    /// Discovery mechanism that produced this agent.
    #[serde(default)]
    pub source: DiscoverySource,
    /// The fetched AgentCard, populated only after a successful fetch.
    #[serde(default)]
    pub agent_card: Option<serde_json::Value>,
    /// Whether the agent's identity has been verified.
    #[serde(default)]
    pub verified: bool,
    /// How the agent was verified. Never `None` while `verified` is true.
    #[serde(default)]
    pub verification_method: VerificationMethod,
    /// Diagnostic from the last failed trust check.
    #[serde(default)]
    pub verification_error: Option<String>,
}

impl DiscoveredAgent {
    /// Create an unverified agent with no capabilities preview.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        role: impl Into<String>,
        agent_card_url: impl Into<String>,
        source: DiscoverySource,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            role: role.into(),
            agent_card_url: agent_card_url.into(),
            capabilities_preview: Vec::new(),
            source,
            agent_card: None,
            verified: false,
            verification_method: VerificationMethod::None,
            verification_error: None,
        }
    }

    /// Set the capabilities preview.
    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.capabilities_preview = capabilities;
        self
    }

    /// Mark the agent verified by `method`. `VerificationMethod::None` is ignored.
    pub fn mark_verified(&mut self, method: VerificationMethod) {
        if method == VerificationMethod::None {
            return;
        }
        self.verified = true;
        self.verification_method = method;
    }

    /// Clear the fetched card and every trust field.
    pub fn reset_verification(&mut self) {
        self.agent_card = None;
        self.verified = false;
        self.verification_method = VerificationMethod::None;
        self.verification_error = None;
    }

    /// Point the agent at a new AgentCard URL.
    ///
    /// Returns `true` if the URL changed, in which case the card and trust
    /// state are reset so the agent is re-verified on the next fetch.
    pub fn update_card_url(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.agent_card_url == url {
            return false;
        }
        self.agent_card_url = url;
        self.reset_verification();
        true
    }

    /// Whether the AgentCard URL uses HTTPS.
    pub fn uses_https(&self) -> bool {
        self.agent_card_url.starts_with("https://")
    }

    /// `provider.organization` from the fetched AgentCard, if any.
    pub fn provider_organization(&self) -> Option<&str> {
        self.agent_card
            .as_ref()?
            .get("provider")?
            .get("organization")?
            .as_str()
    }

    /// Skill ids from the fetched AgentCard.
    pub fn skill_ids(&self) -> Vec<String> {
        self.agent_card
            .as_ref()
            .and_then(|card| card.get("skills"))
            .and_then(|skills| skills.as_array())
            .map(|skills| {
                skills
                    .iter()
                    .filter_map(|s| s.get("id").and_then(|id| id.as_str()))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Result of a discovery run. Diagnostics are collected, never raised.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryResult {
    /// Agents in discovery order.
    pub agents: Vec<DiscoveredAgent>,
    /// SSID reported by the well-known endpoint.
    pub network_ssid: Option<String>,
    /// Realm reported by the well-known endpoint.
    pub network_realm: Option<String>,
    /// The source that actually yielded agents.
    pub discovery_method: DiscoveryMethod,
    /// Diagnostics from every stage, in the order they occurred.
    pub errors: Vec<String>,
    /// Number of agents dropped because they were not verified.
    pub filtered_unverified: usize,
}
