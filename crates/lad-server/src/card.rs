//! Discovery document and AgentCard generation.

use lad_types::card::{
    AgentCapabilities, AgentCard, AgentConfig, AgentProvider, AgentSkill, DiscoveryEntry,
    DiscoveryResponse, NetworkInfo,
};
use lad_types::card_signing::CardSigner;
use lad_types::{AGENT_CARD_PATH, PROTOCOL_VERSION};
use tracing::{debug, error};

/// Builds the documents a LAD server serves for one agent.
#[derive(Debug, Clone)]
pub struct CardGenerator {
    agent: AgentConfig,
    base_url: String,
    network_ssid: Option<String>,
    realm: String,
}

impl CardGenerator {
    /// `base_url` is `{scheme}://{host}:{port}` without a trailing slash.
    pub fn new(
        agent: AgentConfig,
        base_url: impl Into<String>,
        network_ssid: Option<String>,
        realm: impl Into<String>,
    ) -> Self {
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            network_ssid,
            realm: realm.into(),
        }
    }

    pub fn agent(&self) -> &AgentConfig {
        &self.agent
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// URL of the AgentCard endpoint.
    pub fn agent_card_url(&self) -> String {
        format!("{}{AGENT_CARD_PATH}", self.base_url)
    }

    /// The `/.well-known/lad/agents` body.
    pub fn discovery_response(&self) -> DiscoveryResponse {
        let network = NetworkInfo {
            ssid: self.network_ssid.clone(),
            realm: Some(self.realm.clone()).filter(|r| !r.is_empty()),
        };
        DiscoveryResponse {
            version: PROTOCOL_VERSION.to_string(),
            network: Some(network).filter(|n| !n.is_empty()),
            agents: vec![DiscoveryEntry {
                name: self.agent.name.clone(),
                description: self.agent.description.clone(),
                role: self.agent.role.clone(),
                agent_card_url: self.agent_card_url(),
                capabilities_preview: self.agent.capabilities.clone(),
            }],
        }
    }

    /// The A2A AgentCard.
    pub fn agent_card(&self) -> AgentCard {
        debug!(agent = %self.agent.name, "Generating AgentCard");
        AgentCard {
            name: self.agent.name.clone(),
            description: self.agent.description.clone(),
            url: self.base_url.clone(),
            version: self.agent.version.clone(),
            protocol_versions: vec![PROTOCOL_VERSION.to_string()],
            capabilities: AgentCapabilities::default(),
            default_input_modes: vec!["text".to_string()],
            default_output_modes: vec!["text".to_string()],
            skills: self
                .agent
                .capabilities
                .iter()
                .map(|c| AgentSkill::from_capability(c))
                .collect(),
            provider: Some(AgentProvider {
                organization: if self.realm.is_empty() {
                    self.agent.name.clone()
                } else {
                    self.realm.clone()
                },
            }),
            authentication: self.agent.auth_config.to_card_field(),
        }
    }

    /// The AgentCard as a compact JWS, or `None` if signing fails.
    pub fn signed_agent_card(&self, signer: &CardSigner) -> Option<String> {
        match signer.sign(&self.agent_card()) {
            Ok(token) => Some(token),
            Err(e) => {
                error!(agent = %self.agent.name, error = %e, "Failed to sign AgentCard");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lad_types::auth::{AuthConfig, BearerSettings};
    use lad_types::card_signing::{generate_signing_keys, verify_agent_card, SigningConfig};

    fn generator(auth: AuthConfig) -> CardGenerator {
        CardGenerator::new(
            AgentConfig {
                name: "Hotel Concierge".to_string(),
                description: "AI concierge".to_string(),
                role: "hotel-concierge".to_string(),
                capabilities: vec!["info".to_string(), "room-service".to_string()],
                version: "2.1.0".to_string(),
                auth_config: auth,
            },
            "http://10.0.0.5:8080/",
            Some("GrandHotel-Guest".to_string()),
            "grandhotel.com",
        )
    }

    #[test]
    fn test_discovery_response() {
        let json = serde_json::to_value(generator(AuthConfig::None).discovery_response()).unwrap();
        assert_eq!(json["version"], "1.0");
        assert_eq!(json["network"]["ssid"], "GrandHotel-Guest");
        assert_eq!(json["network"]["realm"], "grandhotel.com");
        let agent = &json["agents"][0];
        assert_eq!(agent["name"], "Hotel Concierge");
        assert_eq!(
            agent["agent_card_url"],
            "http://10.0.0.5:8080/.well-known/agent.json"
        );
        assert_eq!(
            agent["capabilities_preview"],
            serde_json::json!(["info", "room-service"])
        );
    }

    #[test]
    fn test_agent_card() {
        let card = generator(AuthConfig::None).agent_card();
        assert_eq!(card.url, "http://10.0.0.5:8080");
        assert_eq!(card.version, "2.1.0");
        assert_eq!(card.protocol_versions, vec!["1.0"]);
        assert_eq!(card.skills.len(), 2);
        assert_eq!(card.skills[1].name, "Room Service");
        assert_eq!(
            card.provider.as_ref().map(|p| p.organization.as_str()),
            Some("grandhotel.com")
        );
        assert!(card.authentication.is_none());
    }

    #[test]
    fn test_agent_card_with_auth() {
        let card = generator(AuthConfig::Bearer(BearerSettings::default())).agent_card();
        let json = serde_json::to_value(card).unwrap();
        assert_eq!(json["authentication"]["type"], "bearer");
        assert_eq!(json["authentication"]["scheme"], "Bearer");
    }

    #[test]
    fn test_signed_agent_card_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let (private, public) = generate_signing_keys(dir.path()).unwrap();
        let signer = CardSigner::from_config(&SigningConfig {
            enabled: true,
            private_key_path: Some(private),
            key_id: Some("k1".to_string()),
            ..Default::default()
        })
        .unwrap();

        let gen = generator(AuthConfig::None);
        let token = gen.signed_agent_card(&signer).unwrap();
        let public = std::fs::read(public).unwrap();
        let result = verify_agent_card(&token, Some(&public), &[]);
        assert!(result.valid);
        assert_eq!(
            result.agent_card,
            Some(serde_json::to_value(gen.agent_card()).unwrap())
        );
    }
}
