//! A2A AgentCards and LAD discovery documents.
//!
//! The AgentCard is served at `/.well-known/agent.json`; the discovery
//! document is served at `/.well-known/lad/agents`. Both are generated by the
//! server from an [`AgentConfig`] and consumed by the client.

use crate::auth::{AgentAuthentication, AuthConfig};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Agent configuration (server side)
// ---------------------------------------------------------------------------

/// The agent a server advertises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent display name. Also used as the mDNS instance name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Agent role (e.g. "hotel-concierge").
    pub role: String,
    /// Capability names, in display order. Each becomes one AgentCard skill.
    pub capabilities: Vec<String>,
    /// Agent version.
    pub version: String,
    /// Authentication the agent requires.
    #[serde(default)]
    pub auth_config: AuthConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "LAD Agent".to_string(),
            description: "LAD discovery agent".to_string(),
            role: "generic".to_string(),
            capabilities: vec!["info".to_string()],
            version: "1.0.0".to_string(),
            auth_config: AuthConfig::None,
        }
    }
}

// ---------------------------------------------------------------------------
// A2A Agent Card
// ---------------------------------------------------------------------------

/// A2A Agent Card. Describes an agent's capabilities to external systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    /// Agent display name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// A2A endpoint (the agent's base URL).
    pub url: String,
    /// Agent version.
    pub version: String,
    /// Supported A2A protocol versions.
    #[serde(default)]
    pub protocol_versions: Vec<String>,
    /// Agent capabilities.
    pub capabilities: AgentCapabilities,
    /// Supported input content types.
    #[serde(default)]
    pub default_input_modes: Vec<String>,
    /// Supported output content types.
    #[serde(default)]
    pub default_output_modes: Vec<String>,
    /// Skills this agent can perform.
    pub skills: Vec<AgentSkill>,
    /// Organization operating the agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<AgentProvider>,
    /// Authentication requirements, absent when none are needed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AgentAuthentication>,
}

/// A2A agent capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    /// Whether this agent supports streaming responses.
    pub streaming: bool,
    /// Whether this agent supports push notifications.
    pub push_notifications: bool,
    /// Whether task status history is available.
    pub state_transition_history: bool,
}

/// A2A skill descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSkill {
    /// Unique skill identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description of what this skill does.
    pub description: String,
    /// Tags for discovery.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl AgentSkill {
    /// Derive a skill from a capability name: `"room-service"` becomes a
    /// skill titled "Room Service" tagged `room-service`.
    pub fn from_capability(capability: &str) -> Self {
        Self {
            id: capability.to_string(),
            name: title_case(capability),
            description: format!("Provides {capability} functionality"),
            tags: vec![capability.to_string()],
        }
    }
}

/// The provider block of an AgentCard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProvider {
    /// Organization name or domain. Used for domain verification.
    pub organization: String,
}

fn title_case(s: &str) -> String {
    s.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Discovery document
// ---------------------------------------------------------------------------

/// Network metadata in a discovery document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// Network SSID (e.g. "GrandHotel-Guest").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    /// Network realm/domain (e.g. "grandhotel.com").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
}

impl NetworkInfo {
    /// Whether neither field is set.
    pub fn is_empty(&self) -> bool {
        self.ssid.is_none() && self.realm.is_none()
    }
}

/// One agent in a discovery document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryEntry {
    /// Human-readable agent name.
    pub name: String,
    /// Agent description.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Agent role.
    #[serde(default = "unknown_role", deserialize_with = "null_as_unknown_role")]
    pub role: String,
    /// URL of the full AgentCard.
    pub agent_card_url: String,
    /// Capability names for display before the card is fetched.
    #[serde(default, deserialize_with = "null_as_default")]
    pub capabilities_preview: Vec<String>,
}

fn unknown_role() -> String {
    "unknown".to_string()
}

// An explicit `null` takes the same default as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_unknown_role<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unknown_role))
}

/// The `/.well-known/lad/agents` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryResponse {
    /// LAD protocol version.
    pub version: String,
    /// Network metadata, omitted when nothing is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkInfo>,
    /// Discoverable agents.
    #[serde(default)]
    pub agents: Vec<DiscoveryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_from_capability() {
        let skill = AgentSkill::from_capability("room-service");
        assert_eq!(skill.id, "room-service");
        assert_eq!(skill.name, "Room Service");
        assert_eq!(skill.description, "Provides room-service functionality");
        assert_eq!(skill.tags, vec!["room-service"]);

        assert_eq!(AgentSkill::from_capability("info").name, "Info");
        assert_eq!(AgentSkill::from_capability("late_CHECKOUT").name, "Late Checkout");
    }

    #[test]
    fn test_agent_card_wire_shape() {
        let card = AgentCard {
            name: "Concierge".to_string(),
            description: "AI concierge".to_string(),
            url: "http://10.0.0.5:8080".to_string(),
            version: "1.0.0".to_string(),
            protocol_versions: vec!["1.0".to_string()],
            capabilities: AgentCapabilities::default(),
            default_input_modes: vec!["text".to_string()],
            default_output_modes: vec!["text".to_string()],
            skills: vec![AgentSkill::from_capability("info")],
            provider: Some(AgentProvider {
                organization: "grandhotel.com".to_string(),
            }),
            authentication: None,
        };

        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["protocolVersions"], serde_json::json!(["1.0"]));
        assert_eq!(json["capabilities"]["pushNotifications"], false);
        assert_eq!(json["defaultInputModes"], serde_json::json!(["text"]));
        assert_eq!(json["provider"]["organization"], "grandhotel.com");
        assert!(json.get("authentication").is_none());
    }

    #[test]
    fn test_discovery_entry_defaults() {
        let entry: DiscoveryEntry = serde_json::from_value(serde_json::json!({
            "name": "Concierge",
            "agent_card_url": "https://hotel.example/.well-known/agent.json",
        }))
        .unwrap();
        assert_eq!(entry.description, "");
        assert_eq!(entry.role, "unknown");
        assert!(entry.capabilities_preview.is_empty());
    }

    #[test]
    fn test_discovery_entry_null_fields_take_defaults() {
        let entry: DiscoveryEntry = serde_json::from_value(serde_json::json!({
            "name": "Concierge",
            "description": null,
            "role": null,
            "agent_card_url": "https://hotel.example/.well-known/agent.json",
            "capabilities_preview": null,
        }))
        .unwrap();
        assert_eq!(entry.description, "");
        assert_eq!(entry.role, "unknown");
        assert!(entry.capabilities_preview.is_empty());

        let missing_url = serde_json::from_value::<DiscoveryEntry>(serde_json::json!({
            "name": "Concierge",
            "agent_card_url": null,
        }));
        assert!(missing_url.is_err());
    }

    #[test]
    fn test_discovery_response_omits_empty_network() {
        let response = DiscoveryResponse {
            version: "1.0".to_string(),
            network: None,
            agents: vec![],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("network").is_none());
        assert!(NetworkInfo::default().is_empty());
    }
}
