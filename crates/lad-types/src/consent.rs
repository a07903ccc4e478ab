//! Consent requests and decisions.

use crate::agent::{DiscoveredAgent, DiscoverySource, VerificationMethod};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A user's answer to a consent request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentDecision {
    /// Use the agent.
    Approved,
    /// Do not use the agent.
    Denied,
    /// Decide later. Treated as denied for this discovery run.
    Deferred,
}

impl fmt::Display for ConsentDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsentDecision::Approved => write!(f, "approved"),
            ConsentDecision::Denied => write!(f, "denied"),
            ConsentDecision::Deferred => write!(f, "deferred"),
        }
    }
}

/// Read-only projection of a [`DiscoveredAgent`] shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentRequest {
    pub agent: DiscoveredAgent,
    pub verified: bool,
    pub verification_method: VerificationMethod,
    /// Skill ids from the fetched card, or the capabilities preview if no
    /// card was fetched.
    pub capabilities: Vec<String>,
}

impl ConsentRequest {
    /// Build a consent request for `agent`.
    pub fn for_agent(agent: &DiscoveredAgent) -> Self {
        let skills = agent.skill_ids();
        let capabilities = if skills.is_empty() {
            agent.capabilities_preview.clone()
        } else {
            skills
        };
        Self {
            agent: agent.clone(),
            verified: agent.verified,
            verification_method: agent.verification_method,
            capabilities,
        }
    }

    /// Flatten into a record suitable for rendering.
    pub fn to_display(&self) -> ConsentDisplay {
        ConsentDisplay {
            agent_name: self.agent.name.clone(),
            agent_description: self.agent.description.clone(),
            agent_role: self.agent.role.clone(),
            verified: self.verified,
            verification_method: self.verification_method.to_string(),
            capabilities: self.capabilities.clone(),
            source: self.agent.source,
        }
    }
}

/// Display record for a consent prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentDisplay {
    pub agent_name: String,
    pub agent_description: String,
    pub agent_role: String,
    pub verified: bool,
    pub verification_method: String,
    pub capabilities: Vec<String>,
    pub source: DiscoverySource,
}

/// The answer returned by a consent callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentResponse {
    pub decision: ConsentDecision,
    /// Remember this decision for the agent.
    #[serde(default)]
    pub remember: bool,
    /// Subset of capabilities the user approved, if restricted.
    #[serde(default)]
    pub scope: Option<Vec<String>>,
}

impl ConsentResponse {
    /// A one-off approval.
    pub fn approved() -> Self {
        Self::new(ConsentDecision::Approved)
    }

    /// A one-off denial.
    pub fn denied() -> Self {
        Self::new(ConsentDecision::Denied)
    }

    /// A one-off deferral.
    pub fn deferred() -> Self {
        Self::new(ConsentDecision::Deferred)
    }

    fn new(decision: ConsentDecision) -> Self {
        Self {
            decision,
            remember: false,
            scope: None,
        }
    }

    /// Whether the agent is retained.
    pub fn is_approved(&self) -> bool {
        self.decision == ConsentDecision::Approved
    }
}
