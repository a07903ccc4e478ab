//! AgentCard fetch and verification pipeline.
//!
//! A card response is either a compact JWS (`application/jose`) or plain
//! JSON. The two are modelled as [`CardResponse`] and consumed by a single
//! function that sets the agent's card and trust fields. Domain verification
//! runs afterwards and can only upgrade trust.

use crate::client::LadClient;
use jsonwebtoken::Algorithm;
use lad_types::agent::{DiscoveredAgent, VerificationMethod};
use lad_types::card_signing::{decode_unverified_card, is_signed_agent_card, verify_agent_card};
use lad_types::error::{LadError, LadResult};
use lad_types::JOSE_MEDIA_TYPE;
use tracing::{debug, info, warn};

/// Accept header when signed cards are wanted.
const ACCEPT_SIGNED: &str = "application/jose, application/json";
/// Accept header for plain cards.
const ACCEPT_JSON: &str = "application/json";

/// Realms that name no organization and so prove nothing about a host.
const GENERIC_REALMS: &[&str] = &["local", "localhost", "localdomain"];

/// A fetched AgentCard body.
#[derive(Debug, Clone, PartialEq)]
pub enum CardResponse {
    /// Compact JWS wrapping the card.
    Signed { token: String },
    /// The card itself.
    Plain { card: serde_json::Value },
}

impl CardResponse {
    /// Classify a response body by its content type.
    ///
    /// `application/jose` is always a token. A `text/plain` body that looks
    /// like a compact JWS is also treated as one.
    pub fn from_body(content_type: &str, body: &str) -> LadResult<Self> {
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let signed = media_type == JOSE_MEDIA_TYPE
            || (media_type == "text/plain" && is_signed_agent_card(body));
        if signed {
            return Ok(CardResponse::Signed {
                token: body.trim().to_string(),
            });
        }
        let card = serde_json::from_str(body)
            .map_err(|e| LadError::Serialization(format!("Invalid AgentCard JSON: {e}")))?;
        Ok(CardResponse::Plain { card })
    }
}

/// Per-fetch switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Run domain verification after the card is obtained.
    pub verify_domain: bool,
    /// Ask for a signed card when a verification key is configured.
    pub prefer_signed: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            verify_domain: true,
            prefer_signed: true,
        }
    }
}

impl LadClient {
    /// Fetch and verify `agent`'s AgentCard using the configured switches.
    pub async fn fetch_agent_card(
        &self,
        agent: &mut DiscoveredAgent,
    ) -> LadResult<Option<serde_json::Value>> {
        let options = FetchOptions {
            verify_domain: self.config.verify_domain,
            prefer_signed: self.config.prefer_signed,
        };
        self.fetch_agent_card_with(agent, options).await
    }

    /// Fetch and verify `agent`'s AgentCard, updating it in place.
    ///
    /// Returns the card that was stored on the agent. A verification failure
    /// is not an error: it is recorded in `verification_error` and the card
    /// is still returned for display. HTTP and transport failures are errors
    /// and leave a diagnostic on the agent.
    pub async fn fetch_agent_card_with(
        &self,
        agent: &mut DiscoveredAgent,
        options: FetchOptions,
    ) -> LadResult<Option<serde_json::Value>> {
        let accept = if self.public_key.is_some() && options.prefer_signed {
            ACCEPT_SIGNED
        } else {
            ACCEPT_JSON
        };
        debug!(agent = %agent.name, url = %agent.agent_card_url, accept, "Fetching AgentCard");

        let response = match self
            .http
            .get(&agent.agent_card_url)
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                agent.verification_error = Some(format!("Request error: {e}"));
                return Err(LadError::Http(format!("Request error: {e}")));
            }
        };

        let status = response.status();
        if !status.is_success() {
            agent.verification_error = Some(format!("HTTP error: {status}"));
            return Err(LadError::Http(format!("HTTP error: {status}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(ACCEPT_JSON)
            .to_string();
        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                agent.verification_error = Some(format!("Request error: {e}"));
                return Err(LadError::Http(format!("Request error: {e}")));
            }
        };

        let card_response = match CardResponse::from_body(&content_type, &body) {
            Ok(r) => r,
            Err(e) => {
                agent.verification_error = Some(e.to_string());
                return Err(e);
            }
        };
        let card_trusted = self.apply_card_response(agent, card_response);

        if options.verify_domain && card_trusted && agent.agent_card.is_some() {
            verify_domain(agent);
        }

        info!(
            agent = %agent.name,
            verified = agent.verified,
            method = %agent.verification_method,
            "AgentCard fetched"
        );
        Ok(agent.agent_card.clone())
    }

    /// Store a fetched card on `agent` and set its trust fields.
    ///
    /// Returns `false` when the stored card is an unverified JWS payload,
    /// which must not feed any further trust decision.
    pub fn apply_card_response(&self, agent: &mut DiscoveredAgent, response: CardResponse) -> bool {
        match response {
            CardResponse::Signed { token } => {
                let Some(key) = self.public_key.as_deref() else {
                    warn!(agent = %agent.name, "Signed AgentCard received but no public key is configured");
                    agent.reset_verification();
                    agent.verification_error =
                        Some("Signed AgentCard received but no public key configured".to_string());
                    agent.agent_card = decode_unverified_card(&token);
                    return false;
                };
                let result = verify_agent_card(&token, Some(key), &[Algorithm::ES256]);
                if result.valid {
                    info!(
                        agent = %agent.name,
                        kid = ?result.key_id,
                        signed_at = ?result.signed_at,
                        "AgentCard signature verified"
                    );
                    agent.agent_card = result.agent_card;
                    agent.verification_error = None;
                    agent.mark_verified(VerificationMethod::Jws);
                    true
                } else {
                    warn!(
                        agent = %agent.name,
                        error = ?result.error,
                        "AgentCard signature verification failed"
                    );
                    agent.reset_verification();
                    agent.verification_error = result.error;
                    // Shown to the user, never trusted.
                    agent.agent_card = decode_unverified_card(&token);
                    false
                }
            }
            CardResponse::Plain { card } => {
                agent.agent_card = Some(card);
                if agent.uses_https() && self.config.verify_tls {
                    agent.mark_verified(VerificationMethod::Tls);
                }
                true
            }
        }
    }
}

/// Upgrade `agent` to domain-verified if its card's `provider.organization`
/// appears in the card URL host.
///
/// Agents already verified by TLS or JWS keep their method. A mismatch never
/// downgrades. Returns whether the organization matched.
pub fn verify_domain(agent: &mut DiscoveredAgent) -> bool {
    let Some(org) = agent.provider_organization() else {
        return false;
    };
    let org: String = org
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if org.is_empty() || GENERIC_REALMS.contains(&org.as_str()) {
        debug!(agent = %agent.name, org = %org, "Organization names no domain, skipping domain check");
        return false;
    }
    let Some(host) = url::Url::parse(&agent.agent_card_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
    else {
        return false;
    };

    // A suffix match is also a substring match.
    if !host.contains(&org) {
        warn!(agent = %agent.name, org = %org, host = %host, "AgentCard organization does not match host");
        return false;
    }

    let strong = agent.verified
        && matches!(
            agent.verification_method,
            VerificationMethod::Tls | VerificationMethod::Jws
        );
    if !strong {
        debug!(agent = %agent.name, org = %org, host = %host, "Domain verified");
        agent.mark_verified(VerificationMethod::Domain);
    }
    true
}
