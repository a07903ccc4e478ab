//! Consent gate.
//!
//! Every discovered agent is put to a [`ConsentCallback`] before it is
//! returned. Only approved agents survive; order is preserved.

use crate::client::LadClient;
use crate::discovery::DiscoverOptions;
use async_trait::async_trait;
use lad_types::agent::{DiscoveredAgent, DiscoveryResult};
use lad_types::consent::{ConsentRequest, ConsentResponse};
use lad_types::error::LadResult;
use tracing::{error, info, warn};

/// Decides whether a discovered agent may be used.
#[async_trait]
pub trait ConsentCallback: Send + Sync {
    /// Ask for consent. May suspend on user interaction; no timeout is
    /// imposed by the gate.
    async fn request_consent(&self, request: &ConsentRequest) -> LadResult<ConsentResponse>;
}

/// Adapts a synchronous closure into a [`ConsentCallback`].
pub struct FnConsent<F>(pub F);

#[async_trait]
impl<F> ConsentCallback for FnConsent<F>
where
    F: Fn(&ConsentRequest) -> ConsentResponse + Send + Sync,
{
    async fn request_consent(&self, request: &ConsentRequest) -> LadResult<ConsentResponse> {
        Ok((self.0)(request))
    }
}

/// Approves verified agents and denies everything else.
///
/// Suitable for headless operation. This is a policy, not interactive
/// consent.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultConsent;

#[async_trait]
impl ConsentCallback for DefaultConsent {
    async fn request_consent(&self, request: &ConsentRequest) -> LadResult<ConsentResponse> {
        if request.verified {
            Ok(ConsentResponse::approved())
        } else {
            warn!(agent = %request.agent.name, "Denying unverified agent by default");
            Ok(ConsentResponse::denied())
        }
    }
}

/// Build the consent request shown for `agent`.
pub fn create_consent_request(agent: &DiscoveredAgent) -> ConsentRequest {
    ConsentRequest::for_agent(agent)
}

/// Put every agent to `callback`, sequentially, keeping the approved ones.
///
/// A callback error drops that agent, is appended to `errors`, and does not
/// stop the remaining requests.
pub async fn apply_consent(
    agents: Vec<DiscoveredAgent>,
    callback: &dyn ConsentCallback,
    errors: &mut Vec<String>,
) -> Vec<DiscoveredAgent> {
    let mut approved = Vec::with_capacity(agents.len());
    for agent in agents {
        let request = create_consent_request(&agent);
        match callback.request_consent(&request).await {
            Ok(response) if response.is_approved() => {
                info!(agent = %agent.name, "Consent approved");
                approved.push(agent);
            }
            Ok(response) => {
                info!(agent = %agent.name, decision = %response.decision, "Consent not given");
            }
            Err(e) => {
                error!(agent = %agent.name, error = %e, "Consent callback failed");
                errors.push(format!("Consent failed for {}: {e}", agent.name));
            }
        }
    }
    approved
}

impl LadClient {
    /// [`LadClient::discover`] followed by the consent gate.
    ///
    /// Without a callback, [`DefaultConsent`] is used.
    pub async fn discover_with_consent(
        &self,
        callback: Option<&dyn ConsentCallback>,
        options: &DiscoverOptions,
    ) -> DiscoveryResult {
        let mut result = self.discover(options).await;
        let callback = callback.unwrap_or(&DefaultConsent);
        let agents = std::mem::take(&mut result.agents);
        result.agents = apply_consent(agents, callback, &mut result.errors).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lad_types::agent::{DiscoverySource, VerificationMethod};
    use lad_types::consent::ConsentDecision;
    use lad_types::error::LadError;

    fn agents() -> Vec<DiscoveredAgent> {
        ["Concierge", "Spa", "Dining", "Valet"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut a = DiscoveredAgent::new(
                    *name,
                    "",
                    "hotel",
                    format!("https://ai.grandhotel.com/{i}"),
                    DiscoverySource::WellKnown,
                );
                if i % 2 == 0 {
                    a.mark_verified(VerificationMethod::Tls);
                }
                a
            })
            .collect()
    }

    fn names(agents: &[DiscoveredAgent]) -> Vec<&str> {
        agents.iter().map(|a| a.name.as_str()).collect()
    }

    struct Flaky;

    #[async_trait]
    impl ConsentCallback for Flaky {
        async fn request_consent(&self, request: &ConsentRequest) -> LadResult<ConsentResponse> {
            if request.agent.name == "Spa" {
                Err(LadError::Consent("prompt closed".to_string()))
            } else {
                Ok(ConsentResponse::approved())
            }
        }
    }

    #[tokio::test]
    async fn test_default_consent_keeps_verified() {
        let mut errors = Vec::new();
        let kept = apply_consent(agents(), &DefaultConsent, &mut errors).await;
        assert_eq!(names(&kept), vec!["Concierge", "Dining"]);
        assert!(kept.iter().all(|a| a.verified));
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_fn_consent_preserves_order() {
        let callback = FnConsent(|req: &ConsentRequest| match req.agent.name.as_str() {
            "Valet" | "Spa" => ConsentResponse::approved(),
            "Dining" => ConsentResponse::deferred(),
            _ => ConsentResponse::denied(),
        });
        let mut errors = Vec::new();
        let kept = apply_consent(agents(), &callback, &mut errors).await;
        assert_eq!(names(&kept), vec!["Spa", "Valet"]);
    }

    #[tokio::test]
    async fn test_callback_error_is_isolated() {
        let mut errors = Vec::new();
        let kept = apply_consent(agents(), &Flaky, &mut errors).await;
        assert_eq!(names(&kept), vec!["Concierge", "Dining", "Valet"]);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Spa"));
    }

    #[test]
    fn test_create_consent_request() {
        let agent = &agents()[0];
        let request = create_consent_request(agent);
        assert!(request.verified);
        assert_eq!(request.verification_method, VerificationMethod::Tls);
        assert_eq!(request.to_display().agent_name, "Concierge");
    }

    #[test]
    fn test_default_consent_blocking() {
        let agent = &agents()[1];
        let response =
            tokio_test::block_on(DefaultConsent.request_consent(&create_consent_request(agent)))
                .unwrap();
        assert_eq!(response.decision, ConsentDecision::Denied);
    }
}
