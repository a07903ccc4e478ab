//! The LAD client handle.

use crate::mdns::{MdnsSdBrowser, ServiceBrowser};
use lad_types::config::ClientConfig;
use lad_types::error::{LadError, LadResult};
use std::sync::Arc;
use tracing::{debug, warn};

/// Discovers agents on the local network and establishes trust in them.
///
/// Holds the HTTP client, the optional AgentCard verification key, and the
/// mDNS browser. Cheap to share behind an `Arc`; every operation takes
/// `&self`.
pub struct LadClient {
    pub(crate) config: ClientConfig,
    pub(crate) http: reqwest::Client,
    pub(crate) public_key: Option<Vec<u8>>,
    pub(crate) browser: Arc<dyn ServiceBrowser>,
}

impl LadClient {
    /// Build a client from configuration.
    ///
    /// Fails if the signing public key or CA bundle is configured but cannot
    /// be read.
    pub fn new(config: ClientConfig) -> LadResult<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(concat!("lad-client/", env!("CARGO_PKG_VERSION")));

        if !config.verify_tls {
            warn!("TLS certificate verification is disabled; use for development only");
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(path) = &config.ca_bundle {
            let pem = std::fs::read(path).map_err(|e| {
                LadError::Config(format!("Failed to read CA bundle {}: {e}", path.display()))
            })?;
            let certs = reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
                LadError::Config(format!("Invalid CA bundle {}: {e}", path.display()))
            })?;
            debug!(path = %path.display(), count = certs.len(), "Loaded CA bundle");
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }

        let public_key = match &config.signing_public_key {
            Some(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    LadError::Config(format!(
                        "Failed to read signing public key {}: {e}",
                        path.display()
                    ))
                })?;
                debug!(path = %path.display(), "Loaded AgentCard verification key");
                Some(pem)
            }
            None => None,
        };

        let http = builder
            .build()
            .map_err(|e| LadError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            http,
            public_key,
            browser: Arc::new(MdnsSdBrowser),
        })
    }

    /// Replace the mDNS browser.
    pub fn with_browser(mut self, browser: Arc<dyn ServiceBrowser>) -> Self {
        self.browser = browser;
        self
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether signed AgentCards can be verified.
    pub fn has_public_key(&self) -> bool {
        self.public_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_new_with_defaults() {
        let client = LadClient::new(ClientConfig::default()).unwrap();
        assert!(!client.has_public_key());
        assert!(client.config().verify_tls);
    }

    #[test]
    fn test_missing_public_key_is_config_error() {
        let config = ClientConfig {
            signing_public_key: Some(PathBuf::from("/nonexistent/public.pem")),
            ..Default::default()
        };
        assert!(matches!(LadClient::new(config), Err(LadError::Config(_))));
    }

    #[test]
    fn test_missing_ca_bundle_is_config_error() {
        let config = ClientConfig {
            ca_bundle: Some(PathBuf::from("/nonexistent/ca.pem")),
            ..Default::default()
        };
        assert!(matches!(LadClient::new(config), Err(LadError::Config(_))));
    }

    #[test]
    fn test_loads_public_key() {
        let dir = tempfile::tempdir().unwrap();
        let (_, public) = lad_types::card_signing::generate_signing_keys(dir.path()).unwrap();
        let config = ClientConfig {
            signing_public_key: Some(public),
            ..Default::default()
        };
        assert!(LadClient::new(config).unwrap().has_public_key());
    }
}
