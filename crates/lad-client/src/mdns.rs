//! mDNS/DNS-SD listener for `_a2a._tcp` announcements.
//!
//! Browsing is split in two. A [`ServiceBrowser`] collects raw announcement
//! events for a fixed window; the daemon pushes them onto a queue and the
//! browser drains it only after the window closes. [`MdnsListener`] then
//! folds the events, in arrival order, into a list of [`DiscoveredAgent`]s.

use crate::client::LadClient;
use async_trait::async_trait;
use lad_types::agent::{DiscoveredAgent, DiscoverySource};
use lad_types::error::{LadError, LadResult};
use lad_types::{AGENT_CARD_PATH, SERVICE_TYPE};
use mdns_sd::{ServiceDaemon, ServiceEvent};
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::{debug, error, info};

/// A resolved service announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedService {
    /// Full DNS-SD name, e.g. `Concierge._a2a._tcp.local.`.
    pub fullname: String,
    /// Address to connect to.
    pub addr: IpAddr,
    pub port: u16,
    /// TXT records, decoded to strings.
    pub properties: BTreeMap<String, String>,
}

/// One event observed during a browse window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MdnsEvent {
    /// A service was announced or re-announced.
    Resolved(ResolvedService),
    /// A service said goodbye.
    Removed { fullname: String },
}

/// Source of mDNS events.
#[async_trait]
pub trait ServiceBrowser: Send + Sync {
    /// Browse `service_type` for the whole `window` and return every event
    /// observed, in arrival order.
    async fn browse(&self, service_type: &str, window: Duration) -> LadResult<Vec<MdnsEvent>>;
}

// ---------------------------------------------------------------------------
// mdns-sd browser
// ---------------------------------------------------------------------------

/// [`ServiceBrowser`] backed by the `mdns-sd` daemon.
#[derive(Debug, Default, Clone, Copy)]
pub struct MdnsSdBrowser;

/// Stops browsing and shuts the daemon down on every exit path.
struct DaemonGuard {
    daemon: ServiceDaemon,
    service_type: String,
}

impl Drop for DaemonGuard {
    fn drop(&mut self) {
        if let Err(e) = self.daemon.stop_browse(&self.service_type) {
            debug!(error = %e, "mDNS stop_browse failed");
        }
        if let Err(e) = self.daemon.shutdown() {
            debug!(error = %e, "mDNS daemon shutdown failed");
        }
    }
}

#[async_trait]
impl ServiceBrowser for MdnsSdBrowser {
    async fn browse(&self, service_type: &str, window: Duration) -> LadResult<Vec<MdnsEvent>> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| LadError::Discovery(format!("Failed to start mDNS daemon: {e}")))?;
        let guard = DaemonGuard {
            daemon,
            service_type: service_type.to_string(),
        };
        let receiver = guard
            .daemon
            .browse(service_type)
            .map_err(|e| LadError::Discovery(format!("Failed to browse {service_type}: {e}")))?;

        debug!(service_type, window_ms = window.as_millis() as u64, "Browsing mDNS");
        tokio::time::sleep(window).await;

        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            match event {
                ServiceEvent::ServiceResolved(info) => {
                    let mut addrs: Vec<IpAddr> = info.get_addresses().iter().copied().collect();
                    // Prefer IPv4, then lowest address, for a stable choice.
                    addrs.sort_by_key(|a| (a.is_ipv6(), *a));
                    let Some(addr) = addrs.first().copied() else {
                        debug!(fullname = info.get_fullname(), "Resolved service has no address");
                        continue;
                    };
                    let properties = info
                        .get_properties()
                        .iter()
                        .map(|p| (p.key().to_string(), p.val_str().to_string()))
                        .collect();
                    events.push(MdnsEvent::Resolved(ResolvedService {
                        fullname: info.get_fullname().to_string(),
                        addr,
                        port: info.get_port(),
                        properties,
                    }));
                }
                ServiceEvent::ServiceRemoved(_, fullname) => {
                    events.push(MdnsEvent::Removed { fullname });
                }
                other => debug!(event = ?other, "Ignoring mDNS event"),
            }
        }
        drop(guard);
        Ok(events)
    }
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

/// Folds mDNS events into discovered agents, keyed by service name.
#[derive(Debug)]
pub struct MdnsListener {
    scheme: &'static str,
    agents: Vec<(String, DiscoveredAgent)>,
}

impl MdnsListener {
    /// Create a listener that builds `https` card URLs if `use_https`.
    pub fn new(use_https: bool) -> Self {
        Self {
            scheme: if use_https { "https" } else { "http" },
            agents: Vec::new(),
        }
    }

    /// Apply one event.
    ///
    /// A repeat announcement for a known service updates its card URL (and
    /// resets trust if the URL changed) instead of adding a duplicate.
    pub fn apply(&mut self, event: MdnsEvent) {
        match event {
            MdnsEvent::Resolved(service) => {
                let url = self.card_url(&service);
                if let Some((_, agent)) = self.agents.iter_mut().find(|(n, _)| *n == service.fullname) {
                    if agent.update_card_url(url) {
                        info!(agent = %agent.name, url = %agent.agent_card_url, "mDNS service updated");
                    }
                    return;
                }
                let agent = self.agent_from(&service, url);
                info!(agent = %agent.name, url = %agent.agent_card_url, "Discovered agent via mDNS");
                self.agents.push((service.fullname, agent));
            }
            MdnsEvent::Removed { fullname } => {
                let before = self.agents.len();
                self.agents.retain(|(n, _)| *n != fullname);
                if self.agents.len() < before {
                    info!(fullname = %fullname, "mDNS service removed");
                }
            }
        }
    }

    /// The agents currently known, in discovery order.
    pub fn into_agents(self) -> Vec<DiscoveredAgent> {
        self.agents.into_iter().map(|(_, agent)| agent).collect()
    }

    fn card_url(&self, service: &ResolvedService) -> String {
        let path = service
            .properties
            .get("path")
            .map(String::as_str)
            .filter(|p| !p.is_empty())
            .unwrap_or(AGENT_CARD_PATH);
        let sep = if path.starts_with('/') { "" } else { "/" };
        format!(
            "{}://{}{sep}{path}",
            self.scheme,
            SocketAddr::new(service.addr, service.port)
        )
    }

    fn agent_from(&self, service: &ResolvedService, url: String) -> DiscoveredAgent {
        let org = service
            .properties
            .get("org")
            .map(String::as_str)
            .unwrap_or("unknown");
        let role = service
            .properties
            .get("role")
            .map(String::as_str)
            .unwrap_or("unknown");
        DiscoveredAgent::new(
            instance_name(&service.fullname),
            format!("Discovered via mDNS from {org}"),
            role,
            url,
            DiscoverySource::Mdns,
        )
    }
}

/// Strip the service type from a DNS-SD full name.
fn instance_name(fullname: &str) -> String {
    let suffix = format!(".{SERVICE_TYPE}");
    fullname
        .strip_suffix(&suffix)
        .or_else(|| fullname.strip_suffix(suffix.trim_end_matches('.')))
        .unwrap_or(fullname)
        .to_string()
}

impl LadClient {
    /// Browse mDNS for the configured window and return the agents found.
    ///
    /// Errors from the browser are returned; see [`LadClient::discover_mdns`]
    /// for the non-failing variant.
    pub async fn browse_mdns(&self, use_https: bool) -> LadResult<Vec<DiscoveredAgent>> {
        let events = self
            .browser
            .browse(SERVICE_TYPE, self.config.mdns_timeout())
            .await?;
        let mut listener = MdnsListener::new(use_https);
        for event in events {
            listener.apply(event);
        }
        let agents = listener.into_agents();
        info!(count = agents.len(), "mDNS discovery finished");
        Ok(agents)
    }

    /// Browse mDNS, logging any failure and returning an empty list instead.
    pub async fn discover_mdns(&self, use_https: bool) -> Vec<DiscoveredAgent> {
        match self.browse_mdns(use_https).await {
            Ok(agents) => agents,
            Err(e) => {
                error!(error = %e, "mDNS discovery failed");
                Vec::new()
            }
        }
    }
}
