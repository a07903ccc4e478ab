//! mDNS service advertisement.
//!
//! Registers one `_a2a._tcp.local.` instance named after the agent. The
//! registration is owned by a [`ServiceAdvertiser`] with an explicit
//! start/stop lifecycle; dropping the advertiser stops it.

use lad_types::{AGENT_CARD_PATH, SERVICE_TYPE};
use mdns_sd::{ServiceDaemon, ServiceInfo};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use tracing::{error, info, warn};

/// TXT record protocol version.
const TXT_VERSION: &str = "1";

struct Registration {
    daemon: ServiceDaemon,
    fullname: String,
}

/// Advertises one agent over mDNS.
///
/// `start` and `stop` are idempotent and never fail: a registration failure
/// is logged and the server stays reachable through its HTTP endpoints.
pub struct ServiceAdvertiser {
    enabled: bool,
    instance_name: String,
    realm: String,
    registration: Mutex<Option<Registration>>,
}

impl ServiceAdvertiser {
    pub fn new(instance_name: impl Into<String>, realm: impl Into<String>, enabled: bool) -> Self {
        Self {
            enabled,
            instance_name: instance_name.into(),
            realm: realm.into(),
            registration: Mutex::new(None),
        }
    }

    /// TXT records: `path`, `v`, and `org`.
    pub fn txt_records(&self) -> HashMap<String, String> {
        HashMap::from([
            ("path".to_string(), AGENT_CARD_PATH.to_string()),
            ("v".to_string(), TXT_VERSION.to_string()),
            ("org".to_string(), self.realm.clone()),
        ])
    }

    /// Whether a registration is currently active.
    pub fn is_advertising(&self) -> bool {
        self.registration
            .lock()
            .map(|r| r.is_some())
            .unwrap_or(false)
    }

    /// Register the service at `ip:port`. No-op when disabled or already
    /// advertising.
    pub fn start(&self, ip: IpAddr, port: u16) {
        if !self.enabled {
            info!("mDNS disabled, using well-known endpoint only");
            return;
        }
        let mut slot = match self.registration.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.is_some() {
            return;
        }

        let daemon = match ServiceDaemon::new() {
            Ok(d) => d,
            Err(e) => {
                error!(error = %e, "Failed to start mDNS daemon");
                return;
            }
        };
        let host_name = format!("{}.local.", host_label(&self.instance_name));
        let info = match ServiceInfo::new(
            SERVICE_TYPE,
            &self.instance_name,
            &host_name,
            ip,
            port,
            self.txt_records(),
        ) {
            Ok(info) => info,
            Err(e) => {
                error!(error = %e, "Invalid mDNS service info");
                shutdown(&daemon);
                return;
            }
        };
        let fullname = info.get_fullname().to_string();
        if let Err(e) = daemon.register(info) {
            error!(error = %e, "Failed to register mDNS service");
            shutdown(&daemon);
            return;
        }

        info!(service = %fullname, ip = %ip, port, "mDNS advertising");
        *slot = Some(Registration { daemon, fullname });
    }

    /// Unregister the service. No-op when not advertising.
    pub fn stop(&self) {
        let taken = match self.registration.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(reg) = taken else {
            return;
        };
        if let Err(e) = reg.daemon.unregister(&reg.fullname) {
            warn!(error = %e, "Error unregistering mDNS service");
        }
        shutdown(&reg.daemon);
        info!(service = %reg.fullname, "mDNS service unregistered");
    }
}

impl Drop for ServiceAdvertiser {
    fn drop(&mut self) {
        self.stop();
    }
}

fn shutdown(daemon: &ServiceDaemon) {
    if let Err(e) = daemon.shutdown() {
        warn!(error = %e, "Error shutting down mDNS daemon");
    }
}

/// DNS host label derived from an agent name.
fn host_label(name: &str) -> String {
    let label: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let label = label.trim_matches('-');
    if label.is_empty() {
        "lad-agent".to_string()
    } else {
        label.to_string()
    }
}
