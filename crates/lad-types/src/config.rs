//! Configuration for the LAD client and server.
//!
//! One TOML file may carry both sides:
//!
//! ```toml
//! [client]
//! fallback_url = "https://hotel.example"
//!
//! [server]
//! name = "Hotel Concierge"
//! port = 8443
//! ```
//!
//! A file without `[client]`/`[server]` tables is read as the bare table for
//! whichever side is loading it. `LAD_*` environment variables override file
//! values (`LAD_PORT=9000`, `LAD_VERIFY_TLS=false`).

use crate::auth::AuthConfig;
use crate::card::AgentConfig;
use crate::card_signing::SigningConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "LAD_";

/// Default realm advertised when none is configured.
pub const DEFAULT_REALM: &str = "local";

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Discovery client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// How long the mDNS browser listens, in seconds.
    pub mdns_timeout_secs: f64,
    /// Timeout for each HTTP request, in seconds.
    pub http_timeout_secs: f64,
    /// Base URL for well-known discovery when mDNS yields nothing.
    pub fallback_url: Option<String>,
    /// Browse mDNS before falling back.
    pub try_mdns: bool,
    /// Verify TLS certificates. Disabling this is for development only.
    pub verify_tls: bool,
    /// Extra PEM trust roots.
    pub ca_bundle: Option<PathBuf>,
    /// PEM public key for verifying signed AgentCards.
    pub signing_public_key: Option<PathBuf>,
    /// Drop agents that could not be verified.
    pub require_verified: bool,
    /// Fetch each agent's AgentCard after discovery.
    pub fetch_cards: bool,
    /// Upgrade agents whose card organization matches the card URL host.
    pub verify_domain: bool,
    /// Ask servers for signed cards when a public key is configured.
    pub prefer_signed: bool,
    /// Default log filter.
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            mdns_timeout_secs: 3.0,
            http_timeout_secs: 10.0,
            fallback_url: None,
            try_mdns: true,
            verify_tls: true,
            ca_bundle: None,
            signing_public_key: None,
            require_verified: false,
            fetch_cards: true,
            verify_domain: true,
            prefer_signed: true,
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// The mDNS listening window.
    pub fn mdns_timeout(&self) -> Duration {
        secs_or(self.mdns_timeout_secs, 3.0)
    }

    /// Per-request HTTP timeout.
    pub fn http_timeout(&self) -> Duration {
        secs_or(self.http_timeout_secs, 10.0)
    }
}

fn secs_or(secs: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or_else(|_| Duration::from_secs_f64(fallback))
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Advertising server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub description: String,
    pub role: String,
    pub capabilities: Vec<String>,
    pub version: String,
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    pub network_ssid: Option<String>,
    /// Realm/domain, also the AgentCard provider organization.
    pub network_realm: Option<String>,
    /// Register an mDNS announcement.
    pub enable_mdns: bool,
    /// Address used in generated URLs. Detected from the routing table when unset.
    pub advertise_host: Option<String>,
    pub tls_enabled: bool,
    pub tls_certfile: Option<PathBuf>,
    pub tls_keyfile: Option<PathBuf>,
    pub signing_enabled: bool,
    /// PKCS#8 PEM private key.
    pub signing_key: Option<PathBuf>,
    pub signing_key_id: Option<String>,
    /// Authentication declared in the AgentCard.
    pub auth: AuthConfig,
    /// Default log filter.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let agent = AgentConfig::default();
        Self {
            name: agent.name,
            description: agent.description,
            role: agent.role,
            capabilities: agent.capabilities,
            version: agent.version,
            host: "0.0.0.0".to_string(),
            port: 8080,
            network_ssid: None,
            network_realm: None,
            enable_mdns: true,
            advertise_host: None,
            tls_enabled: false,
            tls_certfile: None,
            tls_keyfile: None,
            signing_enabled: false,
            signing_key: None,
            signing_key_id: None,
            auth: AuthConfig::None,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// The agent this server advertises.
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            name: self.name.clone(),
            description: self.description.clone(),
            role: self.role.clone(),
            capabilities: self.capabilities.clone(),
            version: self.version.clone(),
            auth_config: self.auth.clone(),
        }
    }

    /// AgentCard signing settings.
    pub fn signing_config(&self) -> SigningConfig {
        SigningConfig {
            enabled: self.signing_enabled,
            private_key_path: self.signing_key.clone(),
            key_id: self.signing_key_id.clone(),
            ..Default::default()
        }
    }

    /// Configured realm, else the machine hostname, else `"local"`.
    pub fn realm(&self) -> String {
        match self.network_realm.as_deref() {
            Some(realm) if !realm.trim().is_empty() => realm.to_string(),
            _ => machine_hostname().unwrap_or_else(|| DEFAULT_REALM.to_string()),
        }
    }

    /// URL scheme of generated URLs.
    pub fn scheme(&self) -> &'static str {
        if self.tls_enabled {
            "https"
        } else {
            "http"
        }
    }
}

/// The local hostname, if it is set and valid UTF-8.
pub fn machine_hostname() -> Option<String> {
    let name = gethostname::gethostname().into_string().ok()?;
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Default config file location: `~/.lad/config.toml`.
pub fn default_config_path() -> PathBuf {
    lad_home().join("config.toml")
}

/// LAD home directory: `~/.lad`.
pub fn lad_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".lad")
}

/// Load the client configuration from `path` (or the default path) and the
/// process environment. Never fails: problems are logged and defaults used.
pub fn load_client_config(path: Option<&Path>) -> ClientConfig {
    load_section(path, "client", CLIENT_FIELDS, std::env::vars())
}

/// Load the server configuration from `path` (or the default path) and the
/// process environment. Never fails: problems are logged and defaults used.
pub fn load_server_config(path: Option<&Path>) -> ServerConfig {
    load_section(path, "server", SERVER_FIELDS, std::env::vars())
}

fn load_section<T, I>(path: Option<&Path>, section: &str, fields: &[Field], vars: I) -> T
where
    T: DeserializeOwned + Default,
    I: IntoIterator<Item = (String, String)>,
{
    let config_path = path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(default_config_path);

    let mut table = read_table(&config_path, section);
    apply_env_overrides(&mut table, fields, vars);

    match toml::Value::Table(table).try_into::<T>() {
        Ok(config) => config,
        Err(e) => {
            warn!(
                error = %e,
                path = %config_path.display(),
                section,
                "Failed to deserialize config, using defaults"
            );
            T::default()
        }
    }
}

fn read_table(config_path: &Path, section: &str) -> toml::Table {
    if !config_path.exists() {
        debug!(path = %config_path.display(), "Config file not found, using defaults");
        return toml::Table::new();
    }
    let contents = match std::fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(e) => {
            warn!(
                error = %e,
                path = %config_path.display(),
                "Failed to read config, using defaults"
            );
            return toml::Table::new();
        }
    };
    let mut root = match contents.parse::<toml::Table>() {
        Ok(t) => t,
        Err(e) => {
            warn!(
                error = %e,
                path = %config_path.display(),
                "Failed to parse config, using defaults"
            );
            return toml::Table::new();
        }
    };
    info!(path = %config_path.display(), section, "Loaded configuration");

    let has_sections = root.contains_key("client") || root.contains_key("server");
    if !has_sections {
        return root;
    }
    match root.remove(section) {
        Some(toml::Value::Table(t)) => t,
        Some(_) => {
            warn!(section, "Config section is not a table, using defaults");
            toml::Table::new()
        }
        None => toml::Table::new(),
    }
}

// ---------------------------------------------------------------------------
// Environment overrides
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Bool,
    Float,
    Port,
    Str,
    List,
}

type Field = (&'static str, FieldKind);

const CLIENT_FIELDS: &[Field] = &[
    ("mdns_timeout_secs", FieldKind::Float),
    ("http_timeout_secs", FieldKind::Float),
    ("fallback_url", FieldKind::Str),
    ("try_mdns", FieldKind::Bool),
    ("verify_tls", FieldKind::Bool),
    ("ca_bundle", FieldKind::Str),
    ("signing_public_key", FieldKind::Str),
    ("require_verified", FieldKind::Bool),
    ("fetch_cards", FieldKind::Bool),
    ("verify_domain", FieldKind::Bool),
    ("prefer_signed", FieldKind::Bool),
    ("log_level", FieldKind::Str),
];

const SERVER_FIELDS: &[Field] = &[
    ("name", FieldKind::Str),
    ("description", FieldKind::Str),
    ("role", FieldKind::Str),
    ("capabilities", FieldKind::List),
    ("version", FieldKind::Str),
    ("host", FieldKind::Str),
    ("port", FieldKind::Port),
    ("network_ssid", FieldKind::Str),
    ("network_realm", FieldKind::Str),
    ("enable_mdns", FieldKind::Bool),
    ("advertise_host", FieldKind::Str),
    ("tls_enabled", FieldKind::Bool),
    ("tls_certfile", FieldKind::Str),
    ("tls_keyfile", FieldKind::Str),
    ("signing_enabled", FieldKind::Bool),
    ("signing_key", FieldKind::Str),
    ("signing_key_id", FieldKind::Str),
    ("log_level", FieldKind::Str),
];

fn apply_env_overrides<I>(table: &mut toml::Table, fields: &[Field], vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (var, raw) in vars {
        let Some(name) = var.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let name = name.to_ascii_lowercase();
        let Some((field, kind)) = fields.iter().find(|(f, _)| *f == name) else {
            continue;
        };
        match parse_env_value(&raw, *kind) {
            Some(value) => {
                debug!(var = %var, field, "Applying environment override");
                table.insert(field.to_string(), value);
            }
            None => warn!(var = %var, value = %raw, "Ignoring unparseable environment override"),
        }
    }
}

fn parse_env_value(raw: &str, kind: FieldKind) -> Option<toml::Value> {
    let raw = raw.trim();
    match kind {
        FieldKind::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(toml::Value::Boolean(true)),
            "false" | "0" | "no" | "off" => Some(toml::Value::Boolean(false)),
            _ => None,
        },
        FieldKind::Float => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(toml::Value::Float),
        FieldKind::Port => raw
            .parse::<u16>()
            .ok()
            .map(|p| toml::Value::Integer(i64::from(p))),
        FieldKind::Str => Some(toml::Value::String(raw.to_string())),
        FieldKind::List => Some(toml::Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| toml::Value::String(s.to_string()))
                .collect(),
        )),
    }
}

/// Example configuration written by `lad init`.
pub const EXAMPLE_CONFIG: &str = r#"# Local Agent Discovery (LAD) configuration.
# Every value is optional; LAD_* environment variables override this file
# (for example LAD_PORT=9000 or LAD_VERIFY_TLS=false).

[client]
# Seconds to listen for mDNS announcements.
mdns_timeout_secs = 3.0
# Seconds per HTTP request.
http_timeout_secs = 10.0
# Base URL for /.well-known/lad/agents when mDNS finds nothing.
# fallback_url = "https://hotel.example"
try_mdns = true
verify_tls = true
# ca_bundle = "/etc/lad/ca.pem"
# signing_public_key = "/etc/lad/keys/public.pem"
require_verified = false
fetch_cards = true
verify_domain = true
log_level = "info"

[server]
name = "Hotel Concierge"
description = "AI concierge for guest services"
role = "hotel-concierge"
capabilities = ["info", "dining", "spa"]
version = "1.0.0"
host = "0.0.0.0"
port = 8080
# network_ssid = "GrandHotel-Guest"
# network_realm = "grandhotel.com"
enable_mdns = true
# advertise_host = "192.168.1.20"
tls_enabled = false
# tls_certfile = "/etc/lad/cert.pem"
# tls_keyfile = "/etc/lad/key.pem"
signing_enabled = false
# signing_key = "/etc/lad/keys/private.pem"
# signing_key_id = "hotel-key-1"
log_level = "info"

[server.auth]
method = "none"
# method = "oauth2"
# token_url = "https://auth.example.com/oauth/token"
# scopes = ["agent:read"]
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ApiKeySettings, AuthConfig};
    use std::io::Write;

    fn no_env() -> Vec<(String, String)> {
        Vec::new()
    }

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let client = ClientConfig::default();
        assert_eq!(client.mdns_timeout(), Duration::from_secs(3));
        assert_eq!(client.http_timeout(), Duration::from_secs(10));
        assert!(client.try_mdns);
        assert!(client.verify_tls);

        let server = ServerConfig::default();
        assert_eq!(server.port, 8080);
        assert_eq!(server.scheme(), "http");
    }

    #[test]
    fn test_default_realm_is_hostname() {
        let server = ServerConfig::default();
        match machine_hostname() {
            Some(host) => assert_eq!(server.realm(), host),
            None => assert_eq!(server.realm(), DEFAULT_REALM),
        }
        assert!(!server.realm().is_empty());

        let blank = ServerConfig {
            network_realm: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(blank.realm(), server.realm());

        let configured = ServerConfig {
            network_realm: Some("grandhotel.com".to_string()),
            ..Default::default()
        };
        assert_eq!(configured.realm(), "grandhotel.com");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config: ClientConfig = load_section(
            Some(Path::new("/nonexistent/lad/config.toml")),
            "client",
            CLIENT_FIELDS,
            no_env(),
        );
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_invalid_toml_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not [valid toml").unwrap();
        let config: ServerConfig =
            load_section(Some(file.path()), "server", SERVER_FIELDS, no_env());
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_sections_are_split() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[client]
fallback_url = "https://hotel.example"
require_verified = true

[server]
name = "Grand Azure Hotel"
port = 8443
network_realm = "grandhotel.com"

[server.auth]
method = "api_key"
header_name = "X-Hotel-Key"
"#
        )
        .unwrap();

        let client: ClientConfig =
            load_section(Some(file.path()), "client", CLIENT_FIELDS, no_env());
        assert_eq!(client.fallback_url.as_deref(), Some("https://hotel.example"));
        assert!(client.require_verified);
        assert_eq!(client.http_timeout_secs, 10.0);

        let server: ServerConfig =
            load_section(Some(file.path()), "server", SERVER_FIELDS, no_env());
        assert_eq!(server.name, "Grand Azure Hotel");
        assert_eq!(server.port, 8443);
        assert_eq!(server.realm(), "grandhotel.com");
        assert_eq!(
            server.auth,
            AuthConfig::ApiKey(ApiKeySettings {
                header_name: "X-Hotel-Key".to_string(),
                documentation_url: None,
            })
        );
    }

    #[test]
    fn test_bare_table_is_read_for_either_side() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 9001\nname = \"Spa\"").unwrap();
        let server: ServerConfig =
            load_section(Some(file.path()), "server", SERVER_FIELDS, no_env());
        assert_eq!(server.port, 9001);
        assert_eq!(server.name, "Spa");
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("LAD_PORT", "9000"),
            ("LAD_ENABLE_MDNS", "no"),
            ("LAD_CAPABILITIES", "info, dining,,spa"),
            ("LAD_NETWORK_REALM", "grandhotel.com"),
            ("LAD_UNKNOWN_FIELD", "ignored"),
            ("PATH", "/usr/bin"),
        ]);
        let server: ServerConfig =
            load_section(Some(Path::new("/nonexistent")), "server", SERVER_FIELDS, vars);
        assert_eq!(server.port, 9000);
        assert!(!server.enable_mdns);
        assert_eq!(server.capabilities, vec!["info", "dining", "spa"]);
        assert_eq!(server.realm(), "grandhotel.com");
    }

    #[test]
    fn test_unparseable_env_is_ignored() {
        let vars = env(&[
            ("LAD_PORT", "not-a-port"),
            ("LAD_MDNS_TIMEOUT_SECS", "-1"),
            ("LAD_VERIFY_TLS", "maybe"),
        ]);
        let server: ServerConfig = load_section(
            Some(Path::new("/nonexistent")),
            "server",
            SERVER_FIELDS,
            vars.clone(),
        );
        assert_eq!(server.port, 8080);

        let client: ClientConfig =
            load_section(Some(Path::new("/nonexistent")), "client", CLIENT_FIELDS, vars);
        assert_eq!(client.mdns_timeout_secs, 3.0);
        assert!(client.verify_tls);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[client]\nverify_tls = true\ntry_mdns = true").unwrap();
        let client: ClientConfig = load_section(
            Some(file.path()),
            "client",
            CLIENT_FIELDS,
            env(&[("LAD_VERIFY_TLS", "false"), ("LAD_TRY_MDNS", "0")]),
        );
        assert!(!client.verify_tls);
        assert!(!client.try_mdns);
    }

    #[test]
    fn test_example_config_parses() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{EXAMPLE_CONFIG}").unwrap();
        let server: ServerConfig =
            load_section(Some(file.path()), "server", SERVER_FIELDS, no_env());
        assert_eq!(server.name, "Hotel Concierge");
        assert_eq!(server.capabilities, vec!["info", "dining", "spa"]);
        assert_eq!(server.auth, AuthConfig::None);

        let client: ClientConfig =
            load_section(Some(file.path()), "client", CLIENT_FIELDS, no_env());
        assert_eq!(client, ClientConfig::default());
    }

    #[test]
    fn test_server_projections() {
        let server = ServerConfig {
            signing_enabled: true,
            signing_key: Some(PathBuf::from("/keys/private.pem")),
            signing_key_id: Some("k1".to_string()),
            tls_enabled: true,
            ..Default::default()
        };
        let signing = server.signing_config();
        assert!(signing.enabled);
        assert_eq!(signing.key_id.as_deref(), Some("k1"));
        assert_eq!(server.scheme(), "https");
        assert_eq!(server.agent_config().name, server.name);
    }

    #[test]
    fn test_negative_timeout_falls_back() {
        let client = ClientConfig {
            mdns_timeout_secs: -5.0,
            ..Default::default()
        };
        assert_eq!(client.mdns_timeout(), Duration::from_secs(3));
    }
}
