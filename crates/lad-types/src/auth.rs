//! Authentication requirements declared in an AgentCard.
//!
//! LAD does not perform any token exchange. A server only *declares* what a
//! client must present before talking to the agent; [`AuthConfig`] is the
//! server-side configuration and [`AgentAuthentication`] is the block emitted
//! into the AgentCard.

use serde::{Deserialize, Serialize};

/// Default header for API key authentication.
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

fn default_api_key_header() -> String {
    DEFAULT_API_KEY_HEADER.to_string()
}

/// OAuth 2.0 settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Settings {
    /// Token endpoint.
    pub token_url: String,
    /// Authorization endpoint (authorization code flow).
    #[serde(default)]
    pub authorization_url: Option<String>,
    /// Required scopes.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Public client ID for PKCE flows.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Link to setup documentation.
    #[serde(default)]
    pub documentation_url: Option<String>,
}

/// OpenID Connect settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcSettings {
    /// OIDC issuer URL.
    pub issuer: String,
    /// Token endpoint.
    pub token_url: String,
    /// Authorization endpoint.
    #[serde(default)]
    pub authorization_url: Option<String>,
    /// JSON Web Key Set URL.
    #[serde(default)]
    pub jwks_uri: Option<String>,
    /// Required scopes.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Public client ID for PKCE flows.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Link to setup documentation.
    #[serde(default)]
    pub documentation_url: Option<String>,
}

/// API key settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeySettings {
    /// Header carrying the key.
    #[serde(default = "default_api_key_header")]
    pub header_name: String,
    /// Link to setup documentation.
    #[serde(default)]
    pub documentation_url: Option<String>,
}

impl Default for ApiKeySettings {
    fn default() -> Self {
        Self {
            header_name: default_api_key_header(),
            documentation_url: None,
        }
    }
}

/// Bearer token settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerSettings {
    /// Link to setup documentation.
    #[serde(default)]
    pub documentation_url: Option<String>,
}

/// Authentication an agent requires, tagged by `method`.
///
/// ```toml
/// [server.auth]
/// method = "oauth2"
/// token_url = "https://auth.example.com/oauth/token"
/// scopes = ["agent:read"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication.
    #[default]
    None,
    /// OAuth 2.0.
    #[serde(rename = "oauth2")]
    OAuth2(OAuth2Settings),
    /// OpenID Connect.
    Oidc(OidcSettings),
    /// Static API key in a request header.
    ApiKey(ApiKeySettings),
    /// Bearer token in the `Authorization` header.
    Bearer(BearerSettings),
}

impl AuthConfig {
    /// The method name used on the wire.
    pub fn method(&self) -> &'static str {
        match self {
            AuthConfig::None => "none",
            AuthConfig::OAuth2(_) => "oauth2",
            AuthConfig::Oidc(_) => "oidc",
            AuthConfig::ApiKey(_) => "api_key",
            AuthConfig::Bearer(_) => "bearer",
        }
    }

    /// Build the AgentCard `authentication` block, or `None` when no
    /// authentication is required.
    pub fn to_card_field(&self) -> Option<AgentAuthentication> {
        let mut auth = AgentAuthentication::new(self.method());
        match self {
            AuthConfig::None => return None,
            AuthConfig::OAuth2(s) => {
                auth.authorization_url = s.authorization_url.clone();
                auth.token_url = Some(s.token_url.clone());
                auth.scopes = non_empty(&s.scopes);
                auth.client_id = s.client_id.clone();
                auth.documentation_url = s.documentation_url.clone();
            }
            AuthConfig::Oidc(s) => {
                auth.authorization_url = s.authorization_url.clone();
                auth.token_url = Some(s.token_url.clone());
                auth.scopes = non_empty(&s.scopes);
                auth.client_id = s.client_id.clone();
                auth.issuer = Some(s.issuer.clone());
                auth.jwks_uri = s.jwks_uri.clone();
                auth.documentation_url = s.documentation_url.clone();
            }
            AuthConfig::ApiKey(s) => {
                auth.header_name = Some(s.header_name.clone());
                auth.documentation_url = s.documentation_url.clone();
            }
            AuthConfig::Bearer(s) => {
                auth.header_name = Some("Authorization".to_string());
                auth.scheme = Some("Bearer".to_string());
                auth.documentation_url = s.documentation_url.clone();
            }
        }
        Some(auth)
    }
}

fn non_empty(scopes: &[String]) -> Option<Vec<String>> {
    if scopes.is_empty() {
        None
    } else {
        Some(scopes.to_vec())
    }
}

/// The `authentication` block of an AgentCard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAuthentication {
    /// Method name ("oauth2", "oidc", "api_key", "bearer").
    #[serde(rename = "type")]
    pub auth_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
}

impl AgentAuthentication {
    fn new(auth_type: &str) -> Self {
        Self {
            auth_type: auth_type.to_string(),
            authorization_url: None,
            token_url: None,
            scopes: None,
            client_id: None,
            issuer: None,
            jwks_uri: None,
            header_name: None,
            scheme: None,
            documentation_url: None,
        }
    }
}
