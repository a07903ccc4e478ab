//! `lad serve`: advertise one agent until Ctrl+C.

use crate::cli::{AuthMethod, ServeArgs};
use crate::{init_tracing, ui, with_bootstrap_logging};
use lad_server::LadServer;
use lad_types::auth::{ApiKeySettings, AuthConfig, BearerSettings, OAuth2Settings, OidcSettings};
use lad_types::config::{load_server_config, ServerConfig};
use std::path::PathBuf;
use tracing::{error, info};

pub fn cmd_serve(config_path: Option<PathBuf>, args: ServeArgs) -> i32 {
    let mut config = with_bootstrap_logging(|| load_server_config(config_path.as_deref()));
    if let Err(msg) = apply_overrides(&args, &mut config) {
        ui::error_with_fix(&msg, "See `lad serve --help` for the auth flags");
        return 2;
    }
    init_tracing(&config.log_level);

    let server = match LadServer::new(config) {
        Ok(s) => s,
        Err(e) => {
            ui::error(&format!("Failed to start LAD server: {e}"));
            return 1;
        }
    };
    let Some(rt) = super::runtime() else {
        return 1;
    };

    rt.block_on(async {
        let config = server.config();
        ui::section("LAD server");
        ui::kv("Agent", &config.name);
        ui::kv("URL", &server.base_url(config.port));
        ui::kv("Realm", &config.realm());
        ui::kv("mDNS", if config.enable_mdns { "on" } else { "off" });
        if config.tls_enabled {
            ui::kv_ok("TLS", "on");
        } else {
            ui::kv_warn("TLS", "off (development only)");
        }
        ui::kv(
            "Signing",
            if server.signing_enabled() { "on" } else { "off" },
        );
        ui::hint("Press Ctrl+C to stop");
        ui::blank();

        match server.run(shutdown_signal()).await {
            Ok(()) => 0,
            Err(e) => {
                ui::error(&format!("Server error: {e}"));
                1
            }
        }
    })
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl+C; serving until killed");
            std::future::pending::<()>().await;
        }
    }
}

/// Overlay command-line flags on the loaded configuration.
pub(crate) fn apply_overrides(args: &ServeArgs, config: &mut ServerConfig) -> Result<(), String> {
    if let Some(name) = &args.name {
        config.name = name.clone();
    }
    if let Some(description) = &args.description {
        config.description = description.clone();
    }
    if let Some(role) = &args.role {
        config.role = role.clone();
    }
    if let Some(capabilities) = &args.capabilities {
        config.capabilities = capabilities
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
    }
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.ssid.is_some() {
        config.network_ssid = args.ssid.clone();
    }
    if args.realm.is_some() {
        config.network_realm = args.realm.clone();
    }
    if args.advertise_host.is_some() {
        config.advertise_host = args.advertise_host.clone();
    }
    if args.no_mdns {
        config.enable_mdns = false;
    }
    if let (Some(cert), Some(key)) = (&args.ssl_certfile, &args.ssl_keyfile) {
        config.tls_enabled = true;
        config.tls_certfile = Some(cert.clone());
        config.tls_keyfile = Some(key.clone());
    }
    if let Some(key) = &args.signing_key {
        config.signing_enabled = true;
        config.signing_key = Some(key.clone());
    }
    if args.signing_key_id.is_some() {
        config.signing_key_id = args.signing_key_id.clone();
    }
    if let Some(method) = args.auth_method {
        config.auth = auth_from_args(method, args)?;
    }
    Ok(())
}

fn auth_from_args(method: AuthMethod, args: &ServeArgs) -> Result<AuthConfig, String> {
    let scopes = args.auth_scopes.clone().unwrap_or_default();
    let auth = match method {
        AuthMethod::None => AuthConfig::None,
        AuthMethod::OAuth2 => AuthConfig::OAuth2(OAuth2Settings {
            token_url: args
                .auth_token_url
                .clone()
                .ok_or("--auth-method oauth2 requires --auth-token-url")?,
            authorization_url: args.auth_authorization_url.clone(),
            scopes,
            client_id: args.auth_client_id.clone(),
            documentation_url: args.auth_docs_url.clone(),
        }),
        AuthMethod::Oidc => AuthConfig::Oidc(OidcSettings {
            issuer: args
                .auth_issuer
                .clone()
                .ok_or("--auth-method oidc requires --auth-issuer")?,
            token_url: args
                .auth_token_url
                .clone()
                .ok_or("--auth-method oidc requires --auth-token-url")?,
            authorization_url: args.auth_authorization_url.clone(),
            jwks_uri: args.auth_jwks_uri.clone(),
            scopes,
            client_id: args.auth_client_id.clone(),
            documentation_url: args.auth_docs_url.clone(),
        }),
        AuthMethod::ApiKey => {
            let mut settings = ApiKeySettings {
                documentation_url: args.auth_docs_url.clone(),
                ..Default::default()
            };
            if let Some(header) = &args.auth_header_name {
                settings.header_name = header.clone();
            }
            AuthConfig::ApiKey(settings)
        }
        AuthMethod::Bearer => AuthConfig::Bearer(BearerSettings {
            documentation_url: args.auth_docs_url.clone(),
        }),
    };
    Ok(auth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let mut config = ServerConfig::default();
        let args = ServeArgs {
            name: Some("Spa Desk".to_string()),
            capabilities: Some(vec![" booking ".to_string(), String::new()]),
            port: Some(9000),
            realm: Some("grandhotel.com".to_string()),
            no_mdns: true,
            ssl_certfile: Some(PathBuf::from("cert.pem")),
            ssl_keyfile: Some(PathBuf::from("key.pem")),
            signing_key: Some(PathBuf::from("private.pem")),
            ..Default::default()
        };
        apply_overrides(&args, &mut config).unwrap();
        assert_eq!(config.name, "Spa Desk");
        assert_eq!(config.capabilities, vec!["booking"]);
        assert_eq!(config.port, 9000);
        assert_eq!(config.realm(), "grandhotel.com");
        assert!(!config.enable_mdns);
        assert!(config.tls_enabled);
        assert!(config.signing_enabled);
    }

    #[test]
    fn test_absent_flags_keep_config() {
        let mut config = ServerConfig {
            name: "From File".to_string(),
            network_ssid: Some("Guest".to_string()),
            ..Default::default()
        };
        apply_overrides(&ServeArgs::default(), &mut config).unwrap();
        assert_eq!(config.name, "From File");
        assert_eq!(config.network_ssid.as_deref(), Some("Guest"));
        assert!(config.enable_mdns);
        assert_eq!(config.auth, AuthConfig::None);
    }

    #[test]
    fn test_auth_flags() {
        let mut config = ServerConfig::default();
        let args = ServeArgs {
            auth_method: Some(AuthMethod::OAuth2),
            auth_token_url: Some("https://auth.example/token".to_string()),
            auth_scopes: Some(vec!["agent:read".to_string()]),
            ..Default::default()
        };
        apply_overrides(&args, &mut config).unwrap();
        match &config.auth {
            AuthConfig::OAuth2(s) => {
                assert_eq!(s.token_url, "https://auth.example/token");
                assert_eq!(s.scopes, vec!["agent:read"]);
            }
            other => panic!("unexpected auth {other:?}"),
        }

        let args = ServeArgs {
            auth_method: Some(AuthMethod::Oidc),
            auth_token_url: Some("https://auth.example/token".to_string()),
            ..Default::default()
        };
        assert!(apply_overrides(&args, &mut config).is_err());

        let args = ServeArgs {
            auth_method: Some(AuthMethod::ApiKey),
            ..Default::default()
        };
        apply_overrides(&args, &mut config).unwrap();
        assert_eq!(config.auth, AuthConfig::ApiKey(ApiKeySettings::default()));
    }
}
