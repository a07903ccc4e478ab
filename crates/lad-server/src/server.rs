//! Server lifecycle: construction checks, advertisement, HTTP(S) serving.

use crate::advertiser::ServiceAdvertiser;
use crate::card::CardGenerator;
use crate::error::{ServerError, ServerResult};
use crate::net::{outbound_ip, url_authority};
use crate::routes::{build_router, AppState};
use axum::Router;
use lad_types::card_signing::CardSigner;
use lad_types::config::ServerConfig;
use lad_types::error::LadError;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Grace period for in-flight TLS connections at shutdown.
const TLS_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A LAD server for one agent.
pub struct LadServer {
    config: ServerConfig,
    signer: Option<CardSigner>,
    /// Host placed in generated URLs.
    url_host: String,
    /// Address announced over mDNS.
    mdns_ip: IpAddr,
    advertiser: ServiceAdvertiser,
}

/// Stops advertising when dropped, covering every exit path of `serve`.
struct AdvertisementGuard<'a>(&'a ServiceAdvertiser);

impl Drop for AdvertisementGuard<'_> {
    fn drop(&mut self) {
        self.0.stop();
    }
}

/// Aborts the shutdown-forwarding task when dropped, so a failed serve
/// does not leave it waiting on the caller's future.
struct ShutdownWatcher(tokio::task::JoinHandle<()>);

impl Drop for ShutdownWatcher {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl LadServer {
    /// Validate `config` and prepare the server.
    ///
    /// Missing TLS files are fatal. A missing or unreadable signing key only
    /// disables signing.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        if config.tls_enabled {
            require_file(config.tls_certfile.as_deref(), "TLS certificate")?;
            require_file(config.tls_keyfile.as_deref(), "TLS private key")?;
            info!("TLS enabled");
        } else {
            warn!("TLS disabled; serve over plain HTTP for development only");
        }

        let signer = if config.signing_enabled {
            match CardSigner::from_config(&config.signing_config()) {
                Ok(signer) => {
                    info!(kid = ?signer.key_id(), "AgentCard signing enabled");
                    Some(signer)
                }
                Err(e) => {
                    error!(error = %e, "AgentCard signing configuration invalid, disabling signing");
                    None
                }
            }
        } else {
            None
        };

        let advertised_ip = config
            .advertise_host
            .as_deref()
            .and_then(|h| h.parse::<IpAddr>().ok());
        let mdns_ip = advertised_ip.unwrap_or_else(outbound_ip);
        let url_host = config
            .advertise_host
            .clone()
            .unwrap_or_else(|| mdns_ip.to_string());

        let advertiser = ServiceAdvertiser::new(&config.name, config.realm(), config.enable_mdns);

        info!(
            agent = %config.name,
            host = %config.host,
            port = config.port,
            url_host = %url_host,
            tls = config.tls_enabled,
            signing = signer.is_some(),
            "LAD server initialized"
        );

        Ok(Self {
            config,
            signer,
            url_host,
            mdns_ip,
            advertiser,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Whether AgentCards are served signed on request.
    pub fn signing_enabled(&self) -> bool {
        self.signer.is_some()
    }

    /// Base URL clients use to reach this server on `port`.
    pub fn base_url(&self, port: u16) -> String {
        format!(
            "{}://{}",
            self.config.scheme(),
            url_authority(&self.url_host, port)
        )
    }

    /// Handler state for a server listening on `port`.
    pub fn app_state(&self, port: u16) -> Arc<AppState> {
        Arc::new(AppState {
            generator: CardGenerator::new(
                self.config.agent_config(),
                self.base_url(port),
                self.config.network_ssid.clone(),
                self.config.realm(),
            ),
            signer: self.signer.clone(),
            mdns_enabled: self.config.enable_mdns,
            tls_enabled: self.config.tls_enabled,
        })
    }

    /// Router for a server listening on `port`.
    pub fn router(&self, port: u16) -> Router {
        build_router(self.app_state(port))
    }

    /// Serve plain HTTP on an already-bound listener until `shutdown`
    /// resolves. URLs use the listener's actual port.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener.local_addr().map_err(LadError::from)?;
        let app = self.router(local.port());

        self.advertiser.start(self.mdns_ip, local.port());
        let _guard = AdvertisementGuard(&self.advertiser);

        info!(addr = %local, url = %self.base_url(local.port()), "LAD server listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(LadError::from)?;
        info!("LAD server stopped");
        Ok(())
    }

    /// Bind the configured address and serve (HTTPS when TLS is enabled)
    /// until `shutdown` resolves. Advertisement is stopped on every exit path.
    pub async fn run<F>(&self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        if !self.config.tls_enabled {
            let listener = TcpListener::bind(&addr)
                .await
                .map_err(|source| ServerError::Bind { addr: addr.clone(), source })?;
            return self.serve(listener, shutdown).await;
        }

        let (Some(cert), Some(key)) = (&self.config.tls_certfile, &self.config.tls_keyfile) else {
            return Err(LadError::Config("TLS enabled without certificate and key".to_string()).into());
        };
        let socket_addr: SocketAddr = addr.parse().map_err(|e| ServerError::Bind {
            addr: addr.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        })?;

        // A provider may already be installed by the embedding application.
        let _ = rustls::crypto::ring::default_provider().install_default();
        let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key)
            .await
            .map_err(|e| ServerError::Tls(format!("Failed to load certificate/key: {e}")))?;

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        let watcher = ShutdownWatcher(tokio::spawn(async move {
            shutdown.await;
            shutdown_handle.graceful_shutdown(Some(TLS_SHUTDOWN_GRACE));
        }));

        let app = self.router(self.config.port);
        self.advertiser.start(self.mdns_ip, self.config.port);
        let _guard = AdvertisementGuard(&self.advertiser);

        info!(addr = %socket_addr, url = %self.base_url(self.config.port), "LAD server listening (TLS)");
        let served = axum_server::bind_rustls(socket_addr, tls)
            .handle(handle)
            .serve(app.into_make_service())
            .await;
        drop(watcher);
        served.map_err(|source| ServerError::Bind { addr, source })?;
        info!("LAD server stopped");
        Ok(())
    }
}

fn require_file(path: Option<&Path>, what: &str) -> ServerResult<()> {
    match path {
        None => Err(LadError::Config(format!("TLS enabled but no {what} configured")).into()),
        Some(p) if !p.exists() => {
            Err(LadError::Config(format!("{what} not found: {}", p.display())).into())
        }
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn local_config() -> ServerConfig {
        ServerConfig {
            name: "Grand Azure Hotel".to_string(),
            advertise_host: Some("127.0.0.1".to_string()),
            enable_mdns: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_tls_requires_files() {
        let config = ServerConfig {
            tls_enabled: true,
            tls_certfile: Some(PathBuf::from("/nonexistent/cert.pem")),
            tls_keyfile: Some(PathBuf::from("/nonexistent/key.pem")),
            ..local_config()
        };
        assert!(matches!(
            LadServer::new(config),
            Err(ServerError::Lad(LadError::Config(_)))
        ));

        let config = ServerConfig {
            tls_enabled: true,
            ..local_config()
        };
        assert!(LadServer::new(config).is_err());
    }

    #[test]
    fn test_bad_signing_key_disables_signing() {
        let config = ServerConfig {
            signing_enabled: true,
            signing_key: Some(PathBuf::from("/nonexistent/private.pem")),
            ..local_config()
        };
        let server = LadServer::new(config).unwrap();
        assert!(!server.signing_enabled());
    }

    #[test]
    fn test_base_url() {
        let server = LadServer::new(local_config()).unwrap();
        assert_eq!(server.base_url(8080), "http://127.0.0.1:8080");

        let tls_dir = tempfile::tempdir().unwrap();
        let cert = tls_dir.path().join("cert.pem");
        let key = tls_dir.path().join("key.pem");
        std::fs::write(&cert, "cert").unwrap();
        std::fs::write(&key, "key").unwrap();
        let server = LadServer::new(ServerConfig {
            tls_enabled: true,
            tls_certfile: Some(cert),
            tls_keyfile: Some(key),
            advertise_host: Some("ai.grandhotel.com".to_string()),
            ..local_config()
        })
        .unwrap();
        assert_eq!(server.base_url(8443), "https://ai.grandhotel.com:8443");
    }

    #[tokio::test]
    async fn test_shutdown_watcher_drops_pending_future() {
        let (mut tx, rx) = tokio::sync::oneshot::channel::<()>();
        let watcher = ShutdownWatcher(tokio::spawn(async move {
            let _ = rx.await;
        }));
        drop(watcher);
        tokio::time::timeout(Duration::from_secs(1), tx.closed())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_serve_until_shutdown() {
        let server = LadServer::new(local_config()).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            server
                .serve(listener, async {
                    let _ = rx.await;
                })
                .await
        });
        tx.send(()).unwrap();
        task.await.unwrap().unwrap();
    }
}
