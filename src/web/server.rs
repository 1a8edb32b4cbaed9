//! HTTP server startup, plain or TLS

use axum_server::tls_rustls::RustlsConfig;
use std::{net::SocketAddr, path::PathBuf};
use tracing::info;

use super::routes::{router, AppState};

/// Web server configuration
pub struct WebServerConfig {
    pub port: u16,
    pub bind_address: String,
    /// Certificate and key PEM files; TLS is only enabled when both are set
    pub tls: Option<(PathBuf, PathBuf)>,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            bind_address: "0.0.0.0".to_string(),
            tls: None,
        }
    }
}

impl WebServerConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let cert = std::env::var("TLS_CERT_PATH").ok().filter(|s| !s.trim().is_empty());
        let key = std::env::var("TLS_KEY_PATH").ok().filter(|s| !s.trim().is_empty());

        Self {
            port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(3000),
            bind_address: std::env::var("BIND_ADDRESS")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            tls: cert.zip(key).map(|(c, k)| (PathBuf::from(c), PathBuf::from(k))),
        }
    }

    fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address {}:{}: {}", self.bind_address, self.port, e))
    }
}

/// Serve the webhook and interactions endpoints until shutdown
pub async fn start_web_server(config: WebServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let addr = config.socket_addr()?;

    match &config.tls {
        Some((cert_path, key_path)) => {
            info!("Loading TLS certificates:");
            info!("  Certificate: {}", cert_path.display());
            info!("  Private key: {}", key_path.display());

            if !cert_path.exists() {
                return Err(anyhow::anyhow!(
                    "Certificate file not found: {}",
                    cert_path.display()
                ));
            }
            if !key_path.exists() {
                return Err(anyhow::anyhow!(
                    "Private key file not found: {}",
                    key_path.display()
                ));
            }

            let tls_config = RustlsConfig::from_pem_file(cert_path, key_path)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to load TLS certificates: {}", e))?;

            info!("Web server listening on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("Web server listening on http://{}", listener.local_addr()?);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
