//! Warden Web Server
//!
//! Main web server implementation using Axum.

use crate::{create_app, AppState, WebConfig, WebError, WebResult};
use axum::serve;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Main Warden web server
pub struct WardenServer {
    config: WebConfig,
    state: AppState,
}

impl WardenServer {
    /// Create a new server, connecting and initializing its state
    pub async fn new(config: WebConfig) -> WebResult<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Start the web server
    pub async fn start(self) -> WebResult<()> {
        let address = self.config.address();

        info!("Starting Warden web server on http://{}", address);

        let app = create_app(self.state.clone());
        let listener = TcpListener::bind(&address).await.map_err(WebError::Server)?;

        info!("Server listening on http://{}", address);

        if let Err(e) = serve(listener, app).await {
            error!("Server error: {}", e);
            return Err(WebError::Server(e));
        }

        Ok(())
    }

    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Builder for [`WardenServer`]
pub struct WardenServerBuilder {
    config: WebConfig,
}

impl WardenServerBuilder {
    pub fn new() -> Self {
        Self {
            config: WebConfig::default(),
        }
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn database_url<S: Into<String>>(mut self, database_url: S) -> Self {
        self.config.database_url = database_url.into();
        self
    }

    pub fn seed_demo_data(mut self, seed: bool) -> Self {
        self.config.seed_demo_data = seed;
        self
    }

    pub async fn build(self) -> WebResult<WardenServer> {
        WardenServer::new(self.config).await
    }
}

impl Default for WardenServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn server_builds_with_in_memory_database() {
        let server = WardenServerBuilder::new()
            .host("127.0.0.1")
            .port(0)
            .build()
            .await;
        assert!(server.is_ok());
    }

    #[test]
    fn builder_overrides_defaults() {
        let builder = WardenServerBuilder::new()
            .host("0.0.0.0")
            .port(9000)
            .seed_demo_data(true);
        assert_eq!(builder.config.address(), "0.0.0.0:9000");
        assert!(builder.config.seed_demo_data);
    }
}
