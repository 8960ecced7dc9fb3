use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self> {
        // Upload root is created by the session store
        tokio::fs::create_dir_all(&config.translation.output_directory)
            .await
            .with_context(|| format!("Failed to create {}", config.translation.output_directory))?;

        let addr = format!("{}:{}", config.server.host, config.server.port);
        let state = AppState::new(config).await?;

        let listener = TcpListener::bind(addr.as_str())
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        let local_addr = listener.local_addr()?;
        info!("Starting server on {}", local_addr);

        Ok(Self {
            port: local_addr.port(),
            listener,
            router: build_router(state),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }
}
