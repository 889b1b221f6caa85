//! 服务器启动和管理

use tokio::net::TcpListener;

use crate::core::{AgentState, Config};

/// HTTP Server
pub struct Server {
    config: Config,
    state: AgentState,
}

impl Server {
    pub fn new(config: Config, state: AgentState) -> Self {
        Self { config, state }
    }

    /// 绑定地址并运行，直到 Ctrl-C
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// 在已绑定的 listener 上运行，`shutdown` 完成时优雅退出
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            %addr,
            backend = self.state.backend.name(),
            printers = self.state.backend.printers().len(),
            auth = self.config.token.is_some(),
            "Print agent listening"
        );
        if !addr.ip().is_loopback() && self.config.token.is_none() {
            tracing::warn!(%addr, "Listening on a non-loopback address without AGENT_TOKEN");
        }

        let app = crate::api::router(self.state);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Print agent stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutting down...");
}
