//! 服务器状态

use std::sync::Arc;
use std::time::Instant;

use crate::backend::PrinterBackend;
use crate::core::Config;
use crate::error::{AgentError, AgentResult};

/// 所有请求共享的状态
#[derive(Clone)]
pub struct AgentState {
    pub config: Arc<Config>,
    pub backend: Arc<dyn PrinterBackend>,
    started_at: Instant,
}

impl AgentState {
    pub fn new(config: Config, backend: Arc<dyn PrinterBackend>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// 校验客户端 token；未配置 token 时允许本机无认证访问
    pub fn check_token(&self, presented: Option<&str>) -> bool {
        match &self.config.token {
            None => true,
            Some(expected) => presented.map(str::trim) == Some(expected.as_str()),
        }
    }

    /// 按名称查找打印机 (不区分大小写)，返回后端使用的名称
    pub fn resolve_printer(&self, requested: &str) -> AgentResult<String> {
        let requested = requested.trim();
        if requested.is_empty() {
            return Err(AgentError::MissingField("Printer name is required".into()));
        }
        let names = self.backend.printers();
        if names.is_empty() {
            return Err(AgentError::NoPrinters);
        }
        names
            .iter()
            .find(|name| name.eq_ignore_ascii_case(requested) || name.to_lowercase() == requested.to_lowercase())
            .cloned()
            .ok_or_else(|| AgentError::PrinterNotFound {
                name: requested.to_string(),
                available: names.clone(),
            })
    }
}

impl std::fmt::Debug for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentState")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .finish()
    }
}
