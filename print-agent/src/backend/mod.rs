//! 打印后端
//!
//! 后端接收已解码的打印任务并交付给物理打印机 (或其替身)。
//!
//! | 后端 | 说明 |
//! |------|------|
//! | [`SpoolBackend`] | 按打印机写入 spool 目录，由系统打印服务或驱动消费 |
//! | [`MemoryBackend`] | 仅记录到内存，用于测试和 dry run |

mod memory;
mod spool;

pub use memory::MemoryBackend;
pub use spool::SpoolBackend;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::PayloadKind;
use uuid::Uuid;

use crate::error::AgentResult;

/// 已校验、已解码的打印任务
#[derive(Debug, Clone, PartialEq)]
pub struct AgentJob {
    pub id: Uuid,
    /// 后端使用的打印机名称 (已规范化大小写)
    pub printer: String,
    pub kind: PayloadKind,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub received_at: DateTime<Utc>,
}

impl AgentJob {
    pub fn new(printer: impl Into<String>, kind: PayloadKind, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            printer: printer.into(),
            kind,
            mime: mime.into(),
            bytes,
            received_at: Utc::now(),
        }
    }
}

/// 打印机后端
#[async_trait]
pub trait PrinterBackend: Send + Sync {
    /// 后端名称 (日志用)
    fn name(&self) -> &'static str;

    /// 本机可用的打印机名称
    fn printers(&self) -> Vec<String>;

    /// 交付一个打印任务
    async fn submit(&self, job: &AgentJob) -> AgentResult<()>;

    /// 后端是否可用 (用于 /health/detailed)
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}
