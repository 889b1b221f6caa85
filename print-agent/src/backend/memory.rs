use async_trait::async_trait;
use parking_lot::Mutex;

use super::{AgentJob, PrinterBackend};
use crate::error::{AgentError, AgentResult};

/// 内存后端
///
/// 任务只记录不打印。打印机名称以 `fail:` 开头时模拟打印失败。
#[derive(Debug, Default)]
pub struct MemoryBackend {
    printers: Vec<String>,
    jobs: Mutex<Vec<AgentJob>>,
}

impl MemoryBackend {
    pub fn new<I, S>(printers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            printers: printers.into_iter().map(Into::into).collect(),
            jobs: Mutex::new(Vec::new()),
        }
    }

    /// 已接收的任务 (按接收顺序)
    pub fn jobs(&self) -> Vec<AgentJob> {
        self.jobs.lock().clone()
    }
}

#[async_trait]
impl PrinterBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn printers(&self) -> Vec<String> {
        self.printers.clone()
    }

    async fn submit(&self, job: &AgentJob) -> AgentResult<()> {
        if job.printer.starts_with("fail:") {
            return Err(AgentError::PrintFailed(format!(
                "printer {} rejected the job",
                job.printer
            )));
        }
        self.jobs.lock().push(job.clone());
        Ok(())
    }
}
