use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use shared::models::extension_for_mime;

use super::{AgentJob, PrinterBackend};
use crate::error::AgentResult;

/// Spool 目录后端
///
/// 目录结构:
///
/// ```text
/// spool/
/// ├── EPSON TM-T20/
/// │   └── 20260101T120000123-<job id>.bin
/// └── Kitchen/
/// ```
///
/// 打印机列表 = 配置的名称 ∪ spool 下已有的子目录。
#[derive(Debug)]
pub struct SpoolBackend {
    root: PathBuf,
    configured: Vec<String>,
}

impl SpoolBackend {
    /// 创建 spool 根目录及每台配置打印机的子目录
    pub fn new(root: impl Into<PathBuf>, printers: Vec<String>) -> AgentResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        for printer in &printers {
            std::fs::create_dir_all(root.join(sanitize(printer)))?;
        }
        tracing::info!(root = %root.display(), printers = printers.len(), "Spool backend ready");
        Ok(Self {
            root,
            configured: printers,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 任务文件路径
    pub fn job_path(&self, job: &AgentJob) -> PathBuf {
        let file = format!(
            "{}-{}.{}",
            job.received_at.format("%Y%m%dT%H%M%S%3f"),
            job.id,
            extension_for_mime(&job.mime)
        );
        self.root.join(sanitize(&job.printer)).join(file)
    }
}

/// 去掉路径分隔符等不能出现在目录名里的字符
fn sanitize(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

#[async_trait]
impl PrinterBackend for SpoolBackend {
    fn name(&self) -> &'static str {
        "spool"
    }

    fn printers(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self.configured.iter().cloned().collect();
        let known: BTreeSet<String> = names.iter().map(|n| sanitize(n)).collect();
        if let Ok(entries) = std::fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                let file_name = entry.file_name();
                if is_dir
                    && let Some(name) = file_name.to_str()
                    && !known.contains(name)
                {
                    names.insert(name.to_string());
                }
            }
        }
        names.into_iter().collect()
    }

    async fn submit(&self, job: &AgentJob) -> AgentResult<()> {
        let path = self.job_path(job);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, &job.bytes).await?;
        tracing::info!(
            job_id = %job.id,
            printer = %job.printer,
            kind = %job.kind,
            bytes = job.bytes.len(),
            path = %path.display(),
            "Job spooled"
        );
        Ok(())
    }

    fn check(&self) -> Result<(), String> {
        match std::fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(format!("{} is not a directory", self.root.display())),
            Err(e) => Err(e.to_string()),
        }
    }
}
