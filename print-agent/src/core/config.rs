use std::net::SocketAddr;
use std::path::PathBuf;

/// Agent 配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | AGENT_HOST | 127.0.0.1 | 监听地址 |
/// | AGENT_PORT | 9060 | 监听端口 |
/// | AGENT_TOKEN | (空) | Bearer token，空表示不校验 |
/// | AGENT_PRINTERS | (空) | 逗号分隔的打印机名称 |
/// | SPOOL_DIR | ./spool | 打印任务输出目录 |
/// | LOG_DIR | (空) | 日志目录，空表示只输出到终端 |
/// | LOG_LEVEL | info | 日志级别 |
/// | ENVIRONMENT | development | 运行环境 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
///
/// # 示例
///
/// ```ignore
/// AGENT_PORT=9100 AGENT_PRINTERS="EPSON TM-T20,Kitchen" cargo run -p print-agent
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 监听地址 (默认只监听本机)
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 认证 token
    pub token: Option<String>,
    /// 配置的打印机名称
    pub printers: Vec<String>,
    /// spool 目录，每台打印机一个子目录
    pub spool_dir: PathBuf,
    /// 日志目录
    pub log_dir: Option<PathBuf>,
    /// 日志级别
    pub log_level: String,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9060,
            token: None,
            printers: Vec::new(),
            spool_dir: PathBuf::from("./spool"),
            log_dir: None,
            log_level: "info".into(),
            environment: "development".into(),
            request_timeout_ms: 30_000,
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("AGENT_HOST").unwrap_or(defaults.host),
            port: std::env::var("AGENT_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            token: std::env::var("AGENT_TOKEN")
                .ok()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            printers: std::env::var("AGENT_PRINTERS")
                .map(|v| parse_printer_list(&v))
                .unwrap_or_default(),
            spool_dir: std::env::var("SPOOL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.spool_dir),
            log_dir: std::env::var("LOG_DIR")
                .ok()
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.request_timeout_ms),
        }
    }

    /// 常用于测试场景
    pub fn with_printers<I, S>(mut self, printers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.printers = printers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = Some(token.trim().to_string()).filter(|t| !t.is_empty());
        self
    }

    pub fn with_spool_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spool_dir = dir.into();
        self
    }

    /// 监听地址；host 无法解析时回退到 127.0.0.1
    pub fn socket_addr(&self) -> SocketAddr {
        let ip = self
            .host
            .parse()
            .unwrap_or(std::net::IpAddr::from([127, 0, 0, 1]));
        SocketAddr::new(ip, self.port)
    }
}

/// "A, B,,C" → ["A", "B", "C"]
fn parse_printer_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_printer_list() {
        assert_eq!(
            parse_printer_list(" EPSON TM-T20 , Kitchen,, "),
            vec!["EPSON TM-T20", "Kitchen"]
        );
        assert!(parse_printer_list("").is_empty());
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::default();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:9060");

        let config = Config {
            host: "not an ip".into(),
            port: 1,
            ..Config::default()
        };
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:1");
    }

    #[test]
    fn test_blank_token_disables_auth() {
        assert_eq!(Config::default().with_token("  ").token, None);
        assert_eq!(Config::default().with_token("abc").token.as_deref(), Some("abc"));
    }
}
