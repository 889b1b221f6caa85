//! Print Agent - 本地打印代理
//!
//! 运行在收银机上的小型服务，接收来自 POS 前端的打印任务并交给打印后端。
//!
//! # 接口
//!
//! | 路径 | 协议 | 说明 |
//! |------|------|------|
//! | /health | HTTP GET | 健康检查 |
//! | /printers | HTTP GET | 打印机列表 |
//! | /print | HTTP POST | 提交打印任务 |
//! | /ws | WebSocket | 持久连接 (print_receipt / list_printers / health) |
//!
//! # 模块
//!
//! - [`core`] - 配置、状态、服务器
//! - [`api`] - HTTP / WebSocket 路由
//! - [`backend`] - 打印后端 (spool 目录 / 内存)
//! - [`utils`] - 日志

pub mod api;
pub mod backend;
pub mod core;
pub mod error;
pub mod utils;

pub use backend::{AgentJob, MemoryBackend, PrinterBackend, SpoolBackend};
pub use core::{AgentState, Config, Server};
pub use error::{AgentError, AgentResult};
